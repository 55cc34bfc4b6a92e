use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Grading scale bounds used to validate recorded scores before averaging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradingConfig {
    pub max_score: Decimal,
}

impl Default for GradingConfig {
    fn default() -> Self {
        Self {
            max_score: Decimal::from(20),
        }
    }
}
