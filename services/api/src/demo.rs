use crate::infra::{demo_gradebook, load_gradebook};
use clap::Args;
use gradebook::bulletins::{
    BulletinGenerator, ClassStatistics, GenerationReport, GenerationRequest, GradingConfig,
    InMemoryGradebook, InMemoryReportCardStore, ReportCard,
};
use gradebook::config::AppConfig;
use gradebook::error::AppError;
use gradebook::telemetry;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct GenerateArgs {
    /// Gradebook CSV export (class_id,student_id,subject_id,subject_weight,term,score,weight)
    #[arg(long)]
    pub(crate) scores_csv: PathBuf,
    /// Class to generate report cards for
    #[arg(long)]
    pub(crate) class: String,
    /// Term number (1, 2 or 3)
    #[arg(long)]
    pub(crate) term: u8,
    /// School year label, e.g. 2023-2024
    #[arg(long)]
    pub(crate) year: String,
    /// Print the generation report as JSON instead of text
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Term to generate for the seeded class
    #[arg(long, default_value_t = 1)]
    pub(crate) term: u8,
    /// School year label used for the seeded class
    #[arg(long, default_value = "2023-2024")]
    pub(crate) year: String,
}

pub(crate) fn run_generate(args: GenerateArgs) -> Result<(), AppError> {
    let GenerateArgs {
        scores_csv,
        class,
        term,
        year,
        json,
    } = args;

    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    let gradebook = load_gradebook(Some(scores_csv.as_path()))?;
    let generator = build_generator(gradebook, config.grading);
    let request = GenerationRequest::new(class, term, year);

    let report = generator.generate(&request)?;
    let statistics = generator.class_statistics(&request)?;

    if json {
        match serde_json::to_string_pretty(&report) {
            Ok(payload) => println!("{}", payload),
            Err(err) => println!("Generation report unavailable: {}", err),
        }
        return Ok(());
    }

    render_generation(&request, &report, &statistics);
    Ok(())
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs { term, year } = args;

    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    let request = GenerationRequest::new("6A", term, year);
    let generator = demo_generator(config.grading);

    println!("Report card demo (seeded class 6A)");
    let report = generator.generate(&request)?;
    let statistics = generator.class_statistics(&request)?;
    render_generation(&request, &report, &statistics);

    println!("\nRe-running generation for the same term");
    let rerun = generator.generate(&request)?;
    println!(
        "- {} created, {} skipped (report card already present)",
        rerun.created.len(),
        rerun.skipped_existing
    );

    let cohort = generator.cohort(&request)?;
    println!("\nCohort after re-ranking");
    for card in &cohort {
        println!("  {}", card_line(card));
    }

    Ok(())
}

fn demo_generator(
    grading: GradingConfig,
) -> BulletinGenerator<InMemoryGradebook, InMemoryReportCardStore> {
    build_generator(demo_gradebook(), grading)
}

fn build_generator(
    gradebook: InMemoryGradebook,
    grading: GradingConfig,
) -> BulletinGenerator<InMemoryGradebook, InMemoryReportCardStore> {
    BulletinGenerator::new(
        Arc::new(gradebook),
        Arc::new(InMemoryReportCardStore::new()),
        grading,
    )
}

fn render_generation(
    request: &GenerationRequest,
    report: &GenerationReport,
    statistics: &ClassStatistics,
) {
    println!(
        "Class {} | term {} | {}",
        request.class_id, request.term, request.school_year
    );
    println!(
        "- {} created, {} skipped, {} failed",
        report.created.len(),
        report.skipped_existing,
        report.failed.len()
    );

    let mut created: Vec<&ReportCard> = report.created.iter().collect();
    created.sort_by_key(|card| card.rank.unwrap_or(u32::MAX));
    for card in created {
        println!("  {}", card_line(card));
        for subject in &card.subject_averages {
            println!(
                "      {} (coef {}): {}",
                subject.subject_id, subject.subject_weight, subject.average
            );
        }
    }

    if !report.failed.is_empty() {
        println!("Students without a report card");
        for failure in &report.failed {
            println!("  - {}: {}", failure.student_id, failure.reason);
        }
    }

    println!(
        "Class statistics: average {} | min {} | max {}",
        statistics.average, statistics.min, statistics.max
    );
}

fn card_line(card: &ReportCard) -> String {
    let rank = card
        .rank
        .map(|rank| format!("{rank}/{}", card.cohort_size))
        .unwrap_or_else(|| "unranked".to_string());
    format!(
        "{} [{}] overall {} ({} subjects)",
        card.student_id,
        rank,
        card.overall_average,
        card.subject_averages.len()
    )
}
