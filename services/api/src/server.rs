use crate::cli::ServeArgs;
use crate::infra::{load_gradebook, AppState};
use crate::routes::{with_service_routes, BulletinState};
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use gradebook::bulletins::{BulletinGenerator, InMemoryReportCardStore};
use gradebook::config::AppConfig;
use gradebook::error::AppError;
use gradebook::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let gradebook = load_gradebook(args.scores_csv.as_deref())?;
    info!(
        classes = gradebook.class_ids().count(),
        scores = gradebook.score_count(),
        "gradebook loaded"
    );
    let generator = BulletinGenerator::new(
        Arc::new(gradebook),
        Arc::new(InMemoryReportCardStore::new()),
        config.grading.clone(),
    );

    let app = with_service_routes(BulletinState::new(generator))
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "report card service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
