use crate::cli::ServeArgs;
use crate::infra::{AppState, InMemoryCollaborators};
use crate::routes::with_document_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use subsidy_intake::config::AppConfig;
use subsidy_intake::documents::DocumentService;
use subsidy_intake::error::AppError;
use subsidy_intake::telemetry;
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

    let collaborators = InMemoryCollaborators::new();
    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
        facts: collaborators.facts.clone(),
    };

    let document_service = Arc::new(DocumentService::new(
        collaborators.stores,
        config.upload.clone(),
        config.progress.clone(),
    ));

    let app = with_document_routes(document_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        max_file_bytes = config.upload.max_file_bytes,
        max_concurrent = config.upload.max_concurrent,
        "document intake service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
