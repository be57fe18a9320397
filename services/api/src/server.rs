use crate::cli::ServeArgs;
use crate::infra::{
    AppState, InMemoryAuditLog, InMemoryPaymentLinkRepository, InMemoryRentRepository,
    InMemoryScreenshotStore, InMemoryTenantDirectory,
};
use crate::routes::with_payment_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use rentdesk::config::AppConfig;
use rentdesk::error::AppError;
use rentdesk::telemetry;
use rentdesk::workflows::payments::PaymentWorkflowService;
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

    let payment_service = Arc::new(PaymentWorkflowService::new(
        Arc::new(InMemoryTenantDirectory::default()),
        Arc::new(InMemoryRentRepository::default()),
        Arc::new(InMemoryPaymentLinkRepository::default()),
        Arc::new(InMemoryAuditLog::default()),
        Arc::new(InMemoryScreenshotStore::default()),
        config.payment_links.clone(),
    ));

    let app = with_payment_routes(payment_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "rent back-office service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
