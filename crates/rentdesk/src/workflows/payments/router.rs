use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use base64::Engine as _;
use chrono::{Local, NaiveDate, Utc};
use serde::Deserialize;
use serde_json::json;

use super::domain::{LinkId, RentId, ScreenshotUpload};
use super::repository::{
    AuditLog, PaymentLinkRepository, RentRepository, ScreenshotStore, TenantDirectory,
};
use super::service::{IssueLinkRequest, PaymentWorkflowError, PaymentWorkflowService};

/// Router builder exposing the payment workflow endpoints.
pub fn payment_router<D, R, P, A, S>(service: Arc<PaymentWorkflowService<D, R, P, A, S>>) -> Router
where
    D: TenantDirectory + 'static,
    R: RentRepository + 'static,
    P: PaymentLinkRepository + 'static,
    A: AuditLog + 'static,
    S: ScreenshotStore + 'static,
{
    // The verify route carries a base64 screenshot, so it needs more room
    // than axum's default body limit allows.
    let verify_body_limit = service.verify_body_limit();
    Router::new()
        .route(
            "/api/v1/payments/links",
            post(issue_handler::<D, R, P, A, S>).get(list_handler::<D, R, P, A, S>),
        )
        .route(
            "/api/v1/payments/links/:link_id",
            get(view_handler::<D, R, P, A, S>).delete(delete_handler::<D, R, P, A, S>),
        )
        .route(
            "/api/v1/payments/links/:link_id/verify",
            post(verify_handler::<D, R, P, A, S>).layer(DefaultBodyLimit::max(verify_body_limit)),
        )
        .route(
            "/payment-verification",
            get(public_resolve_handler::<D, R, P, A, S>),
        )
        .route(
            "/api/v1/rents/mark-paid",
            post(mark_paid_handler::<D, R, P, A, S>),
        )
        .route(
            "/api/v1/rents/reminders",
            post(reminders_handler::<D, R, P, A, S>),
        )
        .with_state(service)
}

fn error_response(err: PaymentWorkflowError) -> Response {
    let status = err.status_code();
    let body = axum::Json(json!({ "error": err.to_string() }));
    (status, body).into_response()
}

pub(crate) async fn issue_handler<D, R, P, A, S>(
    State(service): State<Arc<PaymentWorkflowService<D, R, P, A, S>>>,
    axum::Json(request): axum::Json<IssueLinkRequest>,
) -> Response
where
    D: TenantDirectory + 'static,
    R: RentRepository + 'static,
    P: PaymentLinkRepository + 'static,
    A: AuditLog + 'static,
    S: ScreenshotStore + 'static,
{
    match service.issue_link(request, Utc::now()) {
        Ok(issued) => (StatusCode::CREATED, axum::Json(issued)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn list_handler<D, R, P, A, S>(
    State(service): State<Arc<PaymentWorkflowService<D, R, P, A, S>>>,
) -> Response
where
    D: TenantDirectory + 'static,
    R: RentRepository + 'static,
    P: PaymentLinkRepository + 'static,
    A: AuditLog + 'static,
    S: ScreenshotStore + 'static,
{
    match service.list_links(Utc::now()) {
        Ok(views) => (StatusCode::OK, axum::Json(views)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn view_handler<D, R, P, A, S>(
    State(service): State<Arc<PaymentWorkflowService<D, R, P, A, S>>>,
    Path(link_id): Path<String>,
) -> Response
where
    D: TenantDirectory + 'static,
    R: RentRepository + 'static,
    P: PaymentLinkRepository + 'static,
    A: AuditLog + 'static,
    S: ScreenshotStore + 'static,
{
    match service.link_view(&LinkId(link_id), Utc::now()) {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn delete_handler<D, R, P, A, S>(
    State(service): State<Arc<PaymentWorkflowService<D, R, P, A, S>>>,
    Path(link_id): Path<String>,
) -> Response
where
    D: TenantDirectory + 'static,
    R: RentRepository + 'static,
    P: PaymentLinkRepository + 'static,
    A: AuditLog + 'static,
    S: ScreenshotStore + 'static,
{
    match service.delete_link(&LinkId(link_id)) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => error_response(err),
    }
}

/// JSON body for the verification receiver; the screenshot travels base64
/// encoded alongside its declared media type.
#[derive(Debug, Deserialize)]
pub(crate) struct VerifyRequestBody {
    pub(crate) file_name: String,
    pub(crate) media_type: String,
    pub(crate) data: String,
    #[serde(default)]
    pub(crate) notes: Option<String>,
}

pub(crate) async fn verify_handler<D, R, P, A, S>(
    State(service): State<Arc<PaymentWorkflowService<D, R, P, A, S>>>,
    Path(link_id): Path<String>,
    axum::Json(body): axum::Json<VerifyRequestBody>,
) -> Response
where
    D: TenantDirectory + 'static,
    R: RentRepository + 'static,
    P: PaymentLinkRepository + 'static,
    A: AuditLog + 'static,
    S: ScreenshotStore + 'static,
{
    let bytes = match base64::engine::general_purpose::STANDARD.decode(body.data.as_bytes()) {
        Ok(bytes) => bytes,
        Err(_) => {
            let payload = json!({ "error": "screenshot data is not valid base64" });
            return (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response();
        }
    };

    let upload = ScreenshotUpload {
        file_name: body.file_name,
        media_type: body.media_type,
        bytes,
    };

    match service.verify_link(&LinkId(link_id), upload, body.notes, Utc::now()) {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(err) => error_response(err),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct PublicResolveQuery {
    pub(crate) id: String,
}

/// Backs the public, unauthenticated `/payment-verification` page reached
/// through the shared URL.
pub(crate) async fn public_resolve_handler<D, R, P, A, S>(
    State(service): State<Arc<PaymentWorkflowService<D, R, P, A, S>>>,
    Query(query): Query<PublicResolveQuery>,
) -> Response
where
    D: TenantDirectory + 'static,
    R: RentRepository + 'static,
    P: PaymentLinkRepository + 'static,
    A: AuditLog + 'static,
    S: ScreenshotStore + 'static,
{
    match service.public_view(&LinkId(query.id), Utc::now()) {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(err) => error_response(err),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct MarkPaidRequestBody {
    pub(crate) rent_ids: Vec<RentId>,
    #[serde(default)]
    pub(crate) paid_on: Option<NaiveDate>,
}

pub(crate) async fn mark_paid_handler<D, R, P, A, S>(
    State(service): State<Arc<PaymentWorkflowService<D, R, P, A, S>>>,
    axum::Json(body): axum::Json<MarkPaidRequestBody>,
) -> Response
where
    D: TenantDirectory + 'static,
    R: RentRepository + 'static,
    P: PaymentLinkRepository + 'static,
    A: AuditLog + 'static,
    S: ScreenshotStore + 'static,
{
    let today = body.paid_on.unwrap_or_else(|| Local::now().date_naive());
    match service.mark_paid_bulk(&body.rent_ids, today) {
        Ok(outcome) => (StatusCode::OK, axum::Json(outcome)).into_response(),
        Err(err) => error_response(err),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct RemindersRequestBody {
    pub(crate) rent_ids: Vec<RentId>,
}

pub(crate) async fn reminders_handler<D, R, P, A, S>(
    State(service): State<Arc<PaymentWorkflowService<D, R, P, A, S>>>,
    axum::Json(body): axum::Json<RemindersRequestBody>,
) -> Response
where
    D: TenantDirectory + 'static,
    R: RentRepository + 'static,
    P: PaymentLinkRepository + 'static,
    A: AuditLog + 'static,
    S: ScreenshotStore + 'static,
{
    match service.send_reminders(&body.rent_ids, Utc::now()) {
        Ok(reminders) => (StatusCode::OK, axum::Json(reminders)).into_response(),
        Err(err) => error_response(err),
    }
}
