//! JSON API over the booking assistant.
//!
//! Endpoints:
//! - `GET    /api/status`                 - shop name, hours, appointment count, credential state
//! - `POST   /api/chat`                   - submit one message and wait for the reply
//! - `GET    /api/transcript`             - conversation so far
//! - `GET    /api/appointments`           - appointment book in insertion order
//! - `DELETE /api/appointments/{id}`      - remove one appointment (unknown ids are a no-op)
//! - `GET    /api/calendar`               - week currently shown
//! - `POST   /api/calendar/navigate`      - move the week cursor and return the new week
//! - `GET    /api/catalog`                - services and shop settings
//! - `PUT    /api/catalog`                - replace services and shop settings

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use barberia_agent::{BookingOrchestrator, StatusSummary, TurnReport};
use barberia_core::calendar::{self, DaySlot, WeekNavigation};
use barberia_core::domain::appointment::{Appointment, AppointmentId};
use barberia_core::domain::catalog::CatalogBundle;
use barberia_core::domain::conversation::ConversationTurn;
use barberia_core::errors::{ApplicationError, InterfaceError};

#[derive(Clone)]
pub struct ApiState {
    orchestrator: Arc<BookingOrchestrator>,
}

impl ApiState {
    pub fn new(orchestrator: Arc<BookingOrchestrator>) -> Self {
        Self { orchestrator }
    }
}

// ---------------------------------------------------------------------------
// Request / Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct NavigateRequest {
    pub direction: WeekNavigation,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub id: AppointmentId,
    pub removed: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayView {
    pub date: NaiveDate,
    pub label: String,
    pub is_today: bool,
    pub is_work_day: bool,
    pub is_closed: bool,
    pub appointments: Vec<Appointment>,
}

impl From<DaySlot> for DayView {
    fn from(slot: DaySlot) -> Self {
        Self {
            label: slot.label(),
            is_closed: slot.is_closed(),
            date: slot.date,
            is_today: slot.is_today,
            is_work_day: slot.is_work_day,
            appointments: slot.appointments,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
    pub message: String,
    pub correlation_id: String,
}

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ApiError>)>;

fn reject(error: ApplicationError, correlation_id: String) -> (StatusCode, Json<ApiError>) {
    let interface = error.into_interface(correlation_id);
    let status = match &interface {
        InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
        InterfaceError::Conflict { .. } => StatusCode::CONFLICT,
        InterfaceError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        InterfaceError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    };
    warn!(
        event_name = "api.request.rejected",
        correlation_id = %interface.correlation_id(),
        status = status.as_u16(),
        error = %interface,
        "request rejected"
    );
    let body = ApiError {
        error: interface.to_string(),
        message: interface.user_message().to_string(),
        correlation_id: interface.correlation_id().to_string(),
    };
    (status, Json(body))
}

fn correlation_id() -> String {
    Uuid::new_v4().to_string()
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/api/status", get(status))
        .route("/api/chat", post(chat))
        .route("/api/transcript", get(transcript))
        .route("/api/appointments", get(list_appointments))
        .route("/api/appointments/{id}", delete(delete_appointment))
        .route("/api/calendar", get(current_week))
        .route("/api/calendar/navigate", post(navigate_week))
        .route("/api/catalog", get(get_catalog).put(replace_catalog))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn status(State(state): State<ApiState>) -> Json<StatusSummary> {
    Json(state.orchestrator.status().await)
}

/// Waits for the whole turn; a second message while one is pending gets 409.
async fn chat(State(state): State<ApiState>, Json(request): Json<ChatRequest>) -> ApiResult<TurnReport> {
    match state.orchestrator.submit(&request.message).await {
        Ok(report) => Ok(Json(report)),
        Err(rejected) => Err(reject(rejected.into(), correlation_id())),
    }
}

async fn transcript(State(state): State<ApiState>) -> Json<Vec<ConversationTurn>> {
    Json(state.orchestrator.transcript().await)
}

async fn list_appointments(State(state): State<ApiState>) -> Json<Vec<Appointment>> {
    Json(state.orchestrator.appointments().list().await)
}

async fn delete_appointment(
    State(state): State<ApiState>,
    Path(id): Path<i64>,
) -> ApiResult<DeleteResponse> {
    let id = AppointmentId(id);
    let removed = state
        .orchestrator
        .delete_appointment(id)
        .await
        .map_err(|error| reject(error, correlation_id()))?;
    info!(event_name = "api.appointments.delete", appointment_id = %id, removed, "delete handled");
    Ok(Json(DeleteResponse { id, removed }))
}

async fn current_week(State(state): State<ApiState>) -> Json<Vec<DayView>> {
    let week = state.orchestrator.week(calendar::local_today()).await;
    Json(week.into_iter().map(DayView::from).collect())
}

async fn navigate_week(
    State(state): State<ApiState>,
    Json(request): Json<NavigateRequest>,
) -> Json<Vec<DayView>> {
    let week = state.orchestrator.navigate_week(request.direction, calendar::local_today()).await;
    Json(week.into_iter().map(DayView::from).collect())
}

async fn get_catalog(State(state): State<ApiState>) -> Json<CatalogBundle> {
    Json(state.orchestrator.catalog().snapshot().await)
}

async fn replace_catalog(
    State(state): State<ApiState>,
    Json(bundle): Json<CatalogBundle>,
) -> ApiResult<CatalogBundle> {
    let catalog = state.orchestrator.catalog();
    catalog
        .replace(bundle)
        .await
        .map_err(|error| reject(error.into(), correlation_id()))?;
    info!(event_name = "api.catalog.replaced", "catalog replaced");
    Ok(Json(catalog.snapshot().await))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::{
        body::Body,
        extract::{Path, State},
        http::{Request, StatusCode},
        Json,
    };
    use rust_decimal::Decimal;
    use secrecy::SecretString;
    use serde_json::Value;
    use tower::ServiceExt;

    use barberia_agent::{BookingOrchestrator, ChatMessage, CompletionClient, CompletionError};
    use barberia_core::calendar::WeekNavigation;
    use barberia_core::domain::catalog::CatalogBundle;
    use barberia_db::{AppointmentStore, Catalog, InMemoryKeyValueStore, KeyValueStore};

    use super::*;

    struct FixedReply(&'static str);

    #[async_trait]
    impl CompletionClient for FixedReply {
        async fn complete(
            &self,
            _api_key: &SecretString,
            _messages: &[ChatMessage],
        ) -> Result<String, CompletionError> {
            Ok(self.0.to_string())
        }
    }

    const BOOK_BARBA: &str = r#"```json
{"action":"book","appointment":{"clientName":"Marco","service":"Barba","date":"2026-10-20","time":"10:00"}}
```"#;

    async fn state_with(reply: &'static str, credential: Option<&str>) -> ApiState {
        let kv: Arc<dyn KeyValueStore> = Arc::new(InMemoryKeyValueStore::default());
        let catalog = Arc::new(Catalog::load(kv.clone()).await.expect("catalog"));
        let appointments = Arc::new(AppointmentStore::load(kv).await.expect("appointments"));
        let orchestrator = BookingOrchestrator::new(
            catalog,
            appointments,
            Arc::new(FixedReply(reply)),
            credential.map(|key| SecretString::from(key.to_string())),
        );
        ApiState::new(Arc::new(orchestrator))
    }

    async fn state() -> ApiState {
        state_with(BOOK_BARBA, Some("gsk-test")).await
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.expect("body");
        serde_json::from_slice(&bytes).expect("json body")
    }

    #[tokio::test]
    async fn chat_books_and_lists_appointment() {
        let state = state().await;

        let Json(report) = chat(State(state.clone()), Json(ChatRequest { message: "Barba per Marco".to_string() }))
            .await
            .expect("chat should succeed");
        assert!(report.reply.starts_with("✅ Perfetto!"));

        let Json(appointments) = list_appointments(State(state.clone())).await;
        assert_eq!(appointments.len(), 1);
        assert_eq!(appointments[0].price, Decimal::from(15));

        let Json(transcript) = transcript(State(state)).await;
        assert_eq!(transcript.len(), 2);
    }

    #[tokio::test]
    async fn empty_chat_message_is_bad_request() {
        let result = chat(State(state().await), Json(ChatRequest { message: "  ".to_string() })).await;

        let (status, Json(error)) = result.expect_err("empty message");
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(!error.correlation_id.is_empty());
    }

    #[tokio::test]
    async fn status_reports_missing_credential() {
        let Json(summary) = status(State(state_with(BOOK_BARBA, None).await)).await;

        assert_eq!(summary.shop_name, "Il Mio Barbiere");
        assert!(!summary.credential_configured);
        assert_eq!(summary.appointment_count, 0);
    }

    #[tokio::test]
    async fn delete_unknown_appointment_is_a_noop() {
        let Json(response) = delete_appointment(State(state().await), Path(42))
            .await
            .expect("delete should succeed");

        assert!(!response.removed);
    }

    #[tokio::test]
    async fn navigation_returns_seven_days() {
        let state = state().await;

        let Json(next) = navigate_week(
            State(state.clone()),
            Json(NavigateRequest { direction: WeekNavigation::Next }),
        )
        .await;
        assert_eq!(next.len(), 7);
        assert!(next.iter().all(|day| !day.is_today));

        let Json(current) = navigate_week(
            State(state),
            Json(NavigateRequest { direction: WeekNavigation::Current }),
        )
        .await;
        assert_eq!(current.len(), 7);
    }

    #[tokio::test]
    async fn invalid_catalog_is_rejected_and_previous_one_kept() {
        let state = state().await;
        let mut bundle = CatalogBundle::default();
        bundle.services[1].name = bundle.services[0].name.clone();

        let (status, _) = replace_catalog(State(state.clone()), Json(bundle))
            .await
            .expect_err("duplicate names");
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let Json(current) = get_catalog(State(state)).await;
        assert_eq!(current, CatalogBundle::default());
    }

    #[tokio::test]
    async fn router_serves_catalog_in_stored_shape() {
        let app = router(state().await);

        let response = app
            .oneshot(Request::builder().uri("/api/catalog").body(Body::empty()).expect("request"))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["shopName"], "Il Mio Barbiere");
        assert_eq!(body["workHours"]["start"], "09:00");
        assert_eq!(body["services"][2]["name"], "Barba");
    }

    #[tokio::test]
    async fn router_deletes_booked_appointment() {
        let state = state().await;
        let app = router(state.clone());
        let Json(report) = chat(State(state.clone()), Json(ChatRequest { message: "prenota".to_string() }))
            .await
            .expect("chat");
        let barberia_agent::TurnOutcome::Booked { appointment } = report.outcome else {
            panic!("expected booking");
        };

        let response = app
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri(format!("/api/appointments/{}", appointment.id))
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["removed"], true);
        assert!(state.orchestrator.appointments().is_empty().await);
    }

    #[tokio::test]
    async fn router_rejects_unknown_navigation_direction() {
        let app = router(state().await);

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/calendar/navigate")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"direction":"sideways"}"#))
                    .expect("request"),
            )
            .await
            .expect("response");

        assert!(response.status().is_client_error());
    }
}
