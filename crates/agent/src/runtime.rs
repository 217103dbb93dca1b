use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};
use uuid::Uuid;

use barberia_core::calendar::{self, DaySlot, WeekCursor, WeekNavigation};
use barberia_core::domain::appointment::{Appointment, AppointmentId, BookingRequest};
use barberia_core::domain::catalog::WorkHours;
use barberia_core::domain::conversation::ConversationTurn;
use barberia_core::errors::ApplicationError;
use barberia_db::{AppointmentStore, Catalog};

use crate::conversation::{interpret_reply, ModelAction, ReplyInterpretation};
use crate::llm::{CompletionClient, CompletionError};
use crate::prompt;

pub const DEFAULT_TURN_TIMEOUT: Duration = Duration::from_secs(30);

pub const MISSING_CREDENTIAL_MESSAGE: &str = "⚠️ Errore: Chiave API non configurata. \
     Vai in \"Configurazione\" e inserisci la tua API Key.";

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TurnOutcome {
    Booked { appointment: Appointment },
    Replied,
    MissingCredential,
    RemoteFailed,
    UnknownService { requested: String },
    PersistenceFailed,
}

impl TurnOutcome {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Booked { .. } => "booked",
            Self::Replied => "replied",
            Self::MissingCredential => "missing_credential",
            Self::RemoteFailed => "remote_failed",
            Self::UnknownService { .. } => "unknown_service",
            Self::PersistenceFailed => "persistence_failed",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TurnReport {
    pub correlation_id: String,
    pub reply: String,
    pub outcome: TurnOutcome,
}

#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum TurnRejected {
    #[error("message is empty")]
    EmptyMessage,
    #[error("a booking turn is already in progress")]
    Busy,
}

impl From<TurnRejected> for ApplicationError {
    fn from(value: TurnRejected) -> Self {
        match value {
            TurnRejected::EmptyMessage => Self::InvalidInput(value.to_string()),
            TurnRejected::Busy => Self::TurnInFlight,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StatusSummary {
    pub shop_name: String,
    pub work_hours: WorkHours,
    pub appointment_count: usize,
    pub credential_configured: bool,
}

/// Owns the conversation and is the only writer of the appointment book.
///
/// One turn runs at a time: a message submitted while another turn is pending is rejected
/// with [`TurnRejected::Busy`] and leaves the transcript untouched. The transcript lives for
/// the lifetime of the process.
pub struct BookingOrchestrator {
    catalog: Arc<Catalog>,
    appointments: Arc<AppointmentStore>,
    completion: Arc<dyn CompletionClient>,
    credential: Option<SecretString>,
    turn_timeout: Duration,
    transcript: RwLock<Vec<ConversationTurn>>,
    turn_gate: Mutex<()>,
    cursor: Mutex<WeekCursor>,
}

impl BookingOrchestrator {
    pub fn new(
        catalog: Arc<Catalog>,
        appointments: Arc<AppointmentStore>,
        completion: Arc<dyn CompletionClient>,
        credential: Option<SecretString>,
    ) -> Self {
        let credential = credential.filter(|key| !key.expose_secret().trim().is_empty());
        Self {
            catalog,
            appointments,
            completion,
            credential,
            turn_timeout: DEFAULT_TURN_TIMEOUT,
            transcript: RwLock::new(Vec::new()),
            turn_gate: Mutex::new(()),
            cursor: Mutex::new(WeekCursor::new(calendar::local_today())),
        }
    }

    pub fn with_turn_timeout(mut self, turn_timeout: Duration) -> Self {
        self.turn_timeout = turn_timeout;
        self
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn appointments(&self) -> &Arc<AppointmentStore> {
        &self.appointments
    }

    pub fn has_credential(&self) -> bool {
        self.credential.is_some()
    }

    pub fn is_turn_in_flight(&self) -> bool {
        self.turn_gate.try_lock().is_err()
    }

    pub async fn transcript(&self) -> Vec<ConversationTurn> {
        self.transcript.read().await.clone()
    }

    pub async fn status(&self) -> StatusSummary {
        let shop = self.catalog.shop_config().await;
        StatusSummary {
            shop_name: shop.shop_name,
            work_hours: shop.work_hours,
            appointment_count: self.appointments.len().await,
            credential_configured: self.has_credential(),
        }
    }

    /// Runs one booking turn for `text`.
    pub async fn submit(&self, text: &str) -> Result<TurnReport, TurnRejected> {
        if text.trim().is_empty() {
            return Err(TurnRejected::EmptyMessage);
        }
        let _turn = self.turn_gate.try_lock().map_err(|_| TurnRejected::Busy)?;
        let correlation_id = Uuid::new_v4().to_string();

        let (outcome, reply) = match self.credential.as_ref() {
            None => {
                warn!(
                    event_name = "agent.turn.missing_credential",
                    correlation_id = %correlation_id,
                    "turn skipped: no api credential configured"
                );
                (TurnOutcome::MissingCredential, MISSING_CREDENTIAL_MESSAGE.to_string())
            }
            Some(api_key) => {
                self.transcript.write().await.push(ConversationTurn::user(text));
                self.run_turn(api_key, text, &correlation_id).await
            }
        };

        self.transcript.write().await.push(ConversationTurn::assistant(reply.clone()));
        info!(
            event_name = "agent.turn.completed",
            correlation_id = %correlation_id,
            outcome = outcome.kind(),
            "booking turn completed"
        );
        Ok(TurnReport { correlation_id, reply, outcome })
    }

    async fn run_turn(
        &self,
        api_key: &SecretString,
        text: &str,
        correlation_id: &str,
    ) -> (TurnOutcome, String) {
        let catalog = self.catalog.snapshot().await;
        let appointments = self.appointments.list().await;
        let messages = prompt::turn_messages(&catalog, &appointments, text);
        info!(
            event_name = "agent.turn.awaiting_model",
            correlation_id = %correlation_id,
            appointments = appointments.len(),
            services = catalog.services.len(),
            "requesting model reply"
        );

        let completion = self.completion.complete(api_key, &messages);
        let raw = match tokio::time::timeout(self.turn_timeout, completion).await {
            Ok(Ok(raw)) => raw,
            Ok(Err(error)) => return remote_failure(&error, correlation_id),
            Err(_) => {
                let error = CompletionError::Timeout(self.turn_timeout.as_secs());
                return remote_failure(&error, correlation_id);
            }
        };

        match interpret_reply(&raw) {
            ReplyInterpretation::Action(ModelAction::Book { appointment }) => {
                self.book(appointment, correlation_id).await
            }
            ReplyInterpretation::Action(ModelAction::Reply { message }) => {
                (TurnOutcome::Replied, message)
            }
            ReplyInterpretation::Unstructured(text) => {
                info!(
                    event_name = "agent.turn.unstructured_reply",
                    correlation_id = %correlation_id,
                    "model reply was not a structured action, showing it verbatim"
                );
                (TurnOutcome::Replied, text)
            }
        }
    }

    async fn book(&self, request: BookingRequest, correlation_id: &str) -> (TurnOutcome, String) {
        let Some(service) = self.catalog.find_by_name(&request.service).await else {
            let names = self.catalog.snapshot().await.service_names().join(", ");
            warn!(
                event_name = "agent.turn.unknown_service",
                correlation_id = %correlation_id,
                requested = %request.service,
                "model booked a service that is not in the catalog"
            );
            let reply = format!(
                "❌ Errore: Servizio \"{}\" non trovato. Servizi disponibili: {names}",
                request.service
            );
            return (TurnOutcome::UnknownService { requested: request.service }, reply);
        };

        let saved = match self.appointments.next_id().await {
            Ok(id) => {
                let appointment = Appointment::book(id, request, &service);
                self.appointments.add(appointment.clone()).await.map(|()| appointment)
            }
            Err(error) => Err(error),
        };
        let appointment = match saved {
            Ok(appointment) => appointment,
            Err(error) => {
                warn!(
                    event_name = "agent.turn.persist_failed",
                    correlation_id = %correlation_id,
                    error = %error,
                    "booking could not be saved"
                );
                let reply = format!("❌ Errore nel salvataggio della prenotazione: {error}");
                return (TurnOutcome::PersistenceFailed, reply);
            }
        };

        let reply = format!(
            "✅ Perfetto! Ho prenotato {} per {} il {} alle {}. Vai nel Calendario per vederlo!",
            appointment.service, appointment.client_name, appointment.date, appointment.time
        );
        (TurnOutcome::Booked { appointment }, reply)
    }

    /// An unknown id is a successful no-op.
    pub async fn delete_appointment(&self, id: AppointmentId) -> Result<bool, ApplicationError> {
        Ok(self.appointments.remove(id).await?)
    }

    pub async fn week(&self, today: NaiveDate) -> Vec<DaySlot> {
        let reference = self.cursor.lock().await.reference();
        self.project(reference, today).await
    }

    pub async fn navigate_week(&self, direction: WeekNavigation, today: NaiveDate) -> Vec<DaySlot> {
        let reference = self.cursor.lock().await.navigate(direction, today);
        self.project(reference, today).await
    }

    async fn project(&self, reference: NaiveDate, today: NaiveDate) -> Vec<DaySlot> {
        let shop = self.catalog.shop_config().await;
        let appointments = self.appointments.list().await;
        calendar::project(reference, today, &appointments, &shop)
    }
}

fn remote_failure(error: &CompletionError, correlation_id: &str) -> (TurnOutcome, String) {
    warn!(
        event_name = "agent.turn.remote_failed",
        correlation_id = %correlation_id,
        error = %error,
        "completion failed"
    );
    let reply = format!("❌ Errore: {}. Verifica la tua API Key.", error.reason());
    (TurnOutcome::RemoteFailed, reply)
}
