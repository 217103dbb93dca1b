//! Booking assistant runtime.
//!
//! Turns a free-text message into either a stored appointment or a chat reply:
//!
//! 1. **Prompt** (`prompt`) - system context built from the catalog and the appointment book
//! 2. **Completion** (`llm`) - one request to the mediating chat endpoint
//! 3. **Interpretation** (`conversation`) - fenced or bare JSON action, or plain prose
//! 4. **Orchestration** (`runtime`) - lookup, booking, transcript and week navigation
//!
//! # Safety Principle
//!
//! The model only proposes. Duration and price always come from the catalog, and a service
//! name the catalog does not know never produces an appointment.

pub mod conversation;
pub mod llm;
pub mod prompt;
pub mod runtime;

pub use llm::{ChatMessage, ChatRole, CompletionClient, CompletionError, ProxyCompletionClient};
pub use runtime::{
    BookingOrchestrator, StatusSummary, TurnOutcome, TurnRejected, TurnReport,
    MISSING_CREDENTIAL_MESSAGE,
};
