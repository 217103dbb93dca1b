use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::catalog::Service;

/// Creation timestamp in epoch milliseconds, bumped when two bookings share a millisecond.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AppointmentId(pub i64);

impl std::fmt::Display for AppointmentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What the assistant asked to book. Every field is free text taken from the model reply.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRequest {
    pub client_name: String,
    pub service: String,
    pub date: String,
    pub time: String,
}

/// A booked slot. `duration` and `price` are copied from the catalog at booking time and
/// never re-derived, so later catalog edits leave existing appointments untouched.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: AppointmentId,
    pub client_name: String,
    pub service: String,
    /// "YYYY-MM-DD"
    pub date: String,
    /// "HH:MM"
    pub time: String,
    pub duration: u32,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
}

impl Appointment {
    pub fn book(id: AppointmentId, request: BookingRequest, service: &Service) -> Self {
        Self {
            id,
            client_name: request.client_name,
            service: request.service,
            date: request.date,
            time: request.time,
            duration: service.duration,
            price: service.price,
        }
    }
}
