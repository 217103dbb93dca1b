pub mod calendar;
pub mod config;
pub mod domain;
pub mod errors;

pub use calendar::{DaySlot, WeekCursor, WeekNavigation};
pub use domain::appointment::{Appointment, AppointmentId, BookingRequest};
pub use domain::catalog::{CatalogBundle, Service, ServiceId, ServicePatch, ShopConfig, WorkHours};
pub use domain::conversation::{ConversationTurn, TurnRole};
pub use errors::{ApplicationError, DomainError, InterfaceError};
