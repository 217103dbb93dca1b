use std::collections::BTreeSet;

use chrono::NaiveTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServiceId(pub u64);

/// A bookable service. `name` is the join key the assistant uses when booking.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub id: ServiceId,
    pub name: String,
    /// Minutes.
    pub duration: u32,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ServicePatch {
    pub name: Option<String>,
    pub duration: Option<u32>,
    pub price: Option<Decimal>,
}

impl Service {
    pub fn apply(&mut self, patch: ServicePatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(duration) = patch.duration {
            self.duration = duration;
        }
        if let Some(price) = patch.price {
            self.price = price;
        }
    }
}

/// Wall-clock opening window, both ends "HH:MM".
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkHours {
    pub start: String,
    pub end: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShopConfig {
    pub shop_name: String,
    pub work_hours: WorkHours,
    /// Weekday indexes, 0 = Sunday .. 6 = Saturday.
    pub work_days: BTreeSet<u8>,
}

impl ShopConfig {
    pub fn is_work_day(&self, weekday_index: u8) -> bool {
        self.work_days.contains(&weekday_index)
    }
}

/// Shop configuration plus the ordered service list, persisted as one blob.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogBundle {
    #[serde(flatten)]
    pub shop: ShopConfig,
    pub services: Vec<Service>,
}

impl Default for CatalogBundle {
    fn default() -> Self {
        Self {
            shop: ShopConfig {
                shop_name: "Il Mio Barbiere".to_string(),
                work_hours: WorkHours { start: "09:00".to_string(), end: "19:00".to_string() },
                work_days: (1..=6).collect(),
            },
            services: vec![
                service(1, "Taglio Classico", 30, 25),
                service(2, "Taglio + Barba", 45, 35),
                service(3, "Barba", 20, 15),
                service(4, "Taglio Bambino", 20, 18),
            ],
        }
    }
}

fn service(id: u64, name: &str, duration: u32, price: i64) -> Service {
    Service { id: ServiceId(id), name: name.to_string(), duration, price: Decimal::from(price) }
}

impl CatalogBundle {
    /// Exact, case-sensitive lookup.
    pub fn find_by_name(&self, name: &str) -> Option<&Service> {
        self.services.iter().find(|service| service.name == name)
    }

    pub fn service_names(&self) -> Vec<&str> {
        self.services.iter().map(|service| service.name.as_str()).collect()
    }

    pub fn next_service_id(&self, candidate: u64) -> ServiceId {
        let highest = self.services.iter().map(|service| service.id.0).max().unwrap_or(0);
        ServiceId(candidate.max(highest + 1))
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.shop.shop_name.trim().is_empty() {
            return Err(DomainError::InvariantViolation("shop name must not be empty".to_string()));
        }

        let start = parse_clock(&self.shop.work_hours.start)?;
        let end = parse_clock(&self.shop.work_hours.end)?;
        if start >= end {
            return Err(DomainError::InvariantViolation(format!(
                "opening time {} must precede closing time {}",
                self.shop.work_hours.start, self.shop.work_hours.end
            )));
        }

        if let Some(day) = self.shop.work_days.iter().find(|day| **day > 6) {
            return Err(DomainError::InvariantViolation(format!(
                "work day index {day} is outside 0..=6"
            )));
        }

        let mut seen_ids = BTreeSet::new();
        let mut seen_names = BTreeSet::new();
        for service in &self.services {
            if service.name.trim().is_empty() {
                return Err(DomainError::InvariantViolation(format!(
                    "service {} has an empty name",
                    service.id.0
                )));
            }
            if !seen_ids.insert(service.id) {
                return Err(DomainError::InvariantViolation(format!(
                    "duplicate service id {}",
                    service.id.0
                )));
            }
            if !seen_names.insert(service.name.as_str()) {
                return Err(DomainError::InvariantViolation(format!(
                    "duplicate service name `{}`",
                    service.name
                )));
            }
            if service.duration == 0 {
                return Err(DomainError::InvariantViolation(format!(
                    "service `{}` must last at least one minute",
                    service.name
                )));
            }
            if service.price < Decimal::ZERO {
                return Err(DomainError::InvariantViolation(format!(
                    "service `{}` has a negative price",
                    service.name
                )));
            }
        }

        Ok(())
    }
}

fn parse_clock(value: &str) -> Result<NaiveTime, DomainError> {
    NaiveTime::parse_from_str(value, "%H:%M").map_err(|_| {
        DomainError::InvariantViolation(format!("`{value}` is not a valid HH:MM time"))
    })
}
