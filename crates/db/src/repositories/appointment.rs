use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{info, warn};

use barberia_core::domain::appointment::{Appointment, AppointmentId};
use barberia_core::errors::DomainError;

use super::{load_json, save_json, KeyValueStore, RepositoryError, APPOINTMENTS_KEY};

/// Authoritative appointment set, kept in insertion order.
///
/// Every mutation re-serialises the whole list under [`APPOINTMENTS_KEY`]. The in-memory
/// list only changes once that write has succeeded, so a failed write loses nothing and
/// leaves the store exactly as it was. No overlap or double-booking checks are made.
pub struct AppointmentStore {
    store: Arc<dyn KeyValueStore>,
    appointments: RwLock<Vec<Appointment>>,
}

impl AppointmentStore {
    pub async fn load(store: Arc<dyn KeyValueStore>) -> Result<Self, RepositoryError> {
        let appointments = load_json::<Vec<Appointment>>(store.as_ref(), APPOINTMENTS_KEY)
            .await?
            .unwrap_or_default();
        info!(
            event_name = "store.appointments.loaded",
            count = appointments.len(),
            "appointment store loaded"
        );
        Ok(Self { store, appointments: RwLock::new(appointments) })
    }

    pub async fn list(&self) -> Vec<Appointment> {
        self.appointments.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.appointments.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.appointments.read().await.is_empty()
    }

    /// Creation-time identifier, strictly greater than every stored one.
    pub async fn next_id(&self) -> Result<AppointmentId, RepositoryError> {
        let now = Utc::now().timestamp_millis();
        let highest = self.appointments.read().await.iter().map(|a| a.id.0).max();
        match highest {
            Some(highest) if highest >= now => {
                highest.checked_add(1).map(AppointmentId).ok_or_else(|| {
                    RepositoryError::Domain(DomainError::InvariantViolation(
                        "appointment identifiers exhausted".to_string(),
                    ))
                })
            }
            _ => Ok(AppointmentId(now)),
        }
    }

    pub async fn add(&self, appointment: Appointment) -> Result<(), RepositoryError> {
        let mut appointments = self.appointments.write().await;
        let mut updated = appointments.clone();
        let id = appointment.id;
        updated.push(appointment);

        self.persist(&updated).await?;
        *appointments = updated;
        info!(
            event_name = "store.appointments.added",
            appointment_id = %id,
            count = appointments.len(),
            "appointment stored"
        );
        Ok(())
    }

    /// Returns whether an appointment was removed. An unknown id is a no-op and writes nothing.
    pub async fn remove(&self, id: AppointmentId) -> Result<bool, RepositoryError> {
        let mut appointments = self.appointments.write().await;
        if !appointments.iter().any(|appointment| appointment.id == id) {
            return Ok(false);
        }

        let updated = appointments
            .iter()
            .filter(|appointment| appointment.id != id)
            .cloned()
            .collect::<Vec<_>>();
        self.persist(&updated).await?;
        *appointments = updated;
        info!(
            event_name = "store.appointments.removed",
            appointment_id = %id,
            count = appointments.len(),
            "appointment removed"
        );
        Ok(true)
    }

    async fn persist(&self, appointments: &[Appointment]) -> Result<(), RepositoryError> {
        save_json(self.store.as_ref(), APPOINTMENTS_KEY, appointments).await.map_err(|error| {
            warn!(
                event_name = "store.appointments.persist_failed",
                error = %error,
                "appointment list could not be written"
            );
            error
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;
    use rust_decimal::Decimal;

    use barberia_core::domain::appointment::{Appointment, AppointmentId};

    use super::AppointmentStore;
    use crate::repositories::{
        InMemoryKeyValueStore, KeyValueStore, RepositoryError, APPOINTMENTS_KEY,
    };

    fn appointment(id: i64, client: &str) -> Appointment {
        Appointment {
            id: AppointmentId(id),
            client_name: client.to_string(),
            service: "Taglio Classico".to_string(),
            date: "2026-10-19".to_string(),
            time: "10:00".to_string(),
            duration: 30,
            price: Decimal::from(25),
        }
    }

    /// Reads pass through; writes fail while `fail_writes` is set.
    #[derive(Default)]
    struct FlakyStore {
        inner: InMemoryKeyValueStore,
        fail_writes: AtomicBool,
    }

    #[async_trait]
    impl KeyValueStore for FlakyStore {
        async fn get(&self, key: &str) -> Result<Option<String>, RepositoryError> {
            self.inner.get(key).await
        }

        async fn set(&self, key: &str, value: &str) -> Result<(), RepositoryError> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(RepositoryError::Unavailable("disk full".to_string()));
            }
            self.inner.set(key, value).await
        }
    }

    #[tokio::test]
    async fn add_then_list_preserves_insertion_order() {
        let store = AppointmentStore::load(Arc::new(InMemoryKeyValueStore::default()))
            .await
            .expect("load");

        store.add(appointment(20, "Marco")).await.expect("add");
        store.add(appointment(10, "Anna")).await.expect("add");

        let clients =
            store.list().await.into_iter().map(|a| a.client_name).collect::<Vec<_>>();
        assert_eq!(clients, vec!["Marco", "Anna"]);
    }

    #[tokio::test]
    async fn remove_deletes_and_unknown_id_is_noop() {
        let store = AppointmentStore::load(Arc::new(InMemoryKeyValueStore::default()))
            .await
            .expect("load");
        store.add(appointment(1, "Marco")).await.expect("add");
        store.add(appointment(2, "Anna")).await.expect("add");

        assert!(store.remove(AppointmentId(1)).await.expect("remove"));
        assert!(!store.list().await.iter().any(|a| a.id == AppointmentId(1)));

        let before = store.list().await;
        assert!(!store.remove(AppointmentId(99)).await.expect("remove missing"));
        assert_eq!(store.list().await, before);
    }

    #[tokio::test]
    async fn mutations_persist_full_list_and_reload() {
        let kv: Arc<dyn KeyValueStore> = Arc::new(InMemoryKeyValueStore::default());
        let store = AppointmentStore::load(kv.clone()).await.expect("load");
        store.add(appointment(1, "Marco")).await.expect("add");
        store.add(appointment(2, "Anna")).await.expect("add");
        store.remove(AppointmentId(1)).await.expect("remove");

        let raw = kv.get(APPOINTMENTS_KEY).await.expect("get").expect("written");
        assert!(raw.contains("\"clientName\":\"Anna\""));
        assert!(!raw.contains("Marco"));

        let reloaded = AppointmentStore::load(kv).await.expect("reload");
        assert_eq!(reloaded.list().await, vec![appointment(2, "Anna")]);
    }

    #[tokio::test]
    async fn failed_write_leaves_store_unchanged() {
        let kv = Arc::new(FlakyStore::default());
        let store = AppointmentStore::load(kv.clone()).await.expect("load");
        store.add(appointment(1, "Marco")).await.expect("add");

        kv.fail_writes.store(true, Ordering::SeqCst);
        let error = store.add(appointment(2, "Anna")).await.expect_err("write should fail");
        assert!(matches!(error, RepositoryError::Unavailable(_)));
        assert!(store.remove(AppointmentId(1)).await.is_err());

        assert_eq!(store.list().await, vec![appointment(1, "Marco")]);
    }

    #[tokio::test]
    async fn corrupt_blob_is_reported_at_load() {
        let kv = Arc::new(InMemoryKeyValueStore::with_entry(APPOINTMENTS_KEY, "not json"));
        let error = AppointmentStore::load(kv).await.err().expect("decode failure");
        assert!(matches!(error, RepositoryError::Decode { ref key, .. } if key == APPOINTMENTS_KEY));
    }

    #[tokio::test]
    async fn next_id_is_strictly_increasing() {
        let store = AppointmentStore::load(Arc::new(InMemoryKeyValueStore::default()))
            .await
            .expect("load");
        let far_future = AppointmentId(i64::MAX - 10);
        store.add(appointment(far_future.0, "Marco")).await.expect("add");

        assert_eq!(store.next_id().await.expect("next id"), AppointmentId(i64::MAX - 9));
    }

    #[tokio::test]
    async fn next_id_reports_exhausted_identifiers_instead_of_wrapping() {
        let kv = Arc::new(InMemoryKeyValueStore::default());
        let store = AppointmentStore::load(kv).await.expect("load");
        store.add(appointment(i64::MAX, "Marco")).await.expect("add");

        let error = store.next_id().await.expect_err("no identifier above i64::MAX");
        assert!(matches!(error, RepositoryError::Domain(_)));
        assert_eq!(store.len().await, 1);
    }
}
