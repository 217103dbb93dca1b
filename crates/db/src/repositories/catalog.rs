use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::RwLock;
use tracing::{info, warn};

use barberia_core::domain::catalog::{CatalogBundle, Service, ServiceId, ServicePatch, ShopConfig};
use barberia_core::errors::DomainError;

use super::{load_json, save_json, KeyValueStore, RepositoryError, CATALOG_KEY};

/// Fields for a new service; the defaults match the "add service" button of the settings page.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServiceDraft {
    pub name: String,
    pub duration: u32,
    pub price: Decimal,
}

impl Default for ServiceDraft {
    fn default() -> Self {
        Self { name: "Nuovo Servizio".to_string(), duration: 30, price: Decimal::from(20) }
    }
}

/// Service list plus shop configuration, persisted as one blob under [`CATALOG_KEY`].
///
/// Reads always reflect the latest successful mutation. Renaming or deleting a service never
/// touches stored appointments: they reference services by name only.
pub struct Catalog {
    store: Arc<dyn KeyValueStore>,
    bundle: RwLock<CatalogBundle>,
}

impl Catalog {
    pub async fn load(store: Arc<dyn KeyValueStore>) -> Result<Self, RepositoryError> {
        let bundle = match load_json::<CatalogBundle>(store.as_ref(), CATALOG_KEY).await? {
            Some(bundle) => bundle,
            None => {
                info!(event_name = "catalog.defaults", "no stored catalog, using defaults");
                CatalogBundle::default()
            }
        };
        Ok(Self { store, bundle: RwLock::new(bundle) })
    }

    pub async fn snapshot(&self) -> CatalogBundle {
        self.bundle.read().await.clone()
    }

    pub async fn services(&self) -> Vec<Service> {
        self.bundle.read().await.services.clone()
    }

    pub async fn find_by_name(&self, name: &str) -> Option<Service> {
        self.bundle.read().await.find_by_name(name).cloned()
    }

    pub async fn shop_config(&self) -> ShopConfig {
        self.bundle.read().await.shop.clone()
    }

    pub async fn add_service(&self, draft: ServiceDraft) -> Result<Service, RepositoryError> {
        let candidate = u64::try_from(Utc::now().timestamp_millis()).unwrap_or_default();
        self.mutate(|bundle| {
            let service = Service {
                id: bundle.next_service_id(candidate),
                name: draft.name,
                duration: draft.duration,
                price: draft.price,
            };
            bundle.services.push(service.clone());
            Ok(service)
        })
        .await
    }

    pub async fn update_service(
        &self,
        id: ServiceId,
        patch: ServicePatch,
    ) -> Result<Service, RepositoryError> {
        self.mutate(|bundle| {
            let service = bundle
                .services
                .iter_mut()
                .find(|service| service.id == id)
                .ok_or(DomainError::ServiceNotFound(id.0))?;
            service.apply(patch);
            Ok(service.clone())
        })
        .await
    }

    pub async fn delete_service(&self, id: ServiceId) -> Result<(), RepositoryError> {
        self.mutate(|bundle| {
            let before = bundle.services.len();
            bundle.services.retain(|service| service.id != id);
            if bundle.services.len() == before {
                return Err(DomainError::ServiceNotFound(id.0));
            }
            Ok(())
        })
        .await
    }

    pub async fn update_shop(&self, shop: ShopConfig) -> Result<(), RepositoryError> {
        self.mutate(|bundle| {
            bundle.shop = shop;
            Ok(())
        })
        .await
    }

    pub async fn replace(&self, replacement: CatalogBundle) -> Result<(), RepositoryError> {
        self.mutate(|bundle| {
            *bundle = replacement;
            Ok(())
        })
        .await
    }

    /// Applies `change` to a copy, validates and persists it, then publishes the copy.
    async fn mutate<T, F>(&self, change: F) -> Result<T, RepositoryError>
    where
        F: FnOnce(&mut CatalogBundle) -> Result<T, DomainError>,
    {
        let mut bundle = self.bundle.write().await;
        let mut updated = bundle.clone();
        let outcome = change(&mut updated)?;
        updated.validate()?;

        if let Err(error) = save_json(self.store.as_ref(), CATALOG_KEY, &updated).await {
            warn!(
                event_name = "catalog.persist_failed",
                error = %error,
                "catalog could not be written"
            );
            return Err(error);
        }

        *bundle = updated;
        info!(
            event_name = "catalog.saved",
            services = bundle.services.len(),
            "catalog saved"
        );
        Ok(outcome)
    }
}
