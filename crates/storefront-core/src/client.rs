use std::sync::Arc;

use anyhow::Result;

use crate::api::{Gateway, GatewayConfig};
use crate::auth::{CredentialStore, SessionState};
use crate::catalog::{CategoryManager, ProductCatalog};
use crate::config::Config;

/// One backend connection with its session and catalog containers.
///
/// All containers share the same gateway, so a 401 seen by any of them ends
/// the session for all of them.
pub struct Storefront {
    gateway: Arc<Gateway>,
    pub session: SessionState,
    pub products: ProductCatalog,
    pub categories: CategoryManager,
}

impl Storefront {
    pub fn new(config: &GatewayConfig, credentials: CredentialStore) -> Result<Self> {
        let gateway = Arc::new(Gateway::new(config, credentials)?);
        Ok(Self {
            session: SessionState::new(gateway.clone()),
            products: ProductCatalog::new(gateway.clone()),
            categories: CategoryManager::new(gateway.clone()),
            gateway,
        })
    }

    /// Build from a loaded `Config` and restore any stored session.
    pub fn from_config(config: &Config) -> Result<Self> {
        let storefront = Self::new(&config.gateway_config(), config.credential_store()?)?;
        storefront.session.initialize()?;
        Ok(storefront)
    }

    pub fn gateway(&self) -> &Arc<Gateway> {
        &self.gateway
    }
}
