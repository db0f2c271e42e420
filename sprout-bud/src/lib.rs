//! Bud - per-tenant service configuration for Sprout
//!
//! Bud stores per-tenant overrides of service driver configuration, keyed by
//! the (tenancy, tenant, service, name) tuple, and supplies the driver
//! creators that build tenant-scoped database connections, filesystem disks,
//! cache stores, mailer transports, broadcast connections, and auth
//! user-providers from it - with cyclic-driver protection.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use sprout_bud::*;
//! use std::sync::Arc;
//!
//! // 1. Configure a store.
//! let mut config = BudConfig::default();
//! config.default_store = Some("tenants".to_string());
//! config.stores.insert("tenants".to_string(), StoreConfig {
//!     driver: "filesystem".to_string(),
//!     disk: Some("/var/lib/app/config".to_string()),
//!     ..StoreConfig::default()
//! });
//!
//! let bud = Arc::new(BudManager::new(config));
//! bud.register_driver("filesystem", FilesystemConfigStore::factory(None));
//!
//! // 2. Wrap your connection manager in a creator.
//! let creator = Arc::new(database_connection_creator(Arc::clone(&bud), MyConnections::new()));
//!
//! // 3. Build tenant-scoped drivers on demand.
//! let connection = creator.create(&sprout, "tenant-db", &base_config).await?;
//! ```

pub mod cipher;
pub mod creators;
pub mod cyclic;
pub mod database;
pub mod error;
pub mod filesystem;
pub mod manager;
pub mod store;

pub use cipher::{ConfigCipher, SignedBlobCodec};
pub use creators::{
    auth_provider_creator, broadcast_connection_creator, cache_store_creator,
    database_connection_creator, filesystem_disk_creator, mail_transport_creator,
    CreatorOverride, DriverCreator, FreshBuilder,
};
pub use cyclic::{DriverGuard, DriverGuardScope};
pub use database::{ConfigRecordSource, DatabaseConfigStore};
pub use error::{BudError, BudResult};
pub use filesystem::FilesystemConfigStore;
pub use manager::{BudConfig, BudManager, MemoryConfigStore, StoreConfig, StoreFactory};
pub use store::{ConfigKey, ConfigMap, ConfigStore};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::creators::{CreatorOverride, DriverCreator, FreshBuilder};
    pub use crate::error::{BudError, BudResult};
    pub use crate::manager::{BudConfig, BudManager, StoreConfig};
    pub use crate::store::{ConfigKey, ConfigMap, ConfigStore};
}
