//! Application bootstrap shared by the server binary and the CLI.

use std::sync::Arc;

use anyhow::Context;
use bookstore_kernel::{
    settings::{DatabaseSettings, Settings, StoreDriver},
    InitCtx, ModuleRegistry,
};

use crate::modules::{
    self,
    books::store::{BookStore, InMemoryBookStore, MongoBookStore},
};

/// Open the configured book store.
pub async fn open_store(settings: &DatabaseSettings) -> anyhow::Result<Arc<dyn BookStore>> {
    match settings.driver {
        StoreDriver::Mongo => {
            let database = bookstore_db::connect(settings)
                .await
                .context("failed to connect to the document store")?;
            Ok(Arc::new(MongoBookStore::new(database, &settings.collection)))
        }
        StoreDriver::Memory => {
            tracing::warn!("using the in-memory book store; records are lost on restart");
            Ok(Arc::new(InMemoryBookStore::new()))
        }
    }
}

/// Build the module registry around an already opened store.
pub fn build_registry(store: Arc<dyn BookStore>) -> anyhow::Result<ModuleRegistry> {
    let mut registry = ModuleRegistry::new();
    modules::register_all(&mut registry, store)?;
    Ok(registry)
}

/// Run the HTTP service until a shutdown signal arrives.
pub async fn serve(settings: &Settings) -> anyhow::Result<()> {
    let store = open_store(&settings.database).await?;
    let registry = build_registry(store)?;
    let ctx = InitCtx { settings };

    registry.init_modules(&ctx).await?;
    registry.start_modules(&ctx).await?;

    let served = bookstore_http::start_server(&registry, settings).await;

    registry.stop_modules().await?;
    served
}

/// Probe the configured store once.
pub async fn probe_store(settings: &DatabaseSettings) -> anyhow::Result<()> {
    let store = open_store(settings).await?;
    store
        .ping()
        .await
        .context("document store did not answer ping")?;
    Ok(())
}
