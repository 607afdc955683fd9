//! MongoDB client factory and liveness probe.

use std::time::Duration;

use anyhow::Context;
use bookstore_kernel::settings::DatabaseSettings;
use mongodb::{
    bson::doc,
    options::{ClientOptions, Tls, TlsOptions},
    Client, Database,
};

/// Connect to the configured MongoDB deployment and return a database handle.
///
/// The driver connects lazily; the handle is safe to share across tasks.
pub async fn connect(settings: &DatabaseSettings) -> anyhow::Result<Database> {
    let mut options = ClientOptions::parse(&settings.uri)
        .await
        .context("failed to parse database connection string")?;

    if let Some(ca_file) = &settings.tls_ca_file {
        let tls = TlsOptions::builder().ca_file_path(ca_file.clone()).build();
        options.tls = Some(Tls::Enabled(tls));
    }

    options.app_name = Some("bookstore".to_string());
    // Bounds how long a call against an unreachable deployment blocks before erroring
    options.server_selection_timeout = Some(Duration::from_millis(
        settings.server_selection_timeout_ms,
    ));

    let client = Client::with_options(options).context("failed to create database client")?;

    tracing::info!(
        target: "bookstore-db",
        database = %settings.name,
        "database client created"
    );

    Ok(client.database(&settings.name))
}

/// Issue a `ping` command against the deployment.
pub async fn ping(database: &Database) -> mongodb::error::Result<()> {
    database.run_command(doc! { "ping": 1 }).await?;
    Ok(())
}
