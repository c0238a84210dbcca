//! Catalog application library
//!
//! Wires the catalog module into the kernel, database and HTTP crates.

pub mod modules;

use anyhow::Context;
use axum::Router;
use catalog_kernel::settings::Settings;
use catalog_kernel::{DbPool, InitCtx, ModuleRegistry};

/// Registry holding every module this application ships.
pub fn registry() -> anyhow::Result<ModuleRegistry> {
    let mut registry = ModuleRegistry::new();
    modules::register_all(&mut registry)?;
    Ok(registry)
}

/// Apply pending migrations of every registered module.
pub async fn migrate(registry: &ModuleRegistry, db: &DbPool) -> anyhow::Result<usize> {
    let migrations = registry.collect_migrations();
    catalog_db::apply_migrations(db, &migrations)
        .await
        .with_context(|| "failed to apply migrations")
}

/// Fully wired router over `db`, schema included. Used by the server and by
/// tests that drive the API without a socket.
pub async fn build_app(settings: &Settings, db: &DbPool) -> anyhow::Result<Router> {
    let registry = registry()?;
    migrate(&registry, db).await?;
    Ok(catalog_http::build_router(&registry, settings, db))
}

/// Connect, migrate, initialize modules and serve until a shutdown signal.
pub async fn run(settings: Settings) -> anyhow::Result<()> {
    let registry = registry()?;
    let db = catalog_db::connect(&settings.database).await?;

    let applied = migrate(&registry, &db).await?;
    tracing::info!(applied, "schema up to date");

    let ctx = InitCtx {
        settings: &settings,
        db: &db,
    };
    registry.init_modules(&ctx).await?;
    registry.start_modules(&ctx).await?;

    let served = catalog_http::start_server(
        &registry,
        &settings,
        &db,
        catalog_http::shutdown_signal(),
    )
    .await;

    registry.stop_modules().await?;
    db.close().await;
    served
}
