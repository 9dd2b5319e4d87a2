//! Kite Server: RBAC session and permission core.
//!
//! Composition root. Wires configuration, logging, storage and the
//! authentication components, then runs background maintenance until a
//! shutdown signal arrives.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, fmt};

use kite_auth::credential::{CredentialValidator, LogSmsSender};
use kite_auth::orchestrator::AuthOrchestrator;
use kite_auth::rbac::{MenuGraph, PermissionResolver};
use kite_auth::repository::{MenuRepository, PrincipalRepository, RoleRepository};
use kite_auth::session::SessionStore;
use kite_auth::token::TokenIssuer;
use kite_cache::provider::CacheManager;
use kite_core::config::AppConfig;
use kite_core::error::AppError;
use kite_core::traits::EventSink;
use kite_database::repositories::{
    LoginLogRepository, MenuRepository as PgMenuRepository, OnlineUserRepository,
    RoleRepository as PgRoleRepository, UserRepository,
};
use kite_database::{AuditProjection, DatabasePool};

#[tokio::main]
async fn main() {
    let env = std::env::var("KITE_ENV").unwrap_or_else(|_| "development".to_string());

    let config = match AppConfig::load(&env) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);
    tracing::info!(env = %env, "Configuration loaded");

    if let Err(e) = run(config).await {
        tracing::error!(error = %e, "Server error");
        std::process::exit(1);
    }
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Main server run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting Kite v{}", env!("CARGO_PKG_VERSION"));

    // ── Step 1: Database connection + migrations ─────────────────
    tracing::info!("Connecting to database...");
    let db = DatabasePool::connect(&config.database).await?;
    let pool = db.pool().clone();

    // ── Step 2: Initialize cache ─────────────────────────────────
    tracing::info!(provider = %config.cache.provider, "Initializing cache...");
    let cache = Arc::new(CacheManager::new(&config.cache).await?);
    tracing::info!("Cache initialized");

    // ── Step 3: Initialize repositories ──────────────────────────
    let principals: Arc<dyn PrincipalRepository> = Arc::new(UserRepository::new(pool.clone()));
    let roles: Arc<dyn RoleRepository> = Arc::new(PgRoleRepository::new(pool.clone()));
    let menus: Arc<dyn MenuRepository> = Arc::new(PgMenuRepository::new(pool.clone()));
    let online_users = OnlineUserRepository::new(pool.clone());
    let events: Arc<dyn EventSink> = Arc::new(AuditProjection::new(
        LoginLogRepository::new(pool.clone()),
        online_users.clone(),
    ));

    // ── Step 4: Initialize auth system ───────────────────────────
    tracing::info!("Initializing authentication system...");
    let validator = Arc::new(CredentialValidator::new(
        Arc::clone(&principals),
        Arc::clone(&cache),
        Arc::new(LogSmsSender),
        &config.sms,
    ));
    let issuer = Arc::new(TokenIssuer::new(&config.auth)?);
    let sessions = Arc::new(SessionStore::new(Arc::clone(&cache)));
    let resolver = Arc::new(PermissionResolver::new(roles, Arc::clone(&menus)));
    let menu_graph = Arc::new(MenuGraph::new(menus, Arc::clone(&events)));
    let orchestrator = Arc::new(AuthOrchestrator::new(
        validator,
        issuer,
        sessions,
        resolver,
        principals,
        events,
    ));
    tracing::info!(?orchestrator, ?menu_graph, "Authentication system ready");

    // ── Step 5: Start session sweep ──────────────────────────────
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let interval = Duration::from_secs(config.session.sweep_interval_seconds.max(1));
    let sweep_handle = tokio::spawn(run_session_sweep(online_users, interval, shutdown_rx));
    tracing::info!(interval_secs = interval.as_secs(), "Session sweep started");

    // ── Step 6: Graceful shutdown ────────────────────────────────
    shutdown_signal().await;
    tracing::info!("Shutdown signal received, starting graceful shutdown...");
    let _ = shutdown_tx.send(true);

    if tokio::time::timeout(Duration::from_secs(10), sweep_handle)
        .await
        .is_err()
    {
        tracing::warn!("Session sweep did not stop in time");
    }
    db.close().await;

    tracing::info!("Kite server shut down gracefully");
    Ok(())
}

/// Mark online-user rows whose session has expired as offline.
async fn run_session_sweep(
    online_users: OnlineUserRepository,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match online_users.mark_expired_offline(chrono::Utc::now()).await {
                    Ok(0) => {}
                    Ok(count) => tracing::info!(count, "Expired online sessions marked offline"),
                    Err(e) => tracing::error!(error = %e, "Session sweep failed"),
                }
            }
            _ = shutdown.changed() => {
                tracing::info!("Session sweep stopping");
                break;
            }
        }
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
