use leaf_library::config::CONFIG;
use leaf_library::db::Database;
use leaf_library::service::image_store;
use leaf_library::{LeafState, leaf_router};
use mimalloc::MiMalloc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let cfg = &*CONFIG;

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cfg.loglevel.clone()));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_level(true)
                .with_target(false),
        )
        .init();

    info!(
        store = ?cfg.store,
        json_path = %cfg.json_path.display(),
        database = %cfg.database,
        cookie_name = %cfg.cookie_name,
        loglevel = %cfg.loglevel,
        "starting leaf library"
    );

    let db = Database::open(cfg).await?;

    let admins = cfg.admins();
    if admins.is_empty() {
        warn!("ADMIN_EMAIL/ADMIN_PASSWORD not set, no admin account seeded");
    } else {
        db.users.init_admins(admins).await?;
    }

    let client = reqwest::Client::builder()
        .user_agent(concat!("leaf-library/", env!("CARGO_PKG_VERSION")))
        .connect_timeout(Duration::from_secs(5))
        .timeout(Duration::from_secs(30))
        .build()?;
    let images = image_store::from_config(cfg, client);

    let state = LeafState::new(db, images, cfg)?;
    let app = leaf_router(state);

    let addr = cfg.listen_addr();
    let listener = TcpListener::bind(&addr).await?;
    info!("HTTP server listening on {}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}
