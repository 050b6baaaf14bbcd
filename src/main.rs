//! Gatehouse - stateless bearer token authentication gateway

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use gatehouse::{
    auth::Role,
    config::Args,
    db::{IdentityStore, MemoryIdentityStore, MongoClient, MongoIdentityStore},
    server::{self, AppState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("gatehouse={},info", args.log_level).into());
    let registry = tracing_subscriber::registry().with(filter);
    if args.log_json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    info!("======================================");
    info!("  Gatehouse - token auth gateway");
    info!("======================================");
    info!("Listen: {}", args.listen);
    info!("Mode: {}", if args.dev_mode { "DEVELOPMENT" } else { "PRODUCTION" });
    info!(
        "Identity store: {}",
        if args.mongodb_uri.is_some() { "MongoDB" } else { "in-memory" }
    );
    info!("======================================");

    let tokens = match args.token_service() {
        Ok(tokens) => tokens,
        Err(e) => {
            error!("Token service configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let store = connect_store(&args).await;

    let state = Arc::new(AppState::new(args, tokens, store));

    if let Some((email, password)) = state.args.admin.credentials() {
        match state
            .auth
            .provision("Admin", "Admin", email, password, &[Role::Admin, Role::User])
            .await
        {
            Ok(true) => info!("Bootstrap administrator created: {}", email),
            Ok(false) => info!("Bootstrap administrator already exists: {}", email),
            Err(e) => {
                error!("Failed to provision bootstrap administrator: {}", e);
                std::process::exit(1);
            }
        }
    }

    server::run(state).await?;

    Ok(())
}

/// MongoDB when configured, otherwise (or on failure in dev mode) the memory store
async fn connect_store(args: &Args) -> Arc<dyn IdentityStore> {
    let Some(uri) = &args.mongodb_uri else {
        warn!("MONGODB_URI not set - identities are kept in memory and lost on restart");
        return Arc::new(MemoryIdentityStore::new());
    };

    match open_mongo(uri, &args.mongodb_db).await {
        Ok(store) => {
            info!("MongoDB connected successfully");
            Arc::new(store)
        }
        Err(e) if args.dev_mode => {
            warn!("MongoDB connection failed (dev mode, continuing in memory): {}", e);
            Arc::new(MemoryIdentityStore::new())
        }
        Err(e) => {
            error!("MongoDB connection failed: {}", e);
            std::process::exit(1);
        }
    }
}

async fn open_mongo(uri: &str, db_name: &str) -> gatehouse::Result<MongoIdentityStore> {
    let client = MongoClient::new(uri, db_name).await?;
    MongoIdentityStore::new(&client).await
}
