use std::sync::Arc;

use clap::Parser;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use caretrust::auth;
use caretrust::config::Config;
use caretrust::db::{create_pool, init_db, queries, AppState};
use caretrust::events;
use caretrust::handlers;
use caretrust::models::{CreateFacility, CreatePaymentConfig, CreateResident, UserRole};
use caretrust::payments::PayPalGatewayFactory;

/// Webhook event ids only matter while the provider may still redeliver;
/// anything older than this is swept by the daily purge task.
const WEBHOOK_EVENT_RETENTION_DAYS: i64 = 30;

#[derive(Parser, Debug)]
#[command(name = "caretrust")]
#[command(about = "Trust-account payment core for long-term-care facilities")]
struct Cli {
    /// Seed the database with dev data (facility, payment config, resident, token)
    #[arg(long)]
    seed: bool,
}

fn seed_dev_data(state: &AppState) -> caretrust::error::Result<()> {
    let conn = state.db.get()?;

    let facility = queries::create_facility(
        &conn,
        &CreateFacility {
            name: "Maple Grove Care Home".to_string(),
        },
    )?;

    queries::upsert_facility_payment_config(
        &conn,
        &facility.id,
        &CreatePaymentConfig {
            client_id: "sandbox-client-id".to_string(),
            client_secret: "sandbox-client-secret".to_string(),
            environment: caretrust::models::ProviderEnvironment::Sandbox,
            webhook_secret: Some("whsec_dev".to_string()),
            return_url: Some(format!("{}/payments/return", state.config.base_url)),
            cancel_url: Some(format!("{}/payments/cancel", state.config.base_url)),
        },
    )?;

    let resident = queries::create_resident(
        &conn,
        &CreateResident {
            facility_id: facility.id.clone(),
            name: "Ada Example".to_string(),
        },
    )?;

    let om = queries::create_user(&conn, "om@example.com", "Dev Office Manager", UserRole::OfficeManager)?;
    let token = format!("ct_dev_{}", uuid::Uuid::new_v4().simple());
    queries::create_auth_token(&conn, &om.id, &auth::hash_token(&token), None)?;

    tracing::info!("seeded facility {} / resident {}", facility.id, resident.id);
    tracing::info!("dev bearer token: {}", token);
    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "caretrust=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    let addr = config.addr();

    let db = create_pool(&config.database_path).expect("Failed to create database pool");
    {
        let conn = db.get().expect("Failed to get database connection");
        init_db(&conn).expect("Failed to initialize schema");
    }

    // Composition root: registry and dispatcher are built here, once, before
    // the router is served, and injected rather than reached via a singleton.
    let state = AppState {
        events: Arc::new(events::handlers::default_router(db.clone())),
        gateways: Arc::new(PayPalGatewayFactory),
        db,
        config: Arc::new(config),
    };

    {
        let db = state.db.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(std::time::Duration::from_secs(86_400));
            loop {
                interval.tick().await;
                let purged = db
                    .get()
                    .map_err(caretrust::error::AppError::from)
                    .and_then(|conn| {
                        queries::purge_old_webhook_events(&conn, WEBHOOK_EVENT_RETENTION_DAYS)
                    });
                match purged {
                    Ok(n) if n > 0 => tracing::info!(purged = n, "purged old webhook events"),
                    Ok(_) => {}
                    Err(e) => tracing::warn!("webhook event purge failed: {}", e),
                }
            }
        });
    }

    if cli.seed {
        if !state.config.dev_mode {
            tracing::warn!("--seed requested outside dev mode, skipping");
        } else {
            seed_dev_data(&state).expect("Failed to seed dev data");
        }
    }

    let app = handlers::router(state).layer(TraceLayer::new_for_http());

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind address");
    axum::serve(listener, app).await.expect("Server error");
}
