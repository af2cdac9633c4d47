pub mod config;
pub mod err;
pub mod gateway;
pub mod ledger;
pub mod models;
pub mod rfid;
pub mod students;

#[cfg(test)]
mod memory;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::handler::Handler;
use axum::{routing::get, routing::post, Extension, Json, Router};
use serde::Serialize;
use sqlx::postgres::PgPoolOptions;
use tokio::signal;
use tower_http::cors::CorsLayer;

use crate::config::Config;
use crate::err::Error;
use crate::gateway::{PgGateway, Store};

pub type Payload<T> = Result<T, Error>;

pub fn proceeds<V>(value: V) -> Payload<Json<V>>
where
    V: Serialize,
{
    Ok(Json(value))
}

const BANNER: &str = "RFID Race Logger Backend (PostgreSQL) is running!";

pub fn app(store: Store) -> Router {
    Router::new()
        .route("/", get(|| async { BANNER }))
        .route(
            "/api/students",
            post(students::register_student).get(students::list_students),
        )
        .route("/api/rfid", post(rfid::record_scan).get(rfid::list_scans))
        .route("/api/rfid/:id", get(rfid::read_scan))
        .fallback(err::handler404.into_service())
        .layer(Extension(store))
        .layer(CorsLayer::very_permissive())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let config = Config::from_env()?;

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(5))
        .connect_with(config.connect_options())
        .await;
    let pool = match pool {
        Ok(pool) => {
            log::info!("PostgreSQL connected successfully!");
            pool
        }
        Err(err) => {
            log::error!("PostgreSQL connection failed: {}", err);
            return Err(err.into());
        }
    };
    if let Err(err) = sqlx::migrate!().run(&pool).await {
        log::error!("Schema migration failed: {}", err);
        return Err(err.into());
    }

    let store: Store = Arc::new(PgGateway::new(pool.clone()));
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    log::info!("Starting RFID Race Logger on http://{}", addr);
    axum::Server::bind(&addr)
        .serve(app(store).into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    log::info!("Draining database connections");
    pool.close().await;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            log::error!("Failed to listen for Ctrl+C: {}", err);
            std::future::pending::<()>().await;
        }
        log::info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut term) => {
                term.recv().await;
                log::info!("Received terminate signal, shutting down");
            }
            Err(err) => {
                log::error!("Failed to install SIGTERM handler: {}", err);
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
