mod config;
mod db;
mod dtos;
mod error;
mod handler;
mod i18n;
mod middleware;
mod models;
mod routes;
mod schedule;
mod scoring;
mod tracing_config;
mod uploads;
mod utils;
mod view;

#[cfg(test)]
mod test_utils;

use std::sync::Arc;

use config::Config;
use db::DBClient;
use dotenv::dotenv;
use scoring::{RandomSpeechScorer, SpeechScorer};
use tracing_config::init_tracing;
use uploads::UploadStore;

#[derive(Clone)]
pub struct AppState {
    pub env: Arc<Config>,
    pub db_client: DBClient,
    pub uploads: UploadStore,
    pub scorer: Arc<dyn SpeechScorer>,
}

#[tokio::main]
async fn main() {
    dotenv().ok();

    let _guard = init_tracing();

    let config = Config::init();

    let db_client = match DBClient::connect(&config.database_url).await {
        Ok(db_client) => {
            tracing::info!("Connection to the database is successful");
            db_client
        }
        Err(err) => {
            tracing::error!("Failed to connect to the database: {:?}", err);
            std::process::exit(1);
        }
    };

    if let Err(err) = db_client.migrate().await {
        tracing::error!("Failed to apply migrations: {:?}", err);
        std::process::exit(1);
    }

    match db_client.bootstrap().await {
        Ok(report) => tracing::info!(?report, "Bootstrap finished"),
        Err(err) => {
            tracing::error!("Failed to seed initial data: {}", err);
            std::process::exit(1);
        }
    }

    let uploads = match UploadStore::new(config.upload_dir.clone(), config.max_body_bytes).await {
        Ok(uploads) => uploads,
        Err(err) => {
            tracing::error!("Failed to prepare upload directory: {}", err);
            std::process::exit(1);
        }
    };

    let app_state = AppState {
        env: Arc::new(config.clone()),
        db_client,
        uploads,
        scorer: Arc::new(RandomSpeechScorer),
    };

    let app = routes::create_router(app_state);

    let listener = match tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await
    {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!("Failed to bind port {}: {}", config.port, err);
            std::process::exit(1);
        }
    };

    tracing::info!("Server is running on http://localhost:{}", config.port);

    if let Err(err) = axum::serve(listener, app).await {
        tracing::error!("Server error: {}", err);
    }
}
