use mongodb::{Client, Database};
use std::env;

use crate::errors::{AppError, Result};

pub async fn get_db_client() -> Result<Database> {
    let database_url = env::var("DATABASE_URL")
        .map_err(|_| AppError::Configuration("DATABASE_URL must be set".to_string()))?;

    let client = Client::with_uri_str(&database_url).await?;
    let db = client.database("winestore");

    match db.list_collection_names().await {
        Ok(collections) => {
            tracing::info!("connected to database, {} collections", collections.len());
        }
        Err(e) => {
            tracing::warn!("database reachable but listing collections failed: {}", e);
        }
    }

    Ok(db)
}
