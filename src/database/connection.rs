use mongodb::{bson::doc, Client, Database};

use crate::errors::Result;

pub async fn get_db_client(database_url: &str, db_name: &str) -> Result<Database> {
    let client = Client::with_uri_str(database_url).await?;
    let db = client.database(db_name);

    // Fail fast if the server is unreachable
    db.run_command(doc! { "ping": 1 }).await?;

    match db.list_collection_names().await {
        Ok(collections) => {
            tracing::info!(database = db_name, ?collections, "✅ Connected to database");
        }
        Err(e) => {
            tracing::warn!(database = db_name, error = %e, "Connected but could not list collections");
        }
    }

    Ok(db)
}
