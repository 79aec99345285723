use std::time::Duration;

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{doc, Document};
use mongodb::options::{ClientOptions, IndexOptions};
use mongodb::{Client, Collection, Database, IndexModel};
use tracing::{debug, info};

use crate::core::client::database::{DatabaseError, IndexStore};
use crate::types::index::{CanonicalIndex, ObservedIndex};
use crate::types::params::DatabaseArgs;

/// Reported to the server in the connection handshake.
const APP_NAME: &str = "mondex";

/// Collections in this namespace belong to the server and are never reconciled.
const SYSTEM_COLLECTION_PREFIX: &str = "system.";

/// MongoDB backed [`IndexStore`].
///
/// Holds a handle to one database, which keeps the underlying driver client alive.
/// The handle is created by [`MongoClient::connect`] and passed explicitly to whatever
/// needs it.
pub struct MongoClient {
    database: Database,
}

impl MongoClient {
    /// Connects and pings the server so an unreachable database is reported before
    /// any plan is computed.
    pub async fn connect(args: &DatabaseArgs) -> Result<Self, DatabaseError> {
        let mut options =
            ClientOptions::parse(args.connection_uri.as_str()).await.map_err(DatabaseError::ConnectionFailed)?;
        options.app_name = Some(APP_NAME.to_string());
        options.connect_timeout = Some(args.connect_timeout);
        options.server_selection_timeout = Some(args.connect_timeout);

        let client = Client::with_options(options).map_err(DatabaseError::ConnectionFailed)?;
        let database = client.database(&args.database_name);
        let mongo_client = Self { database };

        mongo_client.health_check().await.map_err(DatabaseError::ConnectionFailed)?;
        info!(database = %args.database_name, "Connected to MongoDB");
        Ok(mongo_client)
    }

    /// Health check - ping the database
    pub async fn health_check(&self) -> Result<(), mongodb::error::Error> {
        self.database.run_command(doc! { "ping": 1 }, None).await?;
        Ok(())
    }

    fn collection(&self, name: &str) -> Collection<Document> {
        self.database.collection(name)
    }
}

#[async_trait]
impl IndexStore for MongoClient {
    async fn list_collections(&self) -> Result<Vec<String>, DatabaseError> {
        let mut names = self.database.list_collection_names(None).await?;
        names.retain(|name| !name.starts_with(SYSTEM_COLLECTION_PREFIX));
        names.sort();
        debug!(count = names.len(), "Listed collections");
        Ok(names)
    }

    async fn list_indexes(&self, collection: &str) -> Result<Vec<ObservedIndex>, DatabaseError> {
        let cursor = self.collection(collection).list_indexes(None).await?;
        let models: Vec<IndexModel> = cursor.try_collect().await?;
        debug!(collection, count = models.len(), "Listed indexes");
        models.into_iter().map(|model| observed_from_model(collection, model)).collect()
    }

    async fn create_index(&self, collection: &str, index: &CanonicalIndex) -> Result<(), DatabaseError> {
        self.collection(collection).create_index(index_model(index), None).await?;
        Ok(())
    }

    async fn drop_index(&self, collection: &str, name: &str) -> Result<(), DatabaseError> {
        self.collection(collection).drop_index(name, None).await?;
        Ok(())
    }
}

/// Builds the driver model for creating `index`.
///
/// `unique` is only sent when set, and a TTL of zero is kept: it is a valid setting
/// that expires documents at the time stored in the indexed field.
pub(crate) fn index_model(index: &CanonicalIndex) -> IndexModel {
    let options = IndexOptions::builder()
        .name(index.name.clone())
        .unique(index.is_unique.then_some(true))
        .expire_after(index.expire_after_seconds.map(Duration::from_secs))
        .build();

    IndexModel::builder().keys(index.keys.to_document()).options(options).build()
}

/// Extracts the fields mondex compares from a driver index model.
pub(crate) fn observed_from_model(collection: &str, model: IndexModel) -> Result<ObservedIndex, DatabaseError> {
    let options = model.options.unwrap_or_default();
    let name = options.name.ok_or_else(|| DatabaseError::UnnamedIndex { collection: collection.to_string() })?;

    Ok(ObservedIndex {
        name,
        keys: model.keys,
        unique: options.unique,
        expire_after_seconds: options.expire_after.map(|ttl| ttl.as_secs()),
    })
}
