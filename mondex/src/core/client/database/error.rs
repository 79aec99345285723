use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Failed to connect to MongoDB: {0}")]
    ConnectionFailed(#[source] mongodb::error::Error),

    #[error("Mongo error: {0}")]
    MongoError(#[from] mongodb::error::Error),

    #[error("Collection {collection} reported an index without a name")]
    UnnamedIndex { collection: String },
}
