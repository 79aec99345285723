use clap::Args;

/// Parameters used to config MongoDB.
#[derive(Debug, Clone, Args)]
pub struct MongoDBCliArgs {
    /// The connection string to the MongoDB server.
    #[arg(env = "MONDEX_MONGODB_CONNECTION_URL", short = 'i', long = "uri", value_name = "URI")]
    pub mongodb_connection_url: String,

    /// The name of the database.
    #[arg(env = "MONDEX_DATABASE_NAME", short = 'd', long = "db", value_name = "DATABASE")]
    pub mongodb_database_name: String,

    /// Seconds to wait for the server before giving up.
    #[arg(env = "MONDEX_MONGODB_CONNECT_TIMEOUT", long = "connect-timeout", value_name = "SECONDS", default_value_t = 10)]
    pub mongodb_connect_timeout_secs: u64,
}
