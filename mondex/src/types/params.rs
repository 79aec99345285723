use std::path::PathBuf;
use std::time::Duration;

use crate::cli::database::mongodb::MongoDBCliArgs;
use crate::cli::{PullCmd, ReconcileCmd};
use crate::reconcile::ComparePolicy;
use crate::MondexError;

const MONGODB_SCHEMES: &[&str] = &["mongodb://", "mongodb+srv://"];

/// DatabaseArgs - Arguments used to connect to MongoDB
#[derive(Debug, Clone)]
pub struct DatabaseArgs {
    pub connection_uri: String,
    pub database_name: String,
    pub connect_timeout: Duration,
}

/// RunParams - Everything a command needs once the command line has been validated
#[derive(Debug, Clone)]
pub struct RunParams {
    pub index_file: PathBuf,
    pub database: DatabaseArgs,
    pub policy: ComparePolicy,
    pub colored: bool,
}

impl TryFrom<&MongoDBCliArgs> for DatabaseArgs {
    type Error = MondexError;
    fn try_from(args: &MongoDBCliArgs) -> Result<Self, Self::Error> {
        let connection_uri = args.mongodb_connection_url.trim();
        if !MONGODB_SCHEMES.iter().any(|scheme| connection_uri.starts_with(scheme)) {
            return Err(MondexError::InvalidArgument(format!(
                "connection string must start with one of {}",
                MONGODB_SCHEMES.join(", ")
            )));
        }

        let database_name = args.mongodb_database_name.trim();
        if database_name.is_empty() {
            return Err(MondexError::InvalidArgument("database name must not be empty".to_string()));
        }

        Ok(Self {
            connection_uri: connection_uri.to_string(),
            database_name: database_name.to_string(),
            connect_timeout: Duration::from_secs(args.mongodb_connect_timeout_secs),
        })
    }
}

impl TryFrom<&ReconcileCmd> for RunParams {
    type Error = MondexError;
    fn try_from(cmd: &ReconcileCmd) -> Result<Self, Self::Error> {
        Ok(Self {
            index_file: cmd.file_args.file.clone(),
            database: DatabaseArgs::try_from(&cmd.mongodb_args)?,
            policy: ComparePolicy::from_strict(cmd.strict_options),
            colored: cmd.output_args.colored(),
        })
    }
}

impl TryFrom<&PullCmd> for RunParams {
    type Error = MondexError;
    fn try_from(cmd: &PullCmd) -> Result<Self, Self::Error> {
        Ok(Self {
            index_file: cmd.file_args.file.clone(),
            database: DatabaseArgs::try_from(&cmd.mongodb_args)?,
            policy: ComparePolicy::default(),
            colored: cmd.output_args.colored(),
        })
    }
}
