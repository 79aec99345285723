use std::ffi::OsStr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::DEFAULT_INDEX_FILE;

pub mod database;

/// The command completed, or only help or version output was requested.
pub const EXIT_SUCCESS: u8 = 0;

/// The plan could not be computed or the command could not run at all.
pub const EXIT_FATAL: u8 = 1;

/// The plan was computed and applied, but some operations failed.
///
/// clap reports its own usage errors with status 2 as well, so those are mapped to
/// [`EXIT_FATAL`] by [`usage_exit_code`] instead of being left to clap.
pub const EXIT_PARTIAL_FAILURE: u8 = 2;

/// Exit status for a command line clap did not accept.
///
/// Help and version output are the only non-failures; anything else means nothing ran.
pub fn usage_exit_code(error: &clap::Error) -> u8 {
    if error.use_stderr() {
        EXIT_FATAL
    } else {
        EXIT_SUCCESS
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "mondex",
    version,
    about = "CLI to index MongoDB collections",
    long_about = "Mondex keeps the indexes of a MongoDB database in line with a JSON configuration file.\n\n\
    Indexes are named after their keys ({\"a\": 1, \"b\": -1} becomes a_1_b_-1), so an index declared in the \
    file and the same index found in the database always compare equal.",
    after_help = "Examples:\n  \
    mondex pull  --uri mongodb://localhost:27017 --db app\n  \
    mondex plan  --uri mongodb://localhost:27017 --db app --file indexes.json\n  \
    mondex apply --uri mongodb://localhost:27017 --db app --file indexes.json",
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Shows the indexes that will be created and dropped
    Plan {
        #[command(flatten)]
        plan_command: ReconcileCmd,
    },
    /// Executes the plan and applies the changes to the database
    #[command(long_about = "Executes the plan and applies the changes to the database.\n\n\
        Drops run before creates on each collection. A failed operation is reported and the \
        remaining ones still run; nothing is rolled back.")]
    Apply {
        #[command(flatten)]
        apply_command: ReconcileCmd,
    },
    /// Creates the index configuration file from the database
    Pull {
        #[command(flatten)]
        pull_command: PullCmd,
    },
}

/// Arguments shared by `plan` and `apply`.
#[derive(Args, Debug, Clone)]
pub struct ReconcileCmd {
    #[clap(flatten)]
    pub file_args: IndexFileCliArgs,

    #[clap(flatten)]
    pub mongodb_args: database::mongodb::MongoDBCliArgs,

    #[clap(flatten)]
    pub output_args: OutputCliArgs,

    /// Also rebuild indexes whose uniqueness or TTL differ from the configuration.
    ///
    /// By default only a change of keys triggers a rebuild.
    #[arg(long)]
    pub strict_options: bool,
}

#[derive(Args, Debug, Clone)]
pub struct PullCmd {
    #[clap(flatten)]
    pub file_args: IndexFileCliArgs,

    #[clap(flatten)]
    pub mongodb_args: database::mongodb::MongoDBCliArgs,

    #[clap(flatten)]
    pub output_args: OutputCliArgs,
}

#[derive(Args, Debug, Clone)]
pub struct IndexFileCliArgs {
    /// Path to the file containing the indexes.
    #[arg(env = "MONDEX_INDEX_FILE", short = 'f', long, value_name = "FILE", default_value = DEFAULT_INDEX_FILE)]
    pub file: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct OutputCliArgs {
    /// Disable colored output. Setting `NO_COLOR` to any non-empty value does the same.
    #[arg(long)]
    pub no_color: bool,
}

impl OutputCliArgs {
    pub fn colored(&self) -> bool {
        colors_enabled(self.no_color, std::env::var_os(NO_COLOR_ENV).as_deref())
    }
}

/// Environment variable that disables colors when set to a non-empty value,
/// whatever that value is.
pub const NO_COLOR_ENV: &str = "NO_COLOR";

pub fn colors_enabled(no_color_flag: bool, no_color_env: Option<&OsStr>) -> bool {
    !no_color_flag && no_color_env.map_or(true, OsStr::is_empty)
}
