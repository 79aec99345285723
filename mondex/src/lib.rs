pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod normalizer;
pub mod reconcile;
pub mod render;
pub mod service;
pub mod types;
pub mod utils;


// Re-export commonly used item
pub use error::{MondexError, MondexResult};
