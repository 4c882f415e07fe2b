//! CLI command implementations.

mod config;
mod doctor;
mod ingest;
mod query;
mod sources;

pub use config::run_config;
pub use doctor::run_doctor;
pub use ingest::run_ingest;
pub use query::{run_query, run_voice_query};
pub use sources::run_sources;
