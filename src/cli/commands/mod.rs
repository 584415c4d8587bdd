//! Command implementations for the CLI.

mod chunk;
mod config;
mod ingest;
mod inspect;
mod list;
mod rechunk;
mod search;
mod serve;

pub use chunk::run_chunk;
pub use config::run_config;
pub use ingest::run_ingest;
pub use inspect::run_inspect;
pub use list::run_list;
pub use rechunk::run_rechunk;
pub use search::{run_search, SearchArgs};
pub use serve::run_serve;
