pub mod config;
pub mod ingest;
pub mod query;
pub mod status;

pub use ingest::run_ingest;
pub use query::{run_query, QueryOptions};
pub use status::show_status;
