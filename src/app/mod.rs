pub mod query;
pub mod server;

pub use query::{PropertiesResponse, QueryError, QueryService};
