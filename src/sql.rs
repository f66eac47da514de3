pub mod compat;
pub mod error;
pub mod executor;
pub mod fmt;
pub mod queries;

pub use error::Error;
pub use executor::{DataSource, execute_report};
use serde::{Deserialize, Serialize};

/// A report item: a human-readable description and the SQL that answers it.
#[derive(Clone, Debug, Hash, Serialize, Deserialize, PartialEq, Eq)]
pub struct QueryDefinition {
    pub description: String,

    /// The raw SQL query to run.
    pub query: String,
}

/// The outcome of running one [`QueryDefinition`].
#[derive(Clone, Debug, Hash, Serialize, Deserialize, PartialEq, Eq)]
pub struct QueryResult {
    pub description: String,
    pub query: String,
    /// Column names, in the order the engine returned them.
    pub header: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}
