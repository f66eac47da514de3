//! Query sets: the built-in ImmunoSys report and TOML-defined replacements.

use serde::Deserialize;

use super::QueryDefinition;

/// The ImmunoSys influenza vaccine tracking report.
const IMMUNOSYS_TOML: &str = include_str!("../../queries/immunosys.toml");

#[derive(Deserialize)]
struct QuerySet {
    #[serde(default, rename = "query")]
    queries: Vec<QueryDefinition>,
}

/// Parse a query set from TOML (`[[query]]` tables with `description` and
/// `query` keys).
pub fn parse(source: &str) -> Result<Vec<QueryDefinition>, toml::de::Error> {
    let set: QuerySet = toml::from_str(source)?;
    Ok(set.queries)
}

/// The five built-in ImmunoSys queries.
pub fn immunosys() -> Vec<QueryDefinition> {
    parse(IMMUNOSYS_TOML).unwrap_or_else(|e| panic!("built-in query set is invalid: {e}"))
}
