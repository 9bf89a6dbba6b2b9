use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;

/// Results of an FQL multiquery, keyed by the caller's query names
pub type MultiqueryResult = BTreeMap<String, Value>;

/// One element of the `fql.multiquery` response array
#[derive(Debug, Clone, Deserialize)]
pub struct MultiqueryEntry {
    pub name: String,
    #[serde(default)]
    pub fql_result_set: Value,
}
