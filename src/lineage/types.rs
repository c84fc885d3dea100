//! Lineage types
//!
//! Serialized with every stored row.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Identity of one ingestion run's output
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RawDataBatch {
    /// Raw table the batch was ingested into
    pub source_table: String,
    /// Canonical JSON of the ingestion params
    pub params_fingerprint: String,
}

impl RawDataBatch {
    /// Create a batch reference
    pub fn new(source_table: impl Into<String>, params_fingerprint: impl Into<String>) -> Self {
        Self {
            source_table: source_table.into(),
            params_fingerprint: params_fingerprint.into(),
        }
    }
}

/// Lineage columns carried by a stored row
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawDataOrigin {
    /// Raw table the row derives from
    pub raw_data_table: String,
    /// Params fingerprint of the batch
    pub raw_data_params: String,
    /// Row id inside the raw table
    pub raw_data_id: u64,
    /// Free-form note (e.g. json path inside the raw payload)
    #[serde(default)]
    pub raw_data_remark: String,
}

impl RawDataOrigin {
    /// Origin for a row of `batch` derived from raw row `raw_data_id`
    pub fn new(batch: &RawDataBatch, raw_data_id: u64) -> Self {
        Self {
            raw_data_table: batch.source_table.clone(),
            raw_data_params: batch.params_fingerprint.clone(),
            raw_data_id,
            raw_data_remark: String::new(),
        }
    }

    /// The batch this origin belongs to
    pub fn batch(&self) -> RawDataBatch {
        RawDataBatch::new(&self.raw_data_table, &self.raw_data_params)
    }

    /// Whether the origin belongs to `batch`
    pub fn is_in(&self, batch: &RawDataBatch) -> bool {
        self.raw_data_table == batch.source_table && self.raw_data_params == batch.params_fingerprint
    }
}

/// Raw table and params a subtask operates under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDataSubTaskArgs {
    /// Raw table name (e.g. `_raw_gitlab_api_deployments`)
    pub table: String,
    /// Ingestion params (e.g. `{"ConnectionId":1,"ProjectId":42}`)
    pub params: Value,
}

impl RawDataSubTaskArgs {
    /// Build args from any serializable params struct
    pub fn new(table: impl Into<String>, params: &impl Serialize) -> Result<Self> {
        Ok(Self {
            table: table.into(),
            params: sort_keys(serde_json::to_value(params)?),
        })
    }

    /// Compact JSON of the params with object keys sorted
    pub fn fingerprint(&self) -> String {
        self.params.to_string()
    }

    /// The batch rows written under these args belong to
    pub fn batch(&self) -> RawDataBatch {
        RawDataBatch::new(&self.table, self.fingerprint())
    }
}

/// Rebuild `value` with every object's keys inserted in sorted order
fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<String, Value> =
                map.into_iter().map(|(k, v)| (k, sort_keys(v))).collect();
            Value::Object(sorted.into_iter().collect())
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Serialize)]
    #[serde(rename_all = "PascalCase")]
    struct Params {
        project_id: u64,
        connection_id: u64,
    }

    #[test]
    fn test_fingerprint_is_sorted_and_stable() {
        let args = RawDataSubTaskArgs::new(
            "_raw_gitlab_api_deployments",
            &Params {
                project_id: 42,
                connection_id: 1,
            },
        )
        .unwrap();
        assert_eq!(args.fingerprint(), r#"{"ConnectionId":1,"ProjectId":42}"#);

        let same = RawDataSubTaskArgs::new(
            "_raw_gitlab_api_deployments",
            &json!({"ProjectId": 42, "ConnectionId": 1}),
        )
        .unwrap();
        assert_eq!(args.batch(), same.batch());
    }

    #[test]
    fn test_batches_differ_by_params_and_table() {
        let a = RawDataSubTaskArgs::new("_raw_a", &json!({"ConnectionId": 1})).unwrap();
        let b = RawDataSubTaskArgs::new("_raw_a", &json!({"ConnectionId": 2})).unwrap();
        let c = RawDataSubTaskArgs::new("_raw_b", &json!({"ConnectionId": 1})).unwrap();
        assert_ne!(a.batch(), b.batch());
        assert_ne!(a.batch(), c.batch());
    }

    #[test]
    fn test_origin_membership() {
        let batch = RawDataBatch::new("_raw_a", r#"{"ConnectionId":1}"#);
        let origin = RawDataOrigin::new(&batch, 7);
        assert!(origin.is_in(&batch));
        assert_eq!(origin.batch(), batch);
        assert_eq!(origin.raw_data_id, 7);
        assert!(!origin.is_in(&RawDataBatch::new("_raw_a", "{}")));
    }
}
