//! Assembled test-case document: `{test_id: {input, output, metadata}}`
//!
//! This is the contract with the traffic-sending side. Everything it needs to
//! replay a case is in [`InputElement`]; free-form sheet columns are carried
//! through as extra fields.

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Test id → test case.
pub type TestCases = BTreeMap<u32, TestCase>;

/// One grouped, possibly multi-event test case.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TestCase {
    /// One element per fan-out event, in sheet order
    pub input: Vec<InputElement>,
    /// Output expectations (elements with all-empty values are dropped)
    pub output: Vec<serde_json::Map<String, serde_json::Value>>,
    pub metadata: Metadata,
}

/// A single request to replay.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct InputElement {
    pub url: String,
    pub host: String,
    pub method: String,
    /// Expected response code (0 when the cell was missing or unparseable)
    pub rsp_code: u16,
    /// Request body: JSON value, or the raw string for XML/non-JSON bodies
    pub req_body: Option<serde_json::Value>,
    /// Response body: JSON value, or the raw string for XML/non-JSON bodies
    pub rsp_body: Option<serde_json::Value>,
    /// Remaining INPUT columns keyed by column name (e.g. `Req_Header`)
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Per-test-case annotations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Metadata {
    pub payload_structure: PayloadStructure,
    /// FEATURE_Settings column (JSON)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<serde_json::Value>,
    /// FEATURE_Validation column (JSON)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<serde_json::Value>,
    /// Data_Labels column, comma separated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_labels: Option<Vec<String>>,
    /// Remaining META columns
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Shapes of every body and query-parameter set seen across a group's rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PayloadStructure {
    pub request: Vec<serde_json::Value>,
    pub response: Vec<serde_json::Value>,
    pub query_params: Vec<serde_json::Value>,
}

/// Generate JSON Schema for the test-case document.
#[must_use]
pub fn generate_schema() -> String {
    let schema = schemars::schema_for!(TestCases);
    serde_json::to_string_pretty(&schema).expect("schema serialization should not fail")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn input_element_flattens_extra_columns() {
        let mut extra = serde_json::Map::new();
        extra.insert("Req_Header".into(), json!(r#"{"A":"b"}"#));
        let element = InputElement {
            url: "/a".into(),
            host: "h".into(),
            method: "GET".into(),
            rsp_code: 200,
            req_body: None,
            rsp_body: Some(json!({"no-resp-body": true})),
            extra,
        };

        let value = serde_json::to_value(&element).unwrap();
        assert_eq!(value["Req_Header"], r#"{"A":"b"}"#);
        assert_eq!(value["rsp_code"], 200);
        assert!(value["req_body"].is_null());
    }

    #[test]
    fn metadata_omits_absent_annotations() {
        let metadata = Metadata::default();
        let value = serde_json::to_value(&metadata).unwrap();
        let obj = value.as_object().unwrap();
        assert!(obj.contains_key("payload_structure"));
        assert!(!obj.contains_key("settings"));
        assert!(!obj.contains_key("data_labels"));
    }

    #[test]
    fn test_cases_keyed_by_id() {
        let mut cases = TestCases::new();
        cases.insert(2, TestCase::default());
        cases.insert(1, TestCase::default());

        let text = serde_json::to_string(&cases).unwrap();
        assert!(text.starts_with(r#"{"1":"#));

        let back: TestCases = serde_json::from_str(&text).unwrap();
        assert_eq!(back.len(), 2);
    }

    #[test]
    fn deserialize_external_document() {
        let json = r#"{
            "7": {
                "input": [{
                    "url": "/users/1", "host": "api.example.com", "method": "GET",
                    "rsp_code": 200, "req_body": {}, "rsp_body": null,
                    "Req_Header": "{}"
                }],
                "output": [],
                "metadata": {
                    "payload_structure": {"request": [{}], "response": [], "query_params": []},
                    "data_labels": ["ssn"],
                    "owner": "team-a"
                }
            }
        }"#;
        let cases: TestCases = serde_json::from_str(json).unwrap();
        let case = &cases[&7];
        assert_eq!(case.input[0].extra["Req_Header"], "{}");
        assert_eq!(case.metadata.data_labels.as_deref(), Some(&["ssn".to_string()][..]));
        assert_eq!(case.metadata.extra["owner"], "team-a");
    }

    #[test]
    fn schema_generation_produces_valid_json() {
        let schema = generate_schema();
        let parsed: serde_json::Value = serde_json::from_str(&schema).unwrap();
        assert!(parsed.get("$schema").is_some() || parsed.get("type").is_some());
        assert!(schema.contains("InputElement"));
    }
}
