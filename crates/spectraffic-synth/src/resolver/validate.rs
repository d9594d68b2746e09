//! Best-effort structural validation
//!
//! The meta-schemas below only check the document skeleton the enumerator
//! walks. Violations become warnings; nothing here fails a resolution.

use serde_json::{Value, json};

use super::{SpecVersion, ValidationWarning};

/// Upper bound on reported violations per document.
const MAX_WARNINGS: usize = 20;

fn operation_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "parameters": {
                "type": "array",
                "items": {
                    "type": "object",
                    "anyOf": [
                        {"required": ["$ref"]},
                        {"required": ["name", "in"]}
                    ]
                }
            },
            "responses": {"type": "object"}
        }
    })
}

fn path_item_schema() -> Value {
    let op = operation_schema();
    json!({
        "type": "object",
        "properties": {
            "get": op, "put": op, "post": op, "delete": op,
            "options": op, "head": op, "patch": op, "trace": op,
            "parameters": {"type": "array"}
        }
    })
}

fn meta_schema(version: SpecVersion) -> Value {
    let paths = json!({
        "type": "object",
        "additionalProperties": path_item_schema()
    });
    let info = json!({"type": "object", "required": ["title", "version"]});

    match version {
        SpecVersion::V2 => json!({
            "type": "object",
            "required": ["swagger", "info", "paths"],
            "properties": {
                "swagger": {"type": "string", "pattern": "^2\\.0$"},
                "info": info,
                "host": {"type": "string"},
                "basePath": {"type": "string", "pattern": "^/"},
                "consumes": {"type": "array", "items": {"type": "string"}},
                "produces": {"type": "array", "items": {"type": "string"}},
                "securityDefinitions": {"type": "object"},
                "paths": paths
            }
        }),
        SpecVersion::V3 => json!({
            "type": "object",
            "required": ["openapi", "info", "paths"],
            "properties": {
                "openapi": {"type": "string", "pattern": "^3\\."},
                "info": info,
                "servers": {
                    "type": "array",
                    "items": {"type": "object", "required": ["url"]}
                },
                "components": {"type": "object"},
                "paths": paths
            }
        }),
    }
}

/// Validate `doc` against the structural meta-schema for `version`.
pub(super) fn validate(doc: &Value, version: SpecVersion) -> Vec<ValidationWarning> {
    let schema = meta_schema(version);
    let validator = match jsonschema::validator_for(&schema) {
        Ok(v) => v,
        Err(e) => {
            tracing::debug!("meta-schema did not compile: {e}");
            return Vec::new();
        }
    };

    validator
        .iter_errors(doc)
        .take(MAX_WARNINGS)
        .map(|e| ValidationWarning(e.to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn well_formed_v3_has_no_warnings() {
        let doc = json!({
            "openapi": "3.0.0",
            "info": {"title": "T", "version": "1"},
            "servers": [{"url": "https://api.example.com"}],
            "paths": {"/a": {"get": {"responses": {"200": {"description": "ok"}}}}}
        });
        assert!(validate(&doc, SpecVersion::V3).is_empty());
    }

    #[test]
    fn well_formed_v2_has_no_warnings() {
        let doc = json!({
            "swagger": "2.0",
            "info": {"title": "T", "version": "1"},
            "host": "api.example.com",
            "basePath": "/v1",
            "paths": {"/a": {"get": {"parameters": [{"name": "q", "in": "query", "type": "string"}]}}}
        });
        assert!(validate(&doc, SpecVersion::V2).is_empty());
    }

    #[test]
    fn structural_problems_are_reported() {
        let doc = json!({
            "openapi": "3.0.0",
            "paths": {"/a": {"get": {"parameters": [{"in": "query"}], "responses": []}}}
        });
        let warnings = validate(&doc, SpecVersion::V3);
        assert!(warnings.len() >= 3, "{warnings:?}");
    }

    #[test]
    fn wrong_version_string_is_a_warning() {
        let doc = json!({"swagger": "1.2", "info": {"title": "T", "version": "1"}, "paths": {}});
        let warnings = validate(&doc, SpecVersion::V2);
        assert_eq!(warnings.len(), 1);
    }
}
