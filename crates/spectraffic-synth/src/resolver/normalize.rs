//! Parameter normalization on the inlined document

use serde_json::{Map, Value, json};

use super::SpecVersion;
use crate::spec::HTTP_METHODS;

pub(super) fn normalize(doc: &mut Value, version: SpecVersion) {
    merge_path_parameters(doc);

    let schemes = match version {
        SpecVersion::V2 => doc.get("securityDefinitions"),
        SpecVersion::V3 => doc.pointer("/components/securitySchemes"),
    };
    let security = schemes
        .and_then(Value::as_object)
        .map(security_parameters)
        .unwrap_or_default();
    if !security.is_empty() {
        tracing::debug!(count = security.len(), "security parameters derived");
        for op in operations_mut(doc) {
            append_parameters(op, &security);
        }
    }

    if let Some(root) = doc.as_object_mut() {
        match version {
            SpecVersion::V2 => {
                root.remove("definitions");
                root.remove("parameters");
            }
            SpecVersion::V3 => {
                root.remove("components");
            }
        }
    }
}

/// Copy path-level `parameters` into each sibling operation.
///
/// An operation that already declares the same `name`+`in` keeps its own.
fn merge_path_parameters(doc: &mut Value) {
    let Some(paths) = doc.get_mut("paths").and_then(Value::as_object_mut) else {
        return;
    };

    for item in paths.values_mut() {
        let Some(item) = item.as_object_mut() else {
            continue;
        };
        let Some(shared) = item.get("parameters").and_then(Value::as_array).cloned() else {
            continue;
        };

        for (method, op) in item.iter_mut() {
            if !HTTP_METHODS.contains(&method.as_str()) {
                continue;
            }
            let own: Vec<(String, String)> = op
                .get("parameters")
                .and_then(Value::as_array)
                .map(|ps| ps.iter().filter_map(param_key).collect())
                .unwrap_or_default();
            let inherited: Vec<Value> = shared
                .iter()
                .filter(|p| param_key(p).is_none_or(|key| !own.contains(&key)))
                .cloned()
                .collect();
            append_parameters(op, &inherited);
        }
    }
}

fn param_key(param: &Value) -> Option<(String, String)> {
    Some((
        param.get("name")?.as_str()?.to_string(),
        param.get("in")?.as_str()?.to_string(),
    ))
}

/// Header/query parameters implied by the declared security schemes.
fn security_parameters(schemes: &Map<String, Value>) -> Vec<Value> {
    let authorization = json!({"in": "header", "type": "string", "name": "Authorization"});
    let mut params: Vec<Value> = Vec::new();

    for (name, scheme) in schemes {
        let param = match scheme.get("type").and_then(Value::as_str) {
            Some("apiKey") => {
                let (Some(location), Some(key)) = (
                    scheme.get("in").and_then(Value::as_str),
                    scheme.get("name").and_then(Value::as_str),
                ) else {
                    tracing::debug!(scheme = %name, "apiKey scheme without in/name skipped");
                    continue;
                };
                json!({"in": location, "type": "string", "name": key})
            }
            Some("http" | "basic" | "oauth2" | "openIdConnect") => authorization.clone(),
            other => {
                tracing::debug!(scheme = %name, kind = ?other, "security scheme ignored");
                continue;
            }
        };
        if !params.contains(&param) {
            params.push(param);
        }
    }

    params
}

fn operations_mut(doc: &mut Value) -> impl Iterator<Item = &mut Value> {
    doc.get_mut("paths")
        .and_then(Value::as_object_mut)
        .into_iter()
        .flat_map(|paths| paths.values_mut())
        .filter_map(Value::as_object_mut)
        .flat_map(|item| item.iter_mut())
        .filter(|(method, _)| HTTP_METHODS.contains(&method.as_str()))
        .map(|(_, op)| op)
}

fn append_parameters(op: &mut Value, extra: &[Value]) {
    if extra.is_empty() {
        return;
    }
    let Some(op) = op.as_object_mut() else {
        return;
    };
    let params = op
        .entry("parameters")
        .or_insert_with(|| Value::Array(Vec::new()));
    if let Some(list) = params.as_array_mut() {
        list.extend(extra.iter().cloned());
    }
}
