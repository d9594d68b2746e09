//! Typed view of a normalized specification

use serde_json::{Map, Value, json};

use crate::resolver::{ResolutionError, SpecVersion};

/// Path-item keys that are operations.
pub const HTTP_METHODS: &[&str] = &[
    "get", "put", "post", "delete", "options", "head", "patch", "trace",
];

/// Host used when the document declares none.
pub const DEFAULT_HOST: &str = "Default";

#[derive(Debug, Clone)]
pub struct NormalizedSpec {
    pub version: SpecVersion,
    pub host: String,
    /// Prefix for every URL; empty when the base path is `/`
    pub base_path: String,
    /// Base path as declared, `/` when absent
    pub declared_base_path: String,
    /// Root `consumes` (v2)
    pub consumes: Option<Vec<String>>,
    /// Root `produces` (v2)
    pub produces: Option<Vec<String>>,
    pub paths: Vec<PathItem>,
}

#[derive(Debug, Clone)]
pub struct PathItem {
    pub path: String,
    pub operations: Vec<Operation>,
}

impl PathItem {
    /// First parameter named `name` declared by any operation of this path.
    #[must_use]
    pub fn declared_param(&self, name: &str) -> Option<&Parameter> {
        self.operations
            .iter()
            .flat_map(|op| &op.parameters)
            .find(|p| p.name == name)
    }
}

#[derive(Debug, Clone)]
pub struct Operation {
    /// Lower-case method key
    pub method: String,
    pub parameters: Vec<Parameter>,
    /// v3 `requestBody.content`, `None` when absent or empty
    pub request_content: Option<Vec<MediaType>>,
    pub consumes: Option<Vec<String>>,
    pub produces: Option<Vec<String>>,
    /// Response code (or `default`) → response object, in declaration order
    pub responses: Vec<(String, Value)>,
}

#[derive(Debug, Clone)]
pub struct MediaType {
    pub content_type: String,
    pub schema: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamLocation {
    Path,
    Query,
    Header,
    Body,
    FormData,
    Cookie,
}

impl ParamLocation {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "path" => Some(Self::Path),
            "query" => Some(Self::Query),
            "header" => Some(Self::Header),
            "body" => Some(Self::Body),
            "formData" => Some(Self::FormData),
            "cookie" => Some(Self::Cookie),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Parameter {
    pub name: String,
    pub location: ParamLocation,
    /// `schema` when declared, else the v2 parameter-level keywords folded into one
    pub schema: Value,
}

/// v2 keywords that describe a non-body parameter's value.
const PARAM_SCHEMA_KEYS: &[&str] = &["type", "enum", "items", "maxLength", "minLength", "format"];

impl Parameter {
    fn from_value(param: &Value) -> Option<Self> {
        let name = param.get("name")?.as_str()?.to_string();
        let Some(location) = param.get("in")?.as_str().and_then(ParamLocation::parse) else {
            tracing::debug!(param = %name, "parameter with unknown location skipped");
            return None;
        };

        let schema = match param.get("schema") {
            Some(schema) => schema.clone(),
            None => {
                let folded: Map<String, Value> = PARAM_SCHEMA_KEYS
                    .iter()
                    .filter_map(|k| param.get(*k).map(|v| ((*k).to_string(), v.clone())))
                    .collect();
                Value::Object(folded)
            }
        };

        Some(Self {
            name,
            location,
            schema,
        })
    }
}

impl NormalizedSpec {
    /// Build the typed view from a normalized document.
    ///
    /// # Errors
    ///
    /// Returns error if `paths` is missing or not a mapping.
    pub fn from_document(doc: &Value, version: SpecVersion) -> Result<Self, ResolutionError> {
        let paths = doc
            .get("paths")
            .and_then(Value::as_object)
            .ok_or_else(|| ResolutionError::Structure("'paths' is missing or not a mapping".into()))?;

        let (host, declared_base_path) = match version {
            SpecVersion::V2 => v2_location(doc),
            SpecVersion::V3 => v3_location(doc),
        };
        let base_path = if declared_base_path == "/" {
            String::new()
        } else {
            declared_base_path.clone()
        };

        let paths = paths
            .iter()
            .filter_map(|(path, item)| {
                let item = item.as_object()?;
                let operations = item
                    .iter()
                    .filter(|(method, _)| HTTP_METHODS.contains(&method.as_str()))
                    .filter_map(|(method, op)| Operation::from_value(method, op))
                    .collect();
                Some(PathItem {
                    path: path.clone(),
                    operations,
                })
            })
            .collect();

        Ok(Self {
            version,
            host,
            base_path,
            declared_base_path,
            consumes: string_list(doc.get("consumes")),
            produces: string_list(doc.get("produces")),
            paths,
        })
    }
}

impl Operation {
    fn from_value(method: &str, op: &Value) -> Option<Self> {
        let op = op.as_object()?;

        let parameters = op
            .get("parameters")
            .and_then(Value::as_array)
            .map(|ps| ps.iter().filter_map(Parameter::from_value).collect())
            .unwrap_or_default();

        let request_content = op
            .get("requestBody")
            .and_then(|rb| rb.get("content"))
            .and_then(Value::as_object)
            .filter(|c| !c.is_empty())
            .map(|content| {
                content
                    .iter()
                    .map(|(ct, media)| MediaType {
                        content_type: ct.clone(),
                        schema: media.get("schema").cloned().unwrap_or_else(|| json!({})),
                    })
                    .collect()
            });

        let mut responses: Vec<(String, Value)> = op
            .get("responses")
            .and_then(Value::as_object)
            .map(|r| {
                r.iter()
                    .filter(|(code, _)| !code.starts_with("x-"))
                    .map(|(code, resp)| (code.clone(), resp.clone()))
                    .collect()
            })
            .unwrap_or_default();
        if responses.is_empty() {
            responses.push(("default".into(), json!({})));
        }

        Some(Self {
            method: method.to_string(),
            parameters,
            request_content,
            consumes: string_list(op.get("consumes")),
            produces: string_list(op.get("produces")),
            responses,
        })
    }
}

fn string_list(value: Option<&Value>) -> Option<Vec<String>> {
    value.and_then(Value::as_array).map(|items| {
        items
            .iter()
            .filter_map(|v| v.as_str().map(String::from))
            .collect()
    })
}

fn v2_location(doc: &Value) -> (String, String) {
    let host = doc
        .get("host")
        .and_then(Value::as_str)
        .filter(|h| !h.is_empty())
        .unwrap_or(DEFAULT_HOST)
        .to_string();
    let base = doc.get("basePath").and_then(Value::as_str).unwrap_or("/");
    (host, trim_base(base))
}

/// The last `servers` entry wins.
fn v3_location(doc: &Value) -> (String, String) {
    let Some(server) = doc
        .get("servers")
        .and_then(Value::as_array)
        .and_then(|s| s.last())
    else {
        return (DEFAULT_HOST.to_string(), "/".to_string());
    };

    let mut url = server
        .get("url")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    if let Some(vars) = server.get("variables").and_then(Value::as_object) {
        for (name, var) in vars {
            if let Some(default) = var.get("default").and_then(Value::as_str) {
                url = url.replace(&format!("{{{name}}}"), default);
            }
        }
    }

    let without_scheme = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(&url);
    let (host, base) = match without_scheme.split_once('/') {
        Some((host, rest)) => (host, format!("/{rest}")),
        None => (without_scheme, "/".to_string()),
    };
    let host = if host.is_empty() { DEFAULT_HOST } else { host };

    (host.to_string(), trim_base(&base))
}

fn trim_base(base: &str) -> String {
    let trimmed = base.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}
