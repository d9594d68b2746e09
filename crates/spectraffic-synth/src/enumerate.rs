//! Operation enumeration: one row per (content type, response code)
//!
//! Every path+method becomes a [`RowGroup`]: its valid rows in declaration
//! order followed by a single negative row aimed at an unknown path.

use rand::Rng;
use serde_json::{Map, Value, json};

use spectraffic_core::sheet::{NEGATIVE_STATUS, RESP_PAYLOAD_HEADER, RESP_STATUS_HEADER, UNKNOWN_PATH};
use spectraffic_core::{LabelCatalog, RowGroup, SyntheticRow};

use crate::datagen;
use crate::params::{ExtractedParams, extract_params, extract_path_params};
use crate::resolver::SpecVersion;
use crate::spec::{NormalizedSpec, Operation};

/// Request content types rows are emitted for.
pub const CONTENT_TYPES: [&str; 8] = [
    "application/json",
    "application/soap+xml",
    "application/x-www-form-urlencoded",
    "application/xml",
    "*/*",
    "text/json",
    "text/plain",
    "application/*+json",
];

const JSON: &str = "application/json";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EnumerationWarning {
    #[error("unsupported content type '{content_type}' for {operation}")]
    UnsupportedContentType {
        operation: String,
        content_type: String,
    },
}

#[derive(Debug, Clone, Default)]
pub struct Enumeration {
    pub groups: Vec<RowGroup>,
    pub warnings: Vec<EnumerationWarning>,
}

impl Enumeration {
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.groups.iter().map(|g| g.rows.len()).sum()
    }
}

/// Whether rows are emitted for `content_type`.
///
/// `application/*+json` admits any structured-syntax JSON subtype.
#[must_use]
pub fn is_supported(content_type: &str) -> bool {
    CONTENT_TYPES.contains(&content_type)
        || content_type
            .strip_prefix("application/")
            .is_some_and(|sub| sub.ends_with("+json") && !sub.contains('/'))
}

/// JSON-family types, `*/*` and `text/plain` are sent as `application/json`.
#[must_use]
pub fn normalize_content_type(content_type: &str) -> &str {
    if content_type.contains("json") || content_type == "*/*" || content_type == "text/plain" {
        JSON
    } else {
        content_type
    }
}

/// `default` and `2XX` become `200`; other wildcards have `X` zeroed.
#[must_use]
pub fn normalize_status(code: &str) -> String {
    if code == "default" {
        return "200".into();
    }
    code.replace(['X', 'x'], "0")
}

/// `/a/b?x=1` → `/a/b/UnknownPath?x=1`, `/a/b` → `/a/b/UnknownPath`.
#[must_use]
pub fn negative_url(url: &str) -> String {
    match url.split_once('?') {
        Some((path, query)) => format!("{path}{UNKNOWN_PATH}?{query}"),
        None => format!("{url}{UNKNOWN_PATH}"),
    }
}

/// Walk every path and operation of `spec`.
pub fn enumerate<R: Rng + ?Sized>(
    spec: &NormalizedSpec,
    catalog: &LabelCatalog,
    rng: &mut R,
) -> Enumeration {
    let mut out = Enumeration::default();
    let mut sequence_id: u32 = 1;

    for item in &spec.paths {
        let path = extract_path_params(&item.path, item, catalog, rng);

        for op in &item.operations {
            let params = extract_params(op, catalog, rng);
            let url = format!("{}{path}{}", spec.base_path, params.query);
            let operation = format!("{} {}", op.method.to_uppercase(), item.path);

            let mut rows = Vec::new();
            for (content_type, schema) in content_types(spec, op) {
                if !is_supported(&content_type) {
                    tracing::warn!(%operation, %content_type, "unsupported content type skipped");
                    out.warnings.push(EnumerationWarning::UnsupportedContentType {
                        operation: operation.clone(),
                        content_type,
                    });
                    continue;
                }
                let content_type = normalize_content_type(&content_type);

                let body = match (spec.version, schema) {
                    (SpecVersion::V3, Some(schema)) => datagen::generate(&schema, None, catalog, rng),
                    _ => params.body.clone(),
                };
                // v3 xml bodies are wrapped in a root element
                let body = if spec.version == SpecVersion::V3 && content_type == "application/xml" {
                    json!({"Body": body})
                } else {
                    body
                };

                for (code, _) in &op.responses {
                    let code = normalize_status(code);
                    rows.push(SyntheticRow {
                        sequence_id,
                        url: url.clone(),
                        host: spec.host.clone(),
                        method: op.method.to_uppercase(),
                        headers: row_headers(&params, content_type, &code),
                        response_code: code,
                        request_body: body.clone(),
                        response_body: json!({"no-resp-body": true}),
                        negative: false,
                    });
                }
            }

            let Some(last) = rows.last() else {
                tracing::debug!(%operation, "no rows emitted");
                continue;
            };
            let negative = SyntheticRow {
                url: negative_url(&last.url),
                response_code: NEGATIVE_STATUS.into(),
                negative: true,
                ..last.clone()
            };
            rows.push(negative);

            tracing::debug!(%operation, sequence_id, rows = rows.len(), "operation enumerated");
            out.groups.push(RowGroup {
                sequence_id,
                operation,
                rows,
            });
            sequence_id += 1;
        }
    }

    out
}

/// Content types to iterate, each with the v3 schema it carries.
fn content_types(spec: &NormalizedSpec, op: &Operation) -> Vec<(String, Option<Value>)> {
    if spec.version == SpecVersion::V3 {
        return match &op.request_content {
            Some(content) => content
                .iter()
                .map(|m| (m.content_type.clone(), Some(m.schema.clone())))
                .collect(),
            None => vec![(JSON.to_string(), Some(json!({})))],
        };
    }

    let declared = op
        .consumes
        .as_ref()
        .or(spec.consumes.as_ref())
        .or(op.produces.as_ref())
        .or(spec.produces.as_ref())
        .filter(|types| !types.is_empty());
    match declared {
        Some(types) => types.iter().map(|t| (t.clone(), None)).collect(),
        None => vec![(JSON.to_string(), None)],
    }
}

fn row_headers(params: &ExtractedParams, content_type: &str, code: &str) -> Map<String, Value> {
    let mut headers = params.headers.clone();
    headers.insert("Content-Type".into(), Value::String(content_type.to_string()));
    headers.insert(RESP_PAYLOAD_HEADER.into(), json!({}));
    headers.insert(RESP_STATUS_HEADER.into(), Value::String(code.to_string()));
    headers
}
