//! Path, query, header and body values for one operation

use rand::Rng;
use rand::seq::SliceRandom;
use serde_json::{Map, Value, json};

use spectraffic_core::LabelCatalog;

use crate::datagen::{self, random_token};
use crate::spec::{Operation, ParamLocation, PathItem};

/// Upper bound for concrete numeric header values.
const MAX_HEADER_NUMBER: i64 = 9_999_999;

/// Everything an operation's parameters contribute to a row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedParams {
    /// `?a=1&b=2`, empty when there are no query parameters
    pub query: String,
    pub headers: Map<String, Value>,
    /// Body template from `in: body` / `formData` parameters, `{}` when none
    pub body: Value,
}

/// Substitute every `{name}` in `path`.
///
/// A name the catalog recognises becomes its label token; otherwise the first
/// declaration among the path's operations decides: an enum gives a concrete
/// choice, anything else `<random-{type}>`. An unterminated `{` is kept.
pub fn extract_path_params<R: Rng + ?Sized>(
    path: &str,
    item: &PathItem,
    catalog: &LabelCatalog,
    rng: &mut R,
) -> String {
    let mut out = String::with_capacity(path.len());
    let mut chosen: Vec<(&str, String)> = Vec::new();
    let mut rest = path;

    while let Some(open) = rest.find('{') {
        let Some(len) = rest[open..].find('}') else {
            break;
        };
        let name = &rest[open + 1..open + len];
        out.push_str(&rest[..open]);

        if let Some((_, value)) = chosen.iter().find(|(n, _)| *n == name) {
            out.push_str(value);
        } else {
            let value = path_value(name, item, catalog, rng);
            out.push_str(&value);
            chosen.push((name, value));
        }
        rest = &rest[open + len + 1..];
    }

    out.push_str(rest);
    out
}

fn path_value<R: Rng + ?Sized>(
    name: &str,
    item: &PathItem,
    catalog: &LabelCatalog,
    rng: &mut R,
) -> String {
    if let Some(token) = catalog.token_for(name) {
        return token;
    }

    let schema = item
        .declared_param(name)
        .map(|p| datagen::resolve_composite(&p.schema, rng))
        .unwrap_or_else(|| json!({}));

    match choose_enum(&schema, rng) {
        Some(choice) => plain(&choice),
        None => random_token(type_of(&schema)),
    }
}

/// Build query string, headers and body template from `op`'s parameters.
pub fn extract_params<R: Rng + ?Sized>(
    op: &Operation,
    catalog: &LabelCatalog,
    rng: &mut R,
) -> ExtractedParams {
    let mut query: Vec<String> = Vec::new();
    let mut headers = Map::new();
    let mut body: Option<Value> = None;
    let mut form = Map::new();

    for param in &op.parameters {
        let schema = datagen::resolve_composite(&param.schema, rng);
        let name = param.name.as_str();

        match param.location {
            ParamLocation::Query => query.push(query_pair(name, &schema, catalog, rng)),
            ParamLocation::Header => {
                headers.insert(name.to_string(), header_value(name, &schema, catalog, rng));
            }
            ParamLocation::Body => {
                let value = choose_enum(&schema, rng)
                    .unwrap_or_else(|| datagen::generate(&schema, None, catalog, rng));
                body.get_or_insert(value);
            }
            ParamLocation::FormData => {
                let value = choose_enum(&schema, rng).unwrap_or_else(|| {
                    let kind = match type_of(&schema) {
                        "file" => "string",
                        other => other,
                    };
                    Value::String(label_or_random(name, kind, catalog))
                });
                form.insert(name.to_string(), value);
            }
            ParamLocation::Path | ParamLocation::Cookie => {}
        }
    }

    let body = match body {
        Some(Value::Object(mut obj)) if !form.is_empty() => {
            obj.insert("Body".into(), Value::Object(form));
            Value::Object(obj)
        }
        Some(body) if form.is_empty() => body,
        _ if !form.is_empty() => Value::Object(form),
        _ => json!({}),
    };

    ExtractedParams {
        query: if query.is_empty() {
            String::new()
        } else {
            format!("?{}", query.join("&"))
        },
        headers,
        body,
    }
}

fn query_pair<R: Rng + ?Sized>(
    name: &str,
    schema: &Value,
    catalog: &LabelCatalog,
    rng: &mut R,
) -> String {
    if let Some(choice) = choose_enum(schema, rng) {
        return format!("{name}={}", plain(&choice));
    }

    let kind = type_of(schema);
    if kind == "array" {
        let items = schema.get("items").cloned().unwrap_or_else(|| json!({}));
        let item_kind = type_of(&items);
        let fixed = if item_kind == "string" {
            bounded_string(&items, rng).or_else(|| bounded_string(schema, rng))
        } else {
            None
        };
        let inner = fixed.unwrap_or_else(|| label_or_random(name, item_kind, catalog));
        return format!("{name}=[{inner}]");
    }

    let value = if kind == "string" {
        bounded_string(schema, rng)
    } else {
        None
    };
    format!(
        "{name}={}",
        value.unwrap_or_else(|| label_or_random(name, kind, catalog))
    )
}

fn header_value<R: Rng + ?Sized>(
    name: &str,
    schema: &Value,
    catalog: &LabelCatalog,
    rng: &mut R,
) -> Value {
    match type_of(schema) {
        "array" => {
            if let Some(choice) = choose_enum(schema, rng) {
                return choice;
            }
            let item_kind = schema.get("items").map_or("string", type_of);
            Value::String(format!("[{}]", label_or_random(name, item_kind, catalog)))
        }
        "object" => {
            let props = schema
                .get("properties")
                .and_then(Value::as_object)
                .map(|props| {
                    props
                        .iter()
                        .map(|(key, prop)| {
                            let token = label_or_random(key, type_of(prop), catalog);
                            (key.clone(), Value::String(token))
                        })
                        .collect()
                })
                .unwrap_or_default();
            Value::Object(props)
        }
        "integer" => json!(rng.gen_range(0..=MAX_HEADER_NUMBER)),
        "number" => json!(rng.gen_range(0.0..=MAX_HEADER_NUMBER as f64)),
        kind => choose_enum(schema, rng)
            .unwrap_or_else(|| Value::String(label_or_random(name, kind, catalog))),
    }
}

/// A letter string with length in `[minLength or maxLength-1, maxLength]`.
/// Both bounds are capped at [`datagen::MAX_STRING_LEN`].
fn bounded_string<R: Rng + ?Sized>(schema: &Value, rng: &mut R) -> Option<String> {
    let obj = schema.as_object()?;
    let max = datagen::length(obj, "maxLength")?;
    let min = datagen::length(obj, "minLength")
        .unwrap_or_else(|| max.saturating_sub(1))
        .min(max);
    let len = rng.gen_range(min..=max);
    Some(datagen::random_letters(rng, len))
}

fn label_or_random(name: &str, kind: &str, catalog: &LabelCatalog) -> String {
    catalog
        .token_for(name)
        .unwrap_or_else(|| random_token(kind))
}

fn choose_enum<R: Rng + ?Sized>(schema: &Value, rng: &mut R) -> Option<Value> {
    schema
        .get("enum")
        .and_then(Value::as_array)
        .and_then(|values| values.choose(rng))
        .cloned()
}

fn type_of(schema: &Value) -> &str {
    schema.get("type").and_then(Value::as_str).unwrap_or("string")
}

/// Strings without quotes, everything else as JSON text.
fn plain(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
