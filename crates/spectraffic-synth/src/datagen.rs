//! JSON Schema → representative `serde_json::Value` generator
//!
//! Numeric leaves are concrete. String leaves are deferred tokens
//! (`<random-string>`, `<valid-email>`) that the label resolver fills in later,
//! unless `maxLength` pins the length, in which case a letter string is produced.

use rand::Rng;
use rand::seq::SliceRandom;
use serde_json::{Map, Value, json};

use spectraffic_core::{LabelCatalog, label_token};

/// Maximum nesting followed before a subtree collapses to `{}`.
const MAX_DEPTH: u32 = 20;

/// Maximum string length generated from `maxLength`.
pub(crate) const MAX_STRING_LEN: usize = 10_000;

/// Upper bound for generated integers.
pub const MAX_INTEGER: i64 = 9_999_999_999;

/// Range for generated numbers.
pub const NUMBER_RANGE: (f64, f64) = (-9999.0, 999_999.0);

/// Schema classified by the shape that drives generation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SchemaNode<'s> {
    Object(Option<&'s Map<String, Value>>),
    Array(Option<&'s Value>),
    Scalar {
        kind: &'s str,
        max_length: Option<usize>,
        min_length: Option<usize>,
    },
    Enum(&'s [Value]),
    Composite,
    Empty,
}

const COMPOSITE_KEYS: [&str; 3] = ["oneOf", "anyOf", "allOf"];

impl<'s> SchemaNode<'s> {
    #[must_use]
    pub fn classify(schema: &'s Value) -> Self {
        let Some(obj) = schema.as_object().filter(|o| !o.is_empty()) else {
            return Self::Empty;
        };

        if COMPOSITE_KEYS.iter().any(|k| obj.contains_key(*k)) {
            return Self::Composite;
        }
        if let Some(values) = obj
            .get("enum")
            .and_then(Value::as_array)
            .filter(|v| !v.is_empty())
        {
            return Self::Enum(values);
        }

        let kind = obj.get("type").and_then(Value::as_str).unwrap_or("string");
        match kind {
            "array" => Self::Array(obj.get("items")),
            "object" => Self::Object(obj.get("properties").and_then(Value::as_object)),
            _ => Self::Scalar {
                kind,
                max_length: length(obj, "maxLength"),
                min_length: length(obj, "minLength"),
            },
        }
    }
}

pub(crate) fn length(obj: &Map<String, Value>, key: &str) -> Option<usize> {
    obj.get(key)
        .and_then(Value::as_u64)
        .map(|v| usize::try_from(v).unwrap_or(MAX_STRING_LEN).min(MAX_STRING_LEN))
}

/// Replace composition keywords by a concrete choice.
///
/// `oneOf`/`anyOf` pick one branch uniformly. `allOf` merges its branches left
/// to right: `properties` are merged key by key, every other key is taken from
/// the last branch that declares it.
pub fn resolve_composite<R: Rng + ?Sized>(schema: &Value, rng: &mut R) -> Value {
    let Value::Object(obj) = schema else {
        return schema.clone();
    };

    for key in ["oneOf", "anyOf"] {
        if let Some(branches) = obj.get(key).and_then(Value::as_array) {
            return match branches.choose(rng) {
                Some(branch) => resolve_composite(branch, rng),
                None => json!({}),
            };
        }
    }

    if let Some(branches) = obj.get("allOf").and_then(Value::as_array) {
        let mut merged = Map::new();
        for branch in branches {
            let Value::Object(resolved) = resolve_composite(branch, rng) else {
                continue;
            };
            for (key, value) in resolved {
                merge_key(&mut merged, key, value);
            }
        }
        return Value::Object(merged);
    }

    Value::Object(
        obj.iter()
            .map(|(k, v)| (k.clone(), resolve_composite(v, rng)))
            .collect(),
    )
}

fn merge_key(merged: &mut Map<String, Value>, key: String, value: Value) {
    if key == "properties" {
        if let (Some(Value::Object(existing)), Value::Object(props)) =
            (merged.get_mut(&key), &value)
        {
            existing.extend(props.iter().map(|(k, v)| (k.clone(), v.clone())));
            return;
        }
    }
    merged.insert(key, value);
}

/// Generate a body value for `schema`.
///
/// `hint` is the label (or raw field name) the value is generated for; a hint
/// that names a catalog label turns string leaves into `<valid-{label}>`.
pub fn generate<R: Rng + ?Sized>(
    schema: &Value,
    hint: Option<&str>,
    catalog: &LabelCatalog,
    rng: &mut R,
) -> Value {
    let resolved = resolve_composite(schema, rng);
    generate_inner(&resolved, hint, catalog, rng, 0)
}

fn generate_inner<R: Rng + ?Sized>(
    schema: &Value,
    hint: Option<&str>,
    catalog: &LabelCatalog,
    rng: &mut R,
    depth: u32,
) -> Value {
    if depth > MAX_DEPTH {
        return json!({});
    }

    match SchemaNode::classify(schema) {
        SchemaNode::Empty | SchemaNode::Composite => json!({}),
        SchemaNode::Enum(values) => values.choose(rng).cloned().unwrap_or(Value::Null),
        SchemaNode::Array(items) => {
            let item = items.map_or_else(
                || json!({}),
                |items| generate_inner(items, hint, catalog, rng, depth + 1),
            );
            Value::Array(vec![item])
        }
        SchemaNode::Object(properties) => {
            let mut out = Map::new();
            for (name, prop) in properties.into_iter().flatten() {
                let hint = catalog.label_for(name).unwrap_or(name.as_str());
                out.insert(
                    name.clone(),
                    generate_inner(prop, Some(hint), catalog, rng, depth + 1),
                );
            }
            Value::Object(out)
        }
        SchemaNode::Scalar {
            kind, max_length, ..
        } => match (kind, max_length) {
            ("integer", _) => json!(rng.gen_range(0..=MAX_INTEGER)),
            ("number", _) => json!(rng.gen_range(NUMBER_RANGE.0..=NUMBER_RANGE.1)),
            ("string", Some(len)) => Value::String(random_letters(rng, len)),
            _ => Value::String(leaf_token(kind, hint, catalog)),
        },
    }
}

/// `<valid-{label}>` when `hint` names a catalog label, else `<random-{kind}>`.
pub(crate) fn leaf_token(kind: &str, hint: Option<&str>, catalog: &LabelCatalog) -> String {
    match hint {
        Some(label) if catalog.labels().any(|l| l == label) => label_token(label),
        _ => random_token(kind),
    }
}

#[must_use]
pub fn random_token(kind: &str) -> String {
    format!("<random-{kind}>")
}

pub(crate) fn random_letters<R: Rng + ?Sized>(rng: &mut R, len: usize) -> String {
    const CHARS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";
    (0..len)
        .map(|_| CHARS[rng.gen_range(0..CHARS.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    fn rng() -> SmallRng {
        SmallRng::seed_from_u64(42)
    }

    fn gen_value(schema: &Value) -> Value {
        generate(schema, None, &LabelCatalog::builtin(), &mut rng())
    }

    #[test]
    fn classify_shapes() {
        assert_eq!(SchemaNode::classify(&json!({})), SchemaNode::Empty);
        assert_eq!(SchemaNode::classify(&json!(null)), SchemaNode::Empty);
        assert_eq!(
            SchemaNode::classify(&json!({"oneOf": []})),
            SchemaNode::Composite
        );
        assert!(matches!(
            SchemaNode::classify(&json!({"type": "string", "enum": ["a"]})),
            SchemaNode::Enum(_)
        ));
        assert_eq!(
            SchemaNode::classify(&json!({"maxLength": 3})),
            SchemaNode::Scalar {
                kind: "string",
                max_length: Some(3),
                min_length: None
            }
        );
        assert!(matches!(
            SchemaNode::classify(&json!({"type": "array"})),
            SchemaNode::Array(None)
        ));
    }

    #[test]
    fn empty_schema_is_empty_object() {
        assert_eq!(gen_value(&json!({})), json!({}));
    }

    #[test]
    fn integers_and_numbers_are_concrete() {
        let n = gen_value(&json!({"type": "integer"})).as_i64().unwrap();
        assert!((0..=MAX_INTEGER).contains(&n));

        let f = gen_value(&json!({"type": "number"})).as_f64().unwrap();
        assert!((NUMBER_RANGE.0..=NUMBER_RANGE.1).contains(&f));
    }

    #[test]
    fn strings_are_deferred_tokens() {
        assert_eq!(gen_value(&json!({"type": "string"})), json!("<random-string>"));
        assert_eq!(gen_value(&json!({"type": "boolean"})), json!("<random-boolean>"));
        assert_eq!(gen_value(&json!({"format": "uuid"})), json!("<random-string>"));
    }

    #[test]
    fn max_length_pins_a_letter_string() {
        let s = gen_value(&json!({"type": "string", "maxLength": 7}));
        let s = s.as_str().unwrap();
        assert_eq!(s.len(), 7);
        assert!(s.chars().all(|c| c.is_ascii_alphabetic()));
    }

    #[test]
    fn array_has_exactly_one_item() {
        let v = gen_value(&json!({"type": "array", "items": {"type": "integer"}}));
        assert_eq!(v.as_array().unwrap().len(), 1);
        assert!(v[0].is_i64());
        assert_eq!(gen_value(&json!({"type": "array"})), json!([{}]));
    }

    #[test]
    fn object_properties_use_catalog_labels() {
        let schema = json!({
            "type": "object",
            "properties": {
                "email": {"type": "string"},
                "note": {"type": "string"},
                "tags": {"type": "array", "items": {"type": "string"}},
                "customerEmail": {"type": "array", "items": {"type": "string"}}
            }
        });
        let v = gen_value(&schema);
        assert_eq!(v["email"], "<valid-email>");
        assert_eq!(v["note"], "<random-string>");
        assert_eq!(v["tags"], json!(["<random-string>"]));
        assert_eq!(v["customerEmail"], json!(["<valid-email>"]));
    }

    #[test]
    fn enum_value_is_chosen() {
        let v = gen_value(&json!({"type": "string", "enum": ["a", "b", "c"]}));
        assert!(["a", "b", "c"].contains(&v.as_str().unwrap()));
    }

    #[test]
    fn one_of_picks_a_branch() {
        let schema = json!({"oneOf": [{"type": "integer"}, {"type": "number"}]});
        for seed in 0..10 {
            let v = generate(
                &schema,
                None,
                &LabelCatalog::builtin(),
                &mut SmallRng::seed_from_u64(seed),
            );
            assert!(v.is_number());
        }
    }

    #[test]
    fn all_of_merges_properties_and_last_wins() {
        let schema = json!({"allOf": [
            {"type": "object", "description": "first", "properties": {"a": {"type": "integer"}, "c": {"type": "integer"}}},
            {"description": "second", "properties": {"b": {"type": "string"}, "c": {"type": "string"}}}
        ]});
        let merged = resolve_composite(&schema, &mut rng());
        assert_eq!(merged["type"], "object");
        assert_eq!(merged["description"], "second");
        let props = merged["properties"].as_object().unwrap();
        let keys: Vec<_> = props.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["a", "c", "b"]);
        assert_eq!(props["c"]["type"], "string");
    }

    #[test]
    fn nested_composites_are_resolved() {
        let schema = json!({
            "type": "object",
            "properties": {"pet": {"anyOf": [{"type": "integer"}]}}
        });
        let resolved = resolve_composite(&schema, &mut rng());
        assert_eq!(resolved["properties"]["pet"], json!({"type": "integer"}));
    }

    #[test]
    fn resolution_without_choices_is_identity() {
        let schema = json!({"type": "object", "properties": {"a": {"type": "string", "maxLength": 3}}});
        assert_eq!(resolve_composite(&schema, &mut rng()), schema);
    }
}
