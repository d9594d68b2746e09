//! `$ref` inlining with bounded self-expansion

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use percent_encoding::percent_decode_str;
use serde_json::{Value, json};

use super::{ResolutionError, parse_document};

/// How many times a reference may be expanded inside its own expansion.
/// The next nested occurrence becomes `{}`.
const RECURSION_LIMIT: usize = 1;

/// Document a reference is evaluated against.
#[derive(Clone)]
struct Scope {
    doc: Rc<Value>,
    /// `None` for the root document
    file: Option<PathBuf>,
    dir: PathBuf,
}

impl Scope {
    fn key(&self, pointer: &str) -> String {
        match &self.file {
            Some(file) => format!("{}#{pointer}", file.display()),
            None => format!("#{pointer}"),
        }
    }
}

pub(super) struct Inliner<'c> {
    cache: &'c mut HashMap<PathBuf, Rc<Value>>,
    /// References currently being expanded, outermost first
    active: Vec<String>,
}

impl<'c> Inliner<'c> {
    pub(super) fn new(cache: &'c mut HashMap<PathBuf, Rc<Value>>) -> Self {
        Self {
            cache,
            active: Vec::new(),
        }
    }

    /// Return `doc` with every reference replaced by its (recursively inlined) target.
    pub(super) fn inline(&mut self, doc: Value, base_dir: &Path) -> Result<Value, ResolutionError> {
        let scope = Scope {
            doc: Rc::new(doc),
            file: None,
            dir: base_dir.to_path_buf(),
        };
        let root = Rc::clone(&scope.doc);
        self.walk(&root, &scope)
    }

    fn walk(&mut self, value: &Value, scope: &Scope) -> Result<Value, ResolutionError> {
        match value {
            Value::Object(obj) => {
                if let Some(Value::String(reference)) = obj.get("$ref") {
                    return self.follow(reference, scope);
                }
                let mut out = serde_json::Map::with_capacity(obj.len());
                for (key, child) in obj {
                    out.insert(key.clone(), self.walk(child, scope)?);
                }
                Ok(Value::Object(out))
            }
            Value::Array(items) => items
                .iter()
                .map(|item| self.walk(item, scope))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            other => Ok(other.clone()),
        }
    }

    fn follow(&mut self, reference: &str, scope: &Scope) -> Result<Value, ResolutionError> {
        let (file, pointer) = reference.split_once('#').unwrap_or((reference, ""));

        let target_scope = if file.is_empty() {
            scope.clone()
        } else {
            self.load(file, scope, reference)?
        };

        let key = target_scope.key(pointer);
        let depth = self.active.iter().filter(|k| **k == key).count();
        if depth > RECURSION_LIMIT {
            tracing::debug!(reference, "recursive reference collapsed to empty schema");
            return Ok(json!({}));
        }

        let target = lookup(&target_scope.doc, pointer)
            .ok_or_else(|| ResolutionError::Reference {
                reference: reference.to_string(),
                reason: "pointer does not resolve".into(),
            })?
            .clone();

        self.active.push(key);
        let inlined = self.walk(&target, &target_scope);
        self.active.pop();
        inlined
    }

    fn load(&mut self, file: &str, scope: &Scope, reference: &str) -> Result<Scope, ResolutionError> {
        if file.contains("://") {
            return Err(ResolutionError::Reference {
                reference: reference.to_string(),
                reason: "remote references are not supported".into(),
            });
        }

        let joined = scope.dir.join(file);
        let path = joined.canonicalize().unwrap_or(joined);

        let doc = if let Some(doc) = self.cache.get(&path) {
            Rc::clone(doc)
        } else {
            let content =
                std::fs::read_to_string(&path).map_err(|e| ResolutionError::Reference {
                    reference: reference.to_string(),
                    reason: format!("{}: {e}", path.display()),
                })?;
            let doc = Rc::new(parse_document(&path, &content)?);
            tracing::debug!(file = %path.display(), "external document loaded");
            self.cache.insert(path.clone(), Rc::clone(&doc));
            doc
        };

        Ok(Scope {
            doc,
            dir: path
                .parent()
                .map_or_else(|| scope.dir.clone(), Path::to_path_buf),
            file: Some(path),
        })
    }
}

/// Evaluate a JSON pointer fragment (without the leading `#`).
fn lookup<'v>(doc: &'v Value, pointer: &str) -> Option<&'v Value> {
    if pointer.is_empty() {
        return Some(doc);
    }
    let rest = pointer.strip_prefix('/')?;

    rest.split('/').try_fold(doc, |node, raw| {
        let segment = decode_segment(raw);
        match node {
            Value::Object(obj) => obj.get(&segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        }
    })
}

/// Percent escapes first, then `~1` → `/` and `~0` → `~`.
fn decode_segment(segment: &str) -> String {
    percent_decode_str(segment)
        .decode_utf8_lossy()
        .replace("~1", "/")
        .replace("~0", "~")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inline(doc: Value) -> Result<Value, ResolutionError> {
        let mut cache = HashMap::new();
        Inliner::new(&mut cache).inline(doc, Path::new("."))
    }

    #[test]
    fn local_refs_are_inlined() {
        let doc = json!({
            "a": {"$ref": "#/components/schemas/User"},
            "components": {"schemas": {"User": {"type": "object", "properties": {"id": {"type": "integer"}}}}}
        });
        let out = inline(doc).unwrap();
        assert_eq!(out["a"]["properties"]["id"]["type"], "integer");
    }

    #[test]
    fn pointer_segments_are_decoded() {
        let doc = json!({
            "paths": {"/users/{id}": {"get": {"ok": true}}},
            "weird name": {"a~b": 1},
            "list": [10, 20],
            "x": {"$ref": "#/paths/~1users~1%7Bid%7D/get"},
            "y": {"$ref": "#/weird%20name/a~0b"},
            "z": {"$ref": "#/list/1"}
        });
        let out = inline(doc).unwrap();
        assert_eq!(out["x"], json!({"ok": true}));
        assert_eq!(out["y"], json!(1));
        assert_eq!(out["z"], json!(20));
    }

    #[test]
    fn self_reference_expands_once_then_collapses() {
        let doc = json!({
            "root": {"$ref": "#/defs/Node"},
            "defs": {"Node": {"type": "object", "properties": {"child": {"$ref": "#/defs/Node"}}}}
        });
        let out = inline(doc).unwrap();

        let child = &out["root"]["properties"]["child"];
        assert_eq!(child["type"], "object");
        assert_eq!(child["properties"]["child"], json!({}));
    }

    #[test]
    fn mutual_recursion_terminates() {
        let doc = json!({
            "start": {"$ref": "#/defs/A"},
            "defs": {
                "A": {"properties": {"b": {"$ref": "#/defs/B"}}},
                "B": {"properties": {"a": {"$ref": "#/defs/A"}}}
            }
        });
        let out = inline(doc).unwrap();
        let text = out.to_string();
        assert!(!text.contains("$ref"));
        let a_again = &out["start"]["properties"]["b"]["properties"]["a"];
        assert_eq!(a_again["properties"]["b"]["properties"]["a"], json!({}));
    }

    #[test]
    fn dangling_pointer_is_an_error() {
        let err = inline(json!({"a": {"$ref": "#/nope"}})).unwrap_err();
        assert!(matches!(err, ResolutionError::Reference { .. }));
    }

    #[test]
    fn remote_refs_are_rejected() {
        let err = inline(json!({"a": {"$ref": "https://example.com/s.json#/x"}})).unwrap_err();
        assert!(err.to_string().contains("remote"));
    }

    #[test]
    fn external_files_resolve_relative_and_are_cached() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("schemas")).unwrap();
        std::fs::write(
            dir.path().join("schemas").join("pet.yaml"),
            "Pet:\n  type: object\n  properties:\n    tag:\n      $ref: '#/Tag'\nTag:\n  type: string\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("whole.json"), r#"{"type": "boolean"}"#).unwrap();

        let doc = json!({
            "one": {"$ref": "schemas/pet.yaml#/Pet"},
            "two": {"$ref": "schemas/pet.yaml#/Tag"},
            "three": {"$ref": "whole.json"}
        });
        let mut cache = HashMap::new();
        let out = Inliner::new(&mut cache).inline(doc, dir.path()).unwrap();

        assert_eq!(out["one"]["properties"]["tag"]["type"], "string");
        assert_eq!(out["two"]["type"], "string");
        assert_eq!(out["three"]["type"], "boolean");
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn missing_external_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = HashMap::new();
        let err = Inliner::new(&mut cache)
            .inline(json!({"a": {"$ref": "gone.yaml#/X"}}), dir.path())
            .unwrap_err();
        assert!(matches!(err, ResolutionError::Reference { .. }));
    }
}
