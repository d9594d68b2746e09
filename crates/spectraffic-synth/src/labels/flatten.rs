//! Body flattening into (field path, leaf) pairs and back

use std::fmt;

use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Key(String),
    Index(usize),
}

/// Location of a leaf inside a body. Displays as `a.b[0].c`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldPath(Vec<Segment>);

impl FieldPath {
    fn child(&self, segment: Segment) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment);
        Self(segments)
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            match segment {
                Segment::Key(key) if i == 0 => write!(f, "{key}")?,
                Segment::Key(key) => write!(f, ".{key}")?,
                Segment::Index(idx) => write!(f, "[{idx}]")?,
            }
        }
        Ok(())
    }
}

/// Leaves in document order. Empty containers are leaves.
#[must_use]
pub fn flatten(value: &Value) -> Vec<(FieldPath, Value)> {
    let mut out = Vec::new();
    walk(value, FieldPath::default(), &mut out);
    out
}

fn walk(value: &Value, path: FieldPath, out: &mut Vec<(FieldPath, Value)>) {
    match value {
        Value::Object(obj) if !obj.is_empty() => {
            for (key, child) in obj {
                walk(child, path.child(Segment::Key(key.clone())), out);
            }
        }
        Value::Array(items) if !items.is_empty() => {
            for (idx, child) in items.iter().enumerate() {
                walk(child, path.child(Segment::Index(idx)), out);
            }
        }
        leaf => out.push((path, leaf.clone())),
    }
}

/// Rebuild the nested value from [`flatten`] output.
#[must_use]
pub fn unflatten(leaves: Vec<(FieldPath, Value)>) -> Value {
    let mut root = Value::Null;
    for (path, leaf) in leaves {
        insert(&mut root, &path.0, leaf);
    }
    root
}

fn insert(node: &mut Value, path: &[Segment], leaf: Value) {
    let Some((head, rest)) = path.split_first() else {
        *node = leaf;
        return;
    };

    match head {
        Segment::Key(key) => {
            if !node.is_object() {
                *node = Value::Object(Map::new());
            }
            if let Value::Object(obj) = node {
                let child = obj.entry(key.clone()).or_insert(Value::Null);
                insert(child, rest, leaf);
            }
        }
        Segment::Index(idx) => {
            if !node.is_array() {
                *node = Value::Array(Vec::new());
            }
            if let Value::Array(items) = node {
                if items.len() <= *idx {
                    items.resize(idx + 1, Value::Null);
                }
                insert(&mut items[*idx], rest, leaf);
            }
        }
    }
}
