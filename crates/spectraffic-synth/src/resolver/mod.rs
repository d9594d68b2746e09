//! Specification loading, reference inlining and normalization
//!
//! `Resolver::resolve` turns an OpenAPI 2/3 document on disk into a
//! [`NormalizedSpec`]: every `$ref` inlined (cycles collapsed), path-level and
//! security-derived parameters merged into each operation, and the component
//! sections dropped.

mod normalize;
mod refs;
mod validate;

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use serde_json::Value;

use crate::spec::NormalizedSpec;

/// OpenAPI major version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpecVersion {
    /// Swagger 2.0
    V2,
    /// OpenAPI 3.x
    V3,
}

impl SpecVersion {
    /// `swagger`, `basePath` or `host` at the root means 2, anything else 3.
    #[must_use]
    pub fn detect(doc: &Value) -> Self {
        let is_v2 = ["swagger", "basePath", "host"]
            .iter()
            .any(|key| doc.get(key).is_some());
        if is_v2 { Self::V2 } else { Self::V3 }
    }
}

impl fmt::Display for SpecVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::V2 => write!(f, "2"),
            Self::V3 => write!(f, "3"),
        }
    }
}

/// Structural problem found by best-effort validation. Never fatal.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("spec validation: {0}")]
pub struct ValidationWarning(pub String);

/// Output of a successful resolution.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub spec: NormalizedSpec,
    pub version: SpecVersion,
    /// Base path as declared (`/` when none)
    pub base_path: String,
    pub warnings: Vec<ValidationWarning>,
}

#[derive(Debug, thiserror::Error)]
pub enum ResolutionError {
    #[error("Cannot read {0}: {1}")]
    Io(PathBuf, String),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Unresolvable reference '{reference}': {reason}")]
    Reference { reference: String, reason: String },
    #[error("Invalid specification: {0}")]
    Structure(String),
}

/// Loads specifications and the documents they reference.
///
/// External documents are parsed once per resolver and shared between all
/// references into them.
#[derive(Debug, Default)]
pub struct Resolver {
    cache: HashMap<PathBuf, Rc<Value>>,
}

impl Resolver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve the specification at `path`.
    ///
    /// # Errors
    ///
    /// Returns error if the document (or a document it references) cannot be
    /// read or parsed, or if a reference does not resolve.
    pub fn resolve(&mut self, path: &Path) -> Result<Resolution, ResolutionError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ResolutionError::Io(path.to_path_buf(), e.to_string()))?;
        let doc = parse_document(path, &content)?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        let resolution = self.resolve_value(doc, base_dir)?;
        tracing::info!(
            spec = %path.display(),
            version = %resolution.version,
            paths = resolution.spec.paths.len(),
            warnings = resolution.warnings.len(),
            "specification resolved"
        );
        Ok(resolution)
    }

    /// Resolve an already parsed document. Relative external references are
    /// looked up from `base_dir`.
    ///
    /// # Errors
    ///
    /// Returns error if a reference does not resolve or `paths` is missing.
    pub fn resolve_value(
        &mut self,
        doc: Value,
        base_dir: &Path,
    ) -> Result<Resolution, ResolutionError> {
        if !doc.is_object() {
            return Err(ResolutionError::Structure(
                "document root is not a mapping".into(),
            ));
        }

        let version = SpecVersion::detect(&doc);
        let warnings = validate::validate(&doc, version);
        for warning in &warnings {
            tracing::warn!("{warning}");
        }

        let mut inlined = refs::Inliner::new(&mut self.cache).inline(doc, base_dir)?;
        normalize::normalize(&mut inlined, version);

        let spec = NormalizedSpec::from_document(&inlined, version)?;
        Ok(Resolution {
            base_path: spec.declared_base_path.clone(),
            version,
            spec,
            warnings,
        })
    }
}

/// Parse JSON or YAML, chosen by extension, else by sniffing the first character.
///
/// # Errors
///
/// Returns error if the content is not valid in the chosen format.
pub fn parse_document(path: &Path, content: &str) -> Result<Value, ResolutionError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "yaml" | "yml" => parse_yaml(content),
        "json" => parse_json(content),
        _ => {
            if content.trim_start().starts_with('{') {
                parse_json(content)
            } else {
                parse_yaml(content)
            }
        }
    }
}

fn parse_json(content: &str) -> Result<Value, ResolutionError> {
    serde_json::from_str(content).map_err(|e| ResolutionError::Parse(format!("Invalid JSON: {e}")))
}

fn parse_yaml(content: &str) -> Result<Value, ResolutionError> {
    let yaml: serde_yml::Value = serde_yml::from_str(content)
        .map_err(|e| ResolutionError::Parse(format!("Invalid YAML: {e}")))?;
    yaml_to_json(yaml)
}

/// Convert YAML to JSON, coercing scalar mapping keys (`200:`, `true:`) to strings.
fn yaml_to_json(value: serde_yml::Value) -> Result<Value, ResolutionError> {
    use serde_yml::Value as Yaml;

    Ok(match value {
        Yaml::Null => Value::Null,
        Yaml::Bool(b) => Value::Bool(b),
        Yaml::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::from(i)
            } else if let Some(u) = n.as_u64() {
                Value::from(u)
            } else {
                n.as_f64()
                    .and_then(serde_json::Number::from_f64)
                    .map_or(Value::Null, Value::Number)
            }
        }
        Yaml::String(s) => Value::String(s),
        Yaml::Sequence(seq) => Value::Array(
            seq.into_iter()
                .map(yaml_to_json)
                .collect::<Result<_, _>>()?,
        ),
        Yaml::Mapping(map) => {
            let mut obj = serde_json::Map::with_capacity(map.len());
            for (key, value) in map {
                obj.insert(yaml_key(key)?, yaml_to_json(value)?);
            }
            Value::Object(obj)
        }
        Yaml::Tagged(tagged) => yaml_to_json(tagged.value)?,
    })
}

fn yaml_key(key: serde_yml::Value) -> Result<String, ResolutionError> {
    use serde_yml::Value as Yaml;

    match key {
        Yaml::String(s) => Ok(s),
        Yaml::Number(n) => Ok(n.to_string()),
        Yaml::Bool(b) => Ok(b.to_string()),
        Yaml::Null => Ok("null".into()),
        Yaml::Tagged(tagged) => yaml_key(tagged.value),
        other => Err(ResolutionError::Parse(format!(
            "Unsupported YAML mapping key: {other:?}"
        ))),
    }
}
