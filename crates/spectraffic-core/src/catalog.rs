//! Label catalog: semantic label → field-name recognition patterns
//!
//! A field or parameter name is matched against every pattern of every label,
//! in declaration order. The first label with a matching pattern wins, so more
//! specific labels are listed before broader ones.

use std::path::{Path, PathBuf};

use regex::Regex;

/// Built-in catalog, `[label, [patterns...]]` in priority order.
const DEFAULT_PATTERNS: &[(&str, &[&str])] = &[
    ("ssn", &[r"(?i)^ssn$", r"(?i)social_?security"]),
    ("us-banking-info", &[r"(?i)routing", r"(?i)^aba(_?num(ber)?)?$"]),
    ("credit-card", &[r"(?i)credit_?card", r"(?i)card_?num", r"(?i)^pan$"]),
    ("email", &[r"(?i)e-?mail"]),
    ("ip-address", &[r"(?i)^ip$", r"(?i)ip_?addr"]),
    ("phone-number", &[r"(?i)phone", r"(?i)mobile", r"(?i)msisdn"]),
    ("first-name", &[r"(?i)first_?name", r"(?i)given_?name"]),
    ("last-name", &[r"(?i)last_?name", r"(?i)surname", r"(?i)family_?name"]),
    ("username", &[r"(?i)user_?name", r"(?i)^login$"]),
    ("full-name", &[r"(?i)^(full_?)?name$", r"(?i)customer_?name"]),
    ("password", &[r"(?i)passw(or)?d", r"(?i)^pwd$"]),
    ("zip-code", &[r"(?i)zip", r"(?i)postal_?code"]),
    ("city", &[r"(?i)^city$", r"(?i)town"]),
    ("country", &[r"(?i)country"]),
    ("address", &[r"(?i)street", r"(?i)address"]),
    ("uuid", &[r"(?i)uuid", r"(?i)guid"]),
    ("url", &[r"(?i)^url$", r"(?i)website", r"(?i)_url$"]),
    ("date", &[r"(?i)^date$", r"(?i)_date$", r"(?i)birth", r"(?i)^dob$"]),
];

/// Ordered label → patterns mapping. Consulted, never mutated.
#[derive(Debug, Clone)]
pub struct LabelCatalog {
    entries: Vec<LabelEntry>,
}

#[derive(Debug, Clone)]
struct LabelEntry {
    label: String,
    patterns: Vec<Regex>,
}

impl LabelCatalog {
    /// The embedded default catalog.
    #[must_use]
    pub fn builtin() -> Self {
        let entries = DEFAULT_PATTERNS
            .iter()
            .map(|(label, patterns)| LabelEntry {
                label: (*label).to_string(),
                patterns: patterns
                    .iter()
                    .filter_map(|p| Regex::new(p).ok())
                    .collect(),
            })
            .collect();
        Self { entries }
    }

    /// Build a catalog from `(label, patterns)` pairs.
    ///
    /// # Errors
    ///
    /// Returns error if any pattern is not a valid regular expression.
    pub fn from_pairs<I, S, P>(pairs: I) -> Result<Self, CatalogError>
    where
        I: IntoIterator<Item = (S, Vec<P>)>,
        S: Into<String>,
        P: AsRef<str>,
    {
        let mut entries = Vec::new();
        for (label, patterns) in pairs {
            let label = label.into();
            let mut compiled = Vec::with_capacity(patterns.len());
            for pattern in patterns {
                let re = Regex::new(pattern.as_ref()).map_err(|e| CatalogError::Pattern {
                    label: label.clone(),
                    pattern: pattern.as_ref().to_string(),
                    reason: e.to_string(),
                })?;
                compiled.push(re);
            }
            entries.push(LabelEntry {
                label,
                patterns: compiled,
            });
        }
        Ok(Self { entries })
    }

    /// Load a catalog from a JSON file of the form `{"label": ["pattern", ...]}`.
    ///
    /// Key order in the file is the match priority.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read, is not a JSON object of
    /// string arrays, or contains an invalid pattern.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| CatalogError::Io(path.to_path_buf(), e.to_string()))?;
        let raw: serde_json::Map<String, serde_json::Value> =
            serde_json::from_str(&content).map_err(|e| CatalogError::Parse(e.to_string()))?;

        let mut pairs = Vec::with_capacity(raw.len());
        for (label, patterns) in raw {
            let list = patterns
                .as_array()
                .ok_or_else(|| CatalogError::Parse(format!("'{label}' must map to an array")))?
                .iter()
                .map(|p| {
                    p.as_str().map(String::from).ok_or_else(|| {
                        CatalogError::Parse(format!("'{label}' patterns must be strings"))
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            pairs.push((label, list));
        }
        Self::from_pairs(pairs)
    }

    /// Return the first label whose patterns match `field_name`.
    #[must_use]
    pub fn label_for(&self, field_name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.patterns.iter().any(|re| re.is_match(field_name)))
            .map(|e| e.label.as_str())
    }

    /// Placeholder token for the label matching `field_name`, e.g. `<valid-email>`.
    #[must_use]
    pub fn token_for(&self, field_name: &str) -> Option<String> {
        self.label_for(field_name).map(label_token)
    }

    /// Label names in priority order.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.label.as_str())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for LabelCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Render the deferred token for a catalog label.
#[must_use]
pub fn label_token(label: &str) -> String {
    format!("<valid-{label}>")
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Cannot read {0}: {1}")]
    Io(PathBuf, String),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Invalid pattern '{pattern}' for label '{label}': {reason}")]
    Pattern {
        label: String,
        pattern: String,
        reason: String,
    },
}
