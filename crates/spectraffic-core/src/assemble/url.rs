//! URL cell grammar: `base|{queryJson}|event:N`

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde_json::{Map, Value};

/// Characters left unescaped by form encoding.
const FORM: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Parsed URL cell.
#[derive(Debug, Clone, PartialEq)]
pub struct UrlCell {
    pub base: String,
    /// Query parameters when the cell carried a `|{...}` part
    pub query: Option<Map<String, Value>>,
    pub events: usize,
}

impl UrlCell {
    /// Parse a URL cell. Malformed query JSON or event counts are reported as
    /// the error string; the caller decides whether to degrade.
    ///
    /// # Errors
    ///
    /// Returns a description of the first malformed part.
    pub fn parse(cell: &str) -> Result<Self, String> {
        let cell = cell.trim();
        let Some((base, rest)) = cell.split_once('|') else {
            return Ok(Self {
                base: cell.to_string(),
                query: None,
                events: 1,
            });
        };

        let (query_text, events) = match rest.rsplit_once('|') {
            Some((query, marker)) if marker.trim().starts_with("event") => {
                (query, parse_event_count(marker)?)
            }
            _ => (rest, 1),
        };

        let query = match serde_json::from_str::<Value>(query_text.trim()) {
            Ok(Value::Object(map)) => map,
            Ok(other) => return Err(format!("query part is not an object: {other}")),
            Err(e) => return Err(format!("query part is not JSON: {e}")),
        };

        Ok(Self {
            base: base.to_string(),
            query: Some(query),
            events,
        })
    }

    /// One URL per event. Each is the base plus the encoded query, if any.
    #[must_use]
    pub fn expand(&self) -> Vec<String> {
        let url = match &self.query {
            Some(query) if !query.is_empty() => format!("{}?{}", self.base, form_encode(query)),
            _ => self.base.clone(),
        };
        vec![url; self.events]
    }
}

fn parse_event_count(marker: &str) -> Result<usize, String> {
    marker
        .split_once(':')
        .and_then(|(_, n)| n.trim().parse().ok())
        .ok_or_else(|| format!("invalid event marker '{}'", marker.trim()))
}

/// `application/x-www-form-urlencoded` escaping: space becomes `+`.
#[must_use]
pub fn quote_plus(s: &str) -> String {
    utf8_percent_encode(s, FORM).to_string().replace("%20", "+")
}

/// Encode query parameters in insertion order. Angle brackets stay literal so
/// that placeholders survive for later substitution.
#[must_use]
pub fn form_encode(query: &Map<String, Value>) -> String {
    query
        .iter()
        .map(|(k, v)| {
            let value = match v {
                Value::String(s) => s.clone(),
                Value::Null => String::new(),
                other => other.to_string(),
            };
            format!("{}={}", quote_plus(k), quote_plus(&value))
        })
        .collect::<Vec<_>>()
        .join("&")
        .replace("%3C", "<")
        .replace("%3E", ">")
}

/// Replace every path segment that is exactly `<dynamic-param>` with
/// `name` followed by the next counter value.
pub fn replace_dynamic_segments(url: &str, name: &str, counter: &mut u32) -> String {
    if !url.contains('<') {
        return url.to_string();
    }
    url.split('/')
        .map(|segment| {
            if segment.eq_ignore_ascii_case("<dynamic-param>") {
                let value = format!("{name}{counter}");
                *counter += 1;
                value
            } else {
                segment.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}
