//! Label resolution: placeholder tokens → concrete values
//!
//! A [`LabelResolver`] lives for one run. It owns its RNG, the two sequence
//! counters, the mutation parameters drawn at construction and the per-field
//! history used to keep body values unique.

pub mod flatten;
pub mod regex_gen;
pub mod token;
pub mod values;

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};

use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde_json::Value;

use spectraffic_core::assemble::url::quote_plus;
use spectraffic_core::{BodySide, Substitution};

pub use token::{Directive, LabelKind, Placeholder, UnresolvedPlaceholder};

/// Retries after a collision before a duplicate is accepted.
const UNIQUE_RETRIES: usize = 15;

const MUTATION_FRACTIONS: [f64; 5] = [0.0, 0.33, 0.5, 0.75, 1.0];

/// `$key$` pools, `{key: [values]}`.
pub type LabelData = HashMap<String, Vec<Value>>;

#[derive(Debug, thiserror::Error)]
pub enum LabelDataError {
    #[error("Cannot read {0}: {1}")]
    Io(PathBuf, String),
    #[error("Invalid label data: {0}")]
    Parse(String),
}

/// Load `$key$` pools from a JSON file of the form `{"key": [values...]}`.
///
/// # Errors
///
/// Returns error if the file cannot be read or is not an object of arrays.
pub fn load_label_data(path: &Path) -> Result<LabelData, LabelDataError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| LabelDataError::Io(path.to_path_buf(), e.to_string()))?;
    serde_json::from_str(&content).map_err(|e| LabelDataError::Parse(e.to_string()))
}

/// Largest four-digit serial; the next one wraps to 0001.
const SSN_SERIAL_MAX: u32 = 9999;

/// Incrementing `AAA-GG-SSSS` identifier.
#[derive(Debug, Clone)]
struct SsnSequence {
    prefix: String,
    serial: u32,
}

impl SsnSequence {
    fn next(&mut self) -> String {
        let value = format!("{}-{:04}", self.prefix, self.serial);
        self.serial = self.serial % SSN_SERIAL_MAX + 1;
        value
    }
}

#[derive(Debug)]
pub struct LabelResolver {
    rng: SmallRng,
    mutation_fraction: f64,
    literal_count: usize,
    ssn: SsnSequence,
    routing: u64,
    request_history: HashMap<String, Vec<Value>>,
    response_history: HashMap<String, Vec<Value>>,
    pools: HashMap<String, VecDeque<Value>>,
    unresolved: Vec<UnresolvedPlaceholder>,
}

impl LabelResolver {
    #[must_use]
    pub fn new(seed: u64) -> Self {
        let mut rng = SmallRng::seed_from_u64(seed);
        let mutation_fraction = MUTATION_FRACTIONS.choose(&mut rng).copied().unwrap_or(0.0);
        let literal_count = rng.gen_range(1..=5);
        let (area, group, serial) = values::ssn_parts(&mut rng);
        let routing = values::routing_number(&mut rng).parse().unwrap_or(11_000_015);

        Self {
            rng,
            mutation_fraction,
            literal_count,
            ssn: SsnSequence {
                prefix: format!("{area:03}-{group:02}"),
                serial,
            },
            routing,
            request_history: HashMap::new(),
            response_history: HashMap::new(),
            pools: HashMap::new(),
            unresolved: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_label_data(mut self, data: LabelData) -> Self {
        self.pools = data
            .into_iter()
            .map(|(key, values)| (key, values.into()))
            .collect();
        self
    }

    /// Mutation position fraction and literal count drawn at construction.
    #[must_use]
    pub fn mutation(&self) -> (f64, usize) {
        (self.mutation_fraction, self.literal_count)
    }

    /// Tokens left unresolved so far.
    #[must_use]
    pub fn unresolved(&self) -> &[UnresolvedPlaceholder] {
        &self.unresolved
    }

    /// Produce the value for one directive. `None` leaves the token as written.
    pub fn resolve(&mut self, directive: &Directive) -> Option<Value> {
        let result = match directive {
            Directive::Valid(kind) | Directive::Random(kind) => Ok(values::valid(*kind, &mut self.rng)),
            Directive::Invalid(kind) => Ok(values::invalid(*kind, &mut self.rng)),
            Directive::Mutated(kind) => {
                let original = plain(&values::valid(*kind, &mut self.rng));
                Ok(Value::String(values::mutate(
                    &original,
                    self.mutation_fraction,
                    self.literal_count,
                    &mut self.rng,
                )))
            }
            Directive::Sequence(LabelKind::Ssn) => Ok(Value::String(self.ssn.next())),
            Directive::Sequence(LabelKind::UsBankingInfo) => {
                let value = format!("{:09}", self.routing);
                self.routing += 1;
                Ok(Value::String(value))
            }
            Directive::Sequence(kind) => Err(UnresolvedPlaceholder::NoSequence(*kind)),
            Directive::Regex(pattern) => regex_gen::generate(pattern, &mut self.rng).map(Value::String),
            Directive::Embedded(text) => {
                let (out, failures) = regex_gen::substitute_embedded(text, &mut self.rng);
                for failure in failures {
                    self.report(failure);
                }
                Ok(Value::String(out))
            }
        };

        match result {
            Ok(value) => Some(value),
            Err(e) => {
                self.report(e);
                None
            }
        }
    }

    /// Parse and resolve the text between a token's brackets.
    pub fn resolve_token(&mut self, inner: &str) -> Option<Value> {
        match Directive::parse(inner) {
            Ok(directive) => self.resolve(&directive),
            Err(e) => {
                self.report(e);
                None
            }
        }
    }

    /// Substitute `<…>` spans in a URL, form-encoding each value.
    pub fn resolve_url(&mut self, url: &str) -> String {
        self.substitute_spans(url, quote_plus)
    }

    /// Substitute placeholders in a header cell without encoding.
    ///
    /// A JSON object or array cell has its string leaves resolved and stays
    /// valid JSON; a leaf that is a single token takes the value's own type.
    /// Any other text gets plain span substitution.
    pub fn resolve_header(&mut self, header: &str) -> String {
        match serde_json::from_str::<Value>(header) {
            Ok(parsed @ (Value::Object(_) | Value::Array(_))) => {
                let leaves = flatten::flatten(&parsed)
                    .into_iter()
                    .map(|(path, leaf)| match leaf {
                        Value::String(s) => (path, self.resolve_header_leaf(&s)),
                        other => (path, other),
                    })
                    .collect();
                flatten::unflatten(leaves).to_string()
            }
            _ => self.substitute_spans(header, str::to_string),
        }
    }

    fn resolve_header_leaf(&mut self, leaf: &str) -> Value {
        match Placeholder::parse(leaf) {
            Placeholder::Directive(inner) => self
                .resolve_token(inner)
                .unwrap_or_else(|| Value::String(leaf.to_string())),
            _ => Value::String(self.substitute_spans(leaf, str::to_string)),
        }
    }

    /// Substitute every placeholder leaf of `template`.
    pub fn resolve_body(&mut self, template: &Value, side: BodySide) -> Value {
        let leaves = flatten::flatten(template)
            .into_iter()
            .map(|(path, leaf)| {
                let value = match &leaf {
                    Value::String(s) => self.resolve_leaf(&path.to_string(), s, side),
                    _ => None,
                };
                (path, value.unwrap_or(leaf))
            })
            .collect();
        flatten::unflatten(leaves)
    }

    fn resolve_leaf(&mut self, key: &str, leaf: &str, side: BodySide) -> Option<Value> {
        match Placeholder::parse(leaf) {
            Placeholder::Directive(inner) => {
                let directive = match Directive::parse(inner) {
                    Ok(d) => d,
                    Err(e) => {
                        self.report(e);
                        return None;
                    }
                };
                let mut value = self.resolve(&directive)?;
                let mut retries = UNIQUE_RETRIES;
                while retries > 0 && self.seen(side, key, &value) {
                    value = self.resolve(&directive)?;
                    retries -= 1;
                }
                self.history(side)
                    .entry(key.to_string())
                    .or_default()
                    .push(value.clone());
                Some(value)
            }
            Placeholder::Pool(name) => {
                let value = self.pools.get_mut(name).and_then(VecDeque::pop_front);
                if value.is_none() {
                    self.report(UnresolvedPlaceholder::EmptyPool(name.to_string()));
                }
                value
            }
            Placeholder::Embedded(text) => {
                let (out, failures) = regex_gen::substitute_embedded(text, &mut self.rng);
                for failure in failures {
                    self.report(failure);
                }
                Some(Value::String(out))
            }
            Placeholder::Literal => None,
        }
    }

    fn substitute_spans(&mut self, text: &str, encode: fn(&str) -> String) -> String {
        let mut out = String::with_capacity(text.len());
        let mut rest = text;

        while let Some(open) = rest.find('<') {
            let Some(len) = rest[open..].find('>') else {
                break;
            };
            let span = &rest[open..=open + len];
            out.push_str(&rest[..open]);
            match self.resolve_token(&span[1..span.len() - 1]) {
                Some(value) => out.push_str(&encode(&plain(&value))),
                None => out.push_str(span),
            }
            rest = &rest[open + len + 1..];
        }

        out.push_str(rest);
        out
    }

    fn seen(&mut self, side: BodySide, key: &str, value: &Value) -> bool {
        self.history(side).get(key).is_some_and(|vals| vals.contains(value))
    }

    fn history(&mut self, side: BodySide) -> &mut HashMap<String, Vec<Value>> {
        match side {
            BodySide::Request => &mut self.request_history,
            BodySide::Response => &mut self.response_history,
        }
    }

    fn report(&mut self, unresolved: UnresolvedPlaceholder) {
        tracing::warn!("placeholder left unresolved: {unresolved}");
        self.unresolved.push(unresolved);
    }
}

impl Substitution for LabelResolver {
    fn url(&mut self, url: &str) -> String {
        self.resolve_url(url)
    }

    fn header(&mut self, header: &str) -> String {
        self.resolve_header(header)
    }

    fn body(&mut self, body: &Value, side: BodySide) -> Value {
        self.resolve_body(body, side)
    }
}

/// Strings without quotes, everything else as JSON text.
fn plain(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn mutation_parameters_are_drawn_from_the_allowed_sets() {
        for seed in 0..20 {
            let (fraction, count) = LabelResolver::new(seed).mutation();
            assert!(MUTATION_FRACTIONS.contains(&fraction));
            assert!((1..=5).contains(&count));
        }
    }

    #[test]
    fn sequences_increment_by_one() {
        let mut r = LabelResolver::new(1);
        let a = r.resolve(&Directive::Sequence(LabelKind::Ssn)).unwrap();
        let b = r.resolve(&Directive::Sequence(LabelKind::Ssn)).unwrap();
        let serial = |v: &Value| v.as_str().unwrap().rsplit('-').next().unwrap().parse::<u32>().unwrap();
        assert_eq!(serial(&b), serial(&a) % SSN_SERIAL_MAX + 1);

        let x = r.resolve(&Directive::Sequence(LabelKind::UsBankingInfo)).unwrap();
        let y = r.resolve(&Directive::Sequence(LabelKind::UsBankingInfo)).unwrap();
        let n = |v: &Value| v.as_str().unwrap().parse::<u64>().unwrap();
        assert_eq!(n(&y), n(&x) + 1);
        assert!(values::aba_valid(x.as_str().unwrap()));
    }

    #[test]
    fn ssn_serial_wraps_after_9999() {
        let mut seq = SsnSequence {
            prefix: "123-45".into(),
            serial: 9998,
        };
        assert_eq!(seq.next(), "123-45-9998");
        assert_eq!(seq.next(), "123-45-9999");
        assert_eq!(seq.next(), "123-45-0001");
        assert_eq!(seq.next(), "123-45-0002");
    }

    #[test]
    fn sequence_for_other_labels_is_unresolved() {
        let mut r = LabelResolver::new(1);
        assert_eq!(r.resolve(&Directive::Sequence(LabelKind::Email)), None);
        assert_eq!(r.unresolved(), &[UnresolvedPlaceholder::NoSequence(LabelKind::Email)]);
    }

    #[test]
    fn url_values_are_form_encoded() {
        let mut r = LabelResolver::new(2);
        let url = r.resolve_url("/users/<valid-full-name>?q=<regex:a b>&x=<nope-thing>");
        assert!(!url.contains("<valid-full-name>"));
        assert!(url.contains('+'), "{url}");
        assert!(url.contains("?q=a+b&"), "{url}");
        assert!(url.ends_with("x=<nope-thing>"));
        assert_eq!(r.unresolved().len(), 1);
    }

    #[test]
    fn header_values_are_not_encoded() {
        let mut r = LabelResolver::new(2);
        let header = r.resolve_header(r#"{"X-Name": "<valid-full-name>", "X-Re": "<regex:a b>"}"#);
        let parsed: Value = serde_json::from_str(&header).unwrap();
        assert!(parsed["X-Name"].as_str().unwrap().contains(' '));
        assert_eq!(parsed["X-Re"], "a b");
    }

    #[test]
    fn json_headers_stay_valid_json() {
        let mut r = LabelResolver::new(4);
        let header = r.resolve_header(
            r#"{"X-Meta": {"inner": "<random-object>", "tags": "<random-array>", "n": "<valid-integer>"}, "X-Id": "id <valid-uuid>", "X-Bad": "<nope-thing>"}"#,
        );
        let parsed: Value = serde_json::from_str(&header).unwrap();
        assert!(parsed["X-Meta"]["inner"].is_object());
        assert!(parsed["X-Meta"]["tags"].is_array());
        assert!(parsed["X-Meta"]["n"].is_i64());
        let id = parsed["X-Id"].as_str().unwrap();
        assert!(id.starts_with("id ") && id.len() == 39, "{id}");
        assert_eq!(parsed["X-Bad"], "<nope-thing>");
        assert_eq!(r.unresolved().len(), 1);
    }

    #[test]
    fn plain_headers_use_span_substitution() {
        let mut r = LabelResolver::new(4);
        let header = r.resolve_header("Bearer <regex:[a-z]{8}> \"<nope-thing>");
        assert!(header.starts_with("Bearer "));
        assert_eq!(header.len(), "Bearer ".len() + 8 + " \"<nope-thing>".len());
        assert!(header.ends_with("\"<nope-thing>"));
    }

    #[test]
    fn body_leaves_are_substituted_in_place() {
        let mut r = LabelResolver::new(3);
        let body = r.resolve_body(
            &json!({
                "user": {"email": "<valid-email>", "age": 30, "note": "plain"},
                "cards": ["gql<valid-credit-card>gql"],
                "id": "ID-<regex:[0-9]{3}>",
                "bad": "<valid-unicorn>"
            }),
            BodySide::Request,
        );

        assert!(body["user"]["email"].as_str().unwrap().contains('@'));
        assert_eq!(body["user"]["age"], 30);
        assert_eq!(body["user"]["note"], "plain");
        assert!(values::luhn_valid(body["cards"][0].as_str().unwrap()));
        let id = body["id"].as_str().unwrap();
        assert!(id.starts_with("ID-") && id.len() == 6);
        assert_eq!(body["bad"], "<valid-unicorn>");
    }

    #[test]
    fn pool_values_are_drawn_without_reuse() {
        let mut data = LabelData::new();
        data.insert("acct".into(), vec![json!("A1"), json!("A2")]);
        let mut r = LabelResolver::new(4).with_label_data(data);

        let template = json!({"a": "$acct$", "b": "$acct$"});
        assert_eq!(r.resolve_body(&template, BodySide::Request), json!({"a": "A1", "b": "A2"}));
        assert_eq!(
            r.resolve_body(&json!({"c": "$acct$"}), BodySide::Request),
            json!({"c": "$acct$"})
        );
        assert_eq!(r.unresolved(), &[UnresolvedPlaceholder::EmptyPool("acct".into())]);
    }

    #[test]
    fn uniqueness_is_kept_per_field_path() {
        let mut r = LabelResolver::new(5);
        let mut seen = Vec::new();
        for _ in 0..10 {
            let body = r.resolve_body(&json!({"ssn": "<valid-ssn>"}), BodySide::Request);
            seen.push(body["ssn"].clone());
        }
        let mut deduped = seen.clone();
        deduped.sort_by_key(ToString::to_string);
        deduped.dedup();
        assert_eq!(deduped.len(), seen.len());
    }

    #[test]
    fn exhausted_uniqueness_accepts_a_duplicate() {
        let mut r = LabelResolver::new(6);
        let template = json!({"flag": "<valid-boolean>"});
        let values: Vec<Value> = (0..5)
            .map(|_| r.resolve_body(&template, BodySide::Response)["flag"].clone())
            .collect();
        assert!(values.iter().all(Value::is_boolean));
        assert_eq!(r.response_history["flag"].len(), 5);
        assert!(r.request_history.is_empty());
    }

    #[test]
    fn same_seed_same_output() {
        let template = json!({"name": "<valid-full-name>", "card": "<invalid-credit-card>", "m": "<mutated-email>"});
        let a = LabelResolver::new(77).resolve_body(&template, BodySide::Request);
        let b = LabelResolver::new(77).resolve_body(&template, BodySide::Request);
        assert_eq!(a, b);
    }
}
