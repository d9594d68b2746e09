//! Strings matching a regular expression

use proptest::strategy::{Strategy, ValueTree};
use proptest::test_runner::{Config, RngAlgorithm, TestRng, TestRunner};
use rand::Rng;

use super::token::UnresolvedPlaceholder;

/// Generate one string matching `pattern`, seeded from `rng`.
///
/// Leading `^` and trailing `$` are dropped; the generated value is the whole
/// match either way.
///
/// # Errors
///
/// Returns [`UnresolvedPlaceholder::InvalidRegex`] if the pattern does not
/// parse or uses constructs that cannot be generated.
pub fn generate<R: Rng + ?Sized>(pattern: &str, rng: &mut R) -> Result<String, UnresolvedPlaceholder> {
    let trimmed = pattern.strip_prefix('^').unwrap_or(pattern);
    let trimmed = trimmed
        .strip_suffix('$')
        .filter(|p| !p.ends_with('\\'))
        .unwrap_or(trimmed);

    let invalid = |reason: String| UnresolvedPlaceholder::InvalidRegex {
        pattern: pattern.to_string(),
        reason,
    };

    let strategy = proptest::string::string_regex(trimmed).map_err(|e| invalid(e.to_string()))?;

    let seed: [u8; 32] = rng.r#gen();
    let mut runner = TestRunner::new_with_rng(
        Config::default(),
        TestRng::from_seed(RngAlgorithm::ChaCha, &seed),
    );
    let tree = strategy
        .new_tree(&mut runner)
        .map_err(|reason| invalid(reason.to_string()))?;
    Ok(tree.current())
}

/// Replace every `<regex:…>` span in `text` by a matching string.
///
/// Spans whose pattern is invalid are kept and reported.
pub fn substitute_embedded<R: Rng + ?Sized>(
    text: &str,
    rng: &mut R,
) -> (String, Vec<UnresolvedPlaceholder>) {
    const OPEN: &str = "<regex:";

    let mut out = String::with_capacity(text.len());
    let mut failures = Vec::new();
    let mut rest = text;

    while let Some(start) = rest.find(OPEN) {
        let body = &rest[start + OPEN.len()..];
        let Some(end) = body.find('>') else {
            break;
        };
        out.push_str(&rest[..start]);
        match generate(&body[..end], rng) {
            Ok(value) => out.push_str(&value),
            Err(e) => {
                out.push_str(&rest[start..start + OPEN.len() + end + 1]);
                failures.push(e);
            }
        }
        rest = &body[end + 1..];
    }

    out.push_str(rest);
    (out, failures)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;
    use regex::Regex;

    fn rng() -> SmallRng {
        SmallRng::seed_from_u64(3)
    }

    #[test]
    fn generated_strings_match() {
        let mut rng = rng();
        for pattern in ["[a-z]{5}", "^[0-9]{3}-[0-9]{4}$", "(foo|bar)baz", "[A-F0-9]{8}"] {
            let value = generate(pattern, &mut rng).unwrap();
            let anchored = format!("^(?:{})$", pattern.trim_start_matches('^').trim_end_matches('$'));
            assert!(Regex::new(&anchored).unwrap().is_match(&value), "{pattern} -> {value}");
        }
    }

    #[test]
    fn same_seed_same_string() {
        let a = generate("[a-z]{12}", &mut SmallRng::seed_from_u64(9)).unwrap();
        let b = generate("[a-z]{12}", &mut SmallRng::seed_from_u64(9)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn invalid_pattern_is_reported() {
        let err = generate("([a-z", &mut rng()).unwrap_err();
        assert!(matches!(err, UnresolvedPlaceholder::InvalidRegex { .. }));
    }

    #[test]
    fn embedded_spans_are_replaced_in_place() {
        let (out, failures) = substitute_embedded(
            "query { user(id: \"<regex:[0-9]{4}>\", tag: \"<regex:[a-z]{2}>\") }",
            &mut rng(),
        );
        assert!(failures.is_empty());
        let re = Regex::new(r#"^query \{ user\(id: "[0-9]{4}", tag: "[a-z]{2}"\) \}$"#).unwrap();
        assert!(re.is_match(&out), "{out}");
    }

    #[test]
    fn broken_spans_are_kept() {
        let (out, failures) = substitute_embedded("a<regex:([>b<regex:x", &mut rng());
        assert_eq!(out, "a<regex:([>b<regex:x");
        assert_eq!(failures.len(), 1);
    }
}
