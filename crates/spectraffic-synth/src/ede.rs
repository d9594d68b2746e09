//! Payload generation for `ede_info` body cells

use rand::SeedableRng;
use rand::rngs::SmallRng;
use serde_json::Value;

use spectraffic_core::{LabelCatalog, PayloadGenerator};

use crate::datagen;

/// Generates a body from the schema carried in `ede_info`.
///
/// `ede_info` is either `{"schema": {...}}` or the schema itself. String
/// leaves come out as placeholder tokens for the label resolver.
#[derive(Debug)]
pub struct SchemaPayloadGenerator<'a> {
    catalog: &'a LabelCatalog,
    rng: SmallRng,
}

impl<'a> SchemaPayloadGenerator<'a> {
    #[must_use]
    pub fn new(catalog: &'a LabelCatalog, seed: u64) -> Self {
        Self {
            catalog,
            rng: SmallRng::seed_from_u64(seed),
        }
    }
}

impl PayloadGenerator for SchemaPayloadGenerator<'_> {
    fn generate(&mut self, ede_info: &Value) -> Value {
        let schema = ede_info.get("schema").unwrap_or(ede_info);
        datagen::generate(schema, None, self.catalog, &mut self.rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use spectraffic_core::convert_parameter_body;

    #[test]
    fn ede_cells_become_generated_payloads() {
        let catalog = LabelCatalog::builtin();
        let mut generator = SchemaPayloadGenerator::new(&catalog, 1);

        let raw = r#"{"ede_info": {"schema": {"type": "object", "properties": {"email": {"type": "string"}, "n": {"type": "integer"}}}}}"#;
        let body = convert_parameter_body(raw, &mut generator);
        assert_eq!(body["email"], "<valid-email>");
        assert!(body["n"].is_i64());

        let bare = convert_parameter_body(r#"{"ede_info": {"type": "array", "items": {"type": "string"}}}"#, &mut generator);
        assert_eq!(bare, json!(["<random-string>"]));
    }

    #[test]
    fn plain_cells_are_untouched() {
        let catalog = LabelCatalog::builtin();
        let mut generator = SchemaPayloadGenerator::new(&catalog, 1);
        assert_eq!(
            convert_parameter_body(r#"{"a": "<valid-email>"}"#, &mut generator),
            json!({"a": "<valid-email>"})
        );
        assert_eq!(convert_parameter_body("not json", &mut generator), json!("not json"));
    }
}
