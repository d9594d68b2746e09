//! Body conversion and placeholder rendering seams
//!
//! The assembler only knows these traits. The synth crate plugs in the
//! schema-driven payload generator and the label resolver; raw assembly uses
//! the pass-through implementations below.

use serde_json::Value;

/// Key marking a body cell as generator metadata instead of a literal body.
pub const EDE_KEY: &str = "ede_info";

/// Which body a substitution is for. Uniqueness history is kept per side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BodySide {
    Request,
    Response,
}

/// Turns `ede_info` metadata into a concrete payload.
pub trait PayloadGenerator {
    fn generate(&mut self, ede_info: &Value) -> Value;
}

/// Renders placeholders inside one fan-out event.
pub trait Substitution {
    /// URL spans are percent-encoded after substitution.
    fn url(&mut self, url: &str) -> String;

    /// Header strings are substituted without encoding.
    fn header(&mut self, header: &str) -> String;

    fn body(&mut self, body: &Value, side: BodySide) -> Value;
}

/// Leaves every payload and placeholder as written.
#[derive(Debug, Clone, Copy, Default)]
pub struct Passthrough;

impl PayloadGenerator for Passthrough {
    fn generate(&mut self, ede_info: &Value) -> Value {
        ede_info.clone()
    }
}

impl Substitution for Passthrough {
    fn url(&mut self, url: &str) -> String {
        url.to_string()
    }

    fn header(&mut self, header: &str) -> String {
        header.to_string()
    }

    fn body(&mut self, body: &Value, _side: BodySide) -> Value {
        body.clone()
    }
}

/// Interpret a body cell.
///
/// A JSON object carrying `ede_info` is handed to `generator`; any other JSON
/// is returned parsed; anything that is not JSON comes back as a string.
pub fn convert_parameter_body(raw: &str, generator: &mut dyn PayloadGenerator) -> Value {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(obj)) if obj.contains_key(EDE_KEY) => generator.generate(&obj[EDE_KEY]),
        Ok(value) => value,
        Err(_) => {
            tracing::debug!(body = raw, "body is not JSON, keeping it as a string");
            Value::String(raw.to_string())
        }
    }
}
