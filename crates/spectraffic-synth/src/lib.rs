//! spectraffic-synth: specification-driven synthesis engines
//!
//! `resolver` inlines and normalizes an OpenAPI/Swagger document, `enumerate`
//! walks it into synthetic rows, and `labels` resolves the placeholder tokens
//! those rows carry once the assembler renders them into test cases.

pub mod datagen;
pub mod ede;
pub mod enumerate;
pub mod labels;
pub mod params;
pub mod pipeline;
pub mod resolver;
pub mod spec;

pub use ede::SchemaPayloadGenerator;
pub use enumerate::{Enumeration, EnumerationWarning, enumerate};
pub use labels::{LabelData, LabelDataError, LabelResolver, UnresolvedPlaceholder};
pub use pipeline::{GenerateOutput, PipelineError, RowsOutput, SpecRun};
pub use resolver::{Resolution, ResolutionError, Resolver, SpecVersion, ValidationWarning};
pub use spec::NormalizedSpec;
