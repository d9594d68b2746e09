//! spectraffic-core: Core types and test-case assembly for spec-driven traffic
//!
//! This crate holds the data shared by the engines and the CLI: the label
//! catalog, configuration, the synthetic row/sheet model, the assembled
//! test-case document and the assembler that turns one into the other.

pub mod assemble;
pub mod catalog;
pub mod config;
pub mod payload;
pub mod sheet;
pub mod testcase;
pub mod xml;

pub use assemble::{AssembleOptions, Assembler, Assembly, AssemblyWarning};
pub use catalog::{CatalogError, LabelCatalog, label_token};
pub use config::{Config, ConfigError, EnvLookup};
pub use payload::{BodySide, Passthrough, PayloadGenerator, Substitution, convert_parameter_body};
pub use sheet::{RowGroup, Sheet, SheetError, SyntheticRow};
pub use testcase::{InputElement, Metadata, PayloadStructure, TestCase, TestCases};
