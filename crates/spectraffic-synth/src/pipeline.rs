//! End-to-end generation: specification → rows → sheet → test cases

use std::path::Path;

use rand::SeedableRng;
use rand::rngs::SmallRng;

use spectraffic_core::{
    AssembleOptions, Assembler, Assembly, CatalogError, Config, LabelCatalog, Passthrough,
    RowGroup, Sheet, SheetError,
};

use crate::ede::SchemaPayloadGenerator;
use crate::enumerate::{self, EnumerationWarning};
use crate::labels::{LabelData, LabelDataError, LabelResolver, load_label_data};
use crate::resolver::{ResolutionError, Resolver, SpecVersion, ValidationWarning};

// Each stage gets its own stream so that adding rows does not shift labels.
const RESOLVER_STREAM: u64 = 0x5bd1_e995_4c1f_a7a3;
const PAYLOAD_STREAM: u64 = 0x9e37_79b9_7f4a_7c15;

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Resolution(#[from] ResolutionError),
    #[error(transparent)]
    Sheet(#[from] SheetError),
    #[error(transparent)]
    LabelData(#[from] LabelDataError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// Rows enumerated from one specification.
#[derive(Debug, Clone)]
pub struct RowsOutput {
    pub version: SpecVersion,
    pub base_path: String,
    pub groups: Vec<RowGroup>,
    pub sheet: Sheet,
    pub validation_warnings: Vec<ValidationWarning>,
    pub enumeration_warnings: Vec<EnumerationWarning>,
}

impl RowsOutput {
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.groups.iter().map(|g| g.rows.len()).sum()
    }
}

/// Rows plus the assembled test cases.
#[derive(Debug, Clone)]
pub struct GenerateOutput {
    pub rows: RowsOutput,
    pub assembly: Assembly,
    pub unresolved: usize,
}

/// One generation run over specification files.
#[derive(Debug, Clone)]
pub struct SpecRun {
    catalog: LabelCatalog,
    label_data: LabelData,
    options: AssembleOptions,
    seed: u64,
}

impl SpecRun {
    #[must_use]
    pub fn new(catalog: LabelCatalog, seed: u64) -> Self {
        Self {
            catalog,
            label_data: LabelData::new(),
            options: AssembleOptions::default(),
            seed,
        }
    }

    /// Build from configuration. Without a configured seed one is drawn from
    /// entropy; [`SpecRun::seed`] reports it.
    ///
    /// # Errors
    ///
    /// Returns error if the configured catalog or label data cannot be loaded.
    pub fn from_config(config: &Config) -> Result<Self, PipelineError> {
        let catalog = match &config.label_catalog {
            Some(path) => LabelCatalog::load(path)?,
            None => LabelCatalog::builtin(),
        };
        let label_data = match &config.label_data {
            Some(path) => load_label_data(path)?,
            None => LabelData::new(),
        };
        let seed = config.seed.unwrap_or_else(rand::random);

        Ok(Self {
            catalog,
            label_data,
            options: AssembleOptions::from_config(config),
            seed,
        })
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    #[must_use]
    pub fn with_label_data(mut self, data: LabelData) -> Self {
        self.label_data = data;
        self
    }

    #[must_use]
    pub fn with_options(mut self, options: AssembleOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    #[must_use]
    pub fn catalog(&self) -> &LabelCatalog {
        &self.catalog
    }

    /// Resolve `spec` and enumerate its rows.
    ///
    /// # Errors
    ///
    /// Returns error if the specification cannot be resolved.
    pub fn rows(&self, spec: &Path) -> Result<RowsOutput, PipelineError> {
        let resolution = Resolver::new().resolve(spec)?;
        let mut rng = SmallRng::seed_from_u64(self.seed);
        let enumeration = enumerate::enumerate(&resolution.spec, &self.catalog, &mut rng);
        tracing::info!(
            spec = %spec.display(),
            groups = enumeration.groups.len(),
            rows = enumeration.row_count(),
            "rows enumerated"
        );

        Ok(RowsOutput {
            version: resolution.version,
            base_path: resolution.base_path,
            sheet: Sheet::from_groups(&enumeration.groups),
            groups: enumeration.groups,
            validation_warnings: resolution.warnings,
            enumeration_warnings: enumeration.warnings,
        })
    }

    /// Resolve, enumerate and assemble `spec` with every label resolved.
    ///
    /// # Errors
    ///
    /// Returns error if the specification cannot be resolved.
    pub fn generate(&self, spec: &Path, config: &Config) -> Result<GenerateOutput, PipelineError> {
        let rows = self.rows(spec)?;
        let (assembly, unresolved) = self.assemble(&rows.sheet, config);
        Ok(GenerateOutput {
            rows,
            assembly,
            unresolved,
        })
    }

    /// Assemble a sheet, resolving placeholders. Returns the assembly and the
    /// number of placeholders left unresolved.
    pub fn assemble(&self, sheet: &Sheet, config: &Config) -> (Assembly, usize) {
        let mut resolver = LabelResolver::new(self.seed ^ RESOLVER_STREAM)
            .with_label_data(self.label_data.clone());
        let mut payloads = SchemaPayloadGenerator::new(&self.catalog, self.seed ^ PAYLOAD_STREAM);
        let assembly = Assembler::new(self.options.clone(), config).assemble(
            sheet,
            &mut payloads,
            &mut resolver,
        );
        let unresolved = resolver.unresolved().len();
        tracing::info!(
            test_cases = assembly.test_cases.len(),
            warnings = assembly.warnings.len(),
            unresolved,
            "sheet assembled"
        );
        (assembly, unresolved)
    }

    /// Assemble a sheet keeping bodies and placeholders as written.
    pub fn assemble_raw(&self, sheet: &Sheet, config: &Config) -> Assembly {
        Assembler::new(self.options.clone(), config).assemble(
            sheet,
            &mut Passthrough,
            &mut Passthrough,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SPEC: &str = r#"{
        "openapi": "3.0.0",
        "servers": [{"url": "https://api.example.com/v1"}],
        "paths": {
            "/users/{id}": {
                "get": {
                    "parameters": [
                        {"name": "id", "in": "path", "schema": {"type": "integer"}}
                    ],
                    "responses": {"200": {"description": "ok"}}
                }
            }
        }
    }"#;

    fn spec_file() -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        file.write_all(SPEC.as_bytes()).unwrap();
        file
    }

    #[test]
    fn rows_and_sheet_agree() {
        let file = spec_file();
        let out = SpecRun::new(LabelCatalog::builtin(), 7).rows(file.path()).unwrap();

        assert_eq!(out.version, SpecVersion::V3);
        assert_eq!(out.base_path, "/v1");
        assert_eq!(out.row_count(), 2);
        // two rows and the separator
        assert_eq!(out.sheet.rows.len(), 3);
    }

    #[test]
    fn same_seed_same_test_cases() {
        let file = spec_file();
        let config = Config {
            host_suffix: Some("t".into()),
            ..Config::default()
        };
        let run = SpecRun::new(LabelCatalog::builtin(), 11)
            .with_options(AssembleOptions::from_config(&config));

        let a = run.generate(file.path(), &config).unwrap();
        let b = run.generate(file.path(), &config).unwrap();
        assert_eq!(a.assembly.test_cases, b.assembly.test_cases);
        assert_eq!(a.assembly.test_cases.len(), 1);
    }

    #[test]
    fn raw_assembly_keeps_rows_as_written() {
        let file = spec_file();
        let config = Config::default();
        let run = SpecRun::new(LabelCatalog::builtin(), 3);
        let rows = run.rows(file.path()).unwrap();
        let assembly = run.assemble_raw(&rows.sheet, &config);

        let case = &assembly.test_cases[&1];
        assert_eq!(case.input.len(), 2);
        assert_eq!(case.input[0].url, rows.groups[0].rows[0].url);
        assert_eq!(case.input[1].rsp_code, 403);
    }

    #[test]
    fn missing_spec_is_an_error() {
        let err = SpecRun::new(LabelCatalog::builtin(), 1)
            .rows(Path::new("/nonexistent/spec.json"))
            .unwrap_err();
        assert!(matches!(err, PipelineError::Resolution(ResolutionError::Io(..))));
    }
}
