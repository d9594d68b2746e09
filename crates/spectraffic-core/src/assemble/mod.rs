//! Test-case assembly from a sheet
//!
//! Rows accumulate into the current group until a fully blank row or the end
//! of the sheet, then the group becomes one [`TestCase`]. Every row fans out
//! into one input element per declared event, and every event is rendered
//! through the [`Substitution`] seam.

pub mod columns;
pub mod url;

use std::collections::BTreeSet;
use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::{Map, Value};

use crate::config::{Config, EnvLookup};
use crate::payload::{BodySide, PayloadGenerator, Substitution, convert_parameter_body};
use crate::sheet::Sheet;
use crate::testcase::{InputElement, Metadata, PayloadStructure, TestCase, TestCases};
use crate::xml;

use columns::{Column, Field, MANDATORY_FIELDS, Section};
use url::{UrlCell, replace_dynamic_segments};

/// Knobs taken from the configuration.
#[derive(Debug, Clone, Default)]
pub struct AssembleOptions {
    /// Rows are kept only while the Robot_Tag column contains this value
    pub test_tag: Option<String>,
    /// Environment preferred for `config.*site_name*` hosts
    pub test_env: Option<String>,
    /// Fixed host suffix (nanosecond timestamp when absent)
    pub host_suffix: Option<String>,
}

impl AssembleOptions {
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            test_tag: config.test_tag.clone(),
            test_env: config.test_env.clone(),
            host_suffix: config.host_suffix.clone(),
        }
    }
}

/// Non-fatal problems found while assembling.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AssemblyWarning {
    #[error("column '{0}' has no known section; ignored")]
    UnknownColumn(String),
    #[error("test case {test_id}: mandatory field '{field}' not present")]
    MandatoryFieldMissing { test_id: u32, field: &'static str },
    #[error("row {row}: test id '{value}' is not a number")]
    InvalidTestId { row: usize, value: String },
    #[error("row {row}: response code '{value}' is not a number; using 0")]
    InvalidResponseCode { row: usize, value: String },
    #[error("row {row}: URL cell: {reason}")]
    InvalidUrl { row: usize, reason: String },
    #[error("row {row}: column '{column}' is not valid JSON")]
    InvalidJson { row: usize, column: String },
    #[error("host key '{0}' not found in environment")]
    UnknownHostKey(String),
}

/// Result of one assembly pass.
#[derive(Debug, Clone, Default)]
pub struct Assembly {
    pub test_cases: TestCases,
    pub warnings: Vec<AssemblyWarning>,
}

impl Assembly {
    fn warn(&mut self, warning: AssemblyWarning) {
        tracing::warn!("{warning}");
        self.warnings.push(warning);
    }
}

/// Reconstructs grouped test cases from sheet rows.
///
/// Holds the dynamic path parameter name and counter, which carry over
/// between rows and groups for the assembler's lifetime.
pub struct Assembler<'a> {
    options: AssembleOptions,
    env: &'a dyn EnvLookup,
    dynamic_param_name: String,
    dynamic_param_count: u32,
}

/// One row's cells, sorted by role.
#[derive(Default)]
struct RowDraft {
    url: Option<UrlCell>,
    host: String,
    method: String,
    rsp_code: u16,
    req_header: Option<(String, String)>,
    req_body: Option<String>,
    rsp_body: Option<String>,
    input_extra: Map<String, Value>,
    output: Map<String, Value>,
    meta: RowMeta,
}

#[derive(Default, Clone)]
struct RowMeta {
    settings: Option<Value>,
    validation: Option<Value>,
    data_labels: Option<Vec<String>>,
    extra: Map<String, Value>,
}

impl RowMeta {
    fn is_empty(&self) -> bool {
        self.settings.is_none()
            && self.validation.is_none()
            && self.data_labels.is_none()
            && !self.extra.values().any(is_present)
    }
}

#[derive(Default)]
struct Group {
    test_id: u32,
    input: Vec<InputElement>,
    output: Vec<Map<String, Value>>,
    meta: RowMeta,
    structure: PayloadStructure,
    seen: BTreeSet<&'static str>,
}

impl<'a> Assembler<'a> {
    #[must_use]
    pub fn new(options: AssembleOptions, env: &'a dyn EnvLookup) -> Self {
        Self {
            options,
            env,
            dynamic_param_name: String::new(),
            dynamic_param_count: 1,
        }
    }

    /// Assemble every group of `sheet`.
    pub fn assemble(
        &mut self,
        sheet: &Sheet,
        generator: &mut dyn PayloadGenerator,
        subst: &mut dyn Substitution,
    ) -> Assembly {
        let mut assembly = Assembly::default();
        let (columns, unknown) = columns::parse_header(&sheet.header);
        for name in unknown {
            assembly.warn(AssemblyWarning::UnknownColumn(name));
        }
        let tag_column = columns
            .iter()
            .position(|c| c.as_ref().is_some_and(|c| c.field == Field::RobotTag));

        let mut group = Group::default();
        let mut skipping = false;

        for (idx, row) in sheet.rows.iter().enumerate() {
            // 1-based, header is row 0
            let row_no = idx + 1;

            if let (Some(tag), Some(col)) = (self.options.test_tag.as_deref(), tag_column) {
                if let Some(value) = cell(row, col) {
                    skipping = !value.contains(tag);
                }
            }
            if skipping {
                continue;
            }

            if Sheet::is_blank(row) {
                Self::flush(std::mem::take(&mut group), &mut assembly);
                continue;
            }

            if let Some(id) = cell(row, 0) {
                match id.trim().parse() {
                    Ok(id) => group.test_id = id,
                    Err(_) => assembly.warn(AssemblyWarning::InvalidTestId {
                        row: row_no,
                        value: id.to_string(),
                    }),
                }
                tracing::debug!(test_id = group.test_id, "test case started");
            }

            let draft = self.read_row(row, row_no, &columns, &mut group, &mut assembly);
            self.emit_events(&draft, &mut group, generator, subst);
        }

        Self::flush(group, &mut assembly);
        assembly
    }

    fn read_row(
        &mut self,
        row: &[Option<String>],
        row_no: usize,
        columns: &[Option<Column>],
        group: &mut Group,
        assembly: &mut Assembly,
    ) -> RowDraft {
        let mut draft = RowDraft::default();

        for (col, column) in columns.iter().enumerate().skip(1) {
            let Some(column) = column else {
                continue;
            };
            let value = cell(row, col);
            if let (Some(key), Some(_)) = (column.field.mandatory_key(), value) {
                group.seen.insert(key);
            }

            match &column.field {
                Field::Url => {
                    if let Some(v) = value {
                        match UrlCell::parse(v) {
                            Ok(url) => {
                                if let Some(query) = &url.query {
                                    group
                                        .structure
                                        .query_params
                                        .push(Value::Object(query.clone()));
                                }
                                draft.url = Some(url);
                            }
                            Err(reason) => {
                                assembly.warn(AssemblyWarning::InvalidUrl { row: row_no, reason });
                            }
                        }
                    }
                }
                Field::Host => {
                    if let Some(v) = value {
                        draft.host = self.resolve_host(v, assembly);
                    }
                }
                Field::Method => draft.method = value.unwrap_or_default().to_string(),
                Field::RspCode => {
                    if let Some(v) = value {
                        match parse_code(v) {
                            Some(code) => draft.rsp_code = code,
                            None => assembly.warn(AssemblyWarning::InvalidResponseCode {
                                row: row_no,
                                value: v.to_string(),
                            }),
                        }
                    }
                }
                Field::ReqHeader => {
                    if let Some(v) = value {
                        draft.req_header = Some((column.name.clone(), v.to_string()));
                    }
                }
                Field::ReqBody => draft.req_body = value.map(String::from),
                Field::RspBody => draft.rsp_body = value.map(String::from),
                Field::Settings | Field::Validation => {
                    if let Some(v) = value {
                        match serde_json::from_str::<Value>(v) {
                            Ok(json) if column.field == Field::Settings => {
                                draft.meta.settings = Some(json);
                            }
                            Ok(json) => draft.meta.validation = Some(json),
                            Err(_) => assembly.warn(AssemblyWarning::InvalidJson {
                                row: row_no,
                                column: column.name.clone(),
                            }),
                        }
                    }
                }
                Field::DataLabels => {
                    if let Some(v) = value {
                        draft.meta.data_labels =
                            Some(v.trim().split(',').map(|s| s.trim().to_string()).collect());
                    }
                }
                Field::DynamicPathParamName => {
                    if let Some(v) = value {
                        self.dynamic_param_name = v.trim().to_string();
                    }
                }
                Field::RobotTag => {}
                Field::Free(name) => {
                    let v = value.map_or(Value::Null, |s| Value::String(s.to_string()));
                    match column.section {
                        Section::Input => {
                            draft.input_extra.insert(name.clone(), v);
                        }
                        Section::Output => {
                            draft.output.insert(name.clone(), v);
                        }
                        Section::Meta => {
                            draft.meta.extra.insert(name.clone(), v);
                        }
                        Section::Feature | Section::Sensitive => {}
                    }
                }
            }
        }

        draft
    }

    fn emit_events(
        &mut self,
        draft: &RowDraft,
        group: &mut Group,
        generator: &mut dyn PayloadGenerator,
        subst: &mut dyn Substitution,
    ) {
        let header = draft.req_header.as_ref().map(|(_, h)| h.as_str());
        let req_xml = draft
            .req_body
            .as_deref()
            .is_some_and(|b| xml::is_xml_framed(header, b));
        let rsp_xml = draft
            .rsp_body
            .as_deref()
            .is_some_and(|b| xml::is_xml_framed(header, b));

        if let Some(raw) = &draft.req_body {
            group
                .structure
                .request
                .push(convert_parameter_body(raw, generator));
        }
        if let Some(raw) = &draft.rsp_body {
            group
                .structure
                .response
                .push(convert_parameter_body(raw, generator));
        }

        let urls = draft
            .url
            .as_ref()
            .map_or_else(|| vec![String::new()], UrlCell::expand);

        for url in urls {
            let url = replace_dynamic_segments(
                &url,
                &self.dynamic_param_name,
                &mut self.dynamic_param_count,
            );

            let mut extra = draft.input_extra.clone();
            if let Some((name, value)) = &draft.req_header {
                extra.insert(name.clone(), Value::String(subst.header(value)));
            }

            let element = InputElement {
                url: subst.url(&url),
                host: draft.host.clone(),
                method: draft.method.clone(),
                rsp_code: draft.rsp_code,
                req_body: draft.req_body.as_deref().map(|raw| {
                    event_body(raw, req_xml, BodySide::Request, generator, subst)
                }),
                rsp_body: draft.rsp_body.as_deref().map(|raw| {
                    event_body(raw, rsp_xml, BodySide::Response, generator, subst)
                }),
                extra,
            };
            tracing::debug!(url = %element.url, method = %element.method, "event");
            group.input.push(element);
        }

        group.output.push(draft.output.clone());
        if !draft.meta.is_empty() {
            group.meta = draft.meta.clone();
        }
    }

    fn resolve_host(&self, host: &str, assembly: &mut Assembly) -> String {
        let Some(key) = host.strip_prefix("config.") else {
            let suffix = self.options.host_suffix.clone().unwrap_or_else(timestamp_suffix);
            return format!("{host}.{suffix}");
        };

        let key = key.to_ascii_lowercase();
        let found = match self.options.test_env.as_deref() {
            Some(env) if key.contains("site_name") => self.env.lookup_in(env, &key),
            _ => self.env.lookup(&key),
        };
        found.unwrap_or_else(|| {
            assembly.warn(AssemblyWarning::UnknownHostKey(key));
            host.to_string()
        })
    }

    fn flush(group: Group, assembly: &mut Assembly) {
        if group.input.is_empty() {
            return;
        }

        for field in MANDATORY_FIELDS {
            if !group.seen.contains(field) {
                assembly.warn(AssemblyWarning::MandatoryFieldMissing {
                    test_id: group.test_id,
                    field,
                });
            }
        }

        let output = group
            .output
            .into_iter()
            .filter(|o| o.values().any(is_present))
            .collect();
        let metadata = Metadata {
            payload_structure: group.structure,
            settings: group.meta.settings,
            validation: group.meta.validation,
            data_labels: group.meta.data_labels,
            extra: group.meta.extra,
        };

        tracing::debug!(
            test_id = group.test_id,
            events = group.input.len(),
            "test case assembled"
        );
        assembly.test_cases.insert(
            group.test_id,
            TestCase {
                input: group.input,
                output,
                metadata,
            },
        );
    }
}

fn event_body(
    raw: &str,
    xml_framed: bool,
    side: BodySide,
    generator: &mut dyn PayloadGenerator,
    subst: &mut dyn Substitution,
) -> Value {
    if xml_framed {
        return Value::String(raw.to_string());
    }
    let body = convert_parameter_body(raw, generator);
    subst.body(&body, side)
}

/// Non-empty cell at `col`.
fn cell(row: &[Option<String>], col: usize) -> Option<&str> {
    row.get(col)
        .and_then(Option::as_deref)
        .filter(|s| !s.trim().is_empty())
}

fn parse_code(value: &str) -> Option<u16> {
    let value = value.trim();
    value
        .parse()
        .ok()
        .or_else(|| value.strip_suffix(".0").and_then(|v| v.parse().ok()))
}

fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}

fn timestamp_suffix() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default()
        .to_string()
}
