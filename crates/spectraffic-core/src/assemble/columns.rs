//! Sheet header classification
//!
//! A header cell is `<SECTION>_<name>`, e.g. `Input_Req_Body` or
//! `Meta_Robot_Tag`. Column 0 is always the test id.

/// Column section, taken from the prefix before the first `_`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Input,
    Output,
    Meta,
    Feature,
    Sensitive,
}

impl Section {
    #[must_use]
    pub fn parse(prefix: &str) -> Option<Self> {
        match prefix.to_ascii_uppercase().as_str() {
            "INPUT" => Some(Self::Input),
            "OUTPUT" => Some(Self::Output),
            "META" => Some(Self::Meta),
            "FEATURE" => Some(Self::Feature),
            "SENSITIVE" => Some(Self::Sensitive),
            _ => None,
        }
    }
}

/// Columns with dedicated handling. Everything else is [`Field::Free`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Field {
    Url,
    Host,
    Method,
    RspCode,
    ReqHeader,
    ReqBody,
    RspBody,
    Settings,
    Validation,
    DataLabels,
    DynamicPathParamName,
    RobotTag,
    Free(String),
}

impl Field {
    fn classify(section: Section, name: &str) -> Self {
        match (section, name.to_ascii_uppercase().as_str()) {
            (_, "URL") => Self::Url,
            (_, "HOST") => Self::Host,
            (_, "METHOD") => Self::Method,
            (_, "RSP_CODE") => Self::RspCode,
            (_, "REQ_BODY") => Self::ReqBody,
            (_, "RSP_BODY") => Self::RspBody,
            (_, "REQ_HEADER") => Self::ReqHeader,
            (Section::Feature, "SETTINGS") => Self::Settings,
            (Section::Feature, "VALIDATION") => Self::Validation,
            (_, "DATA_LABELS") => Self::DataLabels,
            (_, "DYNAMIC_PATH_PARAM_NAME") => Self::DynamicPathParamName,
            (_, "ROBOT_TAG") => Self::RobotTag,
            _ => Self::Free(name.to_string()),
        }
    }

    /// Key reported when a mandatory column is missing from a test case.
    #[must_use]
    pub fn mandatory_key(&self) -> Option<&'static str> {
        match self {
            Self::Url => Some("url"),
            Self::Host => Some("host"),
            Self::Method => Some("method"),
            Self::RspCode => Some("rsp_code"),
            Self::ReqBody => Some("req_body"),
            Self::RspBody => Some("rsp_body"),
            _ => None,
        }
    }
}

/// Fields every input element must have.
pub const MANDATORY_FIELDS: [&str; 6] = ["url", "host", "method", "rsp_code", "req_body", "rsp_body"];

/// A classified header cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub section: Section,
    /// Header text after the section prefix, original case
    pub name: String,
    pub field: Field,
}

impl Column {
    /// Parse one header cell. `None` for unknown sections or cells without a prefix.
    #[must_use]
    pub fn parse(header: &str) -> Option<Self> {
        let (prefix, name) = header.split_once('_')?;
        let section = Section::parse(prefix)?;
        Some(Self {
            section,
            name: name.to_string(),
            field: Field::classify(section, name),
        })
    }
}

/// Classify every header cell after the test-id column.
///
/// Returns one slot per header cell (slot 0 is always `None`) and the headers
/// that could not be classified.
#[must_use]
pub fn parse_header(header: &[String]) -> (Vec<Option<Column>>, Vec<String>) {
    let mut columns = vec![None];
    let mut unknown = Vec::new();

    for cell in header.iter().skip(1) {
        let column = Column::parse(cell);
        if column.is_none() {
            unknown.push(cell.clone());
        }
        columns.push(column);
    }

    (columns, unknown)
}
