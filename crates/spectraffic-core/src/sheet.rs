//! Synthetic rows and their tabular form
//!
//! The enumerator produces [`RowGroup`]s; [`Sheet`] is the persisted grid the
//! assembler consumes. One blank row separates groups, and the `test_id` cell
//! is only filled on the first row of a group.
//!
//! ```text
//! test_id | Input_URL        | Input_Host | Input_Method | Input_Rsp_Code | ...
//! 1       | /users/<...>     | api.io     | GET          | 200            |
//!         | /users/<...>/... | api.io     | GET          | 403            |
//!         |                  |            |              |                |
//! 2       | ...
//! ```

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Fixed column names of the emitted row stream.
pub const HEADER_LIST: [&str; 8] = [
    "test_id",
    "Input_URL",
    "Input_Host",
    "Input_Method",
    "Input_Rsp_Code",
    "Input_Req_Header",
    "Input_Req_Body",
    "Input_Rsp_Body",
];

/// Header carrying the expected response payload for downstream checks.
pub const RESP_PAYLOAD_HEADER: &str = "apisec-resp-payload";

/// Header carrying the expected response status code for downstream checks.
pub const RESP_STATUS_HEADER: &str = "apisec-resp-status-code";

/// Suffix appended to the path of every negative row.
pub const UNKNOWN_PATH: &str = "/UnknownPath";

/// Response code forced on negative rows.
pub const NEGATIVE_STATUS: &str = "403";

/// One emitted test row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyntheticRow {
    pub sequence_id: u32,
    pub url: String,
    pub host: String,
    pub method: String,
    pub response_code: String,
    pub headers: serde_json::Map<String, serde_json::Value>,
    pub request_body: serde_json::Value,
    pub response_body: serde_json::Value,
    #[serde(default)]
    pub negative: bool,
}

impl SyntheticRow {
    /// Cells for columns 1.. of [`HEADER_LIST`].
    fn cells(&self) -> Vec<Option<String>> {
        vec![
            Some(self.url.clone()),
            Some(self.host.clone()),
            Some(self.method.clone()),
            Some(self.response_code.clone()),
            Some(serde_json::Value::Object(self.headers.clone()).to_string()),
            Some(self.request_body.to_string()),
            Some(self.response_body.to_string()),
        ]
    }
}

/// All rows of one path+method, valid rows first, negative row last.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowGroup {
    pub sequence_id: u32,
    pub operation: String,
    pub rows: Vec<SyntheticRow>,
}

impl RowGroup {
    #[must_use]
    pub fn valid_rows(&self) -> impl Iterator<Item = &SyntheticRow> {
        self.rows.iter().filter(|r| !r.negative)
    }

    #[must_use]
    pub fn negative_row(&self) -> Option<&SyntheticRow> {
        self.rows.iter().rev().find(|r| r.negative)
    }
}

/// A grid of optional string cells with a header row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sheet {
    pub header: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl Sheet {
    /// Lay out row groups with the fixed columns.
    #[must_use]
    pub fn from_groups(groups: &[RowGroup]) -> Self {
        let header = HEADER_LIST.iter().map(|h| (*h).to_string()).collect();
        let mut rows = Vec::new();

        for group in groups {
            for (idx, row) in group.rows.iter().enumerate() {
                let id = (idx == 0).then(|| group.sequence_id.to_string());
                let mut cells = Vec::with_capacity(HEADER_LIST.len());
                cells.push(id);
                cells.extend(row.cells());
                rows.push(cells);
            }
            rows.push(vec![None; HEADER_LIST.len()]);
        }

        Self { header, rows }
    }

    /// Whether every cell of `row` is empty.
    #[must_use]
    pub fn is_blank(row: &[Option<String>]) -> bool {
        row.iter()
            .all(|c| c.as_deref().is_none_or(|s| s.trim().is_empty()))
    }

    /// Write the sheet as pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be written.
    pub fn write(&self, path: &Path) -> Result<(), SheetError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| SheetError::Io(parent.to_path_buf(), e.to_string()))?;
        }
        let json =
            serde_json::to_string_pretty(self).map_err(|e| SheetError::Serialize(e.to_string()))?;
        std::fs::write(path, json).map_err(|e| SheetError::Io(path.to_path_buf(), e.to_string()))
    }

    /// Read a sheet written by [`Sheet::write`].
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or is not a sheet.
    pub fn read(path: &Path) -> Result<Self, SheetError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| SheetError::Io(path.to_path_buf(), e.to_string()))?;
        serde_json::from_str(&content).map_err(|e| SheetError::Parse(e.to_string()))
    }
}

/// Write every row as one JSON line, groups in order.
///
/// # Errors
///
/// Returns error if the file cannot be created or written.
pub fn write_rows_jsonl(groups: &[RowGroup], path: &Path) -> Result<u64, SheetError> {
    let file = std::fs::File::create(path)
        .map_err(|e| SheetError::Io(path.to_path_buf(), e.to_string()))?;
    let mut writer = std::io::BufWriter::new(file);
    let mut count = 0;

    for row in groups.iter().flat_map(|g| &g.rows) {
        let line = serde_json::to_string(row).map_err(|e| SheetError::Serialize(e.to_string()))?;
        writer
            .write_all(line.as_bytes())
            .and_then(|()| writer.write_all(b"\n"))
            .map_err(|e| SheetError::Io(path.to_path_buf(), e.to_string()))?;
        count += 1;
    }

    writer
        .flush()
        .map_err(|e| SheetError::Io(path.to_path_buf(), e.to_string()))?;
    Ok(count)
}

#[derive(Debug, thiserror::Error)]
pub enum SheetError {
    #[error("IO error at {0}: {1}")]
    Io(PathBuf, String),
    #[error("Serialize error: {0}")]
    Serialize(String),
    #[error("Parse error: {0}")]
    Parse(String),
}
