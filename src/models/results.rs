//! Result set types: the wire-level page and the accumulated result.

use serde::{Deserialize, Serialize};

use super::StatementState;

/// A row of cell values. The service sends every cell as a string or null.
pub type Row = Vec<Option<String>>;

/// Metadata about a result column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    /// Column name.
    pub name: String,

    /// Declared type name (e.g. "NUMBER", "VARCHAR"); not interpreted.
    #[serde(rename = "type")]
    pub data_type: String,

    #[serde(default)]
    pub nullable: bool,

    /// Precision or size hint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<u64>,
}

impl Column {
    /// Creates a nullable column with no length hint.
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            nullable: true,
            length: None,
        }
    }
}

/// One page of a statement's results as returned by the results endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultPage {
    pub status: StatementState,
    #[serde(default)]
    pub columns: Vec<Column>,
    #[serde(default)]
    pub data: Vec<Row>,
    /// Total row count of the statement, identical on every page.
    #[serde(default)]
    pub number_of_rows: Option<u64>,
    #[serde(default)]
    pub rows_affected: Option<u64>,
    /// Error text when the statement did not succeed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// All rows of one statement, concatenated across pages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    pub statement_id: String,
    pub status: StatementState,
    pub columns: Vec<Column>,
    pub data: Vec<Row>,
    pub number_of_rows: Option<u64>,
    pub rows_affected: Option<u64>,
}

impl QueryResult {
    /// Starts a result from its first page.
    pub(crate) fn from_first_page(statement_id: impl Into<String>, page: ResultPage) -> Self {
        Self {
            statement_id: statement_id.into(),
            status: page.status,
            columns: page.columns,
            data: page.data,
            number_of_rows: page.number_of_rows,
            rows_affected: page.rows_affected,
        }
    }

    /// Number of rows accumulated.
    pub fn row_count(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the result has no rows.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns the column names in order.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }
}
