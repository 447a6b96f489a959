use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Body of `POST /api/query`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct QueryRequest {
    pub query: String,
}

/// A single result cell. The backend decides the type per row, so the column
/// set and cell types are only known once the payload arrives.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum CellValue {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    Text(String),
}

impl CellValue {
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Null => f.write_str("NULL"),
            CellValue::Bool(b) => write!(f, "{b}"),
            CellValue::Number(n) => write!(f, "{n}"),
            CellValue::Text(s) => f.write_str(s),
        }
    }
}

/// One result row: column name to value, in the order the backend sent them.
pub type Row = IndexMap<String, CellValue>;

/// Response of `POST /api/query`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct QueryResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<Row>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rowcount: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl QueryResponse {
    /// Failed result carrying `message`.
    pub fn failure(message: impl Into<String>) -> Self {
        QueryResponse {
            success: false,
            data: None,
            rowcount: None,
            error: Some(message.into()),
        }
    }

    /// Error text for a failed response. A failure without a message from the
    /// backend still yields a non-empty string.
    pub fn error_message(&self) -> Option<&str> {
        if self.success {
            return None;
        }
        match self.error.as_deref() {
            Some(msg) if !msg.trim().is_empty() => Some(msg),
            _ => Some("Unknown error"),
        }
    }

    /// Columnar view of `data`; empty when the query returned no rows.
    pub fn result_set(&self) -> ResultSet {
        ResultSet::from_rows(self.data.clone().unwrap_or_default())
    }
}

/// Response of `GET /api/tables`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
pub struct TablesResponse {
    pub success: bool,
    #[serde(default)]
    pub tables: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: String,
}

/// Response of `GET /api/tables/{name}`: schema plus the first few rows.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct TableDetailResponse {
    pub success: bool,
    #[serde(default)]
    pub columns: Vec<ColumnInfo>,
    #[serde(default)]
    pub sample_data: Vec<Row>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TableDetailResponse {
    /// Sample rows laid out under the declared column order.
    pub fn sample_set(&self) -> ResultSet {
        ResultSet {
            columns: self.columns.iter().map(|c| c.name.clone()).collect(),
            rows: self.sample_data.clone(),
        }
    }
}

/// Response of `GET /`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
pub struct HealthResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub status: String,
}

/// Ordered column names plus the rows keyed by them.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl ResultSet {
    /// Columns are taken from the first row; later rows missing a column read
    /// back as NULL.
    pub fn from_rows(rows: Vec<Row>) -> Self {
        let columns = rows
            .first()
            .map(|row| row.keys().cloned().collect())
            .unwrap_or_default();
        ResultSet { columns, rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn cell(&self, row: usize, column: &str) -> &CellValue {
        static NULL: CellValue = CellValue::Null;
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .unwrap_or(&NULL)
    }
}

/// Statement category detected from the leading keyword. Only used to pick
/// log labels and the kind of summary shown after a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum QueryKind {
    Select,
    Insert,
    Update,
    Delete,
    Create,
    Drop,
    Alter,
}

impl QueryKind {
    /// Anything that does not start with a known modifying keyword counts as
    /// a SELECT.
    pub fn detect(sql: &str) -> Self {
        let head: String = sql
            .trim_start()
            .chars()
            .take_while(|c| c.is_ascii_alphabetic())
            .collect::<String>()
            .to_ascii_uppercase();
        match head.as_str() {
            "INSERT" => QueryKind::Insert,
            "UPDATE" => QueryKind::Update,
            "DELETE" => QueryKind::Delete,
            "CREATE" => QueryKind::Create,
            "DROP" => QueryKind::Drop,
            "ALTER" => QueryKind::Alter,
            _ => QueryKind::Select,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            QueryKind::Select => "SELECT",
            QueryKind::Insert => "INSERT",
            QueryKind::Update => "UPDATE",
            QueryKind::Delete => "DELETE",
            QueryKind::Create => "CREATE",
            QueryKind::Drop => "DROP",
            QueryKind::Alter => "ALTER",
        }
    }

    /// Statements rendered as an affected-row summary instead of a table.
    pub fn is_modification(&self) -> bool {
        !matches!(self, QueryKind::Select)
    }
}

impl fmt::Display for QueryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn query_response_keeps_backend_column_order() {
        let payload = json!({
            "success": true,
            "data": [
                {"zeta": 1, "alpha": "a", "mid": null},
                {"zeta": 2, "alpha": "b", "mid": true}
            ],
            "rowcount": 2
        });
        let resp: QueryResponse = serde_json::from_value(payload).unwrap();
        let set = resp.result_set();
        assert_eq!(set.columns, vec!["zeta", "alpha", "mid"]);
        assert_eq!(set.rows.len(), 2);
        assert!(set.cell(0, "mid").is_null());
        assert_eq!(set.cell(1, "mid"), &CellValue::Bool(true));
        assert_eq!(set.cell(0, "alpha"), &CellValue::Text("a".into()));
        assert_eq!(set.cell(5, "alpha"), &CellValue::Null);
    }

    #[test]
    fn failure_payload_without_data_decodes() {
        let resp: QueryResponse =
            serde_json::from_value(json!({"success": false, "error": "no such table: x"}))
                .unwrap();
        assert!(!resp.success);
        assert_eq!(resp.error_message(), Some("no such table: x"));
        assert!(resp.result_set().is_empty());
    }

    #[test]
    fn empty_select_is_distinguishable_from_failure() {
        let ok: QueryResponse =
            serde_json::from_value(json!({"success": true, "data": [], "rowcount": 0})).unwrap();
        assert!(ok.success);
        assert_eq!(ok.rowcount, Some(0));
        assert_eq!(ok.error_message(), None);

        let failed = QueryResponse::failure("");
        assert_eq!(failed.error_message(), Some("Unknown error"));
    }

    #[test]
    fn table_detail_maps_type_field() {
        let detail: TableDetailResponse = serde_json::from_value(json!({
            "success": true,
            "columns": [{"name": "id", "type": "INTEGER"}, {"name": "name", "type": "TEXT"}],
            "sample_data": [{"id": 1, "name": "Ada"}]
        }))
        .unwrap();
        assert_eq!(detail.columns[0].data_type, "INTEGER");
        let set = detail.sample_set();
        assert_eq!(set.columns, vec!["id", "name"]);
        assert_eq!(set.cell(0, "name").to_string(), "Ada");
    }

    #[test]
    fn cell_numbers_render_verbatim() {
        let row: Row = serde_json::from_value(json!({"price": 12.5, "qty": 3})).unwrap();
        assert_eq!(row["price"].to_string(), "12.5");
        assert_eq!(row["qty"].to_string(), "3");
    }

    #[test]
    fn query_kind_detection_uses_leading_keyword() {
        assert_eq!(QueryKind::detect("  insert into t values (1)"), QueryKind::Insert);
        assert_eq!(QueryKind::detect("UPDATE t SET a = 1"), QueryKind::Update);
        assert_eq!(QueryKind::detect("drop table t"), QueryKind::Drop);
        assert_eq!(QueryKind::detect("PRAGMA table_info(t)"), QueryKind::Select);
        assert_eq!(QueryKind::detect("DELETED"), QueryKind::Select);
        assert!(QueryKind::Alter.is_modification());
        assert!(!QueryKind::Select.is_modification());
    }
}
