//! Tabular flattening of scan results.
//!
//! Walks each workspace's nested `reports` / `dashboards` / `datasets` /
//! `dataflows` arrays and builds five flat tables. Nested objects collapse
//! into dot-joined column names, child columns are prefixed with the
//! singular record type, and every child row carries the parent
//! workspace's id and name as `workspace.*` meta-columns. The workspace
//! table itself drops the four nested-array columns after flattening.

use powerbi_admin::ScanResult;
use serde_json::Value;
use std::collections::HashMap;

/// The four nested collections and the column prefix for their records.
pub const NESTED_COLLECTIONS: [(&str, &str); 4] = [
    ("reports", "report"),
    ("dashboards", "dashboard"),
    ("datasets", "dataset"),
    ("dataflows", "dataflow"),
];

/// A flat table ready for delimited export.
///
/// `columns` is the first-seen-ordered union across all rows; every row is
/// aligned to it, with missing cells rendered empty.
#[derive(Debug, Clone)]
pub struct Table {
    pub name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// Whether the table has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Accumulates sparse rows and materializes them against the column union.
struct TableBuilder {
    name: String,
    columns: Vec<String>,
    index: HashMap<String, usize>,
    rows: Vec<Vec<(usize, String)>>,
}

impl TableBuilder {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            columns: Vec::new(),
            index: HashMap::new(),
            rows: Vec::new(),
        }
    }

    fn push_row(&mut self, cells: Vec<(String, String)>) {
        let row = cells
            .into_iter()
            .map(|(column, value)| (self.column_index(column), value))
            .collect();
        self.rows.push(row);
    }

    fn column_index(&mut self, name: String) -> usize {
        if let Some(&index) = self.index.get(&name) {
            return index;
        }
        let index = self.columns.len();
        self.index.insert(name.clone(), index);
        self.columns.push(name);
        index
    }

    fn finish(self) -> Table {
        let width = self.columns.len();
        let rows = self
            .rows
            .into_iter()
            .map(|sparse| {
                let mut row = vec![String::new(); width];
                for (index, value) in sparse {
                    row[index] = value;
                }
                row
            })
            .collect();

        Table {
            name: self.name,
            columns: self.columns,
            rows,
        }
    }
}

/// Flatten a scan result into the five export tables:
/// `workspaces`, `reports`, `dashboards`, `datasets`, `dataflows`.
#[must_use]
pub fn build_tables(result: &ScanResult) -> Vec<Table> {
    let mut workspaces = TableBuilder::new("workspaces");
    let mut children: Vec<TableBuilder> = NESTED_COLLECTIONS
        .iter()
        .map(|(plural, _)| TableBuilder::new(plural))
        .collect();

    for ws in &result.workspaces {
        // Workspace row: the full record minus the four nested arrays
        let mut record = ws.extra.clone();
        record.insert("id".to_string(), Value::String(ws.id.clone()));
        if let Some(name) = &ws.name {
            record.insert("name".to_string(), Value::String(name.clone()));
        }
        for (plural, _) in NESTED_COLLECTIONS {
            record.remove(plural);
        }

        let mut cells = Vec::new();
        flatten_object("", &record, &mut cells);
        workspaces.push_row(cells);

        // Child rows: prefixed columns plus the parent meta-columns
        for (builder, (plural, singular)) in children.iter_mut().zip(NESTED_COLLECTIONS.iter()) {
            for child in ws.children(plural) {
                let mut cells = Vec::new();
                match child {
                    Value::Object(object) => flatten_object(singular, object, &mut cells),
                    other => cells.push(((*singular).to_string(), cell_text(other))),
                }
                cells.push(("workspace.id".to_string(), ws.id.clone()));
                cells.push((
                    "workspace.name".to_string(),
                    ws.name.clone().unwrap_or_default(),
                ));
                builder.push_row(cells);
            }
        }
    }

    let mut tables = vec![workspaces.finish()];
    tables.extend(children.into_iter().map(TableBuilder::finish));
    tables
}

/// Collapse a JSON object into `(column, cell)` pairs, joining nested
/// object keys with dots. Arrays and scalars become single cells.
fn flatten_object(
    prefix: &str,
    object: &serde_json::Map<String, Value>,
    out: &mut Vec<(String, String)>,
) {
    for (key, value) in object {
        let column = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match value {
            Value::Object(nested) => flatten_object(&column, nested, out),
            other => out.push((column, cell_text(other))),
        }
    }
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        // Arrays inside a cell are kept as compact JSON text
        Value::Array(_) | Value::Object(_) => serde_json::to_string(value).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan_result(json: &str) -> ScanResult {
        serde_json::from_str(json).unwrap()
    }

    fn table<'a>(tables: &'a [Table], name: &str) -> &'a Table {
        tables.iter().find(|t| t.name == name).unwrap()
    }

    #[test]
    fn test_five_tables_in_order() {
        let tables = build_tables(&ScanResult::default());
        let names: Vec<&str> = tables.iter().map(|t| t.name.as_str()).collect();

        assert_eq!(
            names,
            ["workspaces", "reports", "dashboards", "datasets", "dataflows"]
        );
    }

    #[test]
    fn test_workspace_without_children_yields_no_child_rows() {
        let result = scan_result(
            r#"{"workspaces":[{"id":"ws-1","name":"Empty","state":"Active",
                "reports":[],"dashboards":[],"datasets":[],"dataflows":[]}]}"#,
        );
        let tables = build_tables(&result);

        let workspaces = table(&tables, "workspaces");
        assert_eq!(workspaces.rows.len(), 1);
        // The four nested-array columns must not survive flattening
        for (plural, _) in NESTED_COLLECTIONS {
            assert!(!workspaces.columns.iter().any(|c| c == plural));
        }

        for (plural, _) in NESTED_COLLECTIONS {
            assert!(table(&tables, plural).is_empty());
        }
    }

    #[test]
    fn test_child_rows_are_prefixed_and_carry_parent_meta() {
        let result = scan_result(
            r#"{"workspaces":[{"id":"ws-1","name":"Finance",
                "reports":[{"id":"r-1","reportType":"PowerBIReport"},{"id":"r-2"}]}]}"#,
        );
        let tables = build_tables(&result);
        let reports = table(&tables, "reports");

        assert_eq!(reports.rows.len(), 2);
        assert!(reports.columns.iter().any(|c| c == "report.id"));
        assert!(reports.columns.iter().any(|c| c == "report.reportType"));
        assert!(reports.columns.iter().any(|c| c == "workspace.id"));
        assert!(reports.columns.iter().any(|c| c == "workspace.name"));

        let id_col = reports.columns.iter().position(|c| c == "report.id").unwrap();
        let ws_col = reports.columns.iter().position(|c| c == "workspace.id").unwrap();
        assert_eq!(reports.rows[0][id_col], "r-1");
        assert_eq!(reports.rows[0][ws_col], "ws-1");
        assert_eq!(reports.rows[1][id_col], "r-2");
    }

    #[test]
    fn test_nested_objects_collapse_into_dotted_columns() {
        let result = scan_result(
            r#"{"workspaces":[{"id":"ws-1",
                "datasets":[{"id":"d-1","configuredBy":{"user":"alice"}}]}]}"#,
        );
        let tables = build_tables(&result);
        let datasets = table(&tables, "datasets");

        let col = datasets
            .columns
            .iter()
            .position(|c| c == "dataset.configuredBy.user")
            .unwrap();
        assert_eq!(datasets.rows[0][col], "alice");
    }

    #[test]
    fn test_arrays_inside_cells_stay_as_json_text() {
        let result = scan_result(
            r#"{"workspaces":[{"id":"ws-1","users":[{"identifier":"alice"}]}]}"#,
        );
        let tables = build_tables(&result);
        let workspaces = table(&tables, "workspaces");

        let col = workspaces.columns.iter().position(|c| c == "users").unwrap();
        assert_eq!(workspaces.rows[0][col], r#"[{"identifier":"alice"}]"#);
    }

    #[test]
    fn test_column_union_pads_missing_cells() {
        let result = scan_result(
            r#"{"workspaces":[
                {"id":"ws-1","dashboards":[{"id":"db-1"}]},
                {"id":"ws-2","dashboards":[{"id":"db-2","displayName":"Ops"}]}
            ]}"#,
        );
        let tables = build_tables(&result);
        let dashboards = table(&tables, "dashboards");

        assert_eq!(dashboards.rows.len(), 2);
        assert_eq!(dashboards.columns.len(), dashboards.rows[0].len());

        let name_col = dashboards
            .columns
            .iter()
            .position(|c| c == "dashboard.displayName")
            .unwrap();
        assert_eq!(dashboards.rows[0][name_col], "");
        assert_eq!(dashboards.rows[1][name_col], "Ops");
    }

    #[test]
    fn test_workspace_without_name_gets_empty_meta_cell() {
        let result =
            scan_result(r#"{"workspaces":[{"id":"ws-1","dataflows":[{"objectId":"df-1"}]}]}"#);
        let tables = build_tables(&result);
        let dataflows = table(&tables, "dataflows");

        let name_col = dataflows
            .columns
            .iter()
            .position(|c| c == "workspace.name")
            .unwrap();
        assert_eq!(dataflows.rows[0][name_col], "");
    }
}
