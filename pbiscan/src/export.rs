//! File export of scan results.
//!
//! Two independent overwrite-on-write paths: the aggregate and
//! per-workspace JSON files, and one delimited file per flattened table.
//! Everything lands in a `{tenant}` directory under the configured output
//! directory.

use log::{info, warn};
use powerbi_admin::ScanResult;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::flatten::Table;

/// Export errors
#[derive(thiserror::Error, Debug)]
pub enum ExportError {
    /// File I/O error
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// The per-tenant output directory, created on demand.
fn tenant_dir(output_dir: &Path, tenant: &str) -> Result<PathBuf, ExportError> {
    let dir = output_dir.join(tenant);
    fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Make a workspace name safe for use in a filename.
fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '-' | '_' | '.' | ' ') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Write the aggregate and one JSON file per workspace.
///
/// Files are named `{tenant}_workspaces.json` and
/// `{tenant}_workspace_{name}.json`. When two workspaces share a display
/// name within the run, the second file is disambiguated by appending the
/// workspace id (the original exporter silently overwrote the first).
///
/// # Errors
///
/// Returns `ExportError::Io` when directory creation or a write fails.
pub fn write_json_exports(
    output_dir: &Path,
    tenant: &str,
    result: &ScanResult,
) -> Result<Vec<PathBuf>, ExportError> {
    let dir = tenant_dir(output_dir, tenant)?;
    let mut written = Vec::new();

    let aggregate_path = dir.join(format!("{tenant}_workspaces.json"));
    info!("Saving the scan results to {}", aggregate_path.display());
    fs::write(&aggregate_path, serde_json::to_string_pretty(result)?)?;
    written.push(aggregate_path);

    let mut seen = HashSet::new();
    for ws in &result.workspaces {
        let base = sanitize_file_name(ws.name.as_deref().unwrap_or(&ws.id));
        let base = if seen.insert(base.clone()) {
            base
        } else {
            warn!(
                "Workspace name '{base}' occurs more than once; disambiguating file with id {}",
                ws.id
            );
            format!("{base}_{}", sanitize_file_name(&ws.id))
        };

        let path = dir.join(format!("{tenant}_workspace_{base}.json"));
        info!("Saving the scan results to {}", path.display());
        fs::write(&path, serde_json::to_string_pretty(ws)?)?;
        written.push(path);
    }

    Ok(written)
}

/// Write one delimited file per flattened table, named `{tenant}_{table}.csv`.
///
/// # Errors
///
/// Returns `ExportError::Io` when directory creation or a write fails.
pub fn write_csv_exports(
    output_dir: &Path,
    tenant: &str,
    tables: &[Table],
) -> Result<Vec<PathBuf>, ExportError> {
    let dir = tenant_dir(output_dir, tenant)?;
    let mut written = Vec::new();

    for table in tables {
        let path = dir.join(format!("{tenant}_{}.csv", table.name));
        info!("Saving the scan results to {}", path.display());
        fs::write(&path, table_to_csv(table))?;
        written.push(path);
    }

    Ok(written)
}

/// Render a table as CSV text, header row first.
fn table_to_csv(table: &Table) -> String {
    let mut csv_content = String::new();

    let header: Vec<String> = table.columns.iter().map(|c| escape_csv(c)).collect();
    csv_content.push_str(&header.join(","));
    csv_content.push('\n');

    for row in &table.rows {
        let cells: Vec<String> = row.iter().map(|c| escape_csv(c)).collect();
        csv_content.push_str(&cells.join(","));
        csv_content.push('\n');
    }

    csv_content
}

fn escape_csv(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flatten::build_tables;
    use tempfile::TempDir;

    fn scan_result(json: &str) -> ScanResult {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_escape_csv() {
        assert_eq!(escape_csv("simple"), "simple");
        assert_eq!(escape_csv("with,comma"), "\"with,comma\"");
        assert_eq!(escape_csv("with\"quote"), "\"with\"\"quote\"");
        assert_eq!(escape_csv("with\nnewline"), "\"with\nnewline\"");
    }

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("Finance 2026"), "Finance 2026");
        assert_eq!(sanitize_file_name("a/b\\c:d"), "a_b_c_d");
    }

    #[test]
    fn test_json_export_writes_aggregate_and_per_workspace_files() {
        let temp_dir = TempDir::new().unwrap();
        let result = scan_result(
            r#"{"workspaces":[{"id":"ws-1","name":"Finance","reports":[]},
                              {"id":"ws-2","name":"Sales","reports":[]}]}"#,
        );

        let written = write_json_exports(temp_dir.path(), "contoso", &result).unwrap();

        assert_eq!(written.len(), 3);
        assert!(temp_dir
            .path()
            .join("contoso/contoso_workspaces.json")
            .exists());
        assert!(temp_dir
            .path()
            .join("contoso/contoso_workspace_Finance.json")
            .exists());
        assert!(temp_dir
            .path()
            .join("contoso/contoso_workspace_Sales.json")
            .exists());
    }

    #[test]
    fn test_json_round_trip_is_structurally_identical() {
        let temp_dir = TempDir::new().unwrap();
        let body = r#"{"workspaces":[{"id":"ws-1","name":"Finance",
            "reports":[{"id":"r-1","endorsement":{"stage":"Certified"}}],
            "datasets":[],"users":[{"identifier":"alice"}]}]}"#;
        let result = scan_result(body);

        write_json_exports(temp_dir.path(), "contoso", &result).unwrap();

        let written =
            fs::read_to_string(temp_dir.path().join("contoso/contoso_workspaces.json")).unwrap();
        let read_back: serde_json::Value = serde_json::from_str(&written).unwrap();
        let original: serde_json::Value = serde_json::from_str(body).unwrap();
        assert_eq!(read_back, original);
    }

    #[test]
    fn test_name_collision_produces_two_distinct_files() {
        let temp_dir = TempDir::new().unwrap();
        let result = scan_result(
            r#"{"workspaces":[{"id":"ws-1","name":"Finance"},
                              {"id":"ws-2","name":"Finance"}]}"#,
        );

        let written = write_json_exports(temp_dir.path(), "contoso", &result).unwrap();

        // Aggregate plus two per-workspace files, all distinct paths
        assert_eq!(written.len(), 3);
        let unique: HashSet<&PathBuf> = written.iter().collect();
        assert_eq!(unique.len(), 3);
        assert!(temp_dir
            .path()
            .join("contoso/contoso_workspace_Finance.json")
            .exists());
        assert!(temp_dir
            .path()
            .join("contoso/contoso_workspace_Finance_ws-2.json")
            .exists());
    }

    #[test]
    fn test_csv_export_one_file_per_table() {
        let temp_dir = TempDir::new().unwrap();
        let result = scan_result(
            r#"{"workspaces":[{"id":"ws-1","name":"Finance",
                "reports":[{"id":"r-1","name":"Spend, by quarter"}]}]}"#,
        );
        let tables = build_tables(&result);

        let written = write_csv_exports(temp_dir.path(), "contoso", &tables).unwrap();
        assert_eq!(written.len(), 5);

        for table in ["workspaces", "reports", "dashboards", "datasets", "dataflows"] {
            assert!(temp_dir
                .path()
                .join(format!("contoso/contoso_{table}.csv"))
                .exists());
        }

        // Quoting survives the write
        let reports =
            fs::read_to_string(temp_dir.path().join("contoso/contoso_reports.csv")).unwrap();
        assert!(reports.lines().count() == 2);
        assert!(reports.contains("\"Spend, by quarter\""));
        assert!(reports.contains("report.id"));
        assert!(reports.contains("workspace.id"));
    }

    #[test]
    fn test_export_overwrites_previous_run() {
        let temp_dir = TempDir::new().unwrap();
        let first = scan_result(r#"{"workspaces":[{"id":"ws-1","name":"Old"}]}"#);
        let second = scan_result(r#"{"workspaces":[{"id":"ws-1","name":"New"}]}"#);

        write_json_exports(temp_dir.path(), "contoso", &first).unwrap();
        write_json_exports(temp_dir.path(), "contoso", &second).unwrap();

        let aggregate =
            fs::read_to_string(temp_dir.path().join("contoso/contoso_workspaces.json")).unwrap();
        assert!(aggregate.contains("New"));
        assert!(!aggregate.contains("Old"));
    }
}
