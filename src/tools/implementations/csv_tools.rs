// CSV tools - read rows, append a row, compute a column insight
//
// Rows are header-keyed JSON objects with string cells, the same shape a
// dict reader would produce.

use crate::tools::local::{str_arg, Tool, ToolContext};
use crate::tools::types::ToolInputSchema;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::str::FromStr;

/// Header row plus data rows of a CSV file
struct CsvTable {
    headers: Vec<String>,
    rows: Vec<Map<String, Value>>,
}

fn read_table(path: &Path) -> Result<CsvTable> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Failed to open CSV file: {}", path.display()))?;

    let headers: Vec<String> = reader
        .headers()
        .with_context(|| format!("Failed to read CSV header: {}", path.display()))?
        .iter()
        .map(str::to_string)
        .collect();

    let mut rows = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record =
            record.with_context(|| format!("Bad CSV record {} in {}", i + 1, path.display()))?;
        let mut row = Map::new();
        for (idx, header) in headers.iter().enumerate() {
            let cell = record.get(idx).unwrap_or("");
            row.insert(header.clone(), Value::String(cell.to_string()));
        }
        rows.push(row);
    }

    Ok(CsvTable { headers, rows })
}

/// `columns` may arrive as an array, a comma-separated string, or null
fn parse_columns(value: Option<&Value>) -> Result<Option<Vec<String>>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(
            s.split(',')
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty())
                .collect(),
        )),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(str::to_string)
                    .context("columns must be strings")
            })
            .collect::<Result<Vec<_>>>()
            .map(Some),
        Some(other) => bail!("columns must be a list of names, got {}", other),
    }
}

pub struct CsvReadTool;

#[async_trait]
impl Tool for CsvReadTool {
    fn name(&self) -> &str {
        "csv_read"
    }

    fn description(&self) -> &str {
        "Reads data from a CSV file."
    }

    fn input_schema(&self) -> ToolInputSchema {
        ToolInputSchema::from_params(&[
            ("path", "string", "Path to the CSV file", true),
            ("columns", "", "Optional list of columns to keep", false),
        ])
    }

    async fn execute(&self, input: &Map<String, Value>, context: &ToolContext) -> Result<Value> {
        let path = context.resolve(str_arg(input, "path")?);
        let columns = parse_columns(input.get("columns"))?;
        let table = read_table(&path)?;

        let rows: Vec<Value> = table
            .rows
            .into_iter()
            .map(|row| match &columns {
                Some(cols) => Value::Object(
                    cols.iter()
                        .filter_map(|c| row.get(c).map(|v| (c.clone(), v.clone())))
                        .collect(),
                ),
                None => Value::Object(row),
            })
            .collect();

        Ok(Value::Array(rows))
    }
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

pub struct CsvAddRowTool;

#[async_trait]
impl Tool for CsvAddRowTool {
    fn name(&self) -> &str {
        "csv_add_row"
    }

    fn description(&self) -> &str {
        "Adds a new row to a CSV file."
    }

    fn input_schema(&self) -> ToolInputSchema {
        ToolInputSchema::from_params(&[
            ("path", "string", "Path to the CSV file", true),
            ("row", "object", "Column name to cell value", true),
        ])
    }

    async fn execute(&self, input: &Map<String, Value>, context: &ToolContext) -> Result<Value> {
        let path = context.resolve(str_arg(input, "path")?);
        let row = input
            .get("row")
            .and_then(Value::as_object)
            .context("Missing row parameter")?;

        let existing = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read {}", path.display()))
            }
        };
        let mut out = csv::WriterBuilder::new().from_writer(Vec::new());

        let headers: Vec<String> = if existing.iter().all(|b| b.is_ascii_whitespace()) {
            let headers: Vec<String> = row.keys().cloned().collect();
            out.write_record(&headers)?;
            headers
        } else {
            read_table(&path)?.headers
        };

        if let Some(unknown) = row.keys().find(|k| !headers.contains(k)) {
            bail!(
                "Column '{}' is not in {} (columns: {})",
                unknown,
                path.display(),
                headers.join(", ")
            );
        }

        let record: Vec<String> = headers
            .iter()
            .map(|h| row.get(h).map(cell_text).unwrap_or_default())
            .collect();
        out.write_record(&record)?;
        let bytes = out
            .into_inner()
            .map_err(|e| anyhow::anyhow!("Failed to encode CSV row: {}", e.error()))?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open {} for append", path.display()))?;
        if !existing.is_empty() && !existing.ends_with(b"\n") {
            file.write_all(b"\n")?;
        }
        file.write_all(&bytes)
            .with_context(|| format!("Failed to append to {}", path.display()))?;

        Ok(json!({"status": "success", "row": row}))
    }
}

/// Aggregate over a numeric column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsightOperation {
    Sum,
    Average,
    Max,
    Min,
    Count,
}

impl FromStr for InsightOperation {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "sum" => Ok(InsightOperation::Sum),
            "average" => Ok(InsightOperation::Average),
            "max" => Ok(InsightOperation::Max),
            "min" => Ok(InsightOperation::Min),
            "count" => Ok(InsightOperation::Count),
            other => bail!(
                "Unsupported operation '{}' (expected sum, average, max, min or count)",
                other
            ),
        }
    }
}

/// Compute `operation` over the non-blank cells of `column`.
///
/// Returns `null` when the column has no values.
pub fn compute_insight(
    rows: &[Map<String, Value>],
    column: &str,
    operation: InsightOperation,
) -> Result<Value> {
    let mut values = Vec::new();
    for (i, row) in rows.iter().enumerate() {
        let cell = row
            .get(column)
            .with_context(|| format!("Column '{}' not found", column))?;
        let text = cell_text(cell);
        let text = text.trim();
        if text.is_empty() {
            continue;
        }
        let number = text
            .parse::<f64>()
            .with_context(|| format!("Row {}: '{}' in column '{}' is not a number", i + 1, text, column))?;
        values.push(number);
    }

    if values.is_empty() {
        return Ok(Value::Null);
    }

    let result = match operation {
        InsightOperation::Count => return Ok(Value::from(values.len())),
        InsightOperation::Sum => values.iter().sum(),
        InsightOperation::Average => values.iter().sum::<f64>() / values.len() as f64,
        InsightOperation::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        InsightOperation::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
    };

    Ok(Value::from(result))
}

pub struct CsvInsightTool;

#[async_trait]
impl Tool for CsvInsightTool {
    fn name(&self) -> &str {
        "csv_insight"
    }

    fn description(&self) -> &str {
        "Computes an insight on a CSV column (e.g., sum, average)."
    }

    fn input_schema(&self) -> ToolInputSchema {
        ToolInputSchema::from_params(&[
            ("path", "string", "Path to the CSV file", true),
            ("column", "string", "Numeric column to aggregate", true),
            ("operation", "string", "One of sum, average, max, min, count", true),
        ])
    }

    async fn execute(&self, input: &Map<String, Value>, context: &ToolContext) -> Result<Value> {
        let path = context.resolve(str_arg(input, "path")?);
        let column = str_arg(input, "column")?;
        let operation: InsightOperation = str_arg(input, "operation")?.parse()?;

        let table = read_table(&path)?;
        if !table.headers.iter().any(|h| h == column) {
            bail!(
                "Column '{}' not found in {} (columns: {})",
                column,
                path.display(),
                table.headers.join(", ")
            );
        }

        compute_insight(&table.rows, column, operation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn rows(values: &[&str]) -> Vec<Map<String, Value>> {
        values
            .iter()
            .map(|v| {
                let mut m = Map::new();
                m.insert("sales".to_string(), json!(v));
                m
            })
            .collect()
    }

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn test_sum_skips_blank_cells() {
        let result = compute_insight(&rows(&["10", "20", ""]), "sales", InsightOperation::Sum).unwrap();
        assert_eq!(result, json!(30.0));
    }

    #[test]
    fn test_other_operations() {
        let data = rows(&["4", "", "10", "1"]);
        assert_eq!(compute_insight(&data, "sales", InsightOperation::Average).unwrap(), json!(5.0));
        assert_eq!(compute_insight(&data, "sales", InsightOperation::Max).unwrap(), json!(10.0));
        assert_eq!(compute_insight(&data, "sales", InsightOperation::Min).unwrap(), json!(1.0));
        assert_eq!(compute_insight(&data, "sales", InsightOperation::Count).unwrap(), json!(3));
    }

    #[test]
    fn test_no_values_is_null() {
        let result = compute_insight(&rows(&["", " "]), "sales", InsightOperation::Sum).unwrap();
        assert_eq!(result, Value::Null);
    }

    #[test]
    fn test_count_without_values_is_null() {
        let result = compute_insight(&rows(&["", "  "]), "sales", InsightOperation::Count).unwrap();
        assert_eq!(result, Value::Null);
    }

    #[test]
    fn test_non_numeric_cell_errors() {
        assert!(compute_insight(&rows(&["10", "ten"]), "sales", InsightOperation::Sum).is_err());
    }

    #[test]
    fn test_operation_parsing() {
        assert_eq!("AVERAGE".parse::<InsightOperation>().unwrap(), InsightOperation::Average);
        assert!("median".parse::<InsightOperation>().is_err());
    }

    #[tokio::test]
    async fn test_insight_tool_reads_file() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("report.csv"), "region,sales\nnorth,10\nsouth,20\neast,\n").unwrap();
        let ctx = ToolContext::with_root(dir.path());

        let out = CsvInsightTool
            .execute(
                &args(json!({"path": "report.csv", "column": "sales", "operation": "sum"})),
                &ctx,
            )
            .await
            .unwrap();
        assert_eq!(out, json!(30.0));

        let missing = CsvInsightTool
            .execute(
                &args(json!({"path": "report.csv", "column": "profit", "operation": "sum"})),
                &ctx,
            )
            .await;
        assert!(missing.unwrap_err().to_string().contains("profit"));
    }

    #[tokio::test]
    async fn test_read_with_column_filter() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("r.csv"), "region,sales\nnorth,10\nsouth,20\n").unwrap();
        let ctx = ToolContext::with_root(dir.path());

        let all = CsvReadTool
            .execute(&args(json!({"path": "r.csv"})), &ctx)
            .await
            .unwrap();
        assert_eq!(all, json!([{"region": "north", "sales": "10"}, {"region": "south", "sales": "20"}]));

        let filtered = CsvReadTool
            .execute(&args(json!({"path": "r.csv", "columns": ["sales", "nope"]})), &ctx)
            .await
            .unwrap();
        assert_eq!(filtered, json!([{"sales": "10"}, {"sales": "20"}]));
    }

    #[tokio::test]
    async fn test_add_row_follows_existing_header() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("r.csv");
        fs::write(&path, "region,sales\nnorth,10").unwrap();
        let ctx = ToolContext::with_root(dir.path());

        let out = CsvAddRowTool
            .execute(&args(json!({"path": "r.csv", "row": {"sales": 5, "region": "west"}})), &ctx)
            .await
            .unwrap();
        assert_eq!(out["status"], json!("success"));
        assert_eq!(fs::read_to_string(&path).unwrap(), "region,sales\nnorth,10\nwest,5\n");
    }

    #[tokio::test]
    async fn test_add_row_creates_header_for_new_file() {
        let dir = TempDir::new().unwrap();
        let ctx = ToolContext::with_root(dir.path());

        CsvAddRowTool
            .execute(&args(json!({"path": "new.csv", "row": {"name": "a", "qty": "1"}})), &ctx)
            .await
            .unwrap();
        assert_eq!(
            fs::read_to_string(dir.path().join("new.csv")).unwrap(),
            "name,qty\na,1\n"
        );
    }

    #[tokio::test]
    async fn test_add_row_rejects_unknown_column() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("r.csv"), "region,sales\n").unwrap();
        let ctx = ToolContext::with_root(dir.path());

        let result = CsvAddRowTool
            .execute(&args(json!({"path": "r.csv", "row": {"profit": 1}})), &ctx)
            .await;
        assert!(result.is_err());
        assert_eq!(fs::read_to_string(dir.path().join("r.csv")).unwrap(), "region,sales\n");
    }

    #[tokio::test]
    async fn test_add_row_reports_unreadable_file() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("table.csv")).unwrap();
        let ctx = ToolContext::with_root(dir.path());

        let err = CsvAddRowTool
            .execute(&args(json!({"path": "table.csv", "row": {"name": "a"}})), &ctx)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Failed to read"), "{}", err);
        assert!(dir.path().join("table.csv").is_dir());
    }
}
