// Text tools - read a file, append a line, replace one line
//
// Line numbers are 0-based.

use crate::tools::local::{str_arg, Tool, ToolContext};
use crate::tools::types::ToolInputSchema;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::fs::{self, OpenOptions};
use std::io::Write;

pub struct TextReadTool;

#[async_trait]
impl Tool for TextReadTool {
    fn name(&self) -> &str {
        "text_read"
    }

    fn description(&self) -> &str {
        "Reads the entire content of a text file."
    }

    fn input_schema(&self) -> ToolInputSchema {
        ToolInputSchema::from_params(&[("path", "string", "Path to the text file", true)])
    }

    async fn execute(&self, input: &Map<String, Value>, context: &ToolContext) -> Result<Value> {
        let path = context.resolve(str_arg(input, "path")?);
        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read file: {}", path.display()))?;
        Ok(Value::String(contents))
    }
}

pub struct TextAppendTool;

#[async_trait]
impl Tool for TextAppendTool {
    fn name(&self) -> &str {
        "text_append"
    }

    fn description(&self) -> &str {
        "Appends text to the end of a file."
    }

    fn input_schema(&self) -> ToolInputSchema {
        ToolInputSchema::from_params(&[
            ("path", "string", "Path to the text file", true),
            ("text", "string", "Text to append as a new line", true),
        ])
    }

    async fn execute(&self, input: &Map<String, Value>, context: &ToolContext) -> Result<Value> {
        let path = context.resolve(str_arg(input, "path")?);
        let text = str_arg(input, "text")?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open {} for append", path.display()))?;
        writeln!(file, "{}", text)
            .with_context(|| format!("Failed to append to {}", path.display()))?;

        Ok(json!({"status": "success", "text_added": text}))
    }
}

pub struct TextEditTool;

#[async_trait]
impl Tool for TextEditTool {
    fn name(&self) -> &str {
        "text_edit"
    }

    fn description(&self) -> &str {
        "Replaces the content of a specific line in a text file."
    }

    fn input_schema(&self) -> ToolInputSchema {
        ToolInputSchema::from_params(&[
            ("path", "string", "Path to the text file", true),
            ("line_number", "integer", "0-based index of the line to replace", true),
            ("new_text", "string", "Replacement line content", true),
        ])
    }

    async fn execute(&self, input: &Map<String, Value>, context: &ToolContext) -> Result<Value> {
        let path = context.resolve(str_arg(input, "path")?);
        let line_number = input
            .get("line_number")
            .and_then(Value::as_i64)
            .context("Missing line_number parameter")?;
        let new_text = str_arg(input, "new_text")?;

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read file: {}", path.display()))?;
        let mut lines: Vec<String> = contents.split_inclusive('\n').map(str::to_string).collect();

        let index = match usize::try_from(line_number) {
            Ok(i) if i < lines.len() => i,
            _ => bail!(
                "line_number {} out of range ({} has {} lines)",
                line_number,
                path.display(),
                lines.len()
            ),
        };

        lines[index] = format!("{}\n", new_text);
        fs::write(&path, lines.concat())
            .with_context(|| format!("Failed to write file: {}", path.display()))?;

        Ok(json!({"status": "success", "line_number": line_number, "new_text": new_text}))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    #[tokio::test]
    async fn test_read_nonexistent_file() {
        let result = TextReadTool
            .execute(&args(json!({"path": "/nonexistent/file.txt"})), &ToolContext::default())
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_append_then_read() {
        let dir = TempDir::new().unwrap();
        let ctx = ToolContext::with_root(dir.path());

        let out = TextAppendTool
            .execute(&args(json!({"path": "notes.txt", "text": "first"})), &ctx)
            .await
            .unwrap();
        assert_eq!(out, json!({"status": "success", "text_added": "first"}));
        TextAppendTool
            .execute(&args(json!({"path": "notes.txt", "text": "second"})), &ctx)
            .await
            .unwrap();

        let contents = TextReadTool
            .execute(&args(json!({"path": "notes.txt"})), &ctx)
            .await
            .unwrap();
        assert_eq!(contents, json!("first\nsecond\n"));
    }

    #[tokio::test]
    async fn test_edit_replaces_one_line() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notes.txt");
        fs::write(&path, "a\nb\nc").unwrap();
        let ctx = ToolContext::with_root(dir.path());

        let out = TextEditTool
            .execute(
                &args(json!({"path": "notes.txt", "line_number": 1, "new_text": "B"})),
                &ctx,
            )
            .await
            .unwrap();
        assert_eq!(out["line_number"], json!(1));
        assert_eq!(fs::read_to_string(&path).unwrap(), "a\nB\nc");
    }

    #[tokio::test]
    async fn test_edit_out_of_range_leaves_file_alone() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notes.txt");
        fs::write(&path, "only\n").unwrap();
        let ctx = ToolContext::with_root(dir.path());

        for bad in [1, 5, -1] {
            let err = TextEditTool
                .execute(
                    &args(json!({"path": "notes.txt", "line_number": bad, "new_text": "x"})),
                    &ctx,
                )
                .await
                .unwrap_err();
            assert!(err.to_string().contains("out of range"));
        }
        assert_eq!(fs::read_to_string(&path).unwrap(), "only\n");
    }
}
