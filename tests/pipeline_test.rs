// End-to-end request pipeline over the in-process toolbox
//
// A scripted model stands in for Ollama; everything after the model reply
// (decode, normalize, dispatch, file tools) is the real thing, working on
// files in a temp directory.

use async_trait::async_trait;
use localdata::agent::{AgentSession, SessionOptions};
use localdata::errors::{CollaboratorError, ErrorKind};
use localdata::providers::{LlmProvider, ProviderRequest, ProviderResponse};
use localdata::tools::normalizer::{AliasTable, NormalizerConfig};
use localdata::tools::{LocalToolbox, ResultEnvelope, ToolContext};
use serde_json::json;
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

struct ScriptedModel {
    reply: String,
}

#[async_trait]
impl LlmProvider for ScriptedModel {
    async fn send_message(
        &self,
        _request: &ProviderRequest,
    ) -> Result<ProviderResponse, CollaboratorError> {
        Ok(ProviderResponse::text(self.reply.clone()))
    }

    fn name(&self) -> &str {
        "scripted"
    }

    fn default_model(&self) -> &str {
        "scripted-1"
    }
}

async fn session_with(dir: &TempDir, reply: &str, options: SessionOptions) -> AgentSession {
    let toolbox = LocalToolbox::with_file_tools(ToolContext::with_root(dir.path()));
    let model = ScriptedModel {
        reply: reply.to_string(),
    };
    AgentSession::new(Arc::new(toolbox), Arc::new(model), options)
        .await
        .unwrap()
}

async fn session(dir: &TempDir, reply: &str) -> AgentSession {
    session_with(dir, reply, SessionOptions::default()).await
}

// ── CSV ──────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_sum_skips_blank_cells() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("sales.csv"), "item,amount\na,10\nb,20\nc,\n").unwrap();

    let session = session(
        &dir,
        r#"{"tool": "csv_insight", "params": {"path": "sales.csv", "column": "amount", "operation": "sum"}}"#,
    )
    .await;

    let envelope = session.run_action("what is the total amount?").await;
    assert_eq!(envelope, ResultEnvelope::success(json!(30.0)));
}

#[tokio::test]
async fn test_add_row_then_read() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("people.csv"), "name,age\nann,31\n").unwrap();

    let add = session(
        &dir,
        r#"Here you go: {"tool": "csv_add_row", "params": {"path": "people.csv", "row": "{\"name\": \"bob\", \"age\": \"42\"}"}}"#,
    )
    .await;
    let added = add.run_action("add bob, 42").await;
    assert!(added.is_success(), "{:?}", added);

    let read = session(
        &dir,
        r#"{"tool": "csv_read", "params": {"path": "people.csv", "columns": ["name"]}}"#,
    )
    .await;
    let rows = read.run_action("who is in people.csv").await;
    assert_eq!(
        rows.value(),
        Some(&json!([{"name": "ann"}, {"name": "bob"}]))
    );
}

#[tokio::test]
async fn test_insight_on_missing_column_is_execution_error() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("sales.csv"), "item,amount\na,10\n").unwrap();

    let session = session(
        &dir,
        r#"{"tool": "csv_insight", "params": {"path": "sales.csv", "column": "price", "operation": "max"}}"#,
    )
    .await;
    assert_eq!(
        session.run_action("max price").await.kind(),
        Some(ErrorKind::ExecutionError)
    );
}

// ── Text ─────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_friendly_name_resolves_through_alias() {
    let dir = TempDir::new().unwrap();
    let notes = dir.path().join("notes.txt");
    fs::write(&notes, "first\n").unwrap();

    let options = SessionOptions {
        normalizer: NormalizerConfig {
            aliases: AliasTable::new([("notes file", notes.display().to_string())]).unwrap(),
            ..NormalizerConfig::default()
        },
        ..SessionOptions::default()
    };
    let session = session_with(
        &dir,
        r#"{"tool": "text_append", "params": {"path": "Notes File", "text": "buy milk"}}"#,
        options,
    )
    .await;

    let envelope = session.run_action("add buy milk to my notes file").await;
    assert_eq!(
        envelope.value(),
        Some(&json!({"status": "success", "text_added": "buy milk"}))
    );
    assert_eq!(fs::read_to_string(&notes).unwrap(), "first\nbuy milk\n");
}

#[tokio::test]
async fn test_bare_string_params_become_path() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("notes.txt"), "hello\n").unwrap();

    let session = session(&dir, r#"{"tool": "text_read", "params": "notes.txt"}"#).await;
    assert_eq!(
        session.run_action("show notes.txt").await.value(),
        Some(&json!("hello\n"))
    );
}

#[tokio::test]
async fn test_nested_path_object_is_unwrapped() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("notes.txt"), "hello\n").unwrap();

    let session = session(
        &dir,
        r#"{"tool": "text_read", "params": {"path": "{\"file_path\": \"notes.txt\"}"}}"#,
    )
    .await;
    assert_eq!(
        session.run_action("show notes").await.value(),
        Some(&json!("hello\n"))
    );
}

#[tokio::test]
async fn test_edit_with_string_line_number() {
    let dir = TempDir::new().unwrap();
    let notes = dir.path().join("notes.txt");
    fs::write(&notes, "a\nb\nc\n").unwrap();

    let session = session(
        &dir,
        r#"{"tool": "text_edit", "params": {"path": "notes.txt", "line_number": "0", "new_text": "A"}}"#,
    )
    .await;
    let envelope = session.run_action("capitalize the first line").await;
    assert_eq!(envelope.value().unwrap()["line_number"], json!(0));
    assert_eq!(fs::read_to_string(&notes).unwrap(), "A\nb\nc\n");
}

#[tokio::test]
async fn test_edit_out_of_range_reports_and_leaves_file() {
    let dir = TempDir::new().unwrap();
    let notes = dir.path().join("notes.txt");
    fs::write(&notes, "only\n").unwrap();

    let session = session(
        &dir,
        r#"{"tool": "text_edit", "params": {"path": "notes.txt", "line_number": 7, "new_text": "x"}}"#,
    )
    .await;

    match session.run_action("edit line 7").await {
        ResultEnvelope::Failure { kind, message, .. } => {
            assert_eq!(kind, ErrorKind::ExecutionError);
            assert!(message.contains("out of range"), "{}", message);
        }
        other => panic!("expected failure, got {:?}", other),
    }
    assert_eq!(fs::read_to_string(&notes).unwrap(), "only\n");
}

// ── Failures before dispatch ─────────────────────────────────────────────────

#[tokio::test]
async fn test_empty_required_value_is_missing() {
    let dir = TempDir::new().unwrap();
    let session = session(
        &dir,
        r#"{"tool": "text_append", "params": {"path": "notes.txt", "text": "   "}}"#,
    )
    .await;

    assert_eq!(
        session.run_action("append nothing").await.kind(),
        Some(ErrorKind::MissingRequiredArgument)
    );
    assert!(!dir.path().join("notes.txt").exists());
}

#[tokio::test]
async fn test_prose_without_json_is_malformed() {
    let dir = TempDir::new().unwrap();
    let session = session(&dir, "I think you should open the file yourself.").await;

    let envelope = session.run_action("read my notes").await;
    assert_eq!(envelope.kind(), Some(ErrorKind::MalformedAction));
    let json = serde_json::to_value(&envelope).unwrap();
    assert_eq!(json["status"], "failure");
    assert_eq!(json["raw_response"], "I think you should open the file yourself.");
}

#[tokio::test]
async fn test_direct_call_with_bare_path() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("notes.txt"), "direct\n").unwrap();
    let session = session(&dir, "").await;

    let envelope = session.call("text_read", json!("notes.txt")).await;
    assert_eq!(envelope.value(), Some(&json!("direct\n")));
}
