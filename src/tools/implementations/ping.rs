// Ping tool - checks the tool side is responsive

use crate::tools::local::{str_arg, Tool, ToolContext};
use crate::tools::types::ToolInputSchema;
use anyhow::Result;
use async_trait::async_trait;
use serde_json::{Map, Value};

pub struct PingTool;

#[async_trait]
impl Tool for PingTool {
    fn name(&self) -> &str {
        "ping"
    }

    fn description(&self) -> &str {
        "A simple ping tool to check server responsiveness."
    }

    fn input_schema(&self) -> ToolInputSchema {
        ToolInputSchema::from_params(&[("name", "string", "Who is pinging", true)])
    }

    async fn execute(&self, input: &Map<String, Value>, _context: &ToolContext) -> Result<Value> {
        let name = str_arg(input, "name")?;
        Ok(Value::String(format!("pong,{}!", name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_ping_replies_with_name() {
        let input = json!({"name": "agent"});
        let out = PingTool
            .execute(input.as_object().unwrap(), &ToolContext::default())
            .await
            .unwrap();
        assert_eq!(out, json!("pong,agent!"));
    }

    #[tokio::test]
    async fn test_ping_requires_name() {
        let result = PingTool.execute(&Map::new(), &ToolContext::default()).await;
        assert!(result.is_err());
    }
}
