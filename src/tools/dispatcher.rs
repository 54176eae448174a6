// Dispatcher - runs a normalized action exactly once
//
// The registry check happens before anything reaches the collaborator.
// There is no retry: file-mutating tools are not assumed to be idempotent.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, instrument};

use crate::errors::{ActionError, CollaboratorError};
use crate::tools::collaborator::ToolCollaborator;
use crate::tools::registry::ToolRegistry;
use crate::tools::types::{NormalizedAction, ResultEnvelope};

pub struct Dispatcher {
    registry: Arc<ToolRegistry>,
    collaborator: Arc<dyn ToolCollaborator>,
    call_timeout: Option<Duration>,
}

impl Dispatcher {
    pub fn new(registry: Arc<ToolRegistry>, collaborator: Arc<dyn ToolCollaborator>) -> Self {
        Self {
            registry,
            collaborator,
            call_timeout: None,
        }
    }

    /// Bound each tool call. A call that hits the bound is reported as
    /// `CollaboratorTimeout` and is not retried.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = Some(timeout);
        self
    }

    /// Execute one action. Never returns an error: every failure is folded
    /// into the envelope.
    #[instrument(skip(self, action), fields(tool = %action.tool_name(), id = %action.id()))]
    pub async fn dispatch(&self, action: NormalizedAction) -> ResultEnvelope {
        self.try_dispatch(action).await.into()
    }

    async fn try_dispatch(&self, action: NormalizedAction) -> Result<serde_json::Value, ActionError> {
        let tool = action.tool_name();

        if !self.registry.contains(tool) {
            error!("Refusing to dispatch unregistered tool '{}'", tool);
            return Err(ActionError::UnknownTool(tool.to_string()));
        }

        info!("Calling tool {} with {}", tool, serde_json::Value::Object(action.arguments().clone()));
        let started = Instant::now();

        let call = self.collaborator.call_tool(tool, action.arguments());
        let outcome = match self.call_timeout {
            Some(limit) => match tokio::time::timeout(limit, call).await {
                Ok(result) => result,
                Err(_) => Err(CollaboratorError::Timeout(limit)),
            },
            None => call.await,
        };

        let elapsed = started.elapsed();
        match outcome {
            Ok(value) => {
                info!("Tool {} succeeded in {:?}", tool, elapsed);
                Ok(value)
            }
            Err(CollaboratorError::Timeout(limit)) => {
                error!("Tool {} timed out after {:?}", tool, limit);
                Err(ActionError::CollaboratorTimeout {
                    collaborator: self.collaborator.name().to_string(),
                    elapsed: limit,
                })
            }
            Err(e) => {
                error!("Tool {} failed after {:?}: {}", tool, elapsed, e);
                Err(ActionError::ExecutionError {
                    tool: tool.to_string(),
                    message: e.to_string(),
                })
            }
        }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use crate::tools::normalizer::ArgumentNormalizer;
    use crate::tools::types::{RawAction, ToolDefinition, ToolInputSchema};
    use async_trait::async_trait;
    use serde_json::{json, Map, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};

    // Mock collaborator for testing
    struct MockCollaborator {
        calls: AtomicUsize,
        behavior: Behavior,
    }

    enum Behavior {
        Echo,
        Fail,
        Hang,
        TransportTimeout,
    }

    #[async_trait]
    impl ToolCollaborator for MockCollaborator {
        fn name(&self) -> &str {
            "mock"
        }

        async fn list_tools(&self) -> Result<Vec<ToolDefinition>, CollaboratorError> {
            Ok(Vec::new())
        }

        async fn call_tool(
            &self,
            tool_name: &str,
            arguments: &Map<String, Value>,
        ) -> Result<Value, CollaboratorError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.behavior {
                Behavior::Echo => Ok(json!({"tool": tool_name, "args": arguments})),
                Behavior::Fail => Err(CollaboratorError::Rejected(
                    "line_number out of range".to_string(),
                )),
                Behavior::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok(Value::Null)
                }
                Behavior::TransportTimeout => {
                    Err(CollaboratorError::Timeout(Duration::from_secs(30)))
                }
            }
        }
    }

    fn registry() -> Arc<ToolRegistry> {
        Arc::new(ToolRegistry::from_definitions(vec![ToolDefinition {
            name: "text_read".to_string(),
            description: Some("Reads a text file".to_string()),
            input_schema: ToolInputSchema::from_params(&[("path", "string", "", true)]),
        }]))
    }

    fn setup(behavior: Behavior) -> (Dispatcher, Arc<MockCollaborator>) {
        let mock = Arc::new(MockCollaborator {
            calls: AtomicUsize::new(0),
            behavior,
        });
        (Dispatcher::new(registry(), mock.clone()), mock)
    }

    fn action(registry: &ToolRegistry, tool: &str) -> NormalizedAction {
        let descriptor = registry.get("text_read").unwrap();
        ArgumentNormalizer::default()
            .normalize(RawAction::new("text_read", json!({"path": "a.txt"})), descriptor)
            .map(|a| {
                if tool == "text_read" {
                    a
                } else {
                    NormalizedAction::new(tool.to_string(), a.arguments().clone())
                }
            })
            .unwrap()
    }

    #[tokio::test]
    async fn test_dispatch_success_calls_once() {
        let (dispatcher, mock) = setup(Behavior::Echo);
        let result = dispatcher.dispatch(action(dispatcher.registry(), "text_read")).await;

        assert!(result.is_success());
        assert_eq!(result.value().unwrap()["args"]["path"], json!("a.txt"));
        assert_eq!(mock.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_dispatch_unknown_tool_never_calls() {
        let (dispatcher, mock) = setup(Behavior::Echo);
        let result = dispatcher.dispatch(action(dispatcher.registry(), "rm_rf")).await;

        assert_eq!(result.kind(), Some(ErrorKind::UnknownTool));
        assert_eq!(mock.calls.load(Ordering::SeqCst), 0);
        assert_eq!(dispatcher.registry().names(), vec!["text_read"]);
    }

    #[tokio::test]
    async fn test_dispatch_failure_is_contained() {
        let (dispatcher, mock) = setup(Behavior::Fail);
        let result = dispatcher.dispatch(action(dispatcher.registry(), "text_read")).await;

        assert_eq!(result.kind(), Some(ErrorKind::ExecutionError));
        match result {
            ResultEnvelope::Failure { message, .. } => {
                assert!(message.contains("line_number out of range"))
            }
            _ => panic!("expected failure"),
        }
        // No retry after a failure
        assert_eq!(mock.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispatch_timeout_is_collaborator_timeout() {
        let (dispatcher, mock) = setup(Behavior::Hang);
        let dispatcher = dispatcher.with_timeout(Duration::from_secs(5));
        let result = dispatcher.dispatch(action(dispatcher.registry(), "text_read")).await;

        assert_eq!(result.kind(), Some(ErrorKind::CollaboratorTimeout));
        assert_eq!(mock.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_transport_timeout_is_collaborator_timeout() {
        let (dispatcher, _mock) = setup(Behavior::TransportTimeout);
        let result = dispatcher.dispatch(action(dispatcher.registry(), "text_read")).await;
        assert_eq!(result.kind(), Some(ErrorKind::CollaboratorTimeout));
    }

    #[tokio::test]
    async fn test_concurrent_dispatches_call_once_each() {
        let (dispatcher, mock) = setup(Behavior::Echo);
        let dispatcher = Arc::new(dispatcher);

        let mut handles = Vec::new();
        for _ in 0..8 {
            let d = Arc::clone(&dispatcher);
            handles.push(tokio::spawn(async move {
                let a = action(d.registry(), "text_read");
                d.dispatch(a).await
            }));
        }
        for h in handles {
            assert!(h.await.unwrap().is_success());
        }
        assert_eq!(mock.calls.load(Ordering::SeqCst), 8);
    }
}
