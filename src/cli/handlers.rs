// Subcommand handlers. Each returns the process exit code:
// 0 success, 1 request failure, 2 startup failure.

use serde_json::Value;

use super::commands::{CallArgs, CliArgs, Commands, RunArgs};
use crate::agent::AgentSession;
use crate::config::load_config;
use crate::errors::ActionError;
use crate::tools::types::ResultEnvelope;

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;
pub const EXIT_STARTUP: i32 = 2;

pub async fn handle(args: &CliArgs) -> i32 {
    let config = match load_config(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return EXIT_STARTUP;
        }
    };

    let session = match AgentSession::connect(&config, args.local).await {
        Ok(session) => session,
        Err(e) => {
            // An unreachable tool server is a request-level failure, not a
            // broken installation
            if let Some(action_err) = e.downcast_ref::<ActionError>() {
                let envelope = ResultEnvelope::failure(action_err.kind(), action_err.to_string());
                print_envelope(&envelope, args.json);
                return EXIT_FAILURE;
            }
            eprintln!("Error: {:#}", e);
            return EXIT_STARTUP;
        }
    };

    match &args.command {
        Commands::Run(run) => handle_run(&session, run, args.json).await,
        Commands::Tools => handle_tools(&session, args.json),
        Commands::Call(call) => handle_call(&session, call, args.json).await,
        Commands::Explain => finish(&session.explain_tools().await, args.json),
    }
}

async fn handle_run(session: &AgentSession, args: &RunArgs, json: bool) -> i32 {
    let envelope = session.run_action(&args.query).await;
    finish(&envelope, json)
}

fn handle_tools(session: &AgentSession, json: bool) -> i32 {
    let registry = session.registry();
    if json {
        let listing: Vec<Value> = registry
            .iter()
            .map(|t| {
                serde_json::json!({
                    "name": t.name(),
                    "description": t.description(),
                    "parameters": t.parameter_names(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&listing).unwrap_or_default());
        return EXIT_SUCCESS;
    }

    println!("{}", registry.catalog_prompt());
    for tool in registry.iter().filter(|t| !t.description().is_empty()) {
        println!("  {}: {}", tool.name(), tool.description());
    }
    EXIT_SUCCESS
}

async fn handle_call(session: &AgentSession, args: &CallArgs, json: bool) -> i32 {
    let arguments = parse_call_arguments(args.arguments.as_deref());
    let envelope = session.call(&args.tool, arguments).await;
    finish(&envelope, json)
}

/// JSON when it parses, otherwise the bare string
fn parse_call_arguments(text: Option<&str>) -> Value {
    match text {
        None => Value::Object(Default::default()),
        Some(text) => {
            serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
        }
    }
}

fn finish(envelope: &ResultEnvelope, json: bool) -> i32 {
    print_envelope(envelope, json);
    if envelope.is_success() {
        EXIT_SUCCESS
    } else {
        EXIT_FAILURE
    }
}

fn print_envelope(envelope: &ResultEnvelope, json: bool) {
    if json {
        match serde_json::to_string_pretty(envelope) {
            Ok(text) => println!("{}", text),
            Err(e) => eprintln!("Error: failed to serialize result: {}", e),
        }
        return;
    }

    match envelope {
        ResultEnvelope::Success { value: Value::String(text) } => println!("{}", text),
        ResultEnvelope::Success { value } => {
            println!("{}", serde_json::to_string_pretty(value).unwrap_or_default())
        }
        ResultEnvelope::Failure {
            kind,
            message,
            raw_response,
        } => {
            eprintln!("Error [{}]: {}", kind, message);
            if let Some(raw) = raw_response {
                eprintln!("Model reply was:\n{}", raw);
            }
        }
    }
}
