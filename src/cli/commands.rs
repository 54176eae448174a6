use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Natural-language access to local CSV and text files through a local model
#[derive(Parser, Debug)]
#[command(
    name = "localdata",
    version,
    about = "Ask a local model to read, append to, edit and summarize your CSV and text files",
    long_about = "localdata sends your request and the tool catalog to a local Ollama model, \
                  decodes the single action it proposes, repairs and validates the arguments, \
                  and runs the tool exactly once, either on an MCP tool server or in-process."
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, value_name = "PATH", help = "Config file (default: ~/.localdata/config.toml)")]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, help = "Run tools in-process instead of on the MCP server")]
    pub local: bool,

    #[arg(short = 'v', long, global = true, help = "Enable debug logging")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Print the result envelope as JSON")]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(
        about = "Run a natural-language request through the model and dispatch one tool call",
        long_about = "Examples:\n  \
                      localdata run \"what is the total of the amount column in sales.csv\"\n  \
                      localdata run \"add 'buy milk' to my notes file\" --json"
    )]
    Run(RunArgs),

    #[command(about = "List the tools the collaborator exposes")]
    Tools,

    #[command(
        about = "Normalize and dispatch a tool call directly, without the model",
        long_about = "ARGS is a JSON object; anything that is not valid JSON is passed as a bare \
                      string and goes through the same repair rules as model output.\n\n\
                      Examples:\n  \
                      localdata call ping '{\"name\": \"bob\"}'\n  \
                      localdata call text_read notes.txt"
    )]
    Call(CallArgs),

    #[command(about = "Ask the model to describe the available tools")]
    Explain,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    #[arg(value_name = "QUERY", help = "What you want done")]
    pub query: String,
}

#[derive(Args, Debug)]
pub struct CallArgs {
    #[arg(value_name = "TOOL")]
    pub tool: String,

    #[arg(value_name = "ARGS", help = "Arguments as JSON (default: {})")]
    pub arguments: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run_with_globals() {
        let args = CliArgs::parse_from(["localdata", "run", "sum the amount column", "--local", "-v"]);
        assert!(args.local);
        assert!(args.verbose);
        match args.command {
            Commands::Run(run) => assert_eq!(run.query, "sum the amount column"),
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_call_without_arguments() {
        let args = CliArgs::parse_from(["localdata", "--config", "/tmp/c.toml", "call", "ping"]);
        assert_eq!(args.config, Some(PathBuf::from("/tmp/c.toml")));
        match args.command {
            Commands::Call(call) => {
                assert_eq!(call.tool, "ping");
                assert!(call.arguments.is_none());
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_cli_definition_is_consistent() {
        use clap::CommandFactory;
        CliArgs::command().debug_assert();
    }
}
