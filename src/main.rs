// localdata - natural-language tool calls over local CSV and text files
// Main entry point

use clap::Parser;
use tracing::debug;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use localdata::cli::{handle, CliArgs};

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();
    init_logging(args.verbose);

    debug!("localdata v{} starting", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    let exit_code = handle(&args).await;
    std::process::exit(exit_code);
}

/// RUST_LOG wins when set; otherwise info, or debug with -v
fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "localdata={},reqwest=warn,hyper=warn",
            default_level
        ))
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();
}
