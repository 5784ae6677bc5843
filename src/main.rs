//! udp-qa-agent CLI entry point.

use clap::Parser;

use udp_qa_agent::cli::{self, commands, Cli, Commands};
use udp_qa_agent::infrastructure::config::ConfigLoader;
use udp_qa_agent::infrastructure::logging::LoggerImpl;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match ConfigLoader::load_with(cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            cli::handle_error(&err, cli.json);
            std::process::exit(2);
        }
    };

    // Dropping the logger flushes the file appender.
    let _logger = match LoggerImpl::init(&config.logging) {
        Ok(logger) => Some(logger),
        Err(err) => {
            eprintln!("warning: logging disabled: {err:#}");
            None
        }
    };

    let result = match cli.command {
        Commands::Run(args) => commands::run::execute(args, config, cli.json).await,
        Commands::Catalog(args) => commands::catalog::execute(args, cli.json).await,
        Commands::Verify(args) => commands::verify::execute(args, config, cli.json).await,
    };

    match result {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(err) => {
            cli::handle_error(&err, cli.json);
            std::process::exit(1);
        }
    }
}
