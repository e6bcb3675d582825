use clap::Parser;
use sm_composer::app::{handle_fatal_error, init_logging, AppConfig};
use sm_composer::cli::{execute_command, Cli};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let verbose = cli.verbose;

    init_logging(&AppConfig::new(verbose));

    if let Err(e) = execute_command(cli.command).await {
        handle_fatal_error(e, verbose);
    }
}
