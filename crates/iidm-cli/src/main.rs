use clap::Parser;
use tracing::error;
use tracing_subscriber::FmtSubscriber;

use iidm_cli::{Cli, Commands, IidmConfig};

mod commands;

fn main() {
    let cli = Cli::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(cli.log_level)
        .with_writer(std::io::stderr)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("failed to install log subscriber: {e}");
    }

    if let Err(e) = run(&cli) {
        error!("{e:#}");
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let config = IidmConfig::load(cli.config.as_deref())?;
    match &cli.command {
        Commands::Convert(args) => commands::convert::handle(args, &config),
        Commands::Validate { inputs } => commands::validate::handle(inputs),
        Commands::Versions => commands::versions::handle(),
        Commands::Demo {
            network,
            output,
            version,
        } => commands::demo::handle(*network, output, *version, &config),
    }
}
