use clap::{CommandFactory, Parser, Subcommand, ValueEnum, ValueHint};
use iidm_io::{IidmVersion, TopologyLevel, TreeDataFormat};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "iidm", author, version, about, long_about = None)]
pub struct Cli {
    /// Set the logging level
    #[arg(long, default_value = "info")]
    pub log_level: tracing::Level,

    /// Configuration file (defaults to ~/.iidm/config.toml when present)
    #[arg(long, global = true, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Convert a document to another version, encoding or topology level
    Convert(ConvertArgs),
    /// Check documents against the element rules of their declared version
    Validate {
        /// Documents to validate
        #[arg(required = true, value_hint = ValueHint::FilePath)]
        inputs: Vec<PathBuf>,
    },
    /// List the supported format versions and their namespaces
    Versions,
    /// Write one of the built-in sample networks
    Demo {
        /// Sample network to write
        #[arg(long, value_enum, default_value_t = DemoNetwork::TwoSubstations)]
        network: DemoNetwork,
        /// Output file; the encoding follows its extension
        #[arg(value_hint = ValueHint::FilePath)]
        output: PathBuf,
        /// Target format version
        #[arg(long)]
        version: Option<IidmVersion>,
    },
}

#[derive(clap::Args, Debug)]
pub struct ConvertArgs {
    /// Input document (.xiidm, .iidm, .xml, .jiidm, .json)
    #[arg(value_hint = ValueHint::FilePath)]
    pub input: PathBuf,
    /// Output document; the encoding follows its extension unless --format is given
    #[arg(value_hint = ValueHint::FilePath)]
    pub output: PathBuf,
    /// Target format version (e.g. 1.8)
    #[arg(long)]
    pub version: Option<IidmVersion>,
    /// Output encoding (xml, json)
    #[arg(long)]
    pub format: Option<TreeDataFormat>,
    /// Topological detail of the export (NODE_BREAKER, BUS_BREAKER, BUS_BRANCH)
    #[arg(long)]
    pub topology_level: Option<TopologyLevel>,
    /// Replace identifiers by tokens and write <basename>_mapping.csv next to the output
    #[arg(long)]
    pub anonymized: bool,
    /// Only export the main connected component
    #[arg(long)]
    pub main_component: bool,
    /// Order identifiables, extensions and limits deterministically
    #[arg(long)]
    pub sorted: bool,
    /// Write without indentation
    #[arg(long)]
    pub no_indent: bool,
    /// Drop every extension on import and export
    #[arg(long)]
    pub skip_extensions: bool,
    /// Fail on extensions without a registered serializer instead of skipping them
    #[arg(long)]
    pub strict_extensions: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum DemoNetwork {
    TwoSubstations,
    NodeBreaker,
    TieLineHvdc,
    ThreeWindings,
}

pub fn build_cli_command() -> clap::Command {
    Cli::command()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli_definition() {
        build_cli_command().debug_assert();
    }

    #[test]
    fn parses_typed_convert_flags() {
        let cli = Cli::parse_from([
            "iidm",
            "convert",
            "in.xiidm",
            "out.xiidm",
            "--version",
            "1.4",
            "--format",
            "json",
            "--topology-level",
            "bus_branch",
        ]);
        let Commands::Convert(args) = cli.command else {
            panic!("expected convert");
        };
        assert_eq!(args.version, Some(IidmVersion::V_1_4));
        assert_eq!(args.format, Some(TreeDataFormat::Json));
        assert_eq!(args.topology_level, Some(TopologyLevel::BusBranch));
    }
}
