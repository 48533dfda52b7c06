use std::path::Path;

use anyhow::{Context, Result};
use iidm_core::{fixtures, Network};
use iidm_io::{write_to_path, IidmVersion, TreeDataFormat};

use iidm_cli::{DemoNetwork, IidmConfig};

fn build(network: DemoNetwork) -> iidm_core::IidmResult<Network> {
    match network {
        DemoNetwork::TwoSubstations => fixtures::two_substations(),
        DemoNetwork::NodeBreaker => fixtures::node_breaker(),
        DemoNetwork::TieLineHvdc => fixtures::with_tie_line_and_hvdc(),
        DemoNetwork::ThreeWindings => fixtures::three_windings_transformer(),
    }
}

pub fn handle(network: DemoNetwork, output: &Path, version: Option<IidmVersion>, config: &IidmConfig) -> Result<()> {
    let network = build(network).context("building sample network")?;
    let mut options = config.export.clone();
    if let Some(version) = version {
        options.version = version;
    }
    if let Some(format) = TreeDataFormat::detect(output) {
        options.format = format;
    }
    write_to_path(&network, output, &options).with_context(|| format!("writing {}", output.display()))?;
    println!("Wrote {} ({}) to {}", network.identity.id, network.stats(), output.display());
    Ok(())
}
