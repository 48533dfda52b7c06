use anyhow::{bail, Context, Result};
use tracing::info;

use iidm_cli::{ConvertArgs, IidmConfig};
use iidm_io::{read_from_path, write_to_path, ExportOptions, ImportOptions, TreeDataFormat};

pub fn handle(args: &ConvertArgs, config: &IidmConfig) -> Result<()> {
    if !args.input.exists() {
        bail!("Input '{}' does not exist", args.input.display());
    }
    let network = read_from_path(&args.input, &import_options(args, config))
        .with_context(|| format!("reading {}", args.input.display()))?;
    info!(network = %network.identity.id, stats = %network.stats(), "network loaded");

    let options = export_options(args, config);
    write_to_path(&network, &args.output, &options)
        .with_context(|| format!("writing {}", args.output.display()))?;
    println!(
        "Converted {} -> {} (IIDM {}, {:?}, {})",
        args.input.display(),
        args.output.display(),
        options.version,
        options.format,
        options.topology_level
    );
    Ok(())
}

fn import_options(args: &ConvertArgs, config: &IidmConfig) -> ImportOptions {
    let mut options = config.import.clone();
    if args.skip_extensions {
        options.skip_extensions = true;
    }
    if args.strict_extensions {
        options.throw_if_extension_not_found = true;
    }
    options
}

/// Configuration file values overridden by command-line flags.
fn export_options(args: &ConvertArgs, config: &IidmConfig) -> ExportOptions {
    let mut options = config.export.clone();
    if let Some(version) = args.version {
        options.version = version;
    }
    if let Some(format) = args.format.or_else(|| TreeDataFormat::detect(&args.output)) {
        options.format = format;
    }
    if let Some(level) = args.topology_level {
        options.topology_level = level;
    }
    options.anonymized |= args.anonymized;
    options.only_main_connected_component |= args.main_component;
    options.sorted |= args.sorted;
    options.skip_extensions |= args.skip_extensions;
    options.throw_if_extension_not_found |= args.strict_extensions;
    if args.no_indent {
        options.indent = false;
    }
    options
}
