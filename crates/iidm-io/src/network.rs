//! Document driver: one full write or read pass over a network.
//!
//! # Write pass
//!
//! 1. Extension names found on the network are resolved to codecs; a namespace collision
//!    aborts before any byte is produced.
//! 2. The root carries `id`, `caseDate`, `forecastDistance`, `sourceFormat` and, from 1.7,
//!    `minimumValidationLevel`.
//! 3. Children follow in a fixed order: voltage levels outside substations, substations,
//!    network-level transformers, lines, tie lines, HVDC lines, then one `extension` element
//!    per exported identifiable carrying extensions.
//!
//! # Read pass
//!
//! The version comes from the root namespace (XML) or the `version` member (JSON).
//! Deferred references are resolved right before the first `extension` element, so
//! extension owners exist, and once more at the end of the document.
//!
//! # Files
//!
//! [`write_to_path`] and [`read_from_path`] work on a single file and its anonymization
//! side file `<basename>_mapping.csv`. [`DataSource`] addresses the same pair as a
//! directory and a basename. Each entry point has a `_with_registry` variant for codecs
//! registered beyond the built-in ones.

use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat};
use iidm_core::{Extension, IidmError, IidmResult, Network, ValidationLevel};
use tracing::{debug, info, warn};

use crate::anonymizer::{Anonymizer, SimpleAnonymizer};
use crate::codec::{
    branch, hvdc, ordered, read_contained_elements, read_identity, substation, tie_line, voltage_level,
    write_identifiable,
};
use crate::context::{ReaderContext, WriterContext};
use crate::extensions::{ExtensionRegistry, ExtensionSerDe, IIDM_PREFIX};
use crate::gating::{GateViolation, MINIMUM_VALIDATION_LEVEL, NETWORK_VOLTAGE_LEVEL};
use crate::options::{ExportOptions, ImportOptions};
use crate::tree::{self, RootNode, TreeDataFormat};
use crate::version::IidmVersion;

pub(crate) const NETWORK: &str = "network";
const EXTENSION: &str = "extension";
const MAPPING_SUFFIX: &str = "_mapping.csv";
/// Main file extensions, probed in this order.
const EXTENSIONS: [(&str, TreeDataFormat); 5] = [
    ("xiidm", TreeDataFormat::Xml),
    ("iidm", TreeDataFormat::Xml),
    ("xml", TreeDataFormat::Xml),
    ("jiidm", TreeDataFormat::Json),
    ("json", TreeDataFormat::Json),
];

/// Write `network` with the built-in extension codecs. Returns the anonymizer used, whose
/// mapping must be kept to read an anonymized document back.
pub fn write<W: Write>(network: &Network, options: &ExportOptions, out: W) -> IidmResult<Anonymizer> {
    write_with_registry(network, options, &ExtensionRegistry::default(), out)
}

pub fn write_with_registry<W: Write>(
    network: &Network,
    options: &ExportOptions,
    registry: &ExtensionRegistry,
    out: W,
) -> IidmResult<Anonymizer> {
    let version = options.version;
    let valid = network.validation_level == ValidationLevel::SteadyStateHypothesis;
    if !valid && !version.supports_equipment_validation_level() {
        return Err(MINIMUM_VALIDATION_LEVEL.error(version, GateViolation::NotSupported));
    }
    let serializers = resolve_extensions(network, options, registry)?;
    debug!(
        network = %network.identity.id,
        %version,
        format = ?options.format,
        extensions = serializers.len(),
        "writing network"
    );

    let anonymizer = if options.anonymized {
        Anonymizer::Simple(SimpleAnonymizer::new())
    } else {
        Anonymizer::default()
    };
    let writer = tree::writer(options.format, out, options.indent, version);
    let mut ctx = WriterContext::new(network, options, registry, writer, anonymizer)?;
    let namespace = ctx.namespace.clone();
    ctx.writer.declare_namespace(IIDM_PREFIX, &namespace);
    for serde in &serializers {
        ctx.writer.declare_namespace(serde.namespace_prefix(), serde.namespace_uri());
    }

    write_identifiable(
        &mut ctx,
        NETWORK,
        &network.identity,
        |ctx| {
            ctx.writer.write_string_attribute(
                "caseDate",
                &network.case_date.to_rfc3339_opts(SecondsFormat::Millis, false),
            )?;
            ctx.writer.write_int_attribute("forecastDistance", network.forecast_distance)?;
            ctx.writer.write_string_attribute("sourceFormat", &network.source_format)?;
            MINIMUM_VALIDATION_LEVEL.write_str(
                ctx.writer.as_mut(),
                ctx.version,
                version
                    .supports_equipment_validation_level()
                    .then(|| network.validation_level.as_str()),
            )
        },
        |ctx| {
            write_network_voltage_levels(ctx)?;
            for sub in ordered(ctx, network.substations().iter()) {
                if substation::is_exported(ctx, sub) {
                    substation::write(ctx, sub)?;
                }
            }
            branch::write_transformers(ctx, None)?;
            branch::write_lines(ctx)?;
            tie_line::write_tie_lines(ctx)?;
            hvdc::write_hvdc_lines(ctx)?;
            write_extensions(ctx, &serializers)
        },
    )?;
    ctx.writer.finish()?;
    debug!(exported = ctx.exported().len(), "network written");
    Ok(ctx.anonymizer)
}

/// Codecs of the extensions to write, after namespace collision checks.
fn resolve_extensions<'r>(
    network: &Network,
    options: &ExportOptions,
    registry: &'r ExtensionRegistry,
) -> IidmResult<Vec<&'r dyn ExtensionSerDe>> {
    let names: BTreeSet<&str> = network
        .identities()
        .into_iter()
        .flat_map(|identity| identity.extensions.iter())
        .map(|extension| extension.name.as_str())
        .filter(|name| options.includes_extension(name))
        .collect();
    let (serializers, missing) = registry.resolve(names)?;
    if !missing.is_empty() {
        if options.throw_if_extension_not_found {
            return Err(IidmError::MissingExtensionSerializer(missing.into_iter().collect()));
        }
        warn!(?missing, "extensions without serializer are not written");
    }
    Ok(serializers)
}

fn write_network_voltage_levels(ctx: &mut WriterContext<'_>) -> IidmResult<()> {
    let network = ctx.network;
    let voltage_levels: Vec<_> = ordered(
        ctx,
        network.voltage_levels().iter().filter(|vl| vl.substation_id.is_none()),
    )
    .into_iter()
    .filter(|vl| ctx.filter.test_voltage_level(&ctx.views, &vl.identity.id))
    .collect();
    if voltage_levels.is_empty() {
        return Ok(());
    }
    NETWORK_VOLTAGE_LEVEL.check(ctx.version)?;
    for vl in voltage_levels {
        voltage_level::write(ctx, vl)?;
    }
    Ok(())
}

fn write_extensions(ctx: &mut WriterContext<'_>, serializers: &[&dyn ExtensionSerDe]) -> IidmResult<()> {
    if serializers.is_empty() {
        return Ok(());
    }
    let network = ctx.network;
    // the network element itself is only marked exported once it is closed
    let mut ids: Vec<String> = ctx.exported().to_vec();
    if ctx.options.sorted {
        ids.sort();
    }
    ids.insert(0, network.identity.id.clone());

    for id in ids {
        let Some(identity) = network.identity_of(&id) else {
            continue;
        };
        let mut extensions: Vec<(&Extension, &dyn ExtensionSerDe)> = identity
            .extensions
            .iter()
            .filter(|extension| ctx.options.includes_extension(&extension.name))
            .filter_map(|extension| {
                serializers
                    .iter()
                    .find(|serde| serde.name() == extension.name)
                    .map(|serde| (extension, *serde))
            })
            .collect();
        if extensions.is_empty() {
            continue;
        }
        if ctx.options.sorted {
            extensions.sort_by(|a, b| a.0.name.cmp(&b.0.name));
        }
        ctx.start(EXTENSION)?;
        ctx.write_id("id", &id)?;
        for (extension, serde) in extensions {
            ctx.writer.write_start_node(serde.namespace_uri(), serde.name())?;
            serde.write(extension, ctx.writer.as_mut())?;
            ctx.writer.write_end_node()?;
        }
        ctx.end()?;
    }
    Ok(())
}

/// Version of a document and whether it uses the equipment-only namespace.
pub(crate) fn document_version(root: &RootNode) -> IidmResult<(IidmVersion, bool)> {
    if let Some(namespace) = &root.namespace {
        return IidmVersion::from_namespace_uri(namespace);
    }
    match &root.version {
        Some(raw) => Ok((raw.parse()?, false)),
        None => Err(IidmError::Parse("document declares no IIDM version".into())),
    }
}

/// Read a network with the built-in extension codecs and no anonymization.
pub fn read<R: BufRead>(input: R, format: TreeDataFormat, options: &ImportOptions) -> IidmResult<Network> {
    read_with(input, format, options, &ExtensionRegistry::default(), Anonymizer::default())
}

pub fn read_with<R: BufRead>(
    input: R,
    format: TreeDataFormat,
    options: &ImportOptions,
    registry: &ExtensionRegistry,
    anonymizer: Anonymizer,
) -> IidmResult<Network> {
    let mut reader = tree::reader(format, input)?;
    let root = reader.read_root()?;
    if root.name != NETWORK {
        return Err(IidmError::Parse(format!(
            "root element is '{}', expected '{NETWORK}'",
            root.name
        )));
    }
    let (version, equipment_namespace) = document_version(&root)?;
    debug!(%version, ?format, "reading network");
    let mut ctx = ReaderContext::new(reader, version, options, registry, anonymizer);

    let identity = read_identity(&ctx, NETWORK)?;
    let source_format = ctx.reader.read_required_string("sourceFormat")?;
    let raw_date = ctx.reader.read_required_string("caseDate")?;
    let case_date = DateTime::parse_from_rfc3339(raw_date.trim())
        .map_err(|e| IidmError::Parse(format!("invalid caseDate '{raw_date}': {e}")))?;
    let mut network = Network::new(identity.id.clone(), source_format).with_case_date(case_date);
    network.identity = identity;
    network.forecast_distance = ctx.reader.read_int("forecastDistance")?.unwrap_or(0);
    network.validation_level = match MINIMUM_VALIDATION_LEVEL.read_str(ctx.reader(), version) {
        Some(level) => level.parse()?,
        None if equipment_namespace => ValidationLevel::Equipment,
        None => ValidationLevel::SteadyStateHypothesis,
    };

    let id = network.identity.id.clone();
    let mut extensions_started = false;
    let mut skipped = BTreeSet::new();
    read_contained_elements(&mut ctx, NETWORK, &id, &mut network, |ctx, child, network| {
        match child {
            substation::SUBSTATION => substation::read(ctx, network)?,
            voltage_level::VOLTAGE_LEVEL => {
                NETWORK_VOLTAGE_LEVEL.check(ctx.version)?;
                voltage_level::read(ctx, None, network)?;
            }
            branch::LINE => branch::read_line(ctx, network)?,
            tie_line::TIE_LINE => tie_line::read(ctx, network)?,
            hvdc::HVDC_LINE => hvdc::read(ctx, network)?,
            EXTENSION => {
                if !extensions_started {
                    ctx.deferred.drain(network)?;
                    extensions_started = true;
                }
                read_extension(ctx, network, &mut skipped)?;
            }
            other => return branch::read_transformer(ctx, other, None, network),
        }
        Ok(true)
    })?;
    ctx.deferred.drain(&mut network)?;
    if !skipped.is_empty() {
        warn!(?skipped, "extensions without serializer were skipped");
    }
    debug!(network = %network.identity.id, stats = %network.stats(), "network read");
    Ok(network)
}

fn read_extension(ctx: &mut ReaderContext<'_>, network: &mut Network, skipped: &mut BTreeSet<String>) -> IidmResult<()> {
    let id = ctx.read_id("id")?;
    let registry = ctx.extensions;
    while let Some(name) = ctx.reader.next_child()? {
        if !ctx.options.includes_extension(&name) {
            debug!(extension = %name, owner = %id, "extension excluded from import");
            ctx.reader.skip_node()?;
            continue;
        }
        let Some(serde) = registry.find(&name) else {
            if ctx.options.throw_if_extension_not_found {
                return Err(IidmError::MissingExtensionSerializer(vec![name]));
            }
            ctx.reader.skip_node()?;
            skipped.insert(name);
            continue;
        };
        let extension = serde.read(ctx.reader.as_mut())?;
        network
            .identity_of_mut(&id)
            .ok_or_else(|| IidmError::DanglingReference(id.clone()))?
            .add_extension(extension);
    }
    Ok(())
}

/// Encoding of `path`: from its extension, otherwise from its first significant byte.
pub fn detect_format(path: &Path) -> IidmResult<TreeDataFormat> {
    if let Some(format) = TreeDataFormat::detect(path) {
        return Ok(format);
    }
    let mut head = [0u8; 256];
    let read = File::open(path)?.read(&mut head)?;
    let first = head[..read].iter().find(|b| !b.is_ascii_whitespace());
    Ok(match first {
        Some(b'{') => TreeDataFormat::Json,
        _ => TreeDataFormat::Xml,
    })
}

/// A main document and its side files, addressed by directory and basename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataSource {
    directory: PathBuf,
    basename: String,
}

impl DataSource {
    pub fn new(directory: impl Into<PathBuf>, basename: impl Into<String>) -> Self {
        Self {
            directory: directory.into(),
            basename: basename.into(),
        }
    }

    /// Data source whose main file is `path`.
    pub fn from_path(path: &Path) -> IidmResult<Self> {
        let basename = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .ok_or_else(|| IidmError::Config(format!("'{}' has no file name", path.display())))?;
        let directory = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Ok(Self::new(directory, basename))
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn basename(&self) -> &str {
        &self.basename
    }

    pub fn main_file(&self, format: TreeDataFormat) -> PathBuf {
        self.directory
            .join(format!("{}.{}", self.basename, format.extension()))
    }

    pub fn mapping_file(&self) -> PathBuf {
        self.directory.join(format!("{}{MAPPING_SUFFIX}", self.basename))
    }

    /// First existing main file, with its encoding.
    pub fn find_main_file(&self) -> Option<(PathBuf, TreeDataFormat)> {
        EXTENSIONS.iter().find_map(|(ext, format)| {
            let path = self.directory.join(format!("{}.{ext}", self.basename));
            path.is_file().then_some((path, *format))
        })
    }

    /// Anonymizer restored from the mapping side file, passthrough when there is none.
    fn load_anonymizer(&self) -> IidmResult<Anonymizer> {
        let mapping = self.mapping_file();
        if !mapping.is_file() {
            return Ok(Anonymizer::default());
        }
        info!(mapping = %mapping.display(), "loading anonymization mapping");
        let simple = SimpleAnonymizer::read_mapping(BufReader::new(File::open(&mapping)?))?;
        Ok(Anonymizer::Simple(simple))
    }
}

/// Export `network` into `data_source`. Returns the main file written.
pub fn export(network: &Network, data_source: &DataSource, options: &ExportOptions) -> IidmResult<PathBuf> {
    export_with_registry(network, data_source, options, &ExtensionRegistry::default())
}

pub fn export_with_registry(
    network: &Network,
    data_source: &DataSource,
    options: &ExportOptions,
    registry: &ExtensionRegistry,
) -> IidmResult<PathBuf> {
    let path = data_source.main_file(options.format);
    write_file(network, &path, data_source, options, registry)?;
    Ok(path)
}

/// Import the first main file found in `data_source`.
pub fn import(data_source: &DataSource, options: &ImportOptions) -> IidmResult<Network> {
    import_with_registry(data_source, options, &ExtensionRegistry::default())
}

pub fn import_with_registry(
    data_source: &DataSource,
    options: &ImportOptions,
    registry: &ExtensionRegistry,
) -> IidmResult<Network> {
    let (path, detected) = data_source.find_main_file().ok_or_else(|| {
        IidmError::Config(format!(
            "no IIDM document named '{}' in '{}'",
            data_source.basename(),
            data_source.directory().display()
        ))
    })?;
    read_file(&path, options.format.unwrap_or(detected), data_source, options, registry)
}

/// Write `network` to `path`, plus `<basename>_mapping.csv` next to it when anonymized.
pub fn write_to_path(network: &Network, path: impl AsRef<Path>, options: &ExportOptions) -> IidmResult<()> {
    write_to_path_with_registry(network, path, options, &ExtensionRegistry::default())
}

pub fn write_to_path_with_registry(
    network: &Network,
    path: impl AsRef<Path>,
    options: &ExportOptions,
    registry: &ExtensionRegistry,
) -> IidmResult<()> {
    let path = path.as_ref();
    write_file(network, path, &DataSource::from_path(path)?, options, registry)
}

/// Read the network in `path`, de-anonymized with `<basename>_mapping.csv` when present.
pub fn read_from_path(path: impl AsRef<Path>, options: &ImportOptions) -> IidmResult<Network> {
    read_from_path_with_registry(path, options, &ExtensionRegistry::default())
}

pub fn read_from_path_with_registry(
    path: impl AsRef<Path>,
    options: &ImportOptions,
    registry: &ExtensionRegistry,
) -> IidmResult<Network> {
    let path = path.as_ref();
    let format = match options.format {
        Some(format) => format,
        None => detect_format(path)?,
    };
    read_file(path, format, &DataSource::from_path(path)?, options, registry)
}

fn write_file(
    network: &Network,
    path: &Path,
    data_source: &DataSource,
    options: &ExportOptions,
    registry: &ExtensionRegistry,
) -> IidmResult<()> {
    let mut out = BufWriter::new(File::create(path)?);
    let anonymizer = write_with_registry(network, options, registry, &mut out)?;
    out.flush()?;
    if let Some(simple) = anonymizer.as_simple() {
        let mapping = data_source.mapping_file();
        simple.write_mapping(BufWriter::new(File::create(&mapping)?))?;
        debug!(mapping = %mapping.display(), tokens = simple.len(), "anonymization mapping written");
    }
    Ok(())
}

fn read_file(
    path: &Path,
    format: TreeDataFormat,
    data_source: &DataSource,
    options: &ImportOptions,
    registry: &ExtensionRegistry,
) -> IidmResult<Network> {
    let anonymizer = data_source.load_anonymizer()?;
    let input = BufReader::new(File::open(path)?);
    read_with(input, format, options, registry, anonymizer)
}

/// Deep copy through an in-memory write and read.
pub fn copy(network: &Network) -> IidmResult<Network> {
    let options = ExportOptions::default().with_indent(false);
    let mut buffer = Vec::new();
    write(network, &options, &mut buffer)?;
    read(buffer.as_slice(), TreeDataFormat::Xml, &ImportOptions::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use iidm_core::fixtures;
    use tempfile::tempdir;

    fn to_string(network: &Network, options: &ExportOptions) -> IidmResult<String> {
        let mut out = Vec::new();
        write(network, options, &mut out)?;
        Ok(String::from_utf8_lossy(&out).into_owned())
    }

    #[test]
    fn test_root_attributes() {
        let network = fixtures::two_substations().expect("fixture");
        let xml = to_string(&network, &ExportOptions::default()).expect("write");
        assert!(xml.contains(r#"xmlns:iidm="http://www.powsybl.org/schema/iidm/1_12""#));
        assert!(xml.contains(r#"minimumValidationLevel="STEADY_STATE_HYPOTHESIS""#));
        let old = to_string(&network, &ExportOptions::default().with_version(IidmVersion::V_1_6)).expect("write");
        assert!(!old.contains("minimumValidationLevel"));
    }

    #[test]
    fn test_equipment_level_needs_1_7() {
        let mut network = fixtures::two_substations().expect("fixture");
        network.validation_level = ValidationLevel::Equipment;
        let options = ExportOptions::default().with_version(IidmVersion::V_1_6);
        assert!(matches!(to_string(&network, &options), Err(IidmError::UnsupportedVersion(_))));
        let xml = to_string(&network, &ExportOptions::default()).expect("write");
        assert!(xml.contains("http://www.powsybl.org/schema/iidm/equipment/1_12"));
        let back = read(xml.as_bytes(), TreeDataFormat::Xml, &ImportOptions::default()).expect("read");
        assert_eq!(back.validation_level, ValidationLevel::Equipment);
    }

    #[test]
    fn test_copy_keeps_content() {
        let network = fixtures::with_tie_line_and_hvdc().expect("fixture");
        let copy = copy(&network).expect("copy");
        assert_eq!(copy.stats(), network.stats());
        assert_eq!(copy.identity.id, network.identity.id);
        assert_eq!(copy.case_date.timestamp_millis(), network.case_date.timestamp_millis());
    }

    #[test]
    fn test_extension_block_written_last() {
        let mut network = fixtures::two_substations().expect("fixture");
        network.identity_of_mut("G1").expect("G1").add_extension(
            Extension::new("activePowerControl")
                .with_attribute("participate", "true")
                .with_attribute("droop", "4"),
        );
        let xml = to_string(&network, &ExportOptions::default()).expect("write");
        assert!(xml.contains(r#"xmlns:apc="http://www.powsybl.org/schema/iidm/ext/active_power_control/1_0""#));
        let line = xml.find("<iidm:line ").expect("line");
        let extension = xml.find(r#"<iidm:extension id="G1">"#).expect("extension");
        assert!(line < extension);
        assert!(xml.contains(r#"<apc:activePowerControl participate="true" droop="4"/>"#), "{xml}");
    }

    #[test]
    fn test_unknown_extension_policy() {
        let mut network = fixtures::two_substations().expect("fixture");
        network
            .identity_of_mut("LD1")
            .expect("LD1")
            .add_extension(Extension::new("mystery").with_attribute("a", "1"));
        let xml = to_string(&network, &ExportOptions::default()).expect("write");
        assert!(!xml.contains("mystery"));

        let mut strict = ExportOptions::default();
        strict.throw_if_extension_not_found = true;
        assert!(matches!(
            to_string(&network, &strict),
            Err(IidmError::MissingExtensionSerializer(names)) if names == vec!["mystery".to_string()]
        ));
    }

    #[test]
    fn test_data_source_paths() {
        let source = DataSource::from_path(Path::new("/tmp/cases/grid.xiidm")).expect("source");
        assert_eq!(source.basename(), "grid");
        assert_eq!(source.mapping_file(), PathBuf::from("/tmp/cases/grid_mapping.csv"));
        assert_eq!(source.main_file(TreeDataFormat::Json), PathBuf::from("/tmp/cases/grid.jiidm"));
    }

    #[test]
    fn test_detect_format_by_content() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("case.txt");
        std::fs::write(&path, "  \n{\"version\":\"1.12\"}").expect("write");
        assert_eq!(detect_format(&path).expect("detect"), TreeDataFormat::Json);
        std::fs::write(&path, "<?xml version=\"1.0\"?><network/>").expect("write");
        assert_eq!(detect_format(&path).expect("detect"), TreeDataFormat::Xml);
    }

    #[test]
    fn test_export_import_data_source() {
        let dir = tempdir().expect("tempdir");
        let network = fixtures::two_substations().expect("fixture");
        let source = DataSource::new(dir.path(), "grid");
        let options = ExportOptions::default().with_format(TreeDataFormat::Json);
        let path = export(&network, &source, &options).expect("export");
        assert!(path.ends_with("grid.jiidm"));
        let back = import(&source, &ImportOptions::default()).expect("import");
        assert_eq!(back.stats(), network.stats());
        assert!(import(&DataSource::new(dir.path(), "missing"), &ImportOptions::default()).is_err());
    }
}
