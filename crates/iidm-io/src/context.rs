//! Per-document state of one write or read pass.
//!
//! A context is created by the document driver, threaded by `&mut` through every codec
//! call and dropped at the end of the pass. Nothing in it is shared between documents.

use std::collections::{HashMap, HashSet};

use iidm_core::graph_utils::bus_breaker_views;
use iidm_core::{IidmError, IidmResult, Network, Terminal, TopologyView, ValidationLevel};

use crate::anonymizer::Anonymizer;
use crate::bus_filter::BusFilter;
use crate::deferred::DeferredTasks;
use crate::extensions::ExtensionRegistry;
use crate::options::{ExportOptions, ImportOptions, TopologyLevel};
use crate::tree::{TreeDataReader, TreeDataWriter};
use crate::version::IidmVersion;

pub struct WriterContext<'a> {
    pub network: &'a Network,
    pub options: &'a ExportOptions,
    pub version: IidmVersion,
    /// Network satisfies the steady state hypothesis level
    pub valid: bool,
    pub namespace: String,
    pub writer: Box<dyn TreeDataWriter + 'a>,
    pub anonymizer: Anonymizer,
    pub filter: BusFilter,
    pub extensions: &'a ExtensionRegistry,
    /// Bus/breaker views of every voltage level
    pub views: HashMap<String, TopologyView>,
    /// Bus views, only computed for bus/branch exports
    pub bus_views: HashMap<String, TopologyView>,
    exported: Vec<String>,
    exported_set: HashSet<String>,
}

impl<'a> WriterContext<'a> {
    pub fn new(
        network: &'a Network,
        options: &'a ExportOptions,
        extensions: &'a ExtensionRegistry,
        writer: Box<dyn TreeDataWriter + 'a>,
        anonymizer: Anonymizer,
    ) -> IidmResult<Self> {
        let version = options.version;
        let valid = network.validation_level == ValidationLevel::SteadyStateHypothesis;
        let views = bus_breaker_views(network)?;
        let filter = if options.only_main_connected_component {
            BusFilter::main_connected_component(network, &views)?
        } else {
            BusFilter::all()
        };
        let mut bus_views = HashMap::new();
        if options.topology_level == TopologyLevel::BusBranch {
            for vl in network.voltage_levels() {
                bus_views.insert(vl.identity.id.clone(), network.bus_view(&vl.identity.id)?);
            }
        }
        Ok(Self {
            network,
            options,
            version,
            valid,
            namespace: version.namespace_uri(valid),
            writer,
            anonymizer,
            filter,
            extensions,
            views,
            bus_views,
            exported: Vec::new(),
            exported_set: HashSet::new(),
        })
    }

    pub fn start(&mut self, name: &str) -> IidmResult<()> {
        self.writer.write_start_node(&self.namespace, name)
    }

    pub fn end(&mut self) -> IidmResult<()> {
        self.writer.write_end_node()
    }

    /// Write an attribute holding an identifier, anonymized when requested.
    pub fn write_id(&mut self, name: &str, value: &str) -> IidmResult<()> {
        let value = self.anonymizer.anonymize(value);
        self.writer.write_string_attribute(name, &value)
    }

    pub fn write_optional_id(&mut self, name: &str, value: Option<&str>) -> IidmResult<()> {
        match value {
            Some(value) => self.write_id(name, value),
            None => Ok(()),
        }
    }

    pub fn mark_exported(&mut self, id: &str) {
        if self.exported_set.insert(id.to_string()) {
            self.exported.push(id.to_string());
        }
    }

    pub fn is_exported(&self, id: &str) -> bool {
        self.exported_set.contains(id)
    }

    /// Exported identifiables in writing order.
    pub fn exported(&self) -> &[String] {
        &self.exported
    }

    pub fn topology_level(&self, voltage_level_id: &str) -> IidmResult<TopologyLevel> {
        let vl = self.network.voltage_level(voltage_level_id).ok_or_else(|| {
            IidmError::Network(format!("voltage level '{voltage_level_id}' not found"))
        })?;
        Ok(self.options.topology_level.effective(vl.kind()))
    }

    /// View the buses of `voltage_level_id` are exported from at bus/breaker or bus/branch level.
    pub fn projected_view(&self, voltage_level_id: &str, level: TopologyLevel) -> IidmResult<&TopologyView> {
        let views = match level {
            TopologyLevel::BusBranch => &self.bus_views,
            _ => &self.views,
        };
        views.get(voltage_level_id).ok_or_else(|| {
            IidmError::Network(format!("no calculated view for voltage level '{voltage_level_id}'"))
        })
    }

    pub fn test_terminal(&self, terminal: &Terminal) -> bool {
        self.filter.test_terminal(&self.views, terminal)
    }

    /// Whether equipment `id` is part of the export.
    pub fn test_equipment_id(&self, id: &str) -> bool {
        self.network
            .equipment_by_id(id)
            .is_some_and(|e| self.filter.test_equipment(self.network, &self.views, e))
    }
}

pub struct ReaderContext<'a> {
    pub reader: Box<dyn TreeDataReader + 'a>,
    pub version: IidmVersion,
    pub options: &'a ImportOptions,
    pub anonymizer: Anonymizer,
    pub extensions: &'a ExtensionRegistry,
    pub deferred: DeferredTasks,
}

impl<'a> ReaderContext<'a> {
    pub fn new(
        reader: Box<dyn TreeDataReader + 'a>,
        version: IidmVersion,
        options: &'a ImportOptions,
        extensions: &'a ExtensionRegistry,
        anonymizer: Anonymizer,
    ) -> Self {
        Self {
            reader,
            version,
            options,
            anonymizer,
            extensions,
            deferred: DeferredTasks::new(),
        }
    }

    pub fn reader(&self) -> &dyn TreeDataReader {
        self.reader.as_ref()
    }

    /// Required identifier attribute, de-anonymized.
    pub fn read_id(&self, name: &str) -> IidmResult<String> {
        let raw = self.reader.read_required_string(name)?;
        self.anonymizer.deanonymize(&raw)
    }

    pub fn read_optional_id(&self, name: &str) -> IidmResult<Option<String>> {
        self.reader
            .read_string(name)
            .map(|raw| self.anonymizer.deanonymize(&raw))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anonymizer::SimpleAnonymizer;
    use crate::tree::{self, TreeDataFormat};
    use iidm_core::fixtures;

    #[test]
    fn test_exported_keeps_order_once() {
        let network = fixtures::two_substations().expect("fixture");
        let options = ExportOptions::default();
        let registry = ExtensionRegistry::default();
        let mut out = Vec::new();
        let writer = tree::writer(TreeDataFormat::Xml, &mut out, false, options.version);
        let mut ctx = WriterContext::new(&network, &options, &registry, writer, Anonymizer::default())
            .expect("context");
        ctx.mark_exported("S2");
        ctx.mark_exported("S1");
        ctx.mark_exported("S2");
        assert_eq!(ctx.exported(), ["S2".to_string(), "S1".to_string()]);
        assert!(ctx.is_exported("S1"));
        assert!(ctx.bus_views.is_empty());
        assert_eq!(ctx.namespace, IidmVersion::CURRENT.namespace_uri(true));
    }

    #[test]
    fn test_bus_views_for_bus_branch() {
        let network = fixtures::two_substations().expect("fixture");
        let options = ExportOptions::default().with_topology_level(TopologyLevel::BusBranch);
        let registry = ExtensionRegistry::default();
        let mut out = Vec::new();
        let writer = tree::writer(TreeDataFormat::Xml, &mut out, false, options.version);
        let ctx = WriterContext::new(&network, &options, &registry, writer, Anonymizer::default())
            .expect("context");
        let view = ctx.projected_view("VL1", TopologyLevel::BusBranch).expect("view");
        assert_eq!(view.buses.len(), 1);
        assert_eq!(ctx.topology_level("VL1").expect("level"), TopologyLevel::BusBranch);
    }

    #[test]
    fn test_read_id_deanonymizes() {
        let mut simple = SimpleAnonymizer::new();
        let token = simple.anonymize("GEN");
        let xml = format!(r#"<n xmlns="x" id="{token}"/>"#);
        let options = ImportOptions::default();
        let registry = ExtensionRegistry::default();
        let mut reader = tree::reader(TreeDataFormat::Xml, xml.as_bytes()).expect("reader");
        reader.read_root().expect("root");
        let ctx = ReaderContext::new(
            reader,
            IidmVersion::CURRENT,
            &options,
            &registry,
            Anonymizer::Simple(simple),
        );
        assert_eq!(ctx.read_id("id").expect("id"), "GEN");
        assert_eq!(ctx.read_optional_id("name").expect("name"), None);
    }
}
