//! `activePowerControl`: participation of a generator or battery in active power balancing.

use iidm_core::{Extension, IidmResult};

use super::{parse_attribute, required_attribute, ExtensionSerDe};
use crate::tree::{format_double, TreeDataReader, TreeDataWriter};
use crate::validate::ElementRule;

pub const NAME: &str = "activePowerControl";
pub const NAMESPACE_URI: &str = "http://www.powsybl.org/schema/iidm/ext/active_power_control/1_0";
pub const NAMESPACE_PREFIX: &str = "apc";

const PARTICIPATE: &str = "participate";
const DROOP: &str = "droop";
const PARTICIPATION_FACTOR: &str = "participationFactor";

pub struct ActivePowerControlSerDe;

impl ExtensionSerDe for ActivePowerControlSerDe {
    fn name(&self) -> &str {
        NAME
    }

    fn namespace_uri(&self) -> &str {
        NAMESPACE_URI
    }

    fn namespace_prefix(&self) -> &str {
        NAMESPACE_PREFIX
    }

    fn write(&self, extension: &Extension, writer: &mut dyn TreeDataWriter) -> IidmResult<()> {
        let participate: bool = required_attribute(extension, PARTICIPATE)?;
        let droop: f64 = required_attribute(extension, DROOP)?;
        writer.write_bool_attribute(PARTICIPATE, participate)?;
        writer.write_double_attribute(DROOP, droop)?;
        if let Some(factor) = parse_attribute::<f64>(extension, PARTICIPATION_FACTOR)? {
            writer.write_double_attribute(PARTICIPATION_FACTOR, factor)?;
        }
        Ok(())
    }

    fn read(&self, reader: &mut dyn TreeDataReader) -> IidmResult<Extension> {
        let participate = reader.read_bool_or(PARTICIPATE, false)?;
        let droop = reader.read_double(DROOP)?;
        let factor = reader.read_double(PARTICIPATION_FACTOR)?;
        reader.read_end_node(NAME)?;

        let mut extension = Extension::new(NAME)
            .with_attribute(PARTICIPATE, participate.to_string())
            .with_attribute(DROOP, format_double(droop));
        if !factor.is_nan() {
            extension = extension.with_attribute(PARTICIPATION_FACTOR, format_double(factor));
        }
        Ok(extension)
    }

    fn element_rule(&self) -> ElementRule {
        ElementRule::new(NAME).with_required(&[PARTICIPATE, DROOP])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{self, TreeDataFormat};
    use crate::version::IidmVersion;

    fn write(extension: &Extension) -> IidmResult<String> {
        let mut out = Vec::new();
        {
            let mut writer = tree::writer(TreeDataFormat::Xml, &mut out, false, IidmVersion::CURRENT);
            writer.declare_namespace(NAMESPACE_PREFIX, NAMESPACE_URI);
            writer.write_start_node(NAMESPACE_URI, NAME)?;
            ActivePowerControlSerDe.write(extension, writer.as_mut())?;
            writer.write_end_node()?;
            writer.finish()?;
        }
        Ok(String::from_utf8_lossy(&out).into_owned())
    }

    #[test]
    fn test_write_typed_attributes() {
        let ext = Extension::new(NAME)
            .with_attribute(PARTICIPATE, "true")
            .with_attribute(DROOP, "4");
        let xml = write(&ext).expect("write");
        assert!(xml.contains(r#"participate="true""#));
        assert!(xml.contains(r#"droop="4""#));
        assert!(!xml.contains(PARTICIPATION_FACTOR));
    }

    #[test]
    fn test_invalid_droop_rejected() {
        let ext = Extension::new(NAME)
            .with_attribute(PARTICIPATE, "true")
            .with_attribute(DROOP, "steep");
        assert!(write(&ext).is_err());
    }

    #[test]
    fn test_read_normalizes_values() {
        let xml = format!(
            r#"<apc:activePowerControl xmlns:apc="{NAMESPACE_URI}" participate="false" droop="2.50" participationFactor="0.5"/>"#
        );
        let mut reader = tree::reader(TreeDataFormat::Xml, xml.as_bytes()).expect("reader");
        reader.read_root().expect("root");
        let ext = ActivePowerControlSerDe.read(reader.as_mut()).expect("read");
        assert_eq!(ext.attribute(PARTICIPATE), Some("false"));
        assert_eq!(ext.attribute(DROOP), Some("2.5"));
        assert_eq!(ext.attribute(PARTICIPATION_FACTOR), Some("0.5"));
    }
}
