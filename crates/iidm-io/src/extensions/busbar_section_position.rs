//! `busbarSectionPosition`: location of a busbar section in the substation layout.

use iidm_core::{Extension, IidmError, IidmResult};

use super::{required_attribute, ExtensionSerDe};
use crate::tree::{TreeDataReader, TreeDataWriter};
use crate::validate::ElementRule;

pub const NAME: &str = "busbarSectionPosition";
pub const NAMESPACE_URI: &str = "http://www.itesla_project.eu/schema/iidm/ext/busbarsectionposition/1_0";
pub const NAMESPACE_PREFIX: &str = "bbsp";

const BUSBAR_INDEX: &str = "busbarIndex";
const SECTION_INDEX: &str = "sectionIndex";

pub struct BusbarSectionPositionSerDe;

fn check_index(name: &str, value: i32) -> IidmResult<i32> {
    if value < 0 {
        return Err(IidmError::Validation(format!(
            "busbar section position: {name} must be >= 0, got {value}"
        )));
    }
    Ok(value)
}

impl ExtensionSerDe for BusbarSectionPositionSerDe {
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
        let busbar = check_index(BUSBAR_INDEX, required_attribute(extension, BUSBAR_INDEX)?)?;
        let section = check_index(SECTION_INDEX, required_attribute(extension, SECTION_INDEX)?)?;
        writer.write_int_attribute(BUSBAR_INDEX, busbar)?;
        writer.write_int_attribute(SECTION_INDEX, section)
    }

    fn read(&self, reader: &mut dyn TreeDataReader) -> IidmResult<Extension> {
        let busbar = check_index(BUSBAR_INDEX, reader.read_required_int(BUSBAR_INDEX)?)?;
        let section = check_index(SECTION_INDEX, reader.read_required_int(SECTION_INDEX)?)?;
        reader.read_end_node(NAME)?;
        Ok(Extension::new(NAME)
            .with_attribute(BUSBAR_INDEX, busbar.to_string())
            .with_attribute(SECTION_INDEX, section.to_string()))
    }

    fn element_rule(&self) -> ElementRule {
        ElementRule::new(NAME).with_required(&[BUSBAR_INDEX, SECTION_INDEX])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{self, TreeDataFormat};

    #[test]
    fn test_read_positions() {
        let json = r#"{"busbarSectionPosition": {"busbarIndex": 1, "sectionIndex": 2}}"#;
        let mut reader = tree::reader(TreeDataFormat::Json, json.as_bytes()).expect("reader");
        reader.read_root().expect("root");
        assert_eq!(reader.next_child().expect("child").as_deref(), Some(NAME));
        let ext = BusbarSectionPositionSerDe.read(reader.as_mut()).expect("read");
        assert_eq!(ext.attribute(BUSBAR_INDEX), Some("1"));
        assert_eq!(ext.attribute(SECTION_INDEX), Some("2"));
    }

    #[test]
    fn test_negative_index_rejected() {
        let xml = format!(r#"<bbsp:busbarSectionPosition xmlns:bbsp="{NAMESPACE_URI}" busbarIndex="-1" sectionIndex="0"/>"#);
        let mut reader = tree::reader(TreeDataFormat::Xml, xml.as_bytes()).expect("reader");
        reader.read_root().expect("root");
        assert!(matches!(
            BusbarSectionPositionSerDe.read(reader.as_mut()),
            Err(IidmError::Validation(_))
        ));
    }
}
