use std::io::{self, Write};

use anyhow::Result;
use iidm_io::IidmVersion;
use tabwriter::TabWriter;

pub fn handle() -> Result<()> {
    let mut writer = TabWriter::new(io::stdout());
    writeln!(writer, "VERSION\tNAMESPACE\tSCHEMA\tEQUIPMENT NAMESPACE")?;
    for version in IidmVersion::ALL {
        let equipment = if version.supports_equipment_validation_level() {
            version.namespace_uri(false)
        } else {
            "-".to_string()
        };
        let current = if version == IidmVersion::CURRENT { " (current)" } else { "" };
        writeln!(
            writer,
            "{version}{current}\t{}\t{}\t{equipment}",
            version.namespace_uri(true),
            version.schema_name(true)
        )?;
    }
    writer.flush()?;
    Ok(())
}
