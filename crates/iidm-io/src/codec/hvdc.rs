//! `hvdcLine`: a DC link between two converter stations.

use iidm_core::{ConvertersMode, HvdcLine, IidmResult, Network};

use crate::codec::{ordered, read_identity, read_leaf, write_identifiable};
use crate::context::{ReaderContext, WriterContext};
use crate::tree::read_required_enum;

pub(crate) const HVDC_LINE: &str = "hvdcLine";

pub(crate) fn write_hvdc_lines(ctx: &mut WriterContext<'_>) -> IidmResult<()> {
    let network = ctx.network;
    for hvdc in ordered(ctx, network.iter::<HvdcLine>()) {
        if !ctx.test_equipment_id(&hvdc.identity.id) {
            continue;
        }
        write_identifiable(
            ctx,
            HVDC_LINE,
            &hvdc.identity,
            |ctx| {
                ctx.writer.write_double_attribute("r", hvdc.r)?;
                ctx.writer.write_double_attribute("nominalV", hvdc.nominal_v)?;
                ctx.writer
                    .write_string_attribute("convertersMode", hvdc.converters_mode.as_str())?;
                ctx.writer
                    .write_double_attribute("activePowerSetpoint", hvdc.active_power_setpoint)?;
                ctx.writer.write_double_attribute("maxP", hvdc.max_p)?;
                ctx.write_id("converterStation1", &hvdc.converter_station1)?;
                ctx.write_id("converterStation2", &hvdc.converter_station2)
            },
            |_| Ok(()),
        )?;
    }
    Ok(())
}

pub(crate) fn read(ctx: &mut ReaderContext<'_>, network: &mut Network) -> IidmResult<()> {
    let identity = read_identity(ctx, HVDC_LINE)?;
    let mut hvdc = HvdcLine {
        identity,
        r: ctx.reader.read_double("r")?,
        nominal_v: ctx.reader.read_double("nominalV")?,
        converters_mode: read_required_enum::<ConvertersMode>(ctx.reader(), "convertersMode")?,
        active_power_setpoint: ctx.reader.read_double("activePowerSetpoint")?,
        max_p: ctx.reader.read_double("maxP")?,
        converter_station1: ctx.read_id("converterStation1")?,
        converter_station2: ctx.read_id("converterStation2")?,
    };
    read_leaf(ctx, HVDC_LINE, &mut hvdc)?;
    network.add_equipment(hvdc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::tests::{reader_over, write_with};
    use crate::extensions::ExtensionRegistry;
    use crate::options::{ExportOptions, ImportOptions};
    use crate::tree::TreeDataFormat;
    use crate::version::IidmVersion;
    use iidm_core::{fixtures, IidmError};

    #[test]
    fn test_write_hvdc_line() {
        let network = fixtures::with_tie_line_and_hvdc().expect("fixture");
        let xml = write_with(&network, &ExportOptions::default(), write_hvdc_lines).expect("write");
        assert!(xml.contains(r#"converterStation1="VSC1" converterStation2="VSC2""#), "{xml}");
    }

    #[test]
    fn test_missing_station_rejected() {
        let json = r#"{"version":"1.12","hvdcLines":[{"id":"HX","r":1.0,"nominalV":320.0,
            "convertersMode":"SIDE_1_RECTIFIER_SIDE_2_INVERTER","activePowerSetpoint":100.0,"maxP":300.0,
            "converterStation1":"VSC1","converterStation2":"NOPE"}]}"#;
        let options = ImportOptions::default();
        let registry = ExtensionRegistry::default();
        let mut ctx = reader_over(json, TreeDataFormat::Json, IidmVersion::CURRENT, &options, &registry);
        ctx.reader.next_child().expect("child").expect("hvdc line");
        let mut network = fixtures::with_tie_line_and_hvdc().expect("fixture");
        assert!(matches!(read(&mut ctx, &mut network), Err(IidmError::Network(_))));
    }
}
