//! Ratio and phase tap changers of two- and three-winding transformers.

use iidm_core::{
    IidmError, IidmResult, PhaseRegulationMode, PhaseTapChanger, PhaseTapChangerStep, RatioTapChanger,
    RatioTapChangerStep,
};

use crate::codec::connectable::{read_terminal_ref, write_terminal_ref};
use crate::context::{ReaderContext, WriterContext};
use crate::gating::{RATIO_REGULATION_MODE, RATIO_REGULATION_VALUE, RATIO_TARGET_V, TARGET_DEADBAND};
use crate::tree::read_required_enum;
use crate::version::IidmVersion;

const TERMINAL_REF: &str = "terminalRef";
const STEP: &str = "step";
const VOLTAGE_REGULATION: &str = "VOLTAGE";

fn write_impedance(ctx: &mut WriterContext<'_>, r: f64, x: f64, g: f64, b: f64, rho: f64) -> IidmResult<()> {
    ctx.writer.write_double_attribute("r", r)?;
    ctx.writer.write_double_attribute("x", x)?;
    ctx.writer.write_double_attribute("g", g)?;
    ctx.writer.write_double_attribute("b", b)?;
    ctx.writer.write_double_attribute("rho", rho)
}

pub(crate) fn write_ratio(ctx: &mut WriterContext<'_>, element: &str, owner: &str, rtc: &RatioTapChanger) -> IidmResult<()> {
    ctx.start(element)?;
    ctx.writer.write_int_attribute("lowTapPosition", rtc.low_tap_position)?;
    ctx.writer.write_int_attribute("tapPosition", rtc.tap_position)?;
    TARGET_DEADBAND
        .on(element)
        .write_double(ctx.writer.as_mut(), ctx.version, rtc.target_deadband, 0.0)?;
    ctx.writer
        .write_bool_attribute("loadTapChangingCapabilities", rtc.load_tap_changing_capabilities)?;
    if rtc.load_tap_changing_capabilities || rtc.regulating {
        ctx.writer.write_bool_attribute("regulating", rtc.regulating)?;
    }
    if RATIO_TARGET_V.is_supported(ctx.version) {
        ctx.writer.write_double_attribute(RATIO_TARGET_V.name, rtc.target_v)?;
    } else if !rtc.target_v.is_nan() {
        ctx.writer
            .write_string_attribute(RATIO_REGULATION_MODE.name, VOLTAGE_REGULATION)?;
        ctx.writer
            .write_double_attribute(RATIO_REGULATION_VALUE.name, rtc.target_v)?;
    }
    if let Some(reference) = &rtc.regulation_terminal {
        write_terminal_ref(ctx, TERMINAL_REF, owner, reference)?;
    }
    for step in &rtc.steps {
        ctx.start(STEP)?;
        write_impedance(ctx, step.r, step.x, step.g, step.b, step.rho)?;
        ctx.end()?;
    }
    ctx.end()
}

pub(crate) fn write_phase(ctx: &mut WriterContext<'_>, element: &str, owner: &str, ptc: &PhaseTapChanger) -> IidmResult<()> {
    ctx.start(element)?;
    ctx.writer.write_int_attribute("lowTapPosition", ptc.low_tap_position)?;
    ctx.writer.write_int_attribute("tapPosition", ptc.tap_position)?;
    ctx.writer
        .write_string_attribute("regulationMode", ptc.regulation_mode.as_str())?;
    ctx.writer
        .write_double_attribute("regulationValue", ptc.regulation_value)?;
    ctx.writer
        .write_bool_attribute_with_default("regulating", ptc.regulating, false)?;
    TARGET_DEADBAND
        .on(element)
        .write_double(ctx.writer.as_mut(), ctx.version, ptc.target_deadband, 0.0)?;
    if let Some(reference) = &ptc.regulation_terminal {
        write_terminal_ref(ctx, TERMINAL_REF, owner, reference)?;
    }
    for step in &ptc.steps {
        ctx.start(STEP)?;
        write_impedance(ctx, step.r, step.x, step.g, step.b, step.rho)?;
        ctx.writer.write_double_attribute("alpha", step.alpha)?;
        ctx.end()?;
    }
    ctx.end()
}

/// Documents before 1.2 never carried a deadband; a regulating tap changer gets 0.
fn read_deadband(ctx: &ReaderContext<'_>, element: &str, regulating: bool) -> IidmResult<f64> {
    let deadband = TARGET_DEADBAND
        .on(element)
        .read_double(ctx.reader(), ctx.version, f64::NAN)?;
    if deadband.is_nan() && regulating && ctx.version < IidmVersion::V_1_2 {
        return Ok(0.0);
    }
    Ok(deadband)
}

fn read_ratio_target(ctx: &ReaderContext<'_>) -> IidmResult<f64> {
    if RATIO_TARGET_V.is_supported(ctx.version) {
        return ctx.reader.read_double(RATIO_TARGET_V.name);
    }
    let value = RATIO_REGULATION_VALUE.read_double(ctx.reader(), ctx.version, f64::NAN)?;
    match RATIO_REGULATION_MODE.read_str(ctx.reader(), ctx.version).as_deref() {
        None | Some(VOLTAGE_REGULATION) => Ok(value),
        Some(other) => Err(IidmError::Parse(format!(
            "unsupported ratio tap changer regulation mode '{other}'"
        ))),
    }
}

fn read_impedance(ctx: &ReaderContext<'_>) -> IidmResult<(f64, f64, f64, f64, f64)> {
    Ok((
        ctx.reader.read_double_or("r", 0.0)?,
        ctx.reader.read_double_or("x", 0.0)?,
        ctx.reader.read_double_or("g", 0.0)?,
        ctx.reader.read_double_or("b", 0.0)?,
        ctx.reader.read_double_or("rho", 1.0)?,
    ))
}

pub(crate) fn read_ratio(ctx: &mut ReaderContext<'_>, element: &str, owner: &str) -> IidmResult<RatioTapChanger> {
    let low = ctx.reader.read_required_int("lowTapPosition")?;
    let position = ctx.reader.read_required_int("tapPosition")?;
    let mut rtc = RatioTapChanger::new(low, position, Vec::new());
    rtc.load_tap_changing_capabilities = ctx.reader.read_bool_or("loadTapChangingCapabilities", false)?;
    rtc.regulating = ctx.reader.read_bool_or("regulating", false)?;
    rtc.target_deadband = read_deadband(ctx, element, rtc.regulating)?;
    rtc.target_v = read_ratio_target(ctx)?;
    while let Some(child) = ctx.reader.next_child()? {
        match child.as_str() {
            TERMINAL_REF => rtc.regulation_terminal = Some(read_terminal_ref(ctx, TERMINAL_REF, owner)?),
            STEP => {
                let (r, x, g, b, rho) = read_impedance(ctx)?;
                ctx.reader.read_end_node(STEP)?;
                rtc.steps.push(RatioTapChangerStep { rho, r, x, g, b });
            }
            _ => {
                return Err(IidmError::UnknownElement {
                    element: child,
                    parent: element.to_string(),
                })
            }
        }
    }
    Ok(rtc)
}

pub(crate) fn read_phase(ctx: &mut ReaderContext<'_>, element: &str, owner: &str) -> IidmResult<PhaseTapChanger> {
    let low = ctx.reader.read_required_int("lowTapPosition")?;
    let position = ctx.reader.read_required_int("tapPosition")?;
    let mut ptc = PhaseTapChanger::new(low, position, Vec::new());
    ptc.regulation_mode = read_required_enum::<PhaseRegulationMode>(ctx.reader(), "regulationMode")?;
    ptc.regulation_value = ctx.reader.read_double("regulationValue")?;
    ptc.regulating = ctx.reader.read_bool_or("regulating", false)?;
    ptc.target_deadband = read_deadband(ctx, element, ptc.regulating)?;
    while let Some(child) = ctx.reader.next_child()? {
        match child.as_str() {
            TERMINAL_REF => ptc.regulation_terminal = Some(read_terminal_ref(ctx, TERMINAL_REF, owner)?),
            STEP => {
                let (r, x, g, b, rho) = read_impedance(ctx)?;
                let alpha = ctx.reader.read_double_or("alpha", 0.0)?;
                ctx.reader.read_end_node(STEP)?;
                ptc.steps.push(PhaseTapChangerStep { alpha, rho, r, x, g, b });
            }
            _ => {
                return Err(IidmError::UnknownElement {
                    element: child,
                    parent: element.to_string(),
                })
            }
        }
    }
    Ok(ptc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::tests::{reader_over, write_with};
    use crate::extensions::ExtensionRegistry;
    use crate::options::{ExportOptions, ImportOptions};
    use crate::tree::TreeDataFormat;
    use iidm_core::{fixtures, TwoWindingsTransformer};

    fn t1_rtc(deadband: f64) -> (iidm_core::Network, RatioTapChanger) {
        let network = fixtures::two_substations().expect("fixture");
        let mut rtc = network
            .get::<TwoWindingsTransformer>("T1")
            .and_then(|t| t.ratio_tap_changer.clone())
            .expect("rtc");
        rtc.target_deadband = deadband;
        (network, rtc)
    }

    #[test]
    fn test_zero_deadband_omitted_before_1_2() {
        let (network, rtc) = t1_rtc(0.0);
        let old = ExportOptions::default().with_version(IidmVersion::V_1_1);
        let xml = write_with(&network, &old, |ctx| write_ratio(ctx, "ratioTapChanger", "T1", &rtc)).expect("write");
        assert!(!xml.contains("targetDeadband"), "{xml}");
        let new = ExportOptions::default().with_version(IidmVersion::V_1_3);
        let xml = write_with(&network, &new, |ctx| write_ratio(ctx, "ratioTapChanger", "T1", &rtc)).expect("write");
        assert!(xml.contains(r#"targetDeadband="0""#), "{xml}");
    }

    #[test]
    fn test_nonzero_deadband_before_1_2_still_written() {
        let (network, rtc) = t1_rtc(2.0);
        let old = ExportOptions::default().with_version(IidmVersion::V_1_0);
        let xml = write_with(&network, &old, |ctx| write_ratio(ctx, "ratioTapChanger", "T1", &rtc)).expect("write");
        assert!(xml.contains(r#"targetDeadband="2""#), "{xml}");
    }

    #[test]
    fn test_target_v_becomes_regulation_value() {
        let (network, rtc) = t1_rtc(2.0);
        let options = ExportOptions::default();
        let xml = write_with(&network, &options, |ctx| write_ratio(ctx, "ratioTapChanger", "T1", &rtc)).expect("write");
        assert!(xml.contains(r#"regulationMode="VOLTAGE" regulationValue="225""#), "{xml}");
        assert!(!xml.contains("targetV"));
        assert!(xml.contains(r#"<iidm:terminalRef id="LD2"/>"#));
    }

    #[test]
    fn test_read_ratio_before_1_2_regulating() {
        let xml = r#"<ratioTapChanger xmlns="urn:x" lowTapPosition="0" tapPosition="0"
            loadTapChangingCapabilities="true" regulating="true" targetV="225">
            <step r="0" x="0" g="0" b="0" rho="1"/></ratioTapChanger>"#;
        let options = ImportOptions::default();
        let registry = ExtensionRegistry::default();
        let mut ctx = reader_over(xml, TreeDataFormat::Xml, IidmVersion::V_1_1, &options, &registry);
        let rtc = read_ratio(&mut ctx, "ratioTapChanger", "T1").expect("read");
        assert_eq!(rtc.target_deadband, 0.0);
        assert_eq!(rtc.target_v, 225.0);
        assert_eq!(rtc.steps.len(), 1);
    }

    #[test]
    fn test_read_phase_steps() {
        let json = r#"{"version":"1.12","lowTapPosition":0,"tapPosition":1,"regulationMode":"FIXED_TAP",
            "steps":[{"rho":1.0,"alpha":-5.0},{"rho":1.0,"alpha":5.0}]}"#;
        let options = ImportOptions::default();
        let registry = ExtensionRegistry::default();
        let mut ctx = reader_over(json, TreeDataFormat::Json, IidmVersion::V_1_12, &options, &registry);
        let ptc = read_phase(&mut ctx, "phaseTapChanger", "T1").expect("read");
        assert_eq!(ptc.regulation_mode, PhaseRegulationMode::FixedTap);
        assert_eq!(ptc.steps[1].alpha, 5.0);
        assert!(ptc.target_deadband.is_nan());
    }
}
