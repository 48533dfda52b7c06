//! Single-terminal equipment written inside its voltage level.

use iidm_core::{
    Battery, DanglingLine, DanglingLineGeneration, EnergySource, Equipment, Generator, IidmError, IidmResult,
    LccConverterStation, Load, LoadType, Network, ReactiveLimits, ShuntCompensator, ShuntModel, ShuntSection,
    StaticVarCompensator, SvcRegulationMode, TerminalRef, VscConverterStation,
};

use crate::codec::connectable::{read_injection_terminal, read_terminal_ref, write_injection_terminal, write_terminal_ref};
use crate::codec::{limits, reactive_limits, read_identity, read_sub_elements, write_identifiable};
use crate::context::{ReaderContext, WriterContext};
use crate::gating::{
    BATTERY_TARGET_P, BATTERY_TARGET_Q, DANGLING_LINE_GENERATION, PAIRING_KEY, SHUNT_B_PER_SECTION,
    SHUNT_LINEAR_MODEL, SHUNT_MAXIMUM_SECTION_COUNT, SHUNT_NON_LINEAR_MODEL, SHUNT_REGULATING_TERMINAL,
    SHUNT_SECTION_COUNT, SHUNT_TARGET_DEADBAND, SHUNT_TARGET_V, SHUNT_VOLTAGE_REGULATOR_ON,
    SVC_REACTIVE_POWER_SETPOINT, SVC_VOLTAGE_SETPOINT,
};
use crate::tree::read_enum;

pub(crate) const GENERATOR: &str = "generator";
pub(crate) const BATTERY: &str = "battery";
pub(crate) const LOAD: &str = "load";
pub(crate) const SHUNT: &str = "shunt";
pub(crate) const STATIC_VAR_COMPENSATOR: &str = "staticVarCompensator";
pub(crate) const DANGLING_LINE: &str = "danglingLine";
pub(crate) const VSC_CONVERTER_STATION: &str = "vscConverterStation";
pub(crate) const LCC_CONVERTER_STATION: &str = "lccConverterStation";

/// Order of the injection elements inside a voltage level.
pub(crate) const WRITE_ORDER: [&str; 8] = [
    GENERATOR,
    BATTERY,
    LOAD,
    SHUNT,
    DANGLING_LINE,
    STATIC_VAR_COMPENSATOR,
    VSC_CONVERTER_STATION,
    LCC_CONVERTER_STATION,
];

const REGULATING_TERMINAL: &str = "regulatingTerminal";
const GENERATION: &str = "generation";
const SECTION: &str = "section";

pub(crate) fn write(ctx: &mut WriterContext<'_>, equipment: &Equipment) -> IidmResult<()> {
    match equipment {
        Equipment::Generator(g) => write_generator(ctx, g),
        Equipment::Battery(b) => write_battery(ctx, b),
        Equipment::Load(l) => write_load(ctx, l),
        Equipment::ShuntCompensator(s) => write_shunt(ctx, s),
        Equipment::StaticVarCompensator(svc) => write_svc(ctx, svc),
        Equipment::DanglingLine(dl) => write_dangling_line(ctx, dl),
        Equipment::VscConverterStation(vsc) => write_vsc(ctx, vsc),
        Equipment::LccConverterStation(lcc) => write_lcc(ctx, lcc),
        other => Err(IidmError::Other(format!(
            "'{}' is not an injection ({})",
            other.id(),
            other.element()
        ))),
    }
}

/// Read injection `element` of voltage level `voltage_level_id`; `false` when `element`
/// is not an injection.
pub(crate) fn read(ctx: &mut ReaderContext<'_>, element: &str, voltage_level_id: &str, network: &mut Network) -> IidmResult<bool> {
    let equipment: Equipment = match element {
        GENERATOR => read_generator(ctx, voltage_level_id)?.into(),
        BATTERY => read_battery(ctx, voltage_level_id)?.into(),
        LOAD => read_load(ctx, voltage_level_id)?.into(),
        SHUNT => read_shunt(ctx, voltage_level_id)?.into(),
        STATIC_VAR_COMPENSATOR => read_svc(ctx, voltage_level_id)?.into(),
        DANGLING_LINE => read_dangling_line(ctx, voltage_level_id)?.into(),
        VSC_CONVERTER_STATION => read_vsc(ctx, voltage_level_id)?.into(),
        LCC_CONVERTER_STATION => read_lcc(ctx, voltage_level_id)?.into(),
        _ => return Ok(false),
    };
    network.add_equipment(equipment)?;
    Ok(true)
}

fn write_regulating_terminal(ctx: &mut WriterContext<'_>, owner: &str, reference: Option<&TerminalRef>) -> IidmResult<()> {
    match reference {
        Some(reference) => write_terminal_ref(ctx, REGULATING_TERMINAL, owner, reference),
        None => Ok(()),
    }
}

/// Regulating terminal or reactive limits child shared by generator-like injections.
fn read_regulation_child(
    ctx: &mut ReaderContext<'_>,
    element: &str,
    owner: &str,
    regulating_terminal: Option<&mut Option<TerminalRef>>,
    limits: &mut Option<ReactiveLimits>,
) -> IidmResult<bool> {
    if element == REGULATING_TERMINAL {
        if let Some(slot) = regulating_terminal {
            *slot = Some(read_terminal_ref(ctx, REGULATING_TERMINAL, owner)?);
            return Ok(true);
        }
        return Ok(false);
    }
    match reactive_limits::read(ctx, element)? {
        Some(read) => {
            *limits = Some(read);
            Ok(true)
        }
        None => Ok(false),
    }
}

fn write_generator(ctx: &mut WriterContext<'_>, g: &Generator) -> IidmResult<()> {
    let id = g.identity.id.as_str();
    write_identifiable(
        ctx,
        GENERATOR,
        &g.identity,
        |ctx| {
            ctx.writer.write_string_attribute("energySource", g.energy_source.as_str())?;
            ctx.writer.write_double_attribute("minP", g.min_p)?;
            ctx.writer.write_double_attribute("maxP", g.max_p)?;
            ctx.writer.write_double_attribute("ratedS", g.rated_s)?;
            ctx.writer.write_bool_attribute("voltageRegulatorOn", g.voltage_regulator_on)?;
            ctx.writer.write_double_attribute("targetP", g.target_p)?;
            ctx.writer.write_double_attribute("targetV", g.target_v)?;
            ctx.writer.write_double_attribute("targetQ", g.target_q)?;
            write_injection_terminal(ctx, id, &g.terminal)
        },
        |ctx| {
            write_regulating_terminal(ctx, id, g.regulating_terminal.as_ref())?;
            reactive_limits::write(ctx, g.reactive_limits.as_ref())
        },
    )
}

fn read_generator(ctx: &mut ReaderContext<'_>, voltage_level_id: &str) -> IidmResult<Generator> {
    let identity = read_identity(ctx, GENERATOR)?;
    let terminal = read_injection_terminal(ctx, &identity.id, voltage_level_id)?;
    let mut g = Generator::new(
        identity.id.clone(),
        terminal,
        ctx.reader.read_double("targetP")?,
        ctx.reader.read_double("targetV")?,
    );
    g.identity = identity;
    g.energy_source = read_enum::<EnergySource>(ctx.reader(), "energySource")?.unwrap_or(EnergySource::Other);
    g.min_p = ctx.reader.read_double_or("minP", -f64::MAX)?;
    g.max_p = ctx.reader.read_double_or("maxP", f64::MAX)?;
    g.rated_s = ctx.reader.read_double("ratedS")?;
    g.voltage_regulator_on = ctx.reader.read_bool_or("voltageRegulatorOn", false)?;
    g.target_q = ctx.reader.read_double("targetQ")?;
    read_sub_elements(ctx, GENERATOR, &mut g, |ctx, child, g| {
        let owner = g.identity.id.clone();
        read_regulation_child(ctx, child, &owner, Some(&mut g.regulating_terminal), &mut g.reactive_limits)
    })?;
    Ok(g)
}

fn write_battery(ctx: &mut WriterContext<'_>, b: &Battery) -> IidmResult<()> {
    let id = b.identity.id.as_str();
    write_identifiable(
        ctx,
        BATTERY,
        &b.identity,
        |ctx| {
            BATTERY_TARGET_P.write_double(ctx.writer.as_mut(), ctx.version, b.target_p, f64::NAN)?;
            BATTERY_TARGET_Q.write_double(ctx.writer.as_mut(), ctx.version, b.target_q, f64::NAN)?;
            ctx.writer.write_double_attribute("minP", b.min_p)?;
            ctx.writer.write_double_attribute("maxP", b.max_p)?;
            write_injection_terminal(ctx, id, &b.terminal)
        },
        |ctx| reactive_limits::write(ctx, b.reactive_limits.as_ref()),
    )
}

fn read_battery(ctx: &mut ReaderContext<'_>, voltage_level_id: &str) -> IidmResult<Battery> {
    let identity = read_identity(ctx, BATTERY)?;
    let terminal = read_injection_terminal(ctx, &identity.id, voltage_level_id)?;
    let mut b = Battery::new(
        identity.id.clone(),
        terminal,
        BATTERY_TARGET_P.read_double(ctx.reader(), ctx.version, f64::NAN)?,
        BATTERY_TARGET_Q.read_double(ctx.reader(), ctx.version, f64::NAN)?,
    );
    b.identity = identity;
    b.min_p = ctx.reader.read_double_or("minP", -f64::MAX)?;
    b.max_p = ctx.reader.read_double_or("maxP", f64::MAX)?;
    read_sub_elements(ctx, BATTERY, &mut b, |ctx, child, b| {
        let owner = b.identity.id.clone();
        read_regulation_child(ctx, child, &owner, None, &mut b.reactive_limits)
    })?;
    Ok(b)
}

fn write_load(ctx: &mut WriterContext<'_>, l: &Load) -> IidmResult<()> {
    write_identifiable(
        ctx,
        LOAD,
        &l.identity,
        |ctx| {
            ctx.writer.write_string_attribute("loadType", l.load_type.as_str())?;
            ctx.writer.write_double_attribute("p0", l.p0)?;
            ctx.writer.write_double_attribute("q0", l.q0)?;
            write_injection_terminal(ctx, &l.identity.id, &l.terminal)
        },
        |_| Ok(()),
    )
}

fn read_load(ctx: &mut ReaderContext<'_>, voltage_level_id: &str) -> IidmResult<Load> {
    let identity = read_identity(ctx, LOAD)?;
    let terminal = read_injection_terminal(ctx, &identity.id, voltage_level_id)?;
    let mut load = Load::new(
        identity.id.clone(),
        terminal,
        ctx.reader.read_double("p0")?,
        ctx.reader.read_double("q0")?,
    );
    load.identity = identity;
    load.load_type = read_enum::<LoadType>(ctx.reader(), "loadType")?.unwrap_or(LoadType::Undefined);
    crate::codec::read_leaf(ctx, LOAD, &mut load)?;
    Ok(load)
}

fn write_shunt(ctx: &mut WriterContext<'_>, s: &ShuntCompensator) -> IidmResult<()> {
    let id = s.identity.id.as_str();
    write_identifiable(
        ctx,
        SHUNT,
        &s.identity,
        |ctx| {
            let version = ctx.version;
            match &s.model {
                ShuntModel::Linear {
                    b_per_section,
                    g_per_section,
                    maximum_section_count,
                } if !SHUNT_LINEAR_MODEL.is_supported(version) => {
                    if !g_per_section.is_nan() && *g_per_section != 0.0 {
                        tracing::warn!(shunt = id, %version, "gPerSection cannot be written, dropped");
                    }
                    SHUNT_B_PER_SECTION.write_double(ctx.writer.as_mut(), version, *b_per_section, f64::NAN)?;
                    SHUNT_MAXIMUM_SECTION_COUNT.write_int(ctx.writer.as_mut(), version, *maximum_section_count, None)?;
                }
                ShuntModel::NonLinear(_) => SHUNT_NON_LINEAR_MODEL.check(version)?,
                ShuntModel::Linear { .. } => {}
            }
            SHUNT_SECTION_COUNT.write_int(ctx.writer.as_mut(), version, s.section_count, None)?;
            SHUNT_VOLTAGE_REGULATOR_ON.write_bool(ctx.writer.as_mut(), version, s.voltage_regulator_on, false)?;
            SHUNT_TARGET_V.write_double(ctx.writer.as_mut(), version, s.target_v, f64::NAN)?;
            SHUNT_TARGET_DEADBAND.write_double(ctx.writer.as_mut(), version, s.target_deadband, f64::NAN)?;
            write_injection_terminal(ctx, id, &s.terminal)
        },
        |ctx| {
            if SHUNT_LINEAR_MODEL.is_supported(ctx.version) {
                match &s.model {
                    ShuntModel::Linear {
                        b_per_section,
                        g_per_section,
                        maximum_section_count,
                    } => {
                        ctx.start(SHUNT_LINEAR_MODEL.name)?;
                        ctx.writer.write_double_attribute("bPerSection", *b_per_section)?;
                        ctx.writer.write_double_attribute("gPerSection", *g_per_section)?;
                        ctx.writer
                            .write_int_attribute("maximumSectionCount", *maximum_section_count)?;
                        ctx.end()?;
                    }
                    ShuntModel::NonLinear(sections) => {
                        ctx.start(SHUNT_NON_LINEAR_MODEL.name)?;
                        for section in sections {
                            ctx.start(SECTION)?;
                            ctx.writer.write_double_attribute("b", section.b)?;
                            ctx.writer.write_double_attribute("g", section.g)?;
                            ctx.end()?;
                        }
                        ctx.end()?;
                    }
                }
            }
            if s.regulating_terminal.is_some() {
                SHUNT_REGULATING_TERMINAL.check(ctx.version)?;
            }
            write_regulating_terminal(ctx, id, s.regulating_terminal.as_ref())
        },
    )
}

fn read_shunt(ctx: &mut ReaderContext<'_>, voltage_level_id: &str) -> IidmResult<ShuntCompensator> {
    let identity = read_identity(ctx, SHUNT)?;
    let terminal = read_injection_terminal(ctx, &identity.id, voltage_level_id)?;
    let version = ctx.version;
    let section_count = SHUNT_SECTION_COUNT.read_int(ctx.reader(), version)?.ok_or_else(|| {
        IidmError::Parse(format!(
            "shunt '{}': missing attribute '{}'",
            identity.id,
            SHUNT_SECTION_COUNT.wire_name(version)
        ))
    })?;
    let legacy_model = match SHUNT_MAXIMUM_SECTION_COUNT.read_int(ctx.reader(), version)? {
        Some(maximum_section_count) => Some(ShuntModel::Linear {
            b_per_section: SHUNT_B_PER_SECTION.read_double(ctx.reader(), version, f64::NAN)?,
            g_per_section: f64::NAN,
            maximum_section_count,
        }),
        None => None,
    };
    let mut shunt = ShuntCompensator {
        identity,
        terminal,
        section_count,
        model: legacy_model.clone().unwrap_or(ShuntModel::NonLinear(Vec::new())),
        voltage_regulator_on: SHUNT_VOLTAGE_REGULATOR_ON.read_bool(ctx.reader(), version, false)?,
        target_v: SHUNT_TARGET_V.read_double(ctx.reader(), version, f64::NAN)?,
        target_deadband: SHUNT_TARGET_DEADBAND.read_double(ctx.reader(), version, f64::NAN)?,
        regulating_terminal: None,
    };
    let mut has_model = legacy_model.is_some();
    read_sub_elements(ctx, SHUNT, &mut shunt, |ctx, child, shunt| match child {
        name if name == SHUNT_LINEAR_MODEL.name => {
            SHUNT_LINEAR_MODEL.check(ctx.version)?;
            shunt.model = ShuntModel::Linear {
                b_per_section: ctx.reader.read_double("bPerSection")?,
                g_per_section: ctx.reader.read_double("gPerSection")?,
                maximum_section_count: ctx.reader.read_required_int("maximumSectionCount")?,
            };
            ctx.reader.read_end_node(name)?;
            has_model = true;
            Ok(true)
        }
        name if name == SHUNT_NON_LINEAR_MODEL.name => {
            SHUNT_NON_LINEAR_MODEL.check(ctx.version)?;
            let mut sections = Vec::new();
            while let Some(section) = ctx.reader.next_child()? {
                if section != SECTION {
                    return Err(IidmError::UnknownElement {
                        element: section,
                        parent: name.to_string(),
                    });
                }
                sections.push(ShuntSection {
                    b: ctx.reader.read_double("b")?,
                    g: ctx.reader.read_double_or("g", 0.0)?,
                });
                ctx.reader.read_end_node(SECTION)?;
            }
            shunt.model = ShuntModel::NonLinear(sections);
            has_model = true;
            Ok(true)
        }
        REGULATING_TERMINAL => {
            SHUNT_REGULATING_TERMINAL.check(ctx.version)?;
            let owner = shunt.identity.id.clone();
            shunt.regulating_terminal = Some(read_terminal_ref(ctx, REGULATING_TERMINAL, &owner)?);
            Ok(true)
        }
        _ => Ok(false),
    })?;
    if !has_model {
        return Err(IidmError::Parse(format!(
            "shunt '{}': no section model",
            shunt.identity.id
        )));
    }
    Ok(shunt)
}

fn write_svc(ctx: &mut WriterContext<'_>, svc: &StaticVarCompensator) -> IidmResult<()> {
    let id = svc.identity.id.as_str();
    write_identifiable(
        ctx,
        STATIC_VAR_COMPENSATOR,
        &svc.identity,
        |ctx| {
            ctx.writer.write_double_attribute("bMin", svc.b_min)?;
            ctx.writer.write_double_attribute("bMax", svc.b_max)?;
            SVC_VOLTAGE_SETPOINT.write_double(ctx.writer.as_mut(), ctx.version, svc.voltage_setpoint, f64::NAN)?;
            SVC_REACTIVE_POWER_SETPOINT.write_double(
                ctx.writer.as_mut(),
                ctx.version,
                svc.reactive_power_setpoint,
                f64::NAN,
            )?;
            ctx.writer
                .write_string_attribute("regulationMode", svc.regulation_mode.as_str())?;
            write_injection_terminal(ctx, id, &svc.terminal)
        },
        |ctx| write_regulating_terminal(ctx, id, svc.regulating_terminal.as_ref()),
    )
}

fn read_svc(ctx: &mut ReaderContext<'_>, voltage_level_id: &str) -> IidmResult<StaticVarCompensator> {
    let identity = read_identity(ctx, STATIC_VAR_COMPENSATOR)?;
    let terminal = read_injection_terminal(ctx, &identity.id, voltage_level_id)?;
    let mut svc = StaticVarCompensator {
        identity,
        terminal,
        b_min: ctx.reader.read_double("bMin")?,
        b_max: ctx.reader.read_double("bMax")?,
        voltage_setpoint: SVC_VOLTAGE_SETPOINT.read_double(ctx.reader(), ctx.version, f64::NAN)?,
        reactive_power_setpoint: SVC_REACTIVE_POWER_SETPOINT.read_double(ctx.reader(), ctx.version, f64::NAN)?,
        regulation_mode: read_enum::<SvcRegulationMode>(ctx.reader(), "regulationMode")?
            .unwrap_or(SvcRegulationMode::Off),
        regulating_terminal: None,
    };
    read_sub_elements(ctx, STATIC_VAR_COMPENSATOR, &mut svc, |ctx, child, svc| {
        if child != REGULATING_TERMINAL {
            return Ok(false);
        }
        let owner = svc.identity.id.clone();
        svc.regulating_terminal = Some(read_terminal_ref(ctx, REGULATING_TERMINAL, &owner)?);
        Ok(true)
    })?;
    Ok(svc)
}

fn write_dangling_line(ctx: &mut WriterContext<'_>, dl: &DanglingLine) -> IidmResult<()> {
    let id = dl.identity.id.as_str();
    write_identifiable(
        ctx,
        DANGLING_LINE,
        &dl.identity,
        |ctx| {
            ctx.writer.write_double_attribute("p0", dl.p0)?;
            ctx.writer.write_double_attribute("q0", dl.q0)?;
            ctx.writer.write_double_attribute("r", dl.r)?;
            ctx.writer.write_double_attribute("x", dl.x)?;
            ctx.writer.write_double_attribute("g", dl.g)?;
            ctx.writer.write_double_attribute("b", dl.b)?;
            let pairing_key = dl.pairing_key.as_deref().map(|key| ctx.anonymizer.anonymize(key));
            PAIRING_KEY.write_str(ctx.writer.as_mut(), ctx.version, pairing_key.as_deref())?;
            write_injection_terminal(ctx, id, &dl.terminal)?;
            limits::write_selected_group_id(ctx, "", &dl.limits)
        },
        |ctx| {
            if let Some(generation) = &dl.generation {
                DANGLING_LINE_GENERATION.check(ctx.version)?;
                ctx.start(GENERATION)?;
                ctx.writer.write_double_attribute("minP", generation.min_p)?;
                ctx.writer.write_double_attribute("maxP", generation.max_p)?;
                ctx.writer
                    .write_bool_attribute("voltageRegulationOn", generation.voltage_regulation_on)?;
                ctx.writer.write_double_attribute("targetP", generation.target_p)?;
                ctx.writer.write_double_attribute("targetV", generation.target_v)?;
                ctx.writer.write_double_attribute("targetQ", generation.target_q)?;
                reactive_limits::write(ctx, generation.reactive_limits.as_ref())?;
                ctx.end()?;
            }
            limits::write(ctx, DANGLING_LINE, "", &dl.limits)
        },
    )
}

fn read_generation(ctx: &mut ReaderContext<'_>) -> IidmResult<DanglingLineGeneration> {
    DANGLING_LINE_GENERATION.check(ctx.version)?;
    let mut generation = DanglingLineGeneration {
        min_p: ctx.reader.read_double_or("minP", -f64::MAX)?,
        max_p: ctx.reader.read_double_or("maxP", f64::MAX)?,
        target_p: ctx.reader.read_double("targetP")?,
        target_q: ctx.reader.read_double("targetQ")?,
        target_v: ctx.reader.read_double("targetV")?,
        voltage_regulation_on: ctx.reader.read_bool_or("voltageRegulationOn", false)?,
        reactive_limits: None,
    };
    while let Some(child) = ctx.reader.next_child()? {
        match reactive_limits::read(ctx, &child)? {
            Some(limits) => generation.reactive_limits = Some(limits),
            None => {
                return Err(IidmError::UnknownElement {
                    element: child,
                    parent: GENERATION.to_string(),
                })
            }
        }
    }
    Ok(generation)
}

fn read_dangling_line(ctx: &mut ReaderContext<'_>, voltage_level_id: &str) -> IidmResult<DanglingLine> {
    let identity = read_identity(ctx, DANGLING_LINE)?;
    let terminal = read_injection_terminal(ctx, &identity.id, voltage_level_id)?;
    let mut dl = DanglingLine::new(identity.id.clone(), terminal);
    dl.identity = identity;
    read_dangling_line_body(ctx, &mut dl)?;
    Ok(dl)
}

fn read_dangling_line_body(ctx: &mut ReaderContext<'_>, dl: &mut DanglingLine) -> IidmResult<()> {
    dl.p0 = ctx.reader.read_double("p0")?;
    dl.q0 = ctx.reader.read_double("q0")?;
    dl.r = ctx.reader.read_double_or("r", 0.0)?;
    dl.x = ctx.reader.read_double_or("x", 0.0)?;
    dl.g = ctx.reader.read_double_or("g", 0.0)?;
    dl.b = ctx.reader.read_double_or("b", 0.0)?;
    dl.pairing_key = PAIRING_KEY
        .read_str(ctx.reader(), ctx.version)
        .map(|key| ctx.anonymizer.deanonymize(&key))
        .transpose()?;
    let selected = limits::read_selected_group_id(ctx, "");
    read_sub_elements(ctx, DANGLING_LINE, dl, |ctx, child, dl| {
        if child == GENERATION {
            dl.generation = Some(read_generation(ctx)?);
            return Ok(true);
        }
        limits::read(ctx, DANGLING_LINE, "", child, &mut dl.limits)
    })?;
    let id = dl.identity.id.clone();
    limits::defer_selection(ctx, &id, None, selected);
    Ok(())
}

fn write_vsc(ctx: &mut WriterContext<'_>, vsc: &VscConverterStation) -> IidmResult<()> {
    write_identifiable(
        ctx,
        VSC_CONVERTER_STATION,
        &vsc.identity,
        |ctx| {
            ctx.writer.write_bool_attribute("voltageRegulatorOn", vsc.voltage_regulator_on)?;
            ctx.writer.write_double_attribute("lossFactor", vsc.loss_factor)?;
            ctx.writer.write_double_attribute("voltageSetpoint", vsc.voltage_setpoint)?;
            ctx.writer
                .write_double_attribute("reactivePowerSetpoint", vsc.reactive_power_setpoint)?;
            write_injection_terminal(ctx, &vsc.identity.id, &vsc.terminal)
        },
        |ctx| reactive_limits::write(ctx, vsc.reactive_limits.as_ref()),
    )
}

fn read_vsc(ctx: &mut ReaderContext<'_>, voltage_level_id: &str) -> IidmResult<VscConverterStation> {
    let identity = read_identity(ctx, VSC_CONVERTER_STATION)?;
    let terminal = read_injection_terminal(ctx, &identity.id, voltage_level_id)?;
    let mut vsc = VscConverterStation {
        identity,
        terminal,
        loss_factor: ctx.reader.read_double("lossFactor")?,
        voltage_regulator_on: ctx.reader.read_bool_or("voltageRegulatorOn", false)?,
        voltage_setpoint: ctx.reader.read_double("voltageSetpoint")?,
        reactive_power_setpoint: ctx.reader.read_double("reactivePowerSetpoint")?,
        reactive_limits: None,
    };
    read_sub_elements(ctx, VSC_CONVERTER_STATION, &mut vsc, |ctx, child, vsc| {
        let owner = vsc.identity.id.clone();
        read_regulation_child(ctx, child, &owner, None, &mut vsc.reactive_limits)
    })?;
    Ok(vsc)
}

fn write_lcc(ctx: &mut WriterContext<'_>, lcc: &LccConverterStation) -> IidmResult<()> {
    write_identifiable(
        ctx,
        LCC_CONVERTER_STATION,
        &lcc.identity,
        |ctx| {
            ctx.writer.write_double_attribute("lossFactor", lcc.loss_factor)?;
            ctx.writer.write_double_attribute("powerFactor", lcc.power_factor)?;
            write_injection_terminal(ctx, &lcc.identity.id, &lcc.terminal)
        },
        |_| Ok(()),
    )
}

fn read_lcc(ctx: &mut ReaderContext<'_>, voltage_level_id: &str) -> IidmResult<LccConverterStation> {
    let identity = read_identity(ctx, LCC_CONVERTER_STATION)?;
    let terminal = read_injection_terminal(ctx, &identity.id, voltage_level_id)?;
    let mut lcc = LccConverterStation {
        identity,
        terminal,
        loss_factor: ctx.reader.read_double("lossFactor")?,
        power_factor: ctx.reader.read_double("powerFactor")?,
    };
    crate::codec::read_leaf(ctx, LCC_CONVERTER_STATION, &mut lcc)?;
    Ok(lcc)
}
