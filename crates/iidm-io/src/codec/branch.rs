//! Lines and transformers.
//!
//! Two-winding and three-winding transformers sit in their substation, or directly under
//! the network (1.6+) when they have none. Lines are always network children. Each side
//! writes its terminal attributes suffixed by the side index and its limits after the
//! tap changers.

use iidm_core::{
    IidmError, IidmResult, Leg, Line, Network, Side, Terminal, ThreeWindingsTransformer, TwoWindingsTransformer,
};

use crate::codec::connectable::{read_branch_terminal, write_branch_terminal};
use crate::codec::{limits, ordered, read_identity, read_sub_elements, tap_changer, write_identifiable};
use crate::context::{ReaderContext, WriterContext};
use crate::gating::{
    LEG_B, LEG_G, LEG_PHASE_TAP_CHANGER, LEG_RATED_S, LEG_RATIO_TAP_CHANGER, NETWORK_THREE_WINDINGS_TRANSFORMER,
    NETWORK_TWO_WINDINGS_TRANSFORMER, RATED_S, RATED_U0,
};

pub(crate) const LINE: &str = "line";
pub(crate) const TWO_WINDINGS_TRANSFORMER: &str = "twoWindingsTransformer";
pub(crate) const THREE_WINDINGS_TRANSFORMER: &str = "threeWindingsTransformer";
const RATIO_TAP_CHANGER: &str = "ratioTapChanger";
const PHASE_TAP_CHANGER: &str = "phaseTapChanger";

const SIDES: [Side; 3] = [Side::One, Side::Two, Side::Three];

/// A branch is exported when every one of its terminals is.
fn is_exported(ctx: &WriterContext<'_>, terminals: &[&Terminal]) -> bool {
    terminals.iter().all(|t| ctx.test_terminal(t))
}

pub(crate) fn write_lines(ctx: &mut WriterContext<'_>) -> IidmResult<()> {
    let network = ctx.network;
    for line in ordered(ctx, network.iter::<Line>()) {
        if is_exported(ctx, &[&line.terminal1, &line.terminal2]) {
            write_line(ctx, line)?;
        }
    }
    Ok(())
}

fn write_line(ctx: &mut WriterContext<'_>, line: &Line) -> IidmResult<()> {
    let id = line.identity.id.as_str();
    write_identifiable(
        ctx,
        LINE,
        &line.identity,
        |ctx| {
            for (name, value) in [
                ("r", line.r),
                ("x", line.x),
                ("g1", line.g1),
                ("b1", line.b1),
                ("g2", line.g2),
                ("b2", line.b2),
            ] {
                ctx.writer.write_double_attribute(name, value)?;
            }
            write_branch_terminal(ctx, id, Side::One, &line.terminal1)?;
            write_branch_terminal(ctx, id, Side::Two, &line.terminal2)?;
            limits::write_selected_group_id(ctx, "1", &line.limits1)?;
            limits::write_selected_group_id(ctx, "2", &line.limits2)
        },
        |ctx| {
            limits::write(ctx, LINE, "1", &line.limits1)?;
            limits::write(ctx, LINE, "2", &line.limits2)
        },
    )
}

pub(crate) fn read_line(ctx: &mut ReaderContext<'_>, network: &mut Network) -> IidmResult<()> {
    let identity = read_identity(ctx, LINE)?;
    let id = identity.id.clone();
    let terminal1 = read_branch_terminal(ctx, &id, Side::One)?;
    let terminal2 = read_branch_terminal(ctx, &id, Side::Two)?;
    let mut line = Line::new(
        id.clone(),
        terminal1,
        terminal2,
        ctx.reader.read_double_or("r", 0.0)?,
        ctx.reader.read_double_or("x", 0.0)?,
    );
    line.identity = identity;
    line.g1 = ctx.reader.read_double_or("g1", 0.0)?;
    line.b1 = ctx.reader.read_double_or("b1", 0.0)?;
    line.g2 = ctx.reader.read_double_or("g2", 0.0)?;
    line.b2 = ctx.reader.read_double_or("b2", 0.0)?;
    let selected = [limits::read_selected_group_id(ctx, "1"), limits::read_selected_group_id(ctx, "2")];
    read_sub_elements(ctx, LINE, &mut line, |ctx, child, line| {
        if limits::read(ctx, LINE, "1", child, &mut line.limits1)? {
            return Ok(true);
        }
        limits::read(ctx, LINE, "2", child, &mut line.limits2)
    })?;
    network.add_equipment(line)?;
    let [selected1, selected2] = selected;
    limits::defer_selection(ctx, &id, Some(Side::One), selected1);
    limits::defer_selection(ctx, &id, Some(Side::Two), selected2);
    Ok(())
}

/// Transformers of `substation_id`, or the network-level ones when `None`.
pub(crate) fn write_transformers(ctx: &mut WriterContext<'_>, substation_id: Option<&str>) -> IidmResult<()> {
    let network = ctx.network;
    let two: Vec<&TwoWindingsTransformer> = ordered(
        ctx,
        network
            .iter::<TwoWindingsTransformer>()
            .filter(|t| t.substation_id.as_deref() == substation_id),
    )
    .into_iter()
    .filter(|t| is_exported(ctx, &[&t.terminal1, &t.terminal2]))
    .collect();
    if substation_id.is_none() && !two.is_empty() {
        NETWORK_TWO_WINDINGS_TRANSFORMER.check(ctx.version)?;
    }
    for transformer in two {
        write_two_windings(ctx, transformer)?;
    }

    let three: Vec<&ThreeWindingsTransformer> = ordered(
        ctx,
        network
            .iter::<ThreeWindingsTransformer>()
            .filter(|t| t.substation_id.as_deref() == substation_id),
    )
    .into_iter()
    .filter(|t| {
        let terminals: Vec<&Terminal> = t.legs.iter().map(|leg| &leg.terminal).collect();
        is_exported(ctx, &terminals)
    })
    .collect();
    if substation_id.is_none() && !three.is_empty() {
        NETWORK_THREE_WINDINGS_TRANSFORMER.check(ctx.version)?;
    }
    for transformer in three {
        write_three_windings(ctx, transformer)?;
    }
    Ok(())
}

/// Read transformer `element` of `substation_id`; `false` when `element` is not a
/// transformer.
pub(crate) fn read_transformer(
    ctx: &mut ReaderContext<'_>,
    element: &str,
    substation_id: Option<&str>,
    network: &mut Network,
) -> IidmResult<bool> {
    match element {
        TWO_WINDINGS_TRANSFORMER => {
            if substation_id.is_none() {
                NETWORK_TWO_WINDINGS_TRANSFORMER.check(ctx.version)?;
            }
            read_two_windings(ctx, substation_id, network)?;
            Ok(true)
        }
        THREE_WINDINGS_TRANSFORMER => {
            if substation_id.is_none() {
                NETWORK_THREE_WINDINGS_TRANSFORMER.check(ctx.version)?;
            }
            read_three_windings(ctx, substation_id, network)?;
            Ok(true)
        }
        _ => Ok(false),
    }
}

fn write_two_windings(ctx: &mut WriterContext<'_>, t: &TwoWindingsTransformer) -> IidmResult<()> {
    let id = t.identity.id.as_str();
    write_identifiable(
        ctx,
        TWO_WINDINGS_TRANSFORMER,
        &t.identity,
        |ctx| {
            for (name, value) in [
                ("r", t.r),
                ("x", t.x),
                ("g", t.g),
                ("b", t.b),
                ("ratedU1", t.rated_u1),
                ("ratedU2", t.rated_u2),
            ] {
                ctx.writer.write_double_attribute(name, value)?;
            }
            RATED_S.write_double(ctx.writer.as_mut(), ctx.version, t.rated_s, f64::NAN)?;
            write_branch_terminal(ctx, id, Side::One, &t.terminal1)?;
            write_branch_terminal(ctx, id, Side::Two, &t.terminal2)?;
            limits::write_selected_group_id(ctx, "1", &t.limits1)?;
            limits::write_selected_group_id(ctx, "2", &t.limits2)
        },
        |ctx| {
            if let Some(rtc) = &t.ratio_tap_changer {
                tap_changer::write_ratio(ctx, RATIO_TAP_CHANGER, id, rtc)?;
            }
            if let Some(ptc) = &t.phase_tap_changer {
                tap_changer::write_phase(ctx, PHASE_TAP_CHANGER, id, ptc)?;
            }
            limits::write(ctx, TWO_WINDINGS_TRANSFORMER, "1", &t.limits1)?;
            limits::write(ctx, TWO_WINDINGS_TRANSFORMER, "2", &t.limits2)
        },
    )
}

fn read_two_windings(ctx: &mut ReaderContext<'_>, substation_id: Option<&str>, network: &mut Network) -> IidmResult<()> {
    let identity = read_identity(ctx, TWO_WINDINGS_TRANSFORMER)?;
    let id = identity.id.clone();
    let terminal1 = read_branch_terminal(ctx, &id, Side::One)?;
    let terminal2 = read_branch_terminal(ctx, &id, Side::Two)?;
    let mut t = TwoWindingsTransformer::new(
        id.clone(),
        substation_id,
        terminal1,
        terminal2,
        ctx.reader.read_double("ratedU1")?,
        ctx.reader.read_double("ratedU2")?,
    );
    t.identity = identity;
    t.r = ctx.reader.read_double_or("r", 0.0)?;
    t.x = ctx.reader.read_double_or("x", 0.0)?;
    t.g = ctx.reader.read_double_or("g", 0.0)?;
    t.b = ctx.reader.read_double_or("b", 0.0)?;
    t.rated_s = RATED_S.read_double(ctx.reader(), ctx.version, f64::NAN)?;
    let selected = [limits::read_selected_group_id(ctx, "1"), limits::read_selected_group_id(ctx, "2")];
    read_sub_elements(ctx, TWO_WINDINGS_TRANSFORMER, &mut t, |ctx, child, t| {
        let owner = t.identity.id.clone();
        match child {
            RATIO_TAP_CHANGER => {
                t.ratio_tap_changer = Some(tap_changer::read_ratio(ctx, RATIO_TAP_CHANGER, &owner)?);
                Ok(true)
            }
            PHASE_TAP_CHANGER => {
                t.phase_tap_changer = Some(tap_changer::read_phase(ctx, PHASE_TAP_CHANGER, &owner)?);
                Ok(true)
            }
            _ => {
                if limits::read(ctx, TWO_WINDINGS_TRANSFORMER, "1", child, &mut t.limits1)? {
                    return Ok(true);
                }
                limits::read(ctx, TWO_WINDINGS_TRANSFORMER, "2", child, &mut t.limits2)
            }
        }
    })?;
    network.add_equipment(t)?;
    let [selected1, selected2] = selected;
    limits::defer_selection(ctx, &id, Some(Side::One), selected1);
    limits::defer_selection(ctx, &id, Some(Side::Two), selected2);
    Ok(())
}

fn write_three_windings(ctx: &mut WriterContext<'_>, t: &ThreeWindingsTransformer) -> IidmResult<()> {
    let id = t.identity.id.as_str();
    write_identifiable(
        ctx,
        THREE_WINDINGS_TRANSFORMER,
        &t.identity,
        |ctx| {
            let version = ctx.version;
            for (i, leg) in t.legs.iter().enumerate() {
                let n = i + 1;
                ctx.writer.write_double_attribute(&format!("r{n}"), leg.r)?;
                ctx.writer.write_double_attribute(&format!("x{n}"), leg.x)?;
                LEG_G[i].write_double(ctx.writer.as_mut(), version, leg.g, 0.0)?;
                LEG_B[i].write_double(ctx.writer.as_mut(), version, leg.b, 0.0)?;
                ctx.writer.write_double_attribute(&format!("ratedU{n}"), leg.rated_u)?;
                LEG_RATED_S[i].write_double(ctx.writer.as_mut(), version, leg.rated_s, f64::NAN)?;
            }
            RATED_U0.write_double(ctx.writer.as_mut(), version, t.rated_u0, t.legs[0].rated_u)?;
            for (leg, side) in t.legs.iter().zip(SIDES) {
                write_branch_terminal(ctx, id, side, &leg.terminal)?;
            }
            for (leg, side) in t.legs.iter().zip(SIDES) {
                limits::write_selected_group_id(ctx, &side.index().to_string(), &leg.limits)?;
            }
            Ok(())
        },
        |ctx| {
            for (i, leg) in t.legs.iter().enumerate() {
                if let Some(rtc) = &leg.ratio_tap_changer {
                    LEG_RATIO_TAP_CHANGER[i].check(ctx.version)?;
                    tap_changer::write_ratio(ctx, LEG_RATIO_TAP_CHANGER[i].name, id, rtc)?;
                }
                if let Some(ptc) = &leg.phase_tap_changer {
                    LEG_PHASE_TAP_CHANGER[i].check(ctx.version)?;
                    tap_changer::write_phase(ctx, LEG_PHASE_TAP_CHANGER[i].name, id, ptc)?;
                }
            }
            for (leg, side) in t.legs.iter().zip(SIDES) {
                limits::write(ctx, THREE_WINDINGS_TRANSFORMER, &side.index().to_string(), &leg.limits)?;
            }
            Ok(())
        },
    )
}

fn read_leg(ctx: &ReaderContext<'_>, owner: &str, side: Side) -> IidmResult<Leg> {
    let i = side.index() - 1;
    let n = side.index();
    let terminal = read_branch_terminal(ctx, owner, side)?;
    let mut leg = Leg::new(terminal, ctx.reader.read_double(&format!("ratedU{n}"))?);
    leg.r = ctx.reader.read_double_or(&format!("r{n}"), 0.0)?;
    leg.x = ctx.reader.read_double_or(&format!("x{n}"), 0.0)?;
    leg.g = LEG_G[i].read_double(ctx.reader(), ctx.version, 0.0)?;
    leg.b = LEG_B[i].read_double(ctx.reader(), ctx.version, 0.0)?;
    leg.rated_s = LEG_RATED_S[i].read_double(ctx.reader(), ctx.version, f64::NAN)?;
    Ok(leg)
}

/// Leg index of a `ratioTapChangerN` / `phaseTapChangerN` child.
fn leg_of(child: &str, base: &str) -> Option<usize> {
    match child.strip_prefix(base)? {
        "1" => Some(0),
        "2" => Some(1),
        "3" => Some(2),
        _ => None,
    }
}

fn read_three_windings(ctx: &mut ReaderContext<'_>, substation_id: Option<&str>, network: &mut Network) -> IidmResult<()> {
    let identity = read_identity(ctx, THREE_WINDINGS_TRANSFORMER)?;
    let id = identity.id.clone();
    let legs = [
        read_leg(ctx, &id, Side::One)?,
        read_leg(ctx, &id, Side::Two)?,
        read_leg(ctx, &id, Side::Three)?,
    ];
    let rated_u0 = RATED_U0.read_double(ctx.reader(), ctx.version, legs[0].rated_u)?;
    let selected = SIDES.map(|side| limits::read_selected_group_id(ctx, &side.index().to_string()));
    let mut t = ThreeWindingsTransformer {
        identity,
        substation_id: substation_id.map(str::to_string),
        rated_u0,
        legs,
    };
    read_sub_elements(ctx, THREE_WINDINGS_TRANSFORMER, &mut t, |ctx, child, t| {
        let owner = t.identity.id.clone();
        if let Some(i) = leg_of(child, RATIO_TAP_CHANGER) {
            LEG_RATIO_TAP_CHANGER[i].check(ctx.version)?;
            t.legs[i].ratio_tap_changer = Some(tap_changer::read_ratio(ctx, child, &owner)?);
            return Ok(true);
        }
        if let Some(i) = leg_of(child, PHASE_TAP_CHANGER) {
            LEG_PHASE_TAP_CHANGER[i].check(ctx.version)?;
            t.legs[i].phase_tap_changer = Some(tap_changer::read_phase(ctx, child, &owner)?);
            return Ok(true);
        }
        for (leg, side) in t.legs.iter_mut().zip(SIDES) {
            if limits::read(ctx, THREE_WINDINGS_TRANSFORMER, &side.index().to_string(), child, &mut leg.limits)? {
                return Ok(true);
            }
        }
        Ok(false)
    })?;
    if t.legs.iter().any(|leg| leg.rated_u.is_nan()) {
        return Err(IidmError::Parse(format!("three windings transformer '{id}': missing ratedU")));
    }
    network.add_equipment(t)?;
    for (side, group) in SIDES.into_iter().zip(selected) {
        limits::defer_selection(ctx, &id, Some(side), group);
    }
    Ok(())
}
