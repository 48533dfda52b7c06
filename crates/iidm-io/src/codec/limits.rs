//! Operational limits of branch sides, transformer legs and dangling lines
//!
//! From 1.12 every group is written as `operationalLimitsGroup{side}` with its `id`, and
//! the owner carries `selectedOperationalLimitsGroupId{side}`. Earlier versions only know
//! one anonymous set of limits per side (`currentLimits{side}`, ...), which is the
//! selected group; any other non-empty group cannot be expressed and fails the export.

use iidm_core::limits::LimitType;
use iidm_core::{Equipment, IidmError, IidmResult, Limits, LoadingLimits, Side, TemporaryLimit};

use crate::context::{ReaderContext, WriterContext};
use crate::gating::{
    self, GateViolation, ACTIVE_POWER_LIMITS, APPARENT_POWER_LIMITS, OPERATIONAL_LIMITS_GROUP,
    SELECTED_OPERATIONAL_LIMITS_GROUP_ID,
};
use crate::version::IidmVersion;

const TEMPORARY_LIMIT: &str = "temporaryLimit";
const GROUP: &str = "operationalLimitsGroup";

fn type_gate(kind: LimitType) -> Option<gating::Gate<'static>> {
    match kind {
        LimitType::ActivePower => Some(ACTIVE_POWER_LIMITS),
        LimitType::ApparentPower => Some(APPARENT_POWER_LIMITS),
        LimitType::Current => None,
    }
}

pub(crate) fn write_selected_group_id(ctx: &mut WriterContext<'_>, suffix: &str, limits: &Limits) -> IidmResult<()> {
    if !SELECTED_OPERATIONAL_LIMITS_GROUP_ID.is_supported(ctx.version) {
        return Ok(());
    }
    match &limits.selected {
        Some(selected) => ctx
            .writer
            .write_string_attribute(&format!("{}{suffix}", SELECTED_OPERATIONAL_LIMITS_GROUP_ID.name), selected),
        None => Ok(()),
    }
}

/// Write the limits elements of one side.
pub(crate) fn write(ctx: &mut WriterContext<'_>, owner: &str, suffix: &str, limits: &Limits) -> IidmResult<()> {
    if limits.is_empty() {
        return Ok(());
    }
    if OPERATIONAL_LIMITS_GROUP.is_supported(ctx.version) {
        let mut groups: Vec<_> = limits.groups.iter().collect();
        if ctx.options.sorted {
            groups.sort_by(|a, b| a.id.cmp(&b.id));
        }
        for group in groups {
            ctx.start(&format!("{GROUP}{suffix}"))?;
            ctx.writer.write_string_attribute("id", &group.id)?;
            for kind in LimitType::ALL {
                if let Some(loading) = group.limits(kind) {
                    write_loading_limits(ctx, kind.element(), loading)?;
                }
            }
            ctx.end()?;
        }
        return Ok(());
    }

    if limits.has_unselected_limits() {
        return Err(OPERATIONAL_LIMITS_GROUP
            .on(owner)
            .error(ctx.version, GateViolation::NotSupported));
    }
    let Some(group) = limits.selected_group() else {
        return Ok(());
    };
    for kind in LimitType::ALL {
        let Some(loading) = group.limits(kind) else {
            continue;
        };
        if let Some(gate) = type_gate(kind) {
            gate.on(owner).check(ctx.version)?;
        }
        write_loading_limits(ctx, &format!("{}{suffix}", kind.element()), loading)?;
    }
    Ok(())
}

fn write_loading_limits(ctx: &mut WriterContext<'_>, element: &str, limits: &LoadingLimits) -> IidmResult<()> {
    ctx.start(element)?;
    ctx.writer.write_double_attribute("permanentLimit", limits.permanent_limit)?;
    for temporary in temporary_limits_in_order(limits, ctx.version, ctx.options.sorted) {
        ctx.start(TEMPORARY_LIMIT)?;
        ctx.writer.write_string_attribute("name", &temporary.name)?;
        if temporary.acceptable_duration != i32::MAX {
            ctx.writer
                .write_int_attribute("acceptableDuration", temporary.acceptable_duration)?;
        }
        if temporary.value != f64::MAX {
            ctx.writer.write_double_attribute("value", temporary.value)?;
        }
        ctx.writer
            .write_bool_attribute_with_default("fictitious", temporary.fictitious, false)?;
        ctx.end()?;
    }
    ctx.end()
}

/// Descending acceptable duration up to 1.11, ascending from 1.12, by name when sorted.
fn temporary_limits_in_order(limits: &LoadingLimits, version: IidmVersion, sorted: bool) -> Vec<&TemporaryLimit> {
    let mut temporaries: Vec<&TemporaryLimit> = limits.temporary_limits().iter().collect();
    if sorted {
        temporaries.sort_by(|a, b| a.name.cmp(&b.name));
    } else if version.is_at_least(IidmVersion::V_1_12) {
        temporaries.reverse();
    }
    temporaries
}

/// Read `element` into `limits` if it is a limits element of side `suffix`. Returns `false`
/// for any other element name.
pub(crate) fn read(
    ctx: &mut ReaderContext<'_>,
    owner: &str,
    suffix: &str,
    element: &str,
    limits: &mut Limits,
) -> IidmResult<bool> {
    let Some(base) = element.strip_suffix(suffix) else {
        return Ok(false);
    };
    if base == GROUP {
        OPERATIONAL_LIMITS_GROUP.on(owner).check(ctx.version)?;
        let id = ctx.reader.read_required_string("id")?;
        limits.group_or_create(&id);
        while let Some(child) = ctx.reader.next_child()? {
            let Some(kind) = LimitType::from_element(&child) else {
                return Err(IidmError::UnknownElement {
                    element: child,
                    parent: element.to_string(),
                });
            };
            let loading = read_loading_limits(ctx, &child)?;
            limits.group_or_create(&id).set_limits(kind, loading);
        }
        return Ok(true);
    }
    let Some(kind) = LimitType::from_element(base) else {
        return Ok(false);
    };
    if let Some(gate) = type_gate(kind) {
        gate.on(owner).check(ctx.version)?;
    }
    let loading = read_loading_limits(ctx, element)?;
    limits.selected_group_or_default().set_limits(kind, loading);
    Ok(true)
}

fn read_loading_limits(ctx: &mut ReaderContext<'_>, element: &str) -> IidmResult<LoadingLimits> {
    let mut limits = LoadingLimits::new(ctx.reader.read_double("permanentLimit")?);
    while let Some(child) = ctx.reader.next_child()? {
        if child != TEMPORARY_LIMIT {
            return Err(IidmError::UnknownElement {
                element: child,
                parent: element.to_string(),
            });
        }
        let mut temporary = TemporaryLimit::new(
            ctx.reader.read_required_string("name")?,
            ctx.reader.read_int("acceptableDuration")?.unwrap_or(i32::MAX),
            ctx.reader.read_double_or("value", f64::MAX)?,
        );
        temporary.fictitious = ctx.reader.read_bool_or("fictitious", false)?;
        ctx.reader.read_end_node(TEMPORARY_LIMIT)?;
        limits.add_temporary_limit(temporary)?;
    }
    Ok(limits)
}

/// `selectedOperationalLimitsGroupId{suffix}` of the current element, when the version has it.
pub(crate) fn read_selected_group_id(ctx: &ReaderContext<'_>, suffix: &str) -> Option<String> {
    if !SELECTED_OPERATIONAL_LIMITS_GROUP_ID.is_supported(ctx.version) {
        return None;
    }
    ctx.reader
        .read_string(&format!("{}{suffix}", SELECTED_OPERATIONAL_LIMITS_GROUP_ID.name))
}

fn limits_mut(equipment: &mut Equipment, side: Option<Side>) -> Option<&mut Limits> {
    match (equipment, side) {
        (Equipment::DanglingLine(dl), None) => Some(&mut dl.limits),
        (Equipment::Line(line), Some(Side::One)) => Some(&mut line.limits1),
        (Equipment::Line(line), Some(Side::Two)) => Some(&mut line.limits2),
        (Equipment::TwoWindingsTransformer(t), Some(Side::One)) => Some(&mut t.limits1),
        (Equipment::TwoWindingsTransformer(t), Some(Side::Two)) => Some(&mut t.limits2),
        (Equipment::ThreeWindingsTransformer(t), Some(side)) => Some(&mut t.legs[side.index() - 1].limits),
        _ => None,
    }
}

/// Queue the selection of `group` on one side of `equipment_id`; groups are only complete
/// once the owner element has been read.
pub(crate) fn defer_selection(ctx: &mut ReaderContext<'_>, equipment_id: &str, side: Option<Side>, group: Option<String>) {
    let Some(group) = group else {
        return;
    };
    let equipment_id = equipment_id.to_string();
    ctx.deferred.register(move |network| {
        let limits = network
            .equipment_by_id_mut(&equipment_id)
            .and_then(|e| limits_mut(e, side))
            .ok_or_else(|| IidmError::DanglingReference(equipment_id.clone()))?;
        limits.select(&group)
    });
}
