//! `tieLine`
//!
//! Up to 1.9 a tie line carries both dangling lines inline: each half is a set of
//! attributes suffixed `_1` / `_2` plus the branch terminal of that side, and the halves'
//! limits are the tie line limits. From 1.10 the dangling lines are regular voltage level
//! children and the tie line only references them.

use iidm_core::{DanglingLine, Equipment, IidmError, IidmResult, Network, Side, TieLine};

use crate::codec::connectable::{read_branch_terminal, write_branch_terminal};
use crate::codec::{limits, ordered, read_identity, read_leaf, read_sub_elements, write_identifiable};
use crate::context::{ReaderContext, WriterContext};
use crate::gating::{
    TIE_LINE_DANGLING_LINE_ID, TIE_LINE_HALF, TIE_LINE_HALF_ALIAS, TIE_LINE_HALF_FICTITIOUS, TIE_LINE_HALF_GENERATION,
    TIE_LINE_HALF_P0, TIE_LINE_HALF_PROPERTY, TIE_LINE_HALF_Q0, TIE_LINE_XNODE_POWER,
};
use crate::version::IidmVersion;

pub(crate) const TIE_LINE: &str = "tieLine";
const UCTE_XNODE_CODE: &str = "ucteXnodeCode";

/// Whether dangling line `id` is written inside its tie line rather than in its voltage level.
pub(crate) fn written_inline(ctx: &WriterContext<'_>, dangling_line_id: &str) -> bool {
    TIE_LINE_HALF.is_supported(ctx.version)
        && ctx
            .network
            .tie_line_of(dangling_line_id)
            .is_some_and(|tl| ctx.test_equipment_id(&tl.identity.id))
}

fn halves<'n>(network: &'n Network, tie_line: &TieLine) -> IidmResult<[&'n DanglingLine; 2]> {
    let get = |id: &str| {
        network.get::<DanglingLine>(id).ok_or_else(|| {
            IidmError::Network(format!(
                "tie line '{}': dangling line '{id}' not found",
                tie_line.identity.id
            ))
        })
    };
    Ok([get(&tie_line.dangling_line1)?, get(&tie_line.dangling_line2)?])
}

pub(crate) fn write_tie_lines(ctx: &mut WriterContext<'_>) -> IidmResult<()> {
    let network = ctx.network;
    for tie_line in ordered(ctx, network.iter::<TieLine>()) {
        if !ctx.test_equipment_id(&tie_line.identity.id) || ctx.is_exported(&tie_line.identity.id) {
            continue;
        }
        if TIE_LINE_HALF.is_supported(ctx.version) {
            write_legacy(ctx, tie_line)?;
        } else {
            write_references(ctx, tie_line)?;
        }
    }
    Ok(())
}

fn write_references(ctx: &mut WriterContext<'_>, tie_line: &TieLine) -> IidmResult<()> {
    write_identifiable(
        ctx,
        TIE_LINE,
        &tie_line.identity,
        |ctx| {
            ctx.write_id("danglingLineId1", &tie_line.dangling_line1)?;
            ctx.write_id("danglingLineId2", &tie_line.dangling_line2)
        },
        |_| Ok(()),
    )
}

/// Fail on half content the inline attributes cannot carry.
fn check_half(version: IidmVersion, index: usize, dl: &DanglingLine) -> IidmResult<()> {
    let set = |value: f64| value != 0.0 && !value.is_nan();
    TIE_LINE_HALF_GENERATION[index].check_absent(version, dl.generation.is_some())?;
    TIE_LINE_HALF_P0[index].check_absent(version, set(dl.p0))?;
    TIE_LINE_HALF_Q0[index].check_absent(version, set(dl.q0))?;
    TIE_LINE_HALF_ALIAS[index].check_absent(version, !dl.identity.aliases.is_empty())?;
    TIE_LINE_HALF_PROPERTY[index].check_absent(version, !dl.identity.properties.is_empty())
}

fn write_legacy(ctx: &mut WriterContext<'_>, tie_line: &TieLine) -> IidmResult<()> {
    let id = tie_line.identity.id.as_str();
    let [dl1, dl2] = halves(ctx.network, tie_line)?;
    check_half(ctx.version, 0, dl1)?;
    check_half(ctx.version, 1, dl2)?;
    write_identifiable(
        ctx,
        TIE_LINE,
        &tie_line.identity,
        |ctx| {
            let pairing_key = dl1.pairing_key.as_deref().or(dl2.pairing_key.as_deref());
            ctx.write_optional_id(UCTE_XNODE_CODE, pairing_key)?;
            for (n, dl) in [(1, dl1), (2, dl2)] {
                ctx.write_id(&format!("id_{n}"), &dl.identity.id)?;
                ctx.write_optional_id(&format!("name_{n}"), dl.identity.name.as_deref())?;
                if dl.identity.fictitious {
                    TIE_LINE_HALF_FICTITIOUS.check(ctx.version)?;
                    ctx.writer.write_bool_attribute(&format!("fictitious_{n}"), true)?;
                }
                let (g, b) = (dl.g / 2.0, dl.b / 2.0);
                for (name, value) in [("r", dl.r), ("x", dl.x), ("g1", g), ("b1", b), ("g2", g), ("b2", b)] {
                    ctx.writer.write_double_attribute(&format!("{name}_{n}"), value)?;
                }
            }
            write_branch_terminal(ctx, id, Side::One, &dl1.terminal)?;
            write_branch_terminal(ctx, id, Side::Two, &dl2.terminal)
        },
        |ctx| {
            limits::write(ctx, TIE_LINE, "1", &dl1.limits)?;
            limits::write(ctx, TIE_LINE, "2", &dl2.limits)
        },
    )?;
    ctx.mark_exported(&dl1.identity.id);
    ctx.mark_exported(&dl2.identity.id);
    Ok(())
}

pub(crate) fn read(ctx: &mut ReaderContext<'_>, network: &mut Network) -> IidmResult<()> {
    if TIE_LINE_HALF.is_supported(ctx.version) {
        read_legacy(ctx, network)
    } else {
        read_references(ctx)
    }
}

fn read_references(ctx: &mut ReaderContext<'_>) -> IidmResult<()> {
    TIE_LINE_DANGLING_LINE_ID.check(ctx.version)?;
    let identity = read_identity(ctx, TIE_LINE)?;
    let mut tie_line = TieLine::new(
        identity.id.clone(),
        ctx.read_id("danglingLineId1")?,
        ctx.read_id("danglingLineId2")?,
    );
    tie_line.identity = identity;
    read_leaf(ctx, TIE_LINE, &mut tie_line)?;
    ctx.deferred
        .register(move |network| network.add_equipment(Equipment::TieLine(tie_line)));
    Ok(())
}

fn read_half(ctx: &mut ReaderContext<'_>, owner: &str, side: Side, pairing_key: Option<&str>) -> IidmResult<DanglingLine> {
    let n = side.index();
    let attribute = |name: &str| format!("{name}_{n}");
    let terminal = read_branch_terminal(ctx, owner, side)?;
    let mut dl = DanglingLine::new(ctx.read_id(&attribute("id"))?, terminal);
    dl.identity.name = ctx.read_optional_id(&attribute("name"))?;
    if TIE_LINE_HALF_FICTITIOUS.is_supported(ctx.version) {
        dl.identity.fictitious = ctx.reader.read_bool_or(&attribute("fictitious"), false)?;
    }
    dl.r = ctx.reader.read_required_double(&attribute("r"))?;
    dl.x = ctx.reader.read_required_double(&attribute("x"))?;
    dl.g = ctx.reader.read_required_double(&attribute("g1"))? + ctx.reader.read_required_double(&attribute("g2"))?;
    dl.b = ctx.reader.read_required_double(&attribute("b1"))? + ctx.reader.read_required_double(&attribute("b2"))?;
    dl.pairing_key = pairing_key.map(str::to_string);

    if TIE_LINE_XNODE_POWER.is_supported(ctx.version) {
        let p = ctx.reader.read_double(&attribute("xnodeP"))?;
        let q = ctx.reader.read_double(&attribute("xnodeQ"))?;
        if !(p.is_nan() && q.is_nan()) {
            let owner = owner.to_string();
            ctx.deferred.register(move |_| {
                tracing::info!(tie_line = %owner, side = n, p, q, "boundary power of tie line half is ignored");
                Ok(())
            });
        }
    }
    Ok(dl)
}

fn read_legacy(ctx: &mut ReaderContext<'_>, network: &mut Network) -> IidmResult<()> {
    let identity = read_identity(ctx, TIE_LINE)?;
    let id = identity.id.clone();
    let pairing_key = ctx.read_optional_id(UCTE_XNODE_CODE)?;
    let mut halves = [
        read_half(ctx, &id, Side::One, pairing_key.as_deref())?,
        read_half(ctx, &id, Side::Two, pairing_key.as_deref())?,
    ];
    let mut tie_line = TieLine::new(id, halves[0].identity.id.clone(), halves[1].identity.id.clone());
    tie_line.identity = identity;
    read_sub_elements(ctx, TIE_LINE, &mut tie_line, |ctx, child, _| {
        for (dl, suffix) in halves.iter_mut().zip(["1", "2"]) {
            if limits::read(ctx, TIE_LINE, suffix, child, &mut dl.limits)? {
                return Ok(true);
            }
        }
        Ok(false)
    })?;
    let [dl1, dl2] = halves;
    network.add_equipment(dl1)?;
    network.add_equipment(dl2)?;
    network.add_equipment(tie_line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::tests::{reader_over, write_with};
    use crate::codec::voltage_level;
    use crate::extensions::ExtensionRegistry;
    use crate::options::{ExportOptions, ImportOptions};
    use crate::tree::TreeDataFormat;
    use crate::version::IidmVersion;
    use iidm_core::{fixtures, Alias, DanglingLineGeneration};

    #[test]
    fn test_legacy_tie_line_carries_halves() {
        let network = fixtures::with_tie_line().expect("fixture");
        let options = ExportOptions::default().with_version(IidmVersion::V_1_9);
        let xml = write_with(&network, &options, write_tie_lines).expect("write");
        assert!(xml.contains(r#"ucteXnodeCode="XNODE1" id_1="DL1""#), "{xml}");
        assert!(xml.contains(r#"id_2="DL2""#));
        assert!(xml.contains(r#"voltageLevelId1="VL1" bus1="B2" connectableBus1="B2""#));
        assert!(xml.contains(r#"<iidm:currentLimits1 permanentLimit="800"/>"#));

        let vl1 = network.voltage_level("VL1").expect("VL1");
        let in_vl = write_with(&network, &options, |ctx| voltage_level::write(ctx, vl1)).expect("write");
        assert!(!in_vl.contains("danglingLine"), "{in_vl}");
    }

    #[test]
    fn test_tie_line_references_from_1_10() {
        let network = fixtures::with_tie_line().expect("fixture");
        let xml = write_with(&network, &ExportOptions::default(), write_tie_lines).expect("write");
        assert!(xml.contains(r#"<iidm:tieLine id="TL1" danglingLineId1="DL1" danglingLineId2="DL2"/>"#), "{xml}");
    }

    #[test]
    fn test_read_legacy_halves() {
        let xml = r#"<network xmlns="urn:x">
            <tieLine id="TLX" ucteXnodeCode="XN" id_1="H1" r_1="1" x_1="10" g1_1="1e-6" b1_1="0" g2_1="1e-6" b2_1="0"
                id_2="H2" r_2="2" x_2="20" g1_2="0" b1_2="0" g2_2="0" b2_2="0" xnodeP_1="5" xnodeQ_1="1"
                voltageLevelId1="VL1" bus1="B1" connectableBus1="B1"
                voltageLevelId2="VL2" bus2="B3" connectableBus2="B3">
              <currentLimits2 permanentLimit="640"/>
            </tieLine></network>"#;
        let options = ImportOptions::default();
        let registry = ExtensionRegistry::default();
        let mut ctx = reader_over(xml, TreeDataFormat::Xml, IidmVersion::V_1_4, &options, &registry);
        ctx.reader.next_child().expect("child").expect("tie line");
        let mut network = fixtures::two_substations().expect("fixture");
        read(&mut ctx, &mut network).expect("read");
        assert_eq!(ctx.deferred.len(), 1);
        ctx.deferred.drain(&mut network).expect("drain");

        let tie_line = network.get::<TieLine>("TLX").expect("TLX");
        assert_eq!(tie_line.dangling_line2, "H2");
        let h1 = network.get::<DanglingLine>("H1").expect("H1");
        assert_eq!(h1.g, 2e-6);
        assert_eq!(h1.pairing_key.as_deref(), Some("XN"));
        let h2 = network.get::<DanglingLine>("H2").expect("H2");
        assert!(!h2.limits.is_empty());
        assert!(h1.limits.is_empty());
    }

    #[test]
    fn test_unknown_dangling_line_reference_fails_on_drain() {
        let xml = r#"<network xmlns="urn:x"><tieLine id="TLX" danglingLineId1="DL1" danglingLineId2="NOPE"/></network>"#;
        let options = ImportOptions::default();
        let registry = ExtensionRegistry::default();
        let mut ctx = reader_over(xml, TreeDataFormat::Xml, IidmVersion::CURRENT, &options, &registry);
        ctx.reader.next_child().expect("child").expect("tie line");
        let mut network = fixtures::with_tie_line().expect("fixture");
        read(&mut ctx, &mut network).expect("read");
        assert!(ctx.deferred.drain(&mut network).is_err());
    }

    #[test]
    fn test_legacy_half_splits_shunt_admittance() {
        let network = fixtures::with_tie_line().expect("fixture");
        let options = ExportOptions::default().with_version(IidmVersion::V_1_9);
        let xml = write_with(&network, &options, write_tie_lines).expect("write");
        assert!(xml.contains(r#"g1_1="5e-7" b1_1="5e-6" g2_1="5e-7" b2_1="5e-6""#), "{xml}");
        assert!(xml.contains(r#"g1_2="1e-6" b1_2="1e-5" g2_2="1e-6" b2_2="1e-5""#), "{xml}");
    }

    #[test]
    fn test_legacy_half_content_needs_1_10() {
        let cases: [(&str, fn(&mut DanglingLine)); 5] = [
            ("generation_1", |dl| {
                dl.generation = Some(DanglingLineGeneration {
                    min_p: 0.0,
                    max_p: 10.0,
                    target_p: 5.0,
                    target_q: 0.0,
                    target_v: f64::NAN,
                    voltage_regulation_on: false,
                    reactive_limits: None,
                })
            }),
            ("p0_1", |dl| dl.p0 = 7.0),
            ("q0_1", |dl| dl.q0 = -2.0),
            ("alias_1", |dl| dl.identity.aliases.push(Alias {
                    alias: "DL1-alias".to_string(),
                    alias_type: None,
                })),
            ("property_1", |dl| {
                dl.identity.properties.insert("owner".to_string(), "rte".to_string());
            }),
        ];
        let options = ExportOptions::default().with_version(IidmVersion::V_1_9);
        for (attribute, edit) in cases {
            let mut network = fixtures::with_tie_line().expect("fixture");
            edit(network.get_mut::<DanglingLine>("DL1").expect("DL1"));
            let err = write_with(&network, &options, write_tie_lines).unwrap_err();
            assert!(matches!(err, IidmError::UnsupportedVersion(_)), "{err}");
            let message = err.to_string();
            assert!(message.contains(&format!("tieLine.{attribute} is not null and not supported")), "{message}");
            assert!(message.ends_with(">= 1.10"), "{message}");

            let xml = write_with(&network, &ExportOptions::default(), write_tie_lines).expect("write");
            assert!(xml.contains(r#"danglingLineId1="DL1""#), "{xml}");
        }
    }

    #[test]
    fn test_truncated_legacy_half_rejected() {
        let xml = r#"<network xmlns="urn:x">
            <tieLine id="TLX" id_1="H1" r_1="1" x_1="10" g1_1="0" b1_1="0" g2_1="0"
                id_2="H2" r_2="2" x_2="20" g1_2="0" b1_2="0" g2_2="0" b2_2="0"
                voltageLevelId1="VL1" bus1="B1" connectableBus1="B1"
                voltageLevelId2="VL2" bus2="B3" connectableBus2="B3"/></network>"#;
        let options = ImportOptions::default();
        let registry = ExtensionRegistry::default();
        let mut ctx = reader_over(xml, TreeDataFormat::Xml, IidmVersion::V_1_9, &options, &registry);
        ctx.reader.next_child().expect("child").expect("tie line");
        let mut network = fixtures::two_substations().expect("fixture");
        let err = read(&mut ctx, &mut network).unwrap_err();
        assert_eq!(err.to_string(), "Parse error: missing attribute 'b2_1'");
        assert!(network.get::<DanglingLine>("H1").is_none());
    }
}
