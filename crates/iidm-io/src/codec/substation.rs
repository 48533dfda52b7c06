//! `substation`: country, TSO and geographical tags, then its voltage levels and the
//! transformers it holds.

use iidm_core::{IidmResult, Network, Substation};

use crate::codec::{branch, read_contained_elements, read_identity, voltage_level, write_identifiable};
use crate::context::{ReaderContext, WriterContext};

pub(crate) const SUBSTATION: &str = "substation";

/// Whether `substation` has at least one voltage level in the export.
pub(crate) fn is_exported(ctx: &WriterContext<'_>, substation: &Substation) -> bool {
    ctx.network
        .voltage_levels_of(&substation.identity.id)
        .any(|vl| ctx.filter.test_voltage_level(&ctx.views, &vl.identity.id))
}

pub(crate) fn write(ctx: &mut WriterContext<'_>, substation: &Substation) -> IidmResult<()> {
    let network = ctx.network;
    write_identifiable(
        ctx,
        SUBSTATION,
        &substation.identity,
        |ctx| {
            if let Some(country) = &substation.country {
                let country = ctx.anonymizer.anonymize_country(country)?;
                ctx.writer.write_string_attribute("country", &country)?;
            }
            ctx.write_optional_id("tso", substation.tso.as_deref())?;
            if !substation.geographical_tags.is_empty() {
                let tags: Vec<String> = substation
                    .geographical_tags
                    .iter()
                    .map(|tag| ctx.anonymizer.anonymize(tag))
                    .collect();
                ctx.writer.write_string_attribute("geographicalTags", &tags.join(","))?;
            }
            Ok(())
        },
        |ctx| {
            let id = substation.identity.id.as_str();
            let mut voltage_levels: Vec<_> = network
                .voltage_levels_of(id)
                .filter(|vl| ctx.filter.test_voltage_level(&ctx.views, &vl.identity.id))
                .collect();
            if ctx.options.sorted {
                voltage_levels.sort_by(|a, b| a.identity.id.cmp(&b.identity.id));
            }
            for vl in voltage_levels {
                voltage_level::write(ctx, vl)?;
            }
            branch::write_transformers(ctx, Some(id))
        },
    )
}

pub(crate) fn read(ctx: &mut ReaderContext<'_>, network: &mut Network) -> IidmResult<()> {
    let identity = read_identity(ctx, SUBSTATION)?;
    let id = identity.id.clone();
    let mut substation = Substation::new(id.clone());
    substation.identity = identity;
    substation.country = match ctx.reader.read_string("country") {
        Some(token) => Some(ctx.anonymizer.deanonymize_country(&token)?),
        None => None,
    };
    substation.tso = ctx.read_optional_id("tso")?;
    if let Some(tags) = ctx.reader.read_string("geographicalTags") {
        substation.geographical_tags = tags
            .split(',')
            .map(str::trim)
            .filter(|tag| !tag.is_empty())
            .map(|tag| ctx.anonymizer.deanonymize(tag))
            .collect::<IidmResult<_>>()?;
    }
    network.add_substation(substation)?;

    read_contained_elements(ctx, SUBSTATION, &id, network, |ctx, child, network| match child {
        voltage_level::VOLTAGE_LEVEL => {
            voltage_level::read(ctx, Some(&id), network)?;
            Ok(true)
        }
        other => branch::read_transformer(ctx, other, Some(&id), network),
    })
}
