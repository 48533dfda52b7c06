//! Entity codecs
//!
//! Every identifiable is written the same way: open its element, write `id`, `name` and
//! `fictitious`, let the kind write its root attributes, write aliases and properties,
//! let the kind write its sub-elements, close the element. [`write_identifiable`] owns
//! that sequence and takes the two kind-specific steps as callbacks.
//!
//! Reading comes in two shapes:
//!
//! - **complex** ([`read_sub_elements`]): root attributes and children are collected into
//!   the kind's model struct, which is added to the network once the element is complete.
//!   Used by all equipment.
//! - **simple** ([`read_contained_elements`]): the container is added to the network right
//!   after its root attributes, then its children are read with network access. Used by
//!   substations and voltage levels, whose children are themselves identifiables.
//!
//! | Module | Elements |
//! |--------|----------|
//! | [`substation`] | `substation` |
//! | [`voltage_level`] | `voltageLevel`, topologies, `bus`, `switch`, `busbarSection` |
//! | [`injection`] | `generator`, `battery`, `load`, `shunt`, `staticVarCompensator`, `danglingLine`, converter stations |
//! | [`branch`] | `line`, `twoWindingsTransformer`, `threeWindingsTransformer` |
//! | [`tie_line`] | `tieLine` (inline halves up to 1.9, references from 1.10) |
//! | [`hvdc`] | `hvdcLine` |

use iidm_core::{Identifiable, Identity, IidmError, IidmResult, Network};

use crate::context::{ReaderContext, WriterContext};
use crate::gating;

pub mod branch;
pub mod connectable;
pub mod hvdc;
pub mod injection;
pub mod limits;
pub mod reactive_limits;
pub mod substation;
pub mod tap_changer;
pub mod tie_line;
pub mod voltage_level;

const ALIAS: &str = "alias";
const PROPERTY: &str = "property";

/// Write one identifiable element.
pub(crate) fn write_identifiable<'a>(
    ctx: &mut WriterContext<'a>,
    element: &str,
    identity: &Identity,
    write_root_attributes: impl FnOnce(&mut WriterContext<'a>) -> IidmResult<()>,
    write_sub_elements: impl FnOnce(&mut WriterContext<'a>) -> IidmResult<()>,
) -> IidmResult<()> {
    ctx.start(element)?;
    write_identity_attributes(ctx, element, identity)?;
    write_root_attributes(ctx)?;
    write_aliases(ctx, element, identity)?;
    write_properties(ctx, identity)?;
    write_sub_elements(ctx)?;
    ctx.end()?;
    ctx.mark_exported(&identity.id);
    Ok(())
}

pub(crate) fn write_identity_attributes(ctx: &mut WriterContext<'_>, element: &str, identity: &Identity) -> IidmResult<()> {
    ctx.write_id("id", &identity.id)?;
    ctx.write_optional_id("name", identity.name.as_deref())?;
    if identity.fictitious {
        gating::FICTITIOUS
            .on(element)
            .write_bool(ctx.writer.as_mut(), ctx.version, true, false)?;
    }
    Ok(())
}

fn write_aliases(ctx: &mut WriterContext<'_>, element: &str, identity: &Identity) -> IidmResult<()> {
    if identity.aliases.is_empty() {
        return Ok(());
    }
    gating::ALIAS.on(element).check(ctx.version)?;
    let mut aliases: Vec<_> = identity.aliases.iter().collect();
    if ctx.options.sorted {
        aliases.sort_by(|a, b| a.alias.cmp(&b.alias));
    }
    for alias in aliases {
        ctx.start(ALIAS)?;
        gating::ALIAS_TYPE.write_str(ctx.writer.as_mut(), ctx.version, alias.alias_type.as_deref())?;
        let content = ctx.anonymizer.anonymize(&alias.alias);
        ctx.writer.write_node_content(&content)?;
        ctx.end()?;
    }
    Ok(())
}

fn write_properties(ctx: &mut WriterContext<'_>, identity: &Identity) -> IidmResult<()> {
    for (name, value) in &identity.properties {
        ctx.start(PROPERTY)?;
        ctx.writer.write_string_attribute("name", name)?;
        ctx.writer.write_string_attribute("value", value)?;
        ctx.end()?;
    }
    Ok(())
}

/// `id`, `name` and `fictitious` of the element the reader is positioned on.
pub(crate) fn read_identity(ctx: &ReaderContext<'_>, element: &str) -> IidmResult<Identity> {
    let mut identity = Identity::new(ctx.read_id("id")?);
    identity.name = ctx.read_optional_id("name")?;
    identity.fictitious = gating::FICTITIOUS
        .on(element)
        .read_bool(ctx.reader(), ctx.version, false)?;
    Ok(identity)
}

fn read_alias(ctx: &mut ReaderContext<'_>, element: &str, identity: &mut Identity) -> IidmResult<()> {
    gating::ALIAS.on(element).check(ctx.version)?;
    let alias_type = gating::ALIAS_TYPE.read_str(ctx.reader(), ctx.version);
    let content = ctx.reader.read_content()?;
    let alias = ctx.anonymizer.deanonymize(content.trim())?;
    identity.add_alias(alias, alias_type);
    Ok(())
}

fn read_property(ctx: &mut ReaderContext<'_>, identity: &mut Identity) -> IidmResult<()> {
    let name = ctx.reader.read_required_string("name")?;
    let value = ctx.reader.read_required_string("value")?;
    ctx.reader.read_end_node(PROPERTY)?;
    identity.set_property(name, value);
    Ok(())
}

/// Children of a complex-shape element. Aliases and properties go to the entity identity,
/// anything else to `read_child`, which returns `false` for names it does not know.
pub(crate) fn read_sub_elements<'a, T: Identifiable>(
    ctx: &mut ReaderContext<'a>,
    element: &str,
    entity: &mut T,
    mut read_child: impl FnMut(&mut ReaderContext<'a>, &str, &mut T) -> IidmResult<bool>,
) -> IidmResult<()> {
    while let Some(child) = ctx.reader.next_child()? {
        match child.as_str() {
            ALIAS => read_alias(ctx, element, entity.identity_mut())?,
            PROPERTY => read_property(ctx, entity.identity_mut())?,
            other => {
                if !read_child(ctx, other, entity)? {
                    return Err(IidmError::UnknownElement {
                        element: child,
                        parent: entity.id().to_string(),
                    });
                }
            }
        }
    }
    Ok(())
}

/// Children of an element without kind-specific sub-elements.
pub(crate) fn read_leaf<T: Identifiable>(ctx: &mut ReaderContext<'_>, element: &str, entity: &mut T) -> IidmResult<()> {
    read_sub_elements(ctx, element, entity, |_, _, _| Ok(false))
}

/// Children of a simple-shape element already added to `network` under `id`.
pub(crate) fn read_contained_elements<'a>(
    ctx: &mut ReaderContext<'a>,
    element: &str,
    id: &str,
    network: &mut Network,
    mut read_child: impl FnMut(&mut ReaderContext<'a>, &str, &mut Network) -> IidmResult<bool>,
) -> IidmResult<()> {
    while let Some(child) = ctx.reader.next_child()? {
        match child.as_str() {
            ALIAS | PROPERTY => {
                let identity = network
                    .identity_of_mut(id)
                    .ok_or_else(|| IidmError::DanglingReference(id.to_string()))?;
                if child == ALIAS {
                    read_alias(ctx, element, identity)?;
                } else {
                    read_property(ctx, identity)?;
                }
            }
            other => {
                if !read_child(ctx, other, network)? {
                    return Err(IidmError::UnknownElement {
                        element: child,
                        parent: id.to_string(),
                    });
                }
            }
        }
    }
    Ok(())
}

/// Items in writing order: as stored, or by id when sorted output is requested.
pub(crate) fn ordered<'n, T: Identifiable>(ctx: &WriterContext<'_>, items: impl Iterator<Item = &'n T>) -> Vec<&'n T> {
    let mut items: Vec<&T> = items.collect();
    if ctx.options.sorted {
        items.sort_by(|a, b| a.id().cmp(b.id()));
    }
    items
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::anonymizer::Anonymizer;
    use crate::extensions::ExtensionRegistry;
    use crate::options::{ExportOptions, ImportOptions};
    use crate::tree::{self, TreeDataFormat};
    use crate::version::IidmVersion;
    use iidm_core::{fixtures, Load, Terminal};

    /// Run `f` on a writer context over `network` and return the produced text.
    pub(crate) fn write_with(
        network: &Network,
        options: &ExportOptions,
        f: impl FnOnce(&mut WriterContext<'_>) -> IidmResult<()>,
    ) -> IidmResult<String> {
        let registry = ExtensionRegistry::default();
        let mut out = Vec::new();
        {
            let writer = tree::writer(options.format, &mut out, false, options.version);
            let mut ctx = WriterContext::new(network, options, &registry, writer, Anonymizer::default())?;
            let namespace = ctx.namespace.clone();
            ctx.writer.declare_namespace(crate::extensions::IIDM_PREFIX, &namespace);
            ctx.start("network")?;
            f(&mut ctx)?;
            ctx.end()?;
            ctx.writer.finish()?;
        }
        Ok(String::from_utf8_lossy(&out).into_owned())
    }

    /// Reader context positioned on the root of `text`.
    pub(crate) fn reader_over<'a>(
        text: &'a str,
        format: TreeDataFormat,
        version: IidmVersion,
        options: &'a ImportOptions,
        registry: &'a ExtensionRegistry,
    ) -> ReaderContext<'a> {
        let mut reader = tree::reader(format, text.as_bytes()).expect("reader");
        reader.read_root().expect("root");
        ReaderContext::new(reader, version, options, registry, Anonymizer::default())
    }

    #[test]
    fn test_identity_and_aliases_written() {
        let mut network = fixtures::two_substations().expect("fixture");
        let load = network.get_mut::<Load>("LD1").expect("LD1");
        load.identity.name = Some("load one".into());
        load.identity.add_alias("ALIAS_B", None);
        load.identity.add_alias("ALIAS_A", Some("code".into()));
        load.identity.set_property("owner", "grid");
        let identity = network.identity_of("LD1").cloned().expect("identity");
        let options = ExportOptions::default().with_sorted(true);
        let xml = write_with(&network, &options, |ctx| {
            write_identifiable(ctx, "load", &identity, |_| Ok(()), |_| Ok(()))
        })
        .expect("write");
        assert!(xml.contains(r#"<iidm:load id="LD1" name="load one">"#), "{xml}");
        let a = xml.find("ALIAS_A").expect("A");
        let b = xml.find("ALIAS_B").expect("B");
        assert!(a < b);
        assert!(xml.contains(r#"<iidm:alias type="code">ALIAS_A</iidm:alias>"#));
        assert!(xml.contains(r#"<iidm:property name="owner" value="grid"/>"#));
    }

    #[test]
    fn test_alias_before_1_3_rejected() {
        let mut network = fixtures::two_substations().expect("fixture");
        network
            .identity_of_mut("LD1")
            .expect("LD1")
            .add_alias("X", None);
        let identity = network.identity_of("LD1").cloned().expect("identity");
        let options = ExportOptions::default().with_version(IidmVersion::V_1_2);
        let err = write_with(&network, &options, |ctx| {
            write_identifiable(ctx, "load", &identity, |_| Ok(()), |_| Ok(()))
        })
        .unwrap_err();
        assert!(matches!(err, IidmError::UnsupportedVersion(_)));
    }

    #[test]
    fn test_unknown_child_names_parent() {
        let xml = r#"<load xmlns="urn:x" id="LD9"><alias>A</alias><property name="k" value="v"/><bogus/></load>"#;
        let options = ImportOptions::default();
        let registry = ExtensionRegistry::default();
        let mut ctx = reader_over(xml, TreeDataFormat::Xml, IidmVersion::CURRENT, &options, &registry);
        let mut load = Load::new(
            read_identity(&ctx, "load").expect("identity").id,
            Terminal::bus("VL", "B"),
            0.0,
            0.0,
        );
        let err = read_leaf(&mut ctx, "load", &mut load).unwrap_err();
        assert_eq!(err.to_string(), "Unknown element name 'bogus' in 'LD9'");
        assert_eq!(load.identity.aliases[0].alias, "A");
        assert_eq!(load.identity.properties.get("k").map(String::as_str), Some("v"));
    }
}
