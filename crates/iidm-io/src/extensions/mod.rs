//! Pluggable extension codecs
//!
//! An extension is a named attribute bag attached to an identifiable. Each extension name
//! is written by one [`ExtensionSerDe`] that owns a namespace (URI and prefix) distinct from
//! every other codec used in the same document. Codecs are looked up through an
//! [`ExtensionRegistry`]; the default registry carries the built-in codecs and third parties
//! add their own with [`ExtensionRegistry::register`].

use std::collections::BTreeSet;

use iidm_core::{Extension, IidmError, IidmResult, NamespaceAxis};

use crate::tree::{TreeDataReader, TreeDataWriter};
use crate::validate::ElementRule;

pub mod active_power_control;
pub mod busbar_section_position;

pub use active_power_control::ActivePowerControlSerDe;
pub use busbar_section_position::BusbarSectionPositionSerDe;

/// Prefix of the network namespace, never available to extensions.
pub const IIDM_PREFIX: &str = "iidm";

/// Codec of one extension name.
pub trait ExtensionSerDe: Send + Sync {
    /// Extension name, also the element name on the wire.
    fn name(&self) -> &str;
    fn namespace_uri(&self) -> &str;
    fn namespace_prefix(&self) -> &str;

    /// Write the attributes and children of the extension element; the element itself is
    /// opened and closed by the caller.
    fn write(&self, extension: &Extension, writer: &mut dyn TreeDataWriter) -> IidmResult<()>;

    /// Read the extension element the reader is positioned on, up to and including its end.
    fn read(&self, reader: &mut dyn TreeDataReader) -> IidmResult<Extension>;

    /// Structural rule of the extension element, used by document validation.
    fn element_rule(&self) -> ElementRule;
}

pub struct ExtensionRegistry {
    serializers: Vec<Box<dyn ExtensionSerDe>>,
}

impl Default for ExtensionRegistry {
    /// Registry with the built-in codecs.
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(ActivePowerControlSerDe);
        registry.register(BusbarSectionPositionSerDe);
        registry
    }
}

impl ExtensionRegistry {
    pub fn empty() -> Self {
        Self {
            serializers: Vec::new(),
        }
    }

    /// Add a codec. A codec registered for an existing name replaces it.
    pub fn register(&mut self, serializer: impl ExtensionSerDe + 'static) {
        self.serializers.retain(|s| s.name() != serializer.name());
        self.serializers.push(Box::new(serializer));
    }

    pub fn find(&self, name: &str) -> Option<&dyn ExtensionSerDe> {
        self.serializers
            .iter()
            .find(|s| s.name() == name)
            .map(|s| s.as_ref())
    }

    pub fn find_or_fail(&self, name: &str) -> IidmResult<&dyn ExtensionSerDe> {
        self.find(name)
            .ok_or_else(|| IidmError::MissingExtensionSerializer(vec![name.to_string()]))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.serializers.iter().map(|s| s.name())
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn ExtensionSerDe> {
        self.serializers.iter().map(|s| s.as_ref())
    }

    /// Codecs of `names` after checking that their namespaces are pairwise distinct and
    /// distinct from the network namespace. Names without codec are returned apart.
    pub fn resolve<'a>(
        &self,
        names: impl IntoIterator<Item = &'a str>,
    ) -> IidmResult<(Vec<&dyn ExtensionSerDe>, BTreeSet<String>)> {
        let mut resolved: Vec<&dyn ExtensionSerDe> = Vec::new();
        let mut missing = BTreeSet::new();
        for name in names {
            let Some(serializer) = self.find(name) else {
                missing.insert(name.to_string());
                continue;
            };
            if resolved.iter().any(|s| s.name() == name) {
                continue;
            }
            if serializer.namespace_prefix() == IIDM_PREFIX {
                return Err(IidmError::NamespaceCollision {
                    axis: NamespaceAxis::Prefix,
                    value: IIDM_PREFIX.to_string(),
                });
            }
            for other in &resolved {
                if other.namespace_uri() == serializer.namespace_uri() {
                    return Err(IidmError::NamespaceCollision {
                        axis: NamespaceAxis::Uri,
                        value: serializer.namespace_uri().to_string(),
                    });
                }
                if other.namespace_prefix() == serializer.namespace_prefix() {
                    return Err(IidmError::NamespaceCollision {
                        axis: NamespaceAxis::Prefix,
                        value: serializer.namespace_prefix().to_string(),
                    });
                }
            }
            resolved.push(serializer);
        }
        Ok((resolved, missing))
    }
}

/// Typed attribute of an extension held as text in the model.
pub(crate) fn parse_attribute<T: std::str::FromStr>(extension: &Extension, key: &str) -> IidmResult<Option<T>> {
    extension
        .attribute(key)
        .map(|raw| {
            raw.trim().parse::<T>().map_err(|_| {
                IidmError::Parse(format!(
                    "extension '{}': invalid value '{}' for '{}'",
                    extension.name, raw, key
                ))
            })
        })
        .transpose()
}

pub(crate) fn required_attribute<T: std::str::FromStr>(extension: &Extension, key: &str) -> IidmResult<T> {
    parse_attribute(extension, key)?.ok_or_else(|| {
        IidmError::Parse(format!(
            "extension '{}': missing attribute '{}'",
            extension.name, key
        ))
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Minimal codec used to provoke namespace collisions.
    pub(crate) struct FakeSerDe {
        pub name: &'static str,
        pub uri: &'static str,
        pub prefix: &'static str,
    }

    impl ExtensionSerDe for FakeSerDe {
        fn name(&self) -> &str {
            self.name
        }

        fn namespace_uri(&self) -> &str {
            self.uri
        }

        fn namespace_prefix(&self) -> &str {
            self.prefix
        }

        fn write(&self, extension: &Extension, writer: &mut dyn TreeDataWriter) -> IidmResult<()> {
            for (key, value) in &extension.attributes {
                writer.write_string_attribute(key, value)?;
            }
            Ok(())
        }

        fn read(&self, reader: &mut dyn TreeDataReader) -> IidmResult<Extension> {
            let mut extension = Extension::new(self.name);
            for key in reader.attribute_names() {
                if let Some(value) = reader.read_string(&key) {
                    extension.attributes.insert(key, value);
                }
            }
            reader.read_end_node(self.name)?;
            Ok(extension)
        }

        fn element_rule(&self) -> ElementRule {
            ElementRule::new(self.name)
        }
    }

    #[test]
    fn test_builtins_registered() {
        let registry = ExtensionRegistry::default();
        assert!(registry.find("activePowerControl").is_some());
        assert!(registry.find("busbarSectionPosition").is_some());
        assert!(matches!(
            registry.find_or_fail("unknown"),
            Err(IidmError::MissingExtensionSerializer(names)) if names == vec!["unknown".to_string()]
        ));
    }

    #[test]
    fn test_prefix_collision() {
        let mut registry = ExtensionRegistry::default();
        registry.register(FakeSerDe {
            name: "fake",
            uri: "http://example.com/fake",
            prefix: "apc",
        });
        let err = registry
            .resolve(["activePowerControl", "fake"])
            .err()
            .expect("collision");
        assert!(matches!(
            err,
            IidmError::NamespaceCollision { axis: NamespaceAxis::Prefix, ref value } if value == "apc"
        ));
        // unused codecs never collide
        assert!(registry.resolve(["fake"]).is_ok());
    }

    #[test]
    fn test_uri_collision_and_missing() {
        let mut registry = ExtensionRegistry::default();
        let uri = registry
            .find("busbarSectionPosition")
            .map(|s| s.namespace_uri().to_string())
            .expect("builtin");
        registry.register(FakeSerDe {
            name: "fake",
            uri: Box::leak(uri.into_boxed_str()),
            prefix: "fk",
        });
        assert!(matches!(
            registry.resolve(["busbarSectionPosition", "fake"]),
            Err(IidmError::NamespaceCollision { axis: NamespaceAxis::Uri, .. })
        ));
        let (resolved, missing) = registry.resolve(["fake", "nope", "fake"]).expect("resolve");
        assert_eq!(resolved.len(), 1);
        assert!(missing.contains("nope"));
    }

    #[test]
    fn test_iidm_prefix_reserved() {
        let mut registry = ExtensionRegistry::empty();
        registry.register(FakeSerDe {
            name: "fake",
            uri: "http://example.com/fake",
            prefix: IIDM_PREFIX,
        });
        assert!(registry.resolve(["fake"]).is_err());
    }
}
