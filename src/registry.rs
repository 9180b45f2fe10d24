//! Named schema components, deduplicated by structural fingerprint.

use crate::schema::Schema;
use indexmap::IndexMap;
use log::debug;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::fmt::Write;

/// How many `$ref` hops [`SchemaRegistry::resolve`] follows before giving up.
const MAX_REFERENCE_HOPS: usize = 8;

/// One registered component.
#[derive(Debug, Clone)]
pub struct ComponentEntry {
    pub name: String,
    pub schema: Schema,
    pub fingerprint: String,
}

/// Owner of every component body produced during a generation pass.
///
/// Registering a schema returns a `$ref` to it. Structurally identical
/// schemas share one component; a name already used by a different shape is
/// retried as `Name2`, `Name3`, and so on.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    components: IndexMap<String, ComponentEntry>,
    by_fingerprint: HashMap<String, String>,
    /// Names handed out by [`reserve`](Self::reserve) and not yet defined
    pending: HashSet<String>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `schema` under `name` (or a suffixed variant) and returns a
    /// reference to the component now holding it.
    pub fn register(&mut self, name: &str, schema: Schema) -> Schema {
        if schema.is_reference() {
            return schema;
        }
        let fingerprint = Self::fingerprint(&schema);
        if let Some(existing) = self.by_fingerprint.get(&fingerprint) {
            debug!("Schema {} matches existing component {}", name, existing);
            return Schema::reference_to(existing);
        }

        let name = self.free_name(name);
        debug!("Registering component {}", name);
        self.by_fingerprint.insert(fingerprint.clone(), name.clone());
        self.components.insert(
            name.clone(),
            ComponentEntry {
                name: name.clone(),
                schema,
                fingerprint,
            },
        );
        Schema::reference_to(&name)
    }

    /// Like [`register`](Self::register), but scalar-only shapes and existing
    /// references are returned inline.
    pub fn register_if_complex(&mut self, name: &str, schema: Schema) -> Schema {
        if schema.is_scalar_only() {
            return schema;
        }
        self.register(name, schema)
    }

    /// Claims a component name before its body is known.
    ///
    /// Used for types that refer to themselves: the reference can be handed
    /// out while the body is still being built. Until
    /// [`define_reserved`](Self::define_reserved) is called the component
    /// holds a generic object.
    pub fn reserve(&mut self, name: &str) -> String {
        let name = self.free_name(name);
        debug!("Reserving component name {}", name);
        let placeholder = Schema::object();
        self.components.insert(
            name.clone(),
            ComponentEntry {
                name: name.clone(),
                fingerprint: Self::fingerprint(&placeholder),
                schema: placeholder,
            },
        );
        self.pending.insert(name.clone());
        name
    }

    /// Stores the body of a reserved component.
    pub fn define_reserved(&mut self, name: &str, schema: Schema) -> Schema {
        let fingerprint = Self::fingerprint(&schema);
        self.pending.remove(name);
        self.by_fingerprint
            .entry(fingerprint.clone())
            .or_insert_with(|| name.to_string());
        self.components.insert(
            name.to_string(),
            ComponentEntry {
                name: name.to_string(),
                schema,
                fingerprint,
            },
        );
        Schema::reference_to(name)
    }

    /// Follows references to the schema they point at.
    ///
    /// Inline schemas resolve to themselves; dangling references and
    /// components that are still reserved resolve to `None`.
    pub fn resolve<'a>(&'a self, schema: &'a Schema) -> Option<&'a Schema> {
        let mut current = schema;
        for _ in 0..MAX_REFERENCE_HOPS {
            let Some(name) = current.reference_name() else {
                return Some(current);
            };
            if self.pending.contains(name) {
                return None;
            }
            current = &self.components.get(name)?.schema;
        }
        None
    }

    pub fn get(&self, name: &str) -> Option<&Schema> {
        self.components.get(name).map(|entry| &entry.schema)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.components.contains_key(name)
    }

    /// Registered components in registration order.
    pub fn components(&self) -> impl Iterator<Item = &ComponentEntry> {
        self.components.values()
    }

    /// Component bodies keyed by name, for the output document.
    pub fn schemas(&self) -> IndexMap<String, Schema> {
        self.components
            .iter()
            .map(|(name, entry)| (name.clone(), entry.schema.clone()))
            .collect()
    }

    /// Rewrites component bodies in place.
    ///
    /// Fingerprints are not recomputed, so callers must only touch cosmetic
    /// fields such as `example` or `description`.
    pub fn map_schemas(&mut self, mut f: impl FnMut(&str, &mut Schema)) {
        for (name, entry) in self.components.iter_mut() {
            f(name, &mut entry.schema);
        }
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Forgets every component, ready for an unrelated generation pass.
    pub fn reset(&mut self) {
        self.components.clear();
        self.by_fingerprint.clear();
        self.pending.clear();
    }

    /// Hex SHA-256 of the schema's structural projection.
    ///
    /// `description` and `example` are dropped at every level, property keys
    /// and `required` are sorted, and enumeration order is kept.
    pub fn fingerprint(schema: &Schema) -> String {
        let mut projection = schema.clone();
        projection.walk_mut(&mut |node| {
            node.description = None;
            node.example = None;
            node.required.sort();
        });
        let value = serde_json::to_value(&projection).unwrap_or(Value::Null);
        let mut canonical = String::new();
        write_canonical(&value, &mut canonical);

        let digest = Sha256::digest(canonical.as_bytes());
        let mut hex = String::with_capacity(digest.len() * 2);
        for byte in digest {
            let _ = write!(hex, "{:02x}", byte);
        }
        hex
    }

    fn free_name(&self, name: &str) -> String {
        if !self.components.contains_key(name) {
            return name.to_string();
        }
        let mut counter = 2;
        loop {
            let candidate = format!("{}{}", name, counter);
            if !self.components.contains_key(&candidate) {
                return candidate;
            }
            counter += 1;
        }
    }
}

/// JSON text with object keys sorted at every level.
fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(&map[key], out);
            }
            out.push('}');
        }
        Value::Array(values) => {
            out.push('[');
            for (i, v) in values.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(v, out);
            }
            out.push(']');
        }
        other => out.push_str(&other.to_string()),
    }
}
