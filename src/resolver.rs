//! Recursive resolution of Rust types into structural schemas.
//!
//! Lookup order for a type name: primitives and standard containers, then
//! types declared in the indexed sources, then well-known library types.
//! Declared types therefore shadow library types of the same name.

use crate::entry::TypeInfo;
use crate::registry::SchemaRegistry;
use crate::schema::{Schema, SchemaKind};
use crate::type_index::{
    ContainerAttributes, EnumDef, FieldDef, RenameRule, StructDef, StructShape, TypeDefinition,
    TypeIndex, VariantDef,
};
use crate::type_mapper::TypeMapper;
use log::debug;
use serde_json::Value;
use std::collections::HashMap;

/// Transient per-pass state of a [`SchemaResolver`].
#[derive(Debug, Default)]
pub struct ResolutionContext {
    /// Types currently being resolved, with the component name reserved for
    /// them once a recursive occurrence has been seen
    in_progress: HashMap<String, Option<String>>,
    /// Finished resolutions; `None` records a type that could not be resolved
    completed: HashMap<String, Option<Schema>>,
}

impl ResolutionContext {
    pub fn is_in_progress(&self, key: &str) -> bool {
        self.in_progress.contains_key(key)
    }

    pub fn cached(&self, key: &str) -> Option<&Option<Schema>> {
        self.completed.get(key)
    }

    pub fn cached_len(&self) -> usize {
        self.completed.len()
    }

    pub fn clear(&mut self) {
        self.in_progress.clear();
        self.completed.clear();
    }
}

type Bindings = HashMap<String, TypeInfo>;

/// Turns [`TypeInfo`] references into schemas, registering user types as
/// components.
///
/// Results are cached per instantiation (`Page<User>` and `Page<Post>` are
/// distinct). Self-referential types terminate: a type met again while it is
/// still being resolved gets a reference to a reserved component name.
pub struct SchemaResolver {
    index: TypeIndex,
    context: ResolutionContext,
}

impl SchemaResolver {
    pub fn new(index: TypeIndex) -> Self {
        Self {
            index,
            context: ResolutionContext::default(),
        }
    }

    pub fn index(&self) -> &TypeIndex {
        &self.index
    }

    pub fn context(&self) -> &ResolutionContext {
        &self.context
    }

    /// Drops every cached resolution. Must accompany a registry reset.
    pub fn reset(&mut self) {
        self.context.clear();
    }

    /// Resolves a type written as text, e.g. from an annotation.
    pub fn resolve_named(&mut self, name: &str, registry: &mut SchemaRegistry) -> Option<Schema> {
        let ty = TypeInfo::parse(name)?;
        self.resolve(&ty, registry)
    }

    /// Schema for `ty`, or `None` when the type cannot be described.
    ///
    /// Objects and enums come back as references into `registry`; scalars and
    /// containers come back inline.
    pub fn resolve(&mut self, ty: &TypeInfo, registry: &mut SchemaRegistry) -> Option<Schema> {
        self.resolve_bound(ty, &Bindings::new(), registry)
    }

    /// Like [`resolve`](Self::resolve), but describes unresolvable types as a
    /// generic object.
    pub fn resolve_or_object(&mut self, ty: &TypeInfo, registry: &mut SchemaRegistry) -> Schema {
        self.resolve(ty, registry).unwrap_or_else(Schema::object)
    }

    /// Resolves `ty` as written inside a definition whose type parameters
    /// are bound by `bindings`.
    fn resolve_bound(
        &mut self,
        ty: &TypeInfo,
        bindings: &Bindings,
        registry: &mut SchemaRegistry,
    ) -> Option<Schema> {
        let ty = substitute(ty, bindings);
        self.resolve_concrete(&ty, registry)
    }

    /// Resolves an already substituted type; nested arguments are concrete.
    fn resolve_concrete(&mut self, ty: &TypeInfo, registry: &mut SchemaRegistry) -> Option<Schema> {
        if ty.is_unknown() || ty.is_unit() {
            return None;
        }

        if ty.is_option() {
            let inner = ty.inner()?;
            let schema = self
                .resolve_concrete(inner, registry)
                .unwrap_or_else(Schema::object);
            return Some(schema.into_nullable());
        }
        if let Some(schema) = TypeMapper::map_primitive(ty) {
            return Some(schema);
        }
        if ty.name == "Tuple" {
            return Some(self.tuple_schema(&ty.generic_args, &Bindings::new(), registry));
        }
        if TypeMapper::is_sequence(&ty.name) {
            let items = match ty.inner() {
                Some(inner) => self.resolve_concrete(inner, registry),
                None => None,
            };
            return Some(Schema::array(items.unwrap_or_else(Schema::object)));
        }
        if TypeMapper::is_map(&ty.name) {
            let values = match ty.generic_args.get(1) {
                Some(value) => self.resolve_concrete(value, registry),
                None => None,
            };
            return Some(Schema::map(values.unwrap_or_else(Schema::object)));
        }
        if TypeMapper::is_transparent(&ty.name) {
            let inner = ty.inner()?;
            return self.resolve_concrete(inner, registry);
        }

        if self.index.contains(&ty.name) {
            return self.resolve_declared(ty, registry);
        }
        if let Some(schema) = TypeMapper::map_well_known(ty) {
            return Some(schema);
        }

        let key = ty.display_key();
        if let Some(cached) = self.context.completed.get(&key) {
            return cached.clone();
        }
        debug!("Type {} is not resolvable", key);
        self.context.completed.insert(key, None);
        None
    }

    fn resolve_declared(&mut self, ty: &TypeInfo, registry: &mut SchemaRegistry) -> Option<Schema> {
        let key = ty.display_key();
        if let Some(cached) = self.context.completed.get(&key) {
            return cached.clone();
        }
        if let Some(reserved) = self.context.in_progress.get_mut(&key) {
            let name = match reserved {
                Some(name) => name.clone(),
                None => {
                    let name = registry.reserve(&ty.component_name());
                    debug!("Recursive type {} referenced as {}", key, name);
                    *reserved = Some(name.clone());
                    name
                }
            };
            return Some(Schema::reference_to(&name));
        }

        let definition = self.index.get(&ty.name)?.clone();
        let bindings: Bindings = definition
            .generics()
            .iter()
            .cloned()
            .zip(ty.generic_args.iter().cloned())
            .collect();

        debug!("Resolving declared type {}", key);
        self.context.in_progress.insert(key.clone(), None);
        let body = match &definition {
            TypeDefinition::Struct(def) => self.struct_schema(def, &bindings, registry),
            TypeDefinition::Enum(def) => self.enum_schema(def, &bindings, registry),
            TypeDefinition::Alias(def) => self.resolve_bound(&def.target, &bindings, registry),
        };
        let reserved = self.context.in_progress.remove(&key).flatten();

        let result = match (body, reserved) {
            (Some(body), Some(name)) => Some(registry.define_reserved(&name, body)),
            (Some(body), None) => Some(registry.register_if_complex(&ty.component_name(), body)),
            (None, Some(name)) => Some(registry.define_reserved(&name, Schema::object())),
            (None, None) => None,
        };
        self.context.completed.insert(key, result.clone());
        result
    }

    fn struct_schema(
        &mut self,
        def: &StructDef,
        bindings: &Bindings,
        registry: &mut SchemaRegistry,
    ) -> Option<Schema> {
        let schema = match &def.shape {
            StructShape::Unit => Schema::object(),
            StructShape::Newtype(inner) => {
                return self.resolve_bound(inner, bindings, registry);
            }
            StructShape::Tuple(elements) => self.tuple_schema(elements, bindings, registry),
            StructShape::Named(_) => {
                let members = def.members();
                if def.serde.transparent && members.len() == 1 {
                    return self.resolve_bound(&members[0].type_info, bindings, registry);
                }
                self.object_schema(&members, &def.serde, bindings, registry)
            }
        };
        let mut schema = schema;
        if !schema.is_reference() {
            schema.description = def.description.clone();
            schema.deprecated = def.deprecated;
        }
        Some(schema)
    }

    /// Object built from named fields; `#[serde(flatten)]` members turn the
    /// result into an `allOf`.
    fn object_schema(
        &mut self,
        fields: &[&FieldDef],
        container: &ContainerAttributes,
        bindings: &Bindings,
        registry: &mut SchemaRegistry,
    ) -> Schema {
        let mut base = Schema::object();
        let mut flattened = Vec::new();

        for field in fields {
            if field.serde_attrs.skip {
                continue;
            }
            if field.serde_attrs.flatten {
                if let Some(schema) = self.resolve_bound(&field.type_info, bindings, registry) {
                    flattened.push(schema);
                }
                continue;
            }

            let name = serialized_name(
                &field.name,
                field.serde_attrs.rename.as_deref(),
                container.rename_all,
            );
            let mut schema = self
                .resolve_bound(&field.type_info, bindings, registry)
                .unwrap_or_else(Schema::object);
            if !schema.is_reference() {
                if field.description.is_some() {
                    schema.description = field.description.clone();
                }
                schema.deprecated |= field.deprecated;
            }
            let required = !substitute(&field.type_info, bindings).is_option()
                && !field.serde_attrs.default
                && !field.serde_attrs.skip_serializing_if
                && !container.default;
            base.insert_property(&name, schema, required);
        }

        if flattened.is_empty() {
            return base;
        }
        let mut parts = Vec::with_capacity(flattened.len() + 1);
        if !base.properties.is_empty() {
            parts.push(base);
        }
        parts.extend(flattened);
        if parts.len() == 1 {
            return parts.remove(0);
        }
        Schema::all_of(parts)
    }

    /// Fixed-length array. Elements sharing one shape give plain `items`.
    fn tuple_schema(
        &mut self,
        elements: &[TypeInfo],
        bindings: &Bindings,
        registry: &mut SchemaRegistry,
    ) -> Schema {
        let mut branches: Vec<Schema> = Vec::new();
        for element in elements {
            let schema = self
                .resolve_bound(element, bindings, registry)
                .unwrap_or_else(Schema::object);
            if !branches.contains(&schema) {
                branches.push(schema);
            }
        }
        let items = match branches.len() {
            0 => Schema::object(),
            1 => branches.remove(0),
            _ => Schema::one_of(branches),
        };
        let mut schema = Schema::array(items);
        schema.min_items = Some(elements.len());
        schema.max_items = Some(elements.len());
        schema
    }

    fn enum_schema(
        &mut self,
        def: &EnumDef,
        bindings: &Bindings,
        registry: &mut SchemaRegistry,
    ) -> Option<Schema> {
        let variants: Vec<&VariantDef> = def
            .variants
            .iter()
            .filter(|v| !v.serde_attrs.skip)
            .collect();
        if variants.is_empty() {
            return None;
        }

        let unit_only = variants
            .iter()
            .all(|v| matches!(v.shape, StructShape::Unit));
        // tagged unit variants serialize as objects holding the tag
        let mut schema = if unit_only && !def.serde.untagged && def.serde.tag.is_none() {
            self.unit_enum_schema(def, &variants)
        } else {
            self.data_enum_schema(def, &variants, bindings, registry)
        };
        if !schema.is_reference() {
            schema.description = def.description.clone();
        }
        Some(schema)
    }

    fn unit_enum_schema(&self, def: &EnumDef, variants: &[&VariantDef]) -> Schema {
        let numeric = variants.iter().all(|v| v.discriminant.is_some())
            && (def.serde_repr || !def.serde.serde_derived);
        if numeric {
            let values = variants
                .iter()
                .filter_map(|v| v.discriminant)
                .map(Value::from)
                .collect();
            return Schema::integer().with_enum(values);
        }
        let values = variants
            .iter()
            .map(|v| Value::String(variant_name(v, def.serde.rename_all)))
            .collect();
        Schema::string().with_enum(values)
    }

    /// One `oneOf` branch per variant, shaped by the serde tagging mode.
    fn data_enum_schema(
        &mut self,
        def: &EnumDef,
        variants: &[&VariantDef],
        bindings: &Bindings,
        registry: &mut SchemaRegistry,
    ) -> Schema {
        let mut branches = Vec::with_capacity(variants.len());
        for variant in variants {
            let name = variant_name(variant, def.serde.rename_all);
            let payload = self.variant_payload(variant, bindings, registry);
            let tag_value = Schema::string().with_enum(vec![Value::String(name.clone())]);

            let branch = if def.serde.untagged {
                payload.unwrap_or_else(Schema::null)
            } else if let Some(tag) = &def.serde.tag {
                let mut tagged = Schema::object();
                tagged.insert_property(tag, tag_value, true);
                match (&def.serde.content, payload) {
                    (_, None) => tagged,
                    (Some(content), Some(payload)) => {
                        tagged.insert_property(content, payload, true);
                        tagged
                    }
                    (None, Some(payload)) if payload.kind == Some(SchemaKind::Object) => {
                        // internally tagged struct variant: the tag sits among its fields
                        let mut merged = payload;
                        let mut properties = tagged.properties;
                        properties.extend(merged.properties);
                        merged.properties = properties;
                        merged.required.insert(0, tag.clone());
                        merged
                    }
                    (None, Some(payload)) => Schema::all_of(vec![tagged, payload]),
                }
            } else {
                match payload {
                    None => tag_value,
                    Some(payload) => {
                        let mut wrapper = Schema::object();
                        wrapper.insert_property(&name, payload, true);
                        wrapper
                    }
                }
            };
            if !branches.contains(&branch) {
                branches.push(branch);
            }
        }

        let non_null: Vec<&Schema> = branches
            .iter()
            .filter(|b| b.kind != Some(SchemaKind::Null))
            .collect();
        if non_null.len() == 1 && branches.len() == 2 {
            return non_null[0].clone().into_nullable();
        }
        if branches.len() == 1 {
            return branches.remove(0);
        }
        Schema::one_of(branches)
    }

    fn variant_payload(
        &mut self,
        variant: &VariantDef,
        bindings: &Bindings,
        registry: &mut SchemaRegistry,
    ) -> Option<Schema> {
        match &variant.shape {
            StructShape::Unit => None,
            StructShape::Newtype(inner) => Some(
                self.resolve_bound(inner, bindings, registry)
                    .unwrap_or_else(Schema::object),
            ),
            StructShape::Tuple(elements) => Some(self.tuple_schema(elements, bindings, registry)),
            StructShape::Named(fields) => {
                let fields: Vec<&FieldDef> = fields.iter().collect();
                Some(self.object_schema(
                    &fields,
                    &ContainerAttributes::default(),
                    bindings,
                    registry,
                ))
            }
        }
    }
}

fn serialized_name(name: &str, rename: Option<&str>, rule: Option<RenameRule>) -> String {
    match (rename, rule) {
        (Some(rename), _) => rename.to_string(),
        (None, Some(rule)) => rule.apply(name),
        (None, None) => name.to_string(),
    }
}

fn variant_name(variant: &VariantDef, rule: Option<RenameRule>) -> String {
    serialized_name(&variant.name, variant.serde_attrs.rename.as_deref(), rule)
}

/// Replaces bound type parameters throughout `ty`.
fn substitute(ty: &TypeInfo, bindings: &Bindings) -> TypeInfo {
    if ty.generic_args.is_empty() {
        if let Some(bound) = bindings.get(&ty.name) {
            return bound.clone();
        }
    }
    TypeInfo::with_args(
        ty.name.clone(),
        ty.generic_args
            .iter()
            .map(|arg| substitute(arg, bindings))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn resolver_for(code: &str) -> SchemaResolver {
        SchemaResolver::new(TypeIndex::from_source(code).unwrap())
    }

    fn body<'a>(registry: &'a SchemaRegistry, schema: &'a Schema) -> &'a Schema {
        registry.resolve(schema).unwrap()
    }

    #[test]
    fn test_resolve_struct_registers_component() {
        let mut resolver = resolver_for(
            r#"
            /// A registered user
            #[derive(Serialize)]
            pub struct User {
                pub id: u64,
                pub name: String,
                pub email: Option<String>,
                pub tags: Vec<String>,
            }
            "#,
        );
        let mut registry = SchemaRegistry::new();
        let schema = resolver.resolve_named("User", &mut registry).unwrap();
        assert_eq!(schema.reference_name(), Some("User"));

        let user = body(&registry, &schema);
        assert_eq!(user.description.as_deref(), Some("A registered user"));
        assert_eq!(user.required, vec!["id", "name", "tags"]);
        assert!(user.properties["email"].nullable);
        assert_eq!(user.properties["tags"].kind, Some(SchemaKind::Array));
    }

    #[test]
    fn test_enum_plan_resolves_to_string_enum() {
        let mut resolver = resolver_for(
            r#"
            #[derive(Serialize, Deserialize)]
            #[serde(rename_all = "lowercase")]
            pub enum Plan { Mini, Pro, Enterprise }
            "#,
        );
        let mut registry = SchemaRegistry::new();
        let schema = resolver.resolve_named("Plan", &mut registry).unwrap();
        let plan = body(&registry, &schema);
        assert_eq!(plan.kind, Some(SchemaKind::String));
        assert_eq!(plan.enum_values, vec![json!("mini"), json!("pro"), json!("enterprise")]);
    }

    #[test]
    fn test_integer_enum_with_discriminants() {
        let mut resolver = resolver_for(
            r#"
            #[derive(Serialize_repr)]
            #[repr(u8)]
            pub enum Level { Low = 1, High = 2 }
            "#,
        );
        let mut registry = SchemaRegistry::new();
        let schema = resolver.resolve_named("Level", &mut registry).unwrap();
        let level = body(&registry, &schema);
        assert_eq!(level.kind, Some(SchemaKind::Integer));
        assert_eq!(level.enum_values, vec![json!(1), json!(2)]);
    }

    #[test]
    fn test_self_reference_terminates() {
        let mut resolver = resolver_for(
            r#"
            #[derive(Serialize)]
            pub struct Category {
                pub name: String,
                pub parent: Option<Box<Category>>,
                pub children: Vec<Category>,
            }
            "#,
        );
        let mut registry = SchemaRegistry::new();
        let schema = resolver.resolve_named("Category", &mut registry).unwrap();
        assert_eq!(schema.reference_name(), Some("Category"));

        let category = body(&registry, &schema);
        let parent = &category.properties["parent"];
        assert!(parent.nullable);
        assert_eq!(parent.all_of[0].reference_name(), Some("Category"));
        let children = category.properties["children"].items.as_ref().unwrap();
        assert_eq!(children.reference_name(), Some("Category"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_mutual_recursion_terminates() {
        let mut resolver = resolver_for(
            r#"
            #[derive(Serialize)]
            pub struct Author { pub name: String, pub books: Vec<Book> }
            #[derive(Serialize)]
            pub struct Book { pub title: String, pub author: Author }
            "#,
        );
        let mut registry = SchemaRegistry::new();
        let schema = resolver.resolve_named("Author", &mut registry).unwrap();
        let author = body(&registry, &schema);
        let book_ref = author.properties["books"].items.as_ref().unwrap();
        let book = body(&registry, book_ref);
        assert_eq!(book.properties["author"].reference_name(), Some("Author"));
    }

    #[test]
    fn test_serde_attributes_shape_members() {
        let mut resolver = resolver_for(
            r#"
            #[derive(Serialize, Deserialize)]
            #[serde(rename_all = "camelCase")]
            pub struct Profile {
                display_name: String,
                #[serde(rename = "mail")]
                email_address: String,
                #[serde(skip)]
                secret: String,
                #[serde(default)]
                page_size: u32,
                #[serde(skip_serializing_if = "Vec::is_empty")]
                aliases: Vec<String>,
            }
            "#,
        );
        let mut registry = SchemaRegistry::new();
        let schema = resolver.resolve_named("Profile", &mut registry).unwrap();
        let profile = body(&registry, &schema);
        let names: Vec<&String> = profile.properties.keys().collect();
        assert_eq!(names, vec!["displayName", "mail", "pageSize", "aliases"]);
        assert_eq!(profile.required, vec!["displayName", "mail"]);
    }

    #[test]
    fn test_flatten_becomes_all_of() {
        let mut resolver = resolver_for(
            r#"
            #[derive(Serialize)]
            pub struct Audit { pub created_by: String }
            #[derive(Serialize)]
            pub struct Document {
                pub title: String,
                #[serde(flatten)]
                pub audit: Audit,
            }
            "#,
        );
        let mut registry = SchemaRegistry::new();
        let schema = resolver.resolve_named("Document", &mut registry).unwrap();
        let document = body(&registry, &schema);
        assert_eq!(document.all_of.len(), 2);
        assert!(document.all_of[0].properties.contains_key("title"));
        assert_eq!(document.all_of[1].reference_name(), Some("Audit"));
    }

    #[test]
    fn test_generic_instantiation() {
        let mut resolver = resolver_for(
            r#"
            #[derive(Serialize)]
            pub struct Page<T> { pub items: Vec<T>, pub total: u64 }
            #[derive(Serialize)]
            pub struct User { pub id: u64 }
            "#,
        );
        let mut registry = SchemaRegistry::new();
        let schema = resolver.resolve_named("Page<User>", &mut registry).unwrap();
        assert_eq!(schema.reference_name(), Some("PageUser"));
        let page = body(&registry, &schema);
        let items = page.properties["items"].items.as_ref().unwrap();
        assert_eq!(items.reference_name(), Some("User"));
    }

    #[test]
    fn test_data_enum_tagging_modes() {
        let mut resolver = resolver_for(
            r#"
            #[derive(Serialize)]
            #[serde(tag = "kind")]
            pub enum Shape {
                Circle { radius: f64 },
                Square { side: f64 },
            }
            #[derive(Serialize)]
            pub enum Message {
                Quit,
                Write(String),
            }
            "#,
        );
        let mut registry = SchemaRegistry::new();
        let shape_ref = resolver.resolve_named("Shape", &mut registry).unwrap();
        let shape = body(&registry, &shape_ref).clone();
        assert_eq!(shape.one_of.len(), 2);
        let circle = &shape.one_of[0];
        assert_eq!(circle.required, vec!["kind", "radius"]);
        assert_eq!(circle.properties["kind"].enum_values, vec![json!("Circle")]);

        let message_ref = resolver.resolve_named("Message", &mut registry).unwrap();
        let message = body(&registry, &message_ref);
        assert_eq!(message.one_of[0].enum_values, vec![json!("Quit")]);
        assert!(message.one_of[1].properties.contains_key("Write"));
    }

    #[test]
    fn test_internally_tagged_unit_enum_is_object() {
        let mut resolver = resolver_for(
            r#"
            #[derive(Serialize)]
            #[serde(tag = "kind")]
            pub enum Event { Created, Deleted }
            #[derive(Serialize)]
            #[serde(tag = "t", content = "c")]
            pub enum Signal { Start, Stop }
            "#,
        );
        let mut registry = SchemaRegistry::new();
        let event_ref = resolver.resolve_named("Event", &mut registry).unwrap();
        let event = body(&registry, &event_ref).clone();
        assert_eq!(event.kind, None);
        assert_eq!(event.one_of.len(), 2);
        let created = &event.one_of[0];
        assert_eq!(created.kind, Some(SchemaKind::Object));
        assert_eq!(created.required, vec!["kind"]);
        assert_eq!(created.properties["kind"].enum_values, vec![json!("Created")]);

        let signal_ref = resolver.resolve_named("Signal", &mut registry).unwrap();
        let signal = body(&registry, &signal_ref);
        assert_eq!(signal.one_of[1].properties["t"].enum_values, vec![json!("Stop")]);
        assert!(!signal.one_of[1].properties.contains_key("c"));
    }

    #[test]
    fn test_generic_arguments_are_bound_once() {
        let mut resolver = resolver_for(
            r#"
            #[derive(Serialize)]
            pub struct A { pub a: i32 }
            #[derive(Serialize)]
            pub struct B { pub b: String }
            #[derive(Serialize)]
            pub struct Pair<A, B> { pub first: Option<A>, pub second: Vec<B> }
            "#,
        );
        let mut registry = SchemaRegistry::new();
        let schema = resolver.resolve_named("Pair<B, A>", &mut registry).unwrap();
        let pair = body(&registry, &schema);
        let first = &pair.properties["first"];
        assert!(first.nullable);
        assert_eq!(first.all_of[0].reference_name(), Some("B"));
        let second = pair.properties["second"].items.as_ref().unwrap();
        assert_eq!(second.reference_name(), Some("A"));
    }

    #[test]
    fn test_untagged_single_branch_unwraps_to_nullable() {
        let mut resolver = resolver_for(
            r#"
            #[derive(Serialize)]
            #[serde(untagged)]
            pub enum MaybeCount { Nothing, Count(u32) }
            "#,
        );
        let mut registry = SchemaRegistry::new();
        let schema = resolver.resolve_named("MaybeCount", &mut registry).unwrap();
        assert_eq!(schema.kind, Some(SchemaKind::Integer));
        assert!(schema.nullable);
    }

    #[test]
    fn test_newtype_and_well_known_types() {
        let mut resolver = resolver_for(
            r#"
            pub struct UserId(pub uuid::Uuid);
            #[derive(Serialize)]
            pub struct Event { pub id: UserId, pub at: chrono::DateTime<chrono::Utc> }
            "#,
        );
        let mut registry = SchemaRegistry::new();
        let schema = resolver.resolve_named("Event", &mut registry).unwrap();
        let event = body(&registry, &schema);
        assert_eq!(event.properties["id"].format.as_deref(), Some("uuid"));
        assert_eq!(event.properties["at"].format.as_deref(), Some("date-time"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_unresolvable_types_are_cached_negatively() {
        let mut resolver = resolver_for("pub struct Known { pub a: i32 }");
        let mut registry = SchemaRegistry::new();
        assert!(resolver.resolve_named("Mystery", &mut registry).is_none());
        assert_eq!(resolver.context().cached("Mystery"), Some(&None));

        // later lookups are answered from the cache
        resolver
            .context
            .completed
            .insert("Mystery".to_string(), Some(Schema::string()));
        let cached = resolver.resolve_named("Mystery", &mut registry).unwrap();
        assert_eq!(cached.kind, Some(SchemaKind::String));

        let list = resolver.resolve_named("Vec<Mystery>", &mut registry).unwrap();
        assert_eq!(list.items.as_ref().unwrap().kind, Some(SchemaKind::Object));
    }

    #[test]
    fn test_local_declaration_shadows_library_type() {
        let mut resolver = resolver_for(
            r#"
            #[derive(Serialize)]
            pub struct Duration { pub minutes: u32 }
            "#,
        );
        let mut registry = SchemaRegistry::new();
        let schema = resolver.resolve_named("Duration", &mut registry).unwrap();
        assert_eq!(schema.reference_name(), Some("Duration"));
    }

    #[test]
    fn test_reset_clears_context() {
        let mut resolver = resolver_for("#[derive(Serialize)] pub struct A { pub b: i32 }");
        let mut registry = SchemaRegistry::new();
        resolver.resolve_named("A", &mut registry);
        assert!(resolver.context().cached_len() > 0);
        resolver.reset();
        assert_eq!(resolver.context().cached_len(), 0);
    }
}
