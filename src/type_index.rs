use crate::entry::{doc_description, TypeInfo};
use crate::parser::ParsedFile;
use log::debug;
use std::collections::HashMap;
use syn::visit::Visit;

/// Index of user-declared types across all parsed files.
///
/// Structs, enums and type aliases are recorded by their bare name, including
/// those declared inside inline `mod` blocks. When two files declare the same
/// name the first one wins.
#[derive(Debug, Default)]
pub struct TypeIndex {
    definitions: HashMap<String, TypeDefinition>,
}

/// A user type declaration reduced to its serialization-relevant parts
#[derive(Debug, Clone)]
pub enum TypeDefinition {
    Struct(StructDef),
    Enum(EnumDef),
    Alias(AliasDef),
}

/// Struct definition
#[derive(Debug, Clone)]
pub struct StructDef {
    pub name: String,
    /// Names of the type parameters, in declaration order
    pub generics: Vec<String>,
    pub shape: StructShape,
    pub serde: ContainerAttributes,
    pub description: Option<String>,
    pub deprecated: bool,
}

/// Field layout of a struct or enum variant
#[derive(Debug, Clone)]
pub enum StructShape {
    Named(Vec<FieldDef>),
    /// Single unnamed field; serde treats it as its inner value
    Newtype(TypeInfo),
    Tuple(Vec<TypeInfo>),
    Unit,
}

/// Field definition in a struct
#[derive(Debug, Clone)]
pub struct FieldDef {
    /// Field name, with any `r#` prefix removed
    pub name: String,
    pub type_info: TypeInfo,
    pub is_public: bool,
    pub serde_attrs: SerdeAttributes,
    pub description: Option<String>,
    pub deprecated: bool,
}

/// Enum definition
#[derive(Debug, Clone)]
pub struct EnumDef {
    pub name: String,
    pub generics: Vec<String>,
    pub variants: Vec<VariantDef>,
    pub serde: ContainerAttributes,
    pub description: Option<String>,
    /// Derives `Serialize_repr`/`Deserialize_repr`
    pub serde_repr: bool,
}

#[derive(Debug, Clone)]
pub struct VariantDef {
    pub name: String,
    pub shape: StructShape,
    pub serde_attrs: SerdeAttributes,
    pub discriminant: Option<i64>,
    pub description: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AliasDef {
    pub name: String,
    pub generics: Vec<String>,
    pub target: TypeInfo,
}

/// Serde attributes for a field or variant
#[derive(Debug, Clone, Default)]
pub struct SerdeAttributes {
    /// Renamed field name
    pub rename: Option<String>,
    /// Whether to skip this field during serialization
    pub skip: bool,
    /// Whether to flatten this field
    pub flatten: bool,
    /// `#[serde(default)]` or `#[serde(default = "...")]`
    pub default: bool,
    pub skip_serializing_if: bool,
}

/// Serde attributes on a struct or enum
#[derive(Debug, Clone, Default)]
pub struct ContainerAttributes {
    pub rename_all: Option<RenameRule>,
    pub default: bool,
    pub tag: Option<String>,
    pub content: Option<String>,
    pub untagged: bool,
    pub transparent: bool,
    /// Derives `Serialize` or `Deserialize`
    pub serde_derived: bool,
}

/// Case conversion rules accepted by `#[serde(rename_all = "...")]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenameRule {
    Lower,
    Upper,
    Pascal,
    Camel,
    Snake,
    ScreamingSnake,
    Kebab,
    ScreamingKebab,
}

impl RenameRule {
    pub fn parse(rule: &str) -> Option<Self> {
        match rule {
            "lowercase" => Some(RenameRule::Lower),
            "UPPERCASE" => Some(RenameRule::Upper),
            "PascalCase" => Some(RenameRule::Pascal),
            "camelCase" => Some(RenameRule::Camel),
            "snake_case" => Some(RenameRule::Snake),
            "SCREAMING_SNAKE_CASE" => Some(RenameRule::ScreamingSnake),
            "kebab-case" => Some(RenameRule::Kebab),
            "SCREAMING-KEBAB-CASE" => Some(RenameRule::ScreamingKebab),
            _ => None,
        }
    }

    /// Applies the rule to a `snake_case` field or `PascalCase` variant name.
    pub fn apply(self, name: &str) -> String {
        let words = split_words(name);
        match self {
            RenameRule::Lower => words.concat(),
            RenameRule::Upper => words.concat().to_uppercase(),
            RenameRule::Pascal => words.iter().map(|w| capitalize(w)).collect(),
            RenameRule::Camel => {
                let mut out = String::new();
                for (i, word) in words.iter().enumerate() {
                    if i == 0 {
                        out.push_str(word);
                    } else {
                        out.push_str(&capitalize(word));
                    }
                }
                out
            }
            RenameRule::Snake => words.join("_"),
            RenameRule::ScreamingSnake => words.join("_").to_uppercase(),
            RenameRule::Kebab => words.join("-"),
            RenameRule::ScreamingKebab => words.join("-").to_uppercase(),
        }
    }
}

/// Splits an identifier into lowercase words on underscores and case changes.
fn split_words(name: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    for c in name.chars() {
        if c == '_' || c == '-' {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
        } else if c.is_uppercase() && !current.is_empty() {
            words.push(std::mem::take(&mut current));
            current.extend(c.to_lowercase());
        } else {
            current.extend(c.to_lowercase());
        }
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

impl TypeDefinition {
    pub fn name(&self) -> &str {
        match self {
            TypeDefinition::Struct(def) => &def.name,
            TypeDefinition::Enum(def) => &def.name,
            TypeDefinition::Alias(def) => &def.name,
        }
    }

    pub fn generics(&self) -> &[String] {
        match self {
            TypeDefinition::Struct(def) => &def.generics,
            TypeDefinition::Enum(def) => &def.generics,
            TypeDefinition::Alias(def) => &def.generics,
        }
    }
}

impl StructDef {
    /// Members that take part in (de)serialization.
    ///
    /// A serde-derived struct constructs every named field; anything else
    /// only exposes its `pub` fields.
    pub fn members(&self) -> Vec<&FieldDef> {
        match &self.shape {
            StructShape::Named(fields) => fields
                .iter()
                .filter(|f| self.serde.serde_derived || f.is_public)
                .filter(|f| !f.serde_attrs.skip)
                .collect(),
            _ => Vec::new(),
        }
    }
}

impl TypeIndex {
    /// Create a new TypeIndex from parsed files
    pub fn new(parsed_files: &[ParsedFile]) -> Self {
        debug!("Indexing types in {} files", parsed_files.len());
        let mut collector = DefinitionCollector::default();
        for parsed_file in parsed_files {
            collector.visit_file(&parsed_file.syntax_tree);
        }
        debug!("Indexed {} type definitions", collector.index.definitions.len());
        collector.index
    }

    pub fn from_source(source: &str) -> syn::Result<Self> {
        let syntax_tree = syn::parse_file(source)?;
        let mut collector = DefinitionCollector::default();
        collector.visit_file(&syntax_tree);
        Ok(collector.index)
    }

    pub fn get(&self, name: &str) -> Option<&TypeDefinition> {
        self.definitions.get(name)
    }

    pub fn find_struct(&self, name: &str) -> Option<&StructDef> {
        match self.definitions.get(name) {
            Some(TypeDefinition::Struct(def)) => Some(def),
            _ => None,
        }
    }

    pub fn find_enum(&self, name: &str) -> Option<&EnumDef> {
        match self.definitions.get(name) {
            Some(TypeDefinition::Enum(def)) => Some(def),
            _ => None,
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.definitions.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    fn insert(&mut self, definition: TypeDefinition) {
        let name = definition.name().to_string();
        if self.definitions.contains_key(&name) {
            debug!("Duplicate type name {}, keeping first declaration", name);
            return;
        }
        self.definitions.insert(name, definition);
    }
}

#[derive(Default)]
struct DefinitionCollector {
    index: TypeIndex,
}

impl<'ast> Visit<'ast> for DefinitionCollector {
    fn visit_item_struct(&mut self, node: &'ast syn::ItemStruct) {
        debug!("Indexing struct: {}", node.ident);
        let (serde, _) = parse_container_attributes(&node.attrs);
        self.index.insert(TypeDefinition::Struct(StructDef {
            name: node.ident.to_string(),
            generics: type_parameters(&node.generics),
            shape: parse_shape(&node.fields),
            serde,
            description: doc_description(&node.attrs),
            deprecated: has_attribute(&node.attrs, "deprecated"),
        }));
        syn::visit::visit_item_struct(self, node);
    }

    fn visit_item_enum(&mut self, node: &'ast syn::ItemEnum) {
        debug!("Indexing enum: {}", node.ident);
        let (serde, serde_repr) = parse_container_attributes(&node.attrs);
        let variants = node
            .variants
            .iter()
            .map(|variant| VariantDef {
                name: variant.ident.to_string(),
                shape: parse_shape(&variant.fields),
                serde_attrs: parse_serde_attributes(&variant.attrs),
                discriminant: variant
                    .discriminant
                    .as_ref()
                    .and_then(|(_, expr)| integer_literal(expr)),
                description: doc_description(&variant.attrs),
            })
            .collect();
        self.index.insert(TypeDefinition::Enum(EnumDef {
            name: node.ident.to_string(),
            generics: type_parameters(&node.generics),
            variants,
            serde,
            description: doc_description(&node.attrs),
            serde_repr,
        }));
        syn::visit::visit_item_enum(self, node);
    }

    fn visit_item_type(&mut self, node: &'ast syn::ItemType) {
        self.index.insert(TypeDefinition::Alias(AliasDef {
            name: node.ident.to_string(),
            generics: type_parameters(&node.generics),
            target: TypeInfo::from_syn(&node.ty),
        }));
        syn::visit::visit_item_type(self, node);
    }
}

fn type_parameters(generics: &syn::Generics) -> Vec<String> {
    generics
        .type_params()
        .map(|param| param.ident.to_string())
        .collect()
}

fn parse_shape(fields: &syn::Fields) -> StructShape {
    match fields {
        syn::Fields::Named(named) => {
            StructShape::Named(named.named.iter().filter_map(parse_field).collect())
        }
        syn::Fields::Unnamed(unnamed) if unnamed.unnamed.len() == 1 => {
            StructShape::Newtype(TypeInfo::from_syn(&unnamed.unnamed[0].ty))
        }
        syn::Fields::Unnamed(unnamed) => StructShape::Tuple(
            unnamed
                .unnamed
                .iter()
                .map(|f| TypeInfo::from_syn(&f.ty))
                .collect(),
        ),
        syn::Fields::Unit => StructShape::Unit,
    }
}

fn parse_field(field: &syn::Field) -> Option<FieldDef> {
    let ident = field.ident.as_ref()?.to_string();
    let name = ident.strip_prefix("r#").unwrap_or(&ident).to_string();
    Some(FieldDef {
        name,
        type_info: TypeInfo::from_syn(&field.ty),
        is_public: matches!(field.vis, syn::Visibility::Public(_)),
        serde_attrs: parse_serde_attributes(&field.attrs),
        description: doc_description(&field.attrs),
        deprecated: has_attribute(&field.attrs, "deprecated"),
    })
}

fn has_attribute(attrs: &[syn::Attribute], name: &str) -> bool {
    attrs.iter().any(|attr| attr.path().is_ident(name))
}

fn integer_literal(expr: &syn::Expr) -> Option<i64> {
    match expr {
        syn::Expr::Lit(syn::ExprLit {
            lit: syn::Lit::Int(int),
            ..
        }) => int.base10_parse().ok(),
        syn::Expr::Unary(syn::ExprUnary {
            op: syn::UnOp::Neg(_),
            expr,
            ..
        }) => integer_literal(expr).map(|v| -v),
        _ => None,
    }
}

/// Consumes the value of a meta item we do not interpret.
fn skip_meta_value(meta: &syn::meta::ParseNestedMeta) -> syn::Result<()> {
    if meta.input.peek(syn::Token![=]) {
        let _: syn::Expr = meta.value()?.parse()?;
    } else if meta.input.peek(syn::token::Paren) {
        meta.parse_nested_meta(|inner| skip_meta_value(&inner))?;
    }
    Ok(())
}

fn string_value(meta: &syn::meta::ParseNestedMeta) -> syn::Result<String> {
    let lit: syn::LitStr = meta.value()?.parse()?;
    Ok(lit.value())
}

/// Parse Serde attributes from field or variant attributes
pub fn parse_serde_attributes(attrs: &[syn::Attribute]) -> SerdeAttributes {
    let mut serde_attrs = SerdeAttributes::default();

    for attr in attrs {
        if !attr.path().is_ident("serde") {
            continue;
        }
        let result = attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename") {
                if meta.input.peek(syn::Token![=]) {
                    serde_attrs.rename = Some(string_value(&meta)?);
                } else {
                    // rename(serialize = "..", deserialize = "..")
                    meta.parse_nested_meta(|inner| {
                        let value = string_value(&inner)?;
                        if inner.path.is_ident("serialize") || serde_attrs.rename.is_none() {
                            serde_attrs.rename = Some(value);
                        }
                        Ok(())
                    })?;
                }
            } else if meta.path.is_ident("skip")
                || meta.path.is_ident("skip_deserializing")
                || meta.path.is_ident("skip_serializing")
            {
                serde_attrs.skip = true;
            } else if meta.path.is_ident("flatten") {
                serde_attrs.flatten = true;
            } else if meta.path.is_ident("default") {
                serde_attrs.default = true;
                skip_meta_value(&meta)?;
            } else if meta.path.is_ident("skip_serializing_if") {
                serde_attrs.skip_serializing_if = true;
                skip_meta_value(&meta)?;
            } else {
                skip_meta_value(&meta)?;
            }
            Ok(())
        });
        if let Err(e) = result {
            debug!("Ignoring unparseable serde attribute: {}", e);
        }
    }

    serde_attrs
}

/// Parses container-level serde attributes and derive lists.
///
/// Returns the attributes and whether `serde_repr` derives are present.
fn parse_container_attributes(attrs: &[syn::Attribute]) -> (ContainerAttributes, bool) {
    let mut container = ContainerAttributes::default();
    let mut serde_repr = false;

    for attr in attrs {
        if attr.path().is_ident("derive") {
            let _ = attr.parse_nested_meta(|meta| {
                if let Some(ident) = meta.path.segments.last().map(|s| s.ident.to_string()) {
                    match ident.as_str() {
                        "Serialize" | "Deserialize" => container.serde_derived = true,
                        "Serialize_repr" | "Deserialize_repr" => serde_repr = true,
                        _ => {}
                    }
                }
                Ok(())
            });
            continue;
        }
        if !attr.path().is_ident("serde") {
            continue;
        }
        let result = attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename_all") {
                if meta.input.peek(syn::Token![=]) {
                    container.rename_all = RenameRule::parse(&string_value(&meta)?);
                } else {
                    meta.parse_nested_meta(|inner| {
                        let rule = RenameRule::parse(&string_value(&inner)?);
                        if inner.path.is_ident("serialize") || container.rename_all.is_none() {
                            container.rename_all = rule;
                        }
                        Ok(())
                    })?;
                }
            } else if meta.path.is_ident("default") {
                container.default = true;
                skip_meta_value(&meta)?;
            } else if meta.path.is_ident("tag") {
                container.tag = Some(string_value(&meta)?);
            } else if meta.path.is_ident("content") {
                container.content = Some(string_value(&meta)?);
            } else if meta.path.is_ident("untagged") {
                container.untagged = true;
            } else if meta.path.is_ident("transparent") {
                container.transparent = true;
            } else {
                skip_meta_value(&meta)?;
            }
            Ok(())
        });
        if let Err(e) = result {
            debug!("Ignoring unparseable serde container attribute: {}", e);
        }
    }

    (container, serde_repr)
}
