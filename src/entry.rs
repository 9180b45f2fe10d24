//! Entry points and the type descriptions attached to them.
//!
//! An [`EntryPoint`] is one externally reachable operation: an HTTP method, a
//! path template and the handler that serves it. Discovery produces them; the
//! generator consumes them in order.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// HTTP methods an entry point can be bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Options,
    Head,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Head => "HEAD",
        }
    }

    /// Parses a method name, case-insensitively.
    pub fn parse(method: &str) -> Option<Self> {
        match method.to_lowercase().as_str() {
            "get" => Some(HttpMethod::Get),
            "post" => Some(HttpMethod::Post),
            "put" => Some(HttpMethod::Put),
            "delete" => Some(HttpMethod::Delete),
            "patch" => Some(HttpMethod::Patch),
            "options" => Some(HttpMethod::Options),
            "head" => Some(HttpMethod::Head),
            _ => None,
        }
    }

    /// Methods whose requests conventionally carry a body.
    pub fn accepts_body(&self) -> bool {
        matches!(self, HttpMethod::Post | HttpMethod::Put | HttpMethod::Patch)
    }
}

/// Where a parameter value is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterLocation {
    Path,
    Query,
    Header,
    Cookie,
}

impl ParameterLocation {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParameterLocation::Path => "path",
            ParameterLocation::Query => "query",
            ParameterLocation::Header => "header",
            ParameterLocation::Cookie => "cookie",
        }
    }

    pub fn parse(location: &str) -> Option<Self> {
        match location.to_lowercase().as_str() {
            "path" => Some(ParameterLocation::Path),
            "query" => Some(ParameterLocation::Query),
            "header" => Some(ParameterLocation::Header),
            "cookie" => Some(ParameterLocation::Cookie),
            _ => None,
        }
    }
}

/// A declarative `@name value` line from a handler's doc comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    pub name: String,
    pub value: String,
}

static ANNOTATION_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*@([A-Za-z][\w-]*)\s*(.*?)\s*$").expect("valid annotation regex"));

impl Annotation {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Parses one doc line; plain prose yields `None`.
    pub fn parse_line(line: &str) -> Option<Self> {
        let captures = ANNOTATION_REGEX.captures(line)?;
        Some(Self {
            name: captures.get(1)?.as_str().to_lowercase(),
            value: captures.get(2).map(|m| m.as_str()).unwrap_or("").to_string(),
        })
    }

    /// Collects annotations from `///` doc attributes.
    pub fn from_attributes(attrs: &[syn::Attribute]) -> Vec<Self> {
        doc_lines(attrs)
            .iter()
            .filter_map(|line| Self::parse_line(line))
            .collect()
    }
}

/// Doc comment lines with the leading rustdoc space removed.
pub fn doc_lines(attrs: &[syn::Attribute]) -> Vec<String> {
    let mut lines = Vec::new();
    for attr in attrs {
        if !attr.path().is_ident("doc") {
            continue;
        }
        if let syn::Meta::NameValue(meta) = &attr.meta {
            if let syn::Expr::Lit(syn::ExprLit {
                lit: syn::Lit::Str(lit),
                ..
            }) = &meta.value
            {
                let line = lit.value();
                lines.push(line.strip_prefix(' ').unwrap_or(&line).to_string());
            }
        }
    }
    lines
}

/// Prose part of a doc comment (annotation lines excluded), if any.
pub fn doc_description(attrs: &[syn::Attribute]) -> Option<String> {
    let text = doc_lines(attrs)
        .into_iter()
        .filter(|line| Annotation::parse_line(line).is_none())
        .collect::<Vec<_>>()
        .join("\n");
    let text = text.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

/// Source of the handler function serving an entry point.
#[derive(Debug, Clone)]
pub struct HandlerSource {
    pub item: syn::ItemFn,
}

impl HandlerSource {
    pub fn new(item: syn::ItemFn) -> Self {
        Self { item }
    }

    pub fn signature(&self) -> &syn::Signature {
        &self.item.sig
    }

    pub fn body(&self) -> &syn::Block {
        &self.item.block
    }

    pub fn is_deprecated(&self) -> bool {
        self.item.attrs.iter().any(|a| a.path().is_ident("deprecated"))
    }

    pub fn description(&self) -> Option<String> {
        doc_description(&self.item.attrs)
    }

    /// Types of all typed arguments, in declaration order.
    pub fn argument_types(&self) -> Vec<TypeInfo> {
        self.item
            .sig
            .inputs
            .iter()
            .filter_map(|input| match input {
                syn::FnArg::Typed(pat_type) => Some(TypeInfo::from_syn(&pat_type.ty)),
                syn::FnArg::Receiver(_) => None,
            })
            .collect()
    }

    pub fn return_type(&self) -> Option<TypeInfo> {
        match &self.item.sig.output {
            syn::ReturnType::Default => None,
            syn::ReturnType::Type(_, ty) => Some(TypeInfo::from_syn(ty)),
        }
    }
}

/// One externally reachable operation being documented.
#[derive(Debug, Clone)]
pub struct EntryPoint {
    /// Stable identifier, used as the operation id
    pub id: String,
    pub method: HttpMethod,
    /// Path template in `{param}` form
    pub path: String,
    pub handler_name: String,
    pub annotations: Vec<Annotation>,
    pub handler: Option<HandlerSource>,
}

impl EntryPoint {
    pub fn new(method: HttpMethod, path: &str, handler_name: &str) -> Self {
        Self {
            id: handler_name.to_string(),
            method,
            path: normalize_path(path),
            handler_name: handler_name.to_string(),
            annotations: Vec::new(),
            handler: None,
        }
    }

    /// Attaches the handler source; its doc annotations are appended.
    pub fn with_handler(mut self, item: syn::ItemFn) -> Self {
        self.annotations
            .extend(Annotation::from_attributes(&item.attrs));
        self.handler = Some(HandlerSource::new(item));
        self
    }

    pub fn with_annotation(mut self, name: &str, value: &str) -> Self {
        self.annotations.push(Annotation::new(name, value));
        self
    }

    pub fn annotations_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Annotation> + 'a {
        self.annotations.iter().filter(move |a| a.name == name)
    }

    pub fn has_annotation(&self, name: &str) -> bool {
        self.annotations.iter().any(|a| a.name == name)
    }

    /// Names of the `{param}` segments of the path template.
    pub fn path_parameters(&self) -> Vec<String> {
        self.path
            .split('/')
            .filter_map(|segment| {
                segment
                    .strip_prefix('{')
                    .and_then(|s| s.strip_suffix('}'))
                    .map(|s| s.trim_start_matches('*').to_string())
            })
            .collect()
    }
}

/// Converts axum-style `:param` and `*rest` segments to `{param}`.
pub fn normalize_path(path: &str) -> String {
    let converted: Vec<String> = path
        .split('/')
        .map(|part| {
            if let Some(name) = part.strip_prefix(':') {
                format!("{{{}}}", name)
            } else if let Some(name) = part.strip_prefix('*') {
                format!("{{{}}}", name)
            } else if let Some(name) = part.strip_prefix("{*") {
                format!("{{{}", name)
            } else {
                part.to_string()
            }
        })
        .collect();
    let joined = converted.join("/");
    if joined.is_empty() {
        "/".to_string()
    } else {
        joined
    }
}

/// A Rust type reference reduced to what schema generation needs.
///
/// Paths keep only their last segment (`chrono::DateTime<Utc>` becomes
/// `DateTime` with one argument). References, slices and arrays are folded:
/// `&[T]` and `[T; N]` read as `Vec<T>`. Tuples are named `Tuple`, the unit
/// type `()`, and anything without a nameable shape `Unknown`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeInfo {
    pub name: String,
    pub generic_args: Vec<TypeInfo>,
}

impl TypeInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            generic_args: Vec::new(),
        }
    }

    pub fn with_args(name: impl Into<String>, generic_args: Vec<TypeInfo>) -> Self {
        Self {
            name: name.into(),
            generic_args,
        }
    }

    pub fn option(inner: TypeInfo) -> Self {
        Self::with_args("Option", vec![inner])
    }

    pub fn vec(inner: TypeInfo) -> Self {
        Self::with_args("Vec", vec![inner])
    }

    pub fn unknown() -> Self {
        Self::new("Unknown")
    }

    pub fn is_option(&self) -> bool {
        self.name == "Option" && self.generic_args.len() == 1
    }

    pub fn is_unit(&self) -> bool {
        self.name == "()"
    }

    pub fn is_unknown(&self) -> bool {
        self.name == "Unknown"
    }

    /// First generic argument, if any.
    pub fn inner(&self) -> Option<&TypeInfo> {
        self.generic_args.first()
    }

    /// Whether `name` appears anywhere in this type, arguments included.
    pub fn mentions(&self, name: &str) -> bool {
        self.name == name || self.generic_args.iter().any(|a| a.mentions(name))
    }

    /// Cache key that distinguishes instantiations: `Page<User>`.
    pub fn display_key(&self) -> String {
        if self.generic_args.is_empty() {
            self.name.clone()
        } else {
            let args: Vec<String> = self.generic_args.iter().map(|a| a.display_key()).collect();
            format!("{}<{}>", self.name, args.join(", "))
        }
    }

    /// Component name for an instantiation: `Page<User>` becomes `PageUser`.
    pub fn component_name(&self) -> String {
        let mut name = self.name.clone();
        for arg in &self.generic_args {
            name.push_str(&arg.component_name());
        }
        name.chars().filter(|c| c.is_alphanumeric() || *c == '_').collect()
    }

    /// Parses a type written as text, such as an annotation value.
    pub fn parse(text: &str) -> Option<Self> {
        syn::parse_str::<syn::Type>(text)
            .ok()
            .map(|ty| Self::from_syn(&ty))
    }

    pub fn from_syn(ty: &syn::Type) -> Self {
        match ty {
            syn::Type::Path(type_path) => Self::from_path(&type_path.path),
            syn::Type::Reference(reference) => Self::from_syn(&reference.elem),
            syn::Type::Slice(slice) => Self::vec(Self::from_syn(&slice.elem)),
            syn::Type::Array(array) => Self::vec(Self::from_syn(&array.elem)),
            syn::Type::Paren(paren) => Self::from_syn(&paren.elem),
            syn::Type::Group(group) => Self::from_syn(&group.elem),
            syn::Type::Ptr(ptr) => Self::from_syn(&ptr.elem),
            syn::Type::Tuple(tuple) => {
                if tuple.elems.is_empty() {
                    Self::new("()")
                } else {
                    Self::with_args("Tuple", tuple.elems.iter().map(Self::from_syn).collect())
                }
            }
            _ => Self::unknown(),
        }
    }

    fn from_path(path: &syn::Path) -> Self {
        let Some(segment) = path.segments.last() else {
            return Self::unknown();
        };
        let mut generic_args = Vec::new();
        if let syn::PathArguments::AngleBracketed(args) = &segment.arguments {
            for arg in &args.args {
                if let syn::GenericArgument::Type(inner) = arg {
                    generic_args.push(Self::from_syn(inner));
                }
            }
        }
        Self::with_args(segment.ident.to_string(), generic_args)
    }
}
