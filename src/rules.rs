//! Compiles flat validation-rule lists into an object schema.
//!
//! Input is a map from field path to rule names, e.g.
//! `"items.*.name" => ["required", "string", "max:64"]`. Dotted paths fold into
//! nested objects and a `*` segment turns its parent into an array.

use crate::schema::{Schema, SchemaKind};
use indexmap::IndexMap;
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Schema fragment a rule name maps to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleFragment {
    #[serde(rename = "type", default)]
    pub kind: Option<SchemaKind>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub pattern: Option<String>,
}

impl RuleFragment {
    fn new(kind: SchemaKind, format: Option<&str>, pattern: Option<&str>) -> Self {
        Self {
            kind: Some(kind),
            format: format.map(str::to_string),
            pattern: pattern.map(str::to_string),
        }
    }
}

/// Splits a `|`-separated rule string such as `"required|email|max:255"`.
pub fn parse_rule_list(rules: &str) -> Vec<String> {
    rules
        .split('|')
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Clone, Copy)]
enum Bound {
    Min,
    Max,
}

/// Flags a rule list sets on the field's parent rather than on the field.
#[derive(Debug, Default)]
struct FieldFlags {
    required: bool,
    confirmed: bool,
}

/// Rule mapper with an optional table of overriding rule fragments.
#[derive(Debug, Clone, Default)]
pub struct RuleMapper {
    overrides: IndexMap<String, RuleFragment>,
}

impl RuleMapper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rule names in `overrides` take precedence over the built-in table.
    pub fn with_overrides(overrides: IndexMap<String, RuleFragment>) -> Self {
        Self { overrides }
    }

    /// Folds every field path into one object schema.
    pub fn map_all_rules(&self, rules: &IndexMap<String, Vec<String>>) -> Schema {
        let mut root = Schema::object();
        for (path, field_rules) in rules {
            let segments: Vec<&str> = path.split('.').filter(|s| !s.is_empty()).collect();
            if segments.is_empty() {
                continue;
            }
            self.fold(&mut root, &segments, field_rules);
        }
        root
    }

    fn fold(&self, parent: &mut Schema, segments: &[&str], rules: &[String]) {
        let (segment, rest) = (segments[0], &segments[1..]);

        if segment == "*" {
            if parent.kind != Some(SchemaKind::Array) {
                // length bounds recorded before the node became a list count items
                if let Some(min) = parent.min_length.take() {
                    parent.min_items = Some(min);
                }
                if let Some(max) = parent.max_length.take() {
                    parent.max_items = Some(max);
                }
            }
            parent.kind = Some(SchemaKind::Array);
            let items = parent.items.get_or_insert_with(Box::default);
            if rest.is_empty() {
                let (compiled, _) = self.compile(rules, Some(std::mem::take(items.as_mut())));
                **items = compiled;
            } else {
                if items.kind.is_none() {
                    items.kind = Some(SchemaKind::Object);
                }
                self.fold(items, rest, rules);
            }
            return;
        }

        parent.kind = Some(SchemaKind::Object);

        if !rest.is_empty() {
            let child = parent
                .properties
                .entry(segment.to_string())
                .or_insert_with(Schema::object);
            self.fold(child, rest, rules);
            return;
        }

        // taking the value leaves the key in place, so property order is kept
        let existing = parent.properties.get_mut(segment).map(std::mem::take);
        let (compiled, flags) = self.compile(rules, existing);
        if flags.confirmed {
            let mirror = compiled.clone();
            parent.insert_property(segment, compiled, flags.required);
            parent.insert_property(&format!("{}_confirmation", segment), mirror, flags.required);
        } else {
            parent.insert_property(segment, compiled, flags.required);
        }
    }

    /// Compiles one field's rules, merging into an existing node.
    ///
    /// An explicit type rule overrides the existing kind; without one the
    /// existing kind is kept, and a new field defaults to `string`.
    fn compile(&self, rules: &[String], existing: Option<Schema>) -> (Schema, FieldFlags) {
        let mut schema = existing.unwrap_or_default();
        let mut flags = FieldFlags::default();

        for rule in rules {
            let (name, _) = split_rule(rule);
            if let Some(fragment) = self.type_fragment(name, rule) {
                if let Some(kind) = fragment.kind {
                    schema.kind = Some(kind);
                }
                if fragment.format.is_some() {
                    schema.format = fragment.format;
                }
                if fragment.pattern.is_some() {
                    schema.pattern = fragment.pattern;
                }
            }
        }
        let kind = *schema.kind.get_or_insert(SchemaKind::String);
        if kind == SchemaKind::Array && schema.items.is_none() {
            schema.items = Some(Box::new(Schema::object()));
        }

        for rule in rules {
            let (name, argument) = split_rule(rule);
            match name {
                "required" => flags.required = true,
                "confirmed" => flags.confirmed = true,
                "nullable" => schema.nullable = true,
                "sometimes" | "present" | "filled" | "bail" => {}
                "min" => apply_bound(&mut schema, Bound::Min, argument),
                "max" => apply_bound(&mut schema, Bound::Max, argument),
                "size" => {
                    apply_bound(&mut schema, Bound::Min, argument);
                    apply_bound(&mut schema, Bound::Max, argument);
                }
                "between" => {
                    let mut parts = argument.unwrap_or("").splitn(2, ',');
                    apply_bound(&mut schema, Bound::Min, parts.next());
                    apply_bound(&mut schema, Bound::Max, parts.next());
                }
                "gt" | "gte" | "lt" | "lte" => apply_comparison(&mut schema, name, argument),
                "in" => {
                    let values = argument
                        .unwrap_or("")
                        .split(',')
                        .map(|v| typed_literal(kind, v.trim().trim_matches('"')))
                        .collect();
                    schema.enum_values = values;
                }
                "required_if" | "required_unless" | "required_with" | "required_with_all"
                | "required_without" | "required_without_all" => {
                    append_description(&mut schema, &conditional_text(name, argument));
                }
                _ => {
                    if self.type_fragment(name, rule).is_none() {
                        debug!("Ignoring unknown validation rule: {}", rule);
                    }
                }
            }
        }

        (schema, flags)
    }

    fn type_fragment(&self, name: &str, rule: &str) -> Option<RuleFragment> {
        if let Some(fragment) = self.overrides.get(name) {
            return Some(fragment.clone());
        }
        let fragment = match name {
            "string" => RuleFragment::new(SchemaKind::String, None, None),
            "integer" | "int" => RuleFragment::new(SchemaKind::Integer, None, None),
            "numeric" | "number" | "decimal" => RuleFragment::new(SchemaKind::Number, None, None),
            "boolean" | "bool" | "accepted" => RuleFragment::new(SchemaKind::Boolean, None, None),
            "array" | "list" => RuleFragment::new(SchemaKind::Array, None, None),
            "object" => RuleFragment::new(SchemaKind::Object, None, None),
            "email" => RuleFragment::new(SchemaKind::String, Some("email"), None),
            "url" | "active_url" => RuleFragment::new(SchemaKind::String, Some("uri"), None),
            "uuid" => RuleFragment::new(SchemaKind::String, Some("uuid"), None),
            "date" => RuleFragment::new(SchemaKind::String, Some("date"), None),
            "date_format" => RuleFragment::new(SchemaKind::String, Some("date-time"), None),
            "ip" => RuleFragment::new(SchemaKind::String, Some("ip"), None),
            "ipv4" => RuleFragment::new(SchemaKind::String, Some("ipv4"), None),
            "ipv6" => RuleFragment::new(SchemaKind::String, Some("ipv6"), None),
            "json" => RuleFragment::new(SchemaKind::String, Some("json"), None),
            "password" => RuleFragment::new(SchemaKind::String, Some("password"), None),
            "file" | "image" | "mimes" => {
                RuleFragment::new(SchemaKind::String, Some("binary"), None)
            }
            "alpha" => RuleFragment::new(SchemaKind::String, None, Some("^[a-zA-Z]+$")),
            "alpha_num" => RuleFragment::new(SchemaKind::String, None, Some("^[a-zA-Z0-9]+$")),
            "alpha_dash" => {
                RuleFragment::new(SchemaKind::String, None, Some("^[a-zA-Z0-9_-]+$"))
            }
            "regex" => {
                let (_, pattern) = split_rule(rule);
                let pattern = pattern?;
                let pattern = strip_delimiters(pattern);
                RuleFragment::new(SchemaKind::String, None, Some(pattern))
            }
            _ => return None,
        };
        Some(fragment)
    }
}

fn split_rule(rule: &str) -> (&str, Option<&str>) {
    match rule.split_once(':') {
        Some((name, argument)) => (name.trim(), Some(argument.trim())),
        None => (rule.trim(), None),
    }
}

/// `/^\d+$/i` becomes `^\d+$`.
fn strip_delimiters(pattern: &str) -> &str {
    if let Some(body) = pattern.strip_prefix('/') {
        if let Some(end) = body.rfind('/') {
            return &body[..end];
        }
    }
    pattern
}

fn apply_bound(schema: &mut Schema, bound: Bound, argument: Option<&str>) {
    let Some(value) = argument.and_then(|a| a.trim().parse::<f64>().ok()) else {
        return;
    };
    match (schema.kind, bound) {
        (Some(SchemaKind::Integer | SchemaKind::Number), Bound::Min) => schema.minimum = Some(value),
        (Some(SchemaKind::Integer | SchemaKind::Number), Bound::Max) => schema.maximum = Some(value),
        (Some(SchemaKind::Array), Bound::Min) => schema.min_items = Some(value as usize),
        (Some(SchemaKind::Array), Bound::Max) => schema.max_items = Some(value as usize),
        (_, Bound::Min) => schema.min_length = Some(value as usize),
        (_, Bound::Max) => schema.max_length = Some(value as usize),
    }
}

/// `gt`/`gte`/`lt`/`lte` against a literal number. Comparisons against
/// another field carry no structural meaning and are dropped.
fn apply_comparison(schema: &mut Schema, rule: &str, argument: Option<&str>) {
    let Some(value) = argument.and_then(|a| a.parse::<f64>().ok()) else {
        return;
    };
    let step = if schema.kind == Some(SchemaKind::Integer) {
        1.0
    } else {
        0.0
    };
    match rule {
        "gt" => schema.minimum = Some(value + step),
        "gte" => schema.minimum = Some(value),
        "lt" => schema.maximum = Some(value - step),
        "lte" => schema.maximum = Some(value),
        _ => {}
    }
}

fn typed_literal(kind: SchemaKind, literal: &str) -> Value {
    match kind {
        SchemaKind::Integer => literal
            .parse::<i64>()
            .map(Value::from)
            .unwrap_or_else(|_| Value::String(literal.to_string())),
        SchemaKind::Number => literal
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .unwrap_or_else(|| Value::String(literal.to_string())),
        SchemaKind::Boolean => match literal {
            "true" | "1" => Value::Bool(true),
            "false" | "0" => Value::Bool(false),
            _ => Value::String(literal.to_string()),
        },
        _ => Value::String(literal.to_string()),
    }
}

fn conditional_text(rule: &str, argument: Option<&str>) -> String {
    let argument = argument.unwrap_or("");
    let fields = argument.split(',').map(str::trim).collect::<Vec<_>>();
    match rule {
        "required_if" | "required_unless" => {
            let field = fields.first().copied().unwrap_or("");
            let values = fields.get(1..).unwrap_or(&[]).join(", ");
            let verb = if rule == "required_if" { "if" } else { "unless" };
            format!("Required {} {} is {}.", verb, field, values)
        }
        "required_with" => format!("Required when {} is present.", fields.join(", ")),
        "required_with_all" => format!("Required when all of {} are present.", fields.join(", ")),
        "required_without" => format!("Required when {} is absent.", fields.join(", ")),
        _ => format!("Required when all of {} are absent.", fields.join(", ")),
    }
}

fn append_description(schema: &mut Schema, text: &str) {
    schema.description = Some(match schema.description.take() {
        Some(existing) => format!("{} {}", existing, text),
        None => text.to_string(),
    });
}
