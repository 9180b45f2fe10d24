//! Synthetic examples for schemas that lack them.
//!
//! Each leaf without an `example` goes through a fixed cascade: first enum
//! value, declared default, canned value for the format, field-name
//! heuristics, numeric bound midpoint, and finally a value for the bare kind.
//! Existing examples are never replaced, which makes generation idempotent.

use crate::schema::{Schema, SchemaKind};
use crate::type_index::RenameRule;
use regex::Regex;
use serde_json::{json, Value};
use std::borrow::Cow;

pub struct ExampleGenerator;

/// Value a field-name heuristic proposes, per target kind.
struct Heuristic {
    matches: fn(&str) -> bool,
    string: Option<&'static str>,
    integer: Option<i64>,
    number: Option<f64>,
    boolean: Option<bool>,
}

impl Heuristic {
    const fn new(matches: fn(&str) -> bool) -> Self {
        Self {
            matches,
            string: None,
            integer: None,
            number: None,
            boolean: None,
        }
    }

    const fn string(mut self, value: &'static str) -> Self {
        self.string = Some(value);
        self
    }

    const fn integer(mut self, value: i64) -> Self {
        self.integer = Some(value);
        self
    }

    const fn number(mut self, value: f64) -> Self {
        self.number = Some(value);
        self
    }

    const fn boolean(mut self, value: bool) -> Self {
        self.boolean = Some(value);
        self
    }
}

/// Checked in order; the first entry with a value for the field's kind wins.
static HEURISTICS: &[Heuristic] = &[
    Heuristic::new(|n| n.contains("email")).string("user@example.com"),
    Heuristic::new(|n| n == "id" || n.ends_with("_id") || n == "uuid")
        .string("3fa85f64-5717-4562-b3fc-2c963f66afa6")
        .integer(1),
    Heuristic::new(|n| n == "first_name" || n == "firstname").string("Jane"),
    Heuristic::new(|n| n == "last_name" || n == "lastname" || n == "surname").string("Doe"),
    Heuristic::new(|n| n == "username" || n == "login" || n == "handle").string("janedoe"),
    Heuristic::new(|n| n == "name" || n.ends_with("_name")).string("Jane Doe"),
    Heuristic::new(|n| n.contains("password") || n.contains("secret")).string("********"),
    Heuristic::new(|n| n.contains("token")).string("eyJhbGciOiJIUzI1NiJ9"),
    Heuristic::new(|n| n.contains("phone") || n.contains("mobile")).string("+1-555-0100"),
    Heuristic::new(|n| n.contains("url") || n.contains("link") || n.contains("website"))
        .string("https://example.com"),
    Heuristic::new(|n| n.ends_with("_at") || n.contains("date") || n.contains("time"))
        .string("2024-01-01T00:00:00Z")
        .integer(1_704_067_200),
    Heuristic::new(|n| n.contains("currency")).string("USD"),
    Heuristic::new(|n| {
        n.contains("price") || n.contains("amount") || n.contains("cost") || n == "total"
    })
    .string("9.99")
    .integer(100)
    .number(9.99),
    Heuristic::new(|n| n == "country" || n == "country_code").string("US"),
    Heuristic::new(|n| n == "city").string("Springfield"),
    Heuristic::new(|n| n.contains("zip") || n.contains("postal")).string("12345"),
    Heuristic::new(|n| n.contains("address") || n == "street").string("123 Main St"),
    Heuristic::new(|n| n == "lat" || n == "latitude").number(52.52),
    Heuristic::new(|n| n == "lng" || n == "lon" || n == "longitude").number(13.405),
    Heuristic::new(|n| n == "age").integer(30),
    Heuristic::new(|n| n == "per_page" || n == "limit" || n == "page_size").integer(20),
    Heuristic::new(|n| {
        n == "page" || n.contains("count") || n.contains("quantity") || n == "qty"
    })
    .integer(1),
    Heuristic::new(|n| n == "title" || n == "subject").string("Example title"),
    Heuristic::new(|n| {
        n.contains("description") || n == "summary" || n == "bio" || n == "body"
    })
    .string("Lorem ipsum dolor sit amet"),
    Heuristic::new(|n| n == "slug").string("example-slug"),
    Heuristic::new(|n| n == "status" || n == "state").string("active"),
    Heuristic::new(|n| n == "locale" || n == "lang" || n == "language").string("en"),
    Heuristic::new(|n| n.contains("color") || n.contains("colour")).string("#336699"),
    Heuristic::new(|n| {
        n.starts_with("is_")
            || n.starts_with("has_")
            || n.starts_with("can_")
            || n == "active"
            || n == "enabled"
            || n == "verified"
    })
    .boolean(true),
];

impl ExampleGenerator {
    /// Returns `schema` with examples filled in, borrowed when nothing was
    /// missing.
    pub fn generate(schema: &Schema) -> Cow<'_, Schema> {
        let mut filled = schema.clone();
        if Self::fill(&mut filled, None) {
            Cow::Owned(filled)
        } else {
            Cow::Borrowed(schema)
        }
    }

    /// In-place variant of [`generate`](Self::generate). Returns whether
    /// anything changed.
    pub fn fill_in_place(schema: &mut Schema) -> bool {
        Self::fill(schema, None)
    }

    fn fill(schema: &mut Schema, field: Option<&str>) -> bool {
        if schema.is_reference() {
            return false;
        }
        if schema.is_composition() {
            let mut changed = false;
            for branch in schema
                .one_of
                .iter_mut()
                .chain(schema.all_of.iter_mut())
                .chain(schema.any_of.iter_mut())
            {
                changed |= Self::fill(branch, field);
            }
            return changed;
        }

        match schema.kind {
            Some(SchemaKind::Object) => {
                let mut changed = false;
                for (name, property) in schema.properties.iter_mut() {
                    changed |= Self::fill(property, Some(name.as_str()));
                }
                if let Some(values) = schema.additional_properties.as_mut() {
                    changed |= Self::fill(values, None);
                }
                changed
            }
            Some(SchemaKind::Array) => {
                let Some(items) = schema.items.as_mut() else {
                    return false;
                };
                let had_example = items.example.is_some();
                let mut changed = Self::fill(items, field);
                if schema.example.is_none() && !had_example {
                    if let Some(example) = items.example.clone() {
                        schema.example = Some(Value::Array(vec![example]));
                        changed = true;
                    }
                }
                changed
            }
            Some(SchemaKind::Null) | None => false,
            Some(kind) => {
                if schema.example.is_some() {
                    return false;
                }
                match Self::leaf_example(schema, kind, field) {
                    Some(example) => {
                        schema.example = Some(example);
                        true
                    }
                    None => false,
                }
            }
        }
    }

    fn leaf_example(schema: &Schema, kind: SchemaKind, field: Option<&str>) -> Option<Value> {
        if let Some(first) = schema.enum_values.first() {
            return Some(first.clone());
        }
        if let Some(default) = &schema.default {
            return Some(default.clone());
        }
        if kind == SchemaKind::String {
            if let Some(value) = schema.format.as_deref().and_then(format_example) {
                return Some(Value::String(value.to_string()));
            }
        }
        if let Some(value) = field.and_then(|name| name_example(schema, kind, name)) {
            return Some(value);
        }
        if kind.is_numeric() {
            if let Some(value) = bound_midpoint(schema, kind) {
                return Some(value);
            }
        }
        Some(kind_fallback(schema, kind))
    }
}

fn format_example(format: &str) -> Option<&'static str> {
    let value = match format {
        "email" | "idn-email" => "user@example.com",
        "uri" | "url" => "https://example.com",
        "uuid" => "3fa85f64-5717-4562-b3fc-2c963f66afa6",
        "date" => "2024-01-01",
        "date-time" => "2024-01-01T00:00:00Z",
        "time" => "12:00:00",
        "duration" => "PT1H",
        "ip" | "ipv4" => "192.168.0.1",
        "ipv6" => "2001:db8::1",
        "hostname" => "example.com",
        "byte" => "aGVsbG8=",
        "binary" => "file.bin",
        "password" => "********",
        "decimal" => "10.50",
        "json" => "{}",
        _ => return None,
    };
    Some(value)
}

fn name_example(schema: &Schema, kind: SchemaKind, field: &str) -> Option<Value> {
    let name = RenameRule::Snake.apply(field);
    for heuristic in HEURISTICS {
        if !(heuristic.matches)(&name) {
            continue;
        }
        let candidate = match kind {
            SchemaKind::String => heuristic.string.map(|s| json!(s)),
            SchemaKind::Integer => heuristic.integer.map(|v| json!(clamp(schema, v as f64) as i64)),
            SchemaKind::Number => heuristic
                .number
                .or(heuristic.integer.map(|v| v as f64))
                .map(|v| json!(clamp(schema, v))),
            SchemaKind::Boolean => heuristic.boolean.map(Value::Bool),
            _ => None,
        };
        if let Some(value) = candidate {
            if fits_string_constraints(schema, &value) {
                return Some(value);
            }
        }
    }
    None
}

fn clamp(schema: &Schema, value: f64) -> f64 {
    let mut value = value;
    if let Some(min) = schema.minimum {
        value = value.max(min);
    }
    if let Some(max) = schema.maximum {
        value = value.min(max);
    }
    value
}

/// A heuristic string must respect length bounds and any pattern.
fn fits_string_constraints(schema: &Schema, value: &Value) -> bool {
    let Some(text) = value.as_str() else {
        return true;
    };
    let length = text.chars().count();
    if schema.min_length.is_some_and(|min| length < min)
        || schema.max_length.is_some_and(|max| length > max)
    {
        return false;
    }
    match &schema.pattern {
        Some(pattern) => Regex::new(pattern).map_or(true, |re| re.is_match(text)),
        None => true,
    }
}

fn bound_midpoint(schema: &Schema, kind: SchemaKind) -> Option<Value> {
    let value = match (schema.minimum, schema.maximum) {
        (Some(min), Some(max)) => (min + max) / 2.0,
        (Some(min), None) => min,
        (None, Some(max)) => max,
        (None, None) => return None,
    };
    Some(if kind == SchemaKind::Integer {
        json!(value.floor() as i64)
    } else {
        json!(value)
    })
}

/// Longest string the fallback pads to, whatever `minLength` asks for.
const MAX_PADDED_LENGTH: usize = 256;

fn kind_fallback(schema: &Schema, kind: SchemaKind) -> Value {
    match kind {
        SchemaKind::String => {
            let mut text = String::from("string");
            if let Some(min) = schema.min_length {
                let target = min.min(MAX_PADDED_LENGTH);
                text.push_str(&"x".repeat(target.saturating_sub(text.len())));
            }
            if let Some(max) = schema.max_length {
                text.truncate(max);
            }
            Value::String(text)
        }
        SchemaKind::Integer => json!(0),
        SchemaKind::Number => json!(0.0),
        SchemaKind::Boolean => Value::Bool(true),
        _ => Value::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn generated(schema: &Schema) -> Schema {
        ExampleGenerator::generate(schema).into_owned()
    }

    #[test]
    fn test_enum_first_value_wins() {
        let schema = Schema::string().with_enum(vec![json!("mini"), json!("pro"), json!("enterprise")]);
        assert_eq!(generated(&schema).example, Some(json!("mini")));
    }

    #[test]
    fn test_default_before_format() {
        let mut schema = Schema::string().with_format("email");
        schema.default = Some(json!("admin@example.org"));
        assert_eq!(generated(&schema).example, Some(json!("admin@example.org")));
    }

    #[test]
    fn test_format_before_name() {
        let mut object = Schema::object();
        object.insert_property("contact", Schema::string().with_format("uuid"), true);
        let result = generated(&object);
        assert_eq!(
            result.properties["contact"].example,
            Some(json!("3fa85f64-5717-4562-b3fc-2c963f66afa6"))
        );
    }

    #[test]
    fn test_name_heuristics_are_kind_aware() {
        let mut object = Schema::object();
        object.insert_property("userId", Schema::integer(), true);
        object.insert_property("order_id", Schema::string(), true);
        object.insert_property("createdAt", Schema::string(), true);
        object.insert_property("is_active", Schema::boolean(), true);
        object.insert_property("price", Schema::number(), true);
        let result = generated(&object);
        assert_eq!(result.properties["userId"].example, Some(json!(1)));
        assert_eq!(
            result.properties["order_id"].example,
            Some(json!("3fa85f64-5717-4562-b3fc-2c963f66afa6"))
        );
        assert_eq!(
            result.properties["createdAt"].example,
            Some(json!("2024-01-01T00:00:00Z"))
        );
        assert_eq!(result.properties["is_active"].example, Some(json!(true)));
        assert_eq!(result.properties["price"].example, Some(json!(9.99)));
    }

    #[test]
    fn test_name_heuristic_clamped_to_bounds() {
        let mut age = Schema::integer();
        age.minimum = Some(40.0);
        let mut object = Schema::object();
        object.insert_property("age", age, true);
        assert_eq!(generated(&object).properties["age"].example, Some(json!(40)));
    }

    #[test]
    fn test_numeric_midpoint_and_fallbacks() {
        let mut bounded = Schema::integer();
        bounded.minimum = Some(1.0);
        bounded.maximum = Some(10.0);
        assert_eq!(generated(&bounded).example, Some(json!(5)));

        let mut short = Schema::string();
        short.max_length = Some(3);
        assert_eq!(generated(&short).example, Some(json!("str")));

        let mut long = Schema::string();
        long.min_length = Some(8);
        assert_eq!(generated(&long).example, Some(json!("stringxx")));

        let mut huge = Schema::string();
        huge.min_length = Some(1_000_000_000);
        let example = generated(&huge).example.unwrap();
        assert_eq!(example.as_str().unwrap().len(), MAX_PADDED_LENGTH);

        assert_eq!(generated(&Schema::boolean()).example, Some(json!(true)));
    }

    #[test]
    fn test_array_synthesizes_single_element() {
        let schema = Schema::array(Schema::string().with_format("email"));
        let result = generated(&schema);
        assert_eq!(result.example, Some(json!(["user@example.com"])));

        let mut preset = Schema::string();
        preset.example = Some(json!("kept"));
        let schema = Schema::array(preset);
        assert!(generated(&schema).example.is_none());
    }

    #[test]
    fn test_references_and_existing_examples_untouched() {
        let reference = Schema::reference_to("User");
        assert!(matches!(ExampleGenerator::generate(&reference), Cow::Borrowed(_)));

        let mut schema = Schema::string();
        schema.example = Some(json!("given"));
        assert!(matches!(ExampleGenerator::generate(&schema), Cow::Borrowed(_)));
    }

    #[test]
    fn test_compositions_recurse_into_branches() {
        let schema = Schema::one_of(vec![Schema::integer(), Schema::reference_to("X")]);
        let result = generated(&schema);
        assert!(result.example.is_none());
        assert_eq!(result.one_of[0].example, Some(json!(0)));
        assert!(result.one_of[1].example.is_none());
    }

    #[test]
    fn test_idempotent() {
        let mut object = Schema::object();
        object.insert_property("email", Schema::string(), true);
        object.insert_property("tags", Schema::array(Schema::string()), false);
        object.insert_property("plan", Schema::string().with_enum(vec![json!("mini")]), true);
        let once = generated(&object);
        let twice = ExampleGenerator::generate(&once);
        assert!(matches!(twice, Cow::Borrowed(_)));
        assert_eq!(twice.into_owned(), once);
    }
}
