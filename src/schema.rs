//! Structural schema model shared by every analysis stage.
//!
//! A [`Schema`] describes the shape of a value independently of any wire
//! format. It serializes with OpenAPI 3.0 field names so emitters can write it
//! out unchanged.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Prefix of every component reference produced by the registry.
pub const COMPONENT_REF_PREFIX: &str = "#/components/schemas/";

/// Primitive kind of a schema node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaKind {
    String,
    Integer,
    Number,
    Boolean,
    Object,
    Array,
    Null,
}

impl SchemaKind {
    /// Whether values of this kind have no nested structure.
    pub fn is_scalar(self) -> bool {
        matches!(
            self,
            SchemaKind::String
                | SchemaKind::Integer
                | SchemaKind::Number
                | SchemaKind::Boolean
                | SchemaKind::Null
        )
    }

    pub fn is_numeric(self) -> bool {
        matches!(self, SchemaKind::Integer | SchemaKind::Number)
    }
}

/// Serialize `Option<f64>` as an integer when the value has no fractional part.
fn serialize_bound<S>(value: &Option<f64>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    match value {
        Some(v) if v.fract() == 0.0 && v.abs() < i64::MAX as f64 => {
            serializer.serialize_some(&(*v as i64))
        }
        Some(v) => serializer.serialize_some(v),
        None => serializer.serialize_none(),
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Recursive structural description of a value.
///
/// Invariant: a schema with `reference` set carries no other field. Build
/// references with [`Schema::reference_to`] only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
    #[serde(rename = "$ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<SchemaKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub nullable: bool,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub properties: IndexMap<String, Schema>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<Schema>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_properties: Option<Box<Schema>>,
    #[serde(rename = "enum", default, skip_serializing_if = "Vec::is_empty")]
    pub enum_values: Vec<Value>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_bound"
    )]
    pub minimum: Option<f64>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_bound"
    )]
    pub maximum: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_items: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_items: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub example: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub deprecated: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub one_of: Vec<Schema>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub all_of: Vec<Schema>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub any_of: Vec<Schema>,
}

impl Schema {
    pub fn of(kind: SchemaKind) -> Self {
        Self {
            kind: Some(kind),
            ..Default::default()
        }
    }

    pub fn string() -> Self {
        Self::of(SchemaKind::String)
    }

    pub fn integer() -> Self {
        Self::of(SchemaKind::Integer)
    }

    pub fn number() -> Self {
        Self::of(SchemaKind::Number)
    }

    pub fn boolean() -> Self {
        Self::of(SchemaKind::Boolean)
    }

    pub fn null() -> Self {
        Self::of(SchemaKind::Null)
    }

    /// Generic object placeholder, used whenever a shape cannot be determined.
    pub fn object() -> Self {
        Self::of(SchemaKind::Object)
    }

    pub fn array(items: Schema) -> Self {
        Self {
            kind: Some(SchemaKind::Array),
            items: Some(Box::new(items)),
            ..Default::default()
        }
    }

    /// Object with arbitrary keys whose values follow `values`.
    pub fn map(values: Schema) -> Self {
        Self {
            kind: Some(SchemaKind::Object),
            additional_properties: Some(Box::new(values)),
            ..Default::default()
        }
    }

    /// Indirection to a registered component.
    pub fn reference_to(name: &str) -> Self {
        Self {
            reference: Some(format!("{}{}", COMPONENT_REF_PREFIX, name)),
            ..Default::default()
        }
    }

    pub fn one_of(branches: Vec<Schema>) -> Self {
        Self {
            one_of: branches,
            ..Default::default()
        }
    }

    pub fn all_of(parts: Vec<Schema>) -> Self {
        Self {
            all_of: parts,
            ..Default::default()
        }
    }

    pub fn with_format(mut self, format: &str) -> Self {
        self.format = Some(format.to_string());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_enum(mut self, values: Vec<Value>) -> Self {
        self.enum_values = values;
        self
    }

    /// Marks the schema as accepting `null`.
    ///
    /// References cannot carry siblings, so they are wrapped in a single-branch
    /// `allOf` first.
    pub fn into_nullable(self) -> Self {
        if self.is_reference() {
            return Self {
                all_of: vec![self],
                nullable: true,
                ..Default::default()
            };
        }
        Self {
            nullable: true,
            ..self
        }
    }

    pub fn is_reference(&self) -> bool {
        self.reference.is_some()
    }

    /// Component name a reference points at.
    pub fn reference_name(&self) -> Option<&str> {
        self.reference
            .as_deref()
            .map(|r| r.strip_prefix(COMPONENT_REF_PREFIX).unwrap_or(r))
    }

    pub fn is_composition(&self) -> bool {
        !self.one_of.is_empty() || !self.all_of.is_empty() || !self.any_of.is_empty()
    }

    /// True for shapes that are not worth a named component: plain scalars
    /// without enumerated values, and references.
    pub fn is_scalar_only(&self) -> bool {
        if self.is_reference() {
            return true;
        }
        match self.kind {
            Some(kind) => {
                kind.is_scalar()
                    && self.enum_values.is_empty()
                    && !self.is_composition()
                    && self.properties.is_empty()
            }
            None => false,
        }
    }

    /// Adds or replaces a property, keeping `required` free of duplicates.
    pub fn insert_property(&mut self, name: &str, schema: Schema, required: bool) {
        self.properties.insert(name.to_string(), schema);
        if required {
            self.mark_required(name);
        }
    }

    pub fn mark_required(&mut self, name: &str) {
        if !self.required.iter().any(|r| r == name) {
            self.required.push(name.to_string());
        }
    }

    /// Builds a schema from an observed JSON value.
    ///
    /// Objects list every observed key as required. Arrays describe their
    /// first element; empty arrays fall back to generic object items.
    pub fn infer_from_value(value: &Value) -> Self {
        match value {
            Value::Null => Schema::null(),
            Value::Bool(_) => Schema::boolean(),
            Value::Number(n) => {
                if n.is_i64() || n.is_u64() {
                    Schema::integer()
                } else {
                    Schema::number()
                }
            }
            Value::String(_) => Schema::string(),
            Value::Array(values) => {
                let items = values
                    .first()
                    .map(Schema::infer_from_value)
                    .unwrap_or_else(Schema::object);
                Schema::array(items)
            }
            Value::Object(map) => {
                let mut schema = Schema::object();
                for (key, value) in map {
                    let property = Schema::infer_from_value(value);
                    if property.kind == Some(SchemaKind::Null) {
                        schema.insert_property(key, Schema::object().into_nullable(), false);
                    } else {
                        schema.insert_property(key, property, true);
                    }
                }
                schema
            }
        }
    }

    /// Visits this schema and every nested schema, depth first.
    pub fn walk_mut(&mut self, f: &mut dyn FnMut(&mut Schema)) {
        f(self);
        for property in self.properties.values_mut() {
            property.walk_mut(f);
        }
        if let Some(items) = self.items.as_mut() {
            items.walk_mut(f);
        }
        if let Some(values) = self.additional_properties.as_mut() {
            values.walk_mut(f);
        }
        for branch in self
            .one_of
            .iter_mut()
            .chain(self.all_of.iter_mut())
            .chain(self.any_of.iter_mut())
        {
            branch.walk_mut(f);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_reference_serializes_alone() {
        let schema = Schema::reference_to("User");
        let value = serde_json::to_value(&schema).unwrap();
        assert_eq!(value, json!({"$ref": "#/components/schemas/User"}));
        assert_eq!(schema.reference_name(), Some("User"));
    }

    #[test]
    fn test_nullable_reference_is_wrapped() {
        let schema = Schema::reference_to("User").into_nullable();
        assert!(schema.reference.is_none());
        assert!(schema.nullable);
        assert_eq!(schema.all_of.len(), 1);
        assert!(schema.all_of[0].is_reference());
    }

    #[test]
    fn test_integer_bounds_serialize_as_integers() {
        let mut schema = Schema::integer();
        schema.minimum = Some(18.0);
        schema.maximum = Some(2.5);
        let value = serde_json::to_value(&schema).unwrap();
        assert_eq!(value, json!({"type": "integer", "minimum": 18, "maximum": 2.5}));
    }

    #[test]
    fn test_openapi_field_names() {
        let mut schema = Schema::object();
        schema.insert_property("tags", Schema::array(Schema::string()), true);
        schema.properties["tags"].min_items = Some(1);
        let value = serde_json::to_value(&schema).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "object",
                "properties": {"tags": {"type": "array", "items": {"type": "string"}, "minItems": 1}},
                "required": ["tags"]
            })
        );
    }

    #[test]
    fn test_scalar_only() {
        assert!(Schema::string().is_scalar_only());
        assert!(Schema::reference_to("X").is_scalar_only());
        assert!(!Schema::object().is_scalar_only());
        assert!(!Schema::string().with_enum(vec![json!("a")]).is_scalar_only());
        assert!(!Schema::array(Schema::string()).is_scalar_only());
    }

    #[test]
    fn test_infer_from_value() {
        let schema = Schema::infer_from_value(&json!({
            "id": 7,
            "price": 9.5,
            "tags": ["a"],
            "note": null
        }));
        assert_eq!(schema.kind, Some(SchemaKind::Object));
        assert_eq!(schema.properties["id"].kind, Some(SchemaKind::Integer));
        assert_eq!(schema.properties["price"].kind, Some(SchemaKind::Number));
        assert_eq!(
            schema.properties["tags"].items.as_ref().unwrap().kind,
            Some(SchemaKind::String)
        );
        assert!(schema.properties["note"].nullable);
        assert_eq!(schema.required, vec!["id", "price", "tags"]);
    }

    #[test]
    fn test_roundtrip_deserialize() {
        let schema: Schema = serde_json::from_value(json!({
            "type": "string",
            "format": "email",
            "minLength": 3
        }))
        .unwrap();
        assert_eq!(schema.kind, Some(SchemaKind::String));
        assert_eq!(schema.format.as_deref(), Some("email"));
        assert_eq!(schema.min_length, Some(3));
    }
}
