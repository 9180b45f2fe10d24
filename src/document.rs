//! In-memory output document: operations, components and security schemes.
//!
//! Field names follow OpenAPI 3.0 so the emitters can serialize it directly.

use crate::entry::{HttpMethod, ParameterLocation};
use crate::schema::Schema;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// OpenAPI version written into every document
pub const OPENAPI_VERSION: &str = "3.0.3";

/// OpenAPI Info object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Info {
    /// API title
    pub title: String,
    /// API version
    pub version: String,
    /// API description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// All operations for a single path
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PathItem {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub get: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub put: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delete: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patch: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub head: Option<Operation>,
}

impl PathItem {
    pub fn slot_mut(&mut self, method: HttpMethod) -> &mut Option<Operation> {
        match method {
            HttpMethod::Get => &mut self.get,
            HttpMethod::Post => &mut self.post,
            HttpMethod::Put => &mut self.put,
            HttpMethod::Delete => &mut self.delete,
            HttpMethod::Patch => &mut self.patch,
            HttpMethod::Options => &mut self.options,
            HttpMethod::Head => &mut self.head,
        }
    }

    pub fn get_operation(&self, method: HttpMethod) -> Option<&Operation> {
        match method {
            HttpMethod::Get => self.get.as_ref(),
            HttpMethod::Post => self.post.as_ref(),
            HttpMethod::Put => self.put.as_ref(),
            HttpMethod::Delete => self.delete.as_ref(),
            HttpMethod::Patch => self.patch.as_ref(),
            HttpMethod::Options => self.options.as_ref(),
            HttpMethod::Head => self.head.as_ref(),
        }
    }

    /// Operations present on this path, in method declaration order.
    pub fn operations(&self) -> impl Iterator<Item = (HttpMethod, &Operation)> {
        [
            (HttpMethod::Get, &self.get),
            (HttpMethod::Post, &self.post),
            (HttpMethod::Put, &self.put),
            (HttpMethod::Delete, &self.delete),
            (HttpMethod::Patch, &self.patch),
            (HttpMethod::Options, &self.options),
            (HttpMethod::Head, &self.head),
        ]
        .into_iter()
        .filter_map(|(method, op)| op.as_ref().map(|op| (method, op)))
    }
}

/// A single documented operation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Parameter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_body: Option<RequestBody>,
    pub responses: IndexMap<String, Response>,
    /// Security requirements: scheme name → scopes
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub security: Vec<IndexMap<String, Vec<String>>>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub deprecated: bool,
}

/// OpenAPI Parameter object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "in")]
    pub location: ParameterLocation,
    pub required: bool,
    pub schema: Schema,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// OpenAPI RequestBody object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub required: bool,
    /// Content types and their schemas
    pub content: IndexMap<String, MediaType>,
}

/// Schema and example for one content type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaType {
    pub schema: Schema,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub example: Option<Value>,
}

/// OpenAPI Response object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub description: String,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub headers: IndexMap<String, Header>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub content: IndexMap<String, MediaType>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Header {
    pub schema: Schema,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// OpenAPI SecurityScheme object (the `http` and `apiKey` kinds)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityScheme {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheme: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bearer_format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "in", skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl SecurityScheme {
    pub fn bearer() -> Self {
        Self {
            kind: "http".to_string(),
            scheme: Some("bearer".to_string()),
            bearer_format: Some("JWT".to_string()),
            name: None,
            location: None,
        }
    }

    pub fn basic() -> Self {
        Self {
            kind: "http".to_string(),
            scheme: Some("basic".to_string()),
            bearer_format: None,
            name: None,
            location: None,
        }
    }

    pub fn api_key(header: &str) -> Self {
        Self {
            kind: "apiKey".to_string(),
            scheme: None,
            bearer_format: None,
            name: Some(header.to_string()),
            location: Some("header".to_string()),
        }
    }

    /// Parses `bearer`, `basic` or `apikey:<Header>` into a conventional
    /// scheme name and the scheme itself.
    pub fn parse(descriptor: &str) -> Option<(String, Self)> {
        let descriptor = descriptor.trim();
        let (kind, argument) = match descriptor.split_once(':') {
            Some((kind, argument)) => (kind, Some(argument.trim())),
            None => (descriptor, None),
        };
        match kind.to_lowercase().as_str() {
            "bearer" | "jwt" => Some(("bearerAuth".to_string(), Self::bearer())),
            "basic" => Some(("basicAuth".to_string(), Self::basic())),
            "apikey" => {
                let header = argument.filter(|h| !h.is_empty()).unwrap_or("X-API-Key");
                Some(("apiKeyAuth".to_string(), Self::api_key(header)))
            }
            _ => None,
        }
    }
}

/// Named components shared across operations
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Components {
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub schemas: IndexMap<String, Schema>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub security_schemes: IndexMap<String, SecurityScheme>,
}

impl Components {
    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty() && self.security_schemes.is_empty()
    }
}

/// Complete output document of one generation pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiDocument {
    pub openapi: String,
    pub info: Info,
    pub paths: IndexMap<String, PathItem>,
    #[serde(default, skip_serializing_if = "Components::is_empty")]
    pub components: Components,
}

impl ApiDocument {
    pub fn new(title: &str, version: &str, description: Option<String>) -> Self {
        Self {
            openapi: OPENAPI_VERSION.to_string(),
            info: Info {
                title: title.to_string(),
                version: version.to_string(),
                description,
            },
            paths: IndexMap::new(),
            components: Components::default(),
        }
    }

    /// Stores an operation, replacing any earlier one for the same path and method.
    pub fn add_operation(&mut self, path: &str, method: HttpMethod, operation: Operation) {
        *self
            .paths
            .entry(path.to_string())
            .or_default()
            .slot_mut(method) = Some(operation);
    }

    pub fn operation(&self, path: &str, method: HttpMethod) -> Option<&Operation> {
        self.paths.get(path)?.get_operation(method)
    }

    pub fn operation_count(&self) -> usize {
        self.paths.values().map(|item| item.operations().count()).sum()
    }
}

/// Standard reason phrase for a status code, used as the default response
/// description.
pub fn status_reason(status: &str) -> &'static str {
    match status {
        "200" => "OK",
        "201" => "Created",
        "202" => "Accepted",
        "204" => "No Content",
        "301" => "Moved Permanently",
        "302" => "Found",
        "304" => "Not Modified",
        "400" => "Bad Request",
        "401" => "Unauthorized",
        "403" => "Forbidden",
        "404" => "Not Found",
        "405" => "Method Not Allowed",
        "409" => "Conflict",
        "410" => "Gone",
        "415" => "Unsupported Media Type",
        "422" => "Unprocessable Entity",
        "429" => "Too Many Requests",
        "500" => "Internal Server Error",
        "502" => "Bad Gateway",
        "503" => "Service Unavailable",
        "default" => "Unexpected error",
        _ => "Response",
    }
}
