//! Static analysis of axum handler signatures.
//!
//! Arguments give the request body (`Json<T>`, `Form<T>`, `Multipart`) and the
//! parameters (`Path<T>`, `Query<T>`); the return type gives the success
//! response. Status codes named in the handler body (`StatusCode::CREATED`)
//! pick the status of `(StatusCode, Json<T>)` style returns.

use super::{
    Candidate, ExtractionContext, ParameterExtractor, Plugin, Provenance, RequestBodyExtractor,
    ResponseExtractor,
};
use crate::entry::{HandlerSource, ParameterLocation, TypeInfo};
use crate::error::Result;
use crate::schema::Schema;
use log::debug;
use syn::visit::{self, Visit};

pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";
pub const MULTIPART_CONTENT_TYPE: &str = "multipart/form-data";

/// Tuple elements of a response that carry headers or status, not content.
const RESPONSE_PARTS: &[&str] = &[
    "StatusCode",
    "HeaderMap",
    "AppendHeaders",
    "TypedHeader",
    "Extension",
    "Vec",
];

pub struct TypedSignaturePlugin;

impl Plugin for TypedSignaturePlugin {
    fn name(&self) -> &str {
        "typed-signature"
    }

    fn priority(&self) -> i32 {
        50
    }

    fn request_body(&self) -> Option<&dyn RequestBodyExtractor> {
        Some(self)
    }

    fn responses(&self) -> Option<&dyn ResponseExtractor> {
        Some(self)
    }

    fn parameters(&self) -> Option<&dyn ParameterExtractor> {
        Some(self)
    }
}

impl RequestBodyExtractor for TypedSignaturePlugin {
    fn extract_request_body(&self, ctx: &mut ExtractionContext<'_>) -> Result<Option<Candidate>> {
        let entry = ctx.entry;
        let Some(handler) = &entry.handler else {
            return Ok(None);
        };
        for arg in handler.argument_types() {
            let candidate = match (arg.name.as_str(), arg.inner()) {
                ("Json", Some(inner)) => Candidate::body(ctx.schema_for(inner), Provenance::Static),
                ("Form", Some(inner)) => {
                    Candidate::body(ctx.schema_for(inner), Provenance::Static)
                        .with_content_type(FORM_CONTENT_TYPE)
                }
                ("Multipart", _) => Candidate::body(Schema::object(), Provenance::Static)
                    .with_content_type(MULTIPART_CONTENT_TYPE),
                _ => continue,
            };
            debug!("{}: request body from {}", entry.id, arg.display_key());
            return Ok(Some(candidate));
        }
        Ok(None)
    }
}

/// What a return type puts in the response body.
enum Content {
    Empty,
    Body(Schema, &'static str),
}

impl ResponseExtractor for TypedSignaturePlugin {
    fn extract_responses(&self, ctx: &mut ExtractionContext<'_>) -> Result<Vec<Candidate>> {
        let entry = ctx.entry;
        let Some(handler) = &entry.handler else {
            return Ok(Vec::new());
        };
        let returned = handler
            .return_type()
            .unwrap_or_else(|| TypeInfo::new("()"));

        let Some(content) = content_of(ctx, &returned) else {
            debug!(
                "{}: return type {} says nothing about the response",
                entry.id,
                returned.display_key()
            );
            return Ok(Vec::new());
        };

        let status = if carries_status(&returned) {
            status_codes_used(handler)
                .into_iter()
                .find(|code| code.starts_with('2'))
                .unwrap_or_else(|| "200".to_string())
        } else {
            "200".to_string()
        };

        let candidate = match content {
            Content::Empty => Candidate::response(&status, None, Provenance::Static),
            Content::Body(schema, content_type) => {
                Candidate::response(&status, Some(schema), Provenance::Static)
                    .with_content_type(content_type)
            }
        };
        Ok(vec![candidate])
    }
}

fn content_of(ctx: &mut ExtractionContext<'_>, ty: &TypeInfo) -> Option<Content> {
    match ty.name.as_str() {
        "()" | "StatusCode" => Some(Content::Empty),
        "Result" => content_of(ctx, ty.inner()?),
        "Json" => Some(Content::Body(
            ctx.schema_for(ty.inner()?),
            super::DEFAULT_CONTENT_TYPE,
        )),
        "Html" => Some(Content::Body(Schema::string(), "text/html")),
        "String" | "str" => Some(Content::Body(Schema::string(), "text/plain")),
        "Tuple" => match ty
            .generic_args
            .iter()
            .rev()
            .find(|part| !RESPONSE_PARTS.contains(&part.name.as_str()))
        {
            Some(part) => content_of(ctx, part),
            None => Some(Content::Empty),
        },
        _ => {
            let schema = ctx.resolver.resolve(ty, ctx.registry)?;
            Some(Content::Body(schema, super::DEFAULT_CONTENT_TYPE))
        }
    }
}

/// Whether the status of the response is chosen at run time.
fn carries_status(ty: &TypeInfo) -> bool {
    match ty.name.as_str() {
        "StatusCode" => true,
        "Result" => ty.inner().is_some_and(carries_status),
        "Tuple" => ty.generic_args.iter().any(|part| part.name == "StatusCode"),
        _ => false,
    }
}

impl ParameterExtractor for TypedSignaturePlugin {
    fn extract_parameters(&self, ctx: &mut ExtractionContext<'_>) -> Result<Vec<Candidate>> {
        let path_names = ctx.entry.path_parameters();
        let mut path_schemas: Vec<Option<Schema>> = vec![None; path_names.len()];
        let mut query = Vec::new();

        let arguments = match &ctx.entry.handler {
            Some(handler) => handler.argument_types(),
            None => Vec::new(),
        };
        for arg in &arguments {
            match (arg.name.as_str(), arg.inner()) {
                ("Path", Some(inner)) => {
                    type_path_parameters(ctx, inner, &path_names, &mut path_schemas)
                }
                ("Query", Some(inner)) => query.extend(query_parameters(ctx, inner)),
                _ => {}
            }
        }

        let mut candidates: Vec<Candidate> = path_names
            .iter()
            .zip(path_schemas)
            .map(|(name, schema)| {
                Candidate::parameter(
                    name,
                    ParameterLocation::Path,
                    true,
                    schema.unwrap_or_else(Schema::string),
                    Provenance::Static,
                )
            })
            .collect();
        candidates.extend(query);
        Ok(candidates)
    }
}

/// Types the template's `{param}` segments from a `Path<T>` extractor: a
/// tuple binds positionally, a struct by field name, a scalar the first one.
fn type_path_parameters(
    ctx: &mut ExtractionContext<'_>,
    ty: &TypeInfo,
    names: &[String],
    schemas: &mut [Option<Schema>],
) {
    if ty.name == "Tuple" {
        for (slot, element) in schemas.iter_mut().zip(&ty.generic_args) {
            *slot = ctx.resolver.resolve(element, ctx.registry);
        }
        return;
    }

    let Some(schema) = ctx.resolver.resolve(ty, ctx.registry) else {
        return;
    };
    match object_members(ctx, &schema) {
        Some(members) => {
            for (name, slot) in names.iter().zip(schemas.iter_mut()) {
                if let Some((_, member, _)) = members.iter().find(|(member, _, _)| member == name) {
                    *slot = Some(member.clone());
                }
            }
        }
        None => {
            if let Some(slot) = schemas.first_mut() {
                *slot = Some(schema);
            }
        }
    }
}

fn query_parameters(ctx: &mut ExtractionContext<'_>, ty: &TypeInfo) -> Vec<Candidate> {
    let Some(schema) = ctx.resolver.resolve(ty, ctx.registry) else {
        debug!("{}: query type {} not resolvable", ctx.entry.id, ty.display_key());
        return Vec::new();
    };
    let Some(members) = object_members(ctx, &schema) else {
        return Vec::new();
    };
    members
        .into_iter()
        .map(|(name, mut member, required)| {
            let description = member.description.take();
            let candidate = Candidate::parameter(
                &name,
                ParameterLocation::Query,
                required,
                member,
                Provenance::Static,
            );
            match description {
                Some(description) => candidate.with_description(description),
                None => candidate,
            }
        })
        .collect()
}

/// Named properties of an object schema, following a reference. Maps and
/// non-objects yield `None`.
fn object_members(
    ctx: &ExtractionContext<'_>,
    schema: &Schema,
) -> Option<Vec<(String, Schema, bool)>> {
    let body = ctx.registry.resolve(schema)?;
    if body.properties.is_empty() {
        return None;
    }
    Some(
        body.properties
            .iter()
            .map(|(name, member)| {
                (
                    name.clone(),
                    member.clone(),
                    body.required.iter().any(|r| r == name),
                )
            })
            .collect(),
    )
}

/// Status codes named as `StatusCode::CONSTANT` in a handler body, in order
/// of first appearance.
pub(crate) fn status_codes_used(handler: &HandlerSource) -> Vec<String> {
    let mut collector = StatusCodeCollector { codes: Vec::new() };
    collector.visit_block(handler.body());
    collector.codes
}

struct StatusCodeCollector {
    codes: Vec<String>,
}

impl<'ast> Visit<'ast> for StatusCodeCollector {
    fn visit_path(&mut self, path: &'ast syn::Path) {
        let mut segments = path.segments.iter().rev();
        if let (Some(constant), Some(owner)) = (segments.next(), segments.next()) {
            if owner.ident == "StatusCode" {
                if let Some(code) = status_code(&constant.ident.to_string()) {
                    if !self.codes.iter().any(|c| c == code) {
                        self.codes.push(code.to_string());
                    }
                }
            }
        }
        visit::visit_path(self, path);
    }
}

fn status_code(constant: &str) -> Option<&'static str> {
    let code = match constant {
        "OK" => "200",
        "CREATED" => "201",
        "ACCEPTED" => "202",
        "NO_CONTENT" => "204",
        "MOVED_PERMANENTLY" => "301",
        "FOUND" => "302",
        "SEE_OTHER" => "303",
        "NOT_MODIFIED" => "304",
        "TEMPORARY_REDIRECT" => "307",
        "BAD_REQUEST" => "400",
        "UNAUTHORIZED" => "401",
        "FORBIDDEN" => "403",
        "NOT_FOUND" => "404",
        "METHOD_NOT_ALLOWED" => "405",
        "CONFLICT" => "409",
        "GONE" => "410",
        "PAYLOAD_TOO_LARGE" => "413",
        "UNSUPPORTED_MEDIA_TYPE" => "415",
        "UNPROCESSABLE_ENTITY" => "422",
        "TOO_MANY_REQUESTS" => "429",
        "INTERNAL_SERVER_ERROR" => "500",
        "NOT_IMPLEMENTED" => "501",
        "BAD_GATEWAY" => "502",
        "SERVICE_UNAVAILABLE" => "503",
        "GATEWAY_TIMEOUT" => "504",
        _ => return None,
    };
    Some(code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::CaptureStore;
    use crate::config::GeneratorConfig;
    use crate::entry::{EntryPoint, HttpMethod};
    use crate::extractor::Slot;
    use crate::registry::SchemaRegistry;
    use crate::resolver::SchemaResolver;
    use crate::rules::RuleMapper;
    use crate::schema::SchemaKind;
    use crate::type_index::TypeIndex;

    const TYPES: &str = r#"
        #[derive(Serialize, Deserialize)]
        pub struct User { pub id: u64, pub name: String }

        #[derive(Deserialize)]
        pub struct CreateUser { pub name: String }

        #[derive(Deserialize)]
        pub struct Pagination {
            /// Page number
            pub page: u32,
            pub per_page: Option<u32>,
        }

        #[derive(Deserialize)]
        pub struct CommentPath { pub post_id: u64, pub comment_id: String }
    "#;

    struct Harness {
        resolver: SchemaResolver,
        registry: SchemaRegistry,
        rules: RuleMapper,
        captures: CaptureStore,
        config: GeneratorConfig,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                resolver: SchemaResolver::new(TypeIndex::from_source(TYPES).unwrap()),
                registry: SchemaRegistry::new(),
                rules: RuleMapper::new(),
                captures: CaptureStore::new(),
                config: GeneratorConfig::default(),
            }
        }

        fn context<'a>(&'a mut self, entry: &'a EntryPoint) -> ExtractionContext<'a> {
            ExtractionContext {
                entry,
                resolver: &mut self.resolver,
                registry: &mut self.registry,
                rules: &self.rules,
                captures: &self.captures,
                config: &self.config,
            }
        }
    }

    fn entry(method: HttpMethod, path: &str, handler: &str) -> EntryPoint {
        let item: syn::ItemFn = syn::parse_str(handler).unwrap();
        let name = item.sig.ident.to_string();
        EntryPoint::new(method, path, &name).with_handler(item)
    }

    #[test]
    fn test_json_body() {
        let entry = entry(
            HttpMethod::Post,
            "/users",
            "async fn create_user(State(db): State<Db>, Json(body): Json<CreateUser>) -> Json<User> { todo!() }",
        );
        let mut harness = Harness::new();
        let body = TypedSignaturePlugin
            .extract_request_body(&mut harness.context(&entry))
            .unwrap()
            .unwrap();
        assert_eq!(body.content_type_or_default(), "application/json");
        assert_eq!(body.schema.unwrap().reference_name(), Some("CreateUser"));
    }

    #[test]
    fn test_form_body_content_type() {
        let entry = entry(
            HttpMethod::Post,
            "/login",
            "async fn login(Form(form): Form<CreateUser>) -> StatusCode { StatusCode::OK }",
        );
        let mut harness = Harness::new();
        let body = TypedSignaturePlugin
            .extract_request_body(&mut harness.context(&entry))
            .unwrap()
            .unwrap();
        assert_eq!(body.content_type.as_deref(), Some(FORM_CONTENT_TYPE));
    }

    #[test]
    fn test_result_json_response() {
        let entry = entry(
            HttpMethod::Get,
            "/users/{id}",
            "async fn get_user() -> Result<Json<User>, AppError> { todo!() }",
        );
        let mut harness = Harness::new();
        let responses = TypedSignaturePlugin
            .extract_responses(&mut harness.context(&entry))
            .unwrap();
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0].status(), Some("200"));
        assert_eq!(
            responses[0].schema.as_ref().unwrap().reference_name(),
            Some("User")
        );
    }

    #[test]
    fn test_status_tuple_uses_code_from_body() {
        let entry = entry(
            HttpMethod::Post,
            "/users",
            r#"async fn create_user() -> (StatusCode, Json<User>) {
                if missing() { return (StatusCode::BAD_REQUEST, Json(u)); }
                (StatusCode::CREATED, Json(u))
            }"#,
        );
        let mut harness = Harness::new();
        let responses = TypedSignaturePlugin
            .extract_responses(&mut harness.context(&entry))
            .unwrap();
        assert_eq!(responses[0].status(), Some("201"));
        assert!(responses[0].schema.is_some());
    }

    #[test]
    fn test_bare_status_has_no_content() {
        let entry = entry(
            HttpMethod::Delete,
            "/users/{id}",
            "async fn delete_user() -> StatusCode { StatusCode::NO_CONTENT }",
        );
        let mut harness = Harness::new();
        let responses = TypedSignaturePlugin
            .extract_responses(&mut harness.context(&entry))
            .unwrap();
        assert_eq!(responses[0].status(), Some("204"));
        assert!(responses[0].schema.is_none());
    }

    #[test]
    fn test_text_and_opaque_returns() {
        let text = entry(
            HttpMethod::Get,
            "/health",
            "async fn health() -> &'static str { \"ok\" }",
        );
        let opaque = entry(
            HttpMethod::Get,
            "/raw",
            "async fn raw() -> impl IntoResponse { todo!() }",
        );
        let mut harness = Harness::new();
        let responses = TypedSignaturePlugin
            .extract_responses(&mut harness.context(&text))
            .unwrap();
        assert_eq!(responses[0].content_type.as_deref(), Some("text/plain"));
        let responses = TypedSignaturePlugin
            .extract_responses(&mut harness.context(&opaque))
            .unwrap();
        assert!(responses.is_empty());
    }

    #[test]
    fn test_path_and_query_parameters() {
        let entry = entry(
            HttpMethod::Get,
            "/users/{id}/posts",
            "async fn list_posts(Path(id): Path<u64>, Query(page): Query<Pagination>) -> Json<Vec<User>> { todo!() }",
        );
        let mut harness = Harness::new();
        let params = TypedSignaturePlugin
            .extract_parameters(&mut harness.context(&entry))
            .unwrap();
        assert_eq!(params.len(), 3);
        assert_eq!(
            params[0].slot,
            Slot::Parameter {
                name: "id".to_string(),
                location: ParameterLocation::Path,
                required: true
            }
        );
        assert_eq!(
            params[0].schema.as_ref().unwrap().kind,
            Some(SchemaKind::Integer)
        );
        assert_eq!(
            params[1].slot,
            Slot::Parameter {
                name: "page".to_string(),
                location: ParameterLocation::Query,
                required: true
            }
        );
        assert_eq!(params[1].description.as_deref(), Some("Page number"));
        assert!(matches!(
            &params[2].slot,
            Slot::Parameter { name, required: false, .. } if name == "per_page"
        ));
    }

    #[test]
    fn test_path_struct_and_tuple_binding() {
        let by_struct = entry(
            HttpMethod::Get,
            "/posts/{post_id}/comments/{comment_id}",
            "async fn get_comment(Path(p): Path<CommentPath>) {}",
        );
        let by_tuple = entry(
            HttpMethod::Get,
            "/posts/{post_id}/comments/{comment_id}",
            "async fn get_comment(Path((a, b)): Path<(u64, String)>) {}",
        );
        let mut harness = Harness::new();
        for entry in [&by_struct, &by_tuple] {
            let params = TypedSignaturePlugin
                .extract_parameters(&mut harness.context(entry))
                .unwrap();
            assert_eq!(params.len(), 2);
            assert_eq!(
                params[0].schema.as_ref().unwrap().kind,
                Some(SchemaKind::Integer)
            );
            assert_eq!(
                params[1].schema.as_ref().unwrap().kind,
                Some(SchemaKind::String)
            );
        }
    }

    #[test]
    fn test_untyped_path_parameters_default_to_string() {
        let entry = EntryPoint::new(HttpMethod::Get, "/files/:name", "get_file");
        let mut harness = Harness::new();
        let params = TypedSignaturePlugin
            .extract_parameters(&mut harness.context(&entry))
            .unwrap();
        assert_eq!(params.len(), 1);
        assert_eq!(
            params[0].schema.as_ref().unwrap().kind,
            Some(SchemaKind::String)
        );
    }

    #[test]
    fn test_status_codes_used() {
        let item: syn::ItemFn = syn::parse_str(
            r#"async fn h() -> StatusCode {
                match x {
                    Ok(_) => StatusCode::OK,
                    Err(_) => axum::http::StatusCode::NOT_FOUND,
                }
            }"#,
        )
        .unwrap();
        let handler = HandlerSource::new(item);
        assert_eq!(status_codes_used(&handler), vec!["200", "404"]);
    }
}
