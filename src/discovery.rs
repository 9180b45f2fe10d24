//! Entry-point discovery for axum routers.
//!
//! Every function body is evaluated symbolically as a router expression:
//! `Router::new()`, `.route(path, get(h).post(h2))`, `.nest(prefix, router)`,
//! `.merge(router)`, calls to other router-building functions and `let`
//! bindings holding routers. A router function called from another one is
//! consumed; routers nobody consumes are the roots whose routes become entry
//! points.

use crate::entry::{EntryPoint, HttpMethod};
use crate::parser::ParsedFile;
use indexmap::IndexMap;
use log::{debug, warn};
use std::collections::{HashMap, HashSet};
use syn::visit::{self, Visit};
use syn::{Expr, ExprCall, ExprMethodCall, Lit, Pat, Stmt};

/// Router methods that return the router they are called on.
const PASSTHROUGH_METHODS: &[&str] = &[
    "with_state",
    "layer",
    "route_layer",
    "fallback",
    "fallback_service",
    "route_service",
    "nest_service",
    "into_make_service",
    "into_make_service_with_connect_info",
];

#[derive(Debug, Clone)]
struct Route {
    method: HttpMethod,
    path: String,
    /// `None` for closures and other anonymous handlers
    handler: Option<String>,
}

/// Finds axum routes across a set of parsed files.
pub struct RouteDiscovery {
    functions: IndexMap<String, syn::ItemFn>,
    evaluated: HashMap<String, Option<Vec<Route>>>,
    in_progress: HashSet<String>,
    consumed: HashSet<String>,
}

impl RouteDiscovery {
    pub fn new(files: &[ParsedFile]) -> Self {
        let mut collector = FunctionCollector {
            functions: IndexMap::new(),
        };
        for file in files {
            collector.visit_file(&file.syntax_tree);
        }
        debug!("Collected {} functions", collector.functions.len());
        Self {
            functions: collector.functions,
            evaluated: HashMap::new(),
            in_progress: HashSet::new(),
            consumed: HashSet::new(),
        }
    }

    /// Entry points of every root router, in source order.
    pub fn discover(&mut self) -> Vec<EntryPoint> {
        let names: Vec<String> = self.functions.keys().cloned().collect();
        for name in &names {
            self.evaluate_function(name);
        }

        let mut routes = Vec::new();
        for name in &names {
            if self.consumed.contains(name) {
                continue;
            }
            if let Some(Some(found)) = self.evaluated.get(name) {
                if !found.is_empty() {
                    debug!("Root router {} with {} routes", name, found.len());
                    routes.extend(found.iter().cloned());
                }
            }
        }
        self.entry_points(routes)
    }

    fn entry_points(&self, routes: Vec<Route>) -> Vec<EntryPoint> {
        let mut ids: HashSet<String> = HashSet::new();
        let mut entries = Vec::with_capacity(routes.len());
        for route in routes {
            let handler_name = route
                .handler
                .clone()
                .unwrap_or_else(|| anonymous_name(route.method, &route.path));
            let mut entry = EntryPoint::new(route.method, &route.path, &handler_name);
            entry.id = unique_id(&mut ids, &handler_name, route.method);

            match self.functions.get(&handler_name) {
                Some(item) => entry = entry.with_handler(item.clone()),
                None if route.handler.is_some() => warn!("Unknown handler: {}", handler_name),
                None => {}
            }
            entries.push(entry);
        }
        entries
    }

    fn evaluate_function(&mut self, name: &str) -> Option<Vec<Route>> {
        if let Some(done) = self.evaluated.get(name) {
            return done.clone();
        }
        if !self.in_progress.insert(name.to_string()) {
            debug!("Recursive router function {}", name);
            return None;
        }
        let block = self.functions.get(name).map(|item| item.block.clone());
        let result = match block {
            Some(block) => self.evaluate_block(&block),
            None => None,
        };
        self.in_progress.remove(name);
        self.evaluated.insert(name.to_string(), result.clone());
        result
    }

    /// The block's tail router, or failing that the last router bound by `let`.
    fn evaluate_block(&mut self, block: &syn::Block) -> Option<Vec<Route>> {
        let mut locals: HashMap<String, Vec<Route>> = HashMap::new();
        let mut last_bound = None;
        for stmt in &block.stmts {
            match stmt {
                Stmt::Local(local) => {
                    let (Some(name), Some(init)) = (bound_name(&local.pat), &local.init) else {
                        continue;
                    };
                    if let Some(routes) = self.evaluate_router(&init.expr, &locals) {
                        locals.insert(name, routes.clone());
                        last_bound = Some(routes);
                    }
                }
                Stmt::Expr(Expr::Return(ret), _) => {
                    if let Some(expr) = &ret.expr {
                        if let Some(routes) = self.evaluate_router(expr, &locals) {
                            return Some(routes);
                        }
                    }
                }
                Stmt::Expr(expr, None) => {
                    if let Some(routes) = self.evaluate_router(expr, &locals) {
                        return Some(routes);
                    }
                }
                _ => {}
            }
        }
        last_bound
    }

    fn evaluate_router(
        &mut self,
        expr: &Expr,
        locals: &HashMap<String, Vec<Route>>,
    ) -> Option<Vec<Route>> {
        match expr {
            Expr::MethodCall(call) => self.evaluate_router_method(call, locals),
            Expr::Call(call) => self.evaluate_router_call(call),
            Expr::Path(path) => {
                let ident = path.path.get_ident()?;
                locals.get(&ident.to_string()).cloned()
            }
            Expr::Paren(paren) => self.evaluate_router(&paren.expr, locals),
            Expr::Group(group) => self.evaluate_router(&group.expr, locals),
            Expr::Block(block) => self.evaluate_block(&block.block),
            _ => None,
        }
    }

    fn evaluate_router_call(&mut self, call: &ExprCall) -> Option<Vec<Route>> {
        let Expr::Path(func) = &*call.func else {
            return None;
        };
        let segments: Vec<String> = func
            .path
            .segments
            .iter()
            .map(|s| s.ident.to_string())
            .collect();
        match segments.as_slice() {
            [.., owner, constructor]
                if owner == "Router" && (constructor == "new" || constructor == "default") =>
            {
                Some(Vec::new())
            }
            [.., name] => {
                let routes = self.evaluate_function(name)?;
                self.consumed.insert(name.clone());
                Some(routes)
            }
            [] => None,
        }
    }

    fn evaluate_router_method(
        &mut self,
        call: &ExprMethodCall,
        locals: &HashMap<String, Vec<Route>>,
    ) -> Option<Vec<Route>> {
        let method = call.method.to_string();
        match method.as_str() {
            "route" => {
                let mut routes = self.evaluate_router(&call.receiver, locals)?;
                let Some(path) = call.args.first().and_then(string_literal) else {
                    warn!("Skipping .route() with a non-literal path");
                    return Some(routes);
                };
                if let Some(method_router) = call.args.iter().nth(1) {
                    for (method, handler) in method_routes(method_router) {
                        routes.push(Route {
                            method,
                            path: path.clone(),
                            handler,
                        });
                    }
                }
                Some(routes)
            }
            "nest" => {
                let mut routes = self.evaluate_router(&call.receiver, locals)?;
                let prefix = call.args.first().and_then(string_literal);
                let nested = call
                    .args
                    .iter()
                    .nth(1)
                    .and_then(|arg| self.evaluate_router(arg, locals));
                match (prefix, nested) {
                    (Some(prefix), Some(nested)) => {
                        routes.extend(nested.into_iter().map(|route| Route {
                            path: combine_paths(&prefix, &route.path),
                            ..route
                        }));
                    }
                    _ => warn!("Skipping .nest() that could not be followed"),
                }
                Some(routes)
            }
            "merge" => {
                let mut routes = self.evaluate_router(&call.receiver, locals)?;
                if let Some(other) = call
                    .args
                    .first()
                    .and_then(|arg| self.evaluate_router(arg, locals))
                {
                    routes.extend(other);
                }
                Some(routes)
            }
            name if PASSTHROUGH_METHODS.contains(&name) => {
                self.evaluate_router(&call.receiver, locals)
            }
            _ => None,
        }
    }
}

/// Convenience wrapper: discovers entry points in `files`.
pub fn discover_entry_points(files: &[ParsedFile]) -> Vec<EntryPoint> {
    RouteDiscovery::new(files).discover()
}

/// `(method, handler)` pairs of a method router such as
/// `get(list).post(create)` or `on(MethodFilter::PUT, update)`.
fn method_routes(expr: &Expr) -> Vec<(HttpMethod, Option<String>)> {
    match expr {
        Expr::Call(call) => {
            let Expr::Path(func) = &*call.func else {
                return Vec::new();
            };
            let Some(name) = func.path.segments.last().map(|s| s.ident.to_string()) else {
                return Vec::new();
            };
            if name == "on" {
                let method = call.args.first().and_then(last_segment).and_then(|m| HttpMethod::parse(&m));
                return match method {
                    Some(method) => vec![(method, call.args.iter().nth(1).and_then(handler_name))],
                    None => Vec::new(),
                };
            }
            match HttpMethod::parse(&name) {
                Some(method) => vec![(method, call.args.first().and_then(handler_name))],
                None => Vec::new(),
            }
        }
        Expr::MethodCall(call) => {
            let mut routes = method_routes(&call.receiver);
            if let Some(method) = HttpMethod::parse(&call.method.to_string()) {
                routes.push((method, call.args.first().and_then(handler_name)));
            }
            routes
        }
        Expr::Paren(paren) => method_routes(&paren.expr),
        _ => Vec::new(),
    }
}

fn handler_name(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Path(_) => last_segment(expr),
        Expr::Reference(reference) => handler_name(&reference.expr),
        _ => None,
    }
}

fn last_segment(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Path(path) => path.path.segments.last().map(|s| s.ident.to_string()),
        _ => None,
    }
}

fn string_literal(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Lit(expr_lit) => match &expr_lit.lit {
            Lit::Str(lit_str) => Some(lit_str.value()),
            _ => None,
        },
        _ => None,
    }
}

fn bound_name(pat: &Pat) -> Option<String> {
    match pat {
        Pat::Ident(pat_ident) => Some(pat_ident.ident.to_string()),
        Pat::Type(pat_type) => bound_name(&pat_type.pat),
        _ => None,
    }
}

/// Joins a nest prefix and a route path with exactly one slash.
fn combine_paths(prefix: &str, path: &str) -> String {
    let prefix = prefix.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    match (prefix.is_empty(), path.is_empty()) {
        (true, true) => "/".to_string(),
        (_, true) => prefix.to_string(),
        _ => format!("{}/{}", prefix, path),
    }
}

fn anonymous_name(method: HttpMethod, path: &str) -> String {
    let segments: Vec<String> = path
        .split('/')
        .map(|s| {
            s.chars()
                .filter(|c| c.is_alphanumeric() || *c == '_')
                .collect::<String>()
        })
        .filter(|s| !s.is_empty())
        .collect();
    let slug = if segments.is_empty() {
        "root".to_string()
    } else {
        segments.join("_")
    };
    format!("{}_{}", method.as_str().to_lowercase(), slug)
}

/// First free id among `handler`, `handler_method`, `handler_method_2`, ...
fn unique_id(taken: &mut HashSet<String>, handler: &str, method: HttpMethod) -> String {
    let mut id = handler.to_string();
    if taken.contains(&id) {
        let base = format!("{}_{}", handler, method.as_str().to_lowercase());
        id = base.clone();
        let mut counter = 2;
        while taken.contains(&id) {
            id = format!("{}_{}", base, counter);
            counter += 1;
        }
    }
    taken.insert(id.clone());
    id
}

/// Collects free functions and impl methods by name; the first definition wins.
struct FunctionCollector {
    functions: IndexMap<String, syn::ItemFn>,
}

impl FunctionCollector {
    fn add(&mut self, item: syn::ItemFn) {
        let name = item.sig.ident.to_string();
        self.functions.entry(name).or_insert(item);
    }
}

impl<'ast> Visit<'ast> for FunctionCollector {
    fn visit_item_fn(&mut self, node: &'ast syn::ItemFn) {
        self.add(node.clone());
        visit::visit_item_fn(self, node);
    }

    fn visit_impl_item_fn(&mut self, node: &'ast syn::ImplItemFn) {
        self.add(syn::ItemFn {
            attrs: node.attrs.clone(),
            vis: node.vis.clone(),
            sig: node.sig.clone(),
            block: Box::new(node.block.clone()),
        });
        visit::visit_impl_item_fn(self, node);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn parse_code(code: &str) -> ParsedFile {
        let syntax_tree = syn::parse_file(code).expect("Failed to parse test code");
        ParsedFile {
            path: PathBuf::from("test.rs"),
            syntax_tree,
        }
    }

    fn routes(entries: &[EntryPoint]) -> Vec<(HttpMethod, &str, &str)> {
        entries
            .iter()
            .map(|e| (e.method, e.path.as_str(), e.handler_name.as_str()))
            .collect()
    }

    #[test]
    fn test_simple_route_extraction() {
        let code = r#"
            use axum::{Router, routing::get};

            async fn handler() -> &'static str {
                "Hello, World!"
            }

            fn app() -> Router {
                Router::new().route("/hello", get(handler))
            }
        "#;

        let entries = discover_entry_points(&[parse_code(code)]);
        assert_eq!(routes(&entries), vec![(HttpMethod::Get, "/hello", "handler")]);
        assert!(entries[0].handler.is_some());
    }

    #[test]
    fn test_method_router_chain() {
        let code = r#"
            async fn list_users() {}
            async fn create_user() {}
            async fn replace_user() {}

            fn app() -> Router {
                Router::new()
                    .route("/users", get(list_users).post(create_user))
                    .route("/users/:id", on(MethodFilter::PUT, replace_user))
            }
        "#;

        let entries = discover_entry_points(&[parse_code(code)]);
        assert_eq!(
            routes(&entries),
            vec![
                (HttpMethod::Get, "/users", "list_users"),
                (HttpMethod::Post, "/users", "create_user"),
                (HttpMethod::Put, "/users/{id}", "replace_user"),
            ]
        );
    }

    #[test]
    fn test_nested_routers_are_consumed() {
        let code = r#"
            async fn list_users() {}
            async fn get_user() {}
            async fn health() {}

            fn users_router() -> Router {
                Router::new()
                    .route("/", get(list_users))
                    .route("/:id", get(get_user))
            }

            fn app() -> Router {
                Router::new()
                    .nest("/api/users", users_router())
                    .route("/health", get(health))
                    .with_state(AppState::default())
            }
        "#;

        let entries = discover_entry_points(&[parse_code(code)]);
        assert_eq!(
            routes(&entries),
            vec![
                (HttpMethod::Get, "/api/users", "list_users"),
                (HttpMethod::Get, "/api/users/{id}", "get_user"),
                (HttpMethod::Get, "/health", "health"),
            ]
        );
    }

    #[test]
    fn test_let_bindings_and_merge() {
        let code = r#"
            async fn list_posts() {}
            async fn status() {}

            #[tokio::main]
            async fn main() {
                let posts = Router::new().route("/posts", get(list_posts));
                let app = Router::new()
                    .route("/status", get(status))
                    .merge(posts)
                    .layer(TraceLayer::new_for_http());
                let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await.unwrap();
                axum::serve(listener, app).await.unwrap();
            }
        "#;

        let entries = discover_entry_points(&[parse_code(code)]);
        assert_eq!(
            routes(&entries),
            vec![
                (HttpMethod::Get, "/status", "status"),
                (HttpMethod::Get, "/posts", "list_posts"),
            ]
        );
    }

    #[test]
    fn test_routers_across_files() {
        let handlers = r#"
            pub mod users {
                pub async fn list() {}
            }
            pub fn routes() -> Router {
                Router::new().route("/users", get(users::list))
            }
        "#;
        let main = r#"
            fn app() -> Router {
                Router::new().nest("/v1", handlers::routes())
            }
        "#;

        let entries = discover_entry_points(&[parse_code(handlers), parse_code(main)]);
        assert_eq!(routes(&entries), vec![(HttpMethod::Get, "/v1/users", "list")]);
        assert!(entries[0].handler.is_some());
    }

    #[test]
    fn test_duplicate_handlers_get_unique_ids() {
        let code = r#"
            async fn item() {}

            fn app() -> Router {
                Router::new()
                    .route("/a", get(item).delete(item))
                    .route("/b", get(item))
                    .route("/c", get(item))
            }
        "#;

        let entries = discover_entry_points(&[parse_code(code)]);
        let ids: Vec<&str> = entries.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["item", "item_delete", "item_get", "item_get_2"]);
    }

    #[test]
    fn test_closure_handlers_are_named_by_route() {
        let code = r#"
            fn app() -> Router {
                Router::new()
                    .route("/", get(|| async { "root" }))
                    .route("/health/live", get(|| async { "ok" }))
            }
        "#;

        let entries = discover_entry_points(&[parse_code(code)]);
        let ids: Vec<&str> = entries.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["get_root", "get_health_live"]);
        assert!(entries.iter().all(|e| e.handler.is_none()));
    }

    #[test]
    fn test_recursive_router_functions_terminate() {
        let code = r#"
            fn a() -> Router { Router::new().merge(b()) }
            fn b() -> Router { Router::new().merge(a()) }
        "#;

        let entries = discover_entry_points(&[parse_code(code)]);
        assert!(entries.is_empty());
    }

    #[test]
    fn test_impl_method_handlers() {
        let code = r#"
            struct Handlers;
            impl Handlers {
                /// @tag admin
                async fn stats() -> Json<Stats> { todo!() }
            }
            fn app() -> Router {
                Router::new().route("/stats", get(Handlers::stats))
            }
        "#;

        let entries = discover_entry_points(&[parse_code(code)]);
        assert_eq!(entries.len(), 1);
        assert!(entries[0].has_annotation("tag"));
    }

    #[test]
    fn test_combine_paths() {
        assert_eq!(combine_paths("/api/", "/users"), "/api/users");
        assert_eq!(combine_paths("/api", "/"), "/api");
        assert_eq!(combine_paths("", "/"), "/");
        assert_eq!(combine_paths("", "/users"), "/users");
    }
}
