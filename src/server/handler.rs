//! HTTP request handlers and routing.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::parser::{HttpRequest, Method};
use crate::server::{HttpResponse, Error, StatusCode};

/// Type alias for a boxed future that returns a Result<HttpResponse, Error>.
pub type HandlerFuture = Pin<Box<dyn Future<Output = Result<HttpResponse, Error>> + Send>>;

/// Type alias for a handler function that takes an HttpRequest and returns a HandlerFuture.
///
/// This is the only way request-specific behavior reaches a session.
pub type HandlerFn = Arc<dyn Fn(HttpRequest) -> HandlerFuture + Send + Sync>;

/// Box an async closure into a [`HandlerFn`].
///
/// # Arguments
///
/// * `handler` - An async function from request to response
///
/// # Returns
///
/// A shareable handler a server or router can dispatch to.
pub fn handler_fn<F, Fut>(handler: F) -> HandlerFn
where
    F: Fn(HttpRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<HttpResponse, Error>> + Send + 'static,
{
    Arc::new(move |req: HttpRequest| -> HandlerFuture { Box::pin(handler(req)) })
}

/// Represents a route in the HTTP server.
pub struct Route {
    /// The path to match.
    pub path: String,
    /// The HTTP methods to match. Empty matches any method.
    pub methods: Vec<Method>,
    /// The handler function.
    pub handler: HandlerFn,
}

impl Route {
    fn allows(&self, method: &Method) -> bool {
        self.methods.is_empty() || self.methods.contains(method)
    }
}

/// Exact-path dispatch over a set of routes.
///
/// Unknown paths fail with [`Error::NotFound`], known paths with the wrong
/// method with [`Error::MethodNotAllowed`]. The session turns both into
/// error pages.
#[derive(Default)]
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    /// Create a router with no routes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a route.
    ///
    /// # Arguments
    ///
    /// * `path` - Exact path to match, without the query string
    /// * `methods` - Methods the route answers; empty matches any method
    /// * `handler` - The async function to call
    ///
    /// # Returns
    ///
    /// The router, for chaining.
    pub fn route<F, Fut>(mut self, path: impl Into<String>, methods: Vec<Method>, handler: F) -> Self
    where
        F: Fn(HttpRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<HttpResponse, Error>> + Send + 'static,
    {
        self.routes.push(Route {
            path: path.into(),
            methods,
            handler: handler_fn(handler),
        });
        self
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    fn dispatch(&self, request: HttpRequest) -> HandlerFuture {
        let path = request.path.split_once('?').map_or(request.path.as_str(), |(p, _)| p);
        let matching: Vec<&Route> = self.routes.iter().filter(|r| r.path == path).collect();

        if matching.is_empty() {
            let error = Error::NotFound(path.to_string());
            return Box::pin(async move { Err::<HttpResponse, _>(error) });
        }

        match matching.iter().find(|r| r.allows(&request.method)) {
            Some(route) => (route.handler)(request),
            None => {
                let allow: Vec<String> = matching
                    .iter()
                    .flat_map(|r| r.methods.iter().map(|m| m.to_string()))
                    .collect();
                let error = Error::MethodNotAllowed {
                    method: request.method,
                    allow: allow.join(", "),
                };
                Box::pin(async move { Err::<HttpResponse, _>(error) })
            }
        }
    }

    /// Turn the router into the handler a server dispatches to.
    pub fn into_handler(self) -> HandlerFn {
        let router = Arc::new(self);
        Arc::new(move |req: HttpRequest| router.dispatch(req))
    }
}

/// The sample root page: greets the peer by address.
///
/// # Arguments
///
/// * `title` - Page title
/// * `greeting` - Text put before the peer address, e.g. `Hello`
///
/// # Returns
///
/// A handler answering every request with
/// `<html><head><title>{title}</title></head><body>{greeting}, {peer}!</body></html>`.
pub fn root_page(title: impl Into<String>, greeting: impl Into<String>) -> HandlerFn {
    let title: Arc<str> = title.into().into();
    let greeting: Arc<str> = greeting.into().into();
    handler_fn(move |req: HttpRequest| {
        let title = title.clone();
        let greeting = greeting.clone();
        async move {
            let peer = req
                .peer_addr
                .map_or_else(|| "stranger".to_string(), |addr| addr.to_string());
            Ok::<_, Error>(HttpResponse::new(StatusCode::Ok).with_html(format!(
                "<html><head><title>{title}</title></head><body>{greeting}, {peer}!</body></html>"
            )))
        }
    })
}
