//! SOAP server: service registry and HTTP transport.
//!
//! Routing follows the path shape `/<service>`: a POST carries an operation
//! envelope, anything else must ask for `?wsdl`.

use crate::config::SoapServerConfig;
use crate::error::ServerError;
use crate::marshal::respond;
use crate::service::Service;
use crate::wsdl::{synthesize, WsdlOptions};
use crate::xml::parse_document;
use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use indexmap::IndexMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

/// What a successful request produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyKind {
    /// A WSDL document
    Wsdl,
    /// An operation result envelope
    Result { operation: String },
    /// An envelope carrying a SOAP Fault
    Fault { code: &'static str },
}

/// A `text/xml` reply.
#[derive(Debug, Clone)]
pub struct SoapReply {
    pub service: String,
    pub kind: ReplyKind,
    pub body: String,
}

/// Request counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServerStats {
    pub requests_processed: u64,
    pub faults_returned: u64,
    pub requests_failed: u64,
}

/// Registry of services plus the request entry point.
///
/// Services are registered during startup; afterwards the server is shared
/// behind an `Arc` and only read.
pub struct SoapServer {
    config: SoapServerConfig,
    services: IndexMap<String, Service>,
    requests_processed: AtomicU64,
    faults_returned: AtomicU64,
    requests_failed: AtomicU64,
}

impl SoapServer {
    /// Create a server with no services.
    pub fn new(config: SoapServerConfig) -> Self {
        Self {
            config,
            services: IndexMap::new(),
            requests_processed: AtomicU64::new(0),
            faults_returned: AtomicU64::new(0),
            requests_failed: AtomicU64::new(0),
        }
    }

    /// Register a service under its own name, replacing any previous one.
    pub fn add_service(&mut self, service: Service) -> &mut Self {
        info!(
            service = %service.name(),
            operations = service.operations().count(),
            "Service registered"
        );
        self.services.insert(service.name().to_string(), service);
        self
    }

    pub fn config(&self) -> &SoapServerConfig {
        &self.config
    }

    pub fn service(&self, name: &str) -> Option<&Service> {
        self.services.get(name)
    }

    pub fn services(&self) -> impl Iterator<Item = &Service> {
        self.services.values()
    }

    pub fn stats(&self) -> ServerStats {
        ServerStats {
            requests_processed: self.requests_processed.load(Ordering::Relaxed),
            faults_returned: self.faults_returned.load(Ordering::Relaxed),
            requests_failed: self.requests_failed.load(Ordering::Relaxed),
        }
    }

    /// WSDL for a registered service as seen from `host`.
    pub fn wsdl(&self, service: &Service, host: &str) -> Result<String, ServerError> {
        let options = WsdlOptions {
            host,
            target_namespace: &self.config.settings.target_namespace,
            binding_namespace_prefix: &self.config.wsdl.binding_namespace_prefix,
        };
        synthesize(service, &options)
            .map_err(|e| ServerError::Internal(format!("WSDL generation failed: {}", e)))
    }

    /// Handle one request independent of the HTTP stack.
    pub async fn handle_request(
        &self,
        method: &Method,
        uri: &Uri,
        host: Option<&str>,
        body: &[u8],
    ) -> Result<SoapReply, ServerError> {
        self.requests_processed.fetch_add(1, Ordering::Relaxed);

        let result = self.route(method, uri, host, body).await;
        match &result {
            Ok(reply) => {
                if matches!(reply.kind, ReplyKind::Fault { .. }) {
                    self.faults_returned.fetch_add(1, Ordering::Relaxed);
                }
            }
            Err(error) => {
                self.requests_failed.fetch_add(1, Ordering::Relaxed);
                warn!(
                    method = %method,
                    path = %uri.path(),
                    kind = error.kind(),
                    error = %error,
                    "Request failed"
                );
            }
        }
        result
    }

    async fn route(
        &self,
        method: &Method,
        uri: &Uri,
        host: Option<&str>,
        body: &[u8],
    ) -> Result<SoapReply, ServerError> {
        if method == Method::POST {
            let service = self.resolve(uri.path())?;

            let max_body_size = self.config.settings.max_body_size;
            if body.len() > max_body_size {
                return Err(ServerError::BodyTooLarge {
                    size: body.len(),
                    max: max_body_size,
                });
            }

            let document = parse_document(body, &self.config.xxe_prevention)?;
            let rendered = respond(service, &document).await?;

            let kind = match (rendered.operation, rendered.fault) {
                (_, Some(code)) => ReplyKind::Fault {
                    code: code.as_str(),
                },
                (Some(operation), None) => ReplyKind::Result { operation },
                (None, None) => {
                    return Err(ServerError::Internal("empty dispatch result".to_string()))
                }
            };

            debug!(service = %service.name(), kind = ?kind, "Operation request handled");

            return Ok(SoapReply {
                service: service.name().to_string(),
                kind,
                body: rendered.envelope,
            });
        }

        let query = uri.query().ok_or(ServerError::MissingRequest)?;
        let service = self.resolve(uri.path())?;

        if query != "wsdl" {
            return Err(ServerError::UnsupportedQuery(query.to_string()));
        }

        let host = host.unwrap_or(&self.config.settings.listen);
        debug!(service = %service.name(), host = %host, "Serving WSDL");

        Ok(SoapReply {
            service: service.name().to_string(),
            kind: ReplyKind::Wsdl,
            body: self.wsdl(service, host)?,
        })
    }

    fn resolve(&self, path: &str) -> Result<&Service, ServerError> {
        let name = path.strip_prefix('/').unwrap_or(path);
        if name.contains('/') {
            return Err(ServerError::FileNotFound(path.to_string()));
        }
        self.services
            .get(name)
            .ok_or_else(|| ServerError::ServiceNotFound(name.to_string()))
    }

    /// Build the axum router serving every registered service.
    pub fn router(self: Arc<Self>) -> Router {
        let max_body_size = self.config.settings.max_body_size;

        Router::new()
            .fallback(http_handler)
            .layer(DefaultBodyLimit::max(max_body_size))
            .layer(TraceLayer::new_for_http())
            .with_state(self)
    }

    /// Serve on `listener` until `shutdown` completes.
    pub async fn serve(
        self: Arc<Self>,
        listener: TcpListener,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> std::io::Result<()> {
        let addr = listener.local_addr()?;
        info!(address = %addr, services = self.services.len(), "SOAP server listening");

        axum::serve(listener, Arc::clone(&self).router())
            .with_graceful_shutdown(shutdown)
            .await?;

        let stats = self.stats();
        info!(
            requests_processed = stats.requests_processed,
            faults_returned = stats.faults_returned,
            requests_failed = stats.requests_failed,
            "SOAP server stopped"
        );
        Ok(())
    }
}

async fn http_handler(
    State(server): State<Arc<SoapServer>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let host = headers
        .get(header::HOST)
        .and_then(|value| value.to_str().ok());

    match server.handle_request(&method, &uri, host, &body).await {
        Ok(reply) => {
            let mut response = ([(header::CONTENT_TYPE, "text/xml")], reply.body).into_response();
            if server.config.settings.debug_headers {
                add_debug_headers(response.headers_mut(), &reply.service, &reply.kind);
            }
            response
        }
        Err(error) => {
            let status = StatusCode::from_u16(error.status_code())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (status, [(header::CONTENT_TYPE, "text/plain")], error.to_string()).into_response()
        }
    }
}

fn add_debug_headers(headers: &mut HeaderMap, service: &str, kind: &ReplyKind) {
    if let Ok(value) = HeaderValue::from_str(service) {
        headers.insert("x-soap-service", value);
    }
    let detail = match kind {
        ReplyKind::Wsdl => None,
        ReplyKind::Result { operation } => HeaderValue::from_str(operation).ok(),
        ReplyKind::Fault { code } => Some(HeaderValue::from_static(*code)),
    };
    if let Some(value) = detail {
        let name = if matches!(kind, ReplyKind::Fault { .. }) {
            "x-soap-fault"
        } else {
            "x-soap-operation"
        };
        headers.insert(name, value);
    }
}
