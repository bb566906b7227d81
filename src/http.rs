//! HTTP API for the archive
//!
//! JSON over HTTP/1.1. Request bodies are JSON, list filters come from the
//! query string.
//!
//! ## Directory
//! - `GET /institutions` - List (`search`, `type`, `limit`, `offset`)
//! - `GET /institutions/featured` - First few institutions by name
//! - `POST /institutions` - Create
//! - `GET /institutions/{id}` - Point lookup
//! - `GET /subjects` / `POST /subjects`
//! - `GET /users` / `POST /users`
//! - `GET /users/{id}` - Point lookup
//!
//! ## Papers
//! - `GET /papers` - List, newest first
//! - `POST /papers` - Create (integrity checked)
//! - `GET /papers/{id}` - Point lookup
//! - `POST /papers/{id}/downloads` - Count a download
//!
//! ## Social proof and analytics
//! - `GET /testimonials` / `POST /testimonials`
//! - `GET /testimonials/featured`
//! - `GET /metrics?institution_id=` / `POST /metrics`
//! - `GET /dashboard/{user_id}`
//!
//! ## Example Usage
//!
//! ```bash
//! curl 'http://localhost:8095/institutions?search=univ'
//!
//! curl -X POST -H "Content-Type: application/json" \
//!      -d '{"name":"Calculus","code":"MATH101","institution_id":1}' \
//!      http://localhost:8095/subjects
//! ```

use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use serde::de::DeserializeOwned;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use crate::db::metrics::MetricQuery;
use crate::db::testimonials::TestimonialQuery;
use crate::error::ArchiveError;
use crate::services::response::{
    from_create_result, from_result, json_response, method_not_allowed, route_not_found,
};
use crate::services::Services;

type HttpResponse = Response<Full<Bytes>>;

/// HTTP server state
pub struct HttpServer {
    services: Arc<Services>,
    bind_addr: SocketAddr,
}

impl HttpServer {
    pub fn new(services: Arc<Services>, bind_addr: SocketAddr) -> Self {
        Self {
            services,
            bind_addr,
        }
    }

    /// Run the HTTP server
    pub async fn run(self: Arc<Self>) -> Result<(), ArchiveError> {
        let listener = TcpListener::bind(self.bind_addr).await?;
        info!(addr = %self.bind_addr, "HTTP server listening");

        loop {
            let (stream, remote_addr) = listener.accept().await?;
            let io = TokioIo::new(stream);
            let server = self.clone();

            tokio::spawn(async move {
                let service = service_fn(move |req| {
                    let server = server.clone();
                    async move { server.handle_request(req).await }
                });

                if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                    warn!(addr = %remote_addr, error = %err, "Connection error");
                }
            });
        }
    }

    async fn handle_request(
        self: Arc<Self>,
        req: Request<Incoming>,
    ) -> Result<HttpResponse, hyper::Error> {
        let method = req.method().clone();
        let path = req.uri().path().to_string();
        let query = req.uri().query().map(str::to_string);
        let body = req.collect().await?.to_bytes();

        Ok(self.respond(method, path, query, body).await)
    }

    /// Dispatch on the blocking pool; diesel calls are synchronous
    pub async fn respond(
        self: Arc<Self>,
        method: Method,
        path: String,
        query: Option<String>,
        body: Bytes,
    ) -> HttpResponse {
        let joined = tokio::task::spawn_blocking(move || {
            self.dispatch(&method, &path, query.as_deref(), &body)
        })
        .await;

        joined.unwrap_or_else(|e| {
            error!(error = %e, "Request handler panicked");
            json_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &serde_json::json!({ "error": "internal error", "kind": "storage_failure" }),
            )
        })
    }

    /// Route one request to its service call
    pub fn dispatch(
        &self,
        method: &Method,
        path: &str,
        query: Option<&str>,
        body: &[u8],
    ) -> HttpResponse {
        debug!(method = %method, path = %path, "Incoming request");
        let svc = &self.services;
        let segments: Vec<&str> = path.trim_matches('/').split('/').collect();

        match (method, segments.as_slice()) {
            (&Method::GET, ["health"]) => from_result(svc.db.stats().map(|stats| {
                serde_json::json!({ "status": "ok", "records": stats })
            })),

            (&Method::GET, ["institutions"]) => {
                from_result(parse_query(query).and_then(|q| svc.directory.list_institutions(&q)))
            }
            (&Method::POST, ["institutions"]) => from_create_result(
                parse_body(body).and_then(|input| svc.directory.create_institution(&input)),
            ),
            (&Method::GET, ["institutions", "featured"]) => {
                from_result(svc.directory.featured_institutions())
            }
            (&Method::GET, ["institutions", id]) => from_result(
                parse_id("institution", id).and_then(|id| svc.directory.get_institution(id)),
            ),

            (&Method::GET, ["subjects"]) => {
                from_result(parse_query(query).and_then(|q| svc.directory.list_subjects(&q)))
            }
            (&Method::POST, ["subjects"]) => from_create_result(
                parse_body(body).and_then(|input| svc.directory.create_subject(&input)),
            ),

            (&Method::GET, ["users"]) => {
                from_result(parse_query(query).and_then(|q| svc.directory.list_users(&q)))
            }
            (&Method::POST, ["users"]) => from_create_result(
                parse_body(body).and_then(|input| svc.directory.create_user(&input)),
            ),
            (&Method::GET, ["users", id]) => {
                from_result(parse_id("user", id).and_then(|id| svc.directory.get_user(id)))
            }

            (&Method::GET, ["papers"]) => {
                from_result(parse_query(query).and_then(|q| svc.papers.list_papers(&q)))
            }
            (&Method::POST, ["papers"]) => from_create_result(
                parse_body(body).and_then(|input| svc.papers.create_paper(&input)),
            ),
            (&Method::GET, ["papers", id]) => {
                from_result(parse_id("paper", id).and_then(|id| svc.papers.get_paper(id)))
            }
            (&Method::POST, ["papers", id, "downloads"]) => {
                from_result(parse_id("paper", id).and_then(|id| svc.papers.record_download(id)))
            }

            (&Method::GET, ["metrics"]) => from_result(
                parse_query::<MetricQuery>(query).and_then(|q| svc.metrics.list_metrics(&q)),
            ),
            (&Method::POST, ["metrics"]) => from_create_result(
                parse_body(body).and_then(|input| svc.metrics.record_metric(&input)),
            ),

            (&Method::GET, ["testimonials"]) => from_result(
                parse_query(query).and_then(|q| svc.testimonials.list_testimonials(&q)),
            ),
            (&Method::POST, ["testimonials"]) => from_create_result(
                parse_body(body).and_then(|input| svc.testimonials.create_testimonial(&input)),
            ),
            (&Method::GET, ["testimonials", "featured"]) => from_result(
                parse_query::<TestimonialQuery>(query)
                    .and_then(|q| svc.testimonials.featured_testimonials(&q)),
            ),

            (&Method::GET, ["dashboard", user_id]) => from_result(
                parse_id("user", user_id).and_then(|id| svc.dashboard.get_dashboard(id)),
            ),

            (_, segments) if is_known_route(segments) => method_not_allowed(),
            _ => route_not_found(path),
        }
    }
}

fn is_known_route(segments: &[&str]) -> bool {
    matches!(
        segments,
        ["health"]
            | ["institutions"]
            | ["institutions", "featured"]
            | ["institutions", _]
            | ["subjects"]
            | ["users"]
            | ["users", _]
            | ["papers"]
            | ["papers", _]
            | ["papers", _, "downloads"]
            | ["metrics"]
            | ["testimonials"]
            | ["testimonials", "featured"]
            | ["dashboard", _]
    )
}

fn parse_query<T: DeserializeOwned>(query: Option<&str>) -> Result<T, ArchiveError> {
    serde_urlencoded::from_str(query.unwrap_or(""))
        .map_err(|e| ArchiveError::InvalidInput(format!("Invalid query string: {}", e)))
}

fn parse_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, ArchiveError> {
    Ok(serde_json::from_slice(body)?)
}

fn parse_id(entity: &str, raw: &str) -> Result<i32, ArchiveError> {
    raw.parse()
        .map_err(|_| ArchiveError::InvalidInput(format!("Invalid {} id: {}", entity, raw)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server() -> HttpServer {
        let services = Arc::new(Services::in_memory().unwrap());
        HttpServer::new(services, "127.0.0.1:0".parse().unwrap())
    }

    async fn body_json(resp: HttpResponse) -> serde_json::Value {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_reports_counts() {
        let server = server();
        let resp = server.dispatch(&Method::GET, "/health", None, b"");
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["status"], "ok");
        assert_eq!(json["records"]["papers"], 0);
    }

    #[tokio::test]
    async fn test_unknown_route_and_method() {
        let server = server();
        assert_eq!(
            server.dispatch(&Method::GET, "/nope", None, b"").status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            server.dispatch(&Method::DELETE, "/papers/1", None, b"").status(),
            StatusCode::METHOD_NOT_ALLOWED
        );
    }

    #[tokio::test]
    async fn test_create_and_search_institutions() {
        let server = server();
        for (name, kind) in [("Harvard University", "university"), ("Lincoln School", "school")] {
            let body = serde_json::json!({ "name": name, "type": kind }).to_string();
            let resp = server.dispatch(&Method::POST, "/institutions", None, body.as_bytes());
            assert_eq!(resp.status(), StatusCode::CREATED);
        }

        let resp = server.dispatch(&Method::GET, "/institutions", Some("search=UnIv"), b"");
        let json = body_json(resp).await;
        assert_eq!(json.as_array().unwrap().len(), 1);
        assert_eq!(json[0]["name"], "Harvard University");
    }

    #[tokio::test]
    async fn test_get_by_id_routes() {
        let server = server();
        let body = serde_json::json!({ "name": "Lincoln School", "type": "school" }).to_string();
        let inst = body_json(server.dispatch(&Method::POST, "/institutions", None, body.as_bytes())).await;
        let inst_id = inst["id"].as_i64().unwrap();

        let body = serde_json::json!({
            "email": "t@lincoln.edu",
            "name": "T",
            "role": "teacher",
            "institution_id": inst_id
        })
        .to_string();
        let user = body_json(server.dispatch(&Method::POST, "/users", None, body.as_bytes())).await;

        let resp = server.dispatch(&Method::GET, &format!("/institutions/{}", inst_id), None, b"");
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await, inst);

        let resp = server.dispatch(&Method::GET, &format!("/users/{}", user["id"]), None, b"");
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await, user);

        let resp = server.dispatch(&Method::GET, "/users/77", None, b"");
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let resp = server.dispatch(&Method::GET, "/institutions/77", None, b"");
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            server.dispatch(&Method::DELETE, "/users/1", None, b"").status(),
            StatusCode::METHOD_NOT_ALLOWED
        );
    }

    #[tokio::test]
    async fn test_errors_carry_kind() {
        let server = server();
        let resp = server.dispatch(&Method::GET, "/dashboard/9", None, b"");
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(resp).await["kind"], "not_found");

        let resp = server.dispatch(&Method::GET, "/papers/abc", None, b"");
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = server.dispatch(&Method::GET, "/metrics", None, b"");
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(resp).await["kind"], "invalid_input");

        let resp = server.dispatch(&Method::POST, "/users", None, b"{not json");
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
