use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::config::ServerConfig;
use crate::infrastructure::observability::{create_metrics_router, PrometheusMetrics};

use super::documents;
use super::health;
use super::middleware::{logging_middleware, metrics_middleware};
use super::state::AppState;
use super::stats;

/// Create the full router with application state
///
/// `server.max_body_bytes` bounds whole multipart requests; per-file limits
/// are enforced by the pipeline.
pub fn create_router(
    state: AppState,
    server: &ServerConfig,
    metrics: Option<(PrometheusMetrics, String)>,
) -> Router {
    let api = Router::new()
        .route("/documents/upload", post(documents::upload_document))
        .route("/documents/batch", post(documents::upload_batch))
        .route("/stats", get(stats::get_stats))
        .route("/stats/reset", post(stats::reset_stats))
        .route("/cache/clear", post(stats::clear_cache));

    let mut router = Router::new()
        .route("/", get(health::root))
        .route("/health", get(health::health_check))
        .route("/live", get(health::live_check))
        .nest("/api", api)
        .with_state(state)
        .layer(DefaultBodyLimit::max(server.max_body_bytes))
        .layer(middleware::from_fn(logging_middleware))
        .layer(middleware::from_fn(metrics_middleware));

    if let Some((metrics, path)) = metrics {
        router = router.merge(create_metrics_router(metrics, &path));
    }

    router
        .layer(cors_layer(&server.cors_origins))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(tower_http::cors::Any)
        .allow_headers(tower_http::cors::Any)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::domain::document::ProcessingOptions;
    use crate::domain::parser::{DocumentParser, MockDocumentParser, ParseError, ParserVariant};
    use crate::domain::stats::ServiceStats;
    use crate::infrastructure::analysis::KeywordAnalyzer;
    use crate::infrastructure::cache::{DocumentCache, DocumentCacheConfig};
    use crate::infrastructure::parsers::ParserFactory;
    use crate::infrastructure::services::{
        BatchOrchestrator, DocumentPipeline, EnhancedProcessor, EnhancedProcessorConfig,
    };

    const BOUNDARY: &str = "docpipe-test-boundary";

    fn app_with(parsers: Vec<MockDocumentParser>) -> Router {
        let parsers = parsers
            .into_iter()
            .map(|p| Arc::new(p) as Arc<dyn DocumentParser>)
            .collect();
        let pipeline = Arc::new(DocumentPipeline::new(
            Arc::new(ParserFactory::with_parsers(parsers)),
            Arc::new(DocumentCache::new(DocumentCacheConfig::default())),
            Arc::new(ServiceStats::new()),
        ));
        let batch = BatchOrchestrator::new(pipeline.clone(), 2);
        let processor = EnhancedProcessor::new(
            pipeline,
            batch,
            Arc::new(KeywordAnalyzer::new()),
            EnhancedProcessorConfig::default(),
        );

        let server = ServerConfig {
            max_body_bytes: 1024 * 1024,
            ..Default::default()
        };

        create_router(
            AppState::new(processor, ProcessingOptions::default()),
            &server,
            None,
        )
    }

    fn app() -> Router {
        app_with(vec![MockDocumentParser::new(ParserVariant::Basic)])
    }

    /// `(field name, filename, content)` parts; a `None` filename is a plain text field
    fn multipart(parts: &[(&str, Option<&str>, &str)]) -> Body {
        let mut body = String::new();

        for (name, filename, content) in parts {
            body.push_str(&format!("--{}\r\n", BOUNDARY));
            match filename {
                Some(filename) => body.push_str(&format!(
                    "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n\r\n",
                    name, filename
                )),
                None => body.push_str(&format!(
                    "Content-Disposition: form-data; name=\"{}\"\r\n\r\n",
                    name
                )),
            }
            body.push_str(content);
            body.push_str("\r\n");
        }

        body.push_str(&format!("--{}--\r\n", BOUNDARY));
        Body::from(body)
    }

    fn post_multipart(uri: &str, parts: &[(&str, Option<&str>, &str)]) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(multipart(parts))
            .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_live_endpoint() {
        let response = app()
            .oneshot(Request::builder().uri("/live").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn test_cors_preflight_is_answered() {
        let response = app()
            .oneshot(
                Request::builder()
                    .method("OPTIONS")
                    .uri("/api/documents/upload")
                    .header(header::ORIGIN, "http://localhost:3000")
                    .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert!(response
            .headers()
            .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
    }

    #[tokio::test]
    async fn test_health_reports_parser_checks() {
        let response = app()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["checks"][0]["parser"], "basic");
    }

    #[tokio::test]
    async fn test_unhealthy_is_service_unavailable() {
        let app = app_with(vec![MockDocumentParser::new(ParserVariant::Basic)
            .with_error(ParseError::internal("broken install"))]);

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_upload_returns_enhanced_result() {
        let request = post_multipart(
            "/api/documents/upload",
            &[
                ("file", Some("notes.txt"), "Parsing documents requires careful parsing."),
                ("options", None, r#"{"generate_summary": true}"#),
            ],
        );

        let response = app().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["filename"], "notes.txt");
        assert_eq!(body["key_topics"][0], "parsing");
        assert_eq!(body["processing_info"]["parser_used"], "basic");
        assert!(body["summary"].is_string());
    }

    #[tokio::test]
    async fn test_upload_without_file_is_bad_request() {
        let request = post_multipart("/api/documents/upload", &[("options", None, "{}")]);

        let response = app().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_upload_over_size_limit_is_payload_too_large() {
        let request = post_multipart(
            "/api/documents/upload",
            &[
                ("file", Some("big.txt"), "0123456789abcdef"),
                ("options", None, r#"{"max_file_size_bytes": 8}"#),
            ],
        );

        let response = app().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        let body = json_body(response).await;
        assert_eq!(body["error"]["code"], "too_large");
    }

    #[tokio::test]
    async fn test_unsupported_type_is_415() {
        let request = post_multipart(
            "/api/documents/upload",
            &[("file", Some("page.html"), "<html><body>hi</body></html>")],
        );

        let response = app().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    }

    #[tokio::test]
    async fn test_batch_keeps_upload_order() {
        let request = post_multipart(
            "/api/documents/batch?max_concurrent=2",
            &[
                ("files", Some("a.txt"), "first document body"),
                ("files", Some("b.html"), "<html></html>"),
                ("files", Some("c.txt"), "third document body"),
            ],
        );

        let response = app().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["total"], 3);
        assert_eq!(body["completed"], 2);
        assert_eq!(body["failed"], 1);
        assert_eq!(body["results"][0]["filename"], "a.txt");
        assert_eq!(body["results"][1]["status"], "failed");
        assert_eq!(body["results"][1]["error"]["kind"], "unsupported");
        assert_eq!(body["results"][2]["status"], "completed");
    }

    #[tokio::test]
    async fn test_batch_rejects_zero_concurrency() {
        let request = post_multipart(
            "/api/documents/batch?max_concurrent=0",
            &[("files", Some("a.txt"), "text")],
        );

        let response = app().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_stats_reflect_processing_and_reset() {
        let app = app();

        for _ in 0..2 {
            let request = post_multipart(
                "/api/documents/upload",
                &[("file", Some("same.txt"), "identical content")],
            );
            let response = app.clone().oneshot(request).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        let response = app
            .clone()
            .oneshot(Request::builder().uri("/api/stats").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = json_body(response).await;

        assert_eq!(body["stats"]["documents_processed"], 2);
        assert_eq!(body["stats"]["cache_hits"], 1);
        assert_eq!(body["processing"]["available_parsers"][0], "basic");

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/cache/clear")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(json_body(response).await["cleared_entries"], 1);

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/stats/reset")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(json_body(response).await["documents_processed"], 0);
    }
}
