use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use bytes::Bytes;
use http_body_util::BodyExt;
use lpi_export::{
    application::render::{EngineError, PdfEngine, RenderJob, RenderService},
    infra::http::{self, CorsPolicy, ServiceState},
};
use lpi_render_types::PageFormat;
use serde_json::{Value, json};
use tower::ServiceExt;

const PDF: &[u8] = b"%PDF-1.7\n%stub\n";

#[derive(Default)]
struct StubEngine {
    fail: bool,
    jobs: Mutex<Vec<RenderJob>>,
}

#[async_trait]
impl PdfEngine for StubEngine {
    async fn render(&self, job: &RenderJob) -> Result<Bytes, EngineError> {
        self.jobs.lock().unwrap().push(job.clone());
        if self.fail {
            return Err(EngineError::Protocol("target crashed".to_string()));
        }
        Ok(Bytes::from_static(PDF))
    }
}

fn router(engine: Arc<StubEngine>) -> Router {
    let renderer = RenderService::new(engine, "reporte.pdf");
    http::build_router(
        ServiceState { renderer },
        CorsPolicy::new("*").expect("valid origin"),
        1024 * 1024,
    )
}

fn post_json(path: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("json body")
}

#[tokio::test]
async fn health_reports_service_name() {
    let response = router(Arc::default())
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
    assert_eq!(
        json_body(response).await,
        json!({"status": "OK", "service": "PDF Generator API"})
    );
}

#[tokio::test]
async fn generates_pdf_attachment() {
    let engine = Arc::new(StubEngine::default());
    let body = json!({
        "html": "<html><body><p>Reporte</p></body></html>",
        "filename": "equipo-norte.pdf",
        "options": {"format": "Letter", "printBackground": false}
    });

    let response = router(engine.clone())
        .oneshot(post_json("/api/generate-pdf", &body.to_string()))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(headers[header::CONTENT_TYPE], "application/pdf");
    assert_eq!(headers[header::CONTENT_LENGTH], PDF.len().to_string().as_str());
    assert_eq!(
        headers[header::CONTENT_DISPOSITION],
        "attachment; filename=\"equipo-norte.pdf\""
    );
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");

    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes();
    assert_eq!(bytes.as_ref(), PDF);

    let jobs = engine.jobs.lock().unwrap();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].options.format, PageFormat::Letter);
    assert!(!jobs[0].options.print_background);
    assert_eq!(jobs[0].options.margin.top, "10mm");
}

#[tokio::test]
async fn wider_formats_and_numeric_margins_are_accepted() {
    let engine = Arc::new(StubEngine::default());
    let body = json!({
        "html": "<p>x</p>",
        "options": {"format": "a5", "margin": {"top": 10, "bottom": "1cm"}}
    });

    let response = router(engine.clone())
        .oneshot(post_json("/api/generate-pdf", &body.to_string()))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let jobs = engine.jobs.lock().unwrap();
    assert_eq!(jobs[0].options.format, PageFormat::A5);
    assert_eq!(jobs[0].options.margin.top, "10px");
    assert_eq!(jobs[0].options.margin.bottom, "1cm");
    assert_eq!(jobs[0].options.margin.left, "10mm");
}

#[tokio::test]
async fn unknown_format_is_a_client_error() {
    let response = router(Arc::default())
        .oneshot(post_json(
            "/api/generate-pdf",
            r#"{"html":"<p>x</p>","options":{"format":"B5"}}"#,
        ))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"], "JSON inválido");
}

#[tokio::test]
async fn alias_path_serves_the_same_handler() {
    let response = router(Arc::default())
        .oneshot(post_json("/generate-pdf", r#"{"html":"<p>x</p>"}"#))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"reporte.pdf\""
    );
}

#[tokio::test]
async fn missing_or_blank_html_is_rejected() {
    for body in [r"{}", r#"{"html":""}"#, r#"{"html":"   "}"#] {
        let engine = Arc::new(StubEngine::default());
        let response = router(engine.clone())
            .oneshot(post_json("/api/generate-pdf", body))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body {body}");
        assert_eq!(json_body(response).await, json!({"error": "HTML es requerido"}));
        assert!(engine.jobs.lock().unwrap().is_empty());
    }
}

#[tokio::test]
async fn malformed_json_is_a_client_error() {
    let response = router(Arc::default())
        .oneshot(post_json("/api/generate-pdf", "{\"html\":"))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["error"], "JSON inválido");
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn other_methods_are_not_allowed() {
    for method in [Method::GET, Method::PUT, Method::DELETE] {
        let response = router(Arc::default())
            .oneshot(
                Request::builder()
                    .method(method.clone())
                    .uri("/api/generate-pdf")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED, "{method}");
        assert_eq!(json_body(response).await, json!({"error": "Método no permitido"}));
    }
}

#[tokio::test]
async fn preflight_answers_with_cors_headers() {
    let response = router(Arc::default())
        .oneshot(
            Request::builder()
                .method(Method::OPTIONS)
                .uri("/api/generate-pdf")
                .header(header::ORIGIN, "https://lpi.example")
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_METHODS], "GET, POST, OPTIONS");
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_HEADERS], "Content-Type");
}

#[tokio::test]
async fn engine_failure_is_reported_with_detail() {
    let engine = Arc::new(StubEngine {
        fail: true,
        ..StubEngine::default()
    });

    let response = router(engine)
        .oneshot(post_json("/api/generate-pdf", r#"{"html":"<p>x</p>"}"#))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    let body = json_body(response).await;
    assert_eq!(body["error"], "Error generando PDF");
    assert!(
        body["message"]
            .as_str()
            .is_some_and(|message| message.contains("target crashed"))
    );
}

#[tokio::test]
async fn hostile_filenames_are_sanitized() {
    let response = router(Arc::default())
        .oneshot(post_json(
            "/api/generate-pdf",
            r#"{"html":"<p>x</p>","filename":"../../etc/\"passwd"}"#,
        ))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"passwd.pdf\""
    );
}

#[tokio::test]
async fn oversized_bodies_are_rejected() {
    let renderer = RenderService::new(Arc::new(StubEngine::default()), "reporte.pdf");
    let app = http::build_router(
        ServiceState { renderer },
        CorsPolicy::new("*").expect("valid origin"),
        64,
    );
    let body = json!({"html": "x".repeat(256)}).to_string();

    let response = app
        .oneshot(post_json("/api/generate-pdf", &body))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}
