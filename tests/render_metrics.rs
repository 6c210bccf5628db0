use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use lpi_export::application::{
    export::{AttemptFailure, RenderClient, RenderTransport, RenderedPdf},
    render::{EngineError, PdfEngine, RenderJob, RenderService},
};
use lpi_render_types::{GeneratePdfBody, RenderOptions, RenderRequest};
use metrics_util::debugging::DebuggingRecorder;
use url::Url;

struct Engine;

#[async_trait]
impl PdfEngine for Engine {
    async fn render(&self, _job: &RenderJob) -> Result<Bytes, EngineError> {
        Ok(Bytes::from_static(b"%PDF-1.7"))
    }
}

struct HalfBroken;

#[async_trait]
impl RenderTransport for HalfBroken {
    async fn submit(
        &self,
        endpoint: &Url,
        _request: &RenderRequest,
    ) -> Result<RenderedPdf, AttemptFailure> {
        if endpoint.host_str() == Some("down.test") {
            return Err(AttemptFailure::Unreachable("connection refused".to_string()));
        }
        Ok(RenderedPdf {
            bytes: Bytes::from_static(b"%PDF-1.7"),
            content_length: Some(8),
            filename: "reporte.pdf".to_string(),
        })
    }
}

#[tokio::test]
async fn render_paths_emit_expected_metric_keys() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder
        .install()
        .expect("debug metrics recorder should install in this test process");

    let service = RenderService::new(Arc::new(Engine), "reporte.pdf");
    service
        .generate(GeneratePdfBody {
            html: Some("<p>x</p>".to_string()),
            ..GeneratePdfBody::default()
        })
        .await
        .expect("render succeeds");
    service
        .generate(GeneratePdfBody::default())
        .await
        .expect_err("missing html rejected");

    let client = RenderClient::new(Arc::new(HalfBroken));
    let request = RenderRequest {
        html: "<p>x</p>".to_string(),
        filename: None,
        options: RenderOptions::default(),
    };
    let rendered = client
        .render(
            &request,
            &[
                Url::parse("http://down.test/api/generate-pdf").expect("url"),
                Url::parse("http://up.test/api/generate-pdf").expect("url"),
            ],
        )
        .await
        .expect("second endpoint renders");
    assert_eq!(rendered.failures.len(), 1);

    let names: HashSet<String> = snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .map(|(composite_key, _, _, _)| composite_key.key().name().to_string())
        .collect();

    for metric in [
        "lpi_render_requests_total",
        "lpi_render_duration_ms",
        "lpi_export_endpoint_attempts_total",
    ] {
        assert!(names.contains(metric), "missing metric: {metric}");
    }
}
