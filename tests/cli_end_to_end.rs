#![deny(clippy::all, clippy::pedantic)]

use std::path::Path;

use assert_cmd::Command;
use httpmock::MockServer;
use predicates::str::contains;
use tempfile::TempDir;

const PDF: &[u8] = b"%PDF-1.4\n%cli\n%%EOF\n";

fn report_file(dir: &Path, body: &str) -> std::path::PathBuf {
    let path = dir.join("reporte.html");
    std::fs::write(
        &path,
        format!(
            "<!DOCTYPE html><html><head><style>.r {{ color: red; }}</style></head><body>{body}</body></html>"
        ),
    )
    .expect("write report");
    path
}

fn export_command() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("lpi-export"));
    cmd.env_remove("LPI_CONFIG_FILE").arg("export");
    cmd
}

#[test]
fn export_writes_pdf_end_to_end() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method("POST")
            .path("/api/generate-pdf")
            .json_body_includes(r#"{"filename":"equipo.pdf"}"#);
        then.status(200)
            .header("content-type", "application/pdf")
            .header("content-disposition", "attachment; filename=\"equipo.pdf\"")
            .body(PDF);
    });

    let workspace = TempDir::new().expect("tempdir");
    let document = report_file(
        workspace.path(),
        r#"<div id="report-content"><p>Resultados</p></div>"#,
    );
    let out = workspace.path().join("out");

    export_command()
        .arg("--endpoint")
        .arg(server.url("/api/generate-pdf"))
        .arg("--filename")
        .arg("equipo")
        .arg("--output-dir")
        .arg(&out)
        .arg(&document)
        .assert()
        .success()
        .stdout(contains("PDF guardado en"));

    mock.assert();
    assert_eq!(std::fs::read(out.join("equipo.pdf")).expect("pdf"), PDF);
}

#[test]
fn failing_endpoint_leaves_print_view() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method("POST").path("/api/generate-pdf");
        then.status(500).body(r#"{"error":"Error generando PDF"}"#);
    });

    let workspace = TempDir::new().expect("tempdir");
    let document = report_file(
        workspace.path(),
        r#"<div id="report-content"><p>Resultados</p></div>"#,
    );
    let out = workspace.path().join("out");

    export_command()
        .arg("--endpoint")
        .arg(server.url("/api/generate-pdf"))
        .arg("--output-dir")
        .arg(&out)
        .arg(&document)
        .assert()
        .success()
        .stdout(contains("vista de impresión"));

    mock.assert();
    let view = std::fs::read_to_string(out.join("reporte.print.html")).expect("print view");
    assert!(view.contains("Resultados"));
}

#[test]
fn no_print_view_reports_generic_failure() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method("POST").path("/api/generate-pdf");
        then.status(502);
    });

    let workspace = TempDir::new().expect("tempdir");
    let document = report_file(
        workspace.path(),
        r#"<div id="report-content"><p>Resultados</p></div>"#,
    );
    let out = workspace.path().join("out");

    export_command()
        .arg("--endpoint")
        .arg(server.url("/api/generate-pdf"))
        .arg("--output-dir")
        .arg(&out)
        .arg("--no-print-view")
        .arg(&document)
        .assert()
        .failure()
        .stdout(contains("No se pudo generar el PDF. Por favor, intenta de nuevo."));

    mock.assert();
    assert!(!out.join("reporte.print.html").exists());
}

#[test]
fn missing_report_content_fails_fast() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method("POST").path("/api/generate-pdf");
        then.status(200).body(PDF);
    });

    let workspace = TempDir::new().expect("tempdir");
    let document = report_file(workspace.path(), r#"<div id="summary">sin reporte</div>"#);

    export_command()
        .arg("--endpoint")
        .arg(server.url("/api/generate-pdf"))
        .arg("--output-dir")
        .arg(workspace.path().join("out"))
        .arg(&document)
        .assert()
        .failure()
        .stdout(contains("report content not found"));

    assert_eq!(mock.calls(), 0);
}

#[test]
fn unreadable_document_fails() {
    let workspace = TempDir::new().expect("tempdir");

    export_command()
        .arg("--endpoint")
        .arg("http://127.0.0.1:1/api/generate-pdf")
        .arg(workspace.path().join("missing.html"))
        .assert()
        .failure()
        .stdout(contains("failed to read document"));
}
