use std::{future::IntoFuture, process, sync::Arc};

use lpi_export::{
    application::{
        error::AppError,
        export::{
            DocumentTemplate, ExportError, ExportOutcome, ExportPipeline, ExportPipelineParts,
            HttpRenderTransport, RenderClient, SnapshotBuilder,
        },
        render::RenderService,
    },
    config,
    infra::{
        chromium::ChromiumEngine,
        documents::HtmlDocument,
        downloads::DirectoryDownloads,
        error::InfraError,
        http::{self, CorsPolicy, ServiceState},
        print::FilePrintHost,
        telemetry,
    },
};
use tokio::sync::watch;
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Export(args) => run_export(settings, args).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let engine = Arc::new(ChromiumEngine::new(&settings.browser));
    let renderer = RenderService::new(engine, settings.export.default_filename.clone());
    let cors = CorsPolicy::new(&settings.server.cors_allow_origin)?;
    let router = http::build_router(
        ServiceState { renderer },
        cors,
        settings.server.max_body_bytes.get(),
    );

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    info!(
        target = "lpi_export::serve",
        addr = %settings.server.addr,
        "PDF render service listening"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!(target = "lpi_export::serve", "Shutdown signal received");
            let _ = shutdown_tx.send(true);
        }
    });

    let mut graceful_rx = shutdown_rx.clone();
    let server = axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(async move {
            let _ = graceful_rx.wait_for(|stop| *stop).await;
        })
        .into_future();

    let grace = settings.server.graceful_shutdown;
    let mut deadline_rx = shutdown_rx;
    tokio::select! {
        result = server => {
            result.map_err(|err| AppError::unexpected(format!("server error: {err}")))?;
        }
        _ = async move {
            let _ = deadline_rx.wait_for(|stop| *stop).await;
            tokio::time::sleep(grace).await;
        } => {
            warn!(
                target = "lpi_export::serve",
                grace_seconds = grace.as_secs(),
                "In-flight requests did not finish in time; shutting down anyway"
            );
        }
    }

    Ok(())
}

async fn run_export(settings: config::Settings, args: config::ExportArgs) -> Result<(), AppError> {
    let export = &settings.export;
    info!(
        target = "lpi_export::export",
        document = %args.document.display(),
        endpoints = export.endpoints.len(),
        "Starting export"
    );

    let document = HtmlDocument::open(&args.document)
        .await
        .map_err(InfraError::from)?;

    let transport = HttpRenderTransport::new(export.default_filename.clone())
        .map_err(InfraError::from)?;
    let print_host = if args.no_print_view {
        FilePrintHost::blocked(&export.output_dir)
    } else {
        FilePrintHost::new(&export.output_dir)
    };

    let pipeline = ExportPipeline::new(ExportPipelineParts {
        snapshots: SnapshotBuilder::from_settings(export).map_err(ExportError::from)?,
        template: DocumentTemplate::from_settings(export),
        client: RenderClient::new(Arc::new(transport)),
        endpoints: export.endpoints.clone(),
        options: export.options.clone(),
        default_filename: export.default_filename.clone(),
        downloads: Arc::new(DirectoryDownloads::new(
            &export.output_dir,
            export.default_filename.clone(),
        )),
        print_host: Arc::new(print_host),
    });

    let report = pipeline.run(&document, &document, None).await?;
    match report.outcome {
        ExportOutcome::Downloaded { endpoint, file } => {
            println!("PDF guardado en {}", file.path.display());
            info!(
                target = "lpi_export::export",
                endpoint = %endpoint,
                path = %file.path.display(),
                "Export completed"
            );
            Ok(())
        }
        ExportOutcome::PrintFallback { view, cause } => {
            println!(
                "No se pudo generar el PDF en el servidor; vista de impresión en {}",
                view.location.display()
            );
            warn!(
                target = "lpi_export::export",
                cause = %cause,
                "Export fell back to print view"
            );
            Ok(())
        }
        ExportOutcome::Abandoned { cause, detail } => {
            warn!(
                target = "lpi_export::export",
                cause = %cause,
                detail = %detail,
                "Export abandoned"
            );
            Err(AppError::ExportAbandoned)
        }
    }
}
