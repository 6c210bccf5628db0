use super::*;

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = RawSettings::default();
    raw.server.port = Some(4000);
    raw.logging.level = Some("info".to_string());

    let overrides = ServeOverrides {
        server_port: Some(4321),
        logging: LoggingOverrides {
            log_level: Some("debug".to_string()),
            ..Default::default()
        },
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.server.addr.port(), 4321);
    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
}

#[test]
fn defaults_describe_a_local_render_service() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

    assert_eq!(settings.server.addr.port(), DEFAULT_PORT);
    assert_eq!(
        settings.server.max_body_bytes.get() as u64,
        DEFAULT_MAX_BODY_BYTES
    );
    assert_eq!(settings.export.endpoints.len(), 1);
    assert_eq!(settings.export.endpoints[0].as_str(), DEFAULT_ENDPOINT);
    assert_eq!(settings.export.content_id, DEFAULT_CONTENT_ID);
    assert_eq!(settings.export.fallback_content_ids, ["lpi-report", "report"]);
    assert_eq!(settings.export.exclude_selectors, [DEFAULT_EXCLUDE_SELECTOR]);
    assert_eq!(settings.export.default_filename, DEFAULT_FILENAME);
    assert_eq!(settings.export.options, RenderOptions::default());
    assert_eq!(
        settings.browser.canvas_poll_attempts.get(),
        DEFAULT_CANVAS_POLL_ATTEMPTS
    );
    assert!(!settings.browser.sandbox);
}

#[test]
fn export_overrides_replace_endpoint_list() {
    let mut raw = RawSettings::default();
    raw.export.endpoints = Some(vec![
        "http://a.example/api/generate-pdf".to_string(),
        "http://b.example/api/generate-pdf".to_string(),
    ]);

    let args = CliArgs::parse_from([
        "lpi-export",
        "export",
        "--endpoint",
        "http://c.example/api/generate-pdf",
        "--content-id",
        "report-x",
        "report.html",
    ]);
    let Some(Command::Export(export)) = args.command else {
        panic!("export command expected");
    };

    raw.apply_export_overrides(&export);
    let settings = Settings::from_raw(raw).expect("valid settings");

    let endpoints: Vec<&str> = settings.export.endpoints.iter().map(Url::as_str).collect();
    assert_eq!(endpoints, ["http://c.example/api/generate-pdf"]);
    assert_eq!(settings.export.content_id, "report-x");
}

#[test]
fn rejects_non_http_endpoints() {
    let mut raw = RawSettings::default();
    raw.export.endpoints = Some(vec!["file:///tmp/render".to_string()]);

    let err = Settings::from_raw(raw).expect_err("file scheme rejected");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "export.endpoints",
            ..
        }
    ));
}

#[test]
fn rejects_empty_endpoint_list() {
    let mut raw = RawSettings::default();
    raw.export.endpoints = Some(vec!["  ".to_string()]);

    assert!(Settings::from_raw(raw).is_err());
}

#[test]
fn rejects_unparsable_exclude_selector() {
    let mut raw = RawSettings::default();
    raw.export.exclude_selectors = Some(vec!["div[".to_string()]);

    let err = Settings::from_raw(raw).expect_err("broken selector rejected");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "export.exclude_selectors",
            ..
        }
    ));
}

#[test]
fn rejects_unparsable_page_block_selector() {
    let mut raw = RawSettings::default();
    raw.export.page_block_selector = Some(".report-page[".to_string());

    let err = Settings::from_raw(raw).expect_err("broken selector rejected");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "export.page_block_selector",
            ..
        }
    ));
}

#[test]
fn rejects_zero_canvas_poll_attempts() {
    let mut raw = RawSettings::default();
    raw.browser.canvas_poll_attempts = Some(0);

    assert!(Settings::from_raw(raw).is_err());
}

#[test]
fn margin_and_format_feed_render_options() {
    let mut raw = RawSettings::default();
    raw.export.format = Some("Letter".to_string());
    raw.export.margin = Some("0.5in".to_string());
    raw.export.print_background = Some(false);

    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(settings.export.options.format, PageFormat::Letter);
    assert_eq!(settings.export.options.margin, Margins::uniform("0.5in"));
    assert!(!settings.export.options.print_background);
}

#[test]
fn wider_formats_are_accepted_in_any_case() {
    for (value, format) in [("a5", PageFormat::A5), ("Tabloid", PageFormat::Tabloid)] {
        let mut raw = RawSettings::default();
        raw.export.format = Some(value.to_string());

        let settings = Settings::from_raw(raw).expect("valid settings");
        assert_eq!(settings.export.options.format, format);
    }

    let mut raw = RawSettings::default();
    raw.export.format = Some("B5".to_string());
    assert!(Settings::from_raw(raw).is_err());
}

#[test]
fn rejects_invalid_margin() {
    let mut raw = RawSettings::default();
    raw.export.margin = Some("wide".to_string());

    let err = Settings::from_raw(raw).expect_err("margin rejected");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "export.margin",
            ..
        }
    ));
}

#[test]
fn blank_font_stylesheet_disables_link() {
    let mut raw = RawSettings::default();
    raw.export.font_stylesheet = Some(String::new());

    let settings = Settings::from_raw(raw).expect("valid settings");
    assert!(settings.export.font_stylesheet.is_none());
}

#[test]
fn rejects_content_ids_with_quotes() {
    let mut raw = RawSettings::default();
    raw.export.content_id = Some("report\"x".to_string());

    assert!(Settings::from_raw(raw).is_err());
}

#[test]
fn cli_json_logging_enforces_format() {
    let mut raw = RawSettings::default();
    let overrides = ServeOverrides {
        logging: LoggingOverrides {
            log_json: Some(true),
            ..Default::default()
        },
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert!(matches!(settings.logging.format, LogFormat::Json));
}

#[test]
fn default_to_serve_command() {
    let args = CliArgs::parse_from(["lpi-export"]);
    let command = args
        .command
        .unwrap_or(Command::Serve(Box::<ServeArgs>::default()));
    assert!(matches!(command, Command::Serve(_)));
}

#[test]
fn parse_serve_overrides() {
    let args = CliArgs::parse_from([
        "lpi-export",
        "serve",
        "--server-host",
        "0.0.0.0",
        "--browser-canvas-poll-attempts",
        "3",
        "--browser-sandbox",
        "true",
    ]);

    match args.command.expect("serve command") {
        Command::Serve(serve) => {
            assert_eq!(serve.overrides.server_host.as_deref(), Some("0.0.0.0"));
            assert_eq!(serve.overrides.browser.canvas_poll_attempts, Some(3));
            assert_eq!(serve.overrides.browser.sandbox, Some(true));
        }
        _ => panic!("wrong command parsed"),
    }
}
