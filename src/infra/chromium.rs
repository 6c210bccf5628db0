//! Headless Chromium implementation of [`PdfEngine`].
//!
//! Every render launches its own browser process so that a crashed or hung
//! page never leaks into the next request. The browser is closed on every
//! exit path, including failures while loading or printing.

use std::{path::PathBuf, time::Duration};

use async_trait::async_trait;
use bytes::Bytes;
use chromiumoxide::{
    Page,
    browser::{Browser, BrowserConfig},
    cdp::browser_protocol::page::PrintToPdfParams,
};
use futures::StreamExt;
use lpi_render_types::{Margins, RenderOptions};
use metrics::counter;
use tracing::{debug, warn};

use crate::{
    application::render::{
        EngineError, PdfEngine, Readiness, ReadinessPolicy, RenderJob, poll_ready,
    },
    config::BrowserSettings,
    domain::length::CssLength,
};

const READY_CHECK: &str = r#"(() => {
  if (document.readyState !== 'complete') return false;
  return Array.from(document.querySelectorAll('canvas')).every((canvas) => {
    if (!canvas.width || !canvas.height) return true;
    let ctx;
    try { ctx = canvas.getContext('2d'); } catch (e) { return true; }
    if (!ctx) return true;
    try {
      const data = ctx.getImageData(0, 0, canvas.width, canvas.height).data;
      for (let i = 3; i < data.length; i += 4) {
        if (data[i] !== 0) return true;
      }
      return false;
    } catch (e) {
      return true;
    }
  });
})()"#;

#[derive(Debug, Clone)]
pub struct ChromiumEngine {
    executable: Option<PathBuf>,
    sandbox: bool,
    navigation_timeout: Duration,
    readiness: ReadinessPolicy,
}

impl ChromiumEngine {
    pub fn new(settings: &BrowserSettings) -> Self {
        Self {
            executable: settings.executable.clone(),
            sandbox: settings.sandbox,
            navigation_timeout: settings.navigation_timeout,
            readiness: ReadinessPolicy::new(
                settings.canvas_poll_attempts,
                settings.canvas_poll_interval,
            ),
        }
    }

    fn browser_config(&self) -> Result<BrowserConfig, EngineError> {
        let mut builder = BrowserConfig::builder()
            .request_timeout(self.navigation_timeout)
            .arg("--disable-dev-shm-usage")
            .arg("--font-render-hinting=none");
        if !self.sandbox {
            builder = builder.no_sandbox();
        }
        if let Some(path) = &self.executable {
            builder = builder.chrome_executable(path);
        }
        builder.build().map_err(EngineError::Launch)
    }

    async fn print(&self, browser: &Browser, job: &RenderJob) -> Result<Bytes, EngineError> {
        let params = print_params(&job.options)?;

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|err| EngineError::Protocol(err.to_string()))?;

        match tokio::time::timeout(self.navigation_timeout, page.set_content(job.html.as_str()))
            .await
        {
            Ok(Ok(_)) => {}
            Ok(Err(err)) => return Err(EngineError::Protocol(err.to_string())),
            Err(_) => {
                return Err(EngineError::NavigationTimeout {
                    seconds: self.navigation_timeout.as_secs(),
                });
            }
        }

        let readiness = poll_ready(self.readiness, || check_ready(&page)).await;
        let label = if readiness.is_ready() { "ready" } else { "exhausted" };
        counter!("lpi_render_canvas_polls_total", "result" => label).increment(1);
        match readiness {
            Readiness::Ready { attempts } => debug!(
                target = "lpi_export::render::chromium",
                attempts,
                "Page ready for printing"
            ),
            Readiness::Exhausted { attempts } => warn!(
                target = "lpi_export::render::chromium",
                attempts,
                "Canvases still blank; printing anyway"
            ),
        }

        let pdf = page
            .pdf(params)
            .await
            .map_err(|err| EngineError::Protocol(err.to_string()))?;
        Ok(Bytes::from(pdf))
    }
}

#[async_trait]
impl PdfEngine for ChromiumEngine {
    async fn render(&self, job: &RenderJob) -> Result<Bytes, EngineError> {
        let config = self.browser_config()?;
        let (mut browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|err| EngineError::Launch(err.to_string()))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let result = self.print(&browser, job).await;

        if let Err(err) = browser.close().await {
            warn!(
                target = "lpi_export::render::chromium",
                error = %err,
                "Failed to close browser cleanly"
            );
        }
        let _ = browser.wait().await;
        let _ = handler_task.await;

        result
    }
}

async fn check_ready(page: &Page) -> Result<bool, EngineError> {
    let evaluation = page
        .evaluate(READY_CHECK)
        .await
        .map_err(|err| EngineError::Protocol(err.to_string()))?;
    evaluation
        .into_value::<bool>()
        .map_err(|err| EngineError::Protocol(err.to_string()))
}

fn print_params(options: &RenderOptions) -> Result<PrintToPdfParams, EngineError> {
    let Margins {
        top,
        right,
        bottom,
        left,
    } = &options.margin;

    Ok(PrintToPdfParams::builder()
        .paper_width(options.format.width_in())
        .paper_height(options.format.height_in())
        .margin_top(margin_inches(top)?)
        .margin_right(margin_inches(right)?)
        .margin_bottom(margin_inches(bottom)?)
        .margin_left(margin_inches(left)?)
        .print_background(options.print_background)
        .prefer_css_page_size(true)
        .build())
}

fn margin_inches(value: &str) -> Result<f64, EngineError> {
    value
        .parse::<CssLength>()
        .map(CssLength::to_inches)
        .map_err(|err| EngineError::Options(format!("margin `{value}`: {err}")))
}

#[cfg(test)]
mod tests {
    use lpi_render_types::PageFormat;

    use super::*;

    #[test]
    fn print_params_follow_options() {
        let options = RenderOptions {
            format: PageFormat::Letter,
            print_background: false,
            margin: Margins {
                top: "1in".to_string(),
                right: "25.4mm".to_string(),
                bottom: "72pt".to_string(),
                left: "96px".to_string(),
            },
        };

        let params = print_params(&options).unwrap();

        assert_eq!(params.paper_width, Some(8.5));
        assert_eq!(params.paper_height, Some(11.0));
        for margin in [
            params.margin_top,
            params.margin_right,
            params.margin_bottom,
            params.margin_left,
        ] {
            assert!((margin.unwrap() - 1.0).abs() < 1e-9);
        }
        assert_eq!(params.print_background, Some(false));
        assert_eq!(params.prefer_css_page_size, Some(true));
    }

    #[test]
    fn ready_check_skips_zero_sized_canvases() {
        assert!(READY_CHECK.contains("if (!canvas.width || !canvas.height) return true;"));
        assert!(!READY_CHECK.contains("!canvas.height) return false"));
    }

    #[test]
    fn invalid_margin_is_an_options_error() {
        let options = RenderOptions {
            margin: Margins::uniform("wide"),
            ..Default::default()
        };
        assert!(matches!(
            print_params(&options),
            Err(EngineError::Options(_))
        ));
    }
}
