//! Request and response shapes exchanged between the report exporter and the
//! headless PDF render service.

use serde::{Deserialize, Deserializer, Serialize};

pub const GENERATE_PDF_PATH: &str = "/api/generate-pdf";
pub const GENERATE_PDF_ALIAS_PATH: &str = "/generate-pdf";
pub const HEALTH_PATH: &str = "/health";

pub const SERVICE_NAME: &str = "PDF Generator API";
pub const HTML_REQUIRED: &str = "HTML es requerido";
pub const INVALID_JSON: &str = "JSON inválido";
pub const METHOD_NOT_ALLOWED: &str = "Método no permitido";
pub const GENERATION_FAILED: &str = "Error generando PDF";

pub const DEFAULT_FILENAME: &str = "reporte.pdf";
pub const DEFAULT_MARGIN: &str = "10mm";

/// Paper sizes understood by the render service. Names match
/// case-insensitively on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub enum PageFormat {
    Letter,
    Legal,
    Tabloid,
    Ledger,
    A0,
    A1,
    A2,
    A3,
    #[default]
    A4,
    A5,
    A6,
}

impl PageFormat {
    pub const ALL: [Self; 11] = [
        Self::Letter,
        Self::Legal,
        Self::Tabloid,
        Self::Ledger,
        Self::A0,
        Self::A1,
        Self::A2,
        Self::A3,
        Self::A4,
        Self::A5,
        Self::A6,
    ];

    /// Canonical wire name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Letter => "Letter",
            Self::Legal => "Legal",
            Self::Tabloid => "Tabloid",
            Self::Ledger => "Ledger",
            Self::A0 => "A0",
            Self::A1 => "A1",
            Self::A2 => "A2",
            Self::A3 => "A3",
            Self::A4 => "A4",
            Self::A5 => "A5",
            Self::A6 => "A6",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|format| format.name().eq_ignore_ascii_case(name))
    }

    /// Width in inches.
    pub fn width_in(self) -> f64 {
        match self {
            Self::Letter | Self::Legal => 8.5,
            Self::Tabloid => 11.0,
            Self::Ledger => 17.0,
            Self::A0 => 33.1,
            Self::A1 => 23.4,
            Self::A2 => 16.54,
            Self::A3 => 11.69,
            Self::A4 => 8.27,
            Self::A5 => 5.83,
            Self::A6 => 4.13,
        }
    }

    /// Height in inches.
    pub fn height_in(self) -> f64 {
        match self {
            Self::Letter | Self::Ledger => 11.0,
            Self::Legal => 14.0,
            Self::Tabloid => 17.0,
            Self::A0 => 46.8,
            Self::A1 => 33.1,
            Self::A2 => 23.4,
            Self::A3 => 16.54,
            Self::A4 => 11.69,
            Self::A5 => 8.27,
            Self::A6 => 5.83,
        }
    }

    /// Value for the CSS `@page { size: ... }` descriptor. Sizes without a
    /// CSS keyword are spelled out.
    pub fn css_size(self) -> &'static str {
        match self {
            Self::Letter => "letter",
            Self::Legal => "legal",
            Self::Tabloid => "11in 17in",
            Self::Ledger => "17in 11in",
            Self::A0 => "841mm 1189mm",
            Self::A1 => "594mm 841mm",
            Self::A2 => "420mm 594mm",
            Self::A3 => "A3",
            Self::A4 => "A4",
            Self::A5 => "A5",
            Self::A6 => "105mm 148mm",
        }
    }
}

impl TryFrom<String> for PageFormat {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_name(&value).ok_or_else(|| format!("unknown page format `{value}`"))
    }
}

/// Page margins as CSS lengths (`"10mm"`, `"0.5in"`, `"20px"`). Bare numbers
/// on the wire are pixels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Margins {
    #[serde(deserialize_with = "css_length")]
    pub top: String,
    #[serde(deserialize_with = "css_length")]
    pub right: String,
    #[serde(deserialize_with = "css_length")]
    pub bottom: String,
    #[serde(deserialize_with = "css_length")]
    pub left: String,
}

impl Margins {
    pub fn uniform(value: impl Into<String>) -> Self {
        let value = value.into();
        Self {
            top: value.clone(),
            right: value.clone(),
            bottom: value.clone(),
            left: value,
        }
    }
}

impl Default for Margins {
    fn default() -> Self {
        Self::uniform(DEFAULT_MARGIN)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LengthValue {
    Text(String),
    Pixels(f64),
}

fn css_length<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match LengthValue::deserialize(deserializer)? {
        LengthValue::Text(text) => text,
        LengthValue::Pixels(px) => format!("{px}px"),
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RenderOptions {
    pub format: PageFormat,
    pub print_background: bool,
    pub margin: Margins,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            format: PageFormat::default(),
            print_background: true,
            margin: Margins::default(),
        }
    }
}

/// Body posted by the exporter to every render endpoint candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderRequest {
    pub html: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    pub options: RenderOptions,
}

/// Lenient view of the same body as received by the service; every field may
/// be missing so that validation can answer with a domain message instead of
/// a deserialization rejection.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GeneratePdfBody {
    pub html: Option<String>,
    pub filename: Option<String>,
    pub options: Option<RenderOptions>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
}

impl HealthResponse {
    pub fn ok() -> Self {
        Self {
            status: "OK".to_string(),
            service: SERVICE_NAME.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}
