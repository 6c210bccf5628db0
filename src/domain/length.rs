//! CSS length parsing for page margins.
//!
//! Margins travel over the wire as CSS lengths (`"10mm"`, `"0.5in"`), while the
//! DevTools print call expects inches. Bare numbers are CSS pixels.

use std::{fmt, str::FromStr};

use thiserror::Error;

const MM_PER_INCH: f64 = 25.4;
const PX_PER_INCH: f64 = 96.0;
const PT_PER_INCH: f64 = 72.0;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LengthError {
    #[error("length is empty")]
    Empty,
    #[error("`{input}` is not a number followed by mm, cm, in, px or pt")]
    Malformed { input: String },
    #[error("`{input}` must not be negative")]
    Negative { input: String },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LengthUnit {
    Millimeter,
    Centimeter,
    Inch,
    Pixel,
    Point,
}

impl LengthUnit {
    fn suffix(self) -> &'static str {
        match self {
            Self::Millimeter => "mm",
            Self::Centimeter => "cm",
            Self::Inch => "in",
            Self::Pixel => "px",
            Self::Point => "pt",
        }
    }
}

/// A non-negative CSS absolute length.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CssLength {
    value: f64,
    unit: LengthUnit,
}

impl CssLength {
    pub fn to_inches(self) -> f64 {
        match self.unit {
            LengthUnit::Millimeter => self.value / MM_PER_INCH,
            LengthUnit::Centimeter => self.value * 10.0 / MM_PER_INCH,
            LengthUnit::Inch => self.value,
            LengthUnit::Pixel => self.value / PX_PER_INCH,
            LengthUnit::Point => self.value / PT_PER_INCH,
        }
    }
}

impl FromStr for CssLength {
    type Err = LengthError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(LengthError::Empty);
        }

        let lower = trimmed.to_ascii_lowercase();
        let (number, unit) = [
            LengthUnit::Millimeter,
            LengthUnit::Centimeter,
            LengthUnit::Inch,
            LengthUnit::Pixel,
            LengthUnit::Point,
        ]
        .into_iter()
        .find_map(|unit| {
            lower
                .strip_suffix(unit.suffix())
                .map(|number| (number.trim_end(), unit))
        })
        .unwrap_or((lower.as_str(), LengthUnit::Pixel));

        let value: f64 = number.parse().map_err(|_| LengthError::Malformed {
            input: input.to_string(),
        })?;
        if !value.is_finite() {
            return Err(LengthError::Malformed {
                input: input.to_string(),
            });
        }
        if value < 0.0 {
            return Err(LengthError::Negative {
                input: input.to_string(),
            });
        }

        Ok(Self { value, unit })
    }
}

impl fmt::Display for CssLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.value, self.unit.suffix())
    }
}
