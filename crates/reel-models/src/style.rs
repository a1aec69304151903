//! Output geometry options.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ModelError;

/// Target reel canvas width.
pub const PORTRAIT_WIDTH: u32 = 1080;
/// Target reel canvas height.
pub const PORTRAIT_HEIGHT: u32 = 1920;

/// How a source frame is mapped onto the portrait canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ResizeMethod {
    /// Center-crop to 9:16 then scale to exactly 1080x1920
    #[default]
    Crop,
    /// Scale preserving aspect ratio, no padding
    Fit,
}

impl ResizeMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResizeMethod::Crop => "crop",
            ResizeMethod::Fit => "fit",
        }
    }
}

impl fmt::Display for ResizeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ResizeMethod {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "crop" => Ok(ResizeMethod::Crop),
            "fit" => Ok(ResizeMethod::Fit),
            _ => Err(ModelError::UnknownResizeMethod(s.to_string())),
        }
    }
}

/// A target canvas size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AspectRatio {
    pub width: u32,
    pub height: u32,
}

impl AspectRatio {
    /// The 1080x1920 reel canvas.
    pub const PORTRAIT: AspectRatio = AspectRatio {
        width: PORTRAIT_WIDTH,
        height: PORTRAIT_HEIGHT,
    };

    /// Width divided by height.
    pub fn ratio(&self) -> f64 {
        self.width as f64 / self.height as f64
    }
}

impl Default for AspectRatio {
    fn default() -> Self {
        Self::PORTRAIT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resize_method_parse() {
        assert_eq!("crop".parse::<ResizeMethod>().unwrap(), ResizeMethod::Crop);
        assert_eq!(" Fit ".parse::<ResizeMethod>().unwrap(), ResizeMethod::Fit);
        assert!("stretch".parse::<ResizeMethod>().is_err());
        assert_eq!(ResizeMethod::default(), ResizeMethod::Crop);
    }

    #[test]
    fn test_portrait_ratio() {
        assert!((AspectRatio::PORTRAIT.ratio() - 9.0 / 16.0).abs() < 1e-12);
    }
}
