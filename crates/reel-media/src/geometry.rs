//! Portrait geometry planning.
//!
//! Maps a frame of arbitrary size onto the portrait reel canvas. The plan is
//! pure arithmetic; engines apply it through their `crop` and `resize`
//! primitives.

use reel_models::{AspectRatio, ResizeMethod};
use serde::{Deserialize, Serialize};

use crate::error::{MediaError, MediaResult};

/// Rectangular region of a frame, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CropRect {
    /// Whether the rect covers the whole `width x height` frame.
    pub fn is_full_frame(&self, width: u32, height: u32) -> bool {
        self.x == 0 && self.y == 0 && self.width == width && self.height == height
    }
}

/// Steps that bring a frame onto the target canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformPlan {
    /// Region to keep; `None` when the whole frame is kept.
    pub crop: Option<CropRect>,
    /// Final output size `(width, height)`.
    pub scale: (u32, u32),
}

/// Rounds down to the nearest even number, never below 2.
#[inline]
pub fn make_even(value: u32) -> u32 {
    ((value / 2) * 2).max(2)
}

/// Plan the transform of a `width x height` frame onto `target`.
pub fn plan_transform(
    width: u32,
    height: u32,
    method: ResizeMethod,
    target: AspectRatio,
) -> MediaResult<TransformPlan> {
    if width == 0 || height == 0 {
        return Err(MediaError::invalid_dimensions(
            width,
            height,
            "source frame has a zero dimension",
        ));
    }
    if target.width == 0 || target.height == 0 {
        return Err(MediaError::invalid_dimensions(
            target.width,
            target.height,
            "target canvas has a zero dimension",
        ));
    }

    match method {
        ResizeMethod::Crop => plan_crop(width, height, target),
        ResizeMethod::Fit => Ok(plan_fit(width, height, target)),
    }
}

/// Center crop to the target ratio, then scale to exactly the target size.
fn plan_crop(width: u32, height: u32, target: AspectRatio) -> MediaResult<TransformPlan> {
    let target_ratio = target.ratio();
    let (w, h) = (width as f64, height as f64);

    let rect = if w / h > target_ratio {
        // Wider than target: trim the sides
        let new_width = (h * target_ratio) as i64;
        let center = w / 2.0;
        let x1 = (center - new_width as f64 / 2.0) as i64;
        let x2 = (center + new_width as f64 / 2.0) as i64;
        span_rect(width, height, x1, x2, true)?
    } else {
        // Taller than (or equal to) target: trim top and bottom
        let new_height = (w / target_ratio) as i64;
        let center = h / 2.0;
        let y1 = (center - new_height as f64 / 2.0) as i64;
        let y2 = (center + new_height as f64 / 2.0) as i64;
        span_rect(width, height, y1, y2, false)?
    };

    Ok(TransformPlan {
        crop: (!rect.is_full_frame(width, height)).then_some(rect),
        scale: (target.width, target.height),
    })
}

/// Build the crop rect for a `[lo, hi)` span along one axis.
fn span_rect(width: u32, height: u32, lo: i64, hi: i64, horizontal: bool) -> MediaResult<CropRect> {
    let limit = i64::from(if horizontal { width } else { height });
    let lo = lo.clamp(0, limit);
    let hi = hi.clamp(0, limit);

    if hi <= lo {
        return Err(MediaError::invalid_dimensions(
            width,
            height,
            "frame too narrow to crop to portrait",
        ));
    }

    let (start, span) = (lo as u32, (hi - lo) as u32);
    Ok(if horizontal {
        CropRect {
            x: start,
            y: 0,
            width: span,
            height,
        }
    } else {
        CropRect {
            x: 0,
            y: start,
            width,
            height: span,
        }
    })
}

/// Scale preserving aspect ratio: by height when wider than target, else by width.
fn plan_fit(width: u32, height: u32, target: AspectRatio) -> TransformPlan {
    let (w, h) = (width as f64, height as f64);

    let scale = if w / h > target.ratio() {
        let scaled_width = (w * target.height as f64 / h).round() as u32;
        (make_even(scaled_width), target.height)
    } else {
        let scaled_height = (h * target.width as f64 / w).round() as u32;
        (target.width, make_even(scaled_height))
    };

    TransformPlan { crop: None, scale }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PORTRAIT: AspectRatio = AspectRatio::PORTRAIT;

    #[test]
    fn test_landscape_crop_yields_portrait() {
        let plan = plan_transform(1920, 1080, ResizeMethod::Crop, PORTRAIT).unwrap();
        assert_eq!(plan.scale, (1080, 1920));

        let crop = plan.crop.unwrap();
        assert_eq!(crop.height, 1080);
        assert_eq!(crop.y, 0);
        // int(1080 * 9/16) = 607, centred on x = 960
        assert_eq!(crop.width, 607);
        assert_eq!(crop.x, 656);
    }

    #[test]
    fn test_portrait_source_keeps_full_frame() {
        let plan = plan_transform(1080, 1920, ResizeMethod::Crop, PORTRAIT).unwrap();
        assert!(plan.crop.is_none());
        assert_eq!(plan.scale, (1080, 1920));
    }

    #[test]
    fn test_tall_source_crops_height() {
        let plan = plan_transform(1000, 3000, ResizeMethod::Crop, PORTRAIT).unwrap();
        let crop = plan.crop.unwrap();
        assert_eq!(crop.width, 1000);
        assert_eq!(crop.x, 0);
        // int(1000 / 0.5625) = 1777
        assert!((crop.height as i64 - 1777).abs() <= 1);
        assert!(crop.y > 0 && crop.y + crop.height <= 3000);
        assert_eq!(plan.scale, (1080, 1920));
    }

    #[test]
    fn test_fit_landscape_scales_by_height() {
        let plan = plan_transform(1920, 1080, ResizeMethod::Fit, PORTRAIT).unwrap();
        assert!(plan.crop.is_none());
        assert_eq!(plan.scale.1, 1920);
        assert_eq!(plan.scale.0 % 2, 0);
        assert!((plan.scale.0 as i64 - 3413).abs() <= 1);
    }

    #[test]
    fn test_fit_portrait_scales_by_width() {
        let plan = plan_transform(720, 1280, ResizeMethod::Fit, PORTRAIT).unwrap();
        assert_eq!(plan.scale, (1080, 1920));
    }

    #[test]
    fn test_zero_dimensions_rejected() {
        assert!(matches!(
            plan_transform(0, 1080, ResizeMethod::Crop, PORTRAIT),
            Err(MediaError::InvalidDimensions { .. })
        ));
        assert!(matches!(
            plan_transform(1920, 0, ResizeMethod::Fit, PORTRAIT),
            Err(MediaError::InvalidDimensions { .. })
        ));
    }

    #[test]
    fn test_degenerate_strip_rejected() {
        // 1000x1 crops to int(0.5625) = 0 columns
        assert!(plan_transform(1000, 1, ResizeMethod::Crop, PORTRAIT).is_err());
    }

    #[test]
    fn test_make_even() {
        assert_eq!(make_even(3413), 3412);
        assert_eq!(make_even(1080), 1080);
        assert_eq!(make_even(1), 2);
    }
}
