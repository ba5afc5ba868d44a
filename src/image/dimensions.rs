//! Target-size calculation for uploaded images.
//!
//! Pure functions, no I/O. Two mutually exclusive strategies:
//! - **narrow side**: bound the shorter edge, leave the long edge free;
//! - **bounding box**: fit inside `max_width` × `max_height`, with the box
//!   turned to match the image's own orientation.
//!
//! Both only ever shrink. Scaled sides are truncated, never rounded.

use crate::config::image::ImageConfig;

use super::processor::Dimensions;

/// Computes the size an image should be resized to.
///
/// A positive `max_narrow_side` always wins; `max_width`/`max_height` are
/// then ignored entirely.
///
/// # Examples
/// ```
/// use img_reformat_proxy::config::image::ImageConfig;
/// use img_reformat_proxy::image::dimensions::calculate;
/// use img_reformat_proxy::image::processor::Dimensions;
///
/// let cfg = ImageConfig::default(); // 1920x1080 box
/// assert_eq!(calculate(Dimensions::new(3000, 2000), &cfg), Dimensions::new(1620, 1080));
/// assert_eq!(calculate(Dimensions::new(2000, 3000), &cfg), Dimensions::new(1080, 1620));
///
/// let narrow = ImageConfig { max_narrow_side: 400, ..cfg };
/// assert_eq!(calculate(Dimensions::new(1600, 800), &narrow), Dimensions::new(800, 400));
/// ```
pub fn calculate(original: Dimensions, settings: &ImageConfig) -> Dimensions {
    if settings.max_narrow_side > 0 {
        narrow_side_fit(original, settings.max_narrow_side)
    } else {
        bounding_box_fit(original, settings.max_width, settings.max_height)
    }
}

/// Scales so the shorter side equals `max_narrow_side`.
pub fn narrow_side_fit(original: Dimensions, max_narrow_side: u32) -> Dimensions {
    let narrow = original.narrow_side();
    if narrow <= max_narrow_side {
        return original;
    }

    let scale = f64::from(max_narrow_side) / f64::from(narrow);
    scale_by(original, scale)
}

/// Fits inside the box, with the larger limit applied to the image's long
/// edge.
///
/// Squares count as landscape.
pub fn bounding_box_fit(original: Dimensions, max_width: u32, max_height: u32) -> Dimensions {
    let long_limit = max_width.max(max_height);
    let short_limit = max_width.min(max_height);

    let (box_w, box_h) = if original.is_landscape() {
        (long_limit, short_limit)
    } else {
        (short_limit, long_limit)
    };

    if original.width <= box_w && original.height <= box_h {
        return original;
    }

    let scale_w = f64::from(box_w) / f64::from(original.width);
    let scale_h = f64::from(box_h) / f64::from(original.height);
    scale_by(original, scale_w.min(scale_h))
}

/// Multiplies both sides by `scale` (< 1), truncating. Sides never reach 0.
fn scale_by(original: Dimensions, scale: f64) -> Dimensions {
    let side = |v: u32| ((f64::from(v) * scale) as u32).max(1);
    Dimensions::new(side(original.width), side(original.height))
}
