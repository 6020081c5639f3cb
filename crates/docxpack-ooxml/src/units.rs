//! Unit conversions
//!
//! WordprocessingML mixes several measurement units:
//! - EMU (English Metric Unit): 914400 per inch, used by DrawingML extents
//! - twip (twentieth of a point): 1440 per inch, used for page size, indents, spacing
//! - half-point: font sizes in `w:sz`
//! - pixel: 9525 EMU at 96 DPI

/// EMUs per inch (914400)
pub const EMU_PER_INCH: i64 = 914400;

/// EMUs per pixel at 96 DPI (9525)
pub const EMU_PER_PIXEL: i64 = 9525;

/// Twips per inch (1440)
pub const TWIPS_PER_INCH: i64 = 1440;

/// Convert EMUs to pixels at 96 DPI
pub fn emu_to_pixels(emu: i64) -> i64 {
    (emu as f64 / EMU_PER_PIXEL as f64).round() as i64
}

/// Convert pixels to EMUs at 96 DPI
pub fn pixels_to_emu(pixels: i64) -> i64 {
    pixels * EMU_PER_PIXEL
}

/// Convert EMUs to inches
pub fn emu_to_inches(emu: i64) -> f64 {
    emu as f64 / EMU_PER_INCH as f64
}

/// Convert inches to EMUs
pub fn inches_to_emu(inches: f64) -> i64 {
    (inches * EMU_PER_INCH as f64).round() as i64
}

/// Convert inches to twips
pub fn inches_to_twips(inches: f64) -> i64 {
    (inches * TWIPS_PER_INCH as f64).round() as i64
}

/// Convert twips to inches
pub fn twips_to_inches(twips: i64) -> f64 {
    twips as f64 / TWIPS_PER_INCH as f64
}

/// Convert a font size in points to half-points (`w:sz`)
pub fn points_to_half_points(points: f64) -> u32 {
    (points * 2.0).round().max(0.0) as u32
}

/// Convert half-points back to points
pub fn half_points_to_points(half_points: u32) -> f64 {
    half_points as f64 / 2.0
}
