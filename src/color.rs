use std::str::FromStr;

use eframe::egui::Color32;
use palette::{Hsl, IntoColor, Srgb};

use spc_viewer::Status;

// ---------------------------------------------------------------------------
// Status colours
// ---------------------------------------------------------------------------

pub const USED_HEX: &str = "#0085fa";
pub const IGNORE_HEX: &str = "#b4cbe0";

/// Parse a `#rrggbb` string, falling back to grey on malformed input.
pub fn hex_color(hex: &str) -> Color32 {
    match Srgb::<u8>::from_str(hex) {
        Ok(rgb) => Color32::from_rgb(rgb.red, rgb.green, rgb.blue),
        Err(err) => {
            log::warn!("invalid colour '{hex}': {err}");
            Color32::GRAY
        }
    }
}

/// Marker colour for a point of the given status.
pub fn status_color(status: Status) -> Color32 {
    match status {
        Status::Used => hex_color(USED_HEX),
        Status::Ignore => hex_color(IGNORE_HEX),
    }
}

/// Darker shade of `color`, used to ring selected points.
pub fn outline_for(color: Color32) -> Color32 {
    let rgb = Srgb::new(color.r(), color.g(), color.b()).into_format::<f32>();
    let mut hsl: Hsl = rgb.into_color();
    hsl.lightness *= 0.55;
    let rgb: Srgb = hsl.into_color();
    Color32::from_rgb(
        (rgb.red * 255.0) as u8,
        (rgb.green * 255.0) as u8,
        (rgb.blue * 255.0) as u8,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_status_colours() {
        assert_eq!(status_color(Status::Used), Color32::from_rgb(0x00, 0x85, 0xfa));
        assert_eq!(status_color(Status::Ignore), Color32::from_rgb(0xb4, 0xcb, 0xe0));
        assert_eq!(hex_color("not a colour"), Color32::GRAY);
    }

    #[test]
    fn outline_is_darker() {
        let base = status_color(Status::Ignore);
        let dark = outline_for(base);
        let sum = |c: Color32| c.r() as u32 + c.g() as u32 + c.b() as u32;
        assert!(sum(dark) < sum(base));
    }
}
