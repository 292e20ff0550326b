use eframe::egui::Color32;
use palette::{Hsl, IntoColor, LinSrgb, Mix, Srgb};

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<Color32> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 300.0;
            let hsl = Hsl::new(hue, 0.55, 0.65);
            let rgb: Srgb = hsl.into_color();
            to_color32(rgb)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Diverging map for correlation cells
// ---------------------------------------------------------------------------

const COOL: (f32, f32, f32) = (0.230, 0.299, 0.754);
const NEUTRAL: (f32, f32, f32) = (0.865, 0.865, 0.865);
const WARM: (f32, f32, f32) = (0.706, 0.016, 0.150);

/// Cells that have no defined correlation.
pub const UNDEFINED: Color32 = Color32::from_gray(90);

/// Blue → grey → red for `value` in `[-1, 1]`, blended in linear RGB.
/// NaN maps to [`UNDEFINED`].
pub fn coolwarm(value: f64) -> Color32 {
    if value.is_nan() {
        return UNDEFINED;
    }
    let v = value.clamp(-1.0, 1.0) as f32;
    let lin = |(r, g, b): (f32, f32, f32)| -> LinSrgb { Srgb::new(r, g, b).into_linear() };
    let mixed = if v < 0.0 {
        lin(NEUTRAL).mix(lin(COOL), -v)
    } else {
        lin(NEUTRAL).mix(lin(WARM), v)
    };
    to_color32(Srgb::from_linear(mixed))
}

/// Black or white, whichever reads better on `background`.
pub fn text_on(background: Color32) -> Color32 {
    let [r, g, b, _] = background.to_array();
    let luma = 0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32;
    if luma > 140.0 {
        Color32::BLACK
    } else {
        Color32::WHITE
    }
}

fn to_color32(rgb: Srgb) -> Color32 {
    let rgb: Srgb<u8> = rgb.into_format();
    Color32::from_rgb(rgb.red, rgb.green, rgb.blue)
}
