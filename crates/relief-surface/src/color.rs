//! Colour ramps for slope and aspect.

/// One RGBA texel.
pub type Rgba = [u8; 4];

/// Fully transparent, used for no-data texels.
pub const TRANSPARENT: Rgba = [0, 0, 0, 0];

/// Flat cells in aspect mode: no direction, so no hue.
pub const NEUTRAL: Rgba = [128, 128, 128, 255];

/// Grayscale by steepness, black when flat and white at `max_degrees`.
pub fn slope_gray(slope_radians: f64, max_degrees: f64) -> Rgba {
    let t = if max_degrees > 0.0 {
        (slope_radians.to_degrees() / max_degrees).clamp(0.0, 1.0)
    } else {
        1.0
    };
    let v = (t * 255.0).round() as u8;
    [v, v, v, 255]
}

/// HSL to opaque RGBA. `hue` is in degrees and wraps; `s` and `l` are 0..=1.
pub fn hsl(hue: f64, saturation: f64, lightness: f64) -> Rgba {
    let h = hue.rem_euclid(360.0) / 60.0;
    let s = saturation.clamp(0.0, 1.0);
    let l = lightness.clamp(0.0, 1.0);

    let chroma = (1.0 - (2.0 * l - 1.0).abs()) * s;
    let x = chroma * (1.0 - (h % 2.0 - 1.0).abs());
    let (r, g, b) = match h as u32 {
        0 => (chroma, x, 0.0),
        1 => (x, chroma, 0.0),
        2 => (0.0, chroma, x),
        3 => (0.0, x, chroma),
        4 => (x, 0.0, chroma),
        _ => (chroma, 0.0, x),
    };
    let m = l - chroma / 2.0;
    let channel = |c: f64| ((c + m) * 255.0).round().clamp(0.0, 255.0) as u8;
    [channel(r), channel(g), channel(b), 255]
}
