#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub fn to_rgba(&self) -> String {
        format!("rgba({}, {}, {}, 1)", self.r, self.g, self.b)
    }
}

// Golden-angle hue rotation keeps neighbouring series visually distinct.
const GOLDEN_ANGLE: f64 = 137.508;

/// `n` chart colors; the same `n` always yields the same palette.
pub fn generate_colors(n: usize) -> Vec<Color> {
    (0..n)
        .map(|i| hsl_to_rgb((i as f64 * GOLDEN_ANGLE + 200.0) % 360.0, 0.65, 0.55))
        .collect()
}

fn hsl_to_rgb(h: f64, s: f64, l: f64) -> Color {
    let c = (1.0 - (2.0 * l - 1.0).abs()) * s;
    let hp = h / 60.0;
    let x = c * (1.0 - (hp % 2.0 - 1.0).abs());
    let (r1, g1, b1) = match hp as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let m = l - c / 2.0;
    let to_u8 = |v: f64| ((v + m) * 255.0).round().clamp(0.0, 255.0) as u8;
    Color {
        r: to_u8(r1),
        g: to_u8(g1),
        b: to_u8(b1),
    }
}
