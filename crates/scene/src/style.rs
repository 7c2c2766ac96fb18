/// Stroke used to draw trajectory lines.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct LineStyle {
    /// Linear RGBA in `0.0..=1.0`.
    pub color: [f32; 4],
    /// Stroke width in pixels.
    pub width: f32,
}

impl LineStyle {
    pub const fn new(color: [f32; 4], width: f32) -> Self {
        Self { color, width }
    }

    /// Build a style from a CSS-like `#rrggbb` or `#rrggbbaa` color.
    pub fn from_hex(color: &str, width: f32) -> Option<Self> {
        Some(Self::new(parse_hex_color(color)?, width))
    }

    pub fn to_hex(&self) -> String {
        let [r, g, b, a] = self.color.map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8);
        if a == 255 {
            format!("#{r:02x}{g:02x}{b:02x}")
        } else {
            format!("#{r:02x}{g:02x}{b:02x}{a:02x}")
        }
    }
}

impl Default for LineStyle {
    fn default() -> Self {
        // #9704b1, 3px.
        Self {
            color: [151.0 / 255.0, 4.0 / 255.0, 177.0 / 255.0, 1.0],
            width: 3.0,
        }
    }
}

pub fn parse_hex_color(s: &str) -> Option<[f32; 4]> {
    let hex = s.strip_prefix('#')?;
    if !hex.is_ascii() || !(hex.len() == 6 || hex.len() == 8) {
        return None;
    }

    let mut out = [1.0f32; 4];
    for (i, chunk) in hex.as_bytes().chunks(2).enumerate() {
        let pair = std::str::from_utf8(chunk).ok()?;
        out[i] = u8::from_str_radix(pair, 16).ok()? as f32 / 255.0;
    }
    Some(out)
}
