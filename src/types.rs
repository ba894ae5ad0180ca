#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const BLACK: Color = Color {
        r: 0.0,
        g: 0.0,
        b: 0.0,
    };

    pub const WHITE: Color = Color {
        r: 1.0,
        g: 1.0,
        b: 1.0,
    };

    pub fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    pub fn from_rgb8(r: u8, g: u8, b: u8) -> Self {
        Self {
            r: r as f32 / 255.0,
            g: g as f32 / 255.0,
            b: b as f32 / 255.0,
        }
    }

    pub fn to_rgb8(self) -> [u8; 3] {
        [channel_u8(self.r), channel_u8(self.g), channel_u8(self.b)]
    }

    pub(crate) fn to_skia(self) -> tiny_skia::Color {
        let [r, g, b] = self.to_rgb8();
        tiny_skia::Color::from_rgba8(r, g, b, 255)
    }

    // Composite a straight-alpha color over this (opaque) color.
    pub(crate) fn blend_under(self, r: u8, g: u8, b: u8, a: u8) -> [u8; 3] {
        if a == 255 {
            return [r, g, b];
        }
        let alpha = a as f32 / 255.0;
        let [br, bg, bb] = self.to_rgb8();
        let mix = |top: u8, bottom: u8| {
            (top as f32 * alpha + bottom as f32 * (1.0 - alpha)).round() as u8
        };
        [mix(r, br), mix(g, bg), mix(b, bb)]
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::WHITE
    }
}

fn channel_u8(value: f32) -> u8 {
    if !value.is_finite() {
        return 0;
    }
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}
