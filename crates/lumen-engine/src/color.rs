/// Straight-alpha RGBA color used to clear the frame target.
///
/// Components are expected in `[0, 1]`. The clear color is written directly to
/// the target (no blending), so premultiplication does not apply here.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const BLACK: Self = Self::rgb(0.0, 0.0, 0.0);

    #[inline]
    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    #[inline]
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// Creates a color from sRGB bytes (`0`–`255`), e.g. from a hex literal.
    #[inline]
    pub fn from_srgb_u8(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self::rgba(
            r as f32 / 255.0,
            g as f32 / 255.0,
            b as f32 / 255.0,
            a as f32 / 255.0,
        )
    }

    /// Clamps all channels to `[0, 1]`. Non-finite channels become 0.
    #[inline]
    pub fn clamped(self) -> Self {
        let c = |v: f32| if v.is_finite() { v.clamp(0.0, 1.0) } else { 0.0 };
        Self::rgba(c(self.r), c(self.g), c(self.b), c(self.a))
    }
}

impl From<Color> for wgpu::Color {
    fn from(c: Color) -> Self {
        let c = c.clamped();
        wgpu::Color {
            r: c.r as f64,
            g: c.g as f64,
            b: c.b as f64,
            a: c.a as f64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_srgb_u8_scales_to_unit_range() {
        let c = Color::from_srgb_u8(255, 0, 51, 255);
        assert_eq!(c, Color::rgba(1.0, 0.0, 0.2, 1.0));
    }

    #[test]
    fn clamped_replaces_nan_and_out_of_range() {
        let c = Color::rgba(f32::NAN, 2.0, -1.0, 0.5).clamped();
        assert_eq!(c, Color::rgba(0.0, 1.0, 0.0, 0.5));
    }

    #[test]
    fn converts_to_wgpu_color() {
        let c: wgpu::Color = Color::rgb(0.25, 0.5, 1.0).into();
        assert_eq!(c.r, 0.25);
        assert_eq!(c.g, 0.5);
        assert_eq!(c.b, 1.0);
        assert_eq!(c.a, 1.0);
    }
}
