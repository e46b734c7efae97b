/// Represents a color in normalized RGBA format.
///
/// Each channel is stored as an `f32` in the range `[0.0, 1.0]`, which is the representation
/// uniforms and per-vertex color attributes are uploaded in.
///
/// # Examples
///
/// ```
/// use easel::Color;
///
/// // Create a red color with full opacity
/// let red = Color::rgb(255, 0, 0);
/// assert_eq!(red.to_array(), [1.0, 0.0, 0.0, 1.0]);
///
/// // Create a semi-transparent gray
/// let gray = Color::gray_alpha(128, 0);
/// assert_eq!(gray.alpha(), 0.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Color(pub [f32; 4]);

impl Color {
    /// A transparent color.
    ///
    /// All color channels are set to zero, making the color fully transparent.
    pub const TRANSPARENT: Self = Self([0.0, 0.0, 0.0, 0.0]);
    /// A black color.
    pub const BLACK: Self = Self([0.0, 0.0, 0.0, 1.0]);
    /// A white color.
    pub const WHITE: Self = Self([1.0, 1.0, 1.0, 1.0]);
    /// Marks a recorded vertex color as "not set" so the material color is used instead.
    pub(crate) const UNSET: Self = Self([-1.0, -1.0, -1.0, -1.0]);

    /// Creates a new color with the specified RGB values (0-255) and full opacity.
    ///
    /// # Examples
    ///
    /// ```
    /// use easel::Color;
    ///
    /// let green = Color::rgb(0, 255, 0);
    /// assert_eq!(green, Color([0.0, 1.0, 0.0, 1.0]));
    /// ```
    pub fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::rgba(r, g, b, 255)
    }

    /// Creates a new color with the specified RGBA values (0-255).
    pub fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self([
            r as f32 / 255.0,
            g as f32 / 255.0,
            b as f32 / 255.0,
            a as f32 / 255.0,
        ])
    }

    /// Creates an opaque gray.
    pub fn gray(value: u8) -> Self {
        Self::rgb(value, value, value)
    }

    /// Creates a gray with the given alpha.
    pub fn gray_alpha(value: u8, alpha: u8) -> Self {
        Self::rgba(value, value, value, alpha)
    }

    /// Creates a color from normalized channels.
    pub fn from_f32(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self([r, g, b, a])
    }

    pub fn alpha(&self) -> f32 {
        self.0[3]
    }

    pub fn rgb_array(&self) -> [f32; 3] {
        [self.0[0], self.0[1], self.0[2]]
    }

    /// Returns the color as an array of 4 normalized `f32` values.
    pub fn to_array(&self) -> [f32; 4] {
        self.0
    }

    /// Returns the color quantized to 8 bits per channel.
    ///
    /// # Examples
    ///
    /// ```
    /// use easel::Color;
    ///
    /// assert_eq!(Color::rgba(0, 0, 255, 128).to_rgba8(), [0, 0, 255, 128]);
    /// ```
    pub fn to_rgba8(&self) -> [u8; 4] {
        self.0.map(|channel| (channel.clamp(0.0, 1.0) * 255.0).round() as u8)
    }

    /// Linear interpolation between two colors, channel by channel.
    pub fn lerp(&self, other: &Color, amount: f32) -> Color {
        let mut out = [0.0; 4];
        for (i, channel) in out.iter_mut().enumerate() {
            *channel = self.0[i] * (1.0 - amount) + other.0[i] * amount;
        }
        Color(out)
    }
}

impl From<[f32; 4]> for Color {
    fn from(value: [f32; 4]) -> Self {
        Color(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lerp_endpoints_are_exact() {
        let a = Color::rgba(10, 20, 30, 40);
        let b = Color::rgba(200, 100, 50, 255);
        assert_eq!(a.lerp(&b, 0.0), a);
        assert_eq!(a.lerp(&b, 1.0), b);
    }

    #[test]
    fn quantizes_back_to_bytes() {
        assert_eq!(Color::rgba(12, 34, 56, 78).to_rgba8(), [12, 34, 56, 78]);
    }
}
