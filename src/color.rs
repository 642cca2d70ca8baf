/// An opaque RGB color packed as `0xRRGGBB`.
///
/// Alpha is tracked separately everywhere a color is stored, so the same
/// value can be used for tints, clear colors and vertex colors.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Color(pub u32);

impl Color {
    pub const WHITE: Color = Color(0xffffff);
    pub const BLACK: Color = Color(0x000000);
    pub const RED: Color = Color(0xff0000);
    pub const GREEN: Color = Color(0x00ff00);
    pub const BLUE: Color = Color(0x0000ff);

    pub const fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        Self(((r as u32) << 16) | ((g as u32) << 8) | b as u32)
    }

    pub const fn r(self) -> u8 {
        ((self.0 >> 16) & 0xff) as u8
    }

    pub const fn g(self) -> u8 {
        ((self.0 >> 8) & 0xff) as u8
    }

    pub const fn b(self) -> u8 {
        (self.0 & 0xff) as u8
    }

    /// Channels as floats in `[0, 1]`.
    pub fn to_f32(self) -> [f32; 3] {
        [
            self.r() as f32 / 255.0,
            self.g() as f32 / 255.0,
            self.b() as f32 / 255.0,
        ]
    }
}

impl From<u32> for Color {
    fn from(value: u32) -> Self {
        Self(value & 0xffffff)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channels() {
        let c = Color(0x336699);
        assert_eq!((c.r(), c.g(), c.b()), (0x33, 0x66, 0x99));
        assert_eq!(Color::from_rgb(0x33, 0x66, 0x99), c);
    }

    #[test]
    fn test_from_u32_drops_high_byte() {
        assert_eq!(Color::from(0xff123456), Color(0x123456));
    }
}
