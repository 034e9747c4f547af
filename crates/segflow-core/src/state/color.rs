//! Color lookup tables for segment indices.

use peniko::Color;
use serde::{Deserialize, Serialize};

/// Number of entries in the built-in table.
pub const DEFAULT_LUT_SIZE: usize = 256;

const PALETTE: [[u8; 4]; 8] = [
    [221, 84, 84, 255],
    [77, 228, 121, 255],
    [166, 70, 235, 255],
    [189, 180, 116, 255],
    [109, 182, 196, 255],
    [204, 101, 157, 255],
    [123, 211, 94, 255],
    [93, 87, 218, 255],
];

/// An RGBA tuple, serializable form of a color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const TRANSPARENT: Rgba = Rgba::new(0, 0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }
}

impl From<[u8; 4]> for Rgba {
    fn from([r, g, b, a]: [u8; 4]) -> Self {
        Self::new(r, g, b, a)
    }
}

impl From<Color> for Rgba {
    fn from(color: Color) -> Self {
        let rgba = color.to_rgba8();
        Self::new(rgba.r, rgba.g, rgba.b, rgba.a)
    }
}

impl From<Rgba> for Color {
    fn from(c: Rgba) -> Self {
        Color::from_rgba8(c.r, c.g, c.b, c.a)
    }
}

/// Colors indexed by segment index. Index 0 is the background.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorLut {
    entries: Vec<Rgba>,
}

impl ColorLut {
    pub fn new(entries: Vec<Rgba>) -> Self {
        Self { entries }
    }

    /// The built-in table: transparent background, then a repeating palette.
    pub fn default_lut() -> Self {
        let entries = std::iter::once(Rgba::TRANSPARENT)
            .chain(PALETTE.iter().copied().map(Rgba::from).cycle())
            .take(DEFAULT_LUT_SIZE)
            .collect();
        Self { entries }
    }

    pub fn get(&self, segment_index: u8) -> Option<Rgba> {
        self.entries.get(usize::from(segment_index)).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[Rgba] {
        &self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_lut() {
        let lut = ColorLut::default_lut();
        assert_eq!(lut.len(), DEFAULT_LUT_SIZE);
        assert_eq!(lut.get(0), Some(Rgba::TRANSPARENT));
        assert_eq!(lut.get(1), Some(Rgba::new(221, 84, 84, 255)));
        // Palette wraps after eight entries.
        assert_eq!(lut.get(9), lut.get(1));
        assert_eq!(lut.get(255).map(|c| c.a), Some(255));
    }

    #[test]
    fn test_peniko_conversion() {
        let rgba = Rgba::new(10, 20, 30, 40);
        let color: Color = rgba.into();
        assert_eq!(Rgba::from(color), rgba);
    }

    #[test]
    fn test_short_lut_lookup() {
        let lut = ColorLut::new(vec![Rgba::TRANSPARENT, Rgba::new(1, 2, 3, 255)]);
        assert_eq!(lut.get(1), Some(Rgba::new(1, 2, 3, 255)));
        assert_eq!(lut.get(2), None);
    }
}
