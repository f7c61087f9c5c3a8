// SPDX-License-Identifier: MIT OR Apache-2.0
//! RGB color values flowing through graph links.

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use serde::{Deserialize, Serialize};
use std::io::{self, Read, Write};

/// An RGB color with floating point components.
///
/// Components are nominally in `[0, 1]` but are not clamped; procedural
/// graphs routinely produce out-of-range intermediates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rgb {
    /// Red component.
    pub r: f32,
    /// Green component.
    pub g: f32,
    /// Blue component.
    pub b: f32,
}

impl Rgb {
    /// Black.
    pub const BLACK: Self = Self::new(0.0, 0.0, 0.0);
    /// White.
    pub const WHITE: Self = Self::new(1.0, 1.0, 1.0);

    /// Create a color from components.
    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Component-wise sum.
    pub fn add(self, other: Self) -> Self {
        Self::new(self.r + other.r, self.g + other.g, self.b + other.b)
    }

    /// Uniform scale of all components.
    pub fn scale(self, s: f32) -> Self {
        Self::new(self.r * s, self.g * s, self.b * s)
    }

    /// Convert to HSV: hue in degrees `[0, 360)`, saturation and value in `[0, 1]`.
    pub fn to_hsv(self) -> [f32; 3] {
        let max = self.r.max(self.g).max(self.b);
        let min = self.r.min(self.g).min(self.b);
        let delta = max - min;
        let s = if max > 0.0 { delta / max } else { 0.0 };
        [self.hue(max, delta), s, max]
    }

    /// Convert to HLS: hue in degrees `[0, 360)`, lightness and saturation in `[0, 1]`.
    pub fn to_hls(self) -> [f32; 3] {
        let max = self.r.max(self.g).max(self.b);
        let min = self.r.min(self.g).min(self.b);
        let delta = max - min;
        let l = 0.5 * (max + min);
        let s = if delta == 0.0 {
            0.0
        } else if l <= 0.5 {
            delta / (max + min)
        } else {
            delta / (2.0 - max - min)
        };
        [self.hue(max, delta), l, s]
    }

    fn hue(self, max: f32, delta: f32) -> f32 {
        if delta == 0.0 {
            return 0.0;
        }
        let h = if max == self.r {
            (self.g - self.b) / delta
        } else if max == self.g {
            2.0 + (self.b - self.r) / delta
        } else {
            4.0 + (self.r - self.g) / delta
        };
        let h = h * 60.0;
        if h < 0.0 {
            h + 360.0
        } else {
            h
        }
    }

    /// Write the color to a stream as three big-endian `f32` values.
    pub fn write_to(self, out: &mut dyn Write) -> io::Result<()> {
        out.write_f32::<BigEndian>(self.r)?;
        out.write_f32::<BigEndian>(self.g)?;
        out.write_f32::<BigEndian>(self.b)
    }

    /// Read a color previously written with [`Rgb::write_to`].
    pub fn read_from(input: &mut dyn Read) -> io::Result<Self> {
        let r = input.read_f32::<BigEndian>()?;
        let g = input.read_f32::<BigEndian>()?;
        let b = input.read_f32::<BigEndian>()?;
        Ok(Self::new(r, g, b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hsv_of_primaries() {
        assert_eq!(Rgb::new(1.0, 0.0, 0.0).to_hsv(), [0.0, 1.0, 1.0]);
        assert_eq!(Rgb::new(0.0, 1.0, 0.0).to_hsv(), [120.0, 1.0, 1.0]);
        assert_eq!(Rgb::new(0.0, 0.0, 1.0).to_hsv(), [240.0, 1.0, 1.0]);
        assert_eq!(Rgb::WHITE.to_hsv(), [0.0, 0.0, 1.0]);
    }

    #[test]
    fn hls_of_gray_has_no_saturation() {
        let [h, l, s] = Rgb::new(0.5, 0.5, 0.5).to_hls();
        assert_eq!(h, 0.0);
        assert_eq!(l, 0.5);
        assert_eq!(s, 0.0);
    }

    #[test]
    fn stream_round_trip() {
        let color = Rgb::new(0.25, 0.5, 0.75);
        let mut buf = Vec::new();
        color.write_to(&mut buf).unwrap();
        assert_eq!(buf.len(), 12);
        let read = Rgb::read_from(&mut buf.as_slice()).unwrap();
        assert_eq!(read, color);
    }
}
