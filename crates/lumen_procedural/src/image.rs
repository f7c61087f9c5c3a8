// SPDX-License-Identifier: MIT OR Apache-2.0
//! External image resources referenced by sampling nodes.
//!
//! Images are shared, read-only and externally owned: the graph stores an
//! `Arc` to the resource plus its index in the owning scene's
//! [`ImageStore`], and never mutates pixel data.

use crate::color::Rgb;
use glam::DVec2;
use std::fmt;
use std::sync::Arc;

/// A 2D image that sampling nodes can read.
///
/// Coordinates are normalized to `[0, 1]` on both axes. The `wrap` flags
/// tell the implementation whether a coordinate may be wrapped across the
/// seam when filtering (true for tiled, non-mirrored axes); when a flag is
/// false the implementation clamps at the edge instead. `x_size`/`y_size`
/// give the sample footprint for implementations that filter over an area.
pub trait ImageSource: fmt::Debug + Send + Sync {
    /// Number of components per pixel (1 = gray, 3 = RGB, 4 = RGB + mask).
    fn component_count(&self) -> usize;

    /// Average color over the sample footprint.
    fn color(&self, x: f64, y: f64, x_size: f64, y_size: f64, wrap_x: bool, wrap_y: bool) -> Rgb;

    /// Average value of one component over the sample footprint.
    fn component(
        &self,
        which: usize,
        x: f64,
        y: f64,
        x_size: f64,
        y_size: f64,
        wrap_x: bool,
        wrap_y: bool,
    ) -> f64;

    /// Gradient of one component with respect to the normalized x and y
    /// coordinates.
    fn gradient(
        &self,
        which: usize,
        x: f64,
        y: f64,
        x_size: f64,
        y_size: f64,
        wrap_x: bool,
        wrap_y: bool,
    ) -> DVec2;
}

/// Shared handle to an image resource.
pub type SharedImage = Arc<dyn ImageSource>;

/// The scene's table of image resources, addressed by index.
///
/// The codec persists image references as indices into this table.
#[derive(Debug, Default)]
pub struct ImageStore {
    images: Vec<SharedImage>,
}

impl ImageStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an image and return its index.
    pub fn add(&mut self, image: SharedImage) -> usize {
        self.images.push(image);
        self.images.len() - 1
    }

    /// Look up an image by index.
    pub fn get(&self, index: usize) -> Option<SharedImage> {
        self.images.get(index).cloned()
    }

    /// Find the index of an image by identity.
    pub fn index_of(&self, image: &SharedImage) -> Option<usize> {
        self.images.iter().position(|i| Arc::ptr_eq(i, image))
    }

    /// Number of images in the store.
    pub fn len(&self) -> usize {
        self.images.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

/// A simple in-memory raster image with bilinear filtering.
///
/// Pixel data is interleaved row-major `f32`, `component_count` values per
/// pixel. Filtering is point-sampled (the footprint arguments are ignored);
/// renderer-grade mip-mapped images implement [`ImageSource`] themselves.
#[derive(Debug, Clone)]
pub struct RasterImage {
    width: usize,
    height: usize,
    components: usize,
    data: Vec<f32>,
}

impl RasterImage {
    /// Create an image from interleaved pixel data.
    ///
    /// # Panics
    /// Panics if `data.len() != width * height * components` or any
    /// dimension is zero.
    pub fn new(width: usize, height: usize, components: usize, data: Vec<f32>) -> Self {
        assert!(width > 0 && height > 0 && components > 0);
        assert_eq!(data.len(), width * height * components);
        Self {
            width,
            height,
            components,
            data,
        }
    }

    /// Image width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Image height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    fn texel(&self, col: usize, row: usize, which: usize) -> f64 {
        f64::from(self.data[(row * self.width + col) * self.components + which])
    }

    /// Resolve a normalized coordinate to two texel indices and an
    /// interpolation fraction, wrapping or clamping across the edge.
    fn resolve(coord: f64, extent: usize, wrap: bool) -> (usize, usize, f64) {
        let u = coord * extent as f64 - 0.5;
        let base = u.floor();
        let frac = u - base;
        let lo = base as isize;
        let hi = lo + 1;
        let fix = |i: isize| -> usize {
            if wrap {
                i.rem_euclid(extent as isize) as usize
            } else {
                i.clamp(0, extent as isize - 1) as usize
            }
        };
        (fix(lo), fix(hi), frac)
    }

    fn corners(
        &self,
        which: usize,
        x: f64,
        y: f64,
        wrap_x: bool,
        wrap_y: bool,
    ) -> (f64, f64, f64, f64, f64, f64) {
        let (c0, c1, fx) = Self::resolve(x, self.width, wrap_x);
        let (r0, r1, fy) = Self::resolve(y, self.height, wrap_y);
        let v00 = self.texel(c0, r0, which);
        let v10 = self.texel(c1, r0, which);
        let v01 = self.texel(c0, r1, which);
        let v11 = self.texel(c1, r1, which);
        (v00, v10, v01, v11, fx, fy)
    }

    fn sample(&self, which: usize, x: f64, y: f64, wrap_x: bool, wrap_y: bool) -> f64 {
        let (v00, v10, v01, v11, fx, fy) = self.corners(which, x, y, wrap_x, wrap_y);
        let top = v00 + (v10 - v00) * fx;
        let bottom = v01 + (v11 - v01) * fx;
        top + (bottom - top) * fy
    }
}

impl ImageSource for RasterImage {
    fn component_count(&self) -> usize {
        self.components
    }

    fn color(&self, x: f64, y: f64, _xs: f64, _ys: f64, wrap_x: bool, wrap_y: bool) -> Rgb {
        if self.components == 1 {
            let v = self.sample(0, x, y, wrap_x, wrap_y) as f32;
            return Rgb::new(v, v, v);
        }
        Rgb::new(
            self.sample(0, x, y, wrap_x, wrap_y) as f32,
            self.sample(1, x, y, wrap_x, wrap_y) as f32,
            self.sample(2, x, y, wrap_x, wrap_y) as f32,
        )
    }

    fn component(
        &self,
        which: usize,
        x: f64,
        y: f64,
        _xs: f64,
        _ys: f64,
        wrap_x: bool,
        wrap_y: bool,
    ) -> f64 {
        if which >= self.components {
            return 0.0;
        }
        self.sample(which, x, y, wrap_x, wrap_y)
    }

    fn gradient(
        &self,
        which: usize,
        x: f64,
        y: f64,
        _xs: f64,
        _ys: f64,
        wrap_x: bool,
        wrap_y: bool,
    ) -> DVec2 {
        if which >= self.components {
            return DVec2::ZERO;
        }
        let (v00, v10, v01, v11, fx, fy) = self.corners(which, x, y, wrap_x, wrap_y);
        let dx = ((v10 - v00) * (1.0 - fy) + (v11 - v01) * fy) * self.width as f64;
        let dy = ((v01 - v00) * (1.0 - fx) + (v11 - v10) * fx) * self.height as f64;
        DVec2::new(dx, dy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checker() -> RasterImage {
        // 2x2 single-component checkerboard.
        RasterImage::new(2, 2, 1, vec![0.0, 1.0, 1.0, 0.0])
    }

    #[test]
    fn samples_texel_centers_exactly() {
        let img = checker();
        assert_eq!(img.component(0, 0.25, 0.25, 0.0, 0.0, true, true), 0.0);
        assert_eq!(img.component(0, 0.75, 0.25, 0.0, 0.0, true, true), 1.0);
    }

    #[test]
    fn wrapping_crosses_the_seam() {
        let img = checker();
        // Exactly on the seam between the last and first column: the
        // wrapped sample must blend both rather than clamp.
        let at_seam = img.component(0, 0.0, 0.25, 0.0, 0.0, true, true);
        assert_eq!(at_seam, 0.5);
        let clamped = img.component(0, 0.0, 0.25, 0.0, 0.0, false, true);
        assert_eq!(clamped, 0.0);
    }

    #[test]
    fn store_finds_images_by_identity() {
        let mut store = ImageStore::new();
        let img: SharedImage = Arc::new(checker());
        let index = store.add(img.clone());
        assert_eq!(store.index_of(&img), Some(index));
        assert!(store.get(index).is_some());
        let other: SharedImage = Arc::new(checker());
        assert_eq!(store.index_of(&other), None);
    }
}
