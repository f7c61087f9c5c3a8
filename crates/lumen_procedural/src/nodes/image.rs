// SPDX-License-Identifier: MIT OR Apache-2.0
//! 2D image sampling.

use crate::codec::{CodecError, DecodeContext, EncodeContext};
use crate::color::Rgb;
use crate::context::EvaluationContext;
use crate::image::SharedImage;
use crate::node::{Inputs, ProceduralNode};
use crate::port::{Placement, Port, ValueKind};
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use glam::{DVec2, DVec3};
use std::any::Any;
use std::io::{self, Read, Write};

/// Color model used for the per-channel numeric outputs of an [`ImageNode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorModel {
    /// Channels are red, green, blue.
    #[default]
    Rgb,
    /// Channels are hue, saturation, value. Hue is scaled to `[0, 1]`.
    Hsv,
    /// Channels are hue, lightness, saturation. Hue is scaled to `[0, 1]`.
    Hls,
}

impl ColorModel {
    fn from_i32(value: i32) -> Option<Self> {
        match value {
            0 => Some(Self::Rgb),
            1 => Some(Self::Hsv),
            2 => Some(Self::Hls),
            _ => None,
        }
    }

    fn as_i32(self) -> i32 {
        match self {
            Self::Rgb => 0,
            Self::Hsv => 1,
            Self::Hls => 2,
        }
    }
}

/// Payload version written by the current release. Streams whose first int
/// is non-negative predate versioning: that int *was* the image index and
/// the color model defaults to RGB.
const PAYLOAD_VERSION: i32 = -2;

/// A node that samples a 2D image resource.
///
/// The X and Y inputs locate the sample point, defaulting to the
/// evaluation context's x/y position; both are divided by the node's scale
/// factors. Each axis can tile and/or mirror; a point outside a non-tiled
/// axis yields black. Wrapping across the seam is only allowed on axes
/// that tile without mirroring (`wrap = tile && !mirror`).
///
/// Output 0 is the composite color; outputs 1 to 3 are the per-channel
/// values in the selected color model and output 4 is the mask channel.
/// All results are cached per `(blur)` until the next evaluation pass.
#[derive(Debug)]
pub struct ImageNode {
    map: Option<SharedImage>,
    x_scale: f64,
    y_scale: f64,
    x_inv: f64,
    y_inv: f64,
    tile_x: bool,
    tile_y: bool,
    mirror_x: bool,
    mirror_y: bool,
    color_model: ColorModel,
    max_component: usize,
    inputs: [Port; 2],
    outputs: [Port; 5],
    ctx: EvaluationContext,
    // Per-pass caches, invalidated by init() and by a blur change.
    point_ok: bool,
    color_ok: bool,
    value_ok: [bool; 4],
    grad_ok: [bool; 4],
    outside: bool,
    x: f64,
    y: f64,
    x_size: f64,
    y_size: f64,
    wrap_x: bool,
    wrap_y: bool,
    last_blur: f64,
    color: Rgb,
    component_value: [f64; 4],
    gradient: [DVec3; 4],
}

impl ImageNode {
    /// Create an image node with no image, unit scale and tiling on both
    /// axes.
    pub fn new() -> Self {
        Self {
            map: None,
            x_scale: 1.0,
            y_scale: 1.0,
            x_inv: 1.0,
            y_inv: 1.0,
            tile_x: true,
            tile_y: true,
            mirror_x: false,
            mirror_y: false,
            color_model: ColorModel::Rgb,
            max_component: 0,
            inputs: [
                Port::input("X", ValueKind::Number, Placement::Left),
                Port::input("Y", ValueKind::Number, Placement::Left),
            ],
            outputs: [
                Port::output("Color", ValueKind::Color),
                Port::output("Red", ValueKind::Number),
                Port::output("Green", ValueKind::Number),
                Port::output("Blue", ValueKind::Number),
                Port::output("Mask", ValueKind::Number),
            ],
            ctx: EvaluationContext::default(),
            point_ok: false,
            color_ok: false,
            value_ok: [false; 4],
            grad_ok: [false; 4],
            outside: false,
            x: 0.0,
            y: 0.0,
            x_size: 0.0,
            y_size: 0.0,
            wrap_x: false,
            wrap_y: false,
            last_blur: 0.0,
            color: Rgb::BLACK,
            component_value: [0.0; 4],
            gradient: [DVec3::ZERO; 4],
        }
    }

    /// The sampled image, if one is set.
    pub fn map(&self) -> Option<&SharedImage> {
        self.map.as_ref()
    }

    /// Set or clear the sampled image.
    pub fn set_map(&mut self, map: Option<SharedImage>) {
        self.map = map;
        self.update_max_component();
    }

    /// X scale factor applied to the sample coordinate.
    pub fn x_scale(&self) -> f64 {
        self.x_scale
    }

    /// Set the X scale factor.
    pub fn set_x_scale(&mut self, scale: f64) {
        self.x_scale = scale;
        self.x_inv = 1.0 / scale;
    }

    /// Y scale factor applied to the sample coordinate.
    pub fn y_scale(&self) -> f64 {
        self.y_scale
    }

    /// Set the Y scale factor.
    pub fn set_y_scale(&mut self, scale: f64) {
        self.y_scale = scale;
        self.y_inv = 1.0 / scale;
    }

    /// Set whether the image tiles along each axis.
    pub fn set_tiled(&mut self, x: bool, y: bool) {
        self.tile_x = x;
        self.tile_y = y;
    }

    /// Set whether alternate tiles are mirrored along each axis.
    pub fn set_mirrored(&mut self, x: bool, y: bool) {
        self.mirror_x = x;
        self.mirror_y = y;
    }

    /// The color model of the per-channel outputs.
    pub fn color_model(&self) -> ColorModel {
        self.color_model
    }

    /// Select the color model of the per-channel outputs.
    pub fn set_color_model(&mut self, model: ColorModel) {
        self.color_model = model;
        self.update_max_component();
    }

    fn update_max_component(&mut self) {
        self.max_component = match &self.map {
            None => 0,
            Some(map) if self.color_model == ColorModel::Rgb => map.component_count() - 1,
            Some(map) if map.component_count() > 3 => 3,
            Some(_) => 2,
        };
    }

    /// Resolve the sample point from the X/Y inputs for the given blur.
    fn find_point(&mut self, blur: f64, inputs: &Inputs<'_>) {
        self.point_ok = true;
        self.color_ok = false;
        self.value_ok = [false; 4];
        self.grad_ok = [false; 4];
        self.last_blur = blur;
        self.x = inputs.numeric(0, blur).unwrap_or(self.ctx.position.x) * self.x_inv;
        self.y = inputs.numeric(1, blur).unwrap_or(self.ctx.position.y) * self.y_inv;
        self.outside = (!self.tile_x && !(0.0..=1.0).contains(&self.x))
            || (!self.tile_y && !(0.0..=1.0).contains(&self.y));
        if self.outside {
            return;
        }
        // Even tiles are reflected, odd tiles keep their orientation.
        if self.mirror_x {
            let f = self.x.floor();
            if (f as i64) & 1 == 0 {
                self.x = 1.0 + f - self.x;
            } else {
                self.x -= f;
            }
        } else {
            self.x -= self.x.floor();
        }
        if self.mirror_y {
            let f = self.y.floor();
            if (f as i64) & 1 == 0 {
                self.y = 1.0 + f - self.y;
            } else {
                self.y -= f;
            }
        } else {
            self.y -= self.y.floor();
        }
        self.x_size = inputs
            .uncertainty(0, blur)
            .unwrap_or(0.5 * self.ctx.size.x + blur)
            * self.x_inv;
        self.y_size = inputs
            .uncertainty(1, blur)
            .unwrap_or(0.5 * self.ctx.size.y + blur)
            * self.y_inv;
        self.wrap_x = self.tile_x && !self.mirror_x;
        self.wrap_y = self.tile_y && !self.mirror_y;
    }

    /// Map an output index to a component index, folding out-of-range
    /// channels down to the first one. Returns `None` for a mask output on
    /// an image without a mask, which is always 0.
    fn component_for(&self, which: usize) -> Option<usize> {
        let component = which.saturating_sub(1);
        if component > self.max_component {
            if component == 3 {
                return None;
            }
            return Some(0);
        }
        Some(component)
    }

    fn model_components(&self, color: Rgb) -> [f64; 3] {
        match self.color_model {
            ColorModel::Rgb => [f64::from(color.r), f64::from(color.g), f64::from(color.b)],
            ColorModel::Hsv => {
                let [h, s, v] = color.to_hsv();
                [f64::from(h) / 360.0, f64::from(s), f64::from(v)]
            }
            ColorModel::Hls => {
                let [h, l, s] = color.to_hls();
                [f64::from(h) / 360.0, f64::from(l), f64::from(s)]
            }
        }
    }

    /// Chain rule: combine the image-space gradient with the gradients of
    /// whatever feeds the X/Y inputs.
    fn apply_chain_rule(
        &mut self,
        component: usize,
        image_grad: DVec2,
        blur: f64,
        inputs: &Inputs<'_>,
    ) -> DVec3 {
        let dx = image_grad.x * self.x_inv;
        let dy = image_grad.y * self.y_inv;
        let mut grad = DVec3::ZERO;
        if dx != 0.0 {
            grad = match inputs.gradient(0, blur) {
                Some(g) => g * dx,
                None => DVec3::new(dx, 0.0, 0.0),
            };
        }
        if dy != 0.0 {
            match inputs.gradient(1, blur) {
                Some(g) => grad += g * dy,
                None => grad.y += dy,
            }
        }
        self.gradient[component] = grad;
        self.grad_ok[component] = true;
        grad
    }
}

impl Default for ImageNode {
    fn default() -> Self {
        Self::new()
    }
}

impl ProceduralNode for ImageNode {
    fn type_name(&self) -> &'static str {
        "image"
    }

    fn input_ports(&self) -> &[Port] {
        &self.inputs
    }

    fn output_ports(&self) -> &[Port] {
        &self.outputs
    }

    fn init(&mut self, ctx: &EvaluationContext) {
        self.ctx = ctx.clone();
        self.point_ok = false;
        self.color_ok = false;
        self.value_ok = [false; 4];
        self.grad_ok = [false; 4];
    }

    fn color(&mut self, _which: usize, blur: f64, inputs: &Inputs<'_>) -> Rgb {
        if self.color_ok && blur == self.last_blur {
            return self.color;
        }
        let Some(map) = self.map.clone() else {
            self.color = Rgb::BLACK;
            return self.color;
        };
        if !self.point_ok || blur != self.last_blur {
            self.find_point(blur, inputs);
        }
        self.color_ok = true;
        if self.outside {
            self.color = Rgb::BLACK;
            return self.color;
        }
        self.color = map.color(
            self.x,
            self.y,
            self.x_size,
            self.y_size,
            self.wrap_x,
            self.wrap_y,
        );
        self.color
    }

    fn numeric_value(&mut self, which: usize, blur: f64, inputs: &Inputs<'_>) -> f64 {
        let Some(component) = self.component_for(which) else {
            return 0.0;
        };
        if self.value_ok[component] && blur == self.last_blur {
            return self.component_value[component];
        }
        let Some(map) = self.map.clone() else {
            return 0.0;
        };
        if !self.point_ok || blur != self.last_blur {
            self.find_point(blur, inputs);
        }
        if self.outside {
            return 0.0;
        }
        if self.color_model == ColorModel::Rgb || component == 3 {
            self.value_ok[component] = true;
            self.component_value[component] = map.component(
                component,
                self.x,
                self.y,
                self.x_size,
                self.y_size,
                self.wrap_x,
                self.wrap_y,
            );
        } else {
            // Hue-based models need the whole color; fill all three
            // channels at once.
            self.color = map.color(
                self.x,
                self.y,
                self.x_size,
                self.y_size,
                self.wrap_x,
                self.wrap_y,
            );
            self.color_ok = true;
            self.value_ok[0] = true;
            self.value_ok[1] = true;
            self.value_ok[2] = true;
            let comps = self.model_components(self.color);
            self.component_value[..3].copy_from_slice(&comps);
        }
        self.component_value[component]
    }

    fn value_gradient(&mut self, which: usize, blur: f64, inputs: &Inputs<'_>) -> DVec3 {
        let Some(component) = self.component_for(which) else {
            return DVec3::ZERO;
        };
        if self.grad_ok[component] && blur == self.last_blur {
            return self.gradient[component];
        }
        let Some(map) = self.map.clone() else {
            return DVec3::ZERO;
        };
        if !self.point_ok || blur != self.last_blur {
            self.find_point(blur, inputs);
        }
        if self.outside {
            return DVec3::ZERO;
        }
        let image_grad = if self.color_model == ColorModel::Rgb || component == 3 {
            map.gradient(
                component,
                self.x,
                self.y,
                self.x_size,
                self.y_size,
                self.wrap_x,
                self.wrap_y,
            )
        } else {
            // No analytic gradient in hue space: forward-difference the
            // converted components over the sample footprint.
            let value = self.numeric_value(which, blur, inputs);
            let mut grad = DVec2::ZERO;
            if self.x < 1.0 {
                let dx = self.x_size.min(1.0 - self.x);
                if dx > 0.0 {
                    let shifted = map.color(
                        self.x + dx,
                        self.y,
                        self.x_size,
                        self.y_size,
                        self.wrap_x,
                        self.wrap_y,
                    );
                    grad.x = (self.model_components(shifted)[component] - value) / dx;
                }
            }
            if self.y < 1.0 {
                let dy = self.y_size.min(1.0 - self.y);
                if dy > 0.0 {
                    let shifted = map.color(
                        self.x,
                        self.y + dy,
                        self.x_size,
                        self.y_size,
                        self.wrap_x,
                        self.wrap_y,
                    );
                    grad.y = (self.model_components(shifted)[component] - value) / dy;
                }
            }
            grad
        };
        self.apply_chain_rule(component, image_grad, blur, inputs)
    }

    fn duplicate(&self) -> Box<dyn ProceduralNode> {
        let mut copy = Self::new();
        copy.map = self.map.clone();
        copy.x_scale = self.x_scale;
        copy.y_scale = self.y_scale;
        copy.x_inv = self.x_inv;
        copy.y_inv = self.y_inv;
        copy.tile_x = self.tile_x;
        copy.tile_y = self.tile_y;
        copy.mirror_x = self.mirror_x;
        copy.mirror_y = self.mirror_y;
        copy.color_model = self.color_model;
        copy.max_component = self.max_component;
        Box::new(copy)
    }

    fn write_payload(&self, out: &mut dyn Write, ctx: &EncodeContext<'_>) -> io::Result<()> {
        out.write_i32::<BigEndian>(PAYLOAD_VERSION)?;
        let index = self
            .map
            .as_ref()
            .and_then(|map| ctx.images.index_of(map))
            .map_or(-1, |i| i as i32);
        out.write_i32::<BigEndian>(index)?;
        out.write_f64::<BigEndian>(self.x_scale)?;
        out.write_f64::<BigEndian>(self.y_scale)?;
        out.write_u8(u8::from(self.tile_x))?;
        out.write_u8(u8::from(self.tile_y))?;
        out.write_u8(u8::from(self.mirror_x))?;
        out.write_u8(u8::from(self.mirror_y))?;
        out.write_i32::<BigEndian>(self.color_model.as_i32())
    }

    fn read_payload(
        &mut self,
        input: &mut dyn Read,
        ctx: &DecodeContext<'_>,
    ) -> Result<(), CodecError> {
        let version = input.read_i32::<BigEndian>()?;
        if version < PAYLOAD_VERSION {
            return Err(CodecError::UnsupportedPayloadVersion {
                type_name: "image",
                version,
            });
        }
        let index = if version > PAYLOAD_VERSION {
            version
        } else {
            input.read_i32::<BigEndian>()?
        };
        self.map = if index < 0 {
            None
        } else {
            Some(
                ctx.images
                    .get(index as usize)
                    .ok_or(CodecError::ImageOutOfRange(index))?,
            )
        };
        self.set_x_scale(input.read_f64::<BigEndian>()?);
        self.set_y_scale(input.read_f64::<BigEndian>()?);
        self.tile_x = input.read_u8()? != 0;
        self.tile_y = input.read_u8()? != 0;
        self.mirror_x = input.read_u8()? != 0;
        self.mirror_y = input.read_u8()? != 0;
        self.color_model = if version == PAYLOAD_VERSION {
            let model = input.read_i32::<BigEndian>()?;
            ColorModel::from_i32(model).ok_or(CodecError::MalformedPayload("image"))?
        } else {
            ColorModel::Rgb
        };
        self.update_max_component();
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Graph;
    use crate::image::{ImageSource, RasterImage};
    use crate::link::Link;
    use crate::node::Producer;
    use crate::sink::Sink;
    use glam::DVec3;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn ramp() -> SharedImage {
        // 4x1 horizontal ramp, distinct values per texel.
        Arc::new(RasterImage::new(4, 1, 1, vec![0.1, 0.3, 0.7, 0.9]))
    }

    fn sampling_graph(node: ImageNode) -> Graph {
        let mut graph = Graph::new(vec![
            Sink::color("Color", Rgb::BLACK),
            Sink::number("Value", 0.0),
        ]);
        let n = graph.add_node(Box::new(node));
        graph
            .add_link(Link::to_sink(Producer::new(n, 0), 0))
            .unwrap();
        graph
            .add_link(Link::to_sink(Producer::new(n, 1), 1))
            .unwrap();
        graph
    }

    fn value_at(graph: &mut Graph, x: f64) -> f64 {
        graph.init_for_point(&EvaluationContext::new(DVec3::new(x, 0.25, 0.0)));
        graph.output_value(1)
    }

    #[test]
    fn tiling_wraps_the_sample_coordinate() {
        // With tiling and scale 2.0, x = 2.5 and x = 0.5 land on the same
        // tile position.
        let mut node = ImageNode::new();
        node.set_map(Some(ramp()));
        node.set_x_scale(2.0);
        let mut graph = sampling_graph(node);
        let wrapped = value_at(&mut graph, 2.5);
        let direct = value_at(&mut graph, 0.5);
        assert_eq!(wrapped, direct);
    }

    #[test]
    fn untiled_axis_is_black_outside() {
        let mut node = ImageNode::new();
        node.set_map(Some(ramp()));
        node.set_tiled(false, false);
        let mut graph = sampling_graph(node);
        assert_eq!(value_at(&mut graph, 1.5), 0.0);
        assert!(value_at(&mut graph, 0.5) > 0.0);
    }

    #[test]
    fn mirroring_reflects_even_tiles() {
        let mut node = ImageNode::new();
        node.set_map(Some(ramp()));
        node.set_mirrored(true, false);
        let mut mirrored = sampling_graph(node);
        let mut plain = sampling_graph({
            let mut node = ImageNode::new();
            node.set_map(Some(ramp()));
            node
        });
        // The base tile is reflected: x = 0.25 samples the ramp at 0.75,
        // landing on the upper end of the ramp.
        assert!((value_at(&mut mirrored, 0.25) - 0.8).abs() < 1e-6);
        assert_eq!(value_at(&mut mirrored, 0.25), value_at(&mut plain, 0.75));
        // The next tile keeps its orientation.
        assert_eq!(value_at(&mut mirrored, 1.25), value_at(&mut plain, 0.25));
        // So the seam between tiles is continuous.
        assert_eq!(value_at(&mut mirrored, 0.95), value_at(&mut mirrored, 1.05));
    }

    #[test]
    fn hsv_channels_derive_from_the_composite_color() {
        let red: SharedImage = Arc::new(RasterImage::new(
            1,
            1,
            3,
            vec![1.0, 0.0, 0.0],
        ));
        let mut node = ImageNode::new();
        node.set_map(Some(red));
        node.set_color_model(ColorModel::Hsv);
        let mut graph = Graph::new(vec![
            Sink::number("Hue", 0.0),
            Sink::number("Saturation", 0.0),
            Sink::number("Value", 0.0),
        ]);
        let n = graph.add_node(Box::new(node));
        for (sink, output) in [(0, 1), (1, 2), (2, 3)] {
            graph
                .add_link(Link::to_sink(Producer::new(n, output), sink))
                .unwrap();
        }
        graph.init_for_point(&EvaluationContext::new(DVec3::new(0.5, 0.5, 0.0)));
        assert_eq!(graph.output_value(0), 0.0);
        assert_eq!(graph.output_value(1), 1.0);
        assert_eq!(graph.output_value(2), 1.0);
    }

    /// Counts how many times it is actually sampled, to observe caching.
    #[derive(Debug)]
    struct CountingImage {
        inner: RasterImage,
        reads: AtomicUsize,
    }

    impl CountingImage {
        fn new() -> Self {
            Self {
                inner: RasterImage::new(2, 2, 1, vec![0.0, 1.0, 1.0, 0.0]),
                reads: AtomicUsize::new(0),
            }
        }
    }

    impl ImageSource for CountingImage {
        fn component_count(&self) -> usize {
            self.inner.component_count()
        }

        fn color(&self, x: f64, y: f64, xs: f64, ys: f64, wx: bool, wy: bool) -> Rgb {
            self.reads.fetch_add(1, Ordering::Relaxed);
            self.inner.color(x, y, xs, ys, wx, wy)
        }

        fn component(&self, w: usize, x: f64, y: f64, xs: f64, ys: f64, wx: bool, wy: bool) -> f64 {
            self.reads.fetch_add(1, Ordering::Relaxed);
            self.inner.component(w, x, y, xs, ys, wx, wy)
        }

        fn gradient(
            &self,
            w: usize,
            x: f64,
            y: f64,
            xs: f64,
            ys: f64,
            wx: bool,
            wy: bool,
        ) -> glam::DVec2 {
            self.inner.gradient(w, x, y, xs, ys, wx, wy)
        }
    }

    #[test]
    fn repeated_pulls_with_the_same_blur_hit_the_cache() {
        let counting = Arc::new(CountingImage::new());
        let mut node = ImageNode::new();
        node.set_map(Some(counting.clone() as SharedImage));
        let mut graph = sampling_graph(node);

        graph.init_for_point(&EvaluationContext::new(DVec3::new(0.25, 0.25, 0.0)));
        let first = graph.sink_value(1, 0.1);
        let reads_after_first = counting.reads.load(Ordering::Relaxed);
        let second = graph.sink_value(1, 0.1);
        assert_eq!(first, second);
        assert_eq!(counting.reads.load(Ordering::Relaxed), reads_after_first);

        // A different blur invalidates, a new init invalidates again.
        let _ = graph.sink_value(1, 0.2);
        assert!(counting.reads.load(Ordering::Relaxed) > reads_after_first);
    }

    #[test]
    fn gradient_follows_the_ramp() {
        let mut node = ImageNode::new();
        node.set_map(Some(ramp()));
        let mut graph = sampling_graph(node);
        graph.init_for_point(&EvaluationContext::new(DVec3::new(0.4, 0.25, 0.0)));
        let grad = graph.sink_gradient(1, 0.0);
        // The ramp increases along x; nothing feeds Y or Z.
        assert!(grad.x > 0.0);
        assert_eq!(grad.y, 0.0);
        assert_eq!(grad.z, 0.0);
    }
}
