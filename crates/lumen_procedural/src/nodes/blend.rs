// SPDX-License-Identifier: MIT OR Apache-2.0
//! Weighted blend of two colors.

use crate::color::Rgb;
use crate::context::EvaluationContext;
use crate::node::{Inputs, ProceduralNode};
use crate::port::{Placement, Port, ValueKind};
use std::any::Any;

/// A node that outputs a weighted average of two colors.
///
/// The fraction input selects between color 1 (fraction 0) and color 2
/// (fraction 1), defaulting to an even mix. When the fraction's
/// uncertainty straddles the `[0, 1]` boundary the effective fraction is
/// smoothed, so antialiased edges between the two colors stay soft.
#[derive(Debug)]
pub struct BlendNode {
    inputs: [Port; 3],
    outputs: [Port; 1],
    color_ok: bool,
    blend_color: Rgb,
    last_blur: f64,
}

impl BlendNode {
    /// Create a blend node.
    pub fn new() -> Self {
        Self {
            inputs: [
                Port::input("Color 1", ValueKind::Color, Placement::Top),
                Port::input("Color 2", ValueKind::Color, Placement::Bottom),
                Port::input("Fraction", ValueKind::Number, Placement::Left),
            ],
            outputs: [Port::output("Blend", ValueKind::Color)],
            color_ok: false,
            blend_color: Rgb::BLACK,
            last_blur: 0.0,
        }
    }
}

impl Default for BlendNode {
    fn default() -> Self {
        Self::new()
    }
}

impl ProceduralNode for BlendNode {
    fn type_name(&self) -> &'static str {
        "blend"
    }

    fn input_ports(&self) -> &[Port] {
        &self.inputs
    }

    fn output_ports(&self) -> &[Port] {
        &self.outputs
    }

    fn init(&mut self, _ctx: &EvaluationContext) {
        self.color_ok = false;
    }

    fn color(&mut self, _which: usize, blur: f64, inputs: &Inputs<'_>) -> Rgb {
        if self.color_ok && blur == self.last_blur {
            return self.blend_color;
        }
        self.color_ok = true;
        self.last_blur = blur;
        let mut fract = inputs.numeric(2, blur).unwrap_or(0.5);
        let error = inputs.uncertainty(2, blur).unwrap_or(0.0);
        let mut min = fract - error;
        let mut max = fract + error;
        if min < 1.0 && max > 0.0 && (min < 0.0 || max > 1.0) {
            // The footprint straddles an edge of the valid range: average
            // the clamped fraction over the footprint.
            fract = 0.0;
            if min < 0.0 {
                min = 0.0;
            }
            if max > 1.0 {
                fract = max - 1.0;
                max = 1.0;
            }
            fract += 0.5 * (max + min) * (max - min);
            fract /= 2.0 * error;
        }
        let color1 = if fract < 1.0 {
            inputs.color(0, blur).unwrap_or(Rgb::BLACK)
        } else {
            Rgb::BLACK
        };
        let color2 = if fract > 0.0 {
            inputs.color(1, blur).unwrap_or(Rgb::WHITE)
        } else {
            Rgb::WHITE
        };
        self.blend_color = if fract <= 0.0 {
            color1
        } else if fract >= 1.0 {
            color2
        } else {
            color1
                .scale(1.0 - fract as f32)
                .add(color2.scale(fract as f32))
        };
        self.blend_color
    }

    fn duplicate(&self) -> Box<dyn ProceduralNode> {
        Box::new(Self::new())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
