// SPDX-License-Identifier: MIT OR Apache-2.0
//! Constant color source.

use crate::codec::{CodecError, DecodeContext, EncodeContext};
use crate::color::Rgb;
use crate::node::{Inputs, ProceduralNode};
use crate::port::{Port, ValueKind};
use std::any::Any;
use std::io::{self, Read, Write};

/// A node that outputs a constant color.
#[derive(Debug)]
pub struct ColorNode {
    color: Rgb,
    outputs: [Port; 1],
}

impl ColorNode {
    /// Create a constant with the given color.
    pub fn new(color: Rgb) -> Self {
        Self {
            color,
            outputs: [Port::output("Color", ValueKind::Color)],
        }
    }

    /// The constant color.
    pub fn color_value(&self) -> Rgb {
        self.color
    }

    /// Change the constant color.
    pub fn set_color(&mut self, color: Rgb) {
        self.color = color;
    }
}

impl Default for ColorNode {
    fn default() -> Self {
        Self::new(Rgb::WHITE)
    }
}

impl ProceduralNode for ColorNode {
    fn type_name(&self) -> &'static str {
        "color"
    }

    fn input_ports(&self) -> &[Port] {
        &[]
    }

    fn output_ports(&self) -> &[Port] {
        &self.outputs
    }

    fn color(&mut self, _which: usize, _blur: f64, _inputs: &Inputs<'_>) -> Rgb {
        self.color
    }

    fn duplicate(&self) -> Box<dyn ProceduralNode> {
        Box::new(Self::new(self.color))
    }

    fn write_payload(&self, out: &mut dyn Write, _ctx: &EncodeContext<'_>) -> io::Result<()> {
        self.color.write_to(out)
    }

    fn read_payload(
        &mut self,
        input: &mut dyn Read,
        _ctx: &DecodeContext<'_>,
    ) -> Result<(), CodecError> {
        self.color = Rgb::read_from(input)?;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
