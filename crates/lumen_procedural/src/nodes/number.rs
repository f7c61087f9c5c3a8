// SPDX-License-Identifier: MIT OR Apache-2.0
//! Constant number source.

use crate::codec::{CodecError, DecodeContext, EncodeContext};
use crate::node::{Inputs, ProceduralNode};
use crate::port::{Port, ValueKind};
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::any::Any;
use std::io::{self, Read, Write};

/// A node that outputs a constant number.
#[derive(Debug)]
pub struct NumberNode {
    value: f64,
    outputs: [Port; 1],
}

impl NumberNode {
    /// Create a constant with the given value.
    pub fn new(value: f64) -> Self {
        Self {
            value,
            outputs: [Port::output("Value", ValueKind::Number)],
        }
    }

    /// The constant value.
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Change the constant value.
    pub fn set_value(&mut self, value: f64) {
        self.value = value;
    }
}

impl Default for NumberNode {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl ProceduralNode for NumberNode {
    fn type_name(&self) -> &'static str {
        "number"
    }

    fn input_ports(&self) -> &[Port] {
        &[]
    }

    fn output_ports(&self) -> &[Port] {
        &self.outputs
    }

    fn numeric_value(&mut self, _which: usize, _blur: f64, _inputs: &Inputs<'_>) -> f64 {
        self.value
    }

    fn duplicate(&self) -> Box<dyn ProceduralNode> {
        Box::new(Self::new(self.value))
    }

    fn write_payload(&self, out: &mut dyn Write, _ctx: &EncodeContext<'_>) -> io::Result<()> {
        out.write_f64::<BigEndian>(self.value)
    }

    fn read_payload(
        &mut self,
        input: &mut dyn Read,
        _ctx: &DecodeContext<'_>,
    ) -> Result<(), CodecError> {
        self.value = input.read_f64::<BigEndian>()?;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
