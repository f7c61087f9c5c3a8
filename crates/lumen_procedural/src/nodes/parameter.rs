// SPDX-License-Identifier: MIT OR Apache-2.0
//! Per-vertex texture parameter source.

use crate::codec::{self, CodecError, DecodeContext, EncodeContext};
use crate::context::EvaluationContext;
use crate::node::{Inputs, ProceduralNode};
use crate::port::{Port, ValueKind};
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::any::Any;
use std::io::{self, Read, Write};
use uuid::Uuid;

/// Descriptor of a per-vertex parameter declared by a [`ParameterNode`],
/// handed to the mesh/texture layer so it can build the parameter-value
/// array for each evaluation point.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureParameter {
    /// Stable identity of the parameter; survives node duplication so that
    /// per-vertex data stays attached across graph copies.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Smallest allowed value.
    pub min: f64,
    /// Largest allowed value.
    pub max: f64,
    /// Value used where no per-vertex data exists.
    pub default: f64,
}

/// A node that outputs an externally supplied per-vertex parameter value,
/// read from [`EvaluationContext::params`] at the position assigned by
/// [`Graph::texture_parameters`](crate::graph::Graph::texture_parameters).
#[derive(Debug)]
pub struct ParameterNode {
    name: String,
    min: f64,
    max: f64,
    default: f64,
    id: Uuid,
    index: usize,
    ctx: EvaluationContext,
    outputs: [Port; 1],
}

impl ParameterNode {
    /// Create a parameter with range `[0, 1]` and default 0.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            min: 0.0,
            max: 1.0,
            default: 0.0,
            id: Uuid::new_v4(),
            index: 0,
            ctx: EvaluationContext::default(),
            outputs: [Port::output("Value", ValueKind::Number)],
        }
    }

    /// Display name of the parameter.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Set the allowed range and default.
    pub fn set_range(&mut self, min: f64, max: f64, default: f64) {
        self.min = min;
        self.max = max;
        self.default = default;
    }

    /// Default value used where no per-vertex data exists.
    pub fn default_value(&self) -> f64 {
        self.default
    }

    /// Stable identity of the parameter.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Position of this parameter in the evaluation context's value array.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Assign the position in the parameter-value array.
    pub fn set_index(&mut self, index: usize) {
        self.index = index;
    }

    /// Descriptor for the texture layer.
    pub fn parameter(&self) -> TextureParameter {
        TextureParameter {
            id: self.id,
            name: self.name.clone(),
            min: self.min,
            max: self.max,
            default: self.default,
        }
    }
}

impl Default for ParameterNode {
    fn default() -> Self {
        Self::new("Parameter")
    }
}

impl ProceduralNode for ParameterNode {
    fn type_name(&self) -> &'static str {
        "parameter"
    }

    fn input_ports(&self) -> &[Port] {
        &[]
    }

    fn output_ports(&self) -> &[Port] {
        &self.outputs
    }

    fn init(&mut self, ctx: &EvaluationContext) {
        // Keep the context so the parameter array is reachable later in
        // the pass.
        self.ctx = ctx.clone();
    }

    fn numeric_value(&mut self, _which: usize, _blur: f64, _inputs: &Inputs<'_>) -> f64 {
        self.ctx
            .params
            .get(self.index)
            .copied()
            .unwrap_or(self.default)
    }

    fn duplicate(&self) -> Box<dyn ProceduralNode> {
        let mut copy = Self::new(self.name.clone());
        copy.min = self.min;
        copy.max = self.max;
        copy.default = self.default;
        copy.id = self.id;
        copy.index = self.index;
        Box::new(copy)
    }

    fn write_payload(&self, out: &mut dyn Write, _ctx: &EncodeContext<'_>) -> io::Result<()> {
        codec::write_string(out, &self.name)?;
        out.write_f64::<BigEndian>(self.min)?;
        out.write_f64::<BigEndian>(self.max)?;
        out.write_f64::<BigEndian>(self.default)
    }

    fn read_payload(
        &mut self,
        input: &mut dyn Read,
        _ctx: &DecodeContext<'_>,
    ) -> Result<(), CodecError> {
        self.name = codec::read_string(input)?;
        self.min = input.read_f64::<BigEndian>()?;
        self.max = input.read_f64::<BigEndian>()?;
        self.default = input.read_f64::<BigEndian>()?;
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
    use crate::link::Link;
    use crate::node::Producer;
    use crate::sink::Sink;

    #[test]
    fn reads_the_assigned_parameter_slot() {
        let mut graph = Graph::new(vec![Sink::number("Out", 0.0)]);
        let mut node = ParameterNode::new("Weight");
        node.set_range(0.0, 2.0, 0.75);
        let n = graph.add_node(Box::new(node));
        graph
            .add_link(Link::to_sink(Producer::new(n, 0), 0))
            .unwrap();

        let params = graph.texture_parameters();
        assert_eq!(params.len(), 1);
        assert_eq!(params[0].name, "Weight");

        let ctx = EvaluationContext::default().with_params(vec![0.4]);
        graph.init_for_point(&ctx);
        assert_eq!(graph.output_value(0), 0.4);

        // No parameter data: fall back to the default.
        graph.init_for_point(&EvaluationContext::default());
        assert_eq!(graph.output_value(0), 0.75);
    }

    #[test]
    fn duplication_preserves_the_stable_id() {
        let node = ParameterNode::new("Weight");
        let copy = node.duplicate();
        let copy = copy.as_any().downcast_ref::<ParameterNode>().unwrap();
        assert_eq!(copy.id(), node.id());
    }
}
