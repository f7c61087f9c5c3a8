// SPDX-License-Identifier: MIT OR Apache-2.0
//! The node contract and the dynamic node-type registry.

use crate::codec::{CodecError, DecodeContext, EncodeContext};
use crate::color::Rgb;
use crate::context::EvaluationContext;
use crate::graph::Graph;
use crate::port::Port;
use glam::DVec3;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::io::{self, Write};

/// Identifies the source feeding an input: an output port of another node
/// in the same graph, addressed by node index and output index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Producer {
    /// Index of the producing node in the graph's node list.
    pub node: usize,
    /// Index of the output port on that node.
    pub output: usize,
}

impl Producer {
    /// Create a producer reference.
    pub fn new(node: usize, output: usize) -> Self {
        Self { node, output }
    }
}

/// Pull-accessor handed to a node while it is being evaluated.
///
/// Resolves the node's producer pointers through the owning graph, so a node
/// asks for "my input 0 at this blur" without knowing what feeds it. An
/// unconnected input yields `None` and the node applies its own default.
pub struct Inputs<'a> {
    graph: &'a Graph,
    sources: &'a [Option<Producer>],
}

impl<'a> Inputs<'a> {
    pub(crate) fn new(graph: &'a Graph, sources: &'a [Option<Producer>]) -> Self {
        Self { graph, sources }
    }

    /// Whether the given input has a producer wired to it.
    pub fn connected(&self, input: usize) -> bool {
        self.sources.get(input).is_some_and(Option::is_some)
    }

    /// Pull the averaged numeric value feeding an input.
    pub fn numeric(&self, input: usize, blur: f64) -> Option<f64> {
        self.source(input)
            .map(|p| self.graph.pull_numeric(p, blur))
    }

    /// Pull the value uncertainty feeding an input.
    pub fn uncertainty(&self, input: usize, blur: f64) -> Option<f64> {
        self.source(input)
            .map(|p| self.graph.pull_uncertainty(p, blur))
    }

    /// Pull the spatial gradient feeding an input.
    pub fn gradient(&self, input: usize, blur: f64) -> Option<DVec3> {
        self.source(input)
            .map(|p| self.graph.pull_gradient(p, blur))
    }

    /// Pull the color feeding an input.
    pub fn color(&self, input: usize, blur: f64) -> Option<Rgb> {
        self.source(input).map(|p| self.graph.pull_color(p, blur))
    }

    fn source(&self, input: usize) -> Option<Producer> {
        self.sources.get(input).copied().flatten()
    }
}

/// A computation unit in a procedural graph.
///
/// Implementations are stateful: they may cache results keyed by
/// `(output index, blur)` between [`init`](ProceduralNode::init) calls.
/// Repeated queries with the same blur in one pass must return identical
/// results. The caches make nodes deliberately not thread-safe; every
/// evaluating thread owns a private graph clone (see
/// [`GraphPool`](crate::pool::GraphPool)).
pub trait ProceduralNode: fmt::Debug + Send {
    /// Stable type tag used by the codec registry.
    fn type_name(&self) -> &'static str;

    /// Input ports, fixed at construction.
    fn input_ports(&self) -> &[Port];

    /// Output ports, fixed at construction.
    fn output_ports(&self) -> &[Port];

    /// Called once before each evaluation pass; resets per-pass caches.
    fn init(&mut self, _ctx: &EvaluationContext) {}

    /// Averaged value of a numeric output. Undefined if the output carries
    /// a color.
    fn numeric_value(&mut self, _which: usize, _blur: f64, _inputs: &Inputs<'_>) -> f64 {
        0.0
    }

    /// Uncertainty of a numeric output at the given blur, used for
    /// antialiasing.
    fn value_uncertainty(&mut self, _which: usize, _blur: f64, _inputs: &Inputs<'_>) -> f64 {
        0.0
    }

    /// Spatial gradient of a numeric output.
    fn value_gradient(&mut self, _which: usize, _blur: f64, _inputs: &Inputs<'_>) -> DVec3 {
        DVec3::ZERO
    }

    /// Color of a color output. Undefined if the output carries a number.
    fn color(&mut self, _which: usize, _blur: f64, _inputs: &Inputs<'_>) -> Rgb {
        Rgb::BLACK
    }

    /// Create an independent copy with the same parameter values.
    ///
    /// Producer pointers are not copied; [`Graph::copy_from`] re-wires them.
    fn duplicate(&self) -> Box<dyn ProceduralNode>;

    /// Write the node's parameters to a stream. Each node type owns its own
    /// payload layout and versions it independently.
    fn write_payload(&self, _out: &mut dyn Write, _ctx: &EncodeContext<'_>) -> io::Result<()> {
        Ok(())
    }

    /// Read the node's parameters from a stream.
    fn read_payload(
        &mut self,
        _input: &mut dyn io::Read,
        _ctx: &DecodeContext<'_>,
    ) -> Result<(), CodecError> {
        Ok(())
    }

    /// Access to the concrete node type.
    fn as_any(&self) -> &dyn Any;

    /// Mutable access to the concrete node type.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Factory function producing a fresh node of one type.
pub type NodeFactory = fn() -> Box<dyn ProceduralNode>;

/// Registry of constructible node types, keyed by stable type tag.
///
/// Replaces reflection-based construction: the codec resolves the type tag
/// stored in a stream through this registry, and plugin node types register
/// themselves here.
pub struct NodeRegistry {
    factories: IndexMap<String, NodeFactory>,
}

impl NodeRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            factories: IndexMap::new(),
        }
    }

    /// Create a registry with all built-in node types registered.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        crate::nodes::register_builtins(&mut registry);
        registry
    }

    /// Register a node type.
    pub fn register(&mut self, type_name: impl Into<String>, factory: NodeFactory) {
        self.factories.insert(type_name.into(), factory);
    }

    /// Construct a fresh node of the given type, or `None` if the type is
    /// not registered.
    pub fn create(&self, type_name: &str) -> Option<Box<dyn ProceduralNode>> {
        self.factories.get(type_name).map(|factory| factory())
    }

    /// Registered type tags, in registration order.
    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }
}

impl Default for NodeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for NodeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeRegistry")
            .field("types", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::NumberNode;

    #[test]
    fn registry_creates_registered_types() {
        let registry = NodeRegistry::with_builtins();
        let node = registry.create("number").unwrap();
        assert_eq!(node.type_name(), "number");
        assert!(node.as_any().downcast_ref::<NumberNode>().is_some());
        assert!(registry.create("no-such-node").is_none());
    }

    #[test]
    fn registry_preserves_registration_order() {
        let registry = NodeRegistry::with_builtins();
        let names: Vec<_> = registry.type_names().collect();
        assert_eq!(names[0], "number");
        assert!(names.contains(&"image"));
    }
}
