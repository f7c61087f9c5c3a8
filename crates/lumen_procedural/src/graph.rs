// SPDX-License-Identifier: MIT OR Apache-2.0
//! The procedural graph: node/link/sink ownership, structural mutation,
//! cycle safety and evaluation entry points.

use crate::color::Rgb;
use crate::context::EvaluationContext;
use crate::image::SharedImage;
use crate::link::{Link, LinkEnd};
use crate::node::{Inputs, ProceduralNode, Producer};
use crate::nodes::{ImageNode, ParameterNode, TextureParameter};
use crate::sink::Sink;
use glam::DVec3;
use std::cell::{Ref, RefCell, RefMut};
use std::collections::HashSet;

/// A node plus the graph-side state attached to it: its screen position
/// (an opaque presentation attribute carried through serialization) and one
/// producer pointer per input port.
#[derive(Debug)]
pub(crate) struct NodeSlot {
    pub(crate) node: Box<dyn ProceduralNode>,
    pub(crate) position: (i32, i32),
    pub(crate) sources: Vec<Option<Producer>>,
}

impl NodeSlot {
    pub(crate) fn new(node: Box<dyn ProceduralNode>, position: (i32, i32)) -> Self {
        let inputs = node.input_ports().len();
        Self {
            node,
            position,
            sources: vec![None; inputs],
        }
    }
}

/// A procedure for calculating a set of values (typically the parameters
/// for a texture or material).
///
/// The graph owns an insertion-ordered node list, a sink list fixed at
/// construction, and the links wiring them together. It is acyclic after
/// every successful mutation.
///
/// Structural mutation is single-threaded by contract. Evaluation mutates
/// per-pass node caches, so a graph must never be evaluated by two threads
/// at once; concurrent renderers give each thread a private clone through
/// [`GraphPool`](crate::pool::GraphPool).
#[derive(Debug)]
pub struct Graph {
    nodes: Vec<RefCell<NodeSlot>>,
    sinks: Vec<Sink>,
    links: Vec<Link>,
}

impl Graph {
    /// Create an empty graph with the given output channels.
    pub fn new(sinks: Vec<Sink>) -> Self {
        Self {
            nodes: Vec::new(),
            sinks,
            links: Vec::new(),
        }
    }

    /// Create a graph with the standard texture channel set, in the order
    /// expected by the material system: Diffuse, Specular, Transparent,
    /// Emissive, Transparency, Specularity, Shininess, Roughness,
    /// Cloudiness, Bump Height, Displacement.
    pub fn texture_graph() -> Self {
        Self::new(vec![
            Sink::color("Diffuse", Rgb::WHITE),
            Sink::color("Specular", Rgb::WHITE),
            Sink::color("Transparent", Rgb::WHITE),
            Sink::color("Emissive", Rgb::BLACK),
            Sink::number("Transparency", 0.0),
            Sink::number("Specularity", 0.0),
            Sink::number("Shininess", 0.0),
            Sink::number("Roughness", 0.0),
            Sink::number("Cloudiness", 0.0),
            Sink::number("Bump Height", 0.0),
            Sink::number("Displacement", 0.0),
        ])
    }

    // --- nodes ---------------------------------------------------------

    /// Add a node at position (0, 0) and return its index.
    pub fn add_node(&mut self, node: Box<dyn ProceduralNode>) -> usize {
        self.add_node_at(node, (0, 0))
    }

    /// Add a node at the given editor position and return its index.
    pub fn add_node_at(&mut self, node: Box<dyn ProceduralNode>, position: (i32, i32)) -> usize {
        self.nodes.push(RefCell::new(NodeSlot::new(node, position)));
        self.nodes.len() - 1
    }

    /// Remove a node and return it.
    ///
    /// All links into and out of the node must have been deleted first;
    /// this is a documented precondition, not checked at runtime beyond a
    /// debug assertion. Indices of later nodes shift down by one; links and
    /// producer pointers held by the graph are re-indexed accordingly.
    pub fn delete_node(&mut self, index: usize) -> Option<Box<dyn ProceduralNode>> {
        if index >= self.nodes.len() {
            return None;
        }
        debug_assert!(
            !self.links.iter().any(|l| l.involves_node(index)),
            "links must be deleted before the node they touch"
        );
        let slot = self.nodes.remove(index).into_inner();
        let fix = |p: &mut Producer| {
            if p.node > index {
                p.node -= 1;
            }
        };
        for cell in &self.nodes {
            for source in cell.borrow_mut().sources.iter_mut().flatten() {
                fix(source);
            }
        }
        for sink in &mut self.sinks {
            if let Some(source) = sink.source.as_mut() {
                fix(source);
            }
        }
        for link in &mut self.links {
            fix(&mut link.from);
            if let LinkEnd::Node { node, .. } = &mut link.to {
                if *node > index {
                    *node -= 1;
                }
            }
        }
        Some(slot.node)
    }

    /// Number of nodes in the graph.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Borrow a node by index.
    ///
    /// # Panics
    /// Panics if the node is currently borrowed mutably (i.e. called from
    /// inside its own evaluation).
    pub fn node(&self, index: usize) -> Option<Ref<'_, dyn ProceduralNode>> {
        self.nodes
            .get(index)
            .map(|cell| Ref::map(cell.borrow(), |slot| slot.node.as_ref()))
    }

    /// Mutably borrow a node by index.
    pub fn node_mut(&self, index: usize) -> Option<RefMut<'_, dyn ProceduralNode + 'static>> {
        // A named projection keeps the trait object at 'static; a closure
        // would default it to the borrow's lifetime, which RefMut's
        // invariance rejects.
        fn project(slot: &mut NodeSlot) -> &mut (dyn ProceduralNode + 'static) {
            slot.node.as_mut()
        }
        self.nodes
            .get(index)
            .map(|cell| RefMut::map(cell.borrow_mut(), project))
    }

    /// Editor position of a node.
    pub fn node_position(&self, index: usize) -> Option<(i32, i32)> {
        self.nodes.get(index).map(|cell| cell.borrow().position)
    }

    /// Move a node to a new editor position.
    pub fn set_node_position(&mut self, index: usize, position: (i32, i32)) {
        if let Some(cell) = self.nodes.get(index) {
            cell.borrow_mut().position = position;
        }
    }

    /// The producer feeding a node's input, if connected.
    pub fn input_source(&self, node: usize, input: usize) -> Option<Producer> {
        self.nodes
            .get(node)
            .and_then(|cell| cell.borrow().sources.get(input).copied().flatten())
    }

    // --- links ---------------------------------------------------------

    /// All links, in insertion order.
    pub fn links(&self) -> &[Link] {
        &self.links
    }

    /// Number of links.
    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    /// Add a link, wiring the consumer's producer pointer.
    ///
    /// Fails without any observable mutation if an endpoint is out of
    /// range, the port kinds differ, the target input is already fed, or
    /// the link would close a feedback loop.
    pub fn add_link(&mut self, link: Link) -> Result<(), LinkError> {
        let from_kind = {
            let cell = self
                .nodes
                .get(link.from.node)
                .ok_or(LinkError::NodeOutOfRange(link.from.node))?;
            let slot = cell.borrow();
            slot.node
                .output_ports()
                .get(link.from.output)
                .ok_or(LinkError::PortOutOfRange(link.from.output))?
                .kind
        };
        match link.to {
            LinkEnd::Node { node, input } => {
                let cell = self.nodes.get(node).ok_or(LinkError::NodeOutOfRange(node))?;
                let slot = cell.borrow();
                let port = slot
                    .node
                    .input_ports()
                    .get(input)
                    .ok_or(LinkError::PortOutOfRange(input))?;
                if port.kind != from_kind {
                    return Err(LinkError::KindMismatch);
                }
                if slot.sources[input].is_some() {
                    return Err(LinkError::InputAlreadyConnected);
                }
            }
            LinkEnd::Sink { sink } => {
                let sink = self.sinks.get(sink).ok_or(LinkError::SinkOutOfRange(sink))?;
                if sink.kind() != from_kind {
                    return Err(LinkError::KindMismatch);
                }
                if sink.source.is_some() {
                    return Err(LinkError::InputAlreadyConnected);
                }
            }
        }
        self.set_source(link.to, Some(link.from));
        self.links.push(link);
        if self.check_feedback() {
            self.links.pop();
            self.set_source(link.to, None);
            tracing::trace!(?link, "rejected link that would close a feedback loop");
            return Err(LinkError::WouldCycle);
        }
        Ok(())
    }

    /// Remove a link by index, clearing the consumer's producer pointer.
    pub fn delete_link(&mut self, index: usize) -> Option<Link> {
        if index >= self.links.len() {
            return None;
        }
        let link = self.links.remove(index);
        self.set_source(link.to, None);
        Some(link)
    }

    fn set_source(&mut self, end: LinkEnd, source: Option<Producer>) {
        match end {
            LinkEnd::Node { node, input } => {
                self.nodes[node].borrow_mut().sources[input] = source;
            }
            LinkEnd::Sink { sink } => self.sinks[sink].source = source,
        }
    }

    // --- cycle detection -----------------------------------------------

    /// Check for feedback loops.
    ///
    /// Depth-first walk backward along producer pointers, rooted at every
    /// sink and then at every node not yet reached, with transient visited
    /// sets (never flags stored on nodes, so checks on independent clones
    /// cannot race).
    pub fn check_feedback(&self) -> bool {
        let mut in_progress = HashSet::new();
        let mut done = HashSet::new();
        for sink in &self.sinks {
            if let Some(source) = sink.source {
                if self.visit(source.node, &mut in_progress, &mut done) {
                    return true;
                }
            }
        }
        for index in 0..self.nodes.len() {
            if !done.contains(&index) && self.visit(index, &mut in_progress, &mut done) {
                return true;
            }
        }
        false
    }

    fn visit(&self, index: usize, in_progress: &mut HashSet<usize>, done: &mut HashSet<usize>) -> bool {
        if in_progress.contains(&index) {
            return true;
        }
        if done.contains(&index) {
            return false;
        }
        in_progress.insert(index);
        let sources: Vec<Producer> = self.nodes[index]
            .borrow()
            .sources
            .iter()
            .copied()
            .flatten()
            .collect();
        for source in sources {
            if self.visit(source.node, in_progress, done) {
                return true;
            }
        }
        in_progress.remove(&index);
        done.insert(index);
        false
    }

    // --- evaluation ----------------------------------------------------

    /// Prepare every node for evaluating a new point. Invalidates all
    /// per-pass caches; must be called before pulling sink values.
    pub fn init_for_point(&mut self, ctx: &EvaluationContext) {
        for cell in &self.nodes {
            cell.borrow_mut().node.init(ctx);
        }
    }

    /// Value of a numeric output channel at blur 0. Undefined if the
    /// channel carries a color.
    ///
    /// # Panics
    /// Panics if `which` is out of range.
    pub fn output_value(&self, which: usize) -> f64 {
        self.sink_value(which, 0.0)
    }

    /// Gradient of a numeric output channel at blur 0.
    ///
    /// # Panics
    /// Panics if `which` is out of range.
    pub fn output_gradient(&self, which: usize) -> DVec3 {
        self.sink_gradient(which, 0.0)
    }

    /// Color of a color output channel at blur 0. Undefined if the channel
    /// carries a number.
    ///
    /// # Panics
    /// Panics if `which` is out of range.
    pub fn output_color(&self, which: usize) -> Rgb {
        self.sink_color(which, 0.0)
    }

    /// Value of a numeric output channel at the given blur.
    pub fn sink_value(&self, which: usize, blur: f64) -> f64 {
        let sink = &self.sinks[which];
        match sink.source {
            Some(source) => self.pull_numeric(source, blur),
            None => sink.default_value(),
        }
    }

    /// Gradient of a numeric output channel at the given blur. Unconnected
    /// channels have a zero gradient.
    pub fn sink_gradient(&self, which: usize, blur: f64) -> DVec3 {
        match self.sinks[which].source {
            Some(source) => self.pull_gradient(source, blur),
            None => DVec3::ZERO,
        }
    }

    /// Color of a color output channel at the given blur.
    pub fn sink_color(&self, which: usize, blur: f64) -> Rgb {
        let sink = &self.sinks[which];
        match sink.source {
            Some(source) => self.pull_color(source, blur),
            None => sink.default_color(),
        }
    }

    pub(crate) fn pull_numeric(&self, producer: Producer, blur: f64) -> f64 {
        let mut slot = self.nodes[producer.node].borrow_mut();
        let NodeSlot { node, sources, .. } = &mut *slot;
        node.numeric_value(producer.output, blur, &Inputs::new(self, sources))
    }

    pub(crate) fn pull_uncertainty(&self, producer: Producer, blur: f64) -> f64 {
        let mut slot = self.nodes[producer.node].borrow_mut();
        let NodeSlot { node, sources, .. } = &mut *slot;
        node.value_uncertainty(producer.output, blur, &Inputs::new(self, sources))
    }

    pub(crate) fn pull_gradient(&self, producer: Producer, blur: f64) -> DVec3 {
        let mut slot = self.nodes[producer.node].borrow_mut();
        let NodeSlot { node, sources, .. } = &mut *slot;
        node.value_gradient(producer.output, blur, &Inputs::new(self, sources))
    }

    pub(crate) fn pull_color(&self, producer: Producer, blur: f64) -> Rgb {
        let mut slot = self.nodes[producer.node].borrow_mut();
        let NodeSlot { node, sources, .. } = &mut *slot;
        node.color(producer.output, blur, &Inputs::new(self, sources))
    }

    // --- sinks ---------------------------------------------------------

    /// The graph's output channels.
    pub fn sinks(&self) -> &[Sink] {
        &self.sinks
    }

    /// One output channel by index.
    pub fn sink(&self, which: usize) -> Option<&Sink> {
        self.sinks.get(which)
    }

    /// Number of output channels.
    pub fn sink_count(&self) -> usize {
        self.sinks.len()
    }

    // --- copying -------------------------------------------------------

    /// Make this graph identical to another one.
    ///
    /// Every node is deep-duplicated and every link rebuilt through the
    /// node-index correspondence. The sink sets of the two graphs must be
    /// structurally identical (same channel count, order and kinds); sinks
    /// are only re-wired, never rebuilt.
    pub fn copy_from(&mut self, source: &Graph) {
        debug_assert_eq!(self.sinks.len(), source.sinks.len());
        self.nodes.clear();
        for cell in &source.nodes {
            let slot = cell.borrow();
            let mut copy = NodeSlot::new(slot.node.duplicate(), slot.position);
            copy.sources = vec![None; slot.sources.len()];
            self.nodes.push(RefCell::new(copy));
        }
        for sink in &mut self.sinks {
            sink.source = None;
        }
        self.links.clear();
        for link in &source.links {
            self.links.push(*link);
            self.set_source(link.to, Some(link.from));
        }
    }

    /// Create an independent deep copy of this graph, sinks included.
    pub fn duplicate(&self) -> Graph {
        let mut copy = Graph::new(self.sinks.clone());
        copy.copy_from(self);
        copy
    }

    // --- texture integration -------------------------------------------

    /// Collect the per-vertex texture parameters declared by the graph's
    /// [`ParameterNode`]s, in node order, and assign each node its position
    /// in the parameter-value array handed to
    /// [`EvaluationContext::params`](crate::context::EvaluationContext).
    pub fn texture_parameters(&mut self) -> Vec<TextureParameter> {
        let mut params = Vec::new();
        for cell in &self.nodes {
            let mut slot = cell.borrow_mut();
            if let Some(node) = slot.node.as_any_mut().downcast_mut::<ParameterNode>() {
                node.set_index(params.len());
                params.push(node.parameter());
            }
        }
        params
    }

    /// Whether any sampling node in the graph references the given image.
    pub fn uses_image(&self, image: &SharedImage) -> bool {
        self.nodes.iter().any(|cell| {
            cell.borrow()
                .node
                .as_any()
                .downcast_ref::<ImageNode>()
                .and_then(ImageNode::map)
                .is_some_and(|map| std::sync::Arc::ptr_eq(map, image))
        })
    }

    pub(crate) fn slot(&self, index: usize) -> Option<&RefCell<NodeSlot>> {
        self.nodes.get(index)
    }

    pub(crate) fn replace_contents(&mut self, nodes: Vec<RefCell<NodeSlot>>, links: Vec<Link>) {
        self.nodes = nodes;
        for sink in &mut self.sinks {
            sink.source = None;
        }
        self.links.clear();
        for link in links {
            self.links.push(link);
            self.set_source(link.to, Some(link.from));
        }
    }
}

/// Error when a structural mutation is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum LinkError {
    /// A link endpoint references a node index outside the graph.
    #[error("node index {0} out of range")]
    NodeOutOfRange(usize),

    /// A link endpoint references a port index outside its node.
    #[error("port index {0} out of range")]
    PortOutOfRange(usize),

    /// A link endpoint references a sink index outside the graph.
    #[error("sink index {0} out of range")]
    SinkOutOfRange(usize),

    /// The producing and consuming ports carry different value kinds.
    #[error("port value kinds do not match")]
    KindMismatch,

    /// The target input is already fed by another link.
    #[error("input is already connected")]
    InputAlreadyConnected,

    /// Committing the link would close a feedback loop.
    #[error("link would create a feedback loop")]
    WouldCycle,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::{BlendNode, ColorNode, NumberNode, ProductNode};
    use proptest::prelude::*;

    fn number_graph() -> Graph {
        Graph::new(vec![
            Sink::number("Intensity", 1.5),
            Sink::color("Color", Rgb::WHITE),
        ])
    }

    #[test]
    fn constant_flows_to_sink() {
        // Constant 5 wired to a numeric sink.
        let mut graph = number_graph();
        let n = graph.add_node(Box::new(NumberNode::new(5.0)));
        graph
            .add_link(Link::to_sink(Producer::new(n, 0), 0))
            .unwrap();
        graph.init_for_point(&EvaluationContext::default());
        assert_eq!(graph.output_value(0), 5.0);
    }

    #[test]
    fn unconnected_sink_returns_defaults() {
        let mut graph = number_graph();
        graph.init_for_point(&EvaluationContext::default());
        assert_eq!(graph.output_value(0), 1.5);
        assert_eq!(graph.output_color(1), Rgb::WHITE);
        assert_eq!(graph.output_gradient(0), DVec3::ZERO);
    }

    #[test]
    fn cyclic_link_is_rejected_and_rolled_back() {
        // A feeds B; wiring B back into A must fail.
        let mut graph = number_graph();
        let a = graph.add_node(Box::new(ProductNode::new()));
        let b = graph.add_node(Box::new(ProductNode::new()));
        graph
            .add_link(Link::to_node(Producer::new(a, 0), b, 0))
            .unwrap();
        let before_sources = graph.input_source(b, 0);
        let err = graph
            .add_link(Link::to_node(Producer::new(b, 0), a, 0))
            .unwrap_err();
        assert_eq!(err, LinkError::WouldCycle);
        assert_eq!(graph.link_count(), 1);
        assert_eq!(graph.input_source(a, 0), None);
        assert_eq!(graph.input_source(b, 0), before_sources);
        assert!(!graph.check_feedback());
    }

    #[test]
    fn self_loop_is_rejected() {
        let mut graph = number_graph();
        let a = graph.add_node(Box::new(ProductNode::new()));
        let err = graph
            .add_link(Link::to_node(Producer::new(a, 0), a, 1))
            .unwrap_err();
        assert_eq!(err, LinkError::WouldCycle);
        assert_eq!(graph.link_count(), 0);
    }

    #[test]
    fn kind_mismatch_is_rejected() {
        let mut graph = number_graph();
        let c = graph.add_node(Box::new(ColorNode::new(Rgb::WHITE)));
        let err = graph
            .add_link(Link::to_sink(Producer::new(c, 0), 0))
            .unwrap_err();
        assert_eq!(err, LinkError::KindMismatch);
    }

    #[test]
    fn second_link_into_an_input_is_rejected() {
        let mut graph = number_graph();
        let a = graph.add_node(Box::new(NumberNode::new(1.0)));
        let b = graph.add_node(Box::new(NumberNode::new(2.0)));
        graph
            .add_link(Link::to_sink(Producer::new(a, 0), 0))
            .unwrap();
        let err = graph
            .add_link(Link::to_sink(Producer::new(b, 0), 0))
            .unwrap_err();
        assert_eq!(err, LinkError::InputAlreadyConnected);
        assert_eq!(graph.link_count(), 1);
    }

    #[test]
    fn delete_link_clears_the_producer_pointer() {
        let mut graph = number_graph();
        let n = graph.add_node(Box::new(NumberNode::new(5.0)));
        graph
            .add_link(Link::to_sink(Producer::new(n, 0), 0))
            .unwrap();
        assert!(graph.sink(0).unwrap().connected());
        graph.delete_link(0).unwrap();
        assert!(!graph.sink(0).unwrap().connected());
        graph.init_for_point(&EvaluationContext::default());
        assert_eq!(graph.output_value(0), 1.5);
    }

    #[test]
    fn delete_node_reindexes_surviving_links() {
        let mut graph = number_graph();
        let a = graph.add_node(Box::new(NumberNode::new(1.0)));
        let b = graph.add_node(Box::new(NumberNode::new(7.0)));
        graph
            .add_link(Link::to_sink(Producer::new(b, 0), 0))
            .unwrap();
        graph.delete_node(a).unwrap();
        assert_eq!(graph.node_count(), 1);
        assert_eq!(graph.links()[0].from.node, 0);
        graph.init_for_point(&EvaluationContext::default());
        assert_eq!(graph.output_value(0), 7.0);
    }

    #[test]
    fn product_pulls_both_inputs() {
        let mut graph = number_graph();
        let x = graph.add_node(Box::new(NumberNode::new(3.0)));
        let y = graph.add_node(Box::new(NumberNode::new(4.0)));
        let p = graph.add_node(Box::new(ProductNode::new()));
        graph
            .add_link(Link::to_node(Producer::new(x, 0), p, 0))
            .unwrap();
        graph
            .add_link(Link::to_node(Producer::new(y, 0), p, 1))
            .unwrap();
        graph
            .add_link(Link::to_sink(Producer::new(p, 0), 0))
            .unwrap();
        graph.init_for_point(&EvaluationContext::default());
        assert_eq!(graph.output_value(0), 12.0);
    }

    #[test]
    fn blend_mixes_colors_by_fraction() {
        let mut graph = number_graph();
        let black = graph.add_node(Box::new(ColorNode::new(Rgb::BLACK)));
        let white = graph.add_node(Box::new(ColorNode::new(Rgb::WHITE)));
        let fract = graph.add_node(Box::new(NumberNode::new(0.25)));
        let blend = graph.add_node(Box::new(BlendNode::new()));
        graph
            .add_link(Link::to_node(Producer::new(black, 0), blend, 0))
            .unwrap();
        graph
            .add_link(Link::to_node(Producer::new(white, 0), blend, 1))
            .unwrap();
        graph
            .add_link(Link::to_node(Producer::new(fract, 0), blend, 2))
            .unwrap();
        graph
            .add_link(Link::to_sink(Producer::new(blend, 0), 1))
            .unwrap();
        graph.init_for_point(&EvaluationContext::default());
        assert_eq!(graph.output_color(1), Rgb::new(0.25, 0.25, 0.25));
    }

    #[test]
    fn copies_are_independent() {
        let mut graph = number_graph();
        let n = graph.add_node(Box::new(NumberNode::new(5.0)));
        graph
            .add_link(Link::to_sink(Producer::new(n, 0), 0))
            .unwrap();

        let mut copy = graph.duplicate();
        assert_eq!(copy.node_count(), 1);
        assert_eq!(copy.link_count(), 1);
        copy.node_mut(0)
            .unwrap()
            .as_any_mut()
            .downcast_mut::<NumberNode>()
            .unwrap()
            .set_value(9.0);
        copy.set_node_position(0, (40, 8));

        graph.init_for_point(&EvaluationContext::default());
        copy.init_for_point(&EvaluationContext::default());
        assert_eq!(graph.output_value(0), 5.0);
        assert_eq!(copy.output_value(0), 9.0);
        assert_eq!(graph.node_position(0), Some((0, 0)));
    }

    #[test]
    fn node_mut_edits_the_concrete_node_in_place() {
        let mut graph = number_graph();
        let n = graph.add_node(Box::new(NumberNode::new(1.0)));
        graph
            .add_link(Link::to_sink(Producer::new(n, 0), 0))
            .unwrap();
        graph
            .node_mut(n)
            .unwrap()
            .as_any_mut()
            .downcast_mut::<NumberNode>()
            .unwrap()
            .set_value(6.0);
        graph.init_for_point(&EvaluationContext::default());
        assert_eq!(graph.output_value(0), 6.0);
    }

    #[test]
    fn uses_image_matches_by_identity() {
        use crate::image::{RasterImage, SharedImage};
        use crate::nodes::ImageNode;
        use std::sync::Arc;

        let img: SharedImage = Arc::new(RasterImage::new(1, 1, 1, vec![0.5]));
        let mut graph = number_graph();
        let mut node = ImageNode::new();
        node.set_map(Some(img.clone()));
        graph.add_node(Box::new(node));
        assert!(graph.uses_image(&img));
        let other: SharedImage = Arc::new(RasterImage::new(1, 1, 1, vec![0.5]));
        assert!(!graph.uses_image(&other));
    }

    #[test]
    fn texture_graph_has_the_standard_channels() {
        let graph = Graph::texture_graph();
        assert_eq!(graph.sink_count(), 11);
        assert_eq!(graph.sink(0).unwrap().name(), "Diffuse");
        assert_eq!(graph.sink(10).unwrap().name(), "Displacement");
    }

    proptest! {
        #[test]
        fn random_link_sequences_never_leave_a_cycle(
            attempts in prop::collection::vec((0usize..6, 0usize..6, 0usize..2), 0..40)
        ) {
            let mut graph = number_graph();
            for _ in 0..6 {
                graph.add_node(Box::new(ProductNode::new()));
            }
            for (from, to, input) in attempts {
                let _ = graph.add_link(Link::to_node(Producer::new(from, 0), to, input));
                prop_assert!(!graph.check_feedback());
            }
        }
    }
}
