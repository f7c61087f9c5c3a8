// SPDX-License-Identifier: MIT OR Apache-2.0
//! Binary serialization of procedural graphs.
//!
//! The stream layout is big-endian and versioned: a format version, the
//! node table (type tag, editor position, then the node's own payload),
//! and the link table. Node payloads are opaque to this module; each node
//! type versions its payload independently. Loading is all-or-nothing: a
//! graph is decoded into scratch storage and committed only once the whole
//! stream has parsed.

use crate::graph::{Graph, NodeSlot};
use crate::image::ImageStore;
use crate::link::{Link, LinkEnd};
use crate::node::{NodeRegistry, Producer};
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::cell::RefCell;
use std::collections::HashSet;
use std::io::{self, Read, Write};

/// Format version written by the current release.
const FORMAT_VERSION: i16 = 0;

/// Shared state handed to every node while encoding: the image resources
/// of the surrounding scene, so image references serialize as indices.
pub struct EncodeContext<'a> {
    /// Image resources of the surrounding scene.
    pub images: &'a ImageStore,
}

impl<'a> EncodeContext<'a> {
    /// Create an encode context over the given image resources.
    pub fn new(images: &'a ImageStore) -> Self {
        Self { images }
    }
}

/// Shared state handed to every node while decoding.
pub struct DecodeContext<'a> {
    /// Registry resolving stored type tags to node constructors.
    pub registry: &'a NodeRegistry,
    /// Image resources of the surrounding scene.
    pub images: &'a ImageStore,
}

impl<'a> DecodeContext<'a> {
    /// Create a decode context over the given registry and images.
    pub fn new(registry: &'a NodeRegistry, images: &'a ImageStore) -> Self {
        Self { registry, images }
    }
}

/// Error while reading a serialized graph. Any error aborts the whole
/// load; the target graph is left untouched.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The underlying stream failed or ended early.
    #[error("i/o error reading graph")]
    Io(#[from] io::Error),

    /// The stream was written by an unknown format revision.
    #[error("unsupported graph format version {0}")]
    UnsupportedVersion(i16),

    /// A node payload was written by an unknown payload revision.
    #[error("unsupported {type_name} payload version {version}")]
    UnsupportedPayloadVersion {
        /// Type tag of the node whose payload failed.
        type_name: &'static str,
        /// The unrecognized version marker.
        version: i32,
    },

    /// The stream references a node type missing from the registry.
    #[error("unknown node type {0:?}")]
    UnknownNodeType(String),

    /// A node payload failed to parse.
    #[error("malformed {0} payload")]
    MalformedPayload(&'static str),

    /// A node payload references an image resource that does not exist.
    #[error("image index {0} out of range")]
    ImageOutOfRange(i32),

    /// A link table entry is inconsistent with the node table.
    #[error("link {0} is malformed")]
    MalformedLink(usize),

    /// A count or string in the stream is structurally invalid.
    #[error("malformed stream: {0}")]
    Malformed(&'static str),
}

/// Write a length-prefixed UTF-8 string (u16 byte length, then bytes).
pub fn write_string(out: &mut dyn Write, value: &str) -> io::Result<()> {
    let bytes = value.as_bytes();
    let len = u16::try_from(bytes.len())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "string too long"))?;
    out.write_u16::<BigEndian>(len)?;
    out.write_all(bytes)
}

/// Read a length-prefixed UTF-8 string.
pub fn read_string(input: &mut dyn Read) -> Result<String, CodecError> {
    let len = input.read_u16::<BigEndian>()? as usize;
    let mut bytes = vec![0u8; len];
    input.read_exact(&mut bytes)?;
    String::from_utf8(bytes).map_err(|_| CodecError::Malformed("string is not utf-8"))
}

/// Serialize a graph. Sinks are not part of the stream; they are fixed by
/// the graph's construction and only their wiring is recorded, as link
/// table entries with a negative target (`-sink_index - 1`).
pub fn write_graph(graph: &Graph, out: &mut dyn Write, ctx: &EncodeContext<'_>) -> io::Result<()> {
    out.write_i16::<BigEndian>(FORMAT_VERSION)?;
    out.write_i32::<BigEndian>(graph.node_count() as i32)?;
    for index in 0..graph.node_count() {
        let Some(cell) = graph.slot(index) else {
            continue;
        };
        let slot = cell.borrow();
        write_string(out, slot.node.type_name())?;
        out.write_i32::<BigEndian>(slot.position.0)?;
        out.write_i32::<BigEndian>(slot.position.1)?;
        slot.node.write_payload(out, ctx)?;
    }
    out.write_i32::<BigEndian>(graph.link_count() as i32)?;
    for link in graph.links() {
        out.write_i32::<BigEndian>(link.from.node as i32)?;
        out.write_i32::<BigEndian>(link.from.output as i32)?;
        match link.to {
            LinkEnd::Sink { sink } => out.write_i32::<BigEndian>(-(sink as i32) - 1)?,
            LinkEnd::Node { node, input } => {
                out.write_i32::<BigEndian>(node as i32)?;
                out.write_i32::<BigEndian>(input as i32)?;
            }
        }
    }
    Ok(())
}

/// Deserialize a graph, replacing `graph`'s nodes and links.
///
/// The target graph supplies the sink set, which must match the one the
/// stream was written against. On any error the target is left unchanged.
pub fn read_graph(
    graph: &mut Graph,
    input: &mut dyn Read,
    ctx: &DecodeContext<'_>,
) -> Result<(), CodecError> {
    let version = input.read_i16::<BigEndian>()?;
    if version != FORMAT_VERSION {
        return Err(CodecError::UnsupportedVersion(version));
    }

    let node_count = read_count(input)?;
    let mut nodes: Vec<RefCell<NodeSlot>> = Vec::with_capacity(node_count);
    for _ in 0..node_count {
        let type_name = read_string(input)?;
        let x = input.read_i32::<BigEndian>()?;
        let y = input.read_i32::<BigEndian>()?;
        let mut node = ctx
            .registry
            .create(&type_name)
            .ok_or(CodecError::UnknownNodeType(type_name))?;
        node.read_payload(input, ctx)?;
        nodes.push(RefCell::new(NodeSlot::new(node, (x, y))));
    }

    let link_count = read_count(input)?;
    let mut links: Vec<Link> = Vec::with_capacity(link_count);
    let mut fed_sinks: HashSet<usize> = HashSet::new();
    for index in 0..link_count {
        let bad = || CodecError::MalformedLink(index);
        let from_node = read_index(input, index)?;
        let from_output = read_index(input, index)?;
        let from_kind = {
            let slot = nodes.get(from_node).ok_or_else(bad)?.borrow();
            slot.node.output_ports().get(from_output).ok_or_else(bad)?.kind
        };
        let from = Producer::new(from_node, from_output);
        let target = input.read_i32::<BigEndian>()?;
        let link = if target < 0 {
            let sink = (-target - 1) as usize;
            let port = graph.sink(sink).ok_or_else(bad)?;
            if port.kind() != from_kind || !fed_sinks.insert(sink) {
                return Err(bad());
            }
            Link::to_sink(from, sink)
        } else {
            let to_node = target as usize;
            let to_input = read_index(input, index)?;
            let mut slot = nodes.get(to_node).ok_or_else(bad)?.borrow_mut();
            let kind = slot.node.input_ports().get(to_input).ok_or_else(bad)?.kind;
            if kind != from_kind || slot.sources[to_input].is_some() {
                return Err(bad());
            }
            slot.sources[to_input] = Some(from);
            Link::to_node(from, to_node, to_input)
        };
        links.push(link);
    }

    graph.replace_contents(nodes, links);
    tracing::debug!(nodes = node_count, links = link_count, "loaded procedural graph");
    Ok(())
}

fn read_count(input: &mut dyn Read) -> Result<usize, CodecError> {
    let count = input.read_i32::<BigEndian>()?;
    usize::try_from(count).map_err(|_| CodecError::Malformed("negative table count"))
}

fn read_index(input: &mut dyn Read, link: usize) -> Result<usize, CodecError> {
    let value = input.read_i32::<BigEndian>()?;
    usize::try_from(value).map_err(|_| CodecError::MalformedLink(link))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Rgb;
    use crate::context::EvaluationContext;
    use crate::nodes::{BlendNode, ColorNode, NumberNode, ParameterNode, ProductNode};
    use crate::sink::Sink;

    fn sinks() -> Vec<Sink> {
        vec![
            Sink::number("Intensity", 0.0),
            Sink::color("Color", Rgb::BLACK),
        ]
    }

    fn sample_graph() -> Graph {
        let mut graph = Graph::new(sinks());
        let a = graph.add_node_at(Box::new(NumberNode::new(3.0)), (10, 20));
        let b = graph.add_node_at(Box::new(NumberNode::new(4.0)), (10, 80));
        let p = graph.add_node_at(Box::new(ProductNode::new()), (120, 50));
        let mut param = ParameterNode::new("Weight");
        param.set_range(0.0, 2.0, 0.5);
        graph.add_node(Box::new(param));
        let c1 = graph.add_node(Box::new(ColorNode::new(Rgb::new(0.2, 0.4, 0.6))));
        let c2 = graph.add_node(Box::new(ColorNode::new(Rgb::WHITE)));
        let blend = graph.add_node(Box::new(BlendNode::new()));
        for link in [
            Link::to_node(Producer::new(a, 0), p, 0),
            Link::to_node(Producer::new(b, 0), p, 1),
            Link::to_sink(Producer::new(p, 0), 0),
            Link::to_node(Producer::new(c1, 0), blend, 0),
            Link::to_node(Producer::new(c2, 0), blend, 1),
            Link::to_sink(Producer::new(blend, 0), 1),
        ] {
            graph.add_link(link).unwrap();
        }
        graph
    }

    fn encode(graph: &Graph) -> Vec<u8> {
        let images = ImageStore::new();
        let mut bytes = Vec::new();
        write_graph(graph, &mut bytes, &EncodeContext::new(&images)).unwrap();
        bytes
    }

    #[test]
    fn round_trip_is_byte_identical() {
        // Save, load into a fresh graph, save again.
        let graph = sample_graph();
        let bytes = encode(&graph);

        let registry = NodeRegistry::with_builtins();
        let images = ImageStore::new();
        let mut loaded = Graph::new(sinks());
        read_graph(
            &mut loaded,
            &mut bytes.as_slice(),
            &DecodeContext::new(&registry, &images),
        )
        .unwrap();

        assert_eq!(encode(&loaded), bytes);
    }

    #[test]
    fn loaded_graph_evaluates_like_the_original() {
        let graph = sample_graph();
        let bytes = encode(&graph);
        let registry = NodeRegistry::with_builtins();
        let images = ImageStore::new();
        let mut loaded = Graph::new(sinks());
        read_graph(
            &mut loaded,
            &mut bytes.as_slice(),
            &DecodeContext::new(&registry, &images),
        )
        .unwrap();

        loaded.init_for_point(&EvaluationContext::default());
        assert_eq!(loaded.output_value(0), 12.0);
        assert_eq!(loaded.node_position(2), Some((120, 50)));
        assert!(!loaded.check_feedback());
    }

    #[test]
    fn unknown_node_type_fails_the_load() {
        let graph = sample_graph();
        let bytes = encode(&graph);
        let registry = NodeRegistry::new();
        let images = ImageStore::new();
        let mut loaded = Graph::new(sinks());
        let err = read_graph(
            &mut loaded,
            &mut bytes.as_slice(),
            &DecodeContext::new(&registry, &images),
        )
        .unwrap_err();
        assert!(matches!(err, CodecError::UnknownNodeType(name) if name == "number"));
        // Nothing was committed.
        assert_eq!(loaded.node_count(), 0);
    }

    #[test]
    fn future_format_version_is_rejected() {
        let mut bytes = encode(&sample_graph());
        bytes[1] = 1;
        let registry = NodeRegistry::with_builtins();
        let images = ImageStore::new();
        let mut loaded = Graph::new(sinks());
        let err = read_graph(
            &mut loaded,
            &mut bytes.as_slice(),
            &DecodeContext::new(&registry, &images),
        )
        .unwrap_err();
        assert!(matches!(err, CodecError::UnsupportedVersion(1)));
    }

    #[test]
    fn out_of_range_link_fails_the_load_without_committing() {
        let mut graph = Graph::new(sinks());
        let n = graph.add_node(Box::new(NumberNode::new(1.0)));
        graph
            .add_link(Link::to_sink(Producer::new(n, 0), 0))
            .unwrap();
        let mut bytes = encode(&graph);
        // Corrupt the link's from-node index (first i32 after the table
        // count) to point past the node table.
        let link_from = bytes.len() - 12;
        bytes[link_from..link_from + 4].copy_from_slice(&9i32.to_be_bytes());

        let registry = NodeRegistry::with_builtins();
        let images = ImageStore::new();
        let mut loaded = Graph::new(sinks());
        loaded.add_node(Box::new(NumberNode::new(42.0)));
        let err = read_graph(
            &mut loaded,
            &mut bytes.as_slice(),
            &DecodeContext::new(&registry, &images),
        )
        .unwrap_err();
        assert!(matches!(err, CodecError::MalformedLink(0)));
        assert_eq!(loaded.node_count(), 1);
        assert_eq!(loaded.link_count(), 0);
    }

    #[test]
    fn truncated_stream_fails_the_load() {
        let bytes = encode(&sample_graph());
        let registry = NodeRegistry::with_builtins();
        let images = ImageStore::new();
        let mut loaded = Graph::new(sinks());
        let err = read_graph(
            &mut loaded,
            &mut &bytes[..bytes.len() - 3],
            &DecodeContext::new(&registry, &images),
        )
        .unwrap_err();
        assert!(matches!(err, CodecError::Io(_)));
        assert_eq!(loaded.node_count(), 0);
    }

    #[test]
    fn strings_round_trip() {
        let mut bytes = Vec::new();
        write_string(&mut bytes, "Bump Height").unwrap();
        assert_eq!(read_string(&mut bytes.as_slice()).unwrap(), "Bump Height");
    }
}
