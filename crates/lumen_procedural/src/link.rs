// SPDX-License-Identifier: MIT OR Apache-2.0
//! Directed edges between ports.

use crate::node::Producer;
use serde::{Deserialize, Serialize};

/// The consuming end of a link: an input port on a node, or a sink's sole
/// input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LinkEnd {
    /// An input port on an ordinary node.
    Node {
        /// Index of the consuming node in the graph's node list.
        node: usize,
        /// Index of the input port on that node.
        input: usize,
    },
    /// The single input of a sink.
    Sink {
        /// Index of the sink in the graph's sink list.
        sink: usize,
    },
}

/// A directed edge from a node's output port to an input port.
///
/// Links are created through [`Graph::add_link`](crate::graph::Graph::add_link),
/// which enforces the structural invariants (matching value kinds, at most
/// one link per input, acyclicity); a `Link` value itself is just the pair
/// of endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    /// Producing endpoint.
    pub from: Producer,
    /// Consuming endpoint.
    pub to: LinkEnd,
}

impl Link {
    /// Link a node output to another node's input.
    pub fn to_node(from: Producer, node: usize, input: usize) -> Self {
        Self {
            from,
            to: LinkEnd::Node { node, input },
        }
    }

    /// Link a node output to a sink.
    pub fn to_sink(from: Producer, sink: usize) -> Self {
        Self {
            from,
            to: LinkEnd::Sink { sink },
        }
    }

    /// Whether either endpoint references the given node index.
    pub fn involves_node(&self, node: usize) -> bool {
        self.from.node == node || matches!(self.to, LinkEnd::Node { node: n, .. } if n == node)
    }
}
