// SPDX-License-Identifier: MIT OR Apache-2.0
//! Procedural dataflow graphs for texture and material evaluation.
//!
//! A [`Graph`] wires value-producing nodes into named output channels
//! (sinks) and is pulled lazily: asking a sink for its value walks
//! backward along producer pointers, and every node caches its results
//! per evaluation point. The engine powers:
//! - Procedural textures (color, transparency, bump, displacement)
//! - Procedural materials
//! - Any fixed set of named numeric/color channels
//!
//! ## Architecture
//!
//! The engine is built on a pull-based graph model with:
//! - Typed input/output ports ([`port`])
//! - Validated, cycle-free wiring ([`graph`])
//! - Per-point lazy evaluation with blur-keyed caches ([`node`])
//! - Versioned binary serialization ([`codec`])
//! - Per-thread clones for concurrent rendering ([`pool`])

pub mod codec;
pub mod color;
pub mod context;
pub mod graph;
pub mod image;
pub mod link;
pub mod node;
pub mod nodes;
pub mod pool;
pub mod port;
pub mod sink;

pub use codec::{read_graph, write_graph, CodecError, DecodeContext, EncodeContext};
pub use color::Rgb;
pub use context::EvaluationContext;
pub use graph::{Graph, LinkError};
pub use image::{ImageSource, ImageStore, SharedImage};
pub use link::{Link, LinkEnd};
pub use node::{Inputs, NodeRegistry, ProceduralNode, Producer};
pub use pool::GraphPool;
pub use port::{Placement, Port, PortDirection, ValueKind};
pub use sink::Sink;
