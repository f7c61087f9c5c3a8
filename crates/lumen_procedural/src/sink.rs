// SPDX-License-Identifier: MIT OR Apache-2.0
//! Named output channels of a graph.

use crate::color::Rgb;
use crate::node::Producer;
use crate::port::{Placement, Port, ValueKind};

/// One named result channel of a graph (e.g. "Diffuse" or "Displacement").
///
/// A sink is a single-input consumer: it forwards whatever feeds its input,
/// or its configured default when the input is unconnected. The sink set is
/// fixed when the graph is constructed; editing adds and removes nodes and
/// links, never sinks.
#[derive(Debug, Clone)]
pub struct Sink {
    name: String,
    input: Port,
    default_value: f64,
    default_color: Rgb,
    pub(crate) source: Option<Producer>,
}

impl Sink {
    /// Create a numeric output channel.
    pub fn number(name: impl Into<String>, default_value: f64) -> Self {
        let name = name.into();
        Self {
            input: Port::input(name.clone(), ValueKind::Number, Placement::Left),
            name,
            default_value,
            default_color: Rgb::BLACK,
            source: None,
        }
    }

    /// Create a color output channel.
    pub fn color(name: impl Into<String>, default_color: Rgb) -> Self {
        let name = name.into();
        Self {
            input: Port::input(name.clone(), ValueKind::Color, Placement::Left),
            name,
            default_value: 0.0,
            default_color,
            source: None,
        }
    }

    /// Channel name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Kind of value this channel produces.
    pub fn kind(&self) -> ValueKind {
        self.input.kind
    }

    /// The sink's single input port.
    pub fn input_port(&self) -> &Port {
        &self.input
    }

    /// Value returned when the input is unconnected.
    pub fn default_value(&self) -> f64 {
        self.default_value
    }

    /// Color returned when the input is unconnected.
    pub fn default_color(&self) -> Rgb {
        self.default_color
    }

    /// Whether anything is wired into this channel.
    pub fn connected(&self) -> bool {
        self.source.is_some()
    }

    /// The producer feeding this channel, if any.
    pub fn source(&self) -> Option<Producer> {
        self.source
    }
}
