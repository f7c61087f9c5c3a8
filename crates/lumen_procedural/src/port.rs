// SPDX-License-Identifier: MIT OR Apache-2.0
//! Port definitions for node inputs/outputs.

use serde::{Deserialize, Serialize};

/// Kind of value carried by a port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueKind {
    /// A scalar number.
    Number,
    /// An RGB color.
    Color,
}

/// Port direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PortDirection {
    /// Input port.
    Input,
    /// Output port.
    Output,
}

/// Hint for where the node editor places a port on the node's outline.
///
/// Purely presentational; the engine carries it through but never reads it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Placement {
    /// Left edge (the usual side for inputs).
    Left,
    /// Right edge (the usual side for outputs).
    Right,
    /// Top edge.
    Top,
    /// Bottom edge.
    Bottom,
}

/// A typed connection point on a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Port {
    /// Display name.
    pub name: String,
    /// Kind of value the port carries.
    pub kind: ValueKind,
    /// Direction.
    pub direction: PortDirection,
    /// Placement hint for the editor.
    pub placement: Placement,
}

impl Port {
    /// Create an input port.
    pub fn input(name: impl Into<String>, kind: ValueKind, placement: Placement) -> Self {
        Self {
            name: name.into(),
            kind,
            direction: PortDirection::Input,
            placement,
        }
    }

    /// Create an output port, placed on the right edge.
    pub fn output(name: impl Into<String>, kind: ValueKind) -> Self {
        Self {
            name: name.into(),
            kind,
            direction: PortDirection::Output,
            placement: Placement::Right,
        }
    }

    /// Shorthand for a numeric input on the left edge.
    pub fn number_input(name: impl Into<String>) -> Self {
        Self::input(name, ValueKind::Number, Placement::Left)
    }

    /// Shorthand for a color input on the left edge.
    pub fn color_input(name: impl Into<String>) -> Self {
        Self::input(name, ValueKind::Color, Placement::Left)
    }
}
