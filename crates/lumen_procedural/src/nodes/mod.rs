// SPDX-License-Identifier: MIT OR Apache-2.0
//! The built-in node catalog.

mod blend;
mod color;
mod image;
mod number;
mod parameter;
mod product;

pub use blend::BlendNode;
pub use color::ColorNode;
pub use image::{ColorModel, ImageNode};
pub use number::NumberNode;
pub use parameter::{ParameterNode, TextureParameter};
pub use product::ProductNode;

use crate::node::{NodeRegistry, ProceduralNode};

/// Register every built-in node type.
pub(crate) fn register_builtins(registry: &mut NodeRegistry) {
    registry.register("number", || -> Box<dyn ProceduralNode> {
        Box::new(NumberNode::default())
    });
    registry.register("color", || -> Box<dyn ProceduralNode> {
        Box::new(ColorNode::default())
    });
    registry.register("parameter", || -> Box<dyn ProceduralNode> {
        Box::new(ParameterNode::default())
    });
    registry.register("image", || -> Box<dyn ProceduralNode> {
        Box::new(ImageNode::default())
    });
    registry.register("product", || -> Box<dyn ProceduralNode> {
        Box::new(ProductNode::default())
    });
    registry.register("blend", || -> Box<dyn ProceduralNode> {
        Box::new(BlendNode::default())
    });
}
