// SPDX-License-Identifier: MIT OR Apache-2.0
//! Product of two numbers.

use crate::context::EvaluationContext;
use crate::node::{Inputs, ProceduralNode};
use crate::port::{Placement, Port, ValueKind};
use glam::DVec3;
use std::any::Any;

/// A node that outputs the product of its two numeric inputs.
///
/// If either input is unconnected the product is 0. The uncertainty is the
/// first-order propagation `|v1*e2| + |v2*e1|` and the gradient follows the
/// product rule.
#[derive(Debug)]
pub struct ProductNode {
    inputs: [Port; 2],
    outputs: [Port; 1],
    value_ok: bool,
    error_ok: bool,
    value: f64,
    error: f64,
    value_in1: f64,
    value_in2: f64,
    last_blur: f64,
}

impl ProductNode {
    /// Create a product node.
    pub fn new() -> Self {
        Self {
            inputs: [
                Port::input("Value 1", ValueKind::Number, Placement::Top),
                Port::input("Value 2", ValueKind::Number, Placement::Bottom),
            ],
            outputs: [Port::output("Product", ValueKind::Number)],
            value_ok: false,
            error_ok: false,
            value: 0.0,
            error: 0.0,
            value_in1: 0.0,
            value_in2: 0.0,
            last_blur: 0.0,
        }
    }
}

impl Default for ProductNode {
    fn default() -> Self {
        Self::new()
    }
}

impl ProceduralNode for ProductNode {
    fn type_name(&self) -> &'static str {
        "product"
    }

    fn input_ports(&self) -> &[Port] {
        &self.inputs
    }

    fn output_ports(&self) -> &[Port] {
        &self.outputs
    }

    fn init(&mut self, _ctx: &EvaluationContext) {
        self.value_ok = false;
        self.error_ok = false;
    }

    fn numeric_value(&mut self, _which: usize, blur: f64, inputs: &Inputs<'_>) -> f64 {
        if self.value_ok && blur == self.last_blur {
            return self.value;
        }
        self.value_ok = true;
        self.last_blur = blur;
        if !inputs.connected(0) || !inputs.connected(1) {
            self.value_in1 = 0.0;
            self.value_in2 = 0.0;
            self.value = 0.0;
            self.error = 0.0;
            self.error_ok = true;
            return 0.0;
        }
        self.error_ok = false;
        self.value_in1 = inputs.numeric(0, blur).unwrap_or(0.0);
        self.value_in2 = inputs.numeric(1, blur).unwrap_or(0.0);
        self.value = self.value_in1 * self.value_in2;
        self.value
    }

    fn value_uncertainty(&mut self, which: usize, blur: f64, inputs: &Inputs<'_>) -> f64 {
        if !self.value_ok || blur != self.last_blur {
            self.numeric_value(which, blur, inputs);
        }
        if self.error_ok {
            return self.error;
        }
        self.error_ok = true;
        let error1 = inputs.uncertainty(0, blur).unwrap_or(0.0);
        let error2 = inputs.uncertainty(1, blur).unwrap_or(0.0);
        self.error = (self.value_in1 * error2).abs() + (self.value_in2 * error1).abs();
        self.error
    }

    fn value_gradient(&mut self, which: usize, blur: f64, inputs: &Inputs<'_>) -> DVec3 {
        if !inputs.connected(0) || !inputs.connected(1) {
            return DVec3::ZERO;
        }
        if !self.value_ok || blur != self.last_blur {
            self.numeric_value(which, blur, inputs);
        }
        let grad1 = inputs.gradient(0, blur).unwrap_or(DVec3::ZERO);
        let grad2 = inputs.gradient(1, blur).unwrap_or(DVec3::ZERO);
        grad1 * self.value_in2 + grad2 * self.value_in1
    }

    fn duplicate(&self) -> Box<dyn ProceduralNode> {
        Box::new(Self::new())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
