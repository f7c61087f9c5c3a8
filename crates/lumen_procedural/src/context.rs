// SPDX-License-Identifier: MIT OR Apache-2.0
//! Per-sample evaluation context.

use glam::DVec3;
use std::sync::Arc;

/// Describes the point in space and time for which a procedural graph is
/// being evaluated.
///
/// The renderer builds one of these per sample and passes it to
/// [`Graph::init_for_point`](crate::graph::Graph::init_for_point). It is
/// immutable for the duration of the evaluation pass; nodes that need it
/// later in the pass keep a clone (the parameter array is shared, so clones
/// are cheap).
#[derive(Debug, Clone)]
pub struct EvaluationContext {
    /// Position of the point being evaluated.
    pub position: DVec3,
    /// Footprint size of the sample along each axis, used for antialiasing.
    pub size: DVec3,
    /// Angle between the viewing direction and the surface normal.
    pub view_angle: f64,
    /// Time of the evaluation, in seconds.
    pub time: f64,
    /// Externally supplied per-vertex parameter values, indexed by the
    /// positions assigned through
    /// [`Graph::texture_parameters`](crate::graph::Graph::texture_parameters).
    pub params: Arc<[f64]>,
}

impl EvaluationContext {
    /// Create a context for a point, with zero footprint and no parameters.
    pub fn new(position: DVec3) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    /// Set the sample footprint size.
    pub fn with_size(mut self, size: DVec3) -> Self {
        self.size = size;
        self
    }

    /// Set the evaluation time.
    pub fn with_time(mut self, time: f64) -> Self {
        self.time = time;
        self
    }

    /// Set the viewing angle.
    pub fn with_view_angle(mut self, angle: f64) -> Self {
        self.view_angle = angle;
        self
    }

    /// Set the per-vertex parameter values.
    pub fn with_params(mut self, params: impl Into<Arc<[f64]>>) -> Self {
        self.params = params.into();
        self
    }
}

impl Default for EvaluationContext {
    fn default() -> Self {
        Self {
            position: DVec3::ZERO,
            size: DVec3::ZERO,
            view_angle: 0.0,
            time: 0.0,
            params: Arc::from(Vec::new()),
        }
    }
}
