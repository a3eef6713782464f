//! Backend-independent half of the frame loop: phase ordering, frame
//! timing, the draw list and the uniforms written for each draw.

use std::time::Instant;

use glam::{Mat3, Mat4, Vec3};
use thiserror::Error;

use crate::camera::Camera;
use crate::scene::Scene;
use crate::shader::ShaderProgram;
use crate::uniforms;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderPhase {
    Uninitialized,
    Ready,
    Clearing,
    Updating,
    Drawing,
    Presenting,
    Destroyed,
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("invalid render phase transition {from:?} -> {to:?}")]
pub struct PhaseError {
    pub from: RenderPhase,
    pub to: RenderPhase,
}

/// Enforces `Ready -> Clearing -> Updating -> Drawing -> Presenting -> Ready`.
#[derive(Debug)]
pub struct PhaseTracker {
    phase: RenderPhase,
}

impl Default for PhaseTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl PhaseTracker {
    pub fn new() -> Self {
        Self {
            phase: RenderPhase::Uninitialized,
        }
    }

    pub fn phase(&self) -> RenderPhase {
        self.phase
    }

    pub fn advance(&mut self, to: RenderPhase) -> Result<(), PhaseError> {
        use RenderPhase::*;
        let allowed = matches!(
            (self.phase, to),
            (Uninitialized, Ready)
                | (Ready, Clearing)
                | (Clearing, Updating)
                | (Updating, Drawing)
                | (Drawing, Presenting)
                | (Presenting, Ready)
                | (Ready, Destroyed)
        );
        if !allowed {
            return Err(PhaseError {
                from: self.phase,
                to,
            });
        }
        self.phase = to;
        Ok(())
    }
}

/// Seconds elapsed between consecutive frames.
#[derive(Debug, Default)]
pub struct FrameClock {
    last: Option<Instant>,
}

impl FrameClock {
    /// Records `now` and returns the seconds since the previous tick; zero
    /// on the first frame.
    pub fn tick(&mut self, now: Instant) -> f32 {
        let delta = self
            .last
            .map_or(0.0, |last| now.saturating_duration_since(last).as_secs_f32());
        self.last = Some(now);
        delta
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    pub near: f32,
    pub far: f32,
}

impl Default for Projection {
    fn default() -> Self {
        Self {
            near: 0.1,
            far: 100.0,
        }
    }
}

impl Projection {
    pub fn matrix(&self, fov_degrees: f32, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(fov_degrees.to_radians(), aspect.max(0.01), self.near, self.far)
    }
}

/// Per-frame camera state shared by every draw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameState {
    pub delta_time: f32,
    pub view: Mat4,
    pub projection: Mat4,
    pub view_position: Vec3,
}

impl FrameState {
    pub fn new(delta_time: f32, camera: &Camera, aspect: f32, projection: &Projection) -> Self {
        Self {
            delta_time,
            view: camera.view_matrix(),
            projection: projection.matrix(camera.zoom(), aspect),
            view_position: camera.position,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DrawCall {
    /// Textured, lit pyramid.
    Pyramid { model: Mat4 },
    /// Unlit marker at a point light.
    Lamp { model: Mat4, color: Vec3 },
}

/// Pyramids first, then one lamp marker per active point light.
pub fn draw_calls(scene: &Scene) -> Vec<DrawCall> {
    let pyramids = scene.pyramids.iter().map(|pyramid| DrawCall::Pyramid {
        model: pyramid.model_matrix(),
    });
    let lamps = scene.lights.active_point_lights().iter().map(|light| DrawCall::Lamp {
        model: Mat4::from_translation(light.position)
            * Mat4::from_scale(Vec3::splat(light.lamp_scale)),
        color: light.colors.diffuse,
    });
    pyramids.chain(lamps).collect()
}

/// Inverse transpose of the model's upper 3x3, widened back to a `mat4`.
pub fn normal_matrix(model: Mat4) -> Mat4 {
    Mat4::from_mat3(Mat3::from_mat4(model).inverse().transpose())
}

/// Writes every uniform `call` needs into `program`.
pub fn prepare_draw(call: &DrawCall, frame: &FrameState, scene: &Scene, program: &mut ShaderProgram) {
    program.set_mat4(uniforms::CAMERA_VIEW, frame.view);
    program.set_mat4(uniforms::CAMERA_PROJECTION, frame.projection);
    program.set_vec3(uniforms::CAMERA_POSITION, frame.view_position);
    match call {
        DrawCall::Pyramid { model } => {
            program.set_mat4(uniforms::TRANSFORM_MODEL, *model);
            program.set_mat4(uniforms::TRANSFORM_NORMAL, normal_matrix(*model));
            scene.material.apply(program);
            scene.lights.apply(program);
        }
        DrawCall::Lamp { model, color } => {
            program.set_mat4(uniforms::TRANSFORM_MODEL, *model);
            program.set_vec3(uniforms::LAMP_COLOR, *color);
        }
    }
}
