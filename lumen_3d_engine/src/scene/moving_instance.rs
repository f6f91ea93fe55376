/// Moving instance: a scene object orbiting the world Y axis, keeping the
/// transform history its motion vectors are computed from.

use glam::Mat4;
use super::instance_data::InstanceData;
use super::motion_history::MotionHistory;
use super::renderable::RenderableKey;
use super::scene_object::{SceneObject, SceneObjectAttrib};

/// Default orbit rate factor, scaled by the object's height
pub const DEFAULT_ORBIT_RATE: f32 = 0.3;

/// One instance of a motion-blurred renderable.
///
/// Each frame `update` first records the current model matrix in the
/// history and takes the previous transform from it, then advances the
/// model. The instance record therefore always pairs the transform after
/// this frame's update with the one from before it.
#[derive(Debug, Clone)]
pub struct MovingInstance {
    renderable: RenderableKey,
    model: Mat4,
    instance: InstanceData,
    history: MotionHistory,
    orbit_rate: f32,
}

impl MovingInstance {
    /// `motion_frames` is the history capacity (`EngineConfig::motion_frames`)
    pub fn new(renderable: RenderableKey, model: Mat4, color: u32, motion_frames: usize) -> Self {
        Self {
            renderable,
            model,
            instance: InstanceData::new(&model, &model, color),
            history: MotionHistory::new(motion_frames),
            orbit_rate: DEFAULT_ORBIT_RATE,
        }
    }

    pub fn with_orbit_rate(mut self, orbit_rate: f32) -> Self {
        self.orbit_rate = orbit_rate;
        self
    }

    pub fn history(&self) -> &MotionHistory {
        &self.history
    }

    pub fn instance(&self) -> &InstanceData {
        &self.instance
    }
}

impl SceneObject for MovingInstance {
    fn attrib(&self) -> SceneObjectAttrib {
        SceneObjectAttrib::MOVEABLE | SceneObjectAttrib::CULLABLE
    }

    fn renderable(&self) -> RenderableKey {
        self.renderable
    }

    fn set_renderable(&mut self, renderable: RenderableKey) {
        self.renderable = renderable;
    }

    fn model_matrix(&self) -> Mat4 {
        self.model
    }

    fn instance_data(&self) -> Option<InstanceData> {
        Some(self.instance)
    }

    fn update(&mut self, _app_time: f32, elapsed: f32) {
        let previous = self.history.push(self.model);
        self.instance.set_last_model(&previous);

        // higher objects orbit faster, in the opposite direction
        let angle = elapsed * self.orbit_rate * -self.model.w_axis.y;
        self.model = Mat4::from_rotation_y(angle) * self.model;
        self.instance.set_model(&self.model);
    }
}

#[cfg(test)]
#[path = "moving_instance_tests.rs"]
mod tests;
