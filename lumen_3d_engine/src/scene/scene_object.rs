/// Scene objects: per-frame updated owners of renderable instances.

use bitflags::bitflags;
use glam::Mat4;
use slotmap::new_key_type;
use super::instance_data::InstanceData;
use super::renderable::RenderableKey;

new_key_type! {
    /// Stable key of a scene object registered in the SceneManager
    pub struct SceneObjectKey;
}

bitflags! {
    /// Scene object attributes
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SceneObjectAttrib: u32 {
        /// Tested against the camera frustum; otherwise always visible
        const CULLABLE = 1 << 0;
        /// `update()` is called once per frame
        const MOVEABLE = 1 << 1;
    }
}

/// An object placed in the scene that contributes one instance of a
/// renderable to the render queue when visible.
pub trait SceneObject {
    fn attrib(&self) -> SceneObjectAttrib;

    /// Renderable this object is drawn with
    fn renderable(&self) -> RenderableKey;

    fn set_renderable(&mut self, renderable: RenderableKey);

    /// World transform (used to place the renderable's bounds for culling)
    fn model_matrix(&self) -> Mat4;

    /// Instance record queued with the renderable (`None` submits the bare renderable)
    fn instance_data(&self) -> Option<InstanceData> {
        None
    }

    /// Per-frame update, only called for MOVEABLE objects
    fn update(&mut self, _app_time: f32, _elapsed: f32) {}
}
