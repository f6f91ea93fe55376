/// Renderable: the drawable unit collected by the render queue.

use slotmap::new_key_type;
use crate::camera::Camera;
use crate::error::Result;
use crate::render_engine::{RenderEngine, RenderLayoutHandle, TechniqueHandle};
use super::aabb::AABB;
use super::instance_data::InstanceData;

new_key_type! {
    /// Stable key of a renderable registered in the SceneManager
    pub struct RenderableKey;
}

/// How the instances of one queue entry are drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instancing {
    /// One draw; the instance records are uploaded as an instance stream
    Hardware,
    /// One draw per instance, `on_instance_begin` before each
    PerInstance,
}

/// Per-frame values handed to renderable hooks
#[derive(Debug, Clone, Copy)]
pub struct RenderContext<'a> {
    pub camera: &'a Camera,
    pub app_time: f32,
    pub elapsed: f32,
}

/// Drawable unit: geometry (render layout) plus the shading state it is
/// drawn with.
///
/// The scene manager buckets queued renderables by `technique()`, binds each
/// technique once, then brackets every renderable's draw(s) with
/// `on_render_begin` / `on_render_end`.
pub trait Renderable {
    /// Debug name
    fn name(&self) -> &str;

    /// Geometry to draw. A null handle is a contract violation.
    fn render_layout(&self) -> RenderLayoutHandle;

    /// Current shading state. A null handle is a contract violation.
    fn technique(&self) -> TechniqueHandle;

    /// Local-space bounds used for culling
    fn bounds(&self) -> AABB;

    fn vertex_count(&self) -> u32;

    fn primitive_count(&self) -> u32;

    fn instancing(&self) -> Instancing {
        Instancing::PerInstance
    }

    /// Called once when the renderable is registered
    fn build_mesh_info(&mut self, _re: &mut dyn RenderEngine) -> Result<()> {
        Ok(())
    }

    /// Called before the renderable's draw(s), technique already bound
    fn on_render_begin(&mut self, _ctx: &RenderContext<'_>, _re: &mut dyn RenderEngine) -> Result<()> {
        Ok(())
    }

    /// Called before each per-instance draw
    fn on_instance_begin(
        &mut self,
        _index: usize,
        _instance: &InstanceData,
        _re: &mut dyn RenderEngine,
    ) -> Result<()> {
        Ok(())
    }

    /// Called after the renderable's draw(s)
    fn on_render_end(&mut self, _re: &mut dyn RenderEngine) -> Result<()> {
        Ok(())
    }

    /// Switch between the color/depth technique and the motion-vector technique
    fn motion_vec_pass(&mut self, _motion_vec: bool) {}
}
