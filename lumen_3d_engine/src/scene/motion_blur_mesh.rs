/// Motion-blur meshes: renderables with a color/depth technique and a
/// motion-vector technique, in an instanced and a non-instanced flavor.

use glam::{Mat4, Vec3};
use crate::engine::EngineContext;
use crate::error::Result;
use crate::render_engine::{
    ParamHandle, PrimitiveTopology, RenderEngine, RenderLayoutHandle, TechniqueHandle,
};
use super::aabb::AABB;
use super::instance_data::InstanceData;
use super::renderable::{Instancing, RenderContext, Renderable};

const SOURCE: &str = "lumen3d::MotionBlurMesh";

/// Effect holding the four mesh techniques
pub const MOTION_BLUR_EFFECT: &str = "MotionBlurDoF.fxml";

/// How the mesh's instances reach the device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeshVariant {
    /// Instance records streamed, one draw for all instances
    Instanced,
    /// Transforms and color set as parameters before each draw
    NonInstanced,
}

impl MeshVariant {
    /// (color/depth technique, motion-vector technique)
    pub fn technique_names(self) -> (&'static str, &'static str) {
        match self {
            MeshVariant::Instanced => ("ColorDepthInstanced", "MotionVectorInstanced"),
            MeshVariant::NonInstanced => ("ColorDepthNonInstanced", "MotionVectorNonInstanced"),
        }
    }

    fn name(self) -> &'static str {
        match self {
            MeshVariant::Instanced => "InstancedMesh",
            MeshVariant::NonInstanced => "NonInstancedMesh",
        }
    }
}

struct MeshParams {
    pos_center: ParamHandle,
    pos_extent: ParamHandle,
    eye_in_world: ParamHandle,
    view: ParamHandle,
    proj: ParamHandle,
    prev_view: ParamHandle,
    prev_proj: ParamHandle,
    elapsed_time: ParamHandle,
    modelmat: ParamHandle,
    last_modelmat: ParamHandle,
    color: ParamHandle,
}

/// Static mesh drawn by the motion-blur sample
pub struct MotionBlurMesh {
    variant: MeshVariant,
    layout: RenderLayoutHandle,
    bounds: AABB,
    vertex_count: u32,
    primitive_count: u32,
    color_technique: TechniqueHandle,
    motion_vec_technique: TechniqueHandle,
    motion_vec: bool,
    params: MeshParams,
}

impl MotionBlurMesh {
    /// Resolve techniques and parameters of the mesh effect for `variant`.
    ///
    /// `layout` must already exist; its descriptor gives the vertex and
    /// primitive counts reported in scene statistics.
    pub fn new(
        context: &EngineContext,
        variant: MeshVariant,
        layout: RenderLayoutHandle,
        bounds: AABB,
    ) -> Result<Self> {
        let (color_name, motion_vec_name) = variant.technique_names();

        context.with_factory(|f| {
            let desc = match f.render_layout_desc(layout) {
                Some(desc) => desc,
                None => crate::engine_bail!(SOURCE, "Render layout {:?} does not exist", layout),
            };
            let elements = desc.element_count();
            let primitive_count = match desc.topology {
                PrimitiveTopology::PointList => elements,
                PrimitiveTopology::TriangleList => elements / 3,
                PrimitiveTopology::TriangleStrip => elements.saturating_sub(2),
            };

            let effect = f.load_effect(MOTION_BLUR_EFFECT)?;
            let params = MeshParams {
                pos_center: f.param_by_name(effect, "pos_center")?,
                pos_extent: f.param_by_name(effect, "pos_extent")?,
                eye_in_world: f.param_by_name(effect, "eye_in_world")?,
                view: f.param_by_name(effect, "view")?,
                proj: f.param_by_name(effect, "proj")?,
                prev_view: f.param_by_name(effect, "prev_view")?,
                prev_proj: f.param_by_name(effect, "prev_proj")?,
                elapsed_time: f.param_by_name(effect, "elapsed_time")?,
                modelmat: f.param_by_name(effect, "modelmat")?,
                last_modelmat: f.param_by_name(effect, "last_modelmat")?,
                color: f.param_by_name(effect, "color")?,
            };

            Ok(Self {
                variant,
                layout,
                bounds,
                vertex_count: desc.vertices.vertex_count,
                primitive_count,
                color_technique: f.technique_by_name(effect, color_name)?,
                motion_vec_technique: f.technique_by_name(effect, motion_vec_name)?,
                motion_vec: false,
                params,
            })
        })
    }

    pub fn variant(&self) -> MeshVariant {
        self.variant
    }

    pub fn is_motion_vec_pass(&self) -> bool {
        self.motion_vec
    }
}

impl Renderable for MotionBlurMesh {
    fn name(&self) -> &str {
        self.variant.name()
    }

    fn render_layout(&self) -> RenderLayoutHandle {
        self.layout
    }

    fn technique(&self) -> TechniqueHandle {
        if self.motion_vec {
            self.motion_vec_technique
        } else {
            self.color_technique
        }
    }

    fn bounds(&self) -> AABB {
        self.bounds
    }

    fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    fn primitive_count(&self) -> u32 {
        self.primitive_count
    }

    fn instancing(&self) -> Instancing {
        match self.variant {
            MeshVariant::Instanced => Instancing::Hardware,
            MeshVariant::NonInstanced => Instancing::PerInstance,
        }
    }

    /// Positions are decompressed in the vertex shader from the bounds
    fn build_mesh_info(&mut self, re: &mut dyn RenderEngine) -> Result<()> {
        let center: Vec3 = self.bounds.center();
        let half_size: Vec3 = self.bounds.half_size();
        re.set_param(self.params.pos_center, center.into())?;
        re.set_param(self.params.pos_extent, half_size.into())
    }

    fn on_render_begin(&mut self, ctx: &RenderContext<'_>, re: &mut dyn RenderEngine) -> Result<()> {
        let camera = ctx.camera;
        re.set_param(self.params.eye_in_world, camera.eye_pos().into())?;
        re.set_param(self.params.view, (*camera.view_matrix()).into())?;
        re.set_param(self.params.proj, (*camera.projection_matrix()).into())?;
        re.set_param(self.params.prev_view, (*camera.prev_view_matrix()).into())?;
        re.set_param(self.params.prev_proj, (*camera.prev_projection_matrix()).into())?;
        re.set_param(self.params.elapsed_time, ctx.elapsed.into())
    }

    fn on_instance_begin(
        &mut self,
        _index: usize,
        instance: &InstanceData,
        re: &mut dyn RenderEngine,
    ) -> Result<()> {
        let model: Mat4 = instance.model();
        let last_model: Mat4 = instance.last_model();
        re.set_param(self.params.modelmat, model.into())?;
        re.set_param(self.params.last_modelmat, last_model.into())?;
        re.set_param(self.params.color, instance.color_rgba().into())
    }

    fn motion_vec_pass(&mut self, motion_vec: bool) {
        self.motion_vec = motion_vec;
    }
}

#[cfg(test)]
#[path = "motion_blur_mesh_tests.rs"]
mod tests;
