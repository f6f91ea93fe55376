/// MotionBlurDoF sample: 400 orbiting objects rendered in two passes
/// (color/depth, then motion vectors), followed by motion blur, depth of
/// field and bokeh wired through a post-process graph.

use glam::{Vec3, Vec4};
use lumen_3d_engine::lumen3d::post_process::{
    library, BokehFilter, DepthOfField, MotionBlur, PostProcess, PostProcessGraph,
    PostProcessPass, SlotId, StageId,
};
use lumen_3d_engine::lumen3d::render::{
    AccessHint, Attachment, ClearFlags, FrameBufferHandle, TextureDesc, TextureFormat,
    TextureHandle,
};
use lumen_3d_engine::lumen3d::scene::{
    MeshVariant, MotionBlurMesh, MovingInstance, RenderableKey, SceneManager, SceneStats,
};
use lumen_3d_engine::lumen3d::camera::Camera;
use lumen_3d_engine::lumen3d::{App, EngineContext, Result, UpdateResult};
use lumen_3d_engine::{engine_debug, engine_info};
use crate::geometry::{self, NUM_INSTANCE, NUM_LINE};

const SOURCE: &str = "lumen3d_demo::MotionBlurDoF";

const NEAR_PLANE: f32 = 0.1;
const FAR_PLANE: f32 = 100.0;
const FOV_Y: f32 = std::f32::consts::FRAC_PI_4;

const CLEAR_COLOR: Vec4 = Vec4::new(0.2, 0.4, 0.6, 1.0);
/// Zero motion in the 8-bit motion-vector encoding
const MOTION_VEC_CLEAR: Vec4 = Vec4::new(0.5, 0.5, 0.5, 1.0);

const COLOR_FORMATS: [TextureFormat; 2] =
    [TextureFormat::B10G11R11_UFLOAT, TextureFormat::R16G16B16A16_SFLOAT];
const DEPTH_FORMATS: [TextureFormat; 2] =
    [TextureFormat::R16_SFLOAT, TextureFormat::R16G16B16A16_SFLOAT];
const MOTION_VEC_FORMATS: [TextureFormat; 3] = [
    TextureFormat::R8G8_UNORM,
    TextureFormat::R8G8B8A8_UNORM,
    TextureFormat::B8G8R8A8_UNORM,
];

/// Camera for a `width` x `height` back buffer
pub fn make_camera(width: u32, height: u32) -> Camera {
    Camera::look_at(
        Vec3::new(-1.8, 1.9, -1.8),
        Vec3::ZERO,
        FOV_Y,
        width as f32 / height.max(1) as f32,
        NEAR_PLANE,
        FAR_PLANE,
    )
}

/// Screen-sized textures written by the two scene passes
struct RenderTargets {
    /// Hardware depth, `None` when D16 cannot be sampled
    ds_tex: Option<TextureHandle>,
    depth_tex: TextureHandle,
    color_tex: TextureHandle,
    motion_vec_tex: TextureHandle,
}

struct Formats {
    color: TextureFormat,
    depth: TextureFormat,
    motion_vec: TextureFormat,
}

struct Stages {
    motion_blur: StageId,
    motion_blur_copy: StageId,
    depth_of_field: StageId,
    depth_of_field_copy: StageId,
    bokeh_filter: Option<StageId>,
}

struct Slots {
    color: SlotId,
    depth: SlotId,
    motion_vec: SlotId,
}

pub struct MotionBlurDoFApp {
    context: EngineContext,
    size: (u32, u32),
    formats: Formats,
    depth_texture_support: bool,

    clr_depth_fb: FrameBufferHandle,
    motion_vec_fb: FrameBufferHandle,
    targets: RenderTargets,

    depth_to_linear: Option<PostProcessPass>,
    graph: PostProcessGraph,
    stages: Stages,
    slots: Slots,

    instanced_mesh: RenderableKey,
    non_instanced_mesh: RenderableKey,

    mb_on: bool,
    dof_on: bool,
    bokeh_on: bool,
    use_instancing: bool,

    frames: u64,
    last_stats: SceneStats,
}

impl MotionBlurDoFApp {
    /// Build meshes, scene objects, render targets and the post-process graph
    pub fn new(scene: &mut SceneManager, width: u32, height: u32) -> Result<Self> {
        let context = scene.context().clone();
        let caps = context.device_caps()?;

        let formats = Formats {
            color: caps.pick_render_target_format(SOURCE, &COLOR_FORMATS),
            depth: caps.pick_render_target_format(SOURCE, &DEPTH_FORMATS),
            motion_vec: caps.pick_render_target_format(SOURCE, &MOTION_VEC_FORMATS),
        };
        let depth_texture_support = caps.texture_format_support(TextureFormat::D16_UNORM);
        engine_info!(
            SOURCE,
            "Formats: color {:?}, depth {:?}, motion vectors {:?} (depth texture {})",
            formats.color,
            formats.depth,
            formats.motion_vec,
            depth_texture_support
        );

        // Meshes and objects
        let layout = geometry::make_cube_layout(&context)?;
        let bounds = geometry::cube_bounds();
        let instanced_mesh = scene.add_renderable(Box::new(MotionBlurMesh::new(
            &context,
            MeshVariant::Instanced,
            layout,
            bounds,
        )?))?;
        let non_instanced_mesh = scene.add_renderable(Box::new(MotionBlurMesh::new(
            &context,
            MeshVariant::NonInstanced,
            layout,
            bounds,
        )?))?;

        let motion_frames = context.config().motion_frames;
        for line in 0..NUM_LINE {
            let color = geometry::line_color(line);
            for index in 0..NUM_INSTANCE / NUM_LINE {
                let model = geometry::instance_transform(line, index);
                scene.add_object(Box::new(MovingInstance::new(instanced_mesh, model, color, motion_frames)));
            }
        }

        // Render targets
        let (clr_depth_fb, motion_vec_fb) = context.with_factory(|f| Ok((f.make_frame_buffer()?, f.make_frame_buffer()?)))?;
        let targets = make_targets(&context, &formats, depth_texture_support, width, height)?;
        attach_targets(&context, clr_depth_fb, motion_vec_fb, &targets)?;

        let depth_to_linear = match targets.ds_tex {
            Some(ds_tex) => {
                let mut pass = PostProcessPass::new(&context, &library::depth_to_linear())?;
                pass.set_input_pin(0, ds_tex)?;
                pass.set_output_pin(0, targets.depth_tex)?;
                Some(pass)
            }
            None => None,
        };

        // Post-process graph
        let mut graph = PostProcessGraph::new(&context, width, height);
        let slots = Slots {
            color: graph.import_slot("color", targets.color_tex),
            depth: graph.import_slot("depth", targets.depth_tex),
            motion_vec: graph.import_slot("motion_vec", targets.motion_vec_tex),
        };
        let blurred = graph.add_owned_slot("blurred", formats.color)?;

        let motion_blur = graph.add_stage(MotionBlur::new(&context)?);
        graph.connect_input(motion_blur, "color_tex", slots.color)?;
        graph.connect_input(motion_blur, "depth_tex", slots.depth)?;
        graph.connect_input(motion_blur, "motion_vec_tex", slots.motion_vec)?;
        graph.connect_output(motion_blur, "output", blurred)?;

        let motion_blur_copy = graph.add_stage(PostProcessPass::new(&context, &library::copy())?);
        graph.set_enabled(motion_blur_copy, false)?;
        graph.connect_input(motion_blur_copy, "src_tex", slots.color)?;
        graph.connect_output(motion_blur_copy, "output", blurred)?;

        let depth_of_field = graph.add_stage(DepthOfField::new(&context)?);
        graph.connect_input(depth_of_field, "color_tex", blurred)?;
        graph.connect_input(depth_of_field, "depth_tex", slots.depth)?;

        let depth_of_field_copy = graph.add_stage(PostProcessPass::new(&context, &library::copy())?);
        graph.set_enabled(depth_of_field_copy, false)?;
        graph.connect_input(depth_of_field_copy, "src_tex", blurred)?;

        let bokeh_filter = if caps.max_shader_model >= 3 {
            let bokeh = graph.add_stage(BokehFilter::new(&context)?);
            graph.connect_input(bokeh, "color_tex", blurred)?;
            graph.connect_input(bokeh, "depth_tex", slots.depth)?;
            Some(bokeh)
        } else {
            None
        };

        let order = graph.compile()?.len();
        engine_debug!(SOURCE, "Post-process graph: {} stages, {} enabled", graph.stage_count(), order);

        Ok(Self {
            context,
            size: (width, height),
            formats,
            depth_texture_support,
            clr_depth_fb,
            motion_vec_fb,
            targets,
            depth_to_linear,
            graph,
            stages: Stages {
                motion_blur,
                motion_blur_copy,
                depth_of_field,
                depth_of_field_copy,
                bokeh_filter,
            },
            slots,
            instanced_mesh,
            non_instanced_mesh,
            mb_on: true,
            dof_on: true,
            bokeh_on: true,
            use_instancing: true,
            frames: 0,
            last_stats: SceneStats::default(),
        })
    }

    /// Reallocate screen-sized targets and every stage sized from them
    pub fn on_resize(&mut self, scene: &mut SceneManager, width: u32, height: u32) -> Result<()> {
        if (width, height) == self.size {
            return Ok(());
        }

        let targets = make_targets(&self.context, &self.formats, self.depth_texture_support, width, height)?;
        attach_targets(&self.context, self.clr_depth_fb, self.motion_vec_fb, &targets)?;

        if let (Some(pass), Some(ds_tex)) = (self.depth_to_linear.as_mut(), targets.ds_tex) {
            pass.set_input_pin(0, ds_tex)?;
            pass.set_output_pin(0, targets.depth_tex)?;
        }
        self.graph.set_imported_texture(self.slots.color, targets.color_tex)?;
        self.graph.set_imported_texture(self.slots.depth, targets.depth_tex)?;
        self.graph.set_imported_texture(self.slots.motion_vec, targets.motion_vec_tex)?;
        self.graph.resize(width, height)?;

        let old = std::mem::replace(&mut self.targets, targets);
        release_targets(&self.context, &old)?;

        let camera = make_camera(width, height);
        scene
            .camera_mut()
            .set_projection(*camera.projection_matrix(), NEAR_PLANE, FAR_PLANE);

        self.size = (width, height);
        engine_info!(SOURCE, "Resized to {}x{}", width, height);
        Ok(())
    }

    // ===== TOGGLES =====

    pub fn set_motion_blur(&mut self, on: bool) -> Result<()> {
        let (enable, disable) = if on {
            (self.stages.motion_blur, self.stages.motion_blur_copy)
        } else {
            (self.stages.motion_blur_copy, self.stages.motion_blur)
        };
        self.graph.set_enabled(disable, false)?;
        self.graph.set_enabled(enable, true)?;
        self.mb_on = on;
        Ok(())
    }

    pub fn set_depth_of_field(&mut self, on: bool) -> Result<()> {
        self.dof_on = on;
        self.graph.set_enabled(self.stages.depth_of_field, on)?;
        self.graph.set_enabled(self.stages.depth_of_field_copy, !on)?;
        self.sync_bokeh()
    }

    pub fn set_bokeh(&mut self, on: bool) -> Result<()> {
        self.bokeh_on = on;
        self.sync_bokeh()
    }

    fn sync_bokeh(&mut self) -> Result<()> {
        match self.stages.bokeh_filter {
            Some(bokeh) => self.graph.set_enabled(bokeh, self.dof_on && self.bokeh_on),
            None => Ok(()),
        }
    }

    pub fn set_focus_plane(&mut self, focus_plane: f32) {
        if let Some(dof) = self.graph.stage_as_mut::<DepthOfField>(self.stages.depth_of_field) {
            dof.set_focus_plane(focus_plane);
        }
        if let Some(bokeh) = self.bokeh_mut() {
            bokeh.set_focus_plane(focus_plane);
        }
    }

    pub fn set_focus_range(&mut self, focus_range: f32) {
        if let Some(dof) = self.graph.stage_as_mut::<DepthOfField>(self.stages.depth_of_field) {
            dof.set_focus_range(focus_range);
        }
        if let Some(bokeh) = self.bokeh_mut() {
            bokeh.set_focus_range(focus_range);
        }
    }

    fn bokeh_mut(&mut self) -> Option<&mut BokehFilter> {
        let id = self.stages.bokeh_filter?;
        self.graph.stage_as_mut::<BokehFilter>(id)
    }

    pub fn set_show_blur_factor(&mut self, show: bool) {
        if let Some(dof) = self.graph.stage_as_mut::<DepthOfField>(self.stages.depth_of_field) {
            dof.show_blur_factor(show);
        }
    }

    pub fn set_show_motion_vector(&mut self, show: bool) {
        if let Some(blur) = self.graph.stage_as_mut::<MotionBlur>(self.stages.motion_blur) {
            blur.show_motion_vector(show);
        }
    }

    /// Draw every object with the instanced or the non-instanced mesh
    pub fn set_use_instancing(&mut self, scene: &mut SceneManager, on: bool) {
        self.use_instancing = on;
        let mesh = if on { self.instanced_mesh } else { self.non_instanced_mesh };
        scene.set_renderable_for_all(mesh);
    }

    // ===== QUERIES =====

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    /// Scene statistics of the color/depth pass of the last frame
    pub fn last_stats(&self) -> &SceneStats {
        &self.last_stats
    }

    pub fn graph(&self) -> &PostProcessGraph {
        &self.graph
    }

    pub fn is_motion_blur_on(&self) -> bool {
        self.mb_on
    }

    pub fn is_depth_of_field_on(&self) -> bool {
        self.dof_on
    }

    pub fn is_instancing(&self) -> bool {
        self.use_instancing
    }

    // ===== PASSES =====

    fn color_depth_pass(&mut self, scene: &mut SceneManager) -> Result<()> {
        scene.camera_mut().update();
        let near_q = scene.camera().linear_depth_params();
        if let Some(pass) = self.depth_to_linear.as_mut() {
            pass.set_param(0, near_q);
        }

        let fb = self.clr_depth_fb;
        self.context.with_render_engine(|re| {
            re.bind_frame_buffer(Some(fb))?;
            re.clear(ClearFlags::COLOR | ClearFlags::DEPTH, CLEAR_COLOR, 1.0, 0)
        })?;
        scene.motion_vec_pass(false);
        Ok(())
    }

    fn motion_vec_pass(&mut self, scene: &mut SceneManager) -> Result<()> {
        // linearize before the motion-vector pass clears the shared depth buffer
        if let Some(pass) = self.depth_to_linear.as_mut() {
            pass.apply()?;
        }

        let fb = self.motion_vec_fb;
        self.context.with_render_engine(|re| {
            re.bind_frame_buffer(Some(fb))?;
            re.clear(ClearFlags::COLOR | ClearFlags::DEPTH, MOTION_VEC_CLEAR, 1.0, 0)
        })?;
        scene.motion_vec_pass(true);
        Ok(())
    }

    fn post_process_pass(&mut self) -> Result<()> {
        let (color, depth) = (self.targets.color_tex, self.targets.depth_tex);
        self.context.with_render_engine(|re| {
            re.generate_mips(color)?;
            re.generate_mips(depth)
        })?;

        self.graph.execute()?;

        self.context.with_render_engine(|re| {
            re.bind_frame_buffer(None)?;
            re.clear(ClearFlags::DEPTH, Vec4::ZERO, 1.0, 0)
        })
    }
}

impl App for MotionBlurDoFApp {
    fn update(
        &mut self,
        scene: &mut SceneManager,
        pass: u32,
        _app_time: f32,
        _elapsed: f32,
    ) -> Result<UpdateResult> {
        match pass {
            0 => {
                self.color_depth_pass(scene)?;
                Ok(UpdateResult::NEED_FLUSH)
            }
            1 => {
                self.last_stats = *scene.stats();
                self.motion_vec_pass(scene)?;
                Ok(UpdateResult::NEED_FLUSH)
            }
            _ => {
                self.post_process_pass()?;
                self.frames += 1;
                Ok(UpdateResult::FINISHED)
            }
        }
    }
}

impl Drop for MotionBlurDoFApp {
    fn drop(&mut self) {
        let _ = release_targets(&self.context, &self.targets);
        let (clr_depth_fb, motion_vec_fb) = (self.clr_depth_fb, self.motion_vec_fb);
        let _ = self.context.with_factory(|f| {
            f.release_frame_buffer(clr_depth_fb);
            f.release_frame_buffer(motion_vec_fb);
            Ok(())
        });
    }
}

fn mipped_target(width: u32, height: u32, format: TextureFormat) -> TextureDesc {
    TextureDesc {
        width,
        height,
        mip_levels: 2,
        format,
        access: AccessHint::GPU_READ | AccessHint::GPU_WRITE | AccessHint::GENERATE_MIPS,
    }
}

fn make_targets(
    context: &EngineContext,
    formats: &Formats,
    depth_texture_support: bool,
    width: u32,
    height: u32,
) -> Result<RenderTargets> {
    context.with_factory(|f| {
        let ds_tex = if depth_texture_support {
            Some(f.make_texture_2d(&TextureDesc::render_target(width, height, TextureFormat::D16_UNORM))?)
        } else {
            None
        };
        Ok(RenderTargets {
            ds_tex,
            depth_tex: f.make_texture_2d(&mipped_target(width, height, formats.depth))?,
            color_tex: f.make_texture_2d(&mipped_target(width, height, formats.color))?,
            motion_vec_tex: f.make_texture_2d(&TextureDesc::render_target(width, height, formats.motion_vec))?,
        })
    })
}

fn attach_targets(
    context: &EngineContext,
    clr_depth_fb: FrameBufferHandle,
    motion_vec_fb: FrameBufferHandle,
    targets: &RenderTargets,
) -> Result<()> {
    context.with_factory(|f| {
        f.attach(clr_depth_fb, Attachment::Color0, targets.color_tex)?;
        f.attach(motion_vec_fb, Attachment::Color0, targets.motion_vec_tex)?;
        if let Some(ds_tex) = targets.ds_tex {
            f.attach(clr_depth_fb, Attachment::DepthStencil, ds_tex)?;
            f.attach(motion_vec_fb, Attachment::DepthStencil, ds_tex)?;
        }
        Ok(())
    })
}

fn release_targets(context: &EngineContext, targets: &RenderTargets) -> Result<()> {
    context.with_factory(|f| {
        for texture in [Some(targets.color_tex), Some(targets.depth_tex), Some(targets.motion_vec_tex), targets.ds_tex]
            .into_iter()
            .flatten()
        {
            f.release_texture(texture);
        }
        Ok(())
    })
}
