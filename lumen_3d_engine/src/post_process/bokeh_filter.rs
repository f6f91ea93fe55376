/// Bokeh filter stage.
///
/// Splats one sprite per 2x2 block of the half-resolution input into a wide
/// bokeh texture (foreground and background halves side by side), then a
/// merge pass composites the bokeh texture over the input.

use glam::{Vec2, Vec4};
use slotmap::Key;
use crate::engine::EngineContext;
use crate::error::Result;
use crate::render_engine::{
    ClearFlags, FrameBufferHandle, ParamHandle, ParamValue, PrimitiveTopology, TechniqueHandle,
    TextureDesc, TextureFormat, TextureHandle, Attachment, PRIMITIVE_RESTART_U32,
};
use super::depth_of_field::focus_inv_range;
use super::library::{self, DEPTH_OF_FIELD_EFFECT};
use super::pin::{PinDirection, PinSet};
use super::post_process::{
    resolve_params, texture_info, PostProcess, PostProcessPass, StageGeometry, StageState,
};
use super::summed_area_table::size_param;

const GS_TECHNIQUE: &str = "SeparateBokeh4";
const QUAD_TECHNIQUE: &str = "SeparateBokeh";

/// Preferred bokeh texture formats, best first
const BOKEH_FORMATS: [TextureFormat; 2] =
    [TextureFormat::B10G11R11_UFLOAT, TextureFormat::R16G16B16A16_SFLOAT];

/// Half-resolution input size and bokeh texture size for an input extent
pub fn bokeh_extents(width: u32, height: u32, max_radius: u32) -> ((u32, u32), (u32, u32)) {
    let (in_w, in_h) = (width / 2, height / 2);
    ((in_w, in_h), (in_w * 2 + max_radius * 4, in_h))
}

/// Sprite centres, one per 2x2 block of the `in_w` x `in_h` grid
fn splat_points(in_w: u32, in_h: u32) -> Vec<Vec2> {
    let mut points = Vec::with_capacity(((in_w / 2 + 1) * (in_h / 2 + 1)) as usize);
    for y in (0..in_h).step_by(2) {
        for x in (0..in_w).step_by(2) {
            points.push(Vec2::new((x as f32 + 0.5) / in_w as f32, (y as f32 + 0.5) / in_h as f32));
        }
    }
    points
}

/// Expand sprite centres into corner vertices `(u, v, corner.x, corner.y)`
/// plus the index list drawing them
fn splat_quads(points: &[Vec2], primitive_restart: bool) -> (PrimitiveTopology, Vec<Vec4>, Vec<u32>) {
    const CORNERS: [Vec2; 4] = [
        Vec2::new(-1.0, -1.0),
        Vec2::new(1.0, -1.0),
        Vec2::new(-1.0, 1.0),
        Vec2::new(1.0, 1.0),
    ];

    let vertices = points
        .iter()
        .flat_map(|p| CORNERS.iter().map(move |c| Vec4::new(p.x, p.y, c.x, c.y)))
        .collect();

    let count = points.len() as u32;
    if primitive_restart {
        let indices = (0..count)
            .flat_map(|i| {
                let b = i * 4;
                [b, b + 1, b + 2, b + 3, PRIMITIVE_RESTART_U32]
            })
            .collect();
        (PrimitiveTopology::TriangleStrip, vertices, indices)
    } else {
        let indices = (0..count)
            .flat_map(|i| {
                let b = i * 4;
                [b, b + 1, b + 2, b + 2, b + 1, b + 3]
            })
            .collect();
        (PrimitiveTopology::TriangleList, vertices, indices)
    }
}

#[derive(Debug, Clone, Copy)]
struct BokehParams {
    in_width_height: ParamHandle,
    bokeh_width_height: ParamHandle,
    background_offset: ParamHandle,
    max_radius: ParamHandle,
    focus_plane_inv_range: ParamHandle,
    focus_plane: ParamHandle,
    color_tex: ParamHandle,
    depth_tex: ParamHandle,
}

/// Sizes derived from the bound input, written on every apply
#[derive(Debug, Clone, Copy)]
struct BokehLayout {
    input: (u32, u32),
    in_width_height: Vec4,
    bokeh_width_height: Vec4,
    background_offset: f32,
}

/// Sprite-splat bokeh.
///
/// Input pins: 0 `color_tex`, 1 `depth_tex`. On geometry-shader tier devices
/// the sprites are a point list expanded on the GPU; otherwise every sprite is
/// four vertices, drawn as a restarted strip or as a triangle list.
pub struct BokehFilter {
    context: EngineContext,
    max_radius: u32,
    geometry_shader: bool,
    primitive_restart: bool,
    inputs: PinSet,
    outputs: PinSet,
    technique: TechniqueHandle,
    params: BokehParams,
    frame_buffer: FrameBufferHandle,
    bokeh_tex: Option<TextureHandle>,
    splats: Option<StageGeometry>,
    layout: Option<BokehLayout>,
    merge: PostProcessPass,
    focus_plane: f32,
    focus_range: f32,
    state: StageState,
}

impl BokehFilter {
    const NAME: &'static str = "BokehFilter";

    /// Blur radius from the engine configuration
    pub fn new(context: &EngineContext) -> Result<Self> {
        Self::with_max_radius(context, context.config().max_blur_radius)
    }

    pub fn with_max_radius(context: &EngineContext, max_radius: u32) -> Result<Self> {
        let caps = context.device_caps()?;
        let geometry_shader = caps.geometry_shader_tier();

        let (technique, params, frame_buffer) = context.with_factory(|f| {
            let effect = f.load_effect(DEPTH_OF_FIELD_EFFECT)?;
            let technique = f.technique_by_name(
                effect,
                if geometry_shader { GS_TECHNIQUE } else { QUAD_TECHNIQUE },
            )?;
            let p = resolve_params(
                f,
                effect,
                &[
                    "in_width_height",
                    "bokeh_width_height",
                    "background_offset",
                    "max_radius",
                    "focus_plane_inv_range",
                    "focus_plane",
                    "color_tex",
                    "depth_tex",
                ],
            )?;
            let params = BokehParams {
                in_width_height: p[0],
                bokeh_width_height: p[1],
                background_offset: p[2],
                max_radius: p[3],
                focus_plane_inv_range: p[4],
                focus_plane: p[5],
                color_tex: p[6],
                depth_tex: p[7],
            };
            Ok((technique, params, f.make_frame_buffer()?))
        })?;

        let mut merge = PostProcessPass::new(context, &library::merge_bokeh())?;
        merge.set_param(2, max_radius as f32);

        crate::engine_debug!(
            "lumen3d::BokehFilter",
            "Created bokeh filter (max radius {}, {})",
            max_radius,
            if geometry_shader { "point sprites" } else { "expanded quads" }
        );

        Ok(Self {
            context: context.clone(),
            max_radius,
            geometry_shader,
            primitive_restart: caps.primitive_restart_support,
            inputs: PinSet::new(PinDirection::Input, &["color_tex", "depth_tex"]),
            outputs: PinSet::new(PinDirection::Output, &["output"]),
            technique,
            params,
            frame_buffer,
            bokeh_tex: None,
            splats: None,
            layout: None,
            merge,
            focus_plane: 1.0,
            focus_range: 1.0,
            state: StageState::Unconfigured,
        })
    }

    pub fn max_radius(&self) -> u32 {
        self.max_radius
    }

    pub fn uses_geometry_shader(&self) -> bool {
        self.geometry_shader
    }

    pub fn focus_plane(&self) -> f32 {
        self.focus_plane
    }

    pub fn set_focus_plane(&mut self, focus_plane: f32) {
        self.focus_plane = focus_plane;
    }

    pub fn focus_range(&self) -> f32 {
        self.focus_range
    }

    pub fn set_focus_range(&mut self, focus_range: f32) {
        self.focus_range = focus_range;
    }

    pub fn bokeh_texture(&self) -> Option<TextureHandle> {
        self.bokeh_tex
    }

    /// Render layout of the sprite geometry
    pub fn splat_layout(&self) -> Option<crate::render_engine::RenderLayoutHandle> {
        self.splats.map(|s| s.layout())
    }

    fn allocate(&mut self, width: u32, height: u32) -> Result<()> {
        if width < 2 || height < 2 {
            crate::engine_fatal!(Self::NAME, "Input {}x{} is smaller than 2x2", width, height);
        }

        let ((in_w, in_h), (out_w, out_h)) = bokeh_extents(width, height, self.max_radius);
        let format = self.context.device_caps()?.pick_render_target_format(Self::NAME, &BOKEH_FORMATS);
        let points = splat_points(in_w, in_h);
        let (geometry_shader, primitive_restart) = (self.geometry_shader, self.primitive_restart);

        let previous = (self.bokeh_tex.take(), self.splats.take());
        let frame_buffer = self.frame_buffer;
        let (bokeh_tex, splats) = self.context.with_factory(|f| {
            if let Some(tex) = previous.0 {
                f.release_texture(tex);
            }
            if let Some(splats) = previous.1 {
                splats.release(f);
            }

            let tex = f.make_texture_2d(&TextureDesc::render_target(out_w, out_h, format))?;
            f.attach(frame_buffer, Attachment::Color0, tex)?;

            let splats = if geometry_shader {
                StageGeometry::new(f, PrimitiveTopology::PointList, TextureFormat::R32G32_SFLOAT, &points, None)?
            } else {
                let (topology, vertices, indices) = splat_quads(&points, primitive_restart);
                StageGeometry::new(f, topology, TextureFormat::R32G32B32A32_SFLOAT, &vertices, Some(&indices))?
            };
            Ok((tex, splats))
        })?;
        self.bokeh_tex = Some(bokeh_tex);
        self.splats = Some(splats);

        let layout = BokehLayout {
            input: (width, height),
            in_width_height: size_param(in_w, in_h),
            bokeh_width_height: size_param(out_w, out_h),
            background_offset: (in_w + self.max_radius * 4) as f32,
        };
        self.merge.set_param(0, layout.in_width_height);
        self.merge.set_param(1, layout.bokeh_width_height);
        self.merge.set_param(5, layout.background_offset);
        self.merge.set_input_pin(0, bokeh_tex)?;
        self.layout = Some(layout);

        crate::engine_debug!(
            "lumen3d::BokehFilter",
            "Allocated {}x{} {:?} bokeh texture, {} sprites",
            out_w,
            out_h,
            format,
            points.len()
        );
        Ok(())
    }
}

impl PostProcess for BokehFilter {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn input_pins(&self) -> &PinSet {
        &self.inputs
    }

    fn output_pins(&self) -> &PinSet {
        &self.outputs
    }

    fn set_input_pin(&mut self, index: usize, texture: TextureHandle) -> Result<()> {
        self.inputs.bind(Self::NAME, index, texture);

        if index == 0 {
            let info = texture_info(&self.context, Self::NAME, texture)?;
            if self.layout.map(|l| l.input) != Some((info.width, info.height)) {
                self.allocate(info.width, info.height)?;
                self.state = StageState::Unconfigured;
            }
        }
        if self.state == StageState::Unconfigured && self.inputs.all_bound() {
            self.state = StageState::Bound;
        }
        Ok(())
    }

    /// The merge pass writes the stage output
    fn set_output_pin(&mut self, index: usize, texture: TextureHandle) -> Result<()> {
        self.outputs.bind(Self::NAME, index, texture);
        self.merge.set_output_pin(index, texture)
    }

    fn unbind_output_pin(&mut self, index: usize) -> Result<()> {
        self.outputs.unbind(Self::NAME, index);
        self.merge.unbind_output_pin(index)
    }

    fn apply(&mut self) -> Result<()> {
        let color = self.inputs.require(Self::NAME, 0);
        let depth = self.inputs.require(Self::NAME, 1);
        let (Some(layout), Some(splats)) = (self.layout, self.splats) else {
            crate::engine_fatal!(Self::NAME, "Applied before the bokeh texture was allocated");
        };

        let focus = focus_inv_range(self.focus_plane, self.focus_range);
        let p = self.params;
        let values = [
            (p.in_width_height, ParamValue::from(layout.in_width_height)),
            (p.bokeh_width_height, layout.bokeh_width_height.into()),
            (p.background_offset, layout.background_offset.into()),
            (p.max_radius, (self.max_radius as f32).into()),
            (p.focus_plane_inv_range, focus.into()),
            (p.focus_plane, self.focus_plane.into()),
            (p.color_tex, color.into()),
            (p.depth_tex, depth.into()),
        ];
        let (technique, frame_buffer) = (self.technique, self.frame_buffer);
        self.context.with_render_engine(|re| {
            for (param, value) in values {
                re.set_param(param, value)?;
            }
            re.bind_frame_buffer(Some(frame_buffer))?;
            re.clear(ClearFlags::COLOR, Vec4::ZERO, 1.0, 0)?;
            re.set_render_effect(technique)?;
            re.render(splats.layout(), 1)
        })?;

        self.merge.set_param(3, focus);
        self.merge.set_param(4, self.focus_plane);
        self.merge.set_input_pin(1, depth)?;
        self.merge.apply()?;

        crate::engine_trace!("lumen3d::BokehFilter", "Applied bokeh filter");
        self.state = StageState::Ready;
        Ok(())
    }

    fn state(&self) -> StageState {
        self.state
    }
}

impl Drop for BokehFilter {
    fn drop(&mut self) {
        let frame_buffer = self.frame_buffer;
        let bokeh_tex = self.bokeh_tex.take();
        let splats = self.splats.take();
        let _ = self.context.with_factory(|f| {
            if !frame_buffer.is_null() {
                f.release_frame_buffer(frame_buffer);
            }
            if let Some(tex) = bokeh_tex {
                f.release_texture(tex);
            }
            if let Some(splats) = splats {
                splats.release(f);
            }
            Ok(())
        });
    }
}

#[cfg(test)]
#[path = "bokeh_filter_tests.rs"]
mod tests;
