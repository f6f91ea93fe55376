/// Depth-of-field stage.
///
/// Spreads every colour texel over its circle of confusion into a padded
/// RGBA32F texture, turns that into a summed-area table, then a normalization
/// quad reads box averages back out of the table, cropping the margin.

use glam::{Vec2, Vec4};
use slotmap::Key;
use crate::engine::EngineContext;
use crate::error::Result;
use crate::render_engine::{
    AccessHint, Attachment, FrameBufferHandle, ParamHandle, PrimitiveTopology, TechniqueHandle,
    TextureDesc, TextureFormat, TextureHandle,
};
use super::library::{self, DEPTH_OF_FIELD_EFFECT};
use super::pin::{PinDirection, PinSet};
use super::post_process::{
    resolve_params, texture_info, PostProcess, PostProcessDesc, PostProcessPass, StageGeometry,
    StageState,
};
use super::summed_area_table::{size_param, SummedAreaTable};

const NORMALIZATION_TECHNIQUE: &str = "DepthOfFieldNormalization";
const BLUR_FACTOR_TECHNIQUE: &str = "DepthOfFieldBlurFactor";

/// `(-plane / range, 1 / range)`: maps view depth to a signed blur factor
pub(crate) fn focus_inv_range(focus_plane: f32, focus_range: f32) -> Vec2 {
    Vec2::new(-focus_plane / focus_range, 1.0 / focus_range)
}

/// Spread texture extent for an input extent and blur radius
pub fn spread_extent(extent: u32, max_radius: u32) -> u32 {
    extent + max_radius * 4 + 1
}

/// Four clip-space corners with the texture coordinates that crop the
/// `2r` margin of a `width` x `height` spread texture
fn normalization_corners(width: u32, height: u32, max_radius: u32) -> [Vec4; 4] {
    let (w, h) = (width as f32, height as f32);
    let margin = (max_radius * 2) as f32;
    let (u0, v0) = (margin / w, margin / h);
    let (u1, v1) = (1.0 - (margin + 1.0) / w, 1.0 - (margin + 1.0) / h);
    [
        Vec4::new(-1.0, 1.0, u0, v0),
        Vec4::new(1.0, 1.0, u1, v0),
        Vec4::new(-1.0, -1.0, u0, v1),
        Vec4::new(1.0, -1.0, u1, v1),
    ]
}

/// Summed-area-table depth of field.
///
/// Input pins: 0 `color_tex`, 1 `depth_tex` (linear view depth).
/// Binding input 0 with new dimensions reallocates the spread texture and the
/// normalization quad.
pub struct DepthOfField {
    context: EngineContext,
    max_radius: u32,
    compute: bool,
    inputs: PinSet,
    outputs: PinSet,
    spreading: PostProcessPass,
    sat: SummedAreaTable,
    blur_factor: PostProcessPass,
    normalization: TechniqueHandle,
    src_tex_param: ParamHandle,
    frame_buffer: FrameBufferHandle,
    spread_tex: Option<TextureHandle>,
    quad: Option<StageGeometry>,
    size: Option<(u32, u32)>,
    focus_plane: f32,
    focus_range: f32,
    show_blur_factor: bool,
    state: StageState,
}

impl DepthOfField {
    const NAME: &'static str = "DepthOfField";

    /// Blur radius from the engine configuration
    pub fn new(context: &EngineContext) -> Result<Self> {
        Self::with_max_radius(context, context.config().max_blur_radius)
    }

    pub fn with_max_radius(context: &EngineContext, max_radius: u32) -> Result<Self> {
        let compute = context.compute_enabled()?;

        let mut spreading = PostProcessPass::new(context, &library::spreading(compute))?;
        spreading.set_param(1, max_radius as f32);

        let sat = SummedAreaTable::with_variant(context, compute)?;

        let blur_factor = PostProcessPass::new(
            context,
            &PostProcessDesc::new("blur_factor", DEPTH_OF_FIELD_EFFECT, BLUR_FACTOR_TECHNIQUE)
                .inputs(&["color_tex", "depth_tex"])
                .params(&["focus_plane_inv_range"]),
        )?;

        let (normalization, src_tex_param, frame_buffer) = context.with_factory(|f| {
            let effect = f.load_effect(DEPTH_OF_FIELD_EFFECT)?;
            let technique = f.technique_by_name(effect, NORMALIZATION_TECHNIQUE)?;
            let params = resolve_params(f, effect, &["src_tex"])?;
            Ok((technique, params[0], f.make_frame_buffer()?))
        })?;

        crate::engine_debug!(
            "lumen3d::DepthOfField",
            "Created depth of field (max radius {}, {})",
            max_radius,
            if compute { "compute" } else { "raster" }
        );

        Ok(Self {
            context: context.clone(),
            max_radius,
            compute,
            inputs: PinSet::new(PinDirection::Input, &["color_tex", "depth_tex"]),
            outputs: PinSet::new(PinDirection::Output, &["output"]),
            spreading,
            sat,
            blur_factor,
            normalization,
            src_tex_param,
            frame_buffer,
            spread_tex: None,
            quad: None,
            size: None,
            focus_plane: 1.0,
            focus_range: 1.0,
            show_blur_factor: false,
            state: StageState::Unconfigured,
        })
    }

    pub fn max_radius(&self) -> u32 {
        self.max_radius
    }

    pub fn is_compute(&self) -> bool {
        self.compute
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

    /// Debug view: write the per-pixel blur factor instead of the blurred image
    pub fn show_blur_factor(&mut self, show: bool) {
        self.show_blur_factor = show;
    }

    pub fn is_showing_blur_factor(&self) -> bool {
        self.show_blur_factor
    }

    pub fn spread_texture(&self) -> Option<TextureHandle> {
        self.spread_tex
    }

    pub fn spread_size(&self) -> Option<(u32, u32)> {
        self.size.map(|(w, h)| (spread_extent(w, self.max_radius), spread_extent(h, self.max_radius)))
    }

    fn allocate(&mut self, width: u32, height: u32) -> Result<()> {
        let spread_w = spread_extent(width, self.max_radius);
        let spread_h = spread_extent(height, self.max_radius);
        let mut access = AccessHint::GPU_READ | AccessHint::GPU_WRITE;
        if self.compute {
            access |= AccessHint::GPU_UNORDERED;
        }
        let desc = TextureDesc {
            width: spread_w,
            height: spread_h,
            mip_levels: 1,
            format: TextureFormat::R32G32B32A32_SFLOAT,
            access,
        };
        let corners = normalization_corners(spread_w, spread_h, self.max_radius);

        let previous = (self.spread_tex.take(), self.quad.take());
        let (spread_tex, quad) = self.context.with_factory(|f| {
            if let Some(tex) = previous.0 {
                f.release_texture(tex);
            }
            if let Some(quad) = previous.1 {
                quad.release(f);
            }
            let tex = f.make_texture_2d(&desc)?;
            let quad = StageGeometry::new(
                f,
                PrimitiveTopology::TriangleStrip,
                TextureFormat::R32G32B32A32_SFLOAT,
                &corners,
                None,
            )?;
            Ok((tex, quad))
        })?;
        self.spread_tex = Some(spread_tex);
        self.quad = Some(quad);

        self.spreading.set_param(0, size_param(spread_w, spread_h));
        self.spreading.set_output_pin(0, spread_tex)?;
        self.sat.set_input_pin(0, spread_tex)?;
        self.sat.set_output_pin(0, spread_tex)?;

        self.size = Some((width, height));
        crate::engine_debug!(
            "lumen3d::DepthOfField",
            "Allocated {}x{} spread texture for {}x{} input",
            spread_w,
            spread_h,
            width,
            height
        );
        Ok(())
    }

    fn apply_blur(&mut self, color: TextureHandle, depth: TextureHandle) -> Result<()> {
        self.spreading.set_param(2, focus_inv_range(self.focus_plane, self.focus_range));
        self.spreading.set_input_pin(0, color)?;
        self.spreading.set_input_pin(1, depth)?;
        self.spreading.apply()?;

        self.sat.apply()?;

        let (Some(spread_tex), Some(quad)) = (self.spread_tex, self.quad) else {
            crate::engine_fatal!(Self::NAME, "Applied before the spread texture was allocated");
        };
        let target = self.outputs.texture(0).map(|_| self.frame_buffer);
        let (normalization, src_tex_param) = (self.normalization, self.src_tex_param);
        self.context.with_render_engine(|re| {
            re.set_param(src_tex_param, spread_tex.into())?;
            re.bind_frame_buffer(target)?;
            re.set_render_effect(normalization)?;
            re.render(quad.layout(), 1)
        })
    }
}

impl PostProcess for DepthOfField {
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
        self.blur_factor.set_input_pin(index, texture)?;

        if index == 0 {
            let info = texture_info(&self.context, Self::NAME, texture)?;
            if self.size != Some((info.width, info.height)) {
                self.allocate(info.width, info.height)?;
                self.state = StageState::Unconfigured;
            }
        }
        if self.state == StageState::Unconfigured && self.inputs.all_bound() {
            self.state = StageState::Bound;
        }
        Ok(())
    }

    fn set_output_pin(&mut self, index: usize, texture: TextureHandle) -> Result<()> {
        let previous = self.outputs.bind(Self::NAME, index, texture);
        if previous != Some(texture) {
            let frame_buffer = self.frame_buffer;
            self.context.with_factory(|f| f.attach(frame_buffer, Attachment::Color0, texture))?;
        }
        self.blur_factor.set_output_pin(index, texture)
    }

    fn unbind_output_pin(&mut self, index: usize) -> Result<()> {
        self.outputs.unbind(Self::NAME, index);
        self.blur_factor.unbind_output_pin(index)
    }

    fn apply(&mut self) -> Result<()> {
        let color = self.inputs.require(Self::NAME, 0);
        let depth = self.inputs.require(Self::NAME, 1);

        if self.show_blur_factor {
            self.blur_factor.set_param(0, focus_inv_range(self.focus_plane, self.focus_range));
            self.blur_factor.apply()?;
        } else {
            self.apply_blur(color, depth)?;
        }

        crate::engine_trace!("lumen3d::DepthOfField", "Applied depth of field");
        self.state = StageState::Ready;
        Ok(())
    }

    fn state(&self) -> StageState {
        self.state
    }
}

impl Drop for DepthOfField {
    fn drop(&mut self) {
        let frame_buffer = self.frame_buffer;
        let spread_tex = self.spread_tex.take();
        let quad = self.quad.take();
        let _ = self.context.with_factory(|f| {
            if !frame_buffer.is_null() {
                f.release_frame_buffer(frame_buffer);
            }
            if let Some(tex) = spread_tex {
                f.release_texture(tex);
            }
            if let Some(quad) = quad {
                quad.release(f);
            }
            Ok(())
        });
    }
}

#[cfg(test)]
#[path = "depth_of_field_tests.rs"]
mod tests;
