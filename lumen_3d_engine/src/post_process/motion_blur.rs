/// Motion blur stage: colour, depth and motion vectors in, blurred colour out.

use crate::engine::EngineContext;
use crate::error::Result;
use crate::render_engine::{TechniqueHandle, TextureHandle};
use super::library::MOTION_BLUR_PP_EFFECT;
use super::pin::PinSet;
use super::post_process::{PostProcess, PostProcessDesc, PostProcessPass, StageState};

const BLUR_TECHNIQUE: &str = "MotionBlur";
const MOTION_VEC_TECHNIQUE: &str = "MotionBlurMotionVec";

/// Single-pass motion blur.
///
/// Input pins: 0 `color_tex`, 1 `depth_tex`, 2 `motion_vec_tex`.
/// The debug view writes the motion vectors instead of the blurred colour;
/// both techniques are resolved at construction.
pub struct MotionBlur {
    pass: PostProcessPass,
    blur_technique: TechniqueHandle,
    motion_vec_technique: TechniqueHandle,
    show_motion_vec: bool,
}

impl MotionBlur {
    pub fn new(context: &EngineContext) -> Result<Self> {
        let desc = PostProcessDesc::new("MotionBlur", MOTION_BLUR_PP_EFFECT, BLUR_TECHNIQUE)
            .inputs(&["color_tex", "depth_tex", "motion_vec_tex"]);
        let pass = PostProcessPass::new(context, &desc)?;
        let motion_vec_technique = pass.resolve_technique(MOTION_VEC_TECHNIQUE)?;

        Ok(Self {
            blur_technique: pass.technique(),
            motion_vec_technique,
            pass,
            show_motion_vec: false,
        })
    }

    pub fn show_motion_vector(&mut self, show: bool) {
        self.show_motion_vec = show;
        self.pass.set_technique(if show {
            self.motion_vec_technique
        } else {
            self.blur_technique
        });
    }

    pub fn is_showing_motion_vector(&self) -> bool {
        self.show_motion_vec
    }
}

impl PostProcess for MotionBlur {
    fn name(&self) -> &str {
        self.pass.name()
    }

    fn input_pins(&self) -> &PinSet {
        self.pass.input_pins()
    }

    fn output_pins(&self) -> &PinSet {
        self.pass.output_pins()
    }

    fn set_input_pin(&mut self, index: usize, texture: TextureHandle) -> Result<()> {
        self.pass.set_input_pin(index, texture)
    }

    fn set_output_pin(&mut self, index: usize, texture: TextureHandle) -> Result<()> {
        self.pass.set_output_pin(index, texture)
    }

    fn unbind_output_pin(&mut self, index: usize) -> Result<()> {
        self.pass.unbind_output_pin(index)
    }

    fn apply(&mut self) -> Result<()> {
        self.pass.apply()
    }

    fn state(&self) -> StageState {
        self.pass.state()
    }
}

#[cfg(test)]
#[path = "motion_blur_tests.rs"]
mod tests;
