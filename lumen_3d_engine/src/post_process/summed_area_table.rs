/// Summed-area table stage.
///
/// Turns `src_tex` into its 2D prefix sum in `output` (the two may be the
/// same texture). The compute variant scans every row then every column in
/// place on `output`. The raster variant runs separable scan passes of
/// [`SAT_TAPS_PER_PASS`] taps each, ping-ponging between `output` and an
/// intermediate texture of the same size and format.

use glam::Vec4;
use crate::engine::EngineContext;
use crate::error::Result;
use crate::render_engine::{TextureDesc, TextureHandle, TextureInfo};
use super::library::{self, SAT_TAPS_PER_PASS};
use super::pin::{PinDirection, PinSet};
use super::post_process::{texture_info, PostProcess, PostProcessPass, StageState};

/// Scan passes needed along one axis of `extent` texels (at least 1)
pub fn scan_passes(extent: u32) -> u32 {
    let taps = SAT_TAPS_PER_PASS as u64;
    let mut passes = 1;
    let mut reach = taps;
    while reach < extent as u64 {
        reach *= taps;
        passes += 1;
    }
    passes
}

/// `(w, h, 1/w, 1/h)`, the texture-size parameter layout shared by the
/// post-process effects
pub fn size_param(width: u32, height: u32) -> Vec4 {
    let (w, h) = (width as f32, height as f32);
    Vec4::new(w, h, 1.0 / w, 1.0 / h)
}

pub struct SummedAreaTable {
    context: EngineContext,
    compute: bool,
    inputs: PinSet,
    outputs: PinSet,
    scans: Vec<PostProcessPass>,
    copy: PostProcessPass,
    intermediate: Option<TextureHandle>,
    size: Option<(u32, u32)>,
    state: StageState,
}

impl SummedAreaTable {
    const NAME: &'static str = "SummedAreaTable";

    /// Picks the compute variant when the device and configuration allow it
    pub fn new(context: &EngineContext) -> Result<Self> {
        let compute = context.compute_enabled()?;
        Self::with_variant(context, compute)
    }

    pub fn with_variant(context: &EngineContext, compute: bool) -> Result<Self> {
        let scans = if compute {
            vec![
                PostProcessPass::new(context, &library::sat_scan_cs(false))?,
                PostProcessPass::new(context, &library::sat_scan_cs(true))?,
            ]
        } else {
            Vec::new()
        };

        crate::engine_debug!(
            "lumen3d::SummedAreaTable",
            "Created {} summed area table",
            if compute { "compute" } else { "raster" }
        );

        Ok(Self {
            context: context.clone(),
            compute,
            inputs: PinSet::new(PinDirection::Input, &["src_tex"]),
            outputs: PinSet::new(PinDirection::Output, &["output"]),
            scans,
            copy: PostProcessPass::new(context, &library::copy())?,
            intermediate: None,
            size: None,
            state: StageState::Unconfigured,
        })
    }

    pub fn is_compute(&self) -> bool {
        self.compute
    }

    /// Scan passes per frame (x passes then y passes)
    pub fn scan_pass_count(&self) -> usize {
        self.scans.len()
    }

    /// Ping-pong texture of the raster variant
    pub fn intermediate(&self) -> Option<TextureHandle> {
        self.intermediate
    }

    fn allocate(&mut self, source: TextureInfo) -> Result<()> {
        let (width, height) = (source.width, source.height);
        let tex_size = size_param(width, height);

        if self.compute {
            // in-place scans, nothing sized to allocate
            self.size = Some((width, height));
            return Ok(());
        }

        let previous = self.intermediate.take();
        let intermediate = self.context.with_factory(|f| {
            if let Some(previous) = previous {
                f.release_texture(previous);
            }
            f.make_texture_2d(&TextureDesc::render_target(width, height, source.format))
        })?;
        self.intermediate = Some(intermediate);

        self.scans.clear();
        for (vertical, extent) in [(false, width), (true, height)] {
            let mut step = 1u32;
            for _ in 0..scan_passes(extent) {
                let mut scan = PostProcessPass::new(&self.context, &library::sat_scan(vertical))?;
                scan.set_param(0, tex_size);
                scan.set_param(1, step as f32);
                self.scans.push(scan);
                step = step.saturating_mul(SAT_TAPS_PER_PASS);
            }
        }

        self.size = Some((width, height));
        crate::engine_debug!(
            "lumen3d::SummedAreaTable",
            "Allocated {}x{} intermediate, {} scan passes",
            width,
            height,
            self.scans.len()
        );
        Ok(())
    }

    fn apply_compute(&mut self, source: TextureHandle, target: TextureHandle) -> Result<()> {
        if source != target {
            self.copy.set_input_pin(0, source)?;
            self.copy.set_output_pin(0, target)?;
            self.copy.apply()?;
        }
        for scan in &mut self.scans {
            scan.set_output_pin(0, target)?;
            scan.apply()?;
        }
        Ok(())
    }

    fn apply_raster(&mut self, source: TextureHandle, target: TextureHandle) -> Result<()> {
        let Some(intermediate) = self.intermediate else {
            crate::engine_fatal!(Self::NAME, "Applied before the intermediate texture was allocated");
        };

        let mut read = source;
        for (i, scan) in self.scans.iter_mut().enumerate() {
            let write = if i % 2 == 0 { intermediate } else { target };
            scan.set_input_pin(0, read)?;
            scan.set_output_pin(0, write)?;
            scan.apply()?;
            read = write;
        }

        if read != target {
            self.copy.set_input_pin(0, read)?;
            self.copy.set_output_pin(0, target)?;
            self.copy.apply()?;
        }
        Ok(())
    }
}

impl PostProcess for SummedAreaTable {
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
        let info = texture_info(&self.context, Self::NAME, texture)?;
        if self.size != Some((info.width, info.height)) {
            self.allocate(info)?;
            self.state = StageState::Bound;
        } else if self.state == StageState::Unconfigured {
            self.state = StageState::Bound;
        }
        Ok(())
    }

    fn set_output_pin(&mut self, index: usize, texture: TextureHandle) -> Result<()> {
        self.outputs.bind(Self::NAME, index, texture);
        Ok(())
    }

    fn unbind_output_pin(&mut self, index: usize) -> Result<()> {
        self.outputs.unbind(Self::NAME, index);
        Ok(())
    }

    /// Panics if either pin is unbound; the table is never rendered to the screen
    fn apply(&mut self) -> Result<()> {
        let source = self.inputs.require(Self::NAME, 0);
        let target = self.outputs.require(Self::NAME, 0);

        if self.compute {
            self.apply_compute(source, target)?;
        } else {
            self.apply_raster(source, target)?;
        }

        self.state = StageState::Ready;
        Ok(())
    }

    fn state(&self) -> StageState {
        self.state
    }
}

impl Drop for SummedAreaTable {
    fn drop(&mut self) {
        if let Some(intermediate) = self.intermediate.take() {
            let _ = self.context.with_factory(|f| {
                f.release_texture(intermediate);
                Ok(())
            });
        }
    }
}

#[cfg(test)]
#[path = "summed_area_table_tests.rs"]
mod tests;
