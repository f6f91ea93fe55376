/// Post-process stage trait and the generic single-pass stage.
///
/// A stage reads the textures bound to its input pins and writes the ones
/// bound to its output pins. `PostProcessPass` covers every stage that is a
/// single technique over a full-screen quad (raster) or a dispatch over the
/// output texels (compute). Composite stages (depth of field, bokeh, summed
/// area table) are built from `PostProcessPass` children.

use glam::Vec2;
use slotmap::Key;
use crate::engine::EngineContext;
use crate::error::{Error, Result};
use crate::render_engine::{
    Attachment, BufferDesc, BufferHandle, EffectHandle, FrameBufferHandle, IndexFormat,
    IndexStream, ParamHandle, ParamValue, PrimitiveTopology, RenderLayoutDesc,
    RenderLayoutHandle, ResourceFactory, TechniqueHandle, TextureFormat, TextureHandle,
    TextureInfo, VertexStream,
};
use super::pin::{PinDirection, PinSet};

// ===== STAGE TRAIT =====

/// Lifecycle of a stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageState {
    /// Some required input is unbound
    Unconfigured,
    /// Inputs bound and resources allocated, not applied yet
    Bound,
    /// Applied at least once since the last reallocation
    Ready,
}

/// Post-process stage with typed texture pins
pub trait PostProcess {
    fn name(&self) -> &str;

    fn input_pins(&self) -> &PinSet;

    fn output_pins(&self) -> &PinSet;

    /// Bind an input texture. Panics if `index` is out of range.
    ///
    /// Composite stages (re)allocate their resources when pin 0 is bound
    /// with new dimensions.
    fn set_input_pin(&mut self, index: usize, texture: TextureHandle) -> Result<()>;

    /// Bind an output texture. Panics if `index` is out of range.
    fn set_output_pin(&mut self, index: usize, texture: TextureHandle) -> Result<()>;

    /// Clear an output pin; the stage then renders to the screen
    fn unbind_output_pin(&mut self, index: usize) -> Result<()>;

    /// Run the stage. Panics if a required input pin is unbound.
    fn apply(&mut self) -> Result<()>;

    fn state(&self) -> StageState;

    fn input_pin(&self, index: usize) -> Option<TextureHandle> {
        self.input_pins().texture(index)
    }

    fn output_pin(&self, index: usize) -> Option<TextureHandle> {
        self.output_pins().texture(index)
    }
}

// ===== DESCRIPTOR =====

/// Compute dispatch shape
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchGrid {
    /// One thread per output texel, in groups of `group_size`
    Texels { group_size: [u32; 2] },
    /// One thread group per output row
    Rows,
    /// One thread group per output column
    Columns,
}

/// How a pass runs on the device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Execution {
    /// Full-screen quad into the output frame buffer
    Raster,
    /// Dispatch writing the outputs as unordered-access textures
    Compute(DispatchGrid),
}

/// Declarative description of a single-pass stage.
///
/// Pin names are also the names of the effect parameters the textures are
/// bound to. `params` lists the extra parameters settable by index with
/// [`PostProcessPass::set_param`].
#[derive(Debug, Clone, PartialEq)]
pub struct PostProcessDesc {
    pub name: String,
    pub effect: String,
    pub technique: String,
    pub execution: Execution,
    pub input_pins: Vec<String>,
    pub output_pins: Vec<String>,
    pub params: Vec<String>,
}

impl PostProcessDesc {
    /// Raster pass with one `output` pin and no inputs or parameters yet
    pub fn new(name: &str, effect: &str, technique: &str) -> Self {
        Self {
            name: name.to_string(),
            effect: effect.to_string(),
            technique: technique.to_string(),
            execution: Execution::Raster,
            input_pins: Vec::new(),
            output_pins: vec!["output".to_string()],
            params: Vec::new(),
        }
    }

    pub fn compute(mut self, grid: DispatchGrid) -> Self {
        self.execution = Execution::Compute(grid);
        self
    }

    pub fn inputs(mut self, names: &[&str]) -> Self {
        self.input_pins = names.iter().map(|n| n.to_string()).collect();
        self
    }

    pub fn outputs(mut self, names: &[&str]) -> Self {
        self.output_pins = names.iter().map(|n| n.to_string()).collect();
        self
    }

    pub fn params(mut self, names: &[&str]) -> Self {
        self.params = names.iter().map(|n| n.to_string()).collect();
        self
    }
}

// ===== SHARED HELPERS =====

/// Vertex (and optional index) buffer plus the render layout over them
#[derive(Debug, Clone, Copy)]
pub(crate) struct StageGeometry {
    vertex_buffer: BufferHandle,
    index_buffer: Option<BufferHandle>,
    layout: RenderLayoutHandle,
}

impl StageGeometry {
    pub(crate) fn new<T: bytemuck::Pod>(
        factory: &mut dyn ResourceFactory,
        topology: PrimitiveTopology,
        format: TextureFormat,
        vertices: &[T],
        indices: Option<&[u32]>,
    ) -> Result<Self> {
        let vertex_buffer = factory.make_buffer(&BufferDesc::immutable_vertices(vertices))?;
        let (index_buffer, index_stream) = match indices {
            Some(indices) => {
                let buffer = factory.make_buffer(&BufferDesc::immutable_indices(indices))?;
                let stream = IndexStream {
                    buffer,
                    format: IndexFormat::U32,
                    index_count: indices.len() as u32,
                };
                (Some(buffer), Some(stream))
            }
            None => (None, None),
        };
        let layout = factory.make_render_layout(&RenderLayoutDesc {
            topology,
            vertices: VertexStream {
                buffer: vertex_buffer,
                format,
                vertex_count: vertices.len() as u32,
            },
            indices: index_stream,
        })?;
        Ok(Self { vertex_buffer, index_buffer, layout })
    }

    /// Clip-space quad covering the screen, as a 4-vertex strip
    pub(crate) fn fullscreen_quad(factory: &mut dyn ResourceFactory) -> Result<Self> {
        let positions = [
            Vec2::new(-1.0, 1.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(-1.0, -1.0),
            Vec2::new(1.0, -1.0),
        ];
        Self::new(factory, PrimitiveTopology::TriangleStrip, TextureFormat::R32G32_SFLOAT, &positions, None)
    }

    pub(crate) fn layout(&self) -> RenderLayoutHandle {
        self.layout
    }

    pub(crate) fn release(&self, factory: &mut dyn ResourceFactory) {
        factory.release_render_layout(self.layout);
        factory.release_buffer(self.vertex_buffer);
        if let Some(ib) = self.index_buffer {
            factory.release_buffer(ib);
        }
    }
}

/// Info of a texture bound to a pin; a stale handle is an error
pub(crate) fn texture_info(context: &EngineContext, owner: &str, texture: TextureHandle) -> Result<TextureInfo> {
    match context.with_factory(|f| Ok(f.texture_info(texture)))? {
        Some(info) => Ok(info),
        None => {
            crate::engine_error!(owner, "Texture {:?} does not exist", texture);
            Err(Error::InvalidResource(format!("texture {:?} does not exist", texture)))
        }
    }
}

/// Resolve parameter names of `effect`, in order
pub(crate) fn resolve_params<S: AsRef<str>>(
    factory: &mut dyn ResourceFactory,
    effect: EffectHandle,
    names: &[S],
) -> Result<Vec<ParamHandle>> {
    names.iter().map(|n| factory.param_by_name(effect, n.as_ref())).collect()
}

// ===== GENERIC PASS =====

/// Single-technique stage built from a [`PostProcessDesc`].
///
/// Technique and parameter names are resolved once, here. Per frame the
/// pass binds its input textures and held parameter values, then renders a
/// full-screen quad into its output (or the screen when the output pin is
/// unbound), or dispatches over the output texels.
pub struct PostProcessPass {
    context: EngineContext,
    name: String,
    execution: Execution,
    effect: EffectHandle,
    technique: TechniqueHandle,
    inputs: PinSet,
    outputs: PinSet,
    input_params: Vec<ParamHandle>,
    output_params: Vec<ParamHandle>,
    params: Vec<ParamHandle>,
    values: Vec<Option<ParamValue>>,
    frame_buffer: FrameBufferHandle,
    quad: Option<StageGeometry>,
    state: StageState,
}

impl PostProcessPass {
    pub fn new(context: &EngineContext, desc: &PostProcessDesc) -> Result<Self> {
        if desc.execution == Execution::Raster && desc.output_pins.len() > 1 {
            crate::engine_fatal!(
                desc.name.as_str(),
                "Raster pass declares {} output pins, at most 1 is supported",
                desc.output_pins.len()
            );
        }

        let pass = context.with_factory(|f| {
            let effect = f.load_effect(&desc.effect)?;
            let technique = f.technique_by_name(effect, &desc.technique)?;
            let input_params = resolve_params(f, effect, &desc.input_pins)?;
            let output_params = match desc.execution {
                Execution::Compute(_) => resolve_params(f, effect, &desc.output_pins)?,
                Execution::Raster => Vec::new(),
            };
            let params = resolve_params(f, effect, &desc.params)?;
            let (frame_buffer, quad) = match desc.execution {
                Execution::Raster => (f.make_frame_buffer()?, Some(StageGeometry::fullscreen_quad(f)?)),
                Execution::Compute(_) => (FrameBufferHandle::null(), None),
            };

            Ok(Self {
                context: context.clone(),
                name: desc.name.clone(),
                execution: desc.execution,
                effect,
                technique,
                inputs: PinSet::new(PinDirection::Input, &desc.input_pins),
                outputs: PinSet::new(PinDirection::Output, &desc.output_pins),
                input_params,
                output_params,
                values: vec![None; params.len()],
                params,
                frame_buffer,
                quad,
                state: if desc.input_pins.is_empty() { StageState::Bound } else { StageState::Unconfigured },
            })
        })?;

        crate::engine_debug!(
            "lumen3d::PostProcessPass",
            "Created pass '{}' ({}::{}, {:?})",
            desc.name,
            desc.effect,
            desc.technique,
            desc.execution
        );
        Ok(pass)
    }

    pub fn execution(&self) -> Execution {
        self.execution
    }

    pub fn effect(&self) -> EffectHandle {
        self.effect
    }

    pub fn technique(&self) -> TechniqueHandle {
        self.technique
    }

    /// Switch to another technique of the same effect (resolved by the caller once)
    pub fn set_technique(&mut self, technique: TechniqueHandle) {
        self.technique = technique;
    }

    /// Resolve another technique of this pass's effect
    pub fn resolve_technique(&self, name: &str) -> Result<TechniqueHandle> {
        let effect = self.effect;
        self.context.with_factory(|f| f.technique_by_name(effect, name))
    }

    pub fn param_count(&self) -> usize {
        self.params.len()
    }

    /// Hold `value` for parameter `index`; written on every `apply`.
    ///
    /// Panics if `index` is out of range.
    pub fn set_param(&mut self, index: usize, value: impl Into<ParamValue>) {
        match self.values.get_mut(index) {
            Some(slot) => *slot = Some(value.into()),
            None => crate::engine_fatal!(
                self.name.as_str(),
                "Parameter {} out of range ({} parameters)",
                index,
                self.params.len()
            ),
        }
    }

    pub fn param(&self, index: usize) -> Option<ParamValue> {
        self.values.get(index).copied().flatten()
    }

    fn dispatch_size(&self, grid: DispatchGrid) -> Result<[u32; 3]> {
        let output = self.outputs.require(&self.name, 0);
        let info = texture_info(&self.context, &self.name, output)?;
        Ok(match grid {
            DispatchGrid::Texels { group_size } => [
                info.width.div_ceil(group_size[0].max(1)),
                info.height.div_ceil(group_size[1].max(1)),
                1,
            ],
            DispatchGrid::Rows => [info.height, 1, 1],
            DispatchGrid::Columns => [info.width, 1, 1],
        })
    }
}

impl PostProcess for PostProcessPass {
    fn name(&self) -> &str {
        &self.name
    }

    fn input_pins(&self) -> &PinSet {
        &self.inputs
    }

    fn output_pins(&self) -> &PinSet {
        &self.outputs
    }

    fn set_input_pin(&mut self, index: usize, texture: TextureHandle) -> Result<()> {
        self.inputs.bind(&self.name, index, texture);
        if self.state == StageState::Unconfigured && self.inputs.all_bound() {
            self.state = StageState::Bound;
        }
        Ok(())
    }

    fn set_output_pin(&mut self, index: usize, texture: TextureHandle) -> Result<()> {
        let previous = self.outputs.bind(&self.name, index, texture);
        if self.execution == Execution::Raster && previous != Some(texture) {
            let frame_buffer = self.frame_buffer;
            self.context.with_factory(|f| f.attach(frame_buffer, Attachment::Color0, texture))?;
        }
        Ok(())
    }

    fn unbind_output_pin(&mut self, index: usize) -> Result<()> {
        self.outputs.unbind(&self.name, index);
        Ok(())
    }

    fn apply(&mut self) -> Result<()> {
        let inputs: Vec<TextureHandle> = (0..self.inputs.len())
            .map(|i| self.inputs.require(&self.name, i))
            .collect();

        let groups = match self.execution {
            Execution::Compute(grid) => Some(self.dispatch_size(grid)?),
            Execution::Raster => None,
        };

        self.context.with_render_engine(|re| {
            for (param, texture) in self.input_params.iter().zip(&inputs) {
                re.set_param(*param, (*texture).into())?;
            }
            for (param, value) in self.params.iter().zip(&self.values) {
                if let Some(value) = value {
                    re.set_param(*param, *value)?;
                }
            }

            match (groups, &self.quad) {
                (Some(groups), _) => {
                    for (i, param) in self.output_params.iter().enumerate() {
                        re.set_param(*param, ParamValue::Texture(self.outputs.texture(i)))?;
                    }
                    re.set_render_effect(self.technique)?;
                    re.dispatch(groups)
                }
                (None, Some(quad)) => {
                    let target = self.outputs.texture(0).map(|_| self.frame_buffer);
                    re.bind_frame_buffer(target)?;
                    re.set_render_effect(self.technique)?;
                    re.render(quad.layout(), 1)
                }
                (None, None) => Ok(()),
            }
        })?;

        crate::engine_trace!("lumen3d::PostProcessPass", "Applied '{}'", self.name);
        self.state = StageState::Ready;
        Ok(())
    }

    fn state(&self) -> StageState {
        self.state
    }
}

impl Drop for PostProcessPass {
    fn drop(&mut self) {
        let frame_buffer = self.frame_buffer;
        let quad = self.quad;
        let _ = self.context.with_factory(|f| {
            if !frame_buffer.is_null() {
                f.release_frame_buffer(frame_buffer);
            }
            if let Some(quad) = quad {
                quad.release(f);
            }
            Ok(())
        });
    }
}

#[cfg(test)]
#[path = "post_process_tests.rs"]
mod tests;
