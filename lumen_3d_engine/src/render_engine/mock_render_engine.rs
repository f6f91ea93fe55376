/// Mock render engine and resource factory for unit tests (no GPU required)
///
/// Both halves share one `MockState`, so a test can inspect every command
/// issued and every resource allocated after driving the code under test.

use std::sync::{Arc, Mutex};
use glam::Vec4;
use rustc_hash::FxHashMap;
use slotmap::SlotMap;

use crate::engine::{EngineConfig, EngineContext};
use crate::error::{Error, Result};
use super::*;

// ============================================================================
// Recorded commands
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum MockCommand {
    BeginFrame,
    EndFrame,
    BindFrameBuffer(Option<FrameBufferHandle>),
    Clear(ClearFlags, Vec4),
    /// Technique name
    SetRenderEffect(String),
    /// Parameter name and value
    SetParam(String, ParamValue),
    Render { layout: RenderLayoutHandle, instances: u32 },
    UpdateInstanceStream { layout: RenderLayoutHandle, bytes: usize },
    Dispatch([u32; 3]),
    GenerateMips(TextureHandle),
}

// ============================================================================
// Shared state
// ============================================================================

#[derive(Default)]
pub struct MockState {
    pub commands: Vec<MockCommand>,
    pub textures: SlotMap<TextureHandle, TextureInfo>,
    pub texture_allocations: usize,
    pub frame_buffers: SlotMap<FrameBufferHandle, FxHashMap<Attachment, TextureHandle>>,
    pub buffers: SlotMap<BufferHandle, BufferDesc>,
    pub layouts: SlotMap<RenderLayoutHandle, RenderLayoutDesc>,
    pub effects: SlotMap<EffectHandle, String>,
    pub techniques: SlotMap<TechniqueHandle, String>,
    pub params: SlotMap<ParamHandle, String>,
    technique_lookup: FxHashMap<(EffectHandle, String), TechniqueHandle>,
    param_lookup: FxHashMap<(EffectHandle, String), ParamHandle>,
    /// When set, every allocation fails with `OutOfMemory`
    pub fail_allocations: bool,
}

impl MockState {
    /// Names of techniques bound, in order
    pub fn effect_binds(&self) -> Vec<String> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                MockCommand::SetRenderEffect(name) => Some(name.clone()),
                _ => None,
            })
            .collect()
    }

    /// Render commands, in order
    pub fn draws(&self) -> Vec<(RenderLayoutHandle, u32)> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                MockCommand::Render { layout, instances } => Some((*layout, *instances)),
                _ => None,
            })
            .collect()
    }

    pub fn dispatches(&self) -> usize {
        self.commands.iter().filter(|c| matches!(c, MockCommand::Dispatch(_))).count()
    }

    /// Last value written to the parameter called `name`
    pub fn last_param(&self, name: &str) -> Option<ParamValue> {
        self.commands.iter().rev().find_map(|c| match c {
            MockCommand::SetParam(n, v) if n == name => Some(*v),
            _ => None,
        })
    }

    pub fn texture_by_size(&self, width: u32, height: u32) -> Option<(TextureHandle, TextureInfo)> {
        self.textures
            .iter()
            .find(|(_, info)| info.width == width && info.height == height)
            .map(|(h, info)| (h, *info))
    }

    pub fn clear_commands(&mut self) {
        self.commands.clear();
    }
}

fn lock(state: &Arc<Mutex<MockState>>) -> std::sync::MutexGuard<'_, MockState> {
    state.lock().unwrap()
}

// ============================================================================
// Mock RenderEngine
// ============================================================================

pub struct MockRenderEngine {
    state: Arc<Mutex<MockState>>,
    caps: DeviceCaps,
    bound: Option<FrameBufferHandle>,
}

impl RenderEngine for MockRenderEngine {
    fn begin_frame(&mut self) -> Result<()> {
        lock(&self.state).commands.push(MockCommand::BeginFrame);
        Ok(())
    }

    fn end_frame(&mut self) -> Result<()> {
        lock(&self.state).commands.push(MockCommand::EndFrame);
        Ok(())
    }

    fn bind_frame_buffer(&mut self, frame_buffer: Option<FrameBufferHandle>) -> Result<()> {
        self.bound = frame_buffer;
        lock(&self.state).commands.push(MockCommand::BindFrameBuffer(frame_buffer));
        Ok(())
    }

    fn current_frame_buffer(&self) -> Option<FrameBufferHandle> {
        self.bound
    }

    fn clear(&mut self, flags: ClearFlags, color: Vec4, _depth: f32, _stencil: u32) -> Result<()> {
        lock(&self.state).commands.push(MockCommand::Clear(flags, color));
        Ok(())
    }

    fn set_render_effect(&mut self, technique: TechniqueHandle) -> Result<()> {
        let mut state = lock(&self.state);
        let name = match state.techniques.get(technique) {
            Some(name) => name.clone(),
            None => return Err(Error::InvalidResource("unknown technique".to_string())),
        };
        state.commands.push(MockCommand::SetRenderEffect(name));
        Ok(())
    }

    fn set_param(&mut self, param: ParamHandle, value: ParamValue) -> Result<()> {
        let mut state = lock(&self.state);
        let name = match state.params.get(param) {
            Some(name) => name.clone(),
            None => return Err(Error::InvalidResource("unknown parameter".to_string())),
        };
        state.commands.push(MockCommand::SetParam(name, value));
        Ok(())
    }

    fn render(&mut self, layout: RenderLayoutHandle, instance_count: u32) -> Result<()> {
        lock(&self.state).commands.push(MockCommand::Render { layout, instances: instance_count });
        Ok(())
    }

    fn update_instance_stream(&mut self, layout: RenderLayoutHandle, data: &[u8]) -> Result<()> {
        lock(&self.state)
            .commands
            .push(MockCommand::UpdateInstanceStream { layout, bytes: data.len() });
        Ok(())
    }

    fn dispatch(&mut self, thread_groups: [u32; 3]) -> Result<()> {
        lock(&self.state).commands.push(MockCommand::Dispatch(thread_groups));
        Ok(())
    }

    fn generate_mips(&mut self, texture: TextureHandle) -> Result<()> {
        lock(&self.state).commands.push(MockCommand::GenerateMips(texture));
        Ok(())
    }

    fn device_caps(&self) -> &DeviceCaps {
        &self.caps
    }
}

// ============================================================================
// Mock ResourceFactory
// ============================================================================

pub struct MockResourceFactory {
    state: Arc<Mutex<MockState>>,
}

impl ResourceFactory for MockResourceFactory {
    fn make_texture_2d(&mut self, desc: &TextureDesc) -> Result<TextureHandle> {
        let mut state = lock(&self.state);
        if state.fail_allocations {
            return Err(Error::OutOfMemory);
        }
        state.texture_allocations += 1;
        Ok(state.textures.insert(TextureInfo {
            width: desc.width,
            height: desc.height,
            mip_levels: desc.mip_levels,
            format: desc.format,
        }))
    }

    fn texture_info(&self, texture: TextureHandle) -> Option<TextureInfo> {
        lock(&self.state).textures.get(texture).copied()
    }

    fn release_texture(&mut self, texture: TextureHandle) {
        lock(&self.state).textures.remove(texture);
    }

    fn make_frame_buffer(&mut self) -> Result<FrameBufferHandle> {
        Ok(lock(&self.state).frame_buffers.insert(FxHashMap::default()))
    }

    fn attach(
        &mut self,
        frame_buffer: FrameBufferHandle,
        attachment: Attachment,
        texture: TextureHandle,
    ) -> Result<()> {
        let mut state = lock(&self.state);
        match state.frame_buffers.get_mut(frame_buffer) {
            Some(attachments) => {
                attachments.insert(attachment, texture);
                Ok(())
            }
            None => Err(Error::InvalidResource("unknown frame buffer".to_string())),
        }
    }

    fn release_frame_buffer(&mut self, frame_buffer: FrameBufferHandle) {
        lock(&self.state).frame_buffers.remove(frame_buffer);
    }

    fn make_buffer(&mut self, desc: &BufferDesc) -> Result<BufferHandle> {
        let mut state = lock(&self.state);
        if state.fail_allocations {
            return Err(Error::OutOfMemory);
        }
        Ok(state.buffers.insert(desc.clone()))
    }

    fn release_buffer(&mut self, buffer: BufferHandle) {
        lock(&self.state).buffers.remove(buffer);
    }

    fn make_render_layout(&mut self, desc: &RenderLayoutDesc) -> Result<RenderLayoutHandle> {
        Ok(lock(&self.state).layouts.insert(*desc))
    }

    fn render_layout_desc(&self, layout: RenderLayoutHandle) -> Option<RenderLayoutDesc> {
        lock(&self.state).layouts.get(layout).copied()
    }

    fn release_render_layout(&mut self, layout: RenderLayoutHandle) {
        lock(&self.state).layouts.remove(layout);
    }

    fn load_effect(&mut self, name: &str) -> Result<EffectHandle> {
        let mut state = lock(&self.state);
        if let Some((handle, _)) = state.effects.iter().find(|(_, n)| n.as_str() == name) {
            return Ok(handle);
        }
        Ok(state.effects.insert(name.to_string()))
    }

    fn technique_by_name(&mut self, effect: EffectHandle, name: &str) -> Result<TechniqueHandle> {
        let mut state = lock(&self.state);
        let key = (effect, name.to_string());
        if let Some(handle) = state.technique_lookup.get(&key) {
            return Ok(*handle);
        }
        let handle = state.techniques.insert(name.to_string());
        state.technique_lookup.insert(key, handle);
        Ok(handle)
    }

    fn param_by_name(&mut self, effect: EffectHandle, name: &str) -> Result<ParamHandle> {
        let mut state = lock(&self.state);
        let key = (effect, name.to_string());
        if let Some(handle) = state.param_lookup.get(&key) {
            return Ok(*handle);
        }
        let handle = state.params.insert(name.to_string());
        state.param_lookup.insert(key, handle);
        Ok(handle)
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Engine context over a fresh mock backend, plus the shared state to inspect
pub fn mock_context(caps: DeviceCaps) -> (EngineContext, Arc<Mutex<MockState>>) {
    let state = Arc::new(Mutex::new(MockState::default()));
    let engine = MockRenderEngine { state: state.clone(), caps, bound: None };
    let factory = MockResourceFactory { state: state.clone() };
    (EngineContext::new(EngineConfig::default(), engine, factory), state)
}

/// Allocate a texture directly in the mock (test input textures)
pub fn mock_texture(ctx: &EngineContext, width: u32, height: u32, format: TextureFormat) -> TextureHandle {
    ctx.with_factory(|f| f.make_texture_2d(&TextureDesc::render_target(width, height, format)))
        .unwrap()
}
