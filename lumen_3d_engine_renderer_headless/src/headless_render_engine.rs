/// Headless RenderEngine: validates every command and counts it
///
/// Nothing is rasterized. Commands are checked against the shared store
/// (live handles, frame brackets, a bound technique before draws and
/// dispatches) and folded into per-frame statistics.

use std::sync::{Arc, Mutex, MutexGuard};
use lumen_3d_engine::lumen3d::render::{
    ClearFlags, DeviceCaps, FrameBufferHandle, ParamHandle, ParamValue, RenderEngine,
    RenderLayoutHandle, TechniqueHandle, TextureHandle, AccessHint,
};
use lumen_3d_engine::lumen3d::{Error, Result};
use lumen_3d_engine::{engine_bail, engine_trace};
use glam::Vec4;
use crate::headless_store::{primitive_count, HeadlessStore};

const SOURCE: &str = "HeadlessRenderEngine";

pub struct HeadlessRenderEngine {
    store: Arc<Mutex<HeadlessStore>>,
    caps: DeviceCaps,
    frame_buffer: Option<FrameBufferHandle>,
    technique: Option<TechniqueHandle>,
}

impl HeadlessRenderEngine {
    pub(crate) fn new(store: Arc<Mutex<HeadlessStore>>) -> Result<Self> {
        let caps = lock(&store)?.caps.clone();
        Ok(Self {
            store,
            caps,
            frame_buffer: None,
            technique: None,
        })
    }

    /// Technique bound by the last `set_render_effect`
    pub fn current_technique(&self) -> Option<TechniqueHandle> {
        self.technique
    }

    fn store(&self) -> Result<MutexGuard<'_, HeadlessStore>> {
        lock(&self.store)
    }
}

pub(crate) fn lock(store: &Arc<Mutex<HeadlessStore>>) -> Result<MutexGuard<'_, HeadlessStore>> {
    store
        .lock()
        .map_err(|_| Error::BackendError("Headless store lock poisoned".to_string()))
}

impl RenderEngine for HeadlessRenderEngine {
    fn begin_frame(&mut self) -> Result<()> {
        let mut store = self.store()?;
        if store.in_frame {
            engine_bail!(SOURCE, "begin_frame called twice without end_frame");
        }
        store.in_frame = true;
        Ok(())
    }

    fn end_frame(&mut self) -> Result<()> {
        let mut store = self.store()?;
        if !store.in_frame {
            engine_bail!(SOURCE, "end_frame called without begin_frame");
        }
        store.in_frame = false;
        store.frames += 1;
        // commands issued between frames count towards the frame they precede
        let frame = std::mem::take(&mut store.current);
        store.totals.accumulate(&frame);
        store.last_frame = frame;
        engine_trace!(
            SOURCE,
            "Frame {}: {} draws, {} instances, {} dispatches",
            store.frames,
            frame.draw_calls,
            frame.instances,
            frame.dispatches
        );
        Ok(())
    }

    fn bind_frame_buffer(&mut self, frame_buffer: Option<FrameBufferHandle>) -> Result<()> {
        let mut store = self.store()?;
        if let Some(fb) = frame_buffer {
            if !store.frame_buffers.contains_key(fb) {
                engine_bail!(SOURCE, "bind_frame_buffer: unknown frame buffer {:?}", fb);
            }
        }
        store.current.frame_buffer_binds += 1;
        drop(store);
        self.frame_buffer = frame_buffer;
        Ok(())
    }

    fn current_frame_buffer(&self) -> Option<FrameBufferHandle> {
        self.frame_buffer
    }

    fn clear(&mut self, flags: ClearFlags, _color: Vec4, _depth: f32, _stencil: u32) -> Result<()> {
        let mut store = self.store()?;
        if let Some(fb) = self.frame_buffer {
            let Some(attachments) = store.frame_buffers.get(fb) else {
                engine_bail!(SOURCE, "clear: bound frame buffer {:?} was released", fb);
            };
            if flags.contains(ClearFlags::COLOR) && attachments.is_empty() {
                engine_bail!(SOURCE, "clear: frame buffer {:?} has no attachment", fb);
            }
        }
        store.current.clears += 1;
        Ok(())
    }

    fn set_render_effect(&mut self, technique: TechniqueHandle) -> Result<()> {
        let mut store = self.store()?;
        if !store.techniques.contains_key(technique) {
            engine_bail!(SOURCE, "set_render_effect: unknown technique {:?}", technique);
        }
        store.current.effect_binds += 1;
        drop(store);
        self.technique = Some(technique);
        Ok(())
    }

    fn set_param(&mut self, param: ParamHandle, value: ParamValue) -> Result<()> {
        let mut store = self.store()?;
        if !store.params.contains_key(param) {
            engine_bail!(SOURCE, "set_param: unknown parameter {:?}", param);
        }
        if let ParamValue::Texture(Some(texture)) = value {
            if !store.textures.contains_key(texture) {
                engine_bail!(
                    SOURCE,
                    "set_param '{}': texture {:?} was released",
                    store.params[param].name,
                    texture
                );
            }
        }
        store.param_values.insert(param, value);
        store.current.param_writes += 1;
        Ok(())
    }

    fn render(&mut self, layout: RenderLayoutHandle, instance_count: u32) -> Result<()> {
        if self.technique.is_none() {
            engine_bail!(SOURCE, "render: no technique bound");
        }
        let mut store = self.store()?;
        let Some(desc) = store.layouts.get(layout).copied() else {
            engine_bail!(SOURCE, "render: unknown render layout {:?}", layout);
        };
        store.current.draw_calls += 1;
        store.current.instances += instance_count as u64;
        store.current.primitives += primitive_count(&desc) * instance_count as u64;
        Ok(())
    }

    fn update_instance_stream(&mut self, layout: RenderLayoutHandle, data: &[u8]) -> Result<()> {
        let mut store = self.store()?;
        if !store.layouts.contains_key(layout) {
            engine_bail!(SOURCE, "update_instance_stream: unknown render layout {:?}", layout);
        }
        store.instance_streams.insert(layout, data.len());
        store.current.instance_bytes += data.len() as u64;
        Ok(())
    }

    fn dispatch(&mut self, thread_groups: [u32; 3]) -> Result<()> {
        if !self.caps.compute_capable() {
            engine_bail!(SOURCE, "dispatch: device has no compute support");
        }
        if self.technique.is_none() {
            engine_bail!(SOURCE, "dispatch: no technique bound");
        }
        if thread_groups.contains(&0) {
            engine_bail!(SOURCE, "dispatch: empty thread group grid {:?}", thread_groups);
        }
        let mut store = self.store()?;
        store.current.dispatches += 1;
        store.current.thread_groups += thread_groups.iter().map(|&g| g as u64).product::<u64>();
        Ok(())
    }

    fn generate_mips(&mut self, texture: TextureHandle) -> Result<()> {
        let mut store = self.store()?;
        let Some(entry) = store.textures.get(texture) else {
            engine_bail!(SOURCE, "generate_mips: unknown texture {:?}", texture);
        };
        if !entry.desc.access.contains(AccessHint::GENERATE_MIPS) {
            engine_bail!(SOURCE, "generate_mips: texture {:?} was not created with GENERATE_MIPS", texture);
        }
        store.current.mip_generations += 1;
        Ok(())
    }

    fn device_caps(&self) -> &DeviceCaps {
        &self.caps
    }
}

#[cfg(test)]
#[path = "headless_render_engine_tests.rs"]
mod tests;
