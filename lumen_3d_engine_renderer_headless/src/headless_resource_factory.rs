/// Headless ResourceFactory: slotmap arenas with an optional memory budget

use std::sync::{Arc, Mutex, MutexGuard};
use lumen_3d_engine::lumen3d::render::{
    Attachment, BufferDesc, BufferHandle, BufferKind, EffectHandle, FrameBufferHandle,
    ParamHandle, RenderLayoutDesc, RenderLayoutHandle, ResourceFactory, TechniqueHandle,
    TextureDesc, TextureHandle, TextureInfo,
};
use lumen_3d_engine::lumen3d::{Error, Result};
use lumen_3d_engine::{engine_bail, engine_debug, engine_warn};
use crate::headless_render_engine::lock;
use crate::headless_store::{texture_bytes, BufferEntry, HeadlessStore, NamedEntry, TextureEntry};

const SOURCE: &str = "HeadlessResourceFactory";

pub struct HeadlessResourceFactory {
    store: Arc<Mutex<HeadlessStore>>,
}

impl HeadlessResourceFactory {
    pub(crate) fn new(store: Arc<Mutex<HeadlessStore>>) -> Self {
        Self { store }
    }

    fn store(&self) -> Result<MutexGuard<'_, HeadlessStore>> {
        lock(&self.store)
    }
}

/// Reserve `bytes` against the budget
fn reserve(store: &mut HeadlessStore, bytes: u64) -> Result<()> {
    if let Some(budget) = store.memory_budget {
        if store.memory_used + bytes > budget {
            engine_warn!(
                SOURCE,
                "Allocation of {} bytes exceeds budget ({} of {} used)",
                bytes,
                store.memory_used,
                budget
            );
            return Err(Error::OutOfMemory);
        }
    }
    store.memory_used += bytes;
    Ok(())
}

impl ResourceFactory for HeadlessResourceFactory {
    fn make_texture_2d(&mut self, desc: &TextureDesc) -> Result<TextureHandle> {
        if desc.width == 0 || desc.height == 0 {
            return Err(Error::InvalidResource(format!(
                "Texture size {}x{} is empty",
                desc.width, desc.height
            )));
        }
        let mut store = self.store()?;
        if !store.caps.texture_format_support(desc.format) {
            return Err(Error::InvalidResource(format!(
                "Texture format {:?} is not supported",
                desc.format
            )));
        }
        let bytes = texture_bytes(desc);
        reserve(&mut store, bytes)?;
        let handle = store.textures.insert(TextureEntry { desc: desc.clone(), bytes });
        engine_debug!(
            SOURCE,
            "Texture {:?}: {}x{} {:?} ({} bytes)",
            handle,
            desc.width,
            desc.height,
            desc.format,
            bytes
        );
        Ok(handle)
    }

    fn texture_info(&self, texture: TextureHandle) -> Option<TextureInfo> {
        let store = self.store().ok()?;
        store.textures.get(texture).map(|entry| TextureInfo {
            width: entry.desc.width,
            height: entry.desc.height,
            mip_levels: entry.desc.mip_levels,
            format: entry.desc.format,
        })
    }

    fn release_texture(&mut self, texture: TextureHandle) {
        let Ok(mut store) = self.store() else { return };
        if let Some(entry) = store.textures.remove(texture) {
            store.memory_used = store.memory_used.saturating_sub(entry.bytes);
            // drop stale attachments so a later clear reports the frame buffer as empty
            for attachments in store.frame_buffers.values_mut() {
                attachments.retain(|_, t| *t != texture);
            }
        }
    }

    fn make_frame_buffer(&mut self) -> Result<FrameBufferHandle> {
        let mut store = self.store()?;
        Ok(store.frame_buffers.insert(Default::default()))
    }

    fn attach(
        &mut self,
        frame_buffer: FrameBufferHandle,
        attachment: Attachment,
        texture: TextureHandle,
    ) -> Result<()> {
        let mut store = self.store()?;
        let Some(entry) = store.textures.get(texture) else {
            engine_bail!(SOURCE, "attach: unknown texture {:?}", texture);
        };
        let format = entry.desc.format;
        let valid = match attachment {
            Attachment::Color0 => store.caps.render_target_format_support(format),
            Attachment::DepthStencil => format.is_depth(),
        };
        if !valid {
            return Err(Error::InvalidResource(format!(
                "Format {:?} cannot be attached as {:?}",
                format, attachment
            )));
        }
        let Some(attachments) = store.frame_buffers.get_mut(frame_buffer) else {
            engine_bail!(SOURCE, "attach: unknown frame buffer {:?}", frame_buffer);
        };
        attachments.insert(attachment, texture);
        Ok(())
    }

    fn release_frame_buffer(&mut self, frame_buffer: FrameBufferHandle) {
        if let Ok(mut store) = self.store() {
            store.frame_buffers.remove(frame_buffer);
        }
    }

    fn make_buffer(&mut self, desc: &BufferDesc) -> Result<BufferHandle> {
        if desc.data.is_empty() {
            return Err(Error::InvalidResource("Buffer has no contents".to_string()));
        }
        let mut store = self.store()?;
        let bytes = desc.data.len() as u64;
        reserve(&mut store, bytes)?;
        Ok(store.buffers.insert(BufferEntry { kind: desc.kind, bytes }))
    }

    fn release_buffer(&mut self, buffer: BufferHandle) {
        let Ok(mut store) = self.store() else { return };
        if let Some(entry) = store.buffers.remove(buffer) {
            store.memory_used = store.memory_used.saturating_sub(entry.bytes);
        }
    }

    fn make_render_layout(&mut self, desc: &RenderLayoutDesc) -> Result<RenderLayoutHandle> {
        let mut store = self.store()?;
        match store.buffers.get(desc.vertices.buffer) {
            Some(entry) if entry.kind == BufferKind::Vertex => {}
            _ => engine_bail!(SOURCE, "make_render_layout: {:?} is not a vertex buffer", desc.vertices.buffer),
        }
        if let Some(indices) = &desc.indices {
            match store.buffers.get(indices.buffer) {
                Some(entry) if entry.kind == BufferKind::Index => {}
                _ => engine_bail!(SOURCE, "make_render_layout: {:?} is not an index buffer", indices.buffer),
            }
        }
        Ok(store.layouts.insert(*desc))
    }

    fn render_layout_desc(&self, layout: RenderLayoutHandle) -> Option<RenderLayoutDesc> {
        self.store().ok()?.layouts.get(layout).copied()
    }

    fn release_render_layout(&mut self, layout: RenderLayoutHandle) {
        if let Ok(mut store) = self.store() {
            store.layouts.remove(layout);
            store.instance_streams.remove(&layout);
        }
    }

    fn load_effect(&mut self, name: &str) -> Result<EffectHandle> {
        let mut store = self.store()?;
        if let Some((handle, _)) = store.effects.iter().find(|(_, n)| n.as_str() == name) {
            return Ok(handle);
        }
        let handle = store.effects.insert(name.to_string());
        engine_debug!(SOURCE, "Effect '{}' loaded as {:?}", name, handle);
        Ok(handle)
    }

    fn technique_by_name(&mut self, effect: EffectHandle, name: &str) -> Result<TechniqueHandle> {
        let mut store = self.store()?;
        let key = (effect, name.to_string());
        if let Some(handle) = store.technique_lookup.get(&key) {
            return Ok(*handle);
        }
        let Some(effect_name) = store.effects.get(effect) else {
            engine_bail!(SOURCE, "technique_by_name: unknown effect {:?}", effect);
        };
        if let Some(manifest) = store.effect_manifest(effect) {
            if !manifest.techniques.contains(name) {
                return Err(Error::InvalidResource(format!(
                    "Effect '{}' has no technique '{}'",
                    effect_name, name
                )));
            }
        }
        let handle = store.techniques.insert(NamedEntry { effect, name: name.to_string() });
        store.technique_lookup.insert(key, handle);
        Ok(handle)
    }

    fn param_by_name(&mut self, effect: EffectHandle, name: &str) -> Result<ParamHandle> {
        let mut store = self.store()?;
        let key = (effect, name.to_string());
        if let Some(handle) = store.param_lookup.get(&key) {
            return Ok(*handle);
        }
        let Some(effect_name) = store.effects.get(effect) else {
            engine_bail!(SOURCE, "param_by_name: unknown effect {:?}", effect);
        };
        if let Some(manifest) = store.effect_manifest(effect) {
            if !manifest.params.contains(name) {
                return Err(Error::InvalidResource(format!(
                    "Effect '{}' has no parameter '{}'",
                    effect_name, name
                )));
            }
        }
        let handle = store.params.insert(NamedEntry { effect, name: name.to_string() });
        store.param_lookup.insert(key, handle);
        Ok(handle)
    }
}

#[cfg(test)]
#[path = "headless_resource_factory_tests.rs"]
mod tests;
