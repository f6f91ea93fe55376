/// Headless backend: builds an EngineContext over the shared store and
/// reports what the engine submitted.

use std::sync::{Arc, Mutex};
use colored::*;
use lumen_3d_engine::lumen3d::render::{DeviceCaps, ParamValue, RenderEngine, TechniqueHandle};
use lumen_3d_engine::lumen3d::{EngineConfig, EngineContext, Result};
use lumen_3d_engine::engine_info;
use crate::headless_render_engine::{lock, HeadlessRenderEngine};
use crate::headless_resource_factory::HeadlessResourceFactory;
use crate::headless_store::{EffectManifest, FrameStats, HeadlessStore};

/// Live resource counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResourceCounts {
    pub textures: usize,
    pub frame_buffers: usize,
    pub buffers: usize,
    pub render_layouts: usize,
    pub effects: usize,
    pub memory_used: u64,
}

/// Statistics snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeadlessStats {
    pub frames: u64,
    pub last_frame: FrameStats,
    pub totals: FrameStats,
    pub resources: ResourceCounts,
}

/// Device without a window or GPU.
///
/// # Example
///
/// ```
/// use lumen_3d_engine::lumen3d::EngineConfig;
/// use lumen_3d_engine::lumen3d::render::DeviceCaps;
/// use lumen_3d_engine_renderer_headless::HeadlessBackend;
///
/// let backend = HeadlessBackend::new(DeviceCaps::full());
/// let context = backend.context(EngineConfig::default()).unwrap();
/// assert!(context.compute_enabled().unwrap());
/// ```
#[derive(Clone)]
pub struct HeadlessBackend {
    store: Arc<Mutex<HeadlessStore>>,
}

impl HeadlessBackend {
    pub fn new(caps: DeviceCaps) -> Self {
        Self {
            store: Arc::new(Mutex::new(HeadlessStore::new(caps, None))),
        }
    }

    /// Fail allocations with `OutOfMemory` once `bytes` are in use
    pub fn with_memory_budget(self, bytes: u64) -> Self {
        if let Ok(mut store) = self.store.lock() {
            store.memory_budget = Some(bytes);
        }
        self
    }

    /// Declare the techniques and parameters of an effect.
    ///
    /// Name lookups on a declared effect fail for unknown names.
    pub fn declare_effect(&self, name: &str, manifest: EffectManifest) -> Result<()> {
        lock(&self.store)?.manifests.insert(name.to_string(), manifest);
        Ok(())
    }

    /// Engine context whose render engine and factory share this backend
    pub fn context(&self, config: EngineConfig) -> Result<EngineContext> {
        let render_engine = HeadlessRenderEngine::new(self.store.clone())?;
        let factory = HeadlessResourceFactory::new(self.store.clone());
        let caps = render_engine.device_caps();
        engine_info!(
            "HeadlessBackend",
            "Headless device for '{}' (shader model {}, compute {})",
            config.app_name,
            caps.max_shader_model,
            caps.compute_capable()
        );
        Ok(EngineContext::new(config, render_engine, factory))
    }

    pub fn stats(&self) -> Result<HeadlessStats> {
        let store = lock(&self.store)?;
        Ok(HeadlessStats {
            frames: store.frames,
            last_frame: store.last_frame,
            totals: store.totals,
            resources: ResourceCounts {
                textures: store.textures.len(),
                frame_buffers: store.frame_buffers.len(),
                buffers: store.buffers.len(),
                render_layouts: store.layouts.len(),
                effects: store.effects.len(),
                memory_used: store.memory_used,
            },
        })
    }

    /// Name a technique handle resolved through this backend
    pub fn technique_name(&self, technique: TechniqueHandle) -> Option<String> {
        let store = lock(&self.store).ok()?;
        store.techniques.get(technique).map(|entry| {
            let effect = store.effects.get(entry.effect).map(String::as_str).unwrap_or("?");
            format!("{}::{}", effect, entry.name)
        })
    }

    /// Value last written to the named parameter of `effect`
    pub fn param_value(&self, effect: &str, name: &str) -> Option<ParamValue> {
        let store = lock(&self.store).ok()?;
        let (handle, _) = store.effects.iter().find(|(_, n)| n.as_str() == effect)?;
        let param = store.param_lookup.get(&(handle, name.to_string()))?;
        store.param_values.get(param).copied()
    }

    /// Print the statistics report
    pub fn print_stats_report(&self) {
        let Ok(stats) = self.stats() else { return };

        if stats.frames == 0 {
            println!("\n{}", "No frames rendered".yellow().bold());
            return;
        }

        println!("\n{}", "=== Headless Frame Report ===".bright_blue().bold());
        println!("  {} {}", "Frames:".white().bold(), stats.frames);

        let last = &stats.last_frame;
        println!("  {}", "Last frame".cyan());
        println!("    {} {}", "Draw calls:".green(), last.draw_calls);
        println!("    {} {}", "Instances:".green(), last.instances);
        println!("    {} {}", "Primitives:".green(), last.primitives);
        if last.dispatches > 0 {
            println!("    {} {} ({} groups)", "Dispatches:".magenta(), last.dispatches, last.thread_groups);
        }
        println!("    {} {}", "Effect binds:".green(), last.effect_binds);
        println!("    {} {}", "Param writes:".bright_black(), last.param_writes);

        let totals = &stats.totals;
        println!("  {}", "Totals".cyan());
        println!("    {} {}", "Draw calls:".green(), totals.draw_calls);
        println!("    {} {}", "Instance bytes:".green(), totals.instance_bytes);

        let res = &stats.resources;
        println!(
            "  {} {} textures, {} frame buffers, {} buffers, {} layouts ({} KiB)",
            "Live:".white().bold(),
            res.textures,
            res.frame_buffers,
            res.buffers,
            res.render_layouts,
            res.memory_used / 1024
        );

        println!("{}\n", "=============================".bright_blue().bold());
    }
}

#[cfg(test)]
#[path = "headless_backend_tests.rs"]
mod tests;
