/// Resource arenas shared by the headless render engine and resource factory

use lumen_3d_engine::lumen3d::render::{
    Attachment, BufferHandle, BufferKind, DeviceCaps, EffectHandle, FrameBufferHandle,
    ParamHandle, ParamValue, PrimitiveTopology, RenderLayoutDesc, RenderLayoutHandle,
    TechniqueHandle, TextureDesc, TextureHandle,
};
use rustc_hash::{FxHashMap, FxHashSet};
use slotmap::SlotMap;

/// Techniques and parameters an effect declares.
///
/// Effects with a manifest reject unknown technique and parameter names;
/// effects without one accept any name.
#[derive(Debug, Clone, Default)]
pub struct EffectManifest {
    pub techniques: FxHashSet<String>,
    pub params: FxHashSet<String>,
}

impl EffectManifest {
    pub fn new(techniques: &[&str], params: &[&str]) -> Self {
        Self {
            techniques: techniques.iter().map(|s| s.to_string()).collect(),
            params: params.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Counters for one frame (or since creation, for the totals)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub draw_calls: u64,
    pub instances: u64,
    pub primitives: u64,
    pub dispatches: u64,
    pub thread_groups: u64,
    pub effect_binds: u64,
    pub param_writes: u64,
    pub clears: u64,
    pub frame_buffer_binds: u64,
    pub mip_generations: u64,
    pub instance_bytes: u64,
}

impl FrameStats {
    pub(crate) fn accumulate(&mut self, other: &FrameStats) {
        self.draw_calls += other.draw_calls;
        self.instances += other.instances;
        self.primitives += other.primitives;
        self.dispatches += other.dispatches;
        self.thread_groups += other.thread_groups;
        self.effect_binds += other.effect_binds;
        self.param_writes += other.param_writes;
        self.clears += other.clears;
        self.frame_buffer_binds += other.frame_buffer_binds;
        self.mip_generations += other.mip_generations;
        self.instance_bytes += other.instance_bytes;
    }
}

/// Primitives one draw of `layout` produces per instance
pub(crate) fn primitive_count(layout: &RenderLayoutDesc) -> u64 {
    let elements = layout.element_count() as u64;
    match layout.topology {
        PrimitiveTopology::PointList => elements,
        PrimitiveTopology::TriangleList => elements / 3,
        PrimitiveTopology::TriangleStrip => elements.saturating_sub(2),
    }
}

/// Bytes a texture occupies, mip chain included
pub(crate) fn texture_bytes(desc: &TextureDesc) -> u64 {
    let bpp = desc.format.bytes_per_element() as u64;
    let (mut w, mut h) = (desc.width.max(1) as u64, desc.height.max(1) as u64);
    let mut total = 0;
    for _ in 0..desc.mip_levels.max(1) {
        total += w * h * bpp;
        w = (w / 2).max(1);
        h = (h / 2).max(1);
    }
    total
}

pub(crate) struct TextureEntry {
    pub(crate) desc: TextureDesc,
    pub(crate) bytes: u64,
}

pub(crate) struct BufferEntry {
    pub(crate) kind: BufferKind,
    pub(crate) bytes: u64,
}

pub(crate) struct NamedEntry {
    pub(crate) effect: EffectHandle,
    pub(crate) name: String,
}

#[derive(Default)]
pub(crate) struct HeadlessStore {
    pub(crate) caps: DeviceCaps,
    pub(crate) memory_budget: Option<u64>,
    pub(crate) memory_used: u64,

    pub(crate) textures: SlotMap<TextureHandle, TextureEntry>,
    pub(crate) frame_buffers: SlotMap<FrameBufferHandle, FxHashMap<Attachment, TextureHandle>>,
    pub(crate) buffers: SlotMap<BufferHandle, BufferEntry>,
    pub(crate) layouts: SlotMap<RenderLayoutHandle, RenderLayoutDesc>,

    pub(crate) effects: SlotMap<EffectHandle, String>,
    pub(crate) manifests: FxHashMap<String, EffectManifest>,
    pub(crate) techniques: SlotMap<TechniqueHandle, NamedEntry>,
    pub(crate) params: SlotMap<ParamHandle, NamedEntry>,
    pub(crate) technique_lookup: FxHashMap<(EffectHandle, String), TechniqueHandle>,
    pub(crate) param_lookup: FxHashMap<(EffectHandle, String), ParamHandle>,
    pub(crate) param_values: FxHashMap<ParamHandle, ParamValue>,
    pub(crate) instance_streams: FxHashMap<RenderLayoutHandle, usize>,

    pub(crate) frames: u64,
    pub(crate) in_frame: bool,
    pub(crate) current: FrameStats,
    pub(crate) last_frame: FrameStats,
    pub(crate) totals: FrameStats,
}

impl HeadlessStore {
    pub(crate) fn new(caps: DeviceCaps, memory_budget: Option<u64>) -> Self {
        Self { caps, memory_budget, ..Default::default() }
    }

    pub(crate) fn effect_manifest(&self, effect: EffectHandle) -> Option<&EffectManifest> {
        self.effects.get(effect).and_then(|name| self.manifests.get(name))
    }
}
