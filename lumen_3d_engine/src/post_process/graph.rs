/// Post-process graph: stages wired through texture slots.
///
/// A slot is a texture either imported from outside (scene colour, depth)
/// or owned by the graph (intermediates, reallocated on resize). Stages read
/// and write slots through their pins. Each slot has at most one enabled
/// writer; enabled stages run writers-before-readers, ties broken by
/// insertion order.

use std::any::Any;
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use crate::engine::EngineContext;
use crate::error::{Error, Result};
use crate::render_engine::{TextureDesc, TextureFormat, TextureHandle};
use super::post_process::PostProcess;

/// Index of a stage in its graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StageId(u32);

impl StageId {
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

/// Index of a slot in its graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId(u32);

impl SlotId {
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

/// Pin addressed by index or by name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinRef<'a> {
    Index(usize),
    Name(&'a str),
}

impl From<usize> for PinRef<'_> {
    fn from(index: usize) -> Self {
        PinRef::Index(index)
    }
}

impl<'a> From<&'a str> for PinRef<'a> {
    fn from(name: &'a str) -> Self {
        PinRef::Name(name)
    }
}

/// Where a slot's texture comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    /// Provided by the caller, never released by the graph
    Imported,
    /// Allocated by the graph at its current size
    Owned(TextureFormat),
}

#[derive(Debug)]
struct Slot {
    name: String,
    kind: SlotKind,
    texture: TextureHandle,
}

/// Object-safe access to the concrete stage type
trait GraphStage: PostProcess {
    fn as_post_process(&self) -> &dyn PostProcess;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: PostProcess + 'static> GraphStage for T {
    fn as_post_process(&self) -> &dyn PostProcess {
        self
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

struct StageNode {
    stage: Box<dyn GraphStage>,
    enabled: bool,
    inputs: Vec<Option<SlotId>>,
    outputs: Vec<Option<SlotId>>,
}

fn graph_error(message: String) -> Error {
    crate::engine_error!("lumen3d::PostProcessGraph", "{}", message);
    Error::GraphError(message)
}

pub struct PostProcessGraph {
    context: EngineContext,
    width: u32,
    height: u32,
    stages: Vec<StageNode>,
    slots: Vec<Slot>,
    order: Option<Vec<StageId>>,
}

impl PostProcessGraph {
    const NAME: &'static str = "PostProcessGraph";

    /// Empty graph; owned slots are allocated at `width` x `height`
    pub fn new(context: &EngineContext, width: u32, height: u32) -> Self {
        Self {
            context: context.clone(),
            width,
            height,
            stages: Vec::new(),
            slots: Vec::new(),
            order: None,
        }
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    // ===== STAGES =====

    /// Add an enabled stage with no pins connected
    pub fn add_stage<T: PostProcess + 'static>(&mut self, stage: T) -> StageId {
        let id = StageId(self.stages.len() as u32);
        crate::engine_debug!("lumen3d::PostProcessGraph", "Added stage '{}' as {:?}", stage.name(), id);
        self.stages.push(StageNode {
            inputs: vec![None; stage.input_pins().len()],
            outputs: vec![None; stage.output_pins().len()],
            stage: Box::new(stage),
            enabled: true,
        });
        self.order = None;
        id
    }

    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    pub fn stage(&self, id: StageId) -> &dyn PostProcess {
        self.node(id).stage.as_post_process()
    }

    /// Concrete stage, `None` if `T` is not the stage's type
    pub fn stage_as<T: PostProcess + 'static>(&self, id: StageId) -> Option<&T> {
        self.node(id).stage.as_any().downcast_ref::<T>()
    }

    /// Concrete stage for parameter changes, `None` if `T` is not the stage's type
    pub fn stage_as_mut<T: PostProcess + 'static>(&mut self, id: StageId) -> Option<&mut T> {
        self.node_mut(id).stage.as_any_mut().downcast_mut::<T>()
    }

    pub fn is_enabled(&self, id: StageId) -> bool {
        self.node(id).enabled
    }

    /// Enable or disable a stage. Enabling fails if one of its output slots
    /// already has another enabled writer.
    pub fn set_enabled(&mut self, id: StageId, enabled: bool) -> Result<()> {
        if enabled && !self.node(id).enabled {
            for slot in self.node(id).outputs.clone().into_iter().flatten() {
                if let Some(writer) = self.writer_of(slot, Some(id)) {
                    return Err(graph_error(format!(
                        "Cannot enable '{}': slot '{}' is already written by '{}'",
                        self.node(id).stage.name(),
                        self.slots[slot.index()].name,
                        self.node(writer).stage.name()
                    )));
                }
            }
        }
        self.node_mut(id).enabled = enabled;
        self.order = None;
        Ok(())
    }

    // ===== SLOTS =====

    /// Slot over a caller-provided texture
    pub fn import_slot(&mut self, name: &str, texture: TextureHandle) -> SlotId {
        self.push_slot(name, SlotKind::Imported, texture)
    }

    /// Slot over a texture the graph allocates now and on every resize
    pub fn add_owned_slot(&mut self, name: &str, format: TextureFormat) -> Result<SlotId> {
        let desc = TextureDesc::render_target(self.width, self.height, format);
        let texture = self.context.with_factory(|f| f.make_texture_2d(&desc))?;
        Ok(self.push_slot(name, SlotKind::Owned(format), texture))
    }

    fn push_slot(&mut self, name: &str, kind: SlotKind, texture: TextureHandle) -> SlotId {
        let id = SlotId(self.slots.len() as u32);
        self.slots.push(Slot { name: name.to_string(), kind, texture });
        id
    }

    pub fn slot_texture(&self, slot: SlotId) -> TextureHandle {
        self.slot(slot).texture
    }

    pub fn slot_kind(&self, slot: SlotId) -> SlotKind {
        self.slot(slot).kind
    }

    pub fn slot_by_name(&self, name: &str) -> Option<SlotId> {
        self.slots
            .iter()
            .position(|s| s.name == name)
            .map(|i| SlotId(i as u32))
    }

    /// Replace the texture of an imported slot and rebind every pin on it
    pub fn set_imported_texture(&mut self, slot: SlotId, texture: TextureHandle) -> Result<()> {
        if self.slot(slot).kind != SlotKind::Imported {
            crate::engine_fatal!(Self::NAME, "Slot '{}' is owned by the graph", self.slot(slot).name);
        }
        self.slots[slot.index()].texture = texture;
        self.rebind_slot(slot)
    }

    /// Enabled stage writing `slot`, other than `except`
    pub fn writer_of(&self, slot: SlotId, except: Option<StageId>) -> Option<StageId> {
        self.stages
            .iter()
            .enumerate()
            .map(|(i, node)| (StageId(i as u32), node))
            .find(|(id, node)| {
                Some(*id) != except && node.enabled && node.outputs.contains(&Some(slot))
            })
            .map(|(id, _)| id)
    }

    // ===== WIRING =====

    /// Bind input pin `pin` of `stage` to `slot`
    pub fn connect_input<'a>(&mut self, stage: StageId, pin: impl Into<PinRef<'a>>, slot: SlotId) -> Result<()> {
        let index = self.pin_index(stage, pin.into(), true);
        let texture = self.slot(slot).texture;
        let node = self.node_mut(stage);
        node.stage.set_input_pin(index, texture)?;
        node.inputs[index] = Some(slot);
        self.order = None;
        Ok(())
    }

    /// Bind output pin `pin` of `stage` to `slot`. Fails if another enabled
    /// stage already writes `slot` while `stage` is enabled.
    pub fn connect_output<'a>(&mut self, stage: StageId, pin: impl Into<PinRef<'a>>, slot: SlotId) -> Result<()> {
        let index = self.pin_index(stage, pin.into(), false);
        if self.node(stage).enabled {
            if let Some(writer) = self.writer_of(slot, Some(stage)) {
                return Err(graph_error(format!(
                    "Slot '{}' already has writer '{}', cannot also connect '{}'",
                    self.slot(slot).name,
                    self.node(writer).stage.name(),
                    self.node(stage).stage.name()
                )));
            }
        }
        let texture = self.slot(slot).texture;
        let node = self.node_mut(stage);
        node.stage.set_output_pin(index, texture)?;
        node.outputs[index] = Some(slot);
        self.order = None;
        Ok(())
    }

    /// Clear an output pin; the stage then renders to the screen
    pub fn disconnect_output<'a>(&mut self, stage: StageId, pin: impl Into<PinRef<'a>>) -> Result<()> {
        let index = self.pin_index(stage, pin.into(), false);
        let node = self.node_mut(stage);
        node.stage.unbind_output_pin(index)?;
        node.outputs[index] = None;
        self.order = None;
        Ok(())
    }

    fn pin_index(&self, stage: StageId, pin: PinRef<'_>, input: bool) -> usize {
        let node = self.node(stage);
        let pins = if input { node.stage.input_pins() } else { node.stage.output_pins() };
        match pin {
            PinRef::Index(index) => index,
            PinRef::Name(name) => match pins.index_of(name) {
                Some(index) => index,
                None => crate::engine_fatal!(
                    Self::NAME,
                    "Stage '{}' has no {} pin '{}'",
                    node.stage.name(),
                    if input { "input" } else { "output" },
                    name
                ),
            },
        }
    }

    // ===== EXECUTION =====

    /// Execution order of the enabled stages.
    ///
    /// A stage depends on the enabled writer of each slot it reads (reading
    /// and writing the same slot is in place, not a dependency). Among ready
    /// stages the one added first runs first.
    pub fn compile(&mut self) -> Result<&[StageId]> {
        if self.order.is_none() {
            self.order = Some(self.topological_order()?);
        }
        Ok(self.order.as_deref().unwrap_or(&[]))
    }

    fn topological_order(&self) -> Result<Vec<StageId>> {
        let n = self.stages.len();
        let mut indegree = vec![0u32; n];
        let mut dependents = vec![Vec::<u32>::new(); n];

        for (i, node) in self.stages.iter().enumerate() {
            if !node.enabled {
                continue;
            }
            let mut writers: Vec<u32> = node
                .inputs
                .iter()
                .flatten()
                .filter_map(|slot| self.writer_of(*slot, Some(StageId(i as u32))))
                .map(|w| w.0)
                .collect();
            writers.sort_unstable();
            writers.dedup();
            for w in writers {
                dependents[w as usize].push(i as u32);
                indegree[i] += 1;
            }
        }

        let mut ready = BinaryHeap::<Reverse<u32>>::new();
        for (i, node) in self.stages.iter().enumerate() {
            if node.enabled && indegree[i] == 0 {
                ready.push(Reverse(i as u32));
            }
        }

        let enabled = self.stages.iter().filter(|s| s.enabled).count();
        let mut order = Vec::with_capacity(enabled);
        while let Some(Reverse(id)) = ready.pop() {
            order.push(StageId(id));
            for &dep in &dependents[id as usize] {
                let d = &mut indegree[dep as usize];
                *d -= 1;
                if *d == 0 {
                    ready.push(Reverse(dep));
                }
            }
        }

        if order.len() < enabled {
            let stuck: Vec<&str> = self
                .stages
                .iter()
                .enumerate()
                .filter(|(i, node)| node.enabled && indegree[*i] > 0)
                .map(|(_, node)| node.stage.name())
                .collect();
            return Err(graph_error(format!("Cycle between stages {:?}", stuck)));
        }
        Ok(order)
    }

    /// Apply every enabled stage in dependency order
    pub fn execute(&mut self) -> Result<()> {
        let order = self.compile()?.to_vec();
        for id in order {
            self.node_mut(id).stage.apply()?;
        }
        crate::engine_trace!("lumen3d::PostProcessGraph", "Executed {} stages", self.order.as_ref().map_or(0, |o| o.len()));
        Ok(())
    }

    /// Reallocate owned slots at the new size, then rebind every connected pin
    pub fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        self.width = width;
        self.height = height;

        let owned: Vec<(usize, TextureFormat, TextureHandle)> = self
            .slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| match s.kind {
                SlotKind::Owned(format) => Some((i, format, s.texture)),
                SlotKind::Imported => None,
            })
            .collect();
        let textures = self.context.with_factory(|f| {
            owned
                .iter()
                .map(|(_, format, old)| {
                    f.release_texture(*old);
                    f.make_texture_2d(&TextureDesc::render_target(width, height, *format))
                })
                .collect::<Result<Vec<_>>>()
        })?;
        for ((i, _, _), texture) in owned.iter().zip(textures) {
            self.slots[*i].texture = texture;
        }

        for node in &mut self.stages {
            for (index, slot) in node.inputs.iter().enumerate() {
                if let Some(slot) = slot {
                    node.stage.set_input_pin(index, self.slots[slot.index()].texture)?;
                }
            }
            for (index, slot) in node.outputs.iter().enumerate() {
                if let Some(slot) = slot {
                    node.stage.set_output_pin(index, self.slots[slot.index()].texture)?;
                }
            }
        }

        crate::engine_debug!(
            "lumen3d::PostProcessGraph",
            "Resized to {}x{} ({} owned slots)",
            width,
            height,
            owned.len()
        );
        Ok(())
    }

    fn rebind_slot(&mut self, slot: SlotId) -> Result<()> {
        let texture = self.slots[slot.index()].texture;
        for node in &mut self.stages {
            for (index, bound) in node.inputs.iter().enumerate() {
                if *bound == Some(slot) {
                    node.stage.set_input_pin(index, texture)?;
                }
            }
            for (index, bound) in node.outputs.iter().enumerate() {
                if *bound == Some(slot) {
                    node.stage.set_output_pin(index, texture)?;
                }
            }
        }
        Ok(())
    }

    fn node(&self, id: StageId) -> &StageNode {
        match self.stages.get(id.index()) {
            Some(node) => node,
            None => crate::engine_fatal!(Self::NAME, "Unknown stage {:?}", id),
        }
    }

    fn node_mut(&mut self, id: StageId) -> &mut StageNode {
        match self.stages.get_mut(id.index()) {
            Some(node) => node,
            None => crate::engine_fatal!(Self::NAME, "Unknown stage {:?}", id),
        }
    }

    fn slot(&self, id: SlotId) -> &Slot {
        match self.slots.get(id.index()) {
            Some(slot) => slot,
            None => crate::engine_fatal!(Self::NAME, "Unknown slot {:?}", id),
        }
    }
}

impl Drop for PostProcessGraph {
    fn drop(&mut self) {
        // stages first: they may hold frame buffers over owned slots
        self.stages.clear();
        let owned: Vec<TextureHandle> = self
            .slots
            .iter()
            .filter(|s| matches!(s.kind, SlotKind::Owned(_)))
            .map(|s| s.texture)
            .collect();
        let _ = self.context.with_factory(|f| {
            for texture in owned {
                f.release_texture(texture);
            }
            Ok(())
        });
    }
}

#[cfg(test)]
#[path = "graph_tests.rs"]
mod tests;
