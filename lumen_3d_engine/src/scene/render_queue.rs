/// Render queue: renderables bucketed by shading state.
///
/// Buckets iterate in the order their technique was first submitted during
/// the current cycle; entries inside a bucket keep submission order. A
/// renderable appears at most once per cycle: submitting it again merges the
/// new instances into its existing entry.

use rustc_hash::FxHashMap;
use slotmap::Key;
use crate::render_engine::TechniqueHandle;
use super::instance_data::InstanceData;
use super::renderable::RenderableKey;

/// One renderable and the instances queued for it this cycle
#[derive(Debug, Clone)]
pub struct RenderQueueEntry {
    pub renderable: RenderableKey,
    pub instances: Vec<InstanceData>,
}

/// All entries sharing one technique
#[derive(Debug, Clone)]
pub struct RenderBucket {
    pub technique: TechniqueHandle,
    pub entries: Vec<RenderQueueEntry>,
}

#[derive(Debug, Default)]
pub struct RenderQueue {
    buckets: Vec<RenderBucket>,
    bucket_index: FxHashMap<TechniqueHandle, usize>,
    /// renderable -> (bucket, entry)
    entry_index: FxHashMap<RenderableKey, (usize, usize)>,
}

impl RenderQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `renderable` under `technique`, returning its entry.
    ///
    /// A renderable already queued this cycle keeps its original bucket and
    /// position.
    pub fn push(&mut self, renderable: RenderableKey, technique: TechniqueHandle) -> &mut RenderQueueEntry {
        if renderable.is_null() {
            crate::engine_fatal!("lumen3d::RenderQueue", "Submitted a null renderable key");
        }
        if technique.is_null() {
            crate::engine_fatal!("lumen3d::RenderQueue", "Submitted a renderable with a null technique");
        }

        let (bucket, entry) = match self.entry_index.get(&renderable) {
            Some(&position) => position,
            None => {
                let bucket = match self.bucket_index.get(&technique) {
                    Some(&b) => b,
                    None => {
                        self.buckets.push(RenderBucket { technique, entries: Vec::new() });
                        let b = self.buckets.len() - 1;
                        self.bucket_index.insert(technique, b);
                        b
                    }
                };
                let entries = &mut self.buckets[bucket].entries;
                entries.push(RenderQueueEntry { renderable, instances: Vec::new() });
                let position = (bucket, entries.len() - 1);
                self.entry_index.insert(renderable, position);
                position
            }
        };

        &mut self.buckets[bucket].entries[entry]
    }

    /// Queue `renderable` and append one instance record to its entry
    pub fn push_instance(
        &mut self,
        renderable: RenderableKey,
        technique: TechniqueHandle,
        instance: InstanceData,
    ) {
        self.push(renderable, technique).instances.push(instance);
    }

    pub fn buckets(&self) -> &[RenderBucket] {
        &self.buckets
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Number of queued renderables
    pub fn len(&self) -> usize {
        self.entry_index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entry_index.is_empty()
    }

    pub fn contains(&self, renderable: RenderableKey) -> bool {
        self.entry_index.contains_key(&renderable)
    }

    /// Move all buckets out, leaving the queue empty
    pub fn take(&mut self) -> Vec<RenderBucket> {
        self.bucket_index.clear();
        self.entry_index.clear();
        std::mem::take(&mut self.buckets)
    }

    pub fn clear(&mut self) {
        self.take();
    }
}

#[cfg(test)]
#[path = "render_queue_tests.rs"]
mod tests;
