//! Central scene manager for the engine.
//!
//! Owns the registered renderables and scene objects, collects them into the
//! render queue every frame and flushes the queue through the render engine:
//! cull, begin frame, one technique bind per bucket, draws bracketed by the
//! renderable hooks, clear, end frame, notify the application.

use slotmap::{Key, SlotMap};
use crate::app::{App, UpdateResult};
use crate::camera::Camera;
use crate::engine::EngineContext;
use crate::error::{Error, Result};
use crate::render_engine::RenderEngine;
use super::aabb::AABB;
use super::culler::{Culler, FrustumCuller};
use super::instance_data::InstanceData;
use super::render_queue::{RenderBucket, RenderQueue};
use super::renderable::{Instancing, RenderContext, Renderable, RenderableKey};
use super::scene_object::{SceneObject, SceneObjectAttrib, SceneObjectKey};

const SOURCE: &str = "lumen3d::SceneManager";

/// Counters of the last flush
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SceneStats {
    /// Visible scene objects submitted by culling
    pub objects_rendered: u32,
    /// Queue entries rendered
    pub renderables_rendered: u32,
    pub primitives_rendered: u64,
    pub vertices_rendered: u64,
    /// `set_render_effect` calls (one per bucket)
    pub effect_binds: u32,
    pub draw_calls: u32,
}

pub struct SceneManager {
    context: EngineContext,
    camera: Camera,
    culler: Box<dyn Culler>,
    renderables: SlotMap<RenderableKey, Box<dyn Renderable>>,
    objects: SlotMap<SceneObjectKey, Box<dyn SceneObject>>,
    queue: RenderQueue,
    stats: SceneStats,
    app_time: f32,
    elapsed: f32,
}

impl SceneManager {
    /// Scene manager with a frustum culler
    pub fn new(context: EngineContext, camera: Camera) -> Self {
        Self {
            context,
            camera,
            culler: Box::new(FrustumCuller::new()),
            renderables: SlotMap::with_key(),
            objects: SlotMap::with_key(),
            queue: RenderQueue::new(),
            stats: SceneStats::default(),
            app_time: 0.0,
            elapsed: 0.0,
        }
    }

    pub fn context(&self) -> &EngineContext {
        &self.context
    }

    pub fn set_culler(&mut self, culler: Box<dyn Culler>) {
        self.culler = culler;
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    // ===== RENDERABLES =====

    /// Register a renderable; its `build_mesh_info` runs now
    pub fn add_renderable(&mut self, mut renderable: Box<dyn Renderable>) -> Result<RenderableKey> {
        self.context.with_render_engine(|re| renderable.build_mesh_info(re))?;
        crate::engine_debug!(SOURCE, "Registered renderable '{}'", renderable.name());
        Ok(self.renderables.insert(renderable))
    }

    pub fn remove_renderable(&mut self, key: RenderableKey) -> Option<Box<dyn Renderable>> {
        self.renderables.remove(key)
    }

    pub fn renderable(&self, key: RenderableKey) -> Option<&dyn Renderable> {
        self.renderables.get(key).map(|r| r.as_ref())
    }

    pub fn renderable_mut(&mut self, key: RenderableKey) -> Option<&mut (dyn Renderable + 'static)> {
        self.renderables.get_mut(key).map(|r| r.as_mut())
    }

    pub fn renderable_count(&self) -> usize {
        self.renderables.len()
    }

    /// Forward the motion-vector mode to every registered renderable
    pub fn motion_vec_pass(&mut self, motion_vec: bool) {
        for (_, renderable) in self.renderables.iter_mut() {
            renderable.motion_vec_pass(motion_vec);
        }
    }

    // ===== SCENE OBJECTS =====

    pub fn add_object(&mut self, object: Box<dyn SceneObject>) -> SceneObjectKey {
        self.objects.insert(object)
    }

    pub fn remove_object(&mut self, key: SceneObjectKey) -> Option<Box<dyn SceneObject>> {
        self.objects.remove(key)
    }

    pub fn object(&self, key: SceneObjectKey) -> Option<&dyn SceneObject> {
        self.objects.get(key).map(|o| o.as_ref())
    }

    pub fn object_mut(&mut self, key: SceneObjectKey) -> Option<&mut (dyn SceneObject + 'static)> {
        self.objects.get_mut(key).map(|o| o.as_mut())
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Point every scene object at `renderable`
    pub fn set_renderable_for_all(&mut self, renderable: RenderableKey) {
        for (_, object) in self.objects.iter_mut() {
            object.set_renderable(renderable);
        }
    }

    // ===== QUEUE =====

    /// Queue a renderable under its current technique
    pub fn submit(&mut self, key: RenderableKey) {
        let technique = self.checked_renderable(key).technique();
        self.queue.push(key, technique);
    }

    /// Queue a renderable and one instance record for it
    pub fn submit_instance(&mut self, key: RenderableKey, instance: InstanceData) {
        let technique = self.checked_renderable(key).technique();
        self.queue.push_instance(key, technique, instance);
    }

    pub fn queue(&self) -> &RenderQueue {
        &self.queue
    }

    /// Counters of the last flush
    pub fn stats(&self) -> &SceneStats {
        &self.stats
    }

    fn checked_renderable(&self, key: RenderableKey) -> &dyn Renderable {
        if key.is_null() {
            crate::engine_fatal!(SOURCE, "Submitted a null renderable key");
        }
        match self.renderables.get(key) {
            Some(r) => r.as_ref(),
            None => crate::engine_fatal!(SOURCE, "Renderable {:?} is not registered", key),
        }
    }

    // ===== FRAME =====

    /// Drive one frame.
    ///
    /// Moveable objects are updated once, then `app.update` runs for passes
    /// 0, 1, 2... Each pass returning `NEED_FLUSH` is followed by a flush; the
    /// pass returning `FINISHED` ends the frame.
    pub fn update(&mut self, app: &mut dyn App, app_time: f32, elapsed: f32) -> Result<()> {
        self.app_time = app_time;
        self.elapsed = elapsed;

        for (_, object) in self.objects.iter_mut() {
            if object.attrib().contains(SceneObjectAttrib::MOVEABLE) {
                object.update(app_time, elapsed);
            }
        }

        let mut pass = 0;
        loop {
            let result = app.update(self, pass, app_time, elapsed)?;
            if result.contains(UpdateResult::NEED_FLUSH) {
                self.flush(app)?;
            }
            if result.contains(UpdateResult::FINISHED) {
                return Ok(());
            }
            pass += 1;
        }
    }

    /// Cull, render and clear the queue, then notify `app`
    pub fn flush(&mut self, app: &mut dyn App) -> Result<()> {
        self.stats = SceneStats::default();
        self.cull_scene();

        // The queue is emptied before drawing so an error cannot leave stale entries
        let buckets = self.queue.take();

        let render_engine = self.context.render_engine();
        {
            let mut re = render_engine
                .lock()
                .map_err(|_| Error::BackendError("Render engine lock poisoned".to_string()))?;

            re.begin_frame()?;
            for bucket in &buckets {
                self.render_bucket(bucket, &mut *re)?;
            }
            re.end_frame()?;
        }

        crate::engine_trace!(
            SOURCE,
            "Flushed {} renderables in {} buckets ({} draws)",
            self.stats.renderables_rendered,
            self.stats.effect_binds,
            self.stats.draw_calls
        );

        app.render_over()
    }

    /// Submit every visible scene object's renderable and instance
    fn cull_scene(&mut self) {
        let mut candidates: Vec<(SceneObjectKey, AABB)> = Vec::new();
        let mut visible: Vec<SceneObjectKey> = Vec::new();

        for (key, object) in self.objects.iter() {
            if object.attrib().contains(SceneObjectAttrib::CULLABLE) {
                let bounds = self.checked_renderable(object.renderable()).bounds();
                candidates.push((key, bounds.transformed(&object.model_matrix())));
            } else {
                visible.push(key);
            }
        }
        self.culler.cull(&self.camera, &candidates, &mut visible);

        for key in visible {
            let (renderable, instance) = match self.objects.get(key) {
                Some(object) => (object.renderable(), object.instance_data()),
                None => continue,
            };
            match instance {
                Some(instance) => self.submit_instance(renderable, instance),
                None => self.submit(renderable),
            }
            self.stats.objects_rendered += 1;
        }
    }

    fn render_bucket(&mut self, bucket: &RenderBucket, re: &mut dyn RenderEngine) -> Result<()> {
        re.set_render_effect(bucket.technique)?;
        self.stats.effect_binds += 1;

        let ctx = RenderContext {
            camera: &self.camera,
            app_time: self.app_time,
            elapsed: self.elapsed,
        };

        for entry in &bucket.entries {
            let renderable = match self.renderables.get_mut(entry.renderable) {
                Some(r) => r,
                None => crate::engine_fatal!(SOURCE, "Renderable {:?} removed while queued", entry.renderable),
            };
            let layout = renderable.render_layout();
            if layout.is_null() {
                crate::engine_fatal!(SOURCE, "Renderable '{}' has a null render layout", renderable.name());
            }

            renderable.on_render_begin(&ctx, re)?;

            let instance_count = entry.instances.len().max(1) as u32;
            match renderable.instancing() {
                Instancing::Hardware => {
                    if !entry.instances.is_empty() {
                        re.update_instance_stream(layout, bytemuck::cast_slice(&entry.instances))?;
                    }
                    re.render(layout, instance_count)?;
                    self.stats.draw_calls += 1;
                }
                Instancing::PerInstance => {
                    if entry.instances.is_empty() {
                        re.render(layout, 1)?;
                        self.stats.draw_calls += 1;
                    }
                    for (index, instance) in entry.instances.iter().enumerate() {
                        renderable.on_instance_begin(index, instance, re)?;
                        re.render(layout, 1)?;
                        self.stats.draw_calls += 1;
                    }
                }
            }

            renderable.on_render_end(re)?;

            self.stats.renderables_rendered += 1;
            self.stats.primitives_rendered += renderable.primitive_count() as u64 * instance_count as u64;
            self.stats.vertices_rendered += renderable.vertex_count() as u64 * instance_count as u64;
        }

        Ok(())
    }
}

#[cfg(test)]
#[path = "scene_manager_tests.rs"]
mod tests;
