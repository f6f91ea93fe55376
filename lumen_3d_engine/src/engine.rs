/// Lumen3D Engine - logging facade and engine context
///
/// `Engine` keeps the one piece of process-wide state the engine has: the
/// replaceable logger behind the `engine_*!` macros. Everything else (render
/// engine, resource factory, configuration) lives in an [`EngineContext`] that
/// the application creates and passes to the objects that need it.

use std::sync::{Arc, Mutex, OnceLock, RwLock};
use std::time::SystemTime;
use crate::error::{Error, Result};
use crate::log::{DefaultLogger, LogEntry, LogSeverity, Logger};
use crate::render_engine::{DeviceCaps, RenderEngine, ResourceFactory};

// ===== INTERNAL STATE =====

/// Global logger (initialized with DefaultLogger)
static LOGGER: OnceLock<RwLock<Box<dyn Logger>>> = OnceLock::new();

fn logger() -> &'static RwLock<Box<dyn Logger>> {
    LOGGER.get_or_init(|| RwLock::new(Box::new(DefaultLogger)))
}

// ===== LOGGING FACADE =====

/// Global logging facade
///
/// # Example
///
/// ```no_run
/// use lumen_3d_engine::lumen3d::Engine;
/// use lumen_3d_engine::lumen3d::log::{Logger, LogEntry};
///
/// struct Silent;
///
/// impl Logger for Silent {
///     fn log(&self, _entry: &LogEntry) {}
/// }
///
/// Engine::set_logger(Silent);
/// // ...
/// Engine::reset_logger();
/// ```
pub struct Engine;

impl Engine {
    /// Replace the global logger
    pub fn set_logger<L: Logger + 'static>(logger_impl: L) {
        if let Ok(mut lock) = logger().write() {
            *lock = Box::new(logger_impl);
        }
    }

    /// Reset logger to default (DefaultLogger)
    pub fn reset_logger() {
        if let Ok(mut lock) = logger().write() {
            *lock = Box::new(DefaultLogger);
        }
    }

    /// Internal logging method (for simple logs without file:line)
    ///
    /// Used by macros like engine_info!, engine_warn!, etc.
    pub fn log(severity: LogSeverity, source: &str, message: String) {
        if let Ok(lock) = logger().read() {
            lock.log(&LogEntry {
                severity,
                timestamp: SystemTime::now(),
                source: source.to_string(),
                message,
                file: None,
                line: None,
            });
        }
    }

    /// Internal logging method with file:line information
    ///
    /// Used by engine_error!, engine_err!, engine_bail! and engine_fatal!.
    pub fn log_detailed(
        severity: LogSeverity,
        source: &str,
        message: String,
        file: &'static str,
        line: u32,
    ) {
        if let Ok(lock) = logger().read() {
            lock.log(&LogEntry {
                severity,
                timestamp: SystemTime::now(),
                source: source.to_string(),
                message,
                file: Some(file),
                line: Some(line),
            });
        }
    }
}

// ===== CONFIGURATION =====

/// Engine-wide settings
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Application name (used in log lines and window titles)
    pub app_name: String,

    /// Motion-blur sub-frame count: capacity of each object's transform history
    pub motion_frames: usize,

    /// When false, stages use their raster variant even on compute-capable devices
    pub allow_compute: bool,

    /// Maximum blur radius in texels for depth of field and bokeh
    pub max_blur_radius: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            app_name: "Lumen3D".to_string(),
            motion_frames: 5,
            allow_compute: true,
            max_blur_radius: 8,
        }
    }
}

// ===== ENGINE CONTEXT =====

/// Composed engine services, passed to constructors
///
/// Cloning is cheap (two `Arc` clones plus the config). Locks taken through
/// `with_render_engine` / `with_factory` are released before the closure's
/// caller continues, so a stage must never call into a child stage from
/// inside one of these closures.
#[derive(Clone)]
pub struct EngineContext {
    config: EngineConfig,
    render_engine: Arc<Mutex<dyn RenderEngine>>,
    resource_factory: Arc<Mutex<dyn ResourceFactory>>,
}

impl EngineContext {
    /// Wrap concrete backend objects
    pub fn new<R, F>(config: EngineConfig, render_engine: R, resource_factory: F) -> Self
    where
        R: RenderEngine + 'static,
        F: ResourceFactory + 'static,
    {
        Self {
            config,
            render_engine: Arc::new(Mutex::new(render_engine)),
            resource_factory: Arc::new(Mutex::new(resource_factory)),
        }
    }

    /// Build from already shared backend objects
    pub fn from_shared(
        config: EngineConfig,
        render_engine: Arc<Mutex<dyn RenderEngine>>,
        resource_factory: Arc<Mutex<dyn ResourceFactory>>,
    ) -> Self {
        Self { config, render_engine, resource_factory }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn render_engine(&self) -> Arc<Mutex<dyn RenderEngine>> {
        self.render_engine.clone()
    }

    pub fn resource_factory(&self) -> Arc<Mutex<dyn ResourceFactory>> {
        self.resource_factory.clone()
    }

    /// Run `f` with the render engine locked
    pub fn with_render_engine<T>(
        &self,
        f: impl FnOnce(&mut dyn RenderEngine) -> Result<T>,
    ) -> Result<T> {
        let mut guard = self
            .render_engine
            .lock()
            .map_err(|_| Error::BackendError("Render engine lock poisoned".to_string()))?;
        f(&mut *guard)
    }

    /// Run `f` with the resource factory locked
    pub fn with_factory<T>(
        &self,
        f: impl FnOnce(&mut dyn ResourceFactory) -> Result<T>,
    ) -> Result<T> {
        let mut guard = self
            .resource_factory
            .lock()
            .map_err(|_| Error::BackendError("Resource factory lock poisoned".to_string()))?;
        f(&mut *guard)
    }

    /// Snapshot of the device capabilities
    pub fn device_caps(&self) -> Result<DeviceCaps> {
        self.with_render_engine(|re| Ok(re.device_caps().clone()))
    }

    /// Compute variants are used: device is compute-capable and config allows it
    pub fn compute_enabled(&self) -> Result<bool> {
        Ok(self.config.allow_compute && self.device_caps()?.compute_capable())
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
