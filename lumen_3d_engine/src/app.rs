/// Application callbacks driven by the SceneManager.

use bitflags::bitflags;
use crate::error::Result;
use crate::scene::SceneManager;

bitflags! {
    /// What the scene manager does after one update pass
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct UpdateResult: u32 {
        /// Flush the render queue after this pass
        const NEED_FLUSH = 1 << 0;
        /// This was the last pass of the frame
        const FINISHED = 1 << 1;
    }
}

/// Application driven once per frame by [`SceneManager::update`].
///
/// `update` is called with pass 0, 1, 2... until it returns a result
/// containing `FINISHED`. Each result containing `NEED_FLUSH` makes the scene
/// manager cull, render and clear its queue before the next pass. A plain
/// application returns `NEED_FLUSH | FINISHED` from pass 0.
pub trait App {
    fn update(
        &mut self,
        scene: &mut SceneManager,
        pass: u32,
        app_time: f32,
        elapsed: f32,
    ) -> Result<UpdateResult>;

    /// Called after every flush, once the frame has been closed
    fn render_over(&mut self) -> Result<()> {
        Ok(())
    }
}
