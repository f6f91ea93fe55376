/// Frame buffer attachments and clear flags

use bitflags::bitflags;

/// Attachment point of a frame buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attachment {
    Color0,
    DepthStencil,
}

bitflags! {
    /// Which planes of the bound frame buffer a clear touches
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ClearFlags: u32 {
        const COLOR = 1 << 0;
        const DEPTH = 1 << 1;
        const STENCIL = 1 << 2;
    }
}
