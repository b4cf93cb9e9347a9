//! Frame synchronization between an LED tree and its browser clients.
//!
//! The host owns the pixel strips and the power/brightness state. This crate
//! reads both to build frames, applies client commands through the host's
//! hooks, and decides when frames are pushed.

use shared::{domain::Layout, error::ApiException};

pub mod decoder;
pub mod encoder;
pub mod layout;
pub mod status;
pub mod sync;

pub use layout::{LayoutRegistry, StripHandle, TreeBuffers};
pub use status::{StatusField, StatusHooks};
pub use sync::{ClientAttachment, CommandOutcome, FrameSync, FrameText, SetBroadcast};

/// Layout plus status hooks, passed by reference into the encoder and decoder.
#[derive(Debug, Default)]
pub struct SyncContext {
    layout: LayoutRegistry,
    status: StatusHooks,
}

impl SyncContext {
    pub fn new(status: StatusHooks) -> Self {
        Self {
            layout: LayoutRegistry::default(),
            status,
        }
    }

    /// One-shot; a second call fails and keeps the first layout.
    pub fn attach_layout(&self, layout: Layout, buffers: TreeBuffers) -> Result<(), ApiException> {
        self.layout.attach(layout, buffers)
    }

    pub fn layout(&self) -> Option<&Layout> {
        self.layout.snapshot()
    }

    pub fn registry(&self) -> &LayoutRegistry {
        &self.layout
    }

    pub fn status(&self) -> &StatusHooks {
        &self.status
    }
}
