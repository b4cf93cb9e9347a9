use std::sync::Arc;

use frame_sync::FrameSync;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) sync: Arc<FrameSync>,
    pub(crate) max_command_bytes: usize,
}
