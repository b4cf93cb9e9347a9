use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Deserialize;
use tokio::sync::broadcast;
use tracing::{debug, error, info};

use crate::{
    decoder::{apply_command, decode_command, Applied, Decoded, SetCommand},
    encoder::encode_frame_json,
    SyncContext,
};

/// Encoded frame text, shared by every receiver of one broadcast.
pub type FrameText = Arc<str>;

const EMPTY_FRAME: &str = r#"{"type":"frame","colors":[]}"#;

/// Whether a `set` that reached no mutator still pushes a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SetBroadcast {
    #[default]
    Always,
    WhenApplied,
}

impl SetBroadcast {
    fn should_broadcast(self, applied: Applied) -> bool {
        match self {
            SetBroadcast::Always => true,
            SetBroadcast::WhenApplied => applied.any(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    Ignored,
    Accepted { applied: Applied, broadcast: bool },
}

/// What a newly attached client needs: its private first frame and the
/// shared feed of every later one.
#[derive(Debug)]
pub struct ClientAttachment {
    pub initial: FrameText,
    pub frames: broadcast::Receiver<FrameText>,
}

/// Decides when frames are pushed and serializes every mutating entry point.
#[derive(Debug)]
pub struct FrameSync {
    ctx: SyncContext,
    frames: broadcast::Sender<FrameText>,
    gate: Mutex<()>,
    policy: SetBroadcast,
}

impl FrameSync {
    pub fn new(ctx: SyncContext, capacity: usize, policy: SetBroadcast) -> Self {
        let (frames, _) = broadcast::channel(capacity.max(1));
        Self {
            ctx,
            frames,
            gate: Mutex::new(()),
            policy,
        }
    }

    pub fn context(&self) -> &SyncContext {
        &self.ctx
    }

    pub fn policy(&self) -> SetBroadcast {
        self.policy
    }

    pub fn client_count(&self) -> usize {
        self.frames.receiver_count()
    }

    pub fn current_frame(&self) -> FrameText {
        let _gate = self.lock();
        self.encode()
    }

    /// Subscribes before encoding so no broadcast can fall between the two.
    pub fn attach_client(&self) -> ClientAttachment {
        let _gate = self.lock();
        let frames = self.frames.subscribe();
        let initial = self.encode();
        info!(clients = self.frames.receiver_count(), "client attached");
        ClientAttachment { initial, frames }
    }

    pub fn handle_client_message(&self, raw: &[u8]) -> CommandOutcome {
        match decode_command(raw) {
            Decoded::Set(command) => self.apply(command),
            Decoded::Ignored(reason) => {
                debug!(?reason, "ignoring client message");
                CommandOutcome::Ignored
            }
        }
    }

    pub fn set_power(&self, on: bool) -> CommandOutcome {
        self.apply(SetCommand {
            power: Some(on),
            brightness: None,
        })
    }

    pub fn set_brightness(&self, brightness: u8) -> CommandOutcome {
        self.apply(SetCommand {
            power: None,
            brightness: Some(brightness),
        })
    }

    /// Host hook, called once per render cycle after the strips are updated.
    /// Returns how many clients the frame was queued for.
    pub fn cadence(&self) -> usize {
        let _gate = self.lock();
        self.broadcast_locked()
    }

    /// Runs `paint` and the following broadcast under the gate, so no frame
    /// is ever encoded from a half-updated set of strips. Hosts that write
    /// the buffers from another thread should repaint through this.
    pub fn render_and_push(&self, paint: impl FnOnce()) -> usize {
        let _gate = self.lock();
        paint();
        self.broadcast_locked()
    }

    fn apply(&self, command: SetCommand) -> CommandOutcome {
        let _gate = self.lock();
        let applied = apply_command(self.ctx.status(), command);
        let broadcast = self.policy.should_broadcast(applied);
        if broadcast {
            self.broadcast_locked();
        }
        debug!(?command, ?applied, broadcast, "set command handled");
        CommandOutcome::Accepted { applied, broadcast }
    }

    fn broadcast_locked(&self) -> usize {
        if self.frames.receiver_count() == 0 {
            return 0;
        }
        self.frames.send(self.encode()).unwrap_or(0)
    }

    fn encode(&self) -> FrameText {
        match encode_frame_json(&self.ctx) {
            Ok(text) => FrameText::from(text),
            Err(err) => {
                error!(%err, "failed to encode frame");
                FrameText::from(EMPTY_FRAME)
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        self.gate.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
#[path = "tests/sync_tests.rs"]
mod tests;
