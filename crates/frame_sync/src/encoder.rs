use shared::{
    domain::{hex_color, BranchId, Rgb},
    error::{ApiException, ErrorCode},
    protocol::{Frame, FrameMeta, ServerMessage},
};

use crate::{
    layout::{read_strip, StripHandle},
    SyncContext,
};

/// Snapshot of the current colors, status and layout.
///
/// Reads only. Without an attached layout the frame carries status but no
/// colors and no `meta`.
pub fn encode_frame(ctx: &SyncContext) -> Frame {
    let b = ctx.status().brightness.read();
    let on = ctx.status().power.read();

    let Some(attachment) = ctx.registry().attachment() else {
        return Frame {
            b,
            on,
            colors: Vec::new(),
            meta: None,
        };
    };
    let layout = &attachment.layout;
    let buffers = &attachment.buffers;

    let mut colors = Vec::with_capacity(layout.pixel_count());
    push_strip(&mut colors, &buffers.trunk, layout.trunk_len);
    for branch in BranchId::ALL {
        push_strip(&mut colors, buffers.branch(branch), layout.branch_len);
    }

    Frame {
        b,
        on,
        colors,
        meta: Some(FrameMeta::from(layout)),
    }
}

/// [`encode_frame`] serialized as a `{"type":"frame",...}` text message.
pub fn encode_frame_json(ctx: &SyncContext) -> Result<String, ApiException> {
    serde_json::to_string(&ServerMessage::Frame(encode_frame(ctx)))
        .map_err(|e| ApiException::new(ErrorCode::Internal, e.to_string()))
}

// Always emits exactly `len` entries; a strip the host shrank reads as black.
fn push_strip(colors: &mut Vec<String>, strip: &StripHandle, len: u16) {
    let pixels = read_strip(strip);
    colors.extend((0..usize::from(len)).map(|i| {
        hex_color(pixels.get(i).copied().unwrap_or(Rgb::new(0, 0, 0)))
    }));
}

#[cfg(test)]
#[path = "tests/encoder_tests.rs"]
mod tests;
