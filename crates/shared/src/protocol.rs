use serde::{Deserialize, Serialize};

use crate::domain::{Layout, BRANCHES_PER_SIDE};

/// Messages pushed from the controller to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Frame(Frame),
}

/// One snapshot of colors, status and layout metadata.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Frame {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub b: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on: Option<bool>,
    pub colors: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<FrameMeta>,
}

/// Layout as it travels on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameMeta {
    #[serde(rename = "trunkLen")]
    pub trunk_len: u16,
    #[serde(rename = "branchLen")]
    pub branch_len: u16,
    #[serde(rename = "Y_LEFT")]
    pub y_left: [u16; BRANCHES_PER_SIDE],
    #[serde(rename = "Y_RIGHT")]
    pub y_right: [u16; BRANCHES_PER_SIDE],
    #[serde(rename = "L_REV")]
    pub l_rev: [bool; BRANCHES_PER_SIDE],
    #[serde(rename = "R_REV")]
    pub r_rev: [bool; BRANCHES_PER_SIDE],
}

impl From<&Layout> for FrameMeta {
    fn from(layout: &Layout) -> Self {
        Self {
            trunk_len: layout.trunk_len,
            branch_len: layout.branch_len,
            y_left: layout.left_anchors,
            y_right: layout.right_anchors,
            l_rev: layout.left_reversed,
            r_rev: layout.right_reversed,
        }
    }
}

impl From<&FrameMeta> for Layout {
    fn from(meta: &FrameMeta) -> Self {
        Self {
            trunk_len: meta.trunk_len,
            branch_len: meta.branch_len,
            left_anchors: meta.y_left,
            right_anchors: meta.y_right,
            left_reversed: meta.l_rev,
            right_reversed: meta.r_rev,
        }
    }
}

/// Messages sent by clients. The controller decodes these leniently, see
/// `frame_sync::decoder`; this type is what well-behaved clients emit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Set(SetRequest),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SetRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub b: Option<u8>,
}

#[cfg(test)]
#[path = "tests/protocol_tests.rs"]
mod tests;
