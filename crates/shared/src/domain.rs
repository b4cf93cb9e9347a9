use serde::{Deserialize, Serialize};
use smart_leds::RGB8;

use crate::error::ApiException;

pub type Rgb = RGB8;

pub const BRANCHES_PER_SIDE: usize = 3;
pub const BRANCH_COUNT: usize = 2 * BRANCHES_PER_SIDE;

/// Formats a pixel as `#RRGGBB` with uppercase hex digits.
pub fn hex_color(color: Rgb) -> String {
    format!("#{:02X}{:02X}{:02X}", color.r, color.g, color.b)
}

/// Parses `#RRGGBB` (the `#` is optional, digits are case-insensitive).
pub fn parse_hex_color(raw: &str) -> Option<Rgb> {
    let digits = raw.strip_prefix('#').unwrap_or(raw);
    if digits.len() != 6 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let channel = |at: usize| u8::from_str_radix(&digits[at..at + 2], 16).ok();
    Some(Rgb::new(channel(0)?, channel(2)?, channel(4)?))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Left,
    Right,
}

/// One of the six branches, in wire order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BranchId {
    L1,
    L2,
    L3,
    R1,
    R2,
    R3,
}

impl BranchId {
    pub const ALL: [BranchId; BRANCH_COUNT] = [
        BranchId::L1,
        BranchId::L2,
        BranchId::L3,
        BranchId::R1,
        BranchId::R2,
        BranchId::R3,
    ];

    /// Position in the linear color sequence, 0 for L1 through 5 for R3.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn side(self) -> Side {
        if self.index() < BRANCHES_PER_SIDE {
            Side::Left
        } else {
            Side::Right
        }
    }

    /// Index into the per-side anchor and reversal arrays.
    pub fn slot(self) -> usize {
        self.index() % BRANCHES_PER_SIDE
    }

    pub fn from_side_slot(side: Side, slot: usize) -> Option<Self> {
        if slot >= BRANCHES_PER_SIDE {
            return None;
        }
        let base = match side {
            Side::Left => 0,
            Side::Right => BRANCHES_PER_SIDE,
        };
        Self::ALL.get(base + slot).copied()
    }
}

/// Where a linear color index lands on the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelLocation {
    Trunk { row: usize },
    Branch { branch: BranchId, offset: usize },
}

/// Geometry of the tree: one trunk and six equally long branches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layout {
    pub trunk_len: u16,
    pub branch_len: u16,
    pub left_anchors: [u16; BRANCHES_PER_SIDE],
    pub right_anchors: [u16; BRANCHES_PER_SIDE],
    pub left_reversed: [bool; BRANCHES_PER_SIDE],
    pub right_reversed: [bool; BRANCHES_PER_SIDE],
}

impl Layout {
    pub fn validate(&self) -> Result<(), ApiException> {
        if self.trunk_len == 0 {
            return Err(ApiException::validation("trunk length must be positive"));
        }
        if self.branch_len == 0 {
            return Err(ApiException::validation("branch length must be positive"));
        }
        for branch in BranchId::ALL {
            let anchor = self.anchor(branch);
            if anchor >= self.trunk_len {
                return Err(ApiException::validation(format!(
                    "anchor {anchor} of branch {branch:?} is outside trunk of length {}",
                    self.trunk_len
                )));
            }
        }
        Ok(())
    }

    /// Length of the linear color sequence.
    pub fn pixel_count(&self) -> usize {
        usize::from(self.trunk_len) + BRANCH_COUNT * usize::from(self.branch_len)
    }

    pub fn anchor(&self, branch: BranchId) -> u16 {
        match branch.side() {
            Side::Left => self.left_anchors[branch.slot()],
            Side::Right => self.right_anchors[branch.slot()],
        }
    }

    pub fn is_reversed(&self, branch: BranchId) -> bool {
        match branch.side() {
            Side::Left => self.left_reversed[branch.slot()],
            Side::Right => self.right_reversed[branch.slot()],
        }
    }

    /// First linear index occupied by `branch`.
    pub fn branch_start(&self, branch: BranchId) -> usize {
        usize::from(self.trunk_len) + branch.index() * usize::from(self.branch_len)
    }

    pub fn locate(&self, index: usize) -> Option<PixelLocation> {
        let trunk_len = usize::from(self.trunk_len);
        let branch_len = usize::from(self.branch_len);
        if index < trunk_len {
            return Some(PixelLocation::Trunk { row: index });
        }
        if branch_len == 0 || index >= self.pixel_count() {
            return None;
        }
        let rest = index - trunk_len;
        let branch = BranchId::ALL[rest / branch_len];
        Some(PixelLocation::Branch {
            branch,
            offset: rest % branch_len,
        })
    }
}

#[cfg(test)]
#[path = "tests/domain_tests.rs"]
mod tests;
