use std::sync::{Arc, OnceLock, PoisonError, RwLock, RwLockReadGuard};

use shared::{
    domain::{BranchId, Layout, Rgb, BRANCH_COUNT},
    error::{ApiException, ErrorCode},
};
use tracing::{info, warn};

/// Shared handle to one LED strip. The host writes, the encoder only reads.
pub type StripHandle = Arc<RwLock<Vec<Rgb>>>;

/// The seven strips of the tree: trunk, then L1..L3, R1..R3.
#[derive(Debug, Clone)]
pub struct TreeBuffers {
    pub trunk: StripHandle,
    pub branches: [StripHandle; BRANCH_COUNT],
}

impl TreeBuffers {
    /// Allocates black strips sized for `layout`.
    pub fn allocate(layout: &Layout) -> Self {
        let strip = |len: u16| Arc::new(RwLock::new(vec![Rgb::new(0, 0, 0); usize::from(len)]));
        Self {
            trunk: strip(layout.trunk_len),
            branches: std::array::from_fn(|_| strip(layout.branch_len)),
        }
    }

    pub fn branch(&self, branch: BranchId) -> &StripHandle {
        &self.branches[branch.index()]
    }

    fn check_lengths(&self, layout: &Layout) -> Result<(), ApiException> {
        let trunk_len = read_strip(&self.trunk).len();
        if trunk_len != usize::from(layout.trunk_len) {
            return Err(ApiException::validation(format!(
                "trunk buffer holds {trunk_len} pixels, layout expects {}",
                layout.trunk_len
            )));
        }
        for branch in BranchId::ALL {
            let len = read_strip(self.branch(branch)).len();
            if len != usize::from(layout.branch_len) {
                return Err(ApiException::validation(format!(
                    "branch {branch:?} buffer holds {len} pixels, layout expects {}",
                    layout.branch_len
                )));
            }
        }
        Ok(())
    }
}

pub(crate) fn read_strip(strip: &StripHandle) -> RwLockReadGuard<'_, Vec<Rgb>> {
    strip.read().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug)]
pub(crate) struct Attachment {
    pub(crate) layout: Layout,
    pub(crate) buffers: TreeBuffers,
}

/// Write-once holder for the layout and its buffers.
#[derive(Debug, Default)]
pub struct LayoutRegistry {
    attached: OnceLock<Attachment>,
}

impl LayoutRegistry {
    pub fn attach(&self, layout: Layout, buffers: TreeBuffers) -> Result<(), ApiException> {
        if self.attached.get().is_some() {
            warn!("ignoring second layout attach");
            return Err(already_attached());
        }
        layout.validate()?;
        buffers.check_lengths(&layout)?;

        let pixels = layout.pixel_count();
        let (trunk_len, branch_len) = (layout.trunk_len, layout.branch_len);
        self.attached
            .set(Attachment { layout, buffers })
            .map_err(|_| already_attached())?;
        info!(trunk_len, branch_len, pixels, "layout attached");
        Ok(())
    }

    pub fn is_attached(&self) -> bool {
        self.attached.get().is_some()
    }

    pub fn snapshot(&self) -> Option<&Layout> {
        self.attached.get().map(|attachment| &attachment.layout)
    }

    pub(crate) fn attachment(&self) -> Option<&Attachment> {
        self.attached.get()
    }
}

fn already_attached() -> ApiException {
    ApiException::new(ErrorCode::AlreadyAttached, "layout is already attached")
}

#[cfg(test)]
#[path = "tests/layout_tests.rs"]
mod tests;
