//! Anchor-vs-history conflict resolution.
//!
//! On return visits two signals may disagree about where to put the reader:
//! the offset they last read to, and the anchor in the address they arrived
//! by. The anchor marks where they clicked to get here; the stored offset
//! marks how far they had actually read. Whichever represents more progress
//! wins, with ties going to the anchor.

use thiserror::Error;

use crate::{AnchorTarget, store::PositionRecord};

/// Conditions reported while resolving. Never fatal.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// The anchor names an element that does not exist once layout is ready.
    #[error("Anchor target '{id}' not found on page")]
    InvalidAnchor { id: String },
}

impl ResolveError {
    pub fn is_invalid_anchor(&self) -> bool {
        matches!(self, ResolveError::InvalidAnchor { .. })
    }
}

/// What happens to the anchor in the visible address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnchorDecision {
    /// There was no anchor.
    Absent,
    /// The anchor won; put it back into the address.
    Restore(AnchorTarget),
    /// Stored progress is further along; leave the address without it.
    Drop(AnchorTarget),
    /// The anchor names no element; it is discarded.
    Invalid(AnchorTarget),
}

/// Outcome of [`resolve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Offset to scroll to, or `None` to leave the viewport alone.
    pub target: Option<u64>,
    pub anchor: AnchorDecision,
}

impl Resolution {
    /// Whether nothing needs doing.
    pub fn is_noop(&self) -> bool {
        self.target.is_none() && !matches!(self.anchor, AnchorDecision::Restore(_))
    }

    /// The anchor to write back into the address, if any.
    pub fn restored_anchor(&self) -> Option<&AnchorTarget> {
        match &self.anchor {
            AnchorDecision::Restore(anchor) => Some(anchor),
            _ => None,
        }
    }

    /// The reportable condition, if the anchor was invalid.
    pub fn error(&self) -> Option<ResolveError> {
        match &self.anchor {
            AnchorDecision::Invalid(anchor) => Some(ResolveError::InvalidAnchor {
                id: anchor.id().to_string(),
            }),
            _ => None,
        }
    }
}

/// Picks the restore target from the stored record and the load-time anchor.
///
/// `find_element_offset` is only consulted when there is an anchor.
///
/// ```
/// use reading_progress::{AnchorTarget, PositionRecord, resolver::resolve};
///
/// let stored = PositionRecord::new(800, 0);
/// let anchor = AnchorTarget::new("intro");
/// let resolution = resolve(Some(&stored), anchor.as_ref(), |_| Some(500));
/// assert_eq!(resolution.target, Some(800));
/// assert!(resolution.restored_anchor().is_none());
/// ```
pub fn resolve(
    stored: Option<&PositionRecord>,
    anchor: Option<&AnchorTarget>,
    find_element_offset: impl FnOnce(&str) -> Option<u64>,
) -> Resolution {
    let stored_offset = stored.map(|record| record.offset);

    let Some(anchor) = anchor else {
        return Resolution {
            target: stored_offset,
            anchor: AnchorDecision::Absent,
        };
    };

    let Some(element_offset) = find_element_offset(anchor.id()) else {
        return Resolution {
            target: stored_offset,
            anchor: AnchorDecision::Invalid(anchor.clone()),
        };
    };

    match stored_offset {
        Some(stored_offset) if element_offset < stored_offset => Resolution {
            target: Some(stored_offset),
            anchor: AnchorDecision::Drop(anchor.clone()),
        },
        _ => Resolution {
            target: Some(element_offset),
            anchor: AnchorDecision::Restore(anchor.clone()),
        },
    }
}
