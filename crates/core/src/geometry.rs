//! Coordinate transforms between screen space and document space.
//!
//! Screen space is relative to the rendered page container: origin at the
//! top-left corner, y increasing downward, units in pixels. Document space
//! is the PDF page's native system: origin at the bottom-left corner, y
//! increasing upward, units in points. Pages render at a pixel width equal
//! to their native point width, so one pixel equals one point and no unit
//! scaling happens here; only the y axis flips.

use serde::{Deserialize, Serialize};

/// Minimum field width/height in pixels. Resizing clamps here so a field
/// can never collapse into an invisible sliver.
pub const MIN_FIELD_EXTENT: f32 = 1.0;

/// A position in screen space (top-left origin, y down, pixels).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScreenPoint {
    pub x: f32,
    pub y: f32,
}

impl ScreenPoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// A position in document space (bottom-left origin, y up, points).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DocumentPoint {
    pub x: f32,
    pub y: f32,
}

impl DocumentPoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Width and height of a field, in pixels (equivalently, points).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extent {
    pub width: f32,
    pub height: f32,
}

impl Extent {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Clamps both dimensions to at least [`MIN_FIELD_EXTENT`].
    pub fn clamped(self) -> Self {
        Self {
            width: self.width.max(MIN_FIELD_EXTENT),
            height: self.height.max(MIN_FIELD_EXTENT),
        }
    }
}

/// Maps a field's screen position into document space.
///
/// The document x equals the screen x. The document y is the page height
/// minus the screen y minus the field height, so the value addresses the
/// field's bottom-left corner the way PDF draw operators expect.
pub fn to_document_space(screen: ScreenPoint, extent: Extent, page_height_pt: f32) -> DocumentPoint {
    DocumentPoint::new(screen.x, page_height_pt - screen.y - extent.height)
}

/// Inverse of [`to_document_space`]. Recovers a stored field's screen
/// position after the owning page's rendered height changes, e.g. after
/// re-rendering that follows a write.
pub fn to_screen_space(document: DocumentPoint, extent: Extent, page_height_pt: f32) -> ScreenPoint {
    ScreenPoint::new(document.x, page_height_pt - document.y - extent.height)
}
