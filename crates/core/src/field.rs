//! Placed fields and the store that owns them.
//!
//! A field belongs to exactly one page for its lifetime. The store is the
//! sole owner of placed fields and keeps each field's document-space
//! position consistent with its screen-space position, extent, and the
//! owning page's rendered height on every mutation. Insertion order is
//! preserved so later fields draw on top of earlier ones.

use crate::geometry::{self, DocumentPoint, Extent, ScreenPoint};
use serde::{Deserialize, Serialize};

/// Unique identifier assigned to each placed field.
pub type FieldId = uuid::Uuid;

/// Where a new pending draft appears, and where the draft tile returns
/// after a successful write.
pub const DEFAULT_PENDING_POSITION: ScreenPoint = ScreenPoint { x: 50.0, y: 50.0 };

/// Default width/height of a new pending draft, in pixels.
pub const DEFAULT_FIELD_EXTENT: Extent = Extent { width: 100.0, height: 20.0 };

/// What a field turns into at commit time: text and email fields become a
/// text draw, signature fields become a filled placeholder rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    Signature,
    Email,
}

impl FieldKind {
    /// Label a fresh draft of this kind starts out with.
    pub fn default_label(self) -> &'static str {
        match self {
            FieldKind::Text => "Sample Text Field",
            FieldKind::Signature => "Signature",
            FieldKind::Email => "Email",
        }
    }
}

/// A user-placed, positioned and sized field destined to become a drawn
/// element in the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub id: FieldId,
    pub kind: FieldKind,
    pub text: String,
    /// Owning page, 1-based. Immutable once created.
    pub page: u32,
    pub screen_position: ScreenPoint,
    pub extent: Extent,
    pub document_position: DocumentPoint,
}

impl Field {
    pub fn new(
        kind: FieldKind,
        text: impl Into<String>,
        page: u32,
        screen_position: ScreenPoint,
        extent: Extent,
        page_height_pt: f32,
    ) -> Self {
        let extent = extent.clamped();

        Self {
            id: FieldId::new_v4(),
            kind,
            text: text.into(),
            page,
            screen_position,
            extent,
            document_position: geometry::to_document_space(screen_position, extent, page_height_pt),
        }
    }

    /// Moves the field in screen space and recomputes its document position.
    pub fn move_to(&mut self, screen_position: ScreenPoint, page_height_pt: f32) {
        self.screen_position = screen_position;
        self.document_position =
            geometry::to_document_space(screen_position, self.extent, page_height_pt);
    }

    /// Resizes the field, shifting the document y by the height delta so the
    /// bottom edge stays fixed in document space while the top grows.
    pub fn resize(&mut self, extent: Extent) {
        let next = extent.clamped();

        self.document_position.y -= next.height - self.extent.height;
        self.extent = next;
    }

    /// Re-derives the screen position from the stored document position,
    /// used when the owning page's rendered height changes.
    pub fn sync_screen_position(&mut self, page_height_pt: f32) {
        self.screen_position =
            geometry::to_screen_space(self.document_position, self.extent, page_height_pt);
    }
}

/// A single, optional, not-yet-committed draft being positioned before it
/// is placed into the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingField {
    pub kind: FieldKind,
    pub text: String,
    pub screen_position: ScreenPoint,
    pub extent: Extent,
    pub visible: bool,
}

impl PendingField {
    pub fn new(kind: FieldKind) -> Self {
        Self {
            kind,
            text: kind.default_label().to_owned(),
            screen_position: DEFAULT_PENDING_POSITION,
            extent: DEFAULT_FIELD_EXTENT,
            visible: true,
        }
    }
}

/// Ordered collection of placed fields, tagged with the page they belong to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldStore {
    fields: Vec<Field>,
}

impl FieldStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn get(&self, index: usize) -> Option<&Field> {
        self.fields.get(index)
    }

    /// Appends a new field built from the pending draft. Returns the new
    /// field's index, or `None` without placing anything when the draft's
    /// text is blank.
    pub fn place(
        &mut self,
        pending: &PendingField,
        page: u32,
        page_height_pt: f32,
    ) -> Option<usize> {
        if pending.text.trim().is_empty() {
            return None;
        }

        self.fields.push(Field::new(
            pending.kind,
            pending.text.clone(),
            page,
            pending.screen_position,
            pending.extent,
            page_height_pt,
        ));

        Some(self.fields.len() - 1)
    }

    /// Moves one field in screen space. A miss on `index` is ignored and
    /// reported via the return value.
    pub fn move_to(&mut self, index: usize, screen_position: ScreenPoint, page_height_pt: f32) -> bool {
        let Some(field) = self.fields.get_mut(index) else {
            return false;
        };

        field.move_to(screen_position, page_height_pt);
        true
    }

    /// Resizes one field, clamping to the minimum extent. A miss on `index`
    /// is ignored and reported via the return value.
    pub fn resize(&mut self, index: usize, extent: Extent) -> bool {
        let Some(field) = self.fields.get_mut(index) else {
            return false;
        };

        field.resize(extent);
        true
    }

    pub fn clear(&mut self) {
        self.fields.clear();
    }

    /// Fields on `page` with their store indexes, in insertion order.
    pub fn on_page(&self, page: u32) -> impl Iterator<Item = (usize, &Field)> + '_ {
        self.fields.iter().enumerate().filter(move |(_, field)| field.page == page)
    }

    /// Re-derives screen positions for every field on `page` after its
    /// rendered height changes.
    pub fn sync_page(&mut self, page: u32, page_height_pt: f32) {
        for field in self.fields.iter_mut().filter(|field| field.page == page) {
            field.sync_screen_position(page_height_pt);
        }
    }
}
