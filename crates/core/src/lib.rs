//! Fieldstamp Core Library
//!
//! Field placement, coordinate reconciliation, and commit pipeline for the
//! PDF field stamper.

pub mod commit;
pub mod editor;
pub mod field;
pub mod geometry;
pub mod interaction;
pub mod session;

pub use commit::{write_all, FONT_SIZE_PT, SIGNATURE_FILL, TEXT_COLOR};
pub use editor::{
    apply_event, export_document, load_document, write_document, EditorError, EditorEvent,
    EditorState, IoPhase,
};
pub use field::{
    Field, FieldId, FieldKind, FieldStore, PendingField, DEFAULT_FIELD_EXTENT,
    DEFAULT_PENDING_POSITION,
};
pub use geometry::{
    to_document_space, to_screen_space, DocumentPoint, Extent, ScreenPoint, MIN_FIELD_EXTENT,
};
pub use interaction::{DragTarget, InteractionController};
pub use session::{PageSession, PageViewport};
