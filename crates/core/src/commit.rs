//! Turns stored fields into document draw calls and a fresh byte snapshot.

use crate::field::{FieldKind, FieldStore};
use fieldstamp_engine::{DocumentHandle, DocumentMutator, EngineError, Rgb};

/// Font size for committed text, in points.
pub const FONT_SIZE_PT: f32 = 20.0;

/// Fill color for committed text.
pub const TEXT_COLOR: Rgb = Rgb { r: 0.0, g: 0.0, b: 0.0 };

/// Fill color for committed signature placeholder boxes.
pub const SIGNATURE_FILL: Rgb = Rgb { r: 0.9, g: 0.9, b: 0.9 };

/// Issues one draw call per stored field against the document, then
/// serializes it to bytes.
///
/// Text and email fields draw their text at the field's document position;
/// signature fields draw a filled rectangle covering the field's extent.
/// Every page's fields are committed in a single pass, in insertion order,
/// so later fields draw on top of earlier ones. An empty store degenerates
/// to a plain save.
pub fn write_all<M: DocumentMutator>(
    mutator: &mut M,
    handle: DocumentHandle,
    fields: &FieldStore,
) -> Result<Vec<u8>, EngineError> {
    for field in fields.fields() {
        let position = field.document_position;

        match field.kind {
            FieldKind::Signature => mutator.draw_rect(
                handle,
                field.page,
                position.x,
                position.y,
                field.extent.width,
                field.extent.height,
                SIGNATURE_FILL,
            )?,
            FieldKind::Text | FieldKind::Email => mutator.draw_text(
                handle,
                field.page,
                position.x,
                position.y,
                &field.text,
                FONT_SIZE_PT,
                TEXT_COLOR,
            )?,
        }
    }

    mutator.save(handle)
}
