use crate::commit;
use crate::field::{FieldKind, FieldStore, PendingField, DEFAULT_PENDING_POSITION};
use crate::geometry::{Extent, ScreenPoint};
use crate::interaction::{DragTarget, InteractionController};
use crate::session::PageSession;
use fieldstamp_engine::{DocumentHandle, DocumentMutator, EngineError, OpenSource};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum IoPhase {
    #[default]
    Idle,
    Loading,
    Writing,
}

#[derive(Debug, thiserror::Error)]
pub enum EditorError {
    #[error("a document load or write is already in progress")]
    Busy,
    #[error(transparent)]
    Engine(#[from] EngineError),
}

#[derive(Debug, Default)]
pub struct EditorState {
    pub session: PageSession,
    pub fields: FieldStore,
    pub interaction: InteractionController,
    pub pending: Option<PendingField>,
    pub io_phase: IoPhase,
    pub document: Option<DocumentHandle>,
}

impl EditorState {
    pub fn new() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EditorEvent {
    StartPending { kind: FieldKind },
    SetPendingText { text: String },
    PointerDownField { index: usize },
    PointerDownBackground,
    PointerMoved { position: ScreenPoint },
    PointerReleased,
    PointerLeft,
    Place,
    Resize { index: usize, width: f32, height: f32 },
    GoToPage { page: u32 },
    NextPage,
    PrevPage,
    PageRendered { page: u32, pixel_width: u32, pixel_height: u32, page_count: u32 },
    ClearFields,
}

pub fn apply_event(state: &mut EditorState, event: EditorEvent) {
    match event {
        EditorEvent::StartPending { kind } => {
            state.pending = Some(PendingField::new(kind));
        }
        EditorEvent::SetPendingText { text } => {
            let Some(pending) = state.pending.as_mut() else {
                return;
            };
            pending.text = text;
        }
        EditorEvent::PointerDownField { index } => {
            if state.fields.get(index).is_none() {
                return;
            }
            state.pending = None;
            state.interaction.begin_field_drag(index);
        }
        EditorEvent::PointerDownBackground => {
            state.interaction.begin_pending_drag();
        }
        EditorEvent::PointerMoved { position } => match state.interaction.drag() {
            Some(DragTarget::Existing(index)) => {
                let Some(page) = state.fields.get(index).map(|field| field.page) else {
                    return;
                };
                let Some(page_height) = state.session.page_height_pt(page) else {
                    return;
                };
                state.fields.move_to(index, position, page_height);
            }
            Some(DragTarget::Pending) => {
                let Some(pending) = state.pending.as_mut() else {
                    return;
                };
                pending.screen_position = position;
            }
            None => {}
        },
        EditorEvent::PointerReleased | EditorEvent::PointerLeft => {
            state.interaction.end_drag();
        }
        EditorEvent::Place => {
            if state.document.is_none() {
                return;
            }
            let Some(pending) = state.pending.as_ref() else {
                return;
            };
            let page = state.session.current_page();
            let Some(page_height) = state.session.page_height_pt(page) else {
                return;
            };
            if state.fields.place(pending, page, page_height).is_some() {
                state.pending = None;
            }
        }
        EditorEvent::Resize { index, width, height } => {
            state.fields.resize(index, Extent::new(width, height));
        }
        EditorEvent::GoToPage { page } => state.session.go_to(page),
        EditorEvent::NextPage => state.session.next_page(),
        EditorEvent::PrevPage => state.session.prev_page(),
        EditorEvent::PageRendered { page, pixel_width, pixel_height, page_count } => {
            state.session.record_rendered(page, pixel_width, pixel_height, page_count);
            state.fields.sync_page(page, pixel_height as f32);
        }
        EditorEvent::ClearFields => state.fields.clear(),
    }
}

pub fn load_document<M: DocumentMutator>(
    state: &mut EditorState,
    backend: &mut M,
    source: OpenSource,
) -> Result<(), EditorError> {
    if state.io_phase != IoPhase::Idle {
        return Err(EditorError::Busy);
    }

    state.io_phase = IoPhase::Loading;
    let result = replace_document(state, backend, source);
    state.io_phase = IoPhase::Idle;

    result
}

fn replace_document<M: DocumentMutator>(
    state: &mut EditorState,
    backend: &mut M,
    source: OpenSource,
) -> Result<(), EditorError> {
    // Prior state stays untouched until the new document has fully loaded.
    let handle = backend.load(source)?;
    let page_count = backend.page_count(handle)?;

    if let Some(previous) = state.document.take() {
        let _ = backend.close(previous);
    }

    state.document = Some(handle);
    state.session.reset(page_count);
    state.fields.clear();
    state.pending = None;
    state.interaction.end_drag();

    Ok(())
}

/// Commits every stored field, swaps in a freshly reloaded snapshot, and
/// returns its bytes. `Ok(None)` when no document is loaded; a failed
/// commit leaves the prior document and field list untouched.
pub fn write_document<M: DocumentMutator>(
    state: &mut EditorState,
    backend: &mut M,
) -> Result<Option<Vec<u8>>, EditorError> {
    if state.io_phase != IoPhase::Idle {
        return Err(EditorError::Busy);
    }
    let Some(handle) = state.document else {
        return Ok(None);
    };

    state.io_phase = IoPhase::Writing;
    let result = commit_and_reload(state, backend, handle);
    state.io_phase = IoPhase::Idle;

    result.map(Some)
}

fn commit_and_reload<M: DocumentMutator>(
    state: &mut EditorState,
    backend: &mut M,
    handle: DocumentHandle,
) -> Result<Vec<u8>, EditorError> {
    // Draws land on a scratch copy; the live document stays untouched
    // until the committed snapshot has fully reloaded.
    let snapshot = backend.save(handle)?;
    let scratch = backend.load(OpenSource::Bytes(snapshot))?;
    let committed = commit::write_all(backend, scratch, &state.fields);
    let _ = backend.close(scratch);
    let bytes = committed?;

    let fresh = backend.load(OpenSource::Bytes(bytes.clone()))?;
    let page_count = backend.page_count(fresh)?;
    let _ = backend.close(handle);

    state.document = Some(fresh);
    state.session.set_page_count(page_count);
    state.fields.clear();
    if let Some(pending) = state.pending.as_mut() {
        pending.screen_position = DEFAULT_PENDING_POSITION;
    }

    Ok(bytes)
}

/// Serializes the current snapshot without drawing anything. `Ok(None)`
/// when no document is loaded.
pub fn export_document<M: DocumentMutator>(
    state: &mut EditorState,
    backend: &mut M,
) -> Result<Option<Vec<u8>>, EditorError> {
    if state.io_phase != IoPhase::Idle {
        return Err(EditorError::Busy);
    }
    let Some(handle) = state.document else {
        return Ok(None);
    };

    state.io_phase = IoPhase::Writing;
    let result = backend.save(handle);
    state.io_phase = IoPhase::Idle;

    Ok(Some(result?))
}
