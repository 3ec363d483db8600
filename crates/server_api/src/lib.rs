use std::{sync::Arc, time::Instant};

use shared::{
    domain::NoteId,
    error::{ApiError, ErrorCode},
    protocol::{LoaderData, NoteAction},
};
use storage::NoteStore;
use tracing::{debug, info};

#[derive(Clone)]
pub struct ApiContext {
    pub store: Arc<dyn NoteStore>,
}

impl ApiContext {
    pub fn new(store: impl NoteStore + 'static) -> Self {
        Self {
            store: Arc::new(store),
        }
    }
}

/// What a successful mutation asks the HTTP layer to do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    /// Navigate to the freshly created note.
    Created(NoteId),
    Updated,
}

pub fn note_location(note_id: &NoteId) -> String {
    format!("/?noteId={note_id}")
}

/// Loads the sidebar list and, when `note_id` is present and matches, the
/// note open in the editor. An empty id counts as no selection.
pub async fn load_index(ctx: &ApiContext, note_id: Option<&str>) -> Result<LoaderData, ApiError> {
    let started = Instant::now();
    let notes = ctx.store.list_notes().await.map_err(internal)?;
    debug!(count = notes.len(), elapsed = ?started.elapsed(), "listed notes");

    let selected_note = match note_id.filter(|id| !id.is_empty()) {
        Some(id) => ctx
            .store
            .find_note(&NoteId::from(id))
            .await
            .map_err(internal)?,
        None => None,
    };

    Ok(LoaderData {
        notes,
        selected_note,
    })
}

pub async fn perform_action(
    ctx: &ApiContext,
    action: NoteAction,
) -> Result<ActionOutcome, ApiError> {
    match action {
        NoteAction::Create => {
            let note = ctx.store.create_note().await.map_err(internal)?;
            info!(note_id = %note.id, "note created");
            Ok(ActionOutcome::Created(note.id))
        }
        NoteAction::Update {
            note_id,
            title,
            content,
        } => {
            ctx.store
                .update_note(&note_id, &title, &content)
                .await
                .map_err(internal)?
                .ok_or_else(|| {
                    ApiError::new(ErrorCode::NotFound, format!("note {note_id} not found"))
                })?;
            info!(%note_id, "note updated");
            Ok(ActionOutcome::Updated)
        }
    }
}

pub async fn health(ctx: &ApiContext) -> Result<(), ApiError> {
    ctx.store.health_check().await.map_err(internal)
}

fn internal(err: anyhow::Error) -> ApiError {
    ApiError::new(ErrorCode::Internal, format!("{err:#}"))
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
