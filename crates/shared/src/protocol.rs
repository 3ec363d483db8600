use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{Note, NoteId};

/// Everything the index page is rendered from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoaderData {
    pub notes: Vec<Note>,
    pub selected_note: Option<Note>,
}

/// Body returned by the mutation endpoint for non-redirecting outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionAck {
    pub ok: bool,
}

impl ActionAck {
    pub const OK: Self = Self { ok: true };
    pub const REJECTED: Self = Self { ok: false };
}

/// Raw form fields posted to `/`. Unknown fields are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActionForm {
    #[serde(rename = "_action", default)]
    pub action: Option<String>,
    #[serde(rename = "noteId", default)]
    pub note_id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoteAction {
    Create,
    Update {
        note_id: NoteId,
        title: String,
        content: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidAction {
    #[error("missing _action field")]
    MissingAction,
    #[error("unrecognized _action {0:?}")]
    UnknownAction(String),
}

impl TryFrom<ActionForm> for NoteAction {
    type Error = InvalidAction;

    fn try_from(form: ActionForm) -> Result<Self, Self::Error> {
        match form.action.as_deref() {
            Some("create") => Ok(Self::Create),
            // A missing noteId stays empty and matches no note.
            Some("update") => Ok(Self::Update {
                note_id: NoteId(form.note_id.unwrap_or_default()),
                title: form.title.unwrap_or_default(),
                content: form.content.unwrap_or_default(),
            }),
            Some(other) => Err(InvalidAction::UnknownAction(other.to_string())),
            None => Err(InvalidAction::MissingAction),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(action: Option<&str>) -> ActionForm {
        ActionForm {
            action: action.map(str::to_string),
            ..ActionForm::default()
        }
    }

    #[test]
    fn create_ignores_other_fields() {
        let parsed = NoteAction::try_from(ActionForm {
            action: Some("create".into()),
            note_id: Some("abc".into()),
            title: Some("ignored".into()),
            content: Some("ignored".into()),
        })
        .expect("create");
        assert_eq!(parsed, NoteAction::Create);
    }

    #[test]
    fn update_coerces_missing_text_fields_to_empty() {
        let parsed = NoteAction::try_from(ActionForm {
            action: Some("update".into()),
            note_id: Some("abc".into()),
            title: None,
            content: Some("body".into()),
        })
        .expect("update");
        assert_eq!(
            parsed,
            NoteAction::Update {
                note_id: NoteId::from("abc"),
                title: String::new(),
                content: "body".into(),
            }
        );
    }

    #[test]
    fn update_without_note_id_targets_empty_id() {
        let parsed = NoteAction::try_from(form(Some("update"))).expect("update");
        assert_eq!(
            parsed,
            NoteAction::Update {
                note_id: NoteId::from(""),
                title: String::new(),
                content: String::new(),
            }
        );
    }

    #[test]
    fn missing_or_unknown_action_is_rejected() {
        assert_eq!(
            NoteAction::try_from(form(None)).expect_err("should fail"),
            InvalidAction::MissingAction
        );
        assert!(matches!(
            NoteAction::try_from(form(Some("delete"))),
            Err(InvalidAction::UnknownAction(name)) if name == "delete"
        ));
    }

    #[test]
    fn action_ack_serializes_to_ok_flag() {
        assert_eq!(
            serde_json::to_string(&ActionAck::REJECTED).expect("json"),
            r#"{"ok":false}"#
        );
    }
}
