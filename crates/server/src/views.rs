use askama::Template;
use shared::{domain::Note, protocol::LoaderData};

const EMPTY_PREVIEW: &str = "No content";

#[derive(Template)]
#[template(path = "index.html")]
pub(crate) struct IndexPage<'a> {
    pub(crate) notes: Vec<NoteRow<'a>>,
    pub(crate) selected: Option<&'a Note>,
}

pub(crate) struct NoteRow<'a> {
    pub(crate) id: &'a str,
    pub(crate) title: &'a str,
    pub(crate) preview: &'a str,
    pub(crate) active: bool,
}

impl<'a> IndexPage<'a> {
    /// `requested_id` is the raw `noteId` query value; it drives sidebar
    /// highlighting even when it matched nothing.
    pub(crate) fn new(data: &'a LoaderData, requested_id: Option<&str>) -> Self {
        let notes = data
            .notes
            .iter()
            .map(|note| NoteRow {
                id: note.id.as_str(),
                title: &note.title,
                preview: if note.content.is_empty() {
                    EMPTY_PREVIEW
                } else {
                    note.content.as_str()
                },
                active: requested_id == Some(note.id.as_str()),
            })
            .collect();

        Self {
            notes,
            selected: data.selected_note.as_ref(),
        }
    }
}
