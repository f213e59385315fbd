use serde::Serialize;
use serde_json::Value;

use crate::extract::string_field;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Note {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<NoteUser>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<NoteChannel>,
}

/// Note author. `name` is read from the upstream reference's `summary`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NoteUser {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NoteChannel {
    pub summary: String,
}

pub fn parse_note(raw: &Value) -> Note {
    if !raw.is_object() {
        return Note::default();
    }

    let user = raw.get("user").and_then(|user| {
        let parsed = NoteUser {
            id: string_field(user, "id"),
            name: string_field(user, "summary"),
        };
        (parsed != NoteUser::default()).then_some(parsed)
    });

    Note {
        id: string_field(raw, "id"),
        content: string_field(raw, "content"),
        created_at: string_field(raw, "created_at"),
        user,
        channel: raw
            .get("channel")
            .and_then(|channel| string_field(channel, "summary"))
            .map(|summary| NoteChannel { summary }),
    }
}
