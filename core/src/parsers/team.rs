use serde::Serialize;
use serde_json::Value;

use crate::extract::{non_empty_string_field, string_field};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Team {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Only set for sub-teams.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<ParentTeam>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParentTeam {
    pub id: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

pub fn parse_team(raw: &Value) -> Team {
    if !raw.is_object() {
        return Team::default();
    }

    Team {
        id: string_field(raw, "id"),
        name: string_field(raw, "name"),
        description: string_field(raw, "description"),
        parent: raw.get("parent").and_then(|parent| {
            Some(ParentTeam {
                id: non_empty_string_field(parent, "id")?,
                kind: non_empty_string_field(parent, "type"),
            })
        }),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn sub_team_keeps_parent_id_and_type() {
        let raw = json!({
            "id": "T2",
            "name": "Payments On-Call",
            "description": null,
            "parent": {"id": "T1", "type": "team_reference", "summary": "Payments"}
        });
        assert_eq!(
            serde_json::to_value(parse_team(&raw)).unwrap(),
            json!({"id": "T2", "name": "Payments On-Call", "parent": {"id": "T1", "type": "team_reference"}})
        );
    }

    #[test]
    fn parent_without_id_is_dropped() {
        let raw = json!({"id": "T3", "parent": {"type": "team_reference"}});
        assert_eq!(serde_json::to_value(parse_team(&raw)).unwrap(), json!({"id": "T3"}));
    }
}
