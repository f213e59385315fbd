use serde::Serialize;
use serde_json::Value;

use crate::extract::{map_list, string_field};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct User {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub teams: Option<Vec<UserLink>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_methods: Option<Vec<UserLink>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification_rules: Option<Vec<UserLink>>,
}

/// Loose `{id?, type?, summary?}` link hanging off a user. Unlike the
/// reference types an id is not required; the entry is kept when any of its
/// fields is present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UserLink {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

impl UserLink {
    fn parse(raw: &Value, with_summary: bool) -> Option<Self> {
        if !raw.is_object() {
            return None;
        }
        let link = Self {
            id: string_field(raw, "id"),
            kind: string_field(raw, "type"),
            summary: if with_summary {
                string_field(raw, "summary")
            } else {
                None
            },
        };
        (link != Self::default()).then_some(link)
    }
}

pub fn parse_user(raw: &Value) -> User {
    if !raw.is_object() {
        return User::default();
    }

    User {
        id: string_field(raw, "id"),
        name: string_field(raw, "name"),
        email: string_field(raw, "email"),
        description: string_field(raw, "description"),
        kind: string_field(raw, "type"),
        teams: map_list(raw.get("teams"), |team| UserLink::parse(team, true)),
        contact_methods: map_list(raw.get("contact_methods"), |method| {
            UserLink::parse(method, true)
        }),
        notification_rules: map_list(raw.get("notification_rules"), |rule| {
            UserLink::parse(rule, false)
        }),
    }
}
