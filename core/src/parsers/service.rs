use serde::Serialize;
use serde_json::Value;

use super::{Reference, reference_list};
use crate::extract::string_field;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Service {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub teams: Option<Vec<Reference>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub integrations: Option<Vec<Reference>>,
}

pub fn parse_service(raw: &Value) -> Service {
    if !raw.is_object() {
        return Service::default();
    }

    Service {
        id: string_field(raw, "id"),
        name: string_field(raw, "name"),
        description: string_field(raw, "description"),
        status: string_field(raw, "status"),
        created_at: string_field(raw, "created_at"),
        updated_at: string_field(raw, "updated_at"),
        teams: reference_list(raw, "teams", Reference::parse),
        integrations: reference_list(raw, "integrations", Reference::parse),
    }
}
