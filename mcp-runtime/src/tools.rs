use pagerduty_mcp_core::accessors::{
    IncidentEnrichment, IncidentFilters, OncallFilters, incident_metadata,
};
use pagerduty_mcp_core::error::codes;
use pagerduty_mcp_core::{
    CoreError, Envelope, PagerDuty, PagerDutyApi, PrincipalProvider, ScopeResolution,
    ScopeResolver,
};
use serde_json::{Map, Value, json};

pub(crate) const DOCS_URI: &str = "docs://tools";
const CURRENT_USER_ID: &str = "me";
const DOCS_HINT: &str = "Read the docs://tools resource for the argument rules of each tool.";

#[derive(Debug, Clone)]
pub(crate) struct ToolError {
    code: String,
    message: String,
    field: Option<String>,
    docs_hint: Option<String>,
    details: Option<Value>,
}

impl ToolError {
    pub(crate) fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            field: None,
            docs_hint: None,
            details: None,
        }
    }

    fn validation(message: impl Into<String>) -> Self {
        Self::new(codes::VALIDATION_FAILED, message)
    }

    pub(crate) fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub(crate) fn with_docs_hint(mut self, docs_hint: impl Into<String>) -> Self {
        self.docs_hint = Some(docs_hint.into());
        self
    }

    pub(crate) fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub(crate) fn code(&self) -> &str {
        &self.code
    }

    pub(crate) fn to_value(&self) -> Value {
        let mut payload = json!({
            "error": self.code,
            "message": self.message
        });
        if let Some(field) = &self.field {
            payload["field"] = Value::String(field.clone());
        }
        if let Some(docs_hint) = &self.docs_hint {
            payload["docs_hint"] = Value::String(docs_hint.clone());
        }
        if let Some(details) = &self.details {
            payload["details"] = details.clone();
        }
        payload
    }
}

impl From<CoreError> for ToolError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(err) => {
                let tool_err = ToolError::validation(err.to_string());
                match err.field() {
                    Some(field) => tool_err.with_field(field),
                    None => tool_err,
                }
            }
            CoreError::Upstream(err) => ToolError::new(codes::UPSTREAM_ERROR, err.message.clone())
                .with_details(err.details()),
            CoreError::Serialization(err) => ToolError::new(codes::INTERNAL_ERROR, err.to_string()),
        }
    }
}

#[derive(Debug)]
pub(crate) struct ToolDefinition {
    pub(crate) name: &'static str,
    pub(crate) description: &'static str,
    pub(crate) input_schema: Value,
}

fn id_list(description: &str) -> Value {
    json!({ "type": "array", "items": { "type": "string" }, "description": description })
}

fn current_user_context_schema(uses: &str) -> Value {
    json!({
        "type": "boolean",
        "default": true,
        "description": format!("Scope results to the current user's {uses}. Cannot be combined with explicit ID filters.")
    })
}

fn limit_schema() -> Value {
    json!({
        "type": "integer",
        "minimum": 0,
        "description": "Maximum number of results to return."
    })
}

fn timestamp_schema(description: &str) -> Value {
    json!({ "type": "string", "description": format!("{description} (ISO8601).") })
}

pub(crate) fn tool_definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: "get_incidents",
            description: "List incidents by filters, or show one incident by ID or number. With `incident_id` no list filters are allowed; the include_* flags attach similar past incidents, related incidents and notes to that incident.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "incident_id": { "type": "string", "description": "Incident ID or number to show." },
                    "current_user_context": current_user_context_schema("teams and services"),
                    "service_ids": id_list("Only incidents on these services."),
                    "team_ids": id_list("Only incidents owned by these teams."),
                    "statuses": {
                        "type": "array",
                        "items": { "type": "string", "enum": ["triggered", "acknowledged", "resolved"] },
                        "description": "Statuses to include. Defaults to all three."
                    },
                    "urgencies": {
                        "type": "array",
                        "items": { "type": "string", "enum": ["high", "low"] },
                        "description": "Urgencies to include. Defaults to both."
                    },
                    "since": timestamp_schema("Start of the date range"),
                    "until": timestamp_schema("End of the date range"),
                    "limit": limit_schema(),
                    "include_past_incidents": { "type": "boolean", "default": false, "description": "Attach similar incidents from the past six months. Requires `incident_id`." },
                    "include_related_incidents": { "type": "boolean", "default": false, "description": "Attach incidents related to this one. Requires `incident_id`." },
                    "include_notes": { "type": "boolean", "default": false, "description": "Attach the incident's notes. Requires `incident_id`." }
                },
                "additionalProperties": false
            }),
        },
        ToolDefinition {
            name: "get_oncalls",
            description: "List on-call entries. Without since/until it returns who is on call now; with them, every entry in the range.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "current_user_context": current_user_context_schema("escalation policies"),
                    "schedule_ids": id_list("Only on-calls for these schedules."),
                    "user_ids": id_list("Only on-calls for these users."),
                    "escalation_policy_ids": id_list("Only on-calls for these escalation policies."),
                    "since": timestamp_schema("Start of the range"),
                    "until": timestamp_schema("End of the range"),
                    "limit": limit_schema(),
                    "earliest": { "type": "boolean", "description": "Only the earliest on-call per user, policy and level." }
                },
                "additionalProperties": false
            }),
        },
        ToolDefinition {
            name: "get_schedules",
            description: "List schedules, or show one schedule by ID. since/until bound the rendered layers of a single schedule.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "schedule_id": { "type": "string", "description": "Schedule ID to show." },
                    "query": { "type": "string", "description": "Filter schedules by name." },
                    "limit": limit_schema(),
                    "since": timestamp_schema("Start of the rendered range. Requires `schedule_id`"),
                    "until": timestamp_schema("End of the rendered range. Requires `schedule_id`")
                },
                "additionalProperties": false
            }),
        },
        ToolDefinition {
            name: "list_users_oncall",
            description: "List the users on call for a schedule during a time range.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "schedule_id": { "type": "string", "description": "Schedule ID." },
                    "since": timestamp_schema("Start of the range"),
                    "until": timestamp_schema("End of the range")
                },
                "required": ["schedule_id"],
                "additionalProperties": false
            }),
        },
        ToolDefinition {
            name: "get_services",
            description: "List services, or show one service by ID.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "service_id": { "type": "string", "description": "Service ID to show." },
                    "current_user_context": current_user_context_schema("teams"),
                    "team_ids": id_list("Only services owned by these teams."),
                    "query": { "type": "string", "description": "Filter services by name." },
                    "limit": limit_schema()
                },
                "additionalProperties": false
            }),
        },
        ToolDefinition {
            name: "get_teams",
            description: "List teams, or show one team by ID.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "team_id": { "type": "string", "description": "Team ID to show." },
                    "query": { "type": "string", "description": "Filter teams by name." },
                    "limit": limit_schema()
                },
                "additionalProperties": false
            }),
        },
        ToolDefinition {
            name: "get_users",
            description: "List users, or show one user by ID.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "user_id": { "type": "string", "description": "User ID to show, or `me` for the caller's own record." },
                    "current_user_context": current_user_context_schema("teams"),
                    "team_ids": id_list("Only members of these teams."),
                    "query": { "type": "string", "description": "Filter users by name or email." },
                    "limit": limit_schema()
                },
                "additionalProperties": false
            }),
        },
        ToolDefinition {
            name: "get_escalation_policies",
            description: "List escalation policies, or show one policy by ID.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "policy_id": { "type": "string", "description": "Escalation policy ID to show." },
                    "current_user_context": current_user_context_schema("user ID and teams"),
                    "query": { "type": "string", "description": "Filter policies by name." },
                    "user_ids": id_list("Only policies that page these users."),
                    "team_ids": id_list("Only policies owned by these teams."),
                    "limit": limit_schema()
                },
                "additionalProperties": false
            }),
        },
        ToolDefinition {
            name: "build_user_context",
            description: "Resolve the current user's ID, teams, services and escalation policies. The other tools use the same context when current_user_context is true.",
            input_schema: json!({
                "type": "object",
                "properties": {},
                "additionalProperties": false
            }),
        },
    ]
}

/// Markdown reference for every tool, served as the `docs://tools` resource.
pub(crate) fn tool_documentation() -> String {
    let mut doc = String::from(
        "# PagerDuty MCP tools\n\n\
Every tool returns `{\"metadata\": {\"count\", \"description\", ...}, \"<resource>\": [...]}`. \
When a result would be too large the resource list is replaced by \
`{\"error\": {\"code\": \"LIMIT_EXCEEDED\", \"message\": ...}}`; narrow the query and retry.\n\n\
Tools taking `current_user_context` default it to `true` and then filter by the IDs from \
`build_user_context`. Explicit ID filters require `current_user_context: false`, and at least \
one of them must be given. Passing a single-resource ID (`incident_id`, `service_id`, ...) \
shows that resource and rules out the list filters.\n",
    );

    for tool in tool_definitions() {
        doc.push_str(&format!("\n## {}\n\n{}\n", tool.name, tool.description));
        let Some(properties) = tool.input_schema["properties"].as_object() else {
            continue;
        };
        if properties.is_empty() {
            doc.push_str("\nNo arguments.\n");
            continue;
        }
        let required: Vec<&str> = tool.input_schema["required"]
            .as_array()
            .map(|names| names.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();

        doc.push_str("\n| argument | type | description |\n|---|---|---|\n");
        for (name, schema) in properties {
            let kind = match schema["type"].as_str() {
                Some("array") => format!(
                    "{}[]",
                    schema["items"]["type"].as_str().unwrap_or("string")
                ),
                Some(kind) => kind.to_string(),
                None => "any".to_string(),
            };
            let mut description = schema["description"].as_str().unwrap_or_default().to_string();
            if required.contains(&name.as_str()) {
                description.push_str(" Required.");
            }
            if let Some(default) = schema.get("default") {
                description.push_str(&format!(" Default: `{default}`."));
            }
            doc.push_str(&format!("| `{name}` | {kind} | {} |\n", description.trim()));
        }
    }
    doc
}

fn is_present(args: &Map<String, Value>, key: &str) -> bool {
    args.get(key).is_some_and(|value| !value.is_null())
}

fn arg_bool(args: &Map<String, Value>, key: &str, default: bool) -> Result<bool, ToolError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(default),
        Some(Value::Bool(v)) => Ok(*v),
        Some(_) => Err(ToolError::validation(format!("'{key}' must be a boolean")).with_field(key)),
    }
}

fn required_string(args: &Map<String, Value>, key: &str) -> Result<String, ToolError> {
    let value = args.get(key).ok_or_else(|| {
        ToolError::validation(format!("Missing required field '{key}'")).with_field(key)
    })?;
    match value {
        Value::String(v) if !v.trim().is_empty() => Ok(v.clone()),
        Value::String(_) => {
            Err(ToolError::validation(format!("'{key}' must not be empty")).with_field(key))
        }
        _ => Err(ToolError::validation(format!("'{key}' must be a string")).with_field(key)),
    }
}

fn arg_optional_string(args: &Map<String, Value>, key: &str) -> Result<Option<String>, ToolError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(v)) if v.trim().is_empty() => Ok(None),
        Some(Value::String(v)) => Ok(Some(v.clone())),
        Some(_) => Err(ToolError::validation(format!("'{key}' must be a string")).with_field(key)),
    }
}

/// A single-resource ID. Blank strings are kept so the accessor can reject
/// them by name instead of silently falling back to a list query.
fn arg_optional_id(args: &Map<String, Value>, key: &str) -> Result<Option<String>, ToolError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(v)) => Ok(Some(v.clone())),
        Some(_) => Err(ToolError::validation(format!("'{key}' must be a string")).with_field(key)),
    }
}

fn arg_optional_bool(args: &Map<String, Value>, key: &str) -> Result<Option<bool>, ToolError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(v)) => Ok(Some(*v)),
        Some(_) => Err(ToolError::validation(format!("'{key}' must be a boolean")).with_field(key)),
    }
}

fn arg_optional_u64(args: &Map<String, Value>, key: &str) -> Result<Option<u64>, ToolError> {
    let invalid =
        || ToolError::validation(format!("'{key}' must be an unsigned integer")).with_field(key);
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n.as_u64().ok_or_else(invalid).map(Some),
        Some(_) => Err(invalid()),
    }
}

fn arg_limit(args: &Map<String, Value>) -> Result<Option<usize>, ToolError> {
    Ok(arg_optional_u64(args, "limit")?.map(|limit| usize::try_from(limit).unwrap_or(usize::MAX)))
}

fn arg_optional_string_array(
    args: &Map<String, Value>,
    key: &str,
) -> Result<Option<Vec<String>>, ToolError> {
    let Some(value) = args.get(key) else {
        return Ok(None);
    };
    if value.is_null() {
        return Ok(None);
    }
    let items = value.as_array().ok_or_else(|| {
        ToolError::validation(format!("'{key}' must be an array of strings")).with_field(key)
    })?;
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        let text = item.as_str().ok_or_else(|| {
            ToolError::validation(format!("'{key}' items must be strings")).with_field(key)
        })?;
        let normalized = text.trim();
        if !normalized.is_empty() {
            out.push(normalized.to_string());
        }
    }
    Ok(Some(out))
}

/// Rejects list filters passed alongside a single-resource ID.
fn ensure_absent(
    args: &Map<String, Value>,
    id_key: &str,
    filters: &[&str],
) -> Result<(), ToolError> {
    match filters.iter().find(|key| is_present(args, key)) {
        Some(key) => Err(ToolError::validation(format!(
            "When `{id_key}` is provided, other filters ({}) cannot be used",
            filters.join(", ")
        ))
        .with_field(*key)
        .with_docs_hint(DOCS_HINT)),
        None => Ok(()),
    }
}

fn reject_explicit_ids(args: &Map<String, Value>, keys: &[&str]) -> Result<(), ToolError> {
    match keys.iter().find(|key| is_present(args, key)) {
        Some(key) => Err(ToolError::validation(format!(
            "Cannot specify {} when current_user_context is true",
            keys.join(" or ")
        ))
        .with_field(*key)
        .with_docs_hint(DOCS_HINT)),
        None => Ok(()),
    }
}

fn require_any_filter(given: &[(&str, &[String])]) -> Result<(), ToolError> {
    if given.iter().any(|(_, ids)| !ids.is_empty()) {
        return Ok(());
    }
    let names: Vec<&str> = given.iter().map(|(name, _)| *name).collect();
    Err(ToolError::validation(format!(
        "When current_user_context is false, at least one of {} must be specified",
        names.join(", ")
    ))
    .with_field(names[0])
    .with_docs_hint(DOCS_HINT))
}

async fn resolve_scope<C>(pagerduty: &PagerDuty<C>) -> ScopeResolution
where
    C: PagerDutyApi + PrincipalProvider,
{
    ScopeResolver::new(pagerduty.client()).resolve().await
}

/// Reports a partial user context in the envelope so the caller knows an
/// empty or short result may be incomplete.
fn with_scope_outcome(mut envelope: Envelope, resolution: &ScopeResolution) -> Envelope {
    if !resolution.is_complete() {
        envelope.insert_metadata(
            "user_context",
            serde_json::to_value(&resolution.outcome).unwrap_or_default(),
        );
    }
    envelope
}

/// Runs tool `name`. The returned value is the envelope (or user context)
/// handed back as the tool result.
pub(crate) async fn call_tool<C>(
    pagerduty: &PagerDuty<C>,
    name: &str,
    args: &Map<String, Value>,
) -> Result<Value, ToolError>
where
    C: PagerDutyApi + PrincipalProvider,
{
    let envelope = match name {
        "get_incidents" => get_incidents(pagerduty, args).await?,
        "get_oncalls" => get_oncalls(pagerduty, args).await?,
        "get_schedules" => get_schedules(pagerduty, args).await?,
        "list_users_oncall" => list_users_oncall(pagerduty, args).await?,
        "get_services" => get_services(pagerduty, args).await?,
        "get_teams" => get_teams(pagerduty, args).await?,
        "get_users" => get_users(pagerduty, args).await?,
        "get_escalation_policies" => get_escalation_policies(pagerduty, args).await?,
        "build_user_context" => {
            let resolution = resolve_scope(pagerduty).await;
            return serde_json::to_value(&resolution)
                .map_err(|err| ToolError::new(codes::INTERNAL_ERROR, err.to_string()));
        }
        _ => {
            return Err(ToolError::new("unknown_tool", format!("Unknown tool: {name}"))
                .with_field("name")
                .with_docs_hint(DOCS_HINT));
        }
    };
    Ok(envelope.to_value())
}

async fn get_incidents<C>(
    pagerduty: &PagerDuty<C>,
    args: &Map<String, Value>,
) -> Result<Envelope, ToolError>
where
    C: PagerDutyApi + PrincipalProvider,
{
    let enrichment = IncidentEnrichment {
        past_incidents: arg_bool(args, "include_past_incidents", false)?,
        related_incidents: arg_bool(args, "include_related_incidents", false)?,
        notes: arg_bool(args, "include_notes", false)?,
    };

    if let Some(incident_id) = arg_optional_id(args, "incident_id")? {
        ensure_absent(
            args,
            "incident_id",
            &["service_ids", "team_ids", "statuses", "urgencies", "since", "until", "limit"],
        )?;
        return Ok(pagerduty.show_incident(&incident_id, enrichment).await?);
    }

    if enrichment != IncidentEnrichment::default() {
        return Err(ToolError::validation(
            "`include_past_incidents`, `include_related_incidents`, and `include_notes` can only be used when a specific `incident_id` is provided",
        )
        .with_field("incident_id")
        .with_docs_hint(DOCS_HINT));
    }

    let mut filters = IncidentFilters {
        statuses: arg_optional_string_array(args, "statuses")?,
        urgencies: arg_optional_string_array(args, "urgencies")?,
        since: arg_optional_string(args, "since")?,
        until: arg_optional_string(args, "until")?,
        limit: arg_limit(args)?,
        ..IncidentFilters::default()
    };
    let service_ids = arg_optional_string_array(args, "service_ids")?.unwrap_or_default();
    let team_ids = arg_optional_string_array(args, "team_ids")?.unwrap_or_default();

    if arg_bool(args, "current_user_context", true)? {
        reject_explicit_ids(args, &["service_ids", "team_ids"])?;
        let resolution = resolve_scope(pagerduty).await;
        let envelope = if resolution.scope.team_ids.is_empty()
            && resolution.scope.service_ids.is_empty()
        {
            pagerduty
                .envelopes()
                .build::<Value>(&[], "incidents", Some(incident_metadata(&[])))?
        } else {
            filters.service_ids = resolution.scope.service_ids.clone();
            filters.team_ids = resolution.scope.team_ids.clone();
            pagerduty.list_incidents(&filters).await?
        };
        return Ok(with_scope_outcome(envelope, &resolution));
    }

    require_any_filter(&[
        ("service_ids", service_ids.as_slice()),
        ("team_ids", team_ids.as_slice()),
    ])?;
    filters.service_ids = service_ids;
    filters.team_ids = team_ids;
    Ok(pagerduty.list_incidents(&filters).await?)
}

async fn get_oncalls<C>(
    pagerduty: &PagerDuty<C>,
    args: &Map<String, Value>,
) -> Result<Envelope, ToolError>
where
    C: PagerDutyApi + PrincipalProvider,
{
    let mut filters = OncallFilters {
        schedule_ids: arg_optional_string_array(args, "schedule_ids")?.unwrap_or_default(),
        since: arg_optional_string(args, "since")?,
        until: arg_optional_string(args, "until")?,
        limit: arg_limit(args)?,
        earliest: arg_optional_bool(args, "earliest")?,
        ..OncallFilters::default()
    };
    let user_ids = arg_optional_string_array(args, "user_ids")?.unwrap_or_default();
    let escalation_policy_ids =
        arg_optional_string_array(args, "escalation_policy_ids")?.unwrap_or_default();

    if arg_bool(args, "current_user_context", true)? {
        reject_explicit_ids(args, &["user_ids", "escalation_policy_ids"])?;
        let resolution = resolve_scope(pagerduty).await;
        let envelope = if resolution.scope.escalation_policy_ids.is_empty() {
            pagerduty.empty("oncalls")?
        } else {
            filters.escalation_policy_ids = resolution.scope.escalation_policy_ids.clone();
            pagerduty.list_oncalls(&filters).await?
        };
        return Ok(with_scope_outcome(envelope, &resolution));
    }

    require_any_filter(&[
        ("schedule_ids", filters.schedule_ids.as_slice()),
        ("user_ids", user_ids.as_slice()),
        ("escalation_policy_ids", escalation_policy_ids.as_slice()),
    ])?;
    filters.user_ids = user_ids;
    filters.escalation_policy_ids = escalation_policy_ids;
    Ok(pagerduty.list_oncalls(&filters).await?)
}

async fn get_schedules<C>(
    pagerduty: &PagerDuty<C>,
    args: &Map<String, Value>,
) -> Result<Envelope, ToolError>
where
    C: PagerDutyApi + PrincipalProvider,
{
    let since = arg_optional_string(args, "since")?;
    let until = arg_optional_string(args, "until")?;

    if let Some(schedule_id) = arg_optional_id(args, "schedule_id")? {
        ensure_absent(args, "schedule_id", &["query", "limit"])?;
        return Ok(pagerduty
            .show_schedule(&schedule_id, since.as_deref(), until.as_deref())
            .await?);
    }

    if let Some(key) = ["since", "until"].into_iter().find(|key| is_present(args, key)) {
        return Err(
            ToolError::validation("`since` and `until` can only be used with `schedule_id`")
                .with_field(key)
                .with_docs_hint(DOCS_HINT),
        );
    }

    let query = arg_optional_string(args, "query")?;
    Ok(pagerduty
        .list_schedules(query.as_deref(), arg_limit(args)?)
        .await?)
}

async fn list_users_oncall<C>(
    pagerduty: &PagerDuty<C>,
    args: &Map<String, Value>,
) -> Result<Envelope, ToolError>
where
    C: PagerDutyApi + PrincipalProvider,
{
    let schedule_id = required_string(args, "schedule_id")?;
    let since = arg_optional_string(args, "since")?;
    let until = arg_optional_string(args, "until")?;
    Ok(pagerduty
        .list_users_oncall(&schedule_id, since.as_deref(), until.as_deref())
        .await?)
}

async fn get_services<C>(
    pagerduty: &PagerDuty<C>,
    args: &Map<String, Value>,
) -> Result<Envelope, ToolError>
where
    C: PagerDutyApi + PrincipalProvider,
{
    if let Some(service_id) = arg_optional_id(args, "service_id")? {
        ensure_absent(args, "service_id", &["team_ids", "query", "limit"])?;
        return Ok(pagerduty.show_service(&service_id).await?);
    }

    let query = arg_optional_string(args, "query")?;
    let limit = arg_limit(args)?;
    let team_ids = arg_optional_string_array(args, "team_ids")?.unwrap_or_default();

    if arg_bool(args, "current_user_context", true)? {
        reject_explicit_ids(args, &["team_ids"])?;
        let resolution = resolve_scope(pagerduty).await;
        let envelope = if resolution.scope.team_ids.is_empty() {
            pagerduty.empty("services")?
        } else {
            pagerduty
                .list_services(Some(resolution.scope.team_ids.as_slice()), query.as_deref(), limit)
                .await?
        };
        return Ok(with_scope_outcome(envelope, &resolution));
    }

    require_any_filter(&[("team_ids", team_ids.as_slice())])?;
    Ok(pagerduty
        .list_services(Some(team_ids.as_slice()), query.as_deref(), limit)
        .await?)
}

async fn get_teams<C>(
    pagerduty: &PagerDuty<C>,
    args: &Map<String, Value>,
) -> Result<Envelope, ToolError>
where
    C: PagerDutyApi + PrincipalProvider,
{
    if let Some(team_id) = arg_optional_id(args, "team_id")? {
        ensure_absent(args, "team_id", &["query", "limit"])?;
        return Ok(pagerduty.show_team(&team_id).await?);
    }
    let query = arg_optional_string(args, "query")?;
    Ok(pagerduty.list_teams(query.as_deref(), arg_limit(args)?).await?)
}

async fn get_users<C>(
    pagerduty: &PagerDuty<C>,
    args: &Map<String, Value>,
) -> Result<Envelope, ToolError>
where
    C: PagerDutyApi + PrincipalProvider,
{
    if let Some(user_id) = arg_optional_id(args, "user_id")? {
        ensure_absent(args, "user_id", &["team_ids", "query", "limit"])?;
        if user_id.trim() == CURRENT_USER_ID {
            return Ok(pagerduty.show_current_user().await?);
        }
        return Ok(pagerduty.show_user(&user_id).await?);
    }

    let query = arg_optional_string(args, "query")?;
    let limit = arg_limit(args)?;
    let team_ids = arg_optional_string_array(args, "team_ids")?.unwrap_or_default();

    if arg_bool(args, "current_user_context", true)? {
        reject_explicit_ids(args, &["team_ids"])?;
        let resolution = resolve_scope(pagerduty).await;
        let envelope = if resolution.scope.team_ids.is_empty() {
            pagerduty.empty("users")?
        } else {
            pagerduty
                .list_users(&resolution.scope.team_ids, query.as_deref(), limit)
                .await?
        };
        return Ok(with_scope_outcome(envelope, &resolution));
    }

    require_any_filter(&[("team_ids", team_ids.as_slice())])?;
    Ok(pagerduty
        .list_users(&team_ids, query.as_deref(), limit)
        .await?)
}

async fn get_escalation_policies<C>(
    pagerduty: &PagerDuty<C>,
    args: &Map<String, Value>,
) -> Result<Envelope, ToolError>
where
    C: PagerDutyApi + PrincipalProvider,
{
    if let Some(policy_id) = arg_optional_id(args, "policy_id")? {
        ensure_absent(args, "policy_id", &["query", "user_ids", "team_ids", "limit"])?;
        return Ok(pagerduty.show_escalation_policy(&policy_id).await?);
    }

    let query = arg_optional_string(args, "query")?;
    let limit = arg_limit(args)?;
    let user_ids = arg_optional_string_array(args, "user_ids")?.unwrap_or_default();
    let team_ids = arg_optional_string_array(args, "team_ids")?.unwrap_or_default();

    if arg_bool(args, "current_user_context", true)? {
        reject_explicit_ids(args, &["user_ids", "team_ids"])?;
        let resolution = resolve_scope(pagerduty).await;
        let envelope = if resolution.scope.user_id.is_empty() {
            pagerduty.empty("escalation_policies")?
        } else {
            pagerduty
                .list_escalation_policies(
                    query.as_deref(),
                    std::slice::from_ref(&resolution.scope.user_id),
                    &resolution.scope.team_ids,
                    limit,
                )
                .await?
        };
        return Ok(with_scope_outcome(envelope, &resolution));
    }

    require_any_filter(&[("user_ids", user_ids.as_slice()), ("team_ids", team_ids.as_slice())])?;
    Ok(pagerduty
        .list_escalation_policies(query.as_deref(), &user_ids, &team_ids, limit)
        .await?)
}
