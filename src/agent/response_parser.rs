use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static JSON_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```json\s*(.*?)```").expect("JSON fence regex is valid"));
static ANY_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```[a-zA-Z]*\s*(.*?)```").expect("Fence regex is valid"));
static HTML_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<[^>]*>").expect("HTML tag regex is valid"));

/// What the assistant sends back to the dashboard.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct AgentReply {
    pub reply: String,
    pub action: Option<Value>,
}

/// Finds the JSON object in a model response. Models wrap it in a ```json fence,
/// a bare fence, or nothing at all, in that order of preference.
pub fn extract_json(text: &str) -> Option<Value> {
    let fenced = JSON_FENCE
        .captures(text)
        .or_else(|| ANY_FENCE.captures(text))
        .and_then(|captures| captures.get(1))
        .and_then(|body| parse_object(body.as_str()));
    if fenced.is_some() {
        return fenced;
    }
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    parse_object(&text[start..=end])
}

fn parse_object(candidate: &str) -> Option<Value> {
    match serde_json::from_str::<Value>(candidate.trim()) {
        Ok(value) if value.is_object() => Some(value),
        _ => None,
    }
}

/// Removes tags, then escapes what is left so the text is inert in HTML.
pub fn sanitize_html(text: &str) -> String {
    let stripped = HTML_TAG.replace_all(text, "");
    let mut escaped = String::with_capacity(stripped.len());
    for c in stripped.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Applies [`sanitize_html`] to every string inside `value`.
pub fn sanitize_html_fields(value: Value) -> Value {
    match value {
        Value::String(s) => Value::String(sanitize_html(&s)),
        Value::Array(items) => Value::Array(items.into_iter().map(sanitize_html_fields).collect()),
        Value::Object(fields) => Value::Object(
            fields
                .into_iter()
                .map(|(key, value)| (key, sanitize_html_fields(value)))
                .collect(),
        ),
        other => other,
    }
}

/// Turns raw model output into a reply safe to render.
pub fn parse_agent_reply(text: &str) -> AgentReply {
    match extract_json(text).map(sanitize_html_fields) {
        Some(Value::Object(mut fields)) => {
            let reply = match fields.remove("reply").or_else(|| fields.remove("message")) {
                Some(Value::String(reply)) => reply,
                _ => String::new(),
            };
            let action = fields.remove("action").filter(|action| !action.is_null());
            AgentReply { reply, action }
        }
        _ => AgentReply {
            reply: sanitize_html(text.trim()),
            action: None,
        },
    }
}
