//! Payload builders for the events the outbox itself has to produce.

use serde_json::{json, Map, Value};

/// Plain `m.text` message, optionally with an HTML body.
pub fn text(body: &str, html: Option<&str>) -> Value {
    message("m.text", body, html)
}

/// `m.notice` message, the conventional type for bot output.
pub fn notice(body: &str, html: Option<&str>) -> Value {
    message("m.notice", body, html)
}

fn message(msgtype: &str, body: &str, html: Option<&str>) -> Value {
    let mut content = json!({
        "msgtype": msgtype,
        "body": body,
    });
    if let Some(html) = html {
        content["format"] = json!("org.matrix.custom.html");
        content["formatted_body"] = json!(html);
    }
    content
}

/// Replacement event that edits `anchor` to show `new_content`.
///
/// Clients that understand edits render `m.new_content`; the rest fall back
/// to the top-level body, prefixed with `"* "`.
pub fn edit_of(anchor: &str, new_content: &Value) -> Value {
    let mut edit = Map::new();
    if let Some(msgtype) = new_content.get("msgtype") {
        edit.insert("msgtype".into(), msgtype.clone());
    }
    for key in ["body", "formatted_body"] {
        if let Some(text) = new_content.get(key).and_then(Value::as_str) {
            edit.insert(key.into(), json!(format!("* {text}")));
        }
    }
    if let Some(format) = new_content.get("format") {
        edit.insert("format".into(), format.clone());
    }
    edit.insert("m.new_content".into(), new_content.clone());
    edit.insert(
        "m.relates_to".into(),
        json!({
            "rel_type": "m.replace",
            "event_id": anchor,
        }),
    );
    Value::Object(edit)
}

/// Reaction annotating `target` with `key` (usually an emoji).
pub fn reaction(target: &str, key: &str) -> Value {
    json!({
        "m.relates_to": {
            "rel_type": "m.annotation",
            "event_id": target,
            "key": key,
        }
    })
}

/// The event id an edit payload replaces, if it is one.
pub fn replaced_event(content: &Value) -> Option<&str> {
    let relation = content.get("m.relates_to")?;
    if relation.get("rel_type")?.as_str()? != "m.replace" {
        return None;
    }
    relation.get("event_id")?.as_str()
}
