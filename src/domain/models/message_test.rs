use anyhow::Result;
use serde_json::json;

use super::Message;
use super::MessageContent;
use super::MessageList;
use super::MessagePayload;
use super::Role;
use crate::domain::models::Attachment;

fn normalize(value: serde_json::Value) -> Result<String> {
    let content: MessageContent = serde_json::from_value(value)?;
    return Ok(content.normalize());
}

#[test]
fn it_executes_new() {
    let msg = Message::new(Role::Assistant, "Hi there!");
    assert_eq!(msg.role, Role::Assistant);
    assert_eq!(msg.role.to_string(), "assistant");
    assert_eq!(msg.content, "Hi there!");
    assert!(msg.attachments.is_empty());
}

#[test]
fn it_executes_placeholder() {
    let msg = Message::placeholder();
    assert_eq!(msg.role, Role::Assistant);
    assert_eq!(msg.content, "");
}

#[test]
fn it_normalizes_strings() -> Result<()> {
    assert_eq!(normalize(json!("plain"))?, "plain");
    return Ok(());
}

#[test]
fn it_normalizes_null() -> Result<()> {
    assert_eq!(normalize(json!(null))?, "");
    return Ok(());
}

#[test]
fn it_normalizes_fragment_arrays() -> Result<()> {
    let res = normalize(json!([
        "Hello ",
        null,
        { "type": "text", "text": "world" },
        { "content": "!" },
        { "value": "?" },
        { "image": "abc" },
        3
    ]))?;
    assert_eq!(res, "Hello world!?{\"image\":\"abc\"}3");
    return Ok(());
}

#[test]
fn it_normalizes_keyed_objects_in_order() -> Result<()> {
    assert_eq!(normalize(json!({ "text": "a", "content": "b" }))?, "a");
    assert_eq!(normalize(json!({ "content": "b", "value": "c" }))?, "b");
    assert_eq!(normalize(json!({ "value": "c" }))?, "c");
    assert_eq!(normalize(json!({ "text": 1 }))?, "{\"text\":1}");
    return Ok(());
}

#[test]
fn it_normalizes_scalars() -> Result<()> {
    assert_eq!(normalize(json!(42))?, "42");
    assert_eq!(normalize(json!(true))?, "true");
    return Ok(());
}

#[test]
fn it_treats_unknown_roles_as_assistant() -> Result<()> {
    let payload: MessagePayload = serde_json::from_value(json!({
        "role": "system",
        "content": "x"
    }))?;
    assert_eq!(payload.role, Role::Assistant);
    return Ok(());
}

#[test]
fn it_converts_message_lists() -> Result<()> {
    let list: MessageList = serde_json::from_value(json!({
        "messages": [
            {
                "role": "user",
                "content": "Read this",
                "attachments": [{ "name": "a.txt", "content": "aaa", "truncated": false }]
            },
            { "role": "assistant", "content": [{ "text": "Done" }] },
            { "role": "assistant" }
        ]
    }))?;

    let messages = list.into_messages();
    assert_eq!(messages.len(), 3);
    assert_eq!(
        messages[0],
        Message::user("Read this", vec![Attachment::new("a.txt", "aaa", false)])
    );
    assert_eq!(messages[1], Message::new(Role::Assistant, "Done"));
    assert_eq!(messages[2], Message::new(Role::Assistant, ""));

    return Ok(());
}
