use anyhow::Result;

use super::display_text;
use super::Attachment;

#[test]
fn it_returns_text_without_attachments() {
    assert_eq!(display_text("Hello", &[]), "Hello");
}

#[test]
fn it_appends_attachment_note() {
    let attachments = vec![
        Attachment::new("a.txt", "aaa", false),
        Attachment::new("b.rs", "bbb", true),
    ];
    assert_eq!(
        display_text("Summarize", &attachments),
        "Summarize\n\n[Attachments: a.txt, b.rs]"
    );
}

#[test]
fn it_emits_only_note_for_empty_text() {
    let attachments = vec![Attachment::new("a.txt", "aaa", false)];
    assert_eq!(display_text("", &attachments), "[Attachments: a.txt]");
}

#[test]
fn it_emits_bare_note_without_names() {
    let attachments = vec![Attachment::new("", "aaa", false)];
    assert_eq!(display_text("Hi", &attachments), "Hi\n\n[Attachments]");
}

#[test]
fn it_keeps_empty_names_among_others() {
    let attachments = vec![
        Attachment::new("a.txt", "aaa", false),
        Attachment::new("", "bbb", false),
    ];
    assert_eq!(display_text("Hi", &attachments), "Hi\n\n[Attachments: a.txt, ]");
}

#[test]
fn it_deserializes_null_truncated() -> Result<()> {
    let attachment: Attachment =
        serde_json::from_str(r#"{"name": "a.txt", "content": "x", "truncated": null}"#)?;
    assert!(!attachment.truncated);

    let attachment: Attachment = serde_json::from_str(r#"{"name": "a.txt", "content": "x"}"#)?;
    assert!(!attachment.truncated);

    return Ok(());
}
