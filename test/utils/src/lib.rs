pub fn codeblock_fixture() -> &'static str {
    return r#"
Here's how to print in Rust.

```rust
fn print_numbers() {
    for i in 0..=0 {
        println!("{i}");
    }
}
```

And a diagram of the flow.

```mermaid
graph TD; A-->B;
```

This is a markdown codeblock that has no language. We count it as well incase an LLM doesn't attach a language.

```
abc123
```

That's it!
"#
    .trim();
}

pub fn think_fixture() -> &'static str {
    return r#"<think>
The user says hello. I should greet them back.
</think>

Hi there! How can I help?"#;
}

/// Formats a single server-sent frame the way the chat server writes them.
pub fn sse_frame(payload: serde_json::Value) -> String {
    return format!("data: {payload}\n\n");
}

pub fn token_frame(text: &str) -> String {
    return sse_frame(serde_json::json!({ "type": "token", "token": text }));
}

pub fn error_frame(message: &str) -> String {
    return sse_frame(serde_json::json!({ "type": "error", "message": message }));
}

pub fn done_frame(tokens: u64, speed: f64, time: f64) -> String {
    return sse_frame(serde_json::json!({
        "type": "done",
        "stats": { "tokens": tokens, "speed": speed, "time": time }
    }));
}
