use anyhow::bail;
use anyhow::Result;
use bytes::Bytes;
use futures::stream;
use test_utils::done_frame;
use test_utils::error_frame;
use test_utils::token_frame;

use super::FrameMode;
use super::StreamConsumer;
use crate::domain::models::ByteStream;
use crate::domain::models::GenerationStats;
use crate::domain::models::StreamEvent;

fn token(text: &str) -> StreamEvent {
    return StreamEvent::Token {
        text: text.to_string(),
    };
}

fn byte_stream(chunks: Vec<Result<Bytes>>) -> ByteStream {
    return Box::pin(stream::iter(chunks));
}

#[test]
fn it_decodes_frames_in_one_chunk() {
    let mut consumer = StreamConsumer::default();
    let chunk = format!(
        "{}{}{}",
        token_frame("Hi"),
        token_frame(" there!"),
        done_frame(2, 10.0, 0.2)
    );

    let events = consumer.push(chunk.as_bytes());
    assert_eq!(
        events,
        vec![
            token("Hi"),
            token(" there!"),
            StreamEvent::Done {
                stats: Some(GenerationStats {
                    tokens: 2,
                    speed: 10.0,
                    time: 0.2,
                })
            }
        ]
    );
}

#[test]
fn it_decodes_error_frames() {
    let mut consumer = StreamConsumer::default();
    let events = consumer.push(error_frame("model crashed").as_bytes());
    assert_eq!(
        events,
        vec![StreamEvent::Error {
            message: "model crashed".to_string()
        }]
    );
}

#[test]
fn it_decodes_done_without_stats() {
    let mut consumer = StreamConsumer::default();
    let events = consumer.push(b"data: {\"type\": \"done\"}\n\n");
    assert_eq!(events, vec![StreamEvent::Done { stats: None }]);

    let events = consumer.push(b"data: {\"type\": \"done\", \"stats\": {}}\n\n");
    assert_eq!(
        events,
        vec![StreamEvent::Done {
            stats: Some(GenerationStats::default())
        }]
    );
}

#[test]
fn it_drops_malformed_and_foreign_lines() {
    let mut consumer = StreamConsumer::default();
    let chunk = format!(
        ": keep-alive\nevent: ping\ndata: {{not json}}\ndata: {{\"type\": \"unknown\"}}\n{}",
        token_frame("ok")
    );

    let events = consumer.push(chunk.as_bytes());
    assert_eq!(events, vec![token("ok")]);
}

#[test]
fn it_drops_frames_split_across_chunks() {
    let mut consumer = StreamConsumer::new(FrameMode::PerChunk);
    let frame = token_frame("lost");
    let (head, tail) = frame.split_at(12);

    assert!(consumer.push(head.as_bytes()).is_empty());
    assert!(consumer.push(tail.as_bytes()).is_empty());
    assert!(consumer.finish().is_empty());

    let events = consumer.push(token_frame("kept").as_bytes());
    assert_eq!(events, vec![token("kept")]);
}

#[test]
fn it_reassembles_split_frames_when_enabled() {
    let mut consumer = StreamConsumer::new(FrameMode::Reassemble);
    let body = format!("{}{}", token_frame("first"), token_frame("second"));
    let (head, tail) = body.split_at(20);

    assert!(consumer.push(head.as_bytes()).is_empty());
    let events = consumer.push(tail.as_bytes());
    assert_eq!(events, vec![token("first"), token("second")]);
}

#[test]
fn it_flushes_unterminated_tail_when_reassembling() {
    let mut consumer = StreamConsumer::new(FrameMode::Reassemble);
    assert!(consumer
        .push(b"data: {\"type\": \"token\", \"token\": \"end\"}")
        .is_empty());
    assert_eq!(consumer.finish(), vec![token("end")]);
}

#[test]
fn it_decodes_multibyte_text() {
    let mut consumer = StreamConsumer::default();
    let events = consumer.push(token_frame("héllo · 世界").as_bytes());
    assert_eq!(events, vec![token("héllo · 世界")]);
}

#[tokio::test]
async fn it_consumes_a_stream_to_the_end() -> Result<()> {
    let chunks = vec![
        Ok(Bytes::from(token_frame("Hi"))),
        Ok(Bytes::from(token_frame(" there!"))),
        Ok(Bytes::from(done_frame(2, 1.0, 2.0))),
    ];

    let mut events = vec![];
    let mut consumer = StreamConsumer::default();
    consumer
        .consume(byte_stream(chunks), |event| {
            events.push(event);
            return Ok(());
        })
        .await?;

    assert_eq!(events.len(), 3);
    assert_eq!(events[1], token(" there!"));
    assert!(matches!(events[2], StreamEvent::Done { .. }));

    return Ok(());
}

#[tokio::test]
async fn it_surfaces_transport_errors() {
    let chunks = vec![
        Ok(Bytes::from(token_frame("partial"))),
        Err(anyhow::anyhow!("connection reset")),
    ];

    let mut events = vec![];
    let mut consumer = StreamConsumer::default();
    let res = consumer
        .consume(byte_stream(chunks), |event| {
            events.push(event);
            return Ok(());
        })
        .await;

    assert!(res.is_err());
    assert_eq!(events, vec![token("partial")]);
}

#[tokio::test]
async fn it_stops_when_the_handler_fails() {
    let chunks = vec![Ok(Bytes::from(format!(
        "{}{}",
        token_frame("a"),
        token_frame("b")
    )))];

    let mut seen = 0;
    let mut consumer = StreamConsumer::default();
    let res = consumer
        .consume(byte_stream(chunks), |_event| {
            seen += 1;
            bail!("receiver gone");
        })
        .await;

    assert!(res.is_err());
    assert_eq!(seen, 1);
}
