use test_utils::think_fixture;

use super::extract_think;
use super::ThinkSplit;

#[test]
fn it_returns_everything_as_main_without_opener() {
    let res = extract_think("Just an answer.");
    assert_eq!(
        res,
        ThinkSplit {
            think: "".to_string(),
            main: "Just an answer.".to_string(),
            open: false,
        }
    );
}

#[test]
fn it_splits_closed_blocks() {
    let res = extract_think("A<think>x</think>B");
    assert_eq!(res.think, "x");
    assert_eq!(res.main, "AB");
    assert!(!res.open);
}

#[test]
fn it_keeps_unclosed_blocks_open() {
    let res = extract_think("A<think>x");
    assert_eq!(res.think, "x");
    assert_eq!(res.main, "A");
    assert!(res.open);
}

#[test]
fn it_matches_case_and_whitespace_insensitively() {
    let res = extract_think("< THINK >plan< / Think >done");
    assert_eq!(res.think, "plan");
    assert_eq!(res.main, "done");
    assert!(!res.open);
}

#[test]
fn it_handles_an_empty_block() {
    let res = extract_think("<think></think>Answer");
    assert_eq!(res.think, "");
    assert_eq!(res.main, "Answer");
}

#[test]
fn it_only_honours_the_first_opener() {
    let res = extract_think("<think>a<think>b</think>c");
    assert_eq!(res.think, "a<think>b");
    assert_eq!(res.main, "c");
}

#[test]
fn it_splits_the_fixture() {
    let res = extract_think(think_fixture());
    assert_eq!(
        res.think.trim(),
        "The user says hello. I should greet them back."
    );
    assert_eq!(res.main.trim(), "Hi there! How can I help?");
    assert!(!res.open);
}

#[test]
fn it_recomputes_while_streaming() {
    let mut buffer = String::new();
    let mut states = vec![];
    for token in ["<think>", "hmm", "</think>", "Hello"] {
        buffer.push_str(token);
        states.push(extract_think(&buffer).open);
    }
    assert_eq!(states, vec![true, true, false, false]);
}
