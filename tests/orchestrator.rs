//! Turn-sequencing integration tests
//!
//! Exercise the orchestrator contract with stub clients: append order,
//! pending-message lifecycle, rollback, the history window, and the latch.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use parley::{Error, Message, Orchestrator, Role, TurnKind, user_facing_message};

mod common;
use common::{StubChat, StubTranscriber, init_tracing};

fn seeded_history(n: usize) -> Vec<Message> {
    (0..n)
        .map(|i| {
            if i % 2 == 0 {
                Message::user(format!("u{i}"))
            } else {
                Message::assistant(format!("a{i}"))
            }
        })
        .collect()
}

#[tokio::test]
async fn text_turn_appends_user_then_assistant() {
    init_tracing();
    let orchestrator = Orchestrator::new(StubTranscriber::text("unused"), StubChat::replying("Hi there"));

    orchestrator.submit_text_turn("Hello").await.unwrap();

    let messages = orchestrator.messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, Role::User);
    assert_eq!(messages[0].content, "Hello");
    assert_eq!(messages[1].role, Role::Assistant);
    assert_eq!(messages[1].content, "Hi there");
    assert!(!orchestrator.is_loading());
}

#[tokio::test]
async fn text_turn_grows_conversation_by_two() {
    init_tracing();
    let orchestrator = Orchestrator::with_history(
        StubTranscriber::text("unused"),
        StubChat::replying("reply"),
        seeded_history(4),
    );

    orchestrator.submit_text_turn("next").await.unwrap();
    assert_eq!(orchestrator.len(), 6);
}

#[tokio::test]
async fn failed_text_turn_rolls_back_the_user_message() {
    init_tracing();
    let orchestrator = Orchestrator::with_history(
        StubTranscriber::text("unused"),
        StubChat::failing("upstream on fire"),
        seeded_history(4),
    );

    let err = orchestrator.submit_text_turn("doomed").await.unwrap_err();
    assert!(matches!(err, Error::ChatApi { status: 502, .. }));

    // Rollback restores the pre-turn conversation exactly
    assert_eq!(orchestrator.len(), 4);
    assert!(!orchestrator.is_loading());
}

#[tokio::test]
async fn voice_turn_settles_the_pending_message() {
    init_tracing();
    let orchestrator = Orchestrator::new(
        StubTranscriber::text("  what is the weather  "),
        StubChat::replying("Sunny."),
    );

    orchestrator
        .submit_voice_turn(Path::new("/tmp/clip.wav"))
        .await
        .unwrap();

    let messages = orchestrator.messages();
    assert_eq!(messages.len(), 2);

    // Content is the trimmed transcript, flag cleared, locator preserved
    let user = &messages[0];
    assert_eq!(user.role, Role::User);
    assert_eq!(user.content, "what is the weather");
    assert!(user.is_settled());
    assert_eq!(user.audio.as_deref(), Some(Path::new("/tmp/clip.wav")));

    assert_eq!(messages[1].content, "Sunny.");
}

#[tokio::test]
async fn whitespace_transcription_removes_the_pending_message() {
    init_tracing();
    let chat = StubChat::replying("never sent");
    let orchestrator = Orchestrator::new(StubTranscriber::text("   \n  "), chat);

    let err = orchestrator
        .submit_voice_turn(Path::new("/tmp/clip.wav"))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::EmptyTranscription));
    assert!(orchestrator.is_empty());
    assert!(!orchestrator.is_loading());
}

#[tokio::test]
async fn empty_transcription_never_reaches_the_chat_client() {
    init_tracing();
    let orchestrator = Orchestrator::new(StubTranscriber::text(""), StubChat::replying("never"));

    let _ = orchestrator
        .submit_voice_turn(Path::new("/tmp/clip.wav"))
        .await;

    assert_eq!(orchestrator.chat().call_count(), 0);
}

#[tokio::test]
async fn transcription_failure_rolls_back() {
    init_tracing();
    let orchestrator = Orchestrator::with_history(
        StubTranscriber::failing("bad audio"),
        StubChat::replying("never"),
        seeded_history(2),
    );

    let err = orchestrator
        .submit_voice_turn(Path::new("/tmp/clip.wav"))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Transcription { status: 500, .. }));
    assert_eq!(orchestrator.len(), 2);
}

#[tokio::test]
async fn chat_failure_after_transcription_rolls_back_the_transcribed_message() {
    init_tracing();
    let orchestrator = Orchestrator::with_history(
        StubTranscriber::text("transcribed fine"),
        StubChat::failing("rate limited"),
        seeded_history(6),
    );

    let err = orchestrator
        .submit_voice_turn(Path::new("/tmp/clip.wav"))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::ChatApi { .. }));
    // The transcribed user message is removed too
    assert_eq!(orchestrator.len(), 6);
    assert!(orchestrator.messages().iter().all(Message::is_settled));
}

#[tokio::test]
async fn history_forwarded_to_chat_never_exceeds_ten() {
    init_tracing();
    let orchestrator = Orchestrator::with_history(
        StubTranscriber::text("unused"),
        StubChat::replying("ok"),
        seeded_history(15),
    );

    orchestrator.submit_text_turn("the new turn").await.unwrap();

    let calls = orchestrator.chat().calls.lock().unwrap();
    assert_eq!(calls.len(), 1);

    let call = &calls[0];
    assert_eq!(call.user_text, "the new turn");
    // Exactly the last 10 prior messages, in original order
    assert_eq!(call.history.len(), 10);
    assert_eq!(call.history[0].content, "a5");
    assert_eq!(call.history[9].content, "u14");
}

#[tokio::test]
async fn history_snapshot_excludes_the_in_flight_turn() {
    init_tracing();
    let orchestrator = Orchestrator::with_history(
        StubTranscriber::text("spoken words"),
        StubChat::replying("ok"),
        seeded_history(3),
    );

    orchestrator
        .submit_voice_turn(Path::new("/tmp/clip.wav"))
        .await
        .unwrap();

    let calls = orchestrator.chat().calls.lock().unwrap();
    let call = &calls[0];
    assert_eq!(call.history.len(), 3);
    assert!(call.history.iter().all(|m| m.content != "spoken words"));
}

#[tokio::test]
async fn latch_rejects_a_second_turn_in_flight() {
    init_tracing();
    let transcriber = StubTranscriber {
        reply: Ok("slow words".to_string()),
        configured: true,
        delay: Some(Duration::from_millis(200)),
    };
    let orchestrator = Arc::new(Orchestrator::new(transcriber, StubChat::replying("done")));

    let first = {
        let orchestrator = Arc::clone(&orchestrator);
        tokio::spawn(async move {
            orchestrator
                .submit_voice_turn(Path::new("/tmp/clip.wav"))
                .await
        })
    };

    // Give the first turn time to claim the latch and suspend
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(orchestrator.is_loading());

    let err = orchestrator.submit_text_turn("impatient").await.unwrap_err();
    assert!(matches!(err, Error::TurnInProgress));

    first.await.unwrap().unwrap();
    assert!(!orchestrator.is_loading());

    // Only the first turn landed
    let messages = orchestrator.messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].content, "slow words");
}

#[tokio::test]
async fn unconfigured_client_blocks_the_turn_before_any_call() {
    init_tracing();
    let transcriber = StubTranscriber {
        reply: Ok("unused".to_string()),
        configured: false,
        delay: None,
    };
    let orchestrator = Orchestrator::new(transcriber, StubChat::replying("never"));

    let err = orchestrator.submit_text_turn("hello").await.unwrap_err();
    assert!(matches!(err, Error::Config(_)));
    assert!(orchestrator.is_empty());
    assert_eq!(orchestrator.chat().call_count(), 0);
    assert!(!orchestrator.is_loading());
}

#[test]
fn user_facing_messages_carry_the_fixed_prefix() {
    let err = Error::EmptyTranscription;
    assert_eq!(
        user_facing_message(TurnKind::Voice, &err),
        "Failed to process voice message: no speech detected in the recording"
    );

    let err = Error::ChatApi {
        status: 429,
        message: "rate limited".to_string(),
    };
    assert_eq!(
        user_facing_message(TurnKind::Text, &err),
        "Failed to process text message: chat API error: 429 - rate limited"
    );
}
