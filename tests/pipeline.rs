//! End-to-end pipeline tests: utterance -> classified intent -> file
//! resolution -> response, with the conversation cache recording every
//! exchange

use std::fs;
use std::sync::Arc;

use scribe_gateway::db::{self, HistoryRepo};
use scribe_gateway::{
    ConversationStore, Error, FileLocator, Intent, IntentRouter, ProcessorConfig,
    RequestProcessor, ResponseStatus, SessionManager,
};

mod common;

use common::{FixedSummarizer, ScriptedClassifier, wire};

fn processor_with(
    classifier: Arc<ScriptedClassifier>,
    summarizer: Arc<FixedSummarizer>,
    search_root: &std::path::Path,
) -> RequestProcessor {
    RequestProcessor::new(
        IntentRouter::new(classifier),
        FileLocator::new(search_root),
        summarizer,
        ProcessorConfig {
            recency_extension: ".txt".to_string(),
            ..ProcessorConfig::default()
        },
    )
}

fn sessions_with(
    processor: RequestProcessor,
    flush_threshold: usize,
) -> (SessionManager, HistoryRepo) {
    let repo = HistoryRepo::new(db::init_memory().unwrap());
    let store: Arc<dyn ConversationStore> = Arc::new(repo.clone());
    (
        SessionManager::new(processor, store, flush_threshold, 5),
        repo,
    )
}

#[tokio::test]
async fn read_raw_text_by_name() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("report.txt"), "quarterly numbers are up").unwrap();

    let classifier = ScriptedClassifier::new(vec![Ok(wire(
        "read raw text",
        0.85,
        Some("report.txt"),
        None,
    ))]);
    let processor = processor_with(classifier, FixedSummarizer::ok("unused"), dir.path());
    let (sessions, _) = sessions_with(processor, 100);

    let response = sessions
        .on_user_utterance("alice", "read report.txt")
        .await
        .unwrap();

    assert_eq!(response.status, ResponseStatus::Done);
    assert_eq!(response.intent, Intent::ReadRawText);
    assert_eq!(response.raw_text.as_deref(), Some("quarterly numbers are up"));
    assert!(response.summary.is_none());
    assert!(response.invariants_hold());
}

#[tokio::test]
async fn read_file_and_summary() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("report.txt"), "a long report body").unwrap();

    let classifier = ScriptedClassifier::new(vec![Ok(wire(
        "read file and summary",
        0.9,
        Some("report.txt"),
        None,
    ))]);
    let processor = processor_with(
        classifier,
        FixedSummarizer::ok("numbers are up"),
        dir.path(),
    );
    let (sessions, _) = sessions_with(processor, 100);

    let response = sessions
        .on_user_utterance("alice", "summarize report.txt")
        .await
        .unwrap();

    assert_eq!(response.status, ResponseStatus::Done);
    assert_eq!(response.intent, Intent::ReadFileAndSummary);
    assert_eq!(response.summary.as_deref(), Some("numbers are up"));
    assert!(response.raw_text.is_none());
    assert!(response.invariants_hold());
}

#[tokio::test]
async fn low_confidence_is_unsupported_regardless_of_label() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("report.txt"), "content").unwrap();

    let classifier = ScriptedClassifier::new(vec![Ok(wire(
        "read raw text",
        0.4,
        Some("report.txt"),
        None,
    ))]);
    let processor = processor_with(classifier, FixedSummarizer::ok("unused"), dir.path());
    let (sessions, _) = sessions_with(processor, 100);

    let response = sessions
        .on_user_utterance("alice", "mumble mumble")
        .await
        .unwrap();

    assert_eq!(response.status, ResponseStatus::Unsupported);
    assert_eq!(response.intent, Intent::Unsupported);
    assert!(response.invariants_hold());
}

#[tokio::test]
async fn classifier_failure_is_unsupported_not_a_crash() {
    let dir = tempfile::tempdir().unwrap();

    let classifier = ScriptedClassifier::new(vec![Err(Error::Classification(
        "model unreachable".to_string(),
    ))]);
    let processor = processor_with(classifier, FixedSummarizer::ok("unused"), dir.path());
    let (sessions, _) = sessions_with(processor, 100);

    let response = sessions
        .on_user_utterance("alice", "read something")
        .await
        .unwrap();

    assert_eq!(response.status, ResponseStatus::Unsupported);
    assert_eq!(response.intent, Intent::Unsupported);
}

#[tokio::test]
async fn missing_file_is_explained_and_exchange_still_recorded() {
    let dir = tempfile::tempdir().unwrap();

    let classifier = ScriptedClassifier::new(vec![Ok(wire(
        "read raw text",
        0.9,
        Some("ghost.txt"),
        None,
    ))]);
    let processor = processor_with(classifier, FixedSummarizer::ok("unused"), dir.path());
    let (sessions, repo) = sessions_with(processor, 1);

    let response = sessions
        .on_user_utterance("alice", "read ghost.txt")
        .await
        .unwrap();

    assert_eq!(response.status, ResponseStatus::Unsupported);
    assert!(response.message.contains("could not find"));

    // Threshold of one means the failed exchange was flushed immediately
    let persisted = repo.last_n("alice", 10).unwrap();
    assert_eq!(persisted.len(), 1);
    assert_eq!(persisted[0].user, "read ghost.txt");
    assert_eq!(persisted[0].agent, response.message);
}

#[tokio::test]
async fn nth_recent_file_is_resolved() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("only.txt"), "the only recent file").unwrap();

    let classifier = ScriptedClassifier::new(vec![Ok(wire("read raw text", 0.95, None, Some(1)))]);
    let processor = processor_with(classifier, FixedSummarizer::ok("unused"), dir.path());
    let (sessions, _) = sessions_with(processor, 100);

    let response = sessions
        .on_user_utterance("alice", "read the latest file")
        .await
        .unwrap();

    assert_eq!(response.status, ResponseStatus::Done);
    assert_eq!(response.raw_text.as_deref(), Some("the only recent file"));
}

#[tokio::test]
async fn actionable_intent_with_no_file_asks_for_input() {
    let dir = tempfile::tempdir().unwrap();

    let classifier = ScriptedClassifier::new(vec![Ok(wire("read raw text", 0.9, None, None))]);
    let processor = processor_with(classifier, FixedSummarizer::ok("unused"), dir.path());
    let (sessions, _) = sessions_with(processor, 100);

    let response = sessions
        .on_user_utterance("alice", "read it")
        .await
        .unwrap();

    assert_eq!(response.status, ResponseStatus::NeedInput);
    assert_eq!(response.intent, Intent::ReadRawText);
}

#[tokio::test]
async fn summarizer_failure_is_fatal_to_the_request() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("report.txt"), "content").unwrap();

    let classifier = ScriptedClassifier::new(vec![Ok(wire(
        "read file and summary",
        0.9,
        Some("report.txt"),
        None,
    ))]);
    let processor = processor_with(classifier, FixedSummarizer::failing(), dir.path());
    let (sessions, _) = sessions_with(processor, 100);

    let response = sessions
        .on_user_utterance("alice", "summarize report.txt")
        .await
        .unwrap();

    assert_eq!(response.status, ResponseStatus::Unsupported);
    assert!(response.summary.is_none());
}

#[tokio::test]
async fn session_end_flushes_remaining_pairs() {
    let dir = tempfile::tempdir().unwrap();

    let classifier = ScriptedClassifier::new(vec![
        Ok(wire("unsupported", 0.9, None, None)),
        Ok(wire("unsupported", 0.9, None, None)),
    ]);
    let processor = processor_with(classifier, FixedSummarizer::ok("unused"), dir.path());
    let (sessions, repo) = sessions_with(processor, 100);

    sessions.on_user_utterance("alice", "one").await.unwrap();
    sessions.on_user_utterance("alice", "two").await.unwrap();
    assert_eq!(repo.exchange_count("alice").unwrap(), 0);

    sessions.on_session_end("alice").await.unwrap();
    assert_eq!(repo.exchange_count("alice").unwrap(), 2);
}

#[tokio::test]
async fn new_session_is_seeded_from_storage() {
    let dir = tempfile::tempdir().unwrap();

    let classifier = ScriptedClassifier::new(vec![
        Ok(wire("unsupported", 0.9, None, None)),
        Ok(wire("unsupported", 0.9, None, None)),
    ]);
    let processor = processor_with(classifier, FixedSummarizer::ok("unused"), dir.path());

    let repo = HistoryRepo::new(db::init_memory().unwrap());
    repo.append_pairs(
        "alice",
        &[scribe_gateway::MessagePair::now("earlier question", "earlier answer")],
    )
    .unwrap();

    let store: Arc<dyn ConversationStore> = Arc::new(repo.clone());
    let sessions = SessionManager::new(processor, store, 1, 5);

    // First turn of the new session persists on top of the seeded history
    sessions.on_user_utterance("alice", "hello again").await.unwrap();
    let persisted = repo.last_n("alice", 10).unwrap();
    assert_eq!(persisted.len(), 2);
    assert_eq!(persisted[0].user, "earlier question");
    assert_eq!(persisted[1].user, "hello again");
}

#[tokio::test]
async fn identities_do_not_share_caches() {
    let dir = tempfile::tempdir().unwrap();

    let classifier = ScriptedClassifier::new(vec![
        Ok(wire("unsupported", 0.9, None, None)),
        Ok(wire("unsupported", 0.9, None, None)),
    ]);
    let processor = processor_with(classifier, FixedSummarizer::ok("unused"), dir.path());
    let (sessions, repo) = sessions_with(processor, 1);

    sessions.on_user_utterance("alice", "from alice").await.unwrap();
    sessions.on_user_utterance("bob", "from bob").await.unwrap();

    let alice = repo.last_n("alice", 10).unwrap();
    assert_eq!(alice.len(), 1);
    assert_eq!(alice[0].user, "from alice");
    assert_eq!(repo.exchange_count("bob").unwrap(), 1);
}
