//! Query answering over a loaded assistant

use std::collections::HashSet;
use std::sync::Arc;

use super::assistant;
use crate::assist::{Assistant, AssistantReply, EmergencyKind, SearchMode};
use crate::corpus::Locale;
use crate::test_utils::{write_model_file, FakeRuntime};

async fn neural(dir: &tempfile::TempDir, locale: Locale) -> Assistant {
    let assistant = assistant(
        Arc::new(FakeRuntime::new()),
        write_model_file(dir.path()),
        locale,
    );
    assistant.load().await.unwrap();
    assert_eq!(assistant.mode(), SearchMode::Semantic);
    assistant
}

#[tokio::test]
async fn test_semantic_exact_title_ranks_first() {
    let dir = tempfile::tempdir().unwrap();
    let assistant = neural(&dir, Locale::De).await;

    let results = assistant.search("Sturm: Vorbereitung", None).await;

    assert_eq!(results.len(), 3);
    assert_eq!(results[0].tip_title, "Sturm");
}

#[tokio::test]
async fn test_results_are_distinct_corpus_records() {
    let dir = tempfile::tempdir().unwrap();
    let assistant = neural(&dir, Locale::De).await;

    let results = assistant.search("Was tun bei Gefahr?", Some(10)).await;
    let ids: HashSet<_> = results.iter().map(|r| r.id.as_str()).collect();

    assert_eq!(results.len(), 4);
    assert_eq!(ids.len(), 4);
}

#[tokio::test]
async fn test_zero_top_k_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let assistant = neural(&dir, Locale::De).await;
    assert!(assistant.search("sturm", Some(0)).await.is_empty());
}

#[tokio::test]
async fn test_search_before_load_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let assistant = assistant(
        Arc::new(FakeRuntime::new()),
        write_model_file(dir.path()),
        Locale::De,
    );
    assert!(assistant.search("sturm", None).await.is_empty());
}

#[tokio::test]
async fn test_lexical_query_without_matches_is_empty() {
    let assistant = assistant(
        Arc::new(FakeRuntime::unavailable()),
        "unused.onnx".to_string(),
        Locale::De,
    );
    assistant.load().await.unwrap();

    assert!(assistant.search("xyzxyz", None).await.is_empty());
    assert!(assistant.search("a b", None).await.is_empty());
}

#[tokio::test]
async fn test_respond_composes_guidance() {
    let assistant = assistant(
        Arc::new(FakeRuntime::unavailable()),
        "unused.onnx".to_string(),
        Locale::De,
    );
    assistant.load().await.unwrap();

    let reply = assistant.respond("Rauchmelder piept, ist das ein Brand?").await;

    assert_eq!(reply.kind(), Some(EmergencyKind::Fire));
    assert!(matches!(reply, AssistantReply::Guidance { .. }));
    assert_eq!(reply.tips()[0].tip_title, "Brandschutz");
    assert_eq!(reply.tips()[0].text, "Rauchmelder regelmäßig testen.");
}
