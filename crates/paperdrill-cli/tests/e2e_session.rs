//! End-to-end session tests with the mock backend.
//!
//! These run the whole quiz pipeline (generate → answer → grade →
//! score → schedule → persist) without touching the network.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use uuid::Uuid;

use paperdrill_core::model::{Paper, PaperReviewStats, QualityRating, QuizQuestion, TokenUsage};
use paperdrill_core::report::SessionReport;
use paperdrill_core::session::{AnswerSubmission, SessionConfig, SessionEngine};
use paperdrill_providers::mock::MockBackend;
use paperdrill_store::{JsonStatsStore, SessionHistory};
use paperdrill_core::traits::StatsStore;

fn make_paper() -> Paper {
    Paper {
        id: "page-1".into(),
        title: "Attention Is All You Need".into(),
        notes: "Self-attention lets every token attend to every other token.".into(),
        tags: vec!["ml".into()],
        url: None,
        synced_at: Utc::now(),
    }
}

fn make_engine(grade_score: f64) -> SessionEngine {
    let questions = vec![
        QuizQuestion {
            question: "What replaces recurrence?".into(),
            ideal_answer: "Self-attention.".into(),
        },
        QuizQuestion {
            question: "Why does that help?".into(),
            ideal_answer: "Full parallelism across the sequence.".into(),
        },
    ];
    let backend = Arc::new(MockBackend::new(questions, grade_score));
    SessionEngine::new(
        backend,
        SessionConfig {
            question_count: 2,
            retry_delay: Duration::from_millis(1),
            ..Default::default()
        },
    )
}

#[tokio::test]
async fn full_session_updates_and_persists_stats() {
    let engine = make_engine(80.0);
    let paper = make_paper();
    let now = Utc::now();

    let response = engine.generate_questions("mock-model", &paper).await.unwrap();
    assert_eq!(response.questions.len(), 2);

    let submissions = response
        .questions
        .iter()
        .map(|q| AnswerSubmission {
            question: q.clone(),
            answer: "Self-attention, which parallelizes.".into(),
        })
        .collect();

    let records = engine.grade_answers("mock-model", submissions).await.unwrap();
    let session_score = SessionEngine::session_score(&records);
    assert!((session_score - 80.0).abs() < 1e-9);

    let dir = tempfile::tempdir().unwrap();
    let mut store = JsonStatsStore::open(&dir.path().join("stats.json")).unwrap();

    let mut stats = store.get(&paper.id).unwrap_or_default();
    let update = engine
        .finish_session(&mut stats, session_score, QualityRating::Good, now)
        .unwrap();

    assert_eq!(update.interval, 1);
    assert_eq!(stats.review_count, 1);
    assert_eq!(stats.mastery_score, Some(80.0));

    store.put(&paper.id, stats.clone());
    store.save().unwrap();

    let reopened = JsonStatsStore::open(&dir.path().join("stats.json")).unwrap();
    assert_eq!(reopened.get(&paper.id), Some(stats));
}

#[tokio::test]
async fn second_session_advances_the_schedule() {
    let engine = make_engine(95.0);
    let now = Utc::now();
    let mut stats = PaperReviewStats::default();

    engine
        .finish_session(&mut stats, 90.0, QualityRating::Perfect, now)
        .unwrap();
    assert_eq!(stats.interval, 1);

    let update = engine
        .finish_session(&mut stats, 95.0, QualityRating::Perfect, now)
        .unwrap();
    // Second success takes the fixed 3-day step.
    assert_eq!(update.interval, 3);
    assert_eq!(stats.review_count, 2);
    // 0.7 * 90 + 0.3 * 95 = 91.5
    assert!((stats.mastery_score.unwrap() - 91.5).abs() < 1e-9);
}

#[tokio::test]
async fn failed_session_resets_the_schedule() {
    let engine = make_engine(20.0);
    let now = Utc::now();
    let mut stats = PaperReviewStats {
        last_reviewed: Some(now),
        mastery_score: Some(70.0),
        review_count: 4,
        ease_factor: 2.2,
        interval: 15,
        due_date: Some(now),
    };

    let update = engine
        .finish_session(&mut stats, 20.0, QualityRating::Forgot, now)
        .unwrap();

    assert_eq!(update.interval, 1);
    assert!((update.ease_factor - 2.0).abs() < 1e-9);
    // 0.7 * 70 + 0.3 * 20 = 55
    assert!((stats.mastery_score.unwrap() - 55.0).abs() < 1e-9);
}

#[tokio::test]
async fn session_report_roundtrips_through_history() {
    let engine = make_engine(60.0);
    let paper = make_paper();
    let now = Utc::now();

    let response = engine.generate_questions("mock-model", &paper).await.unwrap();
    let submissions = response
        .questions
        .iter()
        .map(|q| AnswerSubmission {
            question: q.clone(),
            answer: "an answer".into(),
        })
        .collect();
    let records = engine.grade_answers("mock-model", submissions).await.unwrap();
    let session_score = SessionEngine::session_score(&records);

    let mut stats = PaperReviewStats::default();
    let update = engine
        .finish_session(&mut stats, session_score, QualityRating::Struggled, now)
        .unwrap();

    let mut token_usage = TokenUsage::default();
    token_usage.add(&response.token_usage);
    for record in &records {
        token_usage.add(&record.token_usage);
    }

    let report = SessionReport {
        id: Uuid::new_v4(),
        created_at: now,
        paper_id: paper.id.clone(),
        paper_title: paper.title.clone(),
        provider: "mock".into(),
        model: "mock-model".into(),
        answers: records,
        session_score,
        rating: QualityRating::Struggled,
        review: update,
        due_date: stats.due_date.unwrap(),
        mastery_score: stats.mastery_score.unwrap(),
        token_usage,
        duration_ms: 5,
    };

    let dir = tempfile::tempdir().unwrap();
    let history = SessionHistory::new(&dir.path().join("sessions"));
    history.save(&report).unwrap();

    let loaded = history.load_all().unwrap();
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].paper_id, "page-1");
    assert_eq!(loaded[0].rating, QualityRating::Struggled);
    assert_eq!(loaded[0].answers.len(), 2);
}
