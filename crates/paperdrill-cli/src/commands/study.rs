//! The `paperdrill study` command — the interactive quiz session.

use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use chrono::Utc;
use comfy_table::{Cell, Table};
use uuid::Uuid;

use paperdrill_core::model::{Paper, QualityRating, TokenUsage};
use paperdrill_core::priority::rank_papers;
use paperdrill_core::report::SessionReport;
use paperdrill_core::session::{AnswerSubmission, SessionConfig, SessionEngine};
use paperdrill_core::traits::{QuizBackend, StatsStore};
use paperdrill_providers::config::{create_backend, load_config_from, StudyConfig};
use paperdrill_store::{JsonStatsStore, PaperCache, SessionHistory};

use super::DataPaths;

pub async fn execute(
    paper_filter: Option<String>,
    question_override: Option<usize>,
    model_arg: Option<String>,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let paths = DataPaths::from_config(&config);

    let papers = PaperCache::new(&paths.papers).load()?;
    anyhow::ensure!(
        !papers.is_empty(),
        "no papers synced yet — run `paperdrill sync` first"
    );

    let mut store = JsonStatsStore::open(&paths.stats)?;
    let now = Utc::now();

    let paper = select_paper(&papers, &store, paper_filter.as_deref())?.clone();

    let (provider_name, model) = resolve_model(&config, model_arg.as_deref());
    let Some(provider_config) = config.providers.get(&provider_name) else {
        anyhow::bail!(
            "provider '{provider_name}' not found in config. Available: {:?}",
            config.providers.keys().collect::<Vec<_>>()
        );
    };
    let backend: Arc<dyn QuizBackend> = Arc::from(create_backend(&provider_name, provider_config)?);

    let session_config = SessionConfig {
        question_count: question_override.unwrap_or(config.question_count),
        temperature: config.default_temperature,
        max_retries: config.max_retries,
        retry_delay: Duration::from_millis(config.retry_delay_ms),
        grading_parallelism: config.grading_parallelism,
        ..Default::default()
    };
    let engine = SessionEngine::new(Arc::clone(&backend), session_config);

    println!("Studying: {}", paper.title);
    println!("Generating questions with {model}...\n");

    let start = Instant::now();
    let mut token_usage = TokenUsage::default();

    let response = engine.generate_questions(&model, &paper).await?;
    token_usage.add(&response.token_usage);

    let stdin = std::io::stdin();
    let mut input = stdin.lock();
    let mut submissions = Vec::with_capacity(response.questions.len());

    for (index, question) in response.questions.iter().enumerate() {
        println!("Q{} of {}: {}", index + 1, response.questions.len(), question.question);
        let answer = prompt_line(&mut input, "> ")?;
        if answer.trim().is_empty() {
            println!("(skipped)\n");
        } else {
            println!();
        }
        submissions.push(AnswerSubmission {
            question: question.clone(),
            answer,
        });
    }

    println!("Grading your answers...\n");
    let records = engine.grade_answers(&model, submissions).await?;
    for record in &records {
        token_usage.add(&record.token_usage);
    }

    let mut table = Table::new();
    table.set_header(vec!["#", "Score", "Feedback"]);
    for (index, record) in records.iter().enumerate() {
        table.add_row(vec![
            Cell::new(index + 1),
            Cell::new(format!("{:.0}", record.score)),
            Cell::new(&record.feedback),
        ]);
    }
    println!("{table}\n");

    let session_score = SessionEngine::session_score(&records);
    println!("Session score: {session_score:.0}/100");

    let rating = prompt_rating(&mut input)?;

    let mut stats = store.get(&paper.id).unwrap_or_default();
    let update = engine.finish_session(&mut stats, session_score, rating, now)?;
    let due_date = stats.due_date.unwrap_or(now);
    let mastery_score = stats.mastery_score.unwrap_or(session_score);

    store.put(&paper.id, stats);
    store.save()?;

    let report = SessionReport {
        id: Uuid::new_v4(),
        created_at: now,
        paper_id: paper.id.clone(),
        paper_title: paper.title.clone(),
        provider: backend.name().to_string(),
        model: model.clone(),
        answers: records,
        session_score,
        rating,
        review: update,
        due_date,
        mastery_score,
        token_usage,
        duration_ms: start.elapsed().as_millis() as u64,
    };
    let report_path = SessionHistory::new(&paths.sessions).save(&report)?;

    println!(
        "\nNext review in {} day(s), on {}. Mastery: {mastery_score:.0}%",
        update.interval,
        due_date.format("%Y-%m-%d"),
    );
    eprintln!("Session saved to: {}", report_path.display());

    Ok(())
}

/// Pick the paper to study: an explicit id/title match, or the
/// highest-priority paper.
fn select_paper<'a>(
    papers: &'a [Paper],
    store: &'a JsonStatsStore,
    filter: Option<&str>,
) -> Result<&'a Paper> {
    if let Some(filter) = filter {
        let needle = filter.to_lowercase();
        let matches: Vec<&Paper> = papers
            .iter()
            .filter(|p| p.id == filter || p.title.to_lowercase().contains(&needle))
            .collect();
        return match matches.as_slice() {
            [] => anyhow::bail!("no paper matches '{filter}'"),
            [paper] => Ok(paper),
            many => {
                let titles: Vec<&str> = many.iter().map(|p| p.title.as_str()).collect();
                anyhow::bail!("'{filter}' is ambiguous: {}", titles.join(", "));
            }
        };
    }

    let ranked = rank_papers(papers, store.all(), Utc::now());
    ranked
        .first()
        .map(|entry| entry.paper)
        .ok_or_else(|| anyhow::anyhow!("no papers available"))
}

/// Split an optional "provider/model" argument, falling back to the
/// configured defaults.
fn resolve_model(config: &StudyConfig, model_arg: Option<&str>) -> (String, String) {
    match model_arg {
        Some(arg) => {
            let parts: Vec<&str> = arg.splitn(2, '/').collect();
            if parts.len() == 2 {
                (parts[0].to_string(), parts[1].to_string())
            } else {
                (config.default_provider.clone(), parts[0].to_string())
            }
        }
        None => (
            config.default_provider.clone(),
            config.default_model.clone(),
        ),
    }
}

fn prompt_line(input: &mut impl BufRead, prompt: &str) -> Result<String> {
    print!("{prompt}");
    std::io::stdout().flush()?;
    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(line.trim_end_matches(['\n', '\r']).to_string())
}

/// Ask for the self-reported recall quality until the input parses.
fn prompt_rating(input: &mut impl BufRead) -> Result<QualityRating> {
    loop {
        let line = prompt_line(
            input,
            "How well did you recall this paper? [f]orgot / [s]truggled / [g]ood / [p]erfect: ",
        )?;
        match line.parse::<QualityRating>() {
            Ok(rating) => return Ok(rating),
            Err(e) => println!("{e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;
    use paperdrill_core::model::PaperReviewStats;

    fn paper(id: &str, title: &str) -> Paper {
        Paper {
            id: id.into(),
            title: title.into(),
            notes: String::new(),
            tags: vec![],
            url: None,
            synced_at: Utc::now(),
        }
    }

    fn empty_store() -> JsonStatsStore {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStatsStore::open(&dir.path().join("stats.json")).unwrap();
        // The tempdir is dropped here; the store never saves in these tests.
        store
    }

    #[test]
    fn select_by_title_substring() {
        let papers = vec![paper("a", "Attention Is All You Need"), paper("b", "ResNet")];
        let store = empty_store();

        let selected = select_paper(&papers, &store, Some("attention")).unwrap();
        assert_eq!(selected.id, "a");
    }

    #[test]
    fn select_ambiguous_fails() {
        let papers = vec![paper("a", "Attention v1"), paper("b", "Attention v2")];
        let store = empty_store();

        let err = select_paper(&papers, &store, Some("attention")).unwrap_err();
        assert!(err.to_string().contains("ambiguous"));
    }

    #[test]
    fn select_no_match_fails() {
        let papers = vec![paper("a", "Attention")];
        let store = empty_store();

        assert!(select_paper(&papers, &store, Some("bert")).is_err());
    }

    #[test]
    fn select_default_takes_highest_priority() {
        let papers = vec![paper("fresh", "Fresh"), paper("stale", "Stale")];
        let mut store = empty_store();
        let now = Utc::now();
        store.put(
            "fresh",
            PaperReviewStats {
                last_reviewed: Some(now - ChronoDuration::days(1)),
                mastery_score: Some(95.0),
                review_count: 2,
                interval: 10,
                due_date: Some(now + ChronoDuration::days(9)),
                ..Default::default()
            },
        );

        // The never-reviewed paper (50 points) outranks the fresh one.
        let selected = select_paper(&papers, &store, None).unwrap();
        assert_eq!(selected.id, "stale");
    }

    #[test]
    fn resolve_model_variants() {
        let config = StudyConfig::default();

        let (provider, model) = resolve_model(&config, None);
        assert_eq!(provider, "anthropic");
        assert_eq!(model, "claude-sonnet-4-20250514");

        let (provider, model) = resolve_model(&config, Some("openai/gpt-4.1"));
        assert_eq!(provider, "openai");
        assert_eq!(model, "gpt-4.1");

        let (provider, model) = resolve_model(&config, Some("claude-haiku-4-5-20251001"));
        assert_eq!(provider, "anthropic");
        assert_eq!(model, "claude-haiku-4-5-20251001");
    }

    #[test]
    fn prompt_line_trims_newline() {
        let mut input = std::io::Cursor::new(b"an answer\n".to_vec());
        assert_eq!(prompt_line(&mut input, "").unwrap(), "an answer");
    }

    #[test]
    fn prompt_rating_retries_until_valid() {
        let mut input = std::io::Cursor::new(b"maybe\ng\n".to_vec());
        assert_eq!(prompt_rating(&mut input).unwrap(), QualityRating::Good);
    }
}
