//! End-to-end pipeline runs against mock sources and a stub model.
//!
//! Sentiment scoring uses the real VADER lexicon, so review bodies here are
//! chosen to be unambiguous.

use std::sync::Arc;
use std::time::Duration;

use painpoint_common::{ErrorKind, InsightResponse};
use painpoint_pipeline::synthesize::{no_feedback_report, MAX_SAMPLE};
use painpoint_pipeline::testing::{raw_reviews, MockReviewSource, StubGenerator, REPORT_JSON};
use painpoint_pipeline::traits::SourceRef;
use painpoint_pipeline::{
    Acquirer, AcquisitionLimits, ArtifactStore, InsightPipeline, SentimentFilter, Synthesizer,
};

const COMPLAINT: &str = "Terrible, crashes constantly, hate it";
const PRAISE: &str = "Great app!";

fn limits() -> AcquisitionLimits {
    AcquisitionLimits {
        max_sources: 3,
        max_items_per_source: 200,
        source_timeout: Duration::from_millis(200),
    }
}

fn build(source: MockReviewSource, generator: Arc<StubGenerator>) -> InsightPipeline {
    InsightPipeline::new(
        Acquirer::new(Arc::new(source), limits()),
        SentimentFilter::new(-0.5),
        Synthesizer::new(generator)
            .with_seed(99)
            .with_timeout(Duration::from_millis(200)),
    )
}

fn fitness_apps() -> MockReviewSource {
    MockReviewSource::new()
        .on_search(
            "fitness",
            vec![
                SourceRef::new("100", "RunTrack"),
                SourceRef::new("200", "LiftLog"),
                SourceRef::new("300", "Broken"),
            ],
        )
        .on_reviews("100", raw_reviews(&[PRAISE, COMPLAINT]))
        .on_reviews("200", raw_reviews(&["I love it, works perfectly", "Awful update, I hate the new design"]))
        .failing("300")
}

fn report_of(response: InsightResponse) -> painpoint_common::InsightReport {
    match response {
        InsightResponse::Report(report) => report,
        InsightResponse::Error(payload) => panic!("expected report, got {payload:?}"),
    }
}

fn error_of(response: InsightResponse) -> painpoint_common::ErrorPayload {
    match response {
        InsightResponse::Error(payload) => payload,
        InsightResponse::Report(report) => panic!("expected error, got {report:?}"),
    }
}

#[tokio::test]
async fn full_run_sends_only_complaints_to_the_model() {
    let generator = Arc::new(StubGenerator::returning(REPORT_JSON));
    let run = build(fitness_apps(), generator.clone()).run("fitness").await;

    let report = report_of(run.response);
    assert_eq!(report.pain_points().len(), 2);
    assert_eq!(run.stats.sources_fetched, 2);
    assert_eq!(run.stats.reviews_fetched, 4);
    assert_eq!(run.stats.negative_reviews, 2);

    let prompt = generator.last_prompt().unwrap();
    assert!(prompt.contains(COMPLAINT));
    assert!(prompt.contains("Awful update"));
    assert!(!prompt.contains(PRAISE));
    let first = prompt.find(COMPLAINT).unwrap();
    let second = prompt.find("Awful update").unwrap();
    assert!(first < second, "source order must be preserved");
}

#[tokio::test]
async fn only_praise_short_circuits_without_model_call() {
    let source = MockReviewSource::new()
        .on_search("happy", vec![SourceRef::new("1", "Happy")])
        .on_reviews("1", raw_reviews(&[PRAISE, "Love it, wonderful and fast"]));
    let generator = Arc::new(StubGenerator::returning(REPORT_JSON));

    let run = build(source, generator.clone()).run("happy").await;

    assert_eq!(report_of(run.response), no_feedback_report());
    assert_eq!(run.stats.negative_reviews, 0);
    assert_eq!(generator.calls(), 0);
}

#[tokio::test]
async fn every_source_failing_is_no_reviews_found() {
    let source = MockReviewSource::new()
        .on_search("dead", vec![SourceRef::new("1", "A"), SourceRef::new("2", "B")])
        .failing("1")
        .hanging("2", Duration::from_secs(5));
    let generator = Arc::new(StubGenerator::returning(REPORT_JSON));

    let payload = error_of(build(source, generator.clone()).run("dead").await.response);

    assert_eq!(payload.error, ErrorKind::NoData);
    assert!(payload.details.contains("dead"));
    assert_eq!(generator.calls(), 0);
}

#[tokio::test]
async fn prose_output_is_invalid_json_with_exact_raw_text() {
    let prose = "The users seem upset about crashes.";
    let generator = Arc::new(StubGenerator::returning(prose));

    let payload = error_of(build(fitness_apps(), generator).run("fitness").await.response);

    assert_eq!(payload.error, ErrorKind::InvalidJson);
    assert_eq!(payload.raw_output.as_deref(), Some(prose));
}

#[tokio::test]
async fn unreachable_model_is_model_failed() {
    let generator = Arc::new(StubGenerator::failing("connection refused"));
    let payload = error_of(build(fitness_apps(), generator).run("fitness").await.response);

    assert_eq!(payload.error, ErrorKind::ModelFailed);
    assert!(payload.raw_output.is_none());
}

#[tokio::test]
async fn slow_model_is_model_failed() {
    let generator = Arc::new(StubGenerator::hanging(Duration::from_secs(5)));
    let payload = error_of(build(fitness_apps(), generator).run("fitness").await.response);
    assert_eq!(payload.error, ErrorKind::ModelFailed);
}

#[tokio::test]
async fn large_negative_sets_are_sampled_and_bounded() {
    let complaints: Vec<String> = (0..1500)
        .map(|i| format!("Terrible app {i}, crashes constantly, hate it"))
        .collect();
    let bodies: Vec<&str> = complaints.iter().map(String::as_str).collect();
    let source = MockReviewSource::new()
        .on_search("big", vec![SourceRef::new("1", "Big")])
        .on_reviews("1", raw_reviews(&bodies));
    let generator = Arc::new(StubGenerator::returning(REPORT_JSON));

    let pipeline = InsightPipeline::new(
        Acquirer::new(
            Arc::new(source),
            AcquisitionLimits {
                max_items_per_source: 2000,
                ..limits()
            },
        ),
        SentimentFilter::new(-0.5),
        Synthesizer::new(generator.clone()).with_seed(3),
    );
    let run = pipeline.run("big").await;

    assert!(!run.response.is_error());
    assert_eq!(run.stats.negative_reviews, 1500);
    assert!(run.stats.negative_reviews > MAX_SAMPLE);

    let prompt = generator.last_prompt().unwrap();
    let template = painpoint_pipeline::prompt::build_prompt("").chars().count();
    assert!(prompt.chars().count() <= template + painpoint_pipeline::synthesize::MAX_PROMPT_CHARS);
}

#[tokio::test]
async fn concurrent_runs_for_one_keyword_use_separate_directories() {
    let dir = tempfile::tempdir().unwrap();
    let generator = Arc::new(StubGenerator::returning(REPORT_JSON));
    let pipeline = Arc::new(
        build(fitness_apps(), generator).with_artifacts(ArtifactStore::new(dir.path())),
    );

    let (a, b) = tokio::join!(pipeline.run("fitness"), pipeline.run("fitness"));

    let a_dir = a.stats.batch_path.unwrap().parent().unwrap().to_path_buf();
    let b_dir = b.stats.batch_path.unwrap().parent().unwrap().to_path_buf();
    assert_ne!(a_dir, b_dir);
    assert!(a_dir.join("negative_reviews.csv").is_file());
    assert!(b_dir.join("negative_reviews.csv").is_file());
}
