use std::cell::RefCell;
use std::time::Duration;

use termex::extract::{ExtractEvent, RetryPolicy};
use termex::ir::{DatasetInfo, TermCandidate, TranslationUnit};
use termex::models::ExtractionBackend;
use termex::pipeline::{run_extraction, ExtractionOptions};

/// Backend whose behavior is a function of the call index.
struct MockBackend<F>
where
    F: Fn(u32) -> anyhow::Result<Vec<TermCandidate>>,
{
    respond: F,
    calls: RefCell<u32>,
}

impl<F> MockBackend<F>
where
    F: Fn(u32) -> anyhow::Result<Vec<TermCandidate>>,
{
    fn new(respond: F) -> Self {
        Self {
            respond,
            calls: RefCell::new(0),
        }
    }

    fn calls(&self) -> u32 {
        *self.calls.borrow()
    }
}

impl<F> ExtractionBackend for MockBackend<F>
where
    F: Fn(u32) -> anyhow::Result<Vec<TermCandidate>>,
{
    fn name(&self) -> &str {
        "mock"
    }

    fn extract_terms(&self, _prompt: &str) -> anyhow::Result<Vec<TermCandidate>> {
        let call = *self.calls.borrow();
        *self.calls.borrow_mut() += 1;
        (self.respond)(call)
    }
}

fn options(max_tokens_per_chunk: usize) -> ExtractionOptions {
    ExtractionOptions {
        max_tokens_per_chunk,
        retry: RetryPolicy {
            max_retries: 2,
            base_delay: Duration::from_millis(1),
        },
        ..ExtractionOptions::default()
    }
}

fn dataset() -> DatasetInfo {
    DatasetInfo {
        source_lang: "en".to_string(),
        target_lang: "es".to_string(),
        description: "test corpus".to_string(),
    }
}

/// 250 units of ~40 combined characters (~10 estimated tokens each) with a
/// budget of 1000 tokens: 100 units per chunk, 3 chunks total.
fn corpus() -> Vec<TranslationUnit> {
    (0..250)
        .map(|i| {
            TranslationUnit::new(
                format!("english segment {i:04}"),
                format!("segmento nro {i:04}"),
            )
        })
        .collect()
}

#[test]
fn end_to_end_three_chunks_with_cross_chunk_casing_collision() {
    let units = corpus();

    // Fixed 5-pair response per chunk: 4 chunk-unique terms plus "cloud" in a
    // different casing each time.
    let backend = MockBackend::new(|call| {
        Ok(vec![
            TermCandidate::new(format!("term-{call}-a"), "uno"),
            TermCandidate::new(format!("term-{call}-b"), "dos"),
            TermCandidate::new(format!("term-{call}-c"), "tres"),
            TermCandidate::new(format!("term-{call}-d"), "cuatro"),
            TermCandidate::new(
                match call {
                    0 => "Cloud",
                    1 => "cloud",
                    _ => "CLOUD",
                },
                "nube",
            ),
        ])
    });

    let mut chunk_sizes: Vec<usize> = Vec::new();
    let report = run_extraction(&backend, &units, &dataset(), &options(1000), &mut |ev| {
        if let ExtractEvent::ChunkStarted { units, .. } = ev {
            chunk_sizes.push(units);
        }
    })
    .expect("run");

    assert_eq!(chunk_sizes, vec![100, 100, 50]);
    assert_eq!(report.chunk_count, 3);
    assert_eq!(report.failed_chunks, 0);
    assert_eq!(backend.calls(), 3);

    // 5 pairs * 3 chunks, minus the 2 case-insensitive collisions on "cloud".
    assert_eq!(report.pairs.len(), 13);
    let cloud: Vec<_> = report
        .pairs
        .iter()
        .filter(|p| p.source_term.eq_ignore_ascii_case("cloud"))
        .collect();
    assert_eq!(cloud.len(), 1);
    assert_eq!(cloud[0].source_term, "Cloud");
}

#[test]
fn progress_is_monotone_and_ends_at_100() {
    let units = corpus();
    // Second chunk fails all three attempts (calls 1..=3); its units still
    // count as processed.
    let backend = MockBackend::new(|call| {
        if (1..=3).contains(&call) {
            Err(anyhow::anyhow!("boom"))
        } else {
            Ok(vec![TermCandidate::new("server", "servidor")])
        }
    });

    let mut percents: Vec<u8> = Vec::new();
    let report = run_extraction(&backend, &units, &dataset(), &options(1000), &mut |ev| {
        if let ExtractEvent::Progress { percent } = ev {
            percents.push(percent);
        }
    })
    .expect("run");

    assert_eq!(report.failed_chunks, 1);
    assert_eq!(percents, vec![40, 80, 100]);
    assert!(percents.windows(2).all(|w| w[0] <= w[1]));
}

#[test]
fn all_chunks_failing_returns_empty_list_not_error() {
    let units = corpus();
    let backend = MockBackend::new(|_| Err(anyhow::anyhow!("network down")));

    let report = run_extraction(&backend, &units, &dataset(), &options(1000), &mut |_| {})
        .expect("run should not fail");

    assert!(report.pairs.is_empty());
    assert_eq!(report.chunk_count, 3);
    assert_eq!(report.failed_chunks, 3);
    // 3 attempts per chunk.
    assert_eq!(backend.calls(), 9);
}

#[test]
fn empty_document_is_a_hard_input_error() {
    let backend = MockBackend::new(|_| Ok(vec![TermCandidate::new("a", "b")]));
    let err = run_extraction(&backend, &[], &dataset(), &options(1000), &mut |_| {})
        .expect_err("must fail before chunking");
    assert!(err.to_string().contains("no translation units"));
    assert_eq!(backend.calls(), 0);
}

#[test]
fn invalid_candidates_from_backend_never_reach_the_output() {
    let units = vec![TranslationUnit::new("cloud", "nube")];
    let backend = MockBackend::new(|_| {
        Ok(vec![
            TermCandidate::new("", "algo"),
            TermCandidate::new("term", "   "),
            TermCandidate::new("cloud", "nube"),
        ])
    });

    let report = run_extraction(&backend, &units, &dataset(), &options(1000), &mut |_| {})
        .expect("run");
    assert_eq!(report.pairs.len(), 1);
    assert_eq!(report.pairs[0].source_term, "cloud");
}

#[test]
fn oversized_unit_still_extracts_alone() {
    let units = vec![
        TranslationUnit::new("short", "corto"),
        TranslationUnit::new("x".repeat(8000), "y".repeat(8000)),
        TranslationUnit::new("short too", "corto tambien"),
    ];
    let backend = MockBackend::new(|call| {
        Ok(vec![TermCandidate::new(format!("t{call}"), "v")])
    });

    let mut started = 0usize;
    let report = run_extraction(&backend, &units, &dataset(), &options(100), &mut |ev| {
        if matches!(ev, ExtractEvent::ChunkStarted { .. }) {
            started += 1;
        }
    })
    .expect("run");

    assert_eq!(started, 3);
    assert_eq!(report.pairs.len(), 3);
}
