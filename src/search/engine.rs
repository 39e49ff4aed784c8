//! Greedy search over the option list

use super::score::{Ranking, ScoreRecord, rank, score_diff};
use crate::cache::{CacheError, IterationCache};
use crate::cli::{OutputEvent, OutputHandler};
use crate::config::{Candidate, OptionEntry, OptionsError};
use crate::oracle::{DiffOracle, FormatRequest, FormatterOracle, OracleError};
use crate::sample::SourceSample;
use crate::style::Style;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinHandle};

/// Errors that stop a search
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("invalid option list: {0}")]
    Options(#[from] OptionsError),

    #[error("cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("formatted output not generated for {option}={candidate} ({reason}); invalid option?")]
    FatalOracle {
        option: String,
        candidate: String,
        reason: String,
    },

    #[error("diff failed for {option}={candidate}: {source}")]
    Diff {
        option: String,
        candidate: String,
        source: OracleError,
    },

    #[error("{artifact} artifact missing for {option}={candidate}")]
    MissingArtifact {
        option: String,
        candidate: String,
        artifact: &'static str,
    },

    #[error("oracle task failed: {0}")]
    Join(#[from] JoinError),
}

/// What the acceptance policy did with an option
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// The best candidate was written into the style
    Accepted,
    /// Every candidate scored the same
    Tie,
    /// The best score did not beat the previous option's best
    NoImprovement,
}

/// Result of evaluating one option
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionOutcome {
    pub key: String,
    pub decision: Decision,
    /// Best-scoring candidate, whether or not it was accepted
    pub winner: String,
    pub min_score: u64,
    pub max_score: u64,
    /// Best candidate still changed more lines than the sample has
    pub low_confidence: bool,
    /// Scores in ascending order
    pub scores: Vec<ScoreRecord>,
    /// Cached artifacts for this iteration were discarded
    pub invalidated: bool,
    pub formatter_runs: usize,
    pub diff_runs: usize,
}

/// Final style plus how every option was decided
#[derive(Debug, Clone)]
pub struct SearchReport {
    pub style: Style,
    pub outcomes: Vec<OptionOutcome>,
}

impl SearchReport {
    pub fn accepted(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.decision == Decision::Accepted)
            .count()
    }
}

/// Knobs for the search itself
#[derive(Debug, Clone)]
pub struct SearchSettings {
    /// Max formatter/diff processes in flight
    pub max_concurrent: usize,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self { max_concurrent: 4 }
    }
}

/// Acceptance policy: skip options that cannot tell candidates apart or
/// whose best result is no better than the running threshold.
pub fn decide(ranking: &Ranking, prev_score: u64) -> Decision {
    if ranking.min == ranking.max {
        Decision::Tie
    } else if ranking.min >= prev_score {
        Decision::NoImprovement
    } else {
        Decision::Accepted
    }
}

enum UnitError {
    Oracle(OracleError),
    Cache(CacheError),
}

type Unit = JoinHandle<(String, Result<(), UnitError>)>;

/// Evaluates options one at a time, in order, accumulating a style.
///
/// Options run strictly in sequence because each one's candidate styles
/// include every earlier decision. Within an option, formatter runs and then
/// diff runs fan out concurrently and are joined before moving on.
pub struct GreedySearch {
    sample: SourceSample,
    cache: IterationCache,
    formatter: Arc<dyn FormatterOracle>,
    differ: Arc<dyn DiffOracle>,
    limit: Arc<Semaphore>,
    style: Style,
    prev_score: u64,
}

impl GreedySearch {
    pub fn new(
        sample: SourceSample,
        cache: IterationCache,
        formatter: Arc<dyn FormatterOracle>,
        differ: Arc<dyn DiffOracle>,
        settings: &SearchSettings,
    ) -> Self {
        // Loose enough that the first option is never skipped for non-improvement
        let prev_score = 4 * sample.line_count as u64;
        Self {
            sample,
            cache,
            formatter,
            differ,
            limit: Arc::new(Semaphore::new(settings.max_concurrent.max(1))),
            style: Style::new(),
            prev_score,
        }
    }

    /// Style accumulated so far
    pub fn style(&self) -> &Style {
        &self.style
    }

    /// Score the next option's best candidate must beat
    pub fn prev_score(&self) -> u64 {
        self.prev_score
    }

    /// Run every option in order and return the final style
    pub async fn run(
        mut self,
        options: &[OptionEntry],
        handler: &dyn OutputHandler,
    ) -> Result<SearchReport, SearchError> {
        let started = Instant::now();
        let total = options.len();
        let mut outcomes = Vec::with_capacity(total);

        for (index, entry) in options.iter().enumerate() {
            handler.emit(OutputEvent::OptionStart {
                key: entry.key.clone(),
                index: index + 1,
                total,
            });
            let outcome = self.evaluate(entry).await?;
            handler.emit(OutputEvent::OptionDecided {
                outcome: outcome.clone(),
            });
            outcomes.push(outcome);
        }

        let report = SearchReport {
            style: self.style,
            outcomes,
        };
        handler.emit(OutputEvent::RunComplete {
            accepted: report.accepted(),
            options: total,
            duration_ms: started.elapsed().as_millis() as u64,
        });
        Ok(report)
    }

    /// Evaluate a single option and apply the acceptance policy
    pub async fn evaluate(&mut self, entry: &OptionEntry) -> Result<OptionOutcome, SearchError> {
        entry.validate()?;

        let names = entry.candidate_names();
        let invalidated = self.cache.start_iteration(&entry.key, &self.style, &names)?;
        if invalidated {
            tracing::debug!(
                iteration = self.cache.iteration(),
                key = %entry.key,
                "cache invalidated"
            );
        }

        let formatter_runs = self.materialize_formatted(entry).await?;
        let diff_runs = self.materialize_diffs(entry).await?;

        let records = self.score(entry)?;
        let ranking = rank(&records).ok_or_else(|| OptionsError::NoCandidates {
            option: entry.key.clone(),
        })?;
        let winner = &entry.candidates[ranking.winner];

        let decision = decide(&ranking, self.prev_score);
        if decision == Decision::Accepted {
            match winner {
                Candidate::Value { value, .. } => self.style.set(entry.key.clone(), value.clone()),
                Candidate::Alias { overrides, .. } => self.style.merge(overrides),
            }
        }

        let low_confidence = ranking.min > self.sample.line_count as u64;
        tracing::info!(
            key = %entry.key,
            winner = winner.name(),
            min = ranking.min,
            max = ranking.max,
            threshold = self.prev_score,
            ?decision,
            low_confidence,
            formatter_runs,
            diff_runs,
            "option decided"
        );
        self.prev_score = ranking.min;

        Ok(OptionOutcome {
            key: entry.key.clone(),
            decision,
            winner: winner.name().to_string(),
            min_score: ranking.min,
            max_score: ranking.max,
            low_confidence,
            scores: ranking.sorted,
            invalidated,
            formatter_runs,
            diff_runs,
        })
    }

    /// Format every candidate that has no cached output. Returns how many ran.
    async fn materialize_formatted(&self, entry: &OptionEntry) -> Result<usize, SearchError> {
        let mut units: Vec<Unit> = Vec::new();

        for candidate in &entry.candidates {
            let slot = self.cache.slot(candidate.name());
            if slot.has_formatted()? {
                continue;
            }

            let style = self.style.with_overrides(&candidate.overrides(&entry.key));
            slot.write_style(&style)?;
            let request = FormatRequest::new(
                Arc::clone(&self.sample.content),
                style,
                self.sample.file_name(),
            );

            let formatter = Arc::clone(&self.formatter);
            units.push(self.dispatch(candidate.name(), async move {
                let text = formatter.format(&request).await.map_err(UnitError::Oracle)?;
                slot.write_formatted(&text).map_err(UnitError::Cache)
            }));
        }

        let dispatched = units.len();
        tracing::debug!(key = %entry.key, dispatched, "formatter batch");
        let failures = join_units(units).await?;

        for candidate in &entry.candidates {
            let slot = self.cache.slot(candidate.name());
            if slot.has_formatted()? {
                continue;
            }
            let reason = failures
                .iter()
                .find(|(name, _)| name == candidate.name())
                .map(|(_, e)| e.to_string())
                .unwrap_or_else(|| "empty output".into());
            let reason = match self.cache.formatted_path(candidate.name()) {
                Some(path) => format!("{}: {}", path.display(), reason),
                None => reason,
            };
            tracing::error!(key = %entry.key, candidate = candidate.name(), %reason, "formatter failed");
            return Err(SearchError::FatalOracle {
                option: entry.key.clone(),
                candidate: candidate.name().to_string(),
                reason,
            });
        }

        Ok(dispatched)
    }

    /// Diff every candidate that has no cached diff. Returns how many ran.
    async fn materialize_diffs(&self, entry: &OptionEntry) -> Result<usize, SearchError> {
        let mut units: Vec<Unit> = Vec::new();

        for candidate in &entry.candidates {
            let slot = self.cache.slot(candidate.name());
            if slot.has_diff()? {
                continue;
            }
            let formatted = slot
                .read_formatted()?
                .ok_or_else(|| SearchError::MissingArtifact {
                    option: entry.key.clone(),
                    candidate: candidate.name().to_string(),
                    artifact: "formatted",
                })?;

            let original = Arc::clone(&self.sample.content);
            let differ = Arc::clone(&self.differ);
            units.push(self.dispatch(candidate.name(), async move {
                let diff = differ
                    .diff(&original, &formatted)
                    .await
                    .map_err(UnitError::Oracle)?;
                slot.write_diff(&diff).map_err(UnitError::Cache)
            }));
        }

        let dispatched = units.len();
        tracing::debug!(key = %entry.key, dispatched, "diff batch");

        if let Some((candidate, source)) = join_units(units).await?.into_iter().next() {
            return Err(SearchError::Diff {
                option: entry.key.clone(),
                candidate,
                source,
            });
        }

        Ok(dispatched)
    }

    fn score(&self, entry: &OptionEntry) -> Result<Vec<ScoreRecord>, SearchError> {
        entry
            .candidates
            .iter()
            .map(|candidate| {
                let diff = self
                    .cache
                    .slot(candidate.name())
                    .read_diff()?
                    .ok_or_else(|| SearchError::MissingArtifact {
                        option: entry.key.clone(),
                        candidate: candidate.name().to_string(),
                        artifact: "diff",
                    })?;
                Ok(ScoreRecord {
                    candidate: candidate.name().to_string(),
                    score: score_diff(&diff),
                })
            })
            .collect()
    }

    /// Spawn one unit of work for a candidate, gated by the concurrency limit
    fn dispatch<F>(&self, candidate: &str, work: F) -> Unit
    where
        F: Future<Output = Result<(), UnitError>> + Send + 'static,
    {
        let limit = Arc::clone(&self.limit);
        let name = candidate.to_string();
        tokio::spawn(async move {
            let _permit = limit.acquire_owned().await;
            (name, work.await)
        })
    }
}

/// Wait for every unit, then report oracle failures in dispatch order.
///
/// All units are awaited even after one fails; there is no cancellation.
async fn join_units(units: Vec<Unit>) -> Result<Vec<(String, OracleError)>, SearchError> {
    let mut oracle_failures = Vec::new();
    let mut fatal: Option<SearchError> = None;

    for unit in units {
        match unit.await {
            Ok((_, Ok(()))) => {}
            Ok((name, Err(UnitError::Oracle(e)))) => oracle_failures.push((name, e)),
            Ok((_, Err(UnitError::Cache(e)))) => {
                if fatal.is_none() {
                    fatal = Some(SearchError::Cache(e));
                }
            }
            Err(e) => {
                if fatal.is_none() {
                    fatal = Some(SearchError::Join(e));
                }
            }
        }
    }

    match fatal {
        Some(e) => Err(e),
        None => Ok(oracle_failures),
    }
}
