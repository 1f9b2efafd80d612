//! Discovery loop
//!
//! No authoritative index of roll-call votes exists upstream, so the
//! driver probes roll numbers in order from 1 and stops after a run of
//! consecutive misses. Every failure is local to its roll: logged,
//! counted, never allowed to abort the scan. Each run restarts from
//! roll 1; the upserts make re-scanning already-ingested rolls cheap
//! and self-correcting.

use crate::fetch::{FetchOutcome, RollFetcher};
use crate::identity::{IdentityIndex, Resolution};
use crate::normalize;
use crate::parse::{self, ParseOutcome, TallyEntry};
use crate::persist::{self, PersistedRoll, ResolvedVote};
use rollcall_common::config::IngestConfig;
use rollcall_common::db::models::{Chamber, VoteSession};
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// One tally entry that could not be matched to the directory
#[derive(Debug, Clone)]
pub struct UnresolvedReport {
    pub vote_id: String,
    pub reference: String,
    pub detail: String,
}

/// End-of-scan accounting for one chamber
#[derive(Debug)]
pub struct ChamberSummary {
    pub chamber: Chamber,
    pub rolls_ingested: u64,
    pub rolls_missed: u64,
    pub transient_failures: u64,
    pub unresolved: Vec<UnresolvedReport>,
}

impl ChamberSummary {
    fn new(chamber: Chamber) -> Self {
        Self {
            chamber,
            rolls_ingested: 0,
            rolls_missed: 0,
            transient_failures: 0,
            unresolved: Vec::new(),
        }
    }

    pub fn log(&self) {
        info!(
            chamber = %self.chamber,
            rolls_ingested = self.rolls_ingested,
            rolls_missed = self.rolls_missed,
            transient_failures = self.transient_failures,
            identities_unresolved = self.unresolved.len(),
            "Chamber scan complete"
        );
    }
}

/// Per-run driver: explicit handles in, no global state
pub struct Driver<F: RollFetcher> {
    fetcher: F,
    pool: SqlitePool,
    identity: Arc<IdentityIndex>,
    config: IngestConfig,
    cancel: CancellationToken,
}

impl<F: RollFetcher> Driver<F> {
    pub fn new(
        fetcher: F,
        pool: SqlitePool,
        identity: Arc<IdentityIndex>,
        config: IngestConfig,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            fetcher,
            pool,
            identity,
            config,
            cancel,
        }
    }

    /// Scan one chamber's roll numbers from 1 until the consecutive-miss
    /// threshold is reached (or cancellation is requested). Returns the
    /// scan summary; the ingested count is `rolls_ingested`.
    pub async fn run_chamber(
        &self,
        chamber: Chamber,
        congress: i64,
        session: i64,
    ) -> ChamberSummary {
        let threshold = match chamber {
            Chamber::House => self.config.house_miss_threshold,
            Chamber::Senate => self.config.senate_miss_threshold,
        };

        info!(%chamber, congress, session, threshold, "Starting roll-call scan");

        let mut summary = ChamberSummary::new(chamber);
        let mut consecutive_misses = 0u32;
        let mut roll: i64 = 1;

        while consecutive_misses < threshold {
            // Cancellation is honored between rolls only, never
            // mid-write, so no roll is ever torn.
            if self.cancel.is_cancelled() {
                info!(%chamber, roll, "Scan cancelled");
                break;
            }

            let url = chamber.roll_url(congress, session, roll, self.config.house_year);
            let mut hit = false;

            match self.fetcher.fetch(&url).await {
                FetchOutcome::Success(body) => {
                    match parse::parse_roll(chamber, congress, session, roll, &body) {
                        ParseOutcome::Found { session: vote, tally } => {
                            match self.ingest_roll(&vote, tally, &mut summary).await {
                                Ok(persisted) => {
                                    hit = true;
                                    summary.rolls_ingested += 1;
                                    info!(
                                        vote_id = %vote.vote_id(),
                                        members = persisted.member_rows,
                                        "Ingested roll-call vote"
                                    );
                                }
                                Err(e) => {
                                    // This roll only; a later run's
                                    // upsert re-attempts it naturally.
                                    error!(
                                        vote_id = %vote.vote_id(),
                                        error = %e,
                                        "Failed to persist roll, continuing scan"
                                    );
                                }
                            }
                        }
                        ParseOutcome::NotAVote { reason } => {
                            debug!(%chamber, roll, reason = %reason, "Document is not a vote");
                        }
                    }
                }
                FetchOutcome::NotFound => {
                    debug!(%chamber, roll, "Roll not found");
                }
                FetchOutcome::TransientFailure { attempts, last_error } => {
                    // Flaky upstream, not confirmed absence. Counted as
                    // a miss for termination, reported separately.
                    warn!(
                        %chamber,
                        roll,
                        attempts,
                        error = %last_error,
                        "Fetch failed after retries"
                    );
                    summary.transient_failures += 1;
                }
            }

            if hit {
                consecutive_misses = 0;
            } else {
                consecutive_misses += 1;
                summary.rolls_missed += 1;
            }
            roll += 1;
        }

        summary.log();
        summary
    }

    /// Resolve and normalize one parsed tally, then persist the roll as
    /// a single transactional unit. Unresolved entries are dropped into
    /// the report and never block the rest of the session.
    async fn ingest_roll(
        &self,
        vote: &VoteSession,
        tally: Vec<TallyEntry>,
        summary: &mut ChamberSummary,
    ) -> rollcall_common::Result<PersistedRoll> {
        let mut resolved = Vec::with_capacity(tally.len());
        for entry in tally {
            match self.identity.resolve(&entry.member) {
                Resolution::Resolved(legislator_id) => resolved.push(ResolvedVote {
                    legislator_id,
                    cast: normalize::normalize(&entry.position),
                }),
                Resolution::Unresolved { reference, detail } => {
                    warn!(
                        vote_id = %vote.vote_id(),
                        reference = %reference,
                        detail = %detail,
                        "Dropping unresolved tally entry"
                    );
                    summary.unresolved.push(UnresolvedReport {
                        vote_id: vote.vote_id(),
                        reference,
                        detail,
                    });
                }
            }
        }

        persist::persist_roll(&self.pool, vote, &resolved).await
    }
}
