//! Idempotent persistence of vote sessions and member votes
//!
//! One roll (session metadata + its tally rows) is written as a single
//! transaction keyed by natural keys, so re-running an ingest updates
//! rows in place instead of duplicating them.

use rollcall_common::db::models::{VoteCast, VoteSession};
use rollcall_common::Result;
use sqlx::{Sqlite, SqlitePool, Transaction};

/// One resolved, normalized tally row ready to persist
#[derive(Debug, Clone)]
pub struct ResolvedVote {
    pub legislator_id: i64,
    pub cast: VoteCast,
}

/// Result of persisting one roll
#[derive(Debug)]
pub struct PersistedRoll {
    pub session_id: i64,
    pub member_rows: usize,
}

/// Tally aggregates stored on the session row. `Absent` and `Unknown`
/// positions are persisted per member but excluded from the aggregates.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct TallyCounts {
    pub yea: i64,
    pub nay: i64,
    pub present: i64,
    pub not_voting: i64,
}

impl TallyCounts {
    pub fn from_tally(tally: &[ResolvedVote]) -> Self {
        let mut counts = Self::default();
        for vote in tally {
            match vote.cast {
                VoteCast::Yea => counts.yea += 1,
                VoteCast::Nay => counts.nay += 1,
                VoteCast::Present => counts.present += 1,
                VoteCast::NotVoting => counts.not_voting += 1,
                VoteCast::Absent | VoteCast::Unknown => {}
            }
        }
        counts
    }
}

/// Persist one roll as a single transactional unit: it commits whole or
/// not at all, and a failure here never affects any other roll.
pub async fn persist_roll(
    pool: &SqlitePool,
    session: &VoteSession,
    tally: &[ResolvedVote],
) -> Result<PersistedRoll> {
    let mut tx = pool.begin().await?;
    let session_id = upsert_session(&mut tx, session, &TallyCounts::from_tally(tally)).await?;
    upsert_member_votes(&mut tx, session_id, tally).await?;
    tx.commit().await?;

    Ok(PersistedRoll {
        session_id,
        member_rows: tally.len(),
    })
}

/// Insert-or-update a vote session keyed by its natural key. Metadata
/// columns are overwritten on conflict; `is_key_vote` is a curation
/// flag owned elsewhere and is left untouched by re-ingestion.
pub async fn upsert_session(
    tx: &mut Transaction<'_, Sqlite>,
    session: &VoteSession,
    counts: &TallyCounts,
) -> Result<i64> {
    sqlx::query(
        r#"
        INSERT INTO vote_sessions (
            vote_id, chamber, congress, session, roll, vote_date,
            question, description, result, bill_number,
            tally_yea, tally_nay, tally_present, tally_not_voting,
            created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, CURRENT_TIMESTAMP, CURRENT_TIMESTAMP)
        ON CONFLICT(vote_id) DO UPDATE SET
            vote_date = excluded.vote_date,
            question = excluded.question,
            description = excluded.description,
            result = excluded.result,
            bill_number = excluded.bill_number,
            tally_yea = excluded.tally_yea,
            tally_nay = excluded.tally_nay,
            tally_present = excluded.tally_present,
            tally_not_voting = excluded.tally_not_voting,
            updated_at = CURRENT_TIMESTAMP
        "#,
    )
    .bind(session.vote_id())
    .bind(session.chamber.as_str())
    .bind(session.congress)
    .bind(session.session)
    .bind(session.roll)
    .bind(session.date.format("%Y-%m-%dT%H:%M:%S").to_string())
    .bind(&session.question)
    .bind(&session.description)
    .bind(&session.result)
    .bind(&session.bill_number)
    .bind(counts.yea)
    .bind(counts.nay)
    .bind(counts.present)
    .bind(counts.not_voting)
    .execute(&mut **tx)
    .await?;

    let session_id: i64 = sqlx::query_scalar("SELECT id FROM vote_sessions WHERE vote_id = ?")
        .bind(session.vote_id())
        .fetch_one(&mut **tx)
        .await?;

    Ok(session_id)
}

/// Insert-or-update member votes keyed by (session, legislator); on
/// conflict the recorded position is overwritten with the latest value.
pub async fn upsert_member_votes(
    tx: &mut Transaction<'_, Sqlite>,
    session_id: i64,
    tally: &[ResolvedVote],
) -> Result<()> {
    for vote in tally {
        sqlx::query(
            r#"
            INSERT INTO member_votes (
                vote_session_id, legislator_id, vote_cast, created_at, updated_at
            ) VALUES (?, ?, ?, CURRENT_TIMESTAMP, CURRENT_TIMESTAMP)
            ON CONFLICT(vote_session_id, legislator_id) DO UPDATE SET
                vote_cast = excluded.vote_cast,
                updated_at = CURRENT_TIMESTAMP
            "#,
        )
        .bind(session_id)
        .bind(vote.legislator_id)
        .bind(vote.cast.as_str())
        .execute(&mut **tx)
        .await?;
    }

    Ok(())
}
