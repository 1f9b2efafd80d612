//! Chamber document parsers
//!
//! One parser per chamber, sharing the tolerant markup helpers and a
//! common outcome type. A parser never errors: a document that is not a
//! usable vote comes back as `NotAVote` naming what was missing, so the
//! driver can log it and count a discovery miss.

pub mod house;
pub mod markup;
pub mod senate;

use rollcall_common::db::models::{Chamber, VoteSession};

/// Outcome of parsing one fetched document
#[derive(Debug)]
pub enum ParseOutcome {
    /// A usable roll-call vote: session metadata plus its tally entries
    Found {
        session: VoteSession,
        tally: Vec<TallyEntry>,
    },
    /// The document exists but is not a vote (empty body, placeholder
    /// page, or a required field is missing)
    NotAVote { reason: String },
}

impl ParseOutcome {
    pub(crate) fn missing(field: &str) -> Self {
        ParseOutcome::NotAVote {
            reason: format!("missing required field: {field}"),
        }
    }
}

/// Raw member identification as extracted by a parser, before identity
/// resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawMemberRef {
    /// Canonical id embedded directly in the source document
    Bioguide(String),
    /// Senate LIS member id (alternate scheme)
    Lis(String),
    /// Display name, with the state partition key when the source
    /// carries one
    DisplayName { name: String, state: Option<String> },
}

impl std::fmt::Display for RawMemberRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RawMemberRef::Bioguide(id) => write!(f, "bioguide:{id}"),
            RawMemberRef::Lis(id) => write!(f, "lis:{id}"),
            RawMemberRef::DisplayName { name, state: Some(state) } => {
                write!(f, "name:{name} ({state})")
            }
            RawMemberRef::DisplayName { name, state: None } => write!(f, "name:{name}"),
        }
    }
}

/// One member's raw position within a parsed document
#[derive(Debug, Clone)]
pub struct TallyEntry {
    pub member: RawMemberRef,
    pub position: String,
}

/// Dispatch raw bytes to the chamber-appropriate parser
pub fn parse_roll(
    chamber: Chamber,
    congress: i64,
    session: i64,
    roll: i64,
    body: &[u8],
) -> ParseOutcome {
    match chamber {
        Chamber::House => house::parse(congress, session, roll, body),
        Chamber::Senate => senate::parse(congress, session, roll, body),
    }
}
