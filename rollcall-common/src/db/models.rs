//! Database models for vote ingestion

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Legislative chamber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Chamber {
    House,
    Senate,
}

impl Chamber {
    /// Lowercase identifier used in vote ids and the `chamber` column
    pub fn as_str(&self) -> &'static str {
        match self {
            Chamber::House => "house",
            Chamber::Senate => "senate",
        }
    }

    /// Human-readable name for logs
    pub fn display_name(&self) -> &'static str {
        match self {
            Chamber::House => "House",
            Chamber::Senate => "Senate",
        }
    }

    /// Parse a chamber name (case-insensitive)
    pub fn parse(raw: &str) -> Option<Chamber> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "house" => Some(Chamber::House),
            "senate" => Some(Chamber::Senate),
            _ => None,
        }
    }

    /// Upstream document URL for one roll number.
    ///
    /// House documents are addressed by calendar year with a three-digit
    /// roll; Senate documents by congress and session with a five-digit
    /// roll. The padding widths are part of the upstream contract.
    pub fn roll_url(&self, congress: i64, session: i64, roll: i64, house_year: i32) -> String {
        match self {
            Chamber::House => format!(
                "https://clerk.house.gov/evs/{}/roll{:03}.xml",
                house_year, roll
            ),
            Chamber::Senate => format!(
                "https://www.senate.gov/legislative/LIS/roll_call_votes/vote{congress}{session}/vote_{congress}_{session}_{roll:05}.htm",
            ),
        }
    }
}

impl std::fmt::Display for Chamber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Canonical normalized vote position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VoteCast {
    Yea,
    Nay,
    Present,
    NotVoting,
    Absent,
    /// Position was recorded upstream but is not a recognized value.
    /// Persisted as-is, excluded from tally aggregates.
    Unknown,
}

impl VoteCast {
    /// Value stored in the `vote_cast` column
    pub fn as_str(&self) -> &'static str {
        match self {
            VoteCast::Yea => "Yea",
            VoteCast::Nay => "Nay",
            VoteCast::Present => "Present",
            VoteCast::NotVoting => "Not Voting",
            VoteCast::Absent => "Absent",
            VoteCast::Unknown => "Unknown",
        }
    }

    /// Read back a stored `vote_cast` value
    pub fn from_db(raw: &str) -> VoteCast {
        match raw {
            "Yea" => VoteCast::Yea,
            "Nay" => VoteCast::Nay,
            "Present" => VoteCast::Present,
            "Not Voting" => VoteCast::NotVoting,
            "Absent" => VoteCast::Absent,
            _ => VoteCast::Unknown,
        }
    }
}

impl std::fmt::Display for VoteCast {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One recorded roll-call vote (metadata, without its tally rows)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoteSession {
    pub chamber: Chamber,
    pub congress: i64,
    pub session: i64,
    pub roll: i64,
    pub date: NaiveDateTime,
    pub question: String,
    pub description: Option<String>,
    pub result: String,
    pub bill_number: Option<String>,
}

impl VoteSession {
    /// Materialized natural key, e.g. `house-118-1-5`
    pub fn vote_id(&self) -> String {
        format!(
            "{}-{}-{}-{}",
            self.chamber.as_str(),
            self.congress,
            self.session,
            self.roll
        )
    }
}

/// Canonical legislator identity record (read-only to the ingest engine;
/// owned by the roster loader)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Legislator {
    pub id: i64,
    pub bioguide_id: String,
    pub lis_id: Option<String>,
    pub icpsr_id: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub state: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chamber_roundtrip() {
        assert_eq!(Chamber::parse("House"), Some(Chamber::House));
        assert_eq!(Chamber::parse("SENATE"), Some(Chamber::Senate));
        assert_eq!(Chamber::parse("parliament"), None);
        assert_eq!(Chamber::House.as_str(), "house");
    }

    #[test]
    fn test_roll_url_padding() {
        assert_eq!(
            Chamber::House.roll_url(118, 1, 5, 2023),
            "https://clerk.house.gov/evs/2023/roll005.xml"
        );
        assert_eq!(
            Chamber::Senate.roll_url(118, 1, 5, 2023),
            "https://www.senate.gov/legislative/LIS/roll_call_votes/vote1181/vote_118_1_00005.htm"
        );
    }

    #[test]
    fn test_vote_id_format() {
        let session = VoteSession {
            chamber: Chamber::House,
            congress: 118,
            session: 1,
            roll: 5,
            date: chrono::NaiveDate::from_ymd_opt(2023, 1, 5)
                .unwrap()
                .and_time(chrono::NaiveTime::MIN),
            question: "On Passage".to_string(),
            description: None,
            result: "Passed".to_string(),
            bill_number: None,
        };
        assert_eq!(session.vote_id(), "house-118-1-5");
    }

    #[test]
    fn test_vote_cast_storage_roundtrip() {
        for cast in [
            VoteCast::Yea,
            VoteCast::Nay,
            VoteCast::Present,
            VoteCast::NotVoting,
            VoteCast::Absent,
            VoteCast::Unknown,
        ] {
            assert_eq!(VoteCast::from_db(cast.as_str()), cast);
        }
        assert_eq!(VoteCast::from_db("Maybe"), VoteCast::Unknown);
    }
}
