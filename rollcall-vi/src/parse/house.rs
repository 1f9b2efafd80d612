//! House roll-call parser
//!
//! The Clerk serves one structured XML document per roll. Required
//! fields sit at fixed element paths, and each `recorded-vote` row
//! embeds the member's canonical id as an attribute on the
//! `legislator` element, so only the position string needs
//! normalization downstream.

use super::markup;
use super::{ParseOutcome, RawMemberRef, TallyEntry};
use chrono::{NaiveDate, NaiveTime};
use rollcall_common::db::models::{Chamber, VoteSession};

/// Pinned Clerk date format, e.g. `05-Jan-2023`
const DATE_FORMAT: &str = "%d-%b-%Y";

pub fn parse(congress: i64, session: i64, roll: i64, body: &[u8]) -> ParseOutcome {
    let text = String::from_utf8_lossy(body);
    let trimmed = text.trim_start();
    if trimmed.is_empty() {
        return ParseOutcome::NotAVote {
            reason: "empty body".to_string(),
        };
    }
    if !trimmed.starts_with("<?xml") {
        return ParseOutcome::NotAVote {
            reason: "not an XML document".to_string(),
        };
    }

    let Some(date_raw) = markup::inner_text(&text, "action-date") else {
        return ParseOutcome::missing("action-date");
    };
    let Ok(date) = NaiveDate::parse_from_str(date_raw.trim(), DATE_FORMAT) else {
        return ParseOutcome::NotAVote {
            reason: format!("unparseable action-date: {date_raw}"),
        };
    };

    let Some(question) = markup::inner_text(&text, "question-text").filter(|s| !s.is_empty())
    else {
        return ParseOutcome::missing("question-text");
    };
    let Some(result) = markup::inner_text(&text, "vote-result").filter(|s| !s.is_empty()) else {
        return ParseOutcome::missing("vote-result");
    };
    let description = markup::inner_text(&text, "vote-desc").filter(|s| !s.is_empty());
    let bill_number = markup::inner_text(&text, "legis-num").filter(|s| !s.is_empty());

    let mut tally = Vec::new();
    for record in markup::blocks(&text, "recorded-vote") {
        let Some(legislator) = markup::blocks(record.inner, "legislator").into_iter().next()
        else {
            continue;
        };
        let position = match markup::inner_text(record.inner, "vote") {
            Some(p) if !p.is_empty() => p,
            _ => continue,
        };

        // `name-id` on current documents, `bioGuideId` on older ones.
        // A row with neither falls back to name resolution.
        let member = markup::attr(legislator.open, "name-id")
            .or_else(|| markup::attr(legislator.open, "bioGuideId"))
            .filter(|id| !id.is_empty())
            .map(RawMemberRef::Bioguide)
            .unwrap_or_else(|| RawMemberRef::DisplayName {
                name: markup::strip_tags(legislator.inner),
                state: markup::attr(legislator.open, "state"),
            });
        if let RawMemberRef::DisplayName { name, .. } = &member {
            if name.is_empty() {
                continue;
            }
        }

        tally.push(TallyEntry { member, position });
    }

    ParseOutcome::Found {
        session: VoteSession {
            chamber: Chamber::House,
            congress,
            session,
            roll,
            date: date.and_time(NaiveTime::MIN),
            question,
            description,
            result,
            bill_number,
        },
        tally,
    }
}
