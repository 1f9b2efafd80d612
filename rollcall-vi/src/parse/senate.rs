//! Senate roll-call parser
//!
//! The Senate source has drifted over time: older documents are
//! structured XML, current ones are an unstructured HTML page whose
//! field layout itself has varied between `Label: value` on one line
//! and `Label:` followed by the value on the next non-blank line. The
//! parser accepts raw bytes and sniffs which form it was handed.

use super::markup::{self, TagBlock};
use super::{ParseOutcome, RawMemberRef, TallyEntry};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rollcall_common::db::models::{Chamber, VoteSession};
use tracing::warn;

/// Pinned date format of the current pages, e.g. `July 19, 2023, 05:04 PM`.
/// Historical pages put a double space before the time; interior
/// whitespace is collapsed before parsing so both variants are accepted.
const DATE_TIME_FORMAT: &str = "%B %d, %Y, %I:%M %p";
const DATE_ONLY_FORMAT: &str = "%B %d, %Y";

/// Stable class name carried by the tally table on current pages
const TALLY_TABLE_CLASS: &str = "contenttext";

/// Vote-position vocabulary used to recognize a tally header row
const POSITION_VOCAB: &[&str] = &["yea", "nay", "not voting"];

pub fn parse(congress: i64, session: i64, roll: i64, body: &[u8]) -> ParseOutcome {
    let text = String::from_utf8_lossy(body);
    let trimmed = text.trim_start();
    if trimmed.is_empty() {
        return ParseOutcome::NotAVote {
            reason: "empty body".to_string(),
        };
    }

    if trimmed.starts_with("<?xml") {
        parse_structured(congress, session, roll, &text)
    } else {
        parse_flat(congress, session, roll, &text)
    }
}

/// Older structured XML form (`<roll_call_vote>`)
fn parse_structured(congress: i64, session: i64, roll: i64, text: &str) -> ParseOutcome {
    let Some(date_raw) = markup::inner_text(text, "vote_date") else {
        return ParseOutcome::missing("vote_date");
    };
    let Some(date) = parse_date(&date_raw) else {
        return ParseOutcome::NotAVote {
            reason: format!("unparseable vote_date: {date_raw}"),
        };
    };

    let Some(question) = markup::inner_text(text, "vote_question_text")
        .or_else(|| markup::inner_text(text, "question"))
        .filter(|s| !s.is_empty())
    else {
        return ParseOutcome::missing("question");
    };
    let Some(result) = markup::inner_text(text, "vote_result").filter(|s| !s.is_empty()) else {
        return ParseOutcome::missing("vote_result");
    };
    let description = markup::inner_text(text, "vote_title").filter(|s| !s.is_empty());
    let bill_number = markup::inner_text(text, "document_name").filter(|s| !s.is_empty());

    let mut tally = Vec::new();
    for member in markup::blocks(text, "member") {
        let position = match markup::inner_text(member.inner, "vote_cast") {
            Some(p) if !p.is_empty() => p,
            _ => continue,
        };
        let state = markup::inner_text(member.inner, "state").filter(|s| !s.is_empty());
        let member_ref = match markup::inner_text(member.inner, "lis_member_id")
            .filter(|s| !s.is_empty())
        {
            Some(lis) => RawMemberRef::Lis(lis),
            None => {
                let raw_name = markup::inner_text(member.inner, "member_full").unwrap_or_default();
                let (name, name_state) = parse_display_name(&raw_name);
                if name.is_empty() {
                    continue;
                }
                RawMemberRef::DisplayName {
                    name,
                    state: state.or(name_state),
                }
            }
        };
        tally.push(TallyEntry {
            member: member_ref,
            position,
        });
    }

    ParseOutcome::Found {
        session: VoteSession {
            chamber: Chamber::Senate,
            congress,
            session,
            roll,
            date,
            question,
            description,
            result,
            bill_number,
        },
        tally,
    }
}

/// Current unstructured HTML form
fn parse_flat(congress: i64, session: i64, roll: i64, text: &str) -> ParseOutcome {
    let lines = flatten_lines(text);
    let fields = extract_fields(&lines);

    let Some(date_raw) = fields.date else {
        return ParseOutcome::missing("Vote Date");
    };
    let Some(date) = parse_date(&date_raw) else {
        return ParseOutcome::NotAVote {
            reason: format!("unparseable vote date: {date_raw}"),
        };
    };
    let Some(question) = fields.question else {
        return ParseOutcome::missing("Question");
    };
    let Some(result) = fields.result else {
        return ParseOutcome::missing("Vote Result");
    };

    let tally = match locate_tally_table(text) {
        Some(table) => extract_tally(&table),
        None => Vec::new(),
    };

    ParseOutcome::Found {
        session: VoteSession {
            chamber: Chamber::Senate,
            congress,
            session,
            roll,
            date,
            question,
            description: fields.description,
            result,
            bill_number: fields.measure,
        },
        tally,
    }
}

/// Parse a Senate date string, collapsing interior whitespace first.
/// Accepts the pinned datetime form and a date-only fallback.
fn parse_date(raw: &str) -> Option<NaiveDateTime> {
    let collapsed = markup::collapse_ws(raw);
    NaiveDateTime::parse_from_str(&collapsed, DATE_TIME_FORMAT)
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(&collapsed, DATE_ONLY_FORMAT)
                .ok()
                .map(|d| d.and_time(NaiveTime::MIN))
        })
}

#[derive(Debug, Default)]
struct FlatFields {
    date: Option<String>,
    question: Option<String>,
    result: Option<String>,
    measure: Option<String>,
    description: Option<String>,
}

/// Text lines of the document: `<br>` breaks and literal newlines both
/// separate lines; tags are stripped per line and blank lines dropped.
fn flatten_lines(text: &str) -> Vec<String> {
    let mut with_breaks = String::with_capacity(text.len());
    let mut pos = 0;
    while let Some(i) = markup::find_ci(text, "<br", pos) {
        with_breaks.push_str(&text[pos..i]);
        with_breaks.push('\n');
        pos = match text[i..].find('>') {
            Some(gt) => i + gt + 1,
            None => text.len(),
        };
    }
    with_breaks.push_str(&text[pos..]);

    with_breaks
        .lines()
        .map(markup::strip_tags)
        .filter(|line| !line.is_empty())
        .collect()
}

/// Scan lines against the fixed label table. Both historical layouts
/// are accepted: `Label: value` on one line, or `Label:` alone with the
/// value on the next non-blank line. First occurrence of a label wins.
fn extract_fields(lines: &[String]) -> FlatFields {
    enum Slot {
        Date,
        Question,
        Result,
        Measure,
        Description,
    }
    const LABELS: &[(&str, Slot)] = &[
        ("Vote Date:", Slot::Date),
        ("Question:", Slot::Question),
        ("Vote Result:", Slot::Result),
        ("Result:", Slot::Result),
        ("Measure Number:", Slot::Measure),
        ("Statement of Purpose:", Slot::Description),
        ("Vote Title:", Slot::Description),
    ];

    let mut fields = FlatFields::default();
    for (i, line) in lines.iter().enumerate() {
        for (label, slot) in LABELS {
            if !starts_with_ci(line, label) {
                continue;
            }
            let mut value = line[label.len()..].trim().to_string();
            if value.is_empty() {
                if let Some(next) = lines.get(i + 1) {
                    value = next.trim().to_string();
                }
            }
            if value.is_empty() {
                continue;
            }
            let target = match slot {
                Slot::Date => &mut fields.date,
                Slot::Question => &mut fields.question,
                Slot::Result => &mut fields.result,
                Slot::Measure => &mut fields.measure,
                Slot::Description => &mut fields.description,
            };
            if target.is_none() {
                *target = Some(value);
            }
            break;
        }
    }
    fields
}

fn starts_with_ci(line: &str, prefix: &str) -> bool {
    line.len() >= prefix.len() && line[..prefix.len()].eq_ignore_ascii_case(prefix)
}

/// Locate the member tally table:
/// (a) the known stable class name, else
/// (b) the first table whose header row carries vote-position
///     vocabulary, else
/// (c) the largest table on the page by row count — fragile on pages
///     with unrelated large tables, so it logs when used.
fn locate_tally_table<'a>(text: &'a str) -> Option<TagBlock<'a>> {
    let tables = markup::blocks(text, "table");
    if tables.is_empty() {
        return None;
    }

    if let Some(table) = tables.iter().find(|t| {
        markup::attr(t.open, "class")
            .map(|c| c.to_ascii_lowercase().contains(TALLY_TABLE_CLASS))
            .unwrap_or(false)
    }) {
        return Some(table.clone());
    }

    for table in &tables {
        if let Some(header) = markup::blocks(table.inner, "tr").first() {
            let header_text = markup::strip_tags(header.inner).to_ascii_lowercase();
            if POSITION_VOCAB.iter().any(|v| header_text.contains(v)) {
                return Some(table.clone());
            }
        }
    }

    warn!("No recognizable tally table; falling back to largest table on page");
    tables
        .into_iter()
        .max_by_key(|t| markup::blocks(t.inner, "tr").len())
}

/// Extract member rows: first cell is the display name, last cell the
/// raw position. Header rows (`<th>` cells, or a row listing several
/// position words at once) are skipped.
fn extract_tally(table: &TagBlock<'_>) -> Vec<TallyEntry> {
    let mut entries = Vec::new();
    for row in markup::blocks(table.inner, "tr") {
        let row_text = markup::strip_tags(row.inner).to_ascii_lowercase();
        let vocab_hits = POSITION_VOCAB
            .iter()
            .filter(|v| row_text.contains(*v))
            .count();
        if vocab_hits >= 2 {
            continue;
        }

        let cells: Vec<String> = markup::blocks(row.inner, "td")
            .iter()
            .map(|c| markup::strip_tags(c.inner))
            .collect();
        if cells.len() < 2 {
            continue;
        }

        let (name, state) = parse_display_name(&cells[0]);
        let position = cells[cells.len() - 1].clone();
        if name.is_empty() || position.is_empty() {
            continue;
        }

        entries.push(TallyEntry {
            member: RawMemberRef::DisplayName { name, state },
            position,
        });
    }
    entries
}

/// Normalize a Senate display name.
///
/// `"Whitehouse, Sheldon (D-RI)"` → (`"Sheldon Whitehouse"`, `Some("RI")`):
/// the parenthesized party-state annotation is mined for the state
/// partition key, and `"Last, First"` is swapped to `"First Last"`.
fn parse_display_name(raw: &str) -> (String, Option<String>) {
    let mut name = raw.trim().to_string();
    let mut state = None;

    if let (Some(open), Some(close)) = (name.rfind('('), name.rfind(')')) {
        if open < close {
            let annotation = &name[open + 1..close];
            if let Some(dash) = annotation.rfind('-') {
                let st = annotation[dash + 1..].trim();
                if st.len() == 2 && st.chars().all(|c| c.is_ascii_alphabetic()) {
                    state = Some(st.to_ascii_uppercase());
                }
            }
            name.replace_range(open..=close, "");
        }
    }

    let name = name.trim().trim_end_matches(',').trim();
    let name = match name.split_once(',') {
        Some((last, first)) => format!("{} {}", first.trim(), last.trim()),
        None => name.to_string(),
    };

    (markup::collapse_ws(&name), state)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FLAT_PAGE: &str = r#"<html>
<head><title>U.S. Senate: Roll Call Vote</title></head>
<body>
<div>
Question: On the Nomination<br>
Vote Date:<br>
July 19, 2023, 05:04 PM<br>
Vote Result: Confirmed<br>
Measure Number: PN123<br>
Statement of Purpose: A nomination in the Department of State.<br>
</div>
<table class="contenttext">
<tr><td>Whitehouse, Sheldon (D-RI)</td><td>Yea</td></tr>
<tr><td>Lankford, James (R-OK)</td><td>Nay</td></tr>
<tr><td>Fetterman, John (D-PA)</td><td>Not Voting</td></tr>
</table>
</body>
</html>"#;

    #[test]
    fn test_flat_page_with_split_line_date() {
        let ParseOutcome::Found { session, tally } = parse(118, 1, 178, FLAT_PAGE.as_bytes())
        else {
            panic!("expected Found");
        };

        assert_eq!(session.vote_id(), "senate-118-1-178");
        assert_eq!(
            session.date,
            NaiveDate::from_ymd_opt(2023, 7, 19)
                .unwrap()
                .and_hms_opt(17, 4, 0)
                .unwrap()
        );
        assert_eq!(session.question, "On the Nomination");
        assert_eq!(session.result, "Confirmed");
        assert_eq!(session.bill_number.as_deref(), Some("PN123"));
        assert_eq!(
            session.description.as_deref(),
            Some("A nomination in the Department of State.")
        );

        assert_eq!(tally.len(), 3);
        assert_eq!(
            tally[0].member,
            RawMemberRef::DisplayName {
                name: "Sheldon Whitehouse".to_string(),
                state: Some("RI".to_string()),
            }
        );
        assert_eq!(tally[0].position, "Yea");
        assert_eq!(tally[2].position, "Not Voting");
    }

    #[test]
    fn test_same_line_date_form() {
        let page = FLAT_PAGE.replace(
            "Vote Date:<br>\nJuly 19, 2023, 05:04 PM<br>",
            "Vote Date: July 19, 2023, 05:04 PM<br>",
        );
        let ParseOutcome::Found { session, .. } = parse(118, 1, 178, page.as_bytes()) else {
            panic!("expected Found");
        };
        assert_eq!(session.date.format("%Y-%m-%dT%H:%M:%S").to_string(), "2023-07-19T17:04:00");
    }

    #[test]
    fn test_historical_double_space_before_time() {
        let page = FLAT_PAGE.replace("July 19, 2023, 05:04 PM", "July 19, 2023,  05:04 PM");
        let ParseOutcome::Found { session, .. } = parse(118, 1, 178, page.as_bytes()) else {
            panic!("expected Found");
        };
        assert_eq!(session.date.format("%H:%M").to_string(), "17:04");
    }

    #[test]
    fn test_missing_result_is_not_a_vote() {
        let page = FLAT_PAGE.replace("Vote Result: Confirmed<br>", "");
        let ParseOutcome::NotAVote { reason } = parse(118, 1, 178, page.as_bytes()) else {
            panic!("expected NotAVote");
        };
        assert!(reason.contains("Vote Result"), "{reason}");
    }

    #[test]
    fn test_empty_body_is_not_a_vote() {
        assert!(matches!(
            parse(118, 1, 1, b""),
            ParseOutcome::NotAVote { .. }
        ));
    }

    #[test]
    fn test_table_located_by_header_vocabulary() {
        let page = FLAT_PAGE
            .replace("<table class=\"contenttext\">", "<table><tr><td>Senator</td><td>Yea or Nay</td></tr>")
            ;
        let ParseOutcome::Found { tally, .. } = parse(118, 1, 178, page.as_bytes()) else {
            panic!("expected Found");
        };
        // Header row is skipped, member rows survive
        assert_eq!(tally.len(), 3);
        assert_eq!(tally[1].position, "Nay");
    }

    #[test]
    fn test_largest_table_fallback() {
        // Impeachment-style positions carry none of the usual
        // vocabulary, so neither the class nor the header heuristic
        // applies and the largest table wins.
        let page = r#"<html><body>
Question: On the Articles of Impeachment<br>
Vote Date: July 19, 2023, 05:04 PM<br>
Vote Result: Not Guilty<br>
<table><tr><td>nav</td><td>links</td></tr></table>
<table>
<tr><td>Whitehouse, Sheldon (D-RI)</td><td>Guilty</td></tr>
<tr><td>Lankford, James (R-OK)</td><td>Not Guilty</td></tr>
<tr><td>Murkowski, Lisa (R-AK)</td><td>Guilty</td></tr>
</table>
</body></html>"#;
        let ParseOutcome::Found { tally, .. } = parse(118, 1, 200, page.as_bytes()) else {
            panic!("expected Found");
        };
        assert_eq!(tally.len(), 3);
        assert_eq!(tally[1].position, "Not Guilty");
    }

    #[test]
    fn test_structured_xml_variant() {
        let doc = r#"<?xml version="1.0" encoding="UTF-8"?>
<roll_call_vote>
  <congress>118</congress>
  <session>1</session>
  <vote_date>July 19, 2023, 05:04 PM</vote_date>
  <vote_question_text>On the Nomination</vote_question_text>
  <vote_result>Confirmed</vote_result>
  <document><document_name>PN123</document_name></document>
  <members>
    <member>
      <member_full>Whitehouse (D-RI)</member_full>
      <lis_member_id>S316</lis_member_id>
      <state>RI</state>
      <vote_cast>Yea</vote_cast>
    </member>
    <member>
      <member_full>Lankford (R-OK)</member_full>
      <lis_member_id>S373</lis_member_id>
      <state>OK</state>
      <vote_cast>Nay</vote_cast>
    </member>
  </members>
</roll_call_vote>"#;

        let ParseOutcome::Found { session, tally } = parse(118, 1, 178, doc.as_bytes()) else {
            panic!("expected Found");
        };
        assert_eq!(session.question, "On the Nomination");
        assert_eq!(session.bill_number.as_deref(), Some("PN123"));
        assert_eq!(tally.len(), 2);
        assert_eq!(tally[0].member, RawMemberRef::Lis("S316".to_string()));
    }

    #[test]
    fn test_display_name_normalization() {
        assert_eq!(
            parse_display_name("Whitehouse, Sheldon (D-RI)"),
            ("Sheldon Whitehouse".to_string(), Some("RI".to_string()))
        );
        assert_eq!(
            parse_display_name("Whitehouse (D-RI)"),
            ("Whitehouse".to_string(), Some("RI".to_string()))
        );
        assert_eq!(
            parse_display_name("  Smith,  John  "),
            ("John Smith".to_string(), None)
        );
        assert_eq!(parse_display_name(""), (String::new(), None));
    }
}
