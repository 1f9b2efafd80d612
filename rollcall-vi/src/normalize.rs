//! Vote position normalization
//!
//! Pure, total mapping from the raw position strings the sources record
//! to the canonical `VoteCast` enumeration. Unrecognized input maps to
//! `Unknown`; this function never fails.

use rollcall_common::db::models::VoteCast;

/// Normalize a raw position string.
///
/// Case-insensitive and tolerant of whitespace and punctuation noise
/// (`"Not Voting"`, `"not-voting"` and `"NV"` all normalize the same).
pub fn normalize(raw: &str) -> VoteCast {
    let compact: String = raw
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect();

    match compact.as_str() {
        "yea" | "yes" | "y" | "aye" => VoteCast::Yea,
        "nay" | "no" | "n" => VoteCast::Nay,
        "present" | "p" => VoteCast::Present,
        "notvoting" | "nv" | "notvote" => VoteCast::NotVoting,
        "absent" | "a" => VoteCast::Absent,
        _ => VoteCast::Unknown,
    }
}
