//! Identity resolution
//!
//! Maps raw member references from the parsers to canonical legislator
//! ids using lookup structures built once per run from the read-only
//! legislator directory. Strategy order, first match wins: direct
//! canonical id, alternate-id cross-reference, normalized-name
//! variants, then a bounded fuzzy match restricted to the member's
//! state. An unresolved entry is reported, never fatal.

use crate::parse::RawMemberRef;
use rollcall_common::db::models::Legislator;
use rollcall_common::Result;
use sqlx::SqlitePool;
use std::collections::HashMap;
use tracing::debug;

/// Jaro-Winkler floor for the fuzzy fallback
const FUZZY_THRESHOLD: f64 = 0.93;

/// Generational suffixes stripped during name normalization
const NAME_SUFFIXES: &[&str] = &["jr", "sr", "ii", "iii", "iv"];

/// Outcome of resolving one raw member reference
#[derive(Debug, Clone)]
pub enum Resolution {
    Resolved(i64),
    Unresolved { reference: String, detail: String },
}

/// Result of a `MatchTable` lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchResult {
    Hit(i64),
    /// The key maps to more than one directory entry
    Ambiguous(String),
    Miss,
}

enum MatchSlot {
    Unique(i64),
    Ambiguous,
}

/// Exact → variant → bounded-fuzzy lookup table.
///
/// The same cascade recurs wherever external records are matched back
/// to directory entries; callers build one of these and feed it their
/// variant list instead of reimplementing the strategy order per call
/// site. Fuzzy matching only runs inside one partition (here: state),
/// and only accepts a unique best candidate.
pub struct MatchTable {
    exact: HashMap<String, MatchSlot>,
    partitions: HashMap<String, Vec<(String, i64)>>,
    fuzzy_threshold: f64,
}

impl MatchTable {
    pub fn new(fuzzy_threshold: f64) -> Self {
        Self {
            exact: HashMap::new(),
            partitions: HashMap::new(),
            fuzzy_threshold,
        }
    }

    pub fn insert(&mut self, key: &str, partition: Option<&str>, id: i64) {
        if key.is_empty() {
            return;
        }
        self.exact
            .entry(key.to_string())
            .and_modify(|slot| {
                if !matches!(slot, MatchSlot::Unique(existing) if *existing == id) {
                    *slot = MatchSlot::Ambiguous;
                }
            })
            .or_insert(MatchSlot::Unique(id));

        if let Some(partition) = partition {
            let entries = self.partitions.entry(partition.to_string()).or_default();
            if !entries.iter().any(|(k, i)| k == key && *i == id) {
                entries.push((key.to_string(), id));
            }
        }
    }

    /// Try the variant keys exactly, in order, then fall back to a
    /// bounded fuzzy match of the primary variant within `partition`.
    pub fn lookup(&self, variants: &[String], partition: Option<&str>) -> MatchResult {
        for variant in variants {
            match self.exact.get(variant) {
                Some(MatchSlot::Unique(id)) => return MatchResult::Hit(*id),
                Some(MatchSlot::Ambiguous) => return MatchResult::Ambiguous(variant.clone()),
                None => {}
            }
        }

        let (Some(target), Some(candidates)) = (
            variants.first(),
            partition.and_then(|p| self.partitions.get(p)),
        ) else {
            return MatchResult::Miss;
        };

        let mut best_by_id: HashMap<i64, f64> = HashMap::new();
        for (candidate, id) in candidates {
            let score = strsim::jaro_winkler(target, candidate);
            if score < self.fuzzy_threshold {
                continue;
            }
            let entry = best_by_id.entry(*id).or_insert(0.0);
            if score > *entry {
                *entry = score;
            }
        }

        let Some((best_id, best_score)) = best_by_id
            .iter()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(id, score)| (*id, *score))
        else {
            return MatchResult::Miss;
        };

        let contested = best_by_id
            .iter()
            .any(|(id, score)| *id != best_id && (best_score - score).abs() < 1e-9);
        if contested {
            MatchResult::Ambiguous(target.clone())
        } else {
            MatchResult::Hit(best_id)
        }
    }
}

/// In-memory identity directory, built once per run
pub struct IdentityIndex {
    by_bioguide: HashMap<String, i64>,
    by_alternate: HashMap<String, i64>,
    names: MatchTable,
    members: usize,
}

impl IdentityIndex {
    /// Load the directory from the store
    pub async fn load(pool: &SqlitePool) -> Result<Self> {
        let rows = sqlx::query_as::<
            _,
            (
                i64,
                String,
                Option<String>,
                Option<String>,
                String,
                String,
                String,
                Option<String>,
            ),
        >(
            "SELECT id, bioguide_id, lis_id, icpsr_id, first_name, last_name, full_name, state
             FROM legislators",
        )
        .fetch_all(pool)
        .await?;

        let legislators = rows
            .into_iter()
            .map(
                |(id, bioguide_id, lis_id, icpsr_id, first_name, last_name, full_name, state)| {
                    Legislator {
                        id,
                        bioguide_id,
                        lis_id,
                        icpsr_id,
                        first_name,
                        last_name,
                        full_name,
                        state,
                    }
                },
            )
            .collect();

        Ok(Self::from_directory(legislators))
    }

    /// Build the lookup structures from directory records
    pub fn from_directory(legislators: Vec<Legislator>) -> Self {
        let mut by_bioguide = HashMap::new();
        let mut by_alternate = HashMap::new();
        let mut names = MatchTable::new(FUZZY_THRESHOLD);
        let members = legislators.len();

        for leg in &legislators {
            by_bioguide.insert(leg.bioguide_id.trim().to_ascii_uppercase(), leg.id);
            if let Some(lis) = leg.lis_id.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
                by_alternate.insert(lis.to_ascii_uppercase(), leg.id);
            }
            if let Some(icpsr) = leg.icpsr_id.as_deref().map(str::trim).filter(|s| !s.is_empty())
            {
                by_alternate.insert(icpsr.to_ascii_uppercase(), leg.id);
            }

            let state = leg.state.as_deref().map(|s| s.trim().to_ascii_uppercase());
            let state = state.as_deref().filter(|s| !s.is_empty());

            let full = normalize_name(&leg.full_name);
            let first_last = normalize_name(&format!("{} {}", leg.first_name, leg.last_name));
            for key in [
                full.clone(),
                strip_name_suffix(&full),
                first_last.clone(),
                strip_name_suffix(&first_last),
            ] {
                names.insert(&key, state, leg.id);
            }
            // Bare surname keys support sources that print only the
            // last name; collisions degrade to Ambiguous, never to a
            // wrong id.
            names.insert(&normalize_name(&leg.last_name), state, leg.id);
        }

        debug!(members, "Identity directory indexed");

        Self {
            by_bioguide,
            by_alternate,
            names,
            members,
        }
    }

    pub fn len(&self) -> usize {
        self.members
    }

    pub fn is_empty(&self) -> bool {
        self.members == 0
    }

    /// Resolve one raw member reference, first match wins
    pub fn resolve(&self, member: &RawMemberRef) -> Resolution {
        match member {
            RawMemberRef::Bioguide(id) => {
                match self.by_bioguide.get(&id.trim().to_ascii_uppercase()) {
                    Some(found) => Resolution::Resolved(*found),
                    None => Resolution::Unresolved {
                        reference: member.to_string(),
                        detail: "bioguide id not in directory".to_string(),
                    },
                }
            }
            RawMemberRef::Lis(id) => {
                match self.by_alternate.get(&id.trim().to_ascii_uppercase()) {
                    Some(found) => Resolution::Resolved(*found),
                    None => Resolution::Unresolved {
                        reference: member.to_string(),
                        detail: "alternate id not in cross-reference".to_string(),
                    },
                }
            }
            RawMemberRef::DisplayName { name, state } => {
                let variants = name_variants(name);
                if variants.is_empty() {
                    return Resolution::Unresolved {
                        reference: member.to_string(),
                        detail: "empty name".to_string(),
                    };
                }
                match self.names.lookup(&variants, state.as_deref()) {
                    MatchResult::Hit(id) => Resolution::Resolved(id),
                    MatchResult::Ambiguous(key) => Resolution::Unresolved {
                        reference: member.to_string(),
                        detail: format!("name '{key}' matches more than one member"),
                    },
                    MatchResult::Miss => Resolution::Unresolved {
                        reference: member.to_string(),
                        detail: "no name match".to_string(),
                    },
                }
            }
        }
    }
}

/// Lowercase, strip punctuation, collapse whitespace
pub fn normalize_name(raw: &str) -> String {
    let mapped: String = raw
        .chars()
        .map(|c| {
            if c.is_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                ' '
            }
        })
        .collect();
    mapped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Drop a trailing generational suffix (`jr`, `sr`, `ii`, `iii`, `iv`)
/// from an already-normalized name
fn strip_name_suffix(normalized: &str) -> String {
    let tokens: Vec<&str> = normalized.split_whitespace().collect();
    match tokens.split_last() {
        Some((last, rest)) if rest.len() >= 1 && NAME_SUFFIXES.contains(last) => rest.join(" "),
        _ => normalized.to_string(),
    }
}

/// Documented variant set tried against the name table, most specific
/// first: as-written, suffix-stripped, and (for `Last, First` input)
/// the swapped form.
pub fn name_variants(raw: &str) -> Vec<String> {
    let mut variants = Vec::new();
    let mut push = |candidate: String| {
        if !candidate.is_empty() && !variants.contains(&candidate) {
            variants.push(candidate);
        }
    };

    let base = normalize_name(raw);
    push(base.clone());
    push(strip_name_suffix(&base));

    if let Some((last, first)) = raw.split_once(',') {
        let swapped = normalize_name(&format!("{} {}", first.trim(), last.trim()));
        push(swapped.clone());
        push(strip_name_suffix(&swapped));
    }

    variants
}

#[cfg(test)]
mod tests {
    use super::*;

    fn legislator(
        id: i64,
        bioguide: &str,
        lis: Option<&str>,
        first: &str,
        last: &str,
        state: &str,
    ) -> Legislator {
        Legislator {
            id,
            bioguide_id: bioguide.to_string(),
            lis_id: lis.map(String::from),
            icpsr_id: None,
            first_name: first.to_string(),
            last_name: last.to_string(),
            full_name: format!("{first} {last}"),
            state: Some(state.to_string()),
        }
    }

    fn index() -> IdentityIndex {
        IdentityIndex::from_directory(vec![
            legislator(1, "W000802", Some("S316"), "Sheldon", "Whitehouse", "RI"),
            legislator(2, "L000575", Some("S373"), "James", "Lankford", "OK"),
            legislator(3, "B001261", None, "John", "Barrasso", "WY"),
        ])
    }

    #[test]
    fn test_direct_bioguide_lookup() {
        let idx = index();
        assert!(matches!(
            idx.resolve(&RawMemberRef::Bioguide("W000802".to_string())),
            Resolution::Resolved(1)
        ));
        // Case and whitespace tolerant
        assert!(matches!(
            idx.resolve(&RawMemberRef::Bioguide(" w000802 ".to_string())),
            Resolution::Resolved(1)
        ));
    }

    #[test]
    fn test_alternate_id_lookup() {
        let idx = index();
        assert!(matches!(
            idx.resolve(&RawMemberRef::Lis("S373".to_string())),
            Resolution::Resolved(2)
        ));
        assert!(matches!(
            idx.resolve(&RawMemberRef::Lis("S999".to_string())),
            Resolution::Unresolved { .. }
        ));
    }

    #[test]
    fn test_direct_id_never_falls_through_to_name() {
        let idx = index();
        // A bioguide reference that is absent stays unresolved even
        // though a name lookup might have succeeded for the member.
        let resolution = idx.resolve(&RawMemberRef::Bioguide("X000000".to_string()));
        let Resolution::Unresolved { detail, .. } = resolution else {
            panic!("expected Unresolved");
        };
        assert!(detail.contains("bioguide"));
    }

    #[test]
    fn test_name_with_suffix_and_punctuation() {
        let idx = IdentityIndex::from_directory(vec![legislator(
            7,
            "C001056",
            None,
            "John",
            "Cornyn",
            "TX",
        )]);
        assert!(matches!(
            idx.resolve(&RawMemberRef::DisplayName {
                name: "John Cornyn, III".to_string(),
                state: Some("TX".to_string()),
            }),
            Resolution::Resolved(7)
        ));
    }

    #[test]
    fn test_last_first_swap() {
        let idx = index();
        assert!(matches!(
            idx.resolve(&RawMemberRef::DisplayName {
                name: "Whitehouse, Sheldon".to_string(),
                state: None,
            }),
            Resolution::Resolved(1)
        ));
    }

    #[test]
    fn test_bare_surname() {
        let idx = index();
        assert!(matches!(
            idx.resolve(&RawMemberRef::DisplayName {
                name: "Lankford".to_string(),
                state: Some("OK".to_string()),
            }),
            Resolution::Resolved(2)
        ));
    }

    #[test]
    fn test_fuzzy_match_bounded_by_state() {
        let idx = index();
        // Typo'd surname resolves within the right state partition
        assert!(matches!(
            idx.resolve(&RawMemberRef::DisplayName {
                name: "Sheldon Whitehous".to_string(),
                state: Some("RI".to_string()),
            }),
            Resolution::Resolved(1)
        ));
        // Without a state partition the fuzzy fallback never runs
        assert!(matches!(
            idx.resolve(&RawMemberRef::DisplayName {
                name: "Sheldon Whitehous".to_string(),
                state: None,
            }),
            Resolution::Unresolved { .. }
        ));
    }

    #[test]
    fn test_ambiguous_name_is_unresolved() {
        let idx = IdentityIndex::from_directory(vec![
            legislator(10, "B000001", None, "Mike", "Brown", "OH"),
            legislator(11, "B000002", None, "Sherrod", "Brown", "OH"),
        ]);
        let resolution = idx.resolve(&RawMemberRef::DisplayName {
            name: "Brown".to_string(),
            state: Some("OH".to_string()),
        });
        assert!(matches!(resolution, Resolution::Unresolved { .. }));
    }

    #[test]
    fn test_name_variants_order() {
        let variants = name_variants("Whitehouse, Sheldon");
        assert_eq!(variants[0], "whitehouse sheldon");
        assert!(variants.contains(&"sheldon whitehouse".to_string()));
    }

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("O'Brien, Pat  Jr."), "o brien pat jr");
        assert_eq!(normalize_name("  "), "");
    }

    #[test]
    fn test_empty_name_unresolved() {
        let idx = index();
        assert!(matches!(
            idx.resolve(&RawMemberRef::DisplayName {
                name: "  ".to_string(),
                state: None,
            }),
            Resolution::Unresolved { .. }
        ));
    }
}
