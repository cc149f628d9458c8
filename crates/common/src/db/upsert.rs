//! Upsert policy planning
//!
//! The store historically grew three near-duplicate import code paths with
//! diverging overwrite behavior. They are collapsed here into one
//! parameterized policy enum plus a pure planning function the repository
//! executes, so the overwrite rules can be tested without a database.

use super::models::Memory;
use serde::{Deserialize, Serialize};

/// How an incoming (source_text, target_text) pair reconciles against an
/// existing record with the same (source_language, target_language,
/// source_text) triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpsertPolicy {
    /// Unconditionally overwrite the stored target_text, even with an empty
    /// value. Used by authoritative imports.
    Replace,
    /// Overwrite target_text only when the incoming value is non-empty;
    /// always refresh the owning asset and batch name. The default for
    /// routine re-imports.
    Merge,
    /// Always create a new row without checking for an existing match.
    /// Legacy mode; can produce duplicate triples.
    InsertOnly,
}

impl UpsertPolicy {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "replace" => Some(UpsertPolicy::Replace),
            "merge" => Some(UpsertPolicy::Merge),
            "insert_only" => Some(UpsertPolicy::InsertOnly),
            _ => None,
        }
    }
}

/// One incoming translation pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryInput {
    pub name: String,
    pub source_language: String,
    pub target_language: String,
    pub source_text: String,
    pub target_text: String,
    pub memory_asset_id: i64,
}

/// The write the repository should perform for one incoming pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpsertPlan {
    /// Nothing to write
    Skip,
    /// Insert a fresh row from the input
    Insert,
    /// Update the existing row. `target_text` is `None` when the policy
    /// keeps the stored translation; asset and name are always refreshed.
    Update {
        id: i64,
        target_text: Option<String>,
    },
}

/// Decide the write for one incoming pair under the given policy.
///
/// `existing` is the first record matching the input's identity triple, if
/// any (matching ignores the owning asset).
pub fn plan_upsert(
    existing: Option<&Memory>,
    input: &MemoryInput,
    policy: UpsertPolicy,
) -> UpsertPlan {
    match policy {
        UpsertPolicy::InsertOnly => UpsertPlan::Insert,
        UpsertPolicy::Replace => match existing {
            Some(row) => UpsertPlan::Update {
                id: row.id,
                target_text: Some(input.target_text.clone()),
            },
            None => UpsertPlan::Insert,
        },
        UpsertPolicy::Merge => match existing {
            Some(row) => UpsertPlan::Update {
                id: row.id,
                target_text: if input.target_text.is_empty() {
                    None
                } else {
                    Some(input.target_text.clone())
                },
            },
            None => {
                if input.target_text.is_empty() {
                    UpsertPlan::Skip
                } else {
                    UpsertPlan::Insert
                }
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn existing_row() -> Memory {
        Memory {
            id: 7,
            name: "batch-1".into(),
            source_language: "en".into(),
            target_language: "fr".into(),
            source_text: "Hello".into(),
            target_text: "Bonjour".into(),
            memory_asset_id: 1,
        }
    }

    fn input(target_text: &str) -> MemoryInput {
        MemoryInput {
            name: "batch-2".into(),
            source_language: "en".into(),
            target_language: "fr".into(),
            source_text: "Hello".into(),
            target_text: target_text.into(),
            memory_asset_id: 2,
        }
    }

    #[test]
    fn merge_keeps_stored_translation_on_empty_input() {
        let row = existing_row();
        let plan = plan_upsert(Some(&row), &input(""), UpsertPolicy::Merge);
        // Stored "Bonjour" survives, but asset/name are still refreshed.
        assert_eq!(
            plan,
            UpsertPlan::Update {
                id: 7,
                target_text: None
            }
        );
    }

    #[test]
    fn merge_overwrites_with_non_empty_input() {
        let row = existing_row();
        let plan = plan_upsert(Some(&row), &input("Salut"), UpsertPolicy::Merge);
        assert_eq!(
            plan,
            UpsertPlan::Update {
                id: 7,
                target_text: Some("Salut".into())
            }
        );
    }

    #[test]
    fn merge_skips_insert_of_empty_pair() {
        assert_eq!(plan_upsert(None, &input(""), UpsertPolicy::Merge), UpsertPlan::Skip);
        assert_eq!(
            plan_upsert(None, &input("Salut"), UpsertPolicy::Merge),
            UpsertPlan::Insert
        );
    }

    #[test]
    fn replace_overwrites_even_with_empty_target() {
        // Product decision: REPLACE is the authoritative policy and may
        // withdraw a translation by blanking it.
        let row = existing_row();
        let plan = plan_upsert(Some(&row), &input(""), UpsertPolicy::Replace);
        assert_eq!(
            plan,
            UpsertPlan::Update {
                id: 7,
                target_text: Some(String::new())
            }
        );
    }

    #[test]
    fn replace_inserts_when_absent() {
        assert_eq!(
            plan_upsert(None, &input("Salut"), UpsertPolicy::Replace),
            UpsertPlan::Insert
        );
    }

    #[test]
    fn insert_only_never_checks_existing() {
        let row = existing_row();
        assert_eq!(
            plan_upsert(Some(&row), &input("Salut"), UpsertPolicy::InsertOnly),
            UpsertPlan::Insert
        );
    }

    #[test]
    fn policy_parsing() {
        assert_eq!(UpsertPolicy::parse("merge"), Some(UpsertPolicy::Merge));
        assert_eq!(UpsertPolicy::parse("replace"), Some(UpsertPolicy::Replace));
        assert_eq!(
            UpsertPolicy::parse("insert_only"),
            Some(UpsertPolicy::InsertOnly)
        );
        assert_eq!(UpsertPolicy::parse("upsert"), None);
    }
}
