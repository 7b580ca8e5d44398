//! Moderation verdicts and the safe-for-work derivation

use serde::Serialize;
use std::collections::BTreeMap;

/// Categories whose flag makes content unsafe for work. Other flagged
/// categories (self-harm, illicit, ...) do not.
pub const UNSAFE_CATEGORIES: &[&str] = &[
    "harassment",
    "harassment/threatening",
    "hate",
    "hate/threatening",
    "sexual",
    "sexual/minors",
    "violence",
    "violence/graphic",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModerationVerdict {
    pub flagged: bool,
    pub safe_for_work: bool,
    pub categories: BTreeMap<String, bool>,
    pub category_scores: BTreeMap<String, f64>,
}

impl ModerationVerdict {
    pub fn new(
        flagged: bool,
        categories: BTreeMap<String, bool>,
        category_scores: BTreeMap<String, f64>,
    ) -> Self {
        Self {
            flagged,
            safe_for_work: safe_for_work(&categories),
            categories,
            category_scores,
        }
    }
}

fn safe_for_work(categories: &BTreeMap<String, bool>) -> bool {
    !UNSAFE_CATEGORIES
        .iter()
        .any(|category| categories.get(*category).copied().unwrap_or(false))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn categories(flagged: &[&str]) -> BTreeMap<String, bool> {
        ["hate", "harassment", "sexual", "violence", "self-harm", "illicit"]
            .into_iter()
            .map(|c| (c.to_string(), flagged.contains(&c)))
            .collect()
    }

    #[test]
    fn test_unsafe_category_clears_safe_for_work() {
        let verdict = ModerationVerdict::new(true, categories(&["hate"]), BTreeMap::new());
        assert!(!verdict.safe_for_work);
    }

    #[test]
    fn test_other_category_keeps_safe_for_work() {
        let verdict = ModerationVerdict::new(true, categories(&["self-harm"]), BTreeMap::new());
        assert!(verdict.flagged);
        assert!(verdict.safe_for_work);
    }

    #[test]
    fn test_nothing_flagged_is_safe() {
        let verdict = ModerationVerdict::new(false, categories(&[]), BTreeMap::new());
        assert!(verdict.safe_for_work);
    }

    #[test]
    fn test_subcategory_counts() {
        let mut cats = categories(&[]);
        cats.insert("violence/graphic".to_string(), true);
        assert!(!ModerationVerdict::new(true, cats, BTreeMap::new()).safe_for_work);
    }
}
