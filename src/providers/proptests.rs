//! Property-based tests for provider response normalization
//!
//! These tests verify invariants that must hold whatever a provider reports:
//! - Normalized token usage always sums to the total
//! - A bare total splits deterministically at the fixed input share
//! - Estimates count characters, never bytes
//! - `safe_for_work` depends only on the unsafe category subset
//! - Error messages taken from raw bodies stay bounded

use super::deepl::language_code;
use super::http::error_message;
use super::{estimate_tokens, ModerationVerdict, TokenUsage, INPUT_SHARE_PERCENT, UNSAFE_CATEGORIES};
use proptest::prelude::*;
use std::collections::BTreeMap;

// ============================================================================
// Strategies
// ============================================================================

fn arb_count() -> impl Strategy<Value = u64> {
    0u64..10_000_000
}

/// Category map over the unsafe subset plus a few categories outside it
fn arb_categories() -> impl Strategy<Value = BTreeMap<String, bool>> {
    let names: Vec<&'static str> = UNSAFE_CATEGORIES
        .iter()
        .copied()
        .chain(["self-harm", "self-harm/intent", "illicit", "illicit/violent"])
        .collect();
    proptest::collection::vec(any::<bool>(), names.len()).prop_map(move |flags| {
        names
            .iter()
            .zip(flags)
            .map(|(name, flag)| ((*name).to_string(), flag))
            .collect()
    })
}

// ============================================================================
// Usage normalization
// ============================================================================

proptest! {
    /// Total-only usage splits into parts that sum back exactly
    #[test]
    fn prop_total_only_sums_back(total in arb_count()) {
        let usage = TokenUsage::from_reported(None, None, Some(total)).unwrap();
        prop_assert_eq!(usage.input_tokens + usage.output_tokens, total);
        prop_assert_eq!(usage.total_tokens, total);
        prop_assert_eq!(usage.input_tokens, total * INPUT_SHARE_PERCENT / 100);
    }

    /// Any partial report yields a consistent record
    #[test]
    fn prop_reported_usage_is_consistent(
        input in proptest::option::of(arb_count()),
        output in proptest::option::of(arb_count()),
    ) {
        let total = match (input, output) {
            (Some(i), Some(o)) => Some(i + o),
            _ => None,
        };
        if let Some(usage) = TokenUsage::from_reported(input, output, total) {
            prop_assert_eq!(usage.input_tokens + usage.output_tokens, usage.total_tokens);
            if let Some(i) = input {
                prop_assert_eq!(usage.input_tokens, i);
            }
        } else {
            prop_assert!(input.is_none() && output.is_none());
        }
    }

    /// Estimates are ceil(chars / 4) and never depend on UTF-8 width
    #[test]
    fn prop_estimate_counts_chars(text in "\\PC{0,200}") {
        let chars = text.chars().count() as u64;
        prop_assert_eq!(estimate_tokens(&text), chars.div_ceil(4));
    }
}

// ============================================================================
// Moderation
// ============================================================================

proptest! {
    /// safe_for_work is exactly "no unsafe category flagged"
    #[test]
    fn prop_safe_for_work_tracks_unsafe_subset(
        categories in arb_categories(),
        flagged in any::<bool>(),
    ) {
        let any_unsafe = UNSAFE_CATEGORIES
            .iter()
            .any(|c| categories.get(*c).copied().unwrap_or(false));
        let verdict = ModerationVerdict::new(flagged, categories, BTreeMap::new());
        prop_assert_eq!(verdict.safe_for_work, !any_unsafe);
    }
}

// ============================================================================
// Provider plumbing
// ============================================================================

proptest! {
    /// Short codes are upper-cased verbatim
    #[test]
    fn prop_short_codes_uppercased(code in "[a-z]{1,3}") {
        prop_assert_eq!(language_code(&code), code.to_uppercase());
    }

    /// Raw (non-JSON) error bodies are bounded
    #[test]
    fn prop_raw_error_body_bounded(body in "[a-zA-Z <>/]{0,2000}") {
        let message = error_message(&body);
        prop_assert!(message.chars().count() <= 503);
    }
}
