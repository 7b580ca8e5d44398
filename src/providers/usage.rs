//! Usage normalization
//!
//! Providers report consumption differently (or not at all). Everything is
//! folded into `TokenUsage` or `CharacterUsage` so responses always carry a
//! usage object.

use serde::Serialize;

/// Share of a bare total attributed to input when no breakdown is reported
pub const INPUT_SHARE_PERCENT: u64 = 70;

/// Rough characters-per-token ratio used for estimates
pub const CHARS_PER_TOKEN: u64 = 4;

/// Estimated token count for a piece of text: `ceil(chars / 4)`
pub fn estimate_tokens(text: &str) -> u64 {
    char_count(text).div_ceil(CHARS_PER_TOKEN)
}

pub fn char_count(text: &str) -> u64 {
    u64::try_from(text.chars().count()).unwrap_or(u64::MAX)
}

/// Token accounting shared by every token-billed provider
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_tokens_details: Option<InputTokensDetails>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_tokens_details: Option<OutputTokensDetails>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InputTokensDetails {
    pub cached_tokens: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OutputTokensDetails {
    pub reasoning_tokens: u64,
}

impl TokenUsage {
    pub fn new(input_tokens: u64, output_tokens: u64) -> Self {
        Self {
            input_tokens,
            output_tokens,
            total_tokens: input_tokens + output_tokens,
            ..Default::default()
        }
    }

    /// Split a bare total using the fixed input share. Always sums back to `total`.
    pub fn from_total(total: u64) -> Self {
        let input_tokens = total * INPUT_SHARE_PERCENT / 100;
        Self {
            input_tokens,
            output_tokens: total - input_tokens,
            total_tokens: total,
            ..Default::default()
        }
    }

    /// Character-based estimate for providers that report nothing
    pub fn estimate(prompt: &str, completion: &str) -> Self {
        Self::new(estimate_tokens(prompt), estimate_tokens(completion))
    }

    /// Normalize whatever subset of counts a provider reported.
    ///
    /// Returns `None` when nothing at all was reported so the caller can
    /// decide how to estimate.
    pub fn from_reported(input: Option<u64>, output: Option<u64>, total: Option<u64>) -> Option<Self> {
        let usage = match (input, output, total) {
            (Some(input), Some(output), total) => Self {
                total_tokens: total.unwrap_or(input + output),
                ..Self::new(input, output)
            },
            (Some(input), None, Some(total)) => Self {
                input_tokens: input,
                output_tokens: total.saturating_sub(input),
                total_tokens: total,
                ..Default::default()
            },
            (None, Some(output), Some(total)) => Self {
                input_tokens: total.saturating_sub(output),
                output_tokens: output,
                total_tokens: total,
                ..Default::default()
            },
            (None, None, Some(total)) => Self::from_total(total),
            (Some(input), None, None) => Self::new(input, 0),
            (None, Some(output), None) => Self::new(0, output),
            (None, None, None) => return None,
        };
        Some(usage)
    }

    /// Reported counts when any exist, otherwise an estimate from the texts
    pub fn reported_or_estimated(
        input: Option<u64>,
        output: Option<u64>,
        total: Option<u64>,
        prompt: &str,
        completion: &str,
    ) -> Self {
        Self::from_reported(input, output, total).unwrap_or_else(|| Self::estimate(prompt, completion))
    }

    pub fn with_details(mut self, cached_tokens: Option<u64>, reasoning_tokens: Option<u64>) -> Self {
        self.input_tokens_details = cached_tokens.map(|cached_tokens| InputTokensDetails { cached_tokens });
        self.output_tokens_details =
            reasoning_tokens.map(|reasoning_tokens| OutputTokensDetails { reasoning_tokens });
        self
    }
}

/// Character accounting for translation services billed per character
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterUsage {
    pub character_count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub character_limit: Option<u64>,
}

/// Usage in whichever unit the serving provider bills
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Usage {
    Tokens(TokenUsage),
    Characters(CharacterUsage),
}

impl From<TokenUsage> for Usage {
    fn from(usage: TokenUsage) -> Self {
        Usage::Tokens(usage)
    }
}

impl From<CharacterUsage> for Usage {
    fn from(usage: CharacterUsage) -> Self {
        Usage::Characters(usage)
    }
}

/// Token figures that are a character-based estimate, not provider accounting.
///
/// Used for moderation, whose endpoint reports no usage at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EstimatedUsage {
    pub prompt_tokens: u64,
    pub total_tokens: u64,
    pub estimated: bool,
}

impl EstimatedUsage {
    pub fn from_input(text: &str) -> Self {
        let tokens = estimate_tokens(text);
        Self {
            prompt_tokens: tokens,
            total_tokens: tokens,
            estimated: true,
        }
    }
}
