// Common types used across multiple domains
//
// Regeneration requests in several domains carry the same feedback shape;
// each domain supplies its own set of reasons through `FeedbackKind`.

use serde::{Deserialize, Serialize};

/// A closed set of feedback reasons with display labels.
pub trait FeedbackKind: Copy + PartialEq + Sized + 'static {
    const ALL: &'static [Self];
    const NONE: Self;

    /// Wire code, e.g. `TOO_EASY`.
    fn code(&self) -> &'static str;

    fn label(&self) -> &'static str;

    /// Match a label exactly or a code case-insensitively, else `NONE`.
    fn from_input(input: &str) -> Self {
        let input = input.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.label() == input || kind.code().eq_ignore_ascii_case(input))
            .unwrap_or(Self::NONE)
    }
}

/// User feedback attached to a regeneration request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedbackData {
    #[serde(default)]
    pub reasons: Vec<String>,
    #[serde(default, alias = "etcFeedback")]
    pub etc_feedback: String,
}

impl FeedbackData {
    /// Recognized reasons, `NONE` removed, in request order.
    pub fn kinds<F: FeedbackKind>(&self) -> Vec<F> {
        let mut kinds: Vec<F> = Vec::new();
        for kind in self.reasons.iter().map(|r| F::from_input(r)) {
            if kind != F::NONE && !kinds.contains(&kind) {
                kinds.push(kind);
            }
        }
        kinds
    }

    /// Labels of the recognized reasons, joined for a prompt.
    pub fn reason_labels<F: FeedbackKind>(&self) -> String {
        let labels: Vec<&str> = self.kinds::<F>().iter().map(|k| k.label()).collect();
        if labels.is_empty() {
            "No feedback reasons given".to_string()
        } else {
            labels.join(", ")
        }
    }

    pub fn extra_feedback(&self) -> &str {
        match self.etc_feedback.trim() {
            "" => "No additional feedback",
            text => text,
        }
    }
}
