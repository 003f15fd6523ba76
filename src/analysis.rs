//! Comic analysis - the structured output from the LLM agent, and the
//! display-ready description built from it.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Chat embeds reject field values longer than this.
pub const MAX_SECTION_CHARS: usize = 1024;

pub const CORE_CONCEPT_LABEL: &str = "Core concept";
pub const EXPLANATION_LABEL: &str = "Explanation";

const FALLBACK_CORE_CONCEPT: &str = "Error";
const FALLBACK_EXPLANATION: &str = "Failed to parse analysis.";

/// Structured comic analysis returned by the LLM.
///
/// The JSON schema of this struct is embedded in the prompt as format
/// instructions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ComicAnalysis {
    /// Briefly identify the technical, scientific, or programming principle
    #[serde(rename = "Core_concept", alias = "core_concept")]
    pub core_concept: String,
    /// Explain the joke, puns, and alt-text clearly for a general audience under 950 chars
    #[serde(rename = "Explanation", alias = "explanation")]
    pub explanation: String,
}

/// A labeled block of description text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Section {
    pub label: String,
    pub text: String,
}

/// Ordered description sections, ready for display.
///
/// Failed analyses produce the same shape with fixed error text, so callers
/// can always iterate the sections without checking for failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Description {
    sections: Vec<Section>,
}

impl Description {
    /// The placeholder used whenever the model call fails
    pub fn fallback() -> Self {
        Self::from_pairs(FALLBACK_CORE_CONCEPT, FALLBACK_EXPLANATION)
    }

    fn from_pairs(core_concept: &str, explanation: &str) -> Self {
        Self {
            sections: vec![
                Section {
                    label: CORE_CONCEPT_LABEL.to_string(),
                    text: clamp(core_concept),
                },
                Section {
                    label: EXPLANATION_LABEL.to_string(),
                    text: clamp(explanation),
                },
            ],
        }
    }

    /// Iterate `(label, text)` pairs in display order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.sections
            .iter()
            .map(|s| (s.label.as_str(), s.text.as_str()))
    }

    pub fn get(&self, label: &str) -> Option<&str> {
        self.iter().find(|(l, _)| *l == label).map(|(_, t)| t)
    }

    pub fn is_fallback(&self) -> bool {
        *self == Self::fallback()
    }
}

impl From<ComicAnalysis> for Description {
    fn from(analysis: ComicAnalysis) -> Self {
        Self::from_pairs(analysis.core_concept.trim(), analysis.explanation.trim())
    }
}

fn clamp(text: &str) -> String {
    if text.chars().count() <= MAX_SECTION_CHARS {
        return text.to_string();
    }
    let mut clamped: String = text.chars().take(MAX_SECTION_CHARS - 1).collect();
    clamped.push('…');
    clamped
}
