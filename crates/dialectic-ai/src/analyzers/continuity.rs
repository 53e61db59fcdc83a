use dialectic_core::{Chunk, ContinuityResult, ModuleKind};

use super::{Analyzer, UNIT_DEFAULT, by_bucket, chunk_header, labelled, mean};
use crate::reply::Reply;

/// Words of each reference quoted in the prompt.
const REFERENCE_EXCERPT_WORDS: usize = 400;

/// A prior text the analysed text is compared against.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceText {
    /// Record id, or a positional label for inline text.
    pub label: String,
    pub text: String,
}

/// Compares a text with earlier texts for thematic continuity.
///
/// Embedding similarities are filled in by the caller; the analyzer only
/// covers the model's reading.
pub struct ContinuityAnalyzer {
    references: Vec<ReferenceText>,
}

impl ContinuityAnalyzer {
    pub fn new(references: Vec<ReferenceText>) -> Self {
        Self { references }
    }

    fn reference_block(&self) -> String {
        if self.references.is_empty() {
            return "No reference texts were supplied; judge continuity within the text itself.\n\n"
                .to_string();
        }
        let mut block = String::from("Reference texts:\n\n");
        for reference in &self.references {
            let excerpt = reference
                .text
                .split_whitespace()
                .take(REFERENCE_EXCERPT_WORDS)
                .collect::<Vec<_>>()
                .join(" ");
            block.push_str(&format!("[{}]\n{excerpt}\n\n", reference.label));
        }
        block
    }
}

impl Analyzer for ContinuityAnalyzer {
    type Output = ContinuityResult;

    const KIND: ModuleKind = ModuleKind::Continuity;

    fn system_prompt(&self) -> String {
        "You trace intellectual continuity between a text and the reference texts it builds \
on: which themes carry over, where the text departs from them, and how completely it \
continues their line of thought. Respond with a single JSON object and no other text:\n\
{\"shared_themes\": [string], \"divergences\": [string], \"continuity_score\": number 0-1, \
\"completeness\": string, \"narrative\": string}"
            .to_string()
    }

    fn user_prompt(&self, chunk: &Chunk, total: usize) -> String {
        format!(
            "{}{}Text to analyze:\n\n{}",
            chunk_header(chunk, total),
            self.reference_block(),
            chunk.text
        )
    }

    fn parse(&self, reply: &Reply) -> ContinuityResult {
        ContinuityResult {
            similarities: Vec::new(),
            shared_themes: reply.strings("shared_themes"),
            divergences: reply.strings("divergences"),
            continuity_score: reply.score("continuity_score", UNIT_DEFAULT, 1.0),
            completeness: reply.text("completeness"),
            narrative: reply.text("narrative"),
        }
    }

    /// `completeness` is rewritten from the averaged score; narratives are
    /// concatenated per chunk.
    fn synthesize(&self, parts: Vec<ContinuityResult>) -> ContinuityResult {
        let count = parts.len();
        let continuity_score = mean(parts.iter().map(|p| p.continuity_score));
        let narrative = labelled(parts.iter().map(|p| p.narrative.as_str()));
        let tier = by_bucket(continuity_score, "complete", "moderate", "incomplete");

        let mut shared_themes = Vec::new();
        let mut divergences = Vec::new();
        for part in parts {
            shared_themes.extend(part.shared_themes);
            divergences.extend(part.divergences);
        }
        ContinuityResult {
            similarities: Vec::new(),
            shared_themes,
            divergences,
            continuity_score,
            completeness: format!(
                "Continuity across {count} sections is {tier} ({continuity_score:.2})."
            ),
            narrative,
        }
    }
}
