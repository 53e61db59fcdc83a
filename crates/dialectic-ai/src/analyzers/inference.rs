use dialectic_core::{Chunk, ExtractedArgument, InferenceResult, ModuleKind};

use super::{Analyzer, UNIT_DEFAULT, by_bucket, chunk_header, mean};
use crate::reply::Reply;

/// Extracts arguments and rates how well the conclusions follow.
pub struct InferenceAnalyzer;

impl Analyzer for InferenceAnalyzer {
    type Output = InferenceResult;

    const KIND: ModuleKind = ModuleKind::Inference;

    fn system_prompt(&self) -> String {
        "You are an expert in logic and argumentation. Identify every argument in the text: \
its premises, its conclusion, the kind of inference (deductive, inductive, abductive) and \
how strongly the premises support the conclusion. Respond with a single JSON object and no \
other text:\n\
{\"arguments\": [{\"premises\": [string], \"conclusion\": string, \"inference_type\": string, \
\"strength\": number 0-1}], \"coherence_score\": number 0-1, \"overall_strength\": number 0-1, \
\"summary\": string}"
            .to_string()
    }

    fn user_prompt(&self, chunk: &Chunk, total: usize) -> String {
        format!(
            "{}Analyze the inferential structure of the following text.\n\n{}",
            chunk_header(chunk, total),
            chunk.text
        )
    }

    fn parse(&self, reply: &Reply) -> InferenceResult {
        InferenceResult {
            arguments: reply.items("arguments", |a| ExtractedArgument {
                premises: a.strings("premises"),
                conclusion: a.text("conclusion"),
                inference_type: a.text("inference_type"),
                strength: a.score("strength", UNIT_DEFAULT, 1.0),
            }),
            coherence_score: reply.score("coherence_score", UNIT_DEFAULT, 1.0),
            overall_strength: reply.score("overall_strength", UNIT_DEFAULT, 1.0),
            summary: reply.text("summary"),
        }
    }

    fn synthesize(&self, parts: Vec<InferenceResult>) -> InferenceResult {
        let count = parts.len();
        let coherence_score = mean(parts.iter().map(|p| p.coherence_score));
        let overall_strength = mean(parts.iter().map(|p| p.overall_strength));
        let arguments: Vec<_> = parts.into_iter().flat_map(|p| p.arguments).collect();
        let quality = by_bucket(coherence_score, "high", "moderate", "low");
        let summary = format!(
            "Synthesized from {count} sections: {} arguments identified, overall inferential \
coherence is {quality} ({coherence_score:.2}).",
            arguments.len()
        );
        InferenceResult {
            arguments,
            coherence_score,
            overall_strength,
            summary,
        }
    }
}
