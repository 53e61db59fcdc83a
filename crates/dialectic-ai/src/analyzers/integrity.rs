use dialectic_core::{Chunk, DiagnosticBlock, IntegrityLabel, IntegrityResult, ModuleKind};

use super::{Analyzer, UNIT_DEFAULT, chunk_header, labelled, mean};
use crate::reply::Reply;

/// Diagnoses the intellectual integrity of a text across several dimensions.
pub struct IntegrityAnalyzer;

fn parse_label(raw: &str) -> Option<IntegrityLabel> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "high" => Some(IntegrityLabel::High),
        "partial" | "medium" | "moderate" => Some(IntegrityLabel::Partial),
        "low" => Some(IntegrityLabel::Low),
        _ => None,
    }
}

impl Analyzer for IntegrityAnalyzer {
    type Output = IntegrityResult;

    const KIND: ModuleKind = ModuleKind::Integrity;

    fn system_prompt(&self) -> String {
        "You audit the intellectual integrity of arguments: consistency, fair treatment of \
opposing views, acknowledgement of limitations, and proportion between evidence and \
confidence. Score each dimension, then give a composite score and a judgment. Respond with a \
single JSON object and no other text:\n\
{\"diagnostics\": [{\"dimension\": string, \"score\": number 0-1, \"finding\": string}], \
\"limitations\": [string], \"composite_score\": number 0-1, \
\"label\": \"high\" | \"partial\" | \"low\", \"judgment\": string, \
\"representative_example\": string}"
            .to_string()
    }

    fn user_prompt(&self, chunk: &Chunk, total: usize) -> String {
        format!(
            "{}Audit the integrity of the reasoning in the following text.\n\n{}",
            chunk_header(chunk, total),
            chunk.text
        )
    }

    fn parse(&self, reply: &Reply) -> IntegrityResult {
        let composite_score = reply.score("composite_score", UNIT_DEFAULT, 1.0);
        let diagnostics = reply.items("diagnostics", |d| DiagnosticBlock {
            dimension: d.text("dimension"),
            score: d.score("score", UNIT_DEFAULT, 1.0),
            finding: d.text("finding"),
        });
        IntegrityResult {
            diagnostics,
            limitations: reply.strings("limitations"),
            composite_score,
            label: parse_label(&reply.text("label"))
                .unwrap_or_else(|| IntegrityLabel::from_score(composite_score)),
            judgment: reply.text("judgment"),
            representative_example: reply.text("representative_example"),
        }
    }

    /// The label is always re-derived from the averaged score. `judgment`
    /// concatenates every chunk; `representative_example` is the first
    /// chunk's judgment.
    fn synthesize(&self, parts: Vec<IntegrityResult>) -> IntegrityResult {
        let composite_score = mean(parts.iter().map(|p| p.composite_score));
        let judgment = labelled(parts.iter().map(|p| p.judgment.as_str()));
        let representative_example = parts
            .first()
            .map(|p| p.judgment.clone())
            .unwrap_or_default();

        let mut diagnostics = Vec::new();
        let mut limitations = Vec::new();
        for part in parts {
            diagnostics.extend(part.diagnostics);
            limitations.extend(part.limitations);
        }
        IntegrityResult {
            diagnostics,
            limitations,
            composite_score,
            label: IntegrityLabel::from_score(composite_score),
            judgment,
            representative_example,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn part(score: f64, label: IntegrityLabel, judgment: &str) -> IntegrityResult {
        IntegrityResult {
            diagnostics: vec![DiagnosticBlock {
                dimension: "consistency".into(),
                score,
                finding: judgment.into(),
            }],
            limitations: vec![],
            composite_score: score,
            label,
            judgment: judgment.into(),
            representative_example: format!("example of {judgment}"),
        }
    }

    #[test]
    fn single_chunk_keeps_reply_label() {
        let reply = Reply::parse(r#"{"composite_score": 0.9, "label": "Partial"}"#).unwrap();
        assert_eq!(IntegrityAnalyzer.parse(&reply).label, IntegrityLabel::Partial);
    }

    #[test]
    fn missing_label_derived_from_score() {
        let reply = Reply::parse(r#"{"composite_score": 0.3, "label": "excellent"}"#).unwrap();
        let result = IntegrityAnalyzer.parse(&reply);
        assert_eq!(result.label, IntegrityLabel::Low);

        let reply = Reply::parse("{}").unwrap();
        let result = IntegrityAnalyzer.parse(&reply);
        assert_eq!(result.composite_score, 0.5);
        assert_eq!(result.label, IntegrityLabel::Partial);
    }

    #[test]
    fn diagnostics_with_string_scores_are_kept() {
        let reply = Reply::parse(
            r#"{"diagnostics": [{"dimension": "consistency", "score": "0.4"}, {"dimension": "fairness", "score": null, "finding": "balanced"}]}"#,
        )
        .unwrap();
        let result = IntegrityAnalyzer.parse(&reply);
        assert_eq!(result.diagnostics.len(), 2);
        assert_eq!(result.diagnostics[0].score, 0.4);
        assert_eq!(result.diagnostics[1].score, 0.5);
        assert_eq!(result.diagnostics[1].finding, "balanced");
    }

    #[test]
    fn synthesis_recomputes_label_and_concatenates_judgments() {
        let merged = IntegrityAnalyzer.synthesize(vec![
            part(0.9, IntegrityLabel::High, "Careful and fair."),
            part(0.4, IntegrityLabel::Low, "Ignores objections."),
        ]);
        assert!((merged.composite_score - 0.65).abs() < 1e-9);
        assert_eq!(merged.label, IntegrityLabel::Partial);
        assert_eq!(
            merged.judgment,
            "Chunk 1: Careful and fair.\n\nChunk 2: Ignores objections."
        );
        assert_eq!(merged.representative_example, "Careful and fair.");
        assert_eq!(merged.diagnostics.len(), 2);
    }
}
