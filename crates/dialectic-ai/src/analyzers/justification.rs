use dialectic_core::{Chunk, Claim, JustificationChain, JustificationResult, ModuleKind};

use super::{Analyzer, UNIT_DEFAULT, by_bucket, chunk_header, mean};
use crate::reply::Reply;

/// Traces how each claim is supported and where support runs out.
pub struct JustificationAnalyzer;

impl Analyzer for JustificationAnalyzer {
    type Output = JustificationResult;

    const KIND: ModuleKind = ModuleKind::Justification;

    fn system_prompt(&self) -> String {
        "You are an epistemologist. List the claims the text makes, follow the chain of \
support behind each claim to where it ends (foundational, circular, infinite or unsupported), \
and name the weaknesses in the justification. Respond with a single JSON object and no other \
text:\n\
{\"claims\": [{\"text\": string, \"role\": string, \"justified\": boolean}], \
\"justification_chains\": [{\"claim\": string, \"support\": [string], \"terminus\": string}], \
\"weaknesses\": [string], \"justification_score\": number 0-1, \
\"foundation_type\": string, \"assessment\": string}"
            .to_string()
    }

    fn user_prompt(&self, chunk: &Chunk, total: usize) -> String {
        format!(
            "{}Trace the justification structure of the following text.\n\n{}",
            chunk_header(chunk, total),
            chunk.text
        )
    }

    fn parse(&self, reply: &Reply) -> JustificationResult {
        JustificationResult {
            claims: reply.items("claims", |c| Claim {
                text: c.text("text"),
                role: c.text("role"),
                justified: c.flag("justified", false),
            }),
            justification_chains: reply.items("justification_chains", |c| JustificationChain {
                claim: c.text("claim"),
                support: c.strings("support"),
                terminus: c.text("terminus"),
            }),
            weaknesses: reply.strings("weaknesses"),
            justification_score: reply.score("justification_score", UNIT_DEFAULT, 1.0),
            foundation_type: reply.text("foundation_type"),
            assessment: reply.text("assessment"),
        }
    }

    /// `foundation_type` is taken from the first chunk; `assessment` is rewritten.
    fn synthesize(&self, parts: Vec<JustificationResult>) -> JustificationResult {
        let count = parts.len();
        let justification_score = mean(parts.iter().map(|p| p.justification_score));
        let foundation_type = parts
            .first()
            .map(|p| p.foundation_type.clone())
            .unwrap_or_default();

        let mut merged = JustificationResult {
            claims: Vec::new(),
            justification_chains: Vec::new(),
            weaknesses: Vec::new(),
            justification_score,
            foundation_type,
            assessment: String::new(),
        };
        for part in parts {
            merged.claims.extend(part.claims);
            merged.justification_chains.extend(part.justification_chains);
            merged.weaknesses.extend(part.weaknesses);
        }

        let verdict = by_bucket(justification_score, "sound", "moderate", "weak");
        merged.assessment = format!(
            "Across {count} sections the justification structure is {verdict} \
({justification_score:.2}), with {} claims and {} weaknesses identified.",
            merged.claims.len(),
            merged.weaknesses.len()
        );
        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_reads_nested_items() {
        let reply = Reply::parse(
            r#"{
                "claims": [{"text": "Laws govern", "role": "thesis", "justified": true}],
                "justificationChains": [{"claim": "Laws govern", "support": ["necessity"], "terminus": "foundational"}],
                "weaknesses": ["relies on intuition"],
                "justification_score": 0.72,
                "foundation_type": "foundationalist"
            }"#,
        )
        .unwrap();
        let result = JustificationAnalyzer.parse(&reply);
        assert!(result.claims[0].justified);
        assert_eq!(result.justification_chains[0].terminus, "foundational");
        assert_eq!(result.weaknesses, vec!["relies on intuition".to_string()]);
        assert_eq!(result.justification_score, 0.72);
        assert!(result.assessment.is_empty());
    }

    #[test]
    fn claims_and_chains_survive_loose_types() {
        let reply = Reply::parse(
            r#"{
                "claims": [{"text": "Laws govern", "role": null, "justified": "yes"}],
                "justification_chains": [{"claim": "Laws govern", "support": "necessity", "terminus": null}]
            }"#,
        )
        .unwrap();
        let result = JustificationAnalyzer.parse(&reply);
        assert_eq!(result.claims.len(), 1);
        assert!(result.claims[0].justified);
        assert!(result.claims[0].role.is_empty());
        assert_eq!(result.justification_chains[0].support, vec!["necessity".to_string()]);
        assert!(result.justification_chains[0].terminus.is_empty());
    }

    #[test]
    fn synthesis_keeps_first_foundation_and_rewrites_assessment() {
        let part = |score: f64, foundation: &str| JustificationResult {
            claims: vec![Claim::default()],
            justification_chains: vec![],
            weaknesses: vec![format!("w{score}")],
            justification_score: score,
            foundation_type: foundation.into(),
            assessment: "per chunk".into(),
        };
        let merged = JustificationAnalyzer.synthesize(vec![
            part(0.9, "foundationalist"),
            part(0.8, "coherentist"),
        ]);
        assert_eq!(merged.foundation_type, "foundationalist");
        assert!((merged.justification_score - 0.85).abs() < 1e-9);
        assert_eq!(merged.claims.len(), 2);
        assert_eq!(merged.weaknesses, vec!["w0.9".to_string(), "w0.8".to_string()]);
        assert!(merged.assessment.contains("sound"));
        assert!(merged.assessment.contains("2 sections"));
    }
}
