use dialectic_core::{Chunk, KnowledgeItem, ModuleKind, UtilityMapping, UtilityResult};

use super::{Analyzer, TEN_POINT_DEFAULT, chunk_header, mean};
use crate::reply::Reply;

/// Maps the knowledge a text contains onto practical applications.
pub struct UtilityAnalyzer;

impl Analyzer for UtilityAnalyzer {
    type Output = UtilityResult;

    const KIND: ModuleKind = ModuleKind::Utility;

    fn system_prompt(&self) -> String {
        "You assess the practical utility of knowledge. Extract the knowledge the text \
conveys, map each item to concrete applications, and rate the value of each mapping and of \
the text overall on a 0-10 scale. Respond with a single JSON object and no other text:\n\
{\"knowledge_items\": [{\"statement\": string, \"domain\": string}], \
\"mappings\": [{\"knowledge\": string, \"application\": string, \"value\": number 0-10}], \
\"utility_score\": number 0-10, \"practical_value\": string}"
            .to_string()
    }

    fn user_prompt(&self, chunk: &Chunk, total: usize) -> String {
        format!(
            "{}Assess the practical utility of the knowledge in the following text.\n\n{}",
            chunk_header(chunk, total),
            chunk.text
        )
    }

    fn parse(&self, reply: &Reply) -> UtilityResult {
        UtilityResult {
            knowledge_items: reply.items("knowledge_items", |k| KnowledgeItem {
                statement: k.text("statement"),
                domain: k.text("domain"),
            }),
            mappings: reply.items("mappings", |m| UtilityMapping {
                knowledge: m.text("knowledge"),
                application: m.text("application"),
                value: m.score("value", TEN_POINT_DEFAULT, 10.0),
            }),
            utility_score: reply.score("utility_score", TEN_POINT_DEFAULT, 10.0),
            practical_value: reply.text("practical_value"),
        }
    }

    /// `practical_value` is copied from the first chunk.
    fn synthesize(&self, parts: Vec<UtilityResult>) -> UtilityResult {
        let utility_score = mean(parts.iter().map(|p| p.utility_score));
        let practical_value = parts
            .first()
            .map(|p| p.practical_value.clone())
            .unwrap_or_default();
        let mut knowledge_items = Vec::new();
        let mut mappings = Vec::new();
        for part in parts {
            knowledge_items.extend(part.knowledge_items);
            mappings.extend(part.mappings);
        }
        UtilityResult {
            knowledge_items,
            mappings,
            utility_score,
            practical_value,
        }
    }
}
