//! Doctrine alignment: diff an extracted stance against a reference policy.

use dialectic_core::{
    AlignmentOutcome, DimensionCheck, DoctrineAlignment, DoctrinePolicy, StanceDimension,
    StanceTokens,
};

/// Score `stance` against `policy`.
///
/// Starts at 1.0 and deducts each determined dimension's penalty on mismatch.
/// Undetermined dimensions are skipped, so they never lower the score.
pub fn align(stance: &StanceTokens, policy: &DoctrinePolicy) -> DoctrineAlignment {
    let mut score = 1.0;
    let mut conflicts = Vec::new();
    let mut alignments = Vec::new();
    let mut dimensions = Vec::with_capacity(StanceDimension::ALL.len());

    for dimension in StanceDimension::ALL {
        let observed = stance.value(dimension);
        let expected = policy.expected(dimension);

        let (outcome, penalty) = if !stance.is_determined(dimension) {
            (AlignmentOutcome::Skipped, 0.0)
        } else if observed == expected {
            alignments.push(format!("{dimension}: stance '{observed}' matches doctrine"));
            (AlignmentOutcome::Aligned, 0.0)
        } else {
            conflicts.push(format!(
                "{dimension}: stance '{observed}' conflicts with doctrine '{expected}'"
            ));
            score -= dimension.penalty();
            (AlignmentOutcome::Conflict, dimension.penalty())
        };

        dimensions.push(DimensionCheck {
            dimension,
            observed: observed.to_string(),
            expected,
            outcome,
            penalty,
        });
    }

    DoctrineAlignment {
        composite_score: f64::clamp(score, 0.0, 1.0),
        conflicts,
        alignments,
        dimensions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dialectic_core::{DnCommitment, ExplanationOrder, LawKind, RegularityRole};

    fn stance(
        law_kind: LawKind,
        explanation_order: ExplanationOrder,
        dn_commitment: DnCommitment,
        regularity_role: RegularityRole,
    ) -> StanceTokens {
        StanceTokens {
            law_kind,
            explanation_order,
            dn_commitment,
            regularity_role,
            confidence: 0.8,
        }
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn default_doctrine_fully_aligned() {
        let result = align(
            &stance(
                LawKind::NonHumean,
                ExplanationOrder::LawsFirst,
                DnCommitment::Rejects,
                RegularityRole::Evidential,
            ),
            &DoctrinePolicy::default(),
        );
        assert!(close(result.composite_score, 1.0));
        assert!(result.conflicts.is_empty());
        assert_eq!(result.alignments.len(), 4);
        assert_eq!(
            result.alignments[0],
            "law_kind: stance 'non_humean' matches doctrine"
        );
    }

    #[test]
    fn conflicts_deduct_dimension_penalties() {
        let result = align(
            &stance(
                LawKind::Humean,
                ExplanationOrder::LawsFirst,
                DnCommitment::Rejects,
                RegularityRole::Constitutive,
            ),
            &DoctrinePolicy::default(),
        );
        assert!(close(result.composite_score, 0.4));
        assert_eq!(
            result.conflicts,
            vec![
                "law_kind: stance 'humean' conflicts with doctrine 'non_humean'".to_string(),
                "regularity_role: stance 'constitutive' conflicts with doctrine 'evidential'"
                    .to_string(),
            ]
        );
        assert_eq!(result.dimensions[0].outcome, AlignmentOutcome::Conflict);
        assert!(close(result.dimensions[3].penalty, 0.2));
    }

    #[test]
    fn score_clamped_at_zero() {
        let result = align(
            &stance(
                LawKind::Humean,
                ExplanationOrder::RegularitiesFirst,
                DnCommitment::Endorses,
                RegularityRole::Constitutive,
            ),
            &DoctrinePolicy::default(),
        );
        assert_eq!(result.composite_score, 0.0);
        assert_eq!(result.conflicts.len(), 4);
    }

    #[test]
    fn undetermined_dimensions_are_skipped() {
        let result = align(&StanceTokens::undetermined(0.3), &DoctrinePolicy::default());
        assert!(close(result.composite_score, 1.0));
        assert!(result.conflicts.is_empty() && result.alignments.is_empty());
        assert!(
            result
                .dimensions
                .iter()
                .all(|d| d.outcome == AlignmentOutcome::Skipped)
        );
    }

    #[test]
    fn policy_overrides_defaults() {
        let policy: DoctrinePolicy = [("law_kind".to_string(), "Humean".to_string())]
            .into_iter()
            .collect();
        let result = align(
            &stance(
                LawKind::Humean,
                ExplanationOrder::Unclear,
                DnCommitment::Neutral,
                RegularityRole::Neutral,
            ),
            &policy,
        );
        assert!(close(result.composite_score, 1.0));
        assert_eq!(result.dimensions[0].expected, "humean");
    }

    #[test]
    fn hyphenated_and_spaced_policy_values_match() {
        let policy: DoctrinePolicy = [
            ("law_kind".to_string(), "non-humean".to_string()),
            ("explanation_order".to_string(), "Laws First".to_string()),
        ]
        .into_iter()
        .collect();
        let result = align(
            &stance(
                LawKind::NonHumean,
                ExplanationOrder::LawsFirst,
                DnCommitment::Rejects,
                RegularityRole::Evidential,
            ),
            &policy,
        );
        assert!(close(result.composite_score, 1.0));
        assert!(result.conflicts.is_empty());
    }

    #[test]
    fn determining_a_dimension_never_raises_the_score() {
        let policy = DoctrinePolicy::default();
        let base = stance(
            LawKind::Unclear,
            ExplanationOrder::Unclear,
            DnCommitment::Neutral,
            RegularityRole::Neutral,
        );
        let before = align(&base, &policy).composite_score;
        for law_kind in [LawKind::Humean, LawKind::NonHumean] {
            let after = align(&StanceTokens { law_kind, ..base.clone() }, &policy).composite_score;
            assert!(after <= before);
        }
    }
}
