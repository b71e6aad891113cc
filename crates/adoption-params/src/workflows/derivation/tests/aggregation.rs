use super::common::*;
use crate::workflows::derivation::aggregate::{aggregate_deviation, aggregate_overlap};
use crate::workflows::derivation::bidirectional::{combine, combine_deviations, combine_overlaps};
use crate::workflows::derivation::domain::{
    DerivationError, DeviationScore, OverlapScore, RelationKey,
};
use crate::workflows::derivation::DirectionalScores;

fn three_party_parameters() -> crate::config::DerivationParameters {
    let mut parameters = parameters();
    parameters.stakeholders = vec![
        "users".to_string(),
        "makers".to_string(),
        "regulators".to_string(),
    ];
    parameters.countries = vec!["Netherlands".to_string()];
    for (stakeholder, partners) in [
        ("users", ["makers", "regulators"]),
        ("makers", ["users", "regulators"]),
        ("regulators", ["users", "makers"]),
    ] {
        let relations = parameters
            .relations
            .entry(stakeholder.to_string())
            .or_default();
        relations.partners = partners.iter().map(|partner| partner.to_string()).collect();
    }
    parameters
}

/// Directed standard deviations and overlaps, keyed (stakeholder, partner).
fn three_party_scores() -> DirectionalScores {
    let entries = [
        ("users", "makers", 0.1, 0.9),
        ("users", "regulators", 0.2, 0.8),
        ("makers", "users", 0.3, 0.7),
        ("makers", "regulators", 0.4, 0.6),
        ("regulators", "users", 0.5, 0.5),
        ("regulators", "makers", 0.6, 0.4),
    ];
    let mut scores = DirectionalScores::default();
    for (stakeholder, partner, sd, ratio) in entries {
        let key = RelationKey::new(stakeholder, "Netherlands", "wallet", partner);
        scores
            .deviations
            .insert(key.clone(), DeviationScore::from_variance(sd * sd));
        scores.overlaps.insert(key, OverlapScore { ratio });
    }
    scores
}

#[test]
fn bidirectional_deviation_averages_variances() {
    let combined = combine_deviations(
        DeviationScore::from_variance(0.0),
        DeviationScore::from_variance(0.25),
    );
    assert_close(combined.standard_deviation, 0.125_f64.sqrt());
    assert_close(combined.score, 1.0 - 0.125_f64.sqrt());

    // Averaging standard deviations would give 0.25 here.
    assert!((combined.standard_deviation - 0.25).abs() > 0.1);
}

#[test]
fn bidirectional_overlap_is_a_plain_mean() {
    let combined = combine_overlaps(OverlapScore { ratio: 1.0 }, OverlapScore { ratio: 0.25 });
    assert_close(combined.ratio, 0.625);
}

#[test]
fn combination_is_symmetric() {
    let a = DeviationScore::from_variance(0.09);
    let b = DeviationScore::from_variance(0.01);
    assert_eq!(combine_deviations(a, b), combine_deviations(b, a));
    let x = OverlapScore { ratio: 0.3 };
    let y = OverlapScore { ratio: 0.9 };
    assert_eq!(combine_overlaps(x, y), combine_overlaps(y, x));
}

#[test]
fn every_pair_is_combined_once_in_configured_order() {
    let parameters = three_party_parameters();
    let combined = combine(&parameters, &three_party_scores()).expect("combined");

    let pairs: Vec<_> = combined
        .deviations
        .iter()
        .map(|(key, _)| (key.first.as_str(), key.second.as_str()))
        .collect();
    assert_eq!(
        pairs,
        vec![
            ("users", "makers"),
            ("users", "regulators"),
            ("makers", "regulators"),
        ]
    );

    let users_makers = combined
        .deviation("Netherlands", "wallet", "makers", "users")
        .expect("pair in either order");
    assert_close(users_makers.standard_deviation, ((0.01 + 0.09) / 2.0_f64).sqrt());
    let makers_regulators = combined
        .overlap("Netherlands", "wallet", "makers", "regulators")
        .expect("pair");
    assert_close(makers_regulators.ratio, 0.5);
}

#[test]
fn missing_direction_is_reported() {
    let parameters = three_party_parameters();
    let mut scores = three_party_scores();
    scores
        .overlaps
        .remove(&RelationKey::new("regulators", "Netherlands", "wallet", "makers"));
    match combine(&parameters, &scores) {
        Err(DerivationError::MissingInput(detail)) => assert!(detail.contains("regulators")),
        other => panic!("expected missing input, got {other:?}"),
    }
}

#[test]
fn product_aggregate_pools_all_directed_relations() {
    let parameters = three_party_parameters();
    let scores = three_party_scores();

    let deviation =
        aggregate_deviation(&parameters, &scores, "Netherlands", "wallet").expect("deviation");
    let pooled: f64 = [0.1_f64, 0.2, 0.3, 0.4, 0.5, 0.6]
        .iter()
        .map(|sd| sd * sd)
        .sum();
    assert_close(deviation.standard_deviation, (pooled / 6.0).sqrt());
    assert_close(deviation.score, 1.0 - (pooled / 6.0).sqrt());

    let overlap =
        aggregate_overlap(&parameters, &scores, "Netherlands", "wallet").expect("overlap");
    assert_close(overlap.ratio, (0.9 + 0.8 + 0.7 + 0.6 + 0.5 + 0.4) / 6.0);
}

#[test]
fn aggregate_needs_two_stakeholders() {
    let mut parameters = parameters();
    parameters.stakeholders.truncate(1);
    let scores = DirectionalScores::default();

    assert!(matches!(
        aggregate_deviation(&parameters, &scores, "Netherlands", "wallet"),
        Err(DerivationError::DegenerateAggregate { found: 1 })
    ));
    assert!(matches!(
        aggregate_overlap(&parameters, &scores, "Netherlands", "wallet"),
        Err(DerivationError::DegenerateAggregate { found: 1 })
    ));
}
