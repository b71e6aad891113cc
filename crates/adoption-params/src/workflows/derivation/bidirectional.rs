use super::domain::{DerivationError, DeviationScore, OverlapScore, PairKey, RelationKey};
use super::DirectionalScores;
use crate::config::DerivationParameters;
use crate::workflows::tables::{pair_label, Table, TableKey};

/// Every unordered stakeholder pair exactly once, each stakeholder paired with
/// those configured after it.
pub fn stakeholder_pairs(stakeholders: &[String]) -> Vec<(&str, &str)> {
    stakeholders
        .iter()
        .enumerate()
        .flat_map(|(position, first)| {
            stakeholders[position + 1..]
                .iter()
                .map(move |second| (first.as_str(), second.as_str()))
        })
        .collect()
}

/// Averages the two directional variances before taking the square root.
pub fn combine_deviations(forward: DeviationScore, backward: DeviationScore) -> DeviationScore {
    DeviationScore::from_variance((forward.variance() + backward.variance()) / 2.0)
}

pub fn combine_overlaps(forward: OverlapScore, backward: OverlapScore) -> OverlapScore {
    OverlapScore {
        ratio: (forward.ratio + backward.ratio) / 2.0,
    }
}

/// Symmetric scores for every (country, product, pair), in that nested order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BidirectionalScores {
    pub deviations: Vec<(PairKey, DeviationScore)>,
    pub overlaps: Vec<(PairKey, OverlapScore)>,
}

impl BidirectionalScores {
    /// Looks a pair up in either order.
    pub fn deviation(
        &self,
        country: &str,
        product: &str,
        first: &str,
        second: &str,
    ) -> Option<DeviationScore> {
        find_pair(&self.deviations, country, product, first, second)
    }

    pub fn overlap(
        &self,
        country: &str,
        product: &str,
        first: &str,
        second: &str,
    ) -> Option<OverlapScore> {
        find_pair(&self.overlaps, country, product, first, second)
    }
}

fn find_pair<T: Copy>(
    entries: &[(PairKey, T)],
    country: &str,
    product: &str,
    first: &str,
    second: &str,
) -> Option<T> {
    entries
        .iter()
        .find(|(key, _)| {
            key.country == country
                && key.product == product
                && ((key.first == first && key.second == second)
                    || (key.first == second && key.second == first))
        })
        .map(|(_, score)| *score)
}

pub fn combine(
    parameters: &DerivationParameters,
    directional: &DirectionalScores,
) -> Result<BidirectionalScores, DerivationError> {
    let pairs = stakeholder_pairs(&parameters.stakeholders);
    let mut combined = BidirectionalScores::default();

    for country in &parameters.countries {
        for product in &parameters.products {
            for &(first, second) in &pairs {
                let forward = RelationKey::new(first, country, product, second);
                let backward = RelationKey::new(second, country, product, first);
                let key = PairKey {
                    country: country.clone(),
                    product: product.clone(),
                    first: first.to_string(),
                    second: second.to_string(),
                };

                combined.deviations.push((
                    key.clone(),
                    combine_deviations(
                        directional.deviation(&forward)?,
                        directional.deviation(&backward)?,
                    ),
                ));
                combined.overlaps.push((
                    key,
                    combine_overlaps(
                        directional.overlap(&forward)?,
                        directional.overlap(&backward)?,
                    ),
                ));
            }
        }
    }

    Ok(combined)
}

pub fn deviation_table(parameters: &DerivationParameters, scores: &BidirectionalScores) -> Table {
    let [sd_column, score_column] = &parameters.relation_definitions.deviations_columns;
    let mut table = Table::new(
        TableKey::BidirectionalDeviations.name(parameters),
        ["Country", "Product", "Pair"],
        [sd_column.as_str(), score_column.as_str()],
    );
    for (key, score) in &scores.deviations {
        table.push_row(pair_index(key), vec![score.standard_deviation, score.score]);
    }
    table
}

pub fn overlap_table(parameters: &DerivationParameters, scores: &BidirectionalScores) -> Table {
    let mut table = Table::new(
        TableKey::BidirectionalOverlap.name(parameters),
        ["Country", "Product", "Pair"],
        [parameters.relation_definitions.overlap_column.as_str()],
    );
    for (key, score) in &scores.overlaps {
        table.push_row(pair_index(key), vec![score.ratio]);
    }
    table
}

fn pair_index(key: &PairKey) -> Vec<String> {
    vec![
        key.country.clone(),
        key.product.clone(),
        pair_label(&key.first, &key.second),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pairs_follow_configured_order_without_repeats() {
        let stakeholders: Vec<String> = ["users", "makers", "regulators"]
            .iter()
            .map(|name| name.to_string())
            .collect();
        assert_eq!(
            stakeholder_pairs(&stakeholders),
            vec![
                ("users", "makers"),
                ("users", "regulators"),
                ("makers", "regulators"),
            ]
        );
        assert!(stakeholder_pairs(&stakeholders[..1]).is_empty());
    }
}
