use super::domain::{DerivationError, DeviationScore, OverlapScore, ProductKey, RelationKey};
use super::DirectionalScores;
use crate::config::DerivationParameters;
use crate::workflows::tables::{Table, TableKey};
use tracing::debug;

/// One summary score per (country, product), keyed in configured order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductScores {
    pub deviations: Vec<(ProductKey, DeviationScore)>,
    pub overlaps: Vec<(ProductKey, OverlapScore)>,
}

impl ProductScores {
    pub fn deviation(&self, country: &str, product: &str) -> Option<DeviationScore> {
        self.deviations
            .iter()
            .find(|(key, _)| key.country == country && key.product == product)
            .map(|(_, score)| *score)
    }

    pub fn overlap(&self, country: &str, product: &str) -> Option<OverlapScore> {
        self.overlaps
            .iter()
            .find(|(key, _)| key.country == country && key.product == product)
            .map(|(_, score)| *score)
    }
}

/// Number of directed relations among `stakeholders` participants.
fn directed_relations(stakeholders: usize) -> Result<f64, DerivationError> {
    if stakeholders < 2 {
        return Err(DerivationError::DegenerateAggregate {
            found: stakeholders,
        });
    }
    Ok((stakeholders * (stakeholders - 1)) as f64)
}

/// Pools every directed variance of the product, so each unordered pair
/// contributes once per direction.
pub fn aggregate_deviation(
    parameters: &DerivationParameters,
    directional: &DirectionalScores,
    country: &str,
    product: &str,
) -> Result<DeviationScore, DerivationError> {
    let denominator = directed_relations(parameters.stakeholders.len())?;
    let mut pooled = 0.0;
    for key in directed_keys(parameters, country, product) {
        pooled += directional.deviation(&key)?.variance();
    }
    Ok(DeviationScore::from_variance(pooled / denominator))
}

pub fn aggregate_overlap(
    parameters: &DerivationParameters,
    directional: &DirectionalScores,
    country: &str,
    product: &str,
) -> Result<OverlapScore, DerivationError> {
    let denominator = directed_relations(parameters.stakeholders.len())?;
    let mut total = 0.0;
    for key in directed_keys(parameters, country, product) {
        total += directional.overlap(&key)?.ratio;
    }
    Ok(OverlapScore {
        ratio: total / denominator,
    })
}

pub fn aggregate(
    parameters: &DerivationParameters,
    directional: &DirectionalScores,
) -> Result<ProductScores, DerivationError> {
    let mut scores = ProductScores::default();
    for country in &parameters.countries {
        for product in &parameters.products {
            let deviation = aggregate_deviation(parameters, directional, country, product)?;
            let overlap = aggregate_overlap(parameters, directional, country, product)?;
            debug!(
                country = %country,
                product = %product,
                relation_score = deviation.score,
                overlap = overlap.ratio,
                "product aggregate"
            );

            let key = ProductKey {
                country: country.clone(),
                product: product.clone(),
            };
            scores.deviations.push((key.clone(), deviation));
            scores.overlaps.push((key, overlap));
        }
    }
    Ok(scores)
}

fn directed_keys<'a>(
    parameters: &'a DerivationParameters,
    country: &'a str,
    product: &'a str,
) -> impl Iterator<Item = RelationKey> + 'a {
    parameters.stakeholders.iter().flat_map(move |stakeholder| {
        parameters
            .partners_of(stakeholder)
            .iter()
            .map(move |partner| RelationKey::new(stakeholder, country, product, partner))
    })
}

pub fn deviation_table(parameters: &DerivationParameters, scores: &ProductScores) -> Table {
    let [sd_column, score_column] = &parameters.relation_definitions.deviations_columns;
    let mut table = Table::new(
        TableKey::ProductDeviations.name(parameters),
        ["Country", "Product"],
        [sd_column.as_str(), score_column.as_str()],
    );
    for (key, score) in &scores.deviations {
        table.push_row(
            vec![key.country.clone(), key.product.clone()],
            vec![score.standard_deviation, score.score],
        );
    }
    table
}

pub fn overlap_table(parameters: &DerivationParameters, scores: &ProductScores) -> Table {
    let mut table = Table::new(
        TableKey::ProductOverlap.name(parameters),
        ["Country", "Product"],
        [parameters.relation_definitions.overlap_column.as_str()],
    );
    for (key, score) in &scores.overlaps {
        table.push_row(vec![key.country.clone(), key.product.clone()], vec![score.ratio]);
    }
    table
}
