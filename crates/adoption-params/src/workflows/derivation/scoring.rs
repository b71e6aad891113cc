use super::domain::{DerivationError, DeviationScore, OverlapScore, RelationProfile};
use tracing::{debug, warn};

/// Mean squared share difference, reported as its square root and `1 - sd`.
pub fn deviation(profile: &RelationProfile) -> Result<DeviationScore, DerivationError> {
    let pairs = aligned_shares(profile)?;
    let count = pairs.len() as f64;
    let variance = pairs
        .iter()
        .map(|(perceived, ideal)| (perceived - ideal).powi(2))
        .sum::<f64>()
        / count;

    let score = DeviationScore::from_variance(variance);
    debug!(
        key = %profile.key,
        standard_deviation = score.standard_deviation,
        score = score.score,
        "deviation score"
    );
    Ok(score)
}

/// Mean of the per-category overlap ratios.
pub fn overlap(profile: &RelationProfile) -> Result<OverlapScore, DerivationError> {
    let pairs = aligned_shares(profile)?;
    let count = pairs.len() as f64;

    let mut total = 0.0;
    for (perceived, ideal) in pairs {
        if ideal == 0.0 && perceived != 0.0 {
            warn!(
                key = %profile.key,
                perceived,
                "ideal share is zero; counting category overlap as 0"
            );
        }
        total += category_overlap(perceived, ideal);
    }

    let score = OverlapScore {
        ratio: total / count,
    };
    debug!(key = %profile.key, ratio = score.ratio, "overlap score");
    Ok(score)
}

/// Smaller share over larger share, or 0 when the ideal share is 0.
pub fn category_overlap(perceived: f64, ideal: f64) -> f64 {
    if ideal == 0.0 {
        return 0.0;
    }
    let ratio = perceived / ideal;
    if ratio > 1.0 {
        1.0 / ratio
    } else {
        ratio
    }
}

fn aligned_shares(profile: &RelationProfile) -> Result<Vec<(f64, f64)>, DerivationError> {
    let perceived = &profile.perceived.shares;
    let ideal = &profile.ideal.shares;

    if perceived.is_empty() && ideal.is_empty() {
        return Err(DerivationError::NoCategories {
            key: profile.key.clone(),
        });
    }
    if perceived.len() != ideal.len() {
        return Err(DerivationError::ShapeMismatch {
            key: profile.key.clone(),
            detail: format!(
                "{} perceived categories against {} ideal",
                perceived.len(),
                ideal.len()
            ),
        });
    }

    perceived
        .iter()
        .zip(ideal)
        .map(|(left, right)| {
            if left.name == right.name {
                Ok((left.share, right.share))
            } else {
                Err(DerivationError::ShapeMismatch {
                    key: profile.key.clone(),
                    detail: format!("category '{}' paired with '{}'", left.name, right.name),
                })
            }
        })
        .collect()
}
