use super::domain::{
    DerivationError, RelationKey, RelationKind, RelationProfile, RelationVector,
};
use crate::config::DerivationParameters;
use crate::workflows::answers::{AnswerDistribution, AnswerStore};
use crate::workflows::tables::{Table, TableKey};

/// Response codes of the perceived and ideal questions for one relation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationCodes {
    pub perceived: String,
    pub ideal: String,
}

/// Resolves the response codes a stakeholder answered about `partner`.
pub fn partner_codes(
    parameters: &DerivationParameters,
    stakeholder: &str,
    product: &str,
    partner: &str,
) -> Result<RelationCodes, DerivationError> {
    let relations = parameters.relations.get(stakeholder).ok_or_else(|| {
        DerivationError::MissingInput(format!("relations of stakeholder '{stakeholder}'"))
    })?;
    let position = relations
        .partners
        .iter()
        .position(|candidate| candidate == partner)
        .ok_or_else(|| {
            DerivationError::MissingInput(format!(
                "partner '{partner}' of stakeholder '{stakeholder}'"
            ))
        })?;
    let codes = relations.products.get(product).ok_or_else(|| {
        DerivationError::MissingInput(format!(
            "relation codes of '{stakeholder}' for product '{product}'"
        ))
    })?;

    let missing = || {
        DerivationError::MissingInput(format!(
            "relation code {position} of '{stakeholder}' for product '{product}'"
        ))
    };
    let perceived = codes.perceived_codes.get(position).ok_or_else(missing)?;
    let ideal = codes.ideal_codes.get(position).ok_or_else(missing)?;

    Ok(RelationCodes {
        perceived: format!("{stakeholder}_{perceived}"),
        ideal: format!("{stakeholder}_{ideal}"),
    })
}

/// Fetches both distributions and normalizes each by its own grand total.
pub fn build_profile<S: AnswerStore + ?Sized>(
    store: &S,
    parameters: &DerivationParameters,
    key: RelationKey,
) -> Result<RelationProfile, DerivationError> {
    let codes = partner_codes(parameters, &key.stakeholder, &key.product, &key.partner)?;
    let perceived = store.fetch_distribution(&codes.perceived, &key.country)?;
    let ideal = store.fetch_distribution(&codes.ideal, &key.country)?;

    check_alignment(&key, &perceived, &ideal)?;

    let perceived = normalize(&key, RelationKind::Perceived, &perceived)?;
    let ideal = normalize(&key, RelationKind::Ideal, &ideal)?;
    if perceived.shares.is_empty() {
        return Err(DerivationError::NoCategories { key });
    }

    Ok(RelationProfile {
        key,
        perceived,
        ideal,
    })
}

fn check_alignment(
    key: &RelationKey,
    perceived: &AnswerDistribution,
    ideal: &AnswerDistribution,
) -> Result<(), DerivationError> {
    if perceived.len() != ideal.len() {
        return Err(DerivationError::ShapeMismatch {
            key: key.clone(),
            detail: format!(
                "'{}' has {} cells but '{}' has {}",
                perceived.response_code(),
                perceived.len(),
                ideal.response_code(),
                ideal.len()
            ),
        });
    }

    let body = perceived.len().saturating_sub(1);
    let labels = perceived.levels().iter().zip(ideal.levels()).take(body);
    for (position, (left, right)) in labels.enumerate() {
        if left != right {
            return Err(DerivationError::ShapeMismatch {
                key: key.clone(),
                detail: format!(
                    "category {position} is '{left}' in '{}' but '{right}' in '{}'",
                    perceived.response_code(),
                    ideal.response_code()
                ),
            });
        }
    }
    Ok(())
}

fn normalize(
    key: &RelationKey,
    kind: RelationKind,
    distribution: &AnswerDistribution,
) -> Result<RelationVector, DerivationError> {
    let total = distribution.grand_total()?;
    if total == 0.0 {
        return Err(DerivationError::ZeroTotal {
            context: format!("'{}' in relation {key}", distribution.response_code()),
        });
    }
    let categories = distribution.categories()?;
    Ok(RelationVector::from_pairs(
        kind,
        categories.into_iter().map(|(name, count)| (name, count / total)),
    ))
}

/// One table per (stakeholder, partner, product), one row pair per country.
///
/// Profiles must share the same relation key apart from the country.
pub fn profile_table(
    parameters: &DerivationParameters,
    profiles: &[RelationProfile],
) -> Option<Table> {
    let first = profiles.first()?;
    let [perceived_label, ideal_label] = &parameters.relation_definitions.relation_types;

    let name = TableKey::RelationProfile {
        stakeholder: &first.key.stakeholder,
        partner: &first.key.partner,
        product: &first.key.product,
    }
    .name(parameters);
    let mut table = Table::new(
        name,
        ["Country", "Relation type"],
        first.perceived.names(),
    );

    for profile in profiles {
        table.push_row(
            vec![profile.key.country.clone(), perceived_label.clone()],
            profile.perceived.values().collect(),
        );
        table.push_row(
            vec![profile.key.country.clone(), ideal_label.clone()],
            profile.ideal.values().collect(),
        );
    }
    Some(table)
}
