use crate::config::ParametersError;
use crate::workflows::answers::{DistributionError, StoreError};
use serde::Serialize;
use std::fmt;

/// Identifies one adopt/leave score. Field order gives the composite table's
/// sort order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ComponentKey {
    pub country: String,
    pub product: String,
    pub stakeholder: String,
    pub component: String,
}

impl ComponentKey {
    pub fn new(country: &str, product: &str, stakeholder: &str, component: &str) -> Self {
        Self {
            country: country.to_string(),
            product: product.to_string(),
            stakeholder: stakeholder.to_string(),
            component: component.to_string(),
        }
    }
}

impl fmt::Display for ComponentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}",
            self.stakeholder, self.product, self.component, self.country
        )
    }
}

/// One stakeholder's view of one partner, for a country and product.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct RelationKey {
    pub stakeholder: String,
    pub country: String,
    pub product: String,
    pub partner: String,
}

impl RelationKey {
    pub fn new(stakeholder: &str, country: &str, product: &str, partner: &str) -> Self {
        Self {
            stakeholder: stakeholder.to_string(),
            country: country.to_string(),
            product: product.to_string(),
            partner: partner.to_string(),
        }
    }
}

impl fmt::Display for RelationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} towards {} ({}, {})",
            self.stakeholder, self.partner, self.product, self.country
        )
    }
}

/// An unordered stakeholder pair, stored in canonical (configuration) order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct PairKey {
    pub country: String,
    pub product: String,
    pub first: String,
    pub second: String,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ProductKey {
    pub country: String,
    pub product: String,
}

/// Adoption and abandonment propensities. The two are independent ratios and
/// need not sum to one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AdoptLeaveScore {
    pub adopt: f64,
    pub leave: f64,
}

impl AdoptLeaveScore {
    /// Value of the synthetic "one" component.
    pub const ALWAYS: Self = Self {
        adopt: 1.0,
        leave: 1.0,
    };

    pub fn from_relation_score(score: f64) -> Self {
        Self {
            adopt: score,
            leave: 1.0 - score,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    Perceived,
    Ideal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelationShare {
    pub name: String,
    pub share: f64,
}

/// Shares of each relationship type, normalized by the grand total of the
/// distribution they came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelationVector {
    pub kind: RelationKind,
    pub shares: Vec<RelationShare>,
}

impl RelationVector {
    pub fn new(kind: RelationKind, shares: Vec<RelationShare>) -> Self {
        Self { kind, shares }
    }

    pub fn from_pairs<'a>(
        kind: RelationKind,
        pairs: impl IntoIterator<Item = (&'a str, f64)>,
    ) -> Self {
        let shares = pairs
            .into_iter()
            .map(|(name, share)| RelationShare {
                name: name.to_string(),
                share,
            })
            .collect();
        Self { kind, shares }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.shares.iter().map(|share| share.name.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.shares.iter().map(|share| share.share)
    }
}

/// Perceived and ideal vectors describing one directional relationship.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelationProfile {
    pub key: RelationKey,
    pub perceived: RelationVector,
    pub ideal: RelationVector,
}

impl RelationProfile {
    /// Same profile with the perceived and ideal roles exchanged.
    pub fn swapped(&self) -> Self {
        Self {
            key: self.key.clone(),
            perceived: RelationVector::new(RelationKind::Perceived, self.ideal.shares.clone()),
            ideal: RelationVector::new(RelationKind::Ideal, self.perceived.shares.clone()),
        }
    }
}

/// Spread between perceived and ideal shares, with `score = 1 - standard_deviation`.
///
/// The score is not clamped; it goes negative when the deviation exceeds one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DeviationScore {
    pub standard_deviation: f64,
    pub score: f64,
}

impl DeviationScore {
    pub fn from_variance(variance: f64) -> Self {
        let standard_deviation = variance.sqrt();
        Self {
            standard_deviation,
            score: 1.0 - standard_deviation,
        }
    }

    pub fn variance(&self) -> f64 {
        self.standard_deviation * self.standard_deviation
    }
}

/// Mean per-category ratio of the smaller to the larger share.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OverlapScore {
    pub ratio: f64,
}

#[derive(Debug, thiserror::Error)]
pub enum DerivationError {
    #[error(transparent)]
    Parameters(#[from] ParametersError),
    #[error("answer store failure: {0}")]
    Store(#[from] StoreError),
    #[error("answer levels out of range: {0}")]
    Distribution(#[from] DistributionError),
    #[error("missing input: {0}")]
    MissingInput(String),
    #[error("respondent total is zero for {context}")]
    ZeroTotal { context: String },
    #[error("perceived and ideal profiles of {key} do not line up: {detail}")]
    ShapeMismatch { key: RelationKey, detail: String },
    #[error("relation profile of {key} has no categories")]
    NoCategories { key: RelationKey },
    #[error("product aggregation needs at least two stakeholders, found {found}")]
    DegenerateAggregate { found: usize },
}
