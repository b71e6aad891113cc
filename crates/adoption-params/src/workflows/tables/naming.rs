use crate::config::DerivationParameters;

/// Typed identity of every table a derivation run writes.
///
/// [`TableKey::name`] is the only place table-name strings are assembled, and
/// it reproduces the names downstream readers already expect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKey<'a> {
    /// Adopt/leave scores for every stakeholder, indexed by
    /// (Country, Product, Stakeholder, Component).
    ComponentScores,
    /// Adopt/leave scores of a single stakeholder.
    StakeholderComponentScores { stakeholder: &'a str },
    RelationProfile {
        stakeholder: &'a str,
        partner: &'a str,
        product: &'a str,
    },
    Deviations { stakeholder: &'a str },
    Overlap { stakeholder: &'a str },
    BidirectionalDeviations,
    BidirectionalOverlap,
    ProductDeviations,
    ProductOverlap,
    IntentionWeights { product: &'a str },
    InitialYes { product: &'a str },
}

impl TableKey<'_> {
    pub fn name(&self, parameters: &DerivationParameters) -> String {
        let relations = &parameters.relation_definitions;
        let survey_topics = &parameters.files.survey_topics_table_name;

        match *self {
            TableKey::ComponentScores => survey_topics.clone(),
            TableKey::StakeholderComponentScores { stakeholder } => {
                format!("{stakeholder}_{survey_topics}")
            }
            TableKey::RelationProfile {
                stakeholder,
                partner,
                product,
            } => format!(
                "{stakeholder}_{}_with_{partner}_for_{product}",
                relations.table_name
            ),
            TableKey::Deviations { stakeholder } => {
                format!("{stakeholder}_{}", relations.deviations_table)
            }
            TableKey::Overlap { stakeholder } => {
                format!("{stakeholder}_{}", relations.overlap_table)
            }
            TableKey::BidirectionalDeviations => relations.bidirectional_deviations_table.clone(),
            TableKey::BidirectionalOverlap => relations.bidirectional_overlap_table.clone(),
            TableKey::ProductDeviations => relations.product_deviations_table.clone(),
            TableKey::ProductOverlap => relations.product_overlap_table.clone(),
            TableKey::IntentionWeights { product } => format!("Intention Weights {product}"),
            TableKey::InitialYes { product } => format!("Initial Yes {product}"),
        }
    }
}

/// Pair cell used by the bidirectional tables, e.g. `('users', 'makers')`.
pub fn pair_label(first: &str, second: &str) -> String {
    format!("('{first}', '{second}')")
}
