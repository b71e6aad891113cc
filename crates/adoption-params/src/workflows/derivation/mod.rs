//! Survey-to-parameter derivation.
//!
//! A run walks the stakeholders in configured order. For each one it builds
//! relation profiles, scores them directionally and extracts adopt/leave
//! component scores. Once every stakeholder is done, the directional scores
//! are combined into symmetric pair scores and per-product aggregates. All
//! tables are computed before the first one is written, so a failed run
//! leaves the sink untouched.

pub mod aggregate;
pub mod bidirectional;
pub mod components;
pub mod domain;
pub mod intention;
pub mod relations;
pub mod scoring;

#[cfg(test)]
mod tests;

pub use aggregate::ProductScores;
pub use bidirectional::BidirectionalScores;
pub use domain::{
    AdoptLeaveScore, ComponentKey, DerivationError, DeviationScore, OverlapScore, PairKey,
    ProductKey, RelationKey, RelationKind, RelationProfile, RelationShare, RelationVector,
};

use crate::config::{DerivationParameters, ALWAYS_COMPONENT, RELATION_COMPONENT_PREFIX};
use crate::workflows::answers::AnswerStore;
use crate::workflows::tables::{Table, TableKey, TableSink};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

/// One-directional relation scores of every stakeholder towards each partner.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DirectionalScores {
    pub deviations: BTreeMap<RelationKey, DeviationScore>,
    pub overlaps: BTreeMap<RelationKey, OverlapScore>,
}

impl DirectionalScores {
    pub fn deviation(&self, key: &RelationKey) -> Result<DeviationScore, DerivationError> {
        self.deviations
            .get(key)
            .copied()
            .ok_or_else(|| DerivationError::MissingInput(format!("deviation score of {key}")))
    }

    pub fn overlap(&self, key: &RelationKey) -> Result<OverlapScore, DerivationError> {
        self.overlaps
            .get(key)
            .copied()
            .ok_or_else(|| DerivationError::MissingInput(format!("overlap score of {key}")))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableSummary {
    pub name: String,
    pub rows: usize,
}

/// What a run wrote, in write order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DerivationSummary {
    pub generated_at: DateTime<Utc>,
    pub group: String,
    pub stakeholders: usize,
    pub countries: usize,
    pub products: usize,
    pub tables: Vec<TableSummary>,
}

/// Everything a run computed. Tables are kept for callers that render them
/// directly instead of reading them back from the sink.
#[derive(Debug, Clone)]
pub struct DerivationOutcome {
    pub components: BTreeMap<ComponentKey, AdoptLeaveScore>,
    pub profiles: Vec<RelationProfile>,
    pub directional: DirectionalScores,
    pub bidirectional: BidirectionalScores,
    pub products: ProductScores,
    pub tables: Vec<Table>,
    pub summary: DerivationSummary,
}

impl DerivationOutcome {
    pub fn adopt_leave(&self, key: &ComponentKey) -> Option<AdoptLeaveScore> {
        self.components.get(key).copied()
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|table| table.name == name)
    }
}

/// Runs the full derivation against an answer store and writes the results
/// into a table sink.
pub struct SurveyDerivation<S: ?Sized, K: ?Sized> {
    parameters: Arc<DerivationParameters>,
    store: Arc<S>,
    sink: Arc<K>,
}

impl<S, K> SurveyDerivation<S, K>
where
    S: AnswerStore + ?Sized,
    K: TableSink + ?Sized,
{
    pub fn new(parameters: Arc<DerivationParameters>, store: Arc<S>, sink: Arc<K>) -> Self {
        Self {
            parameters,
            store,
            sink,
        }
    }

    pub fn parameters(&self) -> &DerivationParameters {
        &self.parameters
    }

    pub fn run(&self) -> Result<DerivationOutcome, DerivationError> {
        let parameters = self.parameters.as_ref();
        parameters.validate()?;
        info!(
            stakeholders = parameters.stakeholders.len(),
            products = parameters.products.len(),
            countries = parameters.countries.len(),
            use_overlap = parameters.relation_definitions.use_overlap,
            "starting survey derivation"
        );

        let mut tables = Vec::new();
        let mut components = BTreeMap::new();
        let mut profiles = Vec::new();
        let mut directional = DirectionalScores::default();

        for stakeholder in &parameters.stakeholders {
            let relation_tables =
                self.derive_relations(stakeholder, &mut profiles, &mut directional)?;
            tables.extend(relation_tables);

            let scores = self.derive_components(stakeholder, &directional)?;
            tables.push(component_table(
                TableKey::StakeholderComponentScores { stakeholder }.name(parameters),
                &scores,
                false,
            ));
            info!(stakeholder = %stakeholder, components = scores.len(), "stakeholder derived");
            components.extend(scores);
        }

        tables.push(component_table(
            TableKey::ComponentScores.name(parameters),
            &components,
            true,
        ));
        tables.extend(intention::intention_weight_tables(parameters)?);
        tables.extend(intention::initial_yes_tables(parameters));

        let bidirectional = bidirectional::combine(parameters, &directional)?;
        let products = aggregate::aggregate(parameters, &directional)?;
        tables.push(bidirectional::deviation_table(parameters, &bidirectional));
        tables.push(aggregate::deviation_table(parameters, &products));
        tables.push(bidirectional::overlap_table(parameters, &bidirectional));
        tables.push(aggregate::overlap_table(parameters, &products));

        let mut written = Vec::with_capacity(tables.len());
        for table in &tables {
            self.sink.save_table(table)?;
            info!(table = %table.name, rows = table.len(), "table saved");
            written.push(TableSummary {
                name: table.name.clone(),
                rows: table.len(),
            });
        }

        let summary = DerivationSummary {
            generated_at: Utc::now(),
            group: parameters.files.groupfile_name.clone(),
            stakeholders: parameters.stakeholders.len(),
            countries: parameters.countries.len(),
            products: parameters.products.len(),
            tables: written,
        };
        info!(tables = summary.tables.len(), "survey derivation finished");

        Ok(DerivationOutcome {
            components,
            profiles,
            directional,
            bidirectional,
            products,
            tables,
            summary,
        })
    }

    /// Builds, scores and tabulates every relation of one stakeholder.
    fn derive_relations(
        &self,
        stakeholder: &str,
        profiles: &mut Vec<RelationProfile>,
        directional: &mut DirectionalScores,
    ) -> Result<Vec<Table>, DerivationError> {
        let parameters = self.parameters.as_ref();
        let definitions = &parameters.relation_definitions;
        let mut tables = Vec::new();

        for partner in parameters.partners_of(stakeholder) {
            for product in &parameters.products {
                let mut by_country = Vec::with_capacity(parameters.countries.len());
                for country in &parameters.countries {
                    let key = RelationKey::new(stakeholder, country, product, partner);
                    let profile = relations::build_profile(self.store.as_ref(), parameters, key)?;
                    directional
                        .deviations
                        .insert(profile.key.clone(), scoring::deviation(&profile)?);
                    directional
                        .overlaps
                        .insert(profile.key.clone(), scoring::overlap(&profile)?);
                    by_country.push(profile);
                }
                tables.extend(relations::profile_table(parameters, &by_country));
                profiles.extend(by_country);
            }
        }

        let [sd_column, score_column] = &definitions.deviations_columns;
        let mut deviations = Table::new(
            TableKey::Deviations { stakeholder }.name(parameters),
            ["Country", "Product", "Partner"],
            [sd_column.as_str(), score_column.as_str()],
        );
        let mut overlaps = Table::new(
            TableKey::Overlap { stakeholder }.name(parameters),
            ["Country", "Product", "Partner"],
            [definitions.overlap_column.as_str()],
        );
        for country in &parameters.countries {
            for product in &parameters.products {
                for partner in parameters.partners_of(stakeholder) {
                    let key = RelationKey::new(stakeholder, country, product, partner);
                    let index = vec![country.clone(), product.clone(), partner.clone()];
                    let deviation = directional.deviation(&key)?;
                    deviations.push_row(
                        index.clone(),
                        vec![deviation.standard_deviation, deviation.score],
                    );
                    overlaps.push_row(index, vec![directional.overlap(&key)?.ratio]);
                }
            }
        }
        tables.push(deviations);
        tables.push(overlaps);
        Ok(tables)
    }

    /// Survey components, relation components and the constant `one`
    /// component of one stakeholder.
    fn derive_components(
        &self,
        stakeholder: &str,
        directional: &DirectionalScores,
    ) -> Result<BTreeMap<ComponentKey, AdoptLeaveScore>, DerivationError> {
        let parameters = self.parameters.as_ref();
        let use_overlap = parameters.relation_definitions.use_overlap;
        let mut scores = BTreeMap::new();

        for country in &parameters.countries {
            for product in &parameters.products {
                let specs = parameters.components_for(stakeholder, product).ok_or_else(|| {
                    DerivationError::MissingInput(format!(
                        "components of stakeholder '{stakeholder}' for product '{product}'"
                    ))
                })?;
                for (component, spec) in specs {
                    let key = ComponentKey::new(country, product, stakeholder, component);
                    let score = components::component_score(self.store.as_ref(), &key, spec)?;
                    scores.insert(key, score);
                }

                for partner in parameters.partners_of(stakeholder) {
                    let relation = RelationKey::new(stakeholder, country, product, partner);
                    let relation_score = if use_overlap {
                        directional.overlap(&relation)?.ratio
                    } else {
                        directional.deviation(&relation)?.score
                    };
                    let component = format!("{RELATION_COMPONENT_PREFIX}{partner}");
                    scores.insert(
                        ComponentKey::new(country, product, stakeholder, &component),
                        AdoptLeaveScore::from_relation_score(relation_score),
                    );
                }

                scores.insert(
                    ComponentKey::new(country, product, stakeholder, ALWAYS_COMPONENT),
                    AdoptLeaveScore::ALWAYS,
                );
            }
        }

        Ok(scores)
    }
}

/// Adopt/leave table in key order. The composite table keeps the stakeholder
/// in its index; per-stakeholder tables drop it.
fn component_table(
    name: String,
    scores: &BTreeMap<ComponentKey, AdoptLeaveScore>,
    with_stakeholder: bool,
) -> Table {
    let index_columns: &[&str] = if with_stakeholder {
        &["Country", "Product", "Stakeholder", "Component"]
    } else {
        &["Country", "Product", "Component"]
    };
    let mut table = Table::new(name, index_columns.iter().copied(), ["Adopt", "Leave"]);

    for (key, score) in scores {
        let mut index = vec![key.country.clone(), key.product.clone()];
        if with_stakeholder {
            index.push(key.stakeholder.clone());
        }
        index.push(key.component.clone());
        table.push_row(index, vec![score.adopt, score.leave]);
    }
    table
}
