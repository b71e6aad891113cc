use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

/// Immutable description of one derivation run, loaded from TOML.
///
/// Stakeholder order is significant: it fixes the canonical order of
/// unordered stakeholder pairs in the bidirectional tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivationParameters {
    pub stakeholders: Vec<String>,
    pub products: Vec<String>,
    pub countries: Vec<String>,
    #[serde(default = "default_initial_yes")]
    pub initial_yes: f64,
    #[serde(default)]
    pub files: FileSettings,
    #[serde(default)]
    pub relation_definitions: RelationDefinitions,
    /// stakeholder -> product -> component name -> spec
    #[serde(default)]
    pub components: BTreeMap<String, BTreeMap<String, BTreeMap<String, ComponentSpec>>>,
    #[serde(default)]
    pub relations: BTreeMap<String, StakeholderRelations>,
    #[serde(default)]
    pub intention: BTreeMap<String, Vec<IntentionCategory>>,
}

/// Synthetic component whose adopt and leave values are both fixed at 1.
pub const ALWAYS_COMPONENT: &str = "one";
/// Prefix of the components fed by relation scores, followed by the partner.
pub const RELATION_COMPONENT_PREFIX: &str = "relation_score_";

fn default_initial_yes() -> f64 {
    0.5
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileSettings {
    pub output_folder: PathBuf,
    pub groupfile_name: String,
    pub survey_topics_table_name: String,
}

impl Default for FileSettings {
    fn default() -> Self {
        Self {
            output_folder: PathBuf::from("output"),
            groupfile_name: "adoption_params".to_string(),
            survey_topics_table_name: "survey_topics".to_string(),
        }
    }
}

/// Names and switches for the relational part of the derivation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelationDefinitions {
    /// Feed overlap ratios (instead of deviation scores) into the
    /// `relation_score_{partner}` adopt/leave components.
    pub use_overlap: bool,
    pub table_name: String,
    /// Labels for the perceived and ideal rows of a relation profile table.
    pub relation_types: [String; 2],
    pub deviations_table: String,
    /// Labels for the standard deviation and relation score columns.
    pub deviations_columns: [String; 2],
    pub overlap_table: String,
    pub overlap_column: String,
    pub bidirectional_deviations_table: String,
    pub bidirectional_overlap_table: String,
    pub product_deviations_table: String,
    pub product_overlap_table: String,
}

impl Default for RelationDefinitions {
    fn default() -> Self {
        Self {
            use_overlap: false,
            table_name: "relations".to_string(),
            relation_types: ["perceived".to_string(), "ideal".to_string()],
            deviations_table: "relation_deviations".to_string(),
            deviations_columns: [
                "Standard deviation".to_string(),
                "Relation score".to_string(),
            ],
            overlap_table: "relation_overlap".to_string(),
            overlap_column: "Overlap".to_string(),
            bidirectional_deviations_table: "bidirectional_relation_deviations".to_string(),
            bidirectional_overlap_table: "bidirectional_relation_overlap".to_string(),
            product_deviations_table: "product_relation_deviations".to_string(),
            product_overlap_table: "product_relation_overlap".to_string(),
        }
    }
}

/// How one logical component is assembled from raw response codes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentSpec {
    pub sub_codes: Vec<SubCodeSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubCodeSpec {
    pub prefix: String,
    #[serde(default)]
    pub midfix: String,
    #[serde(default)]
    pub suffix: String,
    /// Number of highest answer levels counted as the top band.
    pub top_levels: usize,
    /// Number of lowest answer levels counted as the bottom band.
    pub bottom_levels: usize,
    /// Number of ordinal answer levels in the distribution.
    pub answer_length: usize,
    /// Whether the top band pushes towards adoption (otherwise abandonment).
    pub adopt_is_top: bool,
    /// Position of the respondent total, counted back from the last cell.
    #[serde(default)]
    pub total_offset_from_end: usize,
}

impl SubCodeSpec {
    pub fn response_code(&self, stakeholder: &str) -> String {
        format!(
            "{stakeholder}_{}{}{}",
            self.prefix, self.midfix, self.suffix
        )
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StakeholderRelations {
    #[serde(default)]
    pub partners: Vec<String>,
    #[serde(default)]
    pub products: BTreeMap<String, ProductRelationCodes>,
}

/// Perceived and ideal response codes, aligned by position with `partners`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRelationCodes {
    pub perceived_codes: Vec<String>,
    pub ideal_codes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentionCategory {
    pub category: String,
    /// One raw weight per configured product, in product order.
    pub weights: Vec<f64>,
}

#[derive(Debug, thiserror::Error)]
pub enum ParametersError {
    #[error("failed to read parameters file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid parameters TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid parameters: {0}")]
    Invalid(String),
}

impl DerivationParameters {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ParametersError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ParametersError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ParametersError> {
        Ok(toml::from_str(raw)?)
    }

    pub fn components_for(
        &self,
        stakeholder: &str,
        product: &str,
    ) -> Option<&BTreeMap<String, ComponentSpec>> {
        self.components
            .get(stakeholder)
            .and_then(|products| products.get(product))
    }

    pub fn partners_of(&self, stakeholder: &str) -> &[String] {
        self.relations
            .get(stakeholder)
            .map(|relations| relations.partners.as_slice())
            .unwrap_or(&[])
    }

    /// Checks every cross reference a run depends on, so a run fails before
    /// any table is written.
    pub fn validate(&self) -> Result<(), ParametersError> {
        require_non_empty("stakeholders", &self.stakeholders)?;
        require_non_empty("products", &self.products)?;
        require_non_empty("countries", &self.countries)?;
        require_unique("stakeholders", &self.stakeholders)?;
        require_unique("products", &self.products)?;
        require_unique("countries", &self.countries)?;

        for stakeholder in &self.stakeholders {
            for product in &self.products {
                let components = self.components_for(stakeholder, product).ok_or_else(|| {
                    invalid(format!(
                        "no components configured for stakeholder '{stakeholder}' and product '{product}'"
                    ))
                })?;
                for (component, spec) in components {
                    if component == ALWAYS_COMPONENT
                        || component.starts_with(RELATION_COMPONENT_PREFIX)
                    {
                        return Err(invalid(format!(
                            "component name '{component}' of '{stakeholder}'/'{product}' is reserved for derived components"
                        )));
                    }
                    validate_component(stakeholder, product, component, spec)?;
                }
            }

            self.validate_relations(stakeholder)?;
            self.validate_intention(stakeholder)?;
        }

        if let Some(unknown) = self
            .intention
            .keys()
            .find(|stakeholder| !self.stakeholders.contains(stakeholder))
        {
            return Err(invalid(format!(
                "intention categories configured for unknown stakeholder '{unknown}'"
            )));
        }

        Ok(())
    }

    fn validate_relations(&self, stakeholder: &str) -> Result<(), ParametersError> {
        let relations = self.relations.get(stakeholder).ok_or_else(|| {
            invalid(format!("no relations configured for stakeholder '{stakeholder}'"))
        })?;
        require_unique(&format!("partners of '{stakeholder}'"), &relations.partners)?;

        for partner in &relations.partners {
            if partner == stakeholder {
                return Err(invalid(format!(
                    "stakeholder '{stakeholder}' lists itself as a partner"
                )));
            }
            if !self.stakeholders.contains(partner) {
                return Err(invalid(format!(
                    "partner '{partner}' of '{stakeholder}' is not a configured stakeholder"
                )));
            }
        }

        // Bidirectional scores need both views of every pair.
        for other in self.stakeholders.iter().filter(|other| *other != stakeholder) {
            if !relations.partners.contains(other) {
                return Err(invalid(format!(
                    "stakeholder '{stakeholder}' has no relation with '{other}'"
                )));
            }
        }

        for product in &self.products {
            let codes = relations.products.get(product).ok_or_else(|| {
                invalid(format!(
                    "no relation codes for stakeholder '{stakeholder}' and product '{product}'"
                ))
            })?;
            if codes.perceived_codes.len() != relations.partners.len()
                || codes.ideal_codes.len() != relations.partners.len()
            {
                return Err(invalid(format!(
                    "relation codes for '{stakeholder}'/'{product}' must list one perceived and one ideal code per partner ({} partners, {} perceived, {} ideal)",
                    relations.partners.len(),
                    codes.perceived_codes.len(),
                    codes.ideal_codes.len()
                )));
            }
        }

        Ok(())
    }

    fn validate_intention(&self, stakeholder: &str) -> Result<(), ParametersError> {
        if self.intention.is_empty() {
            return Ok(());
        }
        let categories = self.intention.get(stakeholder).ok_or_else(|| {
            invalid(format!("no intention categories for stakeholder '{stakeholder}'"))
        })?;
        if categories.is_empty() {
            return Err(invalid(format!(
                "intention categories of '{stakeholder}' must not be empty"
            )));
        }

        for category in categories {
            if category.weights.len() != self.products.len() {
                return Err(invalid(format!(
                    "intention category '{}' of '{stakeholder}' has {} weights for {} products",
                    category.category,
                    category.weights.len(),
                    self.products.len()
                )));
            }
        }

        for (index, product) in self.products.iter().enumerate() {
            let total: f64 = categories.iter().map(|category| category.weights[index]).sum();
            if total == 0.0 {
                return Err(invalid(format!(
                    "intention weights of '{stakeholder}' sum to zero for product '{product}'"
                )));
            }
        }

        Ok(())
    }
}

fn validate_component(
    stakeholder: &str,
    product: &str,
    component: &str,
    spec: &ComponentSpec,
) -> Result<(), ParametersError> {
    if spec.sub_codes.is_empty() {
        return Err(invalid(format!(
            "component '{component}' of '{stakeholder}'/'{product}' has no sub-codes"
        )));
    }

    for sub_code in &spec.sub_codes {
        if sub_code.top_levels > sub_code.answer_length
            || sub_code.bottom_levels > sub_code.answer_length
        {
            return Err(invalid(format!(
                "sub-code '{}' of component '{component}' selects more levels than its answer length {}",
                sub_code.response_code(stakeholder),
                sub_code.answer_length
            )));
        }
    }

    Ok(())
}

fn require_non_empty(field: &str, values: &[String]) -> Result<(), ParametersError> {
    if values.is_empty() {
        return Err(invalid(format!("{field} must not be empty")));
    }
    Ok(())
}

fn require_unique(field: &str, values: &[String]) -> Result<(), ParametersError> {
    let mut seen = HashSet::new();
    for value in values {
        if !seen.insert(value.as_str()) {
            return Err(invalid(format!("{field} lists '{value}' more than once")));
        }
    }
    Ok(())
}

fn invalid(message: String) -> ParametersError {
    ParametersError::Invalid(message)
}
