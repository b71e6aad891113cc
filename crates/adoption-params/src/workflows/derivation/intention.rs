use super::domain::DerivationError;
use crate::config::DerivationParameters;
use crate::workflows::tables::{Table, TableKey};

/// Per product, each stakeholder's category weights normalized to sum to one.
///
/// Categories are the union over stakeholders in first-seen order; a
/// category a stakeholder does not list weighs 0 for that stakeholder.
pub fn intention_weight_tables(
    parameters: &DerivationParameters,
) -> Result<Vec<Table>, DerivationError> {
    if parameters.intention.is_empty() {
        return Ok(Vec::new());
    }

    let mut categories: Vec<&str> = Vec::new();
    for stakeholder in &parameters.stakeholders {
        for entry in parameters.intention.get(stakeholder).into_iter().flatten() {
            if !categories.contains(&entry.category.as_str()) {
                categories.push(&entry.category);
            }
        }
    }

    let mut tables = Vec::with_capacity(parameters.products.len());
    for (position, product) in parameters.products.iter().enumerate() {
        let mut columns = Vec::with_capacity(parameters.stakeholders.len());
        for stakeholder in &parameters.stakeholders {
            let entries = parameters.intention.get(stakeholder).ok_or_else(|| {
                DerivationError::MissingInput(format!(
                    "intention categories of stakeholder '{stakeholder}'"
                ))
            })?;
            let weight_of = |category: &str| -> Result<f64, DerivationError> {
                match entries.iter().find(|entry| entry.category == category) {
                    Some(entry) => entry.weights.get(position).copied().ok_or_else(|| {
                        DerivationError::MissingInput(format!(
                            "weight of intention category '{category}' of '{stakeholder}' for product '{product}'"
                        ))
                    }),
                    None => Ok(0.0),
                }
            };

            let raw = categories
                .iter()
                .map(|&category| weight_of(category))
                .collect::<Result<Vec<_>, _>>()?;
            let total: f64 = raw.iter().sum();
            if total == 0.0 {
                return Err(DerivationError::ZeroTotal {
                    context: format!("intention weights of '{stakeholder}' for '{product}'"),
                });
            }
            columns.push(raw.into_iter().map(|weight| weight / total).collect::<Vec<_>>());
        }

        let mut table = Table::new(
            TableKey::IntentionWeights { product }.name(parameters),
            ["Category"],
            parameters.stakeholders.iter().map(String::as_str),
        );
        for (row, category) in categories.iter().enumerate() {
            table.push_row(
                vec![category.to_string()],
                columns.iter().map(|column| column[row]).collect(),
            );
        }
        tables.push(table);
    }

    Ok(tables)
}

/// Per product, the configured initial share of adopters for every
/// stakeholder and country.
pub fn initial_yes_tables(parameters: &DerivationParameters) -> Vec<Table> {
    parameters
        .products
        .iter()
        .map(|product| {
            let mut table = Table::new(
                TableKey::InitialYes { product }.name(parameters),
                ["Country"],
                parameters.stakeholders.iter().map(String::as_str),
            );
            for country in &parameters.countries {
                table.push_row(
                    vec![country.clone()],
                    vec![parameters.initial_yes; parameters.stakeholders.len()],
                );
            }
            table
        })
        .collect()
}
