use adoption_params::config::{AppConfig, DerivationParameters};
use adoption_params::error::AppError;
use adoption_params::telemetry;
use adoption_params::workflows::answers::CsvAnswerStore;
use adoption_params::workflows::derivation::{DerivationOutcome, SurveyDerivation};
use adoption_params::workflows::tables::CsvTableSink;
use clap::Args;
use std::fmt::Write as _;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Args, Debug, Default)]
pub(crate) struct DeriveArgs {
    /// Parameters file (defaults to SURVEY_PARAMETERS_FILE)
    #[arg(long)]
    pub(crate) parameters: Option<PathBuf>,
    /// Directory of `{response_code}.csv` answer tables (defaults to SURVEY_ANSWERS_DIR)
    #[arg(long)]
    pub(crate) answers_dir: Option<PathBuf>,
    /// Output folder (defaults to the parameters' files.output_folder)
    #[arg(long)]
    pub(crate) output_dir: Option<PathBuf>,
    /// Print the run summary as JSON
    #[arg(long)]
    pub(crate) json: bool,
}

pub(crate) fn run_derive(args: DeriveArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    let DeriveArgs {
        parameters,
        answers_dir,
        output_dir,
        json,
    } = args;
    let parameters_file = parameters.unwrap_or(config.survey.parameters_file);
    let answers_dir = answers_dir.unwrap_or(config.survey.answers_dir);

    let parameters = DerivationParameters::from_path(&parameters_file)?;
    let output_dir = output_dir.unwrap_or_else(|| parameters.files.output_folder.clone());
    info!(
        parameters = %parameters_file.display(),
        answers = %answers_dir.display(),
        output = %output_dir.display(),
        "deriving survey parameters"
    );

    let store = CsvAnswerStore::open(&answers_dir)?;
    let sink = CsvTableSink::create(&output_dir, &parameters.files.groupfile_name)?;
    let destination = sink.destination().to_path_buf();

    let derivation = SurveyDerivation::new(Arc::new(parameters), Arc::new(store), Arc::new(sink));
    let outcome = derivation.run()?;

    if json {
        let rendered =
            serde_json::to_string_pretty(&outcome.summary).map_err(std::io::Error::from)?;
        println!("{rendered}");
    } else {
        print!("{}", render_outcome(&outcome, &destination));
    }
    Ok(())
}

pub(crate) fn render_outcome(outcome: &DerivationOutcome, destination: &std::path::Path) -> String {
    let summary = &outcome.summary;
    let mut out = String::new();

    let _ = writeln!(out, "Survey parameter derivation");
    let _ = writeln!(
        out,
        "Generated {} for {} stakeholders, {} products, {} countries",
        summary.generated_at.format("%Y-%m-%d %H:%M:%S UTC"),
        summary.stakeholders,
        summary.products,
        summary.countries
    );
    let _ = writeln!(out, "Tables written to {}:", destination.display());
    for table in &summary.tables {
        let _ = writeln!(out, "  - {} ({} rows)", table.name, table.rows);
    }

    if !outcome.products.deviations.is_empty() {
        let _ = writeln!(out, "Product relation scores:");
    }
    for (key, deviation) in &outcome.products.deviations {
        let overlap = outcome
            .products
            .overlap(&key.country, &key.product)
            .map(|score| format!("{:.3}", score.ratio))
            .unwrap_or_else(|| "n/a".to_string());
        let _ = writeln!(
            out,
            "  {} / {}: relation score {:.3} (sd {:.3}), overlap {}",
            key.country, key.product, deviation.score, deviation.standard_deviation, overlap
        );
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::answer_store;
    use crate::routes::tests::{sample_answers, sample_parameters};
    use adoption_params::workflows::tables::MemoryTableSink;

    #[test]
    fn rendered_outcome_lists_tables_and_product_scores() {
        let store = answer_store(&sample_answers()).expect("answers parse");
        let derivation = SurveyDerivation::new(
            Arc::new(sample_parameters()),
            Arc::new(store),
            Arc::new(MemoryTableSink::new()),
        );
        let outcome = derivation.run().expect("derivation succeeds");

        let rendered = render_outcome(&outcome, std::path::Path::new("output/wallet_survey"));
        assert!(rendered.contains("Tables written to output/wallet_survey:"));
        assert!(rendered.contains("  - survey_topics (12 rows)"));
        assert!(rendered.contains("Netherlands / wallet: relation score 0.800 (sd 0.200)"));
        assert!(rendered.contains("2 stakeholders, 1 products, 2 countries"));
    }
}
