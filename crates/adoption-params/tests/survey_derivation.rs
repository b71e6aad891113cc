use adoption_params::config::DerivationParameters;
use adoption_params::workflows::answers::CsvAnswerStore;
use adoption_params::workflows::derivation::{ComponentKey, SurveyDerivation};
use adoption_params::workflows::tables::CsvTableSink;
use std::path::{Path, PathBuf};
use std::sync::Arc;

fn fixtures() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn load_parameters() -> DerivationParameters {
    DerivationParameters::from_path(fixtures().join("parameters.toml"))
        .expect("fixture parameters load")
}

#[test]
fn csv_answers_flow_into_csv_tables() {
    let output = tempfile::tempdir().expect("temp output dir");
    let parameters = load_parameters();
    let store = CsvAnswerStore::open(fixtures().join("answers")).expect("answer dir opens");
    let sink = CsvTableSink::create(output.path(), &parameters.files.groupfile_name)
        .expect("sink directory created");

    let derivation = SurveyDerivation::new(Arc::new(parameters), Arc::new(store), Arc::new(sink));
    let outcome = derivation.run().expect("derivation succeeds");

    let group_dir = output.path().join("wallet_survey");
    for table in &outcome.summary.tables {
        let path = group_dir.join(format!("{}.csv", table.name));
        assert!(path.is_file(), "missing {}", path.display());
    }
    let leftovers: Vec<_> = std::fs::read_dir(&group_dir)
        .expect("group dir readable")
        .filter_map(Result::ok)
        .filter(|entry| entry.file_name().to_string_lossy().ends_with(".partial"))
        .collect();
    assert!(leftovers.is_empty(), "staging files left behind: {leftovers:?}");

    let economic = outcome
        .adopt_leave(&ComponentKey::new("Netherlands", "wallet", "users", "economic"))
        .expect("economic component");
    assert!((economic.adopt - 0.4).abs() < 1e-12);
    assert!((economic.leave - 0.1).abs() < 1e-12);
}

#[test]
fn written_tables_read_back_unchanged() {
    let output = tempfile::tempdir().expect("temp output dir");
    let parameters = load_parameters();
    let store = CsvAnswerStore::open(fixtures().join("answers")).expect("answer dir opens");
    let sink = Arc::new(
        CsvTableSink::create(output.path(), &parameters.files.groupfile_name)
            .expect("sink directory created"),
    );

    let derivation = SurveyDerivation::new(Arc::new(parameters), Arc::new(store), sink.clone());
    let outcome = derivation.run().expect("derivation succeeds");

    let composite = outcome.table("survey_topics").expect("composite in outcome");
    let read_back = sink
        .read_table("survey_topics", composite.index_columns.len())
        .expect("composite reads back");
    assert_eq!(&read_back, composite);

    let bidirectional = outcome
        .table("bidirectional_relation_overlap")
        .expect("bidirectional overlap");
    let read_back = sink
        .read_table("bidirectional_relation_overlap", 3)
        .expect("bidirectional reads back");
    assert_eq!(read_back.rows[0].index[2], "('users', 'makers')");
    assert_eq!(&read_back, bidirectional);
}

#[test]
fn rerunning_replaces_previous_output() {
    let output = tempfile::tempdir().expect("temp output dir");
    let parameters = Arc::new(load_parameters());
    let store = Arc::new(CsvAnswerStore::open(fixtures().join("answers")).expect("answers"));
    let sink = Arc::new(
        CsvTableSink::create(output.path(), &parameters.files.groupfile_name).expect("sink"),
    );

    let derivation = SurveyDerivation::new(parameters, store, sink.clone());
    derivation.run().expect("first run");
    let first = std::fs::read_to_string(sink.table_path("product_relation_deviations"))
        .expect("first output");
    derivation.run().expect("second run");
    let second = std::fs::read_to_string(sink.table_path("product_relation_deviations"))
        .expect("second output");
    assert_eq!(first, second);
}
