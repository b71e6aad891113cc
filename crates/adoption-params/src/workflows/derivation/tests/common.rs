use std::sync::Arc;

use crate::config::DerivationParameters;
use crate::workflows::answers::MemoryAnswerStore;
use crate::workflows::derivation::domain::{
    RelationKey, RelationKind, RelationProfile, RelationVector,
};
use crate::workflows::derivation::SurveyDerivation;
use crate::workflows::tables::MemoryTableSink;

const PARAMETERS: &str = include_str!("../../../../tests/fixtures/parameters.toml");

const ANSWERS: &[(&str, &str)] = &[
    (
        "users_Q1",
        include_str!("../../../../tests/fixtures/answers/users_Q1.csv"),
    ),
    (
        "makers_Q2a",
        include_str!("../../../../tests/fixtures/answers/makers_Q2a.csv"),
    ),
    (
        "makers_Q2b",
        include_str!("../../../../tests/fixtures/answers/makers_Q2b.csv"),
    ),
    (
        "users_R1",
        include_str!("../../../../tests/fixtures/answers/users_R1.csv"),
    ),
    (
        "users_R2",
        include_str!("../../../../tests/fixtures/answers/users_R2.csv"),
    ),
    (
        "makers_R3",
        include_str!("../../../../tests/fixtures/answers/makers_R3.csv"),
    ),
    (
        "makers_R4",
        include_str!("../../../../tests/fixtures/answers/makers_R4.csv"),
    ),
];

pub(super) const TOLERANCE: f64 = 1e-12;

pub(super) fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < TOLERANCE,
        "expected {expected}, got {actual}"
    );
}

pub(super) fn parameters() -> DerivationParameters {
    DerivationParameters::from_toml_str(PARAMETERS).expect("fixture parameters parse")
}

pub(super) fn store() -> MemoryAnswerStore {
    let mut store = MemoryAnswerStore::new();
    for (code, csv) in ANSWERS {
        store.insert_csv(code, csv).expect("fixture answers parse");
    }
    store
}

pub(super) fn store_without(missing: &str) -> MemoryAnswerStore {
    let mut store = MemoryAnswerStore::new();
    for (code, csv) in ANSWERS.iter().filter(|(code, _)| *code != missing) {
        store.insert_csv(code, csv).expect("fixture answers parse");
    }
    store
}

pub(super) fn derivation(
    parameters: DerivationParameters,
    store: MemoryAnswerStore,
) -> (
    SurveyDerivation<MemoryAnswerStore, MemoryTableSink>,
    Arc<MemoryTableSink>,
) {
    let sink = Arc::new(MemoryTableSink::new());
    let derivation = SurveyDerivation::new(Arc::new(parameters), Arc::new(store), sink.clone());
    (derivation, sink)
}

pub(super) fn profile(perceived: &[f64], ideal: &[f64]) -> RelationProfile {
    let names = ["Market", "Community", "Hierarchy", "Clan"];
    RelationProfile {
        key: RelationKey::new("users", "Netherlands", "wallet", "makers"),
        perceived: RelationVector::from_pairs(
            RelationKind::Perceived,
            names.iter().copied().zip(perceived.iter().copied()),
        ),
        ideal: RelationVector::from_pairs(
            RelationKind::Ideal,
            names.iter().copied().zip(ideal.iter().copied()),
        ),
    }
}
