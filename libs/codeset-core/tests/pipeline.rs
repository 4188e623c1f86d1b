//! End-to-end pipeline tests against a scripted gateway.

mod support;

use std::collections::HashSet;
use std::sync::atomic::Ordering;

use codeset_core::{
    walk_descendants, BuildError, CancelToken, CodeSetBuilder, Domain, ProductCode,
    ProductCodeOrigin,
};
use support::{atom, concept, node, ScriptedGateway};

#[tokio::test]
async fn walk_terminates_on_cyclic_hierarchy() {
    // A and B are each other's descendants.
    let gateway = ScriptedGateway::new()
        .with_descendants("SNOMEDCT_US", "A", vec![node("SNOMEDCT_US", "B", "b")])
        .with_descendants("SNOMEDCT_US", "B", vec![node("SNOMEDCT_US", "A", "a")]);

    let found = walk_descendants(&gateway, "SNOMEDCT_US", "A", None, &CancelToken::new())
        .await
        .unwrap();

    assert_eq!(found.len(), 1);
    assert_eq!(found[0].code, "B");
}

#[tokio::test]
async fn walk_visits_diamond_join_once() {
    let gateway = ScriptedGateway::new()
        .with_descendants(
            "SNOMEDCT_US",
            "A",
            vec![node("SNOMEDCT_US", "B", "b"), node("SNOMEDCT_US", "C", "c")],
        )
        .with_descendants("SNOMEDCT_US", "B", vec![node("SNOMEDCT_US", "D", "d")])
        .with_descendants("SNOMEDCT_US", "C", vec![node("SNOMEDCT_US", "D", "d")]);

    let found = walk_descendants(&gateway, "SNOMEDCT_US", "A", None, &CancelToken::new())
        .await
        .unwrap();

    let codes: Vec<&str> = found.iter().map(|n| n.code.as_str()).collect();
    assert_eq!(codes.iter().filter(|c| **c == "D").count(), 1);
    assert_eq!(found.len(), 3);
}

#[tokio::test]
async fn drug_walk_is_flat_and_issues_one_call() {
    let gateway = ScriptedGateway::new().with_related(
        "11289",
        vec![
            node("RXNORM", "855332", "warfarin sodium 2 MG Oral Tablet"),
            node("RXNORM", "855334", "warfarin sodium 2.5 MG Oral Tablet"),
        ],
    );

    let found = walk_descendants(&gateway, "RXNORM", "11289", None, &CancelToken::new())
        .await
        .unwrap();

    assert_eq!(found.len(), 2);
    assert_eq!(gateway.related_calls.load(Ordering::SeqCst), 1);
    assert_eq!(gateway.descendant_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn walk_skips_failing_branch_and_keeps_siblings() {
    // B's own listing fails server-side; B is still emitted (it was
    // discovered from the root) and the sibling branch C -> D is unaffected.
    let gateway = ScriptedGateway::new()
        .with_descendants(
            "SNOMEDCT_US",
            "A",
            vec![node("SNOMEDCT_US", "B", "b"), node("SNOMEDCT_US", "C", "c")],
        )
        .with_descendants_failure("SNOMEDCT_US", "B")
        .with_descendants("SNOMEDCT_US", "C", vec![node("SNOMEDCT_US", "D", "d")]);

    let found = walk_descendants(&gateway, "SNOMEDCT_US", "A", None, &CancelToken::new())
        .await
        .unwrap();

    let codes: Vec<&str> = found.iter().map(|n| n.code.as_str()).collect();
    assert_eq!(codes, vec!["B", "C", "D"]);
}

#[tokio::test]
async fn build_completes_despite_partial_batch_failures() {
    // One child's descendant listing and another concept's fetch both fail;
    // the build must still finish with the surviving records.
    let gateway = ScriptedGateway::new()
        .with_descendants(
            "SNOMEDCT_US",
            "37796009",
            vec![
                node("SNOMEDCT_US", "56097005", "Migraine without aura"),
                node("SNOMEDCT_US", "4473006", "Migraine with aura"),
            ],
        )
        .with_descendants_failure("SNOMEDCT_US", "4473006")
        .with_concept_id("SNOMEDCT_US", "37796009", "C0149931")
        .with_concept_id("SNOMEDCT_US", "56097005", "C0338480")
        .with_concept_id("SNOMEDCT_US", "4473006", "C0154723")
        .with_concept(
            concept("C0149931", "Migraine", &["T047"]),
            vec![atom("ICD10CM", "G43.909", "PT", "Migraine, unspecified")],
        )
        .with_concept_failure("C0338480")
        .with_concept(
            concept("C0154723", "Migraine with aura", &["T047"]),
            vec![atom("ICD10CM", "G43.109", "PT", "Migraine with aura")],
        );

    let builder = CodeSetBuilder::new(&gateway);
    let seed = node("SNOMEDCT_US", "37796009", "Migraine");
    let result = builder.build(seed, Domain::Condition).await.unwrap();

    // All three concepts resolved; only the fetchable two contribute codes.
    assert_eq!(result.source_concept_count, 3);
    let codes: Vec<&str> = result.codes.iter().map(|r| r.code.as_str()).collect();
    assert_eq!(codes, vec!["G43.909", "G43.109"]);
}

#[tokio::test]
async fn build_aborts_when_standard_vocabulary_atom_is_missing() {
    // ICD10CM seed whose concept has no SNOMEDCT_US atom at all.
    let gateway = ScriptedGateway::new()
        .with_concept_id("ICD10CM", "G43.909", "C0149931")
        .with_concept(
            concept("C0149931", "Migraine", &["T047"]),
            vec![atom("ICD10CM", "G43.909", "PT", "Migraine, unspecified")],
        );

    let builder = CodeSetBuilder::new(&gateway);
    let seed = node("ICD10CM", "G43.909", "Migraine, unspecified");
    let err = builder.build(seed, Domain::Condition).await.unwrap_err();

    match err {
        BuildError::MissingStandardVocabulary {
            vocabulary,
            concept_id,
        } => {
            assert_eq!(vocabulary, "SNOMEDCT_US");
            assert_eq!(concept_id, "C0149931");
        }
        other => panic!("expected standard-vocabulary gate, got {other}"),
    }
}

#[tokio::test]
async fn build_reanchors_non_standard_seed() {
    let gateway = ScriptedGateway::new()
        .with_concept_id("ICD10CM", "G43.909", "C0149931")
        .with_concept_id("SNOMEDCT_US", "37796009", "C0149931")
        .with_concept(
            concept("C0149931", "Migraine", &["T047"]),
            vec![
                atom("ICD10CM", "G43.909", "PT", "Migraine, unspecified"),
                atom("SNOMEDCT_US", "37796009", "PT", "Migraine"),
            ],
        );

    let builder = CodeSetBuilder::new(&gateway);
    let seed = node("ICD10CM", "G43.909", "Migraine, unspecified");
    let result = builder.build(seed.clone(), Domain::Condition).await.unwrap();

    // Seed is preserved but the walk ran in the standard vocabulary.
    assert_eq!(result.root, seed);
    assert_eq!(result.source_vocabulary, "SNOMEDCT_US");
    assert!(result
        .codes
        .iter()
        .any(|r| r.vocabulary == "SNOMEDCT_US" && r.code == "37796009"));
}

#[tokio::test]
async fn estimate_sizes_the_standard_vocabulary_anchor() {
    // The ICD10CM seed fans out to 3 children, but the walk runs in
    // SNOMEDCT_US where the anchor has 1; the estimate must report 1.
    let gateway = ScriptedGateway::new()
        .with_concept_id("ICD10CM", "G43.909", "C0149931")
        .with_concept(
            concept("C0149931", "Migraine", &["T047"]),
            vec![
                atom("ICD10CM", "G43.909", "PT", "Migraine, unspecified"),
                atom("SNOMEDCT_US", "37796009", "PT", "Migraine"),
            ],
        )
        .with_descendants(
            "ICD10CM",
            "G43.909",
            vec![
                node("ICD10CM", "G43.901", "x"),
                node("ICD10CM", "G43.911", "y"),
                node("ICD10CM", "G43.919", "z"),
            ],
        )
        .with_descendants(
            "SNOMEDCT_US",
            "37796009",
            vec![node("SNOMEDCT_US", "56097005", "Migraine without aura")],
        );

    let builder = CodeSetBuilder::new(&gateway);
    let seed = node("ICD10CM", "G43.909", "Migraine, unspecified");
    let estimated = builder
        .estimate_build_size(&seed, Domain::Condition)
        .await
        .unwrap();
    assert_eq!(estimated, 1);
}

#[tokio::test]
async fn build_end_to_end_condition() {
    // Seed with two children; three concepts, each with one ICD10CM code.
    let gateway = ScriptedGateway::new()
        .with_descendants(
            "SNOMEDCT_US",
            "37796009",
            vec![
                node("SNOMEDCT_US", "56097005", "Migraine without aura"),
                node("SNOMEDCT_US", "4473006", "Migraine with aura"),
            ],
        )
        .with_concept_id("SNOMEDCT_US", "37796009", "C0149931")
        .with_concept_id("SNOMEDCT_US", "56097005", "C0338480")
        .with_concept_id("SNOMEDCT_US", "4473006", "C0154723")
        .with_concept(
            concept("C0149931", "Migraine", &["T047"]),
            vec![atom("ICD10CM", "G43.909", "PT", "Migraine, unspecified")],
        )
        .with_concept(
            concept("C0338480", "Migraine without aura", &["T047"]),
            vec![atom("ICD10CM", "G43.009", "PT", "Migraine without aura")],
        )
        .with_concept(
            concept("C0154723", "Migraine with aura", &["T047"]),
            vec![atom("ICD10CM", "G43.109", "PT", "Migraine with aura")],
        );

    let builder = CodeSetBuilder::new(&gateway);
    let seed = node("SNOMEDCT_US", "37796009", "Migraine");
    let result = builder.build(seed, Domain::Condition).await.unwrap();

    assert_eq!(result.source_concept_count, 3);
    assert_eq!(result.codes.len(), 3);
    assert_eq!(result.domain, Domain::Condition);
    assert_eq!(
        result.target_vocabularies,
        vec!["SNOMEDCT_US", "ICD10CM", "ICD9CM"]
    );
    for record in &result.codes {
        assert_eq!(record.vocabulary, "ICD10CM");
        assert!(record
            .code_url
            .starts_with("https://uts.nlm.nih.gov/uts/umls/concept/C"));
    }
}

#[tokio::test]
async fn build_never_emits_duplicate_keys() {
    // Two source concepts sharing the same ICD10CM atom.
    let gateway = ScriptedGateway::new()
        .with_descendants(
            "SNOMEDCT_US",
            "37796009",
            vec![node("SNOMEDCT_US", "56097005", "Migraine without aura")],
        )
        .with_concept_id("SNOMEDCT_US", "37796009", "C0149931")
        .with_concept_id("SNOMEDCT_US", "56097005", "C0338480")
        .with_concept(
            concept("C0149931", "Migraine", &["T047"]),
            vec![atom("ICD10CM", "G43.909", "PT", "Migraine, unspecified")],
        )
        .with_concept(
            concept("C0338480", "Migraine without aura", &["T047"]),
            vec![atom("ICD10CM", "G43.909", "PT", "Migraine, unspecified")],
        );

    let builder = CodeSetBuilder::new(&gateway);
    let seed = node("SNOMEDCT_US", "37796009", "Migraine");
    let result = builder.build(seed, Domain::Condition).await.unwrap();

    let mut keys = HashSet::new();
    for record in &result.codes {
        assert!(
            keys.insert((record.vocabulary.clone(), record.code.clone())),
            "duplicate key {}/{}",
            record.vocabulary,
            record.code
        );
    }
    assert_eq!(result.codes.len(), 1);
}

#[tokio::test]
async fn build_maps_drugs_to_product_codes() {
    let gateway = ScriptedGateway::new()
        .with_related(
            "11289",
            vec![node("RXNORM", "855332", "warfarin sodium 2 MG Oral Tablet")],
        )
        .with_concept_id("RXNORM", "11289", "C0043031")
        .with_concept_id("RXNORM", "855332", "C1234567")
        .with_concept(
            concept("C0043031", "Warfarin", &["T121"]),
            vec![atom("RXNORM", "11289", "IN", "warfarin")],
        )
        .with_concept(
            concept("C1234567", "warfarin sodium 2 MG Oral Tablet", &["T200"]),
            vec![atom(
                "RXNORM",
                "855332",
                "SCD",
                "warfarin sodium 2 MG Oral Tablet",
            )],
        )
        .with_products(
            "855332",
            vec![ProductCode {
                code: "00056017275".to_string(),
                name: None,
                origin: ProductCodeOrigin::DrugRelationService,
            }],
        );

    let builder = CodeSetBuilder::new(&gateway);
    let seed = node("RXNORM", "11289", "warfarin");
    let result = builder.build(seed, Domain::Drug).await.unwrap();

    let ndc = result
        .codes
        .iter()
        .find(|r| r.vocabulary == "NDC")
        .expect("product record present");
    assert_eq!(ndc.code, "00056017275");
    assert_eq!(ndc.source_rx_concept_id.as_deref(), Some("855332"));
    // Drug attributes carried forward from the parent clinical drug.
    assert_eq!(ndc.dose_form.as_deref(), Some("Oral Solid"));
    assert_eq!(ndc.strength.as_deref(), Some("2 MG"));
    assert_eq!(ndc.concept_id, "C1234567");
}

#[tokio::test]
async fn cancelled_token_stops_the_build() {
    let gateway = ScriptedGateway::new()
        .with_descendants(
            "SNOMEDCT_US",
            "37796009",
            vec![node("SNOMEDCT_US", "56097005", "Migraine without aura")],
        )
        .with_concept_id("SNOMEDCT_US", "37796009", "C0149931");

    let cancel = CancelToken::new();
    cancel.cancel();
    let builder = CodeSetBuilder::new(&gateway).with_cancel(cancel);
    let seed = node("SNOMEDCT_US", "37796009", "Migraine");
    let err = builder.build(seed, Domain::Condition).await.unwrap_err();
    assert!(matches!(err, BuildError::Cancelled));
}

#[tokio::test]
async fn progress_reports_phases_without_blocking() {
    use std::sync::{Arc, Mutex};

    let gateway = ScriptedGateway::new()
        .with_descendants(
            "SNOMEDCT_US",
            "37796009",
            vec![node("SNOMEDCT_US", "56097005", "Migraine without aura")],
        )
        .with_concept_id("SNOMEDCT_US", "37796009", "C0149931")
        .with_concept_id("SNOMEDCT_US", "56097005", "C0338480")
        .with_concept(
            concept("C0149931", "Migraine", &["T047"]),
            vec![atom("ICD10CM", "G43.909", "PT", "Migraine, unspecified")],
        )
        .with_concept(
            concept("C0338480", "Migraine without aura", &["T047"]),
            vec![atom("ICD10CM", "G43.009", "PT", "Migraine without aura")],
        );

    let phases: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&phases);
    let progress = move |phase: &str, _current: usize, _total: usize| {
        sink.lock().unwrap().push(phase.to_string());
    };

    let builder = CodeSetBuilder::new(&gateway).with_progress(&progress);
    let seed = node("SNOMEDCT_US", "37796009", "Migraine");
    builder.build(seed, Domain::Condition).await.unwrap();

    let phases = phases.lock().unwrap();
    assert!(phases.iter().any(|p| p == "walking hierarchy"));
    assert!(phases.iter().any(|p| p == "resolving concepts"));
    assert!(phases.iter().any(|p| p == "fetching target vocabularies"));
}
