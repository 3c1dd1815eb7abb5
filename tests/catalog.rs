use assert_matches::assert_matches;

use hcp_nma::catalog::{BOLD_NAMES, DatasetCatalog, ExperimentCatalog};
use hcp_nma::domain::{DatasetKey, RunId};
use hcp_nma::error::HcpError;

#[test]
fn every_task_family_has_two_consecutive_runs() {
    let catalog = ExperimentCatalog::hcp();
    for (family, first) in [
        ("motor", 5),
        ("wm", 7),
        ("emotion", 9),
        ("gambling", 11),
        ("language", 13),
        ("relational", 15),
        ("social", 17),
    ] {
        assert_eq!(
            catalog.run_ids(family).unwrap(),
            vec![RunId(first), RunId(first + 1)],
            "family {family}"
        );
    }
}

#[test]
fn lookup_ignores_case_and_keeps_catalog_order() {
    let catalog = ExperimentCatalog::hcp();
    let runs = catalog.lookup("Wm").unwrap();
    let labels = runs.iter().map(|run| run.label.as_str()).collect::<Vec<_>>();
    assert_eq!(labels, vec!["tfMRI_WM_RL", "tfMRI_WM_LR"]);
}

#[test]
fn run_ids_are_label_positions() {
    let catalog = ExperimentCatalog::hcp();
    assert_eq!(catalog.len(), BOLD_NAMES.len());
    for (index, label) in BOLD_NAMES.iter().enumerate() {
        assert_eq!(catalog.label(RunId(index + 1)), Some(*label));
    }
    assert_eq!(catalog.label(RunId(0)), None);
    assert_eq!(catalog.label(RunId(19)), None);
}

#[test]
fn substring_matching_spans_families() {
    // "_lr" matches one acquisition of every family.
    let ids = ExperimentCatalog::hcp().run_ids("_lr").unwrap();
    assert_eq!(ids.len(), 9);
    assert_eq!(ids.first(), Some(&RunId(1)));
}

#[test]
fn custom_catalog_families() {
    let catalog = ExperimentCatalog::from_labels(["REST1_LR", "REST1_RL", "TASK_A_RL"]);
    assert_eq!(catalog.families(), vec!["rest", "rest1", "task_a"]);
    assert_matches!(
        catalog.run_ids("motor"),
        Err(HcpError::UnknownExperiment(name)) if name == "motor"
    );
}

#[test]
fn dataset_selection() {
    let catalog = DatasetCatalog::default();

    let all = catalog.select::<&str>(&[]).unwrap();
    assert_eq!(all.len(), 4);

    let some = catalog.select(&["Atlas", "rest"]).unwrap();
    assert_eq!(some[0].key, DatasetKey::Atlas);
    assert_eq!(some[1].source_url, "https://osf.io/bqp7m/download/");

    assert_matches!(
        catalog.select(&["rest", "video"]),
        Err(HcpError::UnknownDataset(name)) if name == "video"
    );
}
