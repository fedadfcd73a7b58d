//! Integration tests for feature contribution reports

mod common;

use std::time::Duration;

use common::{housing_frame, housing_model, typical_house};
use miami_housing::data::columns_to_array2;
use miami_housing::error::HousingError;
use miami_housing::explainability::{explain, TreeExplainer};
use miami_housing::schema::FeatureSchema;

#[test]
fn test_contributions_add_up_to_prediction() {
    let model = housing_model(120, 15, 21);
    let x = columns_to_array2(&housing_frame(120), &FeatureSchema::miami().names()).unwrap();

    let report = explain(&model, &x).unwrap();
    assert_eq!(report.n_samples(), 120);
    assert_eq!(report.contributions.ncols(), 13);

    for i in 0..report.n_samples() {
        let detail = report.sample(i).unwrap();
        let total = detail.base_value + detail.sum_contributions();
        let direct = model.predict_row(&x.row(i).to_vec()).unwrap();
        assert!(
            (total - direct).abs() < 1e-6 * direct.abs().max(1.0),
            "sample {}: {} vs {}",
            i,
            total,
            direct
        );
    }
}

#[test]
fn test_base_value_is_training_mean_without_bootstrap() {
    let set = common::housing_set(50);
    let forest = miami_housing::training::ForestConfig::default()
        .with_n_estimators(4)
        .with_bootstrap(false)
        .with_random_state(3);
    let model = miami_housing::training::train(&set, forest).unwrap();

    let x = columns_to_array2(&housing_frame(5), &FeatureSchema::miami().names()).unwrap();
    let report = explain(&model, &x).unwrap();
    let mean = set.y().mean().unwrap();
    assert!((report.base_value - mean).abs() < 1e-6);
}

#[test]
fn test_ranking_finds_driving_features() {
    let model = housing_model(200, 20, 8);
    let x = columns_to_array2(&housing_frame(200), &FeatureSchema::miami().names()).unwrap();
    let report = TreeExplainer::new(&model).with_max_samples(80).explain(&x).unwrap();
    assert_eq!(report.n_samples(), 80);

    let ranking = report.global_ranking();
    assert_eq!(ranking.len(), 13);
    for pair in ranking.windows(2) {
        assert!(pair[0].mean_abs_contribution >= pair[1].mean_abs_contribution);
    }

    // Strongest drivers of the synthetic price
    let top: Vec<&str> = ranking[..5].iter().map(|r| r.feature_name.as_str()).collect();
    for name in ["LND_SQFOOT", "TOT_LVG_AREA", "OCEAN_DIST", "structure_quality"] {
        assert!(top.contains(&name), "{} missing from {:?}", name, top);
    }
}

#[test]
fn test_explain_single_house() {
    let model = housing_model(100, 10, 4);
    let vector = typical_house().to_vector().unwrap();
    let local = TreeExplainer::new(&model).explain_vector(&vector).unwrap();

    assert_eq!(local.contributions.len(), 13);
    let direct = model.predict_row(vector.values()).unwrap();
    assert!((local.base_value + local.sum_contributions() - direct).abs() < 1e-6 * direct);

    let top = local.top_k_contributors(3);
    assert_eq!(top.len(), 3);
    assert!(top[0].contribution.abs() >= top[2].contribution.abs());
}

#[test]
fn test_report_serializes() {
    let model = housing_model(40, 5, 2);
    let x = columns_to_array2(&housing_frame(3), &FeatureSchema::miami().names()).unwrap();
    let report = explain(&model, &x).unwrap();

    let json = serde_json::to_string(&report).unwrap();
    let back: miami_housing::explainability::ImportanceReport = serde_json::from_str(&json).unwrap();
    assert_eq!(back.feature_names, report.feature_names);
    assert_eq!(back.contributions.dim(), report.contributions.dim());
    for (a, b) in back.contributions.iter().zip(report.contributions.iter()) {
        assert!((a - b).abs() <= 1e-9 * b.abs().max(1.0));
    }
}

#[test]
fn test_reference_width_mismatch() {
    let model = housing_model(40, 5, 2);
    let x = columns_to_array2(&housing_frame(3), &["LND_SQFOOT".to_string(), "age".to_string()]).unwrap();
    assert!(matches!(explain(&model, &x), Err(HousingError::SchemaMismatch(_))));
}

#[test]
fn test_timeout_reports_progress() {
    let model = housing_model(60, 10, 2);
    let x = columns_to_array2(&housing_frame(500), &FeatureSchema::miami().names()).unwrap();
    match TreeExplainer::new(&model).with_timeout(Duration::ZERO).explain(&x) {
        Err(HousingError::ExplanationTimeout { processed, total }) => {
            assert_eq!(total, 500);
            assert!(processed < total);
        }
        other => panic!("expected timeout, got {:?}", other.map(|r| r.n_samples())),
    }
}
