//! Integration tests for prediction: determinism, bounds, schema enforcement

mod common;

use std::collections::BTreeMap;
use std::sync::Arc;

use common::{housing_frame, housing_model, typical_house};
use miami_housing::controls::InputForm;
use miami_housing::data::columns_to_array2;
use miami_housing::error::HousingError;
use miami_housing::inference::{predict, Predictor};
use miami_housing::schema::{FeatureSchema, FeatureVector};

fn predictor() -> Predictor {
    Predictor::new(Arc::new(housing_model(150, 20, 11)))
}

fn named(features: &miami_housing::schema::HousingFeatures) -> BTreeMap<String, f64> {
    FeatureSchema::miami()
        .names()
        .into_iter()
        .zip(features.to_array())
        .collect()
}

#[test]
fn test_prediction_is_deterministic() {
    let predictor = predictor();
    let vector = typical_house().to_vector().unwrap();

    let first = predictor.predict(&vector).unwrap();
    for _ in 0..5 {
        assert_eq!(predictor.predict(&vector).unwrap(), first);
    }

    // Clones share the same model
    let clone = predictor.clone();
    assert_eq!(clone.predict(&vector).unwrap(), first);
}

#[test]
fn test_predictions_finite_and_non_negative() {
    let predictor = predictor();
    let schema = FeatureSchema::miami();
    let x = columns_to_array2(&housing_frame(150), &schema.names()).unwrap();

    let prices = predictor.predict_batch(&x).unwrap();
    assert_eq!(prices.len(), 150);
    assert!(prices.iter().all(|p| p.is_finite() && *p >= 0.0));

    // Far outside the training domain, still a valid price
    let mut extreme = typical_house();
    extreme.land_sqft = 1e9;
    extreme.age = -500.0;
    let price = predictor.predict_features(&extreme).unwrap();
    assert!(price.is_finite() && price >= 0.0);
}

#[test]
fn test_batch_matches_single_rows() {
    let predictor = predictor();
    let schema = FeatureSchema::miami();
    let x = columns_to_array2(&housing_frame(20), &schema.names()).unwrap();

    let batch = predictor.predict_batch(&x).unwrap();
    for (i, row) in x.rows().into_iter().enumerate() {
        let vector = FeatureVector::from_values(&schema, row.to_vec()).unwrap();
        assert_eq!(predictor.predict(&vector).unwrap(), batch[i]);
    }
}

#[test]
fn test_training_row_close_to_target() {
    let model = housing_model(150, 30, 5);
    let schema = FeatureSchema::miami();
    let df = housing_frame(150);
    let x = columns_to_array2(&df, &schema.names()).unwrap();
    let y = columns_to_array2(&df, &["SALE_PRC".to_string()]).unwrap();

    for i in [0, 10, 75, 149] {
        let price = model.predict_row(&x.row(i).to_vec()).unwrap();
        let target = y[[i, 0]];
        assert!((price - target).abs() < 0.15 * target, "row {}: {} vs {}", i, price, target);
    }
}

#[test]
fn test_missing_age_rejected() {
    let predictor = predictor();
    let mut values = named(&typical_house());
    values.remove("age");

    match predictor.predict_named(&values) {
        Err(HousingError::SchemaMismatch(msg)) => assert!(msg.contains("age"), "{}", msg),
        other => panic!("expected SchemaMismatch, got {:?}", other),
    }

    let json = serde_json::to_string(&values).unwrap();
    assert!(matches!(
        predictor.predict_json(&json),
        Err(HousingError::SchemaMismatch(_))
    ));
}

#[test]
fn test_unknown_field_rejected() {
    let predictor = predictor();
    let mut values = named(&typical_house());
    values.insert("POOL".to_string(), 1.0);
    assert!(matches!(
        predictor.predict_named(&values),
        Err(HousingError::SchemaMismatch(_))
    ));
}

#[test]
fn test_json_and_record_agree() {
    let predictor = predictor();
    let house = typical_house();
    let json = serde_json::to_string(&house).unwrap();

    assert_eq!(
        predictor.predict_json(&json).unwrap(),
        predictor.predict_features(&house).unwrap()
    );
}

#[test]
fn test_non_finite_value_rejected() {
    let schema = FeatureSchema::miami();
    let mut values = typical_house().to_array().to_vec();
    values[3] = f64::NAN;
    assert!(matches!(
        FeatureVector::from_values(&schema, values),
        Err(HousingError::SchemaMismatch(_))
    ));
}

#[test]
fn test_vector_for_other_schema_rejected() {
    let model = housing_model(60, 5, 1);
    let other = FeatureSchema::new(["LND_SQFOOT", "TOT_LVG_AREA"]).unwrap();
    let vector = FeatureVector::from_values(&other, vec![5000.0, 1500.0]).unwrap();
    assert!(matches!(
        predict(&model, &vector),
        Err(HousingError::SchemaMismatch(_))
    ));
}

#[test]
fn test_form_defaults_predict() {
    let predictor = predictor();
    let form = InputForm::for_model(predictor.model()).unwrap();
    let defaults = form.defaults().unwrap();
    form.validate(&defaults).unwrap();

    let price = predictor.predict(&defaults).unwrap();
    assert!(price > 0.0);
}
