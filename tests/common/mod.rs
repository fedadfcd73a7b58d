//! Shared fixtures for integration tests

#![allow(dead_code)]

use miami_housing::data::TrainingSet;
use miami_housing::model::TrainedModel;
use miami_housing::schema::{FeatureSchema, HousingFeatures, TARGET_COLUMN};
use miami_housing::training::{train, ForestConfig};
use polars::prelude::*;

/// Synthetic Miami-like sales: price rises with land and floor area and
/// quality, falls with ocean distance and age
pub fn housing_frame(n: usize) -> DataFrame {
    let col = |f: &dyn Fn(usize) -> f64| (0..n).map(f).collect::<Vec<f64>>();

    let land = col(&|i| 3000.0 + ((i * 37) % 97) as f64 * 60.0);
    let floor = col(&|i| 900.0 + ((i * 53) % 89) as f64 * 25.0);
    let ocean = col(&|i| 500.0 + ((i * 29) % 71) as f64 * 900.0);
    let age = col(&|i| ((i * 11) % 60) as f64);
    let quality = col(&|i| (1 + (i * 7) % 5) as f64);
    let noise = col(&|i| (i % 3 == 0) as u8 as f64);
    let month = col(&|i| (1 + i % 12) as f64);
    let special = col(&|i| ((i * 13) % 7) as f64 * 2500.0);
    let rail = col(&|i| 200.0 + ((i * 17) % 50) as f64 * 150.0);
    let water = col(&|i| 100.0 + ((i * 19) % 40) as f64 * 120.0);
    let center = col(&|i| 20000.0 + ((i * 23) % 61) as f64 * 1000.0);
    let subcenter = col(&|i| 5000.0 + ((i * 31) % 43) as f64 * 800.0);
    let highway = col(&|i| 300.0 + ((i * 41) % 37) as f64 * 400.0);

    let price: Vec<f64> = (0..n)
        .map(|i| {
            20.0 * land[i] + 150.0 * floor[i] - 2.0 * ocean[i] - 900.0 * age[i]
                + 25000.0 * quality[i]
                + 150000.0
        })
        .collect();

    df!(
        "SALE_PRC" => &price,
        "LND_SQFOOT" => &land,
        "TOT_LVG_AREA" => &floor,
        "SPEC_FEAT_VAL" => &special,
        "RAIL_DIST" => &rail,
        "OCEAN_DIST" => &ocean,
        "WATER_DIST" => &water,
        "CNTR_DIST" => &center,
        "SUBCNTR_DI" => &subcenter,
        "HWY_DIST" => &highway,
        "age" => &age,
        "avno60plus" => &noise,
        "month_sold" => &month,
        "structure_quality" => &quality
    )
    .unwrap()
}

pub fn housing_set(n: usize) -> TrainingSet {
    TrainingSet::from_dataframe(&housing_frame(n), &FeatureSchema::miami(), TARGET_COLUMN).unwrap()
}

pub fn housing_model(n: usize, trees: usize, seed: u64) -> TrainedModel {
    let forest = ForestConfig::default()
        .with_n_estimators(trees)
        .with_random_state(seed);
    train(&housing_set(n), forest).unwrap()
}

pub fn typical_house() -> HousingFeatures {
    HousingFeatures {
        land_sqft: 5500.0,
        living_area_sqft: 1800.0,
        rail_dist: 3000.0,
        ocean_dist: 20000.0,
        water_dist: 2000.0,
        center_dist: 45000.0,
        subcenter_dist: 20000.0,
        highway_dist: 6000.0,
        age: 25.0,
        structure_quality: 4.0,
        avno60plus: 0.0,
        month_sold: 6.0,
        special_feature_value: 2500.0,
    }
}
