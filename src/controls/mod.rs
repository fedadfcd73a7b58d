//! Input controls
//!
//! Describes the widgets a front end shows for collecting one house
//! description: a slider per continuous field bounded by the training
//! data, a select per categorical field. The form also produces the
//! default feature vector and bound-checks user input before it reaches
//! the predictor.

use serde::{Deserialize, Serialize};

use crate::error::{HousingError, Result};
use crate::model::TrainedModel;
use crate::schema::{FeatureSchema, FeatureSummary, FeatureVector};

/// How a slider default is derived from the training mean
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DefaultRule {
    Mean,
    Truncate,
    Round,
}

/// Widget kind and its bounds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlKind {
    Slider {
        min: f64,
        max: f64,
        default: f64,
        /// Whole-number steps
        integer: bool,
    },
    Select {
        options: Vec<f64>,
        default: f64,
    },
}

impl ControlKind {
    pub fn default_value(&self) -> f64 {
        match self {
            ControlKind::Slider { default, .. } | ControlKind::Select { default, .. } => *default,
        }
    }
}

/// One labelled input bound to a schema field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputControl {
    pub name: String,
    pub label: String,
    pub kind: ControlKind,
}

impl InputControl {
    /// Check `value` against this control's bounds
    pub fn check(&self, value: f64) -> Result<()> {
        match &self.kind {
            ControlKind::Slider { min, max, .. } => {
                if !(value >= *min && value <= *max) {
                    return Err(HousingError::OutOfRange {
                        feature: self.name.clone(),
                        value,
                        min: *min,
                        max: *max,
                    });
                }
            }
            ControlKind::Select { options, .. } => {
                if !options.contains(&value) {
                    let min = options.iter().copied().fold(f64::INFINITY, f64::min);
                    let max = options.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                    return Err(HousingError::OutOfRange {
                        feature: self.name.clone(),
                        value,
                        min,
                        max,
                    });
                }
            }
        }
        Ok(())
    }
}

fn slider_label(name: &str) -> Option<(&'static str, DefaultRule)> {
    let entry = match name {
        "LND_SQFOOT" => ("Land area (square feet)", DefaultRule::Truncate),
        "TOT_LVG_AREA" => ("Floor area (square feet)", DefaultRule::Truncate),
        "RAIL_DIST" => (
            "Distance to the nearest rail line (an indicator of noise) (feet)",
            DefaultRule::Mean,
        ),
        "OCEAN_DIST" => ("Distance to the ocean (feet)", DefaultRule::Mean),
        "WATER_DIST" => ("Distance to the nearest body of water (feet)", DefaultRule::Mean),
        "CNTR_DIST" => ("Distance to the Miami central business district (feet)", DefaultRule::Mean),
        "SUBCNTR_DI" => ("Distance to the nearest subcenter (feet)", DefaultRule::Mean),
        "HWY_DIST" => (
            "Distance to the nearest highway (an indicator of noise) (feet)",
            DefaultRule::Mean,
        ),
        "age" => ("Age of the structure", DefaultRule::Round),
        "structure_quality" => ("Structure quality", DefaultRule::Round),
        _ => return None,
    };
    Some(entry)
}

fn select_control(name: &str) -> Option<(&'static str, Vec<f64>)> {
    let entry = match name {
        "avno60plus" => ("Airport sound over 60db / Yes = 1, No = 0", vec![1.0, 0.0]),
        "month_sold" => ("Month sold", (1..=12).map(f64::from).collect()),
        "SPEC_FEAT_VAL" => ("Special features value / Yes = 1, No = 0", vec![1.0, 0.0]),
        _ => return None,
    };
    Some(entry)
}

/// The full set of controls for a schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputForm {
    schema: FeatureSchema,
    controls: Vec<InputControl>,
}

impl InputForm {
    /// Build controls from the training data summaries, one per schema field.
    ///
    /// Fields outside the Miami layout get a plain slider labelled with
    /// their description.
    pub fn from_summaries(schema: &FeatureSchema, summaries: &[FeatureSummary]) -> Result<Self> {
        let controls = schema
            .fields()
            .iter()
            .map(|field| {
                if let Some((label, options)) = select_control(&field.name) {
                    let default = options.first().copied().unwrap_or(0.0);
                    return Ok(InputControl {
                        name: field.name.clone(),
                        label: label.to_string(),
                        kind: ControlKind::Select { options, default },
                    });
                }

                let summary = summaries.iter().find(|s| s.name == field.name).ok_or_else(|| {
                    HousingError::DataShape(format!("no training summary for feature {}", field.name))
                })?;
                let (label, rule) = slider_label(&field.name)
                    .map(|(label, rule)| (label.to_string(), rule))
                    .unwrap_or_else(|| (field.description.clone(), DefaultRule::Mean));
                let default = match rule {
                    DefaultRule::Mean => summary.mean,
                    DefaultRule::Truncate => summary.mean.trunc(),
                    DefaultRule::Round => summary.mean.round(),
                }
                .clamp(summary.min, summary.max);

                Ok(InputControl {
                    name: field.name.clone(),
                    label,
                    kind: ControlKind::Slider {
                        min: summary.min,
                        max: summary.max,
                        default,
                        integer: rule != DefaultRule::Mean,
                    },
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            schema: schema.clone(),
            controls,
        })
    }

    /// Controls for a trained model, bounded by its training data
    pub fn for_model(model: &TrainedModel) -> Result<Self> {
        Self::from_summaries(model.schema(), &model.metadata().feature_summaries)
    }

    pub fn controls(&self) -> &[InputControl] {
        &self.controls
    }

    pub fn control(&self, name: &str) -> Option<&InputControl> {
        self.controls.iter().find(|c| c.name == name)
    }

    /// Feature vector with every control at its default
    pub fn defaults(&self) -> Result<FeatureVector> {
        let values = self.controls.iter().map(|c| c.kind.default_value()).collect();
        FeatureVector::from_values(&self.schema, values)
    }

    /// Reject vectors with a value outside its control's bounds
    pub fn validate(&self, vector: &FeatureVector) -> Result<()> {
        if vector.fingerprint() != &self.schema.fingerprint() {
            return Err(HousingError::SchemaMismatch(
                "feature vector was built for a different schema".to_string(),
            ));
        }
        for (control, value) in self.controls.iter().zip(vector.values()) {
            control.check(*value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::summarize;
    use ndarray::Array2;

    fn form() -> InputForm {
        let schema = FeatureSchema::miami();
        let x = Array2::from_shape_fn((6, 13), |(i, j)| match j {
            0 => 1000.0 + 101.5 * i as f64,
            8 => 10.0 + i as f64,
            10 | 12 => (i % 2) as f64,
            11 => (i + 1) as f64,
            _ => (j * 10 + i) as f64,
        });
        let summaries = summarize(&schema, &x);
        InputForm::from_summaries(&schema, &summaries).unwrap()
    }

    #[test]
    fn test_control_kinds() {
        let form = form();
        assert_eq!(form.controls().len(), 13);

        match &form.control("LND_SQFOOT").unwrap().kind {
            ControlKind::Slider { min, max, default, integer } => {
                assert_eq!(*min, 1000.0);
                assert_eq!(*max, 1507.5);
                // mean 1253.75 truncated
                assert_eq!(*default, 1253.0);
                assert!(integer);
            }
            other => panic!("unexpected control {:?}", other),
        }
        match &form.control("age").unwrap().kind {
            ControlKind::Slider { default, .. } => assert_eq!(*default, 13.0),
            other => panic!("unexpected control {:?}", other),
        }
        match &form.control("month_sold").unwrap().kind {
            ControlKind::Select { options, default } => {
                assert_eq!(options.len(), 12);
                assert_eq!(*default, 1.0);
            }
            other => panic!("unexpected control {:?}", other),
        }
        assert_eq!(form.control("avno60plus").unwrap().kind.default_value(), 1.0);
        assert_eq!(form.control("OCEAN_DIST").unwrap().label, "Distance to the ocean (feet)");
    }

    #[test]
    fn test_defaults_validate() {
        let form = form();
        let defaults = form.defaults().unwrap();
        assert_eq!(defaults.len(), 13);
        form.validate(&defaults).unwrap();
    }

    #[test]
    fn test_out_of_range_rejected() {
        let form = form();
        let schema = FeatureSchema::miami();

        let mut values = form.defaults().unwrap().values().to_vec();
        values[0] = 99_999.0;
        let vector = FeatureVector::from_values(&schema, values).unwrap();
        match form.validate(&vector) {
            Err(HousingError::OutOfRange { feature, max, .. }) => {
                assert_eq!(feature, "LND_SQFOOT");
                assert_eq!(max, 1507.5);
            }
            other => panic!("expected OutOfRange, got {:?}", other),
        }

        let mut values = form.defaults().unwrap().values().to_vec();
        values[11] = 13.0;
        let vector = FeatureVector::from_values(&schema, values).unwrap();
        assert!(matches!(form.validate(&vector), Err(HousingError::OutOfRange { .. })));
    }

    #[test]
    fn test_missing_summary() {
        let schema = FeatureSchema::miami();
        assert!(matches!(
            InputForm::from_summaries(&schema, &[]),
            Err(HousingError::DataShape(_))
        ));
    }
}
