//! The orchestrator: fits one model per entity, dispatches predictions,
//! and persists the whole ensemble as a single versioned record.

use crate::config::ForecasterConfig;
use crate::core::{ForecastFrame, FutureFrame, Panel};
use crate::error::{ForecastError, Result};
use crate::fitter;
use crate::model::FittedSeriesModel;
use crate::schema::PanelSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write as _};
use std::path::Path;
use tracing::info;

/// Fixed file name of the persisted predictor inside a model directory.
pub const PREDICTOR_FILE_NAME: &str = "predictor.json";

/// Current persistence format version.
const PREDICTOR_FORMAT_VERSION: u32 = 1;

/// Panel forecaster: one exponential smoothing model per entity.
///
/// Provides a uniform fit / predict / save / load interface over a panel
/// dataset. Fitting fans out over a worker pool; prediction runs
/// sequentially, one entity at a time, in the entity order recorded at fit
/// time.
pub struct Forecaster {
    config: ForecasterConfig,
    schema: PanelSchema,
    models: HashMap<String, FittedSeriesModel>,
    entity_ids: Vec<String>,
    trained: bool,
}

/// On-disk representation: configuration plus one training window per
/// entity. The delegate's fitted state is rebuilt deterministically on load.
#[derive(Serialize, Deserialize)]
struct SavedPredictor {
    version: u32,
    config: ForecasterConfig,
    schema: PanelSchema,
    entity_ids: Vec<String>,
    models: Vec<SavedSeriesModel>,
}

#[derive(Serialize, Deserialize)]
struct SavedSeriesModel {
    entity: String,
    season_length: usize,
    values: Vec<f64>,
}

impl Forecaster {
    /// Create an untrained forecaster.
    pub fn new(schema: PanelSchema, config: ForecasterConfig) -> Self {
        Self {
            config,
            schema,
            models: HashMap::new(),
            entity_ids: Vec::new(),
            trained: false,
        }
    }

    /// Fit one model per entity in the panel.
    ///
    /// Rows are grouped by entity identifier in order of first appearance;
    /// when `history_forecast_ratio` is configured, each series is truncated
    /// to its most recent `forecast_horizon * ratio` observations before
    /// fitting. A fit error for any entity aborts the whole step.
    pub fn fit(&mut self, history: &Panel, schema: &PanelSchema) -> Result<()> {
        let mut entities = history.group_by_entity()?;
        if let Some(max_len) = self.config.history_length(schema.forecast_horizon) {
            for (_, series) in &mut entities {
                series.truncate_to_recent(max_len);
            }
        }

        let models = fitter::fit_all(&self.config, &entities)?;

        self.entity_ids = entities.into_iter().map(|(id, _)| id).collect();
        self.models = models;
        self.schema = schema.clone();
        self.trained = true;
        info!(entities = self.entity_ids.len(), "fit complete");
        Ok(())
    }

    /// Forecast the supplied future rows, one entity at a time.
    ///
    /// For each entity known at fit time (in fit order), forecasts exactly
    /// as many values as future rows were supplied for it. Entities with no
    /// stored model or no future rows produce no output rows rather than
    /// an error. Entities present only in the test data are ignored.
    pub fn predict(
        &self,
        test_data: &FutureFrame,
        prediction_col_name: &str,
    ) -> Result<ForecastFrame> {
        if !self.trained {
            return Err(ForecastError::NotFitted);
        }

        let future = test_data.group_by_entity();
        let mut frame = ForecastFrame::new(prediction_col_name);
        for id in &self.entity_ids {
            let Some(timestamps) = future.get(id.as_str()) else {
                continue;
            };
            let Some(model) = self.models.get(id) else {
                continue;
            };
            let values = model.predict(timestamps.len())?;
            for (timestamp, value) in timestamps.iter().zip(values) {
                frame.push(id.clone(), *timestamp, value);
            }
        }
        info!(rows = frame.len(), "forecast assembled");
        Ok(frame)
    }

    /// Save the trained forecaster as one file in `model_dir_path`.
    pub fn save(&self, model_dir_path: &Path) -> Result<()> {
        if !self.trained {
            return Err(ForecastError::NotFitted);
        }

        let record = SavedPredictor {
            version: PREDICTOR_FORMAT_VERSION,
            config: self.config.clone(),
            schema: self.schema.clone(),
            entity_ids: self.entity_ids.clone(),
            models: self
                .entity_ids
                .iter()
                .filter_map(|id| {
                    self.models.get(id).map(|model| SavedSeriesModel {
                        entity: id.clone(),
                        season_length: model.season_length(),
                        values: model.training_values().to_vec(),
                    })
                })
                .collect(),
        };

        let path = model_dir_path.join(PREDICTOR_FILE_NAME);
        let mut writer = BufWriter::new(File::create(&path)?);
        serde_json::to_writer(&mut writer, &record)?;
        writer.flush()?;
        info!(path = %path.display(), entities = record.models.len(), "predictor saved");
        Ok(())
    }

    /// Load a forecaster saved by [`Forecaster::save`], ready for
    /// [`Forecaster::predict`]. Each entity's model is rebuilt from its
    /// stored training window; the rebuild is deterministic, so predictions
    /// match the pre-save instance exactly.
    pub fn load(model_dir_path: &Path) -> Result<Self> {
        let path = model_dir_path.join(PREDICTOR_FILE_NAME);
        let record: SavedPredictor = serde_json::from_reader(BufReader::new(File::open(&path)?))?;
        if record.version != PREDICTOR_FORMAT_VERSION {
            return Err(ForecastError::UnsupportedVersion {
                found: record.version,
                supported: PREDICTOR_FORMAT_VERSION,
            });
        }

        let entries: Vec<(String, Vec<f64>, usize)> = record
            .models
            .into_iter()
            .map(|m| (m.entity, m.values, m.season_length))
            .collect();
        let models = fitter::refit_all(&record.config, entries)?;
        info!(path = %path.display(), entities = models.len(), "predictor loaded");

        Ok(Self {
            config: record.config,
            schema: record.schema,
            models,
            entity_ids: record.entity_ids,
            trained: true,
        })
    }

    /// Whether `fit` has completed successfully.
    pub fn is_trained(&self) -> bool {
        self.trained
    }

    /// Entity identifiers recorded at fit time, in fit order.
    pub fn entity_ids(&self) -> &[String] {
        &self.entity_ids
    }

    /// Number of stored per-entity models.
    pub fn model_count(&self) -> usize {
        self.models.len()
    }

    /// The stored model for one entity, if any.
    pub fn model(&self, entity: &str) -> Option<&FittedSeriesModel> {
        self.models.get(entity)
    }

    pub fn config(&self) -> &ForecasterConfig {
        &self.config
    }

    pub fn schema(&self) -> &PanelSchema {
        &self.schema
    }
}

impl std::fmt::Display for Forecaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Model name: ETS Panel Forecaster")
    }
}

/// Instantiate and train a predictor on the given panel history.
pub fn train_predictor_model(
    history: &Panel,
    schema: &PanelSchema,
    config: ForecasterConfig,
) -> Result<Forecaster> {
    let mut model = Forecaster::new(schema.clone(), config);
    model.fit(history, schema)?;
    Ok(model)
}

/// Make a forecast with a trained predictor.
pub fn predict_with_model(
    model: &Forecaster,
    test_data: &FutureFrame,
    prediction_col_name: &str,
) -> Result<ForecastFrame> {
    model.predict(test_data, prediction_col_name)
}

/// Save a trained predictor, creating the directory when missing.
pub fn save_predictor_model(model: &Forecaster, predictor_dir_path: &Path) -> Result<()> {
    std::fs::create_dir_all(predictor_dir_path)?;
    model.save(predictor_dir_path)
}

/// Load a predictor saved by [`save_predictor_model`].
pub fn load_predictor_model(predictor_dir_path: &Path) -> Result<Forecaster> {
    Forecaster::load(predictor_dir_path)
}
