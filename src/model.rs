//! Per-entity model adapter around the augurs exponential smoothing delegate.
//!
//! One [`FittedSeriesModel`] is held per entity. All statistical work
//! (component selection, parameter estimation, AIC scoring) happens inside
//! [`AutoETS`]; this module only maps the configured hyperparameters onto
//! the delegate's model specification and keeps what is needed to rebuild
//! the fit deterministically.

use crate::config::{ForecasterConfig, SeasonalPeriods};
use crate::core::EntitySeries;
use crate::error::{ForecastError, Result};
use augurs::ets::{AutoETS, FittedAutoETS};
use augurs::prelude::*;
use chrono::Duration;
use std::fmt;
use tracing::debug;

/// Minimum observations the delegate needs for a stable fit.
const MIN_OBSERVATIONS: usize = 3;

/// A fitted per-entity model together with what is needed to rebuild it.
pub struct FittedSeriesModel {
    fitted: FittedAutoETS,
    /// Training window the model was fitted on, after truncation, in the
    /// original (untransformed) scale.
    training_values: Vec<f64>,
    /// Season length in observations actually used (1 = non-seasonal).
    season_length: usize,
    /// Whether a log transform was applied before fitting.
    log_transformed: bool,
}

impl fmt::Debug for FittedSeriesModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FittedSeriesModel")
            .field("n_observations", &self.training_values.len())
            .field("season_length", &self.season_length)
            .field("log_transformed", &self.log_transformed)
            .finish_non_exhaustive()
    }
}

impl FittedSeriesModel {
    /// Forecast the next `horizon` values on the original scale.
    ///
    /// Prediction does not mutate the model; repeated calls with the same
    /// horizon return identical values.
    pub fn predict(&self, horizon: usize) -> Result<Vec<f64>> {
        if horizon == 0 {
            return Ok(Vec::new());
        }
        let forecast = self
            .fitted
            .predict(horizon, None)
            .map_err(|e| ForecastError::Model(format!("predict: {e}")))?;
        let mut point = forecast.point;
        if self.log_transformed {
            for value in &mut point {
                *value = value.exp();
            }
        }
        Ok(point)
    }

    /// Number of observations in the training window.
    pub fn n_observations(&self) -> usize {
        self.training_values.len()
    }

    /// Season length used by the fit (1 = non-seasonal).
    pub fn season_length(&self) -> usize {
        self.season_length
    }

    pub(crate) fn training_values(&self) -> &[f64] {
        &self.training_values
    }
}

/// Fit one model to one entity's (possibly truncated) series.
pub fn fit_series_model(
    config: &ForecasterConfig,
    series: &EntitySeries,
) -> Result<FittedSeriesModel> {
    let season_length = resolve_season_length(config, series);
    refit_series_model(config, series.values().to_vec(), season_length)
}

/// Fit with an already-resolved season length. Used both by the initial fit
/// and by the load path, which stores the resolved season length so the
/// rebuild does not depend on timestamps.
pub(crate) fn refit_series_model(
    config: &ForecasterConfig,
    values: Vec<f64>,
    season_length: usize,
) -> Result<FittedSeriesModel> {
    if values.len() < MIN_OBSERVATIONS {
        return Err(ForecastError::InsufficientData {
            needed: MIN_OBSERVATIONS,
            got: values.len(),
        });
    }

    let log_transformed = config.use_box_cox == Some(true);
    let training: Vec<f64> = if log_transformed {
        if values.iter().any(|&v| v <= 0.0) {
            return Err(ForecastError::InvalidParameter(
                "box-cox transform requires strictly positive values".to_string(),
            ));
        }
        values.iter().map(|v| v.ln()).collect()
    } else {
        values.clone()
    };

    let spec = ets_spec(config, season_length);
    debug!(
        n = values.len(),
        season_length,
        spec = spec.as_str(),
        log_transformed,
        "fitting series model"
    );

    let model = AutoETS::new(season_length, spec.as_str())
        .map_err(|e| ForecastError::Model(format!("init: {e}")))?;
    let fitted = model
        .fit(&training)
        .map_err(|e| ForecastError::Model(format!("fit: {e}")))?;

    Ok(FittedSeriesModel {
        fitted,
        training_values: values,
        season_length,
        log_transformed,
    })
}

/// Resolve the seasonal period for one series from the configuration.
///
/// Fixed periods pass straight through (the delegate rejects what it cannot
/// fit, and that error propagates). Frequency-derived seasonality falls back
/// to non-seasonal unless the window holds two full cycles plus a margin.
fn resolve_season_length(config: &ForecasterConfig, series: &EntitySeries) -> usize {
    match &config.seasonal_periods {
        SeasonalPeriods::None => 1,
        SeasonalPeriods::Fixed(periods) => {
            periods.first().copied().filter(|&p| p > 1).unwrap_or(1)
        }
        SeasonalPeriods::Freq => {
            let period = series
                .modal_spacing()
                .and_then(naive_seasonal_period)
                .unwrap_or(1);
            if period > 1 && series.len() > 2 * period + 4 {
                period
            } else {
                1
            }
        }
    }
}

/// Build the three-letter ETS specification (error, trend, season) from the
/// configuration. 'Z' components are selected by the delegate's AIC search,
/// which also covers damped-trend candidates.
fn ets_spec(config: &ForecasterConfig, season_length: usize) -> String {
    let error = 'Z';
    let trend = match config.use_trend {
        Option::None => 'Z',
        Some(true) => 'A',
        Some(false) => 'N',
    };
    let season = if season_length > 1 { 'Z' } else { 'N' };
    format!("{error}{trend}{season}")
}

/// Naive seasonal period for a given observation spacing, e.g. 12 for
/// monthly series.
fn naive_seasonal_period(spacing: Duration) -> Option<usize> {
    let secs = spacing.num_seconds();
    const HOUR: i64 = 3_600;
    const DAY: i64 = 86_400;
    match secs {
        HOUR => Some(24),
        DAY => Some(7),
        s if s == 7 * DAY => Some(52),
        s if (28 * DAY..=31 * DAY).contains(&s) => Some(12),
        s if (90 * DAY..=92 * DAY).contains(&s) => Some(4),
        _ => None,
    }
}
