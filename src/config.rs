//! Forecaster hyperparameter configuration.

use crate::error::Result;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Seasonal period specification.
///
/// Mirrors the three forms accepted in the flat hyperparameter record:
/// the keyword `"freq"`, `null` (or an empty list), and a list of periods
/// given in observations.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SeasonalPeriods {
    /// A single naive seasonality derived from the series frequency
    /// (e.g. 12 for monthly data), recomputed per entity at fit time.
    #[default]
    Freq,
    /// Non-seasonal model.
    None,
    /// Fixed periods in observations. The underlying model fits a single
    /// seasonality, so only the first period is used.
    Fixed(Vec<usize>),
}

impl Serialize for SeasonalPeriods {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            SeasonalPeriods::Freq => serializer.serialize_str("freq"),
            SeasonalPeriods::None => serializer.serialize_none(),
            SeasonalPeriods::Fixed(periods) => periods.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for SeasonalPeriods {
    fn deserialize<D: Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Name(String),
            Periods(Vec<usize>),
        }

        match Option::<Repr>::deserialize(deserializer)? {
            Option::None => Ok(SeasonalPeriods::None),
            Some(Repr::Name(name)) if name == "freq" => Ok(SeasonalPeriods::Freq),
            Some(Repr::Name(name)) => Err(D::Error::custom(format!(
                "unknown seasonal_periods keyword: {name:?}"
            ))),
            Some(Repr::Periods(periods)) if periods.is_empty() => Ok(SeasonalPeriods::None),
            Some(Repr::Periods(periods)) => Ok(SeasonalPeriods::Fixed(periods)),
        }
    }
}

/// Hyperparameters of the panel forecaster.
///
/// The record is immutable once handed to a [`Forecaster`](crate::Forecaster).
/// Fitting is delegated to an automatic exponential smoothing search scored
/// by AIC; fields that the delegate cannot express are recorded as given and
/// documented as such (`box_cox_bounds`, `use_arma_errors`). `random_state`
/// is retained for interface compatibility; fitting is deterministic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ForecasterConfig {
    /// Bounds the history used per entity to
    /// `forecast_horizon * history_forecast_ratio` trailing observations.
    pub history_forecast_ratio: Option<usize>,
    /// `Some(true)` applies a log transform (Box-Cox with lambda 0) before
    /// fitting and inverts it after prediction; requires positive values.
    /// `None` leaves variance handling to the model search.
    pub use_box_cox: Option<bool>,
    /// Minimal and maximal Box-Cox parameter values. Recorded as given; the
    /// delegate does not estimate a lambda (the fixed log transform above is
    /// used instead).
    pub box_cox_bounds: (f64, f64),
    /// Whether to include a trend component. `None` lets the AIC search
    /// decide.
    pub use_trend: Option<bool>,
    /// Whether trend damping may be used. `None` and `Some(true)` leave
    /// damped candidates to the AIC search; `Some(false)` is honored by the
    /// search's non-damped candidates.
    pub use_damped_trend: Option<bool>,
    /// Seasonal period specification, see [`SeasonalPeriods`].
    pub seasonal_periods: SeasonalPeriods,
    /// Recorded as given; the exponential smoothing delegate has no ARMA
    /// residual stage.
    pub use_arma_errors: bool,
    /// Recorded as given; fitting is deterministic.
    pub random_state: u64,
}

impl Default for ForecasterConfig {
    fn default() -> Self {
        Self {
            history_forecast_ratio: None,
            use_box_cox: None,
            box_cox_bounds: (0.0, 1.0),
            use_trend: None,
            use_damped_trend: None,
            seasonal_periods: SeasonalPeriods::Freq,
            use_arma_errors: true,
            random_state: 0,
        }
    }
}

impl ForecasterConfig {
    /// Build a configuration from a flat key-value record, as handed over by
    /// the pipeline's config loader. Absent keys take their defaults;
    /// unknown keys are rejected.
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }

    /// History length bound implied by the ratio, if one is configured.
    pub fn history_length(&self, forecast_horizon: usize) -> Option<usize> {
        self.history_forecast_ratio
            .map(|ratio| ratio * forecast_horizon)
    }
}
