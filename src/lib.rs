//! # panel-forecast
//!
//! Per-entity forecasting over multi-series panel data.
//!
//! Fits one univariate exponential-smoothing-family model per entity
//! (delegated to [`augurs`]' automatic ETS with AIC-based selection),
//! fans fitting out over a worker pool in contiguous batches, and exposes
//! a uniform train / predict / save / load interface. The fitted ensemble
//! persists as a single versioned JSON record.
//!
//! # Example
//!
//! ```
//! use chrono::{Duration, TimeZone, Utc};
//! use panel_forecast::core::{FutureFrame, Panel};
//! use panel_forecast::{train_predictor_model, ForecasterConfig, PanelSchema};
//!
//! let schema = PanelSchema::new("store", "week", "sales", 3);
//! let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
//!
//! let mut history = Panel::new();
//! for i in 0..30 {
//!     history.push("A", base + Duration::weeks(i), 100.0 + i as f64);
//! }
//!
//! let model = train_predictor_model(&history, &schema, ForecasterConfig::default()).unwrap();
//!
//! let mut future = FutureFrame::new();
//! for i in 30..33 {
//!     future.push("A", base + Duration::weeks(i));
//! }
//! let forecast = model.predict(&future, "prediction").unwrap();
//! assert_eq!(forecast.len(), 3);
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod fitter;
pub mod forecaster;
pub mod model;
pub mod schema;

pub use config::{ForecasterConfig, SeasonalPeriods};
pub use error::{ForecastError, Result};
pub use forecaster::{
    load_predictor_model, predict_with_model, save_predictor_model, train_predictor_model,
    Forecaster, PREDICTOR_FILE_NAME,
};
pub use schema::PanelSchema;

/// Convenience re-exports for typical usage.
pub mod prelude {
    pub use crate::config::{ForecasterConfig, SeasonalPeriods};
    pub use crate::core::{ForecastFrame, FutureFrame, Panel};
    pub use crate::error::{ForecastError, Result};
    pub use crate::forecaster::Forecaster;
    pub use crate::schema::PanelSchema;
}
