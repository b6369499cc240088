//! Core data structures for panel forecasting.

mod panel;

pub use panel::{
    EntitySeries, ForecastFrame, ForecastRow, FutureFrame, FutureRow, Panel, PanelRow,
};
