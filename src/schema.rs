//! Schema describing how a panel dataset maps onto the forecaster.

use serde::{Deserialize, Serialize};

/// Column names and forecast horizon for a panel dataset.
///
/// The schema is handed to the forecaster already parsed and validated by
/// the surrounding pipeline; this crate only consumes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PanelSchema {
    /// Name of the entity identifier column.
    pub id_col: String,
    /// Name of the time column.
    pub time_col: String,
    /// Name of the target column.
    pub target_col: String,
    /// Number of future steps to forecast per entity.
    pub forecast_horizon: usize,
}

impl PanelSchema {
    pub fn new(
        id_col: impl Into<String>,
        time_col: impl Into<String>,
        target_col: impl Into<String>,
        forecast_horizon: usize,
    ) -> Self {
        Self {
            id_col: id_col.into(),
            time_col: time_col.into(),
            target_col: target_col.into(),
            forecast_horizon,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_round_trips_through_json() {
        let schema = PanelSchema::new("store", "date", "sales", 12);
        let json = serde_json::to_string(&schema).unwrap();
        let back: PanelSchema = serde_json::from_str(&json).unwrap();
        assert_eq!(schema, back);
    }

    #[test]
    fn schema_parses_from_record() {
        let json = r#"{"id_col":"id","time_col":"ts","target_col":"y","forecast_horizon":3}"#;
        let schema: PanelSchema = serde_json::from_str(json).unwrap();
        assert_eq!(schema.id_col, "id");
        assert_eq!(schema.forecast_horizon, 3);
    }
}
