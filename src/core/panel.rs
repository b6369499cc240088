//! Panel dataset structures: ordered multi-entity observations.

use crate::error::{ForecastError, Result};
use crate::schema::PanelSchema;
use chrono::{DateTime, Duration, Utc};
use std::cmp::Reverse;
use std::collections::HashMap;

/// One observation in a panel dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct PanelRow {
    pub entity: String,
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

/// An ordered panel dataset: rows tagged with an entity identifier, a
/// timestamp, and a target value.
///
/// Row order is preserved exactly as given; grouping derives the entity
/// order from the first appearance of each identifier.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Panel {
    rows: Vec<PanelRow>,
}

impl Panel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rows(rows: Vec<PanelRow>) -> Self {
        Self { rows }
    }

    /// Append one observation.
    pub fn push(&mut self, entity: impl Into<String>, timestamp: DateTime<Utc>, value: f64) {
        self.rows.push(PanelRow {
            entity: entity.into(),
            timestamp,
            value,
        });
    }

    pub fn rows(&self) -> &[PanelRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Build a panel from already-parsed JSON records using the schema's
    /// column names. The time column accepts RFC 3339 strings or integer
    /// unix seconds; extra columns (covariates) are ignored.
    pub fn from_records(records: &[serde_json::Value], schema: &PanelSchema) -> Result<Self> {
        let mut panel = Panel::new();
        for record in records {
            let entity = record_string(record, &schema.id_col)?;
            let timestamp = record_timestamp(record, &schema.time_col)?;
            let value = record
                .get(&schema.target_col)
                .and_then(|v| v.as_f64())
                .ok_or_else(|| {
                    ForecastError::InvalidParameter(format!(
                        "record is missing numeric column {:?}",
                        schema.target_col
                    ))
                })?;
            panel.push(entity, timestamp, value);
        }
        Ok(panel)
    }

    /// Group rows by entity identifier, preserving each entity's row order
    /// and recording entities in order of first appearance.
    ///
    /// Timestamps must be strictly increasing within an entity.
    pub fn group_by_entity(&self) -> Result<Vec<(String, EntitySeries)>> {
        let mut order: Vec<String> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();
        let mut series: Vec<(Vec<DateTime<Utc>>, Vec<f64>)> = Vec::new();

        for row in &self.rows {
            let slot = match index.get(row.entity.as_str()) {
                Some(&i) => i,
                None => {
                    order.push(row.entity.clone());
                    series.push((Vec::new(), Vec::new()));
                    index.insert(row.entity.clone(), order.len() - 1);
                    order.len() - 1
                }
            };
            series[slot].0.push(row.timestamp);
            series[slot].1.push(row.value);
        }

        order
            .into_iter()
            .zip(series)
            .map(|(entity, (timestamps, values))| {
                let series = EntitySeries::new(timestamps, values).map_err(|e| match e {
                    ForecastError::Timestamp(msg) => {
                        ForecastError::Timestamp(format!("entity {entity:?}: {msg}"))
                    }
                    other => other,
                })?;
                Ok((entity, series))
            })
            .collect()
    }
}

fn record_string(record: &serde_json::Value, column: &str) -> Result<String> {
    record
        .get(column)
        .and_then(|v| v.as_str())
        .map(str::to_owned)
        .ok_or_else(|| {
            ForecastError::InvalidParameter(format!("record is missing string column {column:?}"))
        })
}

fn record_timestamp(record: &serde_json::Value, column: &str) -> Result<DateTime<Utc>> {
    let value = record.get(column).ok_or_else(|| {
        ForecastError::InvalidParameter(format!("record is missing time column {column:?}"))
    })?;
    match value {
        serde_json::Value::String(s) => DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| ForecastError::Timestamp(format!("cannot parse {s:?}: {e}"))),
        serde_json::Value::Number(n) => n
            .as_i64()
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .ok_or_else(|| ForecastError::Timestamp(format!("invalid unix timestamp: {n}"))),
        other => Err(ForecastError::Timestamp(format!(
            "unsupported time value: {other}"
        ))),
    }
}

/// One entity's ordered univariate series.
#[derive(Debug, Clone, PartialEq)]
pub struct EntitySeries {
    timestamps: Vec<DateTime<Utc>>,
    values: Vec<f64>,
}

impl EntitySeries {
    /// Create a series, validating that timestamps and values align and
    /// that timestamps are strictly increasing.
    pub fn new(timestamps: Vec<DateTime<Utc>>, values: Vec<f64>) -> Result<Self> {
        if timestamps.len() != values.len() {
            return Err(ForecastError::InvalidParameter(format!(
                "{} timestamps for {} values",
                timestamps.len(),
                values.len()
            )));
        }
        for pair in timestamps.windows(2) {
            if pair[1] <= pair[0] {
                return Err(ForecastError::Timestamp(
                    "timestamps must be strictly increasing".to_string(),
                ));
            }
        }
        Ok(Self { timestamps, values })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn timestamps(&self) -> &[DateTime<Utc>] {
        &self.timestamps
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Keep only the most recent `max_len` observations. A no-op when the
    /// series is already `max_len` or shorter; never pads or errors.
    pub fn truncate_to_recent(&mut self, max_len: usize) {
        if self.values.len() > max_len {
            let cut = self.values.len() - max_len;
            self.timestamps.drain(..cut);
            self.values.drain(..cut);
        }
    }

    /// Modal spacing between consecutive timestamps, used for naive
    /// frequency-based seasonality. Ties resolve to the smaller spacing.
    pub fn modal_spacing(&self) -> Option<Duration> {
        if self.timestamps.len() < 2 {
            return None;
        }
        let mut counts: HashMap<i64, usize> = HashMap::new();
        for pair in self.timestamps.windows(2) {
            *counts.entry((pair[1] - pair[0]).num_seconds()).or_insert(0) += 1;
        }
        counts
            .into_iter()
            .max_by_key(|&(secs, count)| (count, Reverse(secs)))
            .map(|(secs, _)| Duration::seconds(secs))
    }
}

/// One future-period input row: an entity identifier and a timestamp for
/// which a prediction is requested.
#[derive(Debug, Clone, PartialEq)]
pub struct FutureRow {
    pub entity: String,
    pub timestamp: DateTime<Utc>,
}

/// Future-period input rows for prediction, in caller-supplied order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FutureFrame {
    rows: Vec<FutureRow>,
}

impl FutureFrame {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entity: impl Into<String>, timestamp: DateTime<Utc>) {
        self.rows.push(FutureRow {
            entity: entity.into(),
            timestamp,
        });
    }

    pub fn rows(&self) -> &[FutureRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Build a future frame from already-parsed JSON records using the
    /// schema's column names. The target column is not required.
    pub fn from_records(records: &[serde_json::Value], schema: &PanelSchema) -> Result<Self> {
        let mut frame = FutureFrame::new();
        for record in records {
            let entity = record_string(record, &schema.id_col)?;
            let timestamp = record_timestamp(record, &schema.time_col)?;
            frame.push(entity, timestamp);
        }
        Ok(frame)
    }

    /// Per-entity timestamps, preserving the row order within each entity.
    pub fn group_by_entity(&self) -> HashMap<&str, Vec<DateTime<Utc>>> {
        let mut groups: HashMap<&str, Vec<DateTime<Utc>>> = HashMap::new();
        for row in &self.rows {
            groups
                .entry(row.entity.as_str())
                .or_default()
                .push(row.timestamp);
        }
        groups
    }
}

/// One forecast output row.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastRow {
    pub entity: String,
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

/// Combined forecast output across entities.
///
/// Row order is entity order (as recorded at fit time) crossed with the
/// per-entity future-row order; the prediction column carries the
/// caller-supplied name in place of the schema's target column.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastFrame {
    prediction_column: String,
    rows: Vec<ForecastRow>,
}

impl ForecastFrame {
    pub fn new(prediction_column: impl Into<String>) -> Self {
        Self {
            prediction_column: prediction_column.into(),
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, entity: impl Into<String>, timestamp: DateTime<Utc>, value: f64) {
        self.rows.push(ForecastRow {
            entity: entity.into(),
            timestamp,
            value,
        });
    }

    /// Name of the prediction column.
    pub fn prediction_column(&self) -> &str {
        &self.prediction_column
    }

    pub fn rows(&self) -> &[ForecastRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows belonging to one entity, in output order.
    pub fn rows_for<'a>(&'a self, entity: &'a str) -> impl Iterator<Item = &'a ForecastRow> {
        self.rows.iter().filter(move |row| row.entity == entity)
    }

    /// Distinct entities in output order.
    pub fn entities(&self) -> Vec<&str> {
        let mut seen = Vec::new();
        for row in &self.rows {
            if !seen.contains(&row.entity.as_str()) {
                seen.push(row.entity.as_str());
            }
        }
        seen
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn day(i: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1 + i, 0, 0, 0).unwrap()
    }

    fn month(i: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 1 + i, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn grouping_preserves_first_appearance_order() {
        let mut panel = Panel::new();
        panel.push("B", day(0), 1.0);
        panel.push("A", day(0), 10.0);
        panel.push("B", day(1), 2.0);
        panel.push("A", day(1), 20.0);

        let groups = panel.group_by_entity().unwrap();
        let ids: Vec<&str> = groups.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["B", "A"]);
        assert_eq!(groups[0].1.values(), &[1.0, 2.0]);
        assert_eq!(groups[1].1.values(), &[10.0, 20.0]);
    }

    #[test]
    fn grouping_rejects_non_increasing_timestamps_within_entity() {
        let mut panel = Panel::new();
        panel.push("A", day(1), 1.0);
        panel.push("A", day(0), 2.0);

        let result = panel.group_by_entity();
        assert!(matches!(result, Err(ForecastError::Timestamp(_))));
    }

    #[test]
    fn grouping_allows_interleaved_entities() {
        let mut panel = Panel::new();
        panel.push("A", day(0), 1.0);
        panel.push("B", day(0), 5.0);
        panel.push("A", day(1), 2.0);
        panel.push("B", day(1), 6.0);
        panel.push("A", day(2), 3.0);

        let groups = panel.group_by_entity().unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].1.len(), 3);
        assert_eq!(groups[1].1.len(), 2);
    }

    #[test]
    fn panel_from_records_uses_schema_columns() {
        let schema = PanelSchema::new("store", "date", "sales", 3);
        let records = vec![
            json!({"store": "A", "date": "2024-01-01T00:00:00Z", "sales": 10.0, "promo": 1}),
            json!({"store": "A", "date": 1704153600, "sales": 12}),
        ];

        let panel = Panel::from_records(&records, &schema).unwrap();
        assert_eq!(panel.len(), 2);
        assert_eq!(panel.rows()[0].value, 10.0);
        assert_eq!(panel.rows()[1].value, 12.0);
        assert!(panel.rows()[1].timestamp > panel.rows()[0].timestamp);
    }

    #[test]
    fn panel_from_records_reports_missing_columns() {
        let schema = PanelSchema::new("store", "date", "sales", 3);
        let records = vec![json!({"store": "A", "date": "2024-01-01T00:00:00Z"})];

        let result = Panel::from_records(&records, &schema);
        assert!(matches!(result, Err(ForecastError::InvalidParameter(_))));
    }

    #[test]
    fn series_truncation_keeps_most_recent() {
        let timestamps: Vec<_> = (0..5).map(day).collect();
        let mut series = EntitySeries::new(timestamps, vec![1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();

        series.truncate_to_recent(3);
        assert_eq!(series.values(), &[3.0, 4.0, 5.0]);
        assert_eq!(series.timestamps()[0], day(2));
    }

    #[test]
    fn series_truncation_is_noop_when_short() {
        let timestamps: Vec<_> = (0..3).map(day).collect();
        let mut series = EntitySeries::new(timestamps, vec![1.0, 2.0, 3.0]).unwrap();

        series.truncate_to_recent(10);
        assert_eq!(series.len(), 3);

        series.truncate_to_recent(3);
        assert_eq!(series.len(), 3);
    }

    #[test]
    fn series_rejects_misaligned_inputs() {
        let result = EntitySeries::new(vec![day(0)], vec![1.0, 2.0]);
        assert!(matches!(result, Err(ForecastError::InvalidParameter(_))));
    }

    #[test]
    fn modal_spacing_finds_dominant_interval() {
        let timestamps: Vec<_> = (0..12).map(month).collect();
        let series = EntitySeries::new(timestamps, vec![0.0; 12]).unwrap();

        let spacing = series.modal_spacing().unwrap();
        // Months vary in length; the modal spacing lands on 31 days for a
        // January-start year.
        assert!(spacing >= Duration::days(28) && spacing <= Duration::days(31));
    }

    #[test]
    fn modal_spacing_needs_two_points() {
        let series = EntitySeries::new(vec![day(0)], vec![1.0]).unwrap();
        assert!(series.modal_spacing().is_none());
    }

    #[test]
    fn future_frame_groups_preserve_row_order() {
        let mut frame = FutureFrame::new();
        frame.push("A", day(0));
        frame.push("B", day(0));
        frame.push("A", day(1));

        let groups = frame.group_by_entity();
        assert_eq!(groups["A"], vec![day(0), day(1)]);
        assert_eq!(groups["B"], vec![day(0)]);
    }

    #[test]
    fn forecast_frame_tracks_entities_in_order() {
        let mut frame = ForecastFrame::new("prediction");
        frame.push("B", day(0), 1.0);
        frame.push("B", day(1), 2.0);
        frame.push("A", day(0), 3.0);

        assert_eq!(frame.prediction_column(), "prediction");
        assert_eq!(frame.entities(), vec!["B", "A"]);
        assert_eq!(frame.rows_for("B").count(), 2);
        assert_eq!(frame.rows_for("C").count(), 0);
    }
}
