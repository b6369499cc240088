//! Batched parallel fitting of per-entity models.
//!
//! Entities are split into contiguous batches sized so that the number of
//! batches never exceeds the worker count; batches run on a dedicated
//! worker pool and their partial maps are merged after a full join. Batch
//! boundaries are a pure function of input order and worker count and do
//! not affect fitting results.

use crate::config::ForecasterConfig;
use crate::core::EntitySeries;
use crate::error::{ForecastError, Result};
use crate::model::{fit_series_model, refit_series_model, FittedSeriesModel};
use rayon::prelude::*;
use std::collections::HashMap;
use std::thread;
use tracing::info;

/// Number of fitting workers: one less than the available parallelism,
/// at least one. One CPU is spared for other tasks.
pub fn worker_count() -> usize {
    let cpus = thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    cpus.saturating_sub(1).max(1)
}

/// Contiguous batch size for `n_series` entities over `workers` workers.
pub fn series_per_batch(n_series: usize, workers: usize) -> usize {
    if n_series <= workers {
        1
    } else {
        1 + n_series / workers
    }
}

/// Fit one model per entity, processing contiguous batches in parallel.
/// The first fit error aborts the whole step and propagates.
pub fn fit_all(
    config: &ForecasterConfig,
    entities: &[(String, EntitySeries)],
) -> Result<HashMap<String, FittedSeriesModel>> {
    fit_batched(entities, |(id, series)| {
        Ok((id.clone(), fit_series_model(config, series)?))
    })
}

/// Rebuild models from stored training windows and resolved season lengths.
/// Same batching as the initial fit; each rebuild is deterministic.
pub(crate) fn refit_all(
    config: &ForecasterConfig,
    entries: Vec<(String, Vec<f64>, usize)>,
) -> Result<HashMap<String, FittedSeriesModel>> {
    fit_batched(&entries, |(id, values, season_length)| {
        Ok((
            id.clone(),
            refit_series_model(config, values.clone(), *season_length)?,
        ))
    })
}

fn fit_batched<T, F>(items: &[T], fit_one: F) -> Result<HashMap<String, FittedSeriesModel>>
where
    T: Sync,
    F: Fn(&T) -> Result<(String, FittedSeriesModel)> + Send + Sync,
{
    if items.is_empty() {
        return Ok(HashMap::new());
    }

    let workers = worker_count();
    let batch_size = series_per_batch(items.len(), workers);
    let batches: Vec<&[T]> = items.chunks(batch_size).collect();
    info!(
        entities = items.len(),
        workers,
        batches = batches.len(),
        "fitting entity models"
    );

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build()
        .map_err(|e| ForecastError::ThreadPool(e.to_string()))?;

    // One worker per batch; within a batch, entities fit sequentially.
    let partials: Vec<HashMap<String, FittedSeriesModel>> = pool.install(|| {
        batches
            .par_iter()
            .map(|batch| {
                let mut models = HashMap::with_capacity(batch.len());
                for item in *batch {
                    let (id, model) = fit_one(item)?;
                    models.insert(id, model);
                }
                Ok(models)
            })
            .collect::<Result<Vec<_>>>()
    })?;

    let mut models = HashMap::with_capacity(items.len());
    for partial in partials {
        models.extend(partial);
    }
    Ok(models)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    // Two-day spacing maps to no naive seasonal period.
    fn sample_series(n: usize, base_value: f64) -> EntitySeries {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let timestamps: Vec<DateTime<Utc>> =
            (0..n).map(|i| base + Duration::days(2 * i as i64)).collect();
        let values: Vec<f64> = (0..n).map(|i| base_value + i as f64).collect();
        EntitySeries::new(timestamps, values).unwrap()
    }

    #[test]
    fn worker_count_is_at_least_one() {
        assert!(worker_count() >= 1);
    }

    #[test]
    fn batch_size_is_one_when_few_series() {
        assert_eq!(series_per_batch(1, 4), 1);
        assert_eq!(series_per_batch(4, 4), 1);
    }

    #[test]
    fn batch_count_never_exceeds_workers() {
        for n_series in [1usize, 3, 5, 17, 100, 101] {
            for workers in [1usize, 2, 3, 7, 16] {
                let size = series_per_batch(n_series, workers);
                let batches = n_series.div_ceil(size);
                assert!(
                    batches <= workers,
                    "{n_series} series over {workers} workers gave {batches} batches"
                );
            }
        }
    }

    #[test]
    fn batches_are_contiguous_and_cover_all_series() {
        let ids: Vec<usize> = (0..23).collect();
        let size = series_per_batch(ids.len(), 4);
        let flattened: Vec<usize> = ids.chunks(size).flatten().copied().collect();
        assert_eq!(flattened, ids);
    }

    #[test]
    fn fit_all_returns_one_model_per_entity() {
        let entities: Vec<(String, EntitySeries)> = (0..5)
            .map(|i| (format!("e{i}"), sample_series(20, 10.0 * i as f64)))
            .collect();

        let models = fit_all(&ForecasterConfig::default(), &entities).unwrap();
        assert_eq!(models.len(), 5);
        for i in 0..5 {
            assert!(models.contains_key(&format!("e{i}")));
        }
    }

    #[test]
    fn fit_all_on_empty_input_is_empty() {
        let models = fit_all(&ForecasterConfig::default(), &[]).unwrap();
        assert!(models.is_empty());
    }

    #[test]
    fn one_bad_series_aborts_the_whole_fit() {
        let entities = vec![
            ("good".to_string(), sample_series(20, 1.0)),
            ("bad".to_string(), sample_series(2, 1.0)),
        ];

        let result = fit_all(&ForecasterConfig::default(), &entities);
        assert!(matches!(
            result,
            Err(ForecastError::InsufficientData { .. })
        ));
    }
}
