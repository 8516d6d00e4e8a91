//! Sizing of one-shot reads.

use bson::{Document, RawBsonRef};
use doccol_common::{Result, error::Error};
use doccol_driver::{Driver, Namespace, Pipeline};

/// What a count is taken over.
#[derive(Debug, Clone, Copy)]
pub enum CountSource<'a> {
    /// Documents matching a find filter.
    Filter(&'a Document),
    /// Documents produced by an aggregation pipeline.
    Pipeline(&'a Pipeline),
}

/// Returns `true` when [`estimate`] has to ask the server.
pub fn needs_count(limit: u64, use_exact_count: bool) -> bool {
    use_exact_count || limit == 0
}

/// Estimates the number of rows a read will produce.
///
/// Without `use_exact_count` and with a positive `limit`, the limit itself is the
/// estimate and no request is made. Otherwise the matching documents are counted:
/// a filter through [`Driver::count`], a pipeline by running it with a trailing
/// counting stage.
pub fn estimate(
    driver: &dyn Driver,
    ns: &Namespace,
    source: &CountSource<'_>,
    limit: u64,
    use_exact_count: bool,
) -> Result<u64> {
    if !needs_count(limit, use_exact_count) {
        return Ok(limit);
    }
    let count = match source {
        CountSource::Filter(filter) => driver.count(ns, filter)?,
        CountSource::Pipeline(pipeline) => count_pipeline(driver, ns, pipeline)?,
    };
    log::trace!("counted {count} documents in {ns}");
    Ok(count)
}

/// Number of rows to allocate for an estimate: `min(estimate, limit)` when a limit
/// is set.
pub fn allocation_size(estimate: u64, limit: u64) -> u64 {
    if limit > 0 {
        estimate.min(limit)
    } else {
        estimate
    }
}

fn count_pipeline(driver: &dyn Driver, ns: &Namespace, pipeline: &Pipeline) -> Result<u64> {
    let mut stream = driver.aggregate(ns, &pipeline.with_count_stage())?;
    let count = if stream.advance()? {
        let doc = stream.current();
        let value = doc
            .get("count")
            .map_err(|e| Error::invalid_document("count", e.to_string()))?;
        match value {
            Some(RawBsonRef::Int32(n)) => u64::try_from(n).ok(),
            Some(RawBsonRef::Int64(n)) => u64::try_from(n).ok(),
            Some(RawBsonRef::Double(n)) if n >= 0.0 && n.fract() == 0.0 => Some(n as u64),
            _ => None,
        }
        .ok_or_else(|| Error::invalid_document("count", "missing or invalid 'count' field"))
    } else {
        Ok(0)
    };
    stream.close()?;
    count
}

#[cfg(test)]
mod tests {
    use bson::{bson, doc};
    use doccol_driver::memory::MemoryDriver;

    use super::*;

    fn populated() -> (MemoryDriver, Namespace) {
        let driver = MemoryDriver::new();
        let ns = Namespace::parse("test.counts").unwrap();
        let docs = (0..7).map(|i| doc! { "v": i }).collect();
        driver.insert_many(&ns, docs).unwrap();
        (driver, ns)
    }

    #[test]
    fn test_filter_count() {
        let (driver, ns) = populated();
        let filter = doc! { "v": { "$gte": 3 } };
        let source = CountSource::Filter(&filter);
        assert_eq!(estimate(&driver, &ns, &source, 0, false).unwrap(), 4);
        assert_eq!(estimate(&driver, &ns, &source, 2, true).unwrap(), 4);
    }

    #[test]
    fn test_limit_skips_round_trip() {
        let (driver, ns) = populated();
        let before = driver.round_trips();
        let filter = doc! {};
        let n = estimate(&driver, &ns, &CountSource::Filter(&filter), 5, false).unwrap();
        assert_eq!(n, 5);
        assert_eq!(driver.round_trips(), before);
    }

    #[test]
    fn test_pipeline_count() {
        let (driver, ns) = populated();
        let pipeline = Pipeline::from_bson(&bson!([{ "$match": { "v": { "$lt": 2 } } }])).unwrap();
        let n = estimate(&driver, &ns, &CountSource::Pipeline(&pipeline), 0, true).unwrap();
        assert_eq!(n, 2);

        let none = Pipeline::from_bson(&bson!([{ "$match": { "v": -1 } }])).unwrap();
        let n = estimate(&driver, &ns, &CountSource::Pipeline(&none), 0, true).unwrap();
        assert_eq!(n, 0);
    }

    #[test]
    fn test_allocation_size() {
        assert_eq!(allocation_size(10, 0), 10);
        assert_eq!(allocation_size(10, 3), 3);
        assert_eq!(allocation_size(2, 3), 2);
    }
}
