//! In-memory collections prepared for tests.

use std::sync::Arc;

use bson::Document;
use doccol_driver::{Driver, Namespace, memory::MemoryDriver};

/// Inserts `docs` into `ns`, failing if any document is rejected.
pub fn populate(driver: &MemoryDriver, ns: &Namespace, docs: Vec<Document>) -> anyhow::Result<()> {
    let submitted = docs.len();
    let outcome = driver.insert_many(ns, docs)?;
    anyhow::ensure!(
        outcome.is_complete(),
        "{} of {submitted} documents were rejected: {:?}",
        outcome.failures.len(),
        outcome.failures
    );
    Ok(())
}

/// A fresh driver whose collection `ns` holds `count` generated records.
///
/// Returns the driver, the parsed namespace and a copy of the inserted records.
pub fn seeded_collection(
    ns: &str,
    count: usize,
    seed: u64,
) -> anyhow::Result<(Arc<MemoryDriver>, Namespace, Vec<Document>)> {
    let driver = Arc::new(MemoryDriver::new());
    let ns = Namespace::parse(ns)?;
    let records = crate::data_gen::generate_records(count, seed);
    populate(&driver, &ns, records.clone())?;
    Ok((driver, ns, records))
}
