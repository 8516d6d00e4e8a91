//! The entry point: queries, aggregations and bulk inserts against one driver.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering as AtomicOrdering},
};

use bson::{Document, doc, oid::ObjectId};
use doccol_codec::{DocumentEncoder, validate_identifiers};
use doccol_columns::{ColumnBuffer, ColumnSet, ColumnSpec, validate_query_specs};
use doccol_common::{Result, error::Error, verify_arg};
use doccol_driver::{Driver, FindCommand, Namespace, Ordering, Pipeline, select_fields};
use doccol_format::field_path::ID_FIELD;

use crate::{
    block::BlockQuery,
    config::{ClientConfig, MAX_BLOCK_SIZE},
    cursor::Cursor,
    estimate::{CountSource, allocation_size, estimate, needs_count},
    insert::IdentifierColumn,
    options::{BlockQueryOptions, QueryOptions},
};

/// A handle on a document database, shared by every read and write made through it.
///
/// `Client` is `Send + Sync`; column sets and cursors created through it are
/// independent of each other and may be used on separate threads.
///
/// After [`shutdown`](Client::shutdown) every operation fails with
/// `InvalidOperation`. Dropping the client shuts it down.
pub struct Client {
    driver: Arc<dyn Driver>,
    config: ClientConfig,
    shut_down: AtomicBool,
}

impl Client {
    /// Creates a client over `driver` after validating `config`.
    pub fn init(driver: Arc<dyn Driver>, config: ClientConfig) -> Result<Client> {
        config.validate()?;
        log::debug!("client initialized with {config:?}");
        Ok(Client {
            driver,
            config,
            shut_down: AtomicBool::new(false),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(AtomicOrdering::Acquire)
    }

    /// Stops accepting operations. Calling it again has no effect.
    pub fn shutdown(&self) -> Result<()> {
        if !self.shut_down.swap(true, AtomicOrdering::AcqRel) {
            log::debug!("client shut down");
        }
        Ok(())
    }

    /// Counts the documents of `ns` matching `filter`.
    pub fn count(&self, ns: &Namespace, filter: &Document) -> Result<u64> {
        self.check_open()?;
        self.driver.count(ns, filter)
    }

    /// Reads every document matching `filter` into a new column set.
    ///
    /// The set is allocated once, with as many rows as the matching documents (after
    /// `offset`, and at most `limit`). When exact counting is off and a limit is set,
    /// the limit is used as the row count without asking the server, and any rows
    /// beyond the actual results stay masked.
    pub fn query(
        &self,
        ns: &Namespace,
        filter: Document,
        columns: Vec<ColumnSpec>,
        options: &QueryOptions,
    ) -> Result<ColumnSet> {
        self.check_open()?;
        validate_query_specs(&columns)?;

        let use_exact_count = options
            .use_exact_count
            .unwrap_or(self.config.use_exact_count);
        let command = self.find_command(
            filter,
            &columns,
            FindParams {
                limit: options.limit,
                offset: options.offset,
                sort: options.sort.as_ref(),
                hint: options.hint.as_ref(),
                select_fields: options.select_fields,
            },
        );

        let source = CountSource::Filter(&command.filter);
        let mut count = estimate(
            self.driver.as_ref(),
            ns,
            &source,
            options.limit,
            use_exact_count,
        )?;
        if needs_count(options.limit, use_exact_count) {
            count = count.saturating_sub(options.offset);
        }
        let rows = self.allocation_rows(allocation_size(count, options.limit))?;

        let mut set = ColumnSet::allocate(columns, rows)?;
        if rows > 0 {
            let stream = self.driver.find(ns, &command)?;
            let mut cursor = Cursor::open(stream, &mut set);
            cursor.load_all()?;
            cursor.close()?;
        }
        log::debug!(
            "query on {ns} read {} of {rows} allocated rows",
            set.rows_filled()
        );
        Ok(set)
    }

    /// Runs `pipeline` and reads its output into a new column set.
    ///
    /// Only `limit`, exact counting and field selection apply; skipping, sorting
    /// and index hints are expressed as pipeline stages instead.
    pub fn aggregate(
        &self,
        ns: &Namespace,
        pipeline: &Pipeline,
        columns: Vec<ColumnSpec>,
        options: &QueryOptions,
    ) -> Result<ColumnSet> {
        self.check_open()?;
        validate_query_specs(&columns)?;
        check_pipeline_options(options.has_find_only_options())?;

        let use_exact_count = options
            .use_exact_count
            .unwrap_or(self.config.use_exact_count);
        let count = estimate(
            self.driver.as_ref(),
            ns,
            &CountSource::Pipeline(pipeline),
            options.limit,
            use_exact_count,
        )?;
        let rows = self.allocation_rows(allocation_size(count, options.limit))?;

        let mut set = ColumnSet::allocate(columns, rows)?;
        if rows > 0 {
            let pipeline = self.projected_pipeline(pipeline, set.specs(), options.select_fields);
            let stream = self.driver.aggregate(ns, &pipeline)?;
            let mut cursor = Cursor::open(stream, &mut set);
            cursor.load_all()?;
            cursor.close()?;
        }
        log::debug!(
            "aggregate on {ns} read {} of {rows} allocated rows",
            set.rows_filled()
        );
        Ok(set)
    }

    /// Starts a streaming read of the documents matching `filter`.
    pub fn block_query(
        &self,
        ns: &Namespace,
        filter: Document,
        columns: Vec<ColumnSpec>,
        options: &BlockQueryOptions,
    ) -> Result<BlockQuery> {
        self.check_open()?;
        validate_query_specs(&columns)?;
        let block_size = self.block_size(options)?;

        let command = self.find_command(
            filter,
            &columns,
            FindParams {
                limit: options.limit,
                offset: options.offset,
                sort: options.sort.as_ref(),
                hint: options.hint.as_ref(),
                select_fields: options.select_fields,
            },
        );
        let set = ColumnSet::allocate(columns, block_size)?;
        let stream = self.driver.find(ns, &command)?;
        log::trace!("block query on {ns} with {block_size} rows per block");
        Ok(BlockQuery::new(Cursor::open(stream, set)))
    }

    /// Starts a streaming read of the output of `pipeline`.
    ///
    /// Limits, offsets, sorting and hints are expressed as pipeline stages.
    pub fn block_aggregate(
        &self,
        ns: &Namespace,
        pipeline: &Pipeline,
        columns: Vec<ColumnSpec>,
        options: &BlockQueryOptions,
    ) -> Result<BlockQuery> {
        self.check_open()?;
        validate_query_specs(&columns)?;
        check_pipeline_options(options.has_find_only_options())?;
        let block_size = self.block_size(options)?;

        let set = ColumnSet::allocate(columns, block_size)?;
        let pipeline = self.projected_pipeline(pipeline, set.specs(), options.select_fields);
        let stream = self.driver.aggregate(ns, &pipeline)?;
        log::trace!("block aggregate on {ns} with {block_size} rows per block");
        Ok(BlockQuery::new(Cursor::open(stream, set)))
    }

    /// Writes the filled rows of `set` to `ns` as one document per row.
    ///
    /// Masked cells are left out of their documents. A masked `_id` cell fails the
    /// call before anything is written. Without an `_id` column, an object id is
    /// generated for every row. Rows the server rejects (for example a duplicate
    /// `_id`) are masked in the returned identifier column.
    pub fn insert(&self, ns: &Namespace, set: &ColumnSet) -> Result<IdentifierColumn> {
        self.check_open()?;
        let encoder = DocumentEncoder::new(set)?;
        validate_identifiers(set)?;

        let rows = set.rows_filled();
        let (spec, mut ids) = match set.column_by_path(ID_FIELD) {
            Some(column) => (
                column.spec().clone(),
                ColumnBuffer::new(column.spec().desc, rows),
            ),
            None => IdentifierColumn::generated(rows)?,
        };

        let mut docs = Vec::with_capacity(rows);
        for row in 0..rows {
            let generated = if encoder.has_identifier() {
                None
            } else {
                let id = ObjectId::new();
                ids.set_object_id(row, id)?;
                Some(id)
            };
            docs.push(encoder.encode_row(set, row, generated)?);
        }
        if let Some(column) = set.column_by_path(ID_FIELD) {
            for row in 0..rows {
                ids.copy_cell_from(row, column.buffer(), row)?;
            }
        }

        if docs.is_empty() {
            return IdentifierColumn::new(spec, ids);
        }
        let outcome = self.driver.insert_many(ns, docs)?;
        for failure in &outcome.failures {
            log::warn!(
                "insert into {ns} rejected row {} (code {}): {}",
                failure.index,
                failure.code,
                failure.message
            );
            if failure.index < rows {
                ids.set_masked(failure.index);
            }
        }
        log::debug!(
            "inserted {} of {rows} rows into {ns}",
            outcome.inserted
        );
        IdentifierColumn::new(spec, ids)
    }

    /// Drops the collection `ns`.
    pub fn drop_collection(&self, ns: &Namespace) -> Result<()> {
        self.check_open()?;
        self.driver.drop_collection(ns)
    }

    fn check_open(&self) -> Result<()> {
        if self.is_shut_down() {
            return Err(Error::invalid_operation("client is shut down"));
        }
        Ok(())
    }

    fn block_size(&self, options: &BlockQueryOptions) -> Result<usize> {
        let block_size = options
            .block_size
            .unwrap_or(self.config.default_block_size);
        verify_arg!(block_size, block_size > 0 && block_size <= MAX_BLOCK_SIZE);
        Ok(block_size)
    }

    fn allocation_rows(&self, rows: u64) -> Result<usize> {
        let max = self.config.max_allocation_rows;
        if max > 0 && rows > max {
            return Err(Error::invalid_arg(
                "rows",
                format!("result of {rows} rows exceeds max_allocation_rows ({max})"),
            ));
        }
        usize::try_from(rows)
            .map_err(|_| Error::invalid_arg("rows", format!("{rows} rows cannot be allocated")))
    }

    fn find_command(
        &self,
        filter: Document,
        columns: &[ColumnSpec],
        params: FindParams<'_>,
    ) -> FindCommand {
        let mut command = FindCommand::new(filter)
            .with_skip(params.offset)
            .with_limit(params.limit);
        if let Some(sort) = params.sort {
            command = command.with_sort(sort.clone());
        }
        if let Some(hint) = params.hint {
            command = command.with_hint(hint.clone());
        }
        if params.select_fields.unwrap_or(self.config.select_fields) {
            command = command.with_projection(select_fields(
                columns.iter().map(|spec| spec.path.as_str()),
            ));
        }
        log::trace!("find envelope {}", command.envelope());
        command
    }

    fn projected_pipeline<'a>(
        &self,
        pipeline: &Pipeline,
        columns: impl Iterator<Item = &'a ColumnSpec>,
        select: Option<bool>,
    ) -> Pipeline {
        if !select.unwrap_or(self.config.select_fields) {
            return pipeline.clone();
        }
        let projection = select_fields(columns.map(|spec| spec.path.as_str()));
        let mut stages = pipeline.stages().to_vec();
        stages.push(doc! { "$project": projection });
        Pipeline::new(stages)
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        let _ = self.shutdown();
    }
}

struct FindParams<'a> {
    limit: u64,
    offset: u64,
    sort: Option<&'a Ordering>,
    hint: Option<&'a Ordering>,
    select_fields: Option<bool>,
}

fn check_pipeline_options(has_find_only_options: bool) -> Result<()> {
    if has_find_only_options {
        return Err(Error::invalid_arg(
            "options",
            "pipelines take their limit, offset, sort and hint as stages",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use doccol_columns::parse_specs;
    use doccol_common::ErrorKind;
    use doccol_driver::memory::MemoryDriver;

    use super::*;

    fn client() -> (Arc<MemoryDriver>, Client) {
        let driver = Arc::new(MemoryDriver::new());
        let client = Client::init(driver.clone(), ClientConfig::default()).unwrap();
        (driver, client)
    }

    fn ns() -> Namespace {
        Namespace::parse("test.client").unwrap()
    }

    #[test]
    fn test_client_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Client>();
    }

    #[test]
    fn test_invalid_config() {
        let config = ClientConfig {
            default_block_size: 0,
            ..Default::default()
        };
        let err = Client::init(Arc::new(MemoryDriver::new()), config).err().unwrap();
        assert!(matches!(err.kind(), ErrorKind::InvalidConfig { .. }));
    }

    #[test]
    fn test_shutdown() {
        let (driver, client) = client();
        client.shutdown().unwrap();
        client.shutdown().unwrap();
        assert!(client.is_shut_down());

        let err = client.count(&ns(), &doc! {}).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::InvalidOperation { name } if name == "client is shut down"));
        let columns = parse_specs(&[("a", "int32")]).unwrap();
        assert!(client.query(&ns(), doc! {}, columns, &QueryOptions::default()).is_err());
        assert_eq!(driver.round_trips(), 0);
    }

    #[test]
    fn test_limit_without_count() {
        let (driver, client) = client();
        driver
            .insert_many(&ns(), (0..5).map(|i| doc! { "a": i }).collect())
            .unwrap();
        let before = driver.round_trips();
        let columns = parse_specs(&[("a", "int32")]).unwrap();
        let options = QueryOptions::new().limit(8).use_exact_count(false);
        let set = client.query(&ns(), doc! {}, columns, &options).unwrap();
        // Only the find itself reached the driver.
        assert_eq!(driver.round_trips(), before + 1);
        assert_eq!(set.capacity(), 8);
        assert_eq!(set.rows_filled(), 5);
        assert!((5..8).all(|row| set.column(0).buffer().is_masked(row)));
    }

    #[test]
    fn test_offset_reduces_allocation() {
        let (driver, client) = client();
        driver
            .insert_many(&ns(), (0..5).map(|i| doc! { "a": i }).collect())
            .unwrap();
        let columns = parse_specs(&[("a", "int32")]).unwrap();
        let options = QueryOptions::new().offset(3);
        let set = client.query(&ns(), doc! {}, columns, &options).unwrap();
        assert_eq!(set.capacity(), 2);
        assert_eq!(set.column(0).buffer().get::<i32>(0).unwrap(), Some(3));
    }

    #[test]
    fn test_max_allocation_rows() {
        let driver = Arc::new(MemoryDriver::new());
        driver
            .insert_many(&ns(), (0..5).map(|i| doc! { "a": i }).collect())
            .unwrap();
        let config = ClientConfig {
            max_allocation_rows: 4,
            ..Default::default()
        };
        let client = Client::init(driver, config).unwrap();
        let columns = parse_specs(&[("a", "int32")]).unwrap();
        let err = client
            .query(&ns(), doc! {}, columns, &QueryOptions::default())
            .unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::InvalidArgument { .. }));
    }

    #[test]
    fn test_pipeline_rejects_find_options() {
        let (_driver, client) = client();
        let columns = parse_specs(&[("a", "int32")]).unwrap();
        let options = QueryOptions::new().offset(1);
        let err = client
            .aggregate(&ns(), &Pipeline::default(), columns, &options)
            .unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::InvalidArgument { .. }));
    }
}
