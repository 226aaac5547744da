//! Table - the in-memory multi-version store
//!
//! # Locking
//!
//! Rows live in an ordered index `row key -> Arc<RwLock<RowRecord>>`.
//!
//! - The index lock is always taken before a row lock, never after.
//! - Writers keep the index read lock until they hold the row write lock,
//!   so a row cannot be unlinked between lookup and mutation.
//! - Readers clone the row handle and release the index before locking
//!   the row. A record unlinked in between is empty and reads as absent.
//! - A row left empty by a mutation is unlinked afterwards under the index
//!   write lock, after re-checking that it is still empty.

use std::collections::{BTreeMap, BTreeSet};
use std::ops::Bound;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::latency::Latency;
use super::record::RowRecord;
use super::{
    Action, ActionResult, Cell, Clock, Columns, Delete, DeleteTarget, Get, Increment, Mutation,
    Put, PutCell, RowMutations, RowResult, Scan, Scanner, TableError, TableResult, TimeRange,
    Timestamp,
};
use crate::config::StoreConfig;
use crate::filter::apply_filter;
use crate::observability::{log_event_with_fields, Event, MetricsRegistry};

type RowHandle = Arc<RwLock<RowRecord>>;
type RowIndex = BTreeMap<Vec<u8>, RowHandle>;

/// An in-memory, row-keyed, multi-version column store.
///
/// `Table` is `Send + Sync`; share it behind an `Arc`. Every operation on a
/// single row is atomic with respect to every other operation on that row.
/// Nothing is atomic across rows.
#[derive(Debug)]
pub struct Table {
    name: String,
    families: RwLock<BTreeSet<Vec<u8>>>,
    max_versions: usize,
    rows: RwLock<RowIndex>,
    clock: Clock,
    latency: Latency,
    metrics: Arc<MetricsRegistry>,
}

impl Table {
    /// Create an empty table with the given column families.
    pub fn new<I, F>(name: impl Into<String>, families: I) -> Self
    where
        I: IntoIterator<Item = F>,
        F: Into<Vec<u8>>,
    {
        let table = Self {
            name: name.into(),
            families: RwLock::new(families.into_iter().map(Into::into).collect()),
            max_versions: 1,
            rows: RwLock::new(BTreeMap::new()),
            clock: Clock::new(),
            latency: Latency::none(),
            metrics: Arc::new(MetricsRegistry::new()),
        };
        log_event_with_fields(Event::TableCreated, &[("table", &table.name)]);
        table
    }

    /// Create a table from a validated configuration.
    pub fn with_config(config: &StoreConfig) -> Self {
        let mut table = Self::new(
            config.table_name.clone(),
            config.families.iter().map(|f| f.as_bytes().to_vec()),
        );
        table.max_versions = config.max_versions.max(1);
        table.latency = Latency::new(config.simulated_latency(), config.latency_jitter());
        table
    }

    /// Versions returned per column when a read does not ask for a count.
    pub fn with_max_versions(mut self, max_versions: usize) -> Self {
        self.max_versions = max_versions.max(1);
        self
    }

    pub fn with_latency(mut self, latency: Latency) -> Self {
        self.latency = latency;
        self
    }

    /// Share a metrics registry with other components.
    pub fn with_metrics(mut self, metrics: Arc<MetricsRegistry>) -> Self {
        self.metrics = metrics;
        self
    }

    #[inline]
    pub fn table_name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn max_versions(&self) -> usize {
        self.max_versions
    }

    #[inline]
    pub fn metrics(&self) -> &Arc<MetricsRegistry> {
        &self.metrics
    }

    /// Declared column families, sorted.
    pub fn families(&self) -> TableResult<Vec<Vec<u8>>> {
        let families = self.families.read().map_err(|_| TableError::LockPoisoned)?;
        Ok(families.iter().cloned().collect())
    }

    /// Declare another column family. Returns false if it already existed.
    pub fn add_family(&self, family: impl Into<Vec<u8>>) -> TableResult<bool> {
        let family = family.into();
        if family.is_empty() {
            return Err(TableError::InvalidArgument(
                "family name must not be empty".into(),
            ));
        }
        let name = String::from_utf8_lossy(&family).into_owned();
        let added = self
            .families
            .write()
            .map_err(|_| TableError::LockPoisoned)?
            .insert(family);
        if added {
            log_event_with_fields(
                Event::FamilyAdded,
                &[("family", &name), ("table", &self.name)],
            );
        }
        Ok(added)
    }

    /// Number of rows holding at least one version.
    pub fn row_count(&self) -> TableResult<usize> {
        let index = self.read_index()?;
        let mut count = 0;
        for handle in index.values() {
            let record = handle.read().map_err(|_| TableError::LockPoisoned)?;
            if !record.is_empty() {
                count += 1;
            }
        }
        Ok(count)
    }

    // ==================================================================
    // Writes
    // ==================================================================

    /// Insert the cells of a `Put`, all or nothing.
    ///
    /// Cells without a timestamp share one fresh timestamp from the table
    /// clock. Fails with `UnknownFamily` before anything is written if any
    /// cell names an undeclared family.
    pub fn put(&self, put: Put) -> TableResult<()> {
        self.latency.pause();
        self.validate_put(&put)?;

        let Put { row, cells } = put;
        let cells = self.stamp(cells);
        self.with_row_mut(&row, true, |record| {
            apply_put(record, cells);
            Ok(())
        })?;

        self.metrics.increment_puts();
        Ok(())
    }

    /// Insert one cell stamped at write time.
    pub fn put_cell(
        &self,
        row: impl Into<Vec<u8>>,
        family: impl Into<Vec<u8>>,
        qualifier: impl Into<Vec<u8>>,
        value: impl Into<Vec<u8>>,
    ) -> TableResult<()> {
        self.put(Put::new(row).add_column(family, qualifier, value))
    }

    /// Remove a whole row, families, columns or single versions.
    ///
    /// Missing targets, including undeclared families, are ignored.
    pub fn delete(&self, delete: &Delete) -> TableResult<()> {
        self.latency.pause();
        require_row_key(delete.row())?;

        self.with_row_mut(delete.row(), false, |record| {
            apply_delete(record, delete);
            Ok(())
        })?;

        self.metrics.increment_deletes();
        Ok(())
    }

    /// Add `delta` to a big-endian i64 column and return the new value.
    ///
    /// A missing column counts as zero. The result is written as a new
    /// version that becomes the latest.
    pub fn increment(&self, increment: &Increment) -> TableResult<i64> {
        self.latency.pause();
        require_row_key(increment.row())?;
        self.check_families([increment.family.as_slice()])?;

        let ts = self.clock.next();
        let value = self
            .with_row_mut(&increment.row, true, |record| {
                let (current, newest) = match record.latest(&increment.family, &increment.qualifier)
                {
                    Some((latest_ts, bytes)) => (decode_counter(increment, bytes)?, Some(latest_ts)),
                    None => (0, None),
                };
                let next = current.checked_add(increment.delta).ok_or_else(|| {
                    TableError::InvalidArgument(format!(
                        "increment of {} by {} overflows i64",
                        current, increment.delta
                    ))
                })?;

                // an explicitly stamped newer version must not shadow the result
                let write_ts = match newest {
                    Some(latest_ts) if latest_ts >= ts => latest_ts
                        .as_u64()
                        .checked_add(1)
                        .map(Timestamp::new)
                        .filter(|next_ts| !next_ts.is_latest())
                        .ok_or_else(|| {
                            TableError::InvalidArgument(format!(
                                "no timestamp newer than {} is left for the counter",
                                latest_ts
                            ))
                        })?,
                    _ => ts,
                };
                record.insert(
                    &increment.family,
                    &increment.qualifier,
                    write_ts,
                    next.to_be_bytes().to_vec(),
                );
                Ok(next)
            })?
            .unwrap_or(increment.delta);

        self.metrics.increment_increments();
        Ok(value)
    }

    /// Apply puts and deletes to one row as a single atomic step.
    ///
    /// Every mutation must address the same row. Increments are rejected
    /// with `UnsupportedOperation`.
    pub fn mutate_row(&self, mutations: RowMutations) -> TableResult<()> {
        self.latency.pause();
        require_row_key(mutations.row())?;
        self.validate_mutations(mutations.row(), mutations.mutations())?;

        let RowMutations { row, mutations } = mutations;
        let (puts, deletes) = count_kinds(&mutations);
        let create = puts > 0;
        let stamped = self.stamp_mutations(mutations);

        self.with_row_mut(&row, create, |record| {
            apply_mutations(record, stamped);
            Ok(())
        })?;

        for _ in 0..puts {
            self.metrics.increment_puts();
        }
        for _ in 0..deletes {
            self.metrics.increment_deletes();
        }
        Ok(())
    }

    /// Read-modify-write of one row under its write lock.
    ///
    /// `decide` receives every version of the row and returns a value plus
    /// the mutations to apply. Mutations are validated as in `mutate_row`
    /// and applied before the lock is released; if `decide` or validation
    /// fails nothing is written. Returns `None` without calling `decide`
    /// when the row does not exist.
    ///
    /// `decide` runs with the row locked and must not call back into the
    /// table.
    pub fn update_row<T, F>(&self, row: &[u8], decide: F) -> TableResult<Option<T>>
    where
        F: FnOnce(&RowResult) -> TableResult<(T, Vec<Mutation>)>,
    {
        self.latency.pause();
        require_row_key(row)?;

        self.with_row_mut(row, false, |record| {
            let snapshot = RowResult::new(
                row.to_vec(),
                record.cells(row, &Columns::all(), &TimeRange::all(), usize::MAX),
            );
            let (value, mutations) = decide(&snapshot)?;
            self.validate_mutations(row, &mutations)?;

            let (puts, deletes) = count_kinds(&mutations);
            apply_mutations(record, self.stamp_mutations(mutations));
            for _ in 0..puts {
                self.metrics.increment_puts();
            }
            for _ in 0..deletes {
                self.metrics.increment_deletes();
            }
            Ok(value)
        })
    }

    /// Apply `put` if the latest value of a column equals `expected`.
    ///
    /// `None` or an empty slice expects the column to be absent. Returns
    /// whether the put was applied.
    pub fn check_and_put(
        &self,
        row: &[u8],
        family: &[u8],
        qualifier: &[u8],
        expected: Option<&[u8]>,
        put: Put,
    ) -> TableResult<bool> {
        self.latency.pause();
        self.validate_put(&put)?;
        if put.row() != row {
            return Err(TableError::row_mismatch(row, put.row()));
        }

        let cells = self.stamp(put.cells);
        let applied = self
            .with_row_mut(row, true, |record| {
                let current = record.latest(family, qualifier).map(|(_, value)| value);
                if !value_matches(expected, current) {
                    return Ok(false);
                }
                apply_put(record, cells);
                Ok(true)
            })?
            .unwrap_or(false);

        if applied {
            self.metrics.increment_puts();
        }
        Ok(applied)
    }

    /// Apply `delete` if the latest value of a column equals `expected`.
    ///
    /// Same matching rules as `check_and_put`. On a missing row the check
    /// passes only when absence was expected, and nothing is deleted.
    pub fn check_and_delete(
        &self,
        row: &[u8],
        family: &[u8],
        qualifier: &[u8],
        expected: Option<&[u8]>,
        delete: &Delete,
    ) -> TableResult<bool> {
        self.latency.pause();
        require_row_key(row)?;
        if delete.row() != row {
            return Err(TableError::row_mismatch(row, delete.row()));
        }

        let applied = self
            .with_row_mut(row, false, |record| {
                let current = record.latest(family, qualifier).map(|(_, value)| value);
                if !value_matches(expected, current) {
                    return Ok(false);
                }
                apply_delete(record, delete);
                Ok(true)
            })?
            .unwrap_or_else(|| value_matches(expected, None));

        if applied {
            self.metrics.increment_deletes();
        }
        Ok(applied)
    }

    /// Execute actions in order; each entry succeeds or fails on its own.
    pub fn batch(&self, actions: Vec<Action>) -> Vec<TableResult<ActionResult>> {
        actions
            .into_iter()
            .map(|action| match action {
                Action::Get(get) => self.get(get).map(ActionResult::Row),
                Action::Put(put) => self.put(put).map(|_| ActionResult::Applied),
                Action::Delete(delete) => self.delete(&delete).map(|_| ActionResult::Applied),
                Action::Increment(increment) => {
                    self.increment(&increment).map(ActionResult::Value)
                }
                Action::Append(_) => Err(TableError::UnsupportedOperation("append")),
            })
            .collect()
    }

    // ==================================================================
    // Reads
    // ==================================================================

    /// Read one row.
    ///
    /// A missing row yields an empty result, never an error.
    pub fn get(&self, get: Get) -> TableResult<RowResult> {
        self.latency.pause();
        self.metrics.increment_gets();

        let Get {
            row,
            columns,
            time_range,
            max_versions,
            mut filter,
        } = get;
        let max_versions = max_versions.unwrap_or(self.max_versions);

        let handle = match self.lookup(&row)? {
            Some(handle) => handle,
            None => return Ok(RowResult::empty(row)),
        };

        let cells = {
            let record = handle.read().map_err(|_| TableError::LockPoisoned)?;
            let cells = record.cells(&row, &columns, &time_range, max_versions);
            match filter.as_mut() {
                Some(filter) if !cells.is_empty() => apply_filter(&mut **filter, &row, cells),
                _ => cells,
            }
        };

        Ok(RowResult::new(row, cells))
    }

    /// Latest version of one column.
    pub fn get_cell(&self, row: &[u8], family: &[u8], qualifier: &[u8]) -> TableResult<Option<Cell>> {
        let result = self.get(
            Get::new(row)
                .add_column(family, qualifier)
                .max_versions(1),
        )?;
        Ok(result.into_cells().into_iter().next())
    }

    /// True if the read would return at least one cell.
    pub fn exists(&self, get: Get) -> TableResult<bool> {
        Ok(!self.get(get)?.is_empty())
    }

    /// Open a scanner over a row range.
    ///
    /// The start row is inclusive and the stop row exclusive. A start row
    /// equal to the stop row selects exactly that row; a start row after
    /// the stop row selects nothing.
    pub fn scan(&self, scan: Scan) -> TableResult<Scanner> {
        self.latency.pause();
        self.metrics.increment_scans();

        let Scan {
            start_row,
            stop_row,
            columns,
            time_range,
            max_versions,
            filter,
        } = scan;

        let lower = match start_row.as_deref() {
            Some(start) => Bound::Included(start),
            None => Bound::Unbounded,
        };
        let upper = match (start_row.as_deref(), stop_row.as_deref()) {
            (Some(start), Some(stop)) if start == stop => Bound::Included(stop),
            (_, Some(stop)) => Bound::Excluded(stop),
            (_, None) => Bound::Unbounded,
        };

        let inverted = matches!(
            (start_row.as_deref(), stop_row.as_deref()),
            (Some(start), Some(stop)) if start > stop
        );

        let rows = if inverted {
            Vec::new()
        } else {
            let index = self.read_index()?;
            index
                .range::<[u8], _>((lower, upper))
                .map(|(key, handle)| (key.clone(), Arc::clone(handle)))
                .collect()
        };

        Ok(Scanner::new(
            rows,
            columns,
            time_range,
            max_versions.unwrap_or(self.max_versions),
            filter,
        ))
    }

    // ==================================================================
    // Internals
    // ==================================================================

    fn read_index(&self) -> TableResult<RwLockReadGuard<'_, RowIndex>> {
        self.rows.read().map_err(|_| TableError::LockPoisoned)
    }

    fn write_index(&self) -> TableResult<RwLockWriteGuard<'_, RowIndex>> {
        self.rows.write().map_err(|_| TableError::LockPoisoned)
    }

    fn lookup(&self, row: &[u8]) -> TableResult<Option<RowHandle>> {
        Ok(self.read_index()?.get(row).cloned())
    }

    /// Run `apply` on a row under its write lock.
    ///
    /// Returns `None` when the row is missing and `create` is false. A row
    /// left empty is unlinked afterwards, whether `apply` succeeded or not.
    fn with_row_mut<T, F>(&self, row: &[u8], create: bool, apply: F) -> TableResult<Option<T>>
    where
        F: FnOnce(&mut RowRecord) -> TableResult<T>,
    {
        let index = self.read_index()?;
        let existing = index.get(row).cloned();

        let handle = match existing {
            Some(handle) => handle,
            None if !create => return Ok(None),
            None => {
                drop(index);
                let mut index = self.write_index()?;
                let handle = Arc::clone(
                    index
                        .entry(row.to_vec())
                        .or_insert_with(|| Arc::new(RwLock::new(RowRecord::new()))),
                );
                let record = handle.write().map_err(|_| TableError::LockPoisoned)?;
                drop(index);
                return self.finish_row_mut(row, record, apply).map(Some);
            }
        };

        let record = handle.write().map_err(|_| TableError::LockPoisoned)?;
        drop(index);
        self.finish_row_mut(row, record, apply).map(Some)
    }

    fn finish_row_mut<T, F>(
        &self,
        row: &[u8],
        mut record: RwLockWriteGuard<'_, RowRecord>,
        apply: F,
    ) -> TableResult<T>
    where
        F: FnOnce(&mut RowRecord) -> TableResult<T>,
    {
        let result = apply(&mut *record);
        let now_empty = record.is_empty();
        drop(record);

        if now_empty {
            self.unlink_if_empty(row)?;
        }
        result
    }

    fn unlink_if_empty(&self, row: &[u8]) -> TableResult<()> {
        let mut index = self.write_index()?;
        let empty = match index.get(row) {
            Some(handle) => handle
                .read()
                .map_err(|_| TableError::LockPoisoned)?
                .is_empty(),
            None => false,
        };
        if empty {
            index.remove(row);
            log_event_with_fields(
                Event::RowRemoved,
                &[("row", &String::from_utf8_lossy(row)), ("table", &self.name)],
            );
        }
        Ok(())
    }

    fn check_families<'a>(&self, families: impl IntoIterator<Item = &'a [u8]>) -> TableResult<()> {
        let declared = self.families.read().map_err(|_| TableError::LockPoisoned)?;
        for family in families {
            if !declared.contains(family) {
                self.metrics.increment_unknown_family_rejections();
                let err = TableError::unknown_family(family);
                log_event_with_fields(
                    Event::UnknownFamilyRejected,
                    &[("error", &err.to_string()), ("table", &self.name)],
                );
                return Err(err);
            }
        }
        Ok(())
    }

    fn validate_put(&self, put: &Put) -> TableResult<()> {
        require_row_key(put.row())?;
        if put.is_empty() {
            return Err(TableError::InvalidArgument("put has no cells".into()));
        }
        self.check_families(put.cells().iter().map(|cell| cell.family.as_slice()))
    }

    fn validate_mutations(&self, row: &[u8], mutations: &[Mutation]) -> TableResult<()> {
        for mutation in mutations {
            if mutation.row() != row {
                return Err(TableError::row_mismatch(row, mutation.row()));
            }
            match mutation {
                Mutation::Put(put) => self.validate_put(put)?,
                Mutation::Delete(_) => {}
                Mutation::Increment(_) => {
                    return Err(TableError::UnsupportedOperation(
                        "increment inside a row mutation",
                    ))
                }
            }
        }
        Ok(())
    }

    /// Replace `Timestamp::LATEST` with one fresh clock value.
    fn stamp(&self, mut cells: Vec<PutCell>) -> Vec<PutCell> {
        if cells.iter().any(|cell| cell.timestamp.is_latest()) {
            let now = self.clock.next();
            for cell in cells.iter_mut().filter(|cell| cell.timestamp.is_latest()) {
                cell.timestamp = now;
            }
        }
        cells
    }

    fn stamp_mutations(&self, mutations: Vec<Mutation>) -> Vec<StampedMutation> {
        let needs_clock = mutations.iter().any(|mutation| match mutation {
            Mutation::Put(put) => put.cells().iter().any(|cell| cell.timestamp.is_latest()),
            _ => false,
        });
        let now = if needs_clock {
            self.clock.next()
        } else {
            Timestamp::LATEST
        };

        mutations
            .into_iter()
            .filter_map(|mutation| match mutation {
                Mutation::Put(put) => {
                    let mut cells = put.cells;
                    for cell in cells.iter_mut().filter(|cell| cell.timestamp.is_latest()) {
                        cell.timestamp = now;
                    }
                    Some(StampedMutation::Put(cells))
                }
                Mutation::Delete(delete) => Some(StampedMutation::Delete(delete)),
                // rejected by validate_mutations
                Mutation::Increment(_) => None,
            })
            .collect()
    }
}

/// A mutation whose put cells carry concrete timestamps
enum StampedMutation {
    Put(Vec<PutCell>),
    Delete(Delete),
}

fn require_row_key(row: &[u8]) -> TableResult<()> {
    if row.is_empty() {
        return Err(TableError::InvalidArgument("row key must not be empty".into()));
    }
    Ok(())
}

fn apply_put(record: &mut RowRecord, cells: Vec<PutCell>) {
    for cell in cells {
        record.insert(&cell.family, &cell.qualifier, cell.timestamp, cell.value);
    }
}

fn apply_delete(record: &mut RowRecord, delete: &Delete) {
    if delete.is_whole_row() {
        record.clear();
        return;
    }
    for target in delete.targets() {
        match target {
            DeleteTarget::Family(family) => record.remove_family(family),
            DeleteTarget::Column { family, qualifier } => record.remove_column(family, qualifier),
            DeleteTarget::Version {
                family,
                qualifier,
                timestamp,
            } => record.remove_version(family, qualifier, *timestamp),
        }
    }
}

fn apply_mutations(record: &mut RowRecord, mutations: Vec<StampedMutation>) {
    for mutation in mutations {
        match mutation {
            StampedMutation::Put(cells) => apply_put(record, cells),
            StampedMutation::Delete(delete) => apply_delete(record, &delete),
        }
    }
}

fn count_kinds(mutations: &[Mutation]) -> (usize, usize) {
    mutations
        .iter()
        .fold((0, 0), |(puts, deletes), mutation| match mutation {
            Mutation::Put(_) => (puts + 1, deletes),
            Mutation::Delete(_) => (puts, deletes + 1),
            Mutation::Increment(_) => (puts, deletes),
        })
}

fn value_matches(expected: Option<&[u8]>, current: Option<&[u8]>) -> bool {
    match expected {
        None => current.is_none(),
        Some(expected) if expected.is_empty() => current.is_none(),
        Some(expected) => current == Some(expected),
    }
}

fn decode_counter(increment: &Increment, bytes: &[u8]) -> TableResult<i64> {
    let array: [u8; 8] = bytes.try_into().map_err(|_| TableError::NotANumber {
        row: String::from_utf8_lossy(&increment.row).into_owned(),
        family: String::from_utf8_lossy(&increment.family).into_owned(),
        qualifier: String::from_utf8_lossy(&increment.qualifier).into_owned(),
        len: bytes.len(),
    })?;
    Ok(i64::from_be_bytes(array))
}
