// crates/rawmat-store-sqlite/src/store.rs
// ============================================================================
// Module: SQLite Material Store
// Description: Durable MaterialStore backed by SQLite.
// Purpose: Persist materials, audit history, and stock movements atomically.
// Dependencies: rawmat-core, rusqlite, serde, thiserror, time, tracing
// ============================================================================

//! ## Overview
//! This module implements a durable [`MaterialStore`] using `SQLite`. Writes go
//! through a single writer connection: [`MaterialStore::begin`] takes the
//! writer lock and opens a `BEGIN IMMEDIATE` transaction that is committed
//! explicitly or rolled back when dropped. Reads use a small pool of separate
//! connections and therefore only ever observe committed state.
//!
//! Quantities are stored as canonical decimal text, dates as `YYYY-MM-DD`
//! text, and instants as unix milliseconds. Every row is re-parsed on load and
//! rejected as corrupt when it does not decode. The history table is
//! append-only: triggers abort any `UPDATE` or `DELETE` against it.
//! Security posture: database contents are untrusted.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;

use rawmat_core::ActorId;
use rawmat_core::ActorProfile;
use rawmat_core::HistoryId;
use rawmat_core::HistoryRecord;
use rawmat_core::InventoryTransaction;
use rawmat_core::Material;
use rawmat_core::MaterialCode;
use rawmat_core::MaterialFilter;
use rawmat_core::MaterialId;
use rawmat_core::MaterialStore;
use rawmat_core::MaterialTx;
use rawmat_core::NewHistoryEntry;
use rawmat_core::NewInventoryTransaction;
use rawmat_core::NewMaterialRecord;
use rawmat_core::Quantity;
use rawmat_core::Role;
use rawmat_core::StatusHistoryEntry;
use rawmat_core::StoreError;
use rawmat_core::Timestamp;
use rawmat_core::TransactionId;
use rawmat_core::UnknownVariant;
use rawmat_core::format_date;
use rawmat_core::parse_date;
use rusqlite::Connection;
use rusqlite::ErrorCode;
use rusqlite::OpenFlags;
use rusqlite::OptionalExtension;
use rusqlite::ffi;
use rusqlite::params;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use time::Date;
use tracing::debug;
use tracing::info;
use tracing::warn;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// `SQLite` schema version for the store.
pub const SCHEMA_VERSION: i64 = 1;
/// Default busy timeout (ms).
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Default number of read connections.
const DEFAULT_READ_POOL_SIZE: usize = 4;
/// Maximum number of read connections.
const MAX_READ_POOL_SIZE: usize = 64;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;

/// Material columns in row-mapping order.
const MATERIAL_COLUMNS: &str = "id, material_code, item_code, item_name, batch_lot_number, \
                                grn_number, received_total_quantity, remaining_quantity, \
                                container_quantity, dispensed_quantity, supplier_name, \
                                manufacturer_name, date_of_receipt, mfg_date, exp_date, \
                                rack_number, status, created_by, created_at, updated_at, version";

// ============================================================================
// SECTION: Config
// ============================================================================

/// `SQLite` journal mode configuration.
///
/// # Invariants
/// - Values map 1:1 to `SQLite` `journal_mode` pragma settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteStoreMode {
    /// WAL journal mode (recommended).
    #[default]
    Wal,
    /// Delete journal mode (legacy).
    Delete,
}

impl SqliteStoreMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "wal",
            Self::Delete => "delete",
        }
    }
}

/// `SQLite` sync mode configuration.
///
/// # Invariants
/// - Values map 1:1 to `SQLite` `synchronous` pragma settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteSyncMode {
    /// Full synchronous mode (safest).
    #[default]
    Full,
    /// Normal synchronous mode (balanced).
    Normal,
}

impl SqliteSyncMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Normal => "normal",
        }
    }
}

/// Configuration for the `SQLite` material store.
///
/// # Invariants
/// - `path` must resolve to a file path (not a directory).
/// - `busy_timeout_ms` is interpreted as milliseconds.
/// - `read_pool_size` is in `1..=64`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SqliteStoreConfig {
    /// Path to the `SQLite` database file.
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` sync mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
    /// Number of read-only connections used for read path isolation.
    #[serde(default = "default_read_pool_size")]
    pub read_pool_size: usize,
}

impl SqliteStoreConfig {
    /// Returns a configuration for `path` with default settings.
    #[must_use]
    pub fn for_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
            read_pool_size: DEFAULT_READ_POOL_SIZE,
        }
    }
}

/// Returns the default busy timeout for `SQLite` connections.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

/// Returns the default read connection pool size.
const fn default_read_pool_size() -> usize {
    DEFAULT_READ_POOL_SIZE
}

/// Validates runtime limits in the store configuration.
fn validate_runtime_limits(config: &SqliteStoreConfig) -> Result<(), SqliteStoreError> {
    if config.busy_timeout_ms == 0 {
        return Err(SqliteStoreError::Invalid(
            "busy_timeout_ms must be greater than zero".to_string(),
        ));
    }
    if config.read_pool_size == 0 || config.read_pool_size > MAX_READ_POOL_SIZE {
        return Err(SqliteStoreError::Invalid(format!(
            "read_pool_size out of range: {} (1..={MAX_READ_POOL_SIZE})",
            config.read_pool_size
        )));
    }
    Ok(())
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// `SQLite` store errors.
///
/// # Invariants
/// - Busy and unique-key failures are classified so callers can retry or
///   report duplicates without parsing messages.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SqliteStoreError {
    /// Store I/O error.
    #[error("sqlite store io error: {0}")]
    Io(String),
    /// `SQLite` engine error.
    #[error("sqlite store db error: {0}")]
    Db(String),
    /// Stored row does not decode.
    #[error("sqlite store corruption: {0}")]
    Corrupt(String),
    /// Store schema version mismatch.
    #[error("sqlite store version mismatch: {0}")]
    VersionMismatch(String),
    /// Invalid store data or configuration.
    #[error("sqlite store invalid data: {0}")]
    Invalid(String),
    /// Write lock held by another writer or stale row version.
    #[error("sqlite store busy: {0}")]
    Busy(String),
    /// Unique key violation.
    #[error("sqlite store duplicate key: {0}")]
    Duplicate(String),
}

impl From<SqliteStoreError> for StoreError {
    fn from(error: SqliteStoreError) -> Self {
        match error {
            SqliteStoreError::Io(message) => Self::Io(message),
            SqliteStoreError::Db(message) => Self::Db(message),
            SqliteStoreError::Corrupt(message) => Self::Corrupt(message),
            SqliteStoreError::VersionMismatch(message) => Self::VersionMismatch(message),
            SqliteStoreError::Invalid(message) => Self::Invalid(message),
            SqliteStoreError::Busy(message) => Self::Conflict(message),
            SqliteStoreError::Duplicate(message) => Self::Duplicate(message),
        }
    }
}

/// Classifies a `rusqlite` error.
fn map_db_error(err: rusqlite::Error) -> SqliteStoreError {
    if let rusqlite::Error::SqliteFailure(failure, _) = &err {
        match failure.code {
            ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked => {
                return SqliteStoreError::Busy(err.to_string());
            }
            ErrorCode::ConstraintViolation
                if failure.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE
                    || failure.extended_code == ffi::SQLITE_CONSTRAINT_PRIMARYKEY =>
            {
                return SqliteStoreError::Duplicate(err.to_string());
            }
            ErrorCode::ConstraintViolation => {
                return SqliteStoreError::Invalid(err.to_string());
            }
            _ => {}
        }
    }
    SqliteStoreError::Db(err.to_string())
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// `SQLite`-backed material store.
///
/// # Invariants
/// - All writes go through the single writer connection, one transaction at a
///   time per process.
/// - Readers never observe uncommitted writes.
#[derive(Clone)]
pub struct SqliteMaterialStore {
    /// Store configuration.
    config: SqliteStoreConfig,
    /// Shared writer connection guarded by a mutex.
    write_connection: Arc<Mutex<Connection>>,
    /// Read connection pool.
    read_connections: Arc<Vec<Mutex<Connection>>>,
    /// Round-robin cursor for read connection selection.
    read_cursor: Arc<AtomicUsize>,
}

impl SqliteMaterialStore {
    /// Opens (and initializes when new) an `SQLite`-backed material store.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the path or configuration is invalid,
    /// the database cannot be opened, or its schema version is unsupported.
    pub fn new(config: SqliteStoreConfig) -> Result<Self, SqliteStoreError> {
        validate_store_path(&config.path)?;
        validate_runtime_limits(&config)?;
        ensure_parent_dir(&config.path)?;
        let mut write_connection = open_connection(&config)?;
        initialize_schema(&mut write_connection)?;
        let mut read_connections = Vec::with_capacity(config.read_pool_size);
        for _ in 0 .. config.read_pool_size {
            read_connections.push(Mutex::new(open_connection(&config)?));
        }
        info!(
            path = %config.path.display(),
            journal_mode = config.journal_mode.pragma_value(),
            sync_mode = config.sync_mode.pragma_value(),
            read_pool_size = config.read_pool_size,
            "sqlite material store opened"
        );
        Ok(Self {
            config,
            write_connection: Arc::new(Mutex::new(write_connection)),
            read_connections: Arc::new(read_connections),
            read_cursor: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Returns the store configuration.
    #[must_use]
    pub const fn config(&self) -> &SqliteStoreConfig {
        &self.config
    }

    /// Verifies the store can execute a simple statement.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] if the mutex is poisoned or the query fails.
    pub fn readiness(&self) -> Result<(), SqliteStoreError> {
        self.with_reader(|connection| {
            connection.query_row("SELECT 1", [], |_| Ok(())).map_err(map_db_error)
        })
    }

    /// Runs `read` against the next pooled read connection.
    fn with_reader<T>(
        &self,
        read: impl FnOnce(&Connection) -> Result<T, SqliteStoreError>,
    ) -> Result<T, SqliteStoreError> {
        let len = self.read_connections.len();
        let index = self.read_cursor.fetch_add(1, Ordering::Relaxed) % len;
        let slot = self
            .read_connections
            .get(index)
            .ok_or_else(|| SqliteStoreError::Io("sqlite read pool is empty".to_string()))?;
        let guard = slot
            .lock()
            .map_err(|_| SqliteStoreError::Io("sqlite read mutex poisoned".to_string()))?;
        read(&guard)
    }

    /// Locks the writer connection.
    fn writer(&self) -> Result<MutexGuard<'_, Connection>, SqliteStoreError> {
        self.write_connection
            .lock()
            .map_err(|_| SqliteStoreError::Io("sqlite write mutex poisoned".to_string()))
    }
}

impl MaterialStore for SqliteMaterialStore {
    fn begin(&self) -> Result<Box<dyn MaterialTx + '_>, StoreError> {
        let connection = self.writer()?;
        connection.execute_batch("BEGIN IMMEDIATE").map_err(map_db_error)?;
        Ok(Box::new(SqliteMaterialTx { connection, finished: false }))
    }

    fn material(&self, id: MaterialId) -> Result<Option<Material>, StoreError> {
        Ok(self.with_reader(|connection| fetch_material(connection, id))?)
    }

    fn material_by_code(&self, code: &MaterialCode) -> Result<Option<Material>, StoreError> {
        Ok(self.with_reader(|connection| fetch_material_by_code(connection, code))?)
    }

    fn materials(&self, filter: &MaterialFilter) -> Result<Vec<Material>, StoreError> {
        Ok(self.with_reader(|connection| fetch_materials(connection, filter))?)
    }

    fn history(&self, id: MaterialId) -> Result<Vec<HistoryRecord>, StoreError> {
        Ok(self.with_reader(|connection| fetch_history(connection, id))?)
    }

    fn transactions(&self, id: MaterialId) -> Result<Vec<InventoryTransaction>, StoreError> {
        Ok(self.with_reader(|connection| fetch_transactions(connection, id))?)
    }

    fn upsert_actor(&self, profile: &ActorProfile) -> Result<(), StoreError> {
        let connection = self.writer()?;
        connection
            .execute(
                "INSERT INTO actors (actor_id, display_name, username, role) VALUES (?1, ?2, ?3, \
                 ?4)
                 ON CONFLICT(actor_id) DO UPDATE SET display_name = excluded.display_name, \
                 username = excluded.username, role = excluded.role",
                params![
                    profile.id.as_str(),
                    profile.display_name,
                    profile.username,
                    profile.role.as_str()
                ],
            )
            .map_err(map_db_error)?;
        Ok(())
    }

    fn actor(&self, id: &ActorId) -> Result<Option<ActorProfile>, StoreError> {
        Ok(self.with_reader(|connection| fetch_actor(connection, id))?)
    }
}

// ============================================================================
// SECTION: Transactions
// ============================================================================

/// Open `BEGIN IMMEDIATE` transaction on the writer connection.
///
/// # Invariants
/// - Holds the writer lock for its whole lifetime.
/// - Rolls back on drop unless committed.
struct SqliteMaterialTx<'a> {
    /// Locked writer connection.
    connection: MutexGuard<'a, Connection>,
    /// Set once `COMMIT` succeeded.
    finished: bool,
}

impl MaterialTx for SqliteMaterialTx<'_> {
    fn material_for_update(&mut self, id: MaterialId) -> Result<Option<Material>, StoreError> {
        Ok(fetch_material(&self.connection, id)?)
    }

    fn material_by_code(&mut self, code: &MaterialCode) -> Result<Option<Material>, StoreError> {
        Ok(fetch_material_by_code(&self.connection, code)?)
    }

    fn insert_material(&mut self, record: &NewMaterialRecord) -> Result<Material, StoreError> {
        let mut material = record.clone().into_material(MaterialId::new(0));
        self.connection
            .execute(
                "INSERT INTO materials (material_code, item_code, item_name, batch_lot_number, \
                 grn_number, received_total_quantity, remaining_quantity, container_quantity, \
                 dispensed_quantity, supplier_name, manufacturer_name, date_of_receipt, mfg_date, \
                 exp_date, rack_number, status, created_by, created_at, updated_at, version)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, \
                 ?17, ?18, ?19, ?20)",
                params![
                    material.material_code.as_str(),
                    material.item_code,
                    material.item_name,
                    material.batch_lot_number,
                    material.grn_number,
                    material.received_total_quantity.to_canonical_string(),
                    material.remaining_quantity.to_canonical_string(),
                    material.container_quantity.to_canonical_string(),
                    material.dispensed_quantity.to_canonical_string(),
                    material.supplier_name,
                    material.manufacturer_name,
                    format_date(material.date_of_receipt),
                    material.mfg_date.map(format_date),
                    material.exp_date.map(format_date),
                    material.rack_number,
                    material.status.as_str(),
                    material.created_by.as_str(),
                    material.created_at.as_unix_millis(),
                    material.updated_at.as_unix_millis(),
                    material.version,
                ],
            )
            .map_err(map_db_error)?;
        material.id = MaterialId::new(self.connection.last_insert_rowid());
        Ok(material)
    }

    fn update_material(&mut self, material: &Material) -> Result<Material, StoreError> {
        let changed = self
            .connection
            .execute(
                "UPDATE materials SET item_code = ?1, item_name = ?2, batch_lot_number = ?3, \
                 grn_number = ?4, received_total_quantity = ?5, remaining_quantity = ?6, \
                 container_quantity = ?7, dispensed_quantity = ?8, supplier_name = ?9, \
                 manufacturer_name = ?10, date_of_receipt = ?11, mfg_date = ?12, exp_date = ?13, \
                 rack_number = ?14, status = ?15, updated_at = ?16, version = version + 1
                 WHERE id = ?17 AND version = ?18 AND material_code = ?19",
                params![
                    material.item_code,
                    material.item_name,
                    material.batch_lot_number,
                    material.grn_number,
                    material.received_total_quantity.to_canonical_string(),
                    material.remaining_quantity.to_canonical_string(),
                    material.container_quantity.to_canonical_string(),
                    material.dispensed_quantity.to_canonical_string(),
                    material.supplier_name,
                    material.manufacturer_name,
                    format_date(material.date_of_receipt),
                    material.mfg_date.map(format_date),
                    material.exp_date.map(format_date),
                    material.rack_number,
                    material.status.as_str(),
                    material.updated_at.as_unix_millis(),
                    material.id.get(),
                    material.version,
                    material.material_code.as_str(),
                ],
            )
            .map_err(map_db_error)?;
        if changed == 1 {
            let mut next = material.clone();
            next.version += 1;
            return Ok(next);
        }
        match fetch_material(&self.connection, material.id)? {
            None => Err(StoreError::Invalid(format!("material {} does not exist", material.id))),
            Some(stored) if stored.material_code != material.material_code => {
                Err(StoreError::Invalid("material code is immutable".to_string()))
            }
            Some(stored) => Err(StoreError::Conflict(format!(
                "material {} version moved from {} to {}",
                material.id, material.version, stored.version
            ))),
        }
    }

    fn insert_history(&mut self, entry: &NewHistoryEntry) -> Result<HistoryId, StoreError> {
        self.connection
            .execute(
                "INSERT INTO material_status_history (material_id, from_status, to_status, \
                 action, performed_by, comment, rejection_reason, sampling_date, retest_date, \
                 issued_to_product_batch, dispensed_quantity, dispensing_method, timestamp)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                params![
                    entry.material_id.get(),
                    entry.from_status.map(|status| status.as_str()),
                    entry.to_status.as_str(),
                    entry.action.as_str(),
                    entry.performed_by.as_str(),
                    entry.comment,
                    entry.rejection_reason,
                    entry.sampling_date.map(Timestamp::as_unix_millis),
                    entry.retest_date.map(format_date),
                    entry.issued_to_product_batch,
                    entry.dispensed_quantity.as_ref().map(Quantity::to_canonical_string),
                    entry.dispensing_method.map(|method| method.as_str()),
                    entry.timestamp.as_unix_millis(),
                ],
            )
            .map_err(map_db_error)?;
        Ok(HistoryId::new(self.connection.last_insert_rowid()))
    }

    fn insert_transaction(
        &mut self,
        transaction: &NewInventoryTransaction,
    ) -> Result<InventoryTransaction, StoreError> {
        self.connection
            .execute(
                "INSERT INTO inventory_transactions (material_id, direction, quantity, \
                 transaction_date, performed_by, remarks, recorded_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    transaction.material_id.get(),
                    transaction.direction.as_str(),
                    transaction.quantity.to_canonical_string(),
                    format_date(transaction.transaction_date),
                    transaction.performed_by.as_str(),
                    transaction.remarks,
                    transaction.recorded_at.as_unix_millis(),
                ],
            )
            .map_err(map_db_error)?;
        let id = TransactionId::new(self.connection.last_insert_rowid());
        Ok(transaction.clone().into_transaction(id))
    }

    fn commit(mut self: Box<Self>) -> Result<(), StoreError> {
        self.connection.execute_batch("COMMIT").map_err(map_db_error)?;
        self.finished = true;
        Ok(())
    }
}

impl Drop for SqliteMaterialTx<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        if let Err(err) = self.connection.execute_batch("ROLLBACK") {
            warn!(error = %err, "sqlite rollback failed");
        }
    }
}

// ============================================================================
// SECTION: Row Mapping
// ============================================================================

/// Raw material row as stored.
struct MaterialRow {
    /// Internal key.
    id: i64,
    /// Derived code.
    material_code: String,
    /// Item code.
    item_code: String,
    /// Item name.
    item_name: String,
    /// Batch/lot number.
    batch_lot_number: String,
    /// GRN number.
    grn_number: String,
    /// Received total quantity text.
    received_total_quantity: String,
    /// Remaining quantity text.
    remaining_quantity: String,
    /// Container quantity text.
    container_quantity: String,
    /// Dispensed quantity text.
    dispensed_quantity: String,
    /// Supplier name.
    supplier_name: String,
    /// Manufacturer name.
    manufacturer_name: String,
    /// Receipt date text.
    date_of_receipt: String,
    /// Manufacture date text.
    mfg_date: Option<String>,
    /// Expiry date text.
    exp_date: Option<String>,
    /// Rack location.
    rack_number: Option<String>,
    /// Status text.
    status: String,
    /// Creating actor.
    created_by: String,
    /// Creation instant.
    created_at: i64,
    /// Update instant.
    updated_at: i64,
    /// Row version.
    version: i64,
}

/// Maps a `SQLite` row selected with [`MATERIAL_COLUMNS`].
fn map_material_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<MaterialRow> {
    Ok(MaterialRow {
        id: row.get(0)?,
        material_code: row.get(1)?,
        item_code: row.get(2)?,
        item_name: row.get(3)?,
        batch_lot_number: row.get(4)?,
        grn_number: row.get(5)?,
        received_total_quantity: row.get(6)?,
        remaining_quantity: row.get(7)?,
        container_quantity: row.get(8)?,
        dispensed_quantity: row.get(9)?,
        supplier_name: row.get(10)?,
        manufacturer_name: row.get(11)?,
        date_of_receipt: row.get(12)?,
        mfg_date: row.get(13)?,
        exp_date: row.get(14)?,
        rack_number: row.get(15)?,
        status: row.get(16)?,
        created_by: row.get(17)?,
        created_at: row.get(18)?,
        updated_at: row.get(19)?,
        version: row.get(20)?,
    })
}

impl MaterialRow {
    /// Decodes the row, failing closed on any malformed column.
    fn into_material(self) -> Result<Material, SqliteStoreError> {
        Ok(Material {
            id: MaterialId::new(self.id),
            material_code: MaterialCode::new(self.material_code),
            item_code: self.item_code,
            item_name: self.item_name,
            batch_lot_number: self.batch_lot_number,
            grn_number: self.grn_number,
            received_total_quantity: decode_quantity(
                "received_total_quantity",
                &self.received_total_quantity,
            )?,
            remaining_quantity: decode_quantity("remaining_quantity", &self.remaining_quantity)?,
            container_quantity: decode_quantity("container_quantity", &self.container_quantity)?,
            dispensed_quantity: decode_quantity("dispensed_quantity", &self.dispensed_quantity)?,
            supplier_name: self.supplier_name,
            manufacturer_name: self.manufacturer_name,
            date_of_receipt: decode_date("date_of_receipt", &self.date_of_receipt)?,
            mfg_date: decode_optional_date("mfg_date", self.mfg_date.as_deref())?,
            exp_date: decode_optional_date("exp_date", self.exp_date.as_deref())?,
            rack_number: self.rack_number,
            status: decode_enum(&self.status)?,
            created_by: ActorId::new(self.created_by),
            created_at: Timestamp::from_unix_millis(self.created_at),
            updated_at: Timestamp::from_unix_millis(self.updated_at),
            version: self.version,
        })
    }
}

/// Raw history row joined with the actor profile.
struct HistoryRow {
    /// Entry key.
    id: i64,
    /// Material key.
    material_id: i64,
    /// Previous status text.
    from_status: Option<String>,
    /// New status text.
    to_status: String,
    /// Action text.
    action: String,
    /// Performing actor.
    performed_by: String,
    /// Comment.
    comment: String,
    /// Rejection reason.
    rejection_reason: Option<String>,
    /// Sampling instant.
    sampling_date: Option<i64>,
    /// Retest date text.
    retest_date: Option<String>,
    /// Dispense target batch.
    issued_to_product_batch: Option<String>,
    /// Dispensed quantity text.
    dispensed_quantity: Option<String>,
    /// Dispensing method text.
    dispensing_method: Option<String>,
    /// Entry instant.
    timestamp: i64,
    /// Joined display name.
    display_name: Option<String>,
    /// Joined username.
    username: Option<String>,
    /// Joined role text.
    role: Option<String>,
}

/// Maps a joined history row.
fn map_history_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<HistoryRow> {
    Ok(HistoryRow {
        id: row.get(0)?,
        material_id: row.get(1)?,
        from_status: row.get(2)?,
        to_status: row.get(3)?,
        action: row.get(4)?,
        performed_by: row.get(5)?,
        comment: row.get(6)?,
        rejection_reason: row.get(7)?,
        sampling_date: row.get(8)?,
        retest_date: row.get(9)?,
        issued_to_product_batch: row.get(10)?,
        dispensed_quantity: row.get(11)?,
        dispensing_method: row.get(12)?,
        timestamp: row.get(13)?,
        display_name: row.get(14)?,
        username: row.get(15)?,
        role: row.get(16)?,
    })
}

impl HistoryRow {
    /// Decodes the row into an enriched history record.
    fn into_record(self) -> Result<HistoryRecord, SqliteStoreError> {
        let performed_by_role = match self.role.as_deref() {
            Some(text) => Some(
                Role::parse(text)
                    .ok_or_else(|| SqliteStoreError::Corrupt(format!("unknown role: {text}")))?,
            ),
            None => None,
        };
        let entry = StatusHistoryEntry {
            id: HistoryId::new(self.id),
            material_id: MaterialId::new(self.material_id),
            from_status: self.from_status.as_deref().map(decode_enum).transpose()?,
            to_status: decode_enum(&self.to_status)?,
            action: decode_enum(&self.action)?,
            performed_by: ActorId::new(self.performed_by),
            comment: self.comment,
            rejection_reason: self.rejection_reason,
            sampling_date: self.sampling_date.map(Timestamp::from_unix_millis),
            retest_date: decode_optional_date("retest_date", self.retest_date.as_deref())?,
            issued_to_product_batch: self.issued_to_product_batch,
            dispensed_quantity: self
                .dispensed_quantity
                .as_deref()
                .map(|text| decode_quantity("dispensed_quantity", text))
                .transpose()?,
            dispensing_method: self.dispensing_method.as_deref().map(decode_enum).transpose()?,
            timestamp: Timestamp::from_unix_millis(self.timestamp),
        };
        Ok(HistoryRecord {
            entry,
            performed_by_name: self.display_name,
            performed_by_username: self.username,
            performed_by_role,
        })
    }
}

/// Decodes a stored quantity column.
fn decode_quantity(column: &str, text: &str) -> Result<Quantity, SqliteStoreError> {
    Quantity::parse(text).map_err(|err| SqliteStoreError::Corrupt(format!("{column}: {err}")))
}

/// Decodes a stored date column.
fn decode_date(column: &str, text: &str) -> Result<Date, SqliteStoreError> {
    parse_date(text).map_err(|err| SqliteStoreError::Corrupt(format!("{column}: {err}")))
}

/// Decodes a nullable date column.
fn decode_optional_date(column: &str, text: Option<&str>) -> Result<Option<Date>, SqliteStoreError> {
    text.map(|value| decode_date(column, value)).transpose()
}

/// Decodes a stored closed-enum column.
fn decode_enum<T: FromStr<Err = UnknownVariant>>(text: &str) -> Result<T, SqliteStoreError> {
    text.parse().map_err(|err: UnknownVariant| SqliteStoreError::Corrupt(err.to_string()))
}

// ============================================================================
// SECTION: Queries
// ============================================================================

/// Loads a material by internal key.
fn fetch_material(connection: &Connection, id: MaterialId) -> Result<Option<Material>, SqliteStoreError> {
    connection
        .query_row(
            &format!("SELECT {MATERIAL_COLUMNS} FROM materials WHERE id = ?1"),
            params![id.get()],
            map_material_row,
        )
        .optional()
        .map_err(map_db_error)?
        .map(MaterialRow::into_material)
        .transpose()
}

/// Loads a material by derived code.
fn fetch_material_by_code(
    connection: &Connection,
    code: &MaterialCode,
) -> Result<Option<Material>, SqliteStoreError> {
    connection
        .query_row(
            &format!("SELECT {MATERIAL_COLUMNS} FROM materials WHERE material_code = ?1"),
            params![code.as_str()],
            map_material_row,
        )
        .optional()
        .map_err(map_db_error)?
        .map(MaterialRow::into_material)
        .transpose()
}

/// Lists materials matching `filter` by internal key.
fn fetch_materials(
    connection: &Connection,
    filter: &MaterialFilter,
) -> Result<Vec<Material>, SqliteStoreError> {
    let mut statement = connection
        .prepare(&format!(
            "SELECT {MATERIAL_COLUMNS} FROM materials WHERE (?1 IS NULL OR status = ?1) AND (?2 \
             IS NULL OR item_code = ?2) ORDER BY id ASC"
        ))
        .map_err(map_db_error)?;
    let rows = statement
        .query_map(
            params![filter.status.map(|status| status.as_str()), filter.item_code.as_deref()],
            map_material_row,
        )
        .map_err(map_db_error)?;
    let mut materials = Vec::new();
    for row in rows {
        materials.push(row.map_err(map_db_error)?.into_material()?);
    }
    Ok(materials)
}

/// Loads the joined audit trail of a material, oldest first.
fn fetch_history(
    connection: &Connection,
    id: MaterialId,
) -> Result<Vec<HistoryRecord>, SqliteStoreError> {
    let mut statement = connection
        .prepare(
            "SELECT h.id, h.material_id, h.from_status, h.to_status, h.action, h.performed_by, \
             h.comment, h.rejection_reason, h.sampling_date, h.retest_date, \
             h.issued_to_product_batch, h.dispensed_quantity, h.dispensing_method, h.timestamp, \
             a.display_name, a.username, a.role
             FROM material_status_history h
             LEFT JOIN actors a ON a.actor_id = h.performed_by
             WHERE h.material_id = ?1
             ORDER BY h.id ASC",
        )
        .map_err(map_db_error)?;
    let rows = statement.query_map(params![id.get()], map_history_row).map_err(map_db_error)?;
    let mut records = Vec::new();
    for row in rows {
        records.push(row.map_err(map_db_error)?.into_record()?);
    }
    Ok(records)
}

/// Loads the inventory movements of a material, oldest first.
fn fetch_transactions(
    connection: &Connection,
    id: MaterialId,
) -> Result<Vec<InventoryTransaction>, SqliteStoreError> {
    let mut statement = connection
        .prepare(
            "SELECT id, material_id, direction, quantity, transaction_date, performed_by, \
             remarks, recorded_at
             FROM inventory_transactions WHERE material_id = ?1 ORDER BY id ASC",
        )
        .map_err(map_db_error)?;
    let rows = statement
        .query_map(params![id.get()], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, Option<String>>(6)?,
                row.get::<_, i64>(7)?,
            ))
        })
        .map_err(map_db_error)?;
    let mut transactions = Vec::new();
    for row in rows {
        let (tx_id, material_id, direction, quantity, date, performed_by, remarks, recorded_at) =
            row.map_err(map_db_error)?;
        transactions.push(InventoryTransaction {
            id: TransactionId::new(tx_id),
            material_id: MaterialId::new(material_id),
            direction: decode_enum(&direction)?,
            quantity: decode_quantity("quantity", &quantity)?,
            transaction_date: decode_date("transaction_date", &date)?,
            performed_by: ActorId::new(performed_by),
            remarks,
            recorded_at: Timestamp::from_unix_millis(recorded_at),
        });
    }
    Ok(transactions)
}

/// Loads an actor profile.
fn fetch_actor(connection: &Connection, id: &ActorId) -> Result<Option<ActorProfile>, SqliteStoreError> {
    let row = connection
        .query_row(
            "SELECT display_name, username, role FROM actors WHERE actor_id = ?1",
            params![id.as_str()],
            |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?, row.get::<_, String>(2)?))
            },
        )
        .optional()
        .map_err(map_db_error)?;
    let Some((display_name, username, role)) = row else {
        return Ok(None);
    };
    let role = Role::parse(&role)
        .ok_or_else(|| SqliteStoreError::Corrupt(format!("unknown role: {role}")))?;
    Ok(Some(ActorProfile { id: id.clone(), display_name, username, role }))
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Ensures the parent directory for the store exists.
fn ensure_parent_dir(path: &Path) -> Result<(), SqliteStoreError> {
    let Some(parent) = path.parent() else {
        return Err(SqliteStoreError::Io("store path missing parent directory".to_string()));
    };
    if parent.as_os_str().is_empty() {
        return Ok(());
    }
    std::fs::create_dir_all(parent).map_err(|err| SqliteStoreError::Io(err.to_string()))
}

/// Validates store paths for safety limits.
fn validate_store_path(path: &Path) -> Result<(), SqliteStoreError> {
    if path.as_os_str().is_empty() {
        return Err(SqliteStoreError::Invalid("store path must not be empty".to_string()));
    }
    if path.display().to_string().len() > MAX_TOTAL_PATH_LENGTH {
        return Err(SqliteStoreError::Invalid("store path exceeds length limit".to_string()));
    }
    if path
        .components()
        .any(|component| component.as_os_str().len() > MAX_PATH_COMPONENT_LENGTH)
    {
        return Err(SqliteStoreError::Invalid(
            "store path contains an overlong component".to_string(),
        ));
    }
    if path.is_dir() {
        return Err(SqliteStoreError::Invalid(
            "store path must be a file, not a directory".to_string(),
        ));
    }
    Ok(())
}

/// Opens an `SQLite` connection with the configured pragmas.
fn open_connection(config: &SqliteStoreConfig) -> Result<Connection, SqliteStoreError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    let connection = Connection::open_with_flags(&config.path, flags).map_err(map_db_error)?;
    connection
        .busy_timeout(Duration::from_millis(config.busy_timeout_ms))
        .map_err(map_db_error)?;
    connection
        .execute_batch(&format!(
            "PRAGMA foreign_keys = ON;
             PRAGMA journal_mode = {};
             PRAGMA synchronous = {};",
            config.journal_mode.pragma_value(),
            config.sync_mode.pragma_value()
        ))
        .map_err(map_db_error)?;
    Ok(connection)
}

/// Initializes the `SQLite` schema or validates the existing version.
fn initialize_schema(connection: &mut Connection) -> Result<(), SqliteStoreError> {
    let tx = connection.transaction().map_err(map_db_error)?;
    tx.execute_batch("CREATE TABLE IF NOT EXISTS store_meta (version INTEGER NOT NULL);")
        .map_err(map_db_error)?;
    let version: Option<i64> = tx
        .query_row("SELECT version FROM store_meta LIMIT 1", params![], |row| row.get(0))
        .optional()
        .map_err(map_db_error)?;
    match version {
        None => {
            tx.execute("INSERT INTO store_meta (version) VALUES (?1)", params![SCHEMA_VERSION])
                .map_err(map_db_error)?;
            tx.execute_batch(
                "CREATE TABLE materials (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    material_code TEXT NOT NULL UNIQUE,
                    item_code TEXT NOT NULL,
                    item_name TEXT NOT NULL,
                    batch_lot_number TEXT NOT NULL,
                    grn_number TEXT NOT NULL,
                    received_total_quantity TEXT NOT NULL,
                    remaining_quantity TEXT NOT NULL,
                    container_quantity TEXT NOT NULL,
                    dispensed_quantity TEXT NOT NULL,
                    supplier_name TEXT NOT NULL,
                    manufacturer_name TEXT NOT NULL,
                    date_of_receipt TEXT NOT NULL,
                    mfg_date TEXT,
                    exp_date TEXT,
                    rack_number TEXT,
                    status TEXT NOT NULL CHECK (status IN ('QUARANTINE', 'UNDER_TEST', \
                 'APPROVED', 'REJECTED', 'DISPENSED')),
                    created_by TEXT NOT NULL,
                    created_at INTEGER NOT NULL,
                    updated_at INTEGER NOT NULL,
                    version INTEGER NOT NULL
                );
                CREATE INDEX idx_materials_status_item ON materials (status, item_code);
                CREATE TABLE material_status_history (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    material_id INTEGER NOT NULL REFERENCES materials(id),
                    from_status TEXT,
                    to_status TEXT NOT NULL,
                    action TEXT NOT NULL,
                    performed_by TEXT NOT NULL,
                    comment TEXT NOT NULL,
                    rejection_reason TEXT,
                    sampling_date INTEGER,
                    retest_date TEXT,
                    issued_to_product_batch TEXT,
                    dispensed_quantity TEXT,
                    dispensing_method TEXT,
                    timestamp INTEGER NOT NULL
                );
                CREATE INDEX idx_history_material ON material_status_history (material_id, id);
                CREATE TRIGGER history_no_update BEFORE UPDATE ON material_status_history
                BEGIN
                    SELECT RAISE(ABORT, 'material_status_history is append-only');
                END;
                CREATE TRIGGER history_no_delete BEFORE DELETE ON material_status_history
                BEGIN
                    SELECT RAISE(ABORT, 'material_status_history is append-only');
                END;
                CREATE TABLE inventory_transactions (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    material_id INTEGER NOT NULL REFERENCES materials(id),
                    direction TEXT NOT NULL CHECK (direction IN ('INWARD', 'OUTWARD')),
                    quantity TEXT NOT NULL,
                    transaction_date TEXT NOT NULL,
                    performed_by TEXT NOT NULL,
                    remarks TEXT,
                    recorded_at INTEGER NOT NULL
                );
                CREATE INDEX idx_transactions_material ON inventory_transactions (material_id, \
                 id);
                CREATE TABLE actors (
                    actor_id TEXT PRIMARY KEY,
                    display_name TEXT NOT NULL,
                    username TEXT NOT NULL,
                    role TEXT NOT NULL
                );",
            )
            .map_err(map_db_error)?;
            debug!(version = SCHEMA_VERSION, "sqlite material schema created");
        }
        Some(value) if value == SCHEMA_VERSION => {}
        Some(value) => {
            return Err(SqliteStoreError::VersionMismatch(format!(
                "unsupported schema version: {value}"
            )));
        }
    }
    tx.commit().map_err(map_db_error)?;
    Ok(())
}
