//! Database types and global state.
//!
//! One process-global LMDB environment, opened once by [`init`]. All record
//! tables and join indexes live here; services go through [`read`] for
//! snapshots and [`crate::tx::transact`] for writes. LMDB's single-writer
//! model is what makes the conditional booking update atomic: there is never
//! a read-then-write window between two write transactions.

use std::path::Path;
use std::sync::{Mutex, OnceLock};

use heed::types::{Bytes, SerdeBincode, Str, U64};
use heed::{Database, Env, EnvOpenOptions, RoTxn, RwTxn};
use uuid::Uuid;

use crate::error::{GiftlistError, Result};
use crate::model::{Gift, List, User};

/// Epoch-valued index databases (join rows carry their creation time)
pub type Db = Database<Bytes, U64<byteorder::BigEndian>>;

/// Build a 32-byte key from two uuids
#[inline]
pub fn pair_key(a: Uuid, b: Uuid) -> [u8; 32] {
    let mut k = [0u8; 32];
    k[..16].copy_from_slice(a.as_bytes());
    k[16..].copy_from_slice(b.as_bytes());
    k
}

/// Milliseconds since the unix epoch
pub fn current_epoch() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Bidirectional join index: fwd[a,b] and rev[b,a] stay in sync.
///
/// Realizes a many-to-many relation (user↔list ownership, user↔list grants)
/// as two explicit id-keyed tables instead of embedded object references.
pub struct BiPair {
    pub fwd: Db,
    pub rev: Db,
}

impl BiPair {
    /// Idempotent: re-inserting an existing pair refreshes its epoch only.
    #[inline]
    pub fn put(&self, tx: &mut RwTxn, a: Uuid, b: Uuid, epoch: u64) -> Result<()> {
        self.fwd.put(tx, &pair_key(a, b), &epoch)?;
        self.rev.put(tx, &pair_key(b, a), &epoch)?;
        Ok(())
    }

    #[inline]
    pub fn del(&self, tx: &mut RwTxn, a: Uuid, b: Uuid) -> Result<bool> {
        let r = self.fwd.delete(tx, &pair_key(a, b))?;
        self.rev.delete(tx, &pair_key(b, a))?;
        Ok(r)
    }

    pub fn list_fwd(&self, tx: &RoTxn, a: Uuid) -> Result<Vec<Uuid>> {
        Self::list_pfx(tx, &self.fwd, a)
    }

    pub fn list_rev(&self, tx: &RoTxn, b: Uuid) -> Result<Vec<Uuid>> {
        Self::list_pfx(tx, &self.rev, b)
    }

    fn list_pfx(tx: &RoTxn, db: &Db, pfx: Uuid) -> Result<Vec<Uuid>> {
        let mut r = Vec::new();
        for item in db.prefix_iter(tx, pfx.as_bytes().as_slice())? {
            let (k, _epoch) = item?;
            if k.len() == 32 {
                r.push(Uuid::from_slice(&k[16..32]).map_err(|e| {
                    GiftlistError::Storage(format!("corrupt join key: {}", e))
                })?);
            }
        }
        Ok(r)
    }
}

/// All database handles
pub struct Dbs {
    /// uuid → User record
    pub users: Database<Bytes, SerdeBincode<User>>,
    /// email → uuid (unique index)
    pub emails: Database<Str, Bytes>,
    /// uuid → List record
    pub lists: Database<Bytes, SerdeBincode<List>>,
    /// sharing code → list uuid (unique index, immutable per list)
    pub codes: Database<Str, Bytes>,
    /// uuid → Gift record
    pub gifts: Database<Bytes, SerdeBincode<Gift>>,
    /// (list, gift) membership index
    pub list_gifts: Db,
    /// (user, list) ownership join
    pub owners: BiPair,
    /// (user, list) grant join
    pub granted: BiPair,
    /// token hash → "user_id|created|expires"
    pub sessions: Database<Str, Str>,
    /// user id → "salt|hash"
    pub credentials: Database<Str, Str>,
}

// Global state
pub(crate) static ENV: OnceLock<Env> = OnceLock::new();
pub(crate) static DBS: OnceLock<Dbs> = OnceLock::new();
static TEST_LOCK: Mutex<()> = Mutex::new(());
static INIT_PATH: OnceLock<String> = OnceLock::new();

/// Get the database handles, or error if not initialized
#[inline]
pub fn dbs() -> Result<&'static Dbs> {
    DBS.get()
        .ok_or_else(|| GiftlistError::Storage("not initialized".into()))
}

/// Get the environment, or error if not initialized
#[inline]
pub fn env() -> Result<&'static Env> {
    ENV.get()
        .ok_or_else(|| GiftlistError::Storage("not initialized".into()))
}

/// Execute a read-only operation against a consistent snapshot
#[inline]
pub fn read<T, F: FnOnce(&Dbs, &RoTxn) -> Result<T>>(f: F) -> Result<T> {
    f(dbs()?, &env()?.read_txn()?)
}

/// Initialize the database (idempotent for the same path)
pub fn init(path: &str) -> Result<()> {
    if let Some(p) = INIT_PATH.get() {
        return if p == path {
            Ok(())
        } else {
            Err(GiftlistError::Storage(format!("already initialized at {}", p)))
        };
    }
    std::fs::create_dir_all(path)?;
    // SAFETY: LMDB requires no other process to open this path concurrently.
    let e = unsafe {
        EnvOpenOptions::new()
            .map_size(1 << 30)
            .max_dbs(12)
            .open(Path::new(path))?
    };
    let mut tx = e.write_txn()?;
    let d = Dbs {
        users: e.create_database(&mut tx, Some("users"))?,
        emails: e.create_database(&mut tx, Some("emails"))?,
        lists: e.create_database(&mut tx, Some("lists"))?,
        codes: e.create_database(&mut tx, Some("codes"))?,
        gifts: e.create_database(&mut tx, Some("gifts"))?,
        list_gifts: e.create_database(&mut tx, Some("list_gifts"))?,
        owners: BiPair {
            fwd: e.create_database(&mut tx, Some("owners"))?,
            rev: e.create_database(&mut tx, Some("owners_rev"))?,
        },
        granted: BiPair {
            fwd: e.create_database(&mut tx, Some("granted"))?,
            rev: e.create_database(&mut tx, Some("granted_rev"))?,
        },
        sessions: e.create_database(&mut tx, Some("sessions"))?,
        credentials: e.create_database(&mut tx, Some("credentials"))?,
    };
    tx.commit()?;
    let _ = (ENV.set(e), DBS.set(d), INIT_PATH.set(path.to_string()));
    Ok(())
}

/// Clear all databases (for testing)
pub fn clear_all() -> Result<()> {
    crate::tx::transact(|tx| {
        let d = tx.dbs();
        d.users.clear(tx.tx())?;
        d.emails.clear(tx.tx())?;
        d.lists.clear(tx.tx())?;
        d.codes.clear(tx.tx())?;
        d.gifts.clear(tx.tx())?;
        d.list_gifts.clear(tx.tx())?;
        d.owners.fwd.clear(tx.tx())?;
        d.owners.rev.clear(tx.tx())?;
        d.granted.fwd.clear(tx.tx())?;
        d.granted.rev.clear(tx.tx())?;
        d.sessions.clear(tx.tx())?;
        d.credentials.clear(tx.tx())?;
        Ok(())
    })
}

/// Get the test lock (serializes tests that share the global env)
pub fn test_lock() -> std::sync::MutexGuard<'static, ()> {
    TEST_LOCK.lock().unwrap_or_else(|p| p.into_inner())
}
