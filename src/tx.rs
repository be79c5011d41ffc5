//! Transaction wrapper for record-level writes.
//!
//! Every public operation runs inside exactly one write transaction, so a
//! conditional update (booking a gift only while it is unbooked) commits
//! atomically or not at all.

use heed::{RoTxn, RwTxn};
use uuid::Uuid;

use crate::db::{current_epoch, dbs, env, pair_key, Dbs};
use crate::error::Result;
use crate::model::{Gift, List, ListAccess, User};

/// Transaction wrapper for batched writes
pub struct Tx {
    txn: Option<RwTxn<'static>>,
    dbs: &'static Dbs,
    epoch: u64,
}

impl Tx {
    #[inline]
    pub(crate) fn new() -> Result<Self> {
        Ok(Tx {
            txn: Some(env()?.write_txn()?),
            dbs: dbs()?,
            epoch: current_epoch(),
        })
    }

    #[inline]
    pub(crate) fn tx(&mut self) -> &mut RwTxn<'static> {
        self.txn.as_mut().unwrap()
    }

    #[inline]
    pub(crate) fn dbs(&self) -> &'static Dbs {
        self.dbs
    }

    /// Timestamp shared by all writes in this transaction
    #[inline]
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    #[inline]
    pub(crate) fn commit(mut self) -> Result<()> {
        self.txn.take().unwrap().commit()?;
        Ok(())
    }

    // --- users ---

    /// Write a user record and keep the email index in sync
    pub fn put_user(&mut self, user: &User) -> Result<()> {
        self.dbs.users.put(self.tx(), user.id.as_bytes(), user)?;
        self.dbs
            .emails
            .put(self.tx(), &user.email, user.id.as_bytes())?;
        Ok(())
    }

    pub fn get_user(&mut self, id: Uuid) -> Result<Option<User>> {
        fetch_user(self.dbs, self.tx(), id)
    }

    pub fn user_by_email(&mut self, email: &str) -> Result<Option<Uuid>> {
        user_by_email(self.dbs, self.tx(), email)
    }

    /// Drop the old email index entry before a user changes address
    pub fn unindex_email(&mut self, email: &str) -> Result<()> {
        self.dbs.emails.delete(self.tx(), email)?;
        Ok(())
    }

    pub fn del_user(&mut self, id: Uuid) -> Result<bool> {
        if let Some(user) = self.get_user(id)? {
            self.dbs.emails.delete(self.tx(), &user.email)?;
            self.dbs.credentials.delete(self.tx(), &id.to_string())?;
        }
        let r = self.dbs.users.delete(self.tx(), id.as_bytes())?;
        Ok(r)
    }

    // --- lists ---

    pub fn put_list(&mut self, list: &List) -> Result<()> {
        self.dbs.lists.put(self.tx(), list.id.as_bytes(), list)?;
        Ok(())
    }

    /// Register the sharing code, written once at list creation
    pub fn index_code(&mut self, list: &List) -> Result<()> {
        self.dbs
            .codes
            .put(self.tx(), &list.sharing_code.to_string(), list.id.as_bytes())?;
        Ok(())
    }

    pub fn get_list(&mut self, id: Uuid) -> Result<Option<List>> {
        fetch_list(self.dbs, self.tx(), id)
    }

    pub fn list_by_code(&mut self, code: Uuid) -> Result<Option<Uuid>> {
        list_by_code(self.dbs, self.tx(), code)
    }

    /// Delete the list record with its code index and join rows. Gifts are
    /// cascaded by the caller, which knows their ids.
    pub fn del_list(&mut self, list: &List, access: &ListAccess) -> Result<bool> {
        self.dbs
            .codes
            .delete(self.tx(), &list.sharing_code.to_string())?;
        for &owner in &access.owners {
            self.dbs.owners.del(self.tx(), owner, list.id)?;
        }
        for &user in &access.granted {
            self.dbs.granted.del(self.tx(), user, list.id)?;
        }
        let r = self.dbs.lists.delete(self.tx(), list.id.as_bytes())?;
        Ok(r)
    }

    // --- membership joins ---

    pub fn access_of(&mut self, list_id: Uuid) -> Result<ListAccess> {
        access_of(self.dbs, self.tx(), list_id)
    }

    pub fn add_owner(&mut self, user: Uuid, list: Uuid) -> Result<()> {
        let epoch = self.epoch;
        self.dbs.owners.put(self.tx(), user, list, epoch)
    }

    pub fn remove_owner(&mut self, user: Uuid, list: Uuid) -> Result<bool> {
        self.dbs.owners.del(self.tx(), user, list)
    }

    /// Idempotent: re-granting an existing member is a no-op (set semantics)
    pub fn add_granted(&mut self, user: Uuid, list: Uuid) -> Result<()> {
        let epoch = self.epoch;
        self.dbs.granted.put(self.tx(), user, list, epoch)
    }

    pub fn remove_granted(&mut self, user: Uuid, list: Uuid) -> Result<bool> {
        self.dbs.granted.del(self.tx(), user, list)
    }

    // --- gifts ---

    pub fn put_gift(&mut self, gift: &Gift) -> Result<()> {
        self.dbs.gifts.put(self.tx(), gift.id.as_bytes(), gift)?;
        let (epoch, key) = (self.epoch, pair_key(gift.list_id, gift.id));
        self.dbs.list_gifts.put(self.tx(), &key, &epoch)?;
        Ok(())
    }

    pub fn get_gift(&mut self, id: Uuid) -> Result<Option<Gift>> {
        fetch_gift(self.dbs, self.tx(), id)
    }

    pub fn del_gift(&mut self, gift: &Gift) -> Result<bool> {
        self.dbs
            .list_gifts
            .delete(self.tx(), &pair_key(gift.list_id, gift.id))?;
        let r = self.dbs.gifts.delete(self.tx(), gift.id.as_bytes())?;
        Ok(r)
    }

    pub fn gift_ids_of(&mut self, list_id: Uuid) -> Result<Vec<Uuid>> {
        gift_ids_of(self.dbs, self.tx(), list_id)
    }
}

/// Run multiple operations in a single transaction
#[inline]
pub fn transact<T, F: FnOnce(&mut Tx) -> Result<T>>(f: F) -> Result<T> {
    let mut tx = Tx::new()?;
    let r = f(&mut tx)?;
    tx.commit()?;
    Ok(r)
}

// Read helpers shared by Tx methods and read-only snapshots.

pub(crate) fn fetch_user(d: &Dbs, tx: &RoTxn, id: Uuid) -> Result<Option<User>> {
    Ok(d.users.get(tx, id.as_bytes())?)
}

pub(crate) fn user_by_email(d: &Dbs, tx: &RoTxn, email: &str) -> Result<Option<Uuid>> {
    match d.emails.get(tx, email)? {
        Some(bytes) => Ok(Some(uuid_from(bytes)?)),
        None => Ok(None),
    }
}

pub(crate) fn fetch_list(d: &Dbs, tx: &RoTxn, id: Uuid) -> Result<Option<List>> {
    Ok(d.lists.get(tx, id.as_bytes())?)
}

pub(crate) fn list_by_code(d: &Dbs, tx: &RoTxn, code: Uuid) -> Result<Option<Uuid>> {
    match d.codes.get(tx, &code.to_string())? {
        Some(bytes) => Ok(Some(uuid_from(bytes)?)),
        None => Ok(None),
    }
}

pub(crate) fn fetch_gift(d: &Dbs, tx: &RoTxn, id: Uuid) -> Result<Option<Gift>> {
    Ok(d.gifts.get(tx, id.as_bytes())?)
}

pub(crate) fn access_of(d: &Dbs, tx: &RoTxn, list_id: Uuid) -> Result<ListAccess> {
    Ok(ListAccess {
        owners: d.owners.list_rev(tx, list_id)?,
        granted: d.granted.list_rev(tx, list_id)?,
    })
}

pub(crate) fn gift_ids_of(d: &Dbs, tx: &RoTxn, list_id: Uuid) -> Result<Vec<Uuid>> {
    let mut r = Vec::new();
    for item in d.list_gifts.prefix_iter(tx, list_id.as_bytes().as_slice())? {
        let (k, _epoch) = item?;
        if k.len() == 32 {
            r.push(uuid_from(&k[16..32])?);
        }
    }
    Ok(r)
}

fn uuid_from(bytes: &[u8]) -> Result<Uuid> {
    Uuid::from_slice(bytes)
        .map_err(|e| crate::error::GiftlistError::Storage(format!("corrupt id bytes: {}", e)))
}
