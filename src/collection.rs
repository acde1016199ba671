//! In-memory mutations of a resource's record list.
//!
//! Every store operation is a read-modify-write of the whole collection:
//! load the array, apply one of these functions, persist the array again.
//! Keeping them free of I/O lets the merge and matching rules be tested on
//! plain vectors.

use core::fmt;

use serde_json::Value;
use thiserror::Error;

use crate::record::{
    matches_id_or_slug, Record, CREATED_AT_FIELD, ID_FIELD, UPDATED_AT_FIELD,
};

/// What a mutation actually did to the collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// A new record was appended by `create`.
    Created,
    /// An existing record was merged with the incoming fields.
    Updated,
    /// `update` found no match and appended the record instead.
    Inserted,
    /// `remove` dropped this many records.
    Deleted(usize),
    /// `remove` matched nothing.
    NotFound,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Created => "created",
            Outcome::Updated => "updated",
            Outcome::Inserted => "inserted",
            Outcome::Deleted(_) => "deleted",
            Outcome::NotFound => "not-found",
        }
    }

    /// Whether the collection changed and has to be written back.
    pub fn is_change(&self) -> bool {
        !matches!(self, Outcome::NotFound)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum MutationError {
    #[error("{0} is required")]
    MissingKey(String),
}

/// Append `fields` as a new record stamped with `createdAt`.
///
/// A caller-supplied `updatedAt` is dropped: only updates carry that stamp.
/// No `id` is generated.
pub fn create(records: &mut Vec<Record>, mut fields: Record, now: i64) -> Outcome {
    fields.remove(UPDATED_AT_FIELD);
    fields.insert(CREATED_AT_FIELD.to_string(), Value::from(now));
    records.push(fields);
    Outcome::Created
}

/// Merge `fields` into the first record with the same `id`, or insert it.
pub fn update(records: &mut Vec<Record>, fields: Record, now: i64) -> Result<Outcome, MutationError> {
    update_by(records, ID_FIELD, fields, now)
}

/// Like [`update`] but matching on an arbitrary key field.
///
/// The match is exact JSON equality on `key_field`. On a hit the incoming
/// fields overwrite existing keys, untouched keys survive, `createdAt` is
/// never replaced and `updatedAt` is stamped. On a miss the record goes
/// through [`create`], so it carries `createdAt` only.
pub fn update_by(
    records: &mut Vec<Record>,
    key_field: &str,
    fields: Record,
    now: i64,
) -> Result<Outcome, MutationError> {
    let key = fields
        .get(key_field)
        .filter(|v| !v.is_null())
        .cloned()
        .ok_or_else(|| MutationError::MissingKey(key_field.to_string()))?;

    match records.iter_mut().find(|r| r.get(key_field) == Some(&key)) {
        Some(existing) => {
            for (k, v) in fields {
                if k == CREATED_AT_FIELD {
                    continue;
                }
                existing.insert(k, v);
            }
            existing.insert(UPDATED_AT_FIELD.to_string(), Value::from(now));
            Ok(Outcome::Updated)
        }
        None => {
            create(records, fields, now);
            Ok(Outcome::Inserted)
        }
    }
}

/// Drop every record whose `id` or `slug` equals `key`.
pub fn remove(records: &mut Vec<Record>, key: &Value) -> Outcome {
    let before = records.len();
    records.retain(|r| !matches_id_or_slug(r, key));
    match before - records.len() {
        0 => Outcome::NotFound,
        n => Outcome::Deleted(n),
    }
}
