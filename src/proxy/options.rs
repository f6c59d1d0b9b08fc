//! Option containers for cluster proxy operations.
//!
//! Plain structs with ordinary setters; they render to the options map the
//! router procedures take as their last argument. Unset options are simply
//! absent from the map.

use rmpv::Value;

use crate::tuple::Tuple;

pub const TIMEOUT: &str = "timeout";
pub const BUCKET_ID: &str = "bucket_id";
pub const SELECT_LIMIT: &str = "select_limit";
pub const SELECT_BATCH_SIZE: &str = "select_batch_size";
pub const SELECT_AFTER: &str = "select_after";

/// Options common to every proxy operation: request timeout and an explicit
/// routing bucket.
#[derive(Debug, Clone, Default)]
pub struct BaseOptions {
    pub timeout_ms: Option<u64>,
    pub bucket_id: Option<u64>,
}

impl BaseOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    pub fn with_bucket_id(mut self, bucket_id: u64) -> Self {
        self.bucket_id = Some(bucket_id);
        self
    }

    fn push_entries(&self, entries: &mut Vec<(Value, Value)>) {
        if let Some(timeout_ms) = self.timeout_ms {
            entries.push((Value::from(TIMEOUT), Value::from(timeout_ms)));
        }
        if let Some(bucket_id) = self.bucket_id {
            entries.push((Value::from(BUCKET_ID), Value::from(bucket_id)));
        }
    }

    pub fn to_wire(&self) -> Value {
        let mut entries = Vec::new();
        self.push_entries(&mut entries);
        Value::Map(entries)
    }
}

pub type InsertOptions = BaseOptions;
pub type ReplaceOptions = BaseOptions;
pub type DeleteOptions = BaseOptions;
pub type UpdateOptions = BaseOptions;
pub type UpsertOptions = BaseOptions;
pub type TruncateOptions = BaseOptions;

/// Options for select: the base set plus result limiting, batching and a
/// pagination cursor (the last tuple of the previous page).
#[derive(Debug, Clone, Default)]
pub struct SelectOptions {
    pub base: BaseOptions,
    pub limit: Option<u64>,
    pub batch_size: Option<u64>,
    pub after: Option<Tuple>,
}

impl SelectOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.base.timeout_ms = Some(timeout_ms);
        self
    }

    pub fn with_bucket_id(mut self, bucket_id: u64) -> Self {
        self.base.bucket_id = Some(bucket_id);
        self
    }

    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_batch_size(mut self, batch_size: u64) -> Self {
        self.batch_size = Some(batch_size);
        self
    }

    pub fn with_after(mut self, after: Tuple) -> Self {
        self.after = Some(after);
        self
    }

    pub fn to_wire(&self) -> Value {
        let mut entries = Vec::new();
        self.base.push_entries(&mut entries);
        if let Some(limit) = self.limit {
            entries.push((Value::from(SELECT_LIMIT), Value::from(limit)));
        }
        if let Some(batch_size) = self.batch_size {
            entries.push((Value::from(SELECT_BATCH_SIZE), Value::from(batch_size)));
        }
        if let Some(after) = &self.after {
            entries.push((Value::from(SELECT_AFTER), after.to_wire()));
        }
        Value::Map(entries)
    }
}
