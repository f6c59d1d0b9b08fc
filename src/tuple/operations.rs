//! Update-operation DSL for update and upsert requests.
//!
//! A [`TupleUpdateOperations`] set accumulates declarative field mutations
//! and keeps a parallel proxy-lowered list in lockstep: index locators are
//! rewritten from the driver's 0-based indexes to the 1-based positions the
//! router procedures expect. Each field may be mutated at most once per set;
//! callers must pre-aggregate multiple deltas into one operation.

use rmpv::Value;

use crate::error::{ClientError, ClientResult};
use crate::metadata::SpaceMetadata;
use crate::tuple::{Field, Tuple};

/// Locator of the field an operation targets: by 0-based index or by name,
/// mutually exclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldLocator {
    Index(usize),
    Name(String),
}

impl std::fmt::Display for FieldLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldLocator::Index(index) => write!(f, "{}", index),
            FieldLocator::Name(name) => write!(f, "{}", name),
        }
    }
}

impl From<usize> for FieldLocator {
    fn from(index: usize) -> Self {
        FieldLocator::Index(index)
    }
}

// Bare integer literals land here under default numeric fallback.
impl From<i32> for FieldLocator {
    fn from(index: i32) -> Self {
        FieldLocator::Index(index as usize)
    }
}

impl From<&str> for FieldLocator {
    fn from(name: &str) -> Self {
        FieldLocator::Name(name.to_string())
    }
}

impl From<String> for FieldLocator {
    fn from(name: String) -> Self {
        FieldLocator::Name(name)
    }
}

/// The mutation applied to the located field.
#[derive(Debug, Clone, PartialEq)]
pub enum OperationKind {
    Add(Value),
    Subtract(Value),
    BitwiseAnd(u64),
    BitwiseOr(u64),
    BitwiseXor(u64),
    Splice {
        position: usize,
        offset: usize,
        replacement: String,
    },
    Insert(Value),
    Delete(usize),
    Set(Value),
}

impl OperationKind {
    /// The single-character operator the wire format uses for this mutation.
    pub fn wire_operator(&self) -> &'static str {
        match self {
            OperationKind::Add(_) => "+",
            OperationKind::Subtract(_) => "-",
            OperationKind::BitwiseAnd(_) => "&",
            OperationKind::BitwiseOr(_) => "|",
            OperationKind::BitwiseXor(_) => "^",
            OperationKind::Splice { .. } => ":",
            OperationKind::Insert(_) => "!",
            OperationKind::Delete(_) => "#",
            OperationKind::Set(_) => "=",
        }
    }
}

/// One declarative field mutation. Immutable after construction.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateOperation {
    field: FieldLocator,
    kind: OperationKind,
}

impl UpdateOperation {
    pub fn new(field: impl Into<FieldLocator>, kind: OperationKind) -> Self {
        Self {
            field: field.into(),
            kind,
        }
    }

    pub fn field(&self) -> &FieldLocator {
        &self.field
    }

    pub fn kind(&self) -> &OperationKind {
        &self.kind
    }

    /// The proxy form: index locators move from 0-based to 1-based; name
    /// locators are kept and resolved later against space metadata.
    fn to_proxy(&self) -> UpdateOperation {
        let field = match &self.field {
            FieldLocator::Index(index) => FieldLocator::Index(index + 1),
            FieldLocator::Name(name) => FieldLocator::Name(name.clone()),
        };
        UpdateOperation {
            field,
            kind: self.kind.clone(),
        }
    }

    /// Encode as the wire triple/quintuple `[operator, field, args...]`.
    pub fn to_wire(&self) -> Value {
        let field = match &self.field {
            FieldLocator::Index(index) => Value::from(*index as u64),
            FieldLocator::Name(name) => Value::from(name.as_str()),
        };
        let operator = Value::from(self.kind.wire_operator());

        let items = match &self.kind {
            OperationKind::Add(value)
            | OperationKind::Subtract(value)
            | OperationKind::Insert(value)
            | OperationKind::Set(value) => vec![operator, field, value.clone()],
            OperationKind::BitwiseAnd(mask)
            | OperationKind::BitwiseOr(mask)
            | OperationKind::BitwiseXor(mask) => vec![operator, field, Value::from(*mask)],
            OperationKind::Delete(count) => vec![operator, field, Value::from(*count as u64)],
            OperationKind::Splice {
                position,
                offset,
                replacement,
            } => vec![
                operator,
                field,
                Value::from(*position as u64),
                Value::from(*offset as u64),
                Value::from(replacement.as_str()),
            ],
        };
        Value::Array(items)
    }
}

/// An ordered, deduplicated set of update operations plus its proxy-lowered
/// form. Built by the seed constructors and the fluent `and_*` methods;
/// read-only once handed to the dispatcher.
#[derive(Debug, Clone, Default)]
pub struct TupleUpdateOperations {
    operations: Vec<UpdateOperation>,
    proxy_operations: Vec<UpdateOperation>,
}

impl TupleUpdateOperations {
    fn seeded(operation: UpdateOperation) -> Self {
        let mut set = Self::default();
        set.push(operation);
        set
    }

    fn push(&mut self, operation: UpdateOperation) {
        self.proxy_operations.push(operation.to_proxy());
        self.operations.push(operation);
    }

    /// Append an operation, rejecting a second mutation of the same field.
    pub fn add_operation(mut self, operation: UpdateOperation) -> ClientResult<Self> {
        if self
            .operations
            .iter()
            .any(|existing| existing.field() == operation.field())
        {
            return Err(ClientError::DuplicateFieldMutation(
                operation.field().to_string(),
            ));
        }

        self.push(operation);
        Ok(self)
    }

    /// One Set operation per field of the tuple, in position order.
    pub fn from_tuple(tuple: &Tuple) -> ClientResult<Self> {
        if tuple.is_empty() {
            return Err(ClientError::EmptyTupleOperation);
        }

        let mut set = Self::default();
        for (index, field) in tuple.fields().iter().enumerate() {
            set.push(UpdateOperation::new(
                index,
                OperationKind::Set(field.as_value()),
            ));
        }
        Ok(set)
    }

    /// Adds the given value to the field value.
    pub fn add(field: impl Into<FieldLocator>, value: impl Into<Value>) -> Self {
        Self::seeded(UpdateOperation::new(field, OperationKind::Add(value.into())))
    }

    pub fn and_add(self, field: impl Into<FieldLocator>, value: impl Into<Value>) -> ClientResult<Self> {
        self.add_operation(UpdateOperation::new(field, OperationKind::Add(value.into())))
    }

    /// Subtracts the given value from the field value.
    pub fn subtract(field: impl Into<FieldLocator>, value: impl Into<Value>) -> Self {
        Self::seeded(UpdateOperation::new(
            field,
            OperationKind::Subtract(value.into()),
        ))
    }

    pub fn and_subtract(
        self,
        field: impl Into<FieldLocator>,
        value: impl Into<Value>,
    ) -> ClientResult<Self> {
        self.add_operation(UpdateOperation::new(
            field,
            OperationKind::Subtract(value.into()),
        ))
    }

    pub fn bitwise_and(field: impl Into<FieldLocator>, mask: u64) -> Self {
        Self::seeded(UpdateOperation::new(field, OperationKind::BitwiseAnd(mask)))
    }

    pub fn and_bitwise_and(self, field: impl Into<FieldLocator>, mask: u64) -> ClientResult<Self> {
        self.add_operation(UpdateOperation::new(field, OperationKind::BitwiseAnd(mask)))
    }

    pub fn bitwise_or(field: impl Into<FieldLocator>, mask: u64) -> Self {
        Self::seeded(UpdateOperation::new(field, OperationKind::BitwiseOr(mask)))
    }

    pub fn and_bitwise_or(self, field: impl Into<FieldLocator>, mask: u64) -> ClientResult<Self> {
        self.add_operation(UpdateOperation::new(field, OperationKind::BitwiseOr(mask)))
    }

    pub fn bitwise_xor(field: impl Into<FieldLocator>, mask: u64) -> Self {
        Self::seeded(UpdateOperation::new(field, OperationKind::BitwiseXor(mask)))
    }

    pub fn and_bitwise_xor(self, field: impl Into<FieldLocator>, mask: u64) -> ClientResult<Self> {
        self.add_operation(UpdateOperation::new(field, OperationKind::BitwiseXor(mask)))
    }

    /// Replace a substring of the field value.
    pub fn splice(
        field: impl Into<FieldLocator>,
        position: usize,
        offset: usize,
        replacement: impl Into<String>,
    ) -> Self {
        Self::seeded(UpdateOperation::new(
            field,
            OperationKind::Splice {
                position,
                offset,
                replacement: replacement.into(),
            },
        ))
    }

    pub fn and_splice(
        self,
        field: impl Into<FieldLocator>,
        position: usize,
        offset: usize,
        replacement: impl Into<String>,
    ) -> ClientResult<Self> {
        self.add_operation(UpdateOperation::new(
            field,
            OperationKind::Splice {
                position,
                offset,
                replacement: replacement.into(),
            },
        ))
    }

    /// Insert a new field value after the located field.
    pub fn insert(field: impl Into<FieldLocator>, value: impl Into<Value>) -> Self {
        Self::seeded(UpdateOperation::new(
            field,
            OperationKind::Insert(value.into()),
        ))
    }

    pub fn and_insert(
        self,
        field: impl Into<FieldLocator>,
        value: impl Into<Value>,
    ) -> ClientResult<Self> {
        self.add_operation(UpdateOperation::new(
            field,
            OperationKind::Insert(value.into()),
        ))
    }

    /// Remove `count` fields starting at the located field.
    pub fn delete(field: impl Into<FieldLocator>, count: usize) -> Self {
        Self::seeded(UpdateOperation::new(field, OperationKind::Delete(count)))
    }

    pub fn and_delete(self, field: impl Into<FieldLocator>, count: usize) -> ClientResult<Self> {
        self.add_operation(UpdateOperation::new(field, OperationKind::Delete(count)))
    }

    /// Set the field value.
    pub fn set(field: impl Into<FieldLocator>, value: impl Into<Value>) -> Self {
        Self::seeded(UpdateOperation::new(field, OperationKind::Set(value.into())))
    }

    pub fn and_set(self, field: impl Into<FieldLocator>, value: impl Into<Value>) -> ClientResult<Self> {
        self.add_operation(UpdateOperation::new(field, OperationKind::Set(value.into())))
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// The operations as authored: 0-based indexes, name locators intact.
    pub fn as_list(&self) -> &[UpdateOperation] {
        &self.operations
    }

    /// The proxy-lowered operations: indexes 1-based, name locators intact.
    /// Kept in lockstep with [`as_list`](Self::as_list) at add time.
    pub fn as_proxy_list(&self) -> &[UpdateOperation] {
        &self.proxy_operations
    }

    /// The proxy-lowered operations with every name locator resolved to its
    /// 1-based position through the space metadata. A name the format does
    /// not declare fails with [`ClientError::FieldNotFound`] here, at
    /// lowering time, never at add time.
    pub fn resolve_proxy_list(
        &self,
        metadata: &SpaceMetadata,
    ) -> ClientResult<Vec<UpdateOperation>> {
        self.proxy_operations
            .iter()
            .map(|operation| match operation.field() {
                FieldLocator::Index(_) => Ok(operation.clone()),
                FieldLocator::Name(name) => {
                    let position = metadata
                        .field_position_by_name(name)
                        .ok_or_else(|| ClientError::FieldNotFound(name.clone()))?;
                    Ok(UpdateOperation {
                        field: FieldLocator::Index(position + 1),
                        kind: operation.kind().clone(),
                    })
                }
            })
            .collect()
    }
}

impl From<&Field> for Value {
    fn from(field: &Field) -> Value {
        field.as_value()
    }
}
