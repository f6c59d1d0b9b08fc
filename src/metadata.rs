//! Space format metadata consumed by the tuple model and the proxy layer.
//!
//! Discovery and caching of space formats happen outside this crate; the
//! driver only consumes the name -> position mapping.

use std::collections::HashMap;

/// Format of one space: ordered field names and the declared format length.
#[derive(Debug, Clone)]
pub struct SpaceMetadata {
    name: String,
    field_positions: HashMap<String, usize>,
    format_length: usize,
}

impl SpaceMetadata {
    /// Build metadata from the ordered field names of a space format.
    pub fn new<I, S>(name: impl Into<String>, field_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let field_positions: HashMap<String, usize> = field_names
            .into_iter()
            .enumerate()
            .map(|(position, field)| (field.into(), position))
            .collect();
        let format_length = field_positions.len();

        Self {
            name: name.into(),
            field_positions,
            format_length,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// 0-based position of a named field, if the format declares it.
    pub fn field_position_by_name(&self, field_name: &str) -> Option<usize> {
        self.field_positions.get(field_name).copied()
    }

    /// Number of fields declared by the space format.
    pub fn format_length(&self) -> usize {
        self.format_length
    }
}
