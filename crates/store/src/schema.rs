use arrow_schema::{DataType, Field as ArrowField, Schema as ArrowSchema};
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;

/// Name of the vector column appended to every output.
pub const DEFAULT_VECTOR_COLUMN: &str = "embedding";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("input header is empty")]
    EmptyHeader,
    #[error("input header contains column '{0}' more than once")]
    DuplicateColumn(String),
    #[error("vector column '{0}' collides with an input column of the same name")]
    VectorColumnCollision(String),
    #[error("vector column name is empty")]
    EmptyVectorColumn,
    #[error("vector dimension must be greater than zero")]
    ZeroDimension,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Vector { dimension: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub kind: FieldKind,
}

/// Output layout: the input columns as text, in order, then one vector column.
///
/// Only [`Schema::derive`] builds one, so the vector column is always last and
/// unique.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    fields: Vec<Field>,
}

impl Schema {
    pub fn derive<S: AsRef<str>>(
        header: &[S],
        vector_column: &str,
        dimension: usize,
    ) -> Result<Self, SchemaError> {
        if header.is_empty() {
            return Err(SchemaError::EmptyHeader);
        }
        if vector_column.is_empty() {
            return Err(SchemaError::EmptyVectorColumn);
        }
        if dimension == 0 {
            return Err(SchemaError::ZeroDimension);
        }

        let mut seen = HashSet::with_capacity(header.len());
        let mut fields = Vec::with_capacity(header.len() + 1);
        for name in header {
            let name = name.as_ref();
            if !seen.insert(name) {
                return Err(SchemaError::DuplicateColumn(name.to_string()));
            }
            fields.push(Field {
                name: name.to_string(),
                kind: FieldKind::Text,
            });
        }
        if seen.contains(vector_column) {
            return Err(SchemaError::VectorColumnCollision(vector_column.to_string()));
        }

        fields.push(Field {
            name: vector_column.to_string(),
            kind: FieldKind::Vector { dimension },
        });
        Ok(Self { fields })
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// The input columns, i.e. everything but the vector column.
    pub fn text_fields(&self) -> &[Field] {
        &self.fields[..self.fields.len() - 1]
    }

    pub fn vector_field(&self) -> &Field {
        &self.fields[self.fields.len() - 1]
    }

    pub fn dimension(&self) -> usize {
        match self.vector_field().kind {
            FieldKind::Vector { dimension } => dimension,
            FieldKind::Text => 0,
        }
    }

    /// Arrow layout used by the vector store: `Utf8` text columns and a
    /// `FixedSizeList<Float32>` vector column.
    pub fn to_arrow(&self) -> ArrowSchema {
        let fields: Vec<ArrowField> = self
            .fields
            .iter()
            .map(|f| match f.kind {
                FieldKind::Text => ArrowField::new(&f.name, DataType::Utf8, false),
                FieldKind::Vector { dimension } => ArrowField::new(
                    &f.name,
                    DataType::FixedSizeList(
                        Arc::new(ArrowField::new("item", DataType::Float32, true)),
                        dimension as i32,
                    ),
                    false,
                ),
            })
            .collect();
        ArrowSchema::new(fields)
    }
}
