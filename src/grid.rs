//! Editable-grid state machine.
//!
//! At most one cell across a grid may be in edit at a time, identified by
//! (row index, field). Starting an edit on another cell abandons the previous
//! buffer without confirmation. Commit parses the buffer according to the
//! field kind and writes exactly the targeted cell; cancel discards the buffer
//! and leaves the rows untouched.

use std::fmt;

use thiserror::Error;

use crate::errors::ServiceError;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GridError {
    #[error("row index {0} is out of bounds")]
    RowOutOfBounds(usize),
    #[error("no edit in progress")]
    NoEditInProgress,
    #[error("'{value}' is not a valid choice for this column")]
    InvalidChoice { value: String },
}

impl From<GridError> for ServiceError {
    fn from(err: GridError) -> Self {
        match err {
            GridError::RowOutOfBounds(_) | GridError::NoEditInProgress => {
                ServiceError::InvalidOperation(err.to_string())
            }
            GridError::InvalidChoice { .. } => ServiceError::ValidationError(err.to_string()),
        }
    }
}

/// How a column's edit buffer is interpreted on commit.
#[derive(Debug, Clone, Copy)]
pub enum FieldKind {
    /// Stored as raw text.
    Text,
    /// Parsed as an integer; unparsable input falls back to the default.
    Integer { default: i64 },
    /// Must be one of the allowed canonical strings, or empty to clear.
    Choice(&'static [&'static str]),
}

/// Parsed buffer value handed to [`GridRecord::apply`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    Integer(i64),
}

/// A record whose cells can be edited through a [`GridSession`].
pub trait GridRecord {
    type Field: Copy + Eq + fmt::Debug;

    fn field_kind(field: Self::Field) -> FieldKind;

    /// String form of the cell, used to seed the edit buffer.
    fn cell(&self, field: Self::Field) -> String;

    /// Write a committed value into the cell.
    fn apply(&mut self, field: Self::Field, value: FieldValue) -> Result<(), GridError>;
}

/// Edit state as an explicit sum type: illegal states (a buffer without a
/// target cell, two cells in edit) are unrepresentable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditState<F> {
    NotEditing,
    Editing {
        row: usize,
        field: F,
        buffer: String,
    },
}

/// An editing session over a working copy of grid rows.
#[derive(Debug)]
pub struct GridSession<R: GridRecord> {
    rows: Vec<R>,
    edit: EditState<R::Field>,
}

impl<R: GridRecord> GridSession<R> {
    pub fn new(rows: Vec<R>) -> Self {
        Self {
            rows,
            edit: EditState::NotEditing,
        }
    }

    pub fn rows(&self) -> &[R] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<R> {
        self.rows
    }

    /// The cell currently in edit, if any.
    pub fn editing(&self) -> Option<(usize, R::Field)> {
        match &self.edit {
            EditState::NotEditing => None,
            EditState::Editing { row, field, .. } => Some((*row, *field)),
        }
    }

    /// Enters edit mode on (row, field), seeding the buffer with the string
    /// form of the current value. Any unsaved edit on another cell is
    /// abandoned without confirmation.
    pub fn start_edit(&mut self, row: usize, field: R::Field) -> Result<(), GridError> {
        let record = self.rows.get(row).ok_or(GridError::RowOutOfBounds(row))?;
        self.edit = EditState::Editing {
            row,
            field,
            buffer: record.cell(field),
        };
        Ok(())
    }

    /// Replaces the edit buffer. No-op when not editing.
    pub fn set_buffer(&mut self, value: impl Into<String>) {
        if let EditState::Editing { buffer, .. } = &mut self.edit {
            *buffer = value.into();
        }
    }

    /// Parses the buffer per the field kind, writes it into the row, and
    /// clears the edit state. Exactly the targeted cell changes.
    pub fn commit_edit(&mut self) -> Result<(), GridError> {
        let (row, field, buffer) =
            match std::mem::replace(&mut self.edit, EditState::NotEditing) {
                EditState::NotEditing => return Err(GridError::NoEditInProgress),
                EditState::Editing { row, field, buffer } => (row, field, buffer),
            };

        let value = match parse_buffer(R::field_kind(field), &buffer) {
            Ok(value) => value,
            Err(err) => {
                // Failed commits keep the buffer so the input is not cleared.
                self.edit = EditState::Editing { row, field, buffer };
                return Err(err);
            }
        };

        let record = self.rows.get_mut(row).ok_or(GridError::RowOutOfBounds(row))?;
        record.apply(field, value)
    }

    /// Discards the buffer and clears the edit state without mutating rows.
    pub fn cancel_edit(&mut self) {
        self.edit = EditState::NotEditing;
    }
}

/// Buffer parsing per field kind.
pub fn parse_buffer(kind: FieldKind, buffer: &str) -> Result<FieldValue, GridError> {
    match kind {
        FieldKind::Text => Ok(FieldValue::Text(buffer.to_string())),
        FieldKind::Integer { default } => {
            let parsed = buffer.trim().parse::<i64>().unwrap_or(default);
            Ok(FieldValue::Integer(parsed))
        }
        FieldKind::Choice(allowed) => {
            let trimmed = buffer.trim();
            if trimmed.is_empty() || allowed.contains(&trimmed) {
                Ok(FieldValue::Text(trimmed.to_string()))
            } else {
                Err(GridError::InvalidChoice {
                    value: trimmed.to_string(),
                })
            }
        }
    }
}
