use std::collections::HashMap;

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, Value, ValueRef};
use rusqlite::ToSql;

use crate::model::{BuildState, PublishState};

use super::error::StorageError;

/// One materialized result row, keyed by column name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row(HashMap<String, Value>);

impl Row {
    pub fn insert(&mut self, column: impl Into<String>, value: Value) {
        self.0.insert(column.into(), value);
    }

    pub fn value(&self, column: &str) -> Option<&Value> {
        self.0.get(column)
    }

    pub fn get<T: FromSql>(&self, column: &str) -> Result<T, StorageError> {
        let value = self.0.get(column).ok_or_else(|| StorageError::Row {
            action: format!("read column {column}"),
            error: "no such column".into(),
        })?;

        T::column_result(ValueRef::from(value)).map_err(|e| StorageError::Row {
            action: format!("read column {column}"),
            error: e.to_string(),
        })
    }

    /// Like [`Row::get`], but a NULL column yields `T::default()`.
    pub fn get_or_default<T: FromSql + Default>(&self, column: &str) -> Result<T, StorageError> {
        match self.0.get(column) {
            Some(Value::Null) => Ok(T::default()),
            _ => self.get(column),
        }
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, Value)> for Row {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Row(iter.into_iter().collect())
    }
}

macro_rules! text_column {
    ($($ty:ty),*) => {$(
        impl ToSql for $ty {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.as_str()))
            }
        }

        impl FromSql for $ty {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                value
                    .as_str()?
                    .parse()
                    .map_err(|e| FromSqlError::Other(Box::new(e)))
            }
        }
    )*};
}

text_column!(PublishState, BuildState);

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> Row {
        [
            ("id".to_string(), Value::Integer(7)),
            ("name".to_string(), Value::Text("enigma".into())),
            ("icon".to_string(), Value::Null),
            ("publishstate".to_string(), Value::Text("BETA".into())),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn typed_access() {
        let row = row();
        assert_eq!(row.get::<i32>("id").unwrap(), 7);
        assert_eq!(row.get::<String>("name").unwrap(), "enigma");
        assert_eq!(row.get::<PublishState>("publishstate").unwrap(), PublishState::Beta);
        assert_eq!(row.len(), 4);
    }

    #[test]
    fn null_as_default() {
        let row = row();
        assert_eq!(row.get_or_default::<Vec<u8>>("icon").unwrap(), Vec::<u8>::new());
        assert!(row.get::<Vec<u8>>("icon").is_err());
    }

    #[test]
    fn missing_or_mistyped_column() {
        let row = row();
        assert!(matches!(row.get::<i32>("nope"), Err(StorageError::Row { .. })));
        assert!(matches!(row.get::<i32>("name"), Err(StorageError::Row { .. })));
        assert!(row.get::<BuildState>("publishstate").is_err());
    }
}
