//! Helper for building selection clauses for SQLite.
//!
//! Each appended clause is wrapped in parentheses and combined with `AND`.
//! A builder holds the state of one request and is not meant to be shared
//! between threads; call [`SelectionBuilder::reset`] to recycle it.

use std::collections::HashMap;
use std::fmt;

use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, Row};

use crate::error::{AppError, Result};

use super::values::ContentValues;

/// Optional trailing clauses of a query.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryClauses<'a> {
    pub group_by: Option<&'a str>,
    pub having: Option<&'a str>,
    pub order_by: Option<&'a str>,
    pub limit: Option<&'a str>,
}

#[derive(Debug, Clone, Default)]
pub struct SelectionBuilder {
    table: Option<String>,
    projection_map: HashMap<String, String>,
    selection: String,
    selection_args: Vec<Value>,
}

impl SelectionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear all internal state so the builder can be reused.
    pub fn reset(&mut self) -> &mut Self {
        self.table = None;
        self.projection_map.clear();
        self.selection.clear();
        self.selection_args.clear();
        self
    }

    /// Append a clause and its arguments.
    ///
    /// An empty clause is skipped, unless arguments were supplied with it,
    /// which is an error.
    pub fn and_where<I, V>(&mut self, clause: &str, args: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let mut args = args.into_iter().map(Into::into).peekable();

        if clause.is_empty() {
            if args.peek().is_some() {
                return Err(AppError::InvalidArgument(
                    "Valid selection required when including arguments".to_string(),
                ));
            }
            return Ok(self);
        }

        if !self.selection.is_empty() {
            self.selection.push_str(" AND ");
        }
        self.selection.push('(');
        self.selection.push_str(clause);
        self.selection.push(')');
        self.selection_args.extend(args);

        Ok(self)
    }

    pub fn table(&mut self, table: impl Into<String>) -> &mut Self {
        self.table = Some(table.into());
        self
    }

    /// Project `column` as `table.column`.
    pub fn map_to_table(&mut self, column: &str, table: &str) -> &mut Self {
        self.projection_map
            .insert(column.to_string(), format!("{}.{}", table, column));
        self
    }

    /// Project `column` as `expression AS column`.
    pub fn map(&mut self, column: &str, expression: &str) -> &mut Self {
        self.projection_map
            .insert(column.to_string(), format!("{} AS {}", expression, column));
        self
    }

    pub fn selection(&self) -> Option<&str> {
        if self.selection.is_empty() {
            None
        } else {
            Some(&self.selection)
        }
    }

    pub fn selection_args(&self) -> &[Value] {
        &self.selection_args
    }

    /// Rewrite a projection through the registered mappings. Columns without
    /// a mapping are kept as given.
    pub fn project<S: AsRef<str>>(&self, columns: &[S]) -> Vec<String> {
        columns
            .iter()
            .map(|column| {
                let column = column.as_ref();
                self.projection_map
                    .get(column)
                    .cloned()
                    .unwrap_or_else(|| column.to_string())
            })
            .collect()
    }

    fn assert_table(&self) -> Result<&str> {
        self.table
            .as_deref()
            .ok_or_else(|| AppError::IllegalState("Table not specified".to_string()))
    }

    fn where_sql(&self) -> String {
        match self.selection() {
            Some(selection) => format!(" WHERE {}", selection),
            None => String::new(),
        }
    }

    /// Run a query with the accumulated selection as its `WHERE` clause.
    /// `None` columns selects every column.
    pub fn query<S, T, F>(
        &self,
        conn: &Connection,
        columns: Option<&[S]>,
        order_by: Option<&str>,
        map_row: F,
    ) -> Result<Vec<T>>
    where
        S: AsRef<str>,
        F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
    {
        let clauses = QueryClauses {
            order_by,
            ..Default::default()
        };
        self.query_with(conn, columns, &clauses, map_row)
    }

    pub fn query_with<S, T, F>(
        &self,
        conn: &Connection,
        columns: Option<&[S]>,
        clauses: &QueryClauses<'_>,
        map_row: F,
    ) -> Result<Vec<T>>
    where
        S: AsRef<str>,
        F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
    {
        let table = self.assert_table()?;
        let projection = match columns {
            Some(columns) if !columns.is_empty() => self.project(columns).join(", "),
            _ => "*".to_string(),
        };

        let mut sql = format!("SELECT {} FROM {}{}", projection, table, self.where_sql());
        if let Some(group_by) = clauses.group_by.filter(|s| !s.is_empty()) {
            sql.push_str(" GROUP BY ");
            sql.push_str(group_by);
        }
        if let Some(having) = clauses.having.filter(|s| !s.is_empty()) {
            sql.push_str(" HAVING ");
            sql.push_str(having);
        }
        if let Some(order_by) = clauses.order_by.filter(|s| !s.is_empty()) {
            sql.push_str(" ORDER BY ");
            sql.push_str(order_by);
        }
        if let Some(limit) = clauses.limit.filter(|s| !s.is_empty()) {
            sql.push_str(" LIMIT ");
            sql.push_str(limit);
        }

        tracing::debug!("query({}): {}", self, sql);
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(self.selection_args.iter()), map_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Run an update with the accumulated selection as its `WHERE` clause.
    pub fn update(&self, conn: &Connection, values: &ContentValues) -> Result<usize> {
        let table = self.assert_table()?;
        if values.is_empty() {
            return Err(AppError::InvalidArgument(
                "Empty values passed to update".to_string(),
            ));
        }

        let assignments = values
            .columns()
            .map(|column| format!("{} = ?", column))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!("UPDATE {} SET {}{}", table, assignments, self.where_sql());

        tracing::debug!("update({}): {}", self, sql);
        let params = values.values().chain(self.selection_args.iter());
        let changed = conn.execute(&sql, params_from_iter(params))?;
        Ok(changed)
    }

    /// Run a delete with the accumulated selection as its `WHERE` clause.
    pub fn delete(&self, conn: &Connection) -> Result<usize> {
        let table = self.assert_table()?;
        let sql = format!("DELETE FROM {}{}", table, self.where_sql());

        tracing::debug!("delete({}): {}", self, sql);
        let changed = conn.execute(&sql, params_from_iter(self.selection_args.iter()))?;
        Ok(changed)
    }
}

impl fmt::Display for SelectionBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SelectionBuilder[table={}, selection={}, selectionArgs={:?}]",
            self.table.as_deref().unwrap_or("null"),
            self.selection().unwrap_or("null"),
            self.selection_args
        )
    }
}
