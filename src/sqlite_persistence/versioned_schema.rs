//! Declarative, versioned SQLite schema definitions.
//!
//! Tables are declared as consts and created/validated against a live
//! connection. Validation catches databases whose on-disk shape drifted from
//! the declared schema (missing index, dropped CHECK, wrong column type)
//! before the pipeline writes anything.

use anyhow::{bail, Result};
use rusqlite::{params, types::Type, Connection};

pub const DEFAULT_TIMESTAMP: &str = "(cast(strftime('%s','now') as int))";

#[macro_export]
macro_rules! sqlite_column {
    ($name:expr, $sql_type:expr $(, $field:ident = $value:expr)*) => {
        {
            // unused_mut: only mutated when optional field assignments are
            // passed (e.g. `non_null = true`)
            #[allow(unused_mut)]
            let mut column = $crate::sqlite_persistence::Column {
                name: $name,
                sql_type: $sql_type,
                is_primary_key: false,
                non_null: false,
                is_unique: false,
                default_value: None,
                foreign_key: None,
            };
            $(
                column.$field = $value;
            )*
            column
        }
    };
}

#[derive(Debug, PartialEq, Eq)]
pub enum SqlType {
    Text,
    Integer,
    Real,
    Blob,
}

impl SqlType {
    fn as_sql(&self) -> &'static str {
        match self {
            SqlType::Text => "TEXT",
            SqlType::Integer => "INTEGER",
            SqlType::Real => "REAL",
            SqlType::Blob => "BLOB",
        }
    }
}

#[allow(unused)]
pub enum ForeignKeyOnChange {
    NoAction,
    Restrict,
    SetNull,
    SetDefault,
    Cascade,
}

impl ForeignKeyOnChange {
    fn as_sql(&self) -> &'static str {
        match self {
            ForeignKeyOnChange::NoAction => "NO ACTION",
            ForeignKeyOnChange::Restrict => "RESTRICT",
            ForeignKeyOnChange::SetNull => "SET NULL",
            ForeignKeyOnChange::SetDefault => "SET DEFAULT",
            ForeignKeyOnChange::Cascade => "CASCADE",
        }
    }
}

pub struct ForeignKey {
    pub foreign_table: &'static str,
    pub foreign_column: &'static str,
    pub on_delete: ForeignKeyOnChange,
}

pub struct Column<'a, S: AsRef<str>> {
    pub name: S,
    pub sql_type: &'a SqlType,
    pub is_primary_key: bool,
    pub non_null: bool,
    pub is_unique: bool,
    pub default_value: Option<S>,
    pub foreign_key: Option<&'a ForeignKey>,
}

pub struct Table {
    pub name: &'static str,
    pub columns: &'static [Column<'static, &'static str>],
    pub indices: &'static [(&'static str, &'static str)],
    pub unique_constraints: &'static [&'static [&'static str]],
    /// Table-level CHECK expressions, stored verbatim in the CREATE statement.
    pub checks: &'static [&'static str],
}

impl Table {
    pub fn create(&self, conn: &Connection) -> Result<()> {
        let mut create_sql = format!("CREATE TABLE {} (", self.name);
        for (column_index, column) in self.columns.iter().enumerate() {
            if column_index > 0 {
                create_sql.push_str(", ");
            }
            create_sql.push_str(&format!("{} {}", column.name, column.sql_type.as_sql()));
            if column.is_primary_key {
                create_sql.push_str(" PRIMARY KEY");
            }
            if column.non_null {
                create_sql.push_str(" NOT NULL");
            }
            if column.is_unique {
                create_sql.push_str(" UNIQUE");
            }
            if let Some(default_value) = column.default_value {
                create_sql.push_str(&format!(" DEFAULT {}", default_value));
            }
            if let Some(foreign_key) = column.foreign_key {
                create_sql.push_str(&format!(
                    " REFERENCES {}({}) ON DELETE {}",
                    foreign_key.foreign_table,
                    foreign_key.foreign_column,
                    foreign_key.on_delete.as_sql(),
                ));
            }
        }
        for unique_constraint in self.unique_constraints {
            create_sql.push_str(&format!(", UNIQUE ({})", unique_constraint.join(", ")));
        }
        for check in self.checks {
            create_sql.push_str(&format!(", CHECK ({})", check));
        }
        create_sql.push_str(");");
        conn.execute(&create_sql, params![])?;

        for (index_name, column_name) in self.indices {
            conn.execute(
                &format!(
                    "CREATE INDEX {} ON {}({});",
                    index_name, self.name, column_name
                ),
                params![],
            )?;
        }
        Ok(())
    }

    fn validate_columns(&self, conn: &Connection) -> Result<()> {
        let mut stmt = conn.prepare(&format!("PRAGMA table_info({});", self.name))?;
        let actual_columns: Vec<Column<'_, String>> = stmt
            .query_map(params![], |row| {
                let sql_type = match row.get::<_, String>(2)?.as_str() {
                    "TEXT" => &SqlType::Text,
                    "INTEGER" => &SqlType::Integer,
                    "REAL" => &SqlType::Real,
                    "BLOB" => &SqlType::Blob,
                    _ => {
                        return Err(rusqlite::Error::InvalidColumnType(
                            2,
                            "".to_string(),
                            Type::Text,
                        ))
                    }
                };
                Ok(Column {
                    name: row.get::<_, String>(1)?,
                    sql_type,
                    non_null: row.get::<_, i32>(3)? == 1,
                    default_value: row.get::<_, Option<String>>(4)?,
                    is_primary_key: row.get::<_, i32>(5)? == 1,
                    is_unique: false,
                    foreign_key: None,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        if actual_columns.len() != self.columns.len() {
            bail!(
                "Table {} has {} columns, expected {} ({})",
                self.name,
                actual_columns.len(),
                self.columns.len(),
                self.columns
                    .iter()
                    .map(|c| c.name)
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }

        for (actual, expected) in actual_columns.iter().zip(self.columns.iter()) {
            if actual.name != expected.name {
                bail!(
                    "Table {} column name mismatch: expected {}, got {}",
                    self.name,
                    expected.name,
                    actual.name
                );
            }
            if actual.sql_type != expected.sql_type {
                bail!(
                    "Table {} column {} type mismatch: expected {:?}, got {:?}",
                    self.name,
                    expected.name,
                    expected.sql_type,
                    actual.sql_type
                );
            }
            if actual.non_null != expected.non_null {
                bail!(
                    "Table {} column {} non-null mismatch",
                    self.name,
                    expected.name
                );
            }
            if actual.is_primary_key != expected.is_primary_key {
                bail!(
                    "Table {} column {} primary key mismatch",
                    self.name,
                    expected.name
                );
            }
            // Default values may come back wrapped in parentheses
            let strip = |s: &str| s.trim_matches(|c| c == '(' || c == ')').to_string();
            if actual.default_value.as_deref().map(strip) != expected.default_value.map(strip) {
                bail!(
                    "Table {} column {} default value mismatch: expected {:?}, got {:?}",
                    self.name,
                    expected.name,
                    expected.default_value,
                    actual.default_value
                );
            }
        }
        Ok(())
    }

    fn validate_indices(&self, conn: &Connection) -> Result<()> {
        for (index_name, _columns) in self.indices {
            let index_exists: bool = conn
                .query_row(
                    "SELECT 1 FROM sqlite_master WHERE type='index' AND name=?1 AND tbl_name=?2",
                    params![index_name, self.name],
                    |_| Ok(true),
                )
                .unwrap_or(false);
            if !index_exists {
                bail!("Table {} is missing index '{}'", self.name, index_name);
            }
        }
        Ok(())
    }

    fn validate_unique_constraints(&self, conn: &Connection) -> Result<()> {
        if self.unique_constraints.is_empty() {
            return Ok(());
        }
        // SQLite surfaces table-level UNIQUE constraints as unique indices.
        let mut stmt = conn.prepare(&format!("PRAGMA index_list({})", self.name))?;
        let unique_indices: Vec<String> = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(1)?, row.get::<_, i32>(2)?))
            })?
            .filter_map(|r| r.ok())
            .filter(|(_, is_unique)| *is_unique == 1)
            .map(|(name, _)| name)
            .collect();

        let mut unique_index_columns: Vec<Vec<String>> = Vec::new();
        for index_name in &unique_indices {
            let mut idx_stmt = conn.prepare(&format!("PRAGMA index_info({})", index_name))?;
            let mut cols: Vec<String> = idx_stmt
                .query_map([], |row| row.get::<_, String>(2))?
                .filter_map(|r| r.ok())
                .collect();
            cols.sort();
            unique_index_columns.push(cols);
        }

        for expected_columns in self.unique_constraints {
            let mut expected: Vec<&str> = expected_columns.to_vec();
            expected.sort_unstable();
            let found = unique_index_columns
                .iter()
                .any(|actual| actual.iter().map(String::as_str).collect::<Vec<_>>() == expected);
            if !found {
                bail!(
                    "Table {} is missing unique constraint on columns ({})",
                    self.name,
                    expected_columns.join(", ")
                );
            }
        }
        Ok(())
    }

    fn validate_foreign_keys(&self, conn: &Connection) -> Result<()> {
        // PRAGMA foreign_key_list: id, seq, table, from, to, on_update, on_delete, match
        let mut stmt = conn.prepare(&format!("PRAGMA foreign_key_list({})", self.name))?;
        let actual_fks: Vec<(String, String, String, String)> = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(3)?, // from column
                    row.get::<_, String>(2)?, // to table
                    row.get::<_, String>(4)?, // to column
                    row.get::<_, String>(6)?, // on delete
                ))
            })?
            .filter_map(|r| r.ok())
            .collect();

        for column in self.columns {
            if let Some(expected) = column.foreign_key {
                let found = actual_fks.iter().any(|(from, to_table, to_col, on_del)| {
                    from == column.name
                        && to_table == expected.foreign_table
                        && to_col == expected.foreign_column
                        && on_del == expected.on_delete.as_sql()
                });
                if !found {
                    bail!(
                        "Table {} column {} is missing foreign key REFERENCES {}({}) ON DELETE {}",
                        self.name,
                        column.name,
                        expected.foreign_table,
                        expected.foreign_column,
                        expected.on_delete.as_sql(),
                    );
                }
            }
        }
        Ok(())
    }

    fn validate_checks(&self, conn: &Connection) -> Result<()> {
        if self.checks.is_empty() {
            return Ok(());
        }
        // CHECK constraints have no introspection pragma; compare against the
        // stored CREATE statement text.
        let create_sql: String = conn.query_row(
            "SELECT sql FROM sqlite_master WHERE type='table' AND name=?1",
            params![self.name],
            |r| r.get(0),
        )?;
        for check in self.checks {
            if !create_sql.contains(check) {
                bail!(
                    "Table {} is missing CHECK constraint ({})",
                    self.name,
                    check
                );
            }
        }
        Ok(())
    }
}

pub struct VersionedSchema {
    pub version: usize,
    pub tables: &'static [Table],
    pub migration: Option<fn(&Connection) -> Result<()>>,
}

impl VersionedSchema {
    pub fn create(&self, conn: &Connection) -> Result<()> {
        conn.execute("PRAGMA foreign_keys = ON;", params![])?;
        for table in self.tables {
            table.create(conn)?;
        }
        conn.execute(
            &format!("PRAGMA user_version = {}", BASE_DB_VERSION + self.version),
            [],
        )?;
        Ok(())
    }

    pub fn validate(&self, conn: &Connection) -> Result<()> {
        for table in self.tables {
            table.validate_columns(conn)?;
            table.validate_indices(conn)?;
            table.validate_unique_constraints(conn)?;
            table.validate_foreign_keys(conn)?;
            table.validate_checks(conn)?;
        }
        Ok(())
    }
}

/// Offset for PRAGMA user_version so that a plain pre-versioning database
/// (user_version 0) is distinguishable from schema version 0.
pub const BASE_DB_VERSION: usize = 99999;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite_column;

    const TEST_TABLE: Table = Table {
        name: "test_table",
        columns: &[
            sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
            sqlite_column!("name", &SqlType::Text, non_null = true),
            sqlite_column!("count", &SqlType::Integer, non_null = true),
        ],
        indices: &[("idx_test_name", "name")],
        unique_constraints: &[&["name", "count"]],
        checks: &["count >= 0"],
    };

    const SCHEMA: VersionedSchema = VersionedSchema {
        version: 0,
        tables: &[TEST_TABLE],
        migration: None,
    };

    #[test]
    fn test_create_then_validate_roundtrip() {
        let conn = Connection::open_in_memory().unwrap();
        SCHEMA.create(&conn).unwrap();
        SCHEMA.validate(&conn).unwrap();

        let version: i64 = conn
            .query_row("PRAGMA user_version", [], |r| r.get(0))
            .unwrap();
        assert_eq!(version, BASE_DB_VERSION as i64);
    }

    #[test]
    fn test_check_constraint_enforced() {
        let conn = Connection::open_in_memory().unwrap();
        SCHEMA.create(&conn).unwrap();

        conn.execute("INSERT INTO test_table (name, count) VALUES ('ok', 1)", [])
            .unwrap();
        let err = conn
            .execute(
                "INSERT INTO test_table (name, count) VALUES ('bad', -1)",
                [],
            )
            .unwrap_err();
        assert!(err.to_string().contains("CHECK"));
    }

    #[test]
    fn test_validate_detects_missing_index() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute(
            "CREATE TABLE test_table (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                count INTEGER NOT NULL,
                UNIQUE (name, count),
                CHECK (count >= 0)
            )",
            [],
        )
        .unwrap();

        let err_msg = SCHEMA.validate(&conn).unwrap_err().to_string();
        assert!(err_msg.contains("missing index"));
        assert!(err_msg.contains("idx_test_name"));
    }

    #[test]
    fn test_validate_detects_missing_unique_constraint() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute(
            "CREATE TABLE test_table (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                count INTEGER NOT NULL,
                CHECK (count >= 0)
            )",
            [],
        )
        .unwrap();
        conn.execute("CREATE INDEX idx_test_name ON test_table(name)", [])
            .unwrap();

        let err_msg = SCHEMA.validate(&conn).unwrap_err().to_string();
        assert!(err_msg.contains("missing unique constraint"));
    }

    #[test]
    fn test_validate_detects_missing_check() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute(
            "CREATE TABLE test_table (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                count INTEGER NOT NULL,
                UNIQUE (name, count)
            )",
            [],
        )
        .unwrap();
        conn.execute("CREATE INDEX idx_test_name ON test_table(name)", [])
            .unwrap();

        let err_msg = SCHEMA.validate(&conn).unwrap_err().to_string();
        assert!(err_msg.contains("missing CHECK"));
    }

    #[test]
    fn test_validate_detects_column_type_mismatch() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute(
            "CREATE TABLE test_table (
                id INTEGER PRIMARY KEY,
                name INTEGER NOT NULL,
                count INTEGER NOT NULL,
                UNIQUE (name, count),
                CHECK (count >= 0)
            )",
            [],
        )
        .unwrap();
        conn.execute("CREATE INDEX idx_test_name ON test_table(name)", [])
            .unwrap();

        let err_msg = SCHEMA.validate(&conn).unwrap_err().to_string();
        assert!(err_msg.contains("type mismatch"));
    }

    const PARENT_FK: ForeignKey = ForeignKey {
        foreign_table: "parent",
        foreign_column: "id",
        on_delete: ForeignKeyOnChange::Cascade,
    };

    const CHILD_TABLE: Table = Table {
        name: "child",
        columns: &[
            sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
            sqlite_column!(
                "parent_id",
                &SqlType::Integer,
                non_null = true,
                foreign_key = Some(&PARENT_FK)
            ),
        ],
        indices: &[],
        unique_constraints: &[],
        checks: &[],
    };

    #[test]
    fn test_validate_detects_missing_foreign_key() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute("CREATE TABLE parent (id INTEGER PRIMARY KEY)", [])
            .unwrap();
        conn.execute(
            "CREATE TABLE child (id INTEGER PRIMARY KEY, parent_id INTEGER NOT NULL)",
            [],
        )
        .unwrap();

        let schema = VersionedSchema {
            version: 0,
            tables: &[CHILD_TABLE],
            migration: None,
        };
        let err_msg = schema.validate(&conn).unwrap_err().to_string();
        assert!(err_msg.contains("missing foreign key"));
    }

    #[test]
    fn test_validate_passes_with_foreign_key_present() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute("CREATE TABLE parent (id INTEGER PRIMARY KEY)", [])
            .unwrap();
        CHILD_TABLE.create(&conn).unwrap();

        let schema = VersionedSchema {
            version: 0,
            tables: &[CHILD_TABLE],
            migration: None,
        };
        schema.validate(&conn).unwrap();
    }
}
