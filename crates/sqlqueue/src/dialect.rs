//! Per-database SQL fragments that the [`crate::sql`] builder substitutes in.
//!
//! A [`DialectProfile`] is pure, static data: no virtual dispatch, no trait
//! object, just three strings that differ between database products. It is
//! fixed at [`crate::Queue`] construction and never changes afterwards.

use std::fmt;

/// The supported database products.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    PostgreSql,
    Oracle,
    MySql,
    MsSqlServer,
    Db2,
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Dialect::PostgreSql => "PostgreSQL",
            Dialect::Oracle => "Oracle",
            Dialect::MySql => "MySQL",
            Dialect::MsSqlServer => "MSSQLServer",
            Dialect::Db2 => "DB2",
        };
        f.write_str(name)
    }
}

/// The three SQL fragments that vary between dialects.
///
/// `batch_lock_clause` is appended to a `FETCH FIRST n ROWS ONLY` select to
/// both lock and skip contended rows in one round-trip. Oracle cannot
/// portably combine `FETCH FIRST` with `FOR UPDATE SKIP LOCKED`, so its
/// `batch_lock_clause` is empty and `row_lock_clause` is used instead to
/// re-lock each candidate row singly (see [`crate::engine`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DialectProfile {
    pub batch_lock_clause: &'static str,
    pub row_lock_clause: &'static str,
    pub insert_conflict_clause: &'static str,
}

impl DialectProfile {
    /// Oracle is the only dialect whose batch claim select cannot itself
    /// take a row lock; callers use this to decide whether the per-row
    /// re-lock step of `handle`/`respond` is required.
    pub fn requires_single_row_relock(&self) -> bool {
        self.batch_lock_clause.is_empty() && !self.row_lock_clause.is_empty()
    }
}

const POSTGRESQL: DialectProfile = DialectProfile {
    batch_lock_clause: "FOR UPDATE SKIP LOCKED",
    row_lock_clause: "",
    insert_conflict_clause: "ON CONFLICT DO NOTHING",
};

const ORACLE: DialectProfile = DialectProfile {
    batch_lock_clause: "",
    row_lock_clause: "FOR UPDATE SKIP LOCKED",
    insert_conflict_clause: "",
};

const MYSQL: DialectProfile = DialectProfile {
    batch_lock_clause: "FOR UPDATE SKIP LOCKED",
    row_lock_clause: "",
    insert_conflict_clause: "",
};

const MSSQL: DialectProfile = DialectProfile {
    batch_lock_clause: "FOR UPDATE READPAST",
    row_lock_clause: "",
    insert_conflict_clause: "",
};

const DB2: DialectProfile = DialectProfile {
    batch_lock_clause: "FOR UPDATE SKIP LOCKED DATA",
    row_lock_clause: "",
    insert_conflict_clause: "",
};

impl Dialect {
    /// The static SQL-fragment profile for this dialect.
    pub const fn profile(self) -> DialectProfile {
        match self {
            Dialect::PostgreSql => POSTGRESQL,
            Dialect::Oracle => ORACLE,
            Dialect::MySql => MYSQL,
            Dialect::MsSqlServer => MSSQL,
            Dialect::Db2 => DB2,
        }
    }
}
