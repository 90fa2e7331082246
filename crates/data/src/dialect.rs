//! SQL dialects supported by the order repository.
//!
//! A dialect owns everything that differs between backends: the table
//! bootstrap statement, bind-parameter syntax and the error codes that mean
//! "duplicate key". The column list is shared.

/// Column definitions of the orders table, identical for every dialect.
const ORDER_COLUMNS: &str = "\
    order_id VARCHAR(64),
    namespace VARCHAR(64),
    total DECIMAL(8,2),
    PRIMARY KEY (order_id, namespace)";

/// Postgres `unique_violation` SQLSTATE.
const PG_UNIQUE_VIOLATION: &str = "23505";

/// SQL Server: primary key violation (2627) and unique index violation (2601).
const MSSQL_DUPLICATE_KEY: [u32; 2] = [2627, 2601];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    Postgres,
    SqlServer,
}

impl Dialect {
    /// Driver identifier used in diagnostics.
    #[must_use]
    pub const fn driver_name(self) -> &'static str {
        match self {
            Self::Postgres => "postgres",
            Self::SqlServer => "sqlserver",
        }
    }

    /// Idempotent `CREATE TABLE` for `table`.
    ///
    /// `table` is spliced in verbatim and must already be sanitized.
    #[must_use]
    pub fn create_table_sql(self, table: &str) -> String {
        match self {
            Self::Postgres => {
                format!("CREATE TABLE IF NOT EXISTS {table} (\n    {ORDER_COLUMNS}\n)")
            }
            Self::SqlServer => format!(
                "IF NOT EXISTS (SELECT * FROM INFORMATION_SCHEMA.TABLES WHERE {})\n\
                 BEGIN\n\
                 CREATE TABLE {table} (\n    {ORDER_COLUMNS}\n)\n\
                 END",
                table_lookup(table)
            ),
        }
    }

    /// Bind-parameter marker for the 1-based position `index`.
    #[must_use]
    pub fn placeholder(self, index: usize) -> String {
        match self {
            Self::Postgres => format!("${index}"),
            Self::SqlServer => format!("@P{index}"),
        }
    }

    #[must_use]
    pub fn insert_sql(self, table: &str) -> String {
        format!(
            "INSERT INTO {table} (order_id, namespace, total) VALUES ({}, {}, {})",
            self.placeholder(1),
            self.placeholder(2),
            self.placeholder(3)
        )
    }

    #[must_use]
    pub fn select_all_sql(self, table: &str) -> String {
        format!("SELECT order_id, namespace, total FROM {table}")
    }

    #[must_use]
    pub fn select_by_namespace_sql(self, table: &str) -> String {
        format!(
            "SELECT order_id, namespace, total FROM {table} WHERE namespace = {}",
            self.placeholder(1)
        )
    }

    #[must_use]
    pub fn delete_all_sql(self, table: &str) -> String {
        format!("DELETE FROM {table}")
    }

    #[must_use]
    pub fn delete_by_namespace_sql(self, table: &str) -> String {
        format!("DELETE FROM {table} WHERE namespace = {}", self.placeholder(1))
    }

    #[must_use]
    pub fn drop_table_sql(self, table: &str) -> String {
        format!("DROP TABLE {table}")
    }

    /// Postgres reports SQLSTATE strings.
    #[must_use]
    pub fn is_duplicate_sqlstate(self, code: &str) -> bool {
        matches!(self, Self::Postgres) && code == PG_UNIQUE_VIOLATION
    }

    /// SQL Server reports numeric error codes.
    #[must_use]
    pub fn is_duplicate_error_number(self, code: u32) -> bool {
        matches!(self, Self::SqlServer) && MSSQL_DUPLICATE_KEY.contains(&code)
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.driver_name())
    }
}

/// `INFORMATION_SCHEMA.TABLES` predicate for a possibly qualified name.
/// `db.dbo.orders` is matched on schema `dbo` and table `orders`.
fn table_lookup(table: &str) -> String {
    match table.rsplit_once('.') {
        Some((qualifier, name)) => {
            let schema = qualifier.rsplit('.').next().unwrap_or(qualifier);
            format!("TABLE_SCHEMA = '{schema}' AND TABLE_NAME = '{name}'")
        }
        None => format!("TABLE_NAME = '{table}'"),
    }
}
