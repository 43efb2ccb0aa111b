//! SchemaManager - schema operations available to revisions

use crate::{LifeError, LifeExecutor};
use sea_query::{
    Index, IndexCreateStatement, PostgresQueryBuilder, TableCreateStatement, TableDropStatement,
};

/// Schema operations for revision scripts
///
/// Wraps whatever executor the migrator hands in (normally the transaction a
/// revision runs in), so everything a revision does commits or rolls back
/// together with the version row.
pub struct SchemaManager<'a> {
    executor: &'a dyn LifeExecutor,
}

impl<'a> SchemaManager<'a> {
    pub fn new(executor: &'a dyn LifeExecutor) -> Self {
        Self { executor }
    }

    /// Create a table
    ///
    /// # Example
    /// ```rust,no_run
    /// use sea_query::{ColumnDef, Table};
    /// # fn run(manager: &tasktrack::migration::SchemaManager<'_>) -> Result<(), tasktrack::LifeError> {
    /// let table = Table::create()
    ///     .table("task")
    ///     .col(ColumnDef::new("id").integer().not_null().auto_increment().primary_key())
    ///     .col(ColumnDef::new("title").string_len(200).not_null())
    ///     .to_owned();
    ///
    /// manager.create_table(table)?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn create_table(&self, table: TableCreateStatement) -> Result<(), LifeError> {
        let sql = table.build(PostgresQueryBuilder);
        self.executor.execute(&sql, &[]).map(|_| ())
    }

    /// Drop a table
    pub fn drop_table(&self, table: TableDropStatement) -> Result<(), LifeError> {
        let sql = table.build(PostgresQueryBuilder);
        self.executor.execute(&sql, &[]).map(|_| ())
    }

    /// Create an index; fails if it already exists
    pub fn create_index(&self, index: IndexCreateStatement) -> Result<(), LifeError> {
        let sql = index.build(PostgresQueryBuilder);
        self.executor.execute(&sql, &[]).map(|_| ())
    }

    /// Whether an index called `name` exists on `table` in the current schema
    pub fn index_exists(&self, table: &str, name: &str) -> Result<bool, LifeError> {
        let row = self.executor.query_one(
            "SELECT EXISTS (SELECT 1 FROM pg_indexes \
             WHERE schemaname = current_schema() AND tablename = $1 AND indexname = $2)",
            &[&table, &name],
        )?;
        Ok(row.try_get::<_, bool>(0)?)
    }

    /// Create index `name` on `table(columns)` unless the catalog already has it
    ///
    /// Returns `true` when the index was created.
    pub fn create_index_if_missing(
        &self,
        table: &str,
        name: &str,
        columns: &[&str],
    ) -> Result<bool, LifeError> {
        if self.index_exists(table, name)? {
            log::debug!("index {name} already exists on {table}");
            return Ok(false);
        }

        let mut index = Index::create();
        index.name(name.to_string()).table(table.to_string());
        for column in columns {
            index.col(column.to_string());
        }
        self.create_index(index.to_owned())?;
        Ok(true)
    }

    /// Drop an index, succeeding if it is already gone
    ///
    /// Only absence is tolerated; any other failure (permissions, the index
    /// backing a constraint) is returned.
    pub fn drop_index_if_exists(&self, name: &str) -> Result<(), LifeError> {
        let sql = format!("DROP INDEX IF EXISTS {}", quote_ident(name));
        self.executor.execute(&sql, &[]).map(|_| ())
    }

    /// Execute raw SQL
    pub fn execute(
        &self,
        sql: &str,
        params: &[&dyn may_postgres::types::ToSql],
    ) -> Result<(), LifeError> {
        self.executor.execute(sql, params).map(|_| ())
    }

    /// Get a reference to the underlying executor
    pub fn executor(&self) -> &dyn LifeExecutor {
        self.executor
    }
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
