//! PostgreSQL task repository built on `sea-query`.

use super::model::{escape_like, Task, TaskFilter, TaskIn};
use super::repository::TaskRepository;
use crate::pool::DbPool;
use crate::query::with_converted_params;
use crate::{LifeError, LifeExecutor};
use sea_query::{
    Condition, Expr, ExprTrait, Func, LikeExpr, Order, PostgresQueryBuilder, Query,
    SelectStatement,
};
use std::sync::Arc;

const TABLE: &str = "task";
const COLUMNS: [&str; 5] = ["id", "title", "description", "tag", "completed"];

pub struct PgTaskRepository {
    pool: Arc<DbPool>,
}

impl PgTaskRepository {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }
}

/// Build the list query; filtering, ordering and paging all happen in SQL
pub fn list_query(filter: &TaskFilter) -> SelectStatement {
    let mut query = Query::select();
    query.columns(COLUMNS).from(TABLE);

    if let Some(term) = filter.search_term() {
        let pattern = format!("%{}%", escape_like(&term.to_lowercase()));
        query.cond_where(
            Condition::any()
                .add(
                    Expr::expr(Func::lower(Expr::col("title")))
                        .like(LikeExpr::new(pattern.clone()).escape('\\')),
                )
                .add(
                    Expr::expr(Func::lower(Expr::col("description")))
                        .like(LikeExpr::new(pattern).escape('\\')),
                ),
        );
    }
    if let Some(tag) = &filter.tag {
        query.and_where(Expr::col("tag").eq(tag.clone()));
    }
    if let Some(completed) = filter.completed {
        query.and_where(Expr::col("completed").eq(completed));
    }

    query
        .order_by("id", Order::Asc)
        .limit(filter.limit)
        .offset(filter.offset);
    query
}

impl TaskRepository for PgTaskRepository {
    fn create(&self, input: &TaskIn) -> Result<Task, LifeError> {
        let (sql, values) = Query::insert()
            .into_table(TABLE)
            .columns(["title", "description", "tag", "completed"])
            .values([
                input.title.clone().into(),
                input.description.clone().into(),
                input.tag.clone().into(),
                false.into(),
            ])
            .map_err(|e| LifeError::QueryError(e.to_string()))?
            .returning_all()
            .build(PostgresQueryBuilder);

        let executor = self.pool.get()?;
        let row = with_converted_params(&values, |params| executor.query_one(&sql, params))?;
        Task::from_row(&row)
    }

    fn list(&self, filter: &TaskFilter) -> Result<Vec<Task>, LifeError> {
        let (sql, values) = list_query(filter).build(PostgresQueryBuilder);

        let executor = self.pool.get()?;
        let rows = with_converted_params(&values, |params| executor.query_all(&sql, params))?;
        rows.iter().map(Task::from_row).collect()
    }

    fn get(&self, id: i32) -> Result<Option<Task>, LifeError> {
        let (sql, values) = Query::select()
            .columns(COLUMNS)
            .from(TABLE)
            .and_where(Expr::col("id").eq(id))
            .build(PostgresQueryBuilder);

        let executor = self.pool.get()?;
        let row = with_converted_params(&values, |params| executor.query_opt(&sql, params))?;
        row.as_ref().map(Task::from_row).transpose()
    }

    fn update(&self, id: i32, input: &TaskIn) -> Result<Option<Task>, LifeError> {
        let (sql, values) = Query::update()
            .table(TABLE)
            .value("title", input.title.clone())
            .value("description", input.description.clone())
            .value("tag", input.tag.clone())
            .and_where(Expr::col("id").eq(id))
            .returning_all()
            .build(PostgresQueryBuilder);

        let executor = self.pool.get()?;
        let row = with_converted_params(&values, |params| executor.query_opt(&sql, params))?;
        row.as_ref().map(Task::from_row).transpose()
    }

    fn complete(&self, id: i32) -> Result<Option<Task>, LifeError> {
        let (sql, values) = Query::update()
            .table(TABLE)
            .value("completed", true)
            .and_where(Expr::col("id").eq(id))
            .returning_all()
            .build(PostgresQueryBuilder);

        let executor = self.pool.get()?;
        let row = with_converted_params(&values, |params| executor.query_opt(&sql, params))?;
        row.as_ref().map(Task::from_row).transpose()
    }

    fn delete(&self, id: i32) -> Result<bool, LifeError> {
        let (sql, values) = Query::delete()
            .from_table(TABLE)
            .and_where(Expr::col("id").eq(id))
            .build(PostgresQueryBuilder);

        let executor = self.pool.get()?;
        let deleted = with_converted_params(&values, |params| executor.execute(&sql, params))?;
        Ok(deleted > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_query_without_filters() {
        let (sql, values) = list_query(&TaskFilter::default()).build(PostgresQueryBuilder);
        assert_eq!(
            sql,
            r#"SELECT "id", "title", "description", "tag", "completed" FROM "task" ORDER BY "id" ASC LIMIT $1 OFFSET $2"#
        );
        assert_eq!(values.0.len(), 2);
    }

    #[test]
    fn test_list_query_with_every_filter() {
        let filter = TaskFilter {
            search: Some("Milk_%".to_string()),
            tag: Some("home".to_string()),
            completed: Some(true),
            ..TaskFilter::default()
        };
        let (sql, values) = list_query(&filter).build(PostgresQueryBuilder);

        assert!(sql.contains(r#"LOWER("title") LIKE $1 ESCAPE"#), "{sql}");
        assert!(sql.contains(r#"LOWER("description") LIKE $2 ESCAPE"#), "{sql}");
        assert!(sql.contains(r#""tag" = $3"#), "{sql}");
        assert!(sql.contains(r#""completed" = $4"#), "{sql}");
        assert_eq!(
            values.0[0],
            sea_query::Value::String(Some("%milk\\_\\%%".to_string()))
        );
    }
}
