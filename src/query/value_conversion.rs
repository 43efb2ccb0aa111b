//! Value conversion from SeaQuery to `may_postgres`.
//!
//! Statements are built with `sea-query` and rendered with
//! `PostgresQueryBuilder`, which hands back the SQL plus a `Values` list. The
//! driver wants `&[&dyn ToSql]`, so the values are first moved into owned
//! storage and then borrowed for the duration of a closure.

use crate::executor::LifeError;
use may_postgres::types::ToSql;
use sea_query::{Value, Values};

/// Convert SeaQuery values to `may_postgres` parameters and run `f` with them
///
/// Parameter order is preserved, so `$1..$n` in the rendered SQL line up with
/// the slice handed to the closure. NULLs keep their SQL type (`Option<String>`
/// for a text column, `Option<bool>` for a boolean) so the driver's type check
/// accepts them.
///
/// # Errors
///
/// Returns `LifeError::QueryError` for value kinds the service never binds, or
/// for a `BigUnsigned` that does not fit in `i64`.
pub fn with_converted_params<F, R>(values: &Values, f: F) -> Result<R, LifeError>
where
    F: FnOnce(&[&dyn ToSql]) -> Result<R, LifeError>,
{
    let owned = values
        .iter()
        .map(to_owned_param)
        .collect::<Result<Vec<_>, _>>()?;
    let params: Vec<&dyn ToSql> = owned.iter().map(|p| p.as_ref() as &dyn ToSql).collect();
    f(&params)
}

fn to_owned_param(value: &Value) -> Result<Box<dyn ToSql>, LifeError> {
    let param: Box<dyn ToSql> = match value {
        Value::Bool(b) => Box::new(*b),
        Value::TinyInt(i) => Box::new(i.map(i16::from)),
        Value::SmallInt(i) => Box::new(*i),
        Value::Int(i) => Box::new(*i),
        Value::BigInt(i) => Box::new(*i),
        Value::TinyUnsigned(u) => Box::new(u.map(i16::from)),
        Value::SmallUnsigned(u) => Box::new(u.map(i32::from)),
        Value::Unsigned(u) => Box::new(u.map(i64::from)),
        Value::BigUnsigned(u) => Box::new(u.map(big_unsigned).transpose()?),
        Value::Float(f) => Box::new(*f),
        Value::Double(d) => Box::new(*d),
        Value::String(s) => Box::new(s.clone()),
        Value::Char(c) => Box::new(c.map(String::from)),
        Value::Bytes(b) => Box::new(b.clone()),
        other => {
            return Err(LifeError::QueryError(format!(
                "Unsupported value type in query: {other:?}"
            )))
        }
    };
    Ok(param)
}

fn big_unsigned(u: u64) -> Result<i64, LifeError> {
    i64::try_from(u).map_err(|_| {
        LifeError::QueryError(format!(
            "BigUnsigned value {u} exceeds i64::MAX ({}), cannot be safely cast to i64",
            i64::MAX
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_query::{Expr, ExprTrait, PostgresQueryBuilder, Query};

    #[test]
    fn test_parameters_keep_statement_order() {
        let (sql, values) = Query::select()
            .column("id")
            .from("task")
            .and_where(Expr::col("tag").eq("home"))
            .and_where(Expr::col("completed").eq(true))
            .limit(10)
            .offset(20)
            .build(PostgresQueryBuilder);

        assert!(sql.contains("$4"));
        let rendered = with_converted_params(&values, |params| {
            Ok(params.iter().map(|p| format!("{p:?}")).collect::<Vec<_>>())
        })
        .unwrap();
        assert_eq!(rendered, vec!["Some(\"home\")", "Some(true)", "Some(10)", "Some(20)"]);
    }

    #[test]
    fn test_nulls_are_typed() {
        let values = Values(vec![Value::String(None), Value::Bool(None)]);
        let count = with_converted_params(&values, |params| Ok(params.len())).unwrap();
        assert_eq!(count, 2);
    }

    #[test]
    fn test_big_unsigned_overflow() {
        let values = Values(vec![Value::BigUnsigned(Some(u64::MAX))]);
        let err = with_converted_params(&values, |_| Ok(())).unwrap_err();
        assert!(err.to_string().contains("exceeds i64::MAX"));
    }

    #[test]
    fn test_closure_error_propagates() {
        let values = Values(vec![Value::Int(Some(1))]);
        let err = with_converted_params(&values, |_| -> Result<(), LifeError> {
            Err(LifeError::Other("boom".to_string()))
        })
        .unwrap_err();
        assert!(err.to_string().contains("boom"));
    }
}
