//! Glue between `sea-query` statements and `may_postgres`.

pub mod value_conversion;

pub use value_conversion::with_converted_params;
