//! MySQL access: driver, statement executor, result types, serialization.

pub mod executor;
pub mod mysql;
pub mod result;
pub mod serialize;

pub use executor::QueryExecutor;
pub use mysql::MySqlDriver;
pub use result::{CellValue, Column, ColumnSchema, ForeignKey, QueryResult, Row};
