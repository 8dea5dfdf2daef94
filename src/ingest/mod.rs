//! Import path: raw rows in, validated insert payloads out

pub mod reader;
pub mod row;
pub mod time_codec;

pub use reader::RowReader;
pub use row::{RawRow, RowMapping, DEFAULT_TIMESTAMP_COLUMN, MISSING_TEXT};
pub use time_codec::{format_timestamp, parse_datetime_strict, parse_timestamp, parse_timestamp_value};
