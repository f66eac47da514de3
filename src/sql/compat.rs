//! MySQL date functions for SQLite connections.
//!
//! The stock report queries are written against MySQL, so `CURDATE()` and
//! `DATEDIFF(a, b)` are provided as application-defined functions.

use chrono::{Local, NaiveDate};
use rusqlite::Connection;
use rusqlite::functions::FunctionFlags;
use rusqlite::types::ValueRef;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Register the compatibility functions on `conn`.
pub fn register(conn: &Connection) -> rusqlite::Result<()> {
    conn.create_scalar_function("CURDATE", 0, FunctionFlags::SQLITE_UTF8, |_| {
        Ok(Local::now().date_naive().format(DATE_FORMAT).to_string())
    })?;

    conn.create_scalar_function(
        "DATEDIFF",
        2,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            Ok(date_diff(text(ctx.get_raw(0)), text(ctx.get_raw(1))))
        },
    )?;

    Ok(())
}

/// The argument as text; numbers, blobs and NULL are not dates.
fn text(value: ValueRef<'_>) -> Option<&str> {
    match value {
        ValueRef::Text(bytes) => std::str::from_utf8(bytes).ok(),
        _ => None,
    }
}

/// Days from `right` to `left`, or `None` if either is missing or not a date.
fn date_diff(left: Option<&str>, right: Option<&str>) -> Option<i64> {
    let left = parse_date(left?)?;
    let right = parse_date(right?)?;
    Some((left - right).num_days())
}

/// Parse the date part of a `YYYY-MM-DD[ hh:mm:ss]` value.
fn parse_date(value: &str) -> Option<NaiveDate> {
    let date = value.get(..10).unwrap_or(value);
    NaiveDate::parse_from_str(date, DATE_FORMAT).ok()
}
