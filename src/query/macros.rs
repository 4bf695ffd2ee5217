//! SQL macro expansion
//!
//! Expands the time macros understood in SQL templates, in this order:
//!
//! - `$__timeFilter(col)`: date-based bound on `col` (first occurrence)
//! - `$__unixEpochFilter(col)`: millisecond-epoch bound on `col` (first occurrence)
//! - `$__timeGroup(col, interval)`: floor-to-bucket expression (every occurrence)
//! - `$__time(col)`: `col as time` (first occurrence)
//! - `:start_time` / `:end_time`: integer Unix seconds of the window
//!
//! Each macro call runs from its marker to the first following `)`.
//! Substitution is textual and whitespace around the call is kept as is.

use nom::{
    bytes::complete::{tag, take_until},
    character::complete::char,
    sequence::delimited,
    IResult,
};

use super::error::{QueryError, QueryResult};
use super::spec::TimeWindow;

const TIME_FILTER: &str = "$__timeFilter(";
const UNIX_EPOCH_FILTER: &str = "$__unixEpochFilter(";
const TIME_GROUP: &str = "$__timeGroup(";
const TIME_ALIAS: &str = "$__time(";
const INTERVAL_VARIABLE: &str = "$__interval";
const START_PLACEHOLDER: &str = ":start_time";
const END_PLACEHOLDER: &str = ":end_time";

/// A located macro call: text before the marker, the raw argument text, and
/// the text after the closing `)`
struct MacroCall<'a> {
    before: &'a str,
    args: &'a str,
    after: &'a str,
}

fn macro_arguments<'a>(input: &'a str, marker: &str) -> IResult<&'a str, &'a str> {
    delimited(tag(marker), take_until(")"), char(')'))(input)
}

/// Locate the first call of `marker` in `text`
fn find_call<'a>(text: &'a str, marker: &str) -> QueryResult<Option<MacroCall<'a>>> {
    let Some(start) = text.find(marker) else {
        return Ok(None);
    };

    let (after, args) = macro_arguments(&text[start..], marker).map_err(|_| {
        QueryError::MalformedQueryMacro(format!(
            "{}...) at offset {} has no closing ')'",
            marker, start
        ))
    })?;

    Ok(Some(MacroCall {
        before: &text[..start],
        args,
        after,
    }))
}

/// Resolve a `$__timeGroup` interval to seconds, as text
fn interval_seconds(interval: &str, step: i64) -> QueryResult<String> {
    if interval == INTERVAL_VARIABLE {
        return Ok(step.to_string());
    }

    // "30s", "5m", "1h" or bare seconds
    let re = regex::Regex::new(r"^(\d+)([smh])?$")
        .map_err(|e| QueryError::MalformedQueryMacro(format!("interval pattern: {}", e)))?;

    let malformed = || QueryError::MalformedQueryMacro(format!("unsupported $__timeGroup interval '{}'", interval));
    let captures = re.captures(interval).ok_or_else(malformed)?;
    let digits = &captures[1];

    let multiplier = match captures.get(2).map(|m| m.as_str()) {
        None | Some("s") => None,
        Some("m") => Some(60),
        Some("h") => Some(3600),
        Some(_) => return Err(malformed()),
    };

    let seconds = match multiplier {
        // Seconds pass through as written
        None => digits.to_string(),
        Some(factor) => digits
            .parse::<i64>()
            .ok()
            .and_then(|n| n.checked_mul(factor))
            .ok_or_else(malformed)?
            .to_string(),
    };

    if seconds.bytes().all(|b| b == b'0') {
        return Err(QueryError::MalformedQueryMacro(format!(
            "$__timeGroup interval '{}' is zero",
            interval
        )));
    }
    Ok(seconds)
}

/// The column argument of `macro_name`, kept as written; blank is rejected
fn column_argument<'a>(macro_name: &str, arg: &'a str) -> QueryResult<&'a str> {
    if arg.trim().is_empty() {
        return Err(QueryError::MalformedQueryMacro(format!(
            "{}() is missing its column argument",
            macro_name
        )));
    }
    Ok(arg)
}

fn time_filter(call: &MacroCall<'_>) -> QueryResult<String> {
    let col = column_argument("$__timeFilter", call.args)?;
    Ok(format!(
        "{} {}>= to_date('19700101', 'YYYYMMDD') + ( 1 / 24 / 60 / 60 ) * :start_time and \
         {}<= to_date('19700101', 'YYYYMMDD') + ( 1 / 24 / 60 / 60 ) * :end_time {}",
        call.before, col, col, call.after
    ))
}

fn unix_epoch_filter(call: &MacroCall<'_>) -> QueryResult<String> {
    let col = column_argument("$__unixEpochFilter", call.args)?;
    Ok(format!(
        "{} {}>= :start_time*1000 and {}<= :end_time*1000 {}",
        call.before, col, col, call.after
    ))
}

fn time_group(call: &MacroCall<'_>, step: i64) -> QueryResult<String> {
    let mut args = call.args.split(',');
    let (Some(column), Some(interval)) = (args.next(), args.next()) else {
        return Err(QueryError::MalformedQueryMacro(format!(
            "$__timeGroup({}) expects a column and an interval",
            call.args
        )));
    };
    let column = column_argument("$__timeGroup", column)?.trim();
    let secs = interval_seconds(interval.trim(), step)?;

    let bucket = format!(
        "TO_DATE('19700101', 'YYYYMMDD') + ( 1 / 24 / 60 / 60 / 1000) * FLOOR(({} - \
         TO_TIMESTAMP('1970-01-01 00:00:00','yyyy-mm-dd hh24:mi:ss') + \
         TO_DATE ('1970-01-01 00:00:00', 'YYYY-mm-dd HH24:MI:SS') - \
         TO_DATE ('1970-01-01 00:00:00', 'YYYY-mm-dd HH24:MI:SS'))*24*60*60*1000/{}/1000)*{}*1000",
        column, secs, secs
    );
    Ok(format!("{} {}{}", call.before, bucket, call.after))
}

fn time_alias(call: &MacroCall<'_>) -> QueryResult<String> {
    let col = column_argument("$__time", call.args)?;
    Ok(format!("{} {} as time {}", call.before, col, call.after))
}

/// Expand every macro and placeholder in `sql` for `window` and `step`
pub fn expand_macros(sql: &str, window: &TimeWindow, step: i64) -> QueryResult<String> {
    let mut text = sql.to_string();

    if let Some(call) = find_call(&text, TIME_FILTER)? {
        text = time_filter(&call)?;
        tracing::debug!(query = %text, "expanded $__timeFilter");
    }

    if let Some(call) = find_call(&text, UNIX_EPOCH_FILTER)? {
        text = unix_epoch_filter(&call)?;
        tracing::debug!(query = %text, "expanded $__unixEpochFilter");
    }

    // Appears in both the select list and the group by clause
    while let Some(call) = find_call(&text, TIME_GROUP)? {
        text = time_group(&call, step)?;
        tracing::debug!(query = %text, "expanded $__timeGroup");
    }

    if let Some(call) = find_call(&text, TIME_ALIAS)? {
        text = time_alias(&call)?;
        tracing::debug!(query = %text, "expanded $__time");
    }

    let text = text
        .replace(START_PLACEHOLDER, &window.from_secs().to_string())
        .replace(END_PLACEHOLDER, &window.to_secs().to_string());

    Ok(text)
}
