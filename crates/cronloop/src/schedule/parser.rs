//! Whole-expression compilation: field splitting, `@`-descriptors, and
//! Sunday normalization.

use crate::error::ParseError;

use super::field::{
    parse_field, DAY_OF_MONTH, DAY_OF_WEEK, HOURS, MINUTES, MONTHS, SECONDS,
};
use super::Schedule;

/// Sunday is accepted as both 0 and 7 in the day-of-week field.
const SUNDAY_BITS: u64 = 1 | 1 << 7;

pub(crate) fn parse(expression: &str) -> Result<Schedule, ParseError> {
    let expression = expression.trim();
    if expression.starts_with('@') {
        return parse_descriptor(expression);
    }
    compile_fields(expression)
}

fn compile_fields(expression: &str) -> Result<Schedule, ParseError> {
    let fields: Vec<&str> = expression.split_whitespace().collect();
    let [second, minute, hour, dom, month, dow] = match fields[..] {
        [sec, min, hr, dom, mon, dow] => [sec, min, hr, dom, mon, dow],
        // Traditional five-field form: seconds default to the top of the minute.
        [min, hr, dom, mon, dow] => ["0", min, hr, dom, mon, dow],
        _ => {
            return Err(ParseError::FieldCount {
                found: fields.len(),
                expression: expression.to_string(),
            })
        }
    };

    let mut schedule = Schedule {
        second: parse_field(second, &SECONDS)?,
        minute: parse_field(minute, &MINUTES)?,
        hour: parse_field(hour, &HOURS)?,
        dom: parse_field(dom, &DAY_OF_MONTH)?,
        month: parse_field(month, &MONTHS)?,
        dow: parse_field(dow, &DAY_OF_WEEK)?,
    };

    // If either Sunday bit is set, set both.
    if schedule.dow & SUNDAY_BITS != 0 {
        schedule.dow |= SUNDAY_BITS;
    }

    Ok(schedule)
}

/// Descriptors compile through their six-field equivalents, which pins the
/// seconds mask to `{0}` and gives the starred fields the same provenance
/// bits the spelled-out form would have.
fn parse_descriptor(expression: &str) -> Result<Schedule, ParseError> {
    let equivalent = match expression {
        "@yearly" | "@annually" => "0 0 0 1 1 *",
        "@monthly" => "0 0 0 1 * *",
        "@weekly" => "0 0 0 * * 0",
        "@daily" | "@midnight" => "0 0 0 * * *",
        "@hourly" => "0 0 * * * *",
        other => return Err(ParseError::UnknownDescriptor(other.to_string())),
    };
    compile_fields(equivalent)
}
