//! Compiled schedules: bit-mask representation, expression parsing, and
//! activation-time computation.

mod field;
mod next;
mod parser;

pub use next::Upcoming;

use std::str::FromStr;

use crate::error::ParseError;

/// A compiled duty cycle with second granularity.
///
/// One 64-bit mask per field; bit `k` is set iff value `k` is allowed for
/// that field. Bit 63 records whether the field's source text was `*`
/// (or `*/step`), which only the day-matching rule consults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    pub(crate) second: u64,
    pub(crate) minute: u64,
    pub(crate) hour: u64,
    pub(crate) dom: u64,
    pub(crate) month: u64,
    pub(crate) dow: u64,
}

impl Schedule {
    /// Compile a cron expression.
    ///
    /// Accepts six whitespace-separated fields in the order
    /// `second minute hour day-of-month month day-of-week`, the traditional
    /// five-field form (seconds default to `0`), or an `@`-descriptor
    /// (`@yearly`/`@annually`, `@monthly`, `@weekly`, `@daily`/`@midnight`,
    /// `@hourly`).
    ///
    /// | Field        | Allowed values               |
    /// | ------------ | ---------------------------- |
    /// | second       | 0-59                         |
    /// | minute       | 0-59                         |
    /// | hour         | 0-23                         |
    /// | day of month | 1-31                         |
    /// | month        | 1-12, Jan-Dec                |
    /// | day of week  | 0-7 (0/7 is Sunday), Sun-Sat |
    ///
    /// Every field takes `*`, lists (`1,3,5`), ranges (`1-5`), and steps
    /// (`*/15`, `10-30/5`, `5/10`). `?` reads like `*` but keeps the
    /// classical either-field day matching when the other day field is
    /// explicit.
    ///
    /// ```
    /// use chrono::Utc;
    /// use cronloop::Schedule;
    ///
    /// // Every five minutes.
    /// let schedule = Schedule::parse("0 */5 * * * *").unwrap();
    /// for time in schedule.upcoming(Utc::now()).take(3) {
    ///     println!("{time}");
    /// }
    /// ```
    pub fn parse(expression: &str) -> Result<Self, ParseError> {
        parser::parse(expression)
    }
}

impl FromStr for Schedule {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
