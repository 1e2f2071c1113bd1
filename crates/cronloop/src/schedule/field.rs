//! Single-field parsing: one cron field becomes a 64-bit value mask.

use crate::error::ParseError;

/// Set on a mask whose source text was `*` (or `*/step`). Field values live
/// in bits 0-59, so the top bit is free to carry provenance; day matching is
/// its only consumer.
pub(crate) const STAR_BIT: u64 = 1 << 63;

/// Inclusive value range for one cron field, plus the names it accepts.
pub(crate) struct Bounds {
    pub min: u32,
    pub max: u32,
    pub field: &'static str,
    pub names: &'static [(&'static str, u32)],
}

impl Bounds {
    const fn numeric(field: &'static str, min: u32, max: u32) -> Self {
        Self {
            min,
            max,
            field,
            names: &[],
        }
    }
}

pub(crate) const SECONDS: Bounds = Bounds::numeric("second", 0, 59);
pub(crate) const MINUTES: Bounds = Bounds::numeric("minute", 0, 59);
pub(crate) const HOURS: Bounds = Bounds::numeric("hour", 0, 23);
pub(crate) const DAY_OF_MONTH: Bounds = Bounds::numeric("day-of-month", 1, 31);

pub(crate) const MONTHS: Bounds = Bounds {
    min: 1,
    max: 12,
    field: "month",
    names: &[
        ("jan", 1),
        ("feb", 2),
        ("mar", 3),
        ("apr", 4),
        ("may", 5),
        ("jun", 6),
        ("jul", 7),
        ("aug", 8),
        ("sep", 9),
        ("oct", 10),
        ("nov", 11),
        ("dec", 12),
    ],
};

/// Sunday parses as both 0 and 7; the compiler normalizes the two bits
/// afterwards.
pub(crate) const DAY_OF_WEEK: Bounds = Bounds {
    min: 0,
    max: 7,
    field: "day-of-week",
    names: &[
        ("sun", 0),
        ("mon", 1),
        ("tue", 2),
        ("wed", 3),
        ("thu", 4),
        ("fri", 5),
        ("sat", 6),
    ],
};

/// Parse a whole field: a comma-separated list of ranges, OR-combined.
pub(crate) fn parse_field(field: &str, bounds: &Bounds) -> Result<u64, ParseError> {
    let mut bits = 0u64;
    for range in field.split(',') {
        bits |= parse_range(range, bounds)?;
    }
    Ok(bits)
}

/// Parse one range: `("*" | "?" | value) ("-" value)? ("/" step)?`.
fn parse_range(range: &str, bounds: &Bounds) -> Result<u64, ParseError> {
    if range.is_empty() {
        return Err(ParseError::EmptyRange {
            field: bounds.field,
        });
    }

    let range_and_step: Vec<&str> = range.split('/').collect();
    if range_and_step.len() > 2 {
        return Err(ParseError::TooManySlashes(range.to_string()));
    }
    let low_and_high: Vec<&str> = range_and_step[0].split('-').collect();
    if low_and_high.len() > 2 {
        return Err(ParseError::TooManyHyphens(range.to_string()));
    }

    let star = matches!(low_and_high[0], "*" | "?");
    let (start, mut end) = if star {
        (bounds.min, bounds.max)
    } else {
        let start = parse_value(low_and_high[0], bounds)?;
        let end = match low_and_high.get(1) {
            Some(high) => parse_value(high, bounds)?,
            None => start,
        };
        (start, end)
    };

    let step = match range_and_step.get(1) {
        None => 1,
        Some(raw) => {
            let step = raw.parse::<u32>().map_err(|_| ParseError::InvalidNumber {
                field: bounds.field,
                token: raw.to_string(),
            })?;
            if step == 0 {
                return Err(ParseError::ZeroStep(range.to_string()));
            }
            // A stepped single value has no explicit end and runs to the
            // top of the field: "N/step" means "N-max/step".
            if !star && low_and_high.len() == 1 {
                end = bounds.max;
            }
            step
        }
    };

    if start < bounds.min {
        return Err(ParseError::RangeBelowMinimum {
            start,
            min: bounds.min,
            range: range.to_string(),
        });
    }
    if end > bounds.max {
        return Err(ParseError::RangeAboveMaximum {
            end,
            max: bounds.max,
            range: range.to_string(),
        });
    }
    if start > end {
        return Err(ParseError::RangeInverted {
            start,
            end,
            range: range.to_string(),
        });
    }

    // `?` reads like `*` but keeps the provenance bit clear.
    let provenance = if low_and_high[0] == "*" { STAR_BIT } else { 0 };
    Ok(bit_range(start, end, step) | provenance)
}

fn parse_value(token: &str, bounds: &Bounds) -> Result<u32, ParseError> {
    if !bounds.names.is_empty() && token.chars().any(|c| c.is_ascii_alphabetic()) {
        let lower = token.to_ascii_lowercase();
        return bounds
            .names
            .iter()
            .find(|(name, _)| *name == lower)
            .map(|&(_, value)| value)
            .ok_or_else(|| ParseError::UnknownName {
                field: bounds.field,
                name: token.to_string(),
            });
    }
    token.parse::<u32>().map_err(|_| ParseError::InvalidNumber {
        field: bounds.field,
        token: token.to_string(),
    })
}

/// Bits `start..=end`, every `step`-th one. The step-1 case is two shifts
/// instead of a loop.
fn bit_range(start: u32, end: u32, step: u32) -> u64 {
    if step == 1 {
        return (!0u64 >> (63 - end)) & (!0u64 << start);
    }
    let mut bits = 0u64;
    let mut value = start;
    while value <= end {
        bits |= 1 << value;
        value += step;
    }
    bits
}
