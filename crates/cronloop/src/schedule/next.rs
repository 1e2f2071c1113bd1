//! The activation engine: given a schedule and a time, find the next
//! matching instant.

use chrono::{
    DateTime, Datelike, Duration, LocalResult, NaiveDate, NaiveDateTime, TimeZone, Timelike,
};

use super::field::STAR_BIT;
use super::Schedule;

/// Schedules with no activation within this many years of the probe time
/// are reported as never firing.
const YEAR_HORIZON: i32 = 5;

impl Schedule {
    /// The smallest activation time strictly greater than `after`, or
    /// `None` if the schedule cannot fire within five years (for example
    /// `0 0 0 30 2 *`, which asks for February 30th).
    ///
    /// The search runs on civil (wall-clock) time in `after`'s zone. A
    /// candidate falling inside a spring-forward gap is skipped; a
    /// candidate inside a fall-back fold resolves to the earlier of its
    /// two instants.
    pub fn next<Tz: TimeZone>(&self, after: &DateTime<Tz>) -> Option<DateTime<Tz>> {
        let zone = after.timezone();
        let year_limit = after.year() + YEAR_HORIZON;
        let mut cursor = after.naive_local();
        loop {
            let candidate = self.next_civil(cursor, year_limit)?;
            match zone.from_local_datetime(&candidate) {
                LocalResult::Single(next) => return Some(next),
                LocalResult::Ambiguous(earliest, _) => return Some(earliest),
                // The civil time does not exist in this zone; keep
                // searching past it.
                LocalResult::None => cursor = candidate,
            }
        }
    }

    /// Successive activation times after `after`, soonest first. The
    /// iterator ends when the schedule runs out of activations inside the
    /// search horizon.
    pub fn upcoming<Tz: TimeZone>(&self, after: DateTime<Tz>) -> Upcoming<Tz> {
        Upcoming {
            schedule: *self,
            cursor: after,
        }
    }

    /// Field-cascade search over civil time.
    ///
    /// Each field is advanced by its natural unit until its bit matches,
    /// from months down to seconds. `added` flips on the first bump; from
    /// then on every lower field restarts at its minimum rather than the
    /// probe value. A field that wraps restarts the whole cascade from the
    /// month, since the higher fields need re-verification.
    fn next_civil(&self, after: NaiveDateTime, year_limit: i32) -> Option<NaiveDateTime> {
        // Start at the upcoming whole second.
        let mut t = after.with_nanosecond(0).unwrap_or(after) + Duration::seconds(1);
        let mut added = false;

        'wrap: loop {
            if t.year() > year_limit {
                return None;
            }

            while !bit_set(self.month, t.month()) {
                if !added {
                    added = true;
                    t = first_of_month(&t)?;
                }
                t = next_month(&t)?;
                if t.month() == 1 {
                    continue 'wrap;
                }
            }

            while !self.day_matches(&t) {
                if !added {
                    added = true;
                    t = midnight(&t);
                }
                t += Duration::days(1);
                if t.day() == 1 {
                    continue 'wrap;
                }
            }

            while !bit_set(self.hour, t.hour()) {
                if !added {
                    added = true;
                    t = t
                        .with_minute(0)
                        .and_then(|t| t.with_second(0))
                        .unwrap_or(t);
                }
                t += Duration::hours(1);
                if t.hour() == 0 {
                    continue 'wrap;
                }
            }

            while !bit_set(self.minute, t.minute()) {
                if !added {
                    added = true;
                    t = t.with_second(0).unwrap_or(t);
                }
                t += Duration::minutes(1);
                if t.minute() == 0 {
                    continue 'wrap;
                }
            }

            while !bit_set(self.second, t.second()) {
                added = true;
                t += Duration::seconds(1);
                if t.second() == 0 {
                    continue 'wrap;
                }
            }

            return Some(t);
        }
    }

    /// Day-of-month and day-of-week interact through the star provenance
    /// bit: a `*` on either axis means the other axis has to pin the day,
    /// so both must match. With both axes explicit, either one will do.
    fn day_matches(&self, t: &NaiveDateTime) -> bool {
        let dom_match = bit_set(self.dom, t.day());
        let dow_match = bit_set(self.dow, t.weekday().num_days_from_sunday());
        if (self.dom | self.dow) & STAR_BIT != 0 {
            dom_match && dow_match
        } else {
            dom_match || dow_match
        }
    }
}

fn bit_set(mask: u64, value: u32) -> bool {
    mask & (1u64 << value) != 0
}

fn midnight(t: &NaiveDateTime) -> NaiveDateTime {
    t.date().and_hms_opt(0, 0, 0).unwrap_or(*t)
}

/// Midnight on the first of `t`'s month.
fn first_of_month(t: &NaiveDateTime) -> Option<NaiveDateTime> {
    NaiveDate::from_ymd_opt(t.year(), t.month(), 1)?.and_hms_opt(0, 0, 0)
}

/// Midnight on the first of the following month. Only ever called on a
/// first-of-month timestamp, so no day clamping is needed.
fn next_month(t: &NaiveDateTime) -> Option<NaiveDateTime> {
    let (year, month) = if t.month() == 12 {
        (t.year() + 1, 1)
    } else {
        (t.year(), t.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1)?.and_hms_opt(0, 0, 0)
}

/// Iterator over successive activation times, produced by
/// [`Schedule::upcoming`].
pub struct Upcoming<Tz: TimeZone> {
    schedule: Schedule,
    cursor: DateTime<Tz>,
}

impl<Tz: TimeZone> Iterator for Upcoming<Tz> {
    type Item = DateTime<Tz>;

    fn next(&mut self) -> Option<Self::Item> {
        let next = self.schedule.next(&self.cursor)?;
        self.cursor = next.clone();
        Some(next)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDateTime, TimeZone, Utc};
    use chrono_tz::US::Eastern;

    use super::super::Schedule;

    fn when(value: &str) -> chrono::DateTime<Utc> {
        NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
            .unwrap_or_else(|_| panic!("bad test time: {value}"))
            .and_utc()
    }

    fn next_from(expression: &str, after: &str) -> Option<String> {
        let schedule = Schedule::parse(expression).unwrap();
        schedule
            .next(&when(after))
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
    }

    /// A schedule "matches" an instant when probing one second earlier
    /// lands exactly on it.
    fn matches(expression: &str, at: &str) -> bool {
        let schedule = Schedule::parse(expression).unwrap();
        let at = when(at);
        schedule.next(&(at - chrono::Duration::seconds(1))) == Some(at)
    }

    #[test]
    fn advances_to_the_next_minute_mask_hit() {
        for after in ["2012-07-09 14:45:00", "2012-07-09 14:59:00", "2012-07-09 14:59:59"] {
            assert_eq!(
                next_from("0 0/15 * * * *", after).as_deref(),
                Some("2012-07-09 15:00:00"),
                "{after}"
            );
        }
    }

    #[test]
    fn wraps_the_hour() {
        assert_eq!(
            next_from("0 20-35/15 * * * *", "2012-07-09 15:45:00").as_deref(),
            Some("2012-07-09 16:20:00")
        );
    }

    #[test]
    fn wraps_the_day() {
        assert_eq!(
            next_from("0 */15 * * * *", "2012-07-09 23:46:00").as_deref(),
            Some("2012-07-10 00:00:00")
        );
        assert_eq!(
            next_from("0 20-35/15 * * * *", "2012-07-09 23:45:00").as_deref(),
            Some("2012-07-10 00:20:00")
        );
        assert_eq!(
            next_from("15/35 20-35/15 * * * *", "2012-07-09 23:35:51").as_deref(),
            Some("2012-07-10 00:20:15")
        );
        assert_eq!(
            next_from("15/35 20-35/15 1/2 * * *", "2012-07-09 23:35:51").as_deref(),
            Some("2012-07-10 01:20:15")
        );
        assert_eq!(
            next_from("15/35 20-35/15 10-12 * * *", "2012-07-09 23:35:51").as_deref(),
            Some("2012-07-10 10:20:15")
        );
    }

    #[test]
    fn lower_fields_reset_once_a_higher_field_moves() {
        // Day advances to the 11th, so hour/minute/second restart at their
        // first allowed values rather than the probe's.
        assert_eq!(
            next_from("15/35 20-35/15 1/2 */2 * *", "2012-07-09 23:35:51").as_deref(),
            Some("2012-07-11 01:20:15")
        );
        assert_eq!(
            next_from("15/35 20-35/15 * 9-12 * *", "2012-07-09 23:35:51").as_deref(),
            Some("2012-07-10 00:20:15")
        );
        assert_eq!(
            next_from("15/35 20-35/15 * 9-12 Jul *", "2012-07-09 23:35:51").as_deref(),
            Some("2012-07-10 00:20:15")
        );
    }

    #[test]
    fn wraps_the_month() {
        assert_eq!(
            next_from("0 0 0 9 Apr-Oct *", "2012-07-09 23:35:00").as_deref(),
            Some("2012-08-09 00:00:00")
        );
        assert_eq!(
            next_from("0 0 0 */5 Apr,Aug,Oct Mon", "2012-07-09 23:35:00").as_deref(),
            Some("2012-08-06 00:00:00")
        );
        assert_eq!(
            next_from("0 0 0 */5 Oct Mon", "2012-07-09 23:35:00").as_deref(),
            Some("2012-10-01 00:00:00")
        );
    }

    #[test]
    fn wraps_the_year() {
        assert_eq!(
            next_from("0 0 0 * Feb Mon", "2012-07-09 23:35:00").as_deref(),
            Some("2013-02-04 00:00:00")
        );
        // A stepped weekday range reaching 7 picks up Sunday as 0 too;
        // Feb 1 2013 is a Friday, the first hit of Sun/Mon/Wed/Fri.
        assert_eq!(
            next_from("0 0 0 * Feb Mon/2", "2012-07-09 23:35:00").as_deref(),
            Some("2013-02-01 00:00:00")
        );
        // Every field wraps at once.
        assert_eq!(
            next_from("0 * * * * *", "2012-12-31 23:59:45").as_deref(),
            Some("2013-01-01 00:00:00")
        );
    }

    #[test]
    fn leap_day_resolves_to_the_next_leap_year() {
        assert_eq!(
            next_from("0 0 0 29 Feb *", "2012-07-09 23:35:00").as_deref(),
            Some("2016-02-29 00:00:00")
        );
    }

    #[test]
    fn impossible_dates_never_fire() {
        assert_eq!(next_from("0 0 0 30 Feb *", "2012-07-09 23:35:00"), None);
        assert_eq!(next_from("0 0 0 31 Apr *", "2012-07-09 23:35:00"), None);
        assert_eq!(next_from("0 0 0 31 9 *", "2012-07-09 23:35:00"), None);
    }

    #[test]
    fn gives_up_beyond_the_five_year_horizon() {
        // The next Feb 29 after 2097 is 2104 (2100 is not a leap year),
        // which lies past the horizon.
        let schedule = Schedule::parse("0 0 0 29 Feb *").unwrap();
        assert_eq!(schedule.next(&when("2097-03-01 00:00:00")), None);
    }

    #[test]
    fn next_is_strictly_in_the_future() {
        let schedule = Schedule::parse("* * * * * *").unwrap();
        let at = when("2012-07-09 14:45:00");
        assert_eq!(schedule.next(&at), Some(when("2012-07-09 14:45:01")));

        // Sub-second probes round up to the next whole second.
        let probe = at + chrono::Duration::milliseconds(300);
        assert_eq!(schedule.next(&probe), Some(when("2012-07-09 14:45:01")));
    }

    #[test]
    fn matches_quarter_hours() {
        assert!(matches("0 0/15 * * * *", "2012-07-09 15:00:00"));
        assert!(matches("0 0/15 * * * *", "2012-07-09 15:45:00"));
        assert!(!matches("0 0/15 * * * *", "2012-07-09 15:40:00"));
        assert!(matches("0 5/15 * * * *", "2012-07-09 15:05:00"));
        assert!(matches("0 5/15 * * * *", "2012-07-09 15:50:00"));
    }

    #[test]
    fn matches_named_months() {
        assert!(matches("0 0/15 * * Jul *", "2012-07-15 15:00:00"));
        assert!(!matches("0 0/15 * * Jun *", "2012-07-15 15:00:00"));
    }

    #[test]
    fn explicit_day_fields_match_as_a_union() {
        // 2012-07-15 was a Sunday; 2012-06-15 a Friday; 2012-08-01 a Wednesday.
        assert!(matches("0 0 * 1,15 * Sun", "2012-07-15 00:00:00"));
        assert!(matches("0 0 * 1,15 * Sun", "2012-06-15 00:00:00"));
        assert!(matches("0 0 * 1,15 * Sun", "2012-08-01 00:00:00"));
    }

    #[test]
    fn a_starred_day_field_demands_both_match() {
        assert!(!matches("0 * * * * Mon", "2012-07-15 00:00:00"));
        assert!(!matches("0 * * */10 * Sun", "2012-07-15 00:00:00"));
        assert!(!matches("0 * * 1,15 * *", "2012-07-09 00:00:00"));
        assert!(matches("0 * * 1,15 * *", "2012-07-15 00:00:00"));
        assert!(matches("0 * * */2 * Sun", "2012-07-15 00:00:00"));
    }

    #[test]
    fn question_mark_keeps_the_union_rule() {
        // With `*` on day-of-week the day list pins the day...
        assert_eq!(
            next_from("0 0 0 1,15 * *", "2012-07-08 23:00:00").as_deref(),
            Some("2012-07-15 00:00:00")
        );
        // ...while `?` declares the weekday axis "don't care", restoring
        // either-field matching.
        assert_eq!(
            next_from("0 0 0 1,15 * ?", "2012-07-08 23:00:00").as_deref(),
            Some("2012-07-09 00:00:00")
        );
    }

    #[test]
    fn spring_forward_gap_skips_to_the_next_occurrence() {
        // 02:30 local did not exist on 2012-03-11 in the US Eastern zone.
        let schedule = Schedule::parse("0 30 2 11 Mar *").unwrap();
        let after = Eastern.with_ymd_and_hms(2012, 3, 11, 0, 0, 0).unwrap();
        assert_eq!(
            schedule.next(&after),
            Some(Eastern.with_ymd_and_hms(2013, 3, 11, 2, 30, 0).unwrap())
        );
    }

    #[test]
    fn fall_back_fold_resolves_to_the_earlier_instant() {
        // 01:30 local happened twice on 2012-11-04; the first pass (EDT,
        // UTC-4) wins.
        let schedule = Schedule::parse("0 30 1 4 Nov *").unwrap();
        let after = Eastern.with_ymd_and_hms(2012, 11, 4, 0, 0, 0).unwrap();
        let next = schedule.next(&after).unwrap();
        assert_eq!(
            next.with_timezone(&Utc),
            Utc.with_ymd_and_hms(2012, 11, 4, 5, 30, 0).unwrap()
        );
    }

    #[test]
    fn upcoming_yields_successive_activations() {
        let schedule = Schedule::parse("0 */20 * * * *").unwrap();
        let times: Vec<String> = schedule
            .upcoming(when("2012-07-09 14:45:00"))
            .take(3)
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .collect();
        assert_eq!(
            times,
            ["2012-07-09 15:00:00", "2012-07-09 15:20:00", "2012-07-09 15:40:00"]
        );
    }

    #[test]
    fn upcoming_is_empty_for_schedules_that_never_fire() {
        let schedule = Schedule::parse("0 0 0 30 Feb *").unwrap();
        assert_eq!(schedule.upcoming(when("2012-07-09 14:45:00")).count(), 0);
    }
}
