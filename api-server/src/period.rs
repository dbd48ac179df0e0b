//! Leaderboard time windows.
//!
//! Windows open at local midnight in a fixed UTC+09:00 zone with no daylight
//! saving, regardless of where the server runs.

use chrono::{DateTime, Datelike, Days, FixedOffset, NaiveDate, Offset, TimeZone, Utc};

pub(crate) const REFERENCE_UTC_OFFSET_SECS: i32 = 9 * 60 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Period {
    Daily,
    Weekly,
    Monthly,
    AllTime,
}

impl Period {
    /// Unknown or missing tags select the all-time board.
    pub(crate) fn from_tag(tag: Option<&str>) -> Self {
        match tag {
            Some("DAILY") => Self::Daily,
            Some("WEEKLY") => Self::Weekly,
            Some("MONTHLY") => Self::Monthly,
            _ => Self::AllTime,
        }
    }

    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "DAILY",
            Self::Weekly => "WEEKLY",
            Self::Monthly => "MONTHLY",
            Self::AllTime => "ALL_TIME",
        }
    }

    /// Start of the window containing `now`; `None` for the all-time board.
    pub(crate) fn window_start(self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let zone = reference_zone();
        let today = now.with_timezone(&zone).date_naive();
        let first_day = match self {
            Self::Daily => today,
            Self::Weekly => {
                today.checked_sub_days(Days::new(u64::from(today.weekday().num_days_from_sunday())))?
            }
            Self::Monthly => today.with_day(1)?,
            Self::AllTime => return None,
        };
        local_midnight(first_day, zone)
    }

    /// Window start as unix seconds, 0 for the all-time board.
    pub(crate) fn window_start_unix_s(self, now: DateTime<Utc>) -> u64 {
        self.window_start(now)
            .map(|start| start.timestamp().max(0) as u64)
            .unwrap_or(0)
    }
}

fn reference_zone() -> FixedOffset {
    FixedOffset::east_opt(REFERENCE_UTC_OFFSET_SECS).unwrap_or_else(|| Utc.fix())
}

fn local_midnight(date: NaiveDate, zone: FixedOffset) -> Option<DateTime<Utc>> {
    let midnight = date.and_hms_opt(0, 0, 0)?;
    zone.from_local_datetime(&midnight)
        .single()
        .map(|local| local.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jst(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Utc> {
        reference_zone()
            .with_ymd_and_hms(y, m, d, h, min, s)
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn tags_parse() {
        assert_eq!(Period::from_tag(Some("DAILY")), Period::Daily);
        assert_eq!(Period::from_tag(Some("WEEKLY")), Period::Weekly);
        assert_eq!(Period::from_tag(Some("MONTHLY")), Period::Monthly);
        assert_eq!(Period::from_tag(Some("daily")), Period::AllTime);
        assert_eq!(Period::from_tag(None), Period::AllTime);
    }

    #[test]
    fn windows_for_saturday_just_after_midnight() {
        // 2024-11-16 is a Saturday; in UTC it is still the 15th.
        let now = jst(2024, 11, 16, 1, 2, 3);
        assert_eq!(now.day(), 15);

        assert_eq!(Period::Daily.window_start(now), Some(jst(2024, 11, 16, 0, 0, 0)));
        assert_eq!(Period::Weekly.window_start(now), Some(jst(2024, 11, 10, 0, 0, 0)));
        assert_eq!(Period::Monthly.window_start(now), Some(jst(2024, 11, 1, 0, 0, 0)));
        assert_eq!(Period::AllTime.window_start(now), None);
        assert_eq!(Period::AllTime.window_start_unix_s(now), 0);
    }

    #[test]
    fn weekly_window_on_sunday_starts_today() {
        let now = jst(2024, 11, 17, 23, 59, 59);
        assert_eq!(Period::Weekly.window_start(now), Some(jst(2024, 11, 17, 0, 0, 0)));
    }

    #[test]
    fn weekly_window_crosses_month_boundary() {
        // Tuesday 2024-10-01; the week began on Sunday 2024-09-29.
        let now = jst(2024, 10, 1, 12, 0, 0);
        assert_eq!(Period::Weekly.window_start(now), Some(jst(2024, 9, 29, 0, 0, 0)));
    }

    #[test]
    fn daily_window_unix_seconds() {
        let now = jst(2024, 11, 16, 1, 2, 3);
        // 2024-11-15T15:00:00Z
        assert_eq!(Period::Daily.window_start_unix_s(now), 1_731_682_800);
    }
}
