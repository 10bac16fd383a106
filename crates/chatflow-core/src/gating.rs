//! Gating policy: may this bot respond at all?
//!
//! Pure function of (settings, is_group, now). A rejection is a silent
//! no-op -- observable only as "message not handled" -- so everything
//! here logs at debug and returns a bool, never an error.

use chrono::{DateTime, Datelike, Timelike, Utc};
use chrono_tz::Tz;

use chatflow_types::bot::{Settings, WorkingHours};

/// Whether the bot is allowed to process a message arriving at `now`.
pub fn allows(settings: &Settings, is_group: bool, now: DateTime<Utc>) -> bool {
    if is_group && !settings.enable_in_groups {
        tracing::debug!("gating: group message and groups disabled");
        return false;
    }

    match &settings.working_hours {
        Some(hours) if hours.enabled => within_working_hours(hours, now),
        // Disabled or absent working hours means always open.
        _ => true,
    }
}

/// Evaluate the working-hours window in its configured timezone.
///
/// Unparseable windows fail open (same as an absent window) since
/// validation should have rejected them at save time; an unknown timezone
/// name falls back to UTC. Both log a warning.
fn within_working_hours(hours: &WorkingHours, now: DateTime<Utc>) -> bool {
    let (start, end) = match hours.window() {
        Ok(window) => window,
        Err(err) => {
            tracing::warn!(error = %err, "unparseable working-hours window, treating as open");
            return true;
        }
    };

    let tz: Tz = match hours.timezone.parse() {
        Ok(tz) => tz,
        Err(_) => {
            tracing::warn!(
                timezone = %hours.timezone,
                "unknown timezone, evaluating working hours in UTC"
            );
            chrono_tz::UTC
        }
    };

    let local = now.with_timezone(&tz);
    let weekday = local.weekday().num_days_from_sunday() as u8;
    if !hours.days.contains(&weekday) {
        tracing::debug!(weekday, "gating: outside working days");
        return false;
    }

    // Compare at minute granularity; the window is inclusive on both
    // ends. start > end means an overnight window (e.g. 22:00-06:00).
    let time = local.time().with_second(0).and_then(|t| t.with_nanosecond(0));
    let Some(time) = time else { return true };
    let open = if start <= end {
        time >= start && time <= end
    } else {
        time >= start || time <= end
    };
    if !open {
        tracing::debug!(time = %time, "gating: outside working hours");
    }
    open
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn hours(days: Vec<u8>, start: &str, end: &str, tz: &str) -> WorkingHours {
        WorkingHours {
            enabled: true,
            timezone: tz.to_string(),
            start: start.to_string(),
            end: end.to_string(),
            days,
        }
    }

    fn settings_with(hours: WorkingHours) -> Settings {
        Settings {
            enable_in_groups: true,
            enable_for_unknown: true,
            working_hours: Some(hours),
            fallback_message: None,
        }
    }

    #[test]
    fn test_group_message_rejected_when_groups_disabled() {
        let settings = Settings::default();
        assert!(!allows(&settings, true, Utc::now()));
        assert!(allows(&settings, false, Utc::now()));
    }

    #[test]
    fn test_absent_working_hours_is_always_open() {
        let settings = Settings {
            enable_in_groups: true,
            ..Default::default()
        };
        assert!(allows(&settings, true, Utc::now()));
    }

    #[test]
    fn test_saturday_outside_weekday_window() {
        // 2024-06-15 is a Saturday.
        let saturday = Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap();
        let settings = settings_with(hours(vec![1, 2, 3, 4, 5], "09:00", "17:00", "UTC"));
        assert!(!allows(&settings, false, saturday));
    }

    #[test]
    fn test_weekday_inside_window() {
        // 2024-06-12 is a Wednesday.
        let wednesday = Utc.with_ymd_and_hms(2024, 6, 12, 12, 30, 0).unwrap();
        let settings = settings_with(hours(vec![1, 2, 3, 4, 5], "09:00", "17:00", "UTC"));
        assert!(allows(&settings, false, wednesday));
    }

    #[test]
    fn test_window_bounds_inclusive() {
        let settings = settings_with(hours(vec![3], "09:00", "17:00", "UTC"));
        let at_open = Utc.with_ymd_and_hms(2024, 6, 12, 9, 0, 0).unwrap();
        let at_close = Utc.with_ymd_and_hms(2024, 6, 12, 17, 0, 30).unwrap();
        let after_close = Utc.with_ymd_and_hms(2024, 6, 12, 17, 1, 0).unwrap();
        assert!(allows(&settings, false, at_open));
        assert!(allows(&settings, false, at_close));
        assert!(!allows(&settings, false, after_close));
    }

    #[test]
    fn test_timezone_shifts_the_weekday() {
        // 2024-06-15 01:00 UTC is still Friday evening in Sao Paulo
        // (UTC-3), so a Mon-Fri bot there is open while a UTC bot is not.
        let instant = Utc.with_ymd_and_hms(2024, 6, 15, 1, 0, 0).unwrap();
        let sao_paulo = settings_with(hours(
            vec![1, 2, 3, 4, 5],
            "08:00",
            "23:00",
            "America/Sao_Paulo",
        ));
        assert!(allows(&sao_paulo, false, instant));

        let utc = settings_with(hours(vec![1, 2, 3, 4, 5], "08:00", "23:00", "UTC"));
        assert!(!allows(&utc, false, instant));
    }

    #[test]
    fn test_overnight_window_wraps() {
        let settings = settings_with(hours(vec![0, 1, 2, 3, 4, 5, 6], "22:00", "06:00", "UTC"));
        let late = Utc.with_ymd_and_hms(2024, 6, 12, 23, 0, 0).unwrap();
        let early = Utc.with_ymd_and_hms(2024, 6, 12, 5, 0, 0).unwrap();
        let midday = Utc.with_ymd_and_hms(2024, 6, 12, 12, 0, 0).unwrap();
        assert!(allows(&settings, false, late));
        assert!(allows(&settings, false, early));
        assert!(!allows(&settings, false, midday));
    }

    #[test]
    fn test_unknown_timezone_falls_back_to_utc() {
        let settings = settings_with(hours(vec![3], "09:00", "17:00", "Mars/Olympus_Mons"));
        let wednesday_noon = Utc.with_ymd_and_hms(2024, 6, 12, 12, 0, 0).unwrap();
        assert!(allows(&settings, false, wednesday_noon));
    }
}
