use chrono::{DateTime, Datelike, Days, Duration, Months, NaiveDate, NaiveTime, TimeZone};

/// Date stamp used in exported file names.
pub fn date_to_file_stamp(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Returns the first instant of `date` in `tz`. When midnight itself is skipped by a DST
/// transition the first existing hour of that day is used instead.
pub fn local_midnight<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> DateTime<Tz> {
    let midnight = date.and_time(NaiveTime::MIN);
    (0..=3)
        .find_map(|hours| {
            tz.from_local_datetime(&(midnight + Duration::hours(hours)))
                .earliest()
        })
        .unwrap_or_else(|| tz.from_utc_datetime(&midnight))
}

/// Monday of the ISO week containing `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Days::new(date.weekday().num_days_from_monday() as u64)
}

/// First day of the month `months_back` months before the one containing `date`.
pub fn month_start(date: NaiveDate, months_back: u32) -> NaiveDate {
    let first = date - Days::new(date.day0() as u64);
    first - Months::new(months_back)
}

#[cfg(test)]
mod tests {
    use chrono::{FixedOffset, NaiveDate, TimeZone, Timelike, Utc};

    use super::{local_midnight, month_start, week_start};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn week_start_is_monday() {
        // 2024-04-07 is a Sunday, it belongs to the week that started on the 1st.
        assert_eq!(week_start(date(2024, 4, 7)), date(2024, 4, 1));
        assert_eq!(week_start(date(2024, 4, 1)), date(2024, 4, 1));
        assert_eq!(week_start(date(2024, 4, 3)), date(2024, 4, 1));
    }

    #[test]
    fn month_start_crosses_years() {
        assert_eq!(month_start(date(2024, 3, 31), 0), date(2024, 3, 1));
        assert_eq!(month_start(date(2024, 3, 31), 5), date(2023, 10, 1));
        assert_eq!(month_start(date(2024, 1, 15), 1), date(2023, 12, 1));
    }

    #[test]
    fn local_midnight_respects_offset() {
        let tz = FixedOffset::east_opt(3 * 3600).unwrap();
        let midnight = local_midnight(&tz, date(2024, 4, 5));
        assert_eq!(midnight.hour(), 0);
        assert_eq!(midnight.to_utc().hour(), 21);
    }

    #[test]
    fn local_midnight_skipped_by_dst_uses_first_hour() {
        // Clocks in Sao Paulo jumped from 00:00 straight to 01:00 on 2018-11-04.
        let tz = chrono_tz::America::Sao_Paulo;
        let start = local_midnight(&tz, date(2018, 11, 4));

        assert_eq!(start.hour(), 1);
        assert_eq!(start.date_naive(), date(2018, 11, 4));
        assert_eq!(
            start.to_utc(),
            Utc.with_ymd_and_hms(2018, 11, 4, 3, 0, 0).unwrap()
        );
    }
}
