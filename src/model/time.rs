// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, TimeZone, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::PackedTimeParseError;

/// A broken-down calendar timestamp with its auxiliary fields.
///
/// All nine fields are kept exactly as they were produced or loaded. Nothing
/// here normalizes or cross-checks them, so a value read from disk is written
/// back byte for byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PackedTime {
    #[serde(rename = "tm_year")]
    pub year: i32,
    /// Month of the year, 1-12
    #[serde(rename = "tm_mon")]
    pub month: i32,
    #[serde(rename = "tm_mday")]
    pub day: i32,
    #[serde(rename = "tm_hour")]
    pub hour: i32,
    #[serde(rename = "tm_min")]
    pub minute: i32,
    #[serde(rename = "tm_sec")]
    pub second: i32,
    /// Day of the week, Monday = 0
    #[serde(rename = "tm_wday")]
    pub weekday: i32,
    /// Day of the year, 1-366
    #[serde(rename = "tm_yday")]
    pub yearday: i32,
    /// 1 = DST in effect, 0 = not, -1 = unknown
    #[serde(rename = "tm_isdst")]
    pub is_dst: i32,
}

const FIELD_COUNT: usize = 9;

impl PackedTime {
    /// Break a timestamp down into UTC calendar fields
    pub fn from_datetime<Tz: TimeZone>(dt: &DateTime<Tz>) -> Self {
        let utc = dt.with_timezone(&Utc);
        Self {
            year: utc.year(),
            month: utc.month() as i32,
            day: utc.day() as i32,
            hour: utc.hour() as i32,
            minute: utc.minute() as i32,
            second: utc.second() as i32,
            weekday: utc.weekday().num_days_from_monday() as i32,
            yearday: utc.ordinal() as i32,
            is_dst: 0,
        }
    }

    /// The calendar moment these fields describe, if they describe one.
    ///
    /// Only year, month, day, hour, minute and second are consulted.
    pub fn to_naive(&self) -> Option<NaiveDateTime> {
        NaiveDate::from_ymd_opt(
            self.year,
            u32::try_from(self.month).ok()?,
            u32::try_from(self.day).ok()?,
        )?
        .and_hms_opt(
            u32::try_from(self.hour).ok()?,
            u32::try_from(self.minute).ok()?,
            u32::try_from(self.second).ok()?,
        )
    }

    fn fields(&self) -> [i32; FIELD_COUNT] {
        [
            self.year,
            self.month,
            self.day,
            self.hour,
            self.minute,
            self.second,
            self.weekday,
            self.yearday,
            self.is_dst,
        ]
    }
}

/// Nine space-separated integers in field order
impl fmt::Display for PackedTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields = self.fields().map(|v| v.to_string());
        f.write_str(&fields.join(" "))
    }
}

impl FromStr for PackedTime {
    type Err = PackedTimeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || PackedTimeParseError {
            value: s.to_string(),
        };

        let values = s
            .split_whitespace()
            .map(|part| part.parse::<i32>().map_err(|_| invalid()))
            .collect::<Result<Vec<_>, _>>()?;

        let [
            year,
            month,
            day,
            hour,
            minute,
            second,
            weekday,
            yearday,
            is_dst,
        ] = <[i32; FIELD_COUNT]>::try_from(values).map_err(|_| invalid())?;

        Ok(Self {
            year,
            month,
            day,
            hour,
            minute,
            second,
            weekday,
            yearday,
            is_dst,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, FixedOffset};

    fn sample() -> PackedTime {
        PackedTime {
            year: 2024,
            month: 1,
            day: 15,
            hour: 12,
            minute: 30,
            second: 5,
            weekday: 0,
            yearday: 15,
            is_dst: 0,
        }
    }

    #[test]
    fn from_datetime_breaks_down_utc_fields() {
        let dt = DateTime::parse_from_rfc2822("Mon, 15 Jan 2024 12:30:05 +0000").unwrap();
        assert_eq!(PackedTime::from_datetime(&dt), sample());
    }

    #[test]
    fn from_datetime_converts_offsets_to_utc() {
        let dt = DateTime::parse_from_rfc2822("Mon, 01 Jan 2024 01:00:00 +0200").unwrap();
        let packed = PackedTime::from_datetime(&dt);

        assert_eq!(packed.year, 2023);
        assert_eq!(packed.month, 12);
        assert_eq!(packed.day, 31);
        assert_eq!(packed.hour, 23);
        assert_eq!(packed.weekday, 6);
        assert_eq!(packed.yearday, 365);
    }

    #[test]
    fn json_uses_struct_time_keys() {
        let json = serde_json::to_value(sample()).unwrap();

        assert_eq!(json["tm_year"], 2024);
        assert_eq!(json["tm_mon"], 1);
        assert_eq!(json["tm_mday"], 15);
        assert_eq!(json["tm_wday"], 0);
        assert_eq!(json["tm_yday"], 15);
        assert_eq!(json["tm_isdst"], 0);
    }

    #[test]
    fn unpack_of_pack_is_identity_across_many_timestamps() {
        let offset = FixedOffset::east_opt(5 * 3600 + 1800).unwrap();
        let start = offset.with_ymd_and_hms(1999, 12, 28, 0, 0, 0).unwrap();

        // Every 7 hours and 13 minutes for roughly six years, crossing leap days
        let mut dt = start;
        for _ in 0..7_500 {
            let packed = PackedTime::from_datetime(&dt);

            let via_json: PackedTime =
                serde_json::from_str(&serde_json::to_string(&packed).unwrap()).unwrap();
            assert_eq!(via_json, packed);

            let via_text: PackedTime = packed.to_string().parse().unwrap();
            assert_eq!(via_text, packed);

            assert_eq!(
                packed.to_naive(),
                Some(dt.with_timezone(&Utc).naive_utc())
            );

            dt += Duration::minutes(7 * 60 + 13);
        }
    }

    #[test]
    fn unpack_of_pack_keeps_unnormalized_fields() {
        let odd = [
            PackedTime {
                is_dst: -1,
                ..sample()
            },
            PackedTime {
                is_dst: 1,
                weekday: 6,
                yearday: 366,
                ..sample()
            },
            PackedTime {
                year: -44,
                month: 13,
                day: 0,
                hour: 25,
                minute: 61,
                second: 61,
                weekday: 9,
                yearday: 0,
                is_dst: 2,
            },
            PackedTime {
                year: i32::MAX,
                second: i32::MIN,
                ..sample()
            },
        ];

        for packed in odd {
            let via_json: PackedTime =
                serde_json::from_str(&serde_json::to_string(&packed).unwrap()).unwrap();
            assert_eq!(via_json, packed);

            let via_text: PackedTime = packed.to_string().parse().unwrap();
            assert_eq!(via_text, packed);
        }
    }

    #[test]
    fn to_naive_rejects_impossible_dates() {
        let impossible = PackedTime {
            month: 2,
            day: 30,
            ..sample()
        };
        assert!(impossible.to_naive().is_none());
    }

    #[test]
    fn parse_rejects_wrong_field_count() {
        assert!("2024 1 15".parse::<PackedTime>().is_err());
        assert!("2024 1 15 12 30 5 0 15 0 7".parse::<PackedTime>().is_err());
        assert!("2024 1 15 12 30 5 0 15 x".parse::<PackedTime>().is_err());
        assert!("".parse::<PackedTime>().is_err());
    }
}
