//! Display helpers: relative dates, durations, zodiac signs and birthdays.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Formats a date relative to `today`
///
/// `Today`, `Yesterday` or `Tomorrow` when adjacent, `Mon, Jun 3` within the
/// same year, and `Jun 3, 2023` otherwise.
pub fn format_date(date: NaiveDate, today: NaiveDate) -> String {
    match (date - today).num_days() {
        0 => "Today".to_string(),
        -1 => "Yesterday".to_string(),
        1 => "Tomorrow".to_string(),
        _ if date.year() == today.year() => date.format("%a, %b %-d").to_string(),
        _ => date.format("%b %-d, %Y").to_string(),
    }
}

/// `m:ss` below an hour, `h:mm:ss` from an hour on; negative input counts as zero
pub fn format_duration(total_seconds: i64) -> String {
    let total = total_seconds.max(0);
    let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZodiacSign {
    Aries,
    Taurus,
    Gemini,
    Cancer,
    Leo,
    Virgo,
    Libra,
    Scorpio,
    Sagittarius,
    Capricorn,
    Aquarius,
    Pisces,
}

/// First day of each sign as (month, day), in calendar order
const SIGN_STARTS: [(u32, u32, ZodiacSign); 12] = [
    (1, 20, ZodiacSign::Aquarius),
    (2, 19, ZodiacSign::Pisces),
    (3, 21, ZodiacSign::Aries),
    (4, 20, ZodiacSign::Taurus),
    (5, 21, ZodiacSign::Gemini),
    (6, 21, ZodiacSign::Cancer),
    (7, 23, ZodiacSign::Leo),
    (8, 23, ZodiacSign::Virgo),
    (9, 23, ZodiacSign::Libra),
    (10, 23, ZodiacSign::Scorpio),
    (11, 22, ZodiacSign::Sagittarius),
    (12, 22, ZodiacSign::Capricorn),
];

impl ZodiacSign {
    pub fn name(&self) -> &'static str {
        match self {
            ZodiacSign::Aries => "Aries",
            ZodiacSign::Taurus => "Taurus",
            ZodiacSign::Gemini => "Gemini",
            ZodiacSign::Cancer => "Cancer",
            ZodiacSign::Leo => "Leo",
            ZodiacSign::Virgo => "Virgo",
            ZodiacSign::Libra => "Libra",
            ZodiacSign::Scorpio => "Scorpio",
            ZodiacSign::Sagittarius => "Sagittarius",
            ZodiacSign::Capricorn => "Capricorn",
            ZodiacSign::Aquarius => "Aquarius",
            ZodiacSign::Pisces => "Pisces",
        }
    }

    pub fn symbol(&self) -> char {
        match self {
            ZodiacSign::Aries => '♈',
            ZodiacSign::Taurus => '♉',
            ZodiacSign::Gemini => '♊',
            ZodiacSign::Cancer => '♋',
            ZodiacSign::Leo => '♌',
            ZodiacSign::Virgo => '♍',
            ZodiacSign::Libra => '♎',
            ZodiacSign::Scorpio => '♏',
            ZodiacSign::Sagittarius => '♐',
            ZodiacSign::Capricorn => '♑',
            ZodiacSign::Aquarius => '♒',
            ZodiacSign::Pisces => '♓',
        }
    }
}

impl fmt::Display for ZodiacSign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The tropical zodiac sign for a birthday
pub fn zodiac_sign(date: NaiveDate) -> ZodiacSign {
    let key = (date.month(), date.day());
    SIGN_STARTS
        .iter()
        .rev()
        .find(|(month, day, _)| key >= (*month, *day))
        .map(|(_, _, sign)| *sign)
        // Jan 1 to Jan 19
        .unwrap_or(ZodiacSign::Capricorn)
}

/// Completed years between `birthday` and `today`; `None` for a future birthday
///
/// A Feb 29 birthday is reached on Feb 28 in common years, as in [`next_birthday`].
pub fn age_on(birthday: NaiveDate, today: NaiveDate) -> Option<u32> {
    if birthday > today {
        return None;
    }
    let years = u32::try_from(today.year() - birthday.year()).ok()?;
    match birthday_in(birthday, today.year()) {
        Some(this_year) if today < this_year => Some(years - 1),
        _ => Some(years),
    }
}

/// The birthday's date in `year`; Feb 29 falls on Feb 28 in common years
fn birthday_in(birthday: NaiveDate, year: i32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, birthday.month(), birthday.day())
        .or_else(|| NaiveDate::from_ymd_opt(year, 2, 28))
}

/// The next occurrence of a birthday on or after `today`
pub fn next_birthday(birthday: NaiveDate, today: NaiveDate) -> Option<NaiveDate> {
    let this_year = birthday_in(birthday, today.year())?;
    if this_year >= today {
        Some(this_year)
    } else {
        birthday_in(birthday, today.year() + 1)
    }
}

/// Days from `today` to `date`; negative when `date` is past
pub fn days_until(date: NaiveDate, today: NaiveDate) -> i64 {
    (date - today).num_days()
}
