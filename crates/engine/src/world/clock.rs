//! In-game calendar and time of day.
//!
//! One game minute passes every 500 ms of simulated time, scaled by the clock's
//! timescale. Days are a plain index: thirty days per season, four seasons per year.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use super::timer::scale_duration;

pub const MILLIS_PER_GAME_MINUTE: u64 = 500;
pub const MINUTES_PER_DAY: u32 = 24 * 60;
pub const DAYS_PER_SEASON: u32 = 30;
pub const DAYS_PER_YEAR: u32 = DAYS_PER_SEASON * 4;
/// Fastest accepted clock speed: one game day per 720 ms of simulated time.
pub const MAX_TIMESCALE: f32 = 1000.0;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TimeError {
    #[error("invalid hour \"{0}\"; expected HH:MM, H:MM AM/PM, or MIDNIGHT/DAWN/NOON/DUSK")]
    InvalidHour(String),
    #[error("timescale must be between 0 and 1000, got {0}")]
    InvalidTimescale(f32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Hour {
    hour: u8,
    minute: u8,
}

impl Hour {
    pub const MIDNIGHT: Hour = Hour { hour: 0, minute: 0 };
    pub const DAWN: Hour = Hour { hour: 6, minute: 0 };
    pub const NOON: Hour = Hour { hour: 12, minute: 0 };
    pub const DUSK: Hour = Hour { hour: 18, minute: 0 };

    pub fn new(hour: u8, minute: u8) -> Option<Self> {
        (hour < 24 && minute < 60).then_some(Self { hour, minute })
    }

    pub fn hour(self) -> u8 {
        self.hour
    }

    pub fn minute(self) -> u8 {
        self.minute
    }

    pub fn minutes_since_midnight(self) -> u32 {
        self.hour as u32 * 60 + self.minute as u32
    }

    pub fn from_minutes(minutes: u32) -> Self {
        let minutes = minutes % MINUTES_PER_DAY;
        Self {
            hour: (minutes / 60) as u8,
            minute: (minutes % 60) as u8,
        }
    }
}

impl FromStr for Hour {
    type Err = TimeError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        let invalid = || TimeError::InvalidHour(raw.to_string());

        match trimmed.to_ascii_uppercase().as_str() {
            "MIDNIGHT" => return Ok(Hour::MIDNIGHT),
            "DAWN" => return Ok(Hour::DAWN),
            "NOON" => return Ok(Hour::NOON),
            "DUSK" => return Ok(Hour::DUSK),
            _ => {}
        }

        let (hour_text, rest) = trimmed.split_once(':').ok_or_else(invalid)?;
        let rest = rest.trim();
        let minute_text = rest.get(..2).ok_or_else(invalid)?;
        let meridiem = rest.get(2..).map(str::trim).unwrap_or_default();

        let hour: u8 = hour_text.trim().parse().map_err(|_| invalid())?;
        let minute: u8 = minute_text.parse().map_err(|_| invalid())?;

        let hour = match meridiem.to_ascii_uppercase().as_str() {
            "" => hour,
            "AM" if (1..=12).contains(&hour) => hour % 12,
            "PM" if (1..=12).contains(&hour) => hour % 12 + 12,
            _ => return Err(invalid()),
        };

        Hour::new(hour, minute).ok_or_else(invalid)
    }
}

impl fmt::Display for Hour {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Season {
    Spring,
    Summer,
    Fall,
    Winter,
}

impl Season {
    pub const ALL: [Season; 4] = [Season::Spring, Season::Summer, Season::Fall, Season::Winter];

    pub const fn as_str(self) -> &'static str {
        match self {
            Season::Spring => "spring",
            Season::Summer => "summer",
            Season::Fall => "fall",
            Season::Winter => "winter",
        }
    }

    const fn bit(self) -> u8 {
        match self {
            Season::Spring => 0b0001,
            Season::Summer => 0b0010,
            Season::Fall => 0b0100,
            Season::Winter => 0b1000,
        }
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bitmask of seasons, used to show render layers only in some parts of the year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Seasons(u8);

impl Seasons {
    pub const fn empty() -> Self {
        Seasons(0)
    }

    pub const fn all() -> Self {
        Seasons(0b1111)
    }

    pub fn with(self, season: Season) -> Self {
        Seasons(self.0 | season.bit())
    }

    pub fn contains(self, season: Season) -> bool {
        self.0 & season.bit() != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Every season name that appears anywhere in `raw` (case-insensitive) is included,
    /// so "Spring, Summer" and "spring|summer" parse the same.
    pub fn parse(raw: &str) -> Self {
        let lowered = raw.to_ascii_lowercase();
        Season::ALL
            .into_iter()
            .filter(|season| lowered.contains(season.as_str()))
            .fold(Seasons::empty(), Seasons::with)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Weekday {
    Sunday,
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
}

impl Weekday {
    const ORDER: [Weekday; 7] = [
        Weekday::Sunday,
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
        Weekday::Saturday,
    ];

    pub const fn short_name(self) -> &'static str {
        match self {
            Weekday::Sunday => "Sun",
            Weekday::Monday => "Mon",
            Weekday::Tuesday => "Tue",
            Weekday::Wednesday => "Wed",
            Weekday::Thursday => "Thu",
            Weekday::Friday => "Fri",
            Weekday::Saturday => "Sat",
        }
    }
}

/// Day index since the start of the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Date(u32);

impl Date {
    pub const fn new(day_index: u32) -> Self {
        Date(day_index)
    }

    pub fn day_index(self) -> u32 {
        self.0
    }

    pub fn season(self) -> Season {
        Season::ALL[(self.0 / DAYS_PER_SEASON % 4) as usize]
    }

    pub fn day_of_month(self) -> u32 {
        self.0 % DAYS_PER_SEASON + 1
    }

    pub fn year(self) -> u32 {
        self.0 / DAYS_PER_YEAR + 1
    }

    pub fn weekday(self) -> Weekday {
        Weekday::ORDER[(self.0 % 7) as usize]
    }

    pub fn plus_days(self, days: u32) -> Self {
        Date(self.0.saturating_add(days))
    }
}

impl fmt::Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}, Y{}",
            self.weekday().short_name(),
            self.season(),
            self.day_of_month(),
            self.year()
        )
    }
}

/// Read-only view of the clock for scripted waits and tinting.
pub trait ClockQuery {
    fn hour(&self) -> Hour;
    fn date(&self) -> Date;
}

#[derive(Debug, Clone)]
pub struct GameClock {
    hour: Hour,
    date: Date,
    timescale: f32,
    carry: Duration,
}

impl Default for GameClock {
    fn default() -> Self {
        Self::at(Date::default(), Hour::DAWN)
    }
}

impl GameClock {
    pub fn at(date: Date, hour: Hour) -> Self {
        Self {
            hour,
            date,
            timescale: 1.0,
            carry: Duration::ZERO,
        }
    }

    pub fn timescale(&self) -> f32 {
        self.timescale
    }

    pub fn set_timescale(&mut self, timescale: f32) -> Result<(), TimeError> {
        if !(0.0..=MAX_TIMESCALE).contains(&timescale) {
            return Err(TimeError::InvalidTimescale(timescale));
        }
        self.timescale = timescale;
        Ok(())
    }

    pub fn is_paused(&self) -> bool {
        self.timescale == 0.0
    }

    /// Feeds simulated time into the clock and returns how many game minutes passed.
    pub fn advance(&mut self, dt: Duration) -> u32 {
        if self.is_paused() {
            return 0;
        }
        self.carry = self
            .carry
            .saturating_add(scale_duration(dt, self.timescale));
        let minute = Duration::from_millis(MILLIS_PER_GAME_MINUTE);
        let minutes = (self.carry.as_millis() / minute.as_millis()).min(u32::MAX as u128) as u32;
        self.carry = self.carry.saturating_sub(minute * minutes);
        self.add_minutes(minutes);
        minutes
    }

    /// Moves the clock forward; every midnight crossed rolls the date.
    pub fn add_minutes(&mut self, minutes: u32) {
        let total = self.hour.minutes_since_midnight() as u64 + minutes as u64;
        let days = (total / MINUTES_PER_DAY as u64) as u32;
        self.hour = Hour::from_minutes((total % MINUTES_PER_DAY as u64) as u32);
        self.date = self.date.plus_days(days);
    }

    /// Jumps forward to the next occurrence of `hour`, rolling into tomorrow when
    /// that hour has already passed today.
    pub fn skip_to(&mut self, hour: Hour) {
        let now = self.hour.minutes_since_midnight();
        let target = hour.minutes_since_midnight();
        let delta = if target >= now {
            target - now
        } else {
            MINUTES_PER_DAY - now + target
        };
        self.add_minutes(delta);
    }

    pub fn set_date(&mut self, date: Date) {
        self.date = date;
    }
}

impl ClockQuery for GameClock {
    fn hour(&self) -> Hour {
        self.hour
    }

    fn date(&self) -> Date {
        self.date
    }
}

const COLOR_SUNRISE: [u8; 4] = [255, 102, 0, 64];
const COLOR_DAY: [u8; 4] = [255, 255, 255, 0];
const COLOR_SUNSET: [u8; 4] = [255, 102, 0, 64];
const COLOR_NIGHT: [u8; 4] = [32, 16, 64, 102];

struct TintPeriod {
    start: u32,
    end: u32,
    from: [u8; 4],
    to: [u8; 4],
}

const TINT_PERIODS: [TintPeriod; 5] = [
    TintPeriod {
        start: 5 * 60,
        end: 6 * 60 + 30,
        from: COLOR_NIGHT,
        to: COLOR_SUNRISE,
    },
    TintPeriod {
        start: 6 * 60 + 30,
        end: 8 * 60,
        from: COLOR_SUNRISE,
        to: COLOR_DAY,
    },
    TintPeriod {
        start: 8 * 60,
        end: 17 * 60,
        from: COLOR_DAY,
        to: COLOR_DAY,
    },
    TintPeriod {
        start: 17 * 60,
        end: 18 * 60 + 30,
        from: COLOR_DAY,
        to: COLOR_SUNSET,
    },
    TintPeriod {
        start: 18 * 60 + 30,
        end: 20 * 60,
        from: COLOR_SUNSET,
        to: COLOR_NIGHT,
    },
];

/// Full-screen overlay color for the time of day.
pub fn tint_color(hour: Hour) -> [u8; 4] {
    let minutes = hour.minutes_since_midnight();
    let Some(period) = TINT_PERIODS
        .iter()
        .find(|period| minutes >= period.start && minutes < period.end)
    else {
        return COLOR_NIGHT;
    };
    if period.from == period.to {
        return period.from;
    }

    let t = (minutes - period.start) as f32 / (period.end - period.start) as f32;
    let mut color = [0u8; 4];
    for (channel, out) in color.iter_mut().enumerate() {
        let a = (period.from[channel] as f32 * (1.0 - t)) as u8;
        let b = (period.to[channel] as f32 * t) as u8;
        *out = a.saturating_add(b);
    }
    color
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hour(raw: &str) -> Hour {
        raw.parse().expect("hour should parse")
    }

    #[test]
    fn parses_twenty_four_hour_and_meridiem_forms() {
        assert_eq!(hour("07:45"), Hour::new(7, 45).expect("valid"));
        assert_eq!(hour("7:45 PM"), Hour::new(19, 45).expect("valid"));
        assert_eq!(hour("12:00 AM"), Hour::MIDNIGHT);
        assert_eq!(hour("12:30 pm"), Hour::new(12, 30).expect("valid"));
        assert_eq!(hour("dusk"), Hour::DUSK);
    }

    #[test]
    fn rejects_malformed_hours() {
        for raw in ["", "25:00", "7:61", "13:00 PM", "0:10 AM", "noonish", "7"] {
            assert!(raw.parse::<Hour>().is_err(), "{raw} should be rejected");
        }
    }

    #[test]
    fn hours_order_by_time_of_day() {
        assert!(Hour::DAWN < Hour::NOON);
        assert!(hour("11:59") < Hour::NOON);
        assert!(Hour::DUSK >= hour("18:00"));
    }

    #[test]
    fn date_fields_follow_day_index() {
        let date = Date::new(125);
        assert_eq!(date.year(), 2);
        assert_eq!(date.season(), Season::Spring);
        assert_eq!(date.day_of_month(), 6);
        assert_eq!(date.weekday(), Weekday::Saturday);
        assert_eq!(Date::new(95).season(), Season::Winter);
    }

    #[test]
    fn seasons_parse_by_substring() {
        let seasons = Seasons::parse("Spring, FALL");
        assert!(seasons.contains(Season::Spring));
        assert!(seasons.contains(Season::Fall));
        assert!(!seasons.contains(Season::Summer));
        assert!(Seasons::parse("rainy").is_empty());
    }

    #[test]
    fn clock_ticks_one_minute_per_half_second() {
        let mut clock = GameClock::default();
        assert_eq!(clock.advance(Duration::from_millis(1250)), 2);
        assert_eq!(clock.hour(), hour("06:02"));
        assert_eq!(clock.advance(Duration::from_millis(250)), 1);
        assert_eq!(clock.hour(), hour("06:03"));
    }

    #[test]
    fn timescale_zero_pauses_and_negative_is_rejected() {
        let mut clock = GameClock::default();
        clock.set_timescale(0.0).expect("zero is valid");
        assert_eq!(clock.advance(Duration::from_secs(60)), 0);
        assert_eq!(clock.hour(), Hour::DAWN);
        assert_eq!(
            clock.set_timescale(-1.0),
            Err(TimeError::InvalidTimescale(-1.0))
        );
    }

    #[test]
    fn timescale_above_the_bound_is_rejected() {
        let mut clock = GameClock::default();
        assert_eq!(
            clock.set_timescale(1.0e30),
            Err(TimeError::InvalidTimescale(1.0e30))
        );
        assert_eq!(clock.timescale(), 1.0);
        assert!(clock.set_timescale(f32::NAN).is_err());

        clock.set_timescale(MAX_TIMESCALE).expect("bound is inclusive");
        assert_eq!(clock.advance(Duration::from_millis(16)), 32);
        assert_eq!(clock.hour(), hour("06:32"));
    }

    #[test]
    fn crossing_midnight_rolls_the_date() {
        let mut clock = GameClock::at(Date::new(3), hour("23:58"));
        clock.add_minutes(5);
        assert_eq!(clock.hour(), hour("00:03"));
        assert_eq!(clock.date(), Date::new(4));

        let mut clock = GameClock::at(Date::new(3), hour("23:59"));
        clock.advance(Duration::from_millis(MILLIS_PER_GAME_MINUTE));
        assert_eq!(clock.date(), Date::new(4));
    }

    #[test]
    fn skip_to_earlier_hour_rolls_into_tomorrow() {
        let mut clock = GameClock::at(Date::new(0), Hour::DUSK);
        clock.skip_to(Hour::DAWN);
        assert_eq!(clock.hour(), Hour::DAWN);
        assert_eq!(clock.date(), Date::new(1));

        clock.skip_to(Hour::NOON);
        assert_eq!(clock.date(), Date::new(1));
    }

    #[test]
    fn tint_follows_day_night_periods() {
        assert_eq!(tint_color(Hour::NOON), COLOR_DAY);
        assert_eq!(tint_color(Hour::MIDNIGHT), COLOR_NIGHT);
        assert_eq!(tint_color(hour("06:30")), COLOR_SUNRISE);
        assert_eq!(tint_color(hour("20:00")), COLOR_NIGHT);

        let halfway = tint_color(hour("07:15"));
        assert_eq!(halfway[3], 32);
    }
}
