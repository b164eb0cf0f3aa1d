use std::fmt;

use crate::{decimal::Decimal, errors::IonError};

/// The most precise field a [`Timestamp`] carries.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Precision {
    Year,
    Month,
    Day,
    /// Hour and minute always travel together.
    Minute,
    Second,
    /// Seconds plus a fractional-second decimal.
    Fraction,
}

use Precision::*;

/// A point in time at a declared precision.
///
/// Fields hold the UTC values written on the wire; `offset` is the local offset in minutes,
/// `None` when unknown. Precision is part of the value, so a month-precision timestamp is
/// never equal to the first day of that month.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct Timestamp {
    precision: Precision,
    offset: Option<i32>,
    year: u16,
    month: u8,
    day: u8,
    hour: u8,
    minute: u8,
    second: u8,
    fraction: Option<Decimal>,
}

/// Largest offset magnitude in minutes.
pub const MAX_OFFSET: i32 = 24 * 60 - 1;

fn is_leap(year: u16) -> bool { (year % 4 == 0 && year % 100 != 0) || year % 400 == 0 }

fn days_in_month(year: u16, month: u8) -> u8 {
    match month {
        2 if is_leap(year) => 29,
        2 => 28,
        4 | 6 | 9 | 11 => 30,
        _ => 31,
    }
}

impl Timestamp {
    /// A timestamp with year precision.
    ///
    /// # Errors
    ///
    /// Returns [`IonError::InvalidArgument`] unless `1 <= year <= 9999`.
    pub fn with_year(year: u16) -> Result<Timestamp, IonError> {
        let ts = Timestamp {
            precision: Year,
            offset: None,
            year,
            month: 1,
            day: 1,
            hour: 0,
            minute: 0,
            second: 0,
            fraction: None,
        };
        ts.validate()?;
        Ok(ts)
    }

    /// A timestamp with month precision.
    pub fn with_month(year: u16, month: u8) -> Result<Timestamp, IonError> {
        let mut ts = Timestamp::with_year(year)?;
        ts.precision = Month;
        ts.month = month;
        ts.validate()?;
        Ok(ts)
    }

    /// A timestamp with day precision.
    pub fn with_day(year: u16, month: u8, day: u8) -> Result<Timestamp, IonError> {
        let mut ts = Timestamp::with_month(year, month)?;
        ts.precision = Day;
        ts.day = day;
        ts.validate()?;
        Ok(ts)
    }

    /// A timestamp with minute precision.
    ///
    /// # Arguments
    ///
    /// * `offset: Option<i32>` - Local offset in minutes, `None` when unknown.
    pub fn with_minute(
        year: u16,
        month: u8,
        day: u8,
        hour: u8,
        minute: u8,
        offset: Option<i32>,
    ) -> Result<Timestamp, IonError> {
        let mut ts = Timestamp::with_day(year, month, day)?;
        ts.precision = Minute;
        ts.hour = hour;
        ts.minute = minute;
        ts.offset = offset;
        ts.validate()?;
        Ok(ts)
    }

    /// A timestamp with second precision.
    pub fn with_second(
        year: u16,
        month: u8,
        day: u8,
        hour: u8,
        minute: u8,
        second: u8,
        offset: Option<i32>,
    ) -> Result<Timestamp, IonError> {
        let mut ts = Timestamp::with_minute(year, month, day, hour, minute, offset)?;
        ts.precision = Second;
        ts.second = second;
        ts.validate()?;
        Ok(ts)
    }

    /// A timestamp with a fractional second.
    ///
    /// # Errors
    ///
    /// The fraction must be non-negative, below one, and have a positive scale.
    pub fn with_fraction(
        year: u16,
        month: u8,
        day: u8,
        hour: u8,
        minute: u8,
        second: u8,
        fraction: Decimal,
        offset: Option<i32>,
    ) -> Result<Timestamp, IonError> {
        let mut ts = Timestamp::with_second(year, month, day, hour, minute, second, offset)?;
        ts.precision = Fraction;
        ts.fraction = Some(fraction);
        ts.validate()?;
        Ok(ts)
    }

    fn validate(&self) -> Result<(), IonError> {
        if self.year < 1 || self.year > 9999 {
            bail_arg!("year {} out of range", self.year)
        }
        if self.month < 1 || self.month > 12 {
            bail_arg!("month {} out of range", self.month)
        }
        if self.day < 1 || self.day > days_in_month(self.year, self.month) {
            bail_arg!("day {} out of range for {}-{:02}", self.day, self.year, self.month)
        }
        if self.hour > 23 || self.minute > 59 || self.second > 59 {
            bail_arg!(
                "time {:02}:{:02}:{:02} out of range",
                self.hour,
                self.minute,
                self.second
            )
        }
        if let Some(o) = self.offset {
            if o.abs() > MAX_OFFSET {
                bail_arg!("offset {} out of range", o)
            }
        }
        if let Some(f) = &self.fraction {
            let one = 10u128.pow(f.scale());
            if f.is_negative() || f.scale() == 0 || f.magnitude() >= one {
                bail_arg!("fractional second {} must be in [0, 1) with a positive scale", f)
            }
        }
        Ok(())
    }

    pub fn precision(&self) -> Precision { self.precision }

    /// Local offset in minutes, `None` when unknown.
    pub fn offset(&self) -> Option<i32> { self.offset }

    pub fn year(&self) -> u16 { self.year }

    /// The month, or `1` below month precision.
    pub fn month(&self) -> u8 { self.month }

    /// The day, or `1` below day precision.
    pub fn day(&self) -> u8 { self.day }

    pub fn hour(&self) -> u8 { self.hour }

    pub fn minute(&self) -> u8 { self.minute }

    /// The second, or `0` below second precision.
    pub fn second(&self) -> u8 { self.second }

    pub fn fraction(&self) -> Option<&Decimal> { self.fraction.as_ref() }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:04}", self.year)?;
        if self.precision == Year {
            return write!(f, "T");
        }
        write!(f, "-{:02}", self.month)?;
        if self.precision == Month {
            return write!(f, "T");
        }
        write!(f, "-{:02}", self.day)?;
        if self.precision == Day {
            return Ok(());
        }
        write!(f, "T{:02}:{:02}", self.hour, self.minute)?;
        if self.precision >= Second {
            write!(f, ":{:02}", self.second)?;
        }
        if let Some(frac) = &self.fraction {
            let s = frac.to_string();
            write!(f, "{}", s.trim_start_matches('0'))?;
        }
        match self.offset {
            None => write!(f, "-00:00"),
            Some(0) => write!(f, "Z"),
            Some(o) => {
                let sign = if o < 0 { '-' } else { '+' };
                write!(f, "{}{:02}:{:02}", sign, o.abs() / 60, o.abs() % 60)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lower_precision_defaults() {
        let ts = Timestamp::with_month(2007, 2).unwrap();
        assert_eq!(ts.precision(), Month);
        assert_eq!(ts.second(), 0);
        assert_eq!(ts.day(), 1);
        assert_ne!(ts, Timestamp::with_day(2007, 2, 1).unwrap());
    }

    #[test]
    fn rejects_bad_fields() {
        assert!(Timestamp::with_day(2019, 2, 29).is_err());
        assert!(Timestamp::with_day(2020, 2, 29).is_ok());
        assert!(Timestamp::with_minute(2020, 1, 1, 24, 0, None).is_err());
        assert!(Timestamp::with_minute(2020, 1, 1, 0, 0, Some(MAX_OFFSET + 1)).is_err());
        let whole = Decimal::new(1, 0).unwrap();
        assert!(Timestamp::with_fraction(2020, 1, 1, 0, 0, 0, whole, None).is_err());
    }

    #[test]
    fn display() {
        assert_eq!(Timestamp::with_year(2007).unwrap().to_string(), "2007T");
        assert_eq!(Timestamp::with_day(2007, 2, 23).unwrap().to_string(), "2007-02-23");
        let frac = Decimal::new(250, 3).unwrap();
        let ts = Timestamp::with_fraction(2007, 2, 23, 12, 14, 33, frac, Some(-90)).unwrap();
        assert_eq!(ts.to_string(), "2007-02-23T12:14:33.250-01:30");
        let z = Timestamp::with_minute(2007, 2, 23, 12, 14, Some(0)).unwrap();
        assert_eq!(z.to_string(), "2007-02-23T12:14Z");
    }
}
