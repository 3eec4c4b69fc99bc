// SPDX-License-Identifier: MIT

//! Cron expression parsing: 5-field standard expressions, lists, stepped
//! ranges, month/day-of-week names, `@`-aliases, and the day-of-month/
//! day-of-week extensions `L`, `LW`, `<N>W`, `<wd>L`, `<wd>#<n>` (spec §4.9).
//! All evaluation is in UTC.

use chrono::{DateTime, Datelike, Timelike, Utc};
use std::num::ParseIntError;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CronParseError {
    #[error("empty cron expression")]
    Empty,
    #[error("expected 5 fields, found {0}")]
    WrongFieldCount(usize),
    #[error("invalid field {field:?}: {reason}")]
    InvalidField { field: String, reason: String },
    #[error("unknown alias {0:?}")]
    UnknownAlias(String),
}

impl From<ParseIntError> for CronParseError {
    fn from(e: ParseIntError) -> Self {
        CronParseError::InvalidField { field: String::new(), reason: e.to_string() }
    }
}

/// A numeric field (minute, hour, month) as a set of `(start, end, step)`
/// ranges, or `*`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NumericField {
    Any,
    Ranges(Vec<(u32, u32, u32)>),
}

impl NumericField {
    fn matches(&self, value: u32) -> bool {
        match self {
            NumericField::Any => true,
            NumericField::Ranges(ranges) => ranges.iter().any(|&(start, end, step)| {
                value >= start && value <= end && (value - start) % step.max(1) == 0
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomAtom {
    Range(u32, u32, u32),
    Last,
    LastWeekday,
    NearestWeekday(u32),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomField {
    Any,
    List(Vec<DomAtom>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DowAtom {
    Range(u32, u32, u32),
    LastOccurrence(u32),
    NthOccurrence(u32, u32),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DowField {
    Any,
    List(Vec<DowAtom>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CronSchedule {
    pub minute: NumericField,
    pub hour: NumericField,
    pub dom: DomField,
    pub month: NumericField,
    pub dow: DowField,
}

const MONTH_NAMES: &[(&str, u32)] =
    &[("jan", 1), ("feb", 2), ("mar", 3), ("apr", 4), ("may", 5), ("jun", 6), ("jul", 7), ("aug", 8), ("sep", 9), ("oct", 10), ("nov", 11), ("dec", 12)];

const DOW_NAMES: &[(&str, u32)] = &[("sun", 0), ("mon", 1), ("tue", 2), ("wed", 3), ("thu", 4), ("fri", 5), ("sat", 6)];

fn resolve_alias(name: &str) -> Result<&'static str, CronParseError> {
    match name {
        "@yearly" | "@annually" => Ok("0 0 1 1 *"),
        "@monthly" => Ok("0 0 1 * *"),
        "@weekly" => Ok("0 0 * * 0"),
        "@daily" | "@midnight" => Ok("0 0 * * *"),
        "@hourly" => Ok("0 * * * *"),
        other => Err(CronParseError::UnknownAlias(other.to_string())),
    }
}

pub fn parse(expr: &str) -> Result<CronSchedule, CronParseError> {
    let expr = expr.trim();
    if expr.is_empty() {
        return Err(CronParseError::Empty);
    }
    let expanded;
    let expr = if let Some(stripped) = expr.strip_prefix('@') {
        expanded = resolve_alias(&format!("@{stripped}"))?;
        expanded
    } else {
        expr
    };

    let fields: Vec<&str> = expr.split_whitespace().collect();
    if fields.len() != 5 {
        return Err(CronParseError::WrongFieldCount(fields.len()));
    }

    Ok(CronSchedule {
        minute: parse_numeric_field(fields[0], 0, 59, None)?,
        hour: parse_numeric_field(fields[1], 0, 23, None)?,
        dom: parse_dom_field(fields[2])?,
        month: parse_numeric_field(fields[3], 1, 12, Some(MONTH_NAMES))?,
        dow: parse_dow_field(fields[4])?,
    })
}

fn field_error(field: &str, reason: impl Into<String>) -> CronParseError {
    CronParseError::InvalidField { field: field.to_string(), reason: reason.into() }
}

fn resolve_name(token: &str, names: Option<&[(&str, u32)]>) -> Option<u32> {
    names.and_then(|table| table.iter().find(|(n, _)| n.eq_ignore_ascii_case(token)).map(|(_, v)| *v))
}

fn parse_numeric_field(field: &str, min: u32, max: u32, names: Option<&[(&str, u32)]>) -> Result<NumericField, CronParseError> {
    if field == "*" {
        return Ok(NumericField::Any);
    }
    let mut ranges = Vec::new();
    for atom in field.split(',') {
        ranges.push(parse_numeric_atom(atom, min, max, names).map_err(|e| field_error(field, e))?);
    }
    Ok(NumericField::Ranges(ranges))
}

fn parse_numeric_atom(atom: &str, min: u32, max: u32, names: Option<&[(&str, u32)]>) -> Result<(u32, u32, u32), String> {
    let (range_part, step) = match atom.split_once('/') {
        Some((r, s)) => (r, s.parse::<u32>().map_err(|e| e.to_string())?),
        None => (atom, 1),
    };
    if range_part == "*" {
        return Ok((min, max, step));
    }
    if let Some((start, end)) = range_part.split_once('-') {
        let start = resolve_token(start, names)?;
        let end = resolve_token(end, names)?;
        return Ok((start, end, step));
    }
    let value = resolve_token(range_part, names)?;
    Ok((value, value, step))
}

fn resolve_token(token: &str, names: Option<&[(&str, u32)]>) -> Result<u32, String> {
    if let Some(value) = resolve_name(token, names) {
        return Ok(value);
    }
    token.parse::<u32>().map_err(|e| e.to_string())
}

fn parse_dom_field(field: &str) -> Result<DomField, CronParseError> {
    if field == "*" {
        return Ok(DomField::Any);
    }
    let mut atoms = Vec::new();
    for atom in field.split(',') {
        atoms.push(parse_dom_atom(atom).map_err(|e| field_error(field, e))?);
    }
    Ok(DomField::List(atoms))
}

fn parse_dom_atom(atom: &str) -> Result<DomAtom, String> {
    if atom.eq_ignore_ascii_case("L") {
        return Ok(DomAtom::Last);
    }
    if atom.eq_ignore_ascii_case("LW") {
        return Ok(DomAtom::LastWeekday);
    }
    if let Some(n) = atom.strip_suffix('W').or_else(|| atom.strip_suffix('w')) {
        let day: u32 = n.parse().map_err(|e: ParseIntError| e.to_string())?;
        return Ok(DomAtom::NearestWeekday(day));
    }
    let (start, end, step) = parse_numeric_atom(atom, 1, 31, None)?;
    Ok(DomAtom::Range(start, end, step))
}

fn parse_dow_field(field: &str) -> Result<DowField, CronParseError> {
    if field == "*" {
        return Ok(DowField::Any);
    }
    let mut atoms = Vec::new();
    for atom in field.split(',') {
        atoms.push(parse_dow_atom(atom).map_err(|e| field_error(field, e))?);
    }
    Ok(DowField::List(atoms))
}

fn parse_dow_atom(atom: &str) -> Result<DowAtom, String> {
    if let Some(base) = atom.strip_suffix('L').or_else(|| atom.strip_suffix('l')) {
        let wd = resolve_token(base, Some(DOW_NAMES))?;
        return Ok(DowAtom::LastOccurrence(wd % 7));
    }
    if let Some((base, n)) = atom.split_once('#') {
        let wd = resolve_token(base, Some(DOW_NAMES))?;
        let n: u32 = n.parse().map_err(|e: ParseIntError| e.to_string())?;
        return Ok(DowAtom::NthOccurrence(wd % 7, n));
    }
    let (start, end, step) = parse_numeric_atom(atom, 0, 7, Some(DOW_NAMES))?;
    Ok(DowAtom::Range(start % 7, end % 7, step))
}

fn weekday_number(dt: &DateTime<Utc>) -> u32 {
    dt.weekday().num_days_from_sunday()
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let next_month_first = if month == 12 {
        chrono::NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        chrono::NaiveDate::from_ymd_opt(year, month + 1, 1)
    };
    let this_month_first = chrono::NaiveDate::from_ymd_opt(year, month, 1);
    match (this_month_first, next_month_first) {
        (Some(a), Some(b)) => (b - a).num_days() as u32,
        _ => 30,
    }
}

fn is_weekday(dow: u32) -> bool {
    (1..=5).contains(&dow)
}

fn nearest_weekday(year: i32, month: u32, day: u32) -> u32 {
    let last_day = days_in_month(year, month);
    let day = day.min(last_day).max(1);
    let Some(date) = chrono::NaiveDate::from_ymd_opt(year, month, day) else { return day };
    let dow = date.weekday().num_days_from_sunday();
    if is_weekday(dow) {
        return day;
    }
    if dow == 0 {
        // Sunday: prefer the following Monday, unless that's next month.
        if day + 1 <= last_day {
            return day + 1;
        }
        day.saturating_sub(2)
    } else {
        // Saturday: prefer the preceding Friday, unless that's day 0.
        if day > 1 {
            day - 1
        } else {
            (day + 2).min(last_day)
        }
    }
}

fn dom_matches(field: &DomField, dt: &DateTime<Utc>) -> bool {
    let DomField::List(atoms) = field else { return true };
    let year = dt.year();
    let month = dt.month();
    let day = dt.day();
    let last_day = days_in_month(year, month);
    atoms.iter().any(|atom| match atom {
        DomAtom::Range(start, end, step) => day >= *start && day <= *end && (day - *start) % (*step).max(1) == 0,
        DomAtom::Last => day == last_day,
        DomAtom::LastWeekday => day == nearest_weekday(year, month, last_day),
        DomAtom::NearestWeekday(n) => day == nearest_weekday(year, month, *n),
    })
}

fn nth_weekday_of_month(year: i32, month: u32, weekday: u32, n: u32) -> Option<u32> {
    let mut count = 0;
    for day in 1..=days_in_month(year, month) {
        let date = chrono::NaiveDate::from_ymd_opt(year, month, day)?;
        if date.weekday().num_days_from_sunday() == weekday {
            count += 1;
            if count == n {
                return Some(day);
            }
        }
    }
    None
}

fn last_weekday_of_month(year: i32, month: u32, weekday: u32) -> Option<u32> {
    let last = days_in_month(year, month);
    (1..=last).rev().find(|&day| {
        chrono::NaiveDate::from_ymd_opt(year, month, day)
            .map(|d| d.weekday().num_days_from_sunday() == weekday)
            .unwrap_or(false)
    })
}

fn dow_matches(field: &DowField, dt: &DateTime<Utc>) -> bool {
    let DowField::List(atoms) = field else { return true };
    let today = weekday_number(dt);
    let year = dt.year();
    let month = dt.month();
    let day = dt.day();
    atoms.iter().any(|atom| match atom {
        DowAtom::Range(start, end, step) => {
            if start <= end {
                today >= *start && today <= *end && (today - *start) % (*step).max(1) == 0
            } else {
                today >= *start || today <= *end
            }
        }
        DowAtom::LastOccurrence(wd) => last_weekday_of_month(year, month, *wd) == Some(day),
        DowAtom::NthOccurrence(wd, n) => nth_weekday_of_month(year, month, *wd, *n) == Some(day),
    })
}

impl CronSchedule {
    pub fn matches(&self, dt: DateTime<Utc>) -> bool {
        self.minute.matches(dt.minute())
            && self.hour.matches(dt.hour())
            && self.month.matches(dt.month())
            && dom_matches(&self.dom, &dt)
            && dow_matches(&self.dow, &dt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use yare::parameterized;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    #[test]
    fn every_minute_matches_anything() {
        let schedule = parse("* * * * *").unwrap();
        assert!(schedule.matches(at(2026, 3, 1, 0, 0)));
    }

    #[parameterized(
        daily = { "@daily", at(2026, 3, 1, 0, 0), true },
        daily_wrong_hour = { "@daily", at(2026, 3, 1, 5, 0), false },
        hourly = { "@hourly", at(2026, 3, 1, 5, 0), true },
    )]
    fn alias_expansion_matches_expected_times(expr: &str, dt: DateTime<Utc>, expected: bool) {
        let schedule = parse(expr).unwrap();
        assert_eq!(schedule.matches(dt), expected);
    }

    #[test]
    fn stepped_range_matches_every_other_hour() {
        let schedule = parse("0 */2 * * *").unwrap();
        assert!(schedule.matches(at(2026, 3, 1, 0, 0)));
        assert!(!schedule.matches(at(2026, 3, 1, 1, 0)));
        assert!(schedule.matches(at(2026, 3, 1, 2, 0)));
    }

    #[test]
    fn month_and_dow_names_are_case_insensitive() {
        let schedule = parse("0 0 * Jan Mon").unwrap();
        // 2026-01-05 is a Monday.
        assert!(schedule.matches(at(2026, 1, 5, 0, 0)));
        assert!(!schedule.matches(at(2026, 1, 6, 0, 0)));
    }

    #[test]
    fn last_day_of_month_extension() {
        let schedule = parse("0 0 L * *").unwrap();
        assert!(schedule.matches(at(2026, 2, 28, 0, 0)));
        assert!(!schedule.matches(at(2026, 2, 27, 0, 0)));
    }

    #[test]
    fn nth_weekday_of_month_extension() {
        // Third Friday of March 2026 is the 20th.
        let schedule = parse("0 0 * * 5#3").unwrap();
        assert!(schedule.matches(at(2026, 3, 20, 0, 0)));
        assert!(!schedule.matches(at(2026, 3, 13, 0, 0)));
    }

    #[test]
    fn last_weekday_of_month_extension() {
        // Last Friday of March 2026 is the 27th.
        let schedule = parse("0 0 * * 5L").unwrap();
        assert!(schedule.matches(at(2026, 3, 27, 0, 0)));
        assert!(!schedule.matches(at(2026, 3, 20, 0, 0)));
    }

    #[test]
    fn wrong_field_count_is_rejected() {
        assert_eq!(parse("* * *"), Err(CronParseError::WrongFieldCount(3)));
    }

    #[test]
    fn unknown_alias_is_rejected() {
        assert!(matches!(parse("@fortnightly"), Err(CronParseError::UnknownAlias(_))));
    }

    proptest::proptest! {
        #[test]
        fn star_always_parses_and_matches(minute in 0u32..60, hour in 0u32..24) {
            let schedule = parse("* * * * *").unwrap();
            let dt = at(2026, 1, 1, hour, minute);
            proptest::prop_assert!(schedule.matches(dt));
        }
    }
}
