//! Per-weekday walking totals for a schedule of events.
//!
//! Events are grouped by weekday and ordered by start time. The walking
//! distance of a day is the sum of the great-circle hops between the
//! waypoints of consecutive events. Aggregation is a pure function of the
//! event set and a [`NameIndex`] snapshot; nothing is cached.
//!
//! Events whose start or end time cannot be parsed are left out of the
//! ordering and reported in [`DailyWalkSummary::excluded`]. Events whose
//! waypoint does not resolve stay in the ordering but are skipped in the
//! distance chain, which reconnects across the gap.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{NaiveTime, Timelike};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::{geo_utils, Coordinate, Error, NameIndex};

// ============================================================================
// Weekday
// ============================================================================

/// A teaching day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Weekday {
    #[serde(alias = "Monday")]
    Mon,
    #[serde(alias = "Tuesday")]
    Tue,
    #[serde(alias = "Wednesday")]
    Wed,
    #[serde(alias = "Thursday")]
    Thu,
    #[serde(alias = "Friday")]
    Fri,
}

impl Weekday {
    pub const ALL: [Weekday; 5] = [Weekday::Mon, Weekday::Tue, Weekday::Wed, Weekday::Thu, Weekday::Fri];

    pub fn as_str(&self) -> &'static str {
        match self {
            Weekday::Mon => "Mon",
            Weekday::Tue => "Tue",
            Weekday::Wed => "Wed",
            Weekday::Thu => "Thu",
            Weekday::Fri => "Fri",
        }
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Weekday {
    type Err = Error;

    /// Accepts short or full English names, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mon" | "monday" => Ok(Weekday::Mon),
            "tue" | "tues" | "tuesday" => Ok(Weekday::Tue),
            "wed" | "wednesday" => Ok(Weekday::Wed),
            "thu" | "thur" | "thurs" | "thursday" => Ok(Weekday::Thu),
            "fri" | "friday" => Ok(Weekday::Fri),
            _ => Err(Error::UnknownWeekday(s.to_string())),
        }
    }
}

// ============================================================================
// Time of day
// ============================================================================

/// Minutes since midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimeOfDay(u16);

impl TimeOfDay {
    /// Parse 24-hour `"H:MM"` or 12-hour `"H:MM AM"`/`"H:MM PM"`.
    ///
    /// ```
    /// use campus_nav::TimeOfDay;
    /// assert_eq!(TimeOfDay::parse("2:00 PM").unwrap().minutes(), 840);
    /// assert_eq!(TimeOfDay::parse("12:00 AM").unwrap().minutes(), 0);
    /// assert_eq!(TimeOfDay::parse("10:50").unwrap().minutes(), 650);
    /// assert!(TimeOfDay::parse("abc").is_err());
    /// ```
    pub fn parse(text: &str) -> Result<Self, Error> {
        let trimmed = text.trim();
        NaiveTime::parse_from_str(trimmed, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(trimmed, "%I:%M %p"))
            .map(Self::from)
            .map_err(|_| Error::TimeParse(text.to_string()))
    }

    pub fn minutes(&self) -> u16 {
        self.0
    }
}

impl From<NaiveTime> for TimeOfDay {
    fn from(t: NaiveTime) -> Self {
        TimeOfDay((t.hour() * 60 + t.minute()) as u16)
    }
}

impl FromStr for TimeOfDay {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{:02}", self.0 / 60, self.0 % 60)
    }
}

// ============================================================================
// Events and summaries
// ============================================================================

/// A recurring weekly event at a named waypoint.
///
/// Times are kept as entered; they are parsed during aggregation so that a
/// bad entry only affects its own event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledEvent {
    pub id: String,
    pub label: String,
    pub waypoint: String,
    pub weekday: Weekday,
    pub start: String,
    pub end: String,
}

impl ScheduledEvent {
    pub fn start_time(&self) -> Result<TimeOfDay, Error> {
        TimeOfDay::parse(&self.start)
    }

    pub fn end_time(&self) -> Result<TimeOfDay, Error> {
        TimeOfDay::parse(&self.end)
    }
}

/// Walking totals for one weekday.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyWalkSummary {
    pub weekday: Weekday,
    /// Events with valid times, by ascending start time
    pub ordered_events: Vec<ScheduledEvent>,
    /// Ids of events left out because a time failed to parse
    pub excluded: Vec<String>,
    /// Ids of ordered events whose waypoint did not resolve
    pub unresolved: Vec<String>,
    pub total_meters: f64,
    pub total_minutes: f64,
}

/// Summarize every weekday that has at least one event, at the default
/// walking speed.
pub fn summarize_week(events: &[ScheduledEvent], index: &NameIndex) -> BTreeMap<Weekday, DailyWalkSummary> {
    summarize_week_at(events, index, geo_utils::WALK_SPEED_MPS)
}

/// [`summarize_week`] at an explicit walking speed.
pub fn summarize_week_at(
    events: &[ScheduledEvent],
    index: &NameIndex,
    speed_mps: f64,
) -> BTreeMap<Weekday, DailyWalkSummary> {
    let mut by_day: BTreeMap<Weekday, Vec<&ScheduledEvent>> = BTreeMap::new();
    for event in events {
        by_day.entry(event.weekday).or_default().push(event);
    }

    by_day
        .into_iter()
        .map(|(weekday, day_events)| (weekday, summarize_day(weekday, day_events, index, speed_mps)))
        .collect()
}

/// Summarize one weekday's events. Events on other days are ignored.
pub fn summarize_day<'a>(
    weekday: Weekday,
    events: impl IntoIterator<Item = &'a ScheduledEvent>,
    index: &NameIndex,
    speed_mps: f64,
) -> DailyWalkSummary {
    let mut timed: Vec<(TimeOfDay, &ScheduledEvent)> = Vec::new();
    let mut excluded = Vec::new();

    for event in events.into_iter().filter(|e| e.weekday == weekday) {
        match event.start_time().and_then(|start| event.end_time().map(|_| start)) {
            Ok(start) => timed.push((start, event)),
            Err(e) => {
                debug!("[Schedule] {} on {}: {}; left unscheduled", event.id, weekday, e);
                excluded.push(event.id.clone());
            }
        }
    }

    // Stable: events sharing a start time keep their insertion order
    timed.sort_by_key(|(start, _)| *start);

    let mut unresolved = Vec::new();
    let stops: Vec<Coordinate> = timed
        .iter()
        .filter_map(|(_, event)| {
            let coord = index.lookup(&event.waypoint);
            if coord.is_none() {
                debug!("[Schedule] {}: waypoint {:?} not found", event.id, event.waypoint);
                unresolved.push(event.id.clone());
            }
            coord
        })
        .collect();

    let total_meters = geo_utils::path_length_meters(&stops);

    DailyWalkSummary {
        weekday,
        ordered_events: timed.into_iter().map(|(_, e)| e.clone()).collect(),
        excluded,
        unresolved,
        total_meters,
        total_minutes: geo_utils::walk_minutes(total_meters, speed_mps),
    }
}

// ============================================================================
// Schedule
// ============================================================================

/// An editable set of events.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Schedule {
    events: Vec<ScheduledEvent>,
    next_id: u64,
}

impl Schedule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an event and return its generated id.
    pub fn add(
        &mut self,
        label: &str,
        waypoint: &str,
        weekday: Weekday,
        start: &str,
        end: &str,
    ) -> String {
        let id = loop {
            self.next_id += 1;
            let candidate = format!("{}-{}", label, self.next_id);
            if !self.events.iter().any(|e| e.id == candidate) {
                break candidate;
            }
        };
        self.events.push(ScheduledEvent {
            id: id.clone(),
            label: label.to_string(),
            waypoint: waypoint.to_string(),
            weekday,
            start: start.to_string(),
            end: end.to_string(),
        });
        id
    }

    /// Remove an event by id. Returns whether it existed.
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.events.len();
        self.events.retain(|e| e.id != id);
        self.events.len() != before
    }

    pub fn events(&self) -> &[ScheduledEvent] {
        &self.events
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn summarize(&self, index: &NameIndex) -> BTreeMap<Weekday, DailyWalkSummary> {
        summarize_week(&self.events, index)
    }
}

impl From<Vec<ScheduledEvent>> for Schedule {
    fn from(events: Vec<ScheduledEvent>) -> Self {
        // Continue after the highest `-N` suffix already in use
        let next_id = events
            .iter()
            .filter_map(|e| e.id.rsplit_once('-'))
            .filter_map(|(_, n)| n.parse::<u64>().ok())
            .max()
            .unwrap_or(0);
        Self { events, next_id }
    }
}
