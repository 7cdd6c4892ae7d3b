//! Compiles per-teacher availability documents into resolved (day, period)
//! bitmaps, and parses preference documents into the flat fields
//! `variables`/`objective`/`metrics` consume directly (§4.2).

use std::collections::{BTreeMap, BTreeSet};

use log::debug;

use crate::model::{AvailabilityDoc, Day, InputModel, Period, PreferencesDoc, TeacherId};

/// `available[teacher][day] -> set of periods`.
#[derive(Debug, Clone, Default)]
pub struct ResolvedAvailability {
    pub by_teacher: BTreeMap<TeacherId, BTreeMap<Day, BTreeSet<Period>>>,
}

impl ResolvedAvailability {
    pub fn periods_for(&self, teacher: &TeacherId, day: Day) -> BTreeSet<Period> {
        self.by_teacher
            .get(teacher)
            .and_then(|by_day| by_day.get(&day))
            .cloned()
            .unwrap_or_default()
    }
}

/// Resolves every teacher's availability document against the instance's
/// (days, periods_per_day) grid.
pub fn resolve(model: &InputModel) -> ResolvedAvailability {
    let days = model.instance.days as Day;
    let periods_per_day = model.instance.periods_per_day as Period;

    let mut by_teacher = BTreeMap::new();
    for (teacher_id, teacher) in &model.teachers {
        let resolved = resolve_one(&teacher.availability, days, periods_per_day);
        debug!(
            "resolved availability for teacher {}: {} days with restrictions",
            teacher_id,
            resolved.values().filter(|p| p.len() < periods_per_day as usize).count()
        );
        by_teacher.insert(teacher_id.clone(), resolved);
    }
    ResolvedAvailability { by_teacher }
}

fn day_name_to_index(name: &str) -> Option<Day> {
    match name.to_ascii_lowercase().as_str() {
        "monday" | "mon" => Some(0),
        "tuesday" | "tue" => Some(1),
        "wednesday" | "wed" => Some(2),
        "thursday" | "thu" => Some(3),
        "friday" | "fri" => Some(4),
        "saturday" | "sat" => Some(5),
        "sunday" | "sun" => Some(6),
        _ => None,
    }
}

fn resolve_one(
    doc: &AvailabilityDoc,
    days: Day,
    periods_per_day: Period,
) -> BTreeMap<Day, BTreeSet<Period>> {
    let all_periods: BTreeSet<Period> = (0..periods_per_day).collect();
    let mut result: BTreeMap<Day, BTreeSet<Period>> = BTreeMap::new();

    for d in 0..days {
        result.insert(d, all_periods.clone());
    }

    for (name, entry) in &doc.days {
        let Some(day) = day_name_to_index(name) else {
            continue;
        };
        if day >= days {
            continue;
        }
        let resolved = match (&entry.available, &entry.unavailable) {
            (Some(available), Some(unavailable)) => {
                available.difference(unavailable).copied().collect()
            }
            (Some(available), None) => available.clone(),
            (None, Some(unavailable)) => all_periods.difference(unavailable).copied().collect(),
            (None, None) => all_periods.clone(),
        };
        result.insert(day, resolved);
    }

    if doc.never_monday_morning {
        if let Some(monday) = result.get_mut(&0) {
            monday.retain(|p| !matches!(p, 0 | 1 | 2));
        }
    }
    if doc.no_last_period {
        let max_period = periods_per_day.saturating_sub(1);
        for periods in result.values_mut() {
            periods.remove(&max_period);
        }
    }
    if doc.no_early_morning {
        for periods in result.values_mut() {
            periods.remove(&0);
        }
    }

    result
}

/// Parsed preferences, trivially projected from [`PreferencesDoc`] — kept as
/// a distinct type so call sites don't reach into the raw input document.
#[derive(Debug, Clone)]
pub struct ResolvedPreferences<'a> {
    pub preferred_days: &'a BTreeSet<Day>,
    pub preferred_periods: &'a BTreeSet<Period>,
    pub avoided_periods: &'a BTreeSet<Period>,
    pub prefers_morning: bool,
    pub prefers_afternoon: bool,
    pub max_daily_load: u32,
    pub max_consecutive_periods: u32,
    pub preferred_rooms: &'a BTreeSet<crate::model::RoomId>,
}

pub fn resolve_preferences(doc: &PreferencesDoc) -> ResolvedPreferences<'_> {
    ResolvedPreferences {
        preferred_days: &doc.preferred_days,
        preferred_periods: &doc.preferred_periods,
        avoided_periods: &doc.avoided_periods,
        prefers_morning: doc.prefers_morning,
        prefers_afternoon: doc.prefers_afternoon,
        max_daily_load: doc.max_daily_load,
        max_consecutive_periods: doc.max_consecutive_periods,
        preferred_rooms: &doc.preferred_rooms,
    }
}
