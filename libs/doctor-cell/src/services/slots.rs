// libs/doctor-cell/src/services/slots.rs

use chrono::{NaiveDate, NaiveTime, Timelike};

use shared_models::scheduling::ScheduleTemplate;

use crate::models::ScheduleError;

fn seconds(time: NaiveTime) -> u64 {
    u64::from(time.num_seconds_from_midnight())
}

/// Expands a template into the ordered start times it offers on `date`.
///
/// Slots step from `start_time` by `slot_duration_minutes`; a slot that would
/// run past `end_time` is dropped, one ending exactly at `end_time` is kept.
/// A slot is removed when the break begins inside it or when it lies wholly
/// within the break. Slots are never shifted around a break.
///
/// Returns nothing when the template is for another weekday.
pub fn generate_slots(template: &ScheduleTemplate, date: NaiveDate) -> Vec<NaiveTime> {
    if !template.applies_to(date) || template.slot_duration_minutes <= 0 {
        return Vec::new();
    }

    let step = u64::from(template.slot_duration_minutes.unsigned_abs()) * 60;
    let end = seconds(template.end_time);
    let break_window = template
        .break_window()
        .map(|(start, end)| (seconds(start), seconds(end)));

    let mut slots = Vec::new();
    let mut start = seconds(template.start_time);

    // Working in seconds since midnight keeps the walk from wrapping past 24:00.
    while start + step <= end {
        let slot_end = start + step;

        let blocked = break_window.map_or(false, |(break_start, break_end)| {
            let break_begins_inside = start <= break_start && break_start < slot_end;
            let inside_break = break_start <= start && slot_end <= break_end;
            break_begins_inside || inside_break
        });

        if !blocked {
            let time = u32::try_from(start)
                .ok()
                .and_then(|secs| NaiveTime::from_num_seconds_from_midnight_opt(secs, 0));
            if let Some(time) = time {
                slots.push(time);
            }
        }

        start = slot_end;
    }

    slots
}

/// Checks the invariants every stored template must satisfy.
pub fn validate_template(template: &ScheduleTemplate) -> Result<(), ScheduleError> {
    if !(0..=6).contains(&template.day_of_week) {
        return Err(ScheduleError::Validation(
            "Day of week must be between 0 (Sunday) and 6 (Saturday)".to_string(),
        ));
    }

    if template.start_time >= template.end_time {
        return Err(ScheduleError::Validation("Start time must be before end time".to_string()));
    }

    if template.slot_duration_minutes <= 0 {
        return Err(ScheduleError::Validation("Slot duration must be a positive number of minutes".to_string()));
    }

    let window_minutes = (template.end_time - template.start_time).num_minutes();
    if i64::from(template.slot_duration_minutes) > window_minutes {
        return Err(ScheduleError::Validation(format!(
            "Slot duration must not exceed the {} minute working window",
            window_minutes
        )));
    }

    match (template.break_start, template.break_end) {
        (None, None) => Ok(()),
        (Some(break_start), Some(break_end)) => {
            if break_start >= break_end {
                return Err(ScheduleError::Validation("Break start must be before break end".to_string()));
            }
            if break_start < template.start_time || break_end > template.end_time {
                return Err(ScheduleError::Validation(
                    "Break must fall within the working hours".to_string(),
                ));
            }
            Ok(())
        }
        _ => Err(ScheduleError::Validation(
            "Break start and break end must be given together".to_string(),
        )),
    }
}
