//! Reminder message text (Indonesian, Jakarta civil time).

use chrono::{DateTime, Datelike, Timelike, Utc, Weekday};

use crate::time::{hours_until, parse_deadline, IMMINENT_WINDOW_HOURS, JAKARTA};

const HEADING: &str = "🚨 *Reminder Notes*";
const CLOSING: &str = "Jangan lupa selesaikan tugasmu ya! 💪";

const MONTHS: [&str; 12] = [
    "Januari", "Februari", "Maret", "April", "Mei", "Juni", "Juli", "Agustus", "September",
    "Oktober", "November", "Desember",
];

fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Senin",
        Weekday::Tue => "Selasa",
        Weekday::Wed => "Rabu",
        Weekday::Thu => "Kamis",
        Weekday::Fri => "Jumat",
        Weekday::Sat => "Sabtu",
        Weekday::Sun => "Minggu",
    }
}

/// Long Indonesian rendering in WIB, e.g. `Senin, 19 Oktober 2026 pukul 17.00`.
pub fn format_deadline_jakarta(deadline: DateTime<Utc>) -> String {
    let local = deadline.with_timezone(&JAKARTA);
    format!(
        "{}, {} {} {} pukul {:02}.{:02}",
        weekday_name(local.weekday()),
        local.day(),
        MONTHS[local.month0() as usize],
        local.year(),
        local.hour(),
        local.minute()
    )
}

/// "3 jam lagi", "2 hari lagi", "Terlambat 5 jam", ...
pub fn describe_time_left(delta_hours: i64) -> String {
    if delta_hours > 0 {
        if delta_hours <= IMMINENT_WINDOW_HOURS {
            format!("Deadline tinggal {delta_hours} jam lagi")
        } else {
            let days = (delta_hours + IMMINENT_WINDOW_HOURS - 1) / IMMINENT_WINDOW_HOURS;
            format!("Deadline tinggal {days} hari lagi")
        }
    } else {
        let overdue = -delta_hours;
        if overdue == 0 {
            "Terlambat kurang dari 1 jam".to_string()
        } else if overdue < IMMINENT_WINDOW_HOURS {
            format!("Terlambat {overdue} jam")
        } else {
            format!("Terlambat {} hari", overdue / IMMINENT_WINDOW_HOURS)
        }
    }
}

/// Build the WhatsApp reminder body for a note.
pub fn format_reminder(title: &str, deadline: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let when = format_deadline_jakarta(deadline);
    let left = describe_time_left(hours_until(deadline, now));
    format!("{HEADING}\n\n📝 *{title}*\n⏰ Deadline: {when} WIB\n\n⚠️ {left}!\n\n{CLOSING}")
}

/// Like [`format_reminder`], but for a deadline that has not been parsed yet.
/// Unparseable input is embedded verbatim instead of failing.
pub fn format_reminder_raw(title: &str, raw_deadline: &str, now: DateTime<Utc>) -> String {
    match parse_deadline(raw_deadline) {
        Ok(deadline) => format_reminder(title, deadline, now),
        Err(e) => {
            tracing::warn!(raw = raw_deadline, error = %e, "falling back to raw deadline text");
            format!(
                "{HEADING}\n\n📝 *{title}*\n⏰ Deadline: {raw_deadline}\n\n⚠️ Deadline tinggal kurang dari 24 jam lagi!"
            )
        }
    }
}
