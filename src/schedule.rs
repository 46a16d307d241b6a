use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::models::Lesson;

#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct ScheduleStats {
    pub total_classes: usize,
    pub attended_classes: usize,
    pub upcoming_classes: usize,
    pub study_hours: f64,
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct ScheduleSummary {
    pub lessons: Vec<Lesson>,
    pub next_class: Option<Lesson>,
    pub today_classes: Vec<Lesson>,
    pub stats: ScheduleStats,
}

/// Split a student's lessons around `now`.
///
/// A lesson counts as attended once its start is in the past; its duration
/// then adds to the study hours. "Today" is the UTC calendar date of `now`.
pub fn summarize(mut lessons: Vec<Lesson>, now: DateTime<Utc>) -> ScheduleSummary {
    lessons.sort_by_key(|lesson| (lesson.lesson_date, lesson.id));

    let today: NaiveDate = now.date_naive();
    let mut stats = ScheduleStats {
        total_classes: lessons.len(),
        ..ScheduleStats::default()
    };
    let mut minutes = 0i64;

    for lesson in &lessons {
        if lesson.lesson_date < now {
            stats.attended_classes += 1;
            minutes += i64::from(lesson.duration);
        } else {
            stats.upcoming_classes += 1;
        }
    }
    stats.study_hours = minutes as f64 / 60.0;

    let next_class = lessons
        .iter()
        .find(|lesson| lesson.lesson_date > now)
        .cloned();
    let today_classes = lessons
        .iter()
        .filter(|lesson| lesson.lesson_date.date_naive() == today)
        .cloned()
        .collect();

    ScheduleSummary {
        lessons,
        next_class,
        today_classes,
        stats,
    }
}
