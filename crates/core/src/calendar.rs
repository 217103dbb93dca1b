//! Week projection of the appointment book.
//!
//! The window start deliberately mirrors the shop's historical arithmetic: weekdays are
//! indexed from Sunday (0) and the window starts `index - 1` days before the reference
//! date. For Monday..Saturday that is the Monday of the same week; for a Sunday it is the
//! *following* Monday, so a Sunday reference date is not inside its own window.

use chrono::{Datelike, Duration, Local, NaiveDate};
use serde::Serialize;

use crate::domain::appointment::Appointment;
use crate::domain::catalog::ShopConfig;

pub const DAYS_IN_WEEK: usize = 7;

const WEEKDAY_LABELS: [&str; 7] = ["dom", "lun", "mar", "mer", "gio", "ven", "sab"];
const MONTH_LABELS: [&str; 12] =
    ["gen", "feb", "mar", "apr", "mag", "giu", "lug", "ago", "set", "ott", "nov", "dic"];

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DaySlot {
    pub date: NaiveDate,
    pub is_today: bool,
    pub is_work_day: bool,
    pub appointments: Vec<Appointment>,
}

impl DaySlot {
    pub fn is_closed(&self) -> bool {
        !self.is_work_day
    }

    /// Short Italian label, e.g. `lun 6 ott`.
    pub fn label(&self) -> String {
        let weekday = WEEKDAY_LABELS[weekday_index(self.date) as usize];
        let month = MONTH_LABELS[self.date.month0() as usize];
        format!("{weekday} {} {month}", self.date.day())
    }
}

/// 0 = Sunday .. 6 = Saturday.
pub fn weekday_index(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_sunday() as u8
}

pub fn week_start(reference: NaiveDate) -> NaiveDate {
    let index = i64::from(weekday_index(reference));
    reference - Duration::days(index - 1)
}

pub fn week_dates(reference: NaiveDate) -> Vec<NaiveDate> {
    let start = week_start(reference);
    (0..DAYS_IN_WEEK as i64).map(|offset| start + Duration::days(offset)).collect()
}

/// Groups `appointments` into the seven days of the window containing `reference`.
/// Appointments whose date is not a valid `YYYY-MM-DD` never match a day.
pub fn project(
    reference: NaiveDate,
    today: NaiveDate,
    appointments: &[Appointment],
    shop: &ShopConfig,
) -> Vec<DaySlot> {
    week_dates(reference)
        .into_iter()
        .map(|date| {
            let mut day_appointments = appointments
                .iter()
                .filter(|appointment| appointment_date(appointment) == Some(date))
                .cloned()
                .collect::<Vec<_>>();
            day_appointments.sort_by(|left, right| left.time.cmp(&right.time));

            DaySlot {
                date,
                is_today: date == today,
                is_work_day: shop.is_work_day(weekday_index(date)),
                appointments: day_appointments,
            }
        })
        .collect()
}

pub fn project_now(
    reference: NaiveDate,
    appointments: &[Appointment],
    shop: &ShopConfig,
) -> Vec<DaySlot> {
    project(reference, local_today(), appointments, shop)
}

pub fn local_today() -> NaiveDate {
    Local::now().date_naive()
}

fn appointment_date(appointment: &Appointment) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(&appointment.date, "%Y-%m-%d").ok()
}

/// Reference date the calendar view is currently showing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WeekCursor {
    reference: NaiveDate,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeekNavigation {
    Previous,
    Next,
    Current,
}

impl WeekCursor {
    pub fn new(reference: NaiveDate) -> Self {
        Self { reference }
    }

    pub fn reference(&self) -> NaiveDate {
        self.reference
    }

    pub fn navigate(&mut self, direction: WeekNavigation, today: NaiveDate) -> NaiveDate {
        self.reference = match direction {
            WeekNavigation::Previous => self.reference - Duration::days(7),
            WeekNavigation::Next => self.reference + Duration::days(7),
            WeekNavigation::Current => today,
        };
        self.reference
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    use super::{project, week_start, weekday_index, WeekCursor, WeekNavigation};
    use crate::domain::appointment::{Appointment, AppointmentId};
    use crate::domain::catalog::CatalogBundle;

    fn date(raw: &str) -> NaiveDate {
        NaiveDate::parse_from_str(raw, "%Y-%m-%d").expect("valid date")
    }

    fn appointment(id: i64, day: &str, time: &str) -> Appointment {
        Appointment {
            id: AppointmentId(id),
            client_name: format!("cliente-{id}"),
            service: "Barba".to_string(),
            date: day.to_string(),
            time: time.to_string(),
            duration: 20,
            price: Decimal::from(15),
        }
    }

    #[test]
    fn weekday_window_starts_on_monday() {
        // 2026-10-14 is a Wednesday, 2026-10-17 a Saturday.
        assert_eq!(week_start(date("2026-10-14")), date("2026-10-12"));
        assert_eq!(week_start(date("2026-10-17")), date("2026-10-12"));
        assert_eq!(week_start(date("2026-10-12")), date("2026-10-12"));
    }

    #[test]
    fn sunday_window_starts_on_following_monday() {
        let sunday = date("2026-10-18");
        assert_eq!(weekday_index(sunday), 0);
        assert_eq!(week_start(sunday), date("2026-10-19"));
    }

    #[test]
    fn projects_seven_consecutive_days_and_keeps_every_matching_appointment() {
        let shop = CatalogBundle::default().shop;
        let appointments = vec![
            appointment(1, "2026-10-12", "11:00"),
            appointment(2, "2026-10-18", "09:00"),
            appointment(3, "2026-10-19", "09:00"),
            appointment(4, "2026-10-11", "09:00"),
            appointment(5, "2026-10-15", "16:30"),
        ];

        let week = project(date("2026-10-15"), date("2026-10-15"), &appointments, &shop);

        assert_eq!(week.len(), 7);
        for pair in week.windows(2) {
            assert_eq!(pair[1].date, pair[0].date.succ_opt().expect("next day"));
        }
        let mut ids = week
            .iter()
            .flat_map(|day| day.appointments.iter().map(|a| a.id.0))
            .collect::<Vec<_>>();
        ids.sort_unstable();
        assert_eq!(ids, vec![1, 2, 5]);
    }

    #[test]
    fn orders_each_day_by_time_of_day() {
        let shop = CatalogBundle::default().shop;
        let appointments = vec![
            appointment(1, "2026-10-13", "15:00"),
            appointment(2, "2026-10-13", "09:30"),
            appointment(3, "2026-10-13", "12:45"),
        ];

        let week = project(date("2026-10-13"), date("2026-10-13"), &appointments, &shop);
        let times = week[1].appointments.iter().map(|a| a.time.as_str()).collect::<Vec<_>>();

        assert_eq!(times, vec!["09:30", "12:45", "15:00"]);
    }

    #[test]
    fn flags_today_once_and_closed_days_from_shop_config() {
        let shop = CatalogBundle::default().shop;
        let week = project(date("2026-10-14"), date("2026-10-14"), &[], &shop);

        assert_eq!(week.iter().filter(|day| day.is_today).count(), 1);
        assert!(week[2].is_today);
        // Monday..Saturday open, Sunday closed.
        assert!(week[..6].iter().all(|day| day.is_work_day));
        assert!(week[6].is_closed());
    }

    #[test]
    fn no_day_is_today_outside_the_current_week() {
        let shop = CatalogBundle::default().shop;
        let week = project(date("2026-11-04"), date("2026-10-14"), &[], &shop);
        assert!(week.iter().all(|day| !day.is_today));
    }

    #[test]
    fn malformed_dates_are_never_projected() {
        let shop = CatalogBundle::default().shop;
        let appointments = vec![appointment(1, "domani", "10:00")];
        let week = project(date("2026-10-14"), date("2026-10-14"), &appointments, &shop);
        assert!(week.iter().all(|day| day.appointments.is_empty()));
    }

    #[test]
    fn labels_days_in_italian() {
        let shop = CatalogBundle::default().shop;
        let week = project(date("2026-10-06"), date("2026-10-06"), &[], &shop);
        assert_eq!(week[0].label(), "lun 5 ott");
        assert_eq!(week[6].label(), "dom 11 ott");
    }

    #[test]
    fn cursor_moves_by_whole_weeks_and_resets_to_today() {
        let today = date("2026-10-17");
        let mut cursor = WeekCursor::new(today);

        assert_eq!(cursor.navigate(WeekNavigation::Next, today), date("2026-10-24"));
        assert_eq!(cursor.navigate(WeekNavigation::Previous, today), today);
        assert_eq!(cursor.navigate(WeekNavigation::Previous, today), date("2026-10-10"));
        assert_eq!(cursor.navigate(WeekNavigation::Current, today), today);
    }
}
