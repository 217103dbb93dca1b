use chrono::{Duration, NaiveDate};

use barberia_core::calendar::{self, DaySlot};

use crate::commands::{load_config, open_stores, runtime, CommandResult, StepFailure};

/// Prints the week `offset` weeks away from today's.
pub fn run(offset: i64) -> CommandResult {
    let config = match load_config("week") {
        Ok(config) => config,
        Err(result) => return result,
    };
    let runtime = match runtime("week") {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    let today = calendar::local_today();
    let Some(reference) = Duration::try_weeks(offset).and_then(|shift| today.checked_add_signed(shift))
    else {
        return CommandResult::failure("week", "invalid_offset", format!("offset {offset} is out of range"), 2);
    };

    let result = runtime.block_on(async {
        let stores = open_stores(&config).await?;
        let shop = stores.catalog.shop_config().await;
        let appointments = stores.appointments.list().await;
        stores.pool.close().await;
        Ok::<_, StepFailure>(calendar::project(reference, today, &appointments, &shop))
    });

    match result {
        Ok(week) => CommandResult::success("week", render_week(&week, reference)),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("week", error_class, message, exit_code)
        }
    }
}

fn render_week(week: &[DaySlot], reference: NaiveDate) -> String {
    let mut lines = vec![format!("week of {reference}:")];
    for day in week {
        let marker = if day.is_today { " (oggi)" } else { "" };
        // Bookings on closed days are still listed under the closed marker.
        if day.is_closed() {
            lines.push(format!("{}{marker}: chiuso", day.label()));
        } else if day.appointments.is_empty() {
            lines.push(format!("{}{marker}: nessun appuntamento", day.label()));
            continue;
        } else {
            lines.push(format!("{}{marker}:", day.label()));
        }
        for appointment in &day.appointments {
            lines.push(format!(
                "  {} {} - {} ({}min, €{})",
                appointment.time,
                appointment.client_name,
                appointment.service,
                appointment.duration,
                appointment.price
            ));
        }
    }
    lines.join("\n")
}
