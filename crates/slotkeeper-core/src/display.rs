//! Plain-text calendar table for the console

use owo_colors::OwoColorize;
use slotkeeper_api::SlotView;
use slotkeeper_util::{format_clock_time, format_date};

const HEADERS: [&str; 6] = ["Date", "Time Slot", "Booked", "Client", "Advisor", "Description"];
const WIDTHS: [usize; 6] = [10, 13, 6, 12, 12, 24];
const BOOKED_COLUMN: usize = 2;

/// Render slots as a bordered table, one row per slot in the given order.
///
/// Padding is computed on the plain text before any colour is applied, so
/// columns stay aligned with `colored` on.
pub fn render_calendar(slots: &[SlotView], colored: bool) -> String {
    let border = border();
    let mut out = String::new();

    out.push_str(&border);
    out.push('\n');

    let header: Vec<String> = HEADERS.iter().map(|h| h.to_string()).collect();
    out.push_str(&row(&header, |_, cell| {
        if colored { cell.bold().to_string() } else { cell }
    }));
    out.push('\n');
    out.push_str(&border);
    out.push('\n');

    for slot in slots {
        let cells = vec![
            format_date(slot.date),
            format!(
                "{} - {}",
                format_clock_time(slot.start_time),
                format_clock_time(slot.end_time)
            ),
            if slot.booked { "Yes" } else { "No" }.to_string(),
            slot.client.trim().to_string(),
            slot.advisor.trim().to_string(),
            slot.description.trim().to_string(),
        ];
        out.push_str(&row(&cells, |column, cell| match (colored, column, slot.booked) {
            (true, BOOKED_COLUMN, true) => cell.red().to_string(),
            (true, BOOKED_COLUMN, false) => cell.green().to_string(),
            _ => cell,
        }));
        out.push('\n');
    }

    out.push_str(&border);
    out.push('\n');
    out
}

fn border() -> String {
    let mut line = String::from("+");
    for width in WIDTHS {
        line.push_str(&"-".repeat(width + 2));
        line.push('+');
    }
    line
}

fn row(cells: &[String], mut style: impl FnMut(usize, String) -> String) -> String {
    let mut line = String::from("|");
    for (column, (cell, width)) in cells.iter().zip(WIDTHS).enumerate() {
        let padded = format!("{cell:<width$}");
        line.push(' ');
        line.push_str(&style(column, padded));
        line.push_str(" |");
    }
    line
}
