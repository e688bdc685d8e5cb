//! Plain-text rendering of the board.

use chrono::{DateTime, Utc};

use crate::domain::presentation::{ListChange, RateListViewModel, RateViewModel};

/// One row, e.g. `EURUSD  1.0845 / 1.0855  mid 1.0850  spr 0.00100  ▲ 0.82  2.4s ago`.
#[must_use]
pub fn format_row(row: &RateViewModel, now: DateTime<Utc>) -> String {
    let marker = if row.highlight_intensity() > 0.0 {
        format!(
            "{} {:.2}",
            row.highlight_direction().arrow(),
            row.highlight_intensity()
        )
    } else {
        "      ".to_string()
    };

    format!(
        "{:<7} {:>10.4} / {:<10.4} mid {:>10.4}  spr {:.5}  {}  {}",
        row.instrument_key(),
        row.bid(),
        row.ask(),
        row.mid(),
        row.spread(),
        marker,
        row.last_updated_display(now)
    )
}

/// Status line followed by every row in list order.
#[must_use]
pub fn render_board(list: &RateListViewModel, now: DateTime<Utc>) -> Vec<String> {
    std::iter::once(list.status_text().to_string())
        .chain(list.rows().iter().map(|row| format_row(row, now)))
        .collect()
}

/// Log structural list changes at `debug`.
///
/// High-frequency changes (highlight steps, time-ago refreshes) are skipped.
pub fn attach_change_log(list: &mut RateListViewModel) {
    list.changes_mut().subscribe(|change| match change {
        ListChange::RowAdded { index, key } => {
            tracing::debug!(index, instrument = %key, "Row added");
        }
        ListChange::PulseStarted { index, direction } => {
            tracing::debug!(index, direction = direction.as_str(), "Pulse started");
        }
        ListChange::StatusText => tracing::debug!("Status text changed"),
        ListChange::RowUpdated { .. }
        | ListChange::HighlightChanged { .. }
        | ListChange::TimeAgoRefreshed { .. } => {}
    });
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::domain::presentation::DecayCurve;
    use crate::domain::rate::Rate;

    #[test]
    fn row_shows_prices_marker_and_age() {
        let now = Utc::now();
        let mut list = RateListViewModel::new(DecayCurve::new(10, Duration::from_millis(100)));
        list.apply(&Rate::from_quote("EURUSD", 1.0845, 1.0855, "TEST", now));
        list.apply(&Rate::from_quote("EURUSD", 1.0895, 1.0905, "TEST", now));

        let line = format_row(list.get("EURUSD").unwrap(), now + chrono::Duration::seconds(2));

        assert!(line.starts_with("EURUSD"));
        assert!(line.contains("1.0895"));
        assert!(line.contains("▲ 1.00"));
        assert!(line.ends_with("2.0s ago"));
    }

    #[test]
    fn board_starts_with_status() {
        let mut list = RateListViewModel::new(DecayCurve::default());
        list.apply(&Rate::from_quote("GBPUSD", 1.2645, 1.2655, "TEST", Utc::now()));
        attach_change_log(&mut list);

        let lines = render_board(&list, Utc::now());

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "Initializing...");
        assert!(lines[1].starts_with("GBPUSD"));
    }
}
