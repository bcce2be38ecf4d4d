use crate::models::{HistoryEntry, HistorySnapshot};
use crate::voting::{Bar, HistoryBars};

const BAR_WIDTH: usize = 20;

/// Percentages are of the round's total; a round with no votes shows 0% and,
/// since zero-count entries are left out, no bars at all.
pub fn history_bars(entries: &[HistoryEntry]) -> HistoryBars {
    let total: i64 = entries.iter().map(|entry| entry.count).sum();

    let bars = entries
        .iter()
        .filter(|entry| entry.count > 0)
        .map(|entry| Bar {
            label: entry.label.clone(),
            count: entry.count,
            percentage: percentage(entry.count, total),
            voters: entry.voters.clone(),
        })
        .collect();

    HistoryBars { total, bars }
}

fn percentage(count: i64, total: i64) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64 * 100.0
    }
}

pub fn render_history(snapshot: &HistorySnapshot) -> String {
    let view = history_bars(&snapshot.result_data);

    let mut summary = format!(
        "#{} - {} ({} votes)\n",
        snapshot.id,
        snapshot.created_at.format("%Y-%m-%d %H:%M"),
        view.total
    );

    if view.bars.is_empty() {
        summary.push_str("  No votes were cast in this round.\n");
        return summary;
    }

    for bar in &view.bars {
        let filled = ((bar.percentage / 100.0) * BAR_WIDTH as f64).round() as usize;
        summary.push_str(&format!(
            "  {:<16} {}{} {:>5.1}% ({})\n",
            bar.label,
            "█".repeat(filled),
            "░".repeat(BAR_WIDTH - filled.min(BAR_WIDTH)),
            bar.percentage,
            bar.count
        ));
        if !bar.voters.is_empty() {
            summary.push_str(&format!("    {}\n", bar.voters.join(", ")));
        }
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn entry(label: &str, count: i64, voters: &[&str]) -> HistoryEntry {
        HistoryEntry {
            label: label.to_string(),
            count,
            voters: voters.iter().map(|v| v.to_string()).collect(),
        }
    }

    #[test]
    fn percentages_and_zero_rows() {
        let entries = vec![
            entry("A", 3, &["Kim", "Lee", "Max"]),
            entry("B", 1, &["Dana"]),
            entry("C", 0, &[]),
        ];

        let view = history_bars(&entries);
        assert_eq!(view.total, 4);
        assert_eq!(view.bars.len(), 2);
        assert_eq!(view.bars[0].percentage, 75.0);
        assert_eq!(view.bars[1].percentage, 25.0);
        assert_eq!(view.bars[1].voters, vec!["Dana"]);
        // the stored data is not touched
        assert_eq!(entries.len(), 3);
    }

    #[test]
    fn empty_round_has_no_bars() {
        let view = history_bars(&[entry("A", 0, &[]), entry("B", 0, &[])]);
        assert_eq!(view.total, 0);
        assert!(view.bars.is_empty());
        assert_eq!(percentage(0, 0), 0.0);
    }

    #[test]
    fn rendered_snapshot_lists_voters() {
        let snapshot = HistorySnapshot {
            id: 7,
            created_at: Utc.with_ymd_and_hms(2026, 3, 1, 18, 30, 0).unwrap(),
            result_data: vec![entry("A", 1, &["Kim"]), entry("B", 1, &["Lee"]), entry("C", 0, &[])],
        };

        let text = render_history(&snapshot);
        assert!(text.starts_with("#7 - 2026-03-01 18:30 (2 votes)"));
        assert!(text.contains("50.0% (1)"));
        assert!(text.contains("    Kim\n"));
        assert!(!text.contains("C "));
    }

    #[test]
    fn rendered_empty_round() {
        let snapshot = HistorySnapshot {
            id: 1,
            created_at: Utc.with_ymd_and_hms(2026, 3, 1, 18, 30, 0).unwrap(),
            result_data: vec![entry("A", 0, &[])],
        };
        assert!(render_history(&snapshot).contains("No votes were cast"));
    }
}
