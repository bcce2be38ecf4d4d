use crate::models::{Item, ItemId};
use crate::voting::Standing;
use std::collections::BTreeSet;

pub const LEADERBOARD_SIZE: usize = 3;

/// Highest counts first. The sort is stable, so equal counts keep the order
/// the items were fetched in (by id).
pub fn top_items(items: &[Item], limit: usize) -> Vec<Standing> {
    let mut sorted: Vec<&Item> = items.iter().collect();
    sorted.sort_by(|a, b| b.count.cmp(&a.count));

    sorted
        .into_iter()
        .take(limit)
        .enumerate()
        .map(|(i, item)| Standing {
            rank: i + 1,
            item_id: item.id,
            label: item.label.clone(),
            count: item.count,
        })
        .collect()
}

pub fn render_leaderboard(standings: &[Standing]) -> String {
    if standings.is_empty() {
        return "No items yet.".to_string();
    }

    let mut summary = String::from("Live ranking\n");
    for standing in standings {
        let line = if standing.rank == 1 {
            format!("**{}. {}** - {} votes", standing.rank, standing.label, standing.count)
        } else {
            format!("{}. {} - {} votes", standing.rank, standing.label, standing.count)
        };
        summary.push_str(&line);
        summary.push('\n');
    }
    summary
}

/// The participant's grid: every item in id order with its server count, and a
/// marker on the ones this session has selected.
pub fn render_board(items: &[Item], selection: &BTreeSet<ItemId>) -> String {
    let mut board = String::new();
    for item in items {
        let marker = if selection.contains(&item.id) { "[x]" } else { "[ ]" };
        board.push_str(&format!("{} {:>3}  {} ({})\n", marker, item.id, item.label, item.count));
    }
    board
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: ItemId, label: &str, count: i64) -> Item {
        Item {
            id,
            label: label.to_string(),
            count,
        }
    }

    #[test]
    fn top_three_by_count() {
        let items = vec![
            item(1, "A", 1),
            item(2, "B", 5),
            item(3, "C", 0),
            item(4, "D", 3),
            item(5, "E", 2),
        ];

        let top = top_items(&items, LEADERBOARD_SIZE);
        let labels: Vec<&str> = top.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, vec!["B", "D", "E"]);
        assert_eq!(top[0].rank, 1);
        assert_eq!(top[2].rank, 3);
    }

    #[test]
    fn ties_keep_id_order() {
        let items = vec![item(1, "A", 2), item(2, "B", 2), item(3, "C", 4), item(4, "D", 2)];

        let top = top_items(&items, LEADERBOARD_SIZE);
        let ids: Vec<ItemId> = top.iter().map(|s| s.item_id).collect();
        assert_eq!(ids, vec![3, 1, 2]);
    }

    #[test]
    fn fewer_items_than_limit() {
        let top = top_items(&[item(1, "A", 0)], LEADERBOARD_SIZE);
        assert_eq!(top.len(), 1);
        assert!(top_items(&[], LEADERBOARD_SIZE).is_empty());
    }

    #[test]
    fn leaderboard_text_highlights_leader() {
        let text = render_leaderboard(&top_items(&[item(1, "A", 1), item(2, "B", 3)], 3));
        assert!(text.contains("**1. B** - 3 votes"));
        assert!(text.contains("2. A - 1 votes"));
    }

    #[test]
    fn board_marks_local_selection() {
        let items = vec![item(1, "A", 0), item(2, "B", 7)];
        let selection = BTreeSet::from([2]);

        let board = render_board(&items, &selection);
        let lines: Vec<&str> = board.lines().collect();
        assert!(lines[0].starts_with("[ ]"));
        assert!(lines[1].starts_with("[x]"));
        assert!(lines[1].ends_with("B (7)"));
    }
}
