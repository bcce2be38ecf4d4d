pub mod history;
pub mod leaderboard;

// One row of the admin leaderboard
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Standing {
    pub rank: usize,
    pub item_id: crate::models::ItemId,
    pub label: String,
    pub count: i64,
}

// One bar of a finalized round
#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub label: String,
    pub count: i64,
    pub percentage: f64,
    pub voters: Vec<String>,
}

// Displayable form of a history snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryBars {
    pub total: i64,
    pub bars: Vec<Bar>,
}
