use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub type ItemId = i64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub label: String,
    pub count: i64,
}

/// One participant's vote for one item, as stored by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vote {
    pub user_id: String,
    pub item_id: ItemId,
    pub user_name: String,
}

/// Whether a participant may hold one selection or many.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Single,
    #[default]
    Multiple,
}

impl Mode {
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Single => "single",
            Mode::Multiple => "multiple",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "single" => Ok(Mode::Single),
            "multiple" | "multi" => Ok(Mode::Multiple),
            other => Err(format!("Unknown voting mode: {}", other)),
        }
    }
}

/// Everything a poll returns: the items with their server-side counts and the
/// current mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TallyState {
    pub items: Vec<Item>,
    pub mode: Mode,
}

impl TallyState {
    pub fn total_votes(&self) -> i64 {
        self.items.iter().map(|item| item.count).sum()
    }

    pub fn item(&self, id: ItemId) -> Option<&Item> {
        self.items.iter().find(|item| item.id == id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub label: String,
    pub count: i64,
    pub voters: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistorySnapshot {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub result_data: Vec<HistoryEntry>,
}

impl HistorySnapshot {
    pub fn total_votes(&self) -> i64 {
        self.result_data.iter().map(|entry| entry.count).sum()
    }
}

/// Body of `POST /api/vote`, discriminated by its `type` field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum VoteRequest {
    Vote {
        id: ItemId,
        #[serde(rename = "userId")]
        user_id: String,
        #[serde(rename = "userName")]
        user_name: String,
    },
    Unvote {
        id: ItemId,
        #[serde(rename = "userId")]
        user_id: String,
    },
    UpdateLabel {
        id: ItemId,
        label: String,
    },
    Reset,
    SetMode {
        mode: Mode,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteHistoryRequest {
    pub id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {
    pub success: bool,
}

impl Ack {
    pub fn ok() -> Self {
        Self { success: true }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vote_request_uses_camel_case_wire_names() {
        let body = r#"{"type":"vote","id":3,"userId":"u-1","userName":"Kim"}"#;
        let parsed: VoteRequest = serde_json::from_str(body).unwrap();
        assert_eq!(
            parsed,
            VoteRequest::Vote {
                id: 3,
                user_id: "u-1".to_string(),
                user_name: "Kim".to_string(),
            }
        );

        let set_mode: VoteRequest = serde_json::from_str(r#"{"type":"setMode","mode":"single"}"#).unwrap();
        assert_eq!(set_mode, VoteRequest::SetMode { mode: Mode::Single });

        let reset: VoteRequest = serde_json::from_str(r#"{"type":"reset"}"#).unwrap();
        assert_eq!(reset, VoteRequest::Reset);
    }

    #[test]
    fn mode_parses_loosely() {
        assert_eq!("Single".parse::<Mode>(), Ok(Mode::Single));
        assert_eq!(" multi ".parse::<Mode>(), Ok(Mode::Multiple));
        assert!("ranked".parse::<Mode>().is_err());
    }

    #[test]
    fn modes_order_by_declaration() {
        let mut modes = vec![Mode::Multiple, Mode::Single, Mode::Multiple];
        modes.sort();
        assert_eq!(modes, vec![Mode::Single, Mode::Multiple, Mode::Multiple]);
    }

    #[test]
    fn total_votes_sums_counts() {
        let state = TallyState {
            items: vec![
                Item { id: 1, label: "A".into(), count: 3 },
                Item { id: 2, label: "B".into(), count: 1 },
            ],
            mode: Mode::Single,
        };
        assert_eq!(state.total_votes(), 4);
        assert_eq!(state.item(2).map(|i| i.label.as_str()), Some("B"));
    }
}
