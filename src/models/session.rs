//! Session models: append-only conversation history.

use serde::{Deserialize, Serialize};

use crate::utils::estimate_tokens;

/// Role of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "system" => Ok(Role::System),
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}

/// One conversation turn. Turns are appended monotonically and never edited.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
    pub created_at: String,
}

impl Turn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// A conversation session: id plus its ordered turns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub turns: Vec<Turn>,
    pub created_at: String,
    pub last_active_at: String,
    pub archived: bool,
}

/// Select the most recent turns that fit the prompt budget.
///
/// The persisted history is never truncated; this is only the view handed
/// to the answer composer. Newest turns win; a turn that would blow the
/// token budget is excluded along with everything older.
pub fn prompt_window(turns: &[Turn], max_turns: usize, token_budget: usize) -> &[Turn] {
    let mut start = turns.len().saturating_sub(max_turns);
    let mut tokens = 0;

    for (i, turn) in turns.iter().enumerate().skip(start).rev() {
        tokens += estimate_tokens(&turn.content);
        if tokens > token_budget {
            start = i + 1;
            break;
        }
    }

    &turns[start.min(turns.len())..]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turn(content: &str) -> Turn {
        Turn::user(content)
    }

    #[test]
    fn window_caps_turn_count() {
        let turns: Vec<Turn> = (0..10).map(|i| turn(&format!("msg {}", i))).collect();
        let window = prompt_window(&turns, 4, 10_000);
        assert_eq!(window.len(), 4);
        assert_eq!(window[0].content, "msg 6");
        assert_eq!(window[3].content, "msg 9");
    }

    #[test]
    fn window_respects_token_budget() {
        // Each turn is ~25 estimated tokens (100 chars)
        let turns: Vec<Turn> = (0..8).map(|_| turn(&"x".repeat(100))).collect();
        let window = prompt_window(&turns, 8, 60);
        assert_eq!(window.len(), 2);
    }

    #[test]
    fn window_of_empty_history_is_empty() {
        let window = prompt_window(&[], 8, 1000);
        assert!(window.is_empty());
    }

    #[test]
    fn window_keeps_order() {
        let turns = vec![turn("first"), turn("second"), turn("third")];
        let window = prompt_window(&turns, 10, 10_000);
        assert_eq!(window.len(), 3);
        assert_eq!(window[0].content, "first");
        assert_eq!(window[2].content, "third");
    }
}
