//! One exchange between a user and the assistant

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A user message and the assistant's answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    /// When the exchange happened
    pub time: DateTime<Utc>,

    /// What the user said
    pub user: String,

    /// What the assistant answered
    pub assistant: String,
}

impl Conversation {
    /// Exchange stamped with the current time
    pub fn now(user: impl Into<String>, assistant: impl Into<String>) -> Self {
        Self {
            time: Utc::now(),
            user: user.into(),
            assistant: assistant.into(),
        }
    }
}

/// Render conversations as text blocks separated by blank lines
pub fn format_conversations(conversations: &[Conversation]) -> String {
    conversations
        .iter()
        .map(|c| {
            format!(
                "{}\nUser: {}\nAssistant: {}\n",
                c.time.format("%Y-%m-%d %H:%M:%S"),
                c.user,
                c.assistant
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_conversations() {
        let first = Conversation {
            time: Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap(),
            user: "hello".to_string(),
            assistant: "hi".to_string(),
        };
        let second = Conversation {
            time: Utc.with_ymd_and_hms(2024, 5, 1, 9, 5, 0).unwrap(),
            user: "bye".to_string(),
            assistant: "see you".to_string(),
        };

        assert_eq!(
            format_conversations(&[first, second]),
            "2024-05-01 09:00:00\nUser: hello\nAssistant: hi\n\n2024-05-01 09:05:00\nUser: bye\nAssistant: see you\n"
        );
        assert_eq!(format_conversations(&[]), "");
    }
}
