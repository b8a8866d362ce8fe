use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChatId(pub Uuid);

impl ChatId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        Uuid::parse_str(s).map(Self)
    }
}

impl Default for ChatId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ChatId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageId(pub Uuid);

impl MessageId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        Uuid::parse_str(s).map(Self)
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParticipantId(pub Uuid);

impl ParticipantId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        Uuid::parse_str(s).map(Self)
    }
}

impl Default for ParticipantId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How far a message deletion reaches.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum DeleteMode {
    #[serde(rename = "FOR_SENDER_ONLY")]
    ForSenderOnly,
    #[serde(rename = "FOR_EVERYONE")]
    ForEveryone,
}

impl DeleteMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ForSenderOnly => "FOR_SENDER_ONLY",
            Self::ForEveryone => "FOR_EVERYONE",
        }
    }

    pub fn from_literal(s: &str) -> Option<Self> {
        match s {
            "FOR_SENDER_ONLY" => Some(Self::ForSenderOnly),
            "FOR_EVERYONE" => Some(Self::ForEveryone),
            _ => None,
        }
    }
}

impl std::fmt::Display for DeleteMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delete_mode_literals() {
        assert_eq!(
            DeleteMode::from_literal("FOR_EVERYONE"),
            Some(DeleteMode::ForEveryone)
        );
        assert_eq!(DeleteMode::from_literal("for_everyone"), None);
        assert_eq!(
            serde_json::to_string(&DeleteMode::ForSenderOnly).unwrap(),
            "\"FOR_SENDER_ONLY\""
        );
    }

    #[test]
    fn ids_parse_back_from_display() {
        let id = ChatId::new();
        assert_eq!(ChatId::parse(&id.to_string()).unwrap(), id);
        assert!(MessageId::parse("not-a-uuid").is_err());
    }
}
