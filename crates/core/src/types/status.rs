//! Status enums for persisted entities.

use serde::{Deserialize, Serialize};

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "chat_role", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    User,
    Assistant,
    System,
}

impl std::fmt::Display for ChatRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
            Self::System => write!(f, "system"),
        }
    }
}

impl std::str::FromStr for ChatRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "assistant" => Ok(Self::Assistant),
            "system" => Ok(Self::System),
            _ => Err(format!("invalid chat role: {s}")),
        }
    }
}

/// Lifecycle of a purchase history row.
///
/// Checkout writes `Completed` directly; the other states exist for
/// rows written by external fulfilment tooling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "purchase_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseStatus {
    Pending,
    #[default]
    Completed,
    Cancelled,
}

impl std::fmt::Display for PurchaseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Completed => write!(f, "completed"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl std::str::FromStr for PurchaseStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(format!("invalid purchase status: {s}")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_role_round_trips_through_display() {
        for role in [ChatRole::User, ChatRole::Assistant, ChatRole::System] {
            assert_eq!(role.to_string().parse::<ChatRole>().unwrap(), role);
        }
        assert!("tool_use".parse::<ChatRole>().is_err());
    }

    #[test]
    fn test_purchase_status_serializes_snake_case() {
        let json = serde_json::to_string(&PurchaseStatus::Completed).unwrap();
        assert_eq!(json, "\"completed\"");
        assert_eq!(PurchaseStatus::default(), PurchaseStatus::Completed);
    }
}
