//! Status and role enums shared by every component.
//!
//! Serialized names match the values already present in persisted
//! collections (`"client"`, `"admin"`, `"pending"`, ...).

use serde::{Deserialize, Serialize};

/// Error returned when parsing one of the enums in this module from text.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid {kind}: {value}")]
pub struct StatusParseError {
    /// Which enum was being parsed.
    pub kind: &'static str,
    /// The rejected input.
    pub value: String,
}

impl StatusParseError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_owned(),
        }
    }
}

/// Who wrote a chat message (and, by extension, which side is viewing).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    /// A storefront customer, signed in or anonymous.
    Client,
    /// Store staff answering from the admin panel.
    Admin,
}

impl Sender {
    /// The other side of the conversation.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Client => Self::Admin,
            Self::Admin => Self::Client,
        }
    }

    /// The notification channel addressed to whoever did *not* send.
    #[must_use]
    pub const fn recipient_channel(self) -> Channel {
        match self {
            Self::Client => Channel::Admin,
            Self::Admin => Channel::Client,
        }
    }
}

impl std::fmt::Display for Sender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Client => write!(f, "client"),
            Self::Admin => write!(f, "admin"),
        }
    }
}

impl std::str::FromStr for Sender {
    type Err = StatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "client" => Ok(Self::Client),
            "admin" => Ok(Self::Admin),
            _ => Err(StatusParseError::new("sender", s)),
        }
    }
}

/// Audience of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    /// Read by store staff.
    #[default]
    Admin,
    /// Read by the customer.
    Client,
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Admin => write!(f, "admin"),
            Self::Client => write!(f, "client"),
        }
    }
}

impl std::str::FromStr for Channel {
    type Err = StatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Self::Admin),
            "client" => Ok(Self::Client),
            _ => Err(StatusParseError::new("channel", s)),
        }
    }
}

/// What triggered a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NotificationKind {
    /// A chat message from the other side.
    Chat,
    /// A new order placed at checkout.
    Order,
    /// A customer asked for a password reset.
    PasswordReset,
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Chat => write!(f, "chat"),
            Self::Order => write!(f, "order"),
            Self::PasswordReset => write!(f, "passwordReset"),
        }
    }
}

/// Lifecycle status of an order.
///
/// ```text
/// pending ──► processing ──► completed
///    │             │
///    └──────► cancelled ◄────┘
/// ```
///
/// `completed` and `cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Placed at checkout, awaiting staff review.
    #[default]
    Pending,
    /// Approved by staff and being prepared.
    Processing,
    /// Delivered.
    Completed,
    /// Rejected or abandoned.
    Cancelled,
}

impl OrderStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [Self; 4] = [
        Self::Pending,
        Self::Processing,
        Self::Completed,
        Self::Cancelled,
    ];

    /// Statuses reachable in one step from `self`.
    #[must_use]
    pub const fn successors(self) -> &'static [Self] {
        match self {
            Self::Pending => &[Self::Processing, Self::Cancelled],
            Self::Processing => &[Self::Completed, Self::Cancelled],
            Self::Completed | Self::Cancelled => &[],
        }
    }

    /// Whether moving from `self` to `target` is a legal single step.
    #[must_use]
    pub fn can_transition_to(self, target: Self) -> bool {
        self.successors().contains(&target)
    }

    /// Whether no further transition is possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Processing => write!(f, "processing"),
            Self::Completed => write!(f, "completed"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = StatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "completed" => Ok(Self::Completed),
            "cancelled" | "canceled" => Ok(Self::Cancelled),
            _ => Err(StatusParseError::new("order status", s)),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_sender_opposite_and_channel() {
        assert_eq!(Sender::Client.opposite(), Sender::Admin);
        assert_eq!(Sender::Admin.opposite(), Sender::Client);
        assert_eq!(Sender::Client.recipient_channel(), Channel::Admin);
        assert_eq!(Sender::Admin.recipient_channel(), Channel::Client);
    }

    #[test]
    fn test_sender_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Sender::Client).unwrap(), "\"client\"");
        let parsed: Sender = serde_json::from_str("\"admin\"").unwrap();
        assert_eq!(parsed, Sender::Admin);
    }

    #[test]
    fn test_notification_kind_names() {
        assert_eq!(
            serde_json::to_string(&NotificationKind::PasswordReset).unwrap(),
            "\"passwordReset\""
        );
        assert_eq!(serde_json::to_string(&NotificationKind::Chat).unwrap(), "\"chat\"");
    }

    #[test]
    fn test_order_transition_table() {
        use OrderStatus::{Cancelled, Completed, Pending, Processing};

        let legal = [
            (Pending, Processing),
            (Pending, Cancelled),
            (Processing, Completed),
            (Processing, Cancelled),
        ];

        for from in OrderStatus::ALL {
            for to in OrderStatus::ALL {
                assert_eq!(
                    from.can_transition_to(to),
                    legal.contains(&(from, to)),
                    "{from} -> {to}"
                );
            }
        }
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(OrderStatus::Completed.is_terminal());
        assert!(OrderStatus::Cancelled.is_terminal());
        assert!(!OrderStatus::Pending.is_terminal());
        assert!(OrderStatus::Completed.successors().is_empty());
    }

    #[test]
    fn test_order_status_from_str() {
        assert_eq!("Processing".parse::<OrderStatus>().unwrap(), OrderStatus::Processing);
        assert_eq!("canceled".parse::<OrderStatus>().unwrap(), OrderStatus::Cancelled);
        let err = "shipped".parse::<OrderStatus>().unwrap_err();
        assert_eq!(err.to_string(), "invalid order status: shipped");
    }
}
