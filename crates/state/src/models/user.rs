//! Signed-in customer and password-reset requests.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use wonder_core::{Email, ResetRequestId, UserId};

/// The customer signed in on this browser profile (`currentUser`).
///
/// Other fields a client may store alongside these are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedInUser {
    pub id: UserId,
    pub name: String,
    pub email: Email,
}

/// A customer asking staff to reset their password.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordResetRequest {
    pub id: ResetRequestId,
    pub email: Email,
    pub user_name: String,
    pub user_id: UserId,
    pub requested_at: DateTime<Utc>,
    #[serde(default)]
    pub resolved: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
}

impl PasswordResetRequest {
    /// Whether staff still has to act on this request.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        !self.resolved
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_current_user_ignores_extra_fields() {
        let user: SignedInUser = serde_json::from_value(json!({
            "id": 1_700_000_000_000_i64,
            "name": "Jane",
            "email": "Jane@Example.com",
            "password": "hunter22",
            "phone": "0788"
        }))
        .unwrap();
        assert_eq!(user.email.as_str(), "jane@example.com");
    }

    #[test]
    fn test_reset_request_shape() {
        let req: PasswordResetRequest = serde_json::from_value(json!({
            "id": 1,
            "email": "jane@example.com",
            "userName": "Jane",
            "userId": 9,
            "requestedAt": "2024-01-01T10:00:00Z",
            "resolved": false
        }))
        .unwrap();
        assert!(req.is_pending());
        let out = serde_json::to_value(&req).unwrap();
        assert!(out.get("resolvedAt").is_none());
    }
}
