//! JSON request/response shapes for the Directory and Reports APIs. Kept
//! separate from the trait implementations so the wire format (Google's
//! camelCase, nested `name` object, string booleans in reports) doesn't
//! leak into `gappsd-core`'s domain types.

use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Default)]
pub struct WireName {
    #[serde(rename = "givenName")]
    pub given_name: String,
    #[serde(rename = "familyName")]
    pub family_name: String,
}

#[derive(Debug, Deserialize, Serialize, Default)]
pub struct WireUser {
    #[serde(rename = "primaryEmail")]
    pub primary_email: String,
    pub name: WireName,
    #[serde(rename = "isAdmin", default)]
    pub is_admin: bool,
    #[serde(default)]
    pub suspended: bool,
    #[serde(rename = "suspensionReason", skip_serializing_if = "Option::is_none")]
    pub suspension_reason: Option<String>,
    #[serde(rename = "creationTime", skip_serializing_if = "Option::is_none")]
    pub creation_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(rename = "hashFunction", skip_serializing_if = "Option::is_none")]
    pub hash_function: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct WireUsersList {
    #[serde(default)]
    pub users: Vec<WireUser>,
    #[serde(rename = "nextPageToken")]
    pub next_page_token: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct WireAlias {
    pub alias: String,
}

#[derive(Debug, Deserialize)]
pub struct WireAliasesList {
    #[serde(default)]
    pub aliases: Vec<WireAlias>,
}

#[derive(Debug, Deserialize)]
pub struct WireApiError {
    pub error: WireApiErrorBody,
}

#[derive(Debug, Deserialize)]
pub struct WireApiErrorBody {
    pub code: u16,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct WireUsageReportsList {
    #[serde(default, rename = "usageReports")]
    pub usage_reports: Vec<WireUsageReport>,
}

#[derive(Debug, Deserialize)]
pub struct WireUsageReport {
    pub date: String,
    pub parameters: Vec<WireUsageParameter>,
}

#[derive(Debug, Deserialize)]
pub struct WireUsageParameter {
    pub name: String,
    #[serde(rename = "intValue")]
    pub int_value: Option<String>,
}

impl WireUsageReport {
    pub fn int_value(&self, name: &str) -> Option<i64> {
        self.parameters
            .iter()
            .find(|p| p.name == name)
            .and_then(|p| p.int_value.as_ref())
            .and_then(|v| v.parse().ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_value_parses_the_named_parameter() {
        let report = WireUsageReport {
            date: "2026-07-20".into(),
            parameters: vec![
                WireUsageParameter { name: "accounts:num_1day_logins".into(), int_value: Some("42".into()) },
                WireUsageParameter { name: "accounts:used_quota_in_mb".into(), int_value: Some("1024".into()) },
            ],
        };

        assert_eq!(report.int_value("accounts:num_1day_logins"), Some(42));
        assert_eq!(report.int_value("accounts:used_quota_in_mb"), Some(1024));
        assert_eq!(report.int_value("accounts:num_7day_logins"), None);
    }

    #[test]
    fn int_value_is_none_when_the_parameter_carries_no_value() {
        let report = WireUsageReport {
            date: "2026-07-20".into(),
            parameters: vec![WireUsageParameter { name: "accounts:num_1day_logins".into(), int_value: None }],
        };
        assert_eq!(report.int_value("accounts:num_1day_logins"), None);
    }

    /// Directory responses use camelCase and a nested `name` object; a
    /// single representative payload guards the `serde(rename)` table.
    #[test]
    fn wire_user_deserializes_the_directory_api_shape() {
        let body = r#"{
            "primaryEmail": "jane.doe@example.org",
            "name": { "givenName": "Jane", "familyName": "Doe" },
            "isAdmin": true,
            "suspended": false,
            "suspensionReason": "ADMIN_DISABLED"
        }"#;

        let user: WireUser = serde_json::from_str(body).unwrap();
        assert_eq!(user.primary_email, "jane.doe@example.org");
        assert_eq!(user.name.given_name, "Jane");
        assert_eq!(user.name.family_name, "Doe");
        assert!(user.is_admin);
        assert!(!user.suspended);
        assert_eq!(user.suspension_reason.as_deref(), Some("ADMIN_DISABLED"));
    }

    #[test]
    fn wire_api_error_exposes_the_status_and_message() {
        let body = r#"{"error": {"code": 403, "message": "Not Authorized to access this resource/api"}}"#;
        let parsed: WireApiError = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.error.code, 403);
        assert_eq!(parsed.error.message, "Not Authorized to access this resource/api");
    }
}
