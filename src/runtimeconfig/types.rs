// Request and response payloads for the Runtime Configuration API
//
// These mirror the v1beta1 REST resources. Field names follow the service's
// camelCase JSON, and unset optional fields are left out of request bodies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::optional_base64;

/// A named container of variables
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeConfig {
    /// Full resource path, `projects/<id>/configs/<name>`
    #[serde(default)]
    pub name: String,
    /// Free-form description
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

impl RuntimeConfig {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }
}

/// One page of `projects.configs.list`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListConfigsResponse {
    #[serde(default)]
    pub configs: Vec<RuntimeConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
}

impl ListConfigsResponse {
    /// Token for the next page, if the service reported one
    pub fn next_page(&self) -> Option<&str> {
        self.next_page_token.as_deref().filter(|t| !t.is_empty())
    }
}

/// Lifecycle state reported for a variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VariableState {
    VariableStateUnspecified,
    Updated,
    Deleted,
    #[serde(other)]
    Unknown,
}

/// A single named value nested under a config
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variable {
    /// Full resource path, `<configPath>/variables/<name>`
    #[serde(default)]
    pub name: String,
    /// Text value; mutually exclusive with `value`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Binary value, base64 on the wire
    #[serde(
        default,
        with = "optional_base64",
        skip_serializing_if = "Option::is_none"
    )]
    pub value: Option<Vec<u8>>,
    #[serde(default, skip_serializing)]
    pub update_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing)]
    pub state: Option<VariableState>,
}

impl Variable {
    /// Build a text variable ready to be created
    pub fn with_text(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: Some(text.into()),
            ..Default::default()
        }
    }

    /// Text value, or empty when the variable holds binary data
    pub fn text_value(&self) -> &str {
        self.text.as_deref().unwrap_or_default()
    }
}

/// Condition attached to a binding
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Expr {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub expression: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub location: String,
}

/// Associates a set of members with a role
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Binding {
    #[serde(default)]
    pub role: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub members: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Expr>,
}

impl Binding {
    pub fn new(role: impl Into<String>, members: Vec<String>) -> Self {
        Self {
            role: role.into(),
            members,
            condition: None,
        }
    }
}

/// Access-control policy attached to a config
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Policy {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bindings: Vec<Binding>,
    /// Opaque concurrency token, base64 on the wire
    #[serde(
        default,
        with = "optional_base64",
        skip_serializing_if = "Option::is_none"
    )]
    pub etag: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<i32>,
}

impl Policy {
    /// A policy holding exactly one binding
    pub fn single(binding: Binding) -> Self {
        Self {
            bindings: vec![binding],
            ..Default::default()
        }
    }
}

/// Body of `projects.configs.setIamPolicy`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetIamPolicyRequest {
    pub policy: Policy,
}

/// Error envelope returned by Google APIs
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ErrorEnvelope {
    pub error: ErrorStatus,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ErrorStatus {
    #[serde(default)]
    pub code: u16,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub status: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_policy_serializes_without_empty_fields() {
        let policy = Policy::single(Binding::new(
            "roles/viewer",
            vec!["serviceAccount:sa@test-proj.iam.gserviceaccount.com".to_string()],
        ));

        let value = serde_json::to_value(&policy).unwrap();
        assert_eq!(
            value,
            json!({
                "bindings": [{
                    "role": "roles/viewer",
                    "members": ["serviceAccount:sa@test-proj.iam.gserviceaccount.com"]
                }]
            })
        );
    }

    #[test]
    fn test_policy_response_with_etag() {
        let policy: Policy = serde_json::from_value(json!({
            "version": 1,
            "etag": "BwWKmjvelug=",
            "bindings": [{"role": "roles/viewer", "members": ["user:a@example.com"]}]
        }))
        .unwrap();

        assert_eq!(policy.version, Some(1));
        assert!(policy.etag.is_some());
        let round = serde_json::to_value(&policy).unwrap();
        assert_eq!(round["etag"], "BwWKmjvelug=");
    }

    #[test]
    fn test_variable_response_fields() {
        let variable: Variable = serde_json::from_value(json!({
            "name": "projects/p/configs/c/variables/myvar1",
            "text": "mysecret1",
            "updateTime": "2018-03-01T12:00:00.123Z",
            "state": "UPDATED"
        }))
        .unwrap();

        assert_eq!(variable.text_value(), "mysecret1");
        assert_eq!(variable.state, Some(VariableState::Updated));
        assert!(variable.update_time.is_some());
    }

    #[test]
    fn test_variable_create_body() {
        let variable = Variable::with_text("projects/p/configs/c/variables/myvar1", "mysecret1");
        let value = serde_json::to_value(&variable).unwrap();
        assert_eq!(
            value,
            json!({"name": "projects/p/configs/c/variables/myvar1", "text": "mysecret1"})
        );
    }

    #[test]
    fn test_binary_variable_has_empty_text() {
        let variable: Variable =
            serde_json::from_value(json!({"name": "v", "value": "AAEC"})).unwrap();
        assert_eq!(variable.text_value(), "");
        assert_eq!(variable.value, Some(vec![0, 1, 2]));
    }

    #[test]
    fn test_list_response_paging() {
        let empty: ListConfigsResponse = serde_json::from_value(json!({})).unwrap();
        assert!(empty.configs.is_empty());
        assert_eq!(empty.next_page(), None);

        let blank: ListConfigsResponse =
            serde_json::from_value(json!({"configs": [], "nextPageToken": ""})).unwrap();
        assert_eq!(blank.next_page(), None);

        let paged: ListConfigsResponse = serde_json::from_value(json!({
            "configs": [{"name": "projects/p/configs/a"}],
            "nextPageToken": "abc"
        }))
        .unwrap();
        assert_eq!(paged.next_page(), Some("abc"));
        assert_eq!(paged.configs[0].name, "projects/p/configs/a");
    }

    #[test]
    fn test_unknown_variable_state() {
        let variable: Variable =
            serde_json::from_value(json!({"name": "v", "state": "SOMETHING_NEW"})).unwrap();
        assert_eq!(variable.state, Some(VariableState::Unknown));
    }
}
