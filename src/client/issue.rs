//! Issue resource: domain record, wire payloads and CRUD calls.

use serde::{Deserialize, Serialize};

use super::{Client, IdName};
use crate::error::ProviderError;
use crate::id;

/// A Redmine issue as it appears in resource state.
///
/// Integer foreign keys use 0 to mean "not set", mirroring how the fields are
/// omitted from requests.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Issue {
    /// String-encoded identifier, "" or "0" before creation.
    pub id: String,
    /// Owning project.
    pub project_id: u32,
    /// Tracker (bug, feature, ...).
    pub tracker_id: u32,
    /// Subject line.
    pub subject: String,
    /// Free-form description.
    pub description: String,
    /// Parent issue, 0 for none.
    pub parent_issue_id: u32,
    /// Priority, 0 for the server default.
    pub priority_id: u32,
    /// Issue category, 0 for none.
    pub category_id: u32,
    /// Server-assigned creation timestamp.
    pub created_on: String,
    /// Server-assigned last update timestamp.
    pub updated_on: String,
}

#[derive(Debug, Serialize)]
struct IssuePayload<'a> {
    project_id: u32,
    tracker_id: u32,
    subject: &'a str,
    description: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    parent_issue_id: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    priority_id: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    category_id: Option<u32>,
}

#[derive(Debug, Serialize)]
struct IssueRequest<'a> {
    issue: IssuePayload<'a>,
}

#[derive(Debug, Deserialize)]
struct ApiIssue {
    id: u32,
    #[serde(default)]
    project: Option<IdName>,
    #[serde(default)]
    tracker: Option<IdName>,
    #[serde(default)]
    priority: Option<IdName>,
    #[serde(default)]
    category: Option<IdName>,
    #[serde(default)]
    parent: Option<IdName>,
    subject: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    created_on: String,
    #[serde(default)]
    updated_on: String,
}

#[derive(Debug, Deserialize)]
struct IssueResponse {
    issue: ApiIssue,
}

fn nonzero(value: u32) -> Option<u32> {
    if value == 0 {
        None
    } else {
        Some(value)
    }
}

fn wrap_issue(issue: &Issue) -> IssueRequest<'_> {
    IssueRequest {
        issue: IssuePayload {
            project_id: issue.project_id,
            tracker_id: issue.tracker_id,
            subject: &issue.subject,
            description: &issue.description,
            parent_issue_id: nonzero(issue.parent_issue_id),
            priority_id: nonzero(issue.priority_id),
            category_id: nonzero(issue.category_id),
        },
    }
}

fn unwrap_issue(api: ApiIssue) -> Issue {
    Issue {
        id: id::format(api.id),
        project_id: api.project.map(|p| p.id).unwrap_or_default(),
        tracker_id: api.tracker.map(|t| t.id).unwrap_or_default(),
        subject: api.subject,
        description: api.description.unwrap_or_default(),
        parent_issue_id: api.parent.map(|p| p.id).unwrap_or_default(),
        priority_id: api.priority.map(|p| p.id).unwrap_or_default(),
        category_id: api.category.map(|c| c.id).unwrap_or_default(),
        created_on: api.created_on,
        updated_on: api.updated_on,
    }
}

impl Client {
    /// Create an issue and return the record the server stored.
    pub async fn create_issue(&self, issue: &Issue) -> Result<Issue, ProviderError> {
        let request = wrap_issue(issue);
        let response: IssueResponse = self
            .post_json("issues.json", &request)
            .await
            .map_err(|e| {
                e.context(format!(
                    "while creating issue (project id: {}, subject: {:?})",
                    issue.project_id, issue.subject
                ))
            })?;
        Ok(unwrap_issue(response.issue))
    }

    /// Read an issue by its identifier.
    pub async fn read_issue(&self, issue_id: &str) -> Result<Issue, ProviderError> {
        let numeric_id = id::parse(issue_id).map_err(|e| e.context("could not read issue"))?;
        let response: IssueResponse = self
            .get_json(&format!("issues/{}.json", numeric_id))
            .await
            .map_err(|e| e.context(format!("while reading issue (id {})", numeric_id)))?;
        Ok(unwrap_issue(response.issue))
    }

    /// Update an existing issue. The server returns no body.
    pub async fn update_issue(&self, issue: &Issue) -> Result<(), ProviderError> {
        let numeric_id = id::parse(&issue.id)
            .map_err(|e| e.context(format!("could not update issue {:?}", issue.subject)))?;
        let request = wrap_issue(issue);
        self.put_json(&format!("issues/{}.json", numeric_id), &request)
            .await
            .map_err(|e| e.context(format!("while updating issue (id {})", numeric_id)))
    }

    /// Delete an issue by its identifier.
    pub async fn delete_issue(&self, issue_id: &str) -> Result<(), ProviderError> {
        let numeric_id = id::parse(issue_id).map_err(|e| e.context("could not delete issue"))?;
        self.delete_json(&format!("issues/{}.json", numeric_id))
            .await
            .map_err(|e| e.context(format!("while deleting issue (id {})", numeric_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_issue_omits_unset_foreign_keys() {
        let issue = Issue {
            project_id: 1,
            tracker_id: 2,
            subject: "login broken".to_string(),
            ..Default::default()
        };

        let body = serde_json::to_value(wrap_issue(&issue)).unwrap();
        assert_eq!(body["issue"]["project_id"], 1);
        assert_eq!(body["issue"]["tracker_id"], 2);
        assert!(body["issue"].get("parent_issue_id").is_none());
        assert!(body["issue"].get("priority_id").is_none());
        assert!(body["issue"].get("category_id").is_none());
    }

    #[test]
    fn test_wrap_issue_carries_set_foreign_keys() {
        let issue = Issue {
            project_id: 1,
            tracker_id: 2,
            subject: "login broken".to_string(),
            parent_issue_id: 10,
            priority_id: 4,
            category_id: 6,
            ..Default::default()
        };

        let body = serde_json::to_value(wrap_issue(&issue)).unwrap();
        assert_eq!(body["issue"]["parent_issue_id"], 10);
        assert_eq!(body["issue"]["priority_id"], 4);
        assert_eq!(body["issue"]["category_id"], 6);
    }

    #[test]
    fn test_unwrap_issue() {
        let response: IssueResponse = serde_json::from_value(serde_json::json!({
            "issue": {
                "id": 33,
                "project": {"id": 1, "name": "Web Shop"},
                "tracker": {"id": 2, "name": "Feature"},
                "priority": {"id": 4, "name": "Urgent"},
                "parent": {"id": 10},
                "subject": "login broken",
                "description": "details",
                "created_on": "2024-02-01T08:00:00Z",
                "updated_on": "2024-02-02T08:00:00Z"
            }
        }))
        .unwrap();

        let issue = unwrap_issue(response.issue);
        assert_eq!(issue.id, "33");
        assert_eq!(issue.project_id, 1);
        assert_eq!(issue.tracker_id, 2);
        assert_eq!(issue.priority_id, 4);
        assert_eq!(issue.parent_issue_id, 10);
        // Category absent from the response means unset
        assert_eq!(issue.category_id, 0);
        assert_eq!(issue.description, "details");
    }
}
