//! Version resource: domain record, wire payloads and CRUD calls.
//!
//! Versions are created underneath a project
//! (`POST /projects/{project_id}/versions.json`) but addressed directly for
//! read/update/delete.

use serde::{Deserialize, Serialize};

use super::{Client, IdName};
use crate::error::ProviderError;
use crate::id;

/// A Redmine version (milestone) as it appears in resource state.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Version {
    /// String-encoded identifier, "" or "0" before creation.
    pub id: String,
    /// Owning project.
    pub project_id: u32,
    /// Version name.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// One of `open`, `locked`, `closed`.
    pub status: String,
    /// `YYYY-MM-DD`, or "" when no due date is set.
    pub due_date: String,
    /// Server-assigned creation timestamp.
    pub created_on: String,
    /// Server-assigned last update timestamp.
    pub updated_on: String,
}

// due_date always travels, "" clears a previously set date
#[derive(Debug, Serialize)]
struct VersionPayload<'a> {
    name: &'a str,
    description: &'a str,
    status: &'a str,
    due_date: &'a str,
}

#[derive(Debug, Serialize)]
struct VersionRequest<'a> {
    version: VersionPayload<'a>,
}

#[derive(Debug, Deserialize)]
struct ApiVersion {
    id: u32,
    #[serde(default)]
    project: Option<IdName>,
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    status: String,
    #[serde(default)]
    due_date: Option<String>,
    #[serde(default)]
    created_on: String,
    #[serde(default)]
    updated_on: String,
}

#[derive(Debug, Deserialize)]
struct VersionResponse {
    version: ApiVersion,
}

fn wrap_version(version: &Version) -> VersionRequest<'_> {
    VersionRequest {
        version: VersionPayload {
            name: &version.name,
            description: &version.description,
            status: &version.status,
            due_date: &version.due_date,
        },
    }
}

fn unwrap_version(api: ApiVersion) -> Version {
    Version {
        id: id::format(api.id),
        project_id: api.project.map(|p| p.id).unwrap_or_default(),
        name: api.name,
        description: api.description.unwrap_or_default(),
        status: api.status,
        due_date: api.due_date.unwrap_or_default(),
        created_on: api.created_on,
        updated_on: api.updated_on,
    }
}

impl Client {
    /// Create a version under its project.
    pub async fn create_version(&self, version: &Version) -> Result<Version, ProviderError> {
        let request = wrap_version(version);
        let response: VersionResponse = self
            .post_json(
                &format!("projects/{}/versions.json", version.project_id),
                &request,
            )
            .await
            .map_err(|e| {
                e.context(format!(
                    "while creating version (project id: {}, name: {:?})",
                    version.project_id, version.name
                ))
            })?;
        let mut created = unwrap_version(response.version);
        if created.project_id == 0 {
            created.project_id = version.project_id;
        }
        Ok(created)
    }

    /// Read a version by its identifier.
    pub async fn read_version(&self, version_id: &str) -> Result<Version, ProviderError> {
        let numeric_id =
            id::parse(version_id).map_err(|e| e.context("could not read version"))?;
        let response: VersionResponse = self
            .get_json(&format!("versions/{}.json", numeric_id))
            .await
            .map_err(|e| e.context(format!("while reading version (id {})", numeric_id)))?;
        Ok(unwrap_version(response.version))
    }

    /// Update an existing version. The server returns no body.
    pub async fn update_version(&self, version: &Version) -> Result<(), ProviderError> {
        let numeric_id = id::parse(&version.id)
            .map_err(|e| e.context(format!("could not update version {:?}", version.name)))?;
        let request = wrap_version(version);
        self.put_json(&format!("versions/{}.json", numeric_id), &request)
            .await
            .map_err(|e| e.context(format!("while updating version (id {})", numeric_id)))
    }

    /// Delete a version by its identifier.
    pub async fn delete_version(&self, version_id: &str) -> Result<(), ProviderError> {
        let numeric_id =
            id::parse(version_id).map_err(|e| e.context("could not delete version"))?;
        self.delete_json(&format!("versions/{}.json", numeric_id))
            .await
            .map_err(|e| e.context(format!("while deleting version (id {})", numeric_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_version_sends_empty_due_date() {
        let version = Version {
            project_id: 3,
            name: "1.0.0".to_string(),
            description: "first stable".to_string(),
            status: "open".to_string(),
            ..Default::default()
        };

        let body = serde_json::to_value(wrap_version(&version)).unwrap();
        assert_eq!(body["version"]["name"], "1.0.0");
        assert_eq!(body["version"]["status"], "open");
        // An empty due_date must still be present so an update can clear it
        assert_eq!(body["version"]["due_date"], "");
    }

    #[test]
    fn test_wrap_version_with_due_date() {
        let version = Version {
            project_id: 3,
            name: "1.0.0".to_string(),
            description: "first stable".to_string(),
            status: "locked".to_string(),
            due_date: "2024-06-30".to_string(),
            ..Default::default()
        };

        let body = serde_json::to_value(wrap_version(&version)).unwrap();
        assert_eq!(body["version"]["due_date"], "2024-06-30");
    }

    #[test]
    fn test_unwrap_version() {
        let response: VersionResponse = serde_json::from_value(serde_json::json!({
            "version": {
                "id": 21,
                "project": {"id": 3, "name": "Web Shop"},
                "name": "1.0.0",
                "description": "first stable",
                "status": "open",
                "due_date": "2024-06-30",
                "created_on": "2024-03-01T12:00:00Z",
                "updated_on": "2024-03-02T12:00:00Z"
            }
        }))
        .unwrap();

        let version = unwrap_version(response.version);
        assert_eq!(version.id, "21");
        assert_eq!(version.project_id, 3);
        assert_eq!(version.due_date, "2024-06-30");
    }

    #[test]
    fn test_unwrap_version_null_due_date() {
        let response: VersionResponse = serde_json::from_value(serde_json::json!({
            "version": {
                "id": 22,
                "project": {"id": 3},
                "name": "backlog",
                "status": "open",
                "due_date": null
            }
        }))
        .unwrap();

        let version = unwrap_version(response.version);
        assert_eq!(version.due_date, "");
        assert_eq!(version.description, "");
    }
}
