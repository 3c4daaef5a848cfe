//! Project resource: domain record, wire payloads and CRUD calls.

use serde::{Deserialize, Serialize};

use super::{Client, IdName};
use crate::error::ProviderError;
use crate::id;

/// A Redmine project as it appears in resource state.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Project {
    /// String-encoded identifier, "" or "0" before creation.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Project key; immutable after creation.
    pub identifier: String,
    /// Free-form description.
    pub description: String,
    /// Homepage URL.
    pub homepage: String,
    /// Visible to anonymous users.
    pub is_public: bool,
    /// Identifier of the parent project, "" when the project is top-level.
    pub parent_id: String,
    /// Members are inherited from the parent project.
    pub inherit_members: bool,
    /// Server-assigned creation timestamp.
    pub created_on: String,
    /// Server-assigned last update timestamp.
    pub updated_on: String,
}

/// Request payload for create/update calls.
#[derive(Debug, Serialize)]
struct ProjectPayload<'a> {
    name: &'a str,
    identifier: &'a str,
    description: &'a str,
    homepage: &'a str,
    is_public: bool,
    inherit_members: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    parent_id: Option<u32>,
}

#[derive(Debug, Serialize)]
struct ProjectRequest<'a> {
    project: ProjectPayload<'a>,
}

/// Response shape returned by the server.
#[derive(Debug, Deserialize)]
struct ApiProject {
    id: u32,
    name: String,
    identifier: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    homepage: Option<String>,
    #[serde(default = "default_true")]
    is_public: bool,
    #[serde(default)]
    inherit_members: bool,
    #[serde(default)]
    parent: Option<IdName>,
    #[serde(default)]
    created_on: String,
    #[serde(default)]
    updated_on: String,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct ProjectResponse {
    project: ApiProject,
}

fn wrap_project(project: &Project) -> Result<ProjectRequest<'_>, ProviderError> {
    let parent_id = id::try_parse(&project.parent_id)
        .map_err(|e| e.context(format!("project {:?} parent_id", project.name)))?;

    Ok(ProjectRequest {
        project: ProjectPayload {
            name: &project.name,
            identifier: &project.identifier,
            description: &project.description,
            homepage: &project.homepage,
            is_public: project.is_public,
            inherit_members: project.inherit_members,
            parent_id,
        },
    })
}

fn unwrap_project(api: ApiProject) -> Project {
    Project {
        id: id::format(api.id),
        name: api.name,
        identifier: api.identifier,
        description: api.description.unwrap_or_default(),
        homepage: api.homepage.unwrap_or_default(),
        is_public: api.is_public,
        parent_id: api
            .parent
            .map(|p| id::format(p.id))
            .unwrap_or_default(),
        inherit_members: api.inherit_members,
        created_on: api.created_on,
        updated_on: api.updated_on,
    }
}

impl Client {
    /// Create a project and return the record the server stored.
    pub async fn create_project(&self, project: &Project) -> Result<Project, ProviderError> {
        let request = wrap_project(project)?;
        let response: ProjectResponse = self
            .post_json("projects.json", &request)
            .await
            .map_err(|e| e.context(format!("while creating project {:?}", project.identifier)))?;
        Ok(unwrap_project(response.project))
    }

    /// Read a project by its identifier.
    pub async fn read_project(&self, project_id: &str) -> Result<Project, ProviderError> {
        let numeric_id = id::parse(project_id)
            .map_err(|e| e.context("could not read project"))?;
        let response: ProjectResponse = self
            .get_json(&format!("projects/{}.json", numeric_id))
            .await
            .map_err(|e| e.context(format!("while reading project (id {})", numeric_id)))?;
        Ok(unwrap_project(response.project))
    }

    /// Update an existing project. The server returns no body; callers
    /// re-read to pick up server-computed fields.
    pub async fn update_project(&self, project: &Project) -> Result<(), ProviderError> {
        let numeric_id = id::parse(&project.id)
            .map_err(|e| e.context(format!("could not update project {:?}", project.name)))?;
        let request = wrap_project(project)?;
        self.put_json(&format!("projects/{}.json", numeric_id), &request)
            .await
            .map_err(|e| e.context(format!("while updating project (id {})", numeric_id)))
    }

    /// Delete a project by its identifier.
    pub async fn delete_project(&self, project_id: &str) -> Result<(), ProviderError> {
        let numeric_id = id::parse(project_id)
            .map_err(|e| e.context("could not delete project"))?;
        self.delete_json(&format!("projects/{}.json", numeric_id))
            .await
            .map_err(|e| e.context(format!("while deleting project (id {})", numeric_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_project() -> Project {
        Project {
            id: "".to_string(),
            name: "Web Shop".to_string(),
            identifier: "web-shop".to_string(),
            description: "storefront".to_string(),
            homepage: "https://shop.example".to_string(),
            is_public: true,
            parent_id: "".to_string(),
            inherit_members: false,
            created_on: String::new(),
            updated_on: String::new(),
        }
    }

    #[test]
    fn test_wrap_project_without_parent() {
        let project = sample_project();
        let request = wrap_project(&project).unwrap();
        let body = serde_json::to_value(&request).unwrap();

        assert_eq!(body["project"]["name"], "Web Shop");
        assert_eq!(body["project"]["identifier"], "web-shop");
        assert!(body["project"].get("parent_id").is_none());
    }

    #[test]
    fn test_wrap_project_with_parent() {
        let mut project = sample_project();
        project.parent_id = "12".to_string();

        let request = wrap_project(&project).unwrap();
        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["project"]["parent_id"], 12);
    }

    #[test]
    fn test_wrap_project_rejects_malformed_parent() {
        let mut project = sample_project();
        project.parent_id = "twelve".to_string();
        assert!(wrap_project(&project).is_err());
    }

    #[test]
    fn test_unwrap_project() {
        let api: ProjectResponse = serde_json::from_value(serde_json::json!({
            "project": {
                "id": 4,
                "name": "Web Shop",
                "identifier": "web-shop",
                "description": "storefront",
                "parent": {"id": 12, "name": "Platform"},
                "inherit_members": true,
                "created_on": "2024-01-05T09:30:00Z",
                "updated_on": "2024-01-06T10:00:00Z"
            }
        }))
        .unwrap();

        let project = unwrap_project(api.project);
        assert_eq!(project.id, "4");
        assert_eq!(project.parent_id, "12");
        assert!(project.inherit_members);
        // is_public is absent from most responses; treated as public
        assert!(project.is_public);
        assert_eq!(project.homepage, "");
        assert_eq!(project.created_on, "2024-01-05T09:30:00Z");
    }
}
