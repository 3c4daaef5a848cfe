//! The Redmine provider: configuration, schema dispatch and lifecycle
//! operations for the supported resource types.

mod issue;
mod issue_category;
mod project;
mod version;

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};

use crate::client::{Client, ClientConfig};
use crate::error::ProviderError;
use crate::schema::{Attribute, Diagnostic, ProviderSchema, Schema};
use crate::server::ProviderService;
use crate::types::{AttributeChange, ImportedResource, PlanResult};
use crate::validation::{apply_defaults, validate};

/// Read a string attribute, treating absent and null as "".
pub(crate) fn string_attr(state: &Value, key: &str) -> String {
    state
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Read a bool attribute, falling back to the schema default.
pub(crate) fn bool_attr(state: &Value, key: &str, default: bool) -> bool {
    state.get(key).and_then(Value::as_bool).unwrap_or(default)
}

/// Read a numeric foreign key, treating absent and null as 0 (unset).
pub(crate) fn u32_attr(state: &Value, key: &str) -> Result<u32, ProviderError> {
    match state.get(key) {
        None | Some(Value::Null) => Ok(0),
        Some(value) => value
            .as_i64()
            .and_then(|n| u32::try_from(n).ok())
            .ok_or_else(|| {
                ProviderError::Validation(format!(
                    "attribute '{}' must be a non-negative integer, got {}",
                    key, value
                ))
            }),
    }
}

/// A provider that manages Redmine projects, issues, issue categories and
/// versions over the Redmine REST API.
///
/// Connection settings come from the provider configuration, with environment
/// variables as fallback so the provider works against a local Redmine out of
/// the box.
#[derive(Default)]
pub struct RedmineProvider {
    client: RwLock<Option<Arc<Client>>>,
}

impl RedmineProvider {
    /// Create an unconfigured provider.
    pub fn new() -> Self {
        Self::default()
    }

    async fn client(&self) -> Result<Arc<Client>, ProviderError> {
        self.client.read().await.clone().ok_or_else(|| {
            ProviderError::FailedPrecondition("provider is not configured".to_string())
        })
    }

    fn provider_config_schema() -> Schema {
        Schema::v0()
            .with_attribute(
                "url",
                Attribute::optional_string()
                    .with_description("Base URL of the Redmine server (REDMINE_URL)"),
            )
            .with_attribute(
                "username",
                Attribute::optional_string()
                    .with_description("Login for basic authentication (REDMINE_USERNAME)"),
            )
            .with_attribute(
                "password",
                Attribute::optional_string()
                    .with_description("Password for basic authentication (REDMINE_PASSWORD)")
                    .sensitive(),
            )
            .with_attribute(
                "api_key",
                Attribute::optional_string()
                    .with_description("API key sent as X-Redmine-API-Key (REDMINE_API_KEY)")
                    .sensitive(),
            )
            .with_attribute(
                "skip_cert_verify",
                Attribute::optional_bool().with_description(
                    "Skip TLS certificate verification (REDMINE_SKIP_CERT_VERIFY)",
                ),
            )
    }

    fn resource_schema(resource_type: &str) -> Result<Schema, ProviderError> {
        match resource_type {
            project::TYPE => Ok(project::schema()),
            issue::TYPE => Ok(issue::schema()),
            issue_category::TYPE => Ok(issue_category::schema()),
            version::TYPE => Ok(version::schema()),
            other => Err(ProviderError::UnknownResource(other.to_string())),
        }
    }
}

fn config_string(config: &Value, key: &str, env_var: &str, fallback: &str) -> String {
    if let Some(value) = config.get(key).and_then(Value::as_str) {
        return value.to_string();
    }
    std::env::var(env_var).unwrap_or_else(|_| fallback.to_string())
}

fn config_bool(config: &Value, key: &str, env_var: &str, fallback: bool) -> bool {
    if let Some(value) = config.get(key).and_then(Value::as_bool) {
        return value;
    }
    match std::env::var(env_var) {
        Ok(raw) => matches!(raw.as_str(), "1" | "true" | "TRUE" | "True"),
        Err(_) => fallback,
    }
}

/// Diff `prior` against `proposed` according to `schema`.
///
/// Defaults are applied to the proposed value, computed attributes the host
/// cannot know yet are carried over from prior state, and a change to a
/// `force_new` attribute marks the plan as requiring replacement.
fn plan_for_schema(schema: &Schema, prior: Option<&Value>, proposed: &Value) -> PlanResult {
    let mut names: Vec<&str> = schema.attributes.keys().map(String::as_str).collect();
    names.sort_unstable();

    let prior = prior.filter(|v| !v.is_null());

    // Destroy: proposed null with existing state
    if proposed.is_null() {
        let Some(prior) = prior else {
            return PlanResult::no_change(Value::Null);
        };
        let changes = names
            .iter()
            .filter_map(|name| {
                let before = prior.get(name)?;
                (!before.is_null()).then(|| AttributeChange::removed(*name, before.clone()))
            })
            .collect();
        return PlanResult::with_changes(Value::Null, changes, false);
    }

    let mut planned = apply_defaults(schema, proposed);

    // Create
    let Some(prior) = prior else {
        let changes = names
            .iter()
            .filter_map(|name| {
                let after = planned.get(name)?;
                (!after.is_null()).then(|| AttributeChange::added(*name, after.clone()))
            })
            .collect();
        return PlanResult::with_changes(planned, changes, false);
    };

    // Update: carry computed attributes the proposal leaves open
    if let Value::Object(map) = &mut planned {
        for (name, attr) in &schema.attributes {
            if !attr.flags.computed {
                continue;
            }
            let open = matches!(map.get(name.as_str()), None | Some(Value::Null));
            if open {
                if let Some(before) = prior.get(name.as_str()).filter(|v| !v.is_null()) {
                    map.insert(name.clone(), before.clone());
                }
            }
        }
    }

    let mut changes = Vec::new();
    let mut requires_replace = false;
    for name in names {
        let before = prior.get(name).filter(|v| !v.is_null());
        let after = planned.get(name).filter(|v| !v.is_null());
        match (before, after) {
            (None, None) => {}
            (b, a) if b == a => {}
            (before, after) => {
                if schema.attributes[name].force_new {
                    requires_replace = true;
                }
                changes.push(AttributeChange::new(
                    name,
                    before.cloned(),
                    after.cloned(),
                ));
            }
        }
    }

    if changes.is_empty() {
        PlanResult::no_change(planned)
    } else {
        PlanResult::with_changes(planned, changes, requires_replace)
    }
}

fn state_id(state: &Value) -> String {
    string_attr(state, "id")
}

#[async_trait::async_trait]
impl ProviderService for RedmineProvider {
    fn schema(&self) -> ProviderSchema {
        ProviderSchema::new()
            .with_provider_config(Self::provider_config_schema())
            .with_resource(project::TYPE, project::schema())
            .with_resource(issue::TYPE, issue::schema())
            .with_resource(issue_category::TYPE, issue_category::schema())
            .with_resource(version::TYPE, version::schema())
    }

    async fn validate_provider_config(
        &self,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        Ok(validate(&Self::provider_config_schema(), &config))
    }

    #[instrument(skip(self, config))]
    async fn configure(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
        let diagnostics = validate(&Self::provider_config_schema(), &config);
        if diagnostics.iter().any(|d| d.is_error()) {
            return Ok(diagnostics);
        }

        let client_config = ClientConfig {
            url: config_string(&config, "url", "REDMINE_URL", "http://localhost:3000/"),
            username: config_string(&config, "username", "REDMINE_USERNAME", "admin"),
            password: config_string(&config, "password", "REDMINE_PASSWORD", "admin"),
            api_key: config_string(&config, "api_key", "REDMINE_API_KEY", ""),
            skip_cert_verify: config_bool(&config, "skip_cert_verify", "REDMINE_SKIP_CERT_VERIFY", false),
        };

        info!(url = %client_config.url, "configuring Redmine client");
        let client = Client::new(client_config)?;
        *self.client.write().await = Some(Arc::new(client));
        Ok(diagnostics)
    }

    async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let schema = Self::resource_schema(resource_type)?;
        let mut diagnostics = validate(&schema, &config);
        if resource_type == version::TYPE {
            diagnostics.extend(version::validate_config(&config));
        }
        Ok(diagnostics)
    }

    #[instrument(skip(self, prior_state, proposed_state, _config))]
    async fn plan(
        &self,
        resource_type: &str,
        prior_state: Option<Value>,
        proposed_state: Value,
        _config: Value,
    ) -> Result<PlanResult, ProviderError> {
        let schema = Self::resource_schema(resource_type)?;
        let result = plan_for_schema(&schema, prior_state.as_ref(), &proposed_state);
        debug!(
            changes = result.changes.len(),
            requires_replace = result.requires_replace,
            "planned"
        );
        Ok(result)
    }

    #[instrument(skip(self, planned_state))]
    async fn create(
        &self,
        resource_type: &str,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        let schema = Self::resource_schema(resource_type)?;
        let planned = apply_defaults(&schema, &planned_state);
        let client = self.client().await?;

        match resource_type {
            project::TYPE => {
                let record = project::from_state(&planned)?;
                let created = client.create_project(&record).await?;
                Ok(project::to_state(&created))
            }
            issue::TYPE => {
                let record = issue::from_state(&planned)?;
                let created = client.create_issue(&record).await?;
                Ok(issue::to_state(&created))
            }
            issue_category::TYPE => {
                let record = issue_category::from_state(&planned)?;
                let created = client.create_issue_category(&record).await?;
                Ok(issue_category::to_state(&created))
            }
            version::TYPE => {
                let record = version::from_state(&planned)?;
                let created = client.create_version(&record).await?;
                Ok(version::to_state(&created))
            }
            other => Err(ProviderError::UnknownResource(other.to_string())),
        }
    }

    #[instrument(skip(self, current_state))]
    async fn read(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<Value, ProviderError> {
        Self::resource_schema(resource_type)?;
        let id = state_id(&current_state);
        let client = self.client().await?;

        match resource_type {
            project::TYPE => Ok(project::to_state(&client.read_project(&id).await?)),
            issue::TYPE => Ok(issue::to_state(&client.read_issue(&id).await?)),
            issue_category::TYPE => Ok(issue_category::to_state(
                &client.read_issue_category(&id).await?,
            )),
            version::TYPE => Ok(version::to_state(&client.read_version(&id).await?)),
            other => Err(ProviderError::UnknownResource(other.to_string())),
        }
    }

    #[instrument(skip(self, prior_state, planned_state))]
    async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        let schema = Self::resource_schema(resource_type)?;
        let mut planned = apply_defaults(&schema, &planned_state);

        // The identifier is computed, so the plan may leave it open
        if crate::id::is_unset(&state_id(&planned)) {
            if let Value::Object(map) = &mut planned {
                map.insert("id".to_string(), Value::String(state_id(&prior_state)));
            }
        }

        let client = self.client().await?;
        match resource_type {
            project::TYPE => {
                let record = project::from_state(&planned)?;
                client.update_project(&record).await?;
                Ok(project::to_state(&client.read_project(&record.id).await?))
            }
            issue::TYPE => {
                let record = issue::from_state(&planned)?;
                client.update_issue(&record).await?;
                Ok(issue::to_state(&client.read_issue(&record.id).await?))
            }
            issue_category::TYPE => {
                let record = issue_category::from_state(&planned)?;
                client.update_issue_category(&record).await?;
                Ok(issue_category::to_state(
                    &client.read_issue_category(&record.id).await?,
                ))
            }
            version::TYPE => {
                let record = version::from_state(&planned)?;
                client.update_version(&record).await?;
                Ok(version::to_state(&client.read_version(&record.id).await?))
            }
            other => Err(ProviderError::UnknownResource(other.to_string())),
        }
    }

    #[instrument(skip(self, current_state))]
    async fn delete(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<(), ProviderError> {
        Self::resource_schema(resource_type)?;
        let id = state_id(&current_state);
        if crate::id::is_unset(&id) {
            debug!("identifier never assigned, nothing to delete");
            return Ok(());
        }
        let client = self.client().await?;

        match resource_type {
            project::TYPE => client.delete_project(&id).await,
            issue::TYPE => client.delete_issue(&id).await,
            issue_category::TYPE => client.delete_issue_category(&id).await,
            version::TYPE => client.delete_version(&id).await,
            other => Err(ProviderError::UnknownResource(other.to_string())),
        }
    }

    #[instrument(skip(self))]
    async fn import_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        Self::resource_schema(resource_type)?;
        let client = self.client().await?;

        let state = match resource_type {
            project::TYPE => project::to_state(&client.read_project(id).await?),
            issue::TYPE => issue::to_state(&client.read_issue(id).await?),
            issue_category::TYPE => {
                issue_category::to_state(&client.read_issue_category(id).await?)
            }
            version::TYPE => version::to_state(&client.read_version(id).await?),
            other => return Err(ProviderError::UnknownResource(other.to_string())),
        };

        Ok(vec![ImportedResource::new(resource_type, state)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_schema_lists_all_resources() {
        let schema = RedmineProvider::new().schema();
        for name in [
            "redmine_project",
            "redmine_issue",
            "redmine_issue_category",
            "redmine_version",
        ] {
            assert!(schema.resources.contains_key(name), "missing {}", name);
        }
        assert!(schema.provider.attributes["password"].flags.sensitive);
    }

    #[test]
    fn test_unknown_resource_type() {
        let err = RedmineProvider::resource_schema("redmine_wiki").unwrap_err();
        assert!(matches!(err, ProviderError::UnknownResource(_)));
    }

    #[test]
    fn test_plan_create_applies_defaults() {
        let schema = project::schema();
        let proposed = json!({"name": "Web Shop", "identifier": "web-shop"});

        let result = plan_for_schema(&schema, None, &proposed);
        assert!(!result.requires_replace);
        assert_eq!(result.planned_state["is_public"], json!(true));
        assert_eq!(result.planned_state["description"], json!(""));
        assert!(result
            .changes
            .iter()
            .all(|c| c.before.is_none() && c.after.is_some()));
        assert!(result.changes.iter().any(|c| c.path == "name"));
    }

    #[test]
    fn test_plan_no_changes() {
        let schema = project::schema();
        let state = json!({
            "id": "4",
            "name": "Web Shop",
            "identifier": "web-shop",
            "description": "",
            "homepage": "",
            "is_public": true,
            "parent_id": "",
            "inherit_members": false,
            "created_on": "2024-01-05T09:30:00Z",
            "updated_on": "2024-01-06T10:00:00Z",
        });

        let result = plan_for_schema(&schema, Some(&state), &state);
        assert!(result.changes.is_empty());
        assert!(!result.requires_replace);
        assert_eq!(result.planned_state, state);
    }

    #[test]
    fn test_plan_update_carries_computed_and_diffs() {
        let schema = project::schema();
        let prior = json!({
            "id": "4",
            "name": "Web Shop",
            "identifier": "web-shop",
            "description": "",
            "is_public": true,
            "created_on": "2024-01-05T09:30:00Z",
            "updated_on": "2024-01-06T10:00:00Z",
        });
        let proposed = json!({
            "name": "Web Shop v2",
            "identifier": "web-shop",
        });

        let result = plan_for_schema(&schema, Some(&prior), &proposed);
        assert!(!result.requires_replace);
        assert_eq!(result.planned_state["id"], json!("4"));
        assert_eq!(result.planned_state["created_on"], prior["created_on"]);
        assert!(result
            .changes
            .iter()
            .any(|c| c.path == "name" && c.after == Some(json!("Web Shop v2"))));
        assert!(!result.changes.iter().any(|c| c.path == "identifier"));
    }

    #[test]
    fn test_plan_force_new_change_requires_replace() {
        let schema = project::schema();
        let prior = json!({
            "id": "4",
            "name": "Web Shop",
            "identifier": "web-shop",
        });
        let proposed = json!({
            "name": "Web Shop",
            "identifier": "shop",
        });

        let result = plan_for_schema(&schema, Some(&prior), &proposed);
        assert!(result.requires_replace);
        assert!(result.changes.iter().any(|c| c.path == "identifier"));
    }

    #[test]
    fn test_plan_destroy() {
        let schema = issue_category::schema();
        let prior = json!({"id": "9", "project_id": 3, "name": "Backend"});

        let result = plan_for_schema(&schema, Some(&prior), &Value::Null);
        assert!(result.planned_state.is_null());
        assert_eq!(result.changes.len(), 3);
        assert!(result
            .changes
            .iter()
            .all(|c| c.before.is_some() && c.after.is_none()));
    }

    #[test]
    fn test_plan_null_to_null_is_no_change() {
        let schema = issue_category::schema();
        let result = plan_for_schema(&schema, None, &Value::Null);
        assert!(result.changes.is_empty());
        assert!(result.planned_state.is_null());
    }

    #[test]
    fn test_config_fallbacks_prefer_explicit_values() {
        let config = json!({"url": "https://redmine.example/", "skip_cert_verify": true});
        assert_eq!(
            config_string(&config, "url", "REDMINE_NO_SUCH_VAR", "http://localhost:3000/"),
            "https://redmine.example/"
        );
        assert!(config_bool(&config, "skip_cert_verify", "REDMINE_NO_SUCH_VAR", false));
        assert_eq!(
            config_string(&config, "username", "REDMINE_NO_SUCH_VAR", "admin"),
            "admin"
        );
        assert!(!config_bool(&config, "missing", "REDMINE_NO_SUCH_VAR", false));
    }

    #[test]
    fn test_attr_helpers() {
        let state = json!({"name": "x", "count": 3, "flag": true, "nullable": null});
        assert_eq!(string_attr(&state, "name"), "x");
        assert_eq!(string_attr(&state, "missing"), "");
        assert_eq!(string_attr(&state, "nullable"), "");
        assert_eq!(u32_attr(&state, "count").unwrap(), 3);
        assert_eq!(u32_attr(&state, "missing").unwrap(), 0);
        assert!(bool_attr(&state, "flag", false));
        assert!(bool_attr(&state, "missing", true));
        assert!(u32_attr(&json!({"count": -2}), "count").is_err());
    }

    #[tokio::test]
    async fn test_unconfigured_provider_rejects_operations() {
        let provider = RedmineProvider::new();
        let err = provider
            .read("redmine_project", json!({"id": "1"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::FailedPrecondition(_)));
    }

    #[tokio::test]
    async fn test_validate_resource_config_unknown_type() {
        let provider = RedmineProvider::new();
        let err = provider
            .validate_resource_config("redmine_wiki", json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::UnknownResource(_)));
    }

    #[tokio::test]
    async fn test_validate_resource_config_version_rules() {
        let provider = RedmineProvider::new();
        let diagnostics = provider
            .validate_resource_config(
                "redmine_version",
                json!({"project_id": 3, "name": "1.0.0", "description": "", "status": "done"}),
            )
            .await
            .unwrap();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute.as_deref(), Some("status"));
    }

    #[tokio::test]
    async fn test_validate_resource_config_version_requires_description() {
        let provider = RedmineProvider::new();
        let diagnostics = provider
            .validate_resource_config(
                "redmine_version",
                json!({"project_id": 3, "name": "1.0.0"}),
            )
            .await
            .unwrap();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute.as_deref(), Some("description"));
    }
}
