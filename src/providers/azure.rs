use async_trait::async_trait;
use base64::Engine;
use reqwest::StatusCode;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::debug;

use super::{http_client, read_body, WorkItemSource};
use crate::config::AppConfig;
use crate::error::{SyncError, SyncResult};
use crate::model::work_item::WorkItem;

const SERVICE: &str = "Azure DevOps";
const API_VERSION: &str = "7.0";

const FIELD_TITLE: &str = "System.Title";
const FIELD_STATE: &str = "System.State";
const FIELD_ASSIGNED_TO: &str = "System.AssignedTo";

pub struct AzureDevOpsProvider {
    /// Organization URL, always ending in `/`.
    organization: String,
    auth_header: String,
    client: reqwest::Client,
}

impl AzureDevOpsProvider {
    pub fn new(config: &AppConfig) -> SyncResult<Self> {
        // PATs go in the password slot of Basic auth with an empty user.
        let creds = format!(":{}", config.azure.personal_access_token);
        let encoded = base64::engine::general_purpose::STANDARD.encode(creds);
        Ok(Self {
            organization: config.azure.organization.clone(),
            auth_header: format!("Basic {encoded}"),
            client: http_client(SERVICE, config.http.timeout())?,
        })
    }

    fn item_endpoint(&self, id: u64) -> String {
        format!("{}_apis/wit/workitems/{id}", self.organization)
    }
}

#[derive(Deserialize)]
struct WorkItemResponse {
    id: u64,
    #[serde(default)]
    fields: HashMap<String, serde_json::Value>,
}

#[derive(Deserialize)]
struct IdentityRef {
    #[serde(rename = "displayName")]
    display_name: Option<String>,
}

/// Build the web UI link for a work item.
pub fn work_item_url(organization: &str, id: u64) -> String {
    format!("{organization}_workitems/edit/{id}")
}

fn required_str(fields: &HashMap<String, serde_json::Value>, key: &str) -> SyncResult<String> {
    fields
        .get(key)
        .and_then(|v| v.as_str())
        .map(String::from)
        .ok_or_else(|| SyncError::Validation {
            service: SERVICE,
            message: format!("work item has no `{key}` field"),
        })
}

/// Parse a `GET workitems/{id}` body. Title and state are mandatory; an
/// unassigned item (or an identity without a display name) yields "".
pub fn parse_work_item(organization: &str, body: &str) -> SyncResult<WorkItem> {
    let resp: WorkItemResponse = serde_json::from_str(body)
        .map_err(|e| SyncError::decode(SERVICE, format!("Failed to parse work item: {e}")))?;

    let title = required_str(&resp.fields, FIELD_TITLE)?;
    let state = required_str(&resp.fields, FIELD_STATE)?;
    let assignee = resp
        .fields
        .get(FIELD_ASSIGNED_TO)
        .cloned()
        .and_then(|v| serde_json::from_value::<IdentityRef>(v).ok())
        .and_then(|identity| identity.display_name)
        .unwrap_or_default();

    Ok(WorkItem {
        id: resp.id,
        title,
        state,
        assignee,
        url: work_item_url(organization, resp.id),
    })
}

#[async_trait]
impl WorkItemSource for AzureDevOpsProvider {
    fn name(&self) -> &str {
        SERVICE
    }

    async fn fetch_work_item(&self, id: u64) -> SyncResult<WorkItem> {
        let url = self.item_endpoint(id);
        debug!(%url, "fetching work item");

        let resp = self
            .client
            .get(&url)
            .query(&[("api-version", API_VERSION)])
            .header("Authorization", &self.auth_header)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| SyncError::from_transport(SERVICE, e))?;

        // A rejected PAT gets a 203 with the HTML sign-in page instead of a 401.
        if resp.status() == StatusCode::NON_AUTHORITATIVE_INFORMATION {
            return Err(SyncError::Authentication {
                service: SERVICE,
                message: "personal access token was rejected".into(),
            });
        }

        let body = read_body(SERVICE, resp).await?;
        parse_work_item(&self.organization, &body)
    }
}
