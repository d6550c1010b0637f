use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use tracing::debug;

use super::{http_client, read_body, RecordStore};
use crate::config::AppConfig;
use crate::error::{SyncError, SyncResult};
use crate::model::record::{PageUpdate, WorkspaceRecord};

const SERVICE: &str = "Notion";
const BASE_URL: &str = "https://api.notion.com/v1";
const NOTION_VERSION: &str = "2022-06-28";

pub const PROP_WORK_ITEM_ID: &str = "Work Item ID";
pub const PROP_SYNCED: &str = "Synced";
pub const PROP_SYNCED_DATE: &str = "Synced Date";
pub const PROP_NAME: &str = "Name";
pub const PROP_ASSIGNED_TO: &str = "Assigned To";
pub const PROP_URL: &str = "URL";
pub const PROP_STATUS: &str = "Status";

pub struct NotionProvider {
    token: String,
    database_id: String,
    client: reqwest::Client,
}

impl NotionProvider {
    pub fn new(config: &AppConfig) -> SyncResult<Self> {
        Ok(Self {
            token: config.notion.token.clone(),
            database_id: config.notion.database_id.clone(),
            client: http_client(SERVICE, config.http.timeout())?,
        })
    }

    async fn send(&self, req: reqwest::RequestBuilder, body: &Value) -> SyncResult<String> {
        let resp = req
            .bearer_auth(&self.token)
            .header("Notion-Version", NOTION_VERSION)
            .json(body)
            .send()
            .await
            .map_err(|e| SyncError::from_transport(SERVICE, e))?;
        read_body(SERVICE, resp).await
    }
}

#[derive(Deserialize)]
pub(crate) struct QueryResponse {
    results: Vec<Page>,
    #[serde(default)]
    has_more: bool,
    next_cursor: Option<String>,
}

#[derive(Deserialize)]
struct Page {
    id: String,
    #[serde(default)]
    properties: HashMap<String, Value>,
}

impl Page {
    fn into_record(self) -> WorkspaceRecord {
        let linked_work_item_number = self
            .properties
            .get(PROP_WORK_ITEM_ID)
            .and_then(|p| p.get("number"))
            .and_then(number_as_id);
        let synced = self
            .properties
            .get(PROP_SYNCED)
            .and_then(|p| p.get("checkbox"))
            .and_then(Value::as_bool)
            .unwrap_or(false);

        WorkspaceRecord {
            page_id: self.id,
            linked_work_item_number,
            synced,
        }
    }
}

/// Notion numbers are JSON floats; only whole, non-negative values can name
/// a work item.
fn number_as_id(value: &Value) -> Option<u64> {
    if let Some(n) = value.as_u64() {
        return Some(n);
    }
    let f = value.as_f64()?;
    if f >= 0.0 && f.fract() == 0.0 && f <= u64::MAX as f64 {
        Some(f as u64)
    } else {
        None
    }
}

/// Body for `POST databases/{id}/query`, optionally resuming at `cursor`.
pub fn query_body(cursor: Option<&str>) -> Value {
    let mut body = json!({
        "filter": {
            "property": PROP_SYNCED,
            "checkbox": { "equals": false }
        }
    });
    if let Some(cursor) = cursor {
        body["start_cursor"] = json!(cursor);
    }
    body
}

pub(crate) fn parse_query_page(body: &str) -> SyncResult<QueryResponse> {
    serde_json::from_str(body)
        .map_err(|e| SyncError::decode(SERVICE, format!("Failed to parse query response: {e}")))
}

fn text_content(kind: &str, content: &str) -> Value {
    json!({ kind: [{ "text": { "content": content } }] })
}

/// Body for `PATCH pages/{id}`.
pub fn update_body(update: &PageUpdate) -> Value {
    let mut properties = serde_json::Map::new();
    match update {
        PageUpdate::Fields {
            synced_at,
            name,
            assigned_to,
            url,
        } => {
            properties.insert(PROP_SYNCED.into(), json!({ "checkbox": true }));
            properties.insert(
                PROP_SYNCED_DATE.into(),
                json!({ "date": { "start": synced_at.to_rfc3339() } }),
            );
            properties.insert(PROP_NAME.into(), text_content("title", name));
            properties.insert(PROP_ASSIGNED_TO.into(), text_content("rich_text", assigned_to));
            properties.insert(PROP_URL.into(), json!({ "url": url }));
        }
        PageUpdate::Status(status) => {
            properties.insert(PROP_STATUS.into(), json!({ "status": { "name": status } }));
        }
    }
    json!({ "properties": properties })
}

#[async_trait]
impl RecordStore for NotionProvider {
    fn name(&self) -> &str {
        SERVICE
    }

    async fn query_unsynced(&self) -> SyncResult<Vec<WorkspaceRecord>> {
        let url = format!("{BASE_URL}/databases/{}/query", self.database_id);
        let mut records = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let body = query_body(cursor.as_deref());
            let text = self.send(self.client.post(&url), &body).await?;
            let page = parse_query_page(&text)?;
            debug!(count = page.results.len(), has_more = page.has_more, "queried database page");

            records.extend(page.results.into_iter().map(Page::into_record));

            match (page.has_more, page.next_cursor) {
                (true, Some(next)) => cursor = Some(next),
                _ => break,
            }
        }

        Ok(records)
    }

    async fn update_page(&self, page_id: &str, update: &PageUpdate) -> SyncResult<()> {
        let url = format!("{BASE_URL}/pages/{page_id}");
        self.send(self.client.patch(&url), &update_body(update))
            .await
            .map(|_| ())
    }
}
