//! Hosted table backend (Supabase / PostgREST over HTTPS)
//!
//! Tables `qrcodes`, `folders` and `users` live under `{base}/rest/v1/`.
//! Columns are snake_case (`destination_url`, `folder_id`), so documents are
//! re-keyed on the way in and out.
//!
//! Folder removal is two requests (QR codes first, then the folder). The
//! backend offers no transaction across them: if the second request fails the
//! QR codes are already unlinked or gone while the folder remains.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde_json::{json, Map, Value};

use super::{Collection, FolderRemoval, RecordStore, StoreError, StoreResult};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct HostedStore {
    client: Client,
    base_url: String,
    api_key: String,
}

impl HostedStore {
    pub fn new(base_url: &str, api_key: &str) -> StoreResult<Self> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    fn endpoint(&self, collection: Collection) -> String {
        format!("{}/rest/v1/{}", self.base_url, collection.as_str())
    }

    fn request(&self, method: Method, collection: Collection) -> RequestBuilder {
        self.client
            .request(method, self.endpoint(collection))
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    async fn send(&self, request: RequestBuilder) -> StoreResult<Response> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        tracing::warn!(status = status.as_u16(), %body, "hosted backend rejected request");
        Err(StoreError::Hosted {
            status: status.as_u16(),
            body,
        })
    }

    async fn rows(&self, request: RequestBuilder) -> StoreResult<Vec<Value>> {
        let rows: Vec<Value> = self.send(request).await?.json().await?;
        Ok(rows.into_iter().map(from_columns).collect())
    }
}

fn eq(value: &str) -> String {
    format!("eq.{value}")
}

fn camel_to_snake(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for ch in name.chars() {
        if ch.is_ascii_uppercase() {
            out.push('_');
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

fn snake_to_camel(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper = false;
    for ch in name.chars() {
        if ch == '_' {
            upper = true;
        } else if upper {
            out.push(ch.to_ascii_uppercase());
            upper = false;
        } else {
            out.push(ch);
        }
    }
    out
}

fn rekey(doc: Value, rename: fn(&str) -> String) -> Value {
    match doc {
        Value::Object(fields) => Value::Object(
            fields
                .into_iter()
                .map(|(name, value)| (rename(&name), value))
                .collect::<Map<String, Value>>(),
        ),
        other => other,
    }
}

fn to_columns(doc: Value) -> Value {
    rekey(doc, camel_to_snake)
}

fn from_columns(row: Value) -> Value {
    rekey(row, snake_to_camel)
}

#[async_trait]
impl RecordStore for HostedStore {
    fn name(&self) -> &'static str {
        "hosted"
    }

    async fn get(&self, collection: Collection, key: &str) -> StoreResult<Option<Value>> {
        let request = self
            .request(Method::GET, collection)
            .query(&[("id", eq(key)), ("select", "*".to_string())]);
        Ok(self.rows(request).await?.into_iter().next())
    }

    async fn insert(&self, collection: Collection, _key: &str, doc: Value) -> StoreResult<bool> {
        let request = self
            .request(Method::POST, collection)
            .header("Prefer", "return=minimal")
            .json(&to_columns(doc));

        match self.send(request).await {
            Ok(_) => Ok(true),
            Err(StoreError::Hosted { status, .. }) if status == StatusCode::CONFLICT.as_u16() => {
                Ok(false)
            }
            Err(err) => Err(err),
        }
    }

    async fn put(&self, collection: Collection, _key: &str, doc: Value) -> StoreResult<()> {
        let request = self
            .request(Method::POST, collection)
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(&to_columns(doc));
        self.send(request).await?;
        Ok(())
    }

    async fn delete(&self, collection: Collection, key: &str) -> StoreResult<bool> {
        let request = self
            .request(Method::DELETE, collection)
            .header("Prefer", "return=representation")
            .query(&[("id", eq(key))]);
        Ok(!self.rows(request).await?.is_empty())
    }

    async fn list(&self, collection: Collection) -> StoreResult<Vec<Value>> {
        let request = self
            .request(Method::GET, collection)
            .query(&[("select", "*")]);
        self.rows(request).await
    }

    async fn remove_folder(&self, folder_id: &str, mode: FolderRemoval) -> StoreResult<bool> {
        if self.get(Collection::Folders, folder_id).await?.is_none() {
            return Ok(false);
        }

        let filed = [("folder_id", eq(folder_id))];
        let qr_request = match mode {
            FolderRemoval::Cascade => self.request(Method::DELETE, Collection::QrCodes),
            FolderRemoval::Unlink => self
                .request(Method::PATCH, Collection::QrCodes)
                .json(&json!({ "folder_id": null })),
        };
        self.send(qr_request.query(&filed)).await?;

        let folder_request = self
            .request(Method::DELETE, Collection::Folders)
            .query(&[("id", eq(folder_id))]);
        if let Err(err) = self.send(folder_request).await {
            tracing::error!(
                folder_id,
                ?mode,
                error = %err,
                "folder removal left QR codes updated but the folder in place"
            );
            return Err(err);
        }
        Ok(true)
    }
}
