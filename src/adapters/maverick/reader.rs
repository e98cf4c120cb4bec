//! Maverick query API reader

use super::client::MaverickClient;
use crate::adapters::destination::DestinationRead;
use crate::domain::entity::{ObjectType, SyncEntity};
use crate::domain::filter::{Filter, KeyProperties};
use crate::domain::{Page, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Serialize)]
struct QueryRequest<'a> {
    filter: &'a Filter,
    #[serde(skip_serializing_if = "Option::is_none")]
    object_type: Option<ObjectType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    start: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    size: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    items: Vec<SyncEntity>,
}

#[derive(Debug, Deserialize)]
struct BatchResponse {
    #[serde(default)]
    items: Vec<SyncEntity>,
    #[serde(default)]
    has_more: bool,
}

/// Read side of the Maverick destination
///
/// - `POST {base}/query` with `{"filter": ..}` for lookups
/// - `POST {base}/query` with `{"filter", "object_type", "start", "size"}`
///   for filtered paging
/// - `GET {base}/entities/{type}?start=&size=` for paging
pub struct MaverickReader {
    client: Arc<MaverickClient>,
}

impl MaverickReader {
    pub fn new(client: Arc<MaverickClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DestinationRead for MaverickReader {
    async fn get_by_filter(&self, key: &KeyProperties) -> Result<Vec<SyncEntity>> {
        tracing::debug!(external_id = %key.external_id, "Querying Maverick by filter");

        let body = QueryRequest {
            filter: &key.filter,
            object_type: None,
            start: None,
            size: None,
        };
        let response: QueryResponse = self
            .client
            .retry_request(|| self.client.send_json(self.client.post("/query").json(&body)))
            .await?;

        Ok(response.items)
    }

    async fn get_batch(
        &self,
        object_type: ObjectType,
        start: usize,
        batch_size: usize,
        filter: Option<&Filter>,
    ) -> Result<Page<SyncEntity>> {
        match filter {
            None => {
                let path = format!("/entities/{object_type}");
                let response: BatchResponse = self
                    .client
                    .retry_request(|| {
                        self.client.send_json(
                            self.client
                                .get(&path)
                                .query(&[("start", start), ("size", batch_size)]),
                        )
                    })
                    .await?;
                Ok(Page::new(response.items, response.has_more))
            }
            Some(filter) => {
                let body = QueryRequest {
                    filter,
                    object_type: Some(object_type),
                    start: Some(start),
                    size: Some(batch_size),
                };
                let response: BatchResponse = self
                    .client
                    .retry_request(|| {
                        self.client.send_json(self.client.post("/query").json(&body))
                    })
                    .await?;
                Ok(Page::new(response.items, response.has_more))
            }
        }
    }
}
