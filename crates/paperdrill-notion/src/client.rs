//! Notion REST client implementing the `PaperSource` trait.

use async_trait::async_trait;
use chrono::Utc;
use tracing::instrument;

use paperdrill_core::error::ProviderError;
use paperdrill_core::model::Paper;
use paperdrill_core::traits::PaperSource;

use crate::model::{Block, BlocksResponse, Page, QueryRequest, QueryResponse};

const DEFAULT_BASE_URL: &str = "https://api.notion.com";
const NOTION_VERSION: &str = "2022-06-28";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const PAGE_SIZE: u32 = 100;

/// Notion API client for the papers database.
pub struct NotionClient {
    api_key: String,
    database_id: String,
    base_url: String,
    client: reqwest::Client,
}

impl NotionClient {
    pub fn new(api_key: &str, database_id: &str, base_url: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .expect("failed to build HTTP client");

        Self {
            api_key: api_key.to_string(),
            database_id: database_id.to_string(),
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            client,
        }
    }

    /// Map an HTTP error response onto `ProviderError`.
    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
        let status = response.status().as_u16();
        if status == 429 {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(5)
                * 1000;
            return Err(ProviderError::RateLimited {
                retry_after_ms: retry_after,
            });
        }
        if status == 401 {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::AuthenticationFailed(body));
        }
        if status >= 400 {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::ApiError {
                status,
                message: body,
            });
        }
        Ok(response)
    }

    fn map_transport_error(e: reqwest::Error) -> ProviderError {
        if e.is_timeout() {
            ProviderError::Timeout(DEFAULT_TIMEOUT_SECS)
        } else {
            ProviderError::NetworkError(e.to_string())
        }
    }

    /// Query all pages of the papers database.
    async fn query_pages(&self) -> anyhow::Result<Vec<Page>> {
        let mut pages = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let body = QueryRequest {
                start_cursor: cursor.clone(),
                page_size: PAGE_SIZE,
            };

            let response = self
                .client
                .post(format!(
                    "{}/v1/databases/{}/query",
                    self.base_url, self.database_id
                ))
                .header("authorization", format!("Bearer {}", self.api_key))
                .header("notion-version", NOTION_VERSION)
                .header("content-type", "application/json")
                .json(&body)
                .send()
                .await
                .map_err(Self::map_transport_error)?;

            let response = Self::check_status(response).await?;
            let parsed: QueryResponse =
                response.json().await.map_err(|e| ProviderError::ApiError {
                    status: 0,
                    message: format!("failed to parse query response: {e}"),
                })?;

            pages.extend(parsed.results);

            if parsed.has_more {
                cursor = parsed.next_cursor;
                if cursor.is_none() {
                    // has_more without a cursor would loop forever.
                    break;
                }
            } else {
                break;
            }
        }

        Ok(pages)
    }

    /// Fetch a page's block children and flatten them into note text.
    async fn fetch_notes(&self, page_id: &str) -> anyhow::Result<String> {
        let mut lines: Vec<String> = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let mut request = self
                .client
                .get(format!("{}/v1/blocks/{}/children", self.base_url, page_id))
                .header("authorization", format!("Bearer {}", self.api_key))
                .header("notion-version", NOTION_VERSION)
                .query(&[("page_size", PAGE_SIZE.to_string())]);

            if let Some(c) = &cursor {
                request = request.query(&[("start_cursor", c.as_str())]);
            }

            let response = request.send().await.map_err(Self::map_transport_error)?;
            let response = Self::check_status(response).await?;
            let parsed: BlocksResponse =
                response.json().await.map_err(|e| ProviderError::ApiError {
                    status: 0,
                    message: format!("failed to parse blocks response: {e}"),
                })?;

            lines.extend(parsed.results.iter().filter_map(Block::plain_text));

            if parsed.has_more {
                cursor = parsed.next_cursor;
                if cursor.is_none() {
                    break;
                }
            } else {
                break;
            }
        }

        Ok(lines.join("\n"))
    }
}

#[async_trait]
impl PaperSource for NotionClient {
    fn name(&self) -> &str {
        "notion"
    }

    #[instrument(skip(self), fields(database = %self.database_id))]
    async fn fetch_papers(&self) -> anyhow::Result<Vec<Paper>> {
        let pages = self.query_pages().await?;
        let synced_at = Utc::now();
        let mut papers = Vec::with_capacity(pages.len());

        for page in pages {
            let Some(title) = page.title() else {
                tracing::warn!("skipping untitled page {}", page.id);
                continue;
            };

            let notes = self.fetch_notes(&page.id).await?;

            papers.push(Paper {
                id: page.id.clone(),
                title,
                notes,
                tags: page.tags(),
                url: page.url.clone(),
                synced_at,
            });
        }

        Ok(papers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn page_json(id: &str, title: &str) -> serde_json::Value {
        serde_json::json!({
            "id": id,
            "url": format!("https://notion.so/{id}"),
            "properties": {
                "Name": {
                    "type": "title",
                    "title": [{"plain_text": title}]
                },
                "Tags": {
                    "type": "multi_select",
                    "multi_select": [{"name": "ml"}]
                }
            }
        })
    }

    fn blocks_json(texts: &[&str]) -> serde_json::Value {
        serde_json::json!({
            "results": texts.iter().map(|t| serde_json::json!({
                "type": "paragraph",
                "paragraph": {"rich_text": [{"plain_text": t}]}
            })).collect::<Vec<_>>(),
            "has_more": false,
            "next_cursor": null
        })
    }

    #[tokio::test]
    async fn fetches_papers_with_notes() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/databases/db-1/query"))
            .and(header("notion-version", NOTION_VERSION))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "results": [page_json("page-1", "Attention Is All You Need")],
                "has_more": false,
                "next_cursor": null
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/v1/blocks/page-1/children"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(blocks_json(&["First note.", "Second note."])),
            )
            .mount(&server)
            .await;

        let client = NotionClient::new("secret", "db-1", Some(server.uri()));
        let papers = client.fetch_papers().await.unwrap();

        assert_eq!(papers.len(), 1);
        assert_eq!(papers[0].title, "Attention Is All You Need");
        assert_eq!(papers[0].notes, "First note.\nSecond note.");
        assert_eq!(papers[0].tags, vec!["ml".to_string()]);
    }

    #[tokio::test]
    async fn follows_query_pagination() {
        let server = MockServer::start().await;

        // First page points at a cursor; the cursor-bearing request
        // returns the rest.
        Mock::given(method("POST"))
            .and(path("/v1/databases/db-1/query"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "results": [page_json("page-1", "First")],
                "has_more": true,
                "next_cursor": "cursor-2"
            })))
            .up_to_n_times(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/v1/databases/db-1/query"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "results": [page_json("page-2", "Second")],
                "has_more": false,
                "next_cursor": null
            })))
            .mount(&server)
            .await;

        for id in ["page-1", "page-2"] {
            Mock::given(method("GET"))
                .and(path(format!("/v1/blocks/{id}/children")))
                .respond_with(ResponseTemplate::new(200).set_body_json(blocks_json(&["x"])))
                .mount(&server)
                .await;
        }

        let client = NotionClient::new("secret", "db-1", Some(server.uri()));
        let papers = client.fetch_papers().await.unwrap();
        assert_eq!(papers.len(), 2);
    }

    #[tokio::test]
    async fn follows_block_pagination() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/databases/db-1/query"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "results": [page_json("page-1", "Paper")],
                "has_more": false,
                "next_cursor": null
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/v1/blocks/page-1/children"))
            .and(query_param("start_cursor", "blocks-2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(blocks_json(&["Tail."])))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/v1/blocks/page-1/children"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "results": [{
                    "type": "paragraph",
                    "paragraph": {"rich_text": [{"plain_text": "Head."}]}
                }],
                "has_more": true,
                "next_cursor": "blocks-2"
            })))
            .mount(&server)
            .await;

        let client = NotionClient::new("secret", "db-1", Some(server.uri()));
        let papers = client.fetch_papers().await.unwrap();
        assert_eq!(papers[0].notes, "Head.\nTail.");
    }

    #[tokio::test]
    async fn skips_untitled_pages() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/databases/db-1/query"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "results": [
                    {"id": "page-0", "properties": {"Name": {"type": "title", "title": []}}},
                    page_json("page-1", "Titled")
                ],
                "has_more": false,
                "next_cursor": null
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/v1/blocks/page-1/children"))
            .respond_with(ResponseTemplate::new(200).set_body_json(blocks_json(&["n"])))
            .mount(&server)
            .await;

        let client = NotionClient::new("secret", "db-1", Some(server.uri()));
        let papers = client.fetch_papers().await.unwrap();
        assert_eq!(papers.len(), 1);
        assert_eq!(papers[0].title, "Titled");
    }

    #[tokio::test]
    async fn authentication_failure() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/databases/db-1/query"))
            .respond_with(ResponseTemplate::new(401).set_body_string("unauthorized"))
            .mount(&server)
            .await;

        let client = NotionClient::new("bad", "db-1", Some(server.uri()));
        let err = client.fetch_papers().await.unwrap_err();
        assert!(err.to_string().contains("authentication"));
    }
}
