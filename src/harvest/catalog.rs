//! Catalog enumeration: a Crossref-style journal works query.
//!
//! Produces the run's candidate items (one per DOI), writes a TSV index of
//! the catalog next to the outputs, and can keep the raw response for
//! debugging. A failure here is fatal to the run — there is nothing to
//! process without the listing.

use std::path::PathBuf;

use reqwest::Client;
use serde::Deserialize;
use tracing::info;

use crate::error::EnumerationError;
use crate::pipeline::{Source, WorkItem};

const DEFAULT_BASE_URL: &str = "https://api.crossref.org";
const SELECT_FIELDS: &str = "DOI,title,container-title,volume,issue,published";
const ROWS: u32 = 1000;

#[derive(Debug, Deserialize)]
struct WorksResponse {
    message: WorksMessage,
}

#[derive(Debug, Deserialize)]
struct WorksMessage {
    #[serde(default)]
    items: Vec<WorkEntry>,
}

/// One catalog entry. Entries without a title are dropped, matching the
/// index the tool has always produced.
#[derive(Debug, Deserialize)]
struct WorkEntry {
    #[serde(rename = "DOI")]
    doi: String,
    #[serde(default)]
    title: Vec<String>,
    #[serde(rename = "container-title", default)]
    container_title: Vec<String>,
    #[serde(default)]
    volume: Option<String>,
    #[serde(default)]
    issue: Option<String>,
    #[serde(default)]
    published: Option<Published>,
}

#[derive(Debug, Deserialize)]
struct Published {
    #[serde(rename = "date-parts", default)]
    date_parts: Vec<Vec<i64>>,
}

pub struct CrossrefCatalog {
    client: Client,
    base_url: String,
    journal_id: u64,
    start_year: i32,
    end_year: i32,
    /// Where the TSV index (and the raw response, if kept) is written.
    index_dir: Option<PathBuf>,
    save_raw: bool,
}

impl CrossrefCatalog {
    pub fn new(journal_id: u64, start_year: i32, end_year: i32) -> Self {
        Self::with_base_url(journal_id, start_year, end_year, DEFAULT_BASE_URL.to_string())
    }

    /// Catalog pointing at a custom base URL (useful for testing).
    pub fn with_base_url(
        journal_id: u64,
        start_year: i32,
        end_year: i32,
        base_url: String,
    ) -> Self {
        Self {
            client: Client::new(),
            base_url,
            journal_id,
            start_year,
            end_year,
            index_dir: None,
            save_raw: false,
        }
    }

    pub fn with_index_dir(mut self, dir: PathBuf) -> Self {
        self.index_dir = Some(dir);
        self
    }

    pub fn save_raw_response(mut self, save: bool) -> Self {
        self.save_raw = save;
        self
    }

    fn query_url(&self) -> String {
        format!(
            "{}/journals/{}/works?select={}&rows={}&filter=from-pub-date:{},until-pub-date:{}",
            self.base_url, self.journal_id, SELECT_FIELDS, ROWS, self.start_year, self.end_year
        )
    }

    fn write_index(&self, dir: &std::path::Path, entries: &[WorkEntry]) -> std::io::Result<()> {
        let mut tsv = String::from("DOI\ttitle\tcontainer-title\tvolume\tissue\tpublished\n");
        for entry in entries {
            tsv.push_str(&format!(
                "{}\t{}\t{}\t{}\t{}\t{}\n",
                entry.doi,
                entry.title.first().map(String::as_str).unwrap_or(""),
                entry.container_title.first().map(String::as_str).unwrap_or(""),
                entry.volume.as_deref().unwrap_or(""),
                entry.issue.as_deref().unwrap_or(""),
                published_string(entry),
            ));
        }
        let path = dir.join(format!(
            "articles_{}_{}_{}.tsv",
            self.journal_id, self.start_year, self.end_year
        ));
        std::fs::write(path, tsv)
    }
}

fn published_string(entry: &WorkEntry) -> String {
    entry
        .published
        .as_ref()
        .and_then(|p| p.date_parts.first())
        .map(|parts| {
            parts
                .iter()
                .map(i64::to_string)
                .collect::<Vec<_>>()
                .join("-")
        })
        .unwrap_or_default()
}

impl Source for CrossrefCatalog {
    async fn enumerate(&self) -> Result<Vec<WorkItem>, EnumerationError> {
        let response = self.client.get(self.query_url()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(EnumerationError::Status {
                status: status.as_u16(),
            });
        }
        let body = response.text().await?;

        if let Some(dir) = &self.index_dir
            && self.save_raw
        {
            std::fs::write(dir.join("crossref_articles.json"), &body)?;
        }

        let works: WorksResponse = serde_json::from_str(&body)?;
        let entries: Vec<WorkEntry> = works
            .message
            .items
            .into_iter()
            .filter(|entry| !entry.title.is_empty())
            .collect();

        if let Some(dir) = &self.index_dir {
            self.write_index(dir, &entries)?;
        }

        info!(
            journal = self.journal_id,
            entries = entries.len(),
            "catalog enumerated"
        );
        Ok(entries
            .into_iter()
            .map(|entry| WorkItem::new(entry.doi))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const CATALOG_BODY: &str = r#"{
        "message": {
            "items": [
                {
                    "DOI": "10.1111/alpha",
                    "title": ["Alpha Study"],
                    "container-title": ["Journal of Things"],
                    "volume": "12",
                    "issue": "3",
                    "published": {"date-parts": [[2020, 4, 1]]}
                },
                {
                    "DOI": "10.1111/untitled"
                }
            ]
        }
    }"#;

    #[tokio::test]
    async fn enumerate_yields_items_with_titles_only() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/journals/77/works"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(CATALOG_BODY, "application/json"))
            .mount(&server)
            .await;

        let catalog = CrossrefCatalog::with_base_url(77, 2019, 2021, server.uri());
        let items = catalog.enumerate().await.unwrap();

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, "10.1111/alpha");
        assert_eq!(items[0].locator, "10.1111/alpha");
    }

    #[tokio::test]
    async fn enumerate_writes_the_tsv_index() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/journals/77/works"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(CATALOG_BODY, "application/json"))
            .mount(&server)
            .await;
        let dir = tempfile::tempdir().unwrap();

        let catalog = CrossrefCatalog::with_base_url(77, 2019, 2021, server.uri())
            .with_index_dir(dir.path().to_path_buf())
            .save_raw_response(true);
        catalog.enumerate().await.unwrap();

        let tsv = std::fs::read_to_string(dir.path().join("articles_77_2019_2021.tsv")).unwrap();
        let mut lines = tsv.lines();
        assert_eq!(
            lines.next().unwrap(),
            "DOI\ttitle\tcontainer-title\tvolume\tissue\tpublished"
        );
        assert_eq!(
            lines.next().unwrap(),
            "10.1111/alpha\tAlpha Study\tJournal of Things\t12\t3\t2020-4-1"
        );
        assert!(lines.next().is_none());

        assert!(dir.path().join("crossref_articles.json").exists());
    }

    #[tokio::test]
    async fn non_success_status_is_a_fatal_enumeration_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/journals/77/works"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let catalog = CrossrefCatalog::with_base_url(77, 2019, 2021, server.uri());
        let err = catalog.enumerate().await.unwrap_err();
        assert!(matches!(err, EnumerationError::Status { status: 503 }));
    }

    #[tokio::test]
    async fn garbage_body_is_a_parse_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/journals/77/works"))
            .respond_with(ResponseTemplate::new(200).set_body_raw("not json", "application/json"))
            .mount(&server)
            .await;

        let catalog = CrossrefCatalog::with_base_url(77, 2019, 2021, server.uri());
        let err = catalog.enumerate().await.unwrap_err();
        assert!(matches!(err, EnumerationError::Parse(_)));
    }
}
