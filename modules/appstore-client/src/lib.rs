pub mod error;
pub mod types;

pub use error::{AppStoreError, Result};
pub use types::{AppListing, StoreReview};

use std::time::Duration;

use types::{FeedEntry, ReviewFeed, SearchResponse};

const SEARCH_URL: &str = "https://itunes.apple.com/search";
const REVIEWS_BASE_URL: &str = "https://itunes.apple.com";

/// The customer-review feed serves 50 reviews per page.
pub const FEED_PAGE_SIZE: usize = 50;

/// The feed refuses pages past 10.
pub const FEED_MAX_PAGES: u32 = 10;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

pub struct AppStoreClient {
    client: reqwest::Client,
    search_url: String,
    reviews_base_url: String,
    country: String,
}

impl AppStoreClient {
    pub fn new(country: impl Into<String>) -> Result<Self> {
        Self::with_timeout(country, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(country: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppStoreError::Config(e.to_string()))?;

        Ok(Self {
            client,
            search_url: SEARCH_URL.to_string(),
            reviews_base_url: REVIEWS_BASE_URL.to_string(),
            country: country.into(),
        })
    }

    /// Point the client at a different host (mirrors, local fakes).
    pub fn with_base_urls(
        mut self,
        search_url: impl Into<String>,
        reviews_base_url: impl Into<String>,
    ) -> Self {
        self.search_url = search_url.into();
        self.reviews_base_url = reviews_base_url.into();
        self
    }

    pub fn country(&self) -> &str {
        &self.country
    }

    /// Search the store for apps matching `term`, best match first.
    pub async fn search_apps(&self, term: &str, limit: u32) -> Result<Vec<AppListing>> {
        tracing::debug!(term, limit, "Searching app store");

        let limit = limit.to_string();
        let resp = self
            .client
            .get(&self.search_url)
            .query(&[
                ("term", term),
                ("entity", "software"),
                ("country", self.country.as_str()),
                ("limit", limit.as_str()),
            ])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(AppStoreError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let search: SearchResponse = resp.json().await?;
        tracing::debug!(term, result_count = search.result_count, "Search complete");
        Ok(search.results)
    }

    /// Fetch one page of the most-recent-first review feed.
    pub async fn review_page(&self, app_id: u64, page: u32) -> Result<Vec<StoreReview>> {
        let url = format!(
            "{}/{}/rss/customerreviews/page={}/id={}/sortby=mostrecent/json",
            self.reviews_base_url, self.country, page, app_id
        );

        let resp = self.client.get(&url).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(AppStoreError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let feed: ReviewFeed = resp.json().await?;
        Ok(feed
            .feed
            .entry
            .into_vec()
            .into_iter()
            .filter_map(FeedEntry::into_review)
            .collect())
    }

    /// Fetch up to `count` reviews, newest first, paging through the feed.
    ///
    /// A failure on the first page is an error. A failure on a later page
    /// ends paging and returns what was collected.
    pub async fn fetch_reviews(&self, app_id: u64, count: usize) -> Result<Vec<StoreReview>> {
        let mut reviews = Vec::with_capacity(count.min(FEED_PAGE_SIZE * FEED_MAX_PAGES as usize));

        for page in 1..=FEED_MAX_PAGES {
            if reviews.len() >= count {
                break;
            }

            let batch = match self.review_page(app_id, page).await {
                Ok(batch) => batch,
                Err(e) if page > 1 => {
                    tracing::warn!(app_id, page, error = %e, "Stopping review paging early");
                    break;
                }
                Err(e) => return Err(e),
            };

            if batch.is_empty() {
                break;
            }
            reviews.extend(batch);
        }

        reviews.truncate(count);
        tracing::debug!(app_id, count = reviews.len(), "Fetched reviews");
        Ok(reviews)
    }
}
