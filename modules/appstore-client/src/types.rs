use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// --- Search API ---

/// Response body of `GET /search?entity=software`.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    #[serde(rename = "resultCount", default)]
    pub result_count: u32,
    #[serde(default)]
    pub results: Vec<AppListing>,
}

/// One app returned by the search API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppListing {
    #[serde(rename = "trackId")]
    pub track_id: u64,
    #[serde(rename = "trackName")]
    pub track_name: Option<String>,
    #[serde(rename = "bundleId")]
    pub bundle_id: Option<String>,
    #[serde(rename = "sellerName")]
    pub seller_name: Option<String>,
    #[serde(rename = "averageUserRating")]
    pub average_user_rating: Option<f64>,
}

impl AppListing {
    /// Display name, falling back to the bundle id and then the numeric id.
    pub fn title(&self) -> String {
        self.track_name
            .clone()
            .or_else(|| self.bundle_id.clone())
            .unwrap_or_else(|| self.track_id.to_string())
    }
}

// --- Customer reviews feed ---

/// Response body of `/rss/customerreviews/.../json`.
#[derive(Debug, Clone, Deserialize)]
pub struct ReviewFeed {
    pub feed: FeedBody,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedBody {
    /// Absent on an exhausted page; a bare object when the page holds one entry.
    #[serde(default)]
    pub entry: OneOrMany<FeedEntry>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> Default for OneOrMany<T> {
    fn default() -> Self {
        OneOrMany::Many(Vec::new())
    }
}

impl<T> OneOrMany<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::Many(items) => items,
            OneOrMany::One(item) => vec![item],
        }
    }
}

/// `{"label": "..."}` wrapper used by every feed field.
#[derive(Debug, Clone, Deserialize)]
pub struct Label {
    pub label: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedAuthor {
    pub name: Option<Label>,
}

/// A single raw feed entry.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedEntry {
    pub id: Option<Label>,
    pub author: Option<FeedAuthor>,
    pub title: Option<Label>,
    pub content: Option<Label>,
    pub updated: Option<Label>,
    #[serde(rename = "im:rating")]
    pub rating: Option<Label>,
    #[serde(rename = "im:version")]
    pub version: Option<Label>,
}

impl FeedEntry {
    /// Convert to a normalized review. Entries without a rating describe the
    /// app itself rather than a review and yield `None`.
    pub fn into_review(self) -> Option<StoreReview> {
        let rating = self.rating?.label.trim().parse::<u8>().ok();
        let updated = self.updated.and_then(|u| {
            DateTime::parse_from_rfc3339(&u.label)
                .ok()
                .map(|d| d.with_timezone(&Utc))
        });

        Some(StoreReview {
            review_id: self.id.map(|l| l.label),
            author: self.author.and_then(|a| a.name).map(|l| l.label),
            rating,
            title: self.title.map(|l| l.label),
            content: self.content.map(|l| l.label),
            version: self.version.map(|l| l.label),
            updated,
        })
    }
}

/// A normalized customer review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreReview {
    pub review_id: Option<String>,
    pub author: Option<String>,
    pub rating: Option<u8>,
    pub title: Option<String>,
    pub content: Option<String>,
    pub version: Option<String>,
    pub updated: Option<DateTime<Utc>>,
}
