//! Row shapes of the content tables, as returned by the backend.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// The `{ name, slug }` object embedded in a project fetched with its category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRef {
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
    pub demo_url: Option<String>,
    pub code_url: Option<String>,
    pub instagram_url: Option<String>,
    pub youtube_views: Option<i64>,
    pub brand_name: Option<String>,
    pub client_name: Option<String>,
    pub project_date: Option<String>,
    /// Date the piece went out on social media.
    pub social_date: Option<String>,
    pub social_links: Option<Value>,
    pub metadata: Option<Value>,
    #[serde(default)]
    pub show_on_home: bool,
    #[serde(default)]
    pub is_featured: bool,
    pub category_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_categories: Option<CategoryRef>,
}

impl Project {
    pub fn category_slug(&self) -> Option<&str> {
        self.project_categories.as_ref().map(|c| c.slug.as_str())
    }

    /// A string entry of `social_links`, e.g. `project_url` or `duration`.
    pub fn social(&self, key: &str) -> Option<&str> {
        self.social_links.as_ref()?.get(key)?.as_str()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectCategory {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Service {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub icon: Option<String>,
    #[serde(default)]
    pub is_featured: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    pub id: Uuid,
    pub client_name: String,
    pub client_image: Option<String>,
    pub rating: Option<i32>,
    pub review_text: String,
    pub project_type: Option<String>,
    #[serde(default)]
    pub is_featured: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub email: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
