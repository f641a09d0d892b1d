use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{missing, text, Draft, ValidationError};
use crate::content::Entity;
use crate::models::{ProjectCategory, Review, Service};

pub const DEFAULT_SERVICE_ICON: &str = "Monitor";
pub const DEFAULT_RATING: i32 = 5;

lazy_static! {
    static ref SLUG_REGEX: Regex = Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").unwrap();
}

pub fn is_valid_slug(slug: &str) -> bool {
    SLUG_REGEX.is_match(slug)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryDraft {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
}

impl Draft for CategoryDraft {
    const ENTITY: Entity = Entity::Categories;

    fn validate(&self) -> Result<(), ValidationError> {
        missing(&[("name", self.name.as_deref()), ("slug", self.slug.as_deref())])?;
        let slug = self.slug.as_deref().unwrap_or_default();
        if !is_valid_slug(slug) {
            return Err(ValidationError::InvalidSlug(slug.to_string()));
        }
        Ok(())
    }

    fn to_row(&self) -> Value {
        json!({
            "name": text(&self.name),
            "slug": text(&self.slug),
            "description": text(&self.description),
        })
    }
}

impl From<&ProjectCategory> for CategoryDraft {
    fn from(category: &ProjectCategory) -> Self {
        Self {
            name: Some(category.name.clone()),
            slug: Some(category.slug.clone()),
            description: category.description.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceDraft {
    pub title: Option<String>,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub is_featured: bool,
}

impl Default for ServiceDraft {
    fn default() -> Self {
        Self {
            title: None,
            description: None,
            icon: Some(DEFAULT_SERVICE_ICON.to_string()),
            is_featured: false,
        }
    }
}

impl Draft for ServiceDraft {
    const ENTITY: Entity = Entity::Services;

    fn validate(&self) -> Result<(), ValidationError> {
        missing(&[("title", self.title.as_deref())])
    }

    fn to_row(&self) -> Value {
        json!({
            "title": text(&self.title),
            "description": text(&self.description),
            "icon": text(&self.icon),
            "is_featured": self.is_featured,
        })
    }
}

impl From<&Service> for ServiceDraft {
    fn from(service: &Service) -> Self {
        Self {
            title: Some(service.title.clone()),
            description: service.description.clone(),
            icon: service.icon.clone(),
            is_featured: service.is_featured,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewDraft {
    pub client_name: Option<String>,
    pub client_image: Option<String>,
    pub rating: i32,
    pub review_text: Option<String>,
    pub project_type: Option<String>,
    pub is_featured: bool,
}

impl Default for ReviewDraft {
    fn default() -> Self {
        Self {
            client_name: None,
            client_image: None,
            rating: DEFAULT_RATING,
            review_text: None,
            project_type: None,
            is_featured: false,
        }
    }
}

impl Draft for ReviewDraft {
    const ENTITY: Entity = Entity::Reviews;

    fn validate(&self) -> Result<(), ValidationError> {
        missing(&[
            ("client_name", self.client_name.as_deref()),
            ("review_text", self.review_text.as_deref()),
        ])?;
        if !(1..=5).contains(&self.rating) {
            return Err(ValidationError::RatingOutOfRange(self.rating));
        }
        Ok(())
    }

    fn to_row(&self) -> Value {
        json!({
            "client_name": text(&self.client_name),
            "client_image": text(&self.client_image),
            "rating": self.rating,
            "review_text": text(&self.review_text),
            "project_type": text(&self.project_type),
            "is_featured": self.is_featured,
        })
    }
}

impl From<&Review> for ReviewDraft {
    fn from(review: &Review) -> Self {
        Self {
            client_name: Some(review.client_name.clone()),
            client_image: review.client_image.clone(),
            rating: review.rating.unwrap_or(DEFAULT_RATING),
            review_text: Some(review.review_text.clone()),
            project_type: review.project_type.clone(),
            is_featured: review.is_featured,
        }
    }
}
