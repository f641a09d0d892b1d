//! The project draft and the commands that change it.
//!
//! Every change goes through [`ProjectDraft::reduce`], a pure function from
//! (draft, command) to the next draft.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::schema::{CategoryKind, FieldStorage, FormSchema, ProjectField};
use super::{missing, text, Draft, ValidationError};
use crate::content::Entity;
use crate::models::Project;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectDraft {
    pub title: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub images: Vec<String>,
    pub demo_url: Option<String>,
    pub code_url: Option<String>,
    pub instagram_url: Option<String>,
    pub youtube_views: Option<i64>,
    pub brand_name: Option<String>,
    pub client_name: Option<String>,
    pub project_date: Option<String>,
    pub social_date: Option<String>,
    pub social_links: Map<String, Value>,
    pub show_on_home: bool,
    pub is_featured: bool,
    pub category_id: Option<String>,
    /// Slug of the selected category; drives the visible field set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_slug: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProjectCommand {
    SetTitle(String),
    SetDescription(String),
    SetCategory { id: String, slug: Option<String> },
    /// Text value for any field; flags and view counts are parsed.
    SetField(ProjectField, String),
    SetSocial(String, String),
    SetYoutubeViews(Option<i64>),
    SetShowOnHome(bool),
    SetFeatured(bool),
    AddImage(String),
    RemoveImage(usize),
    SetThumbnail(Option<String>),
    Reset,
    LoadFrom(Box<Project>),
}

impl ProjectDraft {
    pub fn reduce(mut self, command: ProjectCommand) -> Self {
        match command {
            ProjectCommand::SetTitle(title) => self.title = Some(title),
            ProjectCommand::SetDescription(description) => self.description = Some(description),
            ProjectCommand::SetCategory { id, slug } => {
                self.category_id = Some(id);
                self.category_slug = slug;
            }
            ProjectCommand::SetField(field, value) => self.set_field(field, value),
            ProjectCommand::SetSocial(key, value) => {
                self.social_links.insert(key, Value::String(value));
            }
            ProjectCommand::SetYoutubeViews(views) => self.youtube_views = views,
            ProjectCommand::SetShowOnHome(on) => self.show_on_home = on,
            ProjectCommand::SetFeatured(on) => self.is_featured = on,
            ProjectCommand::AddImage(url) => self.images.push(url),
            ProjectCommand::RemoveImage(index) => {
                if index < self.images.len() {
                    self.images.remove(index);
                }
            }
            ProjectCommand::SetThumbnail(url) => self.thumbnail_url = url,
            ProjectCommand::Reset => return Self::default(),
            ProjectCommand::LoadFrom(project) => return Self::from(project.as_ref()),
        }
        self
    }

    pub fn apply(&mut self, command: ProjectCommand) {
        *self = std::mem::take(self).reduce(command);
    }

    fn set_field(&mut self, field: ProjectField, value: String) {
        match field {
            ProjectField::Title => self.title = Some(value),
            ProjectField::Description => self.description = Some(value),
            ProjectField::Category => {
                self.category_id = Some(value);
                self.category_slug = None;
            }
            ProjectField::ImageUrl => self.image_url = Some(value),
            ProjectField::ThumbnailUrl => self.thumbnail_url = Some(value),
            ProjectField::Images => {
                if !value.is_empty() {
                    self.images.push(value);
                }
            }
            ProjectField::ProjectDate => self.project_date = Some(value),
            ProjectField::SocialDate => self.social_date = Some(value),
            ProjectField::ShowOnHome => self.show_on_home = value == "true",
            ProjectField::IsFeatured => self.is_featured = value == "true",
            ProjectField::InstagramUrl => self.instagram_url = Some(value),
            ProjectField::YoutubeViews => self.youtube_views = value.trim().parse().ok(),
            ProjectField::ClientName => self.client_name = Some(value),
            ProjectField::BrandName => self.brand_name = Some(value),
            ProjectField::DemoUrl => self.demo_url = Some(value),
            ProjectField::CodeUrl => self.code_url = Some(value),
            ProjectField::ProjectUrl | ProjectField::Duration => {
                if let FieldStorage::Social(key) = field.storage() {
                    self.social_links.insert(key.to_string(), Value::String(value));
                }
            }
        }
    }

    pub fn kind(&self) -> Option<CategoryKind> {
        self.category_slug.as_deref().map(CategoryKind::from_slug)
    }

    pub fn schema(&self) -> FormSchema {
        FormSchema::for_kind(self.kind())
    }

    fn has_value(&self, field: ProjectField) -> bool {
        let filled = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.is_empty());
        match field {
            ProjectField::Title => filled(&self.title),
            ProjectField::Description => filled(&self.description),
            ProjectField::Category => filled(&self.category_id),
            ProjectField::ImageUrl => filled(&self.image_url),
            ProjectField::ThumbnailUrl => filled(&self.thumbnail_url),
            ProjectField::Images => !self.images.is_empty(),
            ProjectField::ProjectDate => filled(&self.project_date),
            ProjectField::SocialDate => filled(&self.social_date),
            ProjectField::ShowOnHome => self.show_on_home,
            ProjectField::IsFeatured => self.is_featured,
            ProjectField::InstagramUrl => filled(&self.instagram_url),
            ProjectField::YoutubeViews => self.youtube_views.is_some_and(|v| v != 0),
            ProjectField::ClientName => filled(&self.client_name),
            ProjectField::BrandName => filled(&self.brand_name),
            ProjectField::DemoUrl => filled(&self.demo_url),
            ProjectField::CodeUrl => filled(&self.code_url),
            ProjectField::ProjectUrl | ProjectField::Duration => match field.storage() {
                FieldStorage::Social(key) => self
                    .social_links
                    .get(key)
                    .and_then(Value::as_str)
                    .is_some_and(|s| !s.is_empty()),
                FieldStorage::Column(_) => false,
            },
        }
    }

    /// Populated fields the current category does not show. They are still
    /// submitted; callers use this to flag them.
    pub fn hidden_values(&self) -> Vec<ProjectField> {
        let schema = self.schema();
        [
            ProjectField::ClientName,
            ProjectField::BrandName,
            ProjectField::DemoUrl,
            ProjectField::CodeUrl,
            ProjectField::ProjectUrl,
            ProjectField::Duration,
        ]
        .into_iter()
        .filter(|field| !schema.is_visible(*field) && self.has_value(*field))
        .collect()
    }
}

impl From<&Project> for ProjectDraft {
    fn from(project: &Project) -> Self {
        Self {
            title: Some(project.title.clone()),
            description: project.description.clone(),
            image_url: project.image_url.clone(),
            thumbnail_url: project.thumbnail_url.clone(),
            images: project.images.clone(),
            demo_url: project.demo_url.clone(),
            code_url: project.code_url.clone(),
            instagram_url: project.instagram_url.clone(),
            youtube_views: project.youtube_views,
            brand_name: project.brand_name.clone(),
            client_name: project.client_name.clone(),
            project_date: project.project_date.clone(),
            social_date: project.social_date.clone(),
            social_links: match &project.social_links {
                Some(Value::Object(map)) => map.clone(),
                _ => Map::new(),
            },
            show_on_home: project.show_on_home,
            is_featured: project.is_featured,
            category_id: Some(project.category_id.to_string()),
            category_slug: project.category_slug().map(str::to_string),
        }
    }
}

impl Draft for ProjectDraft {
    const ENTITY: Entity = Entity::Projects;

    fn validate(&self) -> Result<(), ValidationError> {
        missing(&[
            ("title", self.title.as_deref()),
            ("category_id", self.category_id.as_deref()),
        ])
    }

    fn to_row(&self) -> Value {
        let social_links = if self.social_links.is_empty() {
            Value::Null
        } else {
            Value::Object(self.social_links.clone())
        };

        json!({
            "title": text(&self.title),
            "description": text(&self.description),
            "image_url": text(&self.image_url),
            "thumbnail_url": text(&self.thumbnail_url),
            "images": self.images,
            "demo_url": text(&self.demo_url),
            "code_url": text(&self.code_url),
            "instagram_url": text(&self.instagram_url),
            "youtube_views": self.youtube_views.filter(|v| *v != 0),
            "brand_name": text(&self.brand_name),
            "client_name": text(&self.client_name),
            "project_date": text(&self.project_date),
            "social_date": text(&self.social_date),
            "social_links": social_links,
            "show_on_home": self.show_on_home,
            "is_featured": self.is_featured,
            "category_id": text(&self.category_id),
        })
    }
}
