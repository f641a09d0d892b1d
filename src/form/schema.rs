//! Which project fields a category shows.
//!
//! The category slug picks a [`CategoryKind`] through a lookup table; each
//! kind declares the fields it adds on top of the common set.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryKind {
    GraphicDesign,
    WebsiteDevelopment,
    VideoEditing,
    Other,
}

const KIND_BY_SLUG: &[(&str, CategoryKind)] = &[
    ("graphic-design", CategoryKind::GraphicDesign),
    ("website-development", CategoryKind::WebsiteDevelopment),
    ("video-editing", CategoryKind::VideoEditing),
];

impl CategoryKind {
    pub fn from_slug(slug: &str) -> Self {
        KIND_BY_SLUG
            .iter()
            .find(|(s, _)| *s == slug)
            .map(|(_, kind)| *kind)
            .unwrap_or(CategoryKind::Other)
    }

    pub fn extra_fields(self) -> &'static [ProjectField] {
        use ProjectField::*;
        match self {
            CategoryKind::GraphicDesign => &[ClientName, BrandName],
            CategoryKind::WebsiteDevelopment => &[DemoUrl, CodeUrl, ProjectUrl, ClientName],
            CategoryKind::VideoEditing => &[ClientName, Duration],
            CategoryKind::Other => &[],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectField {
    Title,
    Description,
    Category,
    ImageUrl,
    ThumbnailUrl,
    Images,
    ProjectDate,
    SocialDate,
    ShowOnHome,
    IsFeatured,
    InstagramUrl,
    YoutubeViews,
    ClientName,
    BrandName,
    DemoUrl,
    CodeUrl,
    ProjectUrl,
    Duration,
}

/// Where a field's value is stored on the project row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldStorage {
    Column(&'static str),
    /// A key inside the `social_links` object.
    Social(&'static str),
}

pub const COMMON_FIELDS: &[ProjectField] = &[
    ProjectField::Title,
    ProjectField::Description,
    ProjectField::Category,
    ProjectField::ImageUrl,
    ProjectField::ThumbnailUrl,
    ProjectField::Images,
    ProjectField::ProjectDate,
    ProjectField::SocialDate,
    ProjectField::ShowOnHome,
    ProjectField::IsFeatured,
    ProjectField::InstagramUrl,
    ProjectField::YoutubeViews,
];

impl ProjectField {
    pub fn storage(self) -> FieldStorage {
        use FieldStorage::*;
        match self {
            ProjectField::Title => Column("title"),
            ProjectField::Description => Column("description"),
            ProjectField::Category => Column("category_id"),
            ProjectField::ImageUrl => Column("image_url"),
            ProjectField::ThumbnailUrl => Column("thumbnail_url"),
            ProjectField::Images => Column("images"),
            ProjectField::ProjectDate => Column("project_date"),
            ProjectField::SocialDate => Column("social_date"),
            ProjectField::ShowOnHome => Column("show_on_home"),
            ProjectField::IsFeatured => Column("is_featured"),
            ProjectField::InstagramUrl => Column("instagram_url"),
            ProjectField::YoutubeViews => Column("youtube_views"),
            ProjectField::ClientName => Column("client_name"),
            ProjectField::BrandName => Column("brand_name"),
            ProjectField::DemoUrl => Column("demo_url"),
            ProjectField::CodeUrl => Column("code_url"),
            ProjectField::ProjectUrl => Social("project_url"),
            ProjectField::Duration => Social("duration"),
        }
    }
}

/// The visible field set for the current category selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormSchema {
    pub kind: Option<CategoryKind>,
    pub fields: Vec<ProjectField>,
}

impl FormSchema {
    /// `None` is the state before any category is chosen: common fields only.
    pub fn for_kind(kind: Option<CategoryKind>) -> Self {
        let mut fields = COMMON_FIELDS.to_vec();
        if let Some(kind) = kind {
            for field in kind.extra_fields() {
                if !fields.contains(field) {
                    fields.push(*field);
                }
            }
        }
        Self { kind, fields }
    }

    pub fn for_slug(slug: Option<&str>) -> Self {
        Self::for_kind(slug.map(CategoryKind::from_slug))
    }

    pub fn is_visible(&self, field: ProjectField) -> bool {
        self.fields.contains(&field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_lookup() {
        assert_eq!(CategoryKind::from_slug("graphic-design"), CategoryKind::GraphicDesign);
        assert_eq!(CategoryKind::from_slug("video-editing"), CategoryKind::VideoEditing);
        assert_eq!(CategoryKind::from_slug("photography"), CategoryKind::Other);
        assert_eq!(CategoryKind::from_slug(""), CategoryKind::Other);
    }

    #[test]
    fn test_schema_per_kind() {
        let web = FormSchema::for_kind(Some(CategoryKind::WebsiteDevelopment));
        assert!(web.is_visible(ProjectField::DemoUrl));
        assert!(web.is_visible(ProjectField::ProjectUrl));
        assert!(!web.is_visible(ProjectField::BrandName));

        let video = FormSchema::for_slug(Some("video-editing"));
        assert!(video.is_visible(ProjectField::Duration));
        assert!(video.is_visible(ProjectField::ClientName));
        assert!(!video.is_visible(ProjectField::DemoUrl));

        let other = FormSchema::for_kind(Some(CategoryKind::Other));
        assert_eq!(other.fields, COMMON_FIELDS.to_vec());
    }

    #[test]
    fn test_no_category_shows_common_fields() {
        let schema = FormSchema::for_slug(None);
        assert_eq!(schema.kind, None);
        assert!(schema.is_visible(ProjectField::Title));
        assert!(!schema.is_visible(ProjectField::ClientName));
    }

    #[test]
    fn test_social_fields_are_stored_in_social_links() {
        assert_eq!(ProjectField::Duration.storage(), FieldStorage::Social("duration"));
        assert_eq!(ProjectField::ClientName.storage(), FieldStorage::Column("client_name"));
    }
}
