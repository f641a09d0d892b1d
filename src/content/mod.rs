//! Reads and writes of site content: projects, categories, services, reviews.

pub mod fetch;
pub mod mutate;

pub use fetch::{
    fetch_categories, fetch_featured_reviews, fetch_featured_services, fetch_home_projects,
    fetch_list, fetch_projects, fetch_reviews, fetch_services, filter_by_category, EntityList,
    HOME_PROJECT_LIMIT,
};
pub use mutate::{create, delete, set_featured, set_flag, set_show_on_home, update, Flag};

use serde::{Deserialize, Serialize};

use crate::backend::{BackendError, Table};
use crate::form::ValidationError;

/// The four content collections managed from the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Entity {
    Projects,
    Categories,
    Services,
    Reviews,
}

impl Entity {
    pub fn table(self) -> Table {
        match self {
            Entity::Projects => Table::Projects,
            Entity::Categories => Table::ProjectCategories,
            Entity::Services => Table::Services,
            Entity::Reviews => Table::Reviews,
        }
    }

    pub fn plural(self) -> &'static str {
        match self {
            Entity::Projects => "projects",
            Entity::Categories => "categories",
            Entity::Services => "services",
            Entity::Reviews => "reviews",
        }
    }

    pub fn singular(self) -> &'static str {
        match self {
            Entity::Projects => "project",
            Entity::Categories => "category",
            Entity::Services => "service",
            Entity::Reviews => "review",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Entity::Projects => "Project",
            Entity::Categories => "Category",
            Entity::Services => "Service",
            Entity::Reviews => "Review",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ContentError {
    #[error("Failed to fetch {}", .entity.plural())]
    Fetch {
        entity: Entity,
        #[source]
        source: BackendError,
    },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Failed to add {}", .entity.singular())]
    Create {
        entity: Entity,
        #[source]
        source: BackendError,
    },

    #[error("Failed to update {}", .entity.singular())]
    Update {
        entity: Entity,
        #[source]
        source: BackendError,
    },

    #[error("Failed to delete {}", .entity.singular())]
    Delete {
        entity: Entity,
        #[source]
        source: BackendError,
    },

    #[error("{} has no {column} flag", .entity.plural())]
    UnsupportedFlag { entity: Entity, column: &'static str },
}

impl ContentError {
    pub fn backend(&self) -> Option<&BackendError> {
        match self {
            ContentError::Fetch { source, .. }
            | ContentError::Create { source, .. }
            | ContentError::Update { source, .. }
            | ContentError::Delete { source, .. } => Some(source),
            _ => None,
        }
    }

    pub fn notification(&self) -> Notification {
        Notification::error(self.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Success,
    Error,
}

/// A short user-facing message about the outcome of an action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub level: NotificationLevel,
    pub title: String,
    pub description: String,
}

impl Notification {
    pub fn success(description: impl Into<String>) -> Self {
        Self::titled(NotificationLevel::Success, "Success", description)
    }

    pub fn error(description: impl Into<String>) -> Self {
        Self::titled(NotificationLevel::Error, "Error", description)
    }

    pub fn titled(level: NotificationLevel, title: &str, description: impl Into<String>) -> Self {
        Self {
            level,
            title: title.to_string(),
            description: description.into(),
        }
    }

    pub fn added(entity: Entity) -> Self {
        Self::success(format!("{} added successfully", entity.label()))
    }

    pub fn updated(entity: Entity) -> Self {
        Self::success(format!("{} updated successfully", entity.label()))
    }

    pub fn deleted(entity: Entity) -> Self {
        Self::success(format!("{} deleted successfully", entity.label()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = ContentError::Fetch {
            entity: Entity::Services,
            source: BackendError::Storage("down".to_string()),
        };
        assert_eq!(err.to_string(), "Failed to fetch services");
        assert!(err.backend().is_some());

        let err = ContentError::Create {
            entity: Entity::Projects,
            source: BackendError::InvalidRow("x".to_string()),
        };
        assert_eq!(err.notification().description, "Failed to add project");
        assert_eq!(err.notification().title, "Error");

        let err = ContentError::from(ValidationError::MissingFields(vec!["title"]));
        assert_eq!(err.to_string(), "Please fill in required fields");
        assert!(err.backend().is_none());
    }

    #[test]
    fn test_success_notifications() {
        assert_eq!(Notification::added(Entity::Projects).description, "Project added successfully");
        assert_eq!(
            Notification::deleted(Entity::Projects).description,
            "Project deleted successfully"
        );
        assert_eq!(Notification::updated(Entity::Reviews).level, NotificationLevel::Success);
    }

    #[test]
    fn test_entity_paths() {
        let parsed: Entity = serde_json::from_str("\"categories\"").unwrap();
        assert_eq!(parsed, Entity::Categories);
        assert!(serde_json::from_str::<Entity>("\"profiles\"").is_err());
        assert_eq!(Entity::Categories.table(), Table::ProjectCategories);
    }
}
