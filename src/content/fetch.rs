use serde::de::DeserializeOwned;
use serde::Serialize;

use super::{ContentError, Entity};
use crate::backend::{BackendClient, BackendError, Query, Table};
use crate::models::{Project, ProjectCategory, Review, Service};

/// Projects shown in the home page preview.
pub const HOME_PROJECT_LIMIT: usize = 4;

const CATEGORY_JOIN: &[&str] = &["name", "slug"];

/// Selection value that disables the category filter.
pub const ALL_CATEGORIES: &str = "all";

async fn fetch<T: DeserializeOwned>(
    client: &BackendClient,
    entity: Entity,
    query: Query,
) -> Result<Vec<T>, ContentError> {
    let rows = client
        .db()
        .select(&query)
        .await
        .and_then(|rows| {
            rows.into_iter()
                .map(|row| serde_json::from_value(row).map_err(BackendError::from))
                .collect::<Result<Vec<T>, _>>()
        })
        .map_err(|source| {
            tracing::error!(entity = entity.plural(), error = %source, "fetch failed");
            ContentError::Fetch { entity, source }
        })?;

    tracing::debug!(entity = entity.plural(), count = rows.len(), "fetched");
    Ok(rows)
}

fn projects_query(client: &BackendClient) -> Query {
    client
        .from(Table::Projects)
        .join(Table::ProjectCategories, "category_id", CATEGORY_JOIN)
        .order("created_at", false)
}

/// All projects with their category, newest first.
pub async fn fetch_projects(client: &BackendClient) -> Result<Vec<Project>, ContentError> {
    fetch(client, Entity::Projects, projects_query(client)).await
}

/// The newest `limit` projects flagged for the home page.
pub async fn fetch_home_projects(client: &BackendClient, limit: usize) -> Result<Vec<Project>, ContentError> {
    let query = projects_query(client).eq("show_on_home", true).limit(limit);
    fetch(client, Entity::Projects, query).await
}

pub async fn fetch_categories(client: &BackendClient) -> Result<Vec<ProjectCategory>, ContentError> {
    let query = client.from(Table::ProjectCategories).order("name", true);
    fetch(client, Entity::Categories, query).await
}

pub async fn fetch_services(client: &BackendClient) -> Result<Vec<Service>, ContentError> {
    let query = client.from(Table::Services).order("created_at", false);
    fetch(client, Entity::Services, query).await
}

pub async fn fetch_reviews(client: &BackendClient) -> Result<Vec<Review>, ContentError> {
    let query = client.from(Table::Reviews).order("created_at", false);
    fetch(client, Entity::Reviews, query).await
}

pub async fn fetch_featured_services(client: &BackendClient) -> Result<Vec<Service>, ContentError> {
    let query = client
        .from(Table::Services)
        .eq("is_featured", true)
        .order("created_at", false);
    fetch(client, Entity::Services, query).await
}

pub async fn fetch_featured_reviews(client: &BackendClient) -> Result<Vec<Review>, ContentError> {
    let query = client
        .from(Table::Reviews)
        .eq("is_featured", true)
        .order("created_at", false);
    fetch(client, Entity::Reviews, query).await
}

/// Keeps every project for `"all"`, otherwise only those whose joined
/// category slug equals `selection`.
pub fn filter_by_category<'a>(projects: &'a [Project], selection: &str) -> Vec<&'a Project> {
    projects
        .iter()
        .filter(|p| selection == ALL_CATEGORIES || p.category_slug() == Some(selection))
        .collect()
}

/// A freshly fetched collection, returned by mutating endpoints.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum EntityList {
    Projects(Vec<Project>),
    Categories(Vec<ProjectCategory>),
    Services(Vec<Service>),
    Reviews(Vec<Review>),
}

impl EntityList {
    pub fn len(&self) -> usize {
        match self {
            EntityList::Projects(rows) => rows.len(),
            EntityList::Categories(rows) => rows.len(),
            EntityList::Services(rows) => rows.len(),
            EntityList::Reviews(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub async fn fetch_list(client: &BackendClient, entity: Entity) -> Result<EntityList, ContentError> {
    Ok(match entity {
        Entity::Projects => EntityList::Projects(fetch_projects(client).await?),
        Entity::Categories => EntityList::Categories(fetch_categories(client).await?),
        Entity::Services => EntityList::Services(fetch_services(client).await?),
        Entity::Reviews => EntityList::Reviews(fetch_reviews(client).await?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use serde_json::json;

    async fn seed_category(client: &BackendClient, name: &str, slug: &str) -> String {
        let rows = client
            .db()
            .insert(Table::ProjectCategories, vec![json!({ "name": name, "slug": slug })])
            .await
            .unwrap();
        rows[0]["id"].as_str().unwrap().to_string()
    }

    async fn seed_project(client: &BackendClient, title: &str, category_id: &str, home: bool) {
        client
            .db()
            .insert(
                Table::Projects,
                vec![json!({ "title": title, "category_id": category_id, "show_on_home": home })],
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_fetch_projects_joins_category_newest_first() {
        let client = BackendClient::in_memory(&AppConfig::default());
        let cat = seed_category(&client, "Graphic Design", "graphic-design").await;
        seed_project(&client, "First", &cat, false).await;
        seed_project(&client, "Second", &cat, false).await;

        let projects = fetch_projects(&client).await.unwrap();
        assert_eq!(projects.len(), 2);
        assert_eq!(projects[0].title, "Second");
        assert_eq!(projects[0].category_slug(), Some("graphic-design"));
    }

    #[tokio::test]
    async fn test_home_projects_are_the_newest_four_flagged() {
        let client = BackendClient::in_memory(&AppConfig::default());
        let cat = seed_category(&client, "Web", "website-development").await;
        seed_project(&client, "hidden", &cat, false).await;
        for i in 1..=5 {
            seed_project(&client, &format!("home-{i}"), &cat, true).await;
        }

        let home = fetch_home_projects(&client, HOME_PROJECT_LIMIT).await.unwrap();
        let titles: Vec<&str> = home.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["home-5", "home-4", "home-3", "home-2"]);
    }

    #[tokio::test]
    async fn test_categories_sorted_by_name() {
        let client = BackendClient::in_memory(&AppConfig::default());
        seed_category(&client, "Video Editing", "video-editing").await;
        seed_category(&client, "Graphic Design", "graphic-design").await;

        let names: Vec<String> = fetch_categories(&client)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["Graphic Design", "Video Editing"]);
    }

    #[tokio::test]
    async fn test_featured_filters() {
        let client = BackendClient::in_memory(&AppConfig::default());
        client
            .db()
            .insert(
                Table::Services,
                vec![
                    json!({ "title": "Logo", "is_featured": true }),
                    json!({ "title": "Video" }),
                ],
            )
            .await
            .unwrap();

        assert_eq!(fetch_services(&client).await.unwrap().len(), 2);
        let featured = fetch_featured_services(&client).await.unwrap();
        assert_eq!(featured.len(), 1);
        assert_eq!(featured[0].title, "Logo");
        assert!(fetch_featured_reviews(&client).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_filter_by_category() {
        let client = BackendClient::in_memory(&AppConfig::default());
        let design = seed_category(&client, "Graphic Design", "graphic-design").await;
        let video = seed_category(&client, "Video Editing", "video-editing").await;
        seed_project(&client, "Logo", &design, false).await;
        seed_project(&client, "Promo", &video, false).await;
        seed_project(&client, "Poster", &design, false).await;

        let projects = fetch_projects(&client).await.unwrap();
        assert_eq!(filter_by_category(&projects, ALL_CATEGORIES).len(), 3);

        let design_only = filter_by_category(&projects, "graphic-design");
        assert_eq!(design_only.len(), 2);
        assert!(design_only.iter().all(|p| p.category_slug() == Some("graphic-design")));

        assert!(filter_by_category(&projects, "photography").is_empty());
    }

    #[tokio::test]
    async fn test_fetch_list_matches_entity() {
        let client = BackendClient::in_memory(&AppConfig::default());
        seed_category(&client, "Other", "other").await;
        let list = fetch_list(&client, Entity::Categories).await.unwrap();
        assert!(matches!(list, EntityList::Categories(ref rows) if rows.len() == 1));
        assert_eq!(list.len(), 1);
    }
}
