//! Headless admin dashboard: the lists on screen, the create and edit forms,
//! and the queue of notifications produced by each action.
//!
//! A fetch failure keeps the previous list. A mutation failure keeps the form
//! as it was. Successful mutations re-fetch the affected list.

use serde::Serialize;

use crate::backend::BackendClient;
use crate::content::{
    self, fetch_categories, fetch_projects, fetch_reviews, fetch_services, ContentError, Entity,
    Flag, Notification,
};
use crate::form::{CategoryDraft, Draft, ProjectCommand, ProjectDraft, ReviewDraft, ServiceDraft};
use crate::models::{Project, ProjectCategory, Review, Service};
use crate::upload::{self, ImageFile};

/// The in-edit copy of an existing row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Editing<D> {
    pub id: String,
    pub draft: D,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Editor<D> {
    pub show_form: bool,
    pub draft: D,
    pub editing: Option<Editing<D>>,
}

/// Links a draft type to its editor on the dashboard.
pub trait DashboardForm: Draft {
    fn editor(dashboard: &mut Dashboard) -> &mut Editor<Self>;
}

impl DashboardForm for ProjectDraft {
    fn editor(dashboard: &mut Dashboard) -> &mut Editor<Self> {
        &mut dashboard.project_form
    }
}

impl DashboardForm for CategoryDraft {
    fn editor(dashboard: &mut Dashboard) -> &mut Editor<Self> {
        &mut dashboard.category_form
    }
}

impl DashboardForm for ServiceDraft {
    fn editor(dashboard: &mut Dashboard) -> &mut Editor<Self> {
        &mut dashboard.service_form
    }
}

impl DashboardForm for ReviewDraft {
    fn editor(dashboard: &mut Dashboard) -> &mut Editor<Self> {
        &mut dashboard.review_form
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardSnapshot {
    pub projects: Vec<Project>,
    pub categories: Vec<ProjectCategory>,
    pub services: Vec<Service>,
    pub reviews: Vec<Review>,
}

pub struct Dashboard {
    client: BackendClient,
    bucket: String,
    pub loading: bool,
    pub projects: Vec<Project>,
    pub categories: Vec<ProjectCategory>,
    pub services: Vec<Service>,
    pub reviews: Vec<Review>,
    pub project_form: Editor<ProjectDraft>,
    pub category_form: Editor<CategoryDraft>,
    pub service_form: Editor<ServiceDraft>,
    pub review_form: Editor<ReviewDraft>,
    notifications: Vec<Notification>,
}

impl Dashboard {
    pub fn new(client: BackendClient, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
            loading: true,
            projects: Vec::new(),
            categories: Vec::new(),
            services: Vec::new(),
            reviews: Vec::new(),
            project_form: Editor::default(),
            category_form: Editor::default(),
            service_form: Editor::default(),
            review_form: Editor::default(),
            notifications: Vec::new(),
        }
    }

    fn notify(&mut self, notification: Notification) {
        self.notifications.push(notification);
    }

    fn fail(&mut self, error: ContentError) {
        self.notify(error.notification());
    }

    pub fn notifications(&self) -> &[Notification] {
        &self.notifications
    }

    pub fn take_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }

    pub async fn load(&mut self) {
        for entity in [Entity::Projects, Entity::Categories, Entity::Services, Entity::Reviews] {
            self.refresh(entity).await;
        }
        self.loading = false;
    }

    /// Re-fetches one list. On failure the previous list stays.
    pub async fn refresh(&mut self, entity: Entity) {
        let result = match entity {
            Entity::Projects => fetch_projects(&self.client).await.map(|rows| self.projects = rows),
            Entity::Categories => fetch_categories(&self.client)
                .await
                .map(|rows| self.categories = rows),
            Entity::Services => fetch_services(&self.client).await.map(|rows| self.services = rows),
            Entity::Reviews => fetch_reviews(&self.client).await.map(|rows| self.reviews = rows),
        };
        if let Err(e) = result {
            self.fail(e);
        }
    }

    pub fn snapshot(&self) -> DashboardSnapshot {
        DashboardSnapshot {
            projects: self.projects.clone(),
            categories: self.categories.clone(),
            services: self.services.clone(),
            reviews: self.reviews.clone(),
        }
    }

    pub fn open_form<D: DashboardForm>(&mut self) {
        D::editor(self).show_form = true;
    }

    pub fn close_form<D: DashboardForm>(&mut self) {
        D::editor(self).show_form = false;
    }

    pub fn update_draft<D: DashboardForm>(&mut self, change: impl FnOnce(&mut D)) {
        change(&mut D::editor(self).draft);
    }

    /// Applies a command to the new-project draft.
    pub fn dispatch(&mut self, command: ProjectCommand) {
        self.project_form.draft.apply(command);
    }

    /// Applies a command to the project being edited, if any.
    pub fn dispatch_edit(&mut self, command: ProjectCommand) {
        if let Some(editing) = self.project_form.editing.as_mut() {
            editing.draft.apply(command);
        }
    }

    /// Selects a category for the new project by id, looking up its slug.
    pub fn select_category(&mut self, category_id: &str) {
        let slug = self
            .categories
            .iter()
            .find(|c| c.id.to_string() == category_id)
            .map(|c| c.slug.clone());
        self.dispatch(ProjectCommand::SetCategory {
            id: category_id.to_string(),
            slug,
        });
    }

    pub async fn submit_new<D: DashboardForm>(&mut self) -> bool {
        let draft = D::editor(self).draft.clone();
        match content::create(&self.client, &draft).await {
            Ok(_) => {
                self.notify(Notification::added(D::ENTITY));
                let editor = D::editor(self);
                editor.show_form = false;
                editor.draft = D::default();
                self.refresh(D::ENTITY).await;
                true
            }
            Err(e) => {
                self.fail(e);
                false
            }
        }
    }

    pub fn start_edit<D: DashboardForm>(&mut self, id: impl Into<String>, draft: D) {
        D::editor(self).editing = Some(Editing { id: id.into(), draft });
    }

    /// Starts editing a listed project; false if the id is not on screen.
    pub fn edit_project(&mut self, id: &str) -> bool {
        let Some(project) = self.projects.iter().find(|p| p.id.to_string() == id).cloned() else {
            return false;
        };
        let draft = ProjectDraft::default().reduce(ProjectCommand::LoadFrom(Box::new(project)));
        self.start_edit(id, draft);
        true
    }

    pub fn cancel_edit<D: DashboardForm>(&mut self) {
        D::editor(self).editing = None;
    }

    pub async fn submit_edit<D: DashboardForm>(&mut self) -> bool {
        let Some(Editing { id, draft }) = D::editor(self).editing.clone() else {
            return false;
        };
        match content::update(&self.client, &id, &draft).await {
            Ok(_) => {
                self.notify(Notification::updated(D::ENTITY));
                D::editor(self).editing = None;
                self.refresh(D::ENTITY).await;
                true
            }
            Err(e) => {
                self.fail(e);
                false
            }
        }
    }

    /// Deletes immediately; there is no confirmation step.
    pub async fn delete(&mut self, entity: Entity, id: &str) -> bool {
        match content::delete(&self.client, entity, id).await {
            Ok(()) => {
                self.notify(Notification::deleted(entity));
                self.refresh(entity).await;
                true
            }
            Err(e) => {
                self.fail(e);
                false
            }
        }
    }

    pub async fn toggle(&mut self, entity: Entity, id: &str, flag: Flag, value: bool) -> bool {
        match content::set_flag(&self.client, entity, id, flag, value).await {
            Ok(_) => {
                self.refresh(entity).await;
                true
            }
            Err(e) => {
                self.fail(e);
                false
            }
        }
    }

    /// Uploads into the new-project draft's image list. URLs are appended as
    /// each file finishes, so a failure part way keeps the earlier images.
    pub async fn upload_images(&mut self, files: &[ImageFile]) -> bool {
        let draft = &mut self.project_form.draft;
        let result = upload::upload_images(&self.client, &self.bucket, files, |url| {
            draft.apply(ProjectCommand::AddImage(url.to_string()))
        })
        .await;

        match result {
            Ok(urls) => {
                self.notify(Notification::success(format!("{} image(s) uploaded", urls.len())));
                true
            }
            Err(failure) => {
                let description = if failure.uploaded.is_empty() {
                    format!("{}: {}", failure, failure.error)
                } else {
                    format!(
                        "{}: {} ({} earlier image(s) kept)",
                        failure,
                        failure.error,
                        failure.uploaded.len()
                    )
                };
                self.notify(Notification::error(description));
                false
            }
        }
    }

    pub async fn upload_thumbnail(&mut self, file: &ImageFile) -> bool {
        match upload::upload_thumbnail(&self.client, &self.bucket, file).await {
            Ok(image) => {
                self.dispatch(ProjectCommand::SetThumbnail(Some(image.url)));
                true
            }
            Err(e) => {
                self.notify(Notification::error(e.to_string()));
                false
            }
        }
    }

    /// Ends the session; the caller navigates to the returned path.
    pub async fn logout(&mut self, access_token: &str) -> &'static str {
        self.client.auth().sign_out(access_token).await;
        "/"
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use serde_json::Value;

    use super::*;
    use crate::backend::memory::MemoryDatabase;
    use crate::backend::storage::MemoryStorage;
    use crate::backend::{BackendError, Database, Query, Storage, Table};
    use crate::config::AppConfig;
    use crate::content::NotificationLevel;
    use crate::form::ProjectField;

    const PNG: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

    /// Memory database that can be switched into a failing state and counts
    /// the calls it receives.
    #[derive(Default)]
    struct TestDatabase {
        inner: MemoryDatabase,
        failing: AtomicBool,
        calls: AtomicUsize,
    }

    impl TestDatabase {
        fn check(&self) -> Result<(), BackendError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.failing.load(Ordering::SeqCst) {
                Err(BackendError::Storage("connection refused".to_string()))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl Database for TestDatabase {
        async fn select(&self, query: &Query) -> Result<Vec<Value>, BackendError> {
            self.check()?;
            self.inner.select(query).await
        }

        async fn insert(&self, table: Table, rows: Vec<Value>) -> Result<Vec<Value>, BackendError> {
            self.check()?;
            self.inner.insert(table, rows).await
        }

        async fn update(&self, table: Table, id: &str, patch: Value) -> Result<Value, BackendError> {
            self.check()?;
            self.inner.update(table, id, patch).await
        }

        async fn delete(&self, table: Table, id: &str) -> Result<(), BackendError> {
            self.check()?;
            self.inner.delete(table, id).await
        }

        async fn ping(&self) -> Result<Duration, BackendError> {
            self.check()?;
            self.inner.ping().await
        }
    }

    /// Storage whose `fail_on`-th upload fails.
    struct FlakyStorage {
        fail_on: usize,
        attempts: AtomicUsize,
        inner: MemoryStorage,
    }

    #[async_trait]
    impl Storage for FlakyStorage {
        async fn upload(&self, bucket: &str, path: &str, bytes: &[u8], content_type: &str) -> Result<(), BackendError> {
            if self.attempts.fetch_add(1, Ordering::SeqCst) + 1 == self.fail_on {
                return Err(BackendError::Storage("upload interrupted".to_string()));
            }
            self.inner.upload(bucket, path, bytes, content_type).await
        }

        fn public_url(&self, bucket: &str, path: &str) -> String {
            self.inner.public_url(bucket, path)
        }
    }

    fn dashboard_with(fail_upload_on: usize) -> (Dashboard, Arc<TestDatabase>, Arc<FlakyStorage>) {
        let db = Arc::new(TestDatabase::default());
        let storage = Arc::new(FlakyStorage {
            fail_on: fail_upload_on,
            attempts: AtomicUsize::new(0),
            inner: MemoryStorage::new(""),
        });
        let client = BackendClient::new(db.clone(), storage.clone(), &AppConfig::default());
        (Dashboard::new(client, "project-images"), db, storage)
    }

    fn dashboard() -> (Dashboard, Arc<TestDatabase>) {
        let (dashboard, db, _) = dashboard_with(usize::MAX);
        (dashboard, db)
    }

    async fn add_category(dashboard: &mut Dashboard, name: &str, slug: &str) -> String {
        dashboard.open_form::<CategoryDraft>();
        dashboard.update_draft(|d: &mut CategoryDraft| {
            d.name = Some(name.to_string());
            d.slug = Some(slug.to_string());
        });
        assert!(dashboard.submit_new::<CategoryDraft>().await);
        dashboard
            .categories
            .iter()
            .find(|c| c.slug == slug)
            .map(|c| c.id.to_string())
            .unwrap()
    }

    async fn add_project(dashboard: &mut Dashboard, title: &str, category_id: &str, home: bool) {
        dashboard.open_form::<ProjectDraft>();
        dashboard.dispatch(ProjectCommand::SetTitle(title.to_string()));
        dashboard.select_category(category_id);
        dashboard.dispatch(ProjectCommand::SetShowOnHome(home));
        assert!(dashboard.submit_new::<ProjectDraft>().await);
    }

    #[tokio::test]
    async fn test_create_without_required_fields_keeps_form() {
        let (mut dashboard, db) = dashboard();
        dashboard.load().await;
        let calls_after_load = db.calls.load(Ordering::SeqCst);

        dashboard.open_form::<ProjectDraft>();
        dashboard.dispatch(ProjectCommand::SetDescription("no title".to_string()));
        assert!(!dashboard.submit_new::<ProjectDraft>().await);

        assert_eq!(db.calls.load(Ordering::SeqCst), calls_after_load);
        assert!(dashboard.project_form.show_form);
        assert_eq!(dashboard.project_form.draft.description.as_deref(), Some("no title"));
        let notes = dashboard.take_notifications();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].description, "Please fill in required fields");
        assert_eq!(notes[0].level, NotificationLevel::Error);
    }

    #[tokio::test]
    async fn test_successful_create_resets_form_and_refetches() {
        let (mut dashboard, _) = dashboard();
        dashboard.load().await;
        let category_id = add_category(&mut dashboard, "Graphic Design", "graphic-design").await;

        dashboard.open_form::<ProjectDraft>();
        dashboard.dispatch(ProjectCommand::SetTitle("Logo Pack".to_string()));
        dashboard.select_category(&category_id);
        assert_eq!(dashboard.project_form.draft.schema().kind, Some(crate::form::CategoryKind::GraphicDesign));
        dashboard.dispatch(ProjectCommand::SetField(ProjectField::ClientName, "Acme".to_string()));
        assert!(dashboard.submit_new::<ProjectDraft>().await);

        assert!(!dashboard.project_form.show_form);
        assert_eq!(dashboard.project_form.draft, ProjectDraft::default());
        assert_eq!(dashboard.projects.len(), 1);
        let project = &dashboard.projects[0];
        assert_eq!(project.title, "Logo Pack");
        assert_eq!(project.client_name.as_deref(), Some("Acme"));
        assert_eq!(
            project.project_categories.as_ref().map(|c| c.name.as_str()),
            Some("Graphic Design")
        );
        assert!(dashboard
            .notifications()
            .iter()
            .any(|n| n.description == "Project added successfully"));
    }

    #[tokio::test]
    async fn test_fetch_failure_keeps_previous_list() {
        let (mut dashboard, db) = dashboard();
        let category_id = add_category(&mut dashboard, "Web", "website-development").await;
        add_project(&mut dashboard, "Site", &category_id, false).await;
        dashboard.take_notifications();

        db.failing.store(true, Ordering::SeqCst);
        dashboard.refresh(Entity::Projects).await;

        assert_eq!(dashboard.projects.len(), 1);
        let notes = dashboard.take_notifications();
        assert_eq!(notes[0].description, "Failed to fetch projects");
    }

    #[tokio::test]
    async fn test_failed_create_keeps_form_populated() {
        let (mut dashboard, db) = dashboard();
        let category_id = add_category(&mut dashboard, "Web", "website-development").await;

        dashboard.open_form::<ProjectDraft>();
        dashboard.dispatch(ProjectCommand::SetTitle("Site".to_string()));
        dashboard.select_category(&category_id);
        db.failing.store(true, Ordering::SeqCst);

        assert!(!dashboard.submit_new::<ProjectDraft>().await);
        assert!(dashboard.project_form.show_form);
        assert_eq!(dashboard.project_form.draft.title.as_deref(), Some("Site"));
        assert_eq!(
            dashboard.notifications().last().map(|n| n.description.as_str()),
            Some("Failed to add project")
        );
    }

    #[tokio::test]
    async fn test_delete_removes_from_list() {
        let (mut dashboard, _) = dashboard();
        let category_id = add_category(&mut dashboard, "Web", "website-development").await;
        add_project(&mut dashboard, "Keep", &category_id, false).await;
        add_project(&mut dashboard, "Drop", &category_id, false).await;

        let drop_id = dashboard
            .projects
            .iter()
            .find(|p| p.title == "Drop")
            .map(|p| p.id.to_string())
            .unwrap();
        assert!(dashboard.delete(Entity::Projects, &drop_id).await);

        assert_eq!(dashboard.projects.len(), 1);
        assert!(dashboard.projects.iter().all(|p| p.id.to_string() != drop_id));
        assert_eq!(
            dashboard.notifications().last().map(|n| n.description.as_str()),
            Some("Project deleted successfully")
        );
    }

    #[tokio::test]
    async fn test_edit_project_then_submit() {
        let (mut dashboard, _) = dashboard();
        let category_id = add_category(&mut dashboard, "Video Editing", "video-editing").await;
        add_project(&mut dashboard, "Promo", &category_id, false).await;
        let id = dashboard.projects[0].id.to_string();

        assert!(dashboard.edit_project(&id));
        dashboard.dispatch_edit(ProjectCommand::SetField(ProjectField::Duration, "0:45".to_string()));
        dashboard.dispatch_edit(ProjectCommand::SetTitle("Promo cut".to_string()));
        assert!(dashboard.submit_edit::<ProjectDraft>().await);

        assert!(dashboard.project_form.editing.is_none());
        assert_eq!(dashboard.projects[0].title, "Promo cut");
        assert_eq!(dashboard.projects[0].social("duration"), Some("0:45"));
        assert!(!dashboard.edit_project("missing"));
    }

    #[tokio::test]
    async fn test_failed_edit_only_notifies() {
        let (mut dashboard, _) = dashboard();
        dashboard.start_edit(
            "missing-id",
            ServiceDraft {
                title: Some("Branding".to_string()),
                ..ServiceDraft::default()
            },
        );
        assert!(!dashboard.submit_edit::<ServiceDraft>().await);
        assert!(dashboard.service_form.editing.is_some());
        assert_eq!(
            dashboard.notifications().last().map(|n| n.description.as_str()),
            Some("Failed to update service")
        );
    }

    #[tokio::test]
    async fn test_home_toggle_and_limit() {
        let (mut dashboard, _) = dashboard();
        let category_id = add_category(&mut dashboard, "Web", "website-development").await;
        for i in 1..=5 {
            add_project(&mut dashboard, &format!("p{i}"), &category_id, false).await;
        }
        let ids: Vec<String> = dashboard.projects.iter().map(|p| p.id.to_string()).collect();
        for id in &ids {
            assert!(dashboard.toggle(Entity::Projects, id, Flag::ShowOnHome, true).await);
        }

        let home = content::fetch_home_projects(&dashboard.client, content::HOME_PROJECT_LIMIT)
            .await
            .unwrap();
        let titles: Vec<&str> = home.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["p5", "p4", "p3", "p2"]);
    }

    #[tokio::test]
    async fn test_partial_upload_keeps_earlier_images() {
        let (mut dashboard, _, storage) = dashboard_with(3);
        let files: Vec<ImageFile> = (1..=4).map(|i| ImageFile::new(format!("{i}.png"), PNG)).collect();

        assert!(!dashboard.upload_images(&files).await);

        assert_eq!(dashboard.project_form.draft.images.len(), 2);
        assert_eq!(storage.attempts.load(Ordering::SeqCst), 3);
        let note = dashboard.notifications().last().unwrap();
        assert_eq!(note.level, NotificationLevel::Error);
        assert!(note.description.contains("3.png"));
        assert!(note.description.contains("2 earlier image(s) kept"));
    }

    #[tokio::test]
    async fn test_thumbnail_upload_sets_draft() {
        let (mut dashboard, _) = dashboard();
        assert!(dashboard.upload_thumbnail(&ImageFile::new("cover.png", PNG)).await);
        let url = dashboard.project_form.draft.thumbnail_url.clone().unwrap();
        assert!(url.contains("/project-images/thumbnail-"));
    }

    #[tokio::test]
    async fn test_logout_revokes_session() {
        let (mut dashboard, _) = dashboard();
        let auth = dashboard.client.auth();
        auth.sign_up("admin@example.com", "secret123").await.unwrap();
        let session = auth
            .sign_in_with_password("admin@example.com", "secret123")
            .await
            .unwrap();

        assert_eq!(dashboard.logout(&session.access_token).await, "/");
        assert!(dashboard.client.auth().get_user(&session.access_token).await.is_err());
    }
}
