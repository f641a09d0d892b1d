/**
 * Public Routes
 * Content for the portfolio pages plus the contact form
 */
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::content::fetch::{
    fetch_categories, fetch_featured_reviews, fetch_featured_services, fetch_home_projects, fetch_projects,
    fetch_reviews, fetch_services, filter_by_category, ALL_CATEGORIES, HOME_PROJECT_LIMIT,
};
use crate::content::ContentError;
use crate::models::{Project, Review, Service};
use crate::routes::{api_error, content_error};
use crate::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HomeResponse {
    pub hero: Value,
    pub about: Value,
    pub contact: Value,
    pub projects: Vec<Project>,
    pub services: Vec<Service>,
    pub reviews: Vec<Review>,
    /// Sections that could not be loaded; the page renders without them.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct ProjectsQuery {
    pub category: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ContactRequest {
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ContactResponse {
    pub success: bool,
    pub title: &'static str,
    pub message: &'static str,
}

// ============================================================================
// Static Sections
// ============================================================================

fn hero_section() -> Value {
    json!({
        "greeting": "Hi, I'm",
        "name": "Umar",
        "headline": "I Design Emotions That Sell.",
        "roles": ["UI/UX", "Branding", "Web Development"]
    })
}

fn about_section() -> Value {
    json!({
        "title": "Crafting Digital",
        "paragraphs": [
            "I'm a creative founder passionate about transforming ideas into compelling digital experiences. With expertise spanning UI/UX design, editing, graphic design, and development, I help businesses create meaningful connections with their audiences.",
            "Every project is an opportunity to solve problems creatively, tell meaningful stories, and build something that not only looks amazing but also drives real results."
        ],
        "services": [
            { "title": "UI/UX Design", "description": "Creating intuitive and beautiful user experiences that convert visitors into customers." },
            { "title": "Video Editing", "description": "Professional video editing, including color grading, motion graphics, and storytelling." },
            { "title": "Graphic Design", "description": "Visual communication through typography, photography, and illustration, including thumbnail design." },
            { "title": "Web Development", "description": "Building fast, responsive websites with modern technologies and best practices." }
        ],
        "stats": [
            { "number": "3+", "label": "Years of Experience" },
            { "number": "50+", "label": "Projects Completed" }
        ]
    })
}

fn contact_section() -> Value {
    json!({
        "title": "Let's Build Something",
        "methods": [
            { "title": "Email Me", "description": "umar@malickumar.com", "action": "mailto:umar@malickumar.com" },
            { "title": "WhatsApp", "description": "Quick response guaranteed", "action": "#" }
        ]
    })
}

/// Empty section plus its error text when a fetch failed.
fn or_empty<T>(result: Result<Vec<T>, ContentError>, errors: &mut Vec<String>) -> Vec<T> {
    result.unwrap_or_else(|e| {
        errors.push(e.to_string());
        Vec::new()
    })
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/home
pub async fn home(State(state): State<AppState>) -> impl IntoResponse {
    let client = &state.client;
    let (projects, services, reviews) = tokio::join!(
        fetch_home_projects(client, HOME_PROJECT_LIMIT),
        fetch_featured_services(client),
        fetch_featured_reviews(client),
    );

    let mut errors = Vec::new();
    let response = HomeResponse {
        hero: hero_section(),
        about: about_section(),
        contact: contact_section(),
        projects: or_empty(projects, &mut errors),
        services: or_empty(services, &mut errors),
        reviews: or_empty(reviews, &mut errors),
        errors,
    };
    Json(response)
}

/// GET /api/projects?category=
pub async fn list_projects(State(state): State<AppState>, Query(query): Query<ProjectsQuery>) -> impl IntoResponse {
    let projects = match fetch_projects(&state.client).await {
        Ok(projects) => projects,
        Err(e) => return content_error(e).into_response(),
    };
    let selection = query.category.as_deref().unwrap_or(ALL_CATEGORIES);
    Json(filter_by_category(&projects, selection)).into_response()
}

pub async fn list_categories(State(state): State<AppState>) -> impl IntoResponse {
    match fetch_categories(&state.client).await {
        Ok(rows) => Json(rows).into_response(),
        Err(e) => content_error(e).into_response(),
    }
}

pub async fn list_services(State(state): State<AppState>) -> impl IntoResponse {
    match fetch_services(&state.client).await {
        Ok(rows) => Json(rows).into_response(),
        Err(e) => content_error(e).into_response(),
    }
}

pub async fn list_reviews(State(state): State<AppState>) -> impl IntoResponse {
    match fetch_reviews(&state.client).await {
        Ok(rows) => Json(rows).into_response(),
        Err(e) => content_error(e).into_response(),
    }
}

/// POST /api/contact
/// Messages are logged, not delivered.
pub async fn contact(Json(payload): Json<ContactRequest>) -> impl IntoResponse {
    let required = [
        ("name", &payload.name),
        ("email", &payload.email),
        ("subject", &payload.subject),
        ("message", &payload.message),
    ];
    let missing: Vec<&str> = required
        .iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| *name)
        .collect();
    if !missing.is_empty() {
        return api_error(
            StatusCode::BAD_REQUEST,
            "Please fill in required fields",
            Some(missing.join(", ")),
        )
        .into_response();
    }

    if !payload.email.contains('@') {
        return api_error(StatusCode::BAD_REQUEST, "Invalid email format", None).into_response();
    }

    tracing::info!(
        name = %payload.name,
        email = %payload.email,
        subject = %payload.subject,
        length = payload.message.len(),
        "contact message received"
    );

    Json(ContactResponse {
        success: true,
        title: "Message Sent! 🚀",
        message: "Thanks for reaching out. I'll get back to you soon!",
    })
    .into_response()
}
