#![cfg(not(tarpaulin_include))]

use crate::app::AppState;
use crate::auth::{Role, UserRecord};
use axum::{
    Form,
    extract::State,
    response::{Html, IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, SystemTime};
use uuid::Uuid;

/// Authenticated session context
///
/// Carries the logged-in record and its role for the lifetime of the
/// session; destroyed on logout.
#[derive(Debug, Clone)]
pub struct Session {
    /// Username of the authenticated account
    pub username: String,

    /// Display name shown in the dashboard header
    pub full_name: String,

    /// Email shown in the dashboard header
    pub email: String,

    /// Role the session was opened under; gates the two dashboards
    pub role: Role,

    /// Time when the session expires
    pub expires_at: SystemTime,
}

/// Global sessions storage
///
/// Stores all active sessions in a thread-safe map keyed by cookie value.
lazy_static! {
    static ref SESSIONS: RwLock<HashMap<String, Session>> = RwLock::new(HashMap::new());
    static ref EMAIL_RE: Regex =
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").unwrap();
}

const SESSION_DURATION: u64 = 24 * 60 * 60; // 24 hours in seconds

/// Login form data
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
    pub role: String,
}

/// Registration form data
#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub password: String,
    pub confirm_password: String,
    pub role: String,
}

/// Validate email format
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// Create a new session for an authenticated record
///
/// # Returns
/// * `String` - A unique session ID to be set as the cookie value
pub fn create_session(record: &UserRecord, role: Role) -> String {
    let session_id = Uuid::new_v4().to_string();

    let session = Session {
        username: record.username.clone(),
        full_name: record.full_name.clone(),
        email: record.email.clone(),
        role,
        expires_at: SystemTime::now() + Duration::from_secs(SESSION_DURATION),
    };

    let mut sessions = SESSIONS.write().unwrap();
    sessions.insert(session_id.clone(), session);

    session_id
}

/// Validate a session ID, returning its context if valid and not expired
pub fn validate_session(session_id: &str) -> Option<Session> {
    let sessions = SESSIONS.read().unwrap();

    if let Some(session) = sessions.get(session_id) {
        if session.expires_at > SystemTime::now() {
            return Some(session.clone());
        }
    }

    None
}

/// Remove a session from the store
pub fn destroy_session(session_id: &str) {
    let mut sessions = SESSIONS.write().unwrap();
    sessions.remove(session_id);
}

/// Look up the session for the current request's cookie, if any
pub fn current_session(jar: &CookieJar) -> Option<Session> {
    jar.get("session")
        .and_then(|cookie| validate_session(cookie.value()))
}

/// Serve the login/register page HTML
pub async fn serve_login_page() -> Html<&'static str> {
    Html(include_str!("./static/login.html"))
}

/// Handle login requests
///
/// Validates the credential pair against the selected role collection and
/// opens a session on success. The failure message deliberately does not
/// distinguish an unknown username from a wrong password.
pub async fn handle_login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Response {
    let Some(role) = Role::parse(&form.role) else {
        return Redirect::to("/login?error=Unknown+role").into_response();
    };

    if form.username.is_empty() || form.password.is_empty() {
        return redirect_with_error("/login", "Please fill in all fields", role).into_response();
    }

    match state.store.authenticate(&form.username, &form.password, role) {
        Ok(Some(record)) => {
            let session_id = create_session(&record, role);
            let cookie = Cookie::new("session", session_id);
            let target = match role {
                Role::Admin => "/admin",
                Role::User => "/dashboard",
            };
            log::info!("login: {} ({})", record.username, role.as_str());
            (jar.add(cookie), Redirect::to(target)).into_response()
        }
        Ok(None) => {
            log::warn!("failed login attempt for '{}'", form.username);
            redirect_with_error("/login", "Invalid username or password", role).into_response()
        }
        Err(e) => redirect_with_error("/login", &e, role).into_response(),
    }
}

/// Handle registration requests
///
/// Runs the form-level validations, then registers into the selected role
/// collection. Duplicate username and duplicate email keep their distinct
/// messages from the store.
pub async fn handle_register(
    State(state): State<Arc<AppState>>,
    Form(form): Form<RegisterForm>,
) -> Response {
    let Some(role) = Role::parse(&form.role) else {
        return Redirect::to("/login?error=Unknown+role").into_response();
    };

    let all_filled = !form.username.is_empty()
        && !form.email.is_empty()
        && !form.full_name.is_empty()
        && !form.password.is_empty()
        && !form.confirm_password.is_empty();

    let error = if !all_filled {
        Some("Please fill in all fields".to_string())
    } else if form.password != form.confirm_password {
        Some("Passwords do not match".to_string())
    } else if form.password.len() < 6 {
        Some("Password must be at least 6 characters long".to_string())
    } else if !is_valid_email(&form.email) {
        Some("Please enter a valid email address".to_string())
    } else if form.username.len() < 3 {
        Some("Username must be at least 3 characters long".to_string())
    } else {
        None
    };

    if let Some(message) = error {
        return redirect_with_error("/login", &message, role).into_response();
    }

    match state.store.register(
        &form.username,
        &form.password,
        &form.email,
        &form.full_name,
        role,
    ) {
        Ok(()) => {
            log::info!("registered {} ({})", form.username, role.as_str());
            Redirect::to(&format!(
                "/login?success=Registration+successful&role={}",
                role.as_str()
            ))
            .into_response()
        }
        Err(e) => redirect_with_error("/login", &e, role).into_response(),
    }
}

/// Handle logout
///
/// Destroys the server-side session, clears the cookie and redirects to
/// the login page.
pub async fn handle_logout(jar: CookieJar) -> (CookieJar, Redirect) {
    if let Some(cookie) = jar.get("session") {
        destroy_session(cookie.value());
    }

    let cookie = Cookie::new("session", "");
    (jar.add(cookie), Redirect::to("/login"))
}

// Redirect back to a page with an urlencoded error message
fn redirect_with_error(page: &str, message: &str, role: Role) -> Redirect {
    Redirect::to(&format!(
        "{}?error={}&role={}",
        page,
        urlencoding::encode(message),
        role.as_str()
    ))
}
