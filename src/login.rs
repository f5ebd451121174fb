#![cfg(not(tarpaulin_include))]

use crate::error::Result;
use crate::storage::{KvStore, read_json, write_json};
#[cfg(feature = "web")]
use crate::storage::JsonFileStore;
use crate::toast::{ToastKind, ToastSink};
use chrono::Utc;
use lazy_static::lazy_static;
use log::{info, warn};
use rand::Rng;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[cfg(feature = "web")]
use crate::toast::{ToastLog, ToastNotice};
#[cfg(feature = "web")]
use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};
#[cfg(feature = "web")]
use axum_extra::extract::cookie::{Cookie, CookieJar};
#[cfg(feature = "web")]
use std::sync::Arc;
#[cfg(feature = "web")]
use tokio::sync::{Mutex, MutexGuard};

// Constants
pub const USER_DATA_KEY: &str = "userData";
pub const LOGIN_PAGE: &str = "/login";
pub const DASHBOARD_PAGE: &str = "/dashboard";

const DEMO_NAME: &str = "Alex Johnson";
const DEMO_EXPERIENCE: &str = "intermediate";
const SPECIAL_CHARACTERS: &str = "!@#$%^&*(),.?\":{}|<>";

lazy_static! {
    static ref EMAIL_RE: Regex = Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap();
    static ref PHONE_RE: Regex = Regex::new(r"^\+?[1-9]\d{0,15}$").unwrap();
}

/// The record kept under `userData` while someone is signed in
///
/// A login writes the demo profile, a registration writes the submitted form.
/// Both shapes share this struct; absent fields are left out of the JSON.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experience: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub newsletter: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remember: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub login_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registration_time: Option<String>,
}

impl UserRecord {
    /// Name shown in the page header
    ///
    /// # Returns
    /// * `String` - "first last" when both are known, otherwise `name`, otherwise the email
    pub fn display_name(&self) -> String {
        match (&self.first_name, &self.last_name) {
            (Some(first), Some(last)) => format!("{} {}", first, last),
            _ => self
                .name
                .clone()
                .unwrap_or_else(|| self.email.clone()),
        }
    }
}

/// Result of the page gate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthCheck {
    Authenticated(UserRecord),
    RedirectToLogin,
}

/// Gate an authenticated page
///
/// Runs before anything on the page renders. An entry that does not decode is
/// removed so the next visit starts clean.
///
/// # Arguments
/// * `store` - The visitor's key-value storage
///
/// # Returns
/// * `Result<AuthCheck>` - The signed-in user or a redirect to the login page
///
/// # Errors
/// * Returns an error if the invalid entry cannot be removed
pub fn check_authentication<S: KvStore + ?Sized>(store: &mut S) -> Result<AuthCheck> {
    match read_json::<S, UserRecord>(&*store, USER_DATA_KEY) {
        Ok(Some(user)) => Ok(AuthCheck::Authenticated(user)),
        Ok(None) => Ok(AuthCheck::RedirectToLogin),
        Err(e) => {
            warn!("clearing unreadable {}: {}", USER_DATA_KEY, e);
            store.remove(USER_DATA_KEY)?;
            Ok(AuthCheck::RedirectToLogin)
        }
    }
}

/// Reverse gate of the login page
///
/// Only the presence of the entry matters here, not its contents.
pub fn redirect_if_logged_in<S: KvStore + ?Sized>(store: &S) -> Option<&'static str> {
    store.get(USER_DATA_KEY).map(|_| DASHBOARD_PAGE)
}

/// A validation failure attached to one form field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// Field name as used by the form, e.g. `confirmPassword`
    pub field: &'static str,
    pub message: &'static str,
}

impl FieldError {
    fn new(field: &'static str, message: &'static str) -> Self {
        Self { field, message }
    }
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// Phone numbers may contain spaces for readability
pub fn is_valid_phone(phone: &str) -> bool {
    let compact: String = phone.chars().filter(|c| !c.is_whitespace()).collect();
    PHONE_RE.is_match(&compact)
}

fn require(field: &'static str, value: &str, errors: &mut Vec<FieldError>) -> bool {
    if value.trim().is_empty() {
        errors.push(FieldError::new(field, "This field is required"));
        false
    } else {
        true
    }
}

fn check_email(value: &str, errors: &mut Vec<FieldError>) {
    if require("email", value, errors) && !is_valid_email(value.trim()) {
        errors.push(FieldError::new("email", "Please enter a valid email address"));
    }
}

/// Sign-in form as submitted by the browser
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub remember: bool,
}

impl LoginForm {
    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        check_email(&self.email, &mut errors);
        require("password", &self.password, &mut errors);
        errors
    }
}

/// Registration form as submitted by the browser
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterForm {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub experience: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub confirm_password: String,
    #[serde(default)]
    pub newsletter: bool,
    #[serde(default)]
    pub terms: bool,
}

impl RegisterForm {
    /// Field-level errors in form order; the terms checkbox is checked separately
    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        require("firstName", &self.first_name, &mut errors);
        require("lastName", &self.last_name, &mut errors);
        check_email(&self.email, &mut errors);
        if require("phone", &self.phone, &mut errors) && !is_valid_phone(self.phone.trim()) {
            errors.push(FieldError::new("phone", "Please enter a valid phone number"));
        }
        require("experience", &self.experience, &mut errors);
        require("password", &self.password, &mut errors);

        if self.confirm_password.trim() != self.password {
            errors.push(FieldError::new("confirmPassword", "Passwords do not match"));
        } else {
            require("confirmPassword", &self.confirm_password, &mut errors);
        }
        errors
    }

    fn into_record(self) -> UserRecord {
        UserRecord {
            email: self.email.trim().to_string(),
            first_name: Some(self.first_name.trim().to_string()),
            last_name: Some(self.last_name.trim().to_string()),
            phone: Some(self.phone.trim().to_string()),
            experience: Some(self.experience),
            newsletter: Some(self.newsletter),
            registration_time: Some(Utc::now().to_rfc3339()),
            ..UserRecord::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StrengthLevel {
    Weak,
    Fair,
    Good,
    Strong,
}

impl StrengthLevel {
    pub fn label(&self) -> &'static str {
        match self {
            StrengthLevel::Weak => "Weak password",
            StrengthLevel::Fair => "Fair password",
            StrengthLevel::Good => "Good password",
            StrengthLevel::Strong => "Strong password",
        }
    }
}

/// Score of a password together with the rules it misses
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PasswordStrength {
    pub level: StrengthLevel,
    pub score: u8,
    pub label: &'static str,
    pub feedback: Vec<&'static str>,
}

/// Rate a password on five rules, one point each
///
/// # Arguments
/// * `password` - The password as typed
///
/// # Returns
/// * `PasswordStrength` - Weak up to 2 points, then fair, good and strong
pub fn password_strength(password: &str) -> PasswordStrength {
    let rules: [(bool, &'static str); 5] = [
        (password.chars().count() >= 8, "At least 8 characters"),
        (
            password.chars().any(|c| c.is_ascii_uppercase()),
            "One uppercase letter",
        ),
        (
            password.chars().any(|c| c.is_ascii_lowercase()),
            "One lowercase letter",
        ),
        (password.chars().any(|c| c.is_ascii_digit()), "One number"),
        (
            password.chars().any(|c| SPECIAL_CHARACTERS.contains(c)),
            "One special character",
        ),
    ];

    let score = rules.iter().filter(|(passed, _)| *passed).count() as u8;
    let feedback = rules
        .iter()
        .filter(|(passed, _)| !passed)
        .map(|(_, rule)| *rule)
        .collect();
    let level = match score {
        0..=2 => StrengthLevel::Weak,
        3 => StrengthLevel::Fair,
        4 => StrengthLevel::Good,
        _ => StrengthLevel::Strong,
    };

    PasswordStrength {
        level,
        score,
        label: level.label(),
        feedback,
    }
}

/// Stand-in for the account backend the site does not have
///
/// Every call waits for its delay and then fails with the configured
/// probability.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulatedRemote {
    failure_rate: f64,
    pub login_delay: Duration,
    pub register_delay: Duration,
}

impl Default for SimulatedRemote {
    fn default() -> Self {
        Self {
            failure_rate: 0.1,
            login_delay: Duration::from_millis(1500),
            register_delay: Duration::from_millis(2000),
        }
    }
}

impl SimulatedRemote {
    /// Build a remote; the rate is clamped to `0.0..=1.0` and NaN falls back to the default
    pub fn new(failure_rate: f64, login_delay: Duration, register_delay: Duration) -> Self {
        let failure_rate = if failure_rate.is_nan() {
            warn!("failure rate is not a number, using the default");
            Self::default().failure_rate
        } else {
            failure_rate.clamp(0.0, 1.0)
        };
        Self {
            failure_rate,
            login_delay,
            register_delay,
        }
    }

    /// A remote that answers at once and never fails
    pub fn instant() -> Self {
        Self::new(0.0, Duration::ZERO, Duration::ZERO)
    }

    pub fn failure_rate(&self) -> f64 {
        self.failure_rate
    }

    /// Wait out `delay`, then report whether the call went through
    async fn call(&self, delay: Duration) -> bool {
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let failed = rand::thread_rng().gen_bool(self.failure_rate);
        if failed {
            warn!("simulated remote call failed");
        }
        !failed
    }
}

/// How a submitted auth form ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    /// Signed in; the browser moves on to the given page
    Success { redirect: String },
    /// Submission blocked before the remote call
    Blocked(Vec<FieldError>),
    /// The remote call failed; nothing was stored
    Failed,
}

/// Pick the page to land on after signing in
///
/// Only same-site absolute paths are honoured.
pub fn landing_page(next: Option<&str>) -> String {
    match next {
        Some(path) if path.starts_with('/') && !path.starts_with("//") => path.to_string(),
        _ => DASHBOARD_PAGE.to_string(),
    }
}

/// A submitted auth form after the remote answered, before anything is stored
///
/// The remote call can take seconds, so it runs without the visitor's
/// storage. [`complete`] then writes the record in one short step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attempt {
    Accepted {
        record: UserRecord,
        redirect: String,
        welcome: &'static str,
    },
    Rejected(AuthOutcome),
}

/// Validate the login form and ask the remote
///
/// # Arguments
/// * `form` - The submitted login form
/// * `next` - Page that sent the visitor to the login page, if any
/// * `remote` - The simulated account backend
/// * `toasts` - Where feedback goes
///
/// # Returns
/// * `Attempt` - The record to store, or why the login stopped
pub async fn attempt_login(
    form: &LoginForm,
    next: Option<&str>,
    remote: &SimulatedRemote,
    toasts: &dyn ToastSink,
) -> Attempt {
    let errors = form.validate();
    if !errors.is_empty() {
        return Attempt::Rejected(AuthOutcome::Blocked(errors));
    }

    if !remote.call(remote.login_delay).await {
        toasts.push_toast("Login failed. Please try again.", ToastKind::Error);
        return Attempt::Rejected(AuthOutcome::Failed);
    }

    Attempt::Accepted {
        record: UserRecord {
            email: form.email.trim().to_string(),
            name: Some(DEMO_NAME.to_string()),
            experience: Some(DEMO_EXPERIENCE.to_string()),
            login_time: Some(Utc::now().to_rfc3339()),
            remember: Some(form.remember),
            ..UserRecord::default()
        },
        redirect: landing_page(next),
        welcome: "Login successful! Redirecting...",
    }
}

/// Validate the registration form and ask the remote
///
/// The terms checkbox is checked after the fields, so the visitor sees both
/// the field errors and the terms toast in one go.
pub async fn attempt_registration(
    form: RegisterForm,
    remote: &SimulatedRemote,
    toasts: &dyn ToastSink,
) -> Attempt {
    let errors = form.validate();
    if !form.terms {
        toasts.push_toast(
            "Please agree to the Terms of Service and Privacy Policy.",
            ToastKind::Error,
        );
        return Attempt::Rejected(AuthOutcome::Blocked(errors));
    }
    if !errors.is_empty() {
        return Attempt::Rejected(AuthOutcome::Blocked(errors));
    }

    if !remote.call(remote.register_delay).await {
        toasts.push_toast("Registration failed. Please try again.", ToastKind::Error);
        return Attempt::Rejected(AuthOutcome::Failed);
    }

    Attempt::Accepted {
        record: form.into_record(),
        redirect: DASHBOARD_PAGE.to_string(),
        welcome: "Registration successful! Welcome to LearnHub!",
    }
}

/// Store an accepted attempt and announce it
///
/// # Errors
/// * Returns an error if the user record cannot be stored
pub fn complete<S: KvStore + ?Sized>(
    attempt: Attempt,
    store: &mut S,
    toasts: &dyn ToastSink,
) -> Result<AuthOutcome> {
    match attempt {
        Attempt::Rejected(outcome) => Ok(outcome),
        Attempt::Accepted {
            record,
            redirect,
            welcome,
        } => {
            write_json(store, USER_DATA_KEY, &record)?;
            info!("{} signed in", record.email);
            toasts.push_toast(welcome, ToastKind::Success);
            Ok(AuthOutcome::Success { redirect })
        }
    }
}

/// Sign in with the login form
///
/// # Arguments
/// * `form` - The submitted login form
/// * `next` - Page that sent the visitor to the login page, if any
/// * `store` - The visitor's key-value storage
/// * `remote` - The simulated account backend
/// * `toasts` - Where feedback goes
///
/// # Returns
/// * `Result<AuthOutcome>` - Success with a redirect, blocked with field errors, or failed
///
/// # Errors
/// * Returns an error if the user record cannot be stored
pub async fn login<S: KvStore + ?Sized>(
    form: &LoginForm,
    next: Option<&str>,
    store: &mut S,
    remote: &SimulatedRemote,
    toasts: &dyn ToastSink,
) -> Result<AuthOutcome> {
    let attempt = attempt_login(form, next, remote, toasts).await;
    complete(attempt, store, toasts)
}

/// Create an account with the registration form
pub async fn register<S: KvStore + ?Sized>(
    form: RegisterForm,
    store: &mut S,
    remote: &SimulatedRemote,
    toasts: &dyn ToastSink,
) -> Result<AuthOutcome> {
    let attempt = attempt_registration(form, remote, toasts).await;
    complete(attempt, store, toasts)
}

/// Sign out and return the page to go to
pub fn logout<S: KvStore + ?Sized>(store: &mut S, toasts: &dyn ToastSink) -> Result<&'static str> {
    store.remove(USER_DATA_KEY)?;
    toasts.push_toast("Logged out successfully!", ToastKind::Success);
    Ok(LOGIN_PAGE)
}

/// Social sign-in is announced but not available
pub fn social_login(provider: &str, toasts: &dyn ToastSink) {
    toasts.push_toast(&format!("{} login coming soon!", provider), ToastKind::Info);
}

// Web handler functions below (only compiled with "web" feature)

/// Key-value storage kept in the visitor's cookies
///
/// Values are URL-encoded so JSON survives the cookie syntax. Hand the jar
/// back with the response so changes reach the browser.
#[cfg(feature = "web")]
#[derive(Debug, Clone, Default)]
pub struct CookieStore {
    jar: CookieJar,
}

#[cfg(feature = "web")]
impl CookieStore {
    pub fn new(jar: CookieJar) -> Self {
        Self { jar }
    }

    pub fn into_jar(self) -> CookieJar {
        self.jar
    }
}

#[cfg(feature = "web")]
impl KvStore for CookieStore {
    fn get(&self, key: &str) -> Option<String> {
        let cookie = self.jar.get(key)?;
        urlencoding::decode(cookie.value())
            .ok()
            .map(|value| value.into_owned())
    }

    fn set(&mut self, key: &str, value: String) -> Result<()> {
        let cookie = Cookie::build((key.to_string(), urlencoding::encode(&value).into_owned()))
            .path("/")
            .http_only(true);
        self.jar = self.jar.clone().add(cookie);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.jar = self
            .jar
            .clone()
            .remove(Cookie::build((key.to_string(), "")).path("/"));
        Ok(())
    }
}

/// What the auth handlers need from the app state
///
/// With a shared file store every visitor sees the same `userData`, like a
/// single browser profile. Without one the entry lives in each visitor's
/// cookies.
#[cfg(feature = "web")]
#[derive(Debug, Clone, Default)]
pub struct AuthState {
    pub remote: SimulatedRemote,
    pub shared: Option<Arc<Mutex<JsonFileStore>>>,
}

#[cfg(feature = "web")]
impl AuthState {
    /// Open the storage of the visitor behind `jar`
    ///
    /// The shared file stays locked until the returned store is dropped.
    pub async fn open(&self, jar: CookieJar) -> VisitorStore<'_> {
        match &self.shared {
            Some(store) => VisitorStore::Shared {
                store: store.lock().await,
                jar,
            },
            None => VisitorStore::Cookies(CookieStore::new(jar)),
        }
    }
}

#[cfg(feature = "web")]
pub enum VisitorStore<'a> {
    Cookies(CookieStore),
    Shared {
        store: MutexGuard<'a, JsonFileStore>,
        jar: CookieJar,
    },
}

#[cfg(feature = "web")]
impl VisitorStore<'_> {
    /// Cookies to send back with the response
    pub fn into_jar(self) -> CookieJar {
        match self {
            VisitorStore::Cookies(store) => store.into_jar(),
            VisitorStore::Shared { jar, .. } => jar,
        }
    }
}

#[cfg(feature = "web")]
impl KvStore for VisitorStore<'_> {
    fn get(&self, key: &str) -> Option<String> {
        match self {
            VisitorStore::Cookies(store) => store.get(key),
            VisitorStore::Shared { store, .. } => store.get(key),
        }
    }

    fn set(&mut self, key: &str, value: String) -> Result<()> {
        match self {
            VisitorStore::Cookies(store) => store.set(key, value),
            VisitorStore::Shared { store, .. } => store.set(key, value),
        }
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        match self {
            VisitorStore::Cookies(store) => store.remove(key),
            VisitorStore::Shared { store, .. } => store.remove(key),
        }
    }
}

/// Reply to an auth form submitted with `fetch`
#[cfg(feature = "web")]
#[derive(Debug, Serialize)]
pub struct AuthReply {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect: Option<String>,
    pub errors: Vec<FieldError>,
    pub toasts: Vec<ToastNotice>,
}

#[cfg(feature = "web")]
impl AuthReply {
    fn new(outcome: AuthOutcome, toasts: ToastLog) -> Self {
        let toasts = toasts.into_notices();
        match outcome {
            AuthOutcome::Success { redirect } => Self {
                ok: true,
                redirect: Some(redirect),
                errors: Vec::new(),
                toasts,
            },
            AuthOutcome::Blocked(errors) => Self {
                ok: false,
                redirect: None,
                errors,
                toasts,
            },
            AuthOutcome::Failed => Self {
                ok: false,
                redirect: None,
                errors: Vec::new(),
                toasts,
            },
        }
    }
}

#[cfg(feature = "web")]
#[derive(Debug, Deserialize)]
pub struct NextQuery {
    pub next: Option<String>,
}

#[cfg(feature = "web")]
#[derive(Debug, Deserialize)]
pub struct SocialLoginRequest {
    pub provider: String,
}

#[cfg(feature = "web")]
#[derive(Debug, Deserialize)]
pub struct StrengthQuery {
    #[serde(default)]
    pub password: String,
}

#[cfg(feature = "web")]
fn internal_error(e: crate::error::AcademyError) -> Response {
    log::error!("auth request failed: {}", e);
    (StatusCode::INTERNAL_SERVER_ERROR, "Authentication error").into_response()
}

/// Serve the login page, or skip it when already signed in
#[cfg(feature = "web")]
pub async fn serve_login_page(State(auth): State<AuthState>, jar: CookieJar) -> Response {
    match redirect_if_logged_in(&auth.open(jar).await) {
        Some(target) => Redirect::to(target).into_response(),
        None => Html(include_str!("./static/login.html")).into_response(),
    }
}

/// Serve the registration page
///
/// Unlike the login page it has no reverse gate.
#[cfg(feature = "web")]
pub async fn serve_register_page() -> Html<&'static str> {
    Html(include_str!("./static/register.html"))
}

/// Handle login form submissions
///
/// # Arguments
/// * `auth` - Simulated backend and storage from the app state
/// * `jar` - Cookie jar that receives `userData` on success
/// * `query` - Optional `next` page to return to
/// * `form` - The submitted form
///
/// # Returns
/// * `Response` - An `AuthReply` with the updated cookies
#[cfg(feature = "web")]
pub async fn handle_login(
    State(auth): State<AuthState>,
    jar: CookieJar,
    Query(query): Query<NextQuery>,
    Json(form): Json<LoginForm>,
) -> Response {
    let toasts = ToastLog::new();
    let attempt = attempt_login(&form, query.next.as_deref(), &auth.remote, &toasts).await;
    let mut store = auth.open(jar).await;
    match complete(attempt, &mut store, &toasts) {
        Ok(outcome) => (store.into_jar(), Json(AuthReply::new(outcome, toasts))).into_response(),
        Err(e) => internal_error(e),
    }
}

/// Handle registration form submissions
#[cfg(feature = "web")]
pub async fn handle_register(
    State(auth): State<AuthState>,
    jar: CookieJar,
    Json(form): Json<RegisterForm>,
) -> Response {
    let toasts = ToastLog::new();
    let attempt = attempt_registration(form, &auth.remote, &toasts).await;
    let mut store = auth.open(jar).await;
    match complete(attempt, &mut store, &toasts) {
        Ok(outcome) => (store.into_jar(), Json(AuthReply::new(outcome, toasts))).into_response(),
        Err(e) => internal_error(e),
    }
}

/// Handle user logout
///
/// Clears `userData` and tells the browser where to go.
#[cfg(feature = "web")]
pub async fn handle_logout(State(auth): State<AuthState>, jar: CookieJar) -> Response {
    let mut store = auth.open(jar).await;
    let toasts = ToastLog::new();
    match logout(&mut store, &toasts) {
        Ok(target) => {
            info!("signed out");
            let outcome = AuthOutcome::Success {
                redirect: target.to_string(),
            };
            (store.into_jar(), Json(AuthReply::new(outcome, toasts))).into_response()
        }
        Err(e) => internal_error(e),
    }
}

/// Social sign-in buttons only answer with a toast
#[cfg(feature = "web")]
pub async fn handle_social_login(Json(request): Json<SocialLoginRequest>) -> Json<AuthReply> {
    let toasts = ToastLog::new();
    social_login(&request.provider, &toasts);
    Json(AuthReply::new(AuthOutcome::Failed, toasts))
}

/// Live password strength for the registration form
#[cfg(feature = "web")]
pub async fn handle_password_strength(
    Query(query): Query<StrengthQuery>,
) -> Json<PasswordStrength> {
    Json(password_strength(&query.password))
}

/// Authentication middleware
///
/// Lets the request through with the `UserRecord` in its extensions, or
/// redirects to the login page and remembers where the visitor was going.
///
/// # Arguments
/// * `auth` - Storage settings from the app state
/// * `jar` - Cookie jar holding `userData`
/// * `request` - The incoming request
/// * `next` - Next middleware in the chain
///
/// # Returns
/// * `Response` - Either the page or a redirect to `/login?next=...`
#[cfg(feature = "web")]
pub async fn require_auth(
    State(auth): State<AuthState>,
    jar: CookieJar,
    mut request: axum::extract::Request,
    next: axum::middleware::Next,
) -> Response {
    let mut store = auth.open(jar).await;
    match check_authentication(&mut store) {
        Ok(AuthCheck::Authenticated(user)) => {
            drop(store);
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Ok(AuthCheck::RedirectToLogin) => {
            let target = format!(
                "{}?next={}",
                LOGIN_PAGE,
                urlencoding::encode(request.uri().path())
            );
            (store.into_jar(), Redirect::to(&target)).into_response()
        }
        Err(e) => internal_error(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use crate::toast::tests::RecordingSink;

    fn valid_registration() -> RegisterForm {
        RegisterForm {
            first_name: "Maya".to_string(),
            last_name: "Okafor".to_string(),
            email: "maya@example.com".to_string(),
            phone: "+44 7700 900123".to_string(),
            experience: "beginner".to_string(),
            password: "Hive#2024".to_string(),
            confirm_password: "Hive#2024".to_string(),
            newsletter: true,
            terms: true,
        }
    }

    fn fields(errors: &[FieldError]) -> Vec<&'static str> {
        errors.iter().map(|e| e.field).collect()
    }

    #[test]
    fn test_gate_without_user_data() {
        let mut store = MemoryStore::new();
        assert_eq!(
            check_authentication(&mut store).unwrap(),
            AuthCheck::RedirectToLogin
        );
    }

    #[test]
    fn test_gate_clears_garbage() {
        let mut store = MemoryStore::new();
        store.set(USER_DATA_KEY, "{not json".to_string()).unwrap();
        assert_eq!(
            check_authentication(&mut store).unwrap(),
            AuthCheck::RedirectToLogin
        );
        assert!(store.get(USER_DATA_KEY).is_none());
    }

    #[test]
    fn test_gate_accepts_stored_record() {
        let mut store = MemoryStore::new();
        store
            .set(
                USER_DATA_KEY,
                r#"{"email":"a@b.co","name":"Alex Johnson","loginTime":"2024-01-01T00:00:00Z"}"#
                    .to_string(),
            )
            .unwrap();
        let AuthCheck::Authenticated(user) = check_authentication(&mut store).unwrap() else {
            panic!("expected a signed-in user");
        };
        assert_eq!(user.display_name(), "Alex Johnson");
        assert_eq!(redirect_if_logged_in(&store), Some(DASHBOARD_PAGE));
    }

    #[test]
    fn test_display_name_prefers_full_name() {
        let user = UserRecord {
            email: "maya@example.com".to_string(),
            first_name: Some("Maya".to_string()),
            last_name: Some("Okafor".to_string()),
            name: Some("ignored".to_string()),
            ..UserRecord::default()
        };
        assert_eq!(user.display_name(), "Maya Okafor");
    }

    #[test]
    fn test_email_and_phone_rules() {
        assert!(is_valid_email("bee@hive.org"));
        assert!(!is_valid_email("bee@hive"));
        assert!(!is_valid_email("bee hive@x.org"));
        assert!(is_valid_phone("+1 555 0100"));
        assert!(is_valid_phone("447700900123"));
        assert!(!is_valid_phone("0123"));
        assert!(!is_valid_phone("+12345678901234567"));
    }

    #[test]
    fn test_login_form_errors() {
        let form = LoginForm {
            email: "not-an-email".to_string(),
            password: "  ".to_string(),
            remember: false,
        };
        let errors = form.validate();
        assert_eq!(fields(&errors), vec!["email", "password"]);
        assert_eq!(errors[0].message, "Please enter a valid email address");
        assert_eq!(errors[1].message, "This field is required");
    }

    #[test]
    fn test_register_form_errors() {
        assert!(valid_registration().validate().is_empty());

        let mut form = valid_registration();
        form.confirm_password = "something else".to_string();
        form.phone = "abc".to_string();
        let errors = form.validate();
        assert_eq!(fields(&errors), vec!["phone", "confirmPassword"]);
        assert_eq!(errors[1].message, "Passwords do not match");
    }

    #[test]
    fn test_password_strength_boundaries() {
        assert_eq!(password_strength("").level, StrengthLevel::Weak);
        assert_eq!(password_strength("abcdefgh").score, 2);
        assert_eq!(password_strength("abcdefgh").level, StrengthLevel::Weak);
        assert_eq!(password_strength("Abcdefgh").level, StrengthLevel::Fair);
        assert_eq!(password_strength("Abcdefg1").level, StrengthLevel::Good);

        let strong = password_strength("Abcdef1!");
        assert_eq!(strong.level, StrengthLevel::Strong);
        assert_eq!(strong.score, 5);
        assert!(strong.feedback.is_empty());
        assert_eq!(strong.label, "Strong password");

        let short = password_strength("A1!");
        assert_eq!(short.feedback, vec!["At least 8 characters", "One lowercase letter"]);
    }

    #[tokio::test]
    async fn test_login_writes_demo_profile() {
        let mut store = MemoryStore::new();
        let sink = RecordingSink::default();
        let form = LoginForm {
            email: "alex@example.com".to_string(),
            password: "secret".to_string(),
            remember: true,
        };

        let outcome = login(&form, None, &mut store, &SimulatedRemote::instant(), &sink)
            .await
            .unwrap();
        assert_eq!(
            outcome,
            AuthOutcome::Success {
                redirect: DASHBOARD_PAGE.to_string()
            }
        );

        let AuthCheck::Authenticated(user) = check_authentication(&mut store).unwrap() else {
            panic!("expected a signed-in user");
        };
        assert_eq!(user.name.as_deref(), Some("Alex Johnson"));
        assert_eq!(user.experience.as_deref(), Some("intermediate"));
        assert_eq!(user.remember, Some(true));
        assert!(user.login_time.is_some());
        assert_eq!(
            sink.messages(),
            vec![(
                "Login successful! Redirecting...".to_string(),
                ToastKind::Success
            )]
        );
    }

    #[tokio::test]
    async fn test_login_returns_to_requested_page() {
        let mut store = MemoryStore::new();
        let sink = RecordingSink::default();
        let form = LoginForm {
            email: "alex@example.com".to_string(),
            password: "secret".to_string(),
            remember: false,
        };
        let outcome = login(
            &form,
            Some("/analytics"),
            &mut store,
            &SimulatedRemote::instant(),
            &sink,
        )
        .await
        .unwrap();
        assert_eq!(
            outcome,
            AuthOutcome::Success {
                redirect: "/analytics".to_string()
            }
        );
        assert_eq!(landing_page(Some("//evil.example")), DASHBOARD_PAGE);
        assert_eq!(landing_page(Some("https://evil.example")), DASHBOARD_PAGE);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_remote_stores_nothing() {
        let mut store = MemoryStore::new();
        let sink = RecordingSink::default();
        let remote = SimulatedRemote::new(1.0, Duration::from_millis(1500), Duration::ZERO);
        let form = LoginForm {
            email: "alex@example.com".to_string(),
            password: "secret".to_string(),
            remember: false,
        };

        let outcome = login(&form, None, &mut store, &remote, &sink).await.unwrap();
        assert_eq!(outcome, AuthOutcome::Failed);
        assert!(store.get(USER_DATA_KEY).is_none());
        assert_eq!(
            sink.messages(),
            vec![(
                "Login failed. Please try again.".to_string(),
                ToastKind::Error
            )]
        );
    }

    #[tokio::test]
    async fn test_invalid_login_never_calls_remote() {
        let mut store = MemoryStore::new();
        let sink = RecordingSink::default();
        let remote = SimulatedRemote::new(1.0, Duration::ZERO, Duration::ZERO);
        let outcome = login(&LoginForm::default(), None, &mut store, &remote, &sink)
            .await
            .unwrap();
        assert!(matches!(outcome, AuthOutcome::Blocked(ref errors) if errors.len() == 2));
        assert!(sink.messages().is_empty());
    }

    #[tokio::test]
    async fn test_register_requires_terms() {
        let mut store = MemoryStore::new();
        let sink = RecordingSink::default();
        let mut form = valid_registration();
        form.terms = false;

        let outcome = register(form, &mut store, &SimulatedRemote::instant(), &sink)
            .await
            .unwrap();
        assert_eq!(outcome, AuthOutcome::Blocked(Vec::new()));
        assert!(store.get(USER_DATA_KEY).is_none());
        assert_eq!(
            sink.messages(),
            vec![(
                "Please agree to the Terms of Service and Privacy Policy.".to_string(),
                ToastKind::Error
            )]
        );
    }

    #[tokio::test]
    async fn test_register_stores_form() {
        let mut store = MemoryStore::new();
        let sink = RecordingSink::default();
        let outcome = register(
            valid_registration(),
            &mut store,
            &SimulatedRemote::instant(),
            &sink,
        )
        .await
        .unwrap();
        assert!(matches!(outcome, AuthOutcome::Success { .. }));

        let user: UserRecord = read_json(&store, USER_DATA_KEY).unwrap().unwrap();
        assert_eq!(user.display_name(), "Maya Okafor");
        assert_eq!(user.newsletter, Some(true));
        assert!(user.registration_time.is_some());
        assert!(user.login_time.is_none());

        let json: serde_json::Value =
            serde_json::from_str(&store.get(USER_DATA_KEY).unwrap()).unwrap();
        assert_eq!(json["firstName"], "Maya");
        assert!(json.get("loginTime").is_none());
    }

    #[test]
    fn test_logout_and_social_login() {
        let mut store = MemoryStore::new();
        store.set(USER_DATA_KEY, "{}".to_string()).unwrap();
        let sink = RecordingSink::default();

        assert_eq!(logout(&mut store, &sink).unwrap(), LOGIN_PAGE);
        assert!(store.get(USER_DATA_KEY).is_none());

        social_login("Google", &sink);
        assert_eq!(
            sink.messages(),
            vec![
                ("Logged out successfully!".to_string(), ToastKind::Success),
                ("Google login coming soon!".to_string(), ToastKind::Info),
            ]
        );
    }

    #[cfg(feature = "web")]
    #[test]
    fn test_cookie_store_encodes_json() {
        let mut store = CookieStore::default();
        store
            .set(USER_DATA_KEY, r#"{"email":"a@b.co"}"#.to_string())
            .unwrap();
        assert_eq!(store.get(USER_DATA_KEY).as_deref(), Some(r#"{"email":"a@b.co"}"#));

        let jar = store.into_jar();
        let raw = jar.get(USER_DATA_KEY).unwrap().value().to_string();
        assert!(!raw.contains('"'));

        let mut store = CookieStore::new(jar);
        store.remove(USER_DATA_KEY).unwrap();
        assert!(store.get(USER_DATA_KEY).is_none());
    }
    #[test]
    fn test_failure_rate_is_kept_in_range() {
        let nan = SimulatedRemote::new(f64::NAN, Duration::ZERO, Duration::ZERO);
        assert_eq!(nan.failure_rate(), SimulatedRemote::default().failure_rate());
        let high = SimulatedRemote::new(f64::INFINITY, Duration::ZERO, Duration::ZERO);
        assert_eq!(high.failure_rate(), 1.0);
        let low = SimulatedRemote::new(-0.5, Duration::ZERO, Duration::ZERO);
        assert_eq!(low.failure_rate(), 0.0);
    }

    #[tokio::test]
    async fn test_nan_failure_rate_still_answers() {
        let mut store = MemoryStore::new();
        let sink = RecordingSink::default();
        let remote = SimulatedRemote::new(f64::NAN, Duration::ZERO, Duration::ZERO);
        let form = LoginForm {
            email: "alex@example.com".to_string(),
            password: "secret".to_string(),
            remember: false,
        };
        let outcome = login(&form, None, &mut store, &remote, &sink).await.unwrap();
        assert!(matches!(outcome, AuthOutcome::Success { .. } | AuthOutcome::Failed));
    }

    #[tokio::test]
    async fn test_rejected_attempt_leaves_store_alone() {
        let mut store = MemoryStore::new();
        let sink = RecordingSink::default();
        let attempt =
            attempt_login(&LoginForm::default(), None, &SimulatedRemote::instant(), &sink).await;
        assert!(matches!(attempt, Attempt::Rejected(AuthOutcome::Blocked(_))));

        let outcome = complete(attempt, &mut store, &sink).unwrap();
        assert!(matches!(outcome, AuthOutcome::Blocked(_)));
        assert!(store.get(USER_DATA_KEY).is_none());
        assert!(sink.messages().is_empty());
    }

    #[cfg(feature = "web")]
    fn shared_auth(dir: &tempfile::TempDir) -> AuthState {
        let store = JsonFileStore::open(dir.path().join("profile.json")).unwrap();
        AuthState {
            remote: SimulatedRemote::new(
                0.0,
                Duration::from_millis(1500),
                Duration::from_millis(2000),
            ),
            shared: Some(Arc::new(Mutex::new(store))),
        }
    }

    #[cfg(feature = "web")]
    fn sign_in_form(email: &str) -> Json<LoginForm> {
        Json(LoginForm {
            email: email.to_string(),
            password: "secret".to_string(),
            remember: false,
        })
    }

    #[cfg(feature = "web")]
    #[tokio::test(start_paused = true)]
    async fn test_shared_store_logins_run_side_by_side() {
        let dir = tempfile::tempdir().unwrap();
        let auth = shared_auth(&dir);
        let started = tokio::time::Instant::now();

        let (first, second) = tokio::join!(
            handle_login(
                State(auth.clone()),
                CookieJar::new(),
                Query(NextQuery { next: None }),
                sign_in_form("alex@example.com"),
            ),
            handle_login(
                State(auth.clone()),
                CookieJar::new(),
                Query(NextQuery { next: None }),
                sign_in_form("sam@example.com"),
            ),
        );

        assert_eq!(first.status(), StatusCode::OK);
        assert_eq!(second.status(), StatusCode::OK);
        assert!(started.elapsed() < Duration::from_millis(2000));

        let store = auth.open(CookieJar::new()).await;
        let user: UserRecord = read_json(&store, USER_DATA_KEY).unwrap().unwrap();
        assert!(user.email == "alex@example.com" || user.email == "sam@example.com");
    }

    #[cfg(feature = "web")]
    #[tokio::test(start_paused = true)]
    async fn test_gate_is_not_blocked_by_login_in_flight() {
        let dir = tempfile::tempdir().unwrap();
        let auth = shared_auth(&dir);

        let pending = tokio::spawn(handle_login(
            State(auth.clone()),
            CookieJar::new(),
            Query(NextQuery { next: None }),
            sign_in_form("alex@example.com"),
        ));
        tokio::time::sleep(Duration::from_millis(10)).await;

        let started = tokio::time::Instant::now();
        let mut store = auth.open(CookieJar::new()).await;
        assert_eq!(
            check_authentication(&mut store).unwrap(),
            AuthCheck::RedirectToLogin
        );
        assert!(started.elapsed() < Duration::from_millis(100));
        drop(store);

        let response = pending.await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let mut store = auth.open(CookieJar::new()).await;
        assert!(matches!(
            check_authentication(&mut store).unwrap(),
            AuthCheck::Authenticated(_)
        ));
    }
}
