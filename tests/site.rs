use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use axum::response::Response;
use learnhub::app::{self, AppState, SESSION_HEADER};
use learnhub::config::ServerConfig;
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

fn quick_config() -> ServerConfig {
    ServerConfig {
        failure_rate: 0.0,
        auth_delay_ms: Some(0),
        ..ServerConfig::default()
    }
}

fn site(config: ServerConfig) -> Router {
    app::router(Arc::new(AppState::new(config).unwrap()))
}

async fn send(router: &Router, request: Request<Body>) -> Response {
    router.clone().oneshot(request).await.unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn get_with_cookie(uri: &str, cookie: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::COOKIE, cookie)
        .body(Body::empty())
        .unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn action(session: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/action")
        .header(header::CONTENT_TYPE, "application/json")
        .header(SESSION_HEADER, session)
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn json_body(response: Response) -> Value {
    serde_json::from_str(&text(response).await).unwrap()
}

fn location(response: &Response) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
}

/// `name=value` of the first Set-Cookie header for `name`
fn cookie_pair(response: &Response, name: &str) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter_map(|value| value.split(';').next())
        .find(|pair| pair.starts_with(&format!("{}=", name)))
        .map(str::to_string)
}

fn session_of(html: &str) -> String {
    let start = html.find("data-session=\"").unwrap() + "data-session=\"".len();
    let end = start + html[start..].find('"').unwrap();
    html[start..end].to_string()
}

async fn sign_in(router: &Router) -> String {
    let response = send(
        router,
        post_json("/login", json!({ "email": "alex@example.com", "password": "secret" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = cookie_pair(&response, "userData").unwrap();
    let reply = json_body(response).await;
    assert_eq!(reply["ok"], true);
    cookie
}

#[tokio::test]
async fn test_private_pages_redirect_to_login() {
    let router = site(quick_config());
    for page in ["/dashboard", "/analytics", "/community"] {
        let response = send(&router, get(page)).await;
        assert!(response.status().is_redirection());
        assert_eq!(
            location(&response),
            format!("/login?next={}", urlencoding::encode(page))
        );
    }
}

#[tokio::test]
async fn test_root_lands_on_public_catalog() {
    let router = site(quick_config());
    let response = send(&router, get("/")).await;
    assert_eq!(location(&response), "/catalog");

    let response = send(&router, get("/catalog")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = text(response).await;
    assert!(html.contains("Beekeeping Fundamentals"));
    assert!(html.contains("Sign in"));
}

#[tokio::test]
async fn test_login_then_dashboard() {
    let router = site(quick_config());
    let cookie = sign_in(&router).await;

    let response = send(&router, get_with_cookie("/dashboard", &cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = text(response).await;
    assert!(html.contains("Alex Johnson"));

    // Signed-in visitors skip the login page
    let response = send(&router, get_with_cookie("/login", &cookie)).await;
    assert_eq!(location(&response), "/dashboard");
}

#[tokio::test]
async fn test_register_page_is_served_when_signed_in() {
    let router = site(quick_config());
    let cookie = sign_in(&router).await;

    let response = send(&router, get_with_cookie("/register", &cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get(header::LOCATION).is_none());
    assert!(text(response).await.contains("registerForm"));
}

#[tokio::test]
async fn test_login_honours_next() {
    let router = site(quick_config());
    let response = send(
        &router,
        post_json(
            "/login?next=%2Fanalytics",
            json!({ "email": "alex@example.com", "password": "secret" }),
        ),
    )
    .await;
    let reply = json_body(response).await;
    assert_eq!(reply["redirect"], "/analytics");
}

#[tokio::test]
async fn test_invalid_login_is_blocked() {
    let router = site(quick_config());
    let response = send(
        &router,
        post_json("/login", json!({ "email": "not-an-email", "password": "" })),
    )
    .await;
    assert!(cookie_pair(&response, "userData").is_none());
    let reply = json_body(response).await;
    assert_eq!(reply["ok"], false);
    let fields: Vec<&str> = reply["errors"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|error| error["field"].as_str())
        .collect();
    assert_eq!(fields, vec!["email", "password"]);
}

#[tokio::test]
async fn test_failed_remote_shows_toast() {
    let router = site(ServerConfig {
        failure_rate: 1.0,
        ..quick_config()
    });
    let response = send(
        &router,
        post_json("/login", json!({ "email": "alex@example.com", "password": "secret" })),
    )
    .await;
    assert!(cookie_pair(&response, "userData").is_none());
    let reply = json_body(response).await;
    assert_eq!(reply["ok"], false);
    assert_eq!(reply["toasts"][0]["message"], "Login failed. Please try again.");
    assert_eq!(reply["toasts"][0]["kind"], "error");
}

#[tokio::test]
async fn test_unreadable_user_data_is_cleared() {
    let router = site(quick_config());
    let response = send(&router, get_with_cookie("/dashboard", "userData=not%20json")).await;
    assert!(response.status().is_redirection());
    assert_eq!(location(&response), "/login?next=%2Fdashboard");
    assert_eq!(cookie_pair(&response, "userData").as_deref(), Some("userData="));
}

#[tokio::test]
async fn test_logout_clears_user_data() {
    let router = site(quick_config());
    let cookie = sign_in(&router).await;
    let response = send(
        &router,
        Request::builder()
            .method("POST")
            .uri("/logout")
            .header(header::COOKIE, &cookie)
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(cookie_pair(&response, "userData").as_deref(), Some("userData="));
    let reply = json_body(response).await;
    assert_eq!(reply["redirect"], "/login");
}

#[tokio::test]
async fn test_registration_needs_terms() {
    let router = site(quick_config());
    let form = json!({
        "firstName": "Maya",
        "lastName": "Okafor",
        "email": "maya@example.com",
        "phone": "+447700900123",
        "experience": "beginner",
        "password": "Hive#2024",
        "confirmPassword": "Hive#2024",
        "terms": false,
    });
    let response = send(&router, post_json("/register", form.clone())).await;
    let reply = json_body(response).await;
    assert_eq!(reply["ok"], false);
    assert_eq!(
        reply["toasts"][0]["message"],
        "Please agree to the Terms of Service and Privacy Policy."
    );

    let mut accepted = form;
    accepted["terms"] = json!(true);
    let response = send(&router, post_json("/register", accepted)).await;
    let cookie = cookie_pair(&response, "userData").unwrap();
    let reply = json_body(response).await;
    assert_eq!(reply["redirect"], "/dashboard");

    let response = send(&router, get_with_cookie("/dashboard", &cookie)).await;
    assert!(text(response).await.contains("Maya Okafor"));
}

#[tokio::test]
async fn test_page_actions_round_trip() {
    let router = site(quick_config());
    let html = text(send(&router, get("/catalog")).await).await;
    let session = session_of(&html);

    let response = send(
        &router,
        action(&session, json!({ "type": "toggle", "menu": "notifications" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let snapshot = json_body(response).await;
    assert_eq!(snapshot["notifications"]["open"], true);
    assert_eq!(snapshot["notifications"]["badge"], "3");

    // Opening messages closes notifications
    let snapshot = json_body(
        send(
            &router,
            action(&session, json!({ "type": "toggle", "menu": "messages" })),
        )
        .await,
    )
    .await;
    assert_eq!(snapshot["notifications"]["open"], false);
    assert_eq!(snapshot["messages"]["open"], true);

    let snapshot = json_body(
        send(
            &router,
            action(
                &session,
                json!({ "type": "inbox", "inbox": "notifications", "action": { "type": "mark-all-read" } }),
            ),
        )
        .await,
    )
    .await;
    assert_eq!(snapshot["notifications"]["badge"], Value::Null);

    let snapshot = json_body(
        send(
            &router,
            action(&session, json!({ "type": "add-to-cart", "title": "Queen Rearing Masterclass" })),
        )
        .await,
    )
    .await;
    let messages: Vec<&str> = snapshot["toasts"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|toast| toast["message"].as_str())
        .collect();
    assert_eq!(
        messages,
        vec![
            "All notifications marked as read",
            "\"Queen Rearing Masterclass\" added to cart!"
        ]
    );

    let snapshot = Request::builder()
        .uri("/api/snapshot")
        .header(SESSION_HEADER, &session)
        .body(Body::empty())
        .unwrap();
    let snapshot = json_body(send(&router, snapshot).await).await;
    assert_eq!(snapshot["page"], "catalog");
    assert_eq!(snapshot["messages"]["open"], true);
}

#[tokio::test]
async fn test_community_join_group() {
    let router = site(quick_config());
    let cookie = sign_in(&router).await;
    let html = text(send(&router, get_with_cookie("/community", &cookie)).await).await;
    assert!(html.contains("Hive Health Watch"));
    assert!(html.contains("communityModal"));
    let session = session_of(&html);

    let open = json!({
        "type": "community",
        "action": { "type": "open", "modal": "join-group", "group": "hive-health" },
    });
    let snapshot = json_body(send(&router, action(&session, open)).await).await;
    assert_eq!(snapshot["community"]["modal"]["modal"], "join-group");
    assert!(
        snapshot["community"]["modal_html"]
            .as_str()
            .unwrap()
            .contains("Join Hive Health Watch")
    );

    let join = json!({
        "type": "community",
        "action": { "type": "join-group", "group": "hive-health" },
    });
    let snapshot = json_body(send(&router, action(&session, join)).await).await;
    assert_eq!(snapshot["community"]["modal"], Value::Null);
    assert!(snapshot["community"]["html"].as_str().unwrap().contains("90 members"));
    assert_eq!(
        snapshot["toasts"][0]["message"],
        "Successfully joined the study group!"
    );
}

#[tokio::test]
async fn test_dashboard_range_and_load_more() {
    let router = site(quick_config());
    let cookie = sign_in(&router).await;
    let html = text(send(&router, get_with_cookie("/dashboard", &cookie)).await).await;
    let session = session_of(&html);

    let switch = json!({
        "type": "dashboard",
        "action": { "type": "switch-range", "range": "month" },
    });
    let snapshot = json_body(send(&router, action(&session, switch)).await).await;
    assert_eq!(snapshot["range"], "month");
    assert_eq!(snapshot["charts"].as_array().unwrap().len(), 3);

    let html = text(send(&router, get("/catalog")).await).await;
    assert!(html.contains("loadMoreBtn"));
    let session = session_of(&html);
    let snapshot = json_body(
        send(&router, action(&session, json!({ "type": "load-more-courses" }))).await,
    )
    .await;
    assert_eq!(snapshot["toasts"][0]["message"], "More courses loaded!");
}

#[tokio::test]
async fn test_auth_toast_close_cancels_its_timers() {
    let router = site(quick_config());
    let response = send(&router, get("/static/auth.js")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let script = text(response).await;
    let close = script.find("close.addEventListener('click'").unwrap();
    let handler = &script[close..];
    let end = handler.find("node.remove()").unwrap();
    assert!(handler[..end].contains("clearTimeout(entrance)"));
    assert!(handler[..end].contains("clearTimeout(expiry)"));
}

#[tokio::test]
async fn test_unknown_session_is_not_found() {
    let router = site(quick_config());
    let response = send(
        &router,
        action(
            "00000000-0000-0000-0000-000000000000",
            json!({ "type": "escape" }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = send(&router, post_json("/api/action", json!({ "type": "escape" }))).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_password_strength_endpoint() {
    let router = site(quick_config());
    let weak = json_body(send(&router, get("/api/password-strength?password=abc")).await).await;
    assert_eq!(weak["level"], "weak");

    let strong =
        json_body(send(&router, get("/api/password-strength?password=Hive%232024x")).await).await;
    assert_eq!(strong["level"], "strong");
    assert_eq!(strong["feedback"], json!([]));
}

#[tokio::test]
async fn test_daily_activity_endpoint() {
    let router = site(quick_config());
    let body = json_body(send(&router, get("/api/charts/daily-activity?period=30d")).await).await;
    assert_eq!(body["period"], "30d");
    assert_eq!(body["mount"], "config");
    assert_eq!(body["value"]["data"]["labels"].as_array().unwrap().len(), 30);

    let response = send(&router, get("/api/charts/daily-activity?period=2w")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let router = site(ServerConfig {
        no_charts: true,
        ..quick_config()
    });
    let body = json_body(send(&router, get("/api/charts/daily-activity")).await).await;
    assert_eq!(body["period"], "7d");
    assert_eq!(body["mount"], "fallback");
}

#[tokio::test]
async fn test_shared_store_signs_everyone_in() {
    let dir = tempfile::tempdir().unwrap();
    let router = site(ServerConfig {
        store: Some(dir.path().join("profile.json")),
        ..quick_config()
    });
    let response = send(
        &router,
        post_json("/login", json!({ "email": "alex@example.com", "password": "secret" })),
    )
    .await;
    assert!(cookie_pair(&response, "userData").is_none());

    // No cookie needed; the file holds the record
    let response = send(&router, get("/dashboard")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let stored = std::fs::read_to_string(dir.path().join("profile.json")).unwrap();
    assert!(stored.contains("alex@example.com"));
}
