//! HTTP API tests for registration, login and role-gated routes

mod common;

use chrono::Utc;
use common::{start_test_server, status_and_json, TEST_SECRET};
use coursedesk::auth::{Claims, TokenService};
use reqwest::StatusCode;
use serde_json::json;

#[tokio::test]
async fn test_health_check() {
    let server = start_test_server().await;

    let resp = server
        .client
        .get(format!("{}/api/health", server.base))
        .send()
        .await
        .unwrap();
    let (status, body) = status_and_json(resp).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_register_returns_user_and_token() {
    let server = start_test_server().await;

    let (user, token) = server.register("alice", "teacher").await;

    assert_eq!(user["username"], "alice");
    assert_eq!(user["email"], "alice@example.com");
    assert_eq!(user["role"], "teacher");
    assert!(user["_id"].is_string());
    assert!(user.get("password").is_none());
    assert_eq!(token.split('.').count(), 3);
}

#[tokio::test]
async fn test_register_invalid_role_persists_nothing() {
    let server = start_test_server().await;

    let resp = server
        .post(
            "/register",
            None,
            json!({
                "username": "mallory",
                "email": "mallory@example.com",
                "password": "password123",
                "role": "superuser",
            }),
        )
        .await;
    let (status, body) = status_and_json(resp).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid role");

    // The email is still free
    server.register("mallory", "student").await;
}

#[tokio::test]
async fn test_register_duplicate_email() {
    let server = start_test_server().await;
    server.register("alice", "student").await;

    let resp = server
        .post(
            "/register",
            None,
            json!({
                "username": "alice2",
                "email": "Alice@Example.com",
                "password": "password123",
                "role": "student",
            }),
        )
        .await;
    let (status, body) = status_and_json(resp).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Email already registered");
}

#[tokio::test]
async fn test_login_token_resolves_to_registered_user() {
    let server = start_test_server().await;
    let (user, _) = server.register("bob", "student").await;

    let resp = server
        .post(
            "/login",
            None,
            json!({ "email": "bob@example.com", "password": "password123" }),
        )
        .await;
    let (status, body) = status_and_json(resp).await;
    assert_eq!(status, StatusCode::OK);

    let token = body["token"].as_str().unwrap();
    let id = server.state.tokens.verify(token).unwrap();
    assert_eq!(id.to_string(), user["_id"].as_str().unwrap());
    assert_eq!(body["user"]["_id"], user["_id"]);
}

#[tokio::test]
async fn test_login_failures_are_indistinguishable() {
    let server = start_test_server().await;
    server.register("carol", "student").await;

    let wrong_password = server
        .post(
            "/login",
            None,
            json!({ "email": "carol@example.com", "password": "nope" }),
        )
        .await;
    let unknown_email = server
        .post(
            "/login",
            None,
            json!({ "email": "nobody@example.com", "password": "password123" }),
        )
        .await;

    let (s1, b1) = status_and_json(wrong_password).await;
    let (s2, b2) = status_and_json(unknown_email).await;
    assert_eq!(s1, StatusCode::UNAUTHORIZED);
    assert_eq!(s2, StatusCode::UNAUTHORIZED);
    assert_eq!(b1, b2);
}

#[tokio::test]
async fn test_missing_token_rejected() {
    let server = start_test_server().await;

    let (status, body) = status_and_json(server.get("/student", None).await).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Please authenticate.");
}

#[tokio::test]
async fn test_expired_token_rejected() {
    let server = start_test_server().await;
    let (user, _) = server.register("dave", "student").await;

    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: user["_id"].as_str().unwrap().to_string(),
        iat: now - 7200,
        exp: now - 60,
    };
    let tokens = TokenService::new(TEST_SECRET.as_bytes(), chrono::Duration::hours(24));
    let expired = tokens.encode_claims(&claims).unwrap();

    let (status, _) = status_and_json(server.get("/student", Some(&expired)).await).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_token_signed_with_other_secret_rejected() {
    let server = start_test_server().await;
    let (user, _) = server.register("erin", "student").await;

    let forged = TokenService::new(b"some-other-secret", chrono::Duration::hours(24))
        .issue(user["_id"].as_str().unwrap().parse().unwrap())
        .unwrap();

    let (status, _) = status_and_json(server.get("/student", Some(&forged)).await).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_deleted_user_token_rejected() {
    let server = start_test_server().await;
    let (_, admin) = server.register("root", "admin").await;
    let (user, token) = server.register("frank", "student").await;
    let id = user["_id"].as_str().unwrap();

    let (status, _) = status_and_json(server.delete(&format!("/admin/{}", id), &admin).await).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = status_and_json(server.get("/student", Some(&token)).await).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Please authenticate.");
}

#[tokio::test]
async fn test_role_access_matrix() {
    let server = start_test_server().await;
    let (_, admin) = server.register("admin", "admin").await;
    let (_, teacher) = server.register("teacher", "teacher").await;
    let (_, student) = server.register("student", "student").await;

    let cases = [
        ("/admin", &admin, StatusCode::OK),
        ("/admin", &teacher, StatusCode::FORBIDDEN),
        ("/admin", &student, StatusCode::FORBIDDEN),
        ("/teacher", &admin, StatusCode::OK),
        ("/teacher", &teacher, StatusCode::OK),
        ("/teacher", &student, StatusCode::FORBIDDEN),
        ("/student", &admin, StatusCode::OK),
        ("/student", &teacher, StatusCode::OK),
        ("/student", &student, StatusCode::OK),
        ("/teacher/courses", &admin, StatusCode::FORBIDDEN),
        ("/teacher/courses", &teacher, StatusCode::OK),
        ("/teacher/courses", &student, StatusCode::FORBIDDEN),
        ("/student/courses", &admin, StatusCode::FORBIDDEN),
        ("/student/courses", &teacher, StatusCode::FORBIDDEN),
        ("/student/courses", &student, StatusCode::OK),
    ];

    for (path, token, expected) in cases {
        let resp = server.get(path, Some(token.as_str())).await;
        assert_eq!(resp.status(), expected, "GET {}", path);
        if expected == StatusCode::FORBIDDEN {
            let body: serde_json::Value = resp.json().await.unwrap();
            assert_eq!(body["error"], "Access denied");
        }
    }
}

#[tokio::test]
async fn test_malformed_json_rejected() {
    let server = start_test_server().await;

    let resp = server
        .client
        .post(server.url("/register"))
        .header("content-type", "application/json")
        .body("{\"username\": ")
        .send()
        .await
        .unwrap();
    let (status, body) = status_and_json(resp).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_invalid_path_id_rejected() {
    let server = start_test_server().await;
    let (_, admin) = server.register("admin", "admin").await;

    let (status, body) = status_and_json(server.get("/admin/not-a-uuid", Some(&admin)).await).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid id");
}

#[tokio::test]
async fn test_admin_user_management() {
    let server = start_test_server().await;
    let (_, admin) = server.register("admin", "admin").await;
    let (user, _) = server.register("grace", "student").await;
    let id = user["_id"].as_str().unwrap();
    let path = format!("/admin/{}", id);

    // List in creation order
    let (status, list) = status_and_json(server.get("/admin", Some(&admin)).await).await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<_> = list
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u["username"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["admin", "grace"]);

    // Fetch
    let (status, fetched) = status_and_json(server.get(&path, Some(&admin)).await).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["username"], "grace");

    // Promote
    let (status, updated) =
        status_and_json(server.put(&path, &admin, json!({ "role": "teacher" })).await).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["role"], "teacher");
    assert_eq!(updated["username"], "grace");

    // Invalid role on update
    let (status, _) =
        status_and_json(server.put(&path, &admin, json!({ "role": "owner" })).await).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Delete, then it is gone
    let (status, body) = status_and_json(server.delete(&path, &admin).await).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "User deleted successfully");

    let (status, _) = status_and_json(server.get(&path, Some(&admin)).await).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = status_and_json(server.delete(&path, &admin).await).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
