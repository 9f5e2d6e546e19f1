mod helpers;

use axum::http::StatusCode;
use axum_test::multipart::{MultipartForm, Part};
use helpers::fixtures::{jpeg, png, ADMIN, ADMIN_PASSWORD};
use helpers::{api_path, setup_test_app, setup_test_app_with};
use serde_json::{json, Value};

fn image_part(name: &str, content_type: &str, data: Vec<u8>) -> Part {
    Part::bytes(data).file_name(name).mime_type(content_type)
}

#[tokio::test]
async fn test_health_is_public() {
    let app = setup_test_app().await;
    let response = app.client().get("/health").await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "imghost");
    assert!(response.headers().contains_key("X-RateLimit-Limit"));
    assert!(response.headers().contains_key("X-RateLimit-Remaining"));
}

#[tokio::test]
async fn test_protected_routes_require_a_token() {
    let app = setup_test_app().await;

    let response = app.client().get(&api_path("/images")).await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    let body: Value = response.json();
    assert_eq!(body["code"], "UNAUTHORIZED");

    let response = app
        .client()
        .get(&api_path("/images"))
        .add_header("Authorization", "Bearer not-a-jwt")
        .await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_rejects_wrong_password() {
    let app = setup_test_app().await;
    let response = app
        .client()
        .post(&api_path("/auth/login"))
        .json(&json!({ "username": "root", "password": "nope" }))
        .await;

    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    let body: Value = response.json();
    assert_eq!(body["error"], "Username or password incorrect");

    let response = app
        .client()
        .post(&api_path("/auth/login"))
        .json(&json!({ "username": "nobody", "password": "nope" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);

    let response = app
        .client()
        .post(&api_path("/auth/login"))
        .json(&json!({ "username": "", "password": "" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_admin_is_seeded_with_a_hashed_password() {
    let app = setup_test_app().await;

    let admin = app.fakes.users.get(ADMIN).unwrap();
    assert!(admin.password_hash.starts_with("$argon2"));
    assert_ne!(admin.password_hash, ADMIN_PASSWORD);

    let bearer = app.admin_bearer().await;
    let response = app
        .client()
        .get(&api_path("/auth/me"))
        .add_header("Authorization", bearer)
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["username"], ADMIN);
    assert_eq!(body["guest"], false);
}

#[tokio::test]
async fn test_change_password() {
    let app = setup_test_app().await;
    let bearer = app.admin_bearer().await;

    let response = app
        .client()
        .post(&api_path("/auth/change-password"))
        .add_header("Authorization", bearer.clone())
        .json(&json!({ "old_password": "wrong", "new_password": "new-secret" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], "Old password incorrect");

    let response = app
        .client()
        .post(&api_path("/auth/change-password"))
        .add_header("Authorization", bearer.clone())
        .json(&json!({ "old_password": ADMIN_PASSWORD, "new_password": "" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], "Invalid payload");

    let response = app
        .client()
        .post(&api_path("/auth/change-password"))
        .add_header("Authorization", bearer)
        .json(&json!({ "old_password": ADMIN_PASSWORD, "new_password": "new-secret" }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["changed"], true);

    let response = app
        .client()
        .post(&api_path("/auth/login"))
        .json(&json!({ "username": ADMIN, "password": ADMIN_PASSWORD }))
        .await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);

    app.bearer_for(ADMIN, "new-secret").await;
}

#[tokio::test]
async fn test_upload_get_list_stats_delete() {
    let app = setup_test_app().await;
    let bearer = app.admin_bearer().await;

    let form = MultipartForm::new().add_part("image", image_part("cat.png", "image/png", png(64, 48)));
    let response = app
        .client()
        .post(&api_path("/upload"))
        .add_header("Authorization", bearer.clone())
        .add_header("User-Agent", "api-test")
        .add_header("X-Forwarded-For", "198.51.100.20")
        .multipart(form)
        .await;
    response.assert_status_ok();
    let uploaded: Value = response.json();
    let uuid = uploaded["uuid"].as_str().unwrap().to_string();
    assert_eq!(uploaded["width"], 64);
    assert_eq!(uploaded["height"], 48);
    assert_eq!(uploaded["uploaded_by"], "root");
    assert_eq!(uploaded["user_agent"], "api-test");
    assert_eq!(uploaded["upload_ip"], "198.51.100.20");

    let response = app
        .client()
        .get(&api_path(&format!("/images/{}", uuid)))
        .add_header("Authorization", bearer.clone())
        .await;
    response.assert_status_ok();

    let response = app
        .client()
        .get(&api_path("/images?limit=5"))
        .add_header("Authorization", bearer.clone())
        .await;
    let list: Vec<Value> = response.json();
    assert_eq!(list.len(), 1);

    let response = app
        .client()
        .get(&api_path("/stats"))
        .add_header("Authorization", bearer.clone())
        .await;
    let stats: Value = response.json();
    assert_eq!(stats["total_images"], 1);
    assert_eq!(stats["today_images"], 1);

    let response = app
        .client()
        .delete(&api_path(&format!("/images/{}", uuid)))
        .add_header("Authorization", bearer.clone())
        .await;
    response.assert_status_ok();
    assert!(app.fakes.storage.is_empty());

    let response = app
        .client()
        .get(&api_path(&format!("/images/{}", uuid)))
        .add_header("Authorization", bearer.clone())
        .await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);

    let response = app
        .client()
        .delete(&api_path(&format!("/images/{}", uuid)))
        .add_header("Authorization", bearer)
        .await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_invalid_image_id_is_bad_request() {
    let app = setup_test_app().await;
    let bearer = app.admin_bearer().await;

    let response = app
        .client()
        .get(&api_path("/images/not-a-uuid"))
        .add_header("Authorization", bearer)
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_upload_without_file_field_is_bad_request() {
    let app = setup_test_app().await;
    let bearer = app.admin_bearer().await;

    let form = MultipartForm::new().add_text("note", "no file here");
    let response = app
        .client()
        .post(&api_path("/upload"))
        .add_header("Authorization", bearer)
        .multipart(form)
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_rejected_type_maps_to_validation_error() {
    let app = setup_test_app().await;
    let bearer = app.admin_bearer().await;

    let form = MultipartForm::new().add_part(
        "image",
        image_part("doc.pdf", "application/pdf", b"%PDF-1.4".to_vec()),
    );
    let response = app
        .client()
        .post(&api_path("/upload"))
        .add_header("Authorization", bearer)
        .multipart(form)
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["code"], "VALIDATION_FAILED");
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("unsupported file type"));
}

#[tokio::test]
async fn test_batch_upload_reports_per_file() {
    let app = setup_test_app().await;
    let bearer = app.admin_bearer().await;

    let form = MultipartForm::new()
        .add_part("images", image_part("one.png", "image/png", png(30, 30)))
        .add_part(
            "images",
            image_part("two.pdf", "application/pdf", b"%PDF-1.4".to_vec()),
        )
        .add_part("images", image_part("three.jpg", "image/jpeg", jpeg(30, 30, 80)));

    let response = app
        .client()
        .post(&api_path("/upload/batch"))
        .add_header("Authorization", bearer)
        .multipart(form)
        .await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["successful"], 2);
    assert_eq!(body["failed"], 1);
    assert_eq!(body["errors"][0]["index"], 1);
    assert_eq!(body["errors"][0]["filename"], "two.pdf");
}

#[tokio::test]
async fn test_guest_code_flow() {
    let app = setup_test_app().await;
    let admin = app.admin_bearer().await;

    let response = app
        .client()
        .post(&api_path("/guest-codes"))
        .add_header("Authorization", admin.clone())
        .json(&json!({ "days": 1 }))
        .await;
    response.assert_status_ok();
    let code: Value = response.json();
    let code_id = code["id"].as_i64().unwrap();

    let response = app
        .client()
        .post(&api_path("/auth/guest"))
        .json(&json!({ "code": code["code"] }))
        .await;
    response.assert_status_ok();
    let login: Value = response.json();
    assert_eq!(login["username"], format!("guest:{}", code_id));
    let guest = format!("Bearer {}", login["token"].as_str().unwrap());

    // Guests upload, but cannot manage codes.
    let form = MultipartForm::new().add_part("image", image_part("g.png", "image/png", png(20, 20)));
    let response = app
        .client()
        .post(&api_path("/upload"))
        .add_header("Authorization", guest.clone())
        .multipart(form)
        .await;
    response.assert_status_ok();
    let uploaded: Value = response.json();
    assert_eq!(uploaded["uploaded_by"], format!("guest:{}", code_id));

    let response = app
        .client()
        .get(&api_path("/guest-codes"))
        .add_header("Authorization", guest.clone())
        .await;
    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);

    // Deleting the code takes the guest's images with it.
    let response = app
        .client()
        .delete(&api_path(&format!("/guest-codes/{}", code_id)))
        .add_header("Authorization", admin.clone())
        .await;
    response.assert_status_ok();
    let deleted: Value = response.json();
    assert_eq!(deleted["deleted"], true);
    assert_eq!(app.fakes.images.live_count(), 0);
    assert!(app.fakes.storage.is_empty());

    // The guest token outlives the code but can no longer upload.
    let form = MultipartForm::new().add_part("image", image_part("g.png", "image/png", png(20, 20)));
    let response = app
        .client()
        .post(&api_path("/upload"))
        .add_header("Authorization", guest)
        .multipart(form)
        .await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_unknown_guest_code_is_unauthorized() {
    let app = setup_test_app().await;
    let response = app
        .client()
        .post(&api_path("/auth/guest"))
        .json(&json!({ "code": "NOPE234567" }))
        .await;

    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    let body: Value = response.json();
    assert_eq!(body["error"], "Invalid code");
}

#[tokio::test]
async fn test_admission_rejects_over_limit() {
    let app = setup_test_app_with(&[("RATE_LIMIT_PER_MINUTE", "3")]).await;

    for remaining in ["2", "1", "0"] {
        let response = app
            .client()
            .get("/health")
            .add_header("X-Forwarded-For", "192.0.2.1")
            .await;
        response.assert_status_ok();
        assert_eq!(response.header("X-RateLimit-Remaining"), remaining);
    }

    let response = app
        .client()
        .get("/health")
        .add_header("X-Forwarded-For", "192.0.2.1")
        .await;
    assert_eq!(response.status_code(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(response.header("Retry-After"), "60");
    let body: Value = response.json();
    assert_eq!(body["error"], "Rate limit exceeded");
    assert_eq!(body["code"], "RATE_LIMIT_EXCEEDED");
    assert_eq!(body["retry_after"], 60);

    // Another client has its own window.
    let response = app
        .client()
        .get("/health")
        .add_header("X-Forwarded-For", "192.0.2.2")
        .await;
    response.assert_status_ok();
}

#[tokio::test]
async fn test_system_status() {
    let app = setup_test_app().await;
    let admin = app.admin_bearer().await;

    let response = app
        .client()
        .get(&api_path("/system/status"))
        .add_header("Authorization", admin.clone())
        .await;
    response.assert_status_ok();
    let empty: Value = response.json();
    assert_eq!(empty["total_images"], 0);
    assert_eq!(empty["average_file_size"], 0);
    assert_eq!(empty["min_file_size"], 0);

    let form = MultipartForm::new().add_part("image", image_part("s.png", "image/png", png(40, 30)));
    let response = app
        .client()
        .post(&api_path("/upload"))
        .add_header("Authorization", admin.clone())
        .multipart(form)
        .await;
    response.assert_status_ok();
    let uploaded: Value = response.json();
    let size = uploaded["file_size"].as_i64().unwrap();

    let response = app
        .client()
        .get(&api_path("/system/status"))
        .add_header("Authorization", admin)
        .await;
    response.assert_status_ok();
    let status: Value = response.json();
    assert!(status["uptime_seconds"].is_u64());
    assert_eq!(status["total_images"], 1);
    assert_eq!(status["today_images"], 1);
    assert_eq!(status["total_size"], size);
    assert_eq!(status["today_size"], size);
    assert_eq!(status["average_file_size"], size);
    assert_eq!(status["max_file_size"], size);
    assert_eq!(status["min_file_size"], size);

    let total = status["disk_total"].as_u64().unwrap();
    let free = status["disk_free"].as_u64().unwrap();
    let used = status["disk_used"].as_u64().unwrap();
    assert!(free <= total);
    assert_eq!(used, total - free);
}

#[tokio::test]
async fn test_guest_session_limits() {
    let app = setup_test_app().await;
    let code = app.fakes.guest_codes.insert("GUESTME234", None);

    let response = app
        .client()
        .post(&api_path("/auth/guest"))
        .json(&json!({ "code": "guestme234" }))
        .await;
    response.assert_status_ok();
    let login: Value = response.json();
    let guest = format!("Bearer {}", login["token"].as_str().unwrap());

    let response = app
        .client()
        .get(&api_path("/auth/me"))
        .add_header("Authorization", guest.clone())
        .await;
    response.assert_status_ok();
    let me: Value = response.json();
    assert_eq!(me["username"], code.identity());
    assert_eq!(me["guest"], true);

    let response = app
        .client()
        .post(&api_path("/auth/change-password"))
        .add_header("Authorization", guest.clone())
        .json(&json!({ "old_password": "x", "new_password": "y" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);

    let response = app
        .client()
        .get(&api_path("/system/status"))
        .add_header("Authorization", guest)
        .await;
    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_forwarded_for_is_ignored_from_untrusted_peers() {
    let app = setup_test_app_with(&[
        ("RATE_LIMIT_PER_MINUTE", "2"),
        ("TRUSTED_PROXIES", "10.0.0.1"),
    ])
    .await;

    // A fresh X-Forwarded-For per request must not buy a fresh window.
    for spoofed in ["192.0.2.1", "192.0.2.2"] {
        let response = app
            .client()
            .get("/health")
            .add_header("X-Forwarded-For", spoofed)
            .await;
        response.assert_status_ok();
    }

    let response = app
        .client()
        .get("/health")
        .add_header("X-Forwarded-For", "192.0.2.3")
        .await;
    assert_eq!(response.status_code(), StatusCode::TOO_MANY_REQUESTS);
}
