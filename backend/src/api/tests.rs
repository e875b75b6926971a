//! Endpoint tests against the in-memory store.

use std::sync::Arc;

use actix_web::http::StatusCode;
use actix_web::{test, web, App};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde_json::{json, Value};

use super::configure_routes;
use crate::config::AppConfig;
use crate::store::Store;
use crate::AppState;

/// Call the service and decode the JSON envelope.
macro_rules! send {
    ($app:expr, $req:expr) => {{
        let res = test::call_service(&$app, $req.to_request()).await;
        let status = res.status();
        let body: Value = test::read_body_json(res).await;
        (status, body)
    }};
}

/// Register a user and return its session token.
macro_rules! register {
    ($app:expr, $email:expr, $name:expr, $role:expr) => {{
        let role: Option<&str> = $role;
        let (status, body) = send!(
            $app,
            test::TestRequest::post().uri("/api/auth/register").set_json(json!({
                "name": $name,
                "email": $email,
                "password": "s3cure-passphrase",
                "role": role,
            }))
        );
        assert_eq!(status, StatusCode::CREATED);
        body["data"]["token"].as_str().unwrap().to_string()
    }};
}

fn state() -> Arc<AppState> {
    Arc::new(AppState::new(Store::memory(), AppConfig::for_tests()))
}

macro_rules! app {
    ($state:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new($state.clone()))
                .configure(configure_routes),
        )
        .await
    };
}

fn bearer(token: &str) -> (&'static str, String) {
    ("Authorization", format!("Bearer {}", token))
}

const CERTIFICATE: &str = "DEATH CERTIFICATE\n\
    Registration No: 2024/1187\n\
    Name of deceased: Asha Kulkarni\n\
    Date of death: 02-03-2024\n\
    Place of death: Pune\n\
    Cause of death: Cardiac arrest";

#[actix_rt::test]
async fn test_health_and_info() {
    let state = state();
    let app = app!(state);

    let (status, body) = send!(app, test::TestRequest::get().uri("/health"));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "healthy");
    assert_eq!(body["data"]["storage"], "memory");

    let (status, body) = send!(app, test::TestRequest::get().uri("/"));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "LifeVault API");
}

#[actix_rt::test]
async fn test_register_login_me() {
    let state = state();
    let app = app!(state);

    let (status, body) = send!(
        app,
        test::TestRequest::post().uri("/api/auth/register").set_json(json!({
            "name": "Asha Kulkarni",
            "email": "asha@example.com",
            "password": "s3cure-passphrase"
        }))
    );
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    assert!(body["data"]["user"].get("passwordHash").is_none());

    let (status, body) = send!(
        app,
        test::TestRequest::post().uri("/api/auth/login").set_json(json!({
            "email": "asha@example.com",
            "password": "s3cure-passphrase"
        }))
    );
    assert_eq!(status, StatusCode::OK);
    let token = body["data"]["token"].as_str().unwrap().to_string();

    let (status, body) = send!(
        app,
        test::TestRequest::get()
            .uri("/api/auth/me")
            .insert_header(bearer(&token))
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["email"], "asha@example.com");
    assert_eq!(body["data"]["role"], "user");

    let (status, body) = send!(app, test::TestRequest::get().uri("/api/auth/me"));
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");

    let (status, _) = send!(
        app,
        test::TestRequest::get()
            .uri("/api/auth/me")
            .insert_header(bearer("not.a.token"))
    );
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send!(
        app,
        test::TestRequest::post().uri("/api/auth/login").set_json(json!({
            "email": "asha@example.com",
            "password": "wrong-password"
        }))
    );
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["message"], "Invalid email or password");
}

#[actix_rt::test]
async fn test_malformed_input_uses_envelope() {
    let state = state();
    let app = app!(state);

    let (status, body) = send!(
        app,
        test::TestRequest::post()
            .uri("/api/auth/register")
            .insert_header(("Content-Type", "application/json"))
            .set_payload("{not json")
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let token = register!(app, "asha@example.com", "Asha Kulkarni", None);
    let (status, body) = send!(
        app,
        test::TestRequest::get()
            .uri("/api/assets/not-a-uuid")
            .insert_header(bearer(&token))
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[actix_rt::test]
async fn test_asset_crud_is_owner_scoped() {
    let state = state();
    let app = app!(state);
    let asha = register!(app, "asha@example.com", "Asha Kulkarni", None);
    let kiran = register!(app, "kiran@example.com", "Kiran Rao", None);

    let (status, body) = send!(
        app,
        test::TestRequest::post()
            .uri("/api/assets")
            .insert_header(bearer(&asha))
            .set_json(json!({
                "name": "Salary account",
                "category": "bank_account",
                "institution": "State Bank of India",
                "accountNumber": "123456789012",
                "currentValue": 25000000
            }))
    );
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["accountNumber"], "XXXXXXXX9012");
    let id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = send!(
        app,
        test::TestRequest::get()
            .uri(&format!("/api/assets/{}", id))
            .insert_header(bearer(&kiran))
    );
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");

    let (status, body) = send!(
        app,
        test::TestRequest::put()
            .uri(&format!("/api/assets/{}", id))
            .insert_header(bearer(&asha))
            .set_json(json!({ "currentValue": 30000000 }))
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["currentValue"], 30000000);

    let (status, body) = send!(
        app,
        test::TestRequest::delete()
            .uri(&format!("/api/assets/{}", id))
            .insert_header(bearer(&asha))
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["deleted"], true);

    let (_, body) = send!(
        app,
        test::TestRequest::get()
            .uri("/api/assets")
            .insert_header(bearer(&asha))
    );
    assert_eq!(body["data"].as_array().unwrap().len(), 0);
}

#[actix_rt::test]
async fn test_nominee_allocation_limit() {
    let state = state();
    let app = app!(state);
    let asha = register!(app, "asha@example.com", "Asha Kulkarni", None);

    let nominee = |email: &str, pct: f64| {
        test::TestRequest::post()
            .uri("/api/nominees")
            .insert_header(bearer(&asha))
            .set_json(json!({
                "name": "Nominee",
                "email": email,
                "relationship": "child",
                "allocationPercentage": pct
            }))
    };

    let (status, _) = send!(app, nominee("ravi@example.com", 70.0));
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send!(app, nominee("meera@example.com", 40.0));
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let (status, body) = send!(app, nominee("RAVI@example.com", 10.0));
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "CONFLICT");

    let (_, body) = send!(
        app,
        test::TestRequest::get()
            .uri("/api/nominees")
            .insert_header(bearer(&asha))
    );
    assert_eq!(body["data"]["unallocatedPercentage"], 30.0);
}

#[actix_rt::test]
async fn test_vault_request_flow() {
    let state = state();
    let app = app!(state);

    state
        .auth
        .bootstrap_admin("admin@lifevault.test", "admin-pass-1")
        .await
        .unwrap();
    let (_, body) = send!(
        app,
        test::TestRequest::post().uri("/api/auth/login").set_json(json!({
            "email": "admin@lifevault.test",
            "password": "admin-pass-1"
        }))
    );
    let admin = body["data"]["token"].as_str().unwrap().to_string();

    let asha = register!(app, "asha@example.com", "Asha Kulkarni", None);
    let ravi = register!(app, "ravi@example.com", "Ravi Kulkarni", Some("nominee"));

    send!(
        app,
        test::TestRequest::post()
            .uri("/api/assets")
            .insert_header(bearer(&asha))
            .set_json(json!({
                "name": "Term policy",
                "category": "insurance_policy",
                "institution": "LIC",
                "currentValue": 1000000
            }))
    );
    send!(
        app,
        test::TestRequest::post()
            .uri("/api/nominees")
            .insert_header(bearer(&asha))
            .set_json(json!({
                "name": "Ravi Kulkarni",
                "email": "ravi@example.com",
                "relationship": "spouse",
                "allocationPercentage": 50
            }))
    );

    let (status, body) = send!(
        app,
        test::TestRequest::get()
            .uri("/api/nominations")
            .insert_header(bearer(&ravi))
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["ownerEmail"], "asha@example.com");

    let (status, body) = send!(
        app,
        test::TestRequest::post()
            .uri("/api/vault-requests")
            .insert_header(bearer(&ravi))
            .set_json(json!({ "ownerEmail": "asha@example.com" }))
    );
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["status"], "pending");
    let id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = send!(
        app,
        test::TestRequest::post()
            .uri(&format!("/api/admin/vault-requests/{}/approve", id))
            .insert_header(bearer(&admin))
    );
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "DOCUMENTS_REQUIRED");

    let (status, body) = send!(
        app,
        test::TestRequest::post()
            .uri(&format!("/api/vault-requests/{}/documents", id))
            .insert_header(bearer(&ravi))
            .set_json(json!({
                "kind": "death_certificate",
                "fileName": "certificate.txt",
                "content": STANDARD.encode(CERTIFICATE)
            }))
    );
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["verdict"], "verified");

    let (status, body) = send!(
        app,
        test::TestRequest::post()
            .uri(&format!("/api/admin/vault-requests/{}/approve", id))
            .insert_header(bearer(&ravi))
    );
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "FORBIDDEN");

    let (status, body) = send!(
        app,
        test::TestRequest::post()
            .uri(&format!("/api/admin/vault-requests/{}/approve", id))
            .insert_header(bearer(&admin))
            .set_json(json!({ "notes": "Certificate checked" }))
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "approved");
    assert_eq!(body["data"]["adminNotes"], "Certificate checked");

    let (status, body) = send!(
        app,
        test::TestRequest::post()
            .uri(&format!("/api/admin/vault-requests/{}/reject", id))
            .insert_header(bearer(&admin))
            .set_json(json!({ "notes": "too late" }))
    );
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "INVALID_STATE");

    let (status, body) = send!(
        app,
        test::TestRequest::get()
            .uri(&format!("/api/vault-requests/{}/assets", id))
            .insert_header(bearer(&ravi))
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["entitledTotal"], 500000);
    assert_eq!(body["data"]["assets"][0]["entitledValue"], 500000);

    let (status, body) = send!(
        app,
        test::TestRequest::get()
            .uri("/api/admin/stats")
            .insert_header(bearer(&admin))
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["totalUsers"], 3);
    assert_eq!(body["data"]["vaultRequestsByStatus"]["approved"], 1);

    let (status, _) = send!(
        app,
        test::TestRequest::get()
            .uri("/api/admin/users")
            .insert_header(bearer(&asha))
    );
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send!(
        app,
        test::TestRequest::get()
            .uri("/api/dashboard/stats")
            .insert_header(bearer(&asha))
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["assetCount"], 1);
    assert_eq!(body["data"]["vaultRequests"]["approved"], 1);
}

#[actix_rt::test]
async fn test_oversized_value_is_rejected_and_stats_stay_up() {
    let state = state();
    let app = app!(state);

    state
        .auth
        .bootstrap_admin("admin@lifevault.test", "admin-pass-1")
        .await
        .unwrap();
    let (_, body) = send!(
        app,
        test::TestRequest::post().uri("/api/auth/login").set_json(json!({
            "email": "admin@lifevault.test",
            "password": "admin-pass-1"
        }))
    );
    let admin = body["data"]["token"].as_str().unwrap().to_string();
    let asha = register!(app, "asha@example.com", "Asha Kulkarni", None);

    let asset = |value: i64| {
        test::TestRequest::post()
            .uri("/api/assets")
            .insert_header(bearer(&asha))
            .set_json(json!({
                "name": "Estate",
                "category": "real_estate",
                "institution": "Registry",
                "currentValue": value
            }))
    };

    let (status, body) = send!(app, asset(i64::MAX));
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let (status, _) = send!(app, asset(crate::utils::MAX_AMOUNT));
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = send!(app, asset(1));
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send!(
        app,
        test::TestRequest::get()
            .uri("/api/dashboard/stats")
            .insert_header(bearer(&asha))
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["totalAssetValue"], crate::utils::MAX_AMOUNT + 1);

    let (status, body) = send!(
        app,
        test::TestRequest::get()
            .uri("/api/admin/stats")
            .insert_header(bearer(&admin))
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["totalAssets"], 2);
}
