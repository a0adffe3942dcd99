mod common;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use serde_json::json;

use common::{test_app, with_body, LOGIN_PASSWORD, RECOVERY_TOKEN, REFRESH_TOKEN};
use oasis_api::database::memory::demo;
use oasis_api::database::models::{AuditAction, AuditCategory};
use oasis_api::database::PortalStore;

#[tokio::test]
async fn api_requires_a_token() {
    let app = test_app();

    let res = app.send(Request::get("/api/auth/context").body(Body::empty()).unwrap()).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.json()["code"], "UNAUTHORIZED");

    let res = app
        .send(
            Request::get("/api/auth/context")
                .header(header::AUTHORIZATION, "Bearer garbage")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn token_without_profile_is_rejected() {
    let app = test_app();
    let res = app.get("/api/auth/context", uuid::Uuid::new_v4()).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn context_reports_membership_and_role() {
    let app = test_app();
    let res = app.get("/api/auth/context", demo::FACILITADOR).await;

    assert_eq!(res.status, StatusCode::OK);
    let data = res.data();
    assert_eq!(data["role"], "facilitador");
    assert_eq!(data["role_name"], "Facilitador");
    assert_eq!(data["organization"]["id"], demo::ORGANIZATION.to_string());
    assert_eq!(data["is_platform_admin"], false);
    assert_eq!(data["my_organizations"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn session_cookie_authenticates_browsers() {
    let app = test_app();
    let cookie = format!("oasis_session={}", app.token(demo::PARTICIPANTE));

    let res = app
        .send(
            Request::get("/api/profile")
                .header(header::COOKIE, cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.data()["email"], "diego.munoz@oasis.cl");
}

#[tokio::test]
async fn second_organization_is_selected_by_header_or_cookie() {
    let app = test_app();
    let other = app.store.seed_organization("Red Juvenil", "red-juvenil").await;
    app.store
        .insert_member(&oasis_api::database::models::NewMember {
            organization_id: other.id,
            user_id: demo::ADMIN,
            role: oasis_api::auth::Role::Participante,
            status: oasis_api::database::models::MembershipStatus::Active,
            invited_by: None,
        })
        .await
        .unwrap();

    // Earliest membership wins by default
    let res = app.get("/api/organizations/current", demo::ADMIN).await;
    assert_eq!(res.data()["organization"]["id"], demo::ORGANIZATION.to_string());

    let token = app.token(demo::ADMIN);
    let res = app
        .send(
            Request::get("/api/organizations/current")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .header(header::COOKIE, format!("oasis_current_org={}", other.id))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(res.data()["organization"]["id"], other.id.to_string());
    assert_eq!(res.data()["role"], "participante");

    // Header beats cookie
    let res = app
        .send(
            Request::get("/api/organizations/current")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .header(header::COOKIE, format!("oasis_current_org={}", other.id))
                .header("x-organization-id", demo::ORGANIZATION.to_string())
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(res.data()["role"], "admin");

    let res = app.get("/api/organizations", demo::ADMIN).await;
    assert_eq!(res.data().as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn switching_organization_sets_cookie() {
    let app = test_app();

    let res = app
        .call(
            "POST",
            "/api/organizations/current",
            demo::OWNER,
            Some(json!({ "organization_id": demo::ORGANIZATION })),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);
    let cookies = res.set_cookies();
    assert_eq!(cookies.len(), 1);
    assert!(cookies[0].starts_with(&format!("oasis_current_org={}", demo::ORGANIZATION)));
    assert!(cookies[0].contains("Max-Age=31536000"));

    let stranger = app.store.seed_organization("Otra", "otra").await;
    let res = app
        .call("POST", "/api/organizations/current", demo::OWNER, Some(json!({ "organization_id": stranger.id })))
        .await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn platform_admin_acts_as_owner_of_any_organization() {
    let app = test_app();

    let res = app.get("/api/organizations/current", demo::PLATFORM_ADMIN).await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);

    let token = app.token(demo::PLATFORM_ADMIN);
    let res = app
        .send(
            Request::get("/api/auth/context")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .header("x-organization-id", demo::ORGANIZATION.to_string())
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(res.data()["role"], "owner");
    assert_eq!(res.data()["membership"], serde_json::Value::Null);
    assert_eq!(res.data()["is_platform_admin"], true);
}

#[tokio::test]
async fn only_org_admins_edit_settings() {
    let app = test_app();

    let res = app
        .call("PATCH", "/api/organizations/current", demo::FACILITADOR, Some(json!({ "name": "X" })))
        .await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);

    let res = app
        .call("PATCH", "/api/organizations/current", demo::ADMIN, Some(json!({ "name": "  " })))
        .await;
    assert_eq!(res.status, StatusCode::UNPROCESSABLE_ENTITY);

    let res = app
        .call(
            "PATCH",
            "/api/organizations/current",
            demo::ADMIN,
            Some(json!({ "description": "Comunidad de aprendizaje" })),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.data()["description"], "Comunidad de aprendizaje");
}

#[tokio::test]
async fn profile_update() {
    let app = test_app();
    let res = app
        .call("PATCH", "/api/profile", demo::PARTICIPANTE, Some(json!({ "full_name": "Diego M." })))
        .await;

    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.data()["full_name"], "Diego M.");
}

#[tokio::test]
async fn login_sets_session_cookie_and_logout_clears_it() {
    let app = test_app();

    let bad = app
        .send(with_body(
            Request::post("/auth/login"),
            Some(json!({ "email": "ana.perez@oasis.cl", "password": "nope" })),
        ))
        .await;
    assert_eq!(bad.status, StatusCode::UNAUTHORIZED);

    let res = app
        .send(with_body(
            Request::post("/auth/login"),
            Some(json!({ "email": "Ana.Perez@oasis.cl", "password": LOGIN_PASSWORD })),
        ))
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.data()["user"]["id"], demo::OWNER.to_string());
    assert!(res.set_cookies()[0].starts_with("oasis_session="));

    let res = app.send(Request::post("/auth/logout").body(Body::empty()).unwrap()).await;
    let cookies = res.set_cookies();
    assert_eq!(cookies.len(), 2);
    assert!(cookies.iter().all(|c| c.contains("Max-Age=0")));
}

#[tokio::test]
async fn navigation_follows_role() {
    let app = test_app();

    let participant = app.get("/api/navigation", demo::PARTICIPANTE).await.data();
    assert!(participant["admin"].as_array().unwrap().is_empty());
    assert!(participant["backoffice"].as_array().unwrap().is_empty());

    let owner = app.get("/api/navigation", demo::OWNER).await.data();
    assert!(!owner["admin"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn register_creates_account_and_profile() {
    let app = test_app();

    let res = app
        .send(with_body(
            Request::post("/auth/register"),
            Some(json!({ "email": "Nueva@Oasis.cl", "password": "corta", "full_name": "Nueva" })),
        ))
        .await;
    assert_eq!(res.status, StatusCode::UNPROCESSABLE_ENTITY);

    let res = app
        .send(with_body(
            Request::post("/auth/register"),
            Some(json!({ "email": "ana.perez@oasis.cl", "password": "segura-123", "full_name": "Ana" })),
        ))
        .await;
    assert_eq!(res.status, StatusCode::CONFLICT);

    let res = app
        .send(with_body(
            Request::post("/auth/register"),
            Some(json!({ "email": "Nueva@Oasis.cl", "password": "segura-123", "full_name": " Camila Nueva " })),
        ))
        .await;
    assert_eq!(res.status, StatusCode::CREATED);
    assert!(res.set_cookies().is_empty());

    let (id, email) = app.identity.signed_up.lock().await[0].clone();
    assert_eq!(email, "nueva@oasis.cl");
    assert_eq!(res.data()["user"]["id"], id.to_string());

    let profile = app.store.get_profile(id).await.unwrap().unwrap();
    assert_eq!(profile.full_name.as_deref(), Some("Camila Nueva"));
}

#[tokio::test]
async fn refresh_issues_a_new_session() {
    let app = test_app();

    let res = app
        .send(with_body(Request::post("/auth/refresh"), Some(json!({ "refresh_token": " " }))))
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    let res = app
        .send(with_body(Request::post("/auth/refresh"), Some(json!({ "refresh_token": "caducado" }))))
        .await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);

    let res = app
        .send(with_body(Request::post("/auth/refresh"), Some(json!({ "refresh_token": REFRESH_TOKEN }))))
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.data()["user"]["id"], demo::OWNER.to_string());
    assert_eq!(res.data()["refresh_token"], REFRESH_TOKEN);
    assert!(res.set_cookies()[0].starts_with("oasis_session="));
}

#[tokio::test]
async fn password_reset_does_not_reveal_accounts() {
    let app = test_app();

    let res = app
        .send(with_body(Request::post("/auth/password/reset"), Some(json!({ "email": "sin-arroba" }))))
        .await;
    assert_eq!(res.status, StatusCode::UNPROCESSABLE_ENTITY);

    let known = app
        .send(with_body(Request::post("/auth/password/reset"), Some(json!({ "email": "diego.munoz@oasis.cl" }))))
        .await;
    let unknown = app
        .send(with_body(Request::post("/auth/password/reset"), Some(json!({ "email": "nadie@oasis.cl" }))))
        .await;
    assert_eq!(known.status, StatusCode::OK);
    assert_eq!(known.text, unknown.text);
    assert_eq!(app.identity.resets.lock().await.len(), 2);
}

#[tokio::test]
async fn password_update_needs_a_recovery_token() {
    let app = test_app();

    let short = app
        .send(with_body(
            Request::post("/auth/password/update"),
            Some(json!({ "token": RECOVERY_TOKEN, "new_password": "corta" })),
        ))
        .await;
    assert_eq!(short.status, StatusCode::UNPROCESSABLE_ENTITY);

    let wrong = app
        .send(with_body(
            Request::post("/auth/password/update"),
            Some(json!({ "token": "otro", "new_password": "segura-123" })),
        ))
        .await;
    assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);

    let res = app
        .send(with_body(
            Request::post("/auth/password/update"),
            Some(json!({ "token": RECOVERY_TOKEN, "new_password": "segura-123" })),
        ))
        .await;
    assert_eq!(res.status, StatusCode::OK);
}

#[tokio::test]
async fn any_user_can_create_an_organization() {
    let app = test_app();
    let body = json!({ "name": "Red Norte", "slug": "red-norte", "type": "community" });

    let res = app.call("POST", "/api/organizations", demo::PARTICIPANTE, Some(body.clone())).await;
    assert_eq!(res.status, StatusCode::CREATED);
    assert_eq!(res.data()["role"], "owner");
    assert_eq!(res.data()["organization"]["slug"], "red-norte");
    let id = res.data()["organization"]["id"].as_str().unwrap().to_string();
    assert!(res.set_cookies()[0].starts_with(&format!("oasis_current_org={}", id)));

    let res = app.get("/api/organizations", demo::PARTICIPANTE).await;
    assert_eq!(res.data().as_array().unwrap().len(), 2);

    let res = app.call("POST", "/api/organizations", demo::OWNER, Some(body)).await;
    assert_eq!(res.status, StatusCode::CONFLICT);

    let res = app
        .call("POST", "/api/organizations", demo::OWNER, Some(json!({ "name": "Mala", "slug": "Mala Slug" })))
        .await;
    assert_eq!(res.status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn successful_writes_are_audited() {
    let app = test_app();

    let res = app.get("/api/profile", demo::ADMIN).await;
    assert_eq!(res.status, StatusCode::OK);

    let res = app
        .call("POST", "/api/members/invite", demo::PARTICIPANTE, Some(json!({ "email": "x@oasis.cl", "role": "participante" })))
        .await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
    assert!(app.store.audit_entries().await.is_empty());

    let res = app
        .call(
            "POST",
            "/api/members/invite",
            demo::ADMIN,
            Some(json!({ "email": "invitada@oasis.cl", "role": "participante" })),
        )
        .await;
    assert!(res.status.is_success());

    let entries = app.store.audit_entries().await;
    assert_eq!(entries.len(), 1);
    let entry = &entries[0].entry;
    assert_eq!(entry.actor_id, Some(demo::ADMIN));
    assert_eq!(entry.organization_id, Some(demo::ORGANIZATION));
    assert_eq!(entry.category, AuditCategory::Org);
    assert_eq!(entry.action, AuditAction::AddMember);
    assert_eq!(entry.resource, "members");
    assert_eq!(entry.metadata["path"], "/api/members/invite");
}

#[tokio::test]
async fn login_is_audited_without_an_actor() {
    let app = test_app();

    let res = app
        .send(
            with_body(
                Request::post("/auth/login").header("x-forwarded-for", "203.0.113.7, 10.0.0.1"),
                Some(json!({ "email": "ana.perez@oasis.cl", "password": LOGIN_PASSWORD })),
            ),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);

    let entries = app.store.audit_entries().await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].entry.category, AuditCategory::Auth);
    assert_eq!(entries[0].entry.action, AuditAction::Login);
    assert_eq!(entries[0].entry.actor_id, None);
    assert_eq!(entries[0].entry.ip_address.as_deref(), Some("203.0.113.7"));
}
