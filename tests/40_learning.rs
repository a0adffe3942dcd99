mod common;

use axum::http::StatusCode;
use serde_json::{json, Value};

use common::{test_app, TestApp};
use oasis_api::database::memory::demo;

async fn demo_steps(app: &TestApp) -> Vec<Value> {
    let res = app.get(&format!("/api/journeys/{}", demo::JOURNEY), demo::PARTICIPANTE).await;
    assert_eq!(res.status, StatusCode::OK);
    res.data()["steps"].as_array().unwrap().clone()
}

async fn enroll(app: &TestApp, user: uuid::Uuid) -> String {
    let res = app
        .call("POST", "/api/enrollments", user, Some(json!({ "journey_id": demo::JOURNEY })))
        .await;
    assert_eq!(res.status, StatusCode::CREATED, "{}", res.text);
    res.data()["id"].as_str().unwrap().to_string()
}

async fn complete(app: &TestApp, user: uuid::Uuid, enrollment: &str, step: &Value) -> common::TestResponse {
    let uri = format!("/api/enrollments/{}/steps/{}/complete", enrollment, step["id"].as_str().unwrap());
    app.call("POST", &uri, user, None).await
}

#[tokio::test]
async fn participants_see_active_journeys_only() {
    let app = test_app();

    let res = app
        .call("POST", "/api/journeys", demo::FACILITADOR, Some(json!({ "title": "Borrador" })))
        .await;
    assert_eq!(res.status, StatusCode::CREATED);
    assert_eq!(res.data()["status"], "draft");
    let draft_id = res.data()["id"].as_str().unwrap().to_string();

    let participant = app.get("/api/journeys", demo::PARTICIPANTE).await.data();
    assert_eq!(participant.as_array().unwrap().len(), 1);
    assert_eq!(participant[0]["is_enrolled"], false);

    let facilitator = app.get("/api/journeys", demo::FACILITADOR).await.data();
    assert_eq!(facilitator.as_array().unwrap().len(), 2);

    let res = app.get(&format!("/api/journeys/{}", draft_id), demo::PARTICIPANTE).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);

    let res = app.get("/api/journeys?status=draft", demo::FACILITADOR).await.data();
    assert_eq!(res.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn journey_authoring_permissions() {
    let app = test_app();

    let res = app
        .call("POST", "/api/journeys", demo::PARTICIPANTE, Some(json!({ "title": "Nope" })))
        .await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);

    let res = app.call("POST", "/api/journeys", demo::ADMIN, Some(json!({ "title": "" }))).await;
    assert_eq!(res.status, StatusCode::UNPROCESSABLE_ENTITY);

    let id = app
        .call("POST", "/api/journeys", demo::FACILITADOR, Some(json!({ "title": "Nuevo" })))
        .await
        .data()["id"]
        .as_str()
        .unwrap()
        .to_string();

    let res = app
        .call(
            "POST",
            &format!("/api/journeys/{}/steps", id),
            demo::FACILITADOR,
            Some(json!({ "title": "Paso 1", "points": 25 })),
        )
        .await;
    assert_eq!(res.status, StatusCode::CREATED);
    assert_eq!(res.data()["order"], 1);

    let detail = app.get(&format!("/api/journeys/{}", id), demo::FACILITADOR).await.data();
    assert_eq!(detail["total_steps"], 1);
    assert_eq!(detail["total_points"], 25);

    // Facilitators author but cannot publish
    let res = app.call("POST", &format!("/api/journeys/{}/publish", id), demo::FACILITADOR, None).await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);

    let res = app.call("POST", &format!("/api/journeys/{}/publish", id), demo::ADMIN, None).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.data()["status"], "active");

    let res = app.call("DELETE", &format!("/api/journeys/{}", id), demo::ADMIN, None).await;
    assert_eq!(res.status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn completing_steps_updates_progress_points_and_badges() {
    let app = test_app();
    let steps = demo_steps(&app).await;
    let enrollment = enroll(&app, demo::PARTICIPANTE).await;

    // Second enrollment in the same journey conflicts
    let res = app
        .call("POST", "/api/enrollments", demo::PARTICIPANTE, Some(json!({ "journey_id": demo::JOURNEY })))
        .await;
    assert_eq!(res.status, StatusCode::CONFLICT);

    let first = complete(&app, demo::PARTICIPANTE, &enrollment, &steps[0]).await;
    assert_eq!(first.status, StatusCode::OK);
    let data = first.data();
    assert_eq!(data["newly_completed"], true);
    assert_eq!(data["enrollment"]["progress"], 33);
    assert_eq!(data["enrollment"]["status"], "in_progress");
    assert_eq!(data["enrollment"]["points_earned"], 10);
    assert_eq!(data["badges_awarded"][0]["name"], "Primeros pasos");

    // Idempotent
    let again = complete(&app, demo::PARTICIPANTE, &enrollment, &steps[0]).await.data();
    assert_eq!(again["newly_completed"], false);
    assert_eq!(again["enrollment"]["points_earned"], 10);
    assert_eq!(again["completion"]["id"], data["completion"]["id"]);

    complete(&app, demo::PARTICIPANTE, &enrollment, &steps[1]).await;
    let done = complete(&app, demo::PARTICIPANTE, &enrollment, &steps[2]).await.data();
    assert_eq!(done["enrollment"]["progress"], 100);
    assert_eq!(done["enrollment"]["status"], "completed");
    assert_eq!(done["enrollment"]["points_earned"], 90);
    assert!(!done["enrollment"]["completed_at"].is_null());

    // The optional step adds points without changing progress
    let bonus = complete(&app, demo::PARTICIPANTE, &enrollment, &steps[3]).await.data();
    assert_eq!(bonus["enrollment"]["progress"], 100);
    assert_eq!(bonus["enrollment"]["points_earned"], 100);
    assert_eq!(bonus["badges_awarded"][0]["name"], "Constante");

    let progress = app
        .get(&format!("/api/enrollments/{}/progress", enrollment), demo::PARTICIPANTE)
        .await
        .data();
    assert_eq!(progress["completed_step_ids"].as_array().unwrap().len(), 4);

    let stats = app.get("/api/gamification/stats", demo::PARTICIPANTE).await.data();
    assert_eq!(stats["total_points"], 100);
    assert_eq!(stats["level"], 2);
    assert_eq!(stats["level_name"], "Aprendiz");
    assert_eq!(stats["journeys_completed"], 1);
    assert_eq!(stats["badges_earned"], 2);
    assert_eq!(stats["rank"], 1);

    let badges = app.get("/api/gamification/badges", demo::PARTICIPANTE).await.data();
    assert_eq!(badges.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn enrollments_are_private_and_droppable() {
    let app = test_app();
    let steps = demo_steps(&app).await;
    let enrollment = enroll(&app, demo::PARTICIPANTE).await;

    let res = app
        .get(&format!("/api/enrollments/{}/progress", enrollment), demo::FACILITADOR)
        .await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);

    let res = app
        .call("POST", &format!("/api/enrollments/{}/drop", enrollment), demo::PARTICIPANTE, None)
        .await;
    assert_eq!(res.data()["status"], "dropped");

    let res = complete(&app, demo::PARTICIPANTE, &enrollment, &steps[0]).await;
    assert_eq!(res.status, StatusCode::CONFLICT);

    let journeys = app.get("/api/journeys", demo::PARTICIPANTE).await.data();
    assert_eq!(journeys[0]["is_enrolled"], false);

    // Enrolling again reactivates the same enrollment
    let again = enroll(&app, demo::PARTICIPANTE).await;
    assert_eq!(again, enrollment);

    let enrolled = app.get("/api/journeys?only_enrolled=true", demo::PARTICIPANTE).await.data();
    assert_eq!(enrolled.as_array().unwrap().len(), 1);

    let list = app.get("/api/enrollments", demo::PARTICIPANTE).await.data();
    assert_eq!(list[0]["journey"]["id"], demo::JOURNEY.to_string());
}

#[tokio::test]
async fn leaderboard_ranks_by_points() {
    let app = test_app();
    let steps = demo_steps(&app).await;

    let leader = enroll(&app, demo::FACILITADOR).await;
    for step in &steps[..3] {
        complete(&app, demo::FACILITADOR, &leader, step).await;
    }
    let follower = enroll(&app, demo::PARTICIPANTE).await;
    complete(&app, demo::PARTICIPANTE, &follower, &steps[0]).await;

    let board = app.get("/api/gamification/leaderboard", demo::PARTICIPANTE).await.data();
    assert_eq!(board[0]["user_id"], demo::FACILITADOR.to_string());
    assert_eq!(board[0]["rank"], 1);
    assert_eq!(board[0]["points"], 90);
    assert_eq!(board[1]["user_id"], demo::PARTICIPANTE.to_string());
    assert_eq!(board[1]["rank"], 2);

    let limited = app.get("/api/gamification/leaderboard?limit=1", demo::PARTICIPANTE).await.data();
    assert_eq!(limited.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn completed_enrollment_survives_drop_and_return() {
    let app = test_app();
    let steps = demo_steps(&app).await;
    let enrollment = enroll(&app, demo::PARTICIPANTE).await;
    for step in &steps[..3] {
        complete(&app, demo::PARTICIPANTE, &enrollment, step).await;
    }

    app.call("POST", &format!("/api/enrollments/{}/drop", enrollment), demo::PARTICIPANTE, None)
        .await;
    let res = app
        .call("POST", "/api/enrollments", demo::PARTICIPANTE, Some(json!({ "journey_id": demo::JOURNEY })))
        .await;
    assert_eq!(res.status, StatusCode::CREATED);

    let back = res.data();
    assert_eq!(back["id"], enrollment);
    assert_eq!(back["status"], "completed");
    assert_eq!(back["progress"], 100);
    assert_eq!(back["completed_steps"], 3);
    assert!(!back["completed_at"].is_null());

    let stats = app.get("/api/gamification/stats", demo::PARTICIPANTE).await.data();
    assert_eq!(stats["journeys_completed"], 1);
}

#[tokio::test]
async fn removing_a_step_recounts_enrollments() {
    let app = test_app();
    let steps = demo_steps(&app).await;
    let enrollment = enroll(&app, demo::PARTICIPANTE).await;
    complete(&app, demo::PARTICIPANTE, &enrollment, &steps[0]).await;
    complete(&app, demo::PARTICIPANTE, &enrollment, &steps[1]).await;

    let uri = format!("/api/journeys/{}/steps/{}", demo::JOURNEY, steps[2]["id"].as_str().unwrap());
    let res = app.call("DELETE", &uri, demo::FACILITADOR, None).await;
    assert_eq!(res.status, StatusCode::NO_CONTENT);

    let progress = app
        .get(&format!("/api/enrollments/{}/progress", enrollment), demo::PARTICIPANTE)
        .await
        .data();
    assert_eq!(progress["enrollment"]["status"], "completed");
    assert_eq!(progress["enrollment"]["progress"], 100);
    assert_eq!(progress["enrollment"]["total_steps"], 2);

    // A new required step reopens it
    let res = app
        .call(
            "POST",
            &format!("/api/journeys/{}/steps", demo::JOURNEY),
            demo::FACILITADOR,
            Some(json!({ "title": "Cierre", "points": 20 })),
        )
        .await;
    assert_eq!(res.status, StatusCode::CREATED);

    let progress = app
        .get(&format!("/api/enrollments/{}/progress", enrollment), demo::PARTICIPANTE)
        .await
        .data();
    assert_eq!(progress["enrollment"]["status"], "in_progress");
    assert_eq!(progress["enrollment"]["progress"], 67);
    assert!(progress["enrollment"]["completed_at"].is_null());
}

#[tokio::test]
async fn facilitators_edit_and_reorder_steps() {
    let app = test_app();
    let steps = demo_steps(&app).await;
    let id = |n: usize| steps[n]["id"].as_str().unwrap().to_string();
    let step_uri = format!("/api/journeys/{}/steps/{}", demo::JOURNEY, id(3));

    let res = app.call("PATCH", &step_uri, demo::PARTICIPANTE, Some(json!({ "title": "X" }))).await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);

    let res = app
        .call("PATCH", &step_uri, demo::FACILITADOR, Some(json!({ "is_required": true, "points": 30 })))
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.data()["title"], steps[3]["title"]);
    assert_eq!(res.data()["points"], 30);

    let journey = app.get(&format!("/api/journeys/{}", demo::JOURNEY), demo::FACILITADOR).await.data();
    assert_eq!(journey["total_points"], 120);

    let reorder_uri = format!("/api/journeys/{}/steps/reorder", demo::JOURNEY);
    let res = app
        .call("PATCH", &reorder_uri, demo::FACILITADOR, Some(json!({ "step_order": [id(0), id(1)] })))
        .await;
    assert_eq!(res.status, StatusCode::UNPROCESSABLE_ENTITY);

    let order = json!([id(3), id(2), id(1), id(0)]);
    let res = app
        .call("PATCH", &reorder_uri, demo::FACILITADOR, Some(json!({ "step_order": order })))
        .await;
    assert_eq!(res.status, StatusCode::OK, "{}", res.text);

    let reordered: Vec<Value> = demo_steps(&app).await.iter().map(|s| s["id"].clone()).collect();
    assert_eq!(Value::Array(reordered), order);
}

#[tokio::test]
async fn admins_enroll_members_and_read_the_roster() {
    let app = test_app();
    let roster_uri = format!("/api/journeys/{}/enrollments", demo::JOURNEY);

    let res = app
        .call("POST", &roster_uri, demo::FACILITADOR, Some(json!({ "user_id": demo::PARTICIPANTE })))
        .await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);

    let stranger = app.store.seed_profile("externa@oasis.cl", "Externa", false).await;
    let res = app.call("POST", &roster_uri, demo::ADMIN, Some(json!({ "user_id": stranger.id }))).await;
    assert_eq!(res.status, StatusCode::UNPROCESSABLE_ENTITY);

    let res = app
        .call("POST", &roster_uri, demo::ADMIN, Some(json!({ "user_id": demo::PARTICIPANTE })))
        .await;
    assert_eq!(res.status, StatusCode::CREATED);
    assert_eq!(res.data()["user_id"], demo::PARTICIPANTE.to_string());

    let res = app.get(&roster_uri, demo::PARTICIPANTE).await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);

    let roster = app.get(&roster_uri, demo::FACILITADOR).await.data();
    let roster = roster.as_array().unwrap();
    assert_eq!(roster.len(), 1);
    assert_eq!(roster[0]["user"]["full_name"], "Diego Muñoz");
    assert_eq!(roster[0]["status"], "enrolled");
}

#[tokio::test]
async fn badge_catalogue_is_visible_to_members() {
    let app = test_app();
    let badges = app.get("/api/badges", demo::PARTICIPANTE).await.data();
    let badges = badges.as_array().unwrap();
    assert_eq!(badges.len(), 3);
    assert_eq!(badges[0]["points_required"], 10);
}
