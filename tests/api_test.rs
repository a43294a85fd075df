//! HTTP-level tests: the route table, session handling, role guards and
//! the JSON envelope, driven through `actix_web::test`.

#[macro_use]
mod common;

use actix_web::http::{StatusCode, header};
use actix_web::test::{self, TestRequest};
use serde_json::{Value, json};

use ledgerdesk::models::user::Role;
use common::*;

#[actix_web::test]
async fn test_health_and_unknown_route() {
    let db = setup_test_db().await;
    let app = test_app!(db);

    let resp = test::call_service(&app, TestRequest::get().uri("/health").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "ok");

    let resp = test::call_service(&app, TestRequest::get().uri("/no/such/page").to_request()).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Endpoint not found");
}

#[actix_web::test]
async fn test_protected_routes_need_a_session() {
    let db = setup_test_db().await;
    let app = test_app!(db);

    for uri in ["/api/users", "/api/invoices", "/api/dashboard/stats", "/api/documents"] {
        let resp = test::call_service(&app, TestRequest::get().uri(uri).to_request()).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED, "{uri}");
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], "Authentication required");
    }
}

#[actix_web::test]
async fn test_admin_login_and_user_listing() {
    let db = setup_test_db().await;
    let app = test_app!(db);

    let req = TestRequest::post()
        .uri("/api/auth/login")
        .set_json(json!({ "username": ADMIN_USER, "password": ADMIN_PASS }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["redirect"], "dashboard.html");
    assert_eq!(body["data"]["user"]["role"], "Admin");

    let cookie = login!(app, ADMIN_USER, ADMIN_PASS);
    let req = TestRequest::get()
        .uri("/api/users?page=1&limit=500")
        .cookie(cookie.clone())
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["pagination"]["total"], 1);
    assert_eq!(body["pagination"]["per_page"], 100, "limit is clamped");
    assert_eq!(body["data"][0]["username"], ADMIN_USER);
    assert!(body["data"][0].get("password").is_none());

    let req = TestRequest::get().uri("/api/auth/current-user").cookie(cookie).to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["username"], ADMIN_USER);
}

#[actix_web::test]
async fn test_wrong_password_then_rate_limit() {
    let db = setup_test_db().await;
    let app = test_app!(db);

    for _ in 0..3 {
        let req = TestRequest::post()
            .uri("/api/auth/login")
            .set_json(json!({ "username": ADMIN_USER, "password": "wrong-password" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], "Invalid credentials");
    }

    let req = TestRequest::post()
        .uri("/api/auth/login")
        .set_json(json!({ "username": ADMIN_USER, "password": ADMIN_PASS }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[actix_web::test]
async fn test_register_then_client_is_kept_out_of_staff_routes() {
    let db = setup_test_db().await;
    let app = test_app!(db);

    let req = TestRequest::post()
        .uri("/api/auth/register")
        .set_json(json!({
            "username": "newclient",
            "email": "newclient@example.com",
            "password": "secret1",
            "full_name": "New Client",
            "role": "Admin"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let req = TestRequest::post()
        .uri("/api/auth/register")
        .set_json(json!({ "username": "x", "email": "x@example.com", "password": "secret1" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "Field full_name is required");

    let req = TestRequest::post()
        .uri("/api/auth/register")
        .set_json(json!({
            "username": "other",
            "email": "newclient@example.com",
            "password": "secret1",
            "full_name": "Other"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let req = TestRequest::post()
        .uri("/api/auth/login")
        .set_json(json!({ "username": "newclient@example.com", "password": "secret1" }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["user"]["role"], "Client");
    assert_eq!(body["data"]["redirect"], "client-dashboard.html");

    let cookie = login!(app, "newclient", "secret1");
    for uri in ["/api/users", "/api/transactions", "/api/dashboard/stats"] {
        let req = TestRequest::get().uri(uri).cookie(cookie.clone()).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN, "{uri}");
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], "Insufficient permissions");
    }
}

#[actix_web::test]
async fn test_mutations_require_json_content_type() {
    let db = setup_test_db().await;
    let app = test_app!(db);
    let cookie = login!(app, ADMIN_USER, ADMIN_PASS);

    let req = TestRequest::post()
        .uri("/api/departments")
        .cookie(cookie)
        .insert_header((header::CONTENT_TYPE, "application/x-www-form-urlencoded"))
        .set_payload("name=Tax")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn test_user_admin_rules() {
    let db = setup_test_db().await;
    let app = test_app!(db);
    let pool = db.pool();
    insert_user(pool, "coadmin", Role::CoAdmin, "secret1").await;
    let admin = admin_id(pool).await;

    let admin_cookie = login!(app, ADMIN_USER, ADMIN_PASS);
    let req = TestRequest::delete()
        .uri(&format!("/api/users/{admin}"))
        .cookie(admin_cookie.clone())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "no self delete");

    let co_cookie = login!(app, "coadmin", "secret1");
    let req = TestRequest::post()
        .uri("/api/users")
        .cookie(co_cookie.clone())
        .set_json(json!({
            "username": "promoted",
            "email": "promoted@example.com",
            "password": "secret1",
            "full_name": "Promoted",
            "role": "Admin"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN, "only an Admin grants Admin");

    let req = TestRequest::post()
        .uri("/api/users")
        .cookie(co_cookie.clone())
        .set_json(json!({
            "username": "bookkeeper",
            "email": "bookkeeper@example.com",
            "password": "secret1",
            "full_name": "Book Keeper"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    let new_id = body["data"]["user_id"].as_i64().expect("user_id");

    let req = TestRequest::put()
        .uri(&format!("/api/users/{new_id}"))
        .cookie(co_cookie.clone())
        .set_json(json!({}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "No valid fields to update");

    let req = TestRequest::put()
        .uri(&format!("/api/users/{new_id}"))
        .cookie(co_cookie.clone())
        .set_json(json!({ "email": "coadmin@example.com" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let req = TestRequest::delete()
        .uri(&format!("/api/users/{new_id}"))
        .cookie(co_cookie.clone())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = TestRequest::get().uri("/api/users/999999").cookie(co_cookie).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_transaction_validation_collects_errors() {
    let db = setup_test_db().await;
    let app = test_app!(db);
    let cookie = login!(app, ADMIN_USER, ADMIN_PASS);

    let req = TestRequest::post()
        .uri("/api/transactions")
        .cookie(cookie.clone())
        .set_json(json!({ "amount": -5 }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["errors"].as_array().map(Vec::len), Some(4));

    let req = TestRequest::post()
        .uri("/api/transactions")
        .cookie(cookie.clone())
        .set_json(json!({
            "date": "2024-02-01",
            "account": "Service Revenue",
            "description": "Consulting",
            "type": "Credit",
            "amount": "1250.50"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    let id = body["data"]["id"].as_i64().expect("id");

    let req = TestRequest::get()
        .uri(&format!("/api/transactions/{id}"))
        .cookie(cookie)
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["amount"], 1250.5);
    assert_eq!(body["data"]["type"], "Credit");
    assert_eq!(body["data"]["status"], "Posted");
}

#[actix_web::test]
async fn test_reports_and_csv_export() {
    let db = setup_test_db().await;
    let app = test_app!(db);
    let pool = db.pool();
    insert_txn(
        pool,
        "2024-03-01",
        "Service Revenue",
        ledgerdesk::models::transaction::TxnType::Credit,
        50_000,
        ledgerdesk::models::transaction::TxnStatus::Posted,
    )
    .await;
    let cookie = login!(app, ADMIN_USER, ADMIN_PASS);

    let req = TestRequest::get()
        .uri("/api/reports?type=cashflow")
        .cookie(cookie.clone())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = TestRequest::get()
        .uri("/api/reports?type=income&start=2024-01-01&end=2024-12-31")
        .cookie(cookie.clone())
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["title"], "Income Statement");
    assert_eq!(body["data"]["totals"]["net"], 500.0);

    let req = TestRequest::get()
        .uri("/api/reports/export?type=income")
        .cookie(cookie)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let disposition = resp
        .headers()
        .get(header::CONTENT_DISPOSITION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert_eq!(disposition, "attachment; filename=\"income_statement.csv\"");
    let body = test::read_body(resp).await;
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.starts_with("Income Statement\nItem,Value\nRevenue,500.00\n"));

    assert_eq!(
        ledgerdesk::models::report::count_since(pool, "2000-01-01 00:00:00").await.unwrap(),
        2
    );
}

#[actix_web::test]
async fn test_invoice_flow_between_staff_and_client() {
    let db = setup_test_db().await;
    let app = test_app!(db);
    let pool = db.pool();
    let client_user = insert_user(pool, "payee", Role::Client, CLIENT_PASS).await;
    let client_id = insert_client(pool, client_user, "Payee Ltd").await;

    let admin_cookie = login!(app, ADMIN_USER, ADMIN_PASS);
    let req = TestRequest::post()
        .uri("/api/invoices")
        .cookie(admin_cookie)
        .set_json(json!({
            "client_user_id": client_user,
            "client_id": client_id,
            "description": "Annual accounts",
            "due_date": "2099-06-30",
            "tax_amount": 20,
            "items": [{ "description": "Year-end", "quantity": 2, "unit_price": "50.00" }]
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    let invoice_id = body["data"]["invoice_id"].as_i64().expect("invoice_id");

    let client_cookie = login!(app, "payee", CLIENT_PASS);

    let req = TestRequest::post()
        .uri("/api/invoices")
        .cookie(client_cookie.clone())
        .set_json(json!({ "client_user_id": client_user, "due_date": "2099-01-01", "items": [] }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let req = TestRequest::get().uri("/api/invoices").cookie(client_cookie.clone()).to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"].as_array().map(Vec::len), Some(1));
    assert_eq!(body["data"][0]["total_amount"], 120.0);
    assert_eq!(body["data"][0]["company_name"], "Payee Ltd");

    let req = TestRequest::get()
        .uri(&format!("/api/invoices/{invoice_id}"))
        .cookie(client_cookie.clone())
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["items"][0]["unit_price"], 50.0);

    let pay = |payload: Value| {
        TestRequest::post()
            .uri("/api/invoices/pay")
            .cookie(client_cookie.clone())
            .set_json(payload)
            .to_request()
    };

    let resp = test::call_service(&app, pay(json!({}))).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "Invoice ID required");

    let resp = test::call_service(&app, pay(json!({ "invoice_id": invoice_id }))).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let resp = test::call_service(&app, pay(json!({ "invoice_id": invoice_id }))).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let resp = test::call_service(&app, pay(json!({ "invoice_id": 424242 }))).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_feedback_is_public() {
    let db = setup_test_db().await;
    let app = test_app!(db);

    let req = TestRequest::post()
        .uri("/api/feedback")
        .set_json(json!({ "name": "Ann", "rating": 9, "message": "Great" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "Rating must be between 1 and 5");

    let req = TestRequest::post()
        .uri("/api/feedback")
        .insert_header((header::USER_AGENT, "feedback-test"))
        .set_json(json!({ "name": "Ann", "email": "ann@example.com", "rating": 5, "message": "Great" }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert!(body["data"]["feedback_id"].as_i64().is_some());
    assert_eq!(body["data"]["stats"]["total_feedback"], 1);

    let body: Value =
        test::call_and_read_body_json(&app, TestRequest::get().uri("/api/feedback").to_request()).await;
    assert_eq!(body["data"]["stats"]["satisfied_clients"], 1);
}

#[actix_web::test]
async fn test_dashboard_activity_records_logins() {
    let db = setup_test_db().await;
    let app = test_app!(db);
    let cookie = login!(app, ADMIN_USER, ADMIN_PASS);

    let req = TestRequest::get().uri("/api/dashboard/activity").cookie(cookie.clone()).to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"][0]["action"], "User 'admin' logged in");
    assert_eq!(body["data"][0]["username"], ADMIN_USER);

    let req = TestRequest::get().uri("/api/dashboard/status").cookie(cookie).to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["report_engine"]["description"], "No reports generated");
}

#[actix_web::test]
async fn test_logout_ends_session() {
    let db = setup_test_db().await;
    let app = test_app!(db);
    let cookie = login!(app, ADMIN_USER, ADMIN_PASS);

    let req = TestRequest::post().uri("/api/auth/logout").cookie(cookie).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let cleared = resp
        .response()
        .cookies()
        .find(|c| c.name() == "id")
        .expect("removal cookie")
        .into_owned();

    let req = TestRequest::get().uri("/api/users").cookie(cleared).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn test_expired_session_is_rejected_everywhere() {
    let db = setup_test_db().await;
    let config = ledgerdesk::config::AppConfig {
        session_timeout_secs: 0,
        ..ledgerdesk::config::AppConfig::default()
    };
    let app = test_app!(db, config);
    let cookie = login!(app, ADMIN_USER, ADMIN_PASS);

    tokio::time::sleep(std::time::Duration::from_millis(1100)).await;

    for uri in ["/api/auth/current-user", "/api/users"] {
        let req = TestRequest::get().uri(uri).cookie(cookie.clone()).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED, "{uri}");
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], "Session expired", "{uri}");
    }
}

#[actix_web::test]
async fn test_current_user_without_session() {
    let db = setup_test_db().await;
    let app = test_app!(db);

    let req = TestRequest::get().uri("/api/auth/current-user").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn test_department_routes() {
    let db = setup_test_db().await;
    let app = test_app!(db);
    let cookie = login!(app, ADMIN_USER, ADMIN_PASS);

    let req = TestRequest::post()
        .uri("/api/departments")
        .cookie(cookie.clone())
        .set_json(json!({ "description": "No name" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = TestRequest::post()
        .uri("/api/departments")
        .cookie(cookie.clone())
        .set_json(json!({ "name": "Payroll", "description": "Monthly salaries" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    let id = body["data"]["id"].as_i64().expect("id");

    let req = TestRequest::get()
        .uri("/api/departments?q=salar")
        .cookie(cookie.clone())
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"].as_array().map(Vec::len), Some(1));
    assert_eq!(body["data"][0]["status"], "Active");

    let req = TestRequest::put()
        .uri(&format!("/api/departments/{id}"))
        .cookie(cookie.clone())
        .set_json(json!({ "status": "Inactive" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = TestRequest::get()
        .uri(&format!("/api/departments/{id}"))
        .cookie(cookie.clone())
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["name"], "Payroll");
    assert_eq!(body["data"]["status"], "Inactive");

    let req = TestRequest::delete()
        .uri(&format!("/api/departments/{id}"))
        .cookie(cookie.clone())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = TestRequest::get()
        .uri(&format!("/api/departments/{id}"))
        .cookie(cookie)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "Department not found");
}

#[actix_web::test]
async fn test_account_routes() {
    let db = setup_test_db().await;
    let app = test_app!(db);
    let cookie = login!(app, ADMIN_USER, ADMIN_PASS);

    let create = |payload: Value| {
        TestRequest::post()
            .uri("/api/accounts")
            .cookie(cookie.clone())
            .set_json(payload)
            .to_request()
    };

    let resp = test::call_service(&app, create(json!({ "code": "1000", "name": "Cash" }))).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["errors"][0], "Account type is required");

    let resp = test::call_service(
        &app,
        create(json!({ "code": "1000", "name": "Cash", "type": "Asset" })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    let id = body["data"]["id"].as_i64().expect("id");

    let resp = test::call_service(
        &app,
        create(json!({ "code": "1000", "name": "Petty Cash", "type": "Asset" })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let resp = test::call_service(
        &app,
        create(json!({ "code": "4000", "name": "Fees", "type": "Revenue" })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let req = TestRequest::get()
        .uri("/api/accounts?type=Asset")
        .cookie(cookie.clone())
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"].as_array().map(Vec::len), Some(1));
    assert_eq!(body["data"][0]["type"], "Asset");

    let req = TestRequest::put()
        .uri(&format!("/api/accounts/{id}"))
        .cookie(cookie.clone())
        .set_json(json!({ "name": "Cash at Bank" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = TestRequest::get()
        .uri(&format!("/api/accounts/{id}"))
        .cookie(cookie.clone())
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["name"], "Cash at Bank");
    assert_eq!(body["data"]["code"], "1000");

    let req = TestRequest::delete()
        .uri(&format!("/api/accounts/{id}"))
        .cookie(cookie.clone())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = TestRequest::get()
        .uri(&format!("/api/accounts/{id}"))
        .cookie(cookie)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_client_routes_are_staff_only() {
    let db = setup_test_db().await;
    let app = test_app!(db);
    let pool = db.pool();
    let linked = insert_user(pool, "linked", Role::Client, CLIENT_PASS).await;
    let cookie = login!(app, ADMIN_USER, ADMIN_PASS);

    let create = |payload: Value| {
        TestRequest::post()
            .uri("/api/clients")
            .cookie(cookie.clone())
            .set_json(payload)
            .to_request()
    };

    let resp = test::call_service(&app, create(json!({ "contact_person": "Nobody" }))).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = test::call_service(&app, create(json!({ "company_name": "Ghost Ltd", "user_id": 999 }))).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "Linked user not found");

    let resp = test::call_service(
        &app,
        create(json!({
            "company_name": "Linked Ltd",
            "contact_person": "Lin Ked",
            "email": "books@linked.example.com",
            "user_id": linked
        })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let req = TestRequest::get().uri("/api/clients").cookie(cookie).to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"].as_array().map(Vec::len), Some(1));
    assert_eq!(body["data"][0]["company_name"], "Linked Ltd");
    assert_eq!(body["data"][0]["user_id"], linked);

    let client_cookie = login!(app, "linked", CLIENT_PASS);
    let req = TestRequest::get().uri("/api/clients").cookie(client_cookie).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn test_task_routes_and_assignee_rules() {
    let db = setup_test_db().await;
    let app = test_app!(db);
    let pool = db.pool();
    let worker = insert_user(pool, "worker", Role::Client, CLIENT_PASS).await;
    insert_user(pool, "bystander", Role::Client, CLIENT_PASS).await;
    let admin_cookie = login!(app, ADMIN_USER, ADMIN_PASS);

    let create = |payload: Value| {
        TestRequest::post()
            .uri("/api/tasks")
            .cookie(admin_cookie.clone())
            .set_json(payload)
            .to_request()
    };

    let resp = test::call_service(&app, create(json!({ "title": "t", "assigned_to": 999 }))).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "Assigned user not found");

    let resp = test::call_service(
        &app,
        create(json!({ "title": "Send bank statements", "assigned_to": worker, "due_date": "2099-01-31" })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    let task_id = body["data"]["id"].as_i64().expect("id");

    let resp = test::call_service(&app, create(json!({ "title": "Internal review" }))).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let worker_cookie = login!(app, "worker", CLIENT_PASS);
    let req = TestRequest::get().uri("/api/tasks").cookie(worker_cookie.clone()).to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"].as_array().map(Vec::len), Some(1));
    assert_eq!(body["data"][0]["title"], "Send bank statements");

    let req = TestRequest::post()
        .uri("/api/tasks")
        .cookie(worker_cookie.clone())
        .set_json(json!({ "title": "Self-assigned" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let bystander_cookie = login!(app, "bystander", CLIENT_PASS);
    let req = TestRequest::put()
        .uri(&format!("/api/tasks/{task_id}"))
        .cookie(bystander_cookie)
        .set_json(json!({ "status": "completed" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let req = TestRequest::put()
        .uri(&format!("/api/tasks/{task_id}"))
        .cookie(worker_cookie.clone())
        .set_json(json!({}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = TestRequest::put()
        .uri(&format!("/api/tasks/{task_id}"))
        .cookie(worker_cookie.clone())
        .set_json(json!({ "status": "completed" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = TestRequest::get().uri("/api/tasks").cookie(admin_cookie.clone()).to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let tasks = body["data"].as_array().expect("tasks");
    assert_eq!(tasks.len(), 2);
    let done = tasks.iter().find(|t| t["id"] == task_id).expect("task");
    assert_eq!(done["status"], "completed");
}

#[actix_web::test]
async fn test_invoice_create_rejects_foreign_client_and_exports_csv() {
    let db = setup_test_db().await;
    let app = test_app!(db);
    let pool = db.pool();
    let owner = insert_user(pool, "exporter", Role::Client, CLIENT_PASS).await;
    let other = insert_user(pool, "outsider", Role::Client, CLIENT_PASS).await;
    let owner_client = insert_client(pool, owner, "Exporter Ltd").await;
    let other_client = insert_client(pool, other, "Outsider Ltd").await;
    let admin_cookie = login!(app, ADMIN_USER, ADMIN_PASS);

    let create = |client_user_id: i64, client_id: i64, description: &str| {
        TestRequest::post()
            .uri("/api/invoices")
            .cookie(admin_cookie.clone())
            .set_json(json!({
                "client_user_id": client_user_id,
                "client_id": client_id,
                "description": description,
                "due_date": "2099-03-31",
                "items": [{ "description": "Quarterly VAT", "unit_price": 80 }]
            }))
            .to_request()
    };

    for client_id in [999, other_client] {
        let resp = test::call_service(&app, create(owner, client_id, "Bad")).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "client {client_id}");
    }
    let resp = test::call_service(&app, create(owner, owner_client, "Q1 VAT")).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let resp = test::call_service(&app, create(other, other_client, "Outsider VAT")).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let req = TestRequest::get().uri("/api/invoices/export").cookie(admin_cookie.clone()).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let disposition = resp
        .headers()
        .get(header::CONTENT_DISPOSITION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert_eq!(disposition, "attachment; filename=\"invoices.csv\"");
    let text = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
    assert_eq!(text.lines().count(), 3, "header plus two invoices");

    let owner_cookie = login!(app, "exporter", CLIENT_PASS);
    let req = TestRequest::get().uri("/api/invoices/export").cookie(owner_cookie).to_request();
    let text = String::from_utf8(test::call_and_read_body(&app, req).await.to_vec()).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "Invoice Number,Description,Amount,Status,Due Date,Created Date");
    assert_eq!(lines.len(), 2);
    assert!(lines[1].contains(",Q1 VAT,80.00,Pending,2099-03-31,"), "{}", lines[1]);
}

#[actix_web::test]
async fn test_cors_preflight_allows_configured_origin_and_headers() {
    let app = test::init_service(
        actix_web::App::new()
            .wrap(ledgerdesk::handlers::cors(Some("https://books.example.com")))
            .route(
                "/api/ping",
                actix_web::web::post().to(|| async { actix_web::HttpResponse::Ok().finish() }),
            ),
    )
    .await;

    let preflight = |origin: &str, headers: &str| {
        TestRequest::default()
            .method(actix_web::http::Method::OPTIONS)
            .uri("/api/ping")
            .insert_header((header::ORIGIN, origin.to_string()))
            .insert_header((header::ACCESS_CONTROL_REQUEST_METHOD, "POST"))
            .insert_header((header::ACCESS_CONTROL_REQUEST_HEADERS, headers.to_string()))
            .to_request()
    };

    let resp = test::call_service(
        &app,
        preflight("https://books.example.com", "content-type,x-requested-with"),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let allowed = resp
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_HEADERS)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase();
    assert!(allowed.contains("x-requested-with"), "{allowed}");
    assert_eq!(
        resp.headers().get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS).map(|v| v.as_bytes()),
        Some(&b"true"[..])
    );

    let resp = test::call_service(&app, preflight("https://evil.example.com", "content-type")).await;
    assert!(resp.status().is_client_error());
}
