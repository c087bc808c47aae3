mod common;

use anyhow::Result;
use axum::http::{Method, StatusCode};
use common::{acquire_db_lock, decimal, read_json, Fixture, TestApp, PNG_BYTES};
use diesel::prelude::*;
use dispatch_ledger::schema::{dispatch_receipts, dispatches};
use rust_decimal_macros::dec;
use serde_json::{json, Value};

async fn create_dispatch(app: &TestApp, fixture: &Fixture, status: &str) -> Result<i64> {
    let body = json!({
        "vehicle_id": fixture.vehicle_id,
        "delivery_location_id": fixture.location_id,
        "slip_no": "S-42",
        "loader_charges": "500",
        "labor_charges": "300",
        "transporter_rate": "200",
        "status": status,
        "bucket_vendor_id": fixture.loader_vendor_id,
        "labour_vendor_id": fixture.labour_vendor_id
    });
    let (status, body) =
        read_json(app.post_json("/api/dispatches", &body, Some(&app.token)).await?).await?;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    Ok(body["data"]["id"].as_i64().expect("dispatch id"))
}

fn receipt_body(dispatch_id: i64, vendor_id: i64) -> Value {
    json!({
        "dispatch_id": dispatch_id,
        "vendor_id": vendor_id,
        "slip_no": "R-42",
        "gross_weight": "30",
        "tare_weight": "10",
        "net_weight": "20",
        "amount_gross": "10000",
        "penalty_amount": "500",
        "other_deduction": "0",
        "advances_applied": "0"
    })
}

async fn dispatch_status(app: &TestApp, dispatch_id: i64) -> Result<String> {
    app.with_conn(move |conn| {
        Ok(dispatches::table
            .find(dispatch_id)
            .select(dispatches::status)
            .first(conn)?)
    })
    .await
}

async fn receipt_count(app: &TestApp) -> Result<i64> {
    app.with_conn(|conn| Ok(dispatch_receipts::table.count().get_result(conn)?))
        .await
}

#[tokio::test]
async fn creating_a_receipt_marks_the_dispatch_received() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;
    let fixture = app.seed_fixture().await?;

    for prior in ["Pending", "Completed"] {
        let dispatch_id = create_dispatch(&app, &fixture, prior).await?;
        assert_eq!(dispatch_status(&app, dispatch_id).await?, prior);

        let (status, body) = read_json(
            app.post_json(
                "/api/dispatch-receipts",
                &receipt_body(dispatch_id, fixture.transporter_vendor_id),
                Some(&app.token),
            )
            .await?,
        )
        .await?;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        assert_eq!(decimal(&body["data"]["amount_payable"]), dec!(9500));
        assert_eq!(dispatch_status(&app, dispatch_id).await?, "Received");

        let receipt_id = body["data"]["id"].as_i64().expect("receipt id");
        let (status, view) = read_json(
            app.get(&format!("/api/dispatch-receipts/{receipt_id}"), Some(&app.token))
                .await?,
        )
        .await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(view["data"]["status"], "Received");
        assert_eq!(decimal(&view["data"]["total_paid"]), dec!(0));
        assert_eq!(decimal(&view["data"]["original_payable"]), dec!(9500));
        assert!(view["data"]["posted_at"].is_null());
    }

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn invalid_references_are_rejected_before_any_write() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;
    let fixture = app.seed_fixture().await?;
    let dispatch_id = create_dispatch(&app, &fixture, "Pending").await?;
    let inactive_vendor = app.seed_vendor("Retired Carrier", false, false, false).await?;

    let mut missing_vehicle = receipt_body(dispatch_id, fixture.transporter_vendor_id);
    missing_vehicle["vehicle_id"] = json!(424242);

    let cases = [
        (receipt_body(999_999, fixture.transporter_vendor_id), "dispatch 999999"),
        (receipt_body(dispatch_id, 999_999), "vendor 999999"),
        (receipt_body(dispatch_id, inactive_vendor), "not active"),
        (missing_vehicle, "vehicle 424242"),
    ];

    for (body, expected) in cases {
        let (status, response) = read_json(
            app.post_json("/api/dispatch-receipts", &body, Some(&app.token))
                .await?,
        )
        .await?;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{response}");
        assert_eq!(response["success"], false);
        let message = response["message"].as_str().unwrap_or_default();
        assert!(message.contains(expected), "{message}");
    }

    assert_eq!(receipt_count(&app).await?, 0);
    assert_eq!(dispatch_status(&app, dispatch_id).await?, "Pending");

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn explicit_payable_is_bounded_by_gross() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;
    let fixture = app.seed_fixture().await?;
    let dispatch_id = create_dispatch(&app, &fixture, "Pending").await?;

    let mut body = receipt_body(dispatch_id, fixture.transporter_vendor_id);
    body["amount_payable"] = json!("12000");
    let response = app
        .post_json("/api/dispatch-receipts", &body, Some(&app.token))
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    body["amount_payable"] = json!("9000");
    let (status, created) =
        read_json(app.post_json("/api/dispatch-receipts", &body, Some(&app.token)).await?).await?;
    assert_eq!(status, StatusCode::CREATED, "{created}");
    assert_eq!(decimal(&created["data"]["amount_payable"]), dec!(9000));

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn slip_upload_is_validated_and_stored() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;
    let fixture = app.seed_fixture().await?;
    let dispatch_id = create_dispatch(&app, &fixture, "Pending").await?;
    let payload = receipt_body(dispatch_id, fixture.transporter_vendor_id);

    let (status, body) = read_json(
        app.send_multipart(
            Method::POST,
            "/api/dispatch-receipts",
            &payload,
            Some(("weighbridge.gif", b"GIF89a".as_slice())),
            &app.token,
        )
        .await?,
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap_or_default().contains("gif"));

    let (status, _) = read_json(
        app.send_multipart(
            Method::POST,
            "/api/dispatch-receipts",
            &payload,
            Some(("weighbridge.png", b"%PDF-1.4 not a png".as_slice())),
            &app.token,
        )
        .await?,
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(app.storage().object_count().await, 0);
    assert_eq!(receipt_count(&app).await?, 0);

    let (status, body) = read_json(
        app.send_multipart(
            Method::POST,
            "/api/dispatch-receipts",
            &payload,
            Some(("Weighbridge.PNG", PNG_BYTES)),
            &app.token,
        )
        .await?,
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let key = body["data"]["slip_image_path"]
        .as_str()
        .expect("slip key")
        .to_string();
    assert!(key.starts_with("slips/") && key.ends_with(".png"), "{key}");

    let stored = app.storage().get(&key).await.expect("stored slip");
    assert_eq!(stored.bytes, PNG_BYTES);
    assert_eq!(stored.content_type.as_deref(), Some("image/png"));

    let receipt_id = body["data"]["id"].as_i64().expect("receipt id");
    let (status, body) = read_json(
        app.get(&format!("/api/dispatch-receipts/{receipt_id}/slip"), Some(&app.token))
            .await?,
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["url"].as_str().unwrap_or_default().contains(&key));

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn update_stamps_posted_at_once() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;
    let fixture = app.seed_fixture().await?;
    let dispatch_id = create_dispatch(&app, &fixture, "Pending").await?;

    let (_, created) = read_json(
        app.post_json(
            "/api/dispatch-receipts",
            &receipt_body(dispatch_id, fixture.transporter_vendor_id),
            Some(&app.token),
        )
        .await?,
    )
    .await?;
    let receipt_id = created["data"]["id"].as_i64().expect("receipt id");
    let path = format!("/api/dispatch-receipts/{receipt_id}");

    let mut update = receipt_body(dispatch_id, fixture.transporter_vendor_id);
    update["status"] = json!("Posted");
    update["remarks"] = json!("checked at gate");
    let (status, first) = read_json(app.put_json(&path, &update, Some(&app.token)).await?).await?;
    assert_eq!(status, StatusCode::OK, "{first}");
    assert_eq!(first["data"]["status"], "Posted");
    let stamped = first["data"]["posted_at"].clone();
    assert!(stamped.is_string());

    update["penalty_amount"] = json!("1000");
    let (status, second) = read_json(app.put_json(&path, &update, Some(&app.token)).await?).await?;
    assert_eq!(status, StatusCode::OK, "{second}");
    assert_eq!(second["data"]["posted_at"], stamped);
    assert_eq!(decimal(&second["data"]["amount_payable"]), dec!(9000));
    assert_eq!(second["data"]["remarks"], "checked at gate");

    update["status"] = json!("Received");
    let (status, reopened) = read_json(app.put_json(&path, &update, Some(&app.token)).await?).await?;
    assert_eq!(status, StatusCode::OK, "{reopened}");
    assert_eq!(reopened["data"]["status"], "Received");
    assert_eq!(reopened["data"]["posted_at"], stamped);

    update["status"] = json!("Posted");
    let (status, reposted) = read_json(app.put_json(&path, &update, Some(&app.token)).await?).await?;
    assert_eq!(status, StatusCode::OK, "{reposted}");
    assert_eq!(reposted["data"]["status"], "Posted");
    assert_eq!(reposted["data"]["posted_at"], stamped);

    update["status"] = json!("Completed");
    let response = app.put_json(&path, &update, Some(&app.token)).await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .put_json("/api/dispatch-receipts/999999", &update, Some(&app.token))
        .await?;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let mut bad_reference = receipt_body(dispatch_id, 999_999);
    bad_reference["status"] = json!("Posted");
    let response = app.put_json(&path, &bad_reference, Some(&app.token)).await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn unknown_receipt_returns_not_found() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;

    let (status, body) =
        read_json(app.get("/api/dispatch-receipts/31337", Some(&app.token)).await?).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);

    app.cleanup().await?;
    Ok(())
}
