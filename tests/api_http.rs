// tests/api_http.rs
//
// HTTP-level tests for the public API Router without opening sockets.
// We exercise the router directly via tower::ServiceExt::oneshot.
//
// Covered:
// - GET /health
// - POST /assess (supplied probability, injected source, invalid probability)
// - POST /predict (form fields with aliases, parameters added by config)
// - GET /config/ranges

use std::sync::Arc;

use serde_json::json;
use serde_json::Value as Json;
use shuttle_axum::axum::{
    body::{self, Body},
    http::{Request, StatusCode},
    Router,
};
use tower::ServiceExt as _; // for `oneshot`

use sepsis_risk_engine::classifier::FixedProbability;
use sepsis_risk_engine::sirs::SirsRuleScorer;
use sepsis_risk_engine::{api, AppState, ClinicalConfig};

const BODY_LIMIT: usize = 1024 * 1024;

/// Router with the built-in config and a fixed stub probability.
fn test_router(p: f64) -> Router {
    let scorer = Arc::new(FixedProbability::new(p).expect("valid stub probability"));
    api::router(AppState::new(ClinicalConfig::default_seed(), scorer), None)
}

async fn read_json(resp: shuttle_axum::axum::response::Response) -> Json {
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body")
        .to_vec();
    serde_json::from_slice(&bytes).expect("parse json")
}

fn post_json(uri: &str, payload: &Json) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(payload.to_string()))
        .expect("build POST")
}

#[tokio::test]
async fn api_health_returns_200_and_ok_body() {
    let app = test_router(0.1);

    let req = Request::builder()
        .method("GET")
        .uri("/health")
        .body(Body::empty())
        .expect("build GET /health");

    let resp = app.oneshot(req).await.expect("oneshot /health");
    assert_eq!(resp.status(), StatusCode::OK, "health should be 200");

    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body")
        .to_vec();
    let body = String::from_utf8(bytes).expect("utf8");
    assert_eq!(body.trim(), "OK");
}

#[tokio::test]
async fn assess_with_supplied_probability() {
    let app = test_router(0.1);

    let payload = json!({
        "observations": { "HR": 130, "Temp": "39.2", "SBP": 95, "O2Sat": 92, "FiO2": null },
        "probability": 0.3
    });
    let resp = app.oneshot(post_json("/assess", &payload)).await.expect("oneshot /assess");
    assert_eq!(resp.status(), StatusCode::OK);

    let v = read_json(resp).await;
    assert_eq!(v["probability_source"], json!("request"));
    assert_eq!(v["model_probability"], json!(0.3));
    assert_eq!(v["status"], json!("unstable"));
    assert_eq!(v["instability_label"], json!("high"));
    assert_eq!(v["risk"]["trajectory"], json!("escalating"));
    assert_eq!(v["risk"]["clinical_trigger_present"], json!(true));
    assert!(v["risk"]["future_risk_6h"].is_number());
    assert!(v["assessed_at"].is_string());
    assert!(v["reasons"].as_array().map(|r| r.len() >= 3).unwrap_or(false));
}

#[tokio::test]
async fn assess_without_probability_uses_injected_source() {
    let app = test_router(0.8);

    let payload = json!({ "observations": { "Lactate": 4.2 } });
    let resp = app.oneshot(post_json("/assess", &payload)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let v = read_json(resp).await;
    assert_eq!(v["probability_source"], json!("fixed"));
    assert_eq!(v["status"], json!("prone"));
    assert_eq!(v["sepsis_label"], json!("critical"));
    assert_eq!(v["top_contributors"][0]["parameter"], json!("Lactate"));
}

#[tokio::test]
async fn assess_rejects_out_of_range_probability() {
    let app = test_router(0.1);

    let payload = json!({ "observations": { "HR": 80 }, "probability": 1.4 });
    let resp = app.oneshot(post_json("/assess", &payload)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let v = read_json(resp).await;
    assert!(v["error"].as_str().unwrap_or_default().contains("model_probability"));
}

#[tokio::test]
async fn predict_form_accepts_aliases_and_blank_fields() {
    let scorer = Arc::new(SirsRuleScorer);
    let app = api::router(AppState::new(ClinicalConfig::default_seed(), scorer), None);

    let form = "Heart_Rate=72&Temperature=37.0&Systolic_BP=115&Oxygen_Saturation=98&WBC=&Lactate=abc";
    let req = Request::builder()
        .method("POST")
        .uri("/predict")
        .header("content-type", "application/x-www-form-urlencoded")
        .body(Body::from(form))
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let v = read_json(resp).await;
    assert_eq!(v["probability_source"], json!("sirs_rules"));
    assert_eq!(v["model_probability"], json!(0.05));
    assert_eq!(v["status"], json!("not_prone"));
    assert_eq!(v["instability_label"], json!("stable"));
    assert_eq!(v["risk"]["trajectory"], json!("not_indicated"));
    assert!(v["risk"]["future_risk_6h"].is_null());
}

#[tokio::test]
async fn added_range_parameter_is_decoded_and_scored() {
    let toml = r#"
        key_vitals = ["HR", "pH"]

        [ranges.HR]
        optimal = 70
        min = 60
        max = 100
        critical_low = 40
        critical_high = 150

        [ranges.pH]
        optimal = 7.4
        min = 7.35
        max = 7.45
        critical_low = 7.0
        critical_high = 7.8
    "#;
    let cfg = ClinicalConfig::from_toml_str(toml).expect("valid config");
    let scorer = Arc::new(FixedProbability::new(0.1).unwrap());
    let app = api::router(AppState::new(cfg, scorer), None);

    let req = Request::builder()
        .method("POST")
        .uri("/predict")
        .header("content-type", "application/x-www-form-urlencoded")
        .body(Body::from("ph=6.9&HR=70"))
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let v = read_json(resp).await;
    let exceedances = v["abnormalities"]["exceedances"].as_array().expect("exceedances");
    assert_eq!(exceedances.len(), 1);
    assert_eq!(exceedances[0]["parameter"], json!("pH"));
    assert_eq!(v["risk"]["vital_deviations"]["pH"], json!(1.0));
    assert_ne!(v["risk"]["trajectory"], json!("not_indicated"));
}

#[tokio::test]
async fn config_ranges_lists_active_table() {
    let app = test_router(0.1);
    let req = Request::builder()
        .method("GET")
        .uri("/config/ranges")
        .body(Body::empty())
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let v = read_json(resp).await;
    assert_eq!(v["HR"]["min"], json!(60.0));
    assert_eq!(v["HR"]["critical_high"], json!(150.0));
    assert!(v["O2Sat"].get("critical_high").is_none());
}
