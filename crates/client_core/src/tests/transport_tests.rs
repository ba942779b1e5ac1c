use super::*;
use std::sync::Arc;

use axum::{
    extract::{RawQuery, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde_json::json;
use tokio::{net::TcpListener, sync::Mutex};

#[derive(Clone, Default)]
struct ServerState {
    last_query: Arc<Mutex<Option<String>>>,
}

async fn all_countries(
    State(state): State<ServerState>,
    RawQuery(query): RawQuery,
) -> Json<Value> {
    *state.last_query.lock().await = query;
    Json(json!([
        {
            "name": { "common": "Italy" },
            "capital": ["Rome"],
            "population": 59000000,
            "flags": { "png": "https://flags/it.png", "alt": "Italian tricolour" }
        },
        {
            "name": { "common": "Israel" },
            "capital": ["Jerusalem"],
            "population": 9000000,
            "flags": { "svg": "https://flags/il.svg" }
        },
        {
            "name": { "common": "Åland Islands" },
            "population": "unknown"
        }
    ]))
}

async fn spawn_countries_server() -> anyhow::Result<(String, ServerState)> {
    let state = ServerState::default();
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    let app = Router::new()
        .route("/v3.1/all", get(all_countries))
        .route(
            "/broken",
            get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
        )
        .route(
            "/missing",
            get(|| async { (StatusCode::NOT_FOUND, "nothing here") }),
        )
        .route("/not-json", get(|| async { "definitely not json" }))
        .route(
            "/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Json(json!([]))
            }),
        )
        .with_state(state.clone());

    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    Ok((format!("http://{addr}"), state))
}

#[tokio::test]
async fn fetches_normalizes_and_orders_by_name() {
    let (base, state) = spawn_countries_server().await.expect("server");
    let client = RestCountriesClient::new(&format!("{base}/v3.1/all")).expect("client");

    let countries = client.fetch_all(None).await.expect("fetch");

    let names: Vec<&str> = countries.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["Åland Islands", "Israel", "Italy"]);

    let aland = &countries[0];
    assert_eq!(aland.population, 0);
    assert_eq!(aland.capital, shared::domain::MISSING_CAPITAL);
    assert_eq!(aland.flag_alt, "Flag of Åland Islands");

    let israel = &countries[1];
    assert_eq!(israel.flag_url, "https://flags/il.svg");
    assert_eq!(israel.capital, "Jerusalem");

    let query = state.last_query.lock().await.clone().expect("query string");
    assert!(
        query.starts_with("fields=name"),
        "unexpected query: {query}"
    );
}

#[tokio::test]
async fn non_success_status_becomes_http_error() {
    let (base, _) = spawn_countries_server().await.expect("server");

    let client = RestCountriesClient::new(&format!("{base}/broken")).expect("client");
    let err = client.fetch_all(None).await.expect_err("500 must fail");
    assert_eq!(err.status(), Some(500));
    assert_eq!(err.to_string(), "Failed to fetch countries (HTTP 500)");

    let client = RestCountriesClient::new(&format!("{base}/missing")).expect("client");
    let err = client.fetch_all(None).await.expect_err("404 must fail");
    assert_eq!(err.to_string(), "Failed to fetch countries (HTTP 404)");
}

#[tokio::test]
async fn undecodable_body_is_a_decode_error() {
    let (base, _) = spawn_countries_server().await.expect("server");
    let client = RestCountriesClient::new(&format!("{base}/not-json")).expect("client");

    let err = client.fetch_all(None).await.expect_err("text body must fail");
    assert!(matches!(err, FetchError::Decode(_)), "unexpected error: {err:?}");
}

#[tokio::test]
async fn cancellation_interrupts_in_flight_request() {
    let (base, _) = spawn_countries_server().await.expect("server");
    let client = RestCountriesClient::new(&format!("{base}/slow")).expect("client");
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let err = tokio::time::timeout(Duration::from_secs(5), client.fetch_countries(&cancel))
        .await
        .expect("cancellation should resolve promptly")
        .expect_err("cancelled fetch must fail");
    assert!(err.is_cancelled());
}

#[tokio::test]
async fn already_cancelled_token_skips_request() {
    let (base, state) = spawn_countries_server().await.expect("server");
    let client = RestCountriesClient::new(&format!("{base}/v3.1/all")).expect("client");
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = client
        .fetch_all(Some(&cancel))
        .await
        .expect_err("cancelled token must fail");

    assert!(err.is_cancelled());
    assert!(state.last_query.lock().await.is_none());
}

#[tokio::test]
async fn unreachable_endpoint_is_a_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let client = RestCountriesClient::new(&format!("http://{addr}/all")).expect("client");
    let err = client.fetch_all(None).await.expect_err("nothing is listening");
    assert!(matches!(err, FetchError::Transport(_)), "unexpected error: {err:?}");
}

#[test]
fn endpoint_appends_field_selection_once() {
    let url = endpoint_url("http://localhost:8080/v3.1/all").expect("url");
    assert_eq!(
        url.query(),
        Some("fields=name%2Ccapital%2Cpopulation%2Cflags")
    );

    let url = endpoint_url(crate::config::DEFAULT_API_URL).expect("url");
    assert_eq!(url.query(), Some("fields=name,capital,population,flags"));
}

#[test]
fn rejects_invalid_endpoints() {
    assert!(endpoint_url("not a url").is_err());
    assert!(endpoint_url("ftp://example.com/all").is_err());
}

#[test]
fn normalize_records_orders_baseline_by_name() {
    let countries = normalize_records(vec![
        json!({ "name": { "common": "chile" } }),
        json!({ "name": { "common": "Brazil" } }),
        json!({ "name": { "common": "Argentina" } }),
    ]);
    let names: Vec<&str> = countries.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["Argentina", "Brazil", "chile"]);
}

#[test]
fn normalize_records_folds_diacritics_and_keeps_tied_order() {
    let countries = normalize_records(vec![
        json!({ "flags": { "png": "https://flags/second.png" } }),
        json!({ "name": { "common": "Curaçao" } }),
        json!({ "flags": { "png": "https://flags/first.png" } }),
        json!({ "name": { "common": "Cuba" } }),
    ]);
    let ids: Vec<&str> = countries.iter().map(|c| c.id.0.as_str()).collect();
    assert_eq!(
        ids,
        vec![
            "Cuba-",
            "Curaçao-",
            "unknown-https://flags/second.png",
            "unknown-https://flags/first.png",
        ]
    );
}
