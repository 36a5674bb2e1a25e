//! HTTP API tests: a real server on a free port, driven with reqwest.

use social_pulse::analysis::LexiconAnalyzer;
use social_pulse::config::Config;
use social_pulse::server::run_server_with_analyzer;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

// ─── Helpers ────────────────────────────────────────────────────────

fn test_config(data_dir: &Path, port: u16) -> Config {
    let toml_str = format!(
        r#"
[server]
bind = "127.0.0.1:{port}"

[corpus]
reload = "startup"

[[corpus.sources]]
id = "openData"
name = "Datos Abiertos"
dir = "{data}"

[[corpus.sources]]
id = "empty"
dir = "{empty}"
"#,
        port = port,
        data = data_dir.display(),
        empty = data_dir.join("does-not-exist").display(),
    );
    toml::from_str(&toml_str).unwrap()
}

fn write_data(dir: &Path) {
    fs::create_dir_all(dir).unwrap();
    fs::write(
        dir.join("posts.csv"),
        "Year;Text;Platform\n\
         2011;Estoy feliz;facebook\n\
         2016;Mucha ansiedad hoy;twitter\n\
         2017;Ansiedad y estrés;facebook\n\
         2022;Todo bien;instagram\n",
    )
    .unwrap();
}

fn find_free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

async fn wait_for_server(port: u16) {
    let client = reqwest::Client::new();
    let url = format!("http://127.0.0.1:{}/health", port);
    for _ in 0..50 {
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        if let Ok(resp) = client.get(&url).send().await {
            if resp.status().is_success() {
                return;
            }
        }
    }
    panic!("Server did not become ready within 5 seconds");
}

async fn start_server() -> (TempDir, u16) {
    let tmp = TempDir::new().unwrap();
    let data = tmp.path().join("data");
    write_data(&data);

    let port = find_free_port();
    let config = test_config(&data, port);
    tokio::spawn(async move {
        run_server_with_analyzer(&config, Arc::new(LexiconAnalyzer::new()))
            .await
            .unwrap();
    });
    wait_for_server(port).await;
    (tmp, port)
}

// ─── Tests ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_health() {
    let (_tmp, port) = start_server().await;

    let resp: serde_json::Value = reqwest::get(format!("http://127.0.0.1:{}/health", port))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(resp["status"], "ok");
    assert_eq!(resp["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_search_endpoint() {
    let (_tmp, port) = start_server().await;

    let url = format!(
        "http://127.0.0.1:{}/api/search?query=ansiedad&source=openData&platform=facebook,twitter&time=2015_2019",
        port
    );
    let resp = reqwest::get(&url).await.unwrap();
    assert_eq!(resp.status(), 200);

    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["query"], "ansiedad");
    assert_eq!(body["filters"]["socialNetwork"][1], "twitter");

    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0]["year"], 2016);
    assert_eq!(results[1]["year"], 2017);
    assert_eq!(results[1]["mental_health"]["label"], "fear");
    assert!(results[1]["sentiment"]["neg"].as_f64().unwrap() > 0.0);
}

#[tokio::test]
async fn test_search_accepts_legacy_parameter_names() {
    let (_tmp, port) = start_server().await;

    let url = format!(
        "http://127.0.0.1:{}/api/search?query=&fuente=openData&socialNetwork=instagram",
        port
    );
    let body: serde_json::Value = reqwest::get(&url).await.unwrap().json().await.unwrap();

    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["text"], "todo bien");
    assert_eq!(body["filters"]["source"][0], "openData");
}

#[tokio::test]
async fn test_search_with_both_parameter_spellings() {
    let (_tmp, port) = start_server().await;

    let url = format!(
        "http://127.0.0.1:{}/api/search?query=&source=openData&fuente=openData&platform=instagram&socialNetwork=instagram",
        port
    );
    let resp = reqwest::get(&url).await.unwrap();
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();

    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["text"], "todo bien");
}

#[tokio::test]
async fn test_repeated_parameter_uses_error_contract() {
    let (_tmp, port) = start_server().await;

    let url = format!(
        "http://127.0.0.1:{}/api/search?source=openData&source=openData",
        port
    );
    let resp = reqwest::get(&url).await.unwrap();
    assert_eq!(resp.status(), 400);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "bad_request");
    assert!(body["error"]["message"].as_str().unwrap().contains("source"));
}

#[tokio::test]
async fn test_search_without_parameters_returns_everything() {
    let (_tmp, port) = start_server().await;

    let url = format!("http://127.0.0.1:{}/api/search?source=openData", port);
    let body: serde_json::Value = reqwest::get(&url).await.unwrap().json().await.unwrap();
    assert_eq!(body["results"].as_array().unwrap().len(), 4);
    assert_eq!(body["query"], "");
    assert_eq!(body["stats"]["corpus_rows"], 4);
}

#[tokio::test]
async fn test_malformed_time_reported_in_stats() {
    let (_tmp, port) = start_server().await;

    let url = format!(
        "http://127.0.0.1:{}/api/search?source=openData&time=soon,2020-2023",
        port
    );
    let body: serde_json::Value = reqwest::get(&url).await.unwrap().json().await.unwrap();
    assert_eq!(body["stats"]["rejected_ranges"][0], "soon");
    assert_eq!(body["results"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_unknown_source_is_bad_request() {
    let (_tmp, port) = start_server().await;

    let url = format!("http://127.0.0.1:{}/api/search?source=nope", port);
    let resp = reqwest::get(&url).await.unwrap();
    assert_eq!(resp.status(), 400);

    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "unknown_source");
}

#[tokio::test]
async fn test_unavailable_source_is_service_unavailable() {
    let (_tmp, port) = start_server().await;

    let url = format!("http://127.0.0.1:{}/api/search?source=empty", port);
    let resp = reqwest::get(&url).await.unwrap();
    assert_eq!(resp.status(), 503);

    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "data_unavailable");
}

#[tokio::test]
async fn test_filters_menu() {
    let (_tmp, port) = start_server().await;

    let body: serde_json::Value = reqwest::get(format!("http://127.0.0.1:{}/api/filters", port))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let groups = body.as_array().unwrap();
    assert_eq!(groups.len(), 3);
    assert_eq!(groups[0]["options"][0]["name"], "Datos Abiertos");
    assert_eq!(groups[2]["type"], "time");
    assert_eq!(groups[2]["options"][0]["selected"], 0);
}

#[tokio::test]
async fn test_sources_endpoint() {
    let (_tmp, port) = start_server().await;

    let body: serde_json::Value = reqwest::get(format!("http://127.0.0.1:{}/api/sources", port))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let sources = body["sources"].as_array().unwrap();
    assert_eq!(sources[0]["id"], "openData");
    assert_eq!(sources[0]["exists"], true);
    assert_eq!(sources[0]["files"], 1);
    assert_eq!(sources[1]["exists"], false);
}

#[tokio::test]
async fn test_cors_headers_present() {
    let (_tmp, port) = start_server().await;

    let resp = reqwest::Client::new()
        .get(format!("http://127.0.0.1:{}/api/filters", port))
        .header("Origin", "http://example.com")
        .send()
        .await
        .unwrap();
    assert_eq!(
        resp.headers()
            .get("access-control-allow-origin")
            .and_then(|v| v.to_str().ok()),
        Some("*")
    );
}
