//! Mock catalog API and input fixtures

use catalog_crawler::Config;
use catalog_crawler::config::{CrawlConfig, RetryConfig};
use std::path::{Path, PathBuf};
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Product detail payload as the catalog API returns it
pub fn product_json(id: &str) -> serde_json::Value {
    serde_json::json!({
        "id": id.parse::<u64>().unwrap_or_default(),
        "sku": format!("SKU-{id}"),
        "name": format!("Product {id}"),
        "url_key": format!("product-{id}"),
        "price": 150000,
        "list_price": 180000,
        "description": format!("<div><p>Product   {id}</p>\n<p>In stock</p></div>"),
        "images": [
            {"base_url": format!("https://img.example/{id}/1.jpg"), "large_url": "l"},
            {"base_url": format!("https://img.example/{id}/2.jpg")}
        ]
    })
}

/// Serve `product_json(id)` for every id in `ids`
pub async fn mount_products(server: &MockServer, ids: &[&str]) {
    for id in ids {
        Mock::given(method("GET"))
            .and(path(format!("/products/{id}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(product_json(id)))
            .mount(server)
            .await;
    }
}

/// Answer every request for `id` with `status`
pub async fn mount_status(server: &MockServer, id: &str, status: u16) {
    Mock::given(method("GET"))
        .and(path(format!("/products/{id}")))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}

/// Configuration pointing at the mock server, without pauses and with short backoff
pub fn test_config(server: &MockServer, output_dir: &Path, batch_size: usize) -> Config {
    let mut config = Config {
        output_dir: output_dir.to_path_buf(),
        crawl: CrawlConfig {
            batch_size,
            concurrency: 2,
            batch_pause: Duration::ZERO,
        },
        retry: RetryConfig {
            max_attempts: 3,
            base_delay: Duration::from_millis(5),
        },
        ..Config::default()
    };
    config.api.base_url = format!("{}/products", server.uri());
    config.api.request_timeout = Duration::from_secs(5);
    config
}

/// Write a one-column identifier CSV and return its path
pub fn write_ids_csv(dir: &Path, ids: &[&str]) -> PathBuf {
    let path = dir.join("product_ids.csv");
    let mut content = String::from("id\n");
    for id in ids {
        content.push_str(id);
        content.push('\n');
    }
    std::fs::write(&path, content).unwrap();
    path
}

/// Paths requested from the mock server, in arrival order
pub async fn requested_paths(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .map(|request| request.url.path().to_string())
        .collect()
}
