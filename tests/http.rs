use once_cell::sync::Lazy;
use reqwest::Client;
use serde_json::{Value, json};
use std::net::TcpListener;
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::sleep;

struct TestServer {
    base_url: String,
    child: Child,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

static TEST_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));
static SERVER: Lazy<Mutex<Option<Arc<TestServer>>>> = Lazy::new(|| Mutex::new(None));

#[cfg(unix)]
mod cleanup {
    use std::sync::Once;
    use std::sync::atomic::{AtomicI32, Ordering};

    static REGISTER: Once = Once::new();
    static PID: AtomicI32 = AtomicI32::new(0);

    pub fn register(pid: u32) {
        REGISTER.call_once(|| {
            PID.store(pid as i32, Ordering::SeqCst);
            unsafe {
                libc::atexit(on_exit);
            }
        });
    }

    extern "C" fn on_exit() {
        let pid = PID.load(Ordering::SeqCst);
        if pid > 0 {
            unsafe {
                libc::kill(pid, libc::SIGTERM);
            }
        }
    }
}

fn pick_free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind random port");
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

fn unique_suffix() -> String {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    format!("{}_{}", std::process::id(), nanos)
}

fn unique_data_dir() -> String {
    let mut path = std::env::temp_dir();
    path.push(format!("inventory_app_http_{}", unique_suffix()));
    path.to_string_lossy().to_string()
}

async fn wait_until_ready(base_url: &str) {
    let client = Client::new();
    let deadline = Instant::now() + Duration::from_secs(3);
    loop {
        if let Ok(resp) = client.get(format!("{base_url}/api/catalog/status")).send().await {
            if resp.status().is_success() {
                return;
            }
        }
        if Instant::now() > deadline {
            panic!("server did not become ready");
        }
        sleep(Duration::from_millis(100)).await;
    }
}

async fn spawn_server() -> TestServer {
    let port = pick_free_port();
    let child = Command::new(env!("CARGO_BIN_EXE_inventory_app"))
        .env("PORT", port.to_string())
        .env("APP_DATA_DIR", unique_data_dir())
        // Nothing listens on the discard port: every catalog fetch fails.
        .env("CATALOG_URL", "http://127.0.0.1:9/products")
        .env("CATALOG_INTERVAL_SECS", "3600")
        .env("RUST_LOG", "info")
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .spawn()
        .expect("failed to spawn server");

    #[cfg(unix)]
    cleanup::register(child.id());

    let base_url = format!("http://127.0.0.1:{port}");
    wait_until_ready(&base_url).await;

    TestServer { base_url, child }
}

async fn shared_server() -> Arc<TestServer> {
    let mut guard = SERVER.lock().await;
    if let Some(server) = guard.as_ref() {
        return Arc::clone(server);
    }
    let server = Arc::new(spawn_server().await);
    *guard = Some(Arc::clone(&server));
    server
}

async fn get_json(client: &Client, url: String) -> Value {
    let response = client.get(url).send().await.unwrap();
    assert!(response.status().is_success());
    response.json().await.unwrap()
}

async fn send_json(request: reqwest::RequestBuilder) -> Value {
    let response = request.send().await.unwrap();
    assert!(response.status().is_success());
    response.json().await.unwrap()
}

fn product_names(view: &Value) -> Vec<String> {
    view["products"]
        .as_array()
        .unwrap()
        .iter()
        .map(|row| row["name"].as_str().unwrap().to_string())
        .collect()
}

fn find_product<'a>(view: &'a Value, name: &str) -> Option<&'a Value> {
    view["products"]
        .as_array()
        .unwrap()
        .iter()
        .find(|row| row["name"] == name)
}

#[tokio::test]
async fn http_product_add_edit_delete() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();
    let name = format!("Clavier {}", unique_suffix());

    let before = get_json(&client, format!("{}/api/view?tab=crud", server.base_url)).await;
    let count_before = before["dashboard"]["product_count"].as_u64().unwrap();

    let added = send_json(
        client
            .post(format!("{}/api/products?tab=crud", server.base_url))
            .json(&json!({ "name": name, "price": "10", "qty": "3", "category": "Informatique" })),
    )
    .await;
    assert_eq!(added["applied"], true);
    let view = &added["view"];
    assert_eq!(view["dashboard"]["product_count"].as_u64().unwrap(), count_before + 1);
    let row = find_product(view, &name).expect("product listed");
    assert_eq!(row["low_stock"], true);
    assert_eq!(row["price_label"], "10.00 €");
    let id = row["id"].as_i64().unwrap();

    let edited = send_json(
        client
            .post(format!("{}/api/products?tab=crud", server.base_url))
            .json(&json!({ "id": id.to_string(), "name": name, "price": "12", "qty": "9", "category": "Accessoires" })),
    )
    .await;
    let view = &edited["view"];
    assert_eq!(view["dashboard"]["product_count"].as_u64().unwrap(), count_before + 1);
    let row = find_product(view, &name).unwrap();
    assert_eq!(row["qty"], 9);
    assert_eq!(row["category"], "Accessoires");

    let declined = send_json(client.delete(format!("{}/api/products/{id}?tab=crud", server.base_url))).await;
    assert_eq!(declined["applied"], false);
    assert!(find_product(&declined["view"], &name).is_some());

    let deleted = send_json(
        client.delete(format!("{}/api/products/{id}?tab=crud&confirmed=true", server.base_url)),
    )
    .await;
    assert_eq!(deleted["applied"], true);
    assert!(find_product(&deleted["view"], &name).is_none());
    assert_eq!(
        deleted["view"]["dashboard"]["product_count"].as_u64().unwrap(),
        count_before
    );
}

#[tokio::test]
async fn http_categories_reject_duplicates() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    let duplicate = send_json(
        client
            .post(format!("{}/api/categories?tab=cats", server.base_url))
            .json(&json!({ "name": "Informatique" })),
    )
    .await;
    assert_eq!(duplicate["applied"], false);

    let label = format!("Réseau {}", unique_suffix());
    let added = send_json(
        client
            .post(format!("{}/api/categories?tab=cats", server.base_url))
            .json(&json!({ "name": label })),
    )
    .await;
    assert_eq!(added["applied"], true);
    let items = added["view"]["categories"]["items"].as_array().unwrap();
    let item = items.iter().find(|item| item["label"] == label.as_str()).unwrap();
    let index = item["index"].as_u64().unwrap();

    let removed = send_json(client.delete(format!(
        "{}/api/categories/{index}?tab=cats&confirmed=true",
        server.base_url
    )))
    .await;
    assert_eq!(removed["applied"], true);
    let options = removed["view"]["categories"]["options"].as_array().unwrap();
    assert!(!options.iter().any(|option| option == label.as_str()));

    let out_of_range = send_json(client.delete(format!(
        "{}/api/categories/9999?tab=cats&confirmed=true",
        server.base_url
    )))
    .await;
    assert_eq!(out_of_range["applied"], false);
}

#[tokio::test]
async fn http_writes_reach_other_tabs() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();
    let name = format!("Hub {}", unique_suffix());

    // Open the reading tab first so it holds a stale copy.
    get_json(&client, format!("{}/api/view?tab=reader", server.base_url)).await;

    send_json(
        client
            .post(format!("{}/api/products?tab=writer", server.base_url))
            .json(&json!({ "name": name, "price": "15", "qty": "6", "category": "Accessoires" })),
    )
    .await;

    let view = get_json(&client, format!("{}/api/view?tab=reader", server.base_url)).await;
    assert!(product_names(&view).contains(&name));
}

#[tokio::test]
async fn http_filter_without_match_is_empty() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    let view = get_json(
        &client,
        format!("{}/api/view?tab=filter&filter=no-such-product-xyz", server.base_url),
    )
    .await;
    assert!(product_names(&view).is_empty());
}

#[tokio::test]
async fn http_navigation_switches_view() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    let view = send_json(
        client
            .post(format!("{}/api/navigate?tab=nav", server.base_url))
            .json(&json!({ "view": "categories" })),
    )
    .await;
    assert_eq!(view["active"]["view"], "categories");

    let missing = client
        .post(format!("{}/api/navigate?tab=nav", server.base_url))
        .json(&json!({ "view": "product_detail", "id": -1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), reqwest::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn http_unreachable_catalog_reports_offline() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    let before = get_json(&client, format!("{}/api/view?tab=sync", server.base_url)).await;
    // The startup fetch may still be in flight; a skipped sync is retried.
    let mut synced = Value::Null;
    for _ in 0..20 {
        synced = send_json(client.post(format!("{}/api/catalog/sync", server.base_url))).await;
        if synced["outcome"]["outcome"] != "skipped" {
            break;
        }
        sleep(Duration::from_millis(100)).await;
    }
    assert_eq!(synced["outcome"]["outcome"], "failed");
    assert_eq!(synced["status"]["state"], "offline");

    let after = get_json(&client, format!("{}/api/view?tab=sync", server.base_url)).await;
    assert_eq!(before["categories"], after["categories"]);
    assert_eq!(before["products"], after["products"]);

    let suggestions = get_json(&client, format!("{}/api/catalog/suggest?q=shirt", server.base_url)).await;
    assert_eq!(suggestions, json!([]));
}

#[tokio::test]
async fn http_index_renders_kpis() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    let html = client
        .get(format!("{}/", server.base_url))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(html.contains(r#"id="kpiProducts">"#));
    assert!(html.contains("€"));
    assert!(!html.contains("{{"));
}
