//! Request dispatch, protected paths, admin API, and shutdown behavior.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tenant_host::capability::{Capability, CapabilityCatalog, CapabilityError};
use tenant_host::host::Host;
use tenant_host::http::HttpServer;
use tenant_host::tenant::providers::ProviderCatalog;
use tokio::net::TcpListener;

mod common;
use common::{host_config, raw_request, spawn_server, start_host, Fixture};

fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

fn write_acme(fx: &Fixture) {
    fx.write("acme/config.toml", "name = \"Acme Corp\"\n");
    fx.write("acme/services/kv.toml", "provider = \"KeyValue\"\n");
    fx.write(
        "acme/services/hits.toml",
        "provider = \"counter\"\n[options]\nkey = \"hits\"\n",
    );
    fx.write(
        "acme/routes/plans.toml",
        "path = \"/plans\"\n[action]\nkind = \"static\"\n[action.body]\nplans = [\"gold\", \"trial\"]\n",
    );
    fx.write(
        "acme/routes/hits.toml",
        "path = \"/hits\"\n[action]\nkind = \"service\"\nservice = \"hits\"\n",
    );
}

#[tokio::test]
async fn test_protected_path_miss_payload() {
    let fx = Fixture::new();
    let host = start_host(host_config(&fx.root())).await;
    let addr = spawn_server(&host).await;

    let res = client()
        .get(format!("http://{addr}/api/anything"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 404);

    let body: Value = res.json().await.unwrap();
    assert_eq!(
        body,
        json!({"success": false, "error": "Tenant 'default-tenant' not found"})
    );
}

#[tokio::test]
async fn test_unprotected_miss_passes_through() {
    let fx = Fixture::new();
    let host = start_host(host_config(&fx.root())).await;
    let addr = spawn_server(&host).await;

    // No tenant resolves, but /healthz is not protected, so the request
    // reaches its handler untouched.
    let res = client()
        .get(format!("http://{addr}/healthz"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["status"], json!("ok"));
}

#[tokio::test]
async fn test_host_label_wins_over_path_and_header() {
    let fx = Fixture::new();
    write_acme(&fx);
    let host = start_host(host_config(&fx.root())).await;
    let addr = spawn_server(&host).await;

    let (status, body) = raw_request(
        addr,
        "GET",
        "/api/tenant",
        &[
            ("Host", "acme.example.com"),
            ("x-tenant-id", "other"),
        ],
    )
    .await;

    assert_eq!(status, 200);
    let body: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(body["tenant"]["id"], json!("acme"));
}

#[tokio::test]
async fn test_header_derivation_on_protected_path() {
    let fx = Fixture::new();
    write_acme(&fx);
    let host = start_host(host_config(&fx.root())).await;
    let addr = spawn_server(&host).await;

    // The Host header is an IP and "/api" never derives an id, so the
    // tenant header decides.
    let res = client()
        .get(format!("http://{addr}/api/tenant"))
        .header("x-tenant-id", "acme")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["tenant"]["id"], json!("acme"));
    assert_eq!(body["config"]["name"], json!("Acme Corp"));
}

#[tokio::test]
async fn test_tenant_routes_and_service_invocation() {
    let fx = Fixture::new();
    write_acme(&fx);
    let host = start_host(host_config(&fx.root())).await;
    let addr = spawn_server(&host).await;
    let client = client();

    // Static route under the tenant prefix; the id derives from the path.
    let res = client
        .get(format!("http://{addr}/acme/plans"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({"plans": ["gold", "trial"]}));

    // Service-backed route increments on every call.
    for expected in 1..=2 {
        let res = client
            .get(format!("http://{addr}/acme/hits"))
            .send()
            .await
            .unwrap();
        let body: Value = res.json().await.unwrap();
        assert_eq!(body["result"]["count"], json!(expected));
    }

    // Direct service invocation through the protected API.
    let res = client
        .post(format!("http://{addr}/api/services/kv"))
        .header("x-tenant-id", "acme")
        .json(&json!({"op": "set", "key": "plan", "value": "gold"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);

    let res = client
        .post(format!("http://{addr}/api/services/kv"))
        .header("x-tenant-id", "acme")
        .json(&json!({"op": "get", "key": "plan"}))
        .send()
        .await
        .unwrap();
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["result"]["value"], json!("gold"));

    // Unknown services are a structured 404.
    let res = client
        .post(format!("http://{addr}/api/services/missing"))
        .header("x-tenant-id", "acme")
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 404);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["success"], json!(false));
}

#[tokio::test]
async fn test_concurrent_dispatch_during_reload() {
    let fx = Fixture::new();
    write_acme(&fx);
    fx.write("beta/config.toml", "name = \"Beta\"\n");

    let host = start_host(host_config(&fx.root())).await;
    let addr = spawn_server(&host).await;

    let before = host.tenants().get_context("acme").unwrap();

    // Hammer beta with reloads while acme serves traffic.
    let reloader = {
        let host = host.clone();
        tokio::spawn(async move {
            for _ in 0..50 {
                assert!(host.load_tenant("beta"));
                tokio::task::yield_now().await;
            }
        })
    };

    let mut requests = Vec::new();
    for _ in 0..16 {
        let client = client();
        requests.push(tokio::spawn(async move {
            let res = client
                .get(format!("http://{addr}/api/tenant"))
                .header("x-tenant-id", "acme")
                .send()
                .await
                .unwrap();
            assert_eq!(res.status(), 200);
            let body: Value = res.json().await.unwrap();
            assert_eq!(body["tenant"]["id"], json!("acme"));
        }));
    }

    for request in requests {
        request.await.unwrap();
    }
    reloader.await.unwrap();

    // Nobody swapped acme out from under the readers.
    let after = host.tenants().get_context("acme").unwrap();
    assert!(Arc::ptr_eq(&before, &after));
}

#[tokio::test]
async fn test_admin_auth_and_reload() {
    let fx = Fixture::new();
    write_acme(&fx);

    let mut config = host_config(&fx.root());
    config.admin.enabled = true;
    config.admin.api_key = "test-key".to_string();

    let host = start_host(config).await;
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let admin_addr = listener.local_addr().unwrap();
    {
        let host = host.clone();
        tokio::spawn(async move {
            let _ = tenant_host::admin::run_admin(host, listener).await;
        });
    }
    let client = client();

    // No key, no entry.
    let res = client
        .get(format!("http://{admin_addr}/admin/status"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 401);

    let res = client
        .get(format!("http://{admin_addr}/admin/status"))
        .bearer_auth("test-key")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["status"], json!("operational"));
    assert_eq!(body["tenants"], json!(1));
    assert_eq!(body["capabilities"], json!(["storage", "access-log"]));

    // Reload picks up a config change.
    fx.write("acme/config.toml", "name = \"Acme Reloaded\"\n");
    let res = client
        .post(format!("http://{admin_addr}/admin/tenants/acme/reload"))
        .bearer_auth("test-key")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(
        host.tenants().get_tenant("acme").unwrap()["name"],
        json!("Acme Reloaded")
    );

    let res = client
        .post(format!("http://{admin_addr}/admin/tenants/ghost/reload"))
        .bearer_auth("test-key")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 404);
}

struct CountingCapability {
    shutdowns: Arc<AtomicU32>,
}

#[async_trait]
impl Capability for CountingCapability {
    fn name(&self) -> &str {
        "counting"
    }

    async fn register(&self, _host: &Arc<Host>, _options: &Value) -> Result<(), CapabilityError> {
        Ok(())
    }

    async fn shutdown(&self) {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
    }
}

#[tokio::test]
async fn test_teardown_runs_once_under_racing_triggers() {
    let shutdowns = Arc::new(AtomicU32::new(0));
    let mut catalog = CapabilityCatalog::new();
    catalog.register(Arc::new(CountingCapability {
        shutdowns: shutdowns.clone(),
    }));

    let mut config = host_config(&Fixture::new().root());
    config.capabilities.order = vec!["counting".to_string()];

    let host = Host::with_catalogs(config, catalog, ProviderCatalog::builtin(), None);
    host.load_capabilities().await;

    host.shutdown().trigger("SIGINT");
    host.shutdown().trigger("SIGTERM");
    assert!(host.shutdown().is_triggered());

    let first = {
        let host = host.clone();
        tokio::spawn(async move { host.run_teardown().await })
    };
    let second = {
        let host = host.clone();
        tokio::spawn(async move { host.run_teardown().await })
    };
    first.await.unwrap();
    second.await.unwrap();

    assert_eq!(shutdowns.load(Ordering::SeqCst), 1);
    // Completion is resolved for anyone still waiting.
    host.shutdown().wait_complete().await;
}

#[tokio::test]
async fn test_graceful_shutdown_stops_server() {
    let fx = Fixture::new();
    write_acme(&fx);
    let host = start_host(host_config(&fx.root())).await;

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = HttpServer::new(host.clone());
    let handle = tokio::spawn(server.run(listener));

    let res = client()
        .get(format!("http://{addr}/healthz"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);

    host.shutdown().trigger("test");
    let result = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("server did not stop after shutdown trigger")
        .unwrap();
    assert!(result.is_ok());

    host.run_teardown().await;
}
