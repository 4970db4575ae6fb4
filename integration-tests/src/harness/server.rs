use crate::harness::{CapturedEvent, init_test_tracing};
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::redirect::Policy;
use slipway_core::conf::types::{ProxyConfig, RuntimeConfig, ServerConfig};
use slipway_core::server::build_pingora_server;
use std::net::TcpStream;
use std::sync::{Arc, Mutex, OnceLock};
use std::thread;
use std::time::{Duration, Instant};

/// Handle to a running slipway test server.
pub struct TestServer {
    base_url: String,
    client: Client,
}

impl TestServer {
    /// Start a server with default proxy settings.
    pub fn start() -> Self {
        Self::start_with(|_| {})
    }

    /// Start a server after letting the caller adjust the proxy settings.
    ///
    /// The listener always binds a fresh port on 127.0.0.1, so tests can run in
    /// parallel.
    pub fn start_with(configure: impl FnOnce(&mut ProxyConfig)) -> Self {
        // Initialize tracing (this must happen first).
        init_test_tracing(events());

        let listen_port = free_port();
        let mut proxy = ProxyConfig {
            connect_timeout_ms: 2_000,
            read_timeout_ms: 5_000,
            ..ProxyConfig::default()
        };
        configure(&mut proxy);

        let cfg = RuntimeConfig {
            server: ServerConfig {
                listen: format!("127.0.0.1:{listen_port}"),
                threads: Some(2),
                pid_file: None,
                ca_file: None,
                tls: None,
            },
            proxy,
        };

        let server = build_pingora_server(&cfg).expect("failed to build slipway server");

        // Run server in background thread
        thread::spawn(move || {
            server.run_forever();
        });

        let base_url = format!("http://127.0.0.1:{listen_port}");

        // Wait for server to accept connections
        wait_for_server(&base_url);

        let client = Client::builder()
            .timeout(Duration::from_secs(5))
            .redirect(Policy::none())
            .no_proxy()
            .build()
            .expect("failed to build client");

        Self { base_url, client }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Proxy URL for an absolute destination URL.
    pub fn proxied(&self, target: &str) -> String {
        format!("{}/{}", self.base_url, target)
    }

    /// Request for a raw proxy path such as `/https://site.example/`.
    pub fn request(&self, method: reqwest::Method, path: &str) -> RequestBuilder {
        self.client.request(method, format!("{}{}", self.base_url, path))
    }

    pub fn get(&self, path: &str) -> RequestBuilder {
        self.request(reqwest::Method::GET, path)
    }

    /// Waits for the access-log line of the request whose original path is `path`.
    pub fn access_log(&self, path: &str) -> CapturedEvent {
        let deadline = Instant::now() + Duration::from_secs(2);
        loop {
            let found = events()
                .lock()
                .unwrap()
                .iter()
                .find(|e| e.field("event") == Some("access") && e.field("path") == Some(path))
                .cloned();
            if let Some(event) = found {
                return event;
            }
            if Instant::now() > deadline {
                panic!("no access log line for {path}");
            }
            thread::sleep(Duration::from_millis(20));
        }
    }
}

/// Poll until the server responds (or panic).
fn wait_for_server(listen_addr: &str) {
    let addr = listen_addr.strip_prefix("http://").unwrap_or(listen_addr);

    let deadline = Instant::now() + Duration::from_secs(5);

    loop {
        match TcpStream::connect(addr) {
            Ok(_) => return,
            Err(_) => {
                if Instant::now() > deadline {
                    panic!("server failed to start at {}", listen_addr);
                }
                thread::sleep(Duration::from_millis(25));
            }
        }
    }
}

static EVENTS: OnceLock<Arc<Mutex<Vec<CapturedEvent>>>> = OnceLock::new();

fn events() -> Arc<Mutex<Vec<CapturedEvent>>> {
    EVENTS
        .get_or_init(|| Arc::new(Mutex::new(Vec::new())))
        .clone()
}

/// Allocate a free port on localhost.
/// This is required to avoid port collisions when running tests in parallel.
pub fn free_port() -> u16 {
    std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}
