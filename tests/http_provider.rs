use meshestra_http::prelude::*;
use meshestra_http::server::InheritedListener;
use std::net::SocketAddr;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

#[derive(Default)]
struct VisitCounter {
    visits: AtomicUsize,
}

struct NotRegistered;

async fn hello(ctx: RequestContext) -> String {
    format!("hello, {}", ctx.param("name").unwrap_or("stranger"))
}

async fn visit(counter: Inject<VisitCounter>) -> usize {
    counter.visits.fetch_add(1, Ordering::SeqCst) + 1
}

async fn echo(ctx: RequestContext) -> Result<Json<serde_json::Value>, HandlerError> {
    let value = ctx
        .json::<serde_json::Value>()
        .map_err(|e| HandlerError::with_source("invalid body", e))?;
    Ok(Json(value))
}

async fn value_with_error() -> (i32, Option<HandlerError>) {
    (0, Some(HandlerError::new("value is not ready")))
}

async fn needs_missing(_missing: Inject<NotRegistered>) -> &'static str {
    "unreachable"
}

async fn nothing() {}

async fn send(addr: SocketAddr, method: &str, path: &str, body: &str) -> (u16, String) {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let request = format!(
        "{method} {path} HTTP/1.1\r\nHost: test\r\nConnection: close\r\n\
         Content-Type: application/json\r\nContent-Length: {}\r\n\r\n{body}",
        body.len()
    );
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();

    let status = response[9..12].parse().unwrap();
    let body = response
        .split_once("\r\n\r\n")
        .map(|(_, body)| body.to_string())
        .unwrap_or_default();
    (status, body)
}

#[tokio::test]
async fn test_full_lifecycle_over_tcp() {
    let socket = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = socket.local_addr().unwrap();

    let logged = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&logged);

    let http = Arc::new(HttpProvider::new(
        InheritedListener::new(socket),
        vec![
            request_log_option(move |log: &RequestLog| {
                sink.lock()
                    .unwrap()
                    .push((log.method.to_string(), log.path.clone(), log.status.as_u16()));
            }),
            route_option(|_, injector, server| {
                server
                    .route("/hello/{name}", get(injector.handler(hello)))
                    .route("/visit", get(injector.handler(visit)))
                    .route("/echo", post(injector.handler(echo)))
                    .route("/pair", get(injector.handler(value_with_error)))
                    .route("/missing", get(injector.handler(needs_missing)))
                    .route("/nothing", get(injector.handler(nothing)));
                Ok(())
            }),
        ],
    ));

    let container = ContainerBuilder::new()
        .register(VisitCounter::default())
        .build();
    let app = Application::builder()
        .container(container)
        .daemon(Arc::clone(&http))
        .build()
        .await
        .unwrap();
    let graceful = app.graceful();
    let running = tokio::spawn(app.run());

    assert_eq!(send(addr, "GET", "/hello/ferris", "").await, (200, "hello, ferris".into()));

    assert_eq!(send(addr, "GET", "/visit", "").await, (200, "1".into()));
    assert_eq!(send(addr, "GET", "/visit", "").await, (200, "2".into()));

    let (status, body) = send(addr, "POST", "/echo", r#"{"b":1,"a":[true]}"#).await;
    assert_eq!(status, 200);
    let echoed: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(echoed, serde_json::json!({ "a": [true], "b": 1 }));

    let (status, body) = send(addr, "POST", "/echo", "not json").await;
    assert_eq!(status, 500);
    assert!(!body.contains("invalid body"));

    let (status, body) = send(addr, "GET", "/pair", "").await;
    assert_eq!(status, 500);
    assert_ne!(body, "0");
    let failure: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(failure["statusCode"], 500);
    assert_eq!(failure["message"], "Internal Server Error");

    let (status, body) = send(addr, "GET", "/missing", "").await;
    assert_eq!(status, 500);
    assert!(!body.contains("NotRegistered"));

    assert_eq!(send(addr, "GET", "/nothing", "").await, (200, String::new()));

    graceful.shutdown();
    tokio::time::timeout(Duration::from_secs(10), running)
        .await
        .unwrap()
        .unwrap()
        .unwrap();

    assert_eq!(http.state(), meshestra_http::lifecycle::ProviderState::Stopped);
    assert!(TcpStream::connect(addr).await.is_err());

    let logged = logged.lock().unwrap();
    assert_eq!(logged.len(), 8);
    assert_eq!(logged[0], ("GET".to_string(), "/hello/ferris".to_string(), 200));
    assert_eq!(logged[5], ("GET".to_string(), "/pair".to_string(), 500));
}

#[tokio::test]
async fn test_port_in_use_stops_the_application() {
    let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = taken.local_addr().unwrap();

    let http = Arc::new(HttpProvider::new(
        meshestra_http::server::BindListener::new(addr.to_string()),
        Vec::new(),
    ));
    let app = Application::builder()
        .daemon(Arc::clone(&http))
        .build()
        .await
        .unwrap();
    let graceful = app.graceful();

    let result = tokio::time::timeout(Duration::from_secs(5), app.run())
        .await
        .unwrap();
    assert!(matches!(result, Err(LifecycleError::DaemonFailed { .. })));
    assert_eq!(graceful.shutdown_requests(), 1);
    drop(taken);
}
