use std::time::Duration;

use repofinder_api::{GitHubClient, GitHubError};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

const BODY: &str = r#"{"total_count":2,"incomplete_results":false,"items":[
    {"id":1,"name":"one","owner":{"id":10,"login":"alice","avatar_url":"a","repos_url":"r","html_url":"h"},
     "description":"first","stargazers_count":5,"watchers_count":5,"open_issues_count":1,"private":false},
    {"id":2,"name":"two","owner":{"id":10,"login":"alice","avatar_url":"a","repos_url":"r","html_url":"h"},
     "description":null,"stargazers_count":0,"watchers_count":0,"open_issues_count":0,"private":true}
]}"#;

/// Serve exactly one canned HTTP response and hand back the raw request head.
async fn serve_once(status_line: &'static str, body: &'static str) -> (String, oneshot::Receiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = oneshot::channel();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        loop {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            request.extend_from_slice(&buf[..n]);
            if request.windows(4).any(|w| w == b"\r\n\r\n") {
                break;
            }
        }

        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status_line,
            body.len(),
            body
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.ok();
        let _ = tx.send(String::from_utf8_lossy(&request).into_owned());
    });

    (format!("http://{}", addr), rx)
}

#[tokio::test]
async fn test_search_sends_paging_parameters() {
    let (base_url, request) = serve_once("200 OK", BODY).await;
    let client = GitHubClient::with_base_url(base_url).unwrap();

    let result = client.search_repositories("go lang", 3, 20).await.unwrap();
    assert_eq!(result.total_count, 2);
    assert_eq!(result.items.len(), 2);
    assert_eq!(result.items[1].name, "two");
    assert!(result.items[1].private);

    let head = request.await.unwrap();
    let request_line = head.lines().next().unwrap();
    assert!(request_line.starts_with("GET /search/repositories?"));
    assert!(request_line.contains("q=go+lang"));
    assert!(request_line.contains("page=3"));
    assert!(request_line.contains("per_page=20"));
    assert!(head.to_ascii_lowercase().contains("accept: application/json"));
}

#[tokio::test]
async fn test_non_ok_status_is_reported_with_code() {
    for (status_line, code) in [
        ("400 Bad Request", 400),
        ("403 Forbidden", 403),
        ("404 Not Found", 404),
        ("422 Unprocessable Entity", 422),
        ("500 Internal Server Error", 500),
    ] {
        let (base_url, _request) = serve_once(status_line, "{}").await;
        let client = GitHubClient::with_base_url(base_url).unwrap();

        let err = client.search_repositories("rust", 1, 20).await.unwrap_err();
        assert_eq!(err.status_code(), Some(code), "for {}", status_line);
    }
}

#[tokio::test]
async fn test_garbage_body_is_unexpected_not_transport() {
    let (base_url, _request) = serve_once("200 OK", "definitely not json").await;
    let client = GitHubClient::with_base_url(base_url).unwrap();

    let err = client.search_repositories("rust", 1, 20).await.unwrap_err();
    assert!(matches!(err, GitHubError::Unexpected(_)), "got {:?}", err);
    assert_eq!(err.status_code(), None);
}

#[tokio::test]
async fn test_refused_connection_is_transport_error() {
    // Grab a free port, then close it again so nothing is listening
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = GitHubClient::with_base_url(format!("http://{}", addr)).unwrap();
    let err = client.search_repositories("rust", 1, 20).await.unwrap_err();

    assert!(err.is_transport(), "got {:?}", err);
}

#[tokio::test]
async fn test_timeout_is_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    // Accept and then say nothing
    tokio::spawn(async move {
        let (_socket, _) = listener.accept().await.unwrap();
        tokio::time::sleep(Duration::from_secs(5)).await;
    });

    let client = GitHubClient::with_settings(
        format!("http://{}", addr),
        "repofinder-tests",
        Duration::from_millis(200),
    )
    .unwrap();

    let err = client.search_repositories("rust", 1, 20).await.unwrap_err();
    assert!(err.is_transport(), "got {:?}", err);
}
