//! End-to-end tests of the reqwest transport against a throwaway HTTP responder

use lathermail_client::{LathermailClient, LathermailError, MessageFilter};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// What the responder saw
struct Received {
    request_line: String,
    headers: Vec<(String, String)>,
}

impl Received {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Accept one connection, record its request head, answer with `status` and `body`
async fn serve_once(status: &str, content_type: &str, body: &[u8]) -> (String, JoinHandle<Received>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let mut response = if status.starts_with("204") {
        format!("HTTP/1.1 {}\r\nConnection: close\r\n\r\n", status).into_bytes()
    } else {
        format!(
            "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            status,
            content_type,
            body.len()
        )
        .into_bytes()
    };
    response.extend_from_slice(body);

    let handle = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut head = Vec::new();
        let mut chunk = [0u8; 1024];
        while !head.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = stream.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            head.extend_from_slice(&chunk[..n]);
        }
        stream.write_all(&response).await.unwrap();
        let _ = stream.shutdown().await;

        let head = String::from_utf8_lossy(&head).into_owned();
        let mut lines = head.split("\r\n");
        let request_line = lines.next().unwrap_or_default().to_string();
        let headers = lines
            .filter_map(|line| line.split_once(':'))
            .map(|(name, value)| (name.trim().to_string(), value.trim().to_string()))
            .collect();
        Received {
            request_line,
            headers,
        }
    });

    (format!("http://{}/", addr), handle)
}

fn client(url: &str) -> LathermailClient {
    LathermailClient::builder("u1", "p1")
        .url(url)
        .timezone(chrono::Utc)
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_search_sends_wire_params_and_auth() {
    let body = br#"{"message_list": [{"_id": "1"}]}"#;
    let (url, server) = serve_once("200 OK", "application/json", body).await;

    let filter = MessageFilter {
        recipients_address: Some("tst@tst.tt".into()),
        ..Default::default()
    };
    let messages = client(&url).get_messages(&filter).await.unwrap();
    assert_eq!(messages.len(), 1);

    let received = server.await.unwrap();
    assert_eq!(
        received.request_line,
        "GET /api/0/messages/?recipients.address=tst%40tst.tt HTTP/1.1"
    );
    assert_eq!(received.header("X-Mail-Inbox"), Some("u1"));
    assert_eq!(received.header("X-Mail-Password"), Some("p1"));
}

#[tokio::test]
async fn test_inboxes_without_inbox_header() {
    let (url, server) = serve_once("200 OK", "application/json", br#"{"inbox_list": ["a", "b"]}"#).await;

    let inboxes = client(&url).get_inboxes(Some("p2")).await.unwrap();
    assert_eq!(inboxes, vec!["a", "b"]);

    let received = server.await.unwrap();
    assert_eq!(received.request_line, "GET /api/0/inboxes HTTP/1.1");
    assert_eq!(received.header("X-Mail-Inbox"), None);
    assert_eq!(received.header("X-Mail-Password"), Some("p2"));
}

#[tokio::test]
async fn test_delete_messages_no_content() {
    let (url, server) = serve_once("204 No Content", "", b"").await;

    let filter = MessageFilter {
        sender_name_contains: Some("bob".into()),
        ..Default::default()
    };
    client(&url).delete_messages(&filter).await.unwrap();

    let received = server.await.unwrap();
    assert_eq!(
        received.request_line,
        "DELETE /api/0/messages/?sender.name_contains=bob HTTP/1.1"
    );
}

#[tokio::test]
async fn test_attachment_bytes_untouched() {
    let content = [0u8, 159, 146, 150, b'{', b'}'];
    let (url, server) = serve_once("200 OK", "application/octet-stream", &content).await;

    let received_content = client(&url).get_attachment("abc", 1).await.unwrap();
    assert_eq!(received_content, content);

    let received = server.await.unwrap();
    assert_eq!(received.request_line, "GET /api/0/messages/abc/attachments/1 HTTP/1.1");
}

#[tokio::test]
async fn test_error_status() {
    let (url, server) = serve_once("403 Forbidden", "application/json", br#"{"a": "b"}"#).await;

    match client(&url).get_inboxes(None).await {
        Err(LathermailError::InvalidStatus { status, body }) => {
            assert_eq!(status, 403);
            assert_eq!(body, r#"{"a": "b"}"#);
        }
        other => panic!("expected InvalidStatus, got {:?}", other),
    }
    server.await.unwrap();
}

#[tokio::test]
async fn test_non_json_body() {
    let (url, server) = serve_once("200 OK", "text/html", b"<html>not json here</html>").await;

    match client(&url).get_single_message("abc").await {
        Err(e @ LathermailError::InvalidResponse { .. }) => {
            assert!(e.to_string().contains("<html>not json here</html>"));
        }
        other => panic!("expected InvalidResponse, got {:?}", other),
    }
    server.await.unwrap();
}
