//! Tests of the reqwest transport against a local HTTP server

use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use toggl_wiki::gateway::Endpoints;
use toggl_wiki::{Credentials, ReqwestTransport, Tag, TogglExtension, TtlCache};

/// Answer every connection with `status` and `body`, counting requests.
fn serve(status: &'static str, body: &'static str) -> (String, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&hits);

    thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(mut stream) = stream else { break };
            let mut request = Vec::new();
            let mut chunk = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                match stream.read(&mut chunk) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => request.extend_from_slice(&chunk[..n]),
                }
            }
            counter.fetch_add(1, Ordering::SeqCst);
            let response = format!(
                "HTTP/1.1 {status}\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            let _ = stream.write_all(response.as_bytes());
        }
    });

    (base, hits)
}

fn extension(base: &str) -> TogglExtension {
    let endpoints = Endpoints {
        api_base: base.to_string(),
        reports_base: base.to_string(),
    };
    TogglExtension::new(
        Arc::new(ReqwestTransport::with_client(
            reqwest::Client::builder().no_proxy().build().unwrap(),
        )),
        endpoints,
        Arc::new(TtlCache::default()),
    )
}

#[tokio::test]
async fn test_html_success_page_is_malformed_and_not_cached() {
    let (base, hits) = serve("200 OK", "<html>maintenance</html>");
    let extension = extension(&base);

    for _ in 0..2 {
        let output = extension
            .session(Credentials::new(Some("token".to_string())))
            .render(Tag::WorkspaceProjects, &["workspace_id=5"])
            .await;
        assert!(output.text.contains("unexpected response"), "got {}", output.text);
    }

    assert!(extension.responses().is_empty());
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_plain_text_error_status_is_reported() {
    let (base, _hits) = serve("503 Service Unavailable", "down for maintenance");
    let extension = extension(&base);

    let output = extension
        .session(Credentials::new(Some("token".to_string())))
        .render(Tag::Workspaces, &[] as &[&str])
        .await;

    assert!(output.text.contains("503"), "got {}", output.text);
    assert!(extension.responses().is_empty());
}
