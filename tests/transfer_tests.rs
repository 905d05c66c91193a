use httpmock::Method::{POST, PUT};
use httpmock::MockServer;
use serde_json::json;
use std::collections::HashMap;
use std::net::TcpListener;
use tape_cli::config::TOKEN_KEY;
use tape_cli::graphql::GRAPHQL_PATH;
use tape_cli::ui::upload_file;
use tape_cli::{transfer_file, ApiClient, UploadError};

fn can_bind_localhost() -> bool {
    TcpListener::bind("127.0.0.1:0").is_ok()
}

#[test]
fn empty_file_is_one_put_with_empty_body() {
    if !can_bind_localhost() {
        eprintln!("Skipping httpmock tests: cannot bind to localhost");
        return;
    }

    let server = MockServer::start();
    let put = server.mock(|when, then| {
        when.method(PUT)
            .path("/abc123")
            .query_param("sig", "xyz")
            .body("");
        then.status(200);
    });

    let outcome = transfer_file(
        Vec::new(),
        &server.url("/abc123?sig=xyz"),
        &HashMap::new(),
    )
    .unwrap();

    put.assert_hits(1);
    assert!(outcome.status.is_success());
}

#[test]
fn forbidden_is_reported_once_without_retry() {
    if !can_bind_localhost() {
        eprintln!("Skipping httpmock tests: cannot bind to localhost");
        return;
    }

    let server = MockServer::start();
    let put = server.mock(|when, then| {
        when.method(PUT).path("/expired");
        then.status(403).body("Request has expired");
    });

    let err = transfer_file(b"data".to_vec(), &server.url("/expired"), &HashMap::new())
        .unwrap_err();

    put.assert_hits(1);
    assert_eq!(err.status().map(|s| s.as_u16()), Some(403));
    match err {
        UploadError::Transport { body, .. } => assert_eq!(body, "Request has expired"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn caller_headers_and_bytes_are_sent() {
    if !can_bind_localhost() {
        eprintln!("Skipping httpmock tests: cannot bind to localhost");
        return;
    }

    let server = MockServer::start();
    let payload = vec![7u8; 3 * 1024 * 1024];
    let put = server.mock(|when, then| {
        when.method(PUT)
            .path("/big")
            .header("content-type", "video/mp4")
            .header("content-length", "3145728");
        then.status(201);
    });

    let mut headers = HashMap::new();
    headers.insert("content-type".to_string(), "video/mp4".to_string());
    let outcome = transfer_file(payload, &server.url("/big"), &headers).unwrap();

    put.assert_hits(1);
    assert_eq!(outcome.status.as_u16(), 201);
}

#[test]
fn connection_refused_is_a_transport_failure() {
    let port = TcpListener::bind("127.0.0.1:0")
        .map(|l| l.local_addr().unwrap().port())
        .unwrap_or(9);
    // Listener is dropped above, so nothing accepts on this port.
    let err = transfer_file(
        Vec::new(),
        &format!("http://127.0.0.1:{port}/x"),
        &HashMap::new(),
    )
    .unwrap_err();
    assert!(matches!(err, UploadError::Http(_)));
    assert_eq!(err.status(), None);
}

#[test]
fn upload_file_runs_slot_transfer_confirm_in_order() {
    if !can_bind_localhost() {
        eprintln!("Skipping httpmock tests: cannot bind to localhost");
        return;
    }

    let server = MockServer::start();
    let signed_url = server.url("/store/abc123?sig=xyz");

    let create = server.mock(|when, then| {
        when.method(POST)
            .path(GRAPHQL_PATH)
            .body_contains("createTape")
            .json_body_partial(r#"{"variables":{"fileName":"notes.txt","contentType":"text/plain"}}"#);
        then.status(200).json_body(json!({
            "data": { "createTape": {
                "id": "abc123",
                "url": signed_url,
                "tapeUrl": "https://tape.example/t/abc123"
            } }
        }));
    });
    let put = server.mock(|when, then| {
        when.method(PUT)
            .path("/store/abc123")
            .query_param("sig", "xyz")
            .header("content-type", "text/plain")
            .body("hello tape");
        then.status(200);
    });
    let confirm = server.mock(|when, then| {
        when.method(POST)
            .path(GRAPHQL_PATH)
            .body_contains("confirmTape")
            .json_body_partial(r#"{"variables":{"id":"abc123"}}"#);
        then.status(200)
            .json_body(json!({ "data": { "confirmTape": { "fileSize": 10 } } }));
    });

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.txt");
    std::fs::write(&path, "hello tape").unwrap();

    let mut credentials = HashMap::new();
    credentials.insert(TOKEN_KEY.to_string(), "t".to_string());
    let api = ApiClient::new(&server.base_url(), credentials).unwrap();

    let slot = upload_file(&api, &path).unwrap();

    create.assert_hits(1);
    put.assert_hits(1);
    confirm.assert_hits(1);
    assert_eq!(slot.id, "abc123");
}

#[test]
fn failed_transfer_skips_confirmation() {
    if !can_bind_localhost() {
        eprintln!("Skipping httpmock tests: cannot bind to localhost");
        return;
    }

    let server = MockServer::start();
    let signed_url = server.url("/store/abc123");
    server.mock(|when, then| {
        when.method(POST).path(GRAPHQL_PATH).body_contains("createTape");
        then.status(200).json_body(json!({
            "data": { "createTape": {
                "id": "abc123",
                "url": signed_url,
                "tapeUrl": "https://tape.example/t/abc123"
            } }
        }));
    });
    let put = server.mock(|when, then| {
        when.method(PUT).path("/store/abc123");
        then.status(403);
    });
    let confirm = server.mock(|when, then| {
        when.method(POST).path(GRAPHQL_PATH).body_contains("confirmTape");
        then.status(200)
            .json_body(json!({ "data": { "confirmTape": { "fileSize": 10 } } }));
    });

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.txt");
    std::fs::write(&path, "hello tape").unwrap();

    let mut credentials = HashMap::new();
    credentials.insert(TOKEN_KEY.to_string(), "t".to_string());
    let api = ApiClient::new(&server.base_url(), credentials).unwrap();

    let err = upload_file(&api, &path).unwrap_err();
    let err = err.downcast::<UploadError>().unwrap();
    assert_eq!(err.status().map(|s| s.as_u16()), Some(403));

    put.assert_hits(1);
    confirm.assert_hits(0);
}
