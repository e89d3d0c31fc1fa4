//! REST transport against a minimal HTTP stub.

use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use puma_remote::{Connector, RemoteModule, RestConfig, RestConnector};
use puma_types::{
    Action, CachedAttributeSet, DataType, Decision, Environment, EventKind, Object,
    PolicyReference, RecordingSink, Subject, as_cached_attributes,
};

struct Stub {
    base_url: String,
    requests: Arc<AtomicUsize>,
    last_body: Arc<Mutex<Option<(String, String)>>>,
}

/// Answers every request with `status` and `body`.
fn spawn_stub(status: u16, body: &'static str) -> Stub {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());
    let requests = Arc::new(AtomicUsize::new(0));
    let last_body = Arc::new(Mutex::new(None));

    {
        let requests = requests.clone();
        let last_body = last_body.clone();
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(mut stream) = stream else { break };
                let mut reader = BufReader::new(stream.try_clone().unwrap());

                let mut request_line = String::new();
                reader.read_line(&mut request_line).unwrap();
                let path = request_line
                    .split_whitespace()
                    .nth(1)
                    .unwrap_or_default()
                    .to_string();

                let mut content_length = 0usize;
                loop {
                    let mut line = String::new();
                    reader.read_line(&mut line).unwrap();
                    let line = line.trim_end();
                    if line.is_empty() {
                        break;
                    }
                    if let Some((name, value)) = line.split_once(':') {
                        if name.eq_ignore_ascii_case("content-length") {
                            content_length = value.trim().parse().unwrap();
                        }
                    }
                }
                let mut request_body = vec![0u8; content_length];
                reader.read_exact(&mut request_body).unwrap();
                requests.fetch_add(1, Ordering::SeqCst);
                *last_body.lock().unwrap() =
                    Some((path, String::from_utf8(request_body).unwrap()));

                let response = format!(
                    "HTTP/1.1 {status} Stub\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = stream.write_all(response.as_bytes());
            }
        });
    }

    Stub {
        base_url,
        requests,
        last_body,
    }
}

fn module(base_url: &str) -> (RemoteModule<RestConnector>, Arc<RecordingSink>) {
    let sink = Arc::new(RecordingSink::new());
    let connector = RestConnector::new(RestConfig {
        base_url: base_url.to_string(),
        timeout: Duration::from_secs(2),
    });
    (
        RemoteModule::new(connector, ["central-puma-policy"], sink.clone()),
        sink,
    )
}

fn central() -> PolicyReference {
    PolicyReference::new("central-puma-policy")
}

fn cache() -> CachedAttributeSet {
    let mut subject = Subject::new("maarten");
    subject
        .set_all("roles", DataType::String, vec!["helpdesk".into()])
        .unwrap();
    as_cached_attributes(&subject, &Object::new("123"), &Action::new("read"), &Environment::new())
}

#[test]
fn permit_is_posted_to_evaluate() {
    let stub = spawn_stub(200, r#"{"results":[{"decision":"PERMIT"}]}"#);
    let (module, sink) = module(&stub.base_url);

    assert_eq!(module.find_and_evaluate(&central(), &cache()), Decision::Permit);
    assert_eq!(sink.kinds(), vec![EventKind::RemoteDecision]);

    let (path, body) = stub.last_body.lock().unwrap().clone().unwrap();
    assert_eq!(path, "/evaluate");
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["attributes"][0]["id"], "subject:roles");
    assert_eq!(json["attributes"][0]["ownerKind"], "SUBJECT");
    assert_eq!(json["attributes"][1]["id"], "action:id");
    assert_eq!(json["attributes"][1]["ownerKind"], "ACTION");
}

#[test]
fn server_error_retries_once_then_denies() {
    let stub = spawn_stub(500, "{}");
    let (module, sink) = module(&stub.base_url);

    assert_eq!(module.find_and_evaluate(&central(), &cache()), Decision::Deny);
    assert_eq!(stub.requests.load(Ordering::SeqCst), 2);
    assert_eq!(
        sink.kinds(),
        vec![EventKind::RetryingCall, EventKind::RetryExhausted]
    );
}

#[test]
fn empty_results_deny() {
    let stub = spawn_stub(200, r#"{"results":[]}"#);
    let (module, sink) = module(&stub.base_url);

    assert_eq!(module.find_and_evaluate(&central(), &cache()), Decision::Deny);
    assert_eq!(sink.kinds(), vec![EventKind::InvalidRemoteResponse]);
}

#[test]
fn two_results_deny() {
    let stub = spawn_stub(
        200,
        r#"{"results":[{"decision":"PERMIT"},{"decision":"PERMIT"}]}"#,
    );
    let (module, _) = module(&stub.base_url);

    assert_eq!(module.find_and_evaluate(&central(), &cache()), Decision::Deny);
}

#[test]
fn unrecognized_decision_is_indeterminate() {
    let stub = spawn_stub(200, r#"{"results":[{"decision":"ALLOW"}]}"#);
    let (module, _) = module(&stub.base_url);

    assert_eq!(
        module.find_and_evaluate(&central(), &cache()),
        Decision::Indeterminate
    );
}

#[test]
fn non_http_base_url_cannot_connect() {
    let connector = RestConnector::new(RestConfig {
        base_url: "ftp://central".to_string(),
        timeout: Duration::from_secs(1),
    });
    assert!(connector.connect(None).is_err());

    let connector = RestConnector::new(RestConfig {
        base_url: "http://central:8080/".to_string(),
        timeout: Duration::from_secs(1),
    });
    assert_eq!(
        connector.connect(None).unwrap().url(),
        "http://central:8080/evaluate"
    );
}
