use plainhttp::http::request::{Method, Request, RequestBuilder};
use std::collections::HashMap;

fn request(method: Method, target: &str, headers: HashMap<String, String>) -> Request {
    Request {
        method,
        target: target.to_string(),
        version: "HTTP/1.1".to_string(),
        headers,
        body: Default::default(),
    }
}

#[test]
fn test_request_header_retrieval() {
    let mut headers = HashMap::new();
    headers.insert("Host".to_string(), "example.com".to_string());
    headers.insert("Content-Type".to_string(), "application/json".to_string());

    let req = request(Method::GET, "/", headers);

    assert_eq!(req.header("Host"), Some("example.com"));
    assert_eq!(req.header("Content-Type"), Some("application/json"));
    assert_eq!(req.header("Missing"), None);
}

#[test]
fn test_request_header_names_are_case_sensitive() {
    let mut headers = HashMap::new();
    headers.insert("Host".to_string(), "example.com".to_string());

    let req = request(Method::GET, "/", headers);

    assert_eq!(req.header("host"), None);
}

#[test]
fn test_request_path_and_query() {
    let req = request(Method::GET, "/files/a.txt?download=1&x", HashMap::new());

    assert_eq!(req.path(), "/files/a.txt");
    assert_eq!(req.query(), Some("download=1&x"));

    let plain = request(Method::GET, "/files/a.txt", HashMap::new());
    assert_eq!(plain.path(), "/files/a.txt");
    assert_eq!(plain.query(), None);
}

#[test]
fn test_request_method_equality() {
    assert_eq!(Method::GET, Method::GET);
    assert_ne!(Method::GET, Method::POST);
    assert_ne!(Method::GET, Method::Extension("get".to_string()));
}

#[test]
fn test_request_method_from_string() {
    assert_eq!(Method::from_str("GET"), Some(Method::GET));
    assert_eq!(Method::from_str("POST"), Some(Method::POST));
    assert_eq!(Method::from_str("PURGE"), Some(Method::Extension("PURGE".to_string())));
    assert_eq!(Method::from_str(""), None);
    assert_eq!(Method::from_str("GE T"), None);
}

#[test]
fn test_request_method_display() {
    assert_eq!(Method::PATCH.to_string(), "PATCH");
    assert_eq!(Method::Extension("MKCOL".to_string()).as_str(), "MKCOL");
}

#[test]
fn test_request_builder() {
    let req = RequestBuilder::new()
        .method(Method::PUT)
        .target("/items/7")
        .header("Content-Type", "text/plain")
        .body("payload")
        .build()
        .unwrap();

    assert_eq!(req.method, Method::PUT);
    assert_eq!(req.target, "/items/7");
    assert_eq!(req.version, "HTTP/1.1");
    assert_eq!(req.header("Content-Type"), Some("text/plain"));
    assert_eq!(&req.body[..], b"payload");
}

#[test]
fn test_request_builder_requires_method_and_target() {
    assert!(RequestBuilder::new().target("/").build().is_err());
    assert!(RequestBuilder::new().method(Method::GET).build().is_err());
}
