use serde_json::{json, Value};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

/// Start an empty mock server for the photo backend.
pub async fn backend() -> MockServer {
    MockServer::start().await
}

/// Build a photo record the way the backend serializes it.
pub fn photo_json(id: &str, url: &str, title: Option<&str>) -> Value {
    json!({
        "id": id,
        "url": url,
        "title": title,
        "caption": "",
        "date": "2023-01-01"
    })
}

/// Expect `GET /` and answer with a greeting.
pub async fn expect_health(server: &MockServer, message: &str) {
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "message": message })))
        .mount(server)
        .await;
}

/// Expect `POST /login` and answer with the given access token, or with an
/// empty object when `token` is `None`.
pub async fn expect_login(server: &MockServer, token: Option<&str>) {
    let body = match token {
        Some(t) => json!({ "access_token": t, "token_type": "bearer" }),
        None => json!({}),
    };
    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// Expect `POST /login` and answer with a non-JSON page, as a proxy in front
/// of the backend does when it is down.
pub async fn expect_login_page(server: &MockServer, status: u16, page: &str) {
    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(status).set_body_string(page))
        .mount(server)
        .await;
}

/// Expect `GET /me`: the given token is accepted, anything else gets a 401.
pub async fn expect_me(server: &MockServer, valid_token: &str) {
    Mock::given(method("GET"))
        .and(path("/me"))
        .and(header("authorization", format!("Bearer {}", valid_token).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "username": "a" })))
        .with_priority(1)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/me"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "detail": "Invalid token" })))
        .with_priority(10)
        .mount(server)
        .await;
}

/// Expect `GET /photos` with the given bearer token and answer with `photos`.
pub async fn expect_photos(server: &MockServer, token: &str, photos: Vec<Value>) {
    Mock::given(method("GET"))
        .and(path("/photos"))
        .and(header("authorization", format!("Bearer {}", token).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "photos": photos })))
        .mount(server)
        .await;
}

/// Expect `POST /upload` and answer with the given image URL, or with an
/// empty object when `image_url` is `None`.
pub async fn expect_upload(server: &MockServer, image_url: Option<&str>) {
    let body = match image_url {
        Some(u) => json!({ "image_url": u }),
        None => json!({}),
    };
    Mock::given(method("POST"))
        .and(path("/upload"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// Expect `DELETE /photo/{id}` and answer with `status`.
pub async fn expect_delete(server: &MockServer, id: &str, status: u16) {
    Mock::given(method("DELETE"))
        .and(path(format!("/photo/{}", id)))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}

/// Requests received so far, as `(METHOD, path)` pairs in arrival order.
pub async fn request_log(server: &MockServer) -> Vec<(String, String)> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .map(|r: &Request| (r.method.to_string(), r.url.path().to_string()))
        .collect()
}

/// A local URL with nothing listening on it, for transport failures.
pub fn unreachable_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);
    format!("http://{}", addr)
}
