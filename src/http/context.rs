//! Per-request context handed to route handlers.
//!
//! # Responsibilities
//! - Carry the path parameters bound by the router
//! - Expose request accessors (headers, query form, post form, cookies, body)
//! - Buffer the response (status, headers, body) written by the handler
//!
//! # Design Decisions
//! - The request body is fully buffered before the handler runs, so handlers
//!   stay synchronous
//! - Responses default to 200 OK; a non-empty body without a content type is
//!   sent as plain text

use std::collections::HashMap;
use std::io;
use std::net::SocketAddr;

use axum::body::Body;
use axum::extract::{ConnectInfo, FromRequest, Multipart};
use axum::http::{header, request, HeaderMap, HeaderValue, Method, Request, StatusCode, Uri, Version};
use axum::response::Response;
use bytes::Bytes;
use cookie::Cookie;
use futures_util::FutureExt;
use serde::de::DeserializeOwned;

use crate::error::ContextError;
use crate::routing::Params;

/// Multi-valued form fields, as parsed from a query string or urlencoded body.
pub type Form = HashMap<String, Vec<String>>;

/// A parsed `multipart/form-data` body.
#[derive(Debug, Clone, Default)]
pub struct MultipartForm {
    /// Fields sent without a file name.
    pub values: Form,
    /// Uploaded files by field name.
    pub files: HashMap<String, Vec<FormFile>>,
}

/// One uploaded file from a multipart body.
#[derive(Debug, Clone)]
pub struct FormFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub data: Bytes,
}

const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";
const MULTIPART_FORM_DATA: &str = "multipart/form-data";
const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

/// Request and response state for one dispatched request.
#[derive(Debug)]
pub struct Context {
    parts: request::Parts,
    body: Bytes,
    params: Params,
    status: StatusCode,
    headers: HeaderMap,
    buf: Vec<u8>,
}

impl Context {
    pub(crate) fn new(request: Request<Bytes>, params: Params) -> Self {
        let (parts, body) = request.into_parts();
        Self {
            parts,
            body,
            params,
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            buf: Vec::new(),
        }
    }

    /// Value bound to the named path parameter.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name)
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn method(&self) -> &Method {
        &self.parts.method
    }

    pub fn uri(&self) -> &Uri {
        &self.parts.uri
    }

    pub fn path(&self) -> &str {
        self.parts.uri.path()
    }

    pub fn version(&self) -> Version {
        self.parts.version
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.parts.headers
    }

    /// First value of a request header, if present and valid UTF-8.
    pub fn header(&self, name: impl header::AsHeaderName) -> Option<&str> {
        self.parts.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn user_agent(&self) -> Option<&str> {
        self.header(header::USER_AGENT)
    }

    pub fn referer(&self) -> Option<&str> {
        self.header(header::REFERER)
    }

    /// Host from the URI authority, falling back to the `Host` header.
    pub fn host(&self) -> Option<&str> {
        self.parts
            .uri
            .host()
            .or_else(|| self.header(header::HOST))
    }

    /// Address of the connected peer.
    ///
    /// Only set when the server was started with connect info, as
    /// [`HttpServer`](crate::http::HttpServer) does.
    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr)
    }

    /// Parsed query string.
    pub fn query(&self) -> Form {
        parse_form(self.parts.uri.query().unwrap_or_default().as_bytes())
    }

    /// First value of a query string field.
    pub fn query_value(&self, name: &str) -> Option<String> {
        self.query().remove(name).and_then(|v| v.into_iter().next())
    }

    /// Parse an `application/x-www-form-urlencoded` request body.
    pub fn post_form(&self) -> Result<Form, ContextError> {
        self.require_content_type(FORM_URLENCODED)?;
        Ok(parse_form(&self.body))
    }

    /// Parse a `multipart/form-data` request body.
    ///
    /// Fields with a file name land in `files`, the rest in `values`.
    pub fn multipart_form(&self) -> Result<MultipartForm, ContextError> {
        self.require_content_type(MULTIPART_FORM_DATA)?;

        let mut request = Request::new(Body::from(self.body.clone()));
        if let Some(content_type) = self.parts.headers.get(header::CONTENT_TYPE) {
            request
                .headers_mut()
                .insert(header::CONTENT_TYPE, content_type.clone());
        }

        // The body is already in memory, so the parser never has to wait.
        read_multipart(request)
            .now_or_never()
            .unwrap_or(Err(ContextError::MultipartIncomplete))
    }

    fn require_content_type(&self, expected: &'static str) -> Result<(), ContextError> {
        let content_type = self.header(header::CONTENT_TYPE);
        let matches = content_type
            .map(|ct| ct.split(';').next().unwrap_or_default().trim())
            .is_some_and(|ct| ct.eq_ignore_ascii_case(expected));

        if matches {
            Ok(())
        } else {
            Err(ContextError::UnsupportedContentType {
                expected,
                found: content_type.map(str::to_string),
            })
        }
    }

    /// All well-formed cookies sent with the request.
    pub fn cookies(&self) -> Vec<Cookie<'static>> {
        self.parts
            .headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| Cookie::split_parse(v.to_string()))
            .filter_map(Result::ok)
            .collect()
    }

    pub fn cookie(&self, name: &str) -> Option<Cookie<'static>> {
        self.cookies().into_iter().find(|c| c.name() == name)
    }

    /// The buffered request body.
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ContextError> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Status that will be sent.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn write_header(&mut self, status: StatusCode) {
        self.status = status;
    }

    pub fn response_headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn response_headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Set the status and append `text` to the response body.
    pub fn string(&mut self, status: StatusCode, text: impl AsRef<str>) {
        self.write_header(status);
        self.buf.extend_from_slice(text.as_ref().as_bytes());
    }

    /// Serialize `value` as the JSON response body.
    pub fn write_json<T: serde::Serialize>(&mut self, status: StatusCode, value: &T) -> Result<(), ContextError> {
        let body = serde_json::to_vec(value)?;
        self.write_header(status);
        self.headers
            .insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        self.buf.extend_from_slice(&body);
        Ok(())
    }

    /// Consume the context, producing the buffered response.
    pub fn into_response(self) -> Response {
        let mut headers = self.headers;
        if !self.buf.is_empty() && !headers.contains_key(header::CONTENT_TYPE) {
            headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(TEXT_PLAIN));
        }

        let mut response = Response::new(Body::from(self.buf));
        *response.status_mut() = self.status;
        *response.headers_mut() = headers;
        response
    }
}

impl io::Write for Context {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

async fn read_multipart(request: Request<Body>) -> Result<MultipartForm, ContextError> {
    let mut multipart = Multipart::from_request(request, &()).await?;
    let mut form = MultipartForm::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match field.file_name().map(str::to_string) {
            Some(file_name) => {
                let content_type = field.content_type().map(str::to_string);
                let data = field.bytes().await?;
                form.files.entry(name).or_default().push(FormFile {
                    file_name,
                    content_type,
                    data,
                });
            }
            None => {
                let value = field.text().await?;
                form.values.entry(name).or_default().push(value);
            }
        }
    }

    Ok(form)
}

fn parse_form(input: &[u8]) -> Form {
    let mut form = Form::new();
    for (key, value) in url::form_urlencoded::parse(input) {
        form.entry(key.into_owned()).or_default().push(value.into_owned());
    }
    form
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn context(request: Request<Bytes>) -> Context {
        Context::new(request, [("name", "alice")].into_iter().collect())
    }

    #[test]
    fn test_params_and_request_accessors() {
        let ctx = context(
            Request::builder()
                .method(Method::GET)
                .uri("/user/alice?tab=posts&tab=likes&page=2")
                .header("user-agent", "test-agent")
                .header("host", "example.com")
                .body(Bytes::new())
                .unwrap(),
        );

        assert_eq!(ctx.param("name"), Some("alice"));
        assert_eq!(ctx.path(), "/user/alice");
        assert_eq!(ctx.user_agent(), Some("test-agent"));
        assert_eq!(ctx.host(), Some("example.com"));
        assert_eq!(ctx.referer(), None);

        let query = ctx.query();
        assert_eq!(query["tab"], vec!["posts", "likes"]);
        assert_eq!(ctx.query_value("page").as_deref(), Some("2"));
    }

    #[test]
    fn test_post_form() {
        let ctx = context(
            Request::builder()
                .method(Method::POST)
                .uri("/login")
                .header("content-type", "application/x-www-form-urlencoded; charset=utf-8")
                .body(Bytes::from_static(b"user=bob&pass=a%20b"))
                .unwrap(),
        );

        let form = ctx.post_form().unwrap();
        assert_eq!(form["user"], vec!["bob"]);
        assert_eq!(form["pass"], vec!["a b"]);
    }

    #[test]
    fn test_post_form_requires_content_type() {
        let ctx = context(
            Request::builder()
                .method(Method::POST)
                .uri("/login")
                .body(Bytes::from_static(b"user=bob"))
                .unwrap(),
        );

        assert!(matches!(
            ctx.post_form(),
            Err(ContextError::UnsupportedContentType { found: None, .. })
        ));
    }

    #[test]
    fn test_multipart_form() {
        let body = concat!(
            "--XBOUNDARY\r\n",
            "Content-Disposition: form-data; name=\"title\"\r\n",
            "\r\n",
            "holiday\r\n",
            "--XBOUNDARY\r\n",
            "Content-Disposition: form-data; name=\"photo\"; filename=\"beach.txt\"\r\n",
            "Content-Type: text/plain\r\n",
            "\r\n",
            "sand and sea\r\n",
            "--XBOUNDARY--\r\n",
        );
        let ctx = context(
            Request::builder()
                .method(Method::POST)
                .uri("/upload")
                .header("content-type", "multipart/form-data; boundary=XBOUNDARY")
                .body(Bytes::from_static(body.as_bytes()))
                .unwrap(),
        );

        let form = ctx.multipart_form().unwrap();
        assert_eq!(form.values["title"], vec!["holiday"]);

        let photo = &form.files["photo"][0];
        assert_eq!(photo.file_name, "beach.txt");
        assert_eq!(photo.content_type.as_deref(), Some("text/plain"));
        assert_eq!(&photo.data[..], b"sand and sea");
    }

    #[test]
    fn test_multipart_form_requires_content_type() {
        let ctx = context(
            Request::builder()
                .method(Method::POST)
                .uri("/upload")
                .header("content-type", "application/x-www-form-urlencoded")
                .body(Bytes::from_static(b"title=holiday"))
                .unwrap(),
        );

        assert!(matches!(
            ctx.multipart_form(),
            Err(ContextError::UnsupportedContentType { expected: MULTIPART_FORM_DATA, .. })
        ));
    }

    #[test]
    fn test_remote_addr_from_connect_info() {
        let addr: SocketAddr = "10.1.2.3:4567".parse().unwrap();
        let mut request = Request::builder().uri("/").body(Bytes::new()).unwrap();
        request.extensions_mut().insert(ConnectInfo(addr));

        assert_eq!(context(request).remote_addr(), Some(addr));
        assert_eq!(
            context(Request::builder().uri("/").body(Bytes::new()).unwrap()).remote_addr(),
            None
        );
    }

    #[test]
    fn test_cookies() {
        let ctx = context(
            Request::builder()
                .uri("/")
                .header("cookie", "session=abc123; theme=dark")
                .body(Bytes::new())
                .unwrap(),
        );

        assert_eq!(ctx.cookies().len(), 2);
        assert_eq!(ctx.cookie("theme").unwrap().value(), "dark");
        assert!(ctx.cookie("missing").is_none());
    }

    #[test]
    fn test_json_body() {
        let ctx = context(
            Request::builder()
                .uri("/")
                .body(Bytes::from_static(br#"{"id": 7}"#))
                .unwrap(),
        );

        let value: serde_json::Value = ctx.json().unwrap();
        assert_eq!(value["id"], 7);
    }

    #[test]
    fn test_buffered_response() {
        let mut ctx = context(Request::builder().uri("/").body(Bytes::new()).unwrap());

        let name = ctx.param("name").unwrap_or_default().to_string();
        ctx.write_header(StatusCode::CREATED);
        write!(ctx, "hello {name}").unwrap();

        let response = ctx.into_response();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers()[header::CONTENT_TYPE], TEXT_PLAIN);
    }

    #[test]
    fn test_empty_response_has_no_content_type() {
        let ctx = context(Request::builder().uri("/").body(Bytes::new()).unwrap());

        let response = ctx.into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get(header::CONTENT_TYPE).is_none());
    }
}
