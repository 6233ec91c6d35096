use http::{HeaderName, HeaderValue, Request, Response, StatusCode};
use js_sys::{Array, Uint8Array};
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{window, RequestCredentials, RequestInit, RequestMode};

use super::{Transport, TransportKind};
use crate::error::TransportError;
use crate::request::OutgoingRequest;
use crate::response::{self, Completion, RawResponse};

/// Issues requests through the browser's `fetch`.
#[derive(Debug, Default, Clone, Copy)]
pub struct WasmTransport;

fn js_error(value: JsValue) -> TransportError {
    TransportError::Network(value.as_string().unwrap_or_else(|| format!("{value:?}")))
}

impl Transport for WasmTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Browser
    }

    async fn transmit(&self, request: OutgoingRequest) -> Result<Completion, TransportError> {
        if let Some(timeout) = request.timeout {
            log::debug!("timeout of {timeout:?} is not enforced by fetch");
        }
        let http_request = request.to_http_request()?;
        let response = fetch(&http_request, request.with_credentials).await?;
        response::settle(response, request.response_type)
    }
}

async fn fetch(request: &Request<Vec<u8>>, with_credentials: bool) -> Result<RawResponse, TransportError> {
    let opts = RequestInit::new();
    opts.set_method(request.method().as_str());
    opts.set_mode(RequestMode::Cors);
    if with_credentials {
        opts.set_credentials(RequestCredentials::Include);
    }

    // GET and HEAD requests cannot carry a body in fetch
    let method = request.method();
    if *method != http::Method::GET && *method != http::Method::HEAD && !request.body().is_empty() {
        let body = Uint8Array::from(request.body().as_slice());
        opts.set_body(&body);
    }

    let url = request.uri().to_string();
    let web_request = web_sys::Request::new_with_str_and_init(&url, &opts).map_err(js_error)?;

    let web_headers = web_request.headers();
    for (name, value) in request.headers() {
        let value = value
            .to_str()
            .map_err(|e| TransportError::Network(e.to_string()))?;
        web_headers.set(name.as_str(), value).map_err(js_error)?;
    }

    let window = window().ok_or_else(|| TransportError::Network("no window available".to_string()))?;
    let resp_value = JsFuture::from(window.fetch_with_request(&web_request))
        .await
        .map_err(js_error)?;
    let web_resp: web_sys::Response = resp_value.dyn_into().map_err(js_error)?;

    let status = StatusCode::from_u16(web_resp.status()).map_err(|e| TransportError::Network(e.to_string()))?;

    let mut headers = http::HeaderMap::new();
    if let Ok(Some(entries)) = js_sys::try_iter(web_resp.headers().as_ref()) {
        for entry in entries.flatten() {
            let pair = Array::from(&entry);
            let (Some(name), Some(value)) = (pair.get(0).as_string(), pair.get(1).as_string()) else {
                continue;
            };
            match (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(&value)) {
                (Ok(name), Ok(value)) => {
                    headers.append(name, value);
                }
                _ => log::warn!("skipping unrepresentable response header {name}"),
            }
        }
    }

    let array_buffer = JsFuture::from(web_resp.array_buffer().map_err(js_error)?)
        .await
        .map_err(js_error)?;
    let body = Uint8Array::new(&array_buffer).to_vec();

    let mut response = Response::builder()
        .status(status)
        .body(body)
        .map_err(|e| TransportError::Network(e.to_string()))?;
    *response.headers_mut() = headers;

    Ok(response)
}
