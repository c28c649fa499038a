//! `upsert_link` over `fetch`.
//!
//! The returned future is polled by the engine from the frame loop with a
//! no-op waker; `JsFuture` records the promise result on its own, so the next
//! poll after resolution observes it.

use tunnel_core::{LinkSync, RemoteSyncError, SyncFuture, UpsertLink, UpsertLinkReply};
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys as web;

pub struct FetchLinkSync {
    url: String,
    api_key: Option<String>,
}

impl FetchLinkSync {
    pub fn new(url: String, api_key: Option<String>) -> Self {
        Self { url, api_key }
    }
}

impl LinkSync for FetchLinkSync {
    fn upsert_link(&self, request: UpsertLink) -> SyncFuture {
        let url = self.url.clone();
        let api_key = self.api_key.clone();
        Box::pin(async move { post_upsert(&url, api_key.as_deref(), &request).await })
    }
}

fn transport(e: JsValue) -> RemoteSyncError {
    RemoteSyncError::Transport(format!("{:?}", e))
}

async fn post_upsert(
    url: &str,
    api_key: Option<&str>,
    request: &UpsertLink,
) -> Result<UpsertLinkReply, RemoteSyncError> {
    let body = serde_json::to_string(request)
        .map_err(|e| RemoteSyncError::Transport(format!("encode: {e}")))?;

    let headers = web::Headers::new().map_err(transport)?;
    headers
        .set("Content-Type", "application/json")
        .map_err(transport)?;
    if let Some(key) = api_key {
        headers
            .set("Authorization", &format!("Bearer {key}"))
            .map_err(transport)?;
    }

    let opts = web::RequestInit::new();
    opts.set_method("POST");
    opts.set_mode(web::RequestMode::Cors);
    opts.set_headers(&headers);
    opts.set_body(&JsValue::from_str(&body));

    let req = web::Request::new_with_str_and_init(url, &opts).map_err(transport)?;
    let window =
        web::window().ok_or_else(|| RemoteSyncError::Transport("no window".to_string()))?;
    let resp_value = JsFuture::from(window.fetch_with_request(&req))
        .await
        .map_err(transport)?;
    let resp: web::Response = resp_value
        .dyn_into()
        .map_err(|_| RemoteSyncError::Decode("response is not a Response".to_string()))?;
    if !resp.ok() {
        return Err(RemoteSyncError::Status(resp.status()));
    }

    let text = JsFuture::from(resp.text().map_err(transport)?)
        .await
        .map_err(transport)?;
    let text = text
        .as_string()
        .ok_or_else(|| RemoteSyncError::Decode("body is not text".to_string()))?;
    serde_json::from_str(&text).map_err(|e| RemoteSyncError::Decode(e.to_string()))
}
