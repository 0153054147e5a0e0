//! Browser glue: canvas lookup, query-string persistence and fetch.

use anyhow::{Context, Result, anyhow, bail};
use log::{debug, warn};
use trace_view_core::viewer::QueryParams;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;

pub fn canvas_by_id(id: &str) -> Result<web_sys::HtmlCanvasElement, JsValue> {
    let document = web_sys::window()
        .and_then(|w| w.document())
        .ok_or_else(|| JsValue::from_str("no document"))?;
    document
        .get_element_by_id(id)
        .ok_or_else(|| JsValue::from_str(&format!("no canvas element with id '{id}'")))?
        .dyn_into::<web_sys::HtmlCanvasElement>()
        .map_err(|_| JsValue::from_str(&format!("element '{id}' is not a canvas")))
}

/// Query parameters backed by `location.search`.
///
/// Writes go through `history.replaceState` so filtering never adds
/// history entries. An empty value removes the key.
#[derive(Debug, Default, Clone, Copy)]
pub struct WebQueryParams;

impl WebQueryParams {
    fn search_params() -> Option<web_sys::UrlSearchParams> {
        let search = web_sys::window()?.location().search().ok()?;
        web_sys::UrlSearchParams::new_with_str(&search).ok()
    }

    fn replace(params: &web_sys::UrlSearchParams) -> Result<(), JsValue> {
        let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
        let location = window.location();
        let query = String::from(params.to_string());
        let mut url = location.pathname()?;
        if !query.is_empty() {
            url.push('?');
            url.push_str(&query);
        }
        url.push_str(&location.hash()?);
        window
            .history()?
            .replace_state_with_url(&JsValue::NULL, "", Some(&url))
    }
}

impl QueryParams for WebQueryParams {
    fn set_query_param(&self, key: &str, value: &str) {
        let Some(params) = Self::search_params() else {
            return;
        };
        if value.is_empty() {
            params.delete(key);
        } else {
            params.set(key, value);
        }
        match Self::replace(&params) {
            Ok(()) => debug!("query param {key}={value:?}"),
            Err(e) => warn!("could not update query string: {e:?}"),
        }
    }

    fn query_param(&self, key: &str) -> Option<String> {
        Self::search_params()?.get(key)
    }
}

/// GET `url` and return the response body.
pub async fn fetch_bytes(url: &str) -> Result<Vec<u8>> {
    let window = web_sys::window().context("no window")?;
    let response: web_sys::Response = JsFuture::from(window.fetch_with_str(url))
        .await
        .map_err(js_error)?
        .dyn_into()
        .map_err(|_| anyhow!("fetch of {url} did not yield a Response"))?;
    if !response.ok() {
        bail!("GET {url}: HTTP {}", response.status());
    }
    let body = JsFuture::from(response.array_buffer().map_err(js_error)?)
        .await
        .map_err(js_error)?;
    Ok(js_sys::Uint8Array::new(&body).to_vec())
}

fn js_error(value: JsValue) -> anyhow::Error {
    anyhow!("{value:?}")
}
