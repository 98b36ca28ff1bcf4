//! 后端网关模块
//!
//! 唯一与 REST API 通信的组件。HTTP 传输通过 `HttpClient` trait 注入，
//! 浏览器中使用 `gloo-net`，测试中使用 `MockHttpClient`。

use crate::error::{MapError, MapResult};
use starmap_shared::protocol::{
    ApiRequest, HttpMethod, ListPlacesRequest, RemovePlaceRequest, StatusMessage, UserInfoRequest,
};
use starmap_shared::{NewPlace, Place, PlaceId, UserInfo};

// =========================================================
// 核心抽象层 (HTTP Interface Abstraction)
// =========================================================

/// 通用 HTTP 请求结构
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub url: String,
    pub method: HttpMethod,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    pub fn new(url: &str, method: HttpMethod) -> Self {
        Self {
            url: url.to_string(),
            method,
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn with_header(mut self, key: &str, value: &str) -> Self {
        self.headers.push((key.to_string(), value.to_string()));
        self
    }

    pub fn with_body(mut self, body: String) -> Self {
        self.body = Some(body);
        self
    }
}

/// 通用 HTTP 响应结构
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    /// 2xx
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// HTTP 客户端特性 (Trait)
/// (?Send) 是因为浏览器环境下的 Future 不是 Send 的
#[async_trait::async_trait(?Send)]
pub trait HttpClient {
    async fn send(&self, req: HttpRequest) -> MapResult<HttpResponse>;
}

// =========================================================
// 实现层: 浏览器客户端 (Production)
// =========================================================

#[derive(Clone, Copy, Default)]
pub struct BrowserHttpClient;

#[async_trait::async_trait(?Send)]
impl HttpClient for BrowserHttpClient {
    async fn send(&self, req: HttpRequest) -> MapResult<HttpResponse> {
        use gloo_net::http::Request;

        let mut builder = match req.method {
            HttpMethod::Get => Request::get(&req.url),
            HttpMethod::Post => Request::post(&req.url),
            HttpMethod::Delete => Request::delete(&req.url),
        };
        for (key, value) in &req.headers {
            builder = builder.header(key, value);
        }

        let request = match req.body {
            Some(body) => builder.body(body)?,
            None => builder.build()?,
        };

        let response = request.send().await?;
        Ok(HttpResponse {
            status: response.status(),
            body: response.text().await?,
        })
    }
}

// =========================================================
// 网关
// =========================================================

#[derive(Clone)]
pub struct BackendGateway<C> {
    client: C,
    base_url: String,
}

impl<C: HttpClient> BackendGateway<C> {
    pub fn new(client: C, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// 发送强类型请求并解析响应
    ///
    /// 非 2xx 响应转换为 `Unauthorized`(401) 或 `BackendUnavailable`，消息中带响应体。
    pub async fn call<T: ApiRequest>(&self, req: &T) -> MapResult<T::Response> {
        let path = req.path();
        let mut http = HttpRequest::new(&self.url(&path), T::METHOD);

        if T::has_body() {
            let body = serde_json::to_string(req)
                .map_err(|e| MapError::from(e).in_op_with("gateway.serialize", &path))?;
            http = http
                .with_header("Content-Type", "application/json")
                .with_body(body);
        }

        let resp = self
            .client
            .send(http)
            .await
            .map_err(|e| e.in_op_with("gateway.send", &path))?;

        if !resp.ok() {
            return Err(MapError::backend(
                resp.status,
                format!(
                    "{} {} failed with status {}: {}",
                    T::METHOD.as_str(),
                    path,
                    resp.status,
                    resp.body.trim()
                ),
            )
            .in_op_with("gateway.send", &path));
        }

        // 空响应体按 null 解析
        let body = match resp.body.trim() {
            "" => "null",
            body => body,
        };
        serde_json::from_str(body)
            .map_err(|e| MapError::from(e).in_op_with("gateway.parse", &path))
    }

    /// GET /userinfo
    pub async fn fetch_session(&self) -> MapResult<UserInfo> {
        self.call(&UserInfoRequest).await
    }

    /// GET /places
    pub async fn fetch_places(&self) -> MapResult<Vec<Place>> {
        self.call(&ListPlacesRequest).await
    }

    /// POST /add_place
    pub async fn add_place(&self, candidate: &NewPlace) -> MapResult<StatusMessage> {
        self.call(candidate).await
    }

    /// DELETE /remove_place/{id}
    pub async fn remove_place(&self, id: PlaceId) -> MapResult<()> {
        self.call(&RemovePlaceRequest { id }).await.map(|_| ())
    }
}

// =========================================================
// 测试工具: MockHttpClient
// =========================================================

#[cfg(test)]
pub use mock::MockHttpClient;
