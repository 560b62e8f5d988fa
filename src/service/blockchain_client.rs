// 区块链 provider 客户端
// 封装 reqwest：JSON-RPC 调用与 REST 请求，错误统一映射为 WalletError::Network
// 不做重试，重试策略由调用方决定

use std::time::Duration;

use reqwest::{header::HeaderMap, StatusCode};
use serde::de::DeserializeOwned;

use crate::{
    domain::chain_config::Chain,
    error::{WalletError, WalletResult},
    infrastructure::rpc_validator,
};

#[derive(Clone)]
pub struct ProviderClient {
    http_client: reqwest::Client,
    chain: Chain,
}

impl ProviderClient {
    /// `timeout_secs` 为 0 时不设置请求超时
    pub fn new(chain: Chain, timeout_secs: u64, headers: HeaderMap) -> WalletResult<Self> {
        let mut builder = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(10)
            .default_headers(headers);
        if timeout_secs > 0 {
            builder = builder.timeout(Duration::from_secs(timeout_secs));
        }

        let http_client = builder
            .build()
            .map_err(|e| WalletError::Config(format!("HTTP client for {}: {}", chain, e)))?;

        Ok(Self { http_client, chain })
    }

    pub fn chain(&self) -> Chain {
        self.chain
    }

    fn network_error(&self, operation: &str, message: impl std::fmt::Display) -> WalletError {
        WalletError::network(self.chain, operation, message)
    }

    /// JSON-RPC 2.0 调用，返回 `result`（可能为 null）
    pub async fn json_rpc(
        &self,
        url: &str,
        method: &str,
        params: serde_json::Value,
    ) -> WalletResult<serde_json::Value> {
        let payload = serde_json::json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1
        });

        let response = self
            .http_client
            .post(url)
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(|e| self.network_error(method, format!("request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| self.network_error(method, format!("failed to read body: {}", e)))?;

        if !status.is_success() {
            return Err(self.network_error(method, format!("HTTP {}: {}", status, body)));
        }

        let mut json: serde_json::Value = serde_json::from_str(&body)
            .map_err(|e| self.network_error(method, format!("invalid JSON: {}", e)))?;

        // 检查 JSON-RPC 错误
        if let Some(error) = json.get("error") {
            let error_msg = error
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("Unknown RPC error");
            let error_code = error.get("code").and_then(|c| c.as_i64()).unwrap_or(-1);
            return Err(self.network_error(method, format!("RPC error {}: {}", error_code, error_msg)));
        }

        rpc_validator::validate_rpc_response(&json).map_err(|e| self.network_error(method, e))?;

        Ok(json
            .get_mut("result")
            .map(serde_json::Value::take)
            .unwrap_or(serde_json::Value::Null))
    }

    /// GET 并解析 JSON
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str, operation: &str) -> WalletResult<T> {
        self.get_optional_json(url, operation)
            .await?
            .ok_or_else(|| self.network_error(operation, "HTTP 404 Not Found"))
    }

    /// GET 并解析 JSON；404 返回 None
    pub async fn get_optional_json<T: DeserializeOwned>(
        &self,
        url: &str,
        operation: &str,
    ) -> WalletResult<Option<T>> {
        match self.get_optional_text(url, operation).await? {
            Some(body) => serde_json::from_str(&body)
                .map(Some)
                .map_err(|e| self.network_error(operation, format!("invalid JSON: {}", e))),
            None => Ok(None),
        }
    }

    /// GET 文本；404 返回 None
    pub async fn get_optional_text(&self, url: &str, operation: &str) -> WalletResult<Option<String>> {
        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| self.network_error(operation, format!("request failed: {}", e)))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let body = response
            .text()
            .await
            .map_err(|e| self.network_error(operation, format!("failed to read body: {}", e)))?;
        if !status.is_success() {
            return Err(self.network_error(operation, format!("HTTP {}: {}", status, body)));
        }
        Ok(Some(body))
    }

    /// GET 并返回状态码与响应体（toncenter 在非 2xx 响应里也带 JSON 错误信封）
    pub async fn get_with_status(
        &self,
        url: &str,
        operation: &str,
    ) -> WalletResult<(StatusCode, String)> {
        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| self.network_error(operation, format!("request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| self.network_error(operation, format!("failed to read body: {}", e)))?;
        Ok((status, body))
    }

    pub async fn get_text(&self, url: &str, operation: &str) -> WalletResult<String> {
        self.get_optional_text(url, operation)
            .await?
            .ok_or_else(|| self.network_error(operation, "HTTP 404 Not Found"))
    }

    /// POST 纯文本（Esplora 广播）
    pub async fn post_text(&self, url: &str, body: String, operation: &str) -> WalletResult<String> {
        let response = self
            .http_client
            .post(url)
            .header("Content-Type", "text/plain")
            .body(body)
            .send()
            .await
            .map_err(|e| self.network_error(operation, format!("request failed: {}", e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| self.network_error(operation, format!("failed to read body: {}", e)))?;
        if !status.is_success() {
            return Err(self.network_error(operation, format!("HTTP {}: {}", status, text)));
        }
        Ok(text.trim().to_string())
    }

    /// POST JSON 并解析 JSON 响应（非 2xx 时带上响应体）
    pub async fn post_json<T: DeserializeOwned>(
        &self,
        url: &str,
        body: &serde_json::Value,
        operation: &str,
    ) -> WalletResult<T> {
        let response = self
            .http_client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| self.network_error(operation, format!("request failed: {}", e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| self.network_error(operation, format!("failed to read body: {}", e)))?;
        if !status.is_success() {
            return Err(self.network_error(operation, format!("HTTP {}: {}", status, text)));
        }
        serde_json::from_str(&text)
            .map_err(|e| self.network_error(operation, format!("invalid JSON: {}", e)))
    }
}
