//! HTTP 抓取与响应解码

use crate::types::{ETLError, ETLResult, ErrorKind, FetchConfig};
use bytes::Bytes;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use regex::Regex;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::io::Read;
use std::sync::OnceLock;
use std::time::Duration;

/// 响应体解码策略，按顺序尝试
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decoder {
    /// 原样按 UTF-8 解释
    Utf8,
    /// brotli 解压后按 UTF-8 解释
    Brotli,
    /// gzip 解压后按 UTF-8 解释
    Gzip,
}

impl Decoder {
    pub fn decode(&self, body: &[u8]) -> Result<String, String> {
        match self {
            Decoder::Utf8 => std::str::from_utf8(body)
                .map(str::to_owned)
                .map_err(|e| e.to_string()),
            Decoder::Brotli => {
                let mut decoder = brotli::Decompressor::new(body, 4096);
                let mut decompressed = Vec::new();
                decoder
                    .read_to_end(&mut decompressed)
                    .map_err(|e| e.to_string())?;
                String::from_utf8(decompressed).map_err(|e| e.to_string())
            }
            Decoder::Gzip => {
                let mut decoder = flate2::read::GzDecoder::new(body);
                let mut decompressed = String::new();
                decoder
                    .read_to_string(&mut decompressed)
                    .map_err(|e| e.to_string())?;
                Ok(decompressed)
            }
        }
    }
}

/// 依次尝试每种解码策略，并把文本交给 `parse`。
///
/// 解码失败或 `parse` 返回解码类错误（JSON/XML 格式不对）时换下一种策略；
/// 其它错误（缺字段、缺元素）立即返回。全部策略失败时返回 `Decode`。
pub fn decode_with<T>(
    body: &[u8],
    decoders: &[Decoder],
    mut parse: impl FnMut(&str) -> ETLResult<T>,
) -> ETLResult<T> {
    let mut failures = Vec::new();

    for decoder in decoders {
        let text = match decoder.decode(body) {
            Ok(text) => text,
            Err(e) => {
                failures.push(format!("{:?}: {}", decoder, e));
                continue;
            }
        };

        match parse(&text) {
            Ok(value) => return Ok(value),
            Err(e) if e.kind() == ErrorKind::Decode => {
                tracing::debug!("Decoder {:?} produced unparseable text: {}", decoder, e);
                failures.push(format!("{:?}: {}", decoder, e));
            }
            Err(e) => return Err(e),
        }
    }

    if failures.is_empty() {
        return Err(ETLError::Decode("没有可用的解码策略".to_string()));
    }
    Err(ETLError::Decode(failures.join("; ")))
}

/// 只解码不解析
pub fn decode_body(body: &[u8], decoders: &[Decoder]) -> ETLResult<String> {
    decode_with(body, decoders, |text| Ok(text.to_owned()))
}

/// 去掉 JSONP 回调包装，返回其中的 JSON 对象文本
pub fn unwrap_jsonp(text: &str) -> ETLResult<&str> {
    static JSONP: OnceLock<Regex> = OnceLock::new();
    let pattern = JSONP.get_or_init(|| Regex::new(r"(?s)\((\{.*\})\)").expect("static regex"));

    pattern
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .ok_or_else(|| ETLError::Decode("响应不是 JSONP 格式".to_string()))
}

/// 带固定请求头、超时和请求间隔的 HTTP 客户端
pub struct Fetcher {
    client: reqwest::Client,
    limiter: Option<DefaultDirectRateLimiter>,
}

impl Fetcher {
    pub fn new(config: &FetchConfig) -> ETLResult<Self> {
        let mut headers = HeaderMap::new();
        for (name, value) in &config.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| ETLError::Config(format!("请求头名称 {}: {}", name, e)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| ETLError::Config(format!("请求头取值 {}: {}", value, e)))?;
            headers.insert(name, value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        // 每个周期放行一个请求，第一个请求不等待
        let limiter =
            Quota::with_period(Duration::from_millis(config.delay_ms)).map(RateLimiter::direct);

        Ok(Self { client, limiter })
    }

    /// 发送一次 GET 请求，非 2xx 视为失败
    pub async fn fetch(&self, url: &str) -> ETLResult<Bytes> {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ETLError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        Ok(response.bytes().await?)
    }

    pub async fn fetch_text(&self, url: &str, decoders: &[Decoder]) -> ETLResult<String> {
        let body = self.fetch(url).await?;
        decode_body(&body, decoders)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn brotli_compress(text: &str) -> Vec<u8> {
        let mut out = Vec::new();
        {
            let mut writer = brotli::CompressorWriter::new(&mut out, 4096, 9, 22);
            writer.write_all(text.as_bytes()).unwrap();
        }
        out
    }

    fn gzip_compress(text: &str) -> Vec<u8> {
        let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(text.as_bytes()).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn test_plain_text_uses_first_decoder() {
        let text = decode_body("{\"data\":[]}".as_bytes(), &[Decoder::Utf8, Decoder::Brotli]).unwrap();
        assert_eq!(text, "{\"data\":[]}");
    }

    #[test]
    fn test_brotli_fallback() {
        let body = brotli_compress("{\"data\":[{\"expertId\":7}]}");
        let value: serde_json::Value = decode_with(&body, &[Decoder::Utf8, Decoder::Brotli], |text| {
            Ok(serde_json::from_str(text)?)
        })
        .unwrap();
        assert_eq!(value["data"][0]["expertId"], 7);
    }

    #[test]
    fn test_gzip_fallback() {
        let body = gzip_compress("你好");
        let text = decode_body(&body, &[Decoder::Utf8, Decoder::Brotli, Decoder::Gzip]).unwrap();
        assert_eq!(text, "你好");
    }

    #[test]
    fn test_parse_failure_tries_next_decoder() {
        // 合法 UTF-8 但不是 JSON，且 brotli 也无法解压
        let err = decode_with(b"<html>blocked</html>", &[Decoder::Utf8, Decoder::Brotli], |text| {
            Ok(serde_json::from_str::<serde_json::Value>(text)?)
        })
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Decode);
        let message = err.to_string();
        assert!(message.contains("Utf8"));
        assert!(message.contains("Brotli"));
    }

    #[test]
    fn test_field_error_is_not_retried() {
        let mut calls = 0;
        let err = decode_with(b"{}", &[Decoder::Utf8, Decoder::Utf8], |_| {
            calls += 1;
            Err::<(), _>(ETLError::Field("missing".into()))
        })
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Field);
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_unwrap_jsonp() {
        let text = "jQuery1122_175({\"data\":[{\"a\":1}],\"total\":2});";
        assert_eq!(unwrap_jsonp(text).unwrap(), "{\"data\":[{\"a\":1}],\"total\":2}");
        assert!(unwrap_jsonp("not jsonp").is_err());
    }

    #[test]
    fn test_invalid_header_is_config_error() {
        let config = FetchConfig::default().with_header("bad header", "x");
        let err = Fetcher::new(&config).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Config);
    }
}
