//! DingTalk 알림 서비스.
//!
//! DingTalk 그룹 custom robot 웹훅으로 텍스트 메시지를 전송합니다.
//! 보안 설정이 "加签"이면 `timestamp`/`sign` 쿼리 파라미터를 붙입니다.

use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use cube_core::WebhookConfig;
use hmac::{Hmac, Mac};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tracing::{debug, error, info, warn};

use crate::types::{NotificationError, NotificationResult, NotificationSender};

type HmacSha256 = Hmac<Sha256>;

/// DingTalk 전송 설정.
#[derive(Debug, Clone)]
pub struct DingTalkConfig {
    /// 웹훅 URL (`.../robot/send?access_token=...`)
    pub webhook_url: String,
    /// @ 멘션할 휴대폰 번호
    pub at_mobiles: Vec<String>,
    /// 서명 비밀키
    pub secret: Option<String>,
    /// 전송 활성화 여부
    pub enabled: bool,
    /// 요청 타임아웃
    pub timeout: Duration,
}

impl DingTalkConfig {
    pub fn new(webhook_url: impl Into<String>) -> Self {
        Self {
            webhook_url: webhook_url.into(),
            at_mobiles: Vec::new(),
            secret: None,
            enabled: true,
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_at_mobiles(mut self, at_mobiles: Vec<String>) -> Self {
        self.at_mobiles = at_mobiles;
        self
    }

    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = Some(secret.into());
        self
    }
}

impl From<&WebhookConfig> for DingTalkConfig {
    fn from(section: &WebhookConfig) -> Self {
        Self {
            webhook_url: section.webhook_url.trim().to_string(),
            at_mobiles: section.at_mobiles.clone(),
            secret: section.secret.clone().filter(|s| !s.trim().is_empty()),
            enabled: section.enabled,
            timeout: Duration::from_secs(section.timeout_secs),
        }
    }
}

/// 웹훅 텍스트 메시지 본문.
#[derive(Debug, Serialize)]
struct TextMessage<'a> {
    msgtype: &'static str,
    text: TextContent<'a>,
    at: AtTargets<'a>,
}

#[derive(Debug, Serialize)]
struct TextContent<'a> {
    content: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AtTargets<'a> {
    at_mobiles: &'a [String],
    is_at_all: bool,
}

/// 웹훅 응답 (HTTP 200이어도 errcode로 거부 사유를 알려줌).
#[derive(Debug, Default, Deserialize)]
struct WebhookResponse {
    #[serde(default)]
    errcode: i64,
    #[serde(default)]
    errmsg: String,
}

/// DingTalk 알림 전송기.
pub struct DingTalkSender {
    config: DingTalkConfig,
    client: reqwest::Client,
}

impl DingTalkSender {
    /// 새 전송기를 생성합니다.
    pub fn new(config: DingTalkConfig) -> NotificationResult<Self> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { config, client })
    }

    fn payload<'a>(&'a self, content: &'a str) -> TextMessage<'a> {
        TextMessage {
            msgtype: "text",
            text: TextContent { content },
            at: AtTargets {
                at_mobiles: &self.config.at_mobiles,
                is_at_all: false,
            },
        }
    }

    async fn post(&self, content: &str) -> NotificationResult<()> {
        let mut request = self
            .client
            .post(&self.config.webhook_url)
            .json(&self.payload(content));

        if let Some(secret) = &self.config.secret {
            let timestamp = chrono::Utc::now().timestamp_millis();
            request = request.query(&[
                ("timestamp", timestamp.to_string()),
                ("sign", sign(secret, timestamp)?),
            ]);
        }

        debug!(mentions = self.config.at_mobiles.len(), "Sending DingTalk message");

        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::OK {
            let body: WebhookResponse = response.json().await.unwrap_or_default();
            if body.errcode != 0 {
                warn!(
                    errcode = body.errcode,
                    errmsg = %body.errmsg,
                    "DingTalk accepted the request but reported an error"
                );
            } else {
                info!("DingTalk notification sent successfully");
            }
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            error!("Failed to send DingTalk message: {} - {}", status, body);
            Err(NotificationError::HttpStatus {
                status: status.as_u16(),
                body,
            })
        }
    }
}

/// DingTalk 서명: `base64(HMAC-SHA256(secret, "{timestamp}\n{secret}"))`.
pub fn sign(secret: &str, timestamp_ms: i64) -> NotificationResult<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| NotificationError::InvalidConfig(format!("서명 키 오류: {}", e)))?;
    mac.update(format!("{}\n{}", timestamp_ms, secret).as_bytes());
    Ok(BASE64.encode(mac.finalize().into_bytes()))
}

#[async_trait]
impl NotificationSender for DingTalkSender {
    async fn send_text(&self, content: &str) -> NotificationResult<()> {
        if !self.is_enabled() {
            debug!("DingTalk notifications are disabled, skipping");
            return Ok(());
        }
        self.post(content).await
    }

    fn is_enabled(&self) -> bool {
        self.config.enabled && !self.config.webhook_url.is_empty()
    }

    fn name(&self) -> &str {
        "dingtalk"
    }
}
