//! Banco Inter PIX API client.
//!
//! Charges are created with `PUT /pix/v2/cob/{txid}` so the transaction id is
//! ours and retries are idempotent on the provider side. Access tokens come
//! from the OAuth2 client-credentials flow and are cached until shortly
//! before they expire.

use std::sync::Arc;
use std::time::{Duration, Instant};

use moka::Expiry;
use moka::future::Cache;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use url::Url;

use super::{Charge, ChargeRequest, PixError};
use crate::config::InterConfig;

/// Seconds a charge stays payable.
const CHARGE_EXPIRY_SECS: u32 = 3600;
/// Scopes requested for the access token.
const TOKEN_SCOPE: &str = "cob.write cob.read";
/// Refresh tokens this long before the provider expires them.
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);
const TOKEN_CACHE_KEY: &str = "access_token";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Client for the Banco Inter PIX API.
#[derive(Clone)]
pub struct InterClient {
    inner: Arc<InterClientInner>,
}

struct InterClientInner {
    client: reqwest::Client,
    base_url: Url,
    client_id: String,
    client_secret: SecretString,
    pix_key: String,
    tokens: Cache<&'static str, CachedToken>,
}

#[derive(Clone)]
struct CachedToken {
    value: SecretString,
    lifetime: Duration,
}

/// Expire each cached token according to its own `expires_in`.
struct TokenExpiry;

impl Expiry<&'static str, CachedToken> for TokenExpiry {
    fn expire_after_create(
        &self,
        _key: &&'static str,
        value: &CachedToken,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.lifetime)
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

/// Body of `PUT /pix/v2/cob/{txid}`.
#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
struct CobRequest {
    calendario: Calendario,
    valor: Valor,
    chave: String,
    solicitacao_pagador: String,
    info_adicionais: Vec<InfoAdicional>,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct Calendario {
    expiracao: u32,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct Valor {
    original: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct InfoAdicional {
    nome: String,
    valor: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CobResponse {
    txid: String,
    pix_copia_e_cola: String,
}

impl InterClient {
    /// Create a new client, presenting the configured client certificate on
    /// every connection.
    ///
    /// # Errors
    ///
    /// Returns `PixError::Config` if the identity is unusable and
    /// `PixError::Http` if the TLS backend cannot be initialized.
    pub fn new(config: &InterConfig) -> Result<Self, PixError> {
        let mut builder = reqwest::Client::builder().timeout(REQUEST_TIMEOUT);
        if let Some(pem) = &config.identity_pem {
            let identity = reqwest::Identity::from_pem(pem.expose_secret().as_bytes())
                .map_err(|e| PixError::Config(format!("invalid Inter client certificate: {e}")))?;
            builder = builder.identity(identity);
        }
        let client = builder.build()?;

        let tokens = Cache::builder()
            .max_capacity(1)
            .expire_after(TokenExpiry)
            .build();

        Ok(Self {
            inner: Arc::new(InterClientInner {
                client,
                base_url: config.base_url.clone(),
                client_id: config.client_id.clone(),
                client_secret: config.client_secret.clone(),
                pix_key: config.pix_key.clone(),
                tokens,
            }),
        })
    }

    /// Create an immediate charge for an order.
    ///
    /// # Errors
    ///
    /// Returns `PixError` if the token or charge request fails.
    #[instrument(skip(self, request), fields(txid = request.txid))]
    pub async fn create_charge(&self, request: ChargeRequest<'_>) -> Result<Charge, PixError> {
        let token = self.access_token().await?;
        let url = self.endpoint(&format!("pix/v2/cob/{}", request.txid))?;
        let body = cob_request(&self.inner.pix_key, request);

        let response = self
            .inner
            .client
            .put(url)
            .bearer_auth(token.expose_secret())
            .json(&body)
            .send()
            .await?;

        let cob: CobResponse = read_json(response).await?;
        debug!("PIX charge created");

        Ok(Charge {
            txid: cob.txid,
            copy_paste: cob.pix_copia_e_cola,
            qr_code_png: None,
        })
    }

    /// Cached access token, fetching a new one when missing or expired.
    async fn access_token(&self) -> Result<SecretString, PixError> {
        self.inner
            .tokens
            .try_get_with(TOKEN_CACHE_KEY, self.fetch_token())
            .await
            .map(|cached| cached.value)
            .map_err(|e| PixError::Token(e.to_string()))
    }

    async fn fetch_token(&self) -> Result<CachedToken, PixError> {
        debug!("Requesting Inter access token");
        let url = self.endpoint("oauth/v2/token")?;
        let response = self
            .inner
            .client
            .post(url)
            .form(&[
                ("client_id", self.inner.client_id.as_str()),
                ("client_secret", self.inner.client_secret.expose_secret()),
                ("grant_type", "client_credentials"),
                ("scope", TOKEN_SCOPE),
            ])
            .send()
            .await?;

        let token: TokenResponse = read_json(response).await?;
        Ok(CachedToken {
            value: SecretString::from(token.access_token),
            lifetime: token_lifetime(token.expires_in),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, PixError> {
        self.inner
            .base_url
            .join(path)
            .map_err(|e| PixError::Config(format!("invalid Inter URL: {e}")))
    }
}

fn cob_request(pix_key: &str, request: ChargeRequest<'_>) -> CobRequest {
    CobRequest {
        calendario: Calendario {
            expiracao: CHARGE_EXPIRY_SECS,
        },
        valor: Valor {
            original: request.amount.to_fixed(),
        },
        chave: pix_key.to_string(),
        solicitacao_pagador: format!("Pedido #{} - iPobre Food", request.order_id),
        info_adicionais: vec![InfoAdicional {
            nome: "Pedido".to_string(),
            valor: request.order_id.to_string(),
        }],
    }
}

fn token_lifetime(expires_in: u64) -> Duration {
    Duration::from_secs(expires_in).saturating_sub(TOKEN_REFRESH_MARGIN)
}

/// Decode a success body, turning anything else into `PixError::Status`.
async fn read_json<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, PixError> {
    let status = response.status();
    let text = response.text().await?;

    if !status.is_success() {
        tracing::error!(
            status = %status,
            body = %text.chars().take(500).collect::<String>(),
            "Inter API returned non-success status"
        );
        return Err(PixError::Status {
            status: status.as_u16(),
            body: text.chars().take(200).collect(),
        });
    }

    serde_json::from_str(&text).map_err(|e| {
        tracing::error!(error = %e, "Failed to parse Inter response");
        PixError::Parse(e)
    })
}
