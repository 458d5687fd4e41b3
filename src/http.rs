// A padding oracle backed by a vulnerable web service.
//
// The service is expected to take a hex encoded ciphertext as a query
// parameter, answer with a success status if it decrypts to valid padding and
// with a fixed error status if it doesn't.
use reqwest::{Client, StatusCode};
use thiserror::Error;

use crate::AsyncOracle;

const DEFAULT_PARAM: &str = "ciphertext";

#[derive(Error, Debug)]
pub enum HttpOracleError {
    #[error("request to padding oracle failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("padding oracle answered with unexpected status {0}")]
    UnexpectedStatus(StatusCode),
}

#[derive(Debug, Clone)]
pub struct HttpOracle {
    client: Client,
    url: String,
    param: String,
    rejection_status: StatusCode,
}

impl HttpOracle {
    /// Query the service at `url`, passing ciphertexts in the `ciphertext`
    /// parameter and treating `500 Internal Server Error` as bad padding.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
            param: DEFAULT_PARAM.to_string(),
            rejection_status: StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    #[must_use]
    pub fn with_param(mut self, param: impl Into<String>) -> Self {
        self.param = param.into();
        self
    }

    /// Set the status the service answers with when the padding is invalid.
    #[must_use]
    pub fn with_rejection_status(mut self, status: StatusCode) -> Self {
        self.rejection_status = status;
        self
    }

    #[must_use]
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }
}

impl AsyncOracle for HttpOracle {
    type Error = HttpOracleError;

    async fn check(&self, ciphertext: &[u8]) -> Result<bool, HttpOracleError> {
        let response = self
            .client
            .get(&self.url)
            .query(&[(self.param.as_str(), hex::encode(ciphertext))])
            .send()
            .await?;
        match response.status() {
            status if status.is_success() => Ok(true),
            status if status == self.rejection_status => Ok(false),
            status => Err(HttpOracleError::UnexpectedStatus(status)),
        }
    }
}
