//! gritd API client
//!
//! Handles communication with gritd, the external GRIT points ledger that
//! holds every account balance. The portal never stores balances locally;
//! every read and adjustment goes through this client.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

use crate::domain::result::{Error as DomainError, Result as DomainResult};
use crate::domain::{CredentialKind, LedgerAccount};
use crate::ports::{BalanceAdjustment, PointsLedger};

// =============================================================================
// API Response Models (matching the gritd API spec)
// =============================================================================

/// Wrapper for account lookup responses
#[derive(Debug, Clone, Deserialize)]
struct AccountResponse {
    account: GritdAccount,
}

/// gritd account from API
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GritdAccount {
    pub id: String,
    pub points: i64,
    #[serde(default)]
    pub currency_ref: Option<String>,
}

/// Body for balance adjustments
#[derive(Debug, Serialize)]
struct AdjustmentRequest<'a> {
    delta: i64,
    memo: &'a str,
}

/// Wrapper for adjustment responses
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AdjustmentResponse {
    success: bool,
    #[serde(default)]
    new_balance: Option<i64>,
    #[serde(default)]
    error: Option<String>,
}

/// Body for credential link propagation
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LinkRequest<'a> {
    kind: &'a str,
    value: &'a str,
    account_id: &'a str,
}

// =============================================================================
// gritd HTTP client
// =============================================================================

/// Request timeout. Kept short: the entry service must run its rollback
/// path promptly when the ledger stalls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// gritd API client
#[derive(Debug)]
pub struct GritdClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl GritdClient {
    /// Create a new gritd client with the given API key and base URL.
    pub fn new(api_key: &str, base_url: &str) -> Result<Self> {
        if base_url.trim().is_empty() {
            anyhow::bail!("gritd base URL cannot be empty");
        }

        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Fetch an account by its opaque reference. 404 means not onboarded.
    pub fn get_account(&self, account_ref: &str) -> Result<Option<GritdAccount>> {
        let url = format!("{}/v1/accounts/{}", self.base_url, account_ref);

        let response = self
            .client
            .get(&url)
            .header("x-api-key", &self.api_key)
            .send()
            .map_err(|e| self.map_request_error(e))?;

        if response.status().as_u16() == 404 {
            return Ok(None);
        }
        self.check_response_status(&response)?;

        let api_response: AccountResponse = response
            .json()
            .context("Failed to parse gritd account response")?;

        Ok(Some(api_response.account))
    }

    /// Fetch the account owning a credential. 404 means not onboarded.
    pub fn get_account_by_credential(
        &self,
        kind: &str,
        value: &str,
    ) -> Result<Option<GritdAccount>> {
        let url = format!(
            "{}/v1/credentials/{}/{}/account",
            self.base_url, kind, value
        );

        let response = self
            .client
            .get(&url)
            .header("x-api-key", &self.api_key)
            .send()
            .map_err(|e| self.map_request_error(e))?;

        if response.status().as_u16() == 404 {
            return Ok(None);
        }
        self.check_response_status(&response)?;

        let api_response: AccountResponse = response
            .json()
            .context("Failed to parse gritd account response")?;

        Ok(Some(api_response.account))
    }

    /// Post a balance adjustment. The ledger applies it atomically and
    /// returns the resulting balance.
    pub fn post_adjustment(
        &self,
        account_ref: &str,
        delta: i64,
        memo: &str,
    ) -> Result<i64> {
        let url = format!("{}/v1/accounts/{}/adjustments", self.base_url, account_ref);

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .json(&AdjustmentRequest { delta, memo })
            .send()
            .map_err(|e| self.map_request_error(e))?;

        self.check_response_status(&response)?;

        let api_response: AdjustmentResponse = response
            .json()
            .context("Failed to parse gritd adjustment response")?;

        if !api_response.success {
            anyhow::bail!(
                "gritd rejected adjustment: {}",
                api_response
                    .error
                    .unwrap_or_else(|| "no detail given".to_string())
            );
        }

        api_response
            .new_balance
            .ok_or_else(|| anyhow::anyhow!("gritd adjustment succeeded without a new balance"))
    }

    /// Tell gritd a credential belongs to an account
    pub fn post_credential_link(
        &self,
        kind: &str,
        value: &str,
        account_ref: &str,
    ) -> Result<()> {
        let url = format!("{}/v1/credentials/link", self.base_url);

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .json(&LinkRequest {
                kind,
                value,
                account_id: account_ref,
            })
            .send()
            .map_err(|e| self.map_request_error(e))?;

        self.check_response_status(&response)?;
        Ok(())
    }

    /// Map request errors to user-friendly messages
    fn map_request_error(&self, error: reqwest::Error) -> anyhow::Error {
        if error.is_timeout() {
            anyhow::anyhow!(
                "gritd did not respond within {} seconds",
                REQUEST_TIMEOUT.as_secs()
            )
        } else if error.is_connect() {
            anyhow::anyhow!("Unable to connect to the gritd ledger")
        } else {
            anyhow::anyhow!("gritd request failed: {}", error)
        }
    }

    /// Check response status and return appropriate errors
    fn check_response_status(&self, response: &reqwest::blocking::Response) -> Result<()> {
        match response.status().as_u16() {
            200 => Ok(()),
            401 => anyhow::bail!(
                "gritd authentication failed. The ledger API key may be invalid or revoked."
            ),
            403 => anyhow::bail!("gritd access denied. Check the API key permissions."),
            429 => anyhow::bail!("gritd rate limit exceeded. Wait a moment and try again."),
            status => anyhow::bail!("gritd API error: HTTP {}", status),
        }
    }
}

// =============================================================================
// GritdLedger - implements the PointsLedger port
// =============================================================================

/// Points ledger backed by a gritd deployment.
///
/// All transport failures surface as `Error::Ledger` so the entry service
/// can distinguish "retry later" from hard failures.
pub struct GritdLedger {
    client: GritdClient,
}

impl GritdLedger {
    pub fn new(api_key: &str, base_url: &str) -> Result<Self> {
        Ok(Self {
            client: GritdClient::new(api_key, base_url)?,
        })
    }
}

fn to_domain_account(account: GritdAccount) -> LedgerAccount {
    LedgerAccount {
        account_id: account.id,
        points: account.points,
        currency_ref: account.currency_ref,
    }
}

impl PointsLedger for GritdLedger {
    fn find_account_by_credential(
        &self,
        kind: CredentialKind,
        value: &str,
    ) -> DomainResult<Option<LedgerAccount>> {
        let found = self
            .client
            .get_account_by_credential(kind.as_str(), value)
            .map_err(|e| DomainError::Ledger(e.to_string()))?;
        Ok(found.map(to_domain_account))
    }

    fn find_account_by_id(&self, account_ref: &str) -> DomainResult<Option<LedgerAccount>> {
        let found = self
            .client
            .get_account(account_ref)
            .map_err(|e| DomainError::Ledger(e.to_string()))?;
        Ok(found.map(to_domain_account))
    }

    fn adjust_balance(
        &self,
        account_ref: &str,
        delta: i64,
        memo: &str,
    ) -> DomainResult<BalanceAdjustment> {
        let new_balance = self
            .client
            .post_adjustment(account_ref, delta, memo)
            .map_err(|e| DomainError::Ledger(e.to_string()))?;
        Ok(BalanceAdjustment { new_balance })
    }

    fn link_credential_to_account(
        &self,
        kind: CredentialKind,
        value: &str,
        account_ref: &str,
    ) -> DomainResult<()> {
        self.client
            .post_credential_link(kind.as_str(), value, account_ref)
            .map_err(|e| DomainError::Ledger(e.to_string()))
    }
}

// =============================================================================
// Tests
// =============================================================================
