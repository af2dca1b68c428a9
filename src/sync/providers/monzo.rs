//! Monzo provider.
//!
//! Accounts come from `GET /accounts`; the first `uk_retail` account is the
//! one we follow. Transactions are paged 100 at a time from
//! `GET /transactions?limit=100&account_id=..&since=..`, with `since` moved to
//! the `created` value of the last item of each page.

use reqwest::{Client, Method};
use serde::Deserialize;

use crate::config::MONZO_API_BASE;
use crate::error::{SyncError, SyncResult};
use crate::models::{AccountIdentity, Id, PageTransaction};
use crate::sync::http::{fetch_json, fire_and_forget};
use crate::sync::{
    url_encode, AuthContext, BankProvider, ProviderProfile, DEFAULT_PAGE_SIZE, TFL_MARKER,
};

const RETAIL_ACCOUNT_TYPE: &str = "uk_retail";

pub struct MonzoProvider {
    base_url: String,
    client: Client,
    profile: ProviderProfile,
}

#[derive(Debug, Deserialize)]
struct AccountsResponse {
    accounts: Vec<MonzoAccount>,
}

#[derive(Debug, Deserialize)]
struct MonzoAccount {
    id: String,
    #[serde(rename = "type")]
    account_type: String,
}

#[derive(Debug, Deserialize)]
struct TransactionsResponse {
    transactions: Vec<MonzoTransaction>,
}

#[derive(Debug, Deserialize)]
struct MonzoTransaction {
    id: String,
    account_id: String,
    amount: i64,
    created: String,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

impl From<MonzoTransaction> for PageTransaction {
    fn from(tx: MonzoTransaction) -> Self {
        Self {
            id: Id::from(tx.id),
            account_id: Id::from(tx.account_id),
            amount: tx.amount,
            created: tx.created,
            category: tx.category.unwrap_or_default(),
            description: tx.description.unwrap_or_default(),
        }
    }
}

impl MonzoProvider {
    pub fn new() -> Self {
        Self {
            base_url: MONZO_API_BASE.to_string(),
            client: Client::new(),
            profile: ProviderProfile {
                transport_category: "transport",
                page_size: DEFAULT_PAGE_SIZE,
                single_page: false,
                account_predicate: "type == uk_retail",
                merchant_marker: TFL_MARKER.to_string(),
            },
        }
    }

    /// Override API base URL (useful for tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_merchant_marker(mut self, marker: impl Into<String>) -> Self {
        self.profile.merchant_marker = marker.into();
        self
    }

    fn transactions_url(&self, account: &AccountIdentity, since: &str) -> String {
        let limit = self.profile.page_size.to_string();
        let query = url_encode(&[
            ("limit", limit.as_str()),
            ("account_id", account.id.as_str()),
            ("since", since),
        ]);
        format!("{}/transactions?{query}", self.base_url)
    }
}

impl Default for MonzoProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl BankProvider for MonzoProvider {
    fn name(&self) -> &'static str {
        "monzo"
    }

    fn profile(&self) -> &ProviderProfile {
        &self.profile
    }

    async fn discover_account(&self, auth: &AuthContext) -> SyncResult<AccountIdentity> {
        let url = format!("{}/accounts", self.base_url);
        let response: AccountsResponse = fetch_json(&self.client, &url, &auth.get()).await?;

        response
            .accounts
            .into_iter()
            .find(|account| account.account_type == RETAIL_ACCOUNT_TYPE)
            .map(|account| AccountIdentity::new(account.id))
            .ok_or(SyncError::NoMatchingAccount {
                provider: self.name(),
                predicate: self.profile.account_predicate,
            })
    }

    async fn fetch_page(
        &self,
        account: &AccountIdentity,
        since: &str,
        auth: &AuthContext,
    ) -> SyncResult<Vec<PageTransaction>> {
        let url = self.transactions_url(account, since);
        let response: TransactionsResponse = fetch_json(&self.client, &url, &auth.get()).await?;
        Ok(response.transactions.into_iter().map(Into::into).collect())
    }

    fn logout(&self, auth: &AuthContext) {
        let url = format!("{}/oauth2/logout", self.base_url);
        fire_and_forget(&self.client, url, auth.request(Method::POST));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transactions_url_orders_and_encodes_params() {
        let provider = MonzoProvider::new().with_base_url("http://localhost:1234/");
        let url = provider.transactions_url(
            &AccountIdentity::new("acc_00009"),
            "2023-01-01T00:00:00Z",
        );
        assert_eq!(
            url,
            "http://localhost:1234/transactions?limit=100&account_id=acc_00009&since=2023-01-01T00%3A00%3A00Z"
        );
    }

    #[test]
    fn missing_category_and_description_become_empty() {
        let raw = r#"{"id":"tx_1","account_id":"acc","amount":-150,"created":"2023-01-01T00:00:00Z","category":null}"#;
        let tx: MonzoTransaction = serde_json::from_str(raw).unwrap();
        let page: PageTransaction = tx.into();
        assert_eq!(page.category, "");
        assert_eq!(page.description, "");
    }
}
