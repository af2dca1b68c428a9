//! Starling provider.
//!
//! The primary account comes from `GET /api/v2/accounts`. Its transaction
//! feed, `GET /api/v2/feed/account/{accountUid}/category/{categoryUid}`,
//! returns every item changed since `changesSince` in one response, so a
//! single page always completes the session.

use reqwest::{Client, Method};
use serde::Deserialize;

use crate::config::STARLING_API_BASE;
use crate::error::{SyncError, SyncResult};
use crate::models::{AccountIdentity, Id, PageTransaction};
use crate::sync::http::{fetch_json, fire_and_forget};
use crate::sync::{
    url_encode, AuthContext, BankProvider, ProviderProfile, DEFAULT_PAGE_SIZE, TFL_MARKER,
};

const PRIMARY_ACCOUNT_TYPE: &str = "PRIMARY";
const OUTBOUND: &str = "OUT";

pub struct StarlingProvider {
    base_url: String,
    client: Client,
    profile: ProviderProfile,
}

#[derive(Debug, Deserialize)]
struct AccountsResponse {
    accounts: Vec<StarlingAccount>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StarlingAccount {
    account_uid: String,
    account_type: String,
    default_category: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FeedResponse {
    feed_items: Vec<FeedItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FeedItem {
    feed_item_uid: String,
    amount: FeedAmount,
    direction: String,
    transaction_time: String,
    #[serde(default)]
    spending_category: Option<String>,
    #[serde(default)]
    counter_party_name: Option<String>,
    #[serde(default)]
    reference: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FeedAmount {
    minor_units: i64,
}

impl FeedItem {
    fn into_page_transaction(self, account_id: &Id) -> PageTransaction {
        let amount = if self.direction == OUTBOUND {
            -self.amount.minor_units.abs()
        } else {
            self.amount.minor_units.abs()
        };

        let description = [self.counter_party_name, self.reference]
            .into_iter()
            .flatten()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        PageTransaction {
            id: Id::from(self.feed_item_uid),
            account_id: account_id.clone(),
            amount,
            created: self.transaction_time,
            category: self.spending_category.unwrap_or_default(),
            description,
        }
    }
}

impl StarlingProvider {
    pub fn new() -> Self {
        Self {
            base_url: STARLING_API_BASE.to_string(),
            client: Client::new(),
            profile: ProviderProfile {
                transport_category: "TRANSPORT",
                page_size: DEFAULT_PAGE_SIZE,
                single_page: true,
                account_predicate: "accountType == PRIMARY",
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

    fn feed_url(&self, account: &AccountIdentity, since: &str) -> String {
        let category = account
            .category
            .as_ref()
            .map(Id::as_str)
            .unwrap_or_default();
        let query = url_encode(&[("changesSince", since)]);
        format!(
            "{}/api/v2/feed/account/{}/category/{}?{query}",
            self.base_url, account.id, category
        )
    }
}

impl Default for StarlingProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl BankProvider for StarlingProvider {
    fn name(&self) -> &'static str {
        "starling"
    }

    fn profile(&self) -> &ProviderProfile {
        &self.profile
    }

    async fn discover_account(&self, auth: &AuthContext) -> SyncResult<AccountIdentity> {
        let url = format!("{}/api/v2/accounts", self.base_url);
        let response: AccountsResponse = fetch_json(&self.client, &url, &auth.get()).await?;

        response
            .accounts
            .into_iter()
            .find(|account| account.account_type == PRIMARY_ACCOUNT_TYPE)
            .map(|account| {
                AccountIdentity::new(account.account_uid).with_category(account.default_category)
            })
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
        let url = self.feed_url(account, since);
        let response: FeedResponse = fetch_json(&self.client, &url, &auth.get()).await?;
        Ok(response
            .feed_items
            .into_iter()
            .map(|item| item.into_page_transaction(&account.id))
            .collect())
    }

    fn logout(&self, auth: &AuthContext) {
        let url = format!("{}/api/v2/identity/logout", self.base_url);
        fire_and_forget(&self.client, url, auth.request(Method::PUT));
    }
}
