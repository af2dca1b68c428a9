use crate::config::ResolvedConfig;
use crate::error::{SyncError, SyncResult};

use super::providers::{MonzoProvider, StarlingProvider};
use super::BankProvider;

/// Builds the provider named by the credential server's `current_bank`.
pub trait ProviderFactory: Send + Sync {
    fn create(&self, current_bank: Option<&str>) -> SyncResult<Box<dyn BankProvider>>;
}

/// Factory for the built-in providers.
#[derive(Debug, Clone)]
pub struct DefaultProviderFactory {
    monzo_base_url: String,
    starling_base_url: String,
    merchant_marker: String,
}

impl DefaultProviderFactory {
    pub fn new(config: &ResolvedConfig) -> Self {
        Self {
            monzo_base_url: config.providers.monzo_base_url.clone(),
            starling_base_url: config.providers.starling_base_url.clone(),
            merchant_marker: config.filter.merchant_marker.clone(),
        }
    }
}

impl ProviderFactory for DefaultProviderFactory {
    fn create(&self, current_bank: Option<&str>) -> SyncResult<Box<dyn BankProvider>> {
        // Monzo was the only bank before the discriminator existed.
        let bank = current_bank.unwrap_or("monzo").to_ascii_lowercase();
        match bank.as_str() {
            "monzo" => Ok(Box::new(
                MonzoProvider::new()
                    .with_base_url(&self.monzo_base_url)
                    .with_merchant_marker(&self.merchant_marker),
            )),
            "starling" => Ok(Box::new(
                StarlingProvider::new()
                    .with_base_url(&self.starling_base_url)
                    .with_merchant_marker(&self.merchant_marker),
            )),
            _ => Err(SyncError::UnknownProvider(bank)),
        }
    }
}
