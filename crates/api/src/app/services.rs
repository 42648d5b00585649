use std::sync::Arc;

use wabulk_infra::{
    jobs::{Dispatcher, InMemoryJobLedger},
    payload::PayloadBuilder,
    provider::{MessageProvider, ProviderError, WhatsAppClient},
};

use crate::config::AppConfig;

/// Everything the handlers need, shared behind an `Arc`.
pub struct AppServices {
    pub dispatcher: Dispatcher,
}

impl AppServices {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self { dispatcher }
    }

    pub fn provider(&self) -> &Arc<dyn MessageProvider> {
        self.dispatcher.provider()
    }
}

/// Wire the in-memory ledger and the WhatsApp client into a dispatcher.
pub fn build_services(config: &AppConfig) -> Result<AppServices, ProviderError> {
    let ledger = Arc::new(InMemoryJobLedger::with_capacity(config.ledger_capacity));
    let payloads = PayloadBuilder::new(config.provider.country_code.clone());
    let provider = Arc::new(WhatsAppClient::new(config.provider.clone())?);

    let dispatcher = Dispatcher::new(ledger, provider, payloads, config.send.clone());
    Ok(AppServices::new(dispatcher))
}
