//! Wires the kit components behind one shared state value.

use std::sync::Arc;

use mistgate_kit::{
    catalog::ContentDirectory,
    challenge::ChallengeGenerator,
    config::GateConfig,
    gate::AccessGate,
    ledger::LedgerClient,
    receipts::ReceiptQueryService,
    sponsor::ExecutionCoordinator,
};

/// Shared state of the paywall routes.
pub struct Paywall<L> {
    pub catalog: Arc<dyn ContentDirectory>,
    pub gate: AccessGate<L>,
    pub challenges: ChallengeGenerator,
    pub coordinator: Arc<ExecutionCoordinator<L>>,
    pub receipts: ReceiptQueryService<L>,
}

impl<L> Clone for Paywall<L> {
    fn clone(&self) -> Self {
        Paywall {
            catalog: self.catalog.clone(),
            gate: self.gate.clone(),
            challenges: self.challenges.clone(),
            coordinator: self.coordinator.clone(),
            receipts: self.receipts.clone(),
        }
    }
}

impl<L: LedgerClient> Paywall<L> {
    pub fn new(config: &GateConfig, catalog: Arc<dyn ContentDirectory>, ledger: Arc<L>) -> Self {
        Paywall {
            gate: AccessGate::new(ledger.clone(), config.package),
            challenges: ChallengeGenerator::from_config(config),
            coordinator: Arc::new(ExecutionCoordinator::from_config(ledger.clone(), config)),
            receipts: ReceiptQueryService::new(ledger, config.package),
            catalog,
        }
    }
}
