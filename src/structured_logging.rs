//! Structured logging for mint attempts and state refreshes

use crate::observability::CorrelationId;

/// Structured logger carrying one correlation id
#[derive(Debug, Clone)]
pub struct MintLogger {
    correlation_id: CorrelationId,
}

impl MintLogger {
    pub fn new(correlation_id: CorrelationId) -> Self {
        Self { correlation_id }
    }

    pub fn correlation_id(&self) -> &CorrelationId {
        &self.correlation_id
    }

    pub fn log_mint_attempt(&self, collection: &str, mint: &str, payer: &str) {
        tracing::info!(
            correlation_id = %self.correlation_id,
            collection = %collection,
            mint = %mint,
            payer = %payer,
            "Attempting mint transaction"
        );
    }

    pub fn log_mint_success(&self, mint: &str, sig: &str, latency_ms: u64) {
        tracing::info!(
            correlation_id = %self.correlation_id,
            mint = %mint,
            signature = %sig,
            latency_ms = %latency_ms,
            "Mint transaction successful"
        );
    }

    pub fn log_mint_failure(&self, error: &str, category: &str, latency_ms: u64) {
        tracing::warn!(
            correlation_id = %self.correlation_id,
            error = %error,
            category = %category,
            latency_ms = %latency_ms,
            "Mint transaction failed"
        );
    }

    pub fn log_refresh(&self, generation: u64, identity: Option<&str>) {
        tracing::debug!(
            correlation_id = %self.correlation_id,
            generation = %generation,
            identity = ?identity,
            "Refreshing sale state"
        );
    }
}

impl Default for MintLogger {
    fn default() -> Self {
        Self::new(CorrelationId::new())
    }
}
