use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use txbench_common::{
    crypto::Address,
    time::get_current_time_in_millis,
    transaction::{
        InvokeNativePayload, Nonce, PayloadError, State, Transaction, TransactionPayload,
        Transfers, TxVersion,
    },
};

// Amount moved by every generated transfer
pub const TRANSFER_AMOUNT: u64 = 1;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FactoryError {
    #[error("Error while building transfer payload: {0}")]
    Payload(#[from] PayloadError),
}

// Builds the unsigned "transfer `amount` from source to destination" transaction
// Each built transaction takes the next nonce of a shared counter
pub struct TransactionFactory {
    source: Address,
    amount: u64,
    next_nonce: AtomicU64,
}

impl TransactionFactory {
    pub fn new(source: Address, amount: u64, first_nonce: Nonce) -> Self {
        Self {
            source,
            amount,
            next_nonce: AtomicU64::new(first_nonce),
        }
    }

    // Nonces start at the current time in milliseconds,
    // so consecutive runs with the same account do not reuse them
    pub fn seeded(source: Address, amount: u64) -> Self {
        Self::new(source, amount, get_current_time_in_millis())
    }

    pub fn source(&self) -> &Address {
        &self.source
    }

    pub fn build(&self, to: &Address) -> Result<Transaction, FactoryError> {
        let transfers = Transfers {
            states: vec![State {
                from: self.source,
                to: *to,
                value: self.amount,
            }],
        };
        let payload = InvokeNativePayload::transfer(&transfers)?;

        // Taken last so a failed build does not burn a nonce
        let nonce = self.next_nonce.fetch_add(1, Ordering::SeqCst);
        Ok(Transaction::new(
            TxVersion::V0,
            self.source,
            TransactionPayload::InvokeNative(payload),
            nonce,
        ))
    }
}
