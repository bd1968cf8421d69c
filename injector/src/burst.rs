use bytes::Bytes;
use log::{debug, info, warn};
use std::time::Instant;
use txbench_common::{crypto::Signer, serializer::Serializer};

use crate::{
    error::InjectorError,
    factory::{TransactionFactory, TRANSFER_AMOUNT},
    signer::sign_transaction,
    transport::{transaction_frame, PeerTransport},
};

// Outcome of a burst
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BurstReport {
    pub sent: u64,
    pub failures: u64,
}

// Sign one self transfer and broadcast the same frame `num` times, unpaced
// A zero count still sends once
pub async fn burst<T: PeerTransport + ?Sized>(
    signer: &dyn Signer,
    transport: &T,
    num: u64,
    consensus: bool,
) -> Result<BurstReport, InjectorError> {
    let num = num.max(1);
    let source = signer.public_key().to_address();
    let factory = TransactionFactory::seeded(source, TRANSFER_AMOUNT);

    let mut tx = factory.build(&source)?;
    let hash = sign_transaction(signer, &mut tx)?;
    let frame = transaction_frame(Bytes::from(tx.to_bytes()))?;

    info!("Sending transaction {} {} times", hash, num);
    let start = Instant::now();
    let mut report = BurstReport {
        sent: 0,
        failures: 0,
    };
    for _ in 0..num {
        match transport.broadcast(frame.clone(), consensus).await {
            Ok(()) => report.sent += 1,
            Err(e) => {
                report.failures += 1;
                if log::log_enabled!(log::Level::Debug) {
                    debug!("Error while broadcasting: {}", e);
                }
            }
        }
    }

    if report.failures > 0 {
        warn!("{} broadcasts failed", report.failures);
    }
    info!(
        "{} transactions sent in {:.2}s",
        report.sent,
        start.elapsed().as_secs_f64()
    );
    Ok(report)
}
