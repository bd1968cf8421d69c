use bytes::Bytes;
use log::info;
use std::path::Path;
use txbench_common::{crypto::Signer, serializer::Serializer};

use crate::{
    error::InjectorError,
    factory::{TransactionFactory, TRANSFER_AMOUNT},
    signer::sign_transaction,
    sink::{FileSink, TransactionSink},
};

// Write `num` signed transfers to `output`, one `<hash>,<transaction>` line each
// Transaction `i` goes to the source address with `i` in its first 8 bytes
pub async fn generate_transfer_file(
    signer: &dyn Signer,
    num: u64,
    output: impl AsRef<Path>,
) -> Result<u64, InjectorError> {
    let output = output.as_ref();
    let source = signer.public_key().to_address();
    let factory = TransactionFactory::seeded(source, TRANSFER_AMOUNT);
    let sink = FileSink::create(output).await?;

    for index in 0..num {
        let mut tx = factory.build(&source.with_index(index))?;
        let hash = sign_transaction(signer, &mut tx)?;
        sink.transmit(&hash, Bytes::from(tx.to_bytes())).await?;
    }
    sink.flush().await?;

    info!("Generated {} transactions in {}", num, output.display());
    Ok(num)
}

#[cfg(test)]
mod tests {
    use super::*;
    use txbench_common::{
        crypto::Hash,
        transaction::{Transaction, TransactionPayload},
    };
    use txbench_wallet::Account;

    #[tokio::test]
    async fn test_generated_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("transfer.dat");
        let account = Account::generate("test");

        assert_eq!(generate_transfer_file(&account, 3, &path).await.unwrap(), 3);

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);

        for (index, line) in lines.iter().enumerate() {
            let (hash, tx) = line.split_once(',').unwrap();
            let tx = Transaction::from_hex(tx).unwrap();
            assert_eq!(hash.parse::<Hash>().unwrap(), tx.content_hash());
            assert!(tx.verify_signatures());

            let TransactionPayload::InvokeNative(payload) = tx.get_payload();
            let transfers = payload.decode_transfers().unwrap();
            let to = transfers.states[0].to;
            assert_eq!(to, account.address().with_index(index as u64));
        }
    }
}
