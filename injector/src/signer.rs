use log::trace;
use txbench_common::{
    crypto::{Hash, Signer, SignerError},
    transaction::{SignatureRecord, Transaction},
};

// Sign the content hash of the transaction and attach a 1 of 1 signature record
// Returns the content hash, which identifies the transaction
pub fn sign_transaction(signer: &dyn Signer, tx: &mut Transaction) -> Result<Hash, SignerError> {
    let hash = tx.content_hash();
    let signature = signer.sign_hash(&hash)?;
    tx.add_signature_record(SignatureRecord::single(signer.public_key(), signature));

    if log::log_enabled!(log::Level::Trace) {
        trace!("Signed transaction {} with nonce {}", hash, tx.get_nonce());
    }

    Ok(hash)
}

#[cfg(test)]
mod tests {
    use super::*;
    use txbench_common::crypto::{Address, ADDRESS_SIZE};
    use txbench_wallet::Account;

    use crate::factory::TransactionFactory;

    #[test]
    fn test_single_signature_record() {
        let account = Account::generate("test");
        let factory = TransactionFactory::new(account.address(), 1, 0);
        let mut tx = factory.build(&Address::new([5; ADDRESS_SIZE])).unwrap();

        let hash = sign_transaction(&account, &mut tx).unwrap();
        assert_eq!(hash, tx.content_hash());

        let records = tx.get_signatures();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].threshold, 1);
        assert_eq!(records[0].public_keys, vec![account.public_key()]);
        assert!(tx.verify_signatures());
    }
}
