use super::*;
use crate::{
    config::{MAX_INSTRUCTION_SIZE, NATIVE_TRANSFER_CONTRACT},
    crypto::{KeyPair, ADDRESS_SIZE},
};

fn transfer_tx(keypair: &KeyPair, to: Address, nonce: Nonce) -> Transaction {
    let transfers = Transfers {
        states: vec![State {
            from: keypair.address(),
            to,
            value: 1,
        }],
    };
    let payload = InvokeNativePayload::transfer(&transfers).unwrap();
    Transaction::new(
        TxVersion::V0,
        keypair.address(),
        TransactionPayload::InvokeNative(payload),
        nonce,
    )
}

fn sign(keypair: &KeyPair, tx: &mut Transaction) {
    let signature = keypair.sign(tx.content_hash().as_bytes());
    tx.add_signature_record(SignatureRecord::single(keypair.public_key(), signature));
}

#[test]
fn test_signed_transaction_roundtrip() {
    let keypair = KeyPair::generate();
    let mut tx = transfer_tx(&keypair, Address::new([7; ADDRESS_SIZE]), 42);
    sign(&keypair, &mut tx);

    let bytes = tx.to_bytes();
    assert_eq!(bytes.len(), tx.size());

    let decoded = Transaction::from_bytes(&bytes).unwrap();
    assert_eq!(decoded, tx);
    assert_eq!(decoded.content_hash(), tx.content_hash());
    assert!(decoded.verify_signatures());
}

#[test]
fn test_content_hash_ignores_signatures() {
    let keypair = KeyPair::generate();
    let mut tx = transfer_tx(&keypair, Address::new([7; ADDRESS_SIZE]), 1);
    let unsigned_hash = tx.content_hash();
    assert!(!tx.is_signed());
    assert!(!tx.verify_signatures());

    sign(&keypair, &mut tx);
    assert!(tx.is_signed());
    assert_eq!(tx.content_hash(), unsigned_hash);
}

#[test]
fn test_nonce_changes_hash() {
    let keypair = KeyPair::generate();
    let to = Address::new([9; ADDRESS_SIZE]);
    let first = transfer_tx(&keypair, to, 100);
    let second = transfer_tx(&keypair, to, 101);

    assert_eq!(first.get_payload(), second.get_payload());
    assert_ne!(first.content_hash(), second.content_hash());
}

#[test]
fn test_signature_from_other_key_rejected() {
    let keypair = KeyPair::generate();
    let other = KeyPair::generate();
    let mut tx = transfer_tx(&keypair, Address::new([1; ADDRESS_SIZE]), 5);

    let signature = other.sign(tx.content_hash().as_bytes());
    tx.add_signature_record(SignatureRecord::single(keypair.public_key(), signature));
    assert!(!tx.verify_signatures());
}

#[test]
fn test_transfer_payload_content() {
    let keypair = KeyPair::generate();
    let to = Address::new([3; ADDRESS_SIZE]);
    let tx = transfer_tx(&keypair, to, 0);

    let TransactionPayload::InvokeNative(payload) = tx.get_payload();
    assert_eq!(payload.get_contract(), &NATIVE_TRANSFER_CONTRACT);
    assert_eq!(payload.get_method(), "transfer");

    let transfers = payload.decode_transfers().unwrap();
    assert_eq!(transfers.states.len(), 1);
    assert_eq!(transfers.states[0].from, keypair.address());
    assert_eq!(transfers.states[0].to, to);
    assert_eq!(transfers.states[0].value, 1);
}

#[test]
fn test_empty_transfers_rejected() {
    let transfers = Transfers { states: Vec::new() };
    assert_eq!(
        InvokeNativePayload::transfer(&transfers),
        Err(PayloadError::NoTransfers)
    );
}

#[test]
fn test_instruction_size_limit() {
    let args = vec![0u8; MAX_INSTRUCTION_SIZE + 1];
    assert_eq!(
        InvokeNativePayload::new(NATIVE_TRANSFER_CONTRACT, "transfer".to_owned(), args),
        Err(PayloadError::InstructionTooLarge(
            MAX_INSTRUCTION_SIZE + 1,
            MAX_INSTRUCTION_SIZE
        ))
    );
}

#[test]
fn test_unknown_payload_rejected() {
    let keypair = KeyPair::generate();
    let tx = transfer_tx(&keypair, Address::new([2; ADDRESS_SIZE]), 0);
    let mut bytes = tx.to_bytes();
    // version (1) + source (32), then the payload id
    bytes[1 + ADDRESS_SIZE] = 9;
    assert_eq!(
        Transaction::from_bytes(&bytes),
        Err(ReaderError::InvalidValue)
    );
}

#[test]
fn test_repeated_signature_counts_once() {
    let keypair = KeyPair::generate();
    let other = KeyPair::generate();
    let tx = transfer_tx(&keypair, Address::new([3; ADDRESS_SIZE]), 5);
    let hash = tx.content_hash();
    let signature = keypair.sign(hash.as_bytes());

    let repeated = SignatureRecord {
        public_keys: vec![keypair.public_key(), keypair.public_key()],
        threshold: 2,
        signatures: vec![signature, signature],
    };
    assert!(!repeated.verify(&hash));

    let two_of_two = SignatureRecord {
        public_keys: vec![keypair.public_key(), other.public_key()],
        threshold: 2,
        signatures: vec![signature, other.sign(hash.as_bytes())],
    };
    assert!(two_of_two.verify(&hash));
}
