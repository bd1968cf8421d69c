use crate::{
    config::MAX_TRANSACTION_SIZE,
    crypto::{hash, Address, Hash, PublicKey, Signature},
    serializer::*,
};

mod payload;
mod version;

pub use payload::*;
pub use version::TxVersion;

#[cfg(test)]
mod tests;

pub type Nonce = u64;

// Maximum number of keys or signatures in one record
pub const MAX_SIGNATURE_RECORD_SIZE: usize = 16;

// Threshold signature record: `threshold` of `public_keys` must have signed
// For a single account this is always 1 of 1
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignatureRecord {
    pub public_keys: Vec<PublicKey>,
    pub threshold: u16,
    pub signatures: Vec<Signature>,
}

impl SignatureRecord {
    pub fn single(public_key: PublicKey, signature: Signature) -> Self {
        Self {
            public_keys: vec![public_key],
            threshold: 1,
            signatures: vec![signature],
        }
    }

    // Check that at least `threshold` distinct keys signed the content hash
    // A repeated signature or key only counts once
    pub fn verify(&self, content_hash: &Hash) -> bool {
        if self.threshold == 0 || self.signatures.len() < self.threshold as usize {
            return false;
        }

        let mut signers: Vec<&PublicKey> = Vec::with_capacity(self.public_keys.len());
        for key in &self.public_keys {
            if signers.contains(&key) {
                continue;
            }

            let signed = self
                .signatures
                .iter()
                .any(|signature| key.verify(content_hash.as_bytes(), signature).is_ok());
            if signed {
                signers.push(key);
            }
        }

        signers.len() >= self.threshold as usize
    }
}

impl Serializer for SignatureRecord {
    fn write(&self, writer: &mut Writer) {
        self.public_keys.write(writer);
        writer.write_u16(self.threshold);
        self.signatures.write(writer);
    }

    fn read(reader: &mut Reader) -> Result<Self, ReaderError> {
        let public_keys: Vec<PublicKey> = Vec::read(reader)?;
        if public_keys.len() > MAX_SIGNATURE_RECORD_SIZE {
            return Err(ReaderError::ExceedsMaxArraySize(
                public_keys.len(),
                MAX_SIGNATURE_RECORD_SIZE,
            ));
        }

        let threshold = reader.read_u16()?;
        let signatures: Vec<Signature> = Vec::read(reader)?;
        if signatures.len() > MAX_SIGNATURE_RECORD_SIZE {
            return Err(ReaderError::ExceedsMaxArraySize(
                signatures.len(),
                MAX_SIGNATURE_RECORD_SIZE,
            ));
        }

        Ok(Self {
            public_keys,
            threshold,
            signatures,
        })
    }

    fn size(&self) -> usize {
        self.public_keys.size() + 2 + self.signatures.size()
    }
}

// Transaction to be sent over the network
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transaction {
    /// Version of the transaction
    version: TxVersion,
    // Account paying for the transaction
    source: Address,
    // What the transaction does
    payload: TransactionPayload,
    /// Nonce, unique per source account
    nonce: Nonce,
    // Signature records attached after building
    signatures: Vec<SignatureRecord>,
}

impl Transaction {
    // Create a new unsigned transaction
    pub fn new(
        version: TxVersion,
        source: Address,
        payload: TransactionPayload,
        nonce: Nonce,
    ) -> Self {
        Self {
            version,
            source,
            payload,
            nonce,
            signatures: Vec::new(),
        }
    }

    pub fn get_version(&self) -> TxVersion {
        self.version
    }

    pub fn get_source(&self) -> &Address {
        &self.source
    }

    pub fn get_payload(&self) -> &TransactionPayload {
        &self.payload
    }

    pub fn get_nonce(&self) -> Nonce {
        self.nonce
    }

    pub fn get_signatures(&self) -> &[SignatureRecord] {
        &self.signatures
    }

    pub fn is_signed(&self) -> bool {
        !self.signatures.is_empty()
    }

    pub fn add_signature_record(&mut self, record: SignatureRecord) {
        self.signatures.push(record);
    }

    fn write_unsigned(&self, writer: &mut Writer) {
        self.version.write(writer);
        self.source.write(writer);
        self.payload.write(writer);
        writer.write_u64(self.nonce);
    }

    // Canonical encoding without the signature records
    pub fn unsigned_bytes(&self) -> Vec<u8> {
        let mut buffer = Vec::new();
        let mut writer = Writer::new(&mut buffer);
        self.write_unsigned(&mut writer);
        buffer
    }

    // Hash of the unsigned encoding
    // This is the value signed by the source account
    pub fn content_hash(&self) -> Hash {
        hash(&self.unsigned_bytes())
    }

    // Verify every attached signature record against the content hash
    pub fn verify_signatures(&self) -> bool {
        if self.signatures.is_empty() {
            return false;
        }

        let content_hash = self.content_hash();
        self.signatures
            .iter()
            .all(|record| record.verify(&content_hash))
    }
}

impl Serializer for Transaction {
    fn write(&self, writer: &mut Writer) {
        self.write_unsigned(writer);
        self.signatures.write(writer);
    }

    fn read(reader: &mut Reader) -> Result<Self, ReaderError> {
        let start = reader.total_read();
        let version = TxVersion::read(reader)?;
        let source = Address::read(reader)?;
        let payload = TransactionPayload::read(reader)?;
        let nonce = reader.read_u64()?;
        let signatures = Vec::read(reader)?;

        let read = reader.total_read() - start;
        if read > MAX_TRANSACTION_SIZE {
            return Err(ReaderError::ExceedsMaxBytesSize(read, MAX_TRANSACTION_SIZE));
        }

        Ok(Self {
            version,
            source,
            payload,
            nonce,
            signatures,
        })
    }

    fn size(&self) -> usize {
        self.version.size()
            + self.source.size()
            + self.payload.size()
            + 8
            + self.signatures.size()
    }
}
