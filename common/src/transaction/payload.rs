use crate::{
    config::{MAX_INSTRUCTION_SIZE, NATIVE_TRANSFER_CONTRACT, TRANSFER_METHOD},
    crypto::{Address, Hash},
    serializer::*,
};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PayloadError {
    #[error("Encoded instruction is {0} bytes, maximum allowed is {1}")]
    InstructionTooLarge(usize, usize),
    #[error("Method name is {0} bytes, maximum allowed is 255")]
    MethodTooLong(usize),
    #[error("Empty transfer list")]
    NoTransfers,
}

// One balance movement
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct State {
    pub from: Address,
    pub to: Address,
    pub value: u64,
}

impl Serializer for State {
    fn write(&self, writer: &mut Writer) {
        self.from.write(writer);
        self.to.write(writer);
        writer.write_u64(self.value);
    }

    fn read(reader: &mut Reader) -> Result<Self, ReaderError> {
        Ok(Self {
            from: Address::read(reader)?,
            to: Address::read(reader)?,
            value: reader.read_u64()?,
        })
    }

    fn size(&self) -> usize {
        self.from.size() + self.to.size() + 8
    }
}

// Arguments of the native "transfer" method
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transfers {
    pub states: Vec<State>,
}

impl Serializer for Transfers {
    fn write(&self, writer: &mut Writer) {
        self.states.write(writer);
    }

    fn read(reader: &mut Reader) -> Result<Self, ReaderError> {
        Ok(Self {
            states: Vec::read(reader)?,
        })
    }

    fn size(&self) -> usize {
        self.states.size()
    }
}

// Invocation of a native contract method
// Arguments are kept encoded, they are only decoded on demand
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InvokeNativePayload {
    contract: Hash,
    method: String,
    args: Vec<u8>,
}

impl InvokeNativePayload {
    pub fn new(contract: Hash, method: String, args: Vec<u8>) -> Result<Self, PayloadError> {
        if method.len() > u8::MAX as usize {
            return Err(PayloadError::MethodTooLong(method.len()));
        }

        if args.len() > MAX_INSTRUCTION_SIZE {
            return Err(PayloadError::InstructionTooLarge(
                args.len(),
                MAX_INSTRUCTION_SIZE,
            ));
        }

        Ok(Self {
            contract,
            method,
            args,
        })
    }

    // Build the invocation of the native transfer method
    pub fn transfer(transfers: &Transfers) -> Result<Self, PayloadError> {
        if transfers.states.is_empty() {
            return Err(PayloadError::NoTransfers);
        }

        Self::new(
            NATIVE_TRANSFER_CONTRACT,
            TRANSFER_METHOD.to_owned(),
            transfers.to_bytes(),
        )
    }

    pub fn get_contract(&self) -> &Hash {
        &self.contract
    }

    pub fn get_method(&self) -> &str {
        &self.method
    }

    pub fn get_args(&self) -> &[u8] {
        &self.args
    }

    // Decode the arguments as a transfer list
    pub fn decode_transfers(&self) -> Result<Transfers, ReaderError> {
        Transfers::from_bytes(&self.args)
    }
}

impl Serializer for InvokeNativePayload {
    fn write(&self, writer: &mut Writer) {
        self.contract.write(writer);
        writer.write_string(&self.method);
        writer.write_blob(&self.args);
    }

    fn read(reader: &mut Reader) -> Result<Self, ReaderError> {
        let contract = Hash::read(reader)?;
        let method = reader.read_string()?;
        let args = reader.read_blob(MAX_INSTRUCTION_SIZE)?;
        Ok(Self {
            contract,
            method,
            args,
        })
    }

    fn size(&self) -> usize {
        self.contract.size() + 1 + self.method.len() + 4 + self.args.len()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransactionPayload {
    InvokeNative(InvokeNativePayload),
}

impl Serializer for TransactionPayload {
    fn write(&self, writer: &mut Writer) {
        match self {
            TransactionPayload::InvokeNative(payload) => {
                writer.write_u8(0);
                payload.write(writer);
            }
        }
    }

    fn read(reader: &mut Reader) -> Result<Self, ReaderError> {
        Ok(match reader.read_u8()? {
            0 => TransactionPayload::InvokeNative(InvokeNativePayload::read(reader)?),
            _ => return Err(ReaderError::InvalidValue),
        })
    }

    fn size(&self) -> usize {
        1 + match self {
            TransactionPayload::InvokeNative(payload) => payload.size(),
        }
    }
}
