use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{constants::SUBSIDY, sha256, ChainError, Hash, Result};

/// An amount of value together with the predicate that owns it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOutput {
    pub value: u64,
    pub pubkey_hash: String,
}

/// A reference to an earlier output plus the credential that claims it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxInput {
    pub txid: Hash,
    pub vout: u32,
    pub script_sig: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Hash,
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
}

impl TxOutput {
    pub fn new(value: u64, address: &str) -> Self {
        Self {
            value,
            pubkey_hash: address.to_string(),
        }
    }
}

impl Transaction {
    /// Builds a transaction and derives its id from the content.
    pub fn new(inputs: Vec<TxInput>, outputs: Vec<TxOutput>) -> Result<Self> {
        let id = Self::compute_id(&inputs, &outputs)?;
        Ok(Self {
            id,
            inputs,
            outputs,
        })
    }

    /// SHA-256 over the bincode encoding of `(inputs, outputs)`.
    pub fn compute_id(inputs: &[TxInput], outputs: &[TxOutput]) -> Result<Hash> {
        let bytes = bincode::serialize(&(inputs, outputs))?;
        Ok(sha256(&bytes))
    }

    /// Mints [`SUBSIDY`] to `to`. Only ever included in the genesis block.
    pub fn coinbase(to: &str) -> Result<Self> {
        Self::new(vec![], vec![TxOutput::new(SUBSIDY, to)])
    }

    pub fn is_coinbase(&self) -> bool {
        self.inputs.is_empty()
    }

    pub fn has_valid_id(&self) -> Result<bool> {
        Ok(Self::compute_id(&self.inputs, &self.outputs)? == self.id)
    }

    /// Spends the outputs selected in `spendable` (txid to output indices, worth
    /// `available` in total), paying `amount` to `to` and any change back to `from`.
    pub fn transfer(
        from: &str,
        to: &str,
        amount: u64,
        available: u64,
        spendable: &BTreeMap<Hash, Vec<u32>>,
    ) -> Result<Self> {
        if amount == 0 {
            return Err(ChainError::InvalidTransaction(
                "transfer amount must be positive".into(),
            ));
        }
        if available < amount {
            return Err(ChainError::InsufficientFunds {
                address: from.to_string(),
                available,
                required: amount,
            });
        }

        let inputs = spendable
            .iter()
            .flat_map(|(txid, outs)| {
                outs.iter().map(move |vout| TxInput {
                    txid: *txid,
                    vout: *vout,
                    script_sig: from.to_string(),
                })
            })
            .collect();

        let mut outputs = vec![TxOutput::new(amount, to)];
        if available > amount {
            outputs.push(TxOutput::new(available - amount, from));
        }
        Self::new(inputs, outputs)
    }
}

/// Decides who may claim an output. Swapping the implementation changes the
/// ownership rule without touching the UTXO scan.
pub trait LockPolicy: Send + Sync {
    fn output_locked_with(&self, output: &TxOutput, address: &str) -> bool;
    fn input_unlocks_with(&self, input: &TxInput, address: &str) -> bool;
}

/// Ownership by plain string equality between the address and the
/// output's predicate or the input's credential.
#[derive(Clone, Copy, Debug, Default)]
pub struct PlainAddress;

impl LockPolicy for PlainAddress {
    fn output_locked_with(&self, output: &TxOutput, address: &str) -> bool {
        output.pubkey_hash == address
    }

    fn input_unlocks_with(&self, input: &TxInput, address: &str) -> bool {
        input.script_sig == address
    }
}
