//! Full-rescan UTXO derivation. Nothing is indexed: every query walks the
//! chain from tip to genesis.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::{Block, ChainError, Hash, LockPolicy, Result, Transaction, TxOutput};

/// A transaction that still holds outputs owned by the queried address.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnspentTransaction {
    pub transaction: Transaction,
    /// `(vout, output)` pairs, ascending by index.
    pub outputs: Vec<(u32, TxOutput)>,
}

/// Walks `blocks` (tip first) and collects the outputs locked with `address`
/// that no later input spends.
///
/// Inputs are recorded as spent before older outputs are reached. Within a
/// block, transactions are visited last to first so a spend of an output
/// created earlier in the same block is seen first too.
pub fn find_unspent_transactions<I>(
    blocks: I,
    policy: &dyn LockPolicy,
    address: &str,
) -> Result<Vec<UnspentTransaction>>
where
    I: IntoIterator<Item = Result<Block>>,
{
    let mut spent: HashMap<Hash, HashSet<u32>> = HashMap::new();
    let mut unspent = Vec::new();

    for block in blocks {
        let block = block?;
        for tx in block.transactions.iter().rev() {
            let spent_here = spent.get(&tx.id);
            let outputs: Vec<(u32, TxOutput)> = tx
                .outputs
                .iter()
                .enumerate()
                .map(|(idx, out)| (idx as u32, out))
                .filter(|(idx, _)| !spent_here.is_some_and(|s| s.contains(idx)))
                .filter(|(_, out)| policy.output_locked_with(out, address))
                .map(|(idx, out)| (idx, out.clone()))
                .collect();

            if !outputs.is_empty() {
                unspent.push(UnspentTransaction {
                    transaction: tx.clone(),
                    outputs,
                });
            }

            if !tx.is_coinbase() {
                for input in &tx.inputs {
                    if policy.input_unlocks_with(input, address) {
                        spent.entry(input.txid).or_default().insert(input.vout);
                    }
                }
            }
        }
    }

    Ok(unspent)
}

pub fn find_utxo<I>(blocks: I, policy: &dyn LockPolicy, address: &str) -> Result<Vec<TxOutput>>
where
    I: IntoIterator<Item = Result<Block>>,
{
    Ok(find_unspent_transactions(blocks, policy, address)?
        .into_iter()
        .flat_map(|utx| utx.outputs.into_iter().map(|(_, out)| out))
        .collect())
}

pub fn balance<I>(blocks: I, policy: &dyn LockPolicy, address: &str) -> Result<u64>
where
    I: IntoIterator<Item = Result<Block>>,
{
    find_utxo(blocks, policy, address)?
        .iter()
        .try_fold(0u64, |total, out| total.checked_add(out.value))
        .ok_or_else(|| ChainError::ValueOverflow {
            address: address.to_string(),
        })
}

/// Picks unspent outputs of `address` until they cover `amount`. Returns the
/// value gathered and the chosen output indices per transaction id; the value
/// is below `amount` when the address cannot afford it.
pub fn find_spendable_outputs<I>(
    blocks: I,
    policy: &dyn LockPolicy,
    address: &str,
    amount: u64,
) -> Result<(u64, BTreeMap<Hash, Vec<u32>>)>
where
    I: IntoIterator<Item = Result<Block>>,
{
    let mut accumulated = 0u64;
    let mut chosen: BTreeMap<Hash, Vec<u32>> = BTreeMap::new();

    'scan: for utx in find_unspent_transactions(blocks, policy, address)? {
        for (vout, out) in utx.outputs {
            if accumulated >= amount {
                break 'scan;
            }
            accumulated = accumulated
                .checked_add(out.value)
                .ok_or_else(|| ChainError::ValueOverflow {
                    address: address.to_string(),
                })?;
            chosen.entry(utx.transaction.id).or_default().push(vout);
        }
    }

    Ok((accumulated, chosen))
}
