#![allow(dead_code)]

use {
  covenant_primitives::{
    Address,
    AssetHolding,
    AssetId,
    AssetParams,
    Context,
    Transaction,
    TransactionGroup,
  },
  covenant_vm::{execute, InMemoryArtifacts, InMemoryLedger, State, StateDiff},
  ed25519_dalek::Keypair,
};

/// A fresh externally-owned wallet address.
pub fn wallet() -> Address {
  Keypair::generate(&mut rand::thread_rng()).public.into()
}

pub fn ctx(latest_timestamp: u64) -> Context {
  Context { latest_timestamp }
}

/// An ordinary fungible asset: no freeze, no clawback.
pub fn plain_asset(manager: Address, decimals: u32) -> AssetParams {
  AssetParams {
    manager,
    freeze: Address::ZERO,
    clawback: Address::ZERO,
    default_frozen: false,
    decimals,
    total: u64::MAX,
  }
}

/// A one-of-one NFT locked to a clawback escrow, as the royalty contract
/// requires: default frozen, single authority for manager/freeze/clawback.
pub fn locked_nft(authority: Address) -> AssetParams {
  AssetParams {
    manager: authority,
    freeze: authority,
    clawback: authority,
    default_frozen: true,
    decimals: 0,
    total: 1,
  }
}

pub fn fund(genesis: &mut StateDiff, account: Address, amount: u64) {
  genesis.set_balance(account, amount);
}

pub fn grant(
  genesis: &mut StateDiff,
  account: Address,
  asset: AssetId,
  amount: u64,
  frozen: bool,
) {
  genesis.set_holding(account, asset, AssetHolding { amount, frozen });
}

/// Builds a group from the transactions, executes it against the store and
/// commits the diff on success. On failure nothing is committed.
pub fn run(
  store: &mut InMemoryLedger,
  artifacts: &InMemoryArtifacts,
  ctx: &Context,
  transactions: Vec<Transaction>,
) -> Result<(), covenant_vm::Error> {
  let group =
    TransactionGroup::new(transactions).expect("tests build valid groups");
  let diff = execute(&group, &*store, artifacts, ctx)?;
  store.apply(diff);
  Ok(())
}

/// Runs a group expected to fail and asserts the store is untouched.
pub fn run_rejected(
  store: &mut InMemoryLedger,
  artifacts: &InMemoryArtifacts,
  ctx: &Context,
  transactions: Vec<Transaction>,
) -> covenant_vm::Error {
  let before = store.clone();
  let err = run(store, artifacts, ctx, transactions)
    .expect_err("group should have been rejected");
  assert_eq!(*store, before, "a rejected group must not change state");
  err
}
