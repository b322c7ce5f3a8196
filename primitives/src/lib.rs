mod address;
mod application;
mod asset;
mod b58;
mod effect;
mod group;
mod predicate;
mod transaction;
mod value;

pub use {
  address::Address,
  application::{
    AppId,
    AppInstance,
    Application,
    ArtifactId,
    Handler,
    NoOpRoute,
    Route,
    StateSchema,
  },
  asset::{AssetHolding, AssetId, AssetParams},
  b58::ToBase58String,
  effect::{Effect, RoyaltyShare},
  group::{Error as GroupError, TransactionGroup},
  predicate::{
    AssetParamField,
    Context,
    Expr,
    Predicate,
    Slot,
    Term,
    TxnField,
    TxnKindTag,
  },
  transaction::{OnCompletion, Transaction, TxKind},
  value::{uint_from_bytes, uint_to_bytes, Value},
};
