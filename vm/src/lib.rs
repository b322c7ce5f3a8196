mod artifacts;
mod effects;
mod eval;
mod execute;
mod ledger;
mod state;

pub use {
  artifacts::{compile, InMemoryArtifacts, Loader},
  execute::{execute, Error, HandlerKind},
  ledger::{StateScope, TransferError},
  state::{InMemoryLedger, State, StateDiff},
};
