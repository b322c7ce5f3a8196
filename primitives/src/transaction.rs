use {
  crate::{AppId, ArtifactId, AssetId, AssetParams, Address, Predicate},
  serde::{Deserialize, Serialize},
};

/// Completion type of an application call, selecting the lifecycle
/// transition the router dispatches to.
#[derive(
  Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
pub enum OnCompletion {
  NoOp,
  OptIn,
  CloseOut,
  ClearState,
  Update,
  Delete,
}

/// Kind-specific payload of a transaction.
///
/// Optional addresses (`close_remainder_to`, `close_to`,
/// `revocation_target`) encode "unset" as [`Address::ZERO`], matching the
/// ledger's wire encoding, so predicates compare them against the zero
/// address directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TxKind {
  Payment {
    receiver: Address,
    amount: u64,
    close_remainder_to: Address,
  },
  AssetTransfer {
    asset: AssetId,
    amount: u64,
    receiver: Address,
    close_to: Address,
    /// When set, this is a clawback transfer: the debited holding is this
    /// account's, and the sender must be the asset's clawback authority.
    revocation_target: Address,
  },
  ApplicationCall {
    app: AppId,
    on_completion: OnCompletion,
    args: Vec<Vec<u8>>,
    accounts: Vec<Address>,
    assets: Vec<AssetId>,
    /// Definition reference for creation calls, or the replacement
    /// definition for approved update calls.
    artifact: Option<ArtifactId>,
  },
  AssetConfig {
    asset: AssetId,
    params: AssetParams,
  },
  AssetDestroy {
    asset: AssetId,
  },
}

/// A single proposed ledger transaction.
///
/// Signature bytes are out of scope; a transaction is either assumed to be
/// signed by its sender, or carries an attached logic predicate (`lsig`)
/// that must approve the group in the sender's stead — this is how the
/// stateless escrow contracts authorize spends from accounts nobody holds a
/// key for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
  pub sender: Address,
  pub fee: u64,
  pub first_valid: u64,
  pub last_valid: u64,
  pub rekey_to: Address,
  pub lsig: Option<Predicate>,
  pub kind: TxKind,
}

impl Transaction {
  /// Typical minimum fee, used as the default by the constructors.
  pub const MIN_FEE: u64 = 1000;

  pub fn new(sender: Address, kind: TxKind) -> Self {
    Self {
      sender,
      fee: Self::MIN_FEE,
      first_valid: 0,
      last_valid: u64::MAX,
      rekey_to: Address::ZERO,
      lsig: None,
      kind,
    }
  }

  pub fn payment(sender: Address, receiver: Address, amount: u64) -> Self {
    Self::new(sender, TxKind::Payment {
      receiver,
      amount,
      close_remainder_to: Address::ZERO,
    })
  }

  pub fn asset_transfer(
    sender: Address,
    asset: AssetId,
    receiver: Address,
    amount: u64,
  ) -> Self {
    Self::new(sender, TxKind::AssetTransfer {
      asset,
      amount,
      receiver,
      close_to: Address::ZERO,
      revocation_target: Address::ZERO,
    })
  }

  pub fn app_call(
    sender: Address,
    app: AppId,
    on_completion: OnCompletion,
    args: Vec<Vec<u8>>,
  ) -> Self {
    Self::new(sender, TxKind::ApplicationCall {
      app,
      on_completion,
      args,
      accounts: vec![],
      assets: vec![],
      artifact: None,
    })
  }

  pub fn app_create(
    sender: Address,
    artifact: ArtifactId,
    args: Vec<Vec<u8>>,
  ) -> Self {
    Self::new(sender, TxKind::ApplicationCall {
      app: AppId::CREATE,
      on_completion: OnCompletion::NoOp,
      args,
      accounts: vec![],
      assets: vec![],
      artifact: Some(artifact),
    })
  }

  pub fn with_fee(mut self, fee: u64) -> Self {
    self.fee = fee;
    self
  }

  pub fn with_lsig(mut self, lsig: Predicate) -> Self {
    self.lsig = Some(lsig);
    self
  }
}
