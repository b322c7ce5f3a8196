use {
  crate::{Address, Expr},
  serde::{Deserialize, Serialize},
};

/// One payee of a royalty distribution.
///
/// Each share receives `floor(payment * ratio / sum of ratios)`; the
/// rounding remainder is intentionally left in custody.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoyaltyShare {
  pub receiver: Address,
  pub ratio: u64,
}

/// A follow-up action executed only after a handler's predicate approves.
///
/// Transfers move funds out of the application's custody account and are
/// applied in declared order within the same atomic commit as the state
/// writes; if any of them cannot be applied the whole group rolls back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Effect {
  /// Write a global state key of the application being called.
  GlobalPut { key: Vec<u8>, value: Expr },

  /// Write a local state key of an opted-in account.
  LocalPut {
    account: Expr,
    key: Vec<u8>,
    value: Expr,
  },

  /// Pay native currency from custody.
  Pay { receiver: Expr, amount: Expr },

  /// Sweep the entire remaining custody balance. A no-op when the balance
  /// is already zero.
  CloseAccountTo { receiver: Expr },

  /// Transfer asset units from custody.
  AssetTransfer {
    asset: Expr,
    receiver: Expr,
    amount: Expr,
  },

  /// Sweep the entire custody holding of an asset and remove the holding.
  /// A no-op when custody never opted into the asset.
  AssetCloseTo { asset: Expr, receiver: Expr },

  /// Opt custody into an asset via a zero-amount self transfer.
  OptInAsset { asset: Expr },

  /// Distribute a royalty payment across fixed shares, each payout rounded
  /// down; the remainder stays in custody.
  PayRoyalties {
    payment: Expr,
    payouts: Vec<RoyaltyShare>,
  },
}
