use {
  crate::Address,
  serde::{Deserialize, Serialize},
  std::fmt::{self, Display},
};

/// Identifies an asset created on the ledger.
#[derive(
  Debug,
  Copy,
  Clone,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Serialize,
  Deserialize,
)]
pub struct AssetId(pub u64);

impl Display for AssetId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "asset({})", self.0)
  }
}

/// Asset-level parameters set by the asset's controlling authority.
///
/// Predicates read these as derived facts; the NFT royalty contract for
/// example requires its asset to be default-frozen with a single authority
/// acting as manager, freeze and clawback at once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetParams {
  pub manager: Address,
  pub freeze: Address,
  pub clawback: Address,
  pub default_frozen: bool,
  pub decimals: u32,
  pub total: u64,
}

/// One account's position in one asset.
///
/// A holding exists only after the account opted into the asset; an absent
/// holding is an explicit "no value", never a zero balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetHolding {
  pub amount: u64,
  pub frozen: bool,
}
