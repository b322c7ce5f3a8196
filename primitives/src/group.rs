use {
  crate::{ToBase58String, Transaction},
  multihash::{Multihash, MultihashDigest},
  once_cell::sync::OnceCell,
  serde::{Deserialize, Serialize},
  std::fmt::Debug,
  thiserror::Error,
};

#[derive(Debug, Clone, Error)]
pub enum Error {
  #[error("a transaction group must contain at least one transaction")]
  Empty,

  #[error(
    "a transaction group holds at most {} transactions, got {0}",
    TransactionGroup::MAX_SIZE
  )]
  TooLarge(usize),
}

/// An ordered, immutable sequence of transactions submitted together.
///
/// The group commits or fails as one unit. The group id is the SHA3-256
/// hash of the encoded transactions; it and each transaction's index are
/// fixed once the group is constructed, so predicates may reference any
/// sibling transaction by its position.
#[derive(Clone, Serialize, Deserialize)]
pub struct TransactionGroup {
  transactions: Vec<Transaction>,

  #[serde(skip)]
  id_cache: OnceCell<Multihash>,
}

impl TransactionGroup {
  pub const MAX_SIZE: usize = 16;

  pub fn new(transactions: Vec<Transaction>) -> Result<Self, Error> {
    if transactions.is_empty() {
      return Err(Error::Empty);
    }
    if transactions.len() > Self::MAX_SIZE {
      return Err(Error::TooLarge(transactions.len()));
    }
    Ok(Self {
      transactions,
      id_cache: OnceCell::new(),
    })
  }

  /// Group identifier shared by all member transactions.
  pub fn id(&self) -> &Multihash {
    self.id_cache.get_or_init(|| {
      let encoded = rmp_serde::to_vec(&self.transactions)
        .expect("transactions are always encodable");
      multihash::Code::Sha3_256.digest(&encoded)
    })
  }

  pub fn len(&self) -> usize {
    self.transactions.len()
  }

  pub fn is_empty(&self) -> bool {
    self.transactions.is_empty()
  }

  pub fn get(&self, index: usize) -> Option<&Transaction> {
    self.transactions.get(index)
  }

  pub fn iter(&self) -> impl Iterator<Item = &Transaction> {
    self.transactions.iter()
  }
}

impl Debug for TransactionGroup {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("TransactionGroup")
      .field("id", &self.id().to_b58())
      .field("transactions", &self.transactions)
      .finish()
  }
}

#[cfg(test)]
mod tests {
  use {
    super::TransactionGroup,
    crate::{Address, Transaction},
  };

  fn payment() -> Transaction {
    Transaction::payment(Address::new([1; 32]), Address::new([2; 32]), 10)
  }

  #[test]
  fn group_size_limits() {
    assert!(TransactionGroup::new(vec![]).is_err());
    assert!(TransactionGroup::new(vec![payment(); 16]).is_ok());
    assert!(TransactionGroup::new(vec![payment(); 17]).is_err());
  }

  #[test]
  fn group_id_is_deterministic() {
    let a = TransactionGroup::new(vec![payment(), payment()]).unwrap();
    let b = TransactionGroup::new(vec![payment(), payment()]).unwrap();
    assert_eq!(a.id(), b.id());

    let c = TransactionGroup::new(vec![payment()]).unwrap();
    assert_ne!(a.id(), c.id());
  }
}
