use {
  curve25519_dalek::edwards::CompressedEdwardsY,
  ed25519_dalek::PublicKey,
  multihash::{Hasher, Sha3_256},
  serde::{Deserialize, Serialize},
  std::{
    fmt::{Debug, Display},
    ops::Deref,
    str::FromStr,
  },
};

/// Represents an account on the ledger.
///
/// The same address could either identify a user wallet that has a
/// corresponding private key on the ed25519 curve (externally owned), or a
/// custody account controlled by an application. Custody addresses are
/// derived off-curve, so no private key exists for them and the only way to
/// move their funds is through an approved effect of the owning application.
#[derive(
  Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Address([u8; 32]);

impl Address {
  /// The all-zeroes address.
  ///
  /// Optional transaction fields (rekey-to, the close-to addresses) encode
  /// "unset" as this value, so predicates can compare against it directly.
  pub const ZERO: Address = Address([0u8; 32]);

  pub fn new(bytes: [u8; 32]) -> Self {
    Self(bytes)
  }

  /// Given a list of seeds this method will generate a new derived address
  /// that is not on the Ed25519 curve (no private key exists for the
  /// resulting address).
  ///
  /// Application custody accounts are derived this way from the app id, so
  /// the same id always maps to the same custody address and nobody can
  /// ever sign for it.
  pub fn derive(&self, seeds: &[&[u8]]) -> Self {
    let mut bump: u64 = 0;
    loop {
      let mut hasher = Sha3_256::default();
      hasher.update(&self.0);
      for seed in seeds.iter() {
        hasher.update(seed);
      }
      hasher.update(&bump.to_le_bytes());
      let key = Address(hasher.finalize().try_into().expect("sha3 is 32 bytes"));
      if !key.has_private_key() {
        return key;
      } else {
        bump += 1;
      }
    }
  }

  pub fn is_zero(&self) -> bool {
    *self == Self::ZERO
  }

  /// Checks if the given address lies on the Ed25519 elliptic curve.
  ///
  /// When true, there exists a private key that together with this address
  /// makes up a valid Ed25519 keypair. Derived custody addresses must never
  /// satisfy this.
  fn has_private_key(&self) -> bool {
    CompressedEdwardsY::from_slice(&self.0)
      .decompress()
      .is_some()
  }
}

impl AsRef<[u8]> for Address {
  fn as_ref(&self) -> &[u8] {
    &self.0
  }
}

impl Deref for Address {
  type Target = [u8];

  fn deref(&self) -> &Self::Target {
    &self.0
  }
}

impl Display for Address {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", bs58::encode(self.0).into_string())
  }
}

impl Debug for Address {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "address({})", bs58::encode(self.0).into_string())
  }
}

impl From<Address> for String {
  fn from(addr: Address) -> Self {
    bs58::encode(addr.0).into_string()
  }
}

impl FromStr for Address {
  type Err = bs58::decode::Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let mut bytes = [0u8; 32];
    bs58::decode(s).into(&mut bytes)?;
    Ok(Self(bytes))
  }
}

impl TryFrom<&[u8]> for Address {
  type Error = std::array::TryFromSliceError;

  fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
    Ok(Self(value.try_into()?))
  }
}

impl From<PublicKey> for Address {
  fn from(p: PublicKey) -> Self {
    Self(p.to_bytes())
  }
}

#[cfg(test)]
mod tests {
  use super::Address;

  #[test]
  fn derived_addresses_are_off_curve_and_stable() {
    let base = Address::new([7u8; 32]);
    let one = base.derive(&[b"custody", &1u64.to_be_bytes()]);
    let two = base.derive(&[b"custody", &1u64.to_be_bytes()]);
    let other = base.derive(&[b"custody", &2u64.to_be_bytes()]);

    assert_eq!(one, two);
    assert_ne!(one, other);
    assert!(!one.has_private_key());
  }

  #[test]
  fn b58_roundtrip() {
    let addr = Address::new([42u8; 32]);
    let encoded = addr.to_string();
    assert_eq!(encoded.parse::<Address>().unwrap(), addr);
  }
}
