use {
  crate::Address,
  serde::{Deserialize, Serialize},
};

/// The only two value kinds storable in global and local contract state,
/// and the only kinds a predicate expression can produce.
///
/// Addresses travel as 32-byte [`Value::Bytes`]; counts, ids, timestamps
/// and amounts as unsigned 64-bit [`Value::Uint`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Value {
  Uint(u64),
  Bytes(Vec<u8>),
}

impl Value {
  pub fn as_uint(&self) -> Option<u64> {
    match self {
      Self::Uint(v) => Some(*v),
      Self::Bytes(_) => None,
    }
  }

  pub fn as_bytes(&self) -> Option<&[u8]> {
    match self {
      Self::Uint(_) => None,
      Self::Bytes(b) => Some(b),
    }
  }

  pub fn as_address(&self) -> Option<Address> {
    self.as_bytes().and_then(|b| Address::try_from(b).ok())
  }

  pub fn is_uint(&self) -> bool {
    matches!(self, Self::Uint(_))
  }
}

impl From<u64> for Value {
  fn from(v: u64) -> Self {
    Self::Uint(v)
  }
}

impl From<Vec<u8>> for Value {
  fn from(b: Vec<u8>) -> Self {
    Self::Bytes(b)
  }
}

impl From<Address> for Value {
  fn from(a: Address) -> Self {
    Self::Bytes(a.as_ref().to_vec())
  }
}

/// Encodes a u64 as the 8-byte big-endian application argument format.
pub fn uint_to_bytes(v: u64) -> Vec<u8> {
  v.to_be_bytes().to_vec()
}

/// Decodes a big-endian unsigned integer from an application argument.
///
/// Arguments shorter than 8 bytes are zero-extended on the left; longer
/// arguments do not fit a u64 and yield `None`.
pub fn uint_from_bytes(bytes: &[u8]) -> Option<u64> {
  if bytes.len() > 8 {
    return None;
  }
  let mut buf = [0u8; 8];
  buf[8 - bytes.len()..].copy_from_slice(bytes);
  Some(u64::from_be_bytes(buf))
}
