use multihash::Multihash;

/// Base58 rendering for content identifiers and raw byte strings, used by
/// `Debug`/`Display` implementations across the workspace.
pub trait ToBase58String {
  fn to_b58(&self) -> String;
}

impl ToBase58String for Multihash {
  fn to_b58(&self) -> String {
    bs58::encode(self.to_bytes()).into_string()
  }
}

impl ToBase58String for [u8] {
  fn to_b58(&self) -> String {
    bs58::encode(self).into_string()
  }
}
