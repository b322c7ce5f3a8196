use {
  crate::{Address, Effect, Predicate, ToBase58String},
  multihash::{Multihash, MultihashDigest},
  serde::{Deserialize, Serialize},
  std::{
    collections::BTreeMap,
    fmt::{self, Debug, Display},
  },
};

/// Identifies an application instance on the ledger.
///
/// Ids are assigned sequentially at creation; id zero never identifies an
/// instance — an application call targeting it is a creation call.
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
pub struct AppId(pub u64);

impl AppId {
  pub const CREATE: AppId = AppId(0);

  /// The application's custody account.
  ///
  /// Derived off-curve from the id, so the mapping is stable and no private
  /// key for the account can exist. Effects move funds from this account.
  pub fn custody(&self) -> Address {
    Address::ZERO.derive(&[b"app-custody", &self.0.to_be_bytes()])
  }
}

impl Display for AppId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "app({})", self.0)
  }
}

/// Content identifier of a compiled application definition.
///
/// Produced by the artifact registry from the canonical encoding of an
/// [`Application`]; creation and update calls reference definitions by this
/// id rather than carrying them inline.
#[derive(
  Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct ArtifactId(Multihash);

impl ArtifactId {
  /// Content id of an encoded definition: its SHA3-256 multihash.
  pub fn of(encoded: &[u8]) -> Self {
    Self(multihash::Code::Sha3_256.digest(encoded))
  }
}

impl Debug for ArtifactId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "artifact({})", self.0.to_b58())
  }
}

impl Display for ArtifactId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0.to_b58())
  }
}

/// Maximum distinct key counts per value kind, fixed at creation.
///
/// A write that would exceed these is a contract logic error, reported
/// distinctly from predicate rejection.
#[derive(
  Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize,
)]
pub struct StateSchema {
  pub uints: u64,
  pub byte_slices: u64,
}

impl StateSchema {
  pub fn new(uints: u64, byte_slices: u64) -> Self {
    Self { uints, byte_slices }
  }
}

/// One live application recorded on the ledger.
///
/// The definition itself lives in the artifact registry; the instance pins
/// the artifact, the creator, the derived custody account, and the schemas,
/// which stay fixed even if an approved update swaps the artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppInstance {
  pub id: AppId,
  pub creator: Address,
  pub artifact: ArtifactId,
  pub custody: Address,
  pub global_schema: StateSchema,
  pub local_schema: StateSchema,
}

/// A predicate guarding one lifecycle transition, plus the effects emitted
/// when it approves.
///
/// Effects execute in declared order as part of the same atomic commit; a
/// failing effect rolls the whole group back exactly like a failing
/// predicate term.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Handler {
  pub predicate: Predicate,
  pub effects: Vec<Effect>,
}

impl Handler {
  pub fn new(predicate: Predicate, effects: Vec<Effect>) -> Self {
    Self { predicate, effects }
  }

  /// A handler that approves unconditionally and emits nothing.
  pub fn approve() -> Self {
    Self {
      predicate: Predicate::always(),
      effects: vec![],
    }
  }
}

/// Routing decision for one call-completion type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Route {
  Allow(Handler),
  Reject,
}

/// Routing for ordinary (no-op completion) calls.
///
/// `ByTag` is a closed dispatch table keyed by the leading application
/// argument; a call whose tag is absent from the table is rejected, there
/// is no fallthrough.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum NoOpRoute {
  Single(Handler),
  ByTag(BTreeMap<Vec<u8>, Handler>),
}

/// A complete contract definition: schemas plus one routing entry per
/// lifecycle transition.
///
/// `reject_when` is an optional guard evaluated before any routing; if it
/// holds the call is rejected outright. Contracts use it for fee caps and
/// rekey bans that apply to every entrypoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Application {
  pub global_schema: StateSchema,
  pub local_schema: StateSchema,
  pub reject_when: Option<Predicate>,
  pub on_create: Handler,
  pub on_opt_in: Route,
  pub on_no_op: NoOpRoute,
  pub on_close_out: Route,
  pub on_clear_state: Route,
  pub on_update: Route,
  pub on_delete: Route,
}
