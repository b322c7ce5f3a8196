use {
  covenant_primitives::{
    Address,
    AppId,
    AppInstance,
    AssetHolding,
    AssetId,
    AssetParams,
    Value,
  },
  serde::{Deserialize, Serialize},
  std::collections::{BTreeMap, BTreeSet, HashMap},
};

/// A snapshot view of ledger state plus the single commit point.
///
/// Predicates and effects only ever read through this trait; the sole
/// mutation path is [`State::apply`] with a [`StateDiff`] produced by an
/// approved group, which keeps the single-writer discipline: either every
/// write of a group lands or none do.
///
/// State is always resolved by key. The `globals`/`locals` views are
/// key-ordered maps; nothing in the engine depends on insertion order.
pub trait State {
  fn global(&self, app: AppId, key: &[u8]) -> Option<Value>;
  fn globals(&self, app: AppId) -> BTreeMap<Vec<u8>, Value>;
  fn local(&self, account: &Address, app: AppId, key: &[u8])
    -> Option<Value>;
  fn locals(
    &self,
    account: &Address,
    app: AppId,
  ) -> Option<BTreeMap<Vec<u8>, Value>>;
  fn balance(&self, account: &Address) -> u64;
  fn holding(
    &self,
    account: &Address,
    asset: AssetId,
  ) -> Option<AssetHolding>;
  fn asset(&self, asset: AssetId) -> Option<AssetParams>;
  fn app(&self, app: AppId) -> Option<AppInstance>;
  fn next_app_id(&self) -> AppId;
  fn apply(&mut self, diff: StateDiff);

  /// An account is opted into an application iff its local state map for
  /// that application exists, even when the map holds no keys yet.
  fn opted_in(&self, account: &Address, app: AppId) -> bool {
    self.locals(account, app).is_some()
  }
}

/// The staged outcome of one approved transaction group.
///
/// All writes a group performs are accumulated here and become visible only
/// after [`State::apply`] commits them as one atomic batch. Balance entries
/// are absolute post-group values, key/value entries are upserts, and the
/// delete sets erase whole scopes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StateDiff {
  globals: BTreeMap<(AppId, Vec<u8>), Value>,
  local_writes: BTreeMap<(Address, AppId, Vec<u8>), Value>,
  opt_ins: BTreeSet<(Address, AppId)>,
  opt_outs: BTreeSet<(Address, AppId)>,
  balances: BTreeMap<Address, u64>,
  holdings: BTreeMap<(Address, AssetId), AssetHolding>,
  closed_holdings: BTreeSet<(Address, AssetId)>,
  assets: BTreeMap<AssetId, AssetParams>,
  destroyed_assets: BTreeSet<AssetId>,
  apps: BTreeMap<AppId, AppInstance>,
  deleted_apps: BTreeSet<AppId>,
}

impl StateDiff {
  pub fn set_global(&mut self, app: AppId, key: Vec<u8>, value: Value) {
    self.globals.insert((app, key), value);
  }

  pub fn set_local(
    &mut self,
    account: Address,
    app: AppId,
    key: Vec<u8>,
    value: Value,
  ) {
    self.local_writes.insert((account, app, key), value);
  }

  pub fn opt_in(&mut self, account: Address, app: AppId) {
    self.opt_outs.remove(&(account, app));
    self.opt_ins.insert((account, app));
  }

  pub fn opt_out(&mut self, account: Address, app: AppId) {
    self.opt_ins.remove(&(account, app));
    self
      .local_writes
      .retain(|(acc, a, _), _| !(*acc == account && *a == app));
    self.opt_outs.insert((account, app));
  }

  pub fn set_balance(&mut self, account: Address, amount: u64) {
    self.balances.insert(account, amount);
  }

  pub fn set_holding(
    &mut self,
    account: Address,
    asset: AssetId,
    holding: AssetHolding,
  ) {
    self.closed_holdings.remove(&(account, asset));
    self.holdings.insert((account, asset), holding);
  }

  pub fn close_holding(&mut self, account: Address, asset: AssetId) {
    self.holdings.remove(&(account, asset));
    self.closed_holdings.insert((account, asset));
  }

  pub fn set_asset(&mut self, asset: AssetId, params: AssetParams) {
    self.destroyed_assets.remove(&asset);
    self.assets.insert(asset, params);
  }

  pub fn destroy_asset(&mut self, asset: AssetId) {
    self.assets.remove(&asset);
    self.destroyed_assets.insert(asset);
  }

  pub fn set_app(&mut self, instance: AppInstance) {
    self.deleted_apps.remove(&instance.id);
    self.apps.insert(instance.id, instance);
  }

  pub fn delete_app(&mut self, app: AppId) {
    self.apps.remove(&app);
    self.globals.retain(|(a, _), _| *a != app);
    self.deleted_apps.insert(app);
  }

  /// Overlays this diff's staged global writes for one application onto a
  /// key/value view, for schema accounting.
  pub(crate) fn merge_staged_globals(
    &self,
    app: AppId,
    into: &mut BTreeMap<Vec<u8>, Value>,
  ) {
    for ((a, key), value) in &self.globals {
      if *a == app {
        into.insert(key.clone(), value.clone());
      }
    }
  }

  /// Overlays this diff's staged local writes for one (account, app) scope
  /// onto a key/value view, for schema accounting.
  pub(crate) fn merge_staged_locals(
    &self,
    account: &Address,
    app: AppId,
    into: &mut BTreeMap<Vec<u8>, Value>,
  ) {
    for ((acc, a, key), value) in &self.local_writes {
      if acc == account && *a == app {
        into.insert(key.clone(), value.clone());
      }
    }
  }

  pub(crate) fn opted_in(&self, account: &Address, app: AppId) -> Option<bool> {
    if self.opt_ins.contains(&(*account, app)) {
      Some(true)
    } else if self.opt_outs.contains(&(*account, app)) {
      Some(false)
    } else {
      None
    }
  }

  pub(crate) fn balance(&self, account: &Address) -> Option<u64> {
    self.balances.get(account).copied()
  }

  pub(crate) fn holding(
    &self,
    account: &Address,
    asset: AssetId,
  ) -> Option<Option<&AssetHolding>> {
    if self.closed_holdings.contains(&(*account, asset)) {
      return Some(None);
    }
    self.holdings.get(&(*account, asset)).map(Some)
  }

  pub(crate) fn asset(&self, asset: AssetId) -> Option<Option<&AssetParams>> {
    if self.destroyed_assets.contains(&asset) {
      return Some(None);
    }
    self.assets.get(&asset).map(Some)
  }

  pub(crate) fn app(&self, app: AppId) -> Option<Option<&AppInstance>> {
    if self.deleted_apps.contains(&app) {
      return Some(None);
    }
    self.apps.get(&app).map(Some)
  }
}

/// Reference in-memory implementation of [`State`], used by the scenario
/// tests and by embedders that materialize snapshots from elsewhere.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InMemoryLedger {
  balances: HashMap<Address, u64>,
  holdings: HashMap<(Address, AssetId), AssetHolding>,
  assets: HashMap<AssetId, AssetParams>,
  apps: HashMap<AppId, AppInstance>,
  globals: HashMap<AppId, BTreeMap<Vec<u8>, Value>>,
  locals: HashMap<(Address, AppId), BTreeMap<Vec<u8>, Value>>,
  next_app: u64,
}

impl State for InMemoryLedger {
  fn global(&self, app: AppId, key: &[u8]) -> Option<Value> {
    self.globals.get(&app).and_then(|kv| kv.get(key)).cloned()
  }

  fn globals(&self, app: AppId) -> BTreeMap<Vec<u8>, Value> {
    self.globals.get(&app).cloned().unwrap_or_default()
  }

  fn local(
    &self,
    account: &Address,
    app: AppId,
    key: &[u8],
  ) -> Option<Value> {
    self
      .locals
      .get(&(*account, app))
      .and_then(|kv| kv.get(key))
      .cloned()
  }

  fn locals(
    &self,
    account: &Address,
    app: AppId,
  ) -> Option<BTreeMap<Vec<u8>, Value>> {
    self.locals.get(&(*account, app)).cloned()
  }

  fn balance(&self, account: &Address) -> u64 {
    self.balances.get(account).copied().unwrap_or(0)
  }

  fn holding(
    &self,
    account: &Address,
    asset: AssetId,
  ) -> Option<AssetHolding> {
    self.holdings.get(&(*account, asset)).cloned()
  }

  fn asset(&self, asset: AssetId) -> Option<AssetParams> {
    self.assets.get(&asset).cloned()
  }

  fn app(&self, app: AppId) -> Option<AppInstance> {
    self.apps.get(&app).cloned()
  }

  fn next_app_id(&self) -> AppId {
    AppId(self.next_app.max(1))
  }

  fn apply(&mut self, diff: StateDiff) {
    for (account, app) in diff.opt_outs {
      self.locals.remove(&(account, app));
    }
    for (account, app) in diff.opt_ins {
      self.locals.entry((account, app)).or_default();
    }
    for ((account, app, key), value) in diff.local_writes {
      self
        .locals
        .entry((account, app))
        .or_default()
        .insert(key, value);
    }

    for app in diff.deleted_apps {
      self.apps.remove(&app);
      self.globals.remove(&app);
    }
    for (id, instance) in diff.apps {
      self.next_app = self.next_app.max(id.0 + 1);
      self.apps.insert(id, instance);
    }
    for ((app, key), value) in diff.globals {
      self.globals.entry(app).or_default().insert(key, value);
    }

    for asset in diff.destroyed_assets {
      self.assets.remove(&asset);
    }
    for (id, params) in diff.assets {
      self.assets.insert(id, params);
    }
    for key in diff.closed_holdings {
      self.holdings.remove(&key);
    }
    for (key, holding) in diff.holdings {
      self.holdings.insert(key, holding);
    }
    for (account, amount) in diff.balances {
      self.balances.insert(account, amount);
    }
  }
}

#[cfg(test)]
mod tests {
  use {
    super::{InMemoryLedger, State, StateDiff},
    covenant_primitives::{Address, AppId, AssetHolding, AssetId, Value},
  };

  #[test]
  fn statediff_smoke() {
    let alice = Address::new([1; 32]);
    let app = AppId(7);
    let asset = AssetId(40);

    let mut store = InMemoryLedger::default();

    let mut genesis = StateDiff::default();
    genesis.set_balance(alice, 1_000_000);
    genesis.set_holding(alice, asset, AssetHolding {
      amount: 500,
      frozen: false,
    });
    genesis.set_global(app, b"unlock_time".to_vec(), Value::Uint(1234));
    store.apply(genesis);

    assert_eq!(store.balance(&alice), 1_000_000);
    assert_eq!(store.holding(&alice, asset).unwrap().amount, 500);
    assert_eq!(
      store.global(app, b"unlock_time"),
      Some(Value::Uint(1234))
    );
    assert_eq!(store.global(app, b"missing"), None);
    assert!(!store.opted_in(&alice, app));

    let mut diff = StateDiff::default();
    diff.opt_in(alice, app);
    diff.set_local(alice, app, b"last_claim_time".to_vec(), Value::Uint(9));
    diff.close_holding(alice, asset);
    store.apply(diff);

    assert!(store.opted_in(&alice, app));
    assert_eq!(
      store.local(&alice, app, b"last_claim_time"),
      Some(Value::Uint(9))
    );
    assert!(store.holding(&alice, asset).is_none());

    let mut diff = StateDiff::default();
    diff.opt_out(alice, app);
    store.apply(diff);
    assert!(!store.opted_in(&alice, app));
    assert_eq!(store.local(&alice, app, b"last_claim_time"), None);
  }

  #[test]
  fn opt_out_discards_pending_writes() {
    let alice = Address::new([1; 32]);
    let app = AppId(1);

    let mut diff = StateDiff::default();
    diff.opt_in(alice, app);
    diff.set_local(alice, app, b"k".to_vec(), Value::Uint(1));
    diff.opt_out(alice, app);

    let mut store = InMemoryLedger::default();
    store.apply(diff);
    assert!(!store.opted_in(&alice, app));
    assert_eq!(store.local(&alice, app, b"k"), None);
  }

  #[test]
  fn app_delete_erases_globals() {
    let app = AppId(3);
    let mut store = InMemoryLedger::default();

    let mut genesis = StateDiff::default();
    genesis.set_global(app, b"owner".to_vec(), Value::Bytes(vec![5; 32]));
    store.apply(genesis);
    assert!(store.global(app, b"owner").is_some());

    let mut diff = StateDiff::default();
    diff.delete_app(app);
    store.apply(diff);
    assert!(store.global(app, b"owner").is_none());
    assert!(store.globals(app).is_empty());
  }
}
