use {
  crate::state::{State, StateDiff},
  covenant_primitives::{
    Address,
    AppId,
    AppInstance,
    AssetHolding,
    AssetId,
    AssetParams,
    StateSchema,
    Transaction,
    TxKind,
    Value,
  },
  std::collections::BTreeMap,
  thiserror::Error,
};

/// Why a proposed or emitted transfer could not be applied.
///
/// Any of these anywhere in a group rolls the whole group back; there is no
/// partial-success state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransferError {
  #[error("insufficient funds in account {0}")]
  Underfunded(Address),

  #[error("balance of account {0} would overflow")]
  BalanceOverflow(Address),

  #[error("account {0} holds no position in {1}")]
  NotOptedIn(Address, AssetId),

  #[error("holding of {1} is frozen for account {0}")]
  Frozen(Address, AssetId),

  #[error("account {0} is not the clawback authority of {1}")]
  NotClawback(Address, AssetId),

  #[error("account {0} is not the manager of {1}")]
  NotManager(Address, AssetId),

  #[error("referenced asset {0} does not exist")]
  UnknownAsset(AssetId),

  #[error("account {0} has no local state for {1}")]
  NoLocalState(Address, AppId),

  #[error("account {0} already opted into {1}")]
  AlreadyOptedIn(Address, AppId),

  #[error("an effect referenced a value that does not exist")]
  MissingValue,
}

/// Which state scope a write overflowed.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum StateScope {
  Global,
  Local,
}

/// Working view of the ledger while one group is being evaluated.
///
/// Balance and holding reads see earlier transactions of the same group
/// (a payment at index 0 funds an effect emitted at index 3); key/value
/// state reads do NOT go through here — predicates read the pristine
/// snapshot, so no handler observes another handler's uncommitted writes.
/// Consuming the overlay yields the staged [`StateDiff`] for the caller to
/// commit, or nothing at all if any step failed.
pub(crate) struct Overlay<'a, S: State> {
  base: &'a S,
  diff: StateDiff,
}

impl<'a, S: State> Overlay<'a, S> {
  pub fn new(base: &'a S) -> Self {
    Self {
      base,
      diff: StateDiff::default(),
    }
  }

  pub fn into_diff(self) -> StateDiff {
    self.diff
  }

  pub fn balance(&self, account: &Address) -> u64 {
    self
      .diff
      .balance(account)
      .unwrap_or_else(|| self.base.balance(account))
  }

  pub fn holding(
    &self,
    account: &Address,
    asset: AssetId,
  ) -> Option<AssetHolding> {
    match self.diff.holding(account, asset) {
      Some(staged) => staged.cloned(),
      None => self.base.holding(account, asset),
    }
  }

  pub fn asset(&self, asset: AssetId) -> Option<AssetParams> {
    match self.diff.asset(asset) {
      Some(staged) => staged.cloned(),
      None => self.base.asset(asset),
    }
  }

  pub fn app(&self, app: AppId) -> Option<AppInstance> {
    match self.diff.app(app) {
      Some(staged) => staged.cloned(),
      None => self.base.app(app),
    }
  }

  pub fn opted_in(&self, account: &Address, app: AppId) -> bool {
    self
      .diff
      .opted_in(account, app)
      .unwrap_or_else(|| self.base.opted_in(account, app))
  }

  pub fn credit(
    &mut self,
    account: &Address,
    amount: u64,
  ) -> Result<(), TransferError> {
    let balance = self
      .balance(account)
      .checked_add(amount)
      .ok_or(TransferError::BalanceOverflow(*account))?;
    self.diff.set_balance(*account, balance);
    Ok(())
  }

  pub fn debit(
    &mut self,
    account: &Address,
    amount: u64,
  ) -> Result<(), TransferError> {
    let balance = self
      .balance(account)
      .checked_sub(amount)
      .ok_or(TransferError::Underfunded(*account))?;
    self.diff.set_balance(*account, balance);
    Ok(())
  }

  pub fn set_holding(
    &mut self,
    account: &Address,
    asset: AssetId,
    holding: AssetHolding,
  ) {
    self.diff.set_holding(*account, asset, holding);
  }

  pub fn close_holding(&mut self, account: &Address, asset: AssetId) {
    self.diff.close_holding(*account, asset);
  }

  pub fn create_app(&mut self, instance: AppInstance) {
    self.diff.set_app(instance);
  }

  pub fn delete_app(&mut self, app: AppId) {
    self.diff.delete_app(app);
  }

  pub fn opt_in_app(
    &mut self,
    account: &Address,
    app: AppId,
  ) -> Result<(), TransferError> {
    if self.opted_in(account, app) {
      return Err(TransferError::AlreadyOptedIn(*account, app));
    }
    self.diff.opt_in(*account, app);
    Ok(())
  }

  pub fn opt_out_app(
    &mut self,
    account: &Address,
    app: AppId,
  ) -> Result<(), TransferError> {
    if !self.opted_in(account, app) {
      return Err(TransferError::NoLocalState(*account, app));
    }
    self.diff.opt_out(*account, app);
    Ok(())
  }

  /// Stages a global write, enforcing the key-count schema fixed at
  /// creation over the merged view of committed and staged keys.
  pub fn global_put(
    &mut self,
    instance: &AppInstance,
    key: Vec<u8>,
    value: Value,
  ) -> Result<(), StateScope> {
    let mut merged = self.base.globals(instance.id);
    self.diff.merge_staged_globals(instance.id, &mut merged);
    merged.insert(key.clone(), value.clone());
    check_schema(&merged, &instance.global_schema, StateScope::Global)?;
    self.diff.set_global(instance.id, key, value);
    Ok(())
  }

  /// Stages a local write for an opted-in account, schema-checked the same
  /// way as globals.
  pub fn local_put(
    &mut self,
    instance: &AppInstance,
    account: &Address,
    key: Vec<u8>,
    value: Value,
  ) -> Result<(), LocalPutError> {
    if !self.opted_in(account, instance.id) {
      return Err(LocalPutError::NotOptedIn(TransferError::NoLocalState(
        *account,
        instance.id,
      )));
    }
    let mut merged = self
      .base
      .locals(account, instance.id)
      .unwrap_or_default();
    self.diff.merge_staged_locals(account, instance.id, &mut merged);
    merged.insert(key.clone(), value.clone());
    check_schema(&merged, &instance.local_schema, StateScope::Local)
      .map_err(LocalPutError::Capacity)?;
    self.diff.set_local(*account, instance.id, key, value);
    Ok(())
  }

  /// Applies a native (non-application-call) transaction to the working
  /// view, validating it under the ledger's transfer rules.
  pub fn apply_native(
    &mut self,
    txn: &Transaction,
  ) -> Result<(), TransferError> {
    match &txn.kind {
      TxKind::Payment {
        receiver,
        amount,
        close_remainder_to,
      } => {
        self.debit(&txn.sender, *amount)?;
        self.credit(receiver, *amount)?;
        if !close_remainder_to.is_zero() {
          let rest = self.balance(&txn.sender);
          self.debit(&txn.sender, rest)?;
          self.credit(close_remainder_to, rest)?;
        }
        Ok(())
      }
      TxKind::AssetTransfer {
        asset,
        amount,
        receiver,
        close_to,
        revocation_target,
      } => self.apply_asset_transfer(
        txn.sender,
        *asset,
        *amount,
        *receiver,
        *close_to,
        *revocation_target,
      ),
      TxKind::AssetConfig { asset, params } => {
        let current = self
          .asset(*asset)
          .ok_or(TransferError::UnknownAsset(*asset))?;
        if txn.sender != current.manager {
          return Err(TransferError::NotManager(txn.sender, *asset));
        }
        self.diff.set_asset(*asset, params.clone());
        Ok(())
      }
      TxKind::AssetDestroy { asset } => {
        let current = self
          .asset(*asset)
          .ok_or(TransferError::UnknownAsset(*asset))?;
        if txn.sender != current.manager {
          return Err(TransferError::NotManager(txn.sender, *asset));
        }
        self.diff.destroy_asset(*asset);
        Ok(())
      }
      TxKind::ApplicationCall { .. } => Ok(()), // routed by the executor
    }
  }

  /// Moves asset units between holdings from any sending account. The
  /// effect emitter reuses this with the custody account as sender.
  pub fn move_asset(
    &mut self,
    sender: &Address,
    asset: AssetId,
    amount: u64,
    receiver: &Address,
  ) -> Result<(), TransferError> {
    let from = self
      .holding(sender, asset)
      .ok_or(TransferError::NotOptedIn(*sender, asset))?;
    let to = self
      .holding(receiver, asset)
      .ok_or(TransferError::NotOptedIn(*receiver, asset))?;
    if sender == receiver {
      // both positions validated, nothing moves
      return Ok(());
    }
    let debited = from
      .amount
      .checked_sub(amount)
      .ok_or(TransferError::Underfunded(*sender))?;
    let credited = to
      .amount
      .checked_add(amount)
      .ok_or(TransferError::BalanceOverflow(*receiver))?;
    self.set_holding(sender, asset, AssetHolding {
      amount: debited,
      ..from
    });
    self.set_holding(receiver, asset, AssetHolding {
      amount: credited,
      ..to
    });
    Ok(())
  }

  fn apply_asset_transfer(
    &mut self,
    sender: Address,
    asset: AssetId,
    amount: u64,
    receiver: Address,
    close_to: Address,
    revocation_target: Address,
  ) -> Result<(), TransferError> {
    let params = self
      .asset(asset)
      .ok_or(TransferError::UnknownAsset(asset))?;

    // clawback transfer: debits the revocation target and overrides
    // freezes, but only the clawback authority may send it
    if !revocation_target.is_zero() {
      if sender != params.clawback || params.clawback.is_zero() {
        return Err(TransferError::NotClawback(sender, asset));
      }
      return self.move_asset(&revocation_target, asset, amount, &receiver);
    }

    // zero-amount self transfer opts the sender into the asset
    if amount == 0 && receiver == sender {
      if self.holding(&sender, asset).is_none() {
        self.set_holding(&sender, asset, AssetHolding {
          amount: 0,
          frozen: params.default_frozen,
        });
      }
      return self.close_asset_remainder(sender, asset, close_to);
    }

    let from = self
      .holding(&sender, asset)
      .ok_or(TransferError::NotOptedIn(sender, asset))?;
    if from.frozen {
      return Err(TransferError::Frozen(sender, asset));
    }
    if let Some(to) = self.holding(&receiver, asset) {
      if to.frozen {
        return Err(TransferError::Frozen(receiver, asset));
      }
    }
    self.move_asset(&sender, asset, amount, &receiver)?;
    self.close_asset_remainder(sender, asset, close_to)
  }

  fn close_asset_remainder(
    &mut self,
    sender: Address,
    asset: AssetId,
    close_to: Address,
  ) -> Result<(), TransferError> {
    if close_to.is_zero() {
      return Ok(());
    }
    let remaining = self
      .holding(&sender, asset)
      .ok_or(TransferError::NotOptedIn(sender, asset))?
      .amount;
    if remaining > 0 {
      self.move_asset(&sender, asset, remaining, &close_to)?;
    }
    self.close_holding(&sender, asset);
    Ok(())
  }
}

/// A local write can fail two ways; the router maps each to its own
/// top-level error.
#[derive(Debug)]
pub(crate) enum LocalPutError {
  Capacity(StateScope),
  NotOptedIn(TransferError),
}

fn check_schema(
  merged: &BTreeMap<Vec<u8>, Value>,
  schema: &StateSchema,
  scope: StateScope,
) -> Result<(), StateScope> {
  let uints = merged.values().filter(|v| v.is_uint()).count() as u64;
  let bytes = merged.len() as u64 - uints;
  if uints > schema.uints || bytes > schema.byte_slices {
    return Err(scope);
  }
  Ok(())
}
