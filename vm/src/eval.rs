use {
  crate::State,
  covenant_primitives::{
    uint_from_bytes,
    Address,
    AppId,
    AssetId,
    AssetParamField,
    Context,
    Expr,
    Predicate,
    Slot,
    Term,
    Transaction,
    TransactionGroup,
    TxKind,
    TxnField,
    TxnKindTag,
    Value,
  },
  std::cmp::Ordering,
};

/// Why an expression could not produce a value.
///
/// Everything except `Math` makes the containing predicate evaluate to
/// false (fail-fast, never an implicit zero). `Math` means checked
/// arithmetic overflowed or divided by zero and must surface as a distinct
/// rejection so it is never silently folded.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum Fault {
  /// A state, holding or field lookup had no value.
  Missing,
  /// Operand kinds did not match the operation.
  Kind,
  /// A group slot reference was out of range.
  Slot,
  /// Checked arithmetic failed.
  Math,
}

/// The application whose handler is being evaluated, when there is one.
/// Logic-signature predicates evaluate without it.
#[derive(Debug, Clone)]
pub(crate) struct AppView {
  pub id: AppId,
  pub custody: Address,
  pub creator: Address,
}

/// Everything a predicate may observe: the group, the index of the
/// transaction being validated, a pristine state snapshot and the ambient
/// context. Evaluation never mutates any of it.
pub(crate) struct Env<'a, S: State> {
  pub group: &'a TransactionGroup,
  pub index: usize,
  pub state: &'a S,
  pub ctx: &'a Context,
  pub app: Option<AppView>,
}

impl<'a, S: State> Env<'a, S> {
  fn txn(&self, slot: Slot) -> Result<&'a Transaction, Fault> {
    let index = match slot {
      Slot::This => self.index,
      Slot::Index(i) => i,
      Slot::Last => self.group.len() - 1,
    };
    self.group.get(index).ok_or(Fault::Slot)
  }

  fn app(&self) -> Result<&AppView, Fault> {
    self.app.as_ref().ok_or(Fault::Missing)
  }

  fn this_args(&self) -> Result<&'a [Vec<u8>], Fault> {
    match &self.txn(Slot::This)?.kind {
      TxKind::ApplicationCall { args, .. } => Ok(args),
      _ => Err(Fault::Missing),
    }
  }
}

/// Evaluates a predicate tree against the environment.
///
/// Short-circuits left to right. All faults except arithmetic fail the
/// whole predicate: they propagate up through the tree (a `Not` never
/// inverts a fault) and fold to `Ok(false)` here. Arithmetic faults escape
/// as `Err(Fault::Math)` for the caller to report distinctly.
pub(crate) fn evaluate<S: State>(
  env: &Env<'_, S>,
  predicate: &Predicate,
) -> Result<bool, Fault> {
  match walk(env, predicate) {
    Ok(value) => Ok(value),
    Err(Fault::Math) => Err(Fault::Math),
    Err(_) => Ok(false),
  }
}

fn walk<S: State>(
  env: &Env<'_, S>,
  predicate: &Predicate,
) -> Result<bool, Fault> {
  match predicate {
    Predicate::Term(t) => term(env, t),
    Predicate::Not(p) => Ok(!walk(env, p)?),
    Predicate::And(a, b) => Ok(walk(env, a)? && walk(env, b)?),
    Predicate::Or(a, b) => Ok(walk(env, a)? || walk(env, b)?),
  }
}

fn term<S: State>(env: &Env<'_, S>, term: &Term) -> Result<bool, Fault> {
  match term {
    Term::Always => Ok(true),
    Term::Eq(a, b) => compare(env, a, b).map(|o| o == Ordering::Equal),
    Term::Ne(a, b) => compare(env, a, b).map(|o| o != Ordering::Equal),
    Term::Lt(a, b) => ordered(env, a, b).map(|o| o == Ordering::Less),
    Term::Le(a, b) => ordered(env, a, b).map(|o| o != Ordering::Greater),
    Term::Gt(a, b) => ordered(env, a, b).map(|o| o == Ordering::Greater),
    Term::Ge(a, b) => ordered(env, a, b).map(|o| o != Ordering::Less),
    Term::HasValue(e) => match expr(env, e) {
      Ok(_) => Ok(true),
      Err(Fault::Missing) => Ok(false),
      Err(fault) => Err(fault),
    },
    Term::KindIs(slot, tag) => {
      let txn = env.txn(*slot)?;
      Ok(matches!(
        (&txn.kind, tag),
        (TxKind::Payment { .. }, TxnKindTag::Payment)
          | (TxKind::AssetTransfer { .. }, TxnKindTag::AssetTransfer)
          | (TxKind::ApplicationCall { .. }, TxnKindTag::ApplicationCall)
          | (TxKind::AssetConfig { .. }, TxnKindTag::AssetConfig)
          | (TxKind::AssetDestroy { .. }, TxnKindTag::AssetDestroy)
      ))
    }
    Term::CompletionIs(slot, oc) => match &env.txn(*slot)?.kind {
      TxKind::ApplicationCall { on_completion, .. } => {
        Ok(on_completion == oc)
      }
      _ => Err(Fault::Missing),
    },
  }
}

/// Equality comparison across both value kinds; mismatched kinds are a
/// fault, not inequality.
fn compare<S: State>(
  env: &Env<'_, S>,
  a: &Expr,
  b: &Expr,
) -> Result<Ordering, Fault> {
  match (expr(env, a)?, expr(env, b)?) {
    (Value::Uint(x), Value::Uint(y)) => Ok(x.cmp(&y)),
    (Value::Bytes(x), Value::Bytes(y)) => Ok(x.cmp(&y)),
    _ => Err(Fault::Kind),
  }
}

/// Ordered comparison; uints only.
fn ordered<S: State>(
  env: &Env<'_, S>,
  a: &Expr,
  b: &Expr,
) -> Result<Ordering, Fault> {
  match (expr(env, a)?, expr(env, b)?) {
    (Value::Uint(x), Value::Uint(y)) => Ok(x.cmp(&y)),
    _ => Err(Fault::Kind),
  }
}

pub(crate) fn expr<S: State>(
  env: &Env<'_, S>,
  expr: &Expr,
) -> Result<Value, Fault> {
  Ok(match expr {
    Expr::Const(v) => v.clone(),
    Expr::GroupSize => Value::Uint(env.group.len() as u64),
    Expr::LatestTimestamp => Value::Uint(env.ctx.latest_timestamp),
    Expr::ZeroAddress => Address::ZERO.into(),
    Expr::CustodyAddress => env.app()?.custody.into(),
    Expr::CreatorAddress => env.app()?.creator.into(),
    Expr::CurrentAppId => Value::Uint(env.app()?.id.0),
    Expr::Txn(slot, field) => txn_field(env.txn(*slot)?, *field)?,
    Expr::Arg(i) => Value::Bytes(
      env.this_args()?.get(*i).ok_or(Fault::Missing)?.clone(),
    ),
    Expr::ArgUint(i) => Value::Uint(
      uint_from_bytes(env.this_args()?.get(*i).ok_or(Fault::Missing)?)
        .ok_or(Fault::Kind)?,
    ),
    Expr::Global(key) => {
      env.state.global(env.app()?.id, key).ok_or(Fault::Missing)?
    }
    Expr::Local(account, key) => {
      let account = address(env, account)?;
      env
        .state
        .local(&account, env.app()?.id, key)
        .ok_or(Fault::Missing)?
    }
    Expr::Balance(account) => {
      Value::Uint(env.state.balance(&address(env, account)?))
    }
    Expr::AssetBalance(account, asset) => {
      let account = address(env, account)?;
      let asset = asset_id(env, asset)?;
      Value::Uint(
        env
          .state
          .holding(&account, asset)
          .ok_or(Fault::Missing)?
          .amount,
      )
    }
    Expr::AssetParam(asset, field) => {
      let params = env
        .state
        .asset(asset_id(env, asset)?)
        .ok_or(Fault::Missing)?;
      match field {
        AssetParamField::Manager => params.manager.into(),
        AssetParamField::Freeze => params.freeze.into(),
        AssetParamField::Clawback => params.clawback.into(),
        AssetParamField::DefaultFrozen => {
          Value::Uint(params.default_frozen as u64)
        }
        AssetParamField::Decimals => Value::Uint(params.decimals as u64),
        AssetParamField::Total => Value::Uint(params.total),
      }
    }
    Expr::Add(a, b) => math(env, a, b, u64::checked_add)?,
    Expr::Sub(a, b) => math(env, a, b, u64::checked_sub)?,
    Expr::Mul(a, b) => math(env, a, b, u64::checked_mul)?,
    Expr::Div(a, b) => math(env, a, b, |x, y| x.checked_div(y))?,
    Expr::Exp(a, b) => math(env, a, b, |x, y| {
      x.checked_pow(u32::try_from(y).ok()?)
    })?,
  })
}

fn math<S: State>(
  env: &Env<'_, S>,
  a: &Expr,
  b: &Expr,
  op: impl Fn(u64, u64) -> Option<u64>,
) -> Result<Value, Fault> {
  let a = expr(env, a)?.as_uint().ok_or(Fault::Kind)?;
  let b = expr(env, b)?.as_uint().ok_or(Fault::Kind)?;
  Ok(Value::Uint(op(a, b).ok_or(Fault::Math)?))
}

fn address<S: State>(env: &Env<'_, S>, e: &Expr) -> Result<Address, Fault> {
  expr(env, e)?.as_address().ok_or(Fault::Kind)
}

fn asset_id<S: State>(env: &Env<'_, S>, e: &Expr) -> Result<AssetId, Fault> {
  Ok(AssetId(expr(env, e)?.as_uint().ok_or(Fault::Kind)?))
}

fn txn_field(txn: &Transaction, field: TxnField) -> Result<Value, Fault> {
  match (field, &txn.kind) {
    (TxnField::Sender, _) => Ok(txn.sender.into()),
    (TxnField::Fee, _) => Ok(Value::Uint(txn.fee)),
    (TxnField::RekeyTo, _) => Ok(txn.rekey_to.into()),
    (
      TxnField::Amount,
      TxKind::Payment { amount, .. },
    ) => Ok(Value::Uint(*amount)),
    (
      TxnField::Receiver,
      TxKind::Payment { receiver, .. },
    ) => Ok((*receiver).into()),
    (
      TxnField::CloseRemainderTo,
      TxKind::Payment {
        close_remainder_to, ..
      },
    ) => Ok((*close_remainder_to).into()),
    (
      TxnField::XferAsset,
      TxKind::AssetTransfer { asset, .. },
    ) => Ok(Value::Uint(asset.0)),
    (
      TxnField::AssetAmount,
      TxKind::AssetTransfer { amount, .. },
    ) => Ok(Value::Uint(*amount)),
    (
      TxnField::AssetReceiver,
      TxKind::AssetTransfer { receiver, .. },
    ) => Ok((*receiver).into()),
    (
      TxnField::AssetCloseTo,
      TxKind::AssetTransfer { close_to, .. },
    ) => Ok((*close_to).into()),
    (
      TxnField::RevocationTarget,
      TxKind::AssetTransfer {
        revocation_target, ..
      },
    ) => Ok((*revocation_target).into()),
    (
      TxnField::ApplicationId,
      TxKind::ApplicationCall { app, .. },
    ) => Ok(Value::Uint(app.0)),
    (
      TxnField::NumArgs,
      TxKind::ApplicationCall { args, .. },
    ) => Ok(Value::Uint(args.len() as u64)),
    (
      TxnField::NumAssets,
      TxKind::ApplicationCall { assets, .. },
    ) => Ok(Value::Uint(assets.len() as u64)),
    (
      TxnField::ForeignAsset(i),
      TxKind::ApplicationCall { assets, .. },
    ) => assets
      .get(i)
      .map(|a| Value::Uint(a.0))
      .ok_or(Fault::Missing),
    _ => Err(Fault::Missing),
  }
}

#[cfg(test)]
mod tests {
  use {
    super::{evaluate, Env, Fault},
    crate::{InMemoryLedger, State, StateDiff},
    covenant_primitives::{
      Address,
      Context,
      Expr,
      Transaction,
      TransactionGroup,
      Value,
    },
  };

  fn group() -> TransactionGroup {
    TransactionGroup::new(vec![Transaction::payment(
      Address::new([1; 32]),
      Address::new([2; 32]),
      1000,
    )])
    .unwrap()
  }

  fn env<'a>(
    group: &'a TransactionGroup,
    state: &'a InMemoryLedger,
    ctx: &'a Context,
  ) -> Env<'a, InMemoryLedger> {
    Env {
      group,
      index: 0,
      state,
      ctx,
      app: None,
    }
  }

  #[test]
  fn missing_value_fails_fast_and_is_never_zero() {
    let group = group();
    let state = InMemoryLedger::default();
    let ctx = Context {
      latest_timestamp: 0,
    };
    let env = env(&group, &state, &ctx);

    let missing = Expr::asset_balance(
      Expr::this(covenant_primitives::TxnField::Sender),
      Expr::uint(9),
    );

    // a comparison against a missing holding is false...
    let p = missing.clone().eq(Expr::uint(0));
    assert_eq!(evaluate(&env, &p), Ok(false));

    // ...and Not never turns the fault into an approval
    let p = missing.clone().eq(Expr::uint(0)).not();
    assert_eq!(evaluate(&env, &p), Ok(false));

    // the explicit presence test is the only way to observe absence
    let p = missing.has_value().not();
    assert_eq!(evaluate(&env, &p), Ok(true));
  }

  #[test]
  fn conjunction_short_circuits_before_presupposing_terms() {
    let group = group();
    let mut state = InMemoryLedger::default();
    let mut diff = StateDiff::default();
    diff.set_balance(Address::new([1; 32]), 10);
    state.apply(diff);
    let ctx = Context {
      latest_timestamp: 0,
    };
    let env = env(&group, &state, &ctx);

    // right side would overflow, but the false guard short-circuits it
    let overflow = Expr::uint(u64::MAX)
      .mul(Expr::uint(2))
      .ge(Expr::uint(1));
    let p = Expr::uint(0).eq(Expr::uint(1)).and(overflow.clone());
    assert_eq!(evaluate(&env, &p), Ok(false));

    // a true disjunct on the left also skips it
    let p = Expr::uint(1).eq(Expr::uint(1)).or(overflow.clone());
    assert_eq!(evaluate(&env, &p), Ok(true));

    // evaluated directly, the overflow is reported, not wrapped
    assert_eq!(evaluate(&env, &overflow), Err(Fault::Math));
  }

  #[test]
  fn evaluation_is_pure() {
    let group = group();
    let state = InMemoryLedger::default();
    let ctx = Context {
      latest_timestamp: 77,
    };
    let env = env(&group, &state, &ctx);

    let p = Expr::latest_timestamp().ge(Expr::uint(50)).and(
      Expr::balance(Expr::this(covenant_primitives::TxnField::Sender))
        .eq(Expr::uint(0)),
    );
    let first = evaluate(&env, &p);
    let second = evaluate(&env, &p);
    assert_eq!(first, second);
    assert_eq!(first, Ok(true));
  }

  #[test]
  fn mismatched_kinds_are_a_fault_not_inequality() {
    let group = group();
    let state = InMemoryLedger::default();
    let ctx = Context {
      latest_timestamp: 0,
    };
    let env = env(&group, &state, &ctx);

    let p = Expr::uint(1).ne(Expr::Const(Value::Bytes(vec![1])));
    assert_eq!(evaluate(&env, &p), Ok(false));
  }
}
