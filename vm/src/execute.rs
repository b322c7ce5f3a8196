use {
  crate::{
    artifacts::Loader,
    effects,
    eval::{self, AppView, Env},
    ledger::{Overlay, StateScope, TransferError},
    state::{State, StateDiff},
  },
  covenant_primitives::{
    AppId,
    AppInstance,
    ArtifactId,
    Context,
    Handler,
    NoOpRoute,
    OnCompletion,
    Predicate,
    Route,
    Transaction,
    TransactionGroup,
    TxKind,
  },
  thiserror::Error,
};

/// Which handler of the lifecycle state machine rejected the group.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum HandlerKind {
  LogicSignature,
  Guard,
  Create,
  OptIn,
  NoOp,
  CloseOut,
  ClearState,
  Update,
  Delete,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
  /// An invariant in the active handler evaluated false. No state changed;
  /// the caller may resubmit a corrected group.
  #[error("transaction group rejected by the {0:?} handler")]
  Rejected(HandlerKind),

  /// A write would exceed the key-count schema fixed at creation. This is
  /// a contract logic error, not recoverable by resubmitting.
  #[error("write exceeds the fixed {scope:?} state schema of {app}")]
  SchemaCapacityExceeded { app: AppId, scope: StateScope },

  /// Checked arithmetic overflowed or divided by zero. Reported distinctly
  /// so mispriced ratio computations are never silently wrapped, but the
  /// group rolls back exactly like a rejection.
  #[error("arithmetic overflow during predicate or effect evaluation")]
  ArithmeticOverflow,

  /// A proposed or emitted transfer could not be applied; the whole group
  /// rolls back as if the predicate had failed.
  #[error("transfer failed: {0}")]
  EffectFailed(#[from] TransferError),

  #[error("call to unknown application {0}")]
  UnknownApplication(AppId),

  #[error("reference to unknown artifact {0}")]
  UnknownArtifact(ArtifactId),

  #[error("application creation call carries no artifact reference")]
  MissingArtifact,
}

/// Evaluates a transaction group against a state snapshot and, when every
/// predicate and effect succeeds, returns the staged diff for the caller to
/// commit with [`State::apply`].
///
/// This is a pure function of (group, snapshot, context): it performs no
/// I/O, never retries, and leaves the snapshot untouched. On any error the
/// diff is discarded and nothing the group proposed takes effect.
pub fn execute<S: State>(
  group: &TransactionGroup,
  state: &S,
  loader: &impl Loader,
  ctx: &Context,
) -> Result<StateDiff, Error> {
  let mut over = Overlay::new(state);
  let mut next_app = state.next_app_id();

  for (index, txn) in group.iter().enumerate() {
    // a logic predicate stands in for the sender's signature
    if let Some(lsig) = &txn.lsig {
      let env = Env {
        group,
        index,
        state,
        ctx,
        app: None,
      };
      if !check(&env, lsig)? {
        return Err(Error::Rejected(HandlerKind::LogicSignature));
      }
    }

    match &txn.kind {
      TxKind::ApplicationCall { .. } => apply_call(
        group,
        index,
        txn,
        state,
        loader,
        ctx,
        &mut over,
        &mut next_app,
      )?,
      _ => over.apply_native(txn)?,
    }
  }

  Ok(over.into_diff())
}

#[allow(clippy::too_many_arguments)]
fn apply_call<S: State>(
  group: &TransactionGroup,
  index: usize,
  txn: &Transaction,
  state: &S,
  loader: &impl Loader,
  ctx: &Context,
  over: &mut Overlay<'_, S>,
  next_app: &mut AppId,
) -> Result<(), Error> {
  let (app, on_completion, artifact) = match &txn.kind {
    TxKind::ApplicationCall {
      app,
      on_completion,
      artifact,
      ..
    } => (*app, *on_completion, *artifact),
    _ => unreachable!("apply_call is only invoked for application calls"),
  };
  let sender = txn.sender;

  let creating = app == AppId::CREATE;
  let (instance, application) = if creating {
    let artifact = artifact.ok_or(Error::MissingArtifact)?;
    let application = loader
      .load(&artifact)
      .ok_or(Error::UnknownArtifact(artifact))?;
    let id = *next_app;
    next_app.0 += 1;
    let instance = AppInstance {
      id,
      creator: sender,
      artifact,
      custody: id.custody(),
      global_schema: application.global_schema,
      local_schema: application.local_schema,
    };
    (instance, application)
  } else {
    let instance = over.app(app).ok_or(Error::UnknownApplication(app))?;
    let application = loader
      .load(&instance.artifact)
      .ok_or(Error::UnknownArtifact(instance.artifact))?;
    (instance, application)
  };

  let env = Env {
    group,
    index,
    state,
    ctx,
    app: Some(AppView {
      id: instance.id,
      custody: instance.custody,
      creator: instance.creator,
    }),
  };

  // the guard applies to every entrypoint, creation included
  if let Some(guard) = &application.reject_when {
    if check(&env, guard)? {
      return Err(Error::Rejected(HandlerKind::Guard));
    }
  }

  // a call targeting id zero is a creation regardless of completion type,
  // mirroring the routers this engine hosts
  if creating {
    require(&env, &application.on_create.predicate, HandlerKind::Create)?;
    over.create_app(instance.clone());
    return effects::apply(
      &env,
      &instance,
      &application.on_create.effects,
      over,
    );
  }

  match on_completion {
    OnCompletion::NoOp => {
      let handler = match &application.on_no_op {
        NoOpRoute::Single(handler) => handler,
        NoOpRoute::ByTag(table) => leading_tag(txn)
          .and_then(|tag| table.get(tag))
          .ok_or(Error::Rejected(HandlerKind::NoOp))?,
      };
      require(&env, &handler.predicate, HandlerKind::NoOp)?;
      effects::apply(&env, &instance, &handler.effects, over)
    }
    OnCompletion::OptIn => {
      let handler = route(&application.on_opt_in, HandlerKind::OptIn)?;
      require(&env, &handler.predicate, HandlerKind::OptIn)?;
      // local state exists before opt-in effects initialize it
      over.opt_in_app(&sender, instance.id)?;
      effects::apply(&env, &instance, &handler.effects, over)
    }
    OnCompletion::CloseOut => {
      let handler = route(&application.on_close_out, HandlerKind::CloseOut)?;
      require(&env, &handler.predicate, HandlerKind::CloseOut)?;
      effects::apply(&env, &instance, &handler.effects, over)?;
      over.opt_out_app(&sender, instance.id)?;
      Ok(())
    }
    OnCompletion::ClearState => {
      let handler =
        route(&application.on_clear_state, HandlerKind::ClearState)?;
      require(&env, &handler.predicate, HandlerKind::ClearState)?;
      effects::apply(&env, &instance, &handler.effects, over)?;
      over.opt_out_app(&sender, instance.id)?;
      Ok(())
    }
    OnCompletion::Update => {
      let handler = route(&application.on_update, HandlerKind::Update)?;
      require(&env, &handler.predicate, HandlerKind::Update)?;
      effects::apply(&env, &instance, &handler.effects, over)?;
      if let Some(new_artifact) = artifact {
        over.create_app(AppInstance {
          artifact: new_artifact,
          ..instance
        });
      }
      Ok(())
    }
    OnCompletion::Delete => {
      let handler = route(&application.on_delete, HandlerKind::Delete)?;
      require(&env, &handler.predicate, HandlerKind::Delete)?;
      // close-out effects run while the instance still exists, then the
      // instance and all its global state are erased
      effects::apply(&env, &instance, &handler.effects, over)?;
      over.delete_app(instance.id);
      Ok(())
    }
  }
}

fn route(route: &Route, kind: HandlerKind) -> Result<&Handler, Error> {
  match route {
    Route::Allow(handler) => Ok(handler),
    Route::Reject => Err(Error::Rejected(kind)),
  }
}

fn require<S: State>(
  env: &Env<'_, S>,
  predicate: &Predicate,
  kind: HandlerKind,
) -> Result<(), Error> {
  if check(env, predicate)? {
    Ok(())
  } else {
    Err(Error::Rejected(kind))
  }
}

fn check<S: State>(
  env: &Env<'_, S>,
  predicate: &Predicate,
) -> Result<bool, Error> {
  // the evaluator folds every fault to false except arithmetic, which is
  // the only one allowed to escape
  eval::evaluate(env, predicate).map_err(|_| Error::ArithmeticOverflow)
}

fn leading_tag(txn: &Transaction) -> Option<&[u8]> {
  match &txn.kind {
    TxKind::ApplicationCall { args, .. } => {
      args.first().map(|arg| arg.as_slice())
    }
    _ => None,
  }
}

#[cfg(test)]
mod tests {
  use {
    super::{execute, Error, HandlerKind},
    crate::{
      artifacts::InMemoryArtifacts,
      ledger::StateScope,
      state::{InMemoryLedger, State},
    },
    covenant_primitives::{
      Address,
      AppId,
      Application,
      Context,
      Effect,
      Expr,
      Handler,
      NoOpRoute,
      OnCompletion,
      Predicate,
      Route,
      StateSchema,
      Transaction,
      TransactionGroup,
      Value,
    },
  };

  fn ctx() -> Context {
    Context {
      latest_timestamp: 0,
    }
  }

  /// An application whose only call writes one uint key per argument.
  fn writer_application(keys: &[&[u8]]) -> Application {
    Application {
      global_schema: StateSchema::new(2, 0),
      local_schema: StateSchema::default(),
      reject_when: None,
      on_create: Handler::approve(),
      on_opt_in: Route::Reject,
      on_no_op: NoOpRoute::Single(Handler::new(
        Predicate::always(),
        keys
          .iter()
          .map(|key| Effect::GlobalPut {
            key: key.to_vec(),
            value: Expr::uint(1),
          })
          .collect(),
      )),
      on_close_out: Route::Reject,
      on_clear_state: Route::Reject,
      on_update: Route::Reject,
      on_delete: Route::Reject,
    }
  }

  fn deploy(
    application: Application,
  ) -> (InMemoryLedger, InMemoryArtifacts, AppId, Address) {
    let creator = Address::new([1; 32]);
    let mut artifacts = InMemoryArtifacts::default();
    let artifact = artifacts.insert(application);

    let mut store = InMemoryLedger::default();
    let app = store.next_app_id();
    let group = TransactionGroup::new(vec![Transaction::app_create(
      creator, artifact, vec![],
    )])
    .unwrap();
    let diff = execute(&group, &store, &artifacts, &ctx()).unwrap();
    store.apply(diff);
    (store, artifacts, app, creator)
  }

  #[test]
  fn writes_within_schema_commit_atomically() {
    let (mut store, artifacts, app, creator) =
      deploy(writer_application(&[b"a", b"b"]));

    let group = TransactionGroup::new(vec![Transaction::app_call(
      creator,
      app,
      OnCompletion::NoOp,
      vec![],
    )])
    .unwrap();
    let diff = execute(&group, &store, &artifacts, &ctx()).unwrap();
    store.apply(diff);

    assert_eq!(store.global(app, b"a"), Some(Value::Uint(1)));
    assert_eq!(store.global(app, b"b"), Some(Value::Uint(1)));
  }

  #[test]
  fn exceeding_the_schema_is_a_distinct_hard_failure() {
    let (store, artifacts, app, creator) =
      deploy(writer_application(&[b"a", b"b", b"c"]));

    let group = TransactionGroup::new(vec![Transaction::app_call(
      creator,
      app,
      OnCompletion::NoOp,
      vec![],
    )])
    .unwrap();
    let err = execute(&group, &store, &artifacts, &ctx()).unwrap_err();
    assert_eq!(err, Error::SchemaCapacityExceeded {
      app,
      scope: StateScope::Global,
    });
    // nothing was committed, not even the two writes that fit
    assert_eq!(store.global(app, b"a"), None);
  }

  #[test]
  fn calls_to_unknown_applications_fail() {
    let store = InMemoryLedger::default();
    let artifacts = InMemoryArtifacts::default();

    let group = TransactionGroup::new(vec![Transaction::app_call(
      Address::new([1; 32]),
      AppId(42),
      OnCompletion::NoOp,
      vec![],
    )])
    .unwrap();
    assert_eq!(
      execute(&group, &store, &artifacts, &ctx()).unwrap_err(),
      Error::UnknownApplication(AppId(42))
    );
  }

  #[test]
  fn underfunded_emitted_transfer_rolls_back_the_group() {
    // the only call pays out of an empty custody account
    let application = Application {
      on_no_op: NoOpRoute::Single(Handler::new(Predicate::always(), vec![
        Effect::Pay {
          receiver: Expr::this(covenant_primitives::TxnField::Sender),
          amount: Expr::uint(1_000),
        },
      ])),
      ..writer_application(&[])
    };
    let (store, artifacts, app, creator) = deploy(application);

    let group = TransactionGroup::new(vec![Transaction::app_call(
      creator,
      app,
      OnCompletion::NoOp,
      vec![],
    )])
    .unwrap();
    let err = execute(&group, &store, &artifacts, &ctx()).unwrap_err();
    assert!(matches!(err, Error::EffectFailed(_)));
  }

  #[test]
  fn creation_assigns_sequential_ids_and_custody() {
    let (store, _, app, _) = deploy(writer_application(&[]));
    let instance = store.app(app).unwrap();
    assert_eq!(instance.id, app);
    assert_eq!(instance.custody, app.custody());
    assert_eq!(store.next_app_id(), AppId(app.0 + 1));
  }

  #[test]
  fn rejected_groups_report_the_failing_handler() {
    let application = Application {
      on_no_op: NoOpRoute::Single(Handler::new(
        Expr::uint(0).eq(Expr::uint(1)),
        vec![],
      )),
      ..writer_application(&[])
    };
    let (store, artifacts, app, creator) = deploy(application);

    let group = TransactionGroup::new(vec![Transaction::app_call(
      creator,
      app,
      OnCompletion::NoOp,
      vec![],
    )])
    .unwrap();
    assert_eq!(
      execute(&group, &store, &artifacts, &ctx()).unwrap_err(),
      Error::Rejected(HandlerKind::NoOp)
    );
  }
}
