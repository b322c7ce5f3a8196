use {
  covenant_contracts::royalty,
  covenant_primitives::{
    uint_to_bytes,
    Address,
    AppId,
    AssetId,
    OnCompletion,
    RoyaltyShare,
    Transaction,
    TxKind,
    Value,
  },
  covenant_vm::{
    Error,
    HandlerKind,
    InMemoryArtifacts,
    InMemoryLedger,
    State,
    StateDiff,
  },
};

mod common;

const NFT: AssetId = AssetId(55);
const PRICE: u64 = 1_000_000;
const ROYALTY_PERMILLE: u64 = 100;

struct Market {
  store: InMemoryLedger,
  artifacts: InMemoryArtifacts,
  app: AppId,
  manager: Address,
  buyer: Address,
  escrow: Address,
  payee_a: Address,
  payee_b: Address,
}

/// Deploys the transfer app for a one-of-one NFT at 100 permille, split
/// 60/40 across two payees. The escrow account is the asset's clawback
/// authority; its spends are authorized by the escrow logic predicate.
fn deploy() -> anyhow::Result<Market> {
  let manager = common::wallet();
  let buyer = common::wallet();
  let escrow = common::wallet();
  let payee_a = common::wallet();
  let payee_b = common::wallet();

  let mut artifacts = InMemoryArtifacts::default();
  let artifact = artifacts.insert(royalty::application(
    NFT,
    manager,
    ROYALTY_PERMILLE,
    vec![
      RoyaltyShare {
        receiver: payee_a,
        ratio: 60,
      },
      RoyaltyShare {
        receiver: payee_b,
        ratio: 40,
      },
    ],
  ));

  let mut store = InMemoryLedger::default();
  let mut genesis = StateDiff::default();
  common::fund(&mut genesis, manager, 1_000_000);
  common::fund(&mut genesis, buyer, 10_000_000);
  genesis.set_asset(NFT, common::locked_nft(escrow));
  common::grant(&mut genesis, manager, NFT, 1, true);
  common::grant(&mut genesis, buyer, NFT, 0, true);
  store.apply(genesis);

  let ctx = common::ctx(0);
  let app = store.next_app_id();
  common::run(&mut store, &artifacts, &ctx, vec![Transaction::app_create(
    manager,
    artifact,
    vec![],
  )])?;

  Ok(Market {
    store,
    artifacts,
    app,
    manager,
    buyer,
    escrow,
    payee_a,
    payee_b,
  })
}

/// The four-transaction sale group: clawback transfer, sale payment,
/// royalty payment, application call.
fn sale_group(m: &Market, royalty_payment: u64) -> Vec<Transaction> {
  let clawback = Transaction {
    fee: 0,
    lsig: Some(royalty::escrow(m.app)),
    ..Transaction::new(m.escrow, TxKind::AssetTransfer {
      asset: NFT,
      amount: 1,
      receiver: m.buyer,
      close_to: Address::ZERO,
      revocation_target: m.manager,
    })
  };
  let call = {
    let mut call = Transaction::app_call(
      m.manager,
      m.app,
      OnCompletion::NoOp,
      vec![royalty::TRANSFER_TAG.to_vec()],
    );
    if let TxKind::ApplicationCall { assets, .. } = &mut call.kind {
      assets.push(NFT);
    }
    call
  };
  vec![
    clawback,
    Transaction::payment(m.buyer, m.manager, PRICE),
    Transaction::payment(m.buyer, m.app.custody(), royalty_payment),
    call,
  ]
}

#[test]
fn sale_distributes_the_royalty_and_records_the_owner() -> anyhow::Result<()>
{
  let mut m = deploy()?;
  let ctx = common::ctx(0);

  assert_eq!(
    m.store.global(m.app, royalty::OWNER_KEY),
    Some(Value::Bytes(m.manager.as_ref().to_vec()))
  );

  // exactly the minimum royalty: floor(1,000,000 * 100 / 1000) = 100,000
  let group = sale_group(&m, 100_000);
  common::run(&mut m.store, &m.artifacts, &ctx, group)?;

  assert_eq!(m.store.holding(&m.buyer, NFT).unwrap().amount, 1);
  assert_eq!(m.store.holding(&m.manager, NFT).unwrap().amount, 0);
  assert_eq!(m.store.balance(&m.payee_a), 60_000);
  assert_eq!(m.store.balance(&m.payee_b), 40_000);
  assert_eq!(m.store.balance(&m.app.custody()), 0);
  assert_eq!(m.store.balance(&m.manager), 1_000_000 + PRICE);
  assert_eq!(
    m.store.global(m.app, royalty::OWNER_KEY),
    Some(Value::Bytes(m.buyer.as_ref().to_vec()))
  );

  Ok(())
}

#[test]
fn underpaying_the_royalty_rejects_the_sale() -> anyhow::Result<()> {
  let mut m = deploy()?;

  let group = sale_group(&m, 99_999);
  let err = common::run_rejected(
    &mut m.store,
    &m.artifacts,
    &common::ctx(0),
    group,
  );
  assert_eq!(err, Error::Rejected(HandlerKind::NoOp));

  Ok(())
}

#[test]
fn escrow_only_signs_groups_ending_in_the_app_call() -> anyhow::Result<()> {
  let mut m = deploy()?;
  let ctx = common::ctx(0);

  // a clawback transfer without the trailing call is not authorized
  let clawback = Transaction {
    fee: 0,
    lsig: Some(royalty::escrow(m.app)),
    ..Transaction::new(m.escrow, TxKind::AssetTransfer {
      asset: NFT,
      amount: 1,
      receiver: m.buyer,
      close_to: Address::ZERO,
      revocation_target: m.manager,
    })
  };
  let err =
    common::run_rejected(&mut m.store, &m.artifacts, &ctx, vec![clawback]);
  assert_eq!(err, Error::Rejected(HandlerKind::LogicSignature));

  // a nonzero fee on the escrow transaction is not authorized either
  let mut group = sale_group(&m, 100_000);
  group[0].fee = 1000;
  let err = common::run_rejected(&mut m.store, &m.artifacts, &ctx, group);
  assert_eq!(err, Error::Rejected(HandlerKind::LogicSignature));

  Ok(())
}

#[test]
fn royalty_can_be_lowered_but_raising_needs_the_nft() -> anyhow::Result<()> {
  let mut m = deploy()?;
  let ctx = common::ctx(0);

  // sell the NFT away first so the manager no longer holds it
  let group = sale_group(&m, 100_000);
  common::run(&mut m.store, &m.artifacts, &ctx, group)?;

  let set_royalty = |permille: u64| {
    Transaction::app_call(m.manager, m.app, OnCompletion::NoOp, vec![
      royalty::SET_ROYALTY_TAG.to_vec(),
      uint_to_bytes(permille),
    ])
  };

  // raising while not holding the asset is rejected
  let err = common::run_rejected(&mut m.store, &m.artifacts, &ctx, vec![
    set_royalty(150),
  ]);
  assert_eq!(err, Error::Rejected(HandlerKind::NoOp));

  // lowering is always allowed for the manager
  common::run(&mut m.store, &m.artifacts, &ctx, vec![set_royalty(50)])?;
  assert_eq!(
    m.store.global(m.app, royalty::ROYALTY_KEY),
    Some(Value::Uint(50))
  );

  // and nobody else may touch it at all
  let err = common::run_rejected(&mut m.store, &m.artifacts, &ctx, vec![
    Transaction::app_call(m.buyer, m.app, OnCompletion::NoOp, vec![
      royalty::SET_ROYALTY_TAG.to_vec(),
      uint_to_bytes(10),
    ]),
  ]);
  assert_eq!(err, Error::Rejected(HandlerKind::NoOp));

  Ok(())
}

#[test]
fn foreign_asset_references_are_locked_to_the_nft() -> anyhow::Result<()> {
  let mut m = deploy()?;
  let ctx = common::ctx(0);

  let mut call = Transaction::app_call(m.manager, m.app, OnCompletion::NoOp, vec![
    royalty::SET_ROYALTY_TAG.to_vec(),
    uint_to_bytes(50),
  ]);
  if let TxKind::ApplicationCall { assets, .. } = &mut call.kind {
    assets.push(AssetId(999));
  }
  let err = common::run_rejected(&mut m.store, &m.artifacts, &ctx, vec![call]);
  assert_eq!(err, Error::Rejected(HandlerKind::Guard));

  Ok(())
}

#[test]
fn deletion_destroys_the_nft_and_sweeps_custody() -> anyhow::Result<()> {
  let mut m = deploy()?;
  let ctx = common::ctx(0);

  // leave some dust in custody to observe the sweep
  let mut dust = StateDiff::default();
  dust.set_balance(m.app.custody(), 5_000);
  m.store.apply(dust);

  let destroy = Transaction {
    fee: 0,
    lsig: Some(royalty::escrow(m.app)),
    ..Transaction::new(m.escrow, TxKind::AssetDestroy { asset: NFT })
  };
  let call =
    Transaction::app_call(m.manager, m.app, OnCompletion::Delete, vec![]);

  // only the manager may tear the app down
  let stranger_call =
    Transaction::app_call(m.buyer, m.app, OnCompletion::Delete, vec![]);
  let err = common::run_rejected(&mut m.store, &m.artifacts, &ctx, vec![
    destroy.clone(),
    stranger_call,
  ]);
  assert_eq!(err, Error::Rejected(HandlerKind::Delete));

  let manager_balance = m.store.balance(&m.manager);
  common::run(&mut m.store, &m.artifacts, &ctx, vec![destroy, call])?;

  assert!(m.store.app(m.app).is_none());
  assert!(m.store.asset(NFT).is_none());
  assert_eq!(m.store.global(m.app, royalty::OWNER_KEY), None);
  assert_eq!(m.store.balance(&m.app.custody()), 0);
  assert_eq!(m.store.balance(&m.manager), manager_balance + 5_000);

  Ok(())
}
