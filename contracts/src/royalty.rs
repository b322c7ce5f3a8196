//! NFT royalty transfer: every sale of a single default-frozen asset moves
//! through a clawback escrow and pays a permille royalty into custody,
//! which distributes it across fixed payout shares.

use covenant_primitives::{
  Address,
  AppId,
  Application,
  AssetId,
  AssetParamField,
  Effect,
  Expr,
  Handler,
  NoOpRoute,
  Predicate,
  Route,
  RoyaltyShare,
  Slot,
  StateSchema,
  TxnField,
  TxnKindTag,
};

/// Address allowed to execute privileged calls on this app.
pub const APP_MANAGER_KEY: &[u8] = b"app_manager";
/// The address holding the NFT, according to transfer history.
pub const OWNER_KEY: &[u8] = b"owner";
/// Royalty in permille of the sale price; updatable via `set_royalty`.
pub const ROYALTY_KEY: &[u8] = b"royalty";

pub const TRANSFER_TAG: &[u8] = b"transfer";
pub const SET_ROYALTY_TAG: &[u8] = b"set_royalty";

/// Builds the transfer application for one NFT.
///
/// The asset, manager and payout table are fixed per instance. A sale is a
/// four-transaction group: the clawback transfer of the single NFT unit,
/// the sale payment from buyer to seller, the royalty payment into
/// custody, and this call. The royalty payment must reach
/// `floor(price * permille / 1000)`; payouts are split
/// `floor(payment * ratio / Σratio)` with the remainder left in custody.
pub fn application(
  asset: AssetId,
  app_manager: Address,
  royalty_permille: u64,
  payouts: Vec<RoyaltyShare>,
) -> Application {
  Application {
    global_schema: StateSchema::new(1, 2),
    local_schema: StateSchema::new(0, 0),
    // every call references either no asset or exactly the managed one
    reject_when: Some(
      Predicate::any([
        Expr::this(TxnField::NumAssets).eq(Expr::uint(0)),
        Expr::this(TxnField::NumAssets)
          .eq(Expr::uint(1))
          .and(Expr::this(TxnField::ForeignAsset(0)).eq(Expr::uint(asset.0))),
      ])
      .not(),
    ),
    on_create: on_create(asset, app_manager, royalty_permille),
    on_opt_in: Route::Reject,
    on_no_op: NoOpRoute::ByTag(
      [
        (TRANSFER_TAG.to_vec(), on_transfer(asset, payouts)),
        (SET_ROYALTY_TAG.to_vec(), on_set_royalty(asset)),
      ]
      .into_iter()
      .collect(),
    ),
    on_close_out: Route::Reject,
    on_clear_state: Route::Reject,
    on_update: Route::Allow(on_update(asset)),
    on_delete: Route::Allow(on_delete()),
  }
}

/// Logic predicate for the escrow account acting as the asset's clawback
/// authority: it signs any group whose last transaction is a zero-fee call
/// to the transfer application.
pub fn escrow(app: AppId) -> Predicate {
  Predicate::all([
    Expr::this(TxnField::Fee).eq(Expr::uint(0)),
    Predicate::kind_is(Slot::Last, TxnKindTag::ApplicationCall),
    Expr::txn(Slot::Last, TxnField::ApplicationId).eq(Expr::uint(app.0)),
  ])
}

fn on_create(
  asset: AssetId,
  app_manager: Address,
  royalty_permille: u64,
) -> Handler {
  Handler::new(
    // only the current holder of the NFT may bind it to this app
    Expr::asset_balance(Expr::this(TxnField::Sender), Expr::uint(asset.0))
      .gt(Expr::uint(0)),
    vec![
      Effect::GlobalPut {
        key: APP_MANAGER_KEY.to_vec(),
        value: Expr::address(app_manager),
      },
      Effect::GlobalPut {
        key: OWNER_KEY.to_vec(),
        value: Expr::address(app_manager),
      },
      Effect::GlobalPut {
        key: ROYALTY_KEY.to_vec(),
        value: Expr::uint(royalty_permille),
      },
    ],
  )
}

/// The sale group:
///
/// - `Gtxn[0]` — clawback transfer of exactly one unit, zero fee
/// - `Gtxn[1]` — sale payment, buyer to seller
/// - `Gtxn[2]` — royalty payment into custody
/// - `Gtxn[3]` — this call
fn on_transfer(asset: AssetId, payouts: Vec<RoyaltyShare>) -> Handler {
  let royalty_minimum = Expr::gtxn(1, TxnField::Amount)
    .mul(Expr::global(ROYALTY_KEY))
    .div(Expr::uint(1000));

  Handler::new(
    Predicate::all([
      Expr::this(TxnField::NumAssets).eq(Expr::uint(1)),
      Expr::group_size().eq(Expr::uint(4)),
      Predicate::kind_is(Slot::Index(0), TxnKindTag::AssetTransfer),
      Predicate::kind_is(Slot::Index(1), TxnKindTag::Payment),
      Predicate::kind_is(Slot::Index(2), TxnKindTag::Payment),
      Predicate::kind_is(Slot::Index(3), TxnKindTag::ApplicationCall),
      Expr::gtxn(0, TxnField::Fee).eq(Expr::uint(0)),
      Expr::gtxn(0, TxnField::AssetAmount).eq(Expr::uint(1)),
      Expr::gtxn(0, TxnField::XferAsset).eq(Expr::uint(asset.0)),
      // no sweeping or rekeying anywhere in the group
      Expr::gtxn(0, TxnField::AssetCloseTo).eq(Expr::ZeroAddress),
      Expr::gtxn(1, TxnField::CloseRemainderTo).eq(Expr::ZeroAddress),
      Expr::gtxn(2, TxnField::CloseRemainderTo).eq(Expr::ZeroAddress),
      Expr::gtxn(0, TxnField::RekeyTo).eq(Expr::ZeroAddress),
      Expr::gtxn(1, TxnField::RekeyTo).eq(Expr::ZeroAddress),
      Expr::gtxn(2, TxnField::RekeyTo).eq(Expr::ZeroAddress),
      Expr::gtxn(3, TxnField::RekeyTo).eq(Expr::ZeroAddress),
      // the seller both runs this call and is the debited holder
      Expr::this(TxnField::Sender)
        .eq(Expr::gtxn(0, TxnField::RevocationTarget)),
      // the asset must stay locked to the escrow: default frozen, with one
      // authority acting as manager, freeze and clawback
      Expr::asset_param(Expr::uint(asset.0), AssetParamField::DefaultFrozen)
        .eq(Expr::uint(1)),
      Expr::asset_param(Expr::uint(asset.0), AssetParamField::Clawback)
        .ne(Expr::ZeroAddress),
      Expr::asset_param(Expr::uint(asset.0), AssetParamField::Manager).eq(
        Expr::asset_param(Expr::uint(asset.0), AssetParamField::Clawback),
      ),
      Expr::asset_param(Expr::uint(asset.0), AssetParamField::Freeze).eq(
        Expr::asset_param(Expr::uint(asset.0), AssetParamField::Clawback),
      ),
      // payment flows opposite the asset: buyer pays, seller receives
      Expr::gtxn(1, TxnField::Sender)
        .eq(Expr::gtxn(0, TxnField::AssetReceiver)),
      Expr::gtxn(0, TxnField::RevocationTarget)
        .eq(Expr::gtxn(1, TxnField::Receiver)),
      Expr::gtxn(2, TxnField::Receiver).eq(Expr::CustodyAddress),
      Expr::gtxn(2, TxnField::Amount).ge(royalty_minimum),
    ]),
    vec![
      Effect::PayRoyalties {
        payment: Expr::gtxn(2, TxnField::Amount),
        payouts,
      },
      Effect::GlobalPut {
        key: OWNER_KEY.to_vec(),
        value: Expr::gtxn(0, TxnField::AssetReceiver),
      },
    ],
  )
}

/// The manager may lower the royalty at any time, but may only raise it
/// while still holding the NFT.
fn on_set_royalty(asset: AssetId) -> Handler {
  Handler::new(
    Predicate::all([
      Expr::group_size().eq(Expr::uint(1)),
      Expr::this(TxnField::Sender).eq(Expr::global(APP_MANAGER_KEY)),
      Expr::arg_uint(1).lt(Expr::global(ROYALTY_KEY)).or(
        Expr::asset_balance(Expr::this(TxnField::Sender), Expr::uint(asset.0))
          .gt(Expr::uint(0)),
      ),
    ]),
    vec![Effect::GlobalPut {
      key: ROYALTY_KEY.to_vec(),
      value: Expr::arg_uint(1),
    }],
  )
}

fn on_update(asset: AssetId) -> Handler {
  Handler::new(
    Predicate::all([
      Expr::group_size().eq(Expr::uint(1)),
      Expr::this(TxnField::Sender).eq(Expr::global(APP_MANAGER_KEY)),
      Expr::asset_balance(Expr::this(TxnField::Sender), Expr::uint(asset.0))
        .gt(Expr::uint(0)),
      Expr::this(TxnField::RekeyTo).eq(Expr::ZeroAddress),
    ]),
    vec![],
  )
}

/// Tearing the app down destroys the NFT alongside it: the group either
/// dumps the remaining custody balance to the manager or leaves it for the
/// close-out effect.
fn on_delete() -> Handler {
  let destroy_leading = Predicate::any([
    Predicate::kind_is(Slot::Index(0), TxnKindTag::AssetConfig),
    Predicate::kind_is(Slot::Index(0), TxnKindTag::AssetDestroy),
  ]);

  Handler::new(
    Predicate::all([
      Expr::this(TxnField::Sender).eq(Expr::global(APP_MANAGER_KEY)),
      Predicate::any([
        Predicate::all([
          Expr::group_size().eq(Expr::uint(3)),
          destroy_leading.clone(),
          Predicate::kind_is(Slot::Index(1), TxnKindTag::Payment),
          Predicate::kind_is(Slot::Index(2), TxnKindTag::ApplicationCall),
          Expr::gtxn(1, TxnField::Fee).eq(Expr::uint(0)),
          Expr::gtxn(1, TxnField::CloseRemainderTo)
            .eq(Expr::this(TxnField::Sender)),
          Expr::gtxn(0, TxnField::RekeyTo).eq(Expr::ZeroAddress),
          Expr::gtxn(1, TxnField::RekeyTo).eq(Expr::ZeroAddress),
          Expr::gtxn(2, TxnField::RekeyTo).eq(Expr::ZeroAddress),
        ]),
        Predicate::all([
          Expr::group_size().eq(Expr::uint(2)),
          destroy_leading,
          Predicate::kind_is(Slot::Index(1), TxnKindTag::ApplicationCall),
          Expr::gtxn(0, TxnField::RekeyTo).eq(Expr::ZeroAddress),
          Expr::gtxn(1, TxnField::RekeyTo).eq(Expr::ZeroAddress),
        ]),
      ]),
    ]),
    vec![Effect::CloseAccountTo {
      receiver: Expr::this(TxnField::Sender),
    }],
  )
}
