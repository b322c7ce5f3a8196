//! Token swapper: takes units of an old asset and pays out the new asset
//! at a fixed multiplier derived from the new asset's decimals.

use covenant_primitives::{
  Application,
  AssetParamField,
  Effect,
  Expr,
  Handler,
  NoOpRoute,
  OnCompletion,
  Predicate,
  Route,
  Slot,
  StateSchema,
  TxnField,
  TxnKindTag,
};

pub const SWAP_ASSET_KEY: &[u8] = b"Swap_Asset_ID";
pub const NEW_ASSET_KEY: &[u8] = b"New_Asset_ID";
pub const MULTIPLIER_KEY: &[u8] = b"Multiply";

pub const OPT_IN_TAG: &[u8] = b"opt_in_assets";
pub const SWAP_TAG: &[u8] = b"swap";

/// Seed payment that funds custody for its two asset opt-ins.
const SEED_AMOUNT: u64 = 801_000;
/// Payment accompanying every swap call.
const SWAP_PAYMENT: u64 = 1000;
const MAX_FEE: u64 = 1000;

/// Builds the swapper application.
///
/// Creation initializes both asset keys to zero; a later `opt_in_assets`
/// group — creator-only, seeded with a fixed payment — locks in the two
/// asset ids and the payout multiplier `10^decimals`. After that, `swap`
/// groups exchange old-asset deposits for new-asset payouts. Everything
/// else about the contract is frozen: no opt-ins, no updates, no deletion.
pub fn application() -> Application {
  Application {
    global_schema: StateSchema::new(3, 0),
    local_schema: StateSchema::new(0, 0),
    reject_when: Some(Predicate::any([
      Expr::this(TxnField::Fee).gt(Expr::uint(MAX_FEE)),
      Expr::this(TxnField::RekeyTo).ne(Expr::ZeroAddress),
    ])),
    on_create: Handler::new(Predicate::always(), vec![
      Effect::GlobalPut {
        key: SWAP_ASSET_KEY.to_vec(),
        value: Expr::uint(0),
      },
      Effect::GlobalPut {
        key: NEW_ASSET_KEY.to_vec(),
        value: Expr::uint(0),
      },
    ]),
    on_opt_in: Route::Reject,
    on_no_op: NoOpRoute::ByTag(
      [
        (OPT_IN_TAG.to_vec(), on_opt_in_assets()),
        (SWAP_TAG.to_vec(), on_swap()),
      ]
      .into_iter()
      .collect(),
    ),
    on_close_out: Route::Reject,
    on_clear_state: Route::Reject,
    on_update: Route::Reject,
    on_delete: Route::Reject,
  }
}

/// One-time configuration: `[Payment seed -> custody, this call]` with the
/// two asset ids as arguments. Only valid while both keys still hold zero.
fn on_opt_in_assets() -> Handler {
  Handler::new(
    Predicate::all([
      Expr::global(SWAP_ASSET_KEY).eq(Expr::uint(0)),
      Expr::global(NEW_ASSET_KEY).eq(Expr::uint(0)),
      Expr::group_size().eq(Expr::uint(2)),
      Predicate::kind_is(Slot::Index(0), TxnKindTag::Payment),
      Expr::gtxn(0, TxnField::Receiver).eq(Expr::CustodyAddress),
      Expr::gtxn(0, TxnField::Sender).eq(Expr::CreatorAddress),
      Expr::gtxn(0, TxnField::Amount).eq(Expr::uint(SEED_AMOUNT)),
      Expr::gtxn(1, TxnField::NumArgs).eq(Expr::uint(3)),
      Expr::gtxn(1, TxnField::ApplicationId).eq(Expr::CurrentAppId),
      Predicate::completion_is(Slot::Index(1), OnCompletion::NoOp),
      // the new asset must expose decimals before the multiplier is fixed
      Expr::asset_param(Expr::arg_uint(2), AssetParamField::Decimals)
        .has_value(),
    ]),
    vec![
      Effect::OptInAsset {
        asset: Expr::arg_uint(1),
      },
      Effect::OptInAsset {
        asset: Expr::arg_uint(2),
      },
      Effect::GlobalPut {
        key: SWAP_ASSET_KEY.to_vec(),
        value: Expr::arg_uint(1),
      },
      Effect::GlobalPut {
        key: NEW_ASSET_KEY.to_vec(),
        value: Expr::arg_uint(2),
      },
      Effect::GlobalPut {
        key: MULTIPLIER_KEY.to_vec(),
        value: Expr::uint(10).exp(Expr::asset_param(
          Expr::arg_uint(2),
          AssetParamField::Decimals,
        )),
      },
    ],
  )
}

/// The swap group: `[Payment 1000 -> custody, AssetTransfer of the old
/// asset -> custody, this call]`. Pays out `deposit * multiplier` units of
/// the new asset; the multiplication is checked, an overflowing deposit
/// rejects the group instead of mispaying.
fn on_swap() -> Handler {
  Handler::new(
    Predicate::all([
      Expr::group_size().eq(Expr::uint(3)),
      Predicate::kind_is(Slot::Index(0), TxnKindTag::Payment),
      Expr::gtxn(0, TxnField::Amount).eq(Expr::uint(SWAP_PAYMENT)),
      Expr::gtxn(0, TxnField::Receiver).eq(Expr::CustodyAddress),
      Predicate::kind_is(Slot::Index(1), TxnKindTag::AssetTransfer),
      Expr::gtxn(1, TxnField::AssetAmount).gt(Expr::uint(0)),
      Expr::gtxn(1, TxnField::XferAsset).eq(Expr::global(SWAP_ASSET_KEY)),
      Expr::gtxn(1, TxnField::AssetReceiver).eq(Expr::CustodyAddress),
      Predicate::completion_is(Slot::Index(2), OnCompletion::NoOp),
      Expr::gtxn(2, TxnField::NumArgs).eq(Expr::uint(1)),
      // the caller must hold positions in both assets
      Expr::asset_balance(
        Expr::this(TxnField::Sender),
        Expr::global(SWAP_ASSET_KEY),
      )
      .has_value(),
      Expr::asset_balance(
        Expr::this(TxnField::Sender),
        Expr::global(NEW_ASSET_KEY),
      )
      .has_value(),
    ]),
    vec![Effect::AssetTransfer {
      asset: Expr::global(NEW_ASSET_KEY),
      receiver: Expr::this(TxnField::Sender),
      amount: Expr::gtxn(1, TxnField::AssetAmount)
        .mul(Expr::global(MULTIPLIER_KEY)),
    }],
  )
}
