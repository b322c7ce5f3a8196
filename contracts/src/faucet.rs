//! Asset faucet: drips a fixed amount of an asset to any opted-in account,
//! rate-limited per account by a cooldown stamped into local state.

use covenant_primitives::{
  Application,
  Effect,
  Expr,
  Handler,
  NoOpRoute,
  Predicate,
  Route,
  StateSchema,
  TxnField,
};

pub const ASSET_ID_KEY: &[u8] = b"asset_id";
pub const DRIP_TIME_KEY: &[u8] = b"drip_time";
pub const DRIP_AMOUNT_KEY: &[u8] = b"drip_amount";
pub const MIN_ALGO_KEY: &[u8] = b"min_algo_amount";
pub const MIN_ASSET_KEY: &[u8] = b"min_asset_amount";

/// Per-account timestamp of the most recent successful claim.
pub const LAST_CLAIM_KEY: &[u8] = b"last_claim_time";

/// Payment that must accompany every claim.
const CLAIM_PAYMENT: u64 = 1000;
const MAX_FEE: u64 = 4000;

/// Builds the faucet application.
///
/// Creation arguments: `[asset id, drip cooldown seconds, drip amount,
/// minimum caller balance, minimum asset amount]`. Any account may opt in;
/// opting in stamps the cooldown, so fresh accounts wait one full period
/// before their first claim. A claim group is `[Payment 1000, this call]`
/// and transfers the drip amount from custody, restamping the cooldown.
/// Only the creator can delete the faucet.
pub fn application() -> Application {
  Application {
    global_schema: StateSchema::new(5, 0),
    local_schema: StateSchema::new(1, 0),
    reject_when: Some(Predicate::any([
      Expr::this(TxnField::Fee).gt(Expr::uint(MAX_FEE)),
      Expr::this(TxnField::RekeyTo).ne(Expr::ZeroAddress),
    ])),
    on_create: Handler::new(Predicate::always(), vec![
      Effect::GlobalPut {
        key: ASSET_ID_KEY.to_vec(),
        value: Expr::arg_uint(0),
      },
      Effect::GlobalPut {
        key: DRIP_TIME_KEY.to_vec(),
        value: Expr::arg_uint(1),
      },
      Effect::GlobalPut {
        key: DRIP_AMOUNT_KEY.to_vec(),
        value: Expr::arg_uint(2),
      },
      Effect::GlobalPut {
        key: MIN_ALGO_KEY.to_vec(),
        value: Expr::arg_uint(3),
      },
      Effect::GlobalPut {
        key: MIN_ASSET_KEY.to_vec(),
        value: Expr::arg_uint(4),
      },
    ]),
    on_opt_in: Route::Allow(Handler::new(Predicate::always(), vec![
      Effect::LocalPut {
        account: Expr::this(TxnField::Sender),
        key: LAST_CLAIM_KEY.to_vec(),
        value: Expr::latest_timestamp(),
      },
    ])),
    on_no_op: NoOpRoute::Single(on_claim()),
    on_close_out: Route::Reject,
    on_clear_state: Route::Reject,
    on_update: Route::Reject,
    on_delete: Route::Allow(Handler::new(
      Expr::this(TxnField::Sender).eq(Expr::CreatorAddress),
      vec![],
    )),
  }
}

fn on_claim() -> Handler {
  let sender = || Expr::this(TxnField::Sender);
  Handler::new(
    Predicate::all([
      // opted into the dripped asset, with enough currency to be usable
      Expr::asset_balance(sender(), Expr::global(ASSET_ID_KEY)).has_value(),
      Expr::balance(sender()).ge(Expr::global(MIN_ALGO_KEY)),
      Expr::group_size().eq(Expr::uint(2)),
      Expr::gtxn(0, TxnField::Amount).eq(Expr::uint(CLAIM_PAYMENT)),
      // cooldown elapsed since the last claim stamp
      Expr::latest_timestamp()
        .sub(Expr::local(sender(), LAST_CLAIM_KEY))
        .ge(Expr::global(DRIP_TIME_KEY)),
      // the faucet itself still holds the asset
      Expr::asset_balance(Expr::CustodyAddress, Expr::global(ASSET_ID_KEY))
        .has_value(),
    ]),
    vec![
      Effect::AssetTransfer {
        asset: Expr::global(ASSET_ID_KEY),
        receiver: sender(),
        amount: Expr::global(DRIP_AMOUNT_KEY),
      },
      Effect::LocalPut {
        account: sender(),
        key: LAST_CLAIM_KEY.to_vec(),
        value: Expr::latest_timestamp(),
      },
    ],
  )
}
