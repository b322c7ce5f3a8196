//! Timed asset vault: locks an asset and the custody balance until a fixed
//! unlock timestamp, then releases everything to a single designated
//! receiver when the contract is deleted.

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

/// Asset the vault holds.
pub const ASSET_ID_KEY: &[u8] = b"asset_id";
/// Wallet that receives everything when the vault is closed.
pub const RECEIVER_KEY: &[u8] = b"receiver_address_key";
/// Timestamp after which the vault can be closed.
pub const UNLOCK_TIME_KEY: &[u8] = b"unlock_time";

/// Builds the vault application.
///
/// Creation arguments: `[asset id, receiver address, unlock timestamp]`.
/// The creator must name itself as receiver and pick an unlock time
/// strictly in the future. The ordinary call opts custody into the asset
/// (the vault must be funded by a plain asset transfer afterwards), and
/// deletion — receiver-only, gated on the time lock — sweeps the asset and
/// the remaining balance back out. The contract is deliberately immutable:
/// update and close-out are rejected unconditionally.
pub fn application() -> Application {
  Application {
    global_schema: StateSchema::new(3, 3),
    local_schema: StateSchema::new(3, 3),
    reject_when: None,
    on_create: on_create(),
    on_opt_in: Route::Allow(Handler::new(receiver_only(), vec![])),
    on_no_op: NoOpRoute::Single(on_setup()),
    on_close_out: Route::Reject,
    on_clear_state: Route::Allow(Handler::approve()),
    on_update: Route::Reject,
    on_delete: Route::Allow(on_delete()),
  }
}

fn on_create() -> Handler {
  Handler::new(
    Predicate::all([
      // the unlock timestamp must be at some point in the future
      Expr::latest_timestamp().lt(Expr::arg_uint(2)),
      // the creator must be the recipient of the locked funds
      Expr::this(TxnField::Sender).eq(Expr::arg(1)),
    ]),
    vec![
      Effect::GlobalPut {
        key: ASSET_ID_KEY.to_vec(),
        value: Expr::arg_uint(0),
      },
      Effect::GlobalPut {
        key: RECEIVER_KEY.to_vec(),
        value: Expr::arg(1),
      },
      Effect::GlobalPut {
        key: UNLOCK_TIME_KEY.to_vec(),
        value: Expr::arg_uint(2),
      },
    ],
  )
}

/// The setup call opts custody into the vaulted asset. Only the receiver
/// may run it, and only before the unlock time.
fn on_setup() -> Handler {
  Handler::new(
    Predicate::all([
      receiver_only(),
      Expr::latest_timestamp().lt(Expr::global(UNLOCK_TIME_KEY)),
    ]),
    vec![Effect::OptInAsset {
      asset: Expr::global(ASSET_ID_KEY),
    }],
  )
}

/// Deleting the vault is the release: rejected until the unlock time has
/// passed, then closes the whole asset holding and the remaining custody
/// balance to the receiver.
fn on_delete() -> Handler {
  Handler::new(
    Predicate::all([
      receiver_only(),
      Expr::global(UNLOCK_TIME_KEY).le(Expr::latest_timestamp()),
    ]),
    vec![
      Effect::AssetCloseTo {
        asset: Expr::global(ASSET_ID_KEY),
        receiver: Expr::global(RECEIVER_KEY),
      },
      Effect::CloseAccountTo {
        receiver: Expr::global(RECEIVER_KEY),
      },
    ],
  )
}

fn receiver_only() -> Predicate {
  Expr::this(TxnField::Sender).eq(Expr::global(RECEIVER_KEY))
}
