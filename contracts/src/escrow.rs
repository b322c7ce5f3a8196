//! Stateless escrow: a bare predicate attached as the logic signature of
//! an escrow account. No application state exists; the predicate alone
//! decides whether a group may spend from the account.

use covenant_primitives::{
  Address,
  Expr,
  Predicate,
  Slot,
  TxnField,
  TxnKindTag,
};

/// Seed payment the client locks into the escrow alongside the asset.
pub const FUND_AMOUNT: u64 = 300_000;

/// Builds the escrow predicate for one client.
///
/// Two group shapes are authorized. When the first transaction is sent by
/// the client, the group must be the funding shape: seed payment into the
/// escrow, the escrow's zero-amount self opt-in, and the asset transfer
/// from the client. Any other sender selects the claim shape, valid only
/// from `unlock_time` on: close the asset and then the remaining balance
/// back to the client.
pub fn lock_escrow(client: Address, unlock_time: u64) -> Predicate {
  let fund = Predicate::all([
    Expr::group_size().eq(Expr::uint(3)),
    // seed with funds
    Predicate::kind_is(Slot::Index(0), TxnKindTag::Payment),
    Expr::gtxn(0, TxnField::Sender).eq(Expr::address(client)),
    Expr::gtxn(0, TxnField::Amount).eq(Expr::uint(FUND_AMOUNT)),
    Expr::gtxn(0, TxnField::CloseRemainderTo).eq(Expr::ZeroAddress),
    // opt the escrow into the asset
    Predicate::kind_is(Slot::Index(1), TxnKindTag::AssetTransfer),
    Expr::gtxn(1, TxnField::AssetAmount).eq(Expr::uint(0)),
    Expr::gtxn(1, TxnField::AssetReceiver)
      .eq(Expr::gtxn(1, TxnField::Sender)),
    Expr::gtxn(1, TxnField::AssetReceiver)
      .eq(Expr::gtxn(0, TxnField::Receiver)),
    // move the asset from the client into the escrow
    Predicate::kind_is(Slot::Index(2), TxnKindTag::AssetTransfer),
    Expr::gtxn(2, TxnField::AssetReceiver)
      .eq(Expr::gtxn(0, TxnField::Receiver)),
    Expr::gtxn(2, TxnField::Sender).eq(Expr::gtxn(0, TxnField::Sender)),
    Expr::gtxn(2, TxnField::AssetCloseTo).eq(Expr::ZeroAddress),
    Expr::gtxn(2, TxnField::XferAsset).eq(Expr::gtxn(1, TxnField::XferAsset)),
  ]);

  let claim = Predicate::all([
    Expr::group_size().eq(Expr::uint(2)),
    Expr::latest_timestamp().ge(Expr::uint(unlock_time)),
    // close the asset back to the client
    Predicate::kind_is(Slot::Index(0), TxnKindTag::AssetTransfer),
    Expr::gtxn(0, TxnField::AssetCloseTo).eq(Expr::address(client)),
    Expr::gtxn(0, TxnField::AssetAmount).eq(Expr::uint(0)),
    // then close the remaining balance back to the client
    Predicate::kind_is(Slot::Index(1), TxnKindTag::Payment),
    Expr::gtxn(1, TxnField::Amount).eq(Expr::uint(0)),
    Expr::gtxn(1, TxnField::CloseRemainderTo).eq(Expr::address(client)),
  ]);

  Predicate::any([
    Expr::gtxn(0, TxnField::Sender)
      .eq(Expr::address(client))
      .and(fund),
    Expr::gtxn(0, TxnField::Sender)
      .ne(Expr::address(client))
      .and(claim),
  ])
}
