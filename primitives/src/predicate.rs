use {
  crate::{Address, OnCompletion, Value},
  serde::{Deserialize, Serialize},
};

/// Ambient ledger facts injected once before evaluation starts.
///
/// Evaluation is a pure function of (group, state snapshot, context): there
/// is no other clock, no randomness and no I/O anywhere in the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Context {
  pub latest_timestamp: u64,
}

/// Selects a transaction within the group.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Slot {
  /// The transaction being validated.
  This,
  /// A sibling at a fixed position.
  Index(usize),
  /// The last transaction in the group.
  Last,
}

/// Readable fields of a transaction.
///
/// Reading a field off a transaction kind that does not carry it (for
/// example `Amount` of an asset transfer) is a missing value and fails the
/// containing predicate, it never reads as zero.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxnField {
  Sender,
  Fee,
  RekeyTo,
  Amount,
  Receiver,
  CloseRemainderTo,
  XferAsset,
  AssetAmount,
  AssetReceiver,
  AssetCloseTo,
  RevocationTarget,
  ApplicationId,
  NumArgs,
  NumAssets,
  ForeignAsset(usize),
}

/// Asset-level parameters readable as derived facts.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssetParamField {
  Manager,
  Freeze,
  Clawback,
  DefaultFrozen,
  Decimals,
  Total,
}

/// Transaction kind tags for group-shape assertions.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxnKindTag {
  Payment,
  AssetTransfer,
  ApplicationCall,
  AssetConfig,
  AssetDestroy,
}

/// A value-producing expression over the group, the state snapshot and the
/// evaluation context.
///
/// All arithmetic is checked: overflow and division by zero reject the
/// group instead of wrapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Expr {
  Const(Value),
  GroupSize,
  LatestTimestamp,
  ZeroAddress,
  /// The custody account of the application being called.
  CustodyAddress,
  /// The creator of the application being called.
  CreatorAddress,
  CurrentAppId,
  Txn(Slot, TxnField),
  /// Raw bytes of an application argument of the calling transaction.
  Arg(usize),
  /// An application argument decoded as a big-endian u64.
  ArgUint(usize),
  /// Global state of the application being called.
  Global(Vec<u8>),
  /// Local state of an account under the application being called.
  Local(Box<Expr>, Vec<u8>),
  /// Native-currency balance of an account.
  Balance(Box<Expr>),
  /// Units of an asset held by an account; missing unless opted in.
  AssetBalance(Box<Expr>, Box<Expr>),
  AssetParam(Box<Expr>, AssetParamField),
  Add(Box<Expr>, Box<Expr>),
  Sub(Box<Expr>, Box<Expr>),
  Mul(Box<Expr>, Box<Expr>),
  Div(Box<Expr>, Box<Expr>),
  Exp(Box<Expr>, Box<Expr>),
}

impl Expr {
  pub fn uint(v: u64) -> Self {
    Self::Const(Value::Uint(v))
  }

  pub fn bytes(b: impl Into<Vec<u8>>) -> Self {
    Self::Const(Value::Bytes(b.into()))
  }

  pub fn address(a: Address) -> Self {
    Self::Const(a.into())
  }

  pub fn group_size() -> Self {
    Self::GroupSize
  }

  pub fn latest_timestamp() -> Self {
    Self::LatestTimestamp
  }

  pub fn txn(slot: Slot, field: TxnField) -> Self {
    Self::Txn(slot, field)
  }

  pub fn this(field: TxnField) -> Self {
    Self::Txn(Slot::This, field)
  }

  pub fn gtxn(index: usize, field: TxnField) -> Self {
    Self::Txn(Slot::Index(index), field)
  }

  pub fn arg(index: usize) -> Self {
    Self::Arg(index)
  }

  pub fn arg_uint(index: usize) -> Self {
    Self::ArgUint(index)
  }

  pub fn global(key: impl Into<Vec<u8>>) -> Self {
    Self::Global(key.into())
  }

  pub fn local(account: Expr, key: impl Into<Vec<u8>>) -> Self {
    Self::Local(Box::new(account), key.into())
  }

  pub fn balance(account: Expr) -> Self {
    Self::Balance(Box::new(account))
  }

  pub fn asset_balance(account: Expr, asset: Expr) -> Self {
    Self::AssetBalance(Box::new(account), Box::new(asset))
  }

  pub fn asset_param(asset: Expr, field: AssetParamField) -> Self {
    Self::AssetParam(Box::new(asset), field)
  }

  pub fn add(self, rhs: Expr) -> Self {
    Self::Add(Box::new(self), Box::new(rhs))
  }

  pub fn sub(self, rhs: Expr) -> Self {
    Self::Sub(Box::new(self), Box::new(rhs))
  }

  pub fn mul(self, rhs: Expr) -> Self {
    Self::Mul(Box::new(self), Box::new(rhs))
  }

  pub fn div(self, rhs: Expr) -> Self {
    Self::Div(Box::new(self), Box::new(rhs))
  }

  pub fn exp(self, rhs: Expr) -> Self {
    Self::Exp(Box::new(self), Box::new(rhs))
  }

  pub fn eq(self, rhs: Expr) -> Predicate {
    Predicate::Term(Term::Eq(self, rhs))
  }

  pub fn ne(self, rhs: Expr) -> Predicate {
    Predicate::Term(Term::Ne(self, rhs))
  }

  pub fn lt(self, rhs: Expr) -> Predicate {
    Predicate::Term(Term::Lt(self, rhs))
  }

  pub fn le(self, rhs: Expr) -> Predicate {
    Predicate::Term(Term::Le(self, rhs))
  }

  pub fn gt(self, rhs: Expr) -> Predicate {
    Predicate::Term(Term::Gt(self, rhs))
  }

  pub fn ge(self, rhs: Expr) -> Predicate {
    Predicate::Term(Term::Ge(self, rhs))
  }

  /// Presence test: the only way a predicate can observe "no value"
  /// without failing.
  pub fn has_value(self) -> Predicate {
    Predicate::Term(Term::HasValue(self))
  }
}

/// A boolean leaf of a predicate tree.
///
/// Ordered comparisons apply to uints only; comparing values of different
/// kinds is a fault that fails the predicate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Term {
  Always,
  Eq(Expr, Expr),
  Ne(Expr, Expr),
  Lt(Expr, Expr),
  Le(Expr, Expr),
  Gt(Expr, Expr),
  Ge(Expr, Expr),
  HasValue(Expr),
  KindIs(Slot, TxnKindTag),
  CompletionIs(Slot, OnCompletion),
}

/// A boolean expression tree gating approval of a transaction group.
///
/// Evaluation short-circuits left to right: if a conjunction's earlier term
/// is false, later terms are not evaluated. This matters because some terms
/// presuppose existence — "has opted into the asset" must guard
/// "balance >= X".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Predicate {
  Term(Term),
  Not(Box<Predicate>),
  And(Box<Predicate>, Box<Predicate>),
  Or(Box<Predicate>, Box<Predicate>),
}

impl Predicate {
  /// Approves unconditionally.
  pub fn always() -> Self {
    Self::Term(Term::Always)
  }

  pub fn not(self) -> Self {
    Self::Not(Box::new(self))
  }

  pub fn and(self, rhs: Predicate) -> Self {
    Self::And(Box::new(self), Box::new(rhs))
  }

  pub fn or(self, rhs: Predicate) -> Self {
    Self::Or(Box::new(self), Box::new(rhs))
  }

  /// Folds a conjunct list into the binary tree, left to right.
  pub fn all(preds: impl IntoIterator<Item = Predicate>) -> Self {
    preds
      .into_iter()
      .reduce(Predicate::and)
      .unwrap_or_else(Predicate::always)
  }

  /// Folds a disjunct list into the binary tree, left to right.
  pub fn any(preds: impl IntoIterator<Item = Predicate>) -> Self {
    preds
      .into_iter()
      .reduce(Predicate::or)
      .unwrap_or_else(|| Predicate::always().not())
  }

  pub fn kind_is(slot: Slot, tag: TxnKindTag) -> Self {
    Self::Term(Term::KindIs(slot, tag))
  }

  pub fn completion_is(slot: Slot, oc: OnCompletion) -> Self {
    Self::Term(Term::CompletionIs(slot, oc))
  }
}
