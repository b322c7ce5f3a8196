use {
  crate::{
    eval::{self, Env, Fault},
    execute::Error,
    ledger::{LocalPutError, Overlay, TransferError},
    State,
  },
  covenant_primitives::{
    Address,
    AppInstance,
    AssetHolding,
    AssetId,
    Effect,
    Expr,
    RoyaltyShare,
  },
};

/// Applies a handler's effect list in declared order.
///
/// Effects read expression inputs from the same environment the predicate
/// saw and move funds on the working overlay, so transfers that arrived
/// earlier in the group can fund payouts emitted here. Any failure aborts
/// the whole group; the emitter has no partial-success state.
pub(crate) fn apply<S: State>(
  env: &Env<'_, S>,
  instance: &AppInstance,
  effects: &[Effect],
  over: &mut Overlay<'_, S>,
) -> Result<(), Error> {
  let custody = instance.custody;
  for effect in effects {
    match effect {
      Effect::GlobalPut { key, value } => {
        let value = value_of(env, value)?;
        over.global_put(instance, key.clone(), value).map_err(
          |scope| Error::SchemaCapacityExceeded {
            app: instance.id,
            scope,
          },
        )?;
      }
      Effect::LocalPut {
        account,
        key,
        value,
      } => {
        let account = address_of(env, account)?;
        let value = value_of(env, value)?;
        over
          .local_put(instance, &account, key.clone(), value)
          .map_err(|e| match e {
            LocalPutError::Capacity(scope) => Error::SchemaCapacityExceeded {
              app: instance.id,
              scope,
            },
            LocalPutError::NotOptedIn(e) => Error::EffectFailed(e),
          })?;
      }
      Effect::Pay { receiver, amount } => {
        let receiver = address_of(env, receiver)?;
        let amount = uint_of(env, amount)?;
        over.debit(&custody, amount)?;
        over.credit(&receiver, amount)?;
      }
      Effect::CloseAccountTo { receiver } => {
        let receiver = address_of(env, receiver)?;
        let rest = over.balance(&custody);
        if rest > 0 {
          over.debit(&custody, rest)?;
          over.credit(&receiver, rest)?;
        }
      }
      Effect::AssetTransfer {
        asset,
        receiver,
        amount,
      } => {
        let asset = asset_of(env, asset)?;
        let receiver = address_of(env, receiver)?;
        let amount = uint_of(env, amount)?;
        over.move_asset(&custody, asset, amount, &receiver)?;
      }
      Effect::AssetCloseTo { asset, receiver } => {
        let asset = asset_of(env, asset)?;
        let receiver = address_of(env, receiver)?;
        // closing a holding custody never had is a no-op
        if let Some(holding) = over.holding(&custody, asset) {
          if holding.amount > 0 {
            over.move_asset(&custody, asset, holding.amount, &receiver)?;
          }
          over.close_holding(&custody, asset);
        }
      }
      Effect::OptInAsset { asset } => {
        let asset = asset_of(env, asset)?;
        let params = over
          .asset(asset)
          .ok_or(TransferError::UnknownAsset(asset))?;
        if over.holding(&custody, asset).is_none() {
          over.set_holding(&custody, asset, AssetHolding {
            amount: 0,
            frozen: params.default_frozen,
          });
        }
      }
      Effect::PayRoyalties { payment, payouts } => {
        let payment = uint_of(env, payment)?;
        for (receiver, share) in royalty_split(payment, payouts)? {
          if share > 0 {
            over.debit(&custody, share)?;
            over.credit(&receiver, share)?;
          }
        }
      }
    }
  }
  Ok(())
}

/// Splits a payment across shares as `floor(payment * ratio / Σratio)`.
///
/// The rounding remainder is intentionally not distributed; it stays in
/// custody. All arithmetic is checked.
fn royalty_split(
  payment: u64,
  payouts: &[RoyaltyShare],
) -> Result<Vec<(Address, u64)>, Error> {
  let total: u64 = payouts
    .iter()
    .try_fold(0u64, |acc, share| acc.checked_add(share.ratio))
    .ok_or(Error::ArithmeticOverflow)?;
  if total == 0 {
    return Err(Error::ArithmeticOverflow);
  }
  payouts
    .iter()
    .map(|share| {
      let amount = payment
        .checked_mul(share.ratio)
        .ok_or(Error::ArithmeticOverflow)?
        / total;
      Ok((share.receiver, amount))
    })
    .collect()
}

fn value_of<S: State>(
  env: &Env<'_, S>,
  expr: &Expr,
) -> Result<covenant_primitives::Value, Error> {
  eval::expr(env, expr).map_err(|fault| match fault {
    Fault::Math => Error::ArithmeticOverflow,
    _ => Error::EffectFailed(TransferError::MissingValue),
  })
}

fn uint_of<S: State>(env: &Env<'_, S>, expr: &Expr) -> Result<u64, Error> {
  value_of(env, expr)?
    .as_uint()
    .ok_or(Error::EffectFailed(TransferError::MissingValue))
}

fn address_of<S: State>(
  env: &Env<'_, S>,
  expr: &Expr,
) -> Result<Address, Error> {
  value_of(env, expr)?
    .as_address()
    .ok_or(Error::EffectFailed(TransferError::MissingValue))
}

fn asset_of<S: State>(
  env: &Env<'_, S>,
  expr: &Expr,
) -> Result<AssetId, Error> {
  Ok(AssetId(uint_of(env, expr)?))
}

#[cfg(test)]
mod tests {
  use {
    super::royalty_split,
    covenant_primitives::{Address, RoyaltyShare},
  };

  fn shares(ratios: &[u64]) -> Vec<RoyaltyShare> {
    ratios
      .iter()
      .enumerate()
      .map(|(i, ratio)| RoyaltyShare {
        receiver: Address::new([i as u8 + 1; 32]),
        ratio: *ratio,
      })
      .collect()
  }

  #[test]
  fn split_rounds_down_and_never_exceeds_payment() {
    for payment in [0u64, 1, 99_999, 100_000, 1_000_000] {
      for ratios in [&[60, 40][..], &[1, 1, 1], &[7, 11, 13]] {
        let split = royalty_split(payment, &shares(ratios)).unwrap();
        let distributed: u64 = split.iter().map(|(_, v)| v).sum();
        assert!(distributed <= payment);
      }
    }
  }

  #[test]
  fn split_matches_documented_scenario() {
    // 100,000 at ratios 60/40 pays out 60,000 and 40,000 exactly
    let split = royalty_split(100_000, &shares(&[60, 40])).unwrap();
    assert_eq!(split[0].1, 60_000);
    assert_eq!(split[1].1, 40_000);
  }

  #[test]
  fn split_leaves_remainder_uncollected() {
    let split = royalty_split(100, &shares(&[1, 1, 1])).unwrap();
    assert_eq!(split.iter().map(|(_, v)| v).sum::<u64>(), 99);
  }

  #[test]
  fn split_rejects_on_overflow() {
    assert!(royalty_split(u64::MAX, &shares(&[1000])).is_err());
  }
}
