//! Counter ledger: coupon usage and referral credits
//!
//! `Coupon.used_count` and `User.referral_credits` are accumulators. Each
//! change is written together with a [`CounterEntry`] so the scalar can be
//! audited against its history.

use serde::{Deserialize, Serialize};
use shared::types::Timestamp;

use crate::orders::storage::{Ledger, OrderStorage, StorageResult, StoreRead};
use crate::orders::traits::{CommandContext, OrderError};

/// Why a counter moved
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CounterReason {
    CouponApplied,
    CouponReleased,
    ReferralConsumed,
}

/// One movement of a counter
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CounterEntry {
    /// `coupon:{code}` or `referral:{user_id}`
    pub counter: String,
    pub delta: i64,
    pub reason: CounterReason,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<u64>,
    pub value_after: i64,
    pub created_at: Timestamp,
}

pub fn coupon_counter(code: &str) -> String {
    format!("coupon:{code}")
}

pub fn referral_counter(user_id: &str) -> String {
    format!("referral:{user_id}")
}

/// Count one use of a coupon
///
/// Refuses to go past `usage_limit`, so two checkouts racing for the last
/// use cannot both commit.
pub fn apply_coupon_usage(
    ctx: &CommandContext<'_>,
    code: &str,
    order_id: u64,
) -> Result<u32, OrderError> {
    let mut coupon = ctx
        .txn()
        .coupon(code)?
        .ok_or_else(|| OrderError::InvalidCoupon(code.to_string()))?;
    if coupon.used_count >= coupon.usage_limit {
        return Err(OrderError::CouponLimitReached(code.to_string()));
    }
    coupon.used_count += 1;
    ctx.storage().put_coupon(ctx.txn(), &coupon)?;

    append(
        ctx,
        coupon_counter(code),
        1,
        CounterReason::CouponApplied,
        order_id,
        i64::from(coupon.used_count),
    )?;
    Ok(coupon.used_count)
}

/// Give a use back after its order was cancelled
///
/// Saturates at zero; a coupon deleted since the order was placed is
/// skipped with a warning.
pub fn release_coupon_usage(
    ctx: &CommandContext<'_>,
    code: &str,
    order_id: u64,
) -> Result<u32, OrderError> {
    let Some(mut coupon) = ctx.txn().coupon(code)? else {
        tracing::warn!(code = %code, order_id, "Coupon missing on release, skipping");
        return Ok(0);
    };
    if coupon.used_count == 0 {
        tracing::warn!(code = %code, order_id, "Coupon usage already at zero");
        return Ok(0);
    }
    coupon.used_count -= 1;
    ctx.storage().put_coupon(ctx.txn(), &coupon)?;

    append(
        ctx,
        coupon_counter(code),
        -1,
        CounterReason::CouponReleased,
        order_id,
        i64::from(coupon.used_count),
    )?;
    Ok(coupon.used_count)
}

/// Use up one referral credit
pub fn consume_referral_credit(
    ctx: &CommandContext<'_>,
    user_id: &str,
    order_id: u64,
) -> Result<u32, OrderError> {
    let mut user = ctx.load_user(user_id)?;
    if user.referral_credits == 0 {
        return Err(OrderError::Validation(format!(
            "user {user_id} has no referral credit left"
        )));
    }
    user.referral_credits -= 1;
    ctx.storage().put_user(ctx.txn(), &user)?;

    append(
        ctx,
        referral_counter(user_id),
        -1,
        CounterReason::ReferralConsumed,
        order_id,
        i64::from(user.referral_credits),
    )?;
    Ok(user.referral_credits)
}

fn append(
    ctx: &CommandContext<'_>,
    counter: String,
    delta: i64,
    reason: CounterReason,
    order_id: u64,
    value_after: i64,
) -> Result<(), OrderError> {
    let entry = CounterEntry {
        counter,
        delta,
        reason,
        order_id: Some(order_id),
        value_after,
        created_at: ctx.now(),
    };
    ctx.storage()
        .append_ledger_row(ctx.txn(), Ledger::Counter, &entry.counter, &entry)?;
    Ok(())
}

/// Movements of one counter, oldest first
pub fn history(storage: &OrderStorage, counter: &str) -> StorageResult<Vec<CounterEntry>> {
    storage.ledger_rows(Ledger::Counter, counter)
}
