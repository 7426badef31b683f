//! Amount reconciliation for captured payments.
//!
//! The provider reports gross, fee and net, but none of the three is
//! guaranteed to be present. The payer may also have paid a processing
//! surcharge on top of the intended top-up, so the amount credited to the
//! resident's trust balance follows the recorded intent, not the card charge.
//!
//! All arithmetic is `rust_decimal`; binary floats never touch money here.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::error::{AppError, Result};

use super::Capture;

/// Decimal places for the supported currencies.
const MONEY_DP: u32 = 2;

/// Reconciled view of one captured payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciledAmounts {
    /// What the payer's card was billed.
    pub gross: Decimal,
    /// Provider's processing fee.
    pub fee: Decimal,
    /// What actually reaches the facility's account.
    pub net: Decimal,
    /// What lands in the resident's trust balance.
    pub credited: Decimal,
}

/// Reconcile a capture into gross/fee/net/credited, in order of precedence:
///
/// - gross: reported gross, else the breakdown gross, else the originally
///   requested charge amount;
/// - fee: reported provider fee, else zero;
/// - net: reported net, else `gross - fee`;
/// - credited: the declared top-up when the order recorded one, else net.
pub fn reconcile(
    capture: &Capture,
    requested_charge: Option<Decimal>,
    declared_top_up: Option<Decimal>,
) -> Result<ReconciledAmounts> {
    let breakdown = capture.seller_receivable_breakdown.as_ref();

    let gross = capture
        .amount
        .as_ref()
        .map(|m| m.value)
        .or_else(|| breakdown.and_then(|b| b.gross_amount.as_ref().map(|m| m.value)))
        .or(requested_charge)
        .ok_or_else(|| {
            AppError::Provider(format!(
                "capture {} reports no gross amount and no charge was requested",
                capture.id
            ))
        })?
        .round_dp(MONEY_DP);

    let fee = breakdown
        .and_then(|b| b.paypal_fee.as_ref().map(|m| m.value))
        .unwrap_or(Decimal::ZERO)
        .round_dp(MONEY_DP);

    let net = breakdown
        .and_then(|b| b.net_amount.as_ref().map(|m| m.value))
        .unwrap_or(gross - fee)
        .round_dp(MONEY_DP);

    let credited = declared_top_up.unwrap_or(net).round_dp(MONEY_DP);

    Ok(ReconciledAmounts {
        gross,
        fee,
        net,
        credited,
    })
}

/// Card charge for a requested top-up: a 3% processing surcharge plus a fixed
/// 30-cent component, rounded to currency precision.
pub fn surcharged_charge(top_up: Decimal) -> Decimal {
    (dec!(1.03) * top_up + dec!(0.30)).round_dp(MONEY_DP)
}
