/// Kelly Criterion stake sizing on decimal odds.
///
/// The Kelly formula sizes a bet to maximise the expected logarithm of wealth,
/// which balances risk and reward optimally over the long run.
///
/// Decimal-odds form:
///   f* = (odds·p − 1) / (odds − 1)
/// where
///   odds = decimal odds offered (total return per unit staked)
///   p    = estimated probability of winning
///
/// We apply a *fractional* Kelly multiplier (0 < fraction ≤ 1) to reduce
/// variance at the cost of slightly lower expected growth, then cap the stake
/// at a fixed share of the bankroll regardless of how large the edge looks.

/// Full-Kelly fraction of bankroll. Returns `0.0` for degenerate quotes
/// (odds ≤ 1, probability outside [0, 1], non-finite input) and when the
/// bet has no edge.
pub fn kelly_fraction(win_prob: f64, odds: f64) -> f64 {
    if !win_prob.is_finite() || !odds.is_finite() {
        return 0.0;
    }
    if odds <= 1.0 || !(0.0..=1.0).contains(&win_prob) {
        return 0.0;
    }

    let f = (odds * win_prob - 1.0) / (odds - 1.0);
    if f <= 0.0 {
        return 0.0; // no edge
    }
    f
}

/// Fractional-Kelly stake in currency units, rounded to the minor unit.
///
/// # Arguments
/// * `bankroll` – Current bankroll.
/// * `win_prob` – Estimated probability that the bet wins (0.0–1.0).
/// * `odds`     – Decimal odds offered.
/// * `fraction` – Fractional Kelly multiplier (0.0–1.0).
pub fn kelly_stake(bankroll: f64, win_prob: f64, odds: f64, fraction: f64) -> f64 {
    if !bankroll.is_finite() || bankroll <= 0.0 || !fraction.is_finite() || fraction <= 0.0 {
        return 0.0;
    }
    round_minor(bankroll * kelly_fraction(win_prob, odds) * fraction)
}

/// Final stake: fractional Kelly, capped at `bankroll · max_bankroll_percent`.
///
/// Always within `[0, bankroll · max_bankroll_percent]`; never negative or NaN.
pub fn size_stake(
    bankroll: f64,
    win_prob: f64,
    odds: f64,
    fraction: f64,
    max_bankroll_percent: f64,
) -> f64 {
    let kelly = kelly_stake(bankroll, win_prob, odds, fraction);
    if kelly <= 0.0 || !max_bankroll_percent.is_finite() || max_bankroll_percent <= 0.0 {
        return 0.0;
    }
    let cap = bankroll * max_bankroll_percent.min(1.0);
    // Round the cap down so rounding can never push the stake above it.
    let cap = (cap * 100.0).floor() / 100.0;
    kelly.min(cap)
}

/// Round to two decimals (cents / centimes).
pub fn round_minor(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}
