//! Rounding and window helpers shared by the strategies.

use totalizer_traits::Countby;

/// Fixed margin added to the filter-derived pending window.
pub const PENDING_MARGIN_MS: u32 = 500;

/// Round `v` to the display countby: nearest multiple of the increment, then
/// to `decimals` places. A non-positive or non-finite increment leaves `v` as is.
#[inline]
pub fn round_to_countby(v: f32, countby: Countby) -> f32 {
    let inc = countby.increment;
    if !inc.is_finite() || inc <= 0.0 || !v.is_finite() {
        return v;
    }
    let stepped = (v / inc).round() * inc;
    let scale = 10f32.powi(i32::from(countby.decimals));
    let scaled = stepped * scale;
    if !scaled.is_finite() {
        return stepped;
    }
    scaled.round() / scale
}

/// Debounce window for a manual command: the configured time, but never shorter
/// than three filter intervals plus [`PENDING_MARGIN_MS`].
#[inline]
pub fn pending_window_ms(pending_ms: u32, filter_interval_ms: u32) -> u32 {
    let floor = filter_interval_ms
        .saturating_mul(3)
        .saturating_add(PENDING_MARGIN_MS);
    pending_ms.max(floor)
}
