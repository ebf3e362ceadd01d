//! Small numeric helpers shared by the feed and the sequencer.

/// Polling period in milliseconds for a target rate in Hz. Zero Hz falls
/// back to 1 Hz rather than dividing by zero.
pub fn period_ms(hz: u32) -> u64 {
    1_000 / u64::from(hz.max(1))
}

/// Commanded move duration for the largest joint delta of a pose change,
/// clamped into the configured window.
pub fn move_duration_ms(delta_deg: f32, ms_per_degree: f32, min_ms: u32, max_ms: u32) -> u32 {
    let raw = (delta_deg.abs() * ms_per_degree).round();
    if !raw.is_finite() {
        return max_ms;
    }
    (raw as u32).clamp(min_ms, max_ms)
}
