//! Utility functions.

use tokio::signal;
use tracing::{info, warn};

/// Resolve once Ctrl+C is received.
///
/// If the handler cannot be installed the future never resolves, so the
/// caller keeps running until its own exit condition.
pub async fn shutdown_signal() {
    match signal::ctrl_c().await {
        Ok(()) => info!("Received shutdown signal (Ctrl+C)"),
        Err(e) => {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    }
}

/// Truncate `s` to at most `max` characters, appending an ellipsis when cut.
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_keeps_short_strings() {
        assert_eq!(truncate("NYC Mayor", 20), "NYC Mayor");
    }

    #[test]
    fn truncate_cuts_on_char_boundaries() {
        assert_eq!(truncate("Zohran Mamdani", 6), "Zohra…");
        assert_eq!(truncate("🇻🇪🇻🇪🇻🇪", 2), "🇻…");
    }
}
