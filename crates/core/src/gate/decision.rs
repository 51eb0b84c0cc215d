//! Per-request interception decision.
//!
//! A pure function of HTTP method and URL path. The excluded-area check wins
//! over everything else: a path carrying the excluded marker is never touched,
//! whatever its method or other markers.

use super::GateConfig;

/// Classification outcome for one outbound request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterceptDecision {
    /// Never intercepted; the request bypasses the gate entirely.
    Excluded,
    /// Not excluded, but not eligible for caching either.
    Passthrough,
    /// Eligible for the network-first-with-cache-fallback strategy.
    Managed,
}

/// Classify a request by method and path.
///
/// The excluded marker matches case-insensitively anywhere in the path; the
/// managed markers match as exact segments, upper-case role directories as
/// deployed.
pub fn classify(config: &GateConfig, method: &str, pathname: &str) -> InterceptDecision {
    if pathname.to_ascii_lowercase().contains(&config.excluded_marker.to_ascii_lowercase()) {
        return InterceptDecision::Excluded;
    }

    if method != "GET" {
        return InterceptDecision::Passthrough;
    }

    if !config.managed_markers.iter().any(|marker| pathname.contains(marker.as_str())) {
        return InterceptDecision::Passthrough;
    }

    InterceptDecision::Managed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> GateConfig {
        GateConfig {
            generation: "canemap-offline-v2".to_string(),
            offline_pages: Vec::new(),
            excluded_marker: "handler".to_string(),
            managed_markers: ["/Worker/", "/Driver/", "/Common/"].map(String::from).to_vec(),
        }
    }

    #[test]
    fn test_excluded_any_case() {
        let config = config();
        assert_eq!(classify(&config, "GET", "/frontend/Handler/lobby.html"), InterceptDecision::Excluded);
        assert_eq!(classify(&config, "GET", "/frontend/HANDLER/lobby.html"), InterceptDecision::Excluded);
        assert_eq!(classify(&config, "GET", "/backend/handler/worker.js"), InterceptDecision::Excluded);
    }

    #[test]
    fn test_excluded_matches_bare_substring() {
        // the marker is a substring match, not a segment match
        let config = config();
        assert_eq!(classify(&config, "GET", "/backend/Common/error-handler.js"), InterceptDecision::Excluded);
    }

    #[test]
    fn test_excluded_wins_over_method_and_markers() {
        let config = config();
        assert_eq!(classify(&config, "POST", "/frontend/Handler/submit"), InterceptDecision::Excluded);
        assert_eq!(classify(&config, "GET", "/Worker/Handler/page.html"), InterceptDecision::Excluded);
    }

    #[test]
    fn test_non_get_passthrough() {
        let config = config();
        for method in ["POST", "PUT", "DELETE", "PATCH", "HEAD", "OPTIONS"] {
            assert_eq!(classify(&config, method, "/frontend/Worker/Workers.html"), InterceptDecision::Passthrough);
        }
    }

    #[test]
    fn test_unmarked_get_passthrough() {
        let config = config();
        assert_eq!(classify(&config, "GET", "/frontend/lobby.html"), InterceptDecision::Passthrough);
        assert_eq!(classify(&config, "GET", "/frontend/SRA/reports.html"), InterceptDecision::Passthrough);
        assert_eq!(classify(&config, "GET", "/"), InterceptDecision::Passthrough);
    }

    #[test]
    fn test_managed_markers_are_case_sensitive() {
        // lower-case role directories do not exist in the deployment
        let config = config();
        assert_eq!(classify(&config, "GET", "/frontend/worker/Workers.html"), InterceptDecision::Passthrough);
        assert_eq!(classify(&config, "GET", "/frontend/DRIVER/x.html"), InterceptDecision::Passthrough);
    }

    #[test]
    fn test_each_managed_area() {
        let config = config();
        assert_eq!(classify(&config, "GET", "/frontend/Worker/Workers.html"), InterceptDecision::Managed);
        assert_eq!(classify(&config, "GET", "/frontend/Driver/Driver_Dashboard.html"), InterceptDecision::Managed);
        assert_eq!(classify(&config, "GET", "/backend/Common/ui-popup.js"), InterceptDecision::Managed);
    }
}
