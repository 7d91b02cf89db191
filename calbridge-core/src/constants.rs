/// Half-width of the removal scan window, in days, on each side of now.
pub const DEFAULT_SCAN_WINDOW_DAYS: i64 = 500;

/// Provider used when the config doesn't name one. Its binary,
/// `calbridge-provider-outlook`, is installed separately from this workspace.
pub const DEFAULT_PROVIDER: &str = "outlook";

/// Subject given to events whose record has no summary.
pub const NO_TITLE: &str = "(No title)";

/// Duration given to timed events whose record has no usable end.
pub const DEFAULT_EVENT_MINUTES: i64 = 60;

/// Error code the host reports when the caller lacks automation privileges.
pub const PRIVILEGE_ERROR_SIGNATURE: &str = "-10004";

/// Remedy printed alongside a privilege violation.
pub const PRIVILEGE_HINT: &str = "Grant your terminal app Automation permission to control the \
calendar application (System Settings → Privacy & Security → Automation).";
