//! Centralized constants for the fakeloc engine
//!
//! Preference keys and their documented defaults are shared by the manager
//! (writer) and every hooked process (reader), so both sides must agree on
//! the values below.

// ============================================================================
// IDENTITY
// ============================================================================

/// Package identifier of the manager application.
/// The activation gate never installs hooks in a process with this identifier.
pub const MANAGER_PACKAGE_NAME: &str = "io.github.fakeloc.manager";

/// Directory under the platform data dir that holds the preferences file
pub const APP_DIR: &str = "fakeloc";

/// Preferences file written by the manager and read by target processes
pub const PREFS_FILE_NAME: &str = "fakeloc_prefs.toml";

/// Upper bound on the preferences file size.
/// Unit: bytes
/// Larger files are treated as unreadable and every key resolves to its default.
pub const MAX_PREFS_FILE_BYTES: u64 = 1024 * 1024;

// ============================================================================
// PREFERENCE KEYS
// ============================================================================

pub const KEY_IS_PLAYING: &str = "is_playing";
pub const KEY_USE_ACCURACY: &str = "use_accuracy";
pub const KEY_ACCURACY: &str = "accuracy";
pub const KEY_USE_ALTITUDE: &str = "use_altitude";
pub const KEY_ALTITUDE: &str = "altitude";
pub const KEY_USE_RANDOMIZE: &str = "use_randomize";
pub const KEY_RANDOMIZE_RADIUS: &str = "randomize_radius";
pub const KEY_LAST_CLICKED_LOCATION: &str = "last_clicked_location";
pub const KEY_FAVORITES: &str = "favorites";
pub const KEY_ACTIVE_BASE: &str = "active_base";

// ============================================================================
// PROVIDERS
// ============================================================================

/// Provider names whose enabled status is reported as on while spoofing.
/// Other providers answer with the device's real status.
pub const LOCATION_PROVIDERS: [&str; 4] = ["gps", "network", "fused", "passive"];

// ============================================================================
// DEFAULTS
// ============================================================================

/// Reported horizontal accuracy when `use_accuracy` is set but no value stored.
/// Unit: meters
pub const DEFAULT_ACCURACY: f64 = 0.0;

/// Reported altitude when `use_altitude` is set but no value stored.
/// Unit: meters
pub const DEFAULT_ALTITUDE: f64 = 0.0;

/// Randomization radius when `use_randomize` is set but no value stored.
/// Unit: meters
pub const DEFAULT_RANDOMIZE_RADIUS: f64 = 0.0;

// ============================================================================
// GEODESY
// ============================================================================

/// Mean Earth radius (IUGG).
/// Unit: meters
pub const EARTH_RADIUS_METERS: f64 = 6_371_008.8;

/// Number of hex characters kept from the SHA-256 digest for favorite ids
pub const FAVORITE_ID_LEN: usize = 16;
