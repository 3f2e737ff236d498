// =============================================================================
// Application Identity
// =============================================================================

/// Application name in title case (for display and platform directories)
pub const APP_NAME: &str = "ClawDeck";

/// Application name in lowercase (for paths and identifiers)
pub const APP_NAME_LOWER: &str = "clawdeck";

/// Unix-style dotfile folder name
pub const APP_DOT_FOLDER: &str = ".clawdeck";

// =============================================================================
// Environment Variables
// =============================================================================

/// Environment variable for server host
pub const ENV_HOST: &str = "CLAWDECK_HOST";

/// Environment variable for server port
pub const ENV_PORT: &str = "CLAWDECK_PORT";

/// Environment variable for log level/filter
pub const ENV_LOG: &str = "CLAWDECK_LOG";

/// Environment variable to override data directory
pub const ENV_DATA_DIR: &str = "CLAWDECK_DATA_DIR";

// =============================================================================
// Server Defaults
// =============================================================================

/// Default server host
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default server port (OTLP ingestion and query API share it)
pub const DEFAULT_PORT: u16 = 5317;

/// Maximum OTLP request body size in bytes
pub const OTLP_BODY_LIMIT: usize = 16 * 1024 * 1024;

// =============================================================================
// Embedded Store
// =============================================================================

/// Store filename inside the duckdb data subdirectory
pub const STORE_DB_FILENAME: &str = "clawdeck.duckdb";

/// Default rows per backfill batch
pub const DEFAULT_BACKFILL_LIMIT: i64 = 500;

// =============================================================================
// Pagination Limits
// =============================================================================

/// Generic listings (spans, traces, signal records)
pub const LIST_DEFAULT_LIMIT: i64 = 100;
pub const LIST_MAX_LIMIT: i64 = 500;

/// Session overview
pub const OVERVIEW_DEFAULT_LIMIT: i64 = 50;
pub const OVERVIEW_MAX_LIMIT: i64 = 200;

/// Session timeline
pub const TIMELINE_DEFAULT_LIMIT: i64 = 200;
pub const TIMELINE_MAX_LIMIT: i64 = 1000;

/// Rows returned in the ingest-summary "most recent" list
pub const INGEST_SUMMARY_RECENT: i64 = 10;
