//! Shared constants used across the grid view crates.

/// Default height of a single grid row in pixels.
pub const DEFAULT_ROW_HEIGHT: f64 = 33.0;

/// Default amount of rows rendered above and below the middle row.
pub const DEFAULT_ROW_PADDING: usize = 16;

/// Default amount of rows requested per buffer chunk.
pub const DEFAULT_BUFFER_REQUEST_SIZE: usize = 40;

/// Maximum rows a multi-select range may span; the server rejects larger batches.
pub const DEFAULT_MULTI_SELECT_ROW_LIMIT: usize = 200;

/// Quiescence window for delayed scroll dispatch, in milliseconds.
pub const DEFAULT_SCROLL_FIRE_INTERVAL_MS: u64 = 100;

/// Scroll velocity (px/ms) under which a scroll event fires immediately.
pub const DEFAULT_SCROLL_VELOCITY_LIMIT: f64 = 2.5;

/// Smallest order step used to disambiguate colliding order keys.
pub const ORDER_EPSILON: &str = "0.00000000000000000001";

/// Field option order assigned to fields without explicit options.
pub const MAX_FIELD_OPTION_ORDER: u32 = 32767;
