//! Exit code registry for `licita`.
//!
//! Single source of truth. Scripts and cron wrappers branch on these, so a
//! code never changes meaning once released.
//!
//! | Code | Meaning                                                  |
//! |------|----------------------------------------------------------|
//! | 0    | Success                                                  |
//! | 1    | General error                                            |
//! | 2    | Usage error (bad flags, bad config)                      |
//! | 3    | File or directory error                                  |
//! | 4    | Portal export header does not match the expected schema  |
//! | 5    | Portal query failed after retries                        |
//! | 6    | Report folder sync failed                                |
//! | 7    | A page stayed at the cap after splitting (`--strict-cap`) |

// =============================================================================
// General (0-3)
// =============================================================================

/// Run completed.
pub const EXIT_SUCCESS: u8 = 0;

/// Unclassified failure.
pub const EXIT_ERROR: u8 = 1;

/// Invalid arguments or configuration.
pub const EXIT_USAGE: u8 = 2;

/// Data directory missing, cache or report unreadable or unwritable.
pub const EXIT_IO: u8 = 3;

// =============================================================================
// Pipeline (4-7)
// =============================================================================

/// Export header unknown even after renames. The portal changed its format.
pub const EXIT_SCHEMA: u8 = 4;

/// Driver failed, or kept failing through every retry.
pub const EXIT_FETCH: u8 = 5;

/// Sync client missing or exited non-zero.
pub const EXIT_SYNC: u8 = 6;

/// Some rows may be missing: a single-day page came back at the cap.
pub const EXIT_CAPPED: u8 = 7;
