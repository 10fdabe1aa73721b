//! CLI Exit Code Registry
//!
//! Exit codes are part of the shell contract; scripts rely on them.
//!
//! | Code | Description                                           |
//! |------|-------------------------------------------------------|
//! | 0    | Success                                               |
//! | 1    | General error (unreadable data, failed write)         |
//! | 2    | CLI usage error (bad args, missing file, unknown key) |

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - rows or columns could not be loaded, output could not be
/// written.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing input files, unknown columns,
/// disabled features.
pub const EXIT_USAGE: u8 = 2;
