pub const PROMPT: &'static [u8] = b"mish% ";

pub const MAX_COMMANDS: usize = 16;
pub const MAX_LINE_LEN: usize = 1024;

// Consecutive non-EINTR wait failures tolerated before a drain gives up.
pub const MAX_WAIT_FAILURES: usize = 8;

/// Exit status of a stage whose redirections or pipe wiring failed.
pub const STATUS_REDIRECT_FAILED: i32 = 125;
/// Exit status of a stage whose program exists but could not be executed.
pub const STATUS_CANNOT_EXECUTE: i32 = 126;
/// Exit status of a stage whose program could not be found.
pub const STATUS_NOT_FOUND: i32 = 127;
