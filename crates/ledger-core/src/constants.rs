pub const BYTE: usize = 8;
pub const HASH_SIZE: usize = 32;
pub const HASH_BITS: u32 = (HASH_SIZE * BYTE) as u32;

/// Difficulty used when nothing else is configured.
pub const TARGET_BITS: u32 = 16;
/// `3 << (256 - bits)` only fits in 256 bits, and stays non-zero, inside this range.
pub const MIN_TARGET_BITS: u32 = 2;
pub const MAX_TARGET_BITS: u32 = HASH_BITS - 1;
pub const MAX_NONCE: u64 = i64::MAX as u64;

/// Amount minted by the genesis coinbase.
pub const SUBSIDY: u64 = 10;
pub const MAX_APPEND_ATTEMPTS: usize = 8;
