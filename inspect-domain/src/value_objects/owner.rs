// Owner token value object helpers

/// Prefix shared by every persistent (64-bit) account id.
pub const PERSISTENT_ACCOUNT_PREFIX: &str = "7656";

/// Owner tokens are either persistent account ids or market listing ids.
pub fn is_persistent_account(owner: &str) -> bool {
    owner.starts_with(PERSISTENT_ACCOUNT_PREFIX)
}
