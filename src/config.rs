//! Recognized policy toggles (spec §1, §6): external, but their effects
//! are specified here since the dispatcher consumes them directly.

/// Dispatcher-wide policy. Defaults match spec §6 exactly.
#[derive(Debug, Clone, Copy)]
pub struct Config {
    /// Hex-encode the response body, two lowercase hex chars per byte.
    pub use_hex_encoding: bool,
    /// Create an account on first `loadAccount` if it doesn't exist yet
    /// (it is always created on `createAccount`, regardless of this flag).
    pub auto_create_account: bool,
    /// Compare the `Pass` parameter against the stored password and fail
    /// with `WrongPass` on mismatch.
    pub validate_password: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            use_hex_encoding: false,
            auto_create_account: true,
            validate_password: false,
        }
    }
}
