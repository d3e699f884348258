//! Process exit codes. Part of the CLI contract; scripts depend on them.

pub const SUCCESS: i32 = 0; // Config valid, request allowed, signature verified
pub const SIGNATURE_INVALID: i32 = 1; // Signature does not verify with the trusted key
pub const CONFIG_ERROR: i32 = 2; // Unreadable or invalid config, request or input file
pub const DENIED: i32 = 3; // Dry-run request was denied by the pipeline
