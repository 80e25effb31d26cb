#![allow(dead_code, unused_imports)]

use std::io::Write;

use tempfile::NamedTempFile;

pub use taskchain_test_utils::builders;
pub use taskchain_test_utils::fake_executor;
pub use taskchain_test_utils::{init_tracing, sh_executor, wait_until};

/// Write `contents` to a temporary `.toml` file that lives as long as the
/// returned handle.
pub fn write_config(contents: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .unwrap();
    write!(file, "{contents}").unwrap();
    file
}
