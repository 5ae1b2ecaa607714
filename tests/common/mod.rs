use std::fs;
use std::path::PathBuf;

/// Unique preferences path per call so parallel tests never share a file
pub fn temp_prefs_path(suite: &str) -> PathBuf {
    use std::thread;
    use std::time::{SystemTime, UNIX_EPOCH};

    let mut base = std::env::temp_dir();
    base.push("fakeloc_tests");
    base.push(suite);

    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let tid = format!("{:?}", thread::current().id());
    base.push(format!("t_{nanos}_{tid}"));

    let _ = fs::create_dir_all(&base);
    base.join("fakeloc_prefs.toml")
}
