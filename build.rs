use std::process::Command;

/// Runs a git command and returns its trimmed stdout, or an empty string if git
/// is unavailable (e.g. building from a published crate).
fn git(args: &[&str]) -> String {
    Command::new("git")
        .args(args)
        .output()
        .ok()
        .and_then(|o| String::from_utf8(o.stdout).ok())
        .map(|s| s.trim().to_string())
        .unwrap_or_default()
}

fn main() {
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/index");

    let hash = git(&["rev-parse", "--short", "HEAD"]);
    let commit_date = git(&["log", "-1", "--format=%cd", "--date=format:%Y-%m-%d %H:%M"]);
    let is_dirty = !git(&["status", "--porcelain"]).is_empty();

    let version = env!("CARGO_PKG_VERSION");
    let tagged = git(&["tag", "--points-at", "HEAD"])
        .lines()
        .any(|tag| tag == version || tag == format!("v{}", version));

    println!("cargo:rustc-env=FOLIO_GIT_HASH={}", hash);
    println!("cargo:rustc-env=FOLIO_GIT_DATE={}", commit_date);
    println!("cargo:rustc-env=FOLIO_IS_RELEASE={}", tagged && !is_dirty);
}
