use std::process::Command;

/// `git describe` of the workspace, or "unknown" outside a checkout.
fn describe(repo_root: &str) -> String {
    Command::new("git")
        .args(["-C", repo_root, "describe", "--always", "--dirty=-modified"])
        .output()
        .ok()
        .filter(|o| o.status.success())
        .map(|o| String::from_utf8_lossy(&o.stdout).trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

fn main() {
    let manifest_dir = std::env::var("CARGO_MANIFEST_DIR").unwrap_or_else(|_| ".".to_string());
    let repo_root = format!("{manifest_dir}/..");

    println!("cargo:rustc-env=NOTEWA_BUILD_SHA={}", describe(&repo_root));
    println!("cargo:rerun-if-changed={repo_root}/.git/HEAD");
}
