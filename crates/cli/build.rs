use std::process::Command;

/// Short commit hash for `fcalc --version`. Release tarballs have no .git,
/// so packagers can pass FIELDCALC_BUILD_COMMIT instead.
fn commit_hash() -> String {
    if let Ok(hash) = std::env::var("FIELDCALC_BUILD_COMMIT") {
        return hash;
    }

    Command::new("git")
        .args(["rev-parse", "--short=7", "HEAD"])
        .output()
        .ok()
        .filter(|output| output.status.success())
        .and_then(|output| String::from_utf8(output.stdout).ok())
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn main() {
    println!("cargo:rerun-if-changed=../../.git/HEAD");
    println!("cargo:rerun-if-changed=../../.git/refs/heads");
    println!("cargo:rerun-if-env-changed=FIELDCALC_BUILD_COMMIT");

    println!("cargo:rustc-env=FCALC_COMMIT={}", commit_hash());

    let target = std::env::var("TARGET").unwrap_or_else(|_| "unknown".to_string());
    println!("cargo:rustc-env=FCALC_TARGET={}", target);
}
