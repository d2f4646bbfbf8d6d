use std::process::Command;

/// Revision shown by `farm-cli --version`. `FARM_GIT_REV` in the build
/// environment wins over asking git, so packaged builds can pin it.
fn main() {
    println!("cargo:rerun-if-env-changed=FARM_GIT_REV");
    println!("cargo:rerun-if-changed=../../.git/HEAD");

    let rev = std::env::var("FARM_GIT_REV").ok().or_else(|| {
        let out = Command::new("git")
            .args(["describe", "--always", "--dirty"])
            .output()
            .ok()?;
        out.status
            .success()
            .then(|| String::from_utf8_lossy(&out.stdout).trim().to_owned())
    });
    let rev = rev.filter(|r| !r.is_empty()).unwrap_or_else(|| "untracked".to_owned());
    println!("cargo:rustc-env=FARM_GIT_REV={rev}");
}
