use std::process::Command;

fn main() {
    let version = env!("CARGO_PKG_VERSION");

    let profile = std::env::var("PROFILE").unwrap_or_default();

    let version_str = if profile == "release" {
        version.to_string()
    } else {
        let git_hash = Command::new("git")
            .args(["rev-parse", "--short", "HEAD"])
            .output()
            .ok()
            .filter(|output| output.status.success())
            .and_then(|output| String::from_utf8(output.stdout).ok())
            .map(|hash| hash.trim().to_string())
            .unwrap_or_else(|| "unknown".to_string());

        format!("{}+{}", version, git_hash)
    };

    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rustc-env=VERSION_STRING={}", version_str);
}
