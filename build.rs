use std::process::Command;

fn main() {
    let version = git_describe().unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string());
    println!("cargo:rustc-env=LEASEPOOL_VERSION={}", version);
}

fn git_describe() -> Option<String> {
    let candidates = [
        vec!["describe", "--tags", "--always", "--dirty"],
        vec!["rev-parse", "--short", "HEAD"],
    ];

    for args in &candidates {
        if let Ok(output) = Command::new("git").args(args).output() {
            if output.status.success() {
                let version = String::from_utf8_lossy(&output.stdout).trim().to_string();
                if !version.is_empty() {
                    return Some(version);
                }
            }
        }
    }

    None
}
