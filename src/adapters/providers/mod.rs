mod kuaidaili;
mod shenlong;

pub use kuaidaili::KuaidailiProvider;
pub use shenlong::ShenlongProvider;

/// First line of a vendor response body, shortened for error messages.
pub(crate) fn excerpt(body: &str) -> String {
    let line = body.lines().next().unwrap_or("").trim();
    if line.chars().count() > 120 {
        let mut cut: String = line.chars().take(120).collect();
        cut.push_str("...");
        cut
    } else {
        line.to_string()
    }
}
