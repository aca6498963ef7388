//! Text rendering for container diagnostics.
//!
//! Error messages produced by the container name types by their full
//! Rust paths, which quickly become unreadable once generics and trait
//! objects are involved. The helpers here shorten those names and lay
//! out dependency chains.

/// Joins a dependency path with arrows.
///
/// # Examples
/// ```
/// use anbar_support::rendering::render_chain;
///
/// let path = ["Mailer", "Smtp", "Config", "Mailer"];
/// assert_eq!(render_chain(&path), "Mailer → Smtp → Config → Mailer");
/// ```
pub fn render_chain(chain: &[impl AsRef<str>]) -> String {
    chain
        .iter()
        .map(|s| s.as_ref())
        .collect::<Vec<_>>()
        .join(" → ")
}

/// One row of a lifetime-annotated chain.
#[derive(Debug, Clone)]
pub struct ChainEntry {
    /// Display name of the service
    pub type_name: String,
    /// Lifetime label, e.g. `Singleton`
    pub lifetime: String,
}

impl ChainEntry {
    pub fn new(type_name: impl Into<String>, lifetime: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            lifetime: lifetime.into(),
        }
    }
}

/// Renders a chain top-down with each service's lifetime, e.g.
///
/// ```text
/// [Singleton] ReportJob
///             ↓
/// [Transient] Formatter
///             ↓
/// [Scoped   ] RequestContext
/// ```
pub fn render_lifetime_chain(entries: &[ChainEntry]) -> String {
    let width = entries.iter().map(|e| e.lifetime.len()).max().unwrap_or(0);
    let mut out = String::new();

    for (i, entry) in entries.iter().enumerate() {
        if i > 0 {
            out.push_str(&" ".repeat(width + 3));
            out.push_str("↓\n");
        }
        out.push_str(&format!(
            "[{:<width$}] {}\n",
            entry.lifetime,
            entry.type_name,
            width = width,
        ));
    }

    out
}

/// Strips module paths from every segment of a type name.
///
/// ```
/// use anbar_support::rendering::shorten_type_name;
///
/// assert_eq!(shorten_type_name("shop::billing::Invoice"), "Invoice");
/// assert_eq!(
///     shorten_type_name("alloc::sync::Arc<dyn shop::billing::Ledger>"),
///     "Arc<dyn Ledger>"
/// );
/// ```
pub fn shorten_type_name(full_name: &str) -> String {
    let mut result = String::with_capacity(full_name.len());
    let mut segment = String::new();
    let mut chars = full_name.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            ':' if chars.peek() == Some(&':') => {
                chars.next();
                segment.clear();
            }
            '<' | '>' | ',' | ' ' | '(' | ')' | '[' | ']' | ';' | '&' => {
                result.push_str(&segment);
                result.push(ch);
                segment.clear();
            }
            _ => segment.push(ch),
        }
    }

    result.push_str(&segment);
    result
}

/// Picks registered names that look like a misspelling of `requested`.
///
/// Candidates are ranked by substring containment first, then by the
/// length of the common prefix of their short names. At most
/// `max_suggestions` names are returned, best first.
pub fn suggest_similar(requested: &str, available: &[&str], max_suggestions: usize) -> Vec<String> {
    if max_suggestions == 0 {
        return Vec::new();
    }

    let wanted = shorten_type_name(requested).to_lowercase();

    let mut scored: Vec<(&str, usize)> = available
        .iter()
        .filter(|&&name| name != requested)
        .filter_map(|&name| {
            let short = shorten_type_name(name).to_lowercase();

            if short.contains(&wanted) || wanted.contains(&short) {
                return Some((name, 100));
            }

            let common = short
                .chars()
                .zip(wanted.chars())
                .take_while(|(a, b)| a == b)
                .count();

            (common >= 3).then_some((name, common * 10))
        })
        .collect();

    scored.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    scored
        .into_iter()
        .take(max_suggestions)
        .map(|(name, _)| name.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_of_one() {
        assert_eq!(render_chain(&["Only"]), "Only");
    }

    #[test]
    fn empty_chain() {
        let chain: [&str; 0] = [];
        assert_eq!(render_chain(&chain), "");
    }

    #[test]
    fn shorten_keeps_generic_structure() {
        assert_eq!(
            shorten_type_name("alloc::sync::Arc<core::option::Option<app::Session>>"),
            "Arc<Option<Session>>"
        );
    }

    #[test]
    fn shorten_plain_name() {
        assert_eq!(shorten_type_name("u64"), "u64");
    }

    #[test]
    fn suggestions_catch_typos() {
        let available = [
            "shop::OrderService",
            "shop::OrderRepository",
            "shop::Mailer",
        ];

        let suggestions = suggest_similar("shop::OrderServise", &available, 2);
        assert_eq!(suggestions.len(), 2);
        assert!(suggestions.iter().all(|s| s.contains("Order")));
    }

    #[test]
    fn suggestions_skip_unrelated_names() {
        let available = ["shop::Mailer"];
        assert!(suggest_similar("shop::Invoice", &available, 3).is_empty());
    }

    #[test]
    fn suggestions_respect_limit_zero() {
        let available = ["shop::Mailer"];
        assert!(suggest_similar("shop::Mailer2", &available, 0).is_empty());
    }

    #[test]
    fn lifetime_chain_layout() {
        let rendered = render_lifetime_chain(&[
            ChainEntry::new("ReportJob", "Singleton"),
            ChainEntry::new("RequestContext", "Scoped"),
        ]);

        assert_eq!(
            rendered,
            "[Singleton] ReportJob\n            ↓\n[Scoped   ] RequestContext\n"
        );
    }
}
