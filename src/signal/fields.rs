//! Raw field extraction and signal classification
//!
//! Alerts arrive as loosely formatted multi-line text. Each recognized field
//! has one line-oriented pattern; the first match in the text wins, and a
//! field that never matches is simply left out.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;

use crate::execution::intent::OrderKind;

/// Field patterns, applied in order against the full alert text.
///
/// The labels are the wire format emitted by the charting tool's alert
/// template and are matched case-sensitively.
fn field_patterns() -> &'static [(&'static str, Regex)] {
    static PATTERNS: OnceLock<Vec<(&'static str, Regex)>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            ("ticker", r"Segnale su (.+)"),
            ("time", r"Ora:\s*(.+)"),
            ("close_price", r"Prezzo chiusura:\s*(.+)"),
            ("action", r"Azione:\s*(.+)"),
            ("comment", r"Commento:\s*(.+)"),
            ("trade_id", r"id trade\s+(.+)"),
            ("size", r"size:\s*(.+)"),
            ("message", r"Message:\s+(.+)"),
        ]
        .into_iter()
        .map(|(name, pattern)| (name, Regex::new(pattern).expect("field pattern is valid")))
        .collect()
    })
}

/// Extract every recognized field from the alert text.
pub fn extract(text: &str) -> BTreeMap<String, String> {
    let mut fields = BTreeMap::new();
    for (name, pattern) in field_patterns() {
        if let Some(value) = pattern.captures(text).and_then(|caps| caps.get(1)) {
            fields.insert((*name).to_string(), value.as_str().trim().to_string());
        }
    }
    fields
}

/// Classify the signal from its extracted fields.
///
/// The uppercased `comment` is inspected first, then the uppercased
/// `message`: the first containing `CLOSE` wins, then the first containing
/// `OPEN`. Anything else is unrecognized and never executed.
pub fn classify(fields: &BTreeMap<String, String>) -> OrderKind {
    let comment = fields.get("comment").map(|s| s.to_uppercase()).unwrap_or_default();
    let message = fields.get("message").map(|s| s.to_uppercase()).unwrap_or_default();

    if comment.contains("CLOSE") || message.contains("CLOSE") {
        OrderKind::Close
    } else if comment.contains("OPEN") || message.contains("OPEN") {
        OrderKind::Open
    } else {
        OrderKind::Unrecognized
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_all_fields() {
        let text = "\
Segnale su SOLUSDT.P
Ora: 2024-06-12T08:00:00Z
Prezzo chiusura: 145.2
Azione: sell
Commento: Open Short
id trade abc-1
size: -20
Message: OPEN SHORT | TP: 140 | SL: 150";

        let fields = extract(text);

        assert_eq!(fields.get("ticker").map(String::as_str), Some("SOLUSDT.P"));
        assert_eq!(fields.get("time").map(String::as_str), Some("2024-06-12T08:00:00Z"));
        assert_eq!(fields.get("close_price").map(String::as_str), Some("145.2"));
        assert_eq!(fields.get("action").map(String::as_str), Some("sell"));
        assert_eq!(fields.get("comment").map(String::as_str), Some("Open Short"));
        assert_eq!(fields.get("trade_id").map(String::as_str), Some("abc-1"));
        assert_eq!(fields.get("size").map(String::as_str), Some("-20"));
        assert_eq!(
            fields.get("message").map(String::as_str),
            Some("OPEN SHORT | TP: 140 | SL: 150")
        );
    }

    #[test]
    fn test_first_match_wins() {
        let text = "Azione: buy\nAzione: sell";
        let fields = extract(text);
        assert_eq!(fields.get("action").map(String::as_str), Some("buy"));
    }

    #[test]
    fn test_absent_fields_are_omitted() {
        let fields = extract("Commento: Close All");
        assert_eq!(fields.len(), 1);
        assert!(fields.contains_key("comment"));
    }

    #[test]
    fn test_classify_close_case_insensitive() {
        let mut fields = BTreeMap::new();
        fields.insert("comment".to_string(), "close long".to_string());
        assert_eq!(classify(&fields), OrderKind::Close);
    }

    #[test]
    fn test_classify_open_from_message_only() {
        let mut fields = BTreeMap::new();
        fields.insert("message".to_string(), "OPEN LONG | TP: 1 | SL: 2".to_string());
        assert_eq!(classify(&fields), OrderKind::Open);
    }

    #[test]
    fn test_classify_close_beats_open() {
        let mut fields = BTreeMap::new();
        fields.insert("comment".to_string(), "reopen".to_string());
        fields.insert("message".to_string(), "close everything".to_string());
        assert_eq!(classify(&fields), OrderKind::Close);
    }

    #[test]
    fn test_classify_unrecognized() {
        let mut fields = BTreeMap::new();
        fields.insert("comment".to_string(), "hello world".to_string());
        assert_eq!(classify(&fields), OrderKind::Unrecognized);
    }

    #[test]
    fn test_classify_no_fields() {
        assert_eq!(classify(&BTreeMap::new()), OrderKind::Unrecognized);
    }
}
