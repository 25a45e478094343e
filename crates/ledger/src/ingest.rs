//! Inbound-message ingestion: sender allowlisting and drafting candidate
//! transactions from message text.
//!
//! The ingestor itself is pure; the facade inserts the drafted record and
//! fires the change notification.

use chrono::Utc;

use crate::extract::extract_amount;
use crate::transactions::{TransactionKind, TransactionRecord};
use crate::Owner;

/// Strips a sender identifier down to its digits and folds the `84` country
/// code prefix into the leading `0` of a domestic number.
pub fn normalize_sender(raw: &str) -> String {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    match digits.strip_prefix("84") {
        Some(rest) => format!("0{rest}"),
        None => digits,
    }
}

pub struct MessageIngestor {
    allowlist: Vec<String>,
}

impl MessageIngestor {
    /// Builds an ingestor from raw allowlisted sender identifiers. Entries
    /// that normalize to nothing are dropped.
    pub fn new(allowed_senders: impl IntoIterator<Item = String>) -> Self {
        let allowlist = allowed_senders
            .into_iter()
            .map(|s| normalize_sender(&s))
            .filter(|s| !s.is_empty())
            .collect();
        Self { allowlist }
    }

    /// Allowlist check by bidirectional substring containment of normalized
    /// identifiers, so a sender with or without country code matches the
    /// same entry. An empty allowlist matches nothing.
    pub fn is_allowed(&self, sender: &str) -> bool {
        let normalized = normalize_sender(sender);
        if normalized.is_empty() {
            return false;
        }
        self.allowlist
            .iter()
            .any(|entry| normalized.contains(entry) || entry.contains(&normalized))
    }

    /// Drafts an expense record from a message, or `None` when the sender is
    /// not allowlisted or no unambiguous amount can be extracted.
    pub fn draft(&self, owner: &Owner, sender: &str, body: &str) -> Option<TransactionRecord> {
        if !self.is_allowed(sender) {
            tracing::debug!("ignoring message from unknown sender");
            return None;
        }
        let amount = extract_amount(body)?;

        let preview: String = body.chars().take(50).collect();
        Some(TransactionRecord::new(
            owner.clone(),
            TransactionKind::Expense,
            -amount,
            Some(format!("SMS from {sender}: {preview}")),
            Some("other".to_string()),
            Some("Auto transaction".to_string()),
            Utc::now().timestamp_millis(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalization_strips_non_digits_and_country_code() {
        assert_eq!(normalize_sender("+84 90 123-4567"), "0901234567");
        assert_eq!(normalize_sender("0901234567"), "0901234567");
        assert_eq!(normalize_sender("VCB-Bank"), "");
    }

    #[test]
    fn allowlist_matches_with_and_without_country_code() {
        let ingestor = MessageIngestor::new(vec!["0901234567".to_string()]);
        assert!(ingestor.is_allowed("+84901234567"));
        assert!(ingestor.is_allowed("0901234567"));
        assert!(!ingestor.is_allowed("0987654321"));
    }

    #[test]
    fn empty_allowlist_matches_nothing() {
        let ingestor = MessageIngestor::new(Vec::new());
        assert!(!ingestor.is_allowed("0901234567"));
    }

    #[test]
    fn draft_builds_a_negative_expense() {
        let ingestor = MessageIngestor::new(vec!["0901234567".to_string()]);
        let record = ingestor
            .draft(&Owner::Anonymous, "+84901234567", "Ban da nhan 150,000")
            .unwrap();

        assert_eq!(record.kind, TransactionKind::Expense);
        assert_eq!(record.amount, -150_000.0);
        assert_eq!(record.category.as_deref(), Some("other"));
        assert_eq!(record.title.as_deref(), Some("Auto transaction"));
        assert!(
            record
                .note
                .as_deref()
                .unwrap()
                .starts_with("SMS from +84901234567: ")
        );
    }

    #[test]
    fn draft_note_truncates_on_char_boundaries() {
        let ingestor = MessageIngestor::new(vec!["0901234567".to_string()]);
        let body = format!("nhan 50,000 {}", "giao dịch tự động ".repeat(10));
        let record = ingestor
            .draft(&Owner::Anonymous, "0901234567", &body)
            .unwrap();
        let preview: String = body.chars().take(50).collect();
        assert_eq!(
            record.note.as_deref(),
            Some(format!("SMS from 0901234567: {preview}").as_str())
        );
    }

    #[test]
    fn ambiguous_body_drafts_nothing() {
        let ingestor = MessageIngestor::new(vec!["0901234567".to_string()]);
        assert!(
            ingestor
                .draft(
                    &Owner::Anonymous,
                    "0901234567",
                    "100,000 VND chuyen, so du 5,230,000"
                )
                .is_none()
        );
    }
}
