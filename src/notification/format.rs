//! Notification texts.

/// Longest subject shown in a notification body, in characters
pub const MAX_SUBJECT_CHARS: usize = 200;

/// "1 new email" / "3 new emails"
pub fn new_emails(count: usize) -> String {
    if count == 1 {
        "1 new email".to_string()
    } else {
        format!("{count} new emails")
    }
}

/// Summary of a group of messages from one sender
pub fn new_emails_from(count: usize, sender: &str) -> String {
    format!("{} from {}", new_emails(count), sender)
}

/// Preview summary of a banner announcing several messages
pub fn banner_summary(count: usize) -> String {
    format!("You have {}", new_emails(count))
}

pub fn send_failed_summary() -> String {
    "Email sending failed".to_string()
}

pub fn send_failed_preview(account_name: &str) -> String {
    format!("Failed to send email from account {account_name}")
}

pub fn send_failed_body(account_name: &str) -> String {
    format!("Account {account_name}")
}

/// Message shown by the sync progress UI when an action fails
pub fn sync_failed() -> &'static str {
    "Email sync failed"
}

/// Truncates a string to a maximum length, adding "..." if truncated.
/// Handles Unicode correctly by respecting character boundaries.
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let truncate_at = max_len.saturating_sub(3);
        let truncated: String = s.chars().take(truncate_at).collect();
        format!("{truncated}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plural_forms() {
        assert_eq!(new_emails(1), "1 new email");
        assert_eq!(new_emails(2), "2 new emails");
        assert_eq!(new_emails_from(3, "Bob"), "3 new emails from Bob");
        assert_eq!(banner_summary(1), "You have 1 new email");
    }

    #[test]
    fn test_send_failed_texts() {
        assert_eq!(send_failed_preview("Work"), "Failed to send email from account Work");
        assert_eq!(send_failed_body("Work"), "Account Work");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a long subject line", 10), "a long ...");
        assert_eq!(truncate("ääääääää", 5), "ää...");
    }
}
