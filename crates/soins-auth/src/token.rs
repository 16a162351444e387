use uuid::Uuid;

/// Opaque session identifiers: 128 random bits rendered as the 36-character
/// hyphenated form. Collision probability is negligible, so issuance never
/// consults a registry.
pub fn issue() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_36_chars_hyphenated() {
        let token = issue();
        assert_eq!(token.len(), 36);
        assert_eq!(token.chars().filter(|c| *c == '-').count(), 4);
    }

    #[test]
    fn tokens_are_unique() {
        let a = issue();
        let b = issue();
        assert_ne!(a, b);
    }
}
