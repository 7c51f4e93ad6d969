use uuid::Uuid;
use validator::ValidateEmail;

/// How a login name is interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginIdentifier {
    /// Phone number, with or without the leading `+`
    Phone(String),
    Email(String),
    /// Identity provider user id
    AuthId(Uuid),
}

impl LoginIdentifier {
    /// Classifies `username`; `None` when it matches no supported form.
    pub fn parse(username: &str) -> Option<Self> {
        let username = username.trim();
        let digits = username.strip_prefix('+').unwrap_or(username);

        if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) {
            Some(Self::Phone(username.to_string()))
        } else if username.validate_email() {
            Some(Self::Email(username.to_string()))
        } else {
            Uuid::parse_str(username).ok().map(Self::AuthId)
        }
    }
}
