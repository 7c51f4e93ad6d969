use rand::Rng;

const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789_-@&";

pub const CLIENT_ID_LEN: usize = 32;
pub const CLIENT_KEY_LEN: usize = 64;

pub fn random_token(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
        .collect()
}

/// A fresh `(client_id, client_key)` pair.
pub fn generate_client_credentials() -> (String, String) {
    (random_token(CLIENT_ID_LEN), random_token(CLIENT_KEY_LEN))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lengths_and_charset() {
        let (id, key) = generate_client_credentials();
        assert_eq!(id.len(), CLIENT_ID_LEN);
        assert_eq!(key.len(), CLIENT_KEY_LEN);
        assert!(
            id.chars()
                .chain(key.chars())
                .all(|c| c.is_ascii_alphanumeric() || "_-@&".contains(c))
        );
    }

    #[test]
    fn test_tokens_differ() {
        let (a, _) = generate_client_credentials();
        let (b, _) = generate_client_credentials();
        assert_ne!(a, b);
    }
}
