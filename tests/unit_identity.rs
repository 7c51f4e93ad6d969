use spay::modules::users::service::UserRef;
use spay::spay_auth::LoginIdentifier;
use spay::spay_auth::jwt::{issue_token_pair, verify_access_token};
use spay::spay_config::LocalIdpConfig;
use uuid::Uuid;

fn local_config() -> LocalIdpConfig {
    LocalIdpConfig {
        secret: "unit-test-secret".to_string(),
        access_token_expiry: 3600,
        refresh_token_expiry: 604800,
    }
}

#[test]
fn test_user_ref_forms() {
    let id = Uuid::new_v4();
    assert_eq!(UserRef::parse("me"), Some(UserRef::Me));
    assert_eq!(UserRef::parse(&id.to_string()), Some(UserRef::Id(id)));
    assert_eq!(
        UserRef::parse("awa@spay.africa"),
        Some(UserRef::Email("awa@spay.africa".to_string()))
    );
    assert_eq!(
        UserRef::parse("0700000000"),
        Some(UserRef::Phone("0700000000".to_string()))
    );
    assert_eq!(UserRef::parse("abc"), None);
}

#[test]
fn test_login_identifier_and_user_ref_agree_on_emails() {
    let email = "merchant@spay.africa";
    assert!(matches!(LoginIdentifier::parse(email), Some(LoginIdentifier::Email(_))));
    assert!(matches!(UserRef::parse(email), Some(UserRef::Email(_))));
}

#[test]
fn test_local_tokens_verify_with_same_secret_only() {
    let config = local_config();
    let pair = issue_token_pair("auth-123", "+2250700000000", &config).unwrap();

    let claims = verify_access_token(&pair.access_token, &config).unwrap();
    assert_eq!(claims.sub, "auth-123");

    let other = LocalIdpConfig {
        secret: "another-secret".to_string(),
        ..config
    };
    assert!(verify_access_token(&pair.access_token, &other).is_err());
}
