use super::*;
use jsonwebtoken::{EncodingKey, Header, encode};
use serde_json::json;

const SECRET: &str = "supersecretjwtsecretforunittesting123";
const USER_ID: &str = "123e4567-e89b-12d3-a456-426614174000";

fn sign(claims: serde_json::Value, secret: &str) -> String {
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}

#[test]
fn test_validate_supabase_jwt_success() {
    let token = sign(
        json!({
            "sub": USER_ID,
            "role": "authenticated",
            "aud": "authenticated",
            "email": "test@example.com",
            "exp": 9999999999u64,
        }),
        SECRET,
    );

    let claims = validate_supabase_jwt(&token, SECRET).expect("Valid token should pass");
    assert_eq!(claims.sub.as_deref(), Some(USER_ID));
    assert_eq!(claims.email.as_deref(), Some("test@example.com"));

    let user = AuthUser::from_claims(claims).unwrap();
    assert!(!user.is_admin);
    assert_eq!(user.user_id.to_string(), USER_ID);
}

#[test]
fn test_validate_supabase_jwt_expired() {
    let token = sign(
        json!({
            "sub": USER_ID,
            "role": "authenticated",
            "aud": "authenticated",
            "exp": 1,
        }),
        SECRET,
    );

    assert!(validate_supabase_jwt(&token, SECRET).is_err());
}

#[test]
fn test_validate_supabase_jwt_invalid_signature() {
    let token = sign(
        json!({
            "sub": USER_ID,
            "role": "authenticated",
            "aud": "authenticated",
            "exp": 9999999999u64,
        }),
        "wrongsecret",
    );

    assert!(validate_supabase_jwt(&token, SECRET).is_err());
}

#[test]
fn test_validate_supabase_jwt_wrong_audience() {
    let token = sign(
        json!({
            "sub": USER_ID,
            "role": "authenticated",
            "aud": "anon",
            "exp": 9999999999u64,
        }),
        SECRET,
    );

    assert!(validate_supabase_jwt(&token, SECRET).is_err());
}

#[test]
fn test_admin_from_app_metadata() {
    let token = sign(
        json!({
            "sub": USER_ID,
            "role": "authenticated",
            "aud": "authenticated",
            "exp": 9999999999u64,
            "app_metadata": { "provider": "email", "role": "admin" },
        }),
        SECRET,
    );

    let user = AuthUser::from_claims(validate_supabase_jwt(&token, SECRET).unwrap()).unwrap();
    assert!(user.is_admin);
}

#[test]
fn test_service_role_without_sub_is_admin() {
    let token = sign(
        json!({
            "role": "service_role",
            "aud": "service_role",
            "exp": 9999999999u64,
        }),
        SECRET,
    );

    let user = AuthUser::from_claims(validate_supabase_jwt(&token, SECRET).unwrap()).unwrap();
    assert!(user.is_admin);
    assert_eq!(user.user_id, Uuid::nil());
}

#[test]
fn test_missing_sub_for_regular_user_is_rejected() {
    let token = sign(
        json!({
            "role": "authenticated",
            "aud": "authenticated",
            "exp": 9999999999u64,
        }),
        SECRET,
    );

    let claims = validate_supabase_jwt(&token, SECRET).unwrap();
    assert!(AuthUser::from_claims(claims).is_err());
}
