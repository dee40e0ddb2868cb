// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use habit_tracker::config::ConfigError;
use habit_tracker::error::AppError;
use habit_tracker::services::AuthError;

#[test]
fn test_user_declined_sign_in_maps_to_unauthorized() {
    for code in ["auth/popup-closed-by-user", "auth/cancelled-popup-request"] {
        let err = AuthError::from_provider_code(code);
        assert!(err.is_user_declined(), "{code} should be a user decline");
        assert!(matches!(AppError::from(err), AppError::Unauthorized));
    }
}

#[test]
fn test_auth_user_messages() {
    assert_eq!(
        AuthError::MissingApiKey.user_message(),
        "API Key is missing. Check configuration."
    );
    assert_eq!(
        AuthError::from_provider_code("auth/api-key-not-valid.-please-pass-a-valid-api-key.")
            .user_message(),
        "Invalid API Key configuration."
    );
    assert_eq!(AuthError::PopupClosed.user_message(), "Login popup closed.");
    assert_eq!(AuthError::Cancelled.user_message(), "Login cancelled by user.");

    // Internal detail stays out of the message shown to people
    let expired = AuthError::InvalidToken("ExpiredSignature".to_string());
    assert!(!expired.user_message().contains("ExpiredSignature"));
}

#[test]
fn test_auth_errors_map_into_app_errors() {
    assert!(matches!(
        AppError::from(AuthError::InvalidToken("bad".to_string())),
        AppError::InvalidToken
    ));
    assert!(matches!(
        AppError::from(AuthError::InvalidApiKey),
        AppError::BadRequest(_)
    ));
    assert!(matches!(
        AppError::from(AuthError::Transient("timeout".to_string())),
        AppError::Internal(_)
    ));
}

#[test]
fn test_is_transient() {
    assert!(AppError::Database("unavailable".to_string()).is_transient());
    assert!(AppError::Advisor("HTTP 503".to_string()).is_transient());

    assert!(!AppError::Unauthorized.is_transient());
    assert!(!AppError::BadRequest("Bad Request".to_string()).is_transient());
    assert!(!AppError::from(ConfigError::Missing("FIREBASE_PROJECT_ID")).is_transient());
}
