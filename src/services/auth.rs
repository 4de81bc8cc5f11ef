//! Access-token validation. Tokens are issued by the identity service and
//! signed with the shared `JWT_SECRET`; `issue_access_token` exists for the
//! seed binary and tests.

use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::user::UserRole;

/// Token type accepted on API requests.
pub const ACCESS_TOKEN_TYPE: &str = "access";

/// JWT claims embedded in access tokens.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,
    pub user_id: String,
    pub role: String,
    pub token_type: String,
    pub exp: i64,
    pub iat: i64,
}

/// Sign an access token for a user.
pub fn issue_access_token(
    user_id: Uuid,
    email: &str,
    role: UserRole,
    jwt_secret: &str,
    expiry_secs: i64,
) -> Result<String, AppError> {
    let now = Utc::now();
    let claims = Claims {
        sub: email.to_string(),
        user_id: user_id.to_string(),
        role: role.as_str().to_string(),
        token_type: ACCESS_TOKEN_TYPE.to_string(),
        exp: (now + Duration::seconds(expiry_secs)).timestamp(),
        iat: now.timestamp(),
    };

    let encoding_key = EncodingKey::from_secret(jwt_secret.as_bytes());
    jsonwebtoken::encode(&Header::default(), &claims, &encoding_key)
        .map_err(|e| AppError::Internal(format!("Token generation failed: {e}")))
}

/// Validate a JWT and return the claims.
pub fn validate_token(token: &str, jwt_secret: &str) -> Result<Claims, AppError> {
    let decoding_key = DecodingKey::from_secret(jwt_secret.as_bytes());
    let validation = Validation::default();

    jsonwebtoken::decode::<Claims>(token, &decoding_key, &validation)
        .map(|data| data.claims)
        .map_err(|_| AppError::Unauthorized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_issue_and_validation() {
        let user_id = Uuid::new_v4();
        let secret = "test-secret-key-for-jwt";
        let token = issue_access_token(user_id, "ann@example.com", UserRole::User, secret, 900)
            .unwrap();

        let claims = validate_token(&token, secret).unwrap();
        assert_eq!(claims.sub, "ann@example.com");
        assert_eq!(claims.user_id, user_id.to_string());
        assert_eq!(claims.token_type, ACCESS_TOKEN_TYPE);
        assert_eq!(claims.role, "User");
        assert_eq!(claims.exp - claims.iat, 900);
    }

    #[test]
    fn invalid_token_rejected() {
        let result = validate_token("garbage.token.here", "secret");
        assert!(matches!(result, Err(AppError::Unauthorized)));
    }

    #[test]
    fn wrong_secret_rejected() {
        let token =
            issue_access_token(Uuid::new_v4(), "a@b.c", UserRole::Admin, "one", 900).unwrap();
        assert!(validate_token(&token, "two").is_err());
    }

    #[test]
    fn expired_token_rejected() {
        // Expired well beyond the 60s leeway window
        let token =
            issue_access_token(Uuid::new_v4(), "a@b.c", UserRole::User, "secret", -3600).unwrap();
        assert!(validate_token(&token, "secret").is_err());
    }
}
