use std::env;

use chrono::Duration;
use chrono::Local;
use hmac::{Hmac, Mac};
use jwt::SignWithKey;
use jwt::VerifyWithKey;
use serde::Deserialize;
use serde::Serialize;
use sha2::Sha256;

use crate::database::schema::{User, UserRole};
use crate::error::HttpError;

use super::permissions::ActionType;

const SESSION_LIFETIME_HOURS: i64 = 12;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct JwtSessionData {
    pub user_id: i32,
    pub username: String,
    pub role: UserRole,
    iat: i64,
    exp: i64,
}

impl JwtSessionData {
    pub fn new(id: i32, username: String, role: UserRole) -> Self {
        let now = Local::now();
        let iat = now.timestamp();
        let exp = (now + Duration::hours(SESSION_LIFETIME_HOURS)).timestamp();

        Self {
            user_id: id,
            username,
            role,
            iat,
            exp,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SessionData {
    pub user_id: i32,
    pub username: String,
    pub role: UserRole,
    pub is_moderator: bool,
    pub is_admin: bool,
}

impl SessionData {
    pub fn authenticate(&self, action: ActionType) -> Result<(), crate::error::Error> {
        if !action.authenticate(self) {
            return Err(
                HttpError::Unauthorized.new("You don't have permission to perform this action")
            );
        }
        Ok(())
    }
}

impl From<JwtSessionData> for SessionData {
    fn from(value: JwtSessionData) -> Self {
        SessionData {
            user_id: value.user_id,
            username: value.username,
            is_moderator: value.role == UserRole::Moderator,
            is_admin: value.role == UserRole::Admin,
            role: value.role,
        }
    }
}

fn session_key() -> Hmac<Sha256> {
    let secret = env::var("SESSION_SECRET").unwrap_or_else(|_| String::from("kotikokki-dev"));
    Hmac::new_from_slice(secret.as_bytes()).unwrap()
}

pub fn generate_jwt_session(user: &User, username: &str) -> String {
    let claims = JwtSessionData::new(user.id, username.to_string(), user.role.to_owned());

    claims.sign_with_key(&session_key()).unwrap()
}

pub fn verify_jwt_session(token: String) -> Result<JwtSessionData, crate::error::Error> {
    token
        .verify_with_key(&session_key())
        .map_err(|_| HttpError::InvalidSession.new("Invalid session; Invalid token"))
        .map(|session: JwtSessionData| {
            let now = Local::now().timestamp();

            if (session.exp - now).is_negative() {
                return Err(HttpError::InvalidSession.new("Invalid session; Token expired"));
            }
            Ok(session)
        })?
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        User {
            id: 7,
            email: String::from("mari@example.com"),
            password: String::from("<hash>"),
            role: UserRole::User,
        }
    }

    #[test]
    fn session_round_trips() {
        let token = generate_jwt_session(&user(), "mari");
        let session = verify_jwt_session(token).unwrap();

        assert_eq!(session.user_id, 7);
        assert_eq!(session.username, "mari");
        assert_eq!(session.role, UserRole::User);
    }

    #[test]
    fn expired_tokens_are_rejected() {
        let mut claims = JwtSessionData::new(7, String::from("mari"), UserRole::User);
        claims.exp = Local::now().timestamp() - 60;

        let token = claims.sign_with_key(&session_key()).unwrap();
        assert!(verify_jwt_session(token).is_err());
    }

    #[test]
    fn tampered_tokens_are_rejected() {
        let token = generate_jwt_session(&user(), "mari");
        let mut tampered = token.clone();
        tampered.push('x');

        assert!(verify_jwt_session(tampered).is_err());
    }
}
