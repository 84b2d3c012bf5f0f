//! JWT token handling
//!
//! Access and refresh tokens carry the user's identity and resolved
//! authorization state, so a verified token is enough to authorize a request.

use crate::config::{is_hmac, JwtConfig};
use crate::domain::{Permission, Role, UserSnapshot};
use crate::error::{AppError, Result};
use crate::rbac;
use crate::telemetry::metrics::TOKENS_ISSUED_TOTAL;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Source of "now" for issuing and expiry checks.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually driven clock for tests.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn at_timestamp(secs: i64) -> Self {
        Self::new(DateTime::from_timestamp(secs, 0).unwrap_or_default())
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Token type discriminator (prevents token confusion attacks)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Access => "access",
            TokenKind::Refresh => "refresh",
        }
    }
}

/// Claims carried by both access and refresh tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    pub token_type: TokenKind,
    /// Expiration (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    pub jti: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// Absent on tokens minted before authorization was embedded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roles: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Vec<String>>,
    #[serde(default)]
    pub is_staff: bool,
    #[serde(default)]
    pub is_superuser: bool,
}

impl TokenClaims {
    /// True when both roles and permissions were embedded at issue time.
    pub fn has_embedded_authorization(&self) -> bool {
        self.roles.is_some() && self.permissions.is_some()
    }

    /// Embedded roles, dropping names this build does not know.
    pub fn parsed_roles(&self) -> Option<BTreeSet<Role>> {
        self.roles.as_ref().map(|names| {
            names
                .iter()
                .filter_map(|name| {
                    let role = Role::parse(name);
                    if role.is_none() {
                        tracing::warn!(role = %name, "Ignoring unknown role claim");
                    }
                    role
                })
                .collect()
        })
    }

    /// Embedded permissions, dropping names this build does not know.
    pub fn parsed_permissions(&self) -> Option<BTreeSet<Permission>> {
        self.permissions.as_ref().map(|names| {
            names
                .iter()
                .filter_map(|name| {
                    let permission = Permission::parse(name);
                    if permission.is_none() {
                        tracing::warn!(permission = %name, "Ignoring unknown permission claim");
                    }
                    permission
                })
                .collect()
        })
    }

    /// Fill identity and authorization claims a legacy token is missing from the stored user.
    pub fn backfill_from(mut self, user: &UserSnapshot) -> Self {
        self.user_id.get_or_insert(user.id);
        self.name.get_or_insert_with(|| user.name.clone());
        self.email.get_or_insert_with(|| user.email.clone());
        self.phone.get_or_insert_with(|| user.phone.clone());

        if !self.has_embedded_authorization() {
            let (roles, permissions) = rbac::resolve(user.flags());
            self.roles = Some(roles.iter().map(|r| r.as_str().to_string()).collect());
            self.permissions = Some(permissions.iter().map(|p| p.as_str().to_string()).collect());
            self.is_staff = user.is_staff;
            self.is_superuser = user.is_superuser;
        }
        self
    }
}

/// User summary returned alongside a freshly issued token pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub user_id: i64,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub roles: Vec<String>,
    pub permissions: Vec<String>,
    pub is_staff: bool,
    pub is_superuser: bool,
}

#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
    /// Claims of the access token
    pub claims: TokenClaims,
    pub user_info: UserInfo,
}

/// JWT token manager
#[derive(Clone)]
pub struct JwtManager {
    config: JwtConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    clock: Arc<dyn Clock>,
}

impl JwtManager {
    pub fn new(config: JwtConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        let (encoding_key, decoding_key) = if is_hmac(config.algorithm) {
            if config.secret.is_empty() {
                return Err(AppError::Config("JWT secret must not be empty".to_string()));
            }
            (
                EncodingKey::from_secret(config.secret.as_bytes()),
                DecodingKey::from_secret(config.secret.as_bytes()),
            )
        } else {
            let private_key = config.private_key_pem.as_deref().ok_or_else(|| {
                AppError::Config(format!(
                    "{:?} requires a private key",
                    config.algorithm
                ))
            })?;
            let encoding_key = EncodingKey::from_rsa_pem(private_key.as_bytes())
                .map_err(|e| AppError::Config(format!("Failed to load JWT private key: {}", e)))?;
            let public_key = config.public_key_pem.as_deref().unwrap_or(private_key);
            let decoding_key = DecodingKey::from_rsa_pem(public_key.as_bytes())
                .map_err(|e| AppError::Config(format!("Failed to load JWT public key: {}", e)))?;
            (encoding_key, decoding_key)
        };

        Ok(Self {
            config,
            encoding_key,
            decoding_key,
            clock,
        })
    }

    /// Signature and algorithm only; expiry is checked against the injected clock.
    fn validation(&self) -> Validation {
        let mut validation = Validation::new(self.config.algorithm);
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.leeway = 0;
        validation
    }

    fn ttl(&self, kind: TokenKind) -> i64 {
        match kind {
            TokenKind::Access => self.config.access_token_ttl_secs,
            TokenKind::Refresh => self.config.refresh_token_ttl_secs,
        }
    }

    fn sign(&self, claims: &TokenClaims) -> Result<String> {
        let header = Header::new(self.config.algorithm);
        let token =
            encode(&header, claims, &self.encoding_key).map_err(|e| AppError::Internal(e.into()))?;
        metrics::counter!(TOKENS_ISSUED_TOTAL, "kind" => claims.token_type.as_str()).increment(1);
        Ok(token)
    }

    fn stamp(&self, mut claims: TokenClaims, kind: TokenKind) -> Result<TokenClaims> {
        let now = self.clock.now();
        let expires_at = Duration::try_seconds(self.ttl(kind))
            .and_then(|ttl| now.checked_add_signed(ttl))
            .ok_or_else(|| {
                AppError::Config(format!("{} token lifetime is out of range", kind.as_str()))
            })?;
        claims.token_type = kind;
        claims.iat = now.timestamp();
        claims.exp = expires_at.timestamp();
        claims.jti = Uuid::new_v4().simple().to_string();
        Ok(claims)
    }

    /// Issue an access/refresh pair with identical identity and authorization claims.
    pub fn issue(&self, user: &UserSnapshot) -> Result<TokenPair> {
        let (roles, permissions) = rbac::resolve(user.flags());
        let role_names: Vec<String> = roles.iter().map(|r| r.as_str().to_string()).collect();
        let permission_names: Vec<String> =
            permissions.iter().map(|p| p.as_str().to_string()).collect();

        let base = TokenClaims {
            token_type: TokenKind::Access,
            exp: 0,
            iat: 0,
            jti: String::new(),
            user_id: Some(user.id),
            name: Some(user.name.clone()),
            email: Some(user.email.clone()),
            phone: Some(user.phone.clone()),
            roles: Some(role_names.clone()),
            permissions: Some(permission_names.clone()),
            is_staff: user.is_staff,
            is_superuser: user.is_superuser,
        };

        let access_claims = self.stamp(base.clone(), TokenKind::Access)?;
        let refresh_claims = self.stamp(base, TokenKind::Refresh)?;
        let access = self.sign(&access_claims)?;
        let refresh = self.sign(&refresh_claims)?;

        tracing::debug!(user_id = user.id, roles = ?role_names, "Issued token pair");

        Ok(TokenPair {
            access,
            refresh,
            claims: access_claims,
            user_info: UserInfo {
                user_id: user.id,
                name: user.name.clone(),
                email: user.email.clone(),
                phone: user.phone.clone(),
                roles: role_names,
                permissions: permission_names,
                is_staff: user.is_staff,
                is_superuser: user.is_superuser,
            },
        })
    }

    /// Mint an access token from the claims of a verified refresh token.
    pub fn issue_access_from(&self, claims: &TokenClaims) -> Result<String> {
        let access_claims = self.stamp(claims.clone(), TokenKind::Access)?;
        self.sign(&access_claims)
    }

    /// Verify signature, structure and expiry.
    pub fn decode(&self, token: &str) -> Result<TokenClaims> {
        let data = decode::<TokenClaims>(token, &self.decoding_key, &self.validation())
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AppError::TokenExpired,
                _ => AppError::InvalidToken(e.to_string()),
            })?;

        let claims = data.claims;
        if self.clock.now().timestamp() > claims.exp {
            return Err(AppError::TokenExpired);
        }
        Ok(claims)
    }

    /// Like [`decode`](Self::decode), but also rejects tokens of the other kind.
    pub fn decode_expecting(&self, token: &str, kind: TokenKind) -> Result<TokenClaims> {
        let claims = self.decode(token)?;
        if claims.token_type != kind {
            return Err(AppError::InvalidToken(format!(
                "expected {} token, got {}",
                kind.as_str(),
                claims.token_type.as_str()
            )));
        }
        Ok(claims)
    }

    pub fn algorithm(&self) -> Algorithm {
        self.config.algorithm
    }
}
