use actix_web::{dev::Payload, Error, FromRequest, HttpRequest};
use actix_web_httpauth::extractors::bearer::BearerAuth;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::env;
use std::future::{ready, Ready};

pub const SESSION_COOKIE: &str = "session_token";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UserMetadata {
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// Claims carried by the identity provider's access token. Only the
/// fields the services consume are modeled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub exp: usize,
    #[serde(default)]
    pub user_metadata: UserMetadata,
}

impl Claims {
    /// Display name from token metadata, "Usuario" when absent.
    pub fn display_name(&self) -> &str {
        self.user_metadata
            .full_name
            .as_deref()
            .or(self.user_metadata.name.as_deref())
            .unwrap_or("Usuario")
    }
}

/// Validate a provider token and return its claims. The same symmetric
/// secret the provider signs with must be configured via `JWT_SECRET`;
/// `JWT_ISSUER` additionally pins the issuer when set.
pub fn decode_jwt(token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let secret = env::var("JWT_SECRET").expect("JWT_SECRET not set");
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    if let Ok(issuer) = env::var("JWT_ISSUER") {
        validation.set_issuer(&[issuer]);
    }
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )?;
    Ok(data.claims)
}

/// Extractor yielding validated `Claims`. Accepts a bearer header first,
/// then the HttpOnly session cookie, so browser requests that cannot set
/// Authorization still authenticate.
pub struct Auth(pub Claims);

impl FromRequest for Auth {
    type Error = Error;
    type Future = Ready<Result<Self, Error>>;

    fn from_request(req: &HttpRequest, pl: &mut Payload) -> Self::Future {
        let token = match BearerAuth::from_request(req, pl).into_inner() {
            Ok(bearer) => Some(bearer.token().to_string()),
            Err(_) => req.cookie(SESSION_COOKIE).map(|c| c.value().to_string()),
        };
        match token {
            Some(token) => match decode_jwt(&token) {
                Ok(claims) => ready(Ok(Auth(claims))),
                Err(_) => ready(Err(actix_web::error::ErrorUnauthorized("Invalid token"))),
            },
            None => ready(Err(actix_web::error::ErrorUnauthorized(
                "Authorization required",
            ))),
        }
    }
}

/// Raw token as presented by the request, without validating it locally.
/// The session-cookie endpoints forward it to the identity provider
/// instead of decoding it themselves.
pub fn raw_token(req: &HttpRequest) -> Option<String> {
    if let Some(header) = req.headers().get("Authorization") {
        if let Ok(value) = header.to_str() {
            let token = value.strip_prefix("Bearer ").unwrap_or(value);
            if !token.is_empty() {
                return Some(token.to_string());
            }
        }
    }
    req.cookie(SESSION_COOKIE).map(|c| c.value().to_string())
}

/// Mint a provider-shaped token. Production tokens come from the identity
/// provider; this exists for the test suite and local tooling.
pub fn create_jwt(
    sub: &str,
    email: &str,
    full_name: Option<&str>,
) -> Result<String, jsonwebtoken::errors::Error> {
    let secret = env::var("JWT_SECRET").expect("JWT_SECRET not set");
    let expiration = chrono::Utc::now()
        .checked_add_signed(chrono::Duration::hours(1))
        .expect("valid timestamp")
        .timestamp() as usize;

    let claims = Claims {
        sub: sub.to_string(),
        email: email.to_string(),
        exp: expiration,
        user_metadata: UserMetadata {
            full_name: full_name.map(|s| s.to_string()),
            name: None,
        },
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

/// Split a display name into (nombre, apellido): first word and the rest.
pub fn split_full_name(full_name: &str) -> (String, String) {
    let mut parts = full_name.split_whitespace();
    match parts.next() {
        None => ("Usuario".into(), String::new()),
        Some(first) => {
            let rest: Vec<&str> = parts.collect();
            (first.to_string(), rest.join(" "))
        }
    }
}
