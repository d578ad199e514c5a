use actix_web::{dev::Payload, http::header, FromRequest, HttpRequest};

use crate::AppError;

/// Bearer token pulled off the Authorization header, unverified.
#[derive(Debug, Clone)]
pub struct AuthToken {
    pub token: String,
}

impl FromRequest for AuthToken {
    type Error = AppError;
    type Future = std::future::Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        std::future::ready(extract_bearer(req))
    }
}

fn extract_bearer(req: &HttpRequest) -> Result<AuthToken, AppError> {
    let auth_value = req
        .headers()
        .get(header::AUTHORIZATION)
        .ok_or_else(AppError::unauthorized_missing_bearer)?
        .to_str()
        .map_err(|_| AppError::unauthorized_missing_bearer())?;

    // Expect exactly "Bearer <token>"
    let parts: Vec<&str> = auth_value.split_whitespace().collect();
    match parts.as_slice() {
        ["Bearer", token] if !token.is_empty() => Ok(AuthToken {
            token: (*token).to_string(),
        }),
        _ => Err(AppError::unauthorized_missing_bearer()),
    }
}
