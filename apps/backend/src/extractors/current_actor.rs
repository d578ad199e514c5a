use actix_web::{dev::Payload, web, FromRequest, HttpRequest};
use futures_util::future::LocalBoxFuture;

use crate::auth::jwt::verify_access_token;
use crate::domain::Actor;
use crate::extractors::auth_token::AuthToken;
use crate::state::app_state::AppState;
use crate::AppError;

/// The authenticated actor behind the request, derived entirely from the
/// verified token claims. No store lookup happens here.
#[derive(Debug, Clone, Copy)]
pub struct CurrentActor(pub Actor);

impl FromRequest for CurrentActor {
    type Error = AppError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let token_fut = AuthToken::from_request(req, payload);
        let req = req.clone();

        Box::pin(async move {
            let auth = token_fut.await?;
            let app_state = req
                .app_data::<web::Data<AppState>>()
                .ok_or_else(|| AppError::internal("AppState missing from app data"))?;

            let claims = verify_access_token(&auth.token, &app_state.security)?;
            Ok(CurrentActor(claims.actor()))
        })
    }
}
