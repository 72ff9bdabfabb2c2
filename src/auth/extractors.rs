use actix_web::dev::Payload;
use actix_web::{web, Error as ActixError, FromRequest, HttpMessage, HttpRequest};
use futures::future::LocalBoxFuture;

use crate::auth::middleware::AuthFailure;
use crate::auth::token::Claims;
use crate::db::{Filter, SoftDeleteStore, UUID};
use crate::error::AppError;
use crate::models::User;

/// The live user behind the request's access token.
///
/// Rejects with 401 when `AuthMiddleware` found no token, the token failed
/// verification, or the user it names has since been deleted.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

/// Like [`AuthenticatedUser`] but never rejects on missing or bad credentials.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<User>);

impl MaybeUser {
    pub fn id(&self) -> Option<i64> {
        self.0.as_ref().map(|user| user.id)
    }
}

fn store(req: &HttpRequest) -> Result<web::Data<SoftDeleteStore>, AppError> {
    req.app_data::<web::Data<SoftDeleteStore>>()
        .cloned()
        .ok_or_else(|| AppError::InternalServerError("Store is not registered as app data".into()))
}

async fn load_user(db: &SoftDeleteStore, claims: &Claims) -> Result<Option<User>, AppError> {
    db.first::<User>(&Filter::new().eq(UUID, claims.sub)).await
}

impl FromRequest for AuthenticatedUser {
    type Error = ActixError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let claims = req.extensions().get::<Claims>().cloned();
        let failure = req.extensions().get::<AuthFailure>().cloned();
        let db = store(req);

        Box::pin(async move {
            let claims = match (claims, failure) {
                (Some(claims), _) => claims,
                (None, Some(_)) => {
                    return Err(AppError::Unauthorized("Invalid access token".into()).into())
                }
                (None, None) => return Err(AppError::Unauthorized("Unauthorized request".into()).into()),
            };

            let db = db?;
            match load_user(&db, &claims).await? {
                Some(user) => Ok(AuthenticatedUser(user)),
                None => Err(AppError::Unauthorized("Invalid access token".into()).into()),
            }
        })
    }
}

impl FromRequest for MaybeUser {
    type Error = ActixError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let claims = req.extensions().get::<Claims>().cloned();
        let db = store(req);

        Box::pin(async move {
            let Some(claims) = claims else {
                return Ok(MaybeUser(None));
            };
            let db = db?;
            Ok(MaybeUser(load_user(&db, &claims).await?))
        })
    }
}
