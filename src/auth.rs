/// Authentication extractors
///
/// Pages that need a signed-in player take [`SessionUser`]; the admin pages take
/// [`AdminUser`]. Both reject with [`AppError`], which redirects the browser.
use crate::{
    context::AppContext,
    db::models::User,
    error::AppError,
    session::{self, SessionData},
};
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use axum_extra::extract::cookie::PrivateCookieJar;

/// Signed-in player, loaded from the session cookie and checked against the database
#[derive(Debug, Clone)]
pub struct SessionUser {
    pub user: User,
    pub session: SessionData,
    pub is_admin: bool,
}

#[async_trait]
impl FromRequestParts<AppContext> for SessionUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let jar: PrivateCookieJar = PrivateCookieJar::from_request_parts(parts, state)
            .await
            .map_err(|_| AppError::Authentication("Unreadable cookies".to_string()))?;

        let session = session::read_session(&jar)
            .ok_or_else(|| AppError::Authentication("No session".to_string()))?;

        // The account may have been removed since the cookie was issued
        let user = state
            .account_manager
            .find_by_id(session.user_id)
            .await?
            .filter(|user| user.username == session.username)
            .ok_or_else(|| AppError::Authentication("Session user no longer exists".to_string()))?;

        let is_admin = state.is_admin(&user.username);

        Ok(SessionUser {
            user,
            session,
            is_admin,
        })
    }
}

/// Signed-in administrator
#[derive(Debug, Clone)]
pub struct AdminUser(pub SessionUser);

#[async_trait]
impl FromRequestParts<AppContext> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let user = SessionUser::from_request_parts(parts, state).await?;

        if !user.is_admin {
            return Err(AppError::Authorization(format!(
                "{} is not an administrator",
                user.user.username
            )));
        }

        Ok(AdminUser(user))
    }
}
