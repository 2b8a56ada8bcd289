//! The `sessions` resource: log in and receive a bearer token.
//!
//! # Endpoint
//!
//! `POST /sessions`
//!
//! ```json
//! { "email": "user@example.com", "password": "secret" }
//! ```

use async_trait::async_trait;
use validator::Validate;

use crate::api::dispatch::{Context, PathParams, Reply, Resource, Verb};
use crate::api::dto::{Credentials, UserView};
use crate::application::services::UserService;
use crate::error::AppError;

pub struct SessionsResource;

#[async_trait]
impl Resource for SessionsResource {
    fn name(&self) -> &'static str {
        "sessions"
    }

    fn allows(&self, verb: Verb, _params: &PathParams) -> bool {
        verb == Verb::Post
    }

    /// # Errors
    ///
    /// - [`AppError::BadRequest`] if the body is not valid JSON or `email` is empty
    /// - [`AppError::Unauthorized`] for unknown e-mail or wrong password
    async fn post(&self, ctx: &mut Context) -> Result<Reply, AppError> {
        let credentials: Credentials = ctx.json()?;
        credentials.validate()?;

        let user = UserService::new(ctx.conn())
            .authenticate(&credentials.email, &credentials.password)
            .await?;

        let token = ctx.tokens().issue(user.id);
        let view = UserView::new(&user, ctx.url_for(&format!("/users/{}", user.id)))
            .with_token(token);

        tracing::debug!(user_id = %user.id, "Session opened");
        Ok(Reply::one(view)?.with_ok_status())
    }
}
