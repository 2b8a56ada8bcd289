//! The `users` resource.
//!
//! # Endpoints
//!
//! - `GET    /users`        - list users (administrators only)
//! - `POST   /users`        - register, or log in when the e-mail is known
//! - `GET    /users/{id}`   - fetch one user (self or administrator)
//! - `PUT    /users/{id}`   - update a user (self or administrator)
//! - `DELETE /users/{id}`   - soft-delete a user (self or administrator)
//!
//! `{id}` may be `me` for the caller's own record.

use async_trait::async_trait;
use uuid::Uuid;

use crate::api::dispatch::{Context, PathParams, Reply, Resource, Verb, parse_id};
use crate::api::dto::UserView;
use crate::application::services::UserService;
use crate::domain::entities::User;
use crate::error::AppError;
use crate::infrastructure::persistence::{ListQuery, Predicate};

pub const USER_ID: &str = "user_id";

pub struct UsersResource;

impl UsersResource {
    fn user_url(ctx: &Context, id: Uuid) -> String {
        ctx.url_for(&format!("/users/{id}"))
    }

    fn view(ctx: &Context, user: &User) -> UserView {
        UserView::new(user, Self::user_url(ctx, user.id))
    }

    /// The user addressed by the path, resolving `me`.
    fn target(ctx: &Context) -> Result<Uuid, AppError> {
        match ctx.param(USER_ID) {
            Some("me") => Ok(ctx.require_identity()?.id),
            Some(raw) => parse_id(raw),
            None => Err(AppError::NotFound(None)),
        }
    }

    /// Filters accepted on the admin listing.
    fn list_filters(ctx: &Context) -> Result<Vec<Predicate>, AppError> {
        let mut filters = Vec::new();

        if let Some(email) = ctx.query_param("email") {
            filters.push(Predicate::eq("email", email.trim().to_lowercase()));
        }

        if let Some(raw) = ctx.query_param("is_admin") {
            let flag = match raw.to_ascii_lowercase().as_str() {
                "true" | "1" => true,
                "false" | "0" => false,
                _ => return Err(AppError::bad_request("Invalid value for: is_admin")),
            };
            filters.push(Predicate::eq("is_admin", flag));
        }

        Ok(filters)
    }

    async fn list(&self, ctx: &mut Context) -> Result<Reply, AppError> {
        // Listing is not disclosed to non-administrators.
        if !ctx.is_admin() {
            return Err(AppError::NotFound(None));
        }

        let query = ListQuery::new()
            .window(ctx.window())
            .sort(ctx.sort()?);
        let query = Self::list_filters(ctx)?
            .into_iter()
            .fold(query, ListQuery::filter);

        let users = ctx.store::<User>().all(&query).await?;
        let views: Vec<UserView> = users.iter().map(|u| Self::view(&*ctx, u)).collect();

        Reply::many(views)
    }
}

#[async_trait]
impl Resource for UsersResource {
    fn name(&self) -> &'static str {
        "users"
    }

    fn allows(&self, verb: Verb, params: &PathParams) -> bool {
        if params.contains_key(USER_ID) {
            matches!(verb, Verb::Get | Verb::Put | Verb::Delete)
        } else {
            matches!(verb, Verb::Get | Verb::Post)
        }
    }

    fn requires_identity(&self, _verb: Verb, params: &PathParams) -> bool {
        params.contains_key(USER_ID)
    }

    /// # Errors
    ///
    /// [`AppError::NotFound`] for a user the caller may not see, so that
    /// existence is never disclosed.
    async fn get(&self, ctx: &mut Context) -> Result<Reply, AppError> {
        if ctx.param(USER_ID).is_none() {
            return self.list(ctx).await;
        }

        let id = Self::target(ctx)?;
        let identity = ctx.require_identity()?;
        if !identity.can_act_on(id) {
            return Err(AppError::NotFound(None));
        }

        let user = ctx.store::<User>().get(id).await?;
        Reply::one(Self::view(ctx, &user))
    }

    /// Registers a new user (201 + `Location`) or logs an existing one in
    /// (200). Both carry a fresh access token.
    async fn post(&self, ctx: &mut Context) -> Result<Reply, AppError> {
        let fields = ctx.fields()?;
        let caller = ctx.identity().cloned();

        let enrollment = UserService::new(ctx.conn())
            .register_or_authenticate(&fields, caller.as_ref())
            .await?;

        let created = enrollment.is_new();
        let user = enrollment.into_user();
        let token = ctx.tokens().issue(user.id);
        let view = Self::view(ctx, &user).with_token(token);

        if created {
            let location = Self::user_url(ctx, user.id);
            Ok(Reply::one(view)?.with_location(location))
        } else {
            Ok(Reply::one(view)?.with_ok_status())
        }
    }

    /// Only administrators may change `is_admin`.
    async fn put(&self, ctx: &mut Context) -> Result<Reply, AppError> {
        let id = Self::target(ctx)?;
        let identity = ctx.require_identity()?.clone();
        if !identity.can_act_on(id) {
            return Err(AppError::AccessDenied(None));
        }

        let fields = ctx.fields()?;
        if fields.contains_key("is_admin") && !identity.is_admin {
            return Err(AppError::access_denied(
                "Only administrators can change administrator rights",
            ));
        }

        let user = ctx.store::<User>().update(id, &fields).await?;
        tracing::info!(user_id = %id, by = %identity.id, "User updated");

        Reply::one(Self::view(ctx, &user))
    }

    async fn delete(&self, ctx: &mut Context) -> Result<Reply, AppError> {
        let id = Self::target(ctx)?;
        let identity = ctx.require_identity()?.clone();
        if !identity.can_act_on(id) {
            return Err(AppError::AccessDenied(None));
        }

        ctx.store::<User>().delete(id).await?;
        tracing::info!(user_id = %id, by = %identity.id, "User deleted");

        Ok(Reply::empty())
    }
}
