//! The API root: where each resource lives.

use async_trait::async_trait;
use serde_json::json;

use crate::api::dispatch::{Context, PathParams, Reply, Resource, Verb};
use crate::error::AppError;

pub struct IndexResource;

#[async_trait]
impl Resource for IndexResource {
    fn name(&self) -> &'static str {
        "index"
    }

    fn allows(&self, verb: Verb, _params: &PathParams) -> bool {
        verb == Verb::Get
    }

    async fn get(&self, ctx: &mut Context) -> Result<Reply, AppError> {
        Reply::one(json!({
            "users": ctx.url_for("/users"),
            "sessions": ctx.url_for("/sessions"),
        }))
    }
}
