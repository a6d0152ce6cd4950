use async_graphql::{Context, ErrorExtensions};

use crate::{app_state::AppState, auth::Identity, auth::extract_identity, errors::AppResult};

/// Converts service results into GraphQL results, keeping the error code
/// as an extension.
pub trait GraphqlResultExt<T> {
    fn gql(self) -> async_graphql::Result<T>;
}

impl<T> GraphqlResultExt<T> for AppResult<T> {
    fn gql(self) -> async_graphql::Result<T> {
        self.map_err(|err| err.extend())
    }
}

/// The shared state and the authenticated caller for a resolver.
pub fn state_and_identity<'a>(
    ctx: &Context<'a>,
) -> async_graphql::Result<(&'a AppState, Identity)> {
    let state = ctx.data::<AppState>()?;
    let identity = extract_identity(ctx).gql()?;
    Ok((state, identity))
}
