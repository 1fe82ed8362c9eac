use async_graphql::{Context, EmptySubscription, Object, Schema};
use std::sync::Arc;

use crate::domain::auth::{LoginForm, LoginState};
use crate::domain::dashboard_service::DashboardService;
use crate::domain::snapshot::EnvironmentSnapshot;
use crate::domain::types::{ClientSignals, DaemonHealth};

pub type NectarSchema = Schema<QueryRoot, MutationRoot, EmptySubscription>;

pub struct QueryRoot;

#[Object]
impl QueryRoot {
    async fn health(&self, ctx: &Context<'_>) -> async_graphql::Result<DaemonHealth> {
        let svc = ctx.data::<Arc<DashboardService>>()?;
        Ok(svc.health().await)
    }

    /// The current snapshot, if a cycle has completed. Never triggers collection.
    async fn snapshot(
        &self,
        ctx: &Context<'_>,
    ) -> async_graphql::Result<Option<EnvironmentSnapshot>> {
        let svc = ctx.data::<Arc<DashboardService>>()?;
        Ok(svc.current().await.map(|s| s.as_ref().clone()))
    }
}

pub struct MutationRoot;

#[Object]
impl MutationRoot {
    /// Run a collection cycle from the given signals and publish it.
    async fn collect(
        &self,
        ctx: &Context<'_>,
        signals: ClientSignals,
    ) -> async_graphql::Result<EnvironmentSnapshot> {
        let svc = ctx.data::<Arc<DashboardService>>()?;
        Ok(svc.collect(signals).await.as_ref().clone())
    }

    async fn login(
        &self,
        ctx: &Context<'_>,
        username: String,
        password: String,
        #[graphql(default)] attempts: u32,
    ) -> async_graphql::Result<LoginState> {
        let svc = ctx.data::<Arc<DashboardService>>()?;
        let prior = LoginState {
            attempts,
            ..LoginState::default()
        };
        Ok(svc.login(&prior, &LoginForm { username, password }))
    }
}

pub fn build_schema(dashboard: Arc<DashboardService>) -> NectarSchema {
    Schema::build(QueryRoot, MutationRoot, EmptySubscription)
        .data(dashboard)
        .finish()
}
