use super::{support::unwrap_body, Account, DEADLINE_INFO};
use crate::error::ClientError;
use metarpc_proto::{
    account_info_double_reply, account_info_integer_reply, account_info_string_reply, account_summary_reply,
    AccountInfoDoubleRequest, AccountInfoIntegerRequest, AccountInfoStringRequest, AccountPropertyDoubleId,
    AccountPropertyIntegerId, AccountPropertyStringId, AccountSummaryData, AccountSummaryRequest,
};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

impl Account {
    pub async fn account_summary(
        &self,
        cancel: &CancellationToken,
        deadline: Option<Duration>,
    ) -> Result<AccountSummaryData, ClientError> {
        let deadline = Some(deadline.unwrap_or(DEADLINE_INFO));
        self.executor
            .execute(cancel, deadline, |mut transport, instance_id| async move {
                let reply = transport
                    .account_information
                    .account_summary(AccountSummaryRequest {
                        terminal_instance_guid: instance_id.to_string(),
                    })
                    .await?
                    .into_inner();
                unwrap_body!(reply.body, account_summary_reply::Body)
            })
            .await
    }

    pub async fn account_info_double(
        &self,
        property_id: AccountPropertyDoubleId,
        cancel: &CancellationToken,
        deadline: Option<Duration>,
    ) -> Result<f64, ClientError> {
        let deadline = Some(deadline.unwrap_or(DEADLINE_INFO));
        self.executor
            .execute(cancel, deadline, move |mut transport, instance_id| async move {
                let reply = transport
                    .account_information
                    .account_info_double(AccountInfoDoubleRequest {
                        terminal_instance_guid: instance_id.to_string(),
                        property_id: property_id as i32,
                    })
                    .await?
                    .into_inner();
                unwrap_body!(reply.body, account_info_double_reply::Body)
            })
            .await
    }

    pub async fn account_info_integer(
        &self,
        property_id: AccountPropertyIntegerId,
        cancel: &CancellationToken,
        deadline: Option<Duration>,
    ) -> Result<i64, ClientError> {
        let deadline = Some(deadline.unwrap_or(DEADLINE_INFO));
        self.executor
            .execute(cancel, deadline, move |mut transport, instance_id| async move {
                let reply = transport
                    .account_information
                    .account_info_integer(AccountInfoIntegerRequest {
                        terminal_instance_guid: instance_id.to_string(),
                        property_id: property_id as i32,
                    })
                    .await?
                    .into_inner();
                unwrap_body!(reply.body, account_info_integer_reply::Body)
            })
            .await
    }

    pub async fn account_info_string(
        &self,
        property_id: AccountPropertyStringId,
        cancel: &CancellationToken,
        deadline: Option<Duration>,
    ) -> Result<String, ClientError> {
        let deadline = Some(deadline.unwrap_or(DEADLINE_INFO));
        self.executor
            .execute(cancel, deadline, move |mut transport, instance_id| async move {
                let reply = transport
                    .account_information
                    .account_info_string(AccountInfoStringRequest {
                        terminal_instance_guid: instance_id.to_string(),
                        property_id: property_id as i32,
                    })
                    .await?
                    .into_inner();
                unwrap_body!(reply.body, account_info_string_reply::Body)
            })
            .await
    }

    /// Reachability probe (`HealthCheck`'s low-level building
    /// block): round-trips to the gateway without touching account state.
    pub async fn ping(&self, cancel: &CancellationToken, deadline: Option<Duration>) -> Result<bool, ClientError> {
        let deadline = Some(deadline.unwrap_or(DEADLINE_INFO));
        self.executor
            .execute(cancel, deadline, |mut transport, instance_id| async move {
                let reply = transport
                    .account_helper
                    .ping(metarpc_proto::PingRequest {
                        terminal_instance_guid: instance_id.to_string(),
                    })
                    .await?
                    .into_inner();
                unwrap_body!(reply.body, metarpc_proto::ping_reply::Body)
            })
            .await
    }
}
