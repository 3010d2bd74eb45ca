use super::{support::unwrap_body, Account, DEADLINE_INFO};
use crate::error::ClientError;
use metarpc_proto::{
    symbol_exist_reply, symbol_name_reply, symbol_params_reply, symbol_select_reply, symbols_total_reply,
    SymbolExistRequest, SymbolNameRequest, SymbolParamsData, SymbolParamsRequest, SymbolSelectRequest,
    SymbolsTotalRequest,
};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn require_symbol(symbol: &str) -> Result<(), ClientError> {
    if symbol.trim().is_empty() {
        return Err(ClientError::invalid_argument("symbol must not be empty"));
    }
    Ok(())
}

impl Account {
    pub async fn symbols_total(
        &self,
        selected_only: bool,
        cancel: &CancellationToken,
        deadline: Option<Duration>,
    ) -> Result<i32, ClientError> {
        let deadline = Some(deadline.unwrap_or(DEADLINE_INFO));
        self.executor
            .execute(cancel, deadline, move |mut transport, instance_id| async move {
                let reply = transport
                    .symbol_info
                    .symbols_total(SymbolsTotalRequest {
                        terminal_instance_guid: instance_id.to_string(),
                        selected_only,
                    })
                    .await?
                    .into_inner();
                unwrap_body!(reply.body, symbols_total_reply::Body)
            })
            .await
    }

    pub async fn symbol_exist(
        &self,
        symbol: &str,
        cancel: &CancellationToken,
        deadline: Option<Duration>,
    ) -> Result<bool, ClientError> {
        require_symbol(symbol)?;
        let deadline = Some(deadline.unwrap_or(DEADLINE_INFO));
        let symbol = symbol.to_string();
        self.executor
            .execute(cancel, deadline, move |mut transport, instance_id| {
                let symbol = symbol.clone();
                async move {
                    let reply = transport
                        .symbol_info
                        .symbol_exist(SymbolExistRequest {
                            terminal_instance_guid: instance_id.to_string(),
                            symbol,
                        })
                        .await?
                        .into_inner();
                    unwrap_body!(reply.body, symbol_exist_reply::Body)
                }
            })
            .await
    }

    pub async fn symbol_name(
        &self,
        index: i32,
        selected_only: bool,
        cancel: &CancellationToken,
        deadline: Option<Duration>,
    ) -> Result<String, ClientError> {
        if index < 0 {
            return Err(ClientError::invalid_argument("index must be non-negative"));
        }
        let deadline = Some(deadline.unwrap_or(DEADLINE_INFO));
        self.executor
            .execute(cancel, deadline, move |mut transport, instance_id| async move {
                let reply = transport
                    .symbol_info
                    .symbol_name(SymbolNameRequest {
                        terminal_instance_guid: instance_id.to_string(),
                        index,
                        selected_only,
                    })
                    .await?
                    .into_inner();
                unwrap_body!(reply.body, symbol_name_reply::Body)
            })
            .await
    }

    pub async fn symbol_select(
        &self,
        symbol: &str,
        select: bool,
        cancel: &CancellationToken,
        deadline: Option<Duration>,
    ) -> Result<bool, ClientError> {
        require_symbol(symbol)?;
        let deadline = Some(deadline.unwrap_or(DEADLINE_INFO));
        let symbol = symbol.to_string();
        self.executor
            .execute(cancel, deadline, move |mut transport, instance_id| {
                let symbol = symbol.clone();
                async move {
                    let reply = transport
                        .symbol_info
                        .symbol_select(SymbolSelectRequest {
                            terminal_instance_guid: instance_id.to_string(),
                            symbol,
                            select,
                        })
                        .await?
                        .into_inner();
                    unwrap_body!(reply.body, symbol_select_reply::Body)
                }
            })
            .await
    }

    pub async fn symbol_params(
        &self,
        symbol: &str,
        cancel: &CancellationToken,
        deadline: Option<Duration>,
    ) -> Result<SymbolParamsData, ClientError> {
        require_symbol(symbol)?;
        let deadline = Some(deadline.unwrap_or(DEADLINE_INFO));
        let symbol = symbol.to_string();
        self.executor
            .execute(cancel, deadline, move |mut transport, instance_id| {
                let symbol = symbol.clone();
                async move {
                    let reply = transport
                        .symbol_info
                        .symbol_params(SymbolParamsRequest {
                            terminal_instance_guid: instance_id.to_string(),
                            symbol,
                        })
                        .await?
                        .into_inner();
                    unwrap_body!(reply.body, symbol_params_reply::Body)
                }
            })
            .await
    }
}
