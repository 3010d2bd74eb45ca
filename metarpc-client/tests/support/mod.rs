//! A minimal in-process MT5 gateway double for integration tests. Mirrors
//! the mock-exchange idiom of constructing the dependency's real server
//! trait rather than stubbing the client, so tests exercise the same
//! encode/decode path production traffic does.

use metarpc_proto::{
    account_helper_server::{AccountHelper, AccountHelperServer},
    connection_server::{Connection, ConnectionServer},
    trade_functions_server::{TradeFunctions, TradeFunctionsServer},
    connect_reply, history_deals_get_reply, order_calc_margin_reply, order_calc_profit_reply, order_check_reply,
    orders_get_reply, orders_total_reply, positions_get_reply, positions_total_reply,
    ConnectByHostPortRequest, ConnectByServerNameRequest, ConnectData, ConnectReply, Error as WireError,
    HistoryDealsGetData, HistoryDealsGetReply, HistoryDealsGetRequest, OrderCalcMarginReply, OrderCalcMarginRequest,
    OrderCalcProfitReply, OrderCalcProfitRequest, OrderCheckData, OrderCheckReply, OrderCheckRequest, OrderCloseReply,
    OrderCloseRequest, OrderModifyReply, OrderModifyRequest, OrderSendData, OrderSendReply, OrderSendRequest,
    OrdersGetData, OrdersGetReply, OrdersGetRequest, OrdersTotalReply, PingReply, PingRequest, PositionData,
    PositionsGetData, PositionsGetReply, PositionsGetRequest, PositionsTotalReply, TerminalRequest,
};
use std::{
    net::SocketAddr,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
};
use tonic::{transport::Server, Request, Response, Status};
use uuid::Uuid;

/// Shared knobs the test controls after the gateway is already serving.
#[derive(Clone, Default)]
pub struct MockState {
    /// Number of subsequent `Ping` calls that should fail with a transient
    /// `Unavailable` status before succeeding.
    pub ping_failures_remaining: Arc<AtomicUsize>,
    pub ping_calls: Arc<AtomicUsize>,
    pub connect_calls: Arc<AtomicUsize>,
    /// Open positions the trade-functions mock serves and closes against.
    pub positions: Arc<Mutex<Vec<PositionData>>>,
    pub order_close_calls: Arc<AtomicUsize>,
}

struct MockConnection {
    state: MockState,
}

#[tonic::async_trait]
impl Connection for MockConnection {
    async fn connect_by_server_name(
        &self,
        _request: Request<ConnectByServerNameRequest>,
    ) -> Result<Response<ConnectReply>, Status> {
        self.state.connect_calls.fetch_add(1, Ordering::SeqCst);
        Ok(Response::new(ConnectReply {
            body: Some(connect_reply::Body::Data(ConnectData {
                terminal_instance_guid: Uuid::new_v4().to_string(),
                resolved_host: "127.0.0.1".to_string(),
                resolved_port: 0,
            })),
        }))
    }

    async fn connect_by_host_port(
        &self,
        _request: Request<ConnectByHostPortRequest>,
    ) -> Result<Response<ConnectReply>, Status> {
        self.state.connect_calls.fetch_add(1, Ordering::SeqCst);
        Ok(Response::new(ConnectReply {
            body: Some(connect_reply::Body::Data(ConnectData {
                terminal_instance_guid: Uuid::new_v4().to_string(),
                resolved_host: "127.0.0.1".to_string(),
                resolved_port: 0,
            })),
        }))
    }
}

struct MockAccountHelper {
    state: MockState,
}

#[tonic::async_trait]
impl AccountHelper for MockAccountHelper {
    async fn ping(&self, _request: Request<PingRequest>) -> Result<Response<PingReply>, Status> {
        self.state.ping_calls.fetch_add(1, Ordering::SeqCst);

        let remaining = self.state.ping_failures_remaining.load(Ordering::SeqCst);
        if remaining > 0 {
            self.state.ping_failures_remaining.fetch_sub(1, Ordering::SeqCst);
            return Err(Status::unavailable("mock gateway is warming up"));
        }

        Ok(Response::new(PingReply {
            body: Some(metarpc_proto::ping_reply::Body::Data(true)),
        }))
    }
}

struct MockTradeFunctions {
    state: MockState,
}

#[tonic::async_trait]
impl TradeFunctions for MockTradeFunctions {
    async fn order_check(&self, _request: Request<OrderCheckRequest>) -> Result<Response<OrderCheckReply>, Status> {
        Ok(Response::new(OrderCheckReply {
            body: Some(order_check_reply::Body::Data(OrderCheckData {
                balance_after: 0.0,
                equity_after: 0.0,
                margin_required: 0.0,
                margin_free_after: 0.0,
                margin_level_after: 0.0,
            })),
        }))
    }

    async fn order_calc_margin(&self, _request: Request<OrderCalcMarginRequest>) -> Result<Response<OrderCalcMarginReply>, Status> {
        Ok(Response::new(OrderCalcMarginReply {
            body: Some(order_calc_margin_reply::Body::Data(0.0)),
        }))
    }

    async fn order_calc_profit(&self, _request: Request<OrderCalcProfitRequest>) -> Result<Response<OrderCalcProfitReply>, Status> {
        Ok(Response::new(OrderCalcProfitReply {
            body: Some(order_calc_profit_reply::Body::Data(0.0)),
        }))
    }

    async fn order_send(&self, _request: Request<OrderSendRequest>) -> Result<Response<OrderSendReply>, Status> {
        Ok(Response::new(OrderSendReply {
            body: Some(metarpc_proto::order_send_reply::Body::Data(OrderSendData {
                retcode: metarpc_client::retcode::TRADE_RETCODE_DONE,
                ticket: 1,
                order: 1,
                volume: 0.0,
                price: 0.0,
                comment: String::new(),
            })),
        }))
    }

    async fn order_modify(&self, _request: Request<OrderModifyRequest>) -> Result<Response<OrderModifyReply>, Status> {
        Ok(Response::new(OrderModifyReply {
            body: Some(metarpc_proto::order_modify_reply::Body::Data(OrderSendData {
                retcode: metarpc_client::retcode::TRADE_RETCODE_DONE,
                ticket: 1,
                order: 1,
                volume: 0.0,
                price: 0.0,
                comment: String::new(),
            })),
        }))
    }

    async fn order_close(&self, request: Request<OrderCloseRequest>) -> Result<Response<OrderCloseReply>, Status> {
        self.state.order_close_calls.fetch_add(1, Ordering::SeqCst);
        let ticket = request.into_inner().ticket;
        let mut positions = self.state.positions.lock().unwrap();
        let before = positions.len();
        positions.retain(|position| position.ticket != ticket);
        let closed = positions.len() != before;

        if !closed {
            return Ok(Response::new(OrderCloseReply {
                body: Some(metarpc_proto::order_close_reply::Body::Error(remote_error("position not found"))),
            }));
        }

        Ok(Response::new(OrderCloseReply {
            body: Some(metarpc_proto::order_close_reply::Body::Data(OrderSendData {
                retcode: metarpc_client::retcode::TRADE_RETCODE_DONE,
                ticket,
                order: ticket,
                volume: 0.0,
                price: 0.0,
                comment: String::new(),
            })),
        }))
    }

    async fn positions_total(&self, _request: Request<TerminalRequest>) -> Result<Response<PositionsTotalReply>, Status> {
        let count = self.state.positions.lock().unwrap().len() as i32;
        Ok(Response::new(PositionsTotalReply {
            body: Some(positions_total_reply::Body::Data(count)),
        }))
    }

    async fn positions_get(&self, _request: Request<PositionsGetRequest>) -> Result<Response<PositionsGetReply>, Status> {
        let positions = self.state.positions.lock().unwrap().clone();
        Ok(Response::new(PositionsGetReply {
            body: Some(positions_get_reply::Body::Data(PositionsGetData { positions })),
        }))
    }

    async fn orders_total(&self, _request: Request<TerminalRequest>) -> Result<Response<OrdersTotalReply>, Status> {
        Ok(Response::new(OrdersTotalReply {
            body: Some(orders_total_reply::Body::Data(0)),
        }))
    }

    async fn orders_get(&self, _request: Request<OrdersGetRequest>) -> Result<Response<OrdersGetReply>, Status> {
        Ok(Response::new(OrdersGetReply {
            body: Some(orders_get_reply::Body::Data(OrdersGetData { orders: vec![] })),
        }))
    }

    async fn history_deals_get(&self, _request: Request<HistoryDealsGetRequest>) -> Result<Response<HistoryDealsGetReply>, Status> {
        Ok(Response::new(HistoryDealsGetReply {
            body: Some(history_deals_get_reply::Body::Data(HistoryDealsGetData { deals: vec![] })),
        }))
    }
}

/// Builds an open-position fixture for seeding [`MockState::positions`].
pub fn open_position(ticket: u64, symbol: &str, volume: f64) -> PositionData {
    PositionData {
        ticket,
        symbol: symbol.to_string(),
        r#type: 0,
        volume,
        price_open: 1.0,
        price_current: 1.0,
        sl: 0.0,
        tp: 0.0,
        profit: 0.0,
        time_msc: 0,
        magic: 0,
        comment: String::new(),
    }
}

/// A reply with a business-level rejection, for tests of the non-transient
/// path (`RemoteError`).
#[allow(dead_code)]
pub fn remote_error(message: &str) -> WireError {
    WireError {
        code: 1,
        message: message.to_string(),
    }
}

/// Starts the mock gateway on an OS-assigned port and returns its address
/// plus the shared state used to steer its behaviour mid-test.
pub async fn spawn_mock_gateway() -> (SocketAddr, MockState) {
    let state = MockState::default();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind mock gateway");
    let addr = listener.local_addr().expect("local addr");

    let connection = ConnectionServer::new(MockConnection { state: state.clone() });
    let account_helper = AccountHelperServer::new(MockAccountHelper { state: state.clone() });
    let trade_functions = TradeFunctionsServer::new(MockTradeFunctions { state: state.clone() });

    tokio::spawn(async move {
        Server::builder()
            .add_service(connection)
            .add_service(account_helper)
            .add_service(trade_functions)
            .serve_with_incoming(tokio_stream::wrappers::TcpListenerStream::new(listener))
            .await
            .expect("mock gateway crashed");
    });

    // Give the listener a moment to start accepting before the first dial.
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;

    (addr, state)
}
