use std::time::{Duration, Instant};

use actix::prelude::*;
use actix_web::{web, Error, HttpRequest, HttpResponse};
use actix_web_actors::ws;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{info, warn};

use crate::errors::DomainError;
use crate::extractors::current_actor::CurrentActor;
use crate::state::app_state::AppState;
use crate::ws::hub::ConnectionId;
use crate::ws::protocol::{ClientMsg, ErrorCode, RoomId, ServerMsg, PROTOCOL_VERSION};

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(20);
const CLIENT_TIMEOUT: Duration = Duration::from_secs(40);

pub async fn upgrade(
    req: HttpRequest,
    stream: web::Payload,
    current_actor: CurrentActor,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let session = WsSession::new(current_actor, app_state);
    ws::start(session, &req, stream)
}

pub struct WsSession {
    /// Assigned by the hub once the actor has started.
    conn_id: Option<ConnectionId>,
    current_actor: CurrentActor,
    app_state: web::Data<AppState>,

    last_heartbeat: Instant,
    hello_done: bool,
}

impl WsSession {
    fn new(current_actor: CurrentActor, app_state: web::Data<AppState>) -> Self {
        Self {
            conn_id: None,
            current_actor,
            app_state,
            last_heartbeat: Instant::now(),
            hello_done: false,
        }
    }

    fn send_json(ctx: &mut ws::WebsocketContext<Self>, msg: &ServerMsg) {
        match serde_json::to_string(msg) {
            Ok(payload) => ctx.text(payload),
            Err(err) => warn!(error = %err, "[WS SESSION] failed to serialize outbound message"),
        }
    }

    fn send_error_and_close(
        &self,
        ctx: &mut ws::WebsocketContext<Self>,
        code: ErrorCode,
        message: impl Into<String>,
    ) {
        let msg = ServerMsg::Error {
            code,
            message: message.into(),
        };
        Self::send_json(ctx, &msg);
        ctx.close(Some(ws::CloseReason::from(ws::CloseCode::Error)));
        ctx.stop();
    }

    /// Domain failures stay on the wire as error events; only Internal
    /// tears the socket down, to avoid a live-but-broken session.
    fn report_domain_error(ctx: &mut ws::WebsocketContext<Self>, err: &DomainError) {
        Self::send_json(ctx, &ServerMsg::error_for(err));
        if matches!(err, DomainError::Internal(_)) {
            ctx.close(Some(ws::CloseReason::from(ws::CloseCode::Error)));
            ctx.stop();
        }
    }

    fn require_hello(&self, ctx: &mut ws::WebsocketContext<Self>) -> bool {
        if !self.hello_done {
            self.send_error_and_close(ctx, ErrorCode::BadRequest, "Must send hello first");
        }
        self.hello_done
    }

    fn start_heartbeat(&mut self, ctx: &mut ws::WebsocketContext<Self>) {
        ctx.run_interval(HEARTBEAT_INTERVAL, |actor, ctx| {
            if Instant::now().duration_since(actor.last_heartbeat) > CLIENT_TIMEOUT {
                warn!(
                    actor_id = %actor.current_actor.0.id,
                    "[WS SESSION] heartbeat timed out"
                );
                ctx.close(Some(ws::CloseReason::from(ws::CloseCode::Normal)));
                ctx.stop();
                return;
            }
            ctx.ping(b"keepalive");
        });
    }

    fn dispatch(&mut self, cmd: ClientMsg, ctx: &mut ws::WebsocketContext<Self>) {
        let actor = self.current_actor.0;
        let app_state = self.app_state.clone();
        let Some(conn_id) = self.conn_id else {
            self.send_error_and_close(ctx, ErrorCode::Internal, "Session not registered");
            return;
        };

        match cmd {
            ClientMsg::Hello { protocol } => {
                if protocol != PROTOCOL_VERSION {
                    self.send_error_and_close(
                        ctx,
                        ErrorCode::BadProtocol,
                        "Unsupported protocol version",
                    );
                    return;
                }
                self.hello_done = true;
                Self::send_json(
                    ctx,
                    &ServerMsg::HelloAck {
                        protocol: PROTOCOL_VERSION,
                        actor_id: actor.id,
                        role: actor.role,
                    },
                );
            }

            ClientMsg::JoinOrderRoom { order_id } => {
                if !self.require_hello(ctx) {
                    return;
                }
                ctx.spawn(
                    async move {
                        app_state
                            .hub()
                            .join_room(conn_id, RoomId::Order(order_id))
                            .await
                    }
                    .into_actor(self)
                    .map(move |res, _actor, ctx| match res {
                        Ok(()) => Self::send_json(ctx, &ServerMsg::Ack { message: "joined" }),
                        Err(err) => {
                            warn!(%order_id, conn_id = %conn_id, error = %err, "[WS SESSION] join refused");
                            Self::report_domain_error(ctx, &err);
                        }
                    }),
                );
            }

            ClientMsg::LeaveOrderRoom { order_id } => {
                if !self.require_hello(ctx) {
                    return;
                }
                self.app_state
                    .hub()
                    .leave_room(conn_id, RoomId::Order(order_id));
                Self::send_json(ctx, &ServerMsg::Ack { message: "left" });
            }

            ClientMsg::SendMessage { order_id, content } => {
                if !self.require_hello(ctx) {
                    return;
                }
                // The stored message reaches this session back through the
                // room broadcast; the ack only confirms acceptance.
                ctx.spawn(
                    async move {
                        app_state
                            .coordinator()
                            .send_message(order_id, &actor, content)
                            .await
                    }
                    .into_actor(self)
                    .map(|res, _actor, ctx| match res {
                        Ok(_) => Self::send_json(ctx, &ServerMsg::Ack { message: "sent" }),
                        Err(err) => Self::report_domain_error(ctx, &err),
                    }),
                );
            }

            ClientMsg::UpdateLocation {
                order_id,
                lat,
                lng,
                status,
            } => {
                if !self.require_hello(ctx) {
                    return;
                }
                ctx.spawn(
                    async move {
                        app_state
                            .coordinator()
                            .share_location(order_id, &actor, lat, lng, status)
                            .await
                    }
                    .into_actor(self)
                    .map(|res, _actor, ctx| {
                        if let Err(err) = res {
                            Self::report_domain_error(ctx, &err);
                        }
                    }),
                );
            }

            ClientMsg::TypingStart { order_id } => {
                if !self.require_hello(ctx) {
                    return;
                }
                self.relay_typing(order_id, true, ctx);
            }

            ClientMsg::TypingStop { order_id } => {
                if !self.require_hello(ctx) {
                    return;
                }
                self.relay_typing(order_id, false, ctx);
            }
        }
    }

    fn relay_typing(
        &mut self,
        order_id: crate::domain::OrderId,
        typing: bool,
        ctx: &mut ws::WebsocketContext<Self>,
    ) {
        let actor = self.current_actor.0;
        let app_state = self.app_state.clone();
        ctx.spawn(
            async move {
                app_state
                    .coordinator()
                    .set_typing(order_id, &actor, typing)
                    .await
            }
            .into_actor(self)
            .map(|res, _actor, ctx| {
                if let Err(err) = res {
                    Self::report_domain_error(ctx, &err);
                }
            }),
        );
    }
}

impl Actor for WsSession {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        let (conn_id, outbound) = self.app_state.hub().connect(self.current_actor.0);
        self.conn_id = Some(conn_id);
        ctx.add_stream(ReceiverStream::new(outbound));
        self.start_heartbeat(ctx);

        info!(
            conn_id = %conn_id,
            actor_id = %self.current_actor.0.id,
            role = %self.current_actor.0.role,
            "[WS SESSION] started"
        );
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        if let Some(conn_id) = self.conn_id {
            self.app_state.hub().disconnect(conn_id);
            info!(
                conn_id = %conn_id,
                actor_id = %self.current_actor.0.id,
                "[WS SESSION] stopped"
            );
        }
    }
}

/// Hub fan-out. When the hub drops our queue (overflow or explicit
/// disconnect) the stream finishes and the default handler stops the
/// actor, which closes the socket.
impl StreamHandler<ServerMsg> for WsSession {
    fn handle(&mut self, msg: ServerMsg, ctx: &mut Self::Context) {
        Self::send_json(ctx, &msg);
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for WsSession {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Ping(payload)) => {
                self.last_heartbeat = Instant::now();
                ctx.pong(&payload);
            }
            Ok(ws::Message::Pong(_)) => {
                self.last_heartbeat = Instant::now();
            }
            Ok(ws::Message::Text(text)) => {
                self.last_heartbeat = Instant::now();

                let parsed: Result<ClientMsg, _> = serde_json::from_str(&text);
                let Ok(cmd) = parsed else {
                    self.send_error_and_close(ctx, ErrorCode::BadRequest, "Malformed JSON");
                    return;
                };
                self.dispatch(cmd, ctx);
            }
            Ok(ws::Message::Binary(_)) => {
                self.last_heartbeat = Instant::now();
                self.send_error_and_close(ctx, ErrorCode::BadRequest, "Binary not supported");
            }
            Ok(ws::Message::Close(reason)) => {
                ctx.close(reason);
                ctx.stop();
            }
            Ok(ws::Message::Continuation(_)) => {
                self.last_heartbeat = Instant::now();
            }
            Ok(ws::Message::Nop) => {
                self.last_heartbeat = Instant::now();
            }
            Err(err) => {
                warn!(
                    actor_id = %self.current_actor.0.id,
                    error = %err,
                    "[WS SESSION] protocol error"
                );
                ctx.close(Some(ws::CloseReason::from(ws::CloseCode::Error)));
                ctx.stop();
            }
        }
    }
}
