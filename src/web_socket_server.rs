use actix::prelude::*;
use actix_web::{web, HttpRequest, HttpResponse};
use actix_web_actors::ws;
use log::debug;
use std::time::{Duration, Instant};

use crate::app_state::AppState;
use crate::emitter::{EventBus, OutboundEvent, Subscribe, Unsubscribe};

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);
const CLIENT_TIMEOUT: Duration = Duration::from_secs(10);

/// A websocket session subscribed to the project event bus. Clients receive
/// every published membership-change event as JSON text frames.
pub struct EventSocket {
    session_id: usize,
    hb: Instant,
    bus: Addr<EventBus>,
}

impl EventSocket {
    pub fn new(bus: Addr<EventBus>) -> Self {
        EventSocket { session_id: 0, hb: Instant::now(), bus }
    }

    fn hb(&self, ctx: &mut ws::WebsocketContext<Self>) {
        ctx.run_interval(HEARTBEAT_INTERVAL, |act, ctx| {
            if Instant::now().duration_since(act.hb) > CLIENT_TIMEOUT {
                debug!("Event socket heartbeat failed, disconnecting");
                ctx.stop();
                return;
            }
            ctx.ping(b"");
        });
    }
}

impl Actor for EventSocket {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        self.hb(ctx);
        let addr = ctx.address();
        self.bus
            .send(Subscribe { addr: addr.recipient() })
            .into_actor(self)
            .then(|res, act, ctx| {
                match res {
                    Ok(session_id) => act.session_id = session_id,
                    Err(_) => ctx.stop(),
                }
                fut::ready(())
            })
            .wait(ctx);
    }

    fn stopped(&mut self, _: &mut Self::Context) {
        self.bus.do_send(Unsubscribe { session_id: self.session_id });
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for EventSocket {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Ping(msg)) => {
                self.hb = Instant::now();
                ctx.pong(&msg);
            }
            Ok(ws::Message::Pong(_)) => {
                self.hb = Instant::now();
            }
            Ok(ws::Message::Close(reason)) => {
                ctx.close(reason);
                ctx.stop();
            }
            Err(e) => {
                debug!("Event socket error: {}", e);
                ctx.stop();
            }
            // Subscribers are receive-only.
            _ => {}
        }
    }
}

impl Handler<OutboundEvent> for EventSocket {
    type Result = ();

    fn handle(&mut self, msg: OutboundEvent, ctx: &mut ws::WebsocketContext<Self>) {
        ctx.text(msg.payload);
    }
}

/// GET /ws
pub async fn ws_index(
    req: HttpRequest,
    stream: web::Payload,
    data: web::Data<AppState>,
) -> Result<HttpResponse, actix_web::Error> {
    ws::start(EventSocket::new(data.event_bus.clone()), &req, stream)
}
