//! Inbound OSC listener: keeps the parameter cache and active context current.

use std::sync::Arc;

use tokio::net::UdpSocket;
use tokio::sync::watch;

use crate::command::ActionValue;
use crate::engine::Engine;
use crate::osc::{decode_packet, OscArg, OscMessage};

/// Address the avatar application uses to announce a newly loaded avatar id.
pub const AVATAR_CHANGE_ADDRESS: &str = "/avatar/change";

const MAX_PACKET_BYTES: usize = 4096;

#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    Parameter { path: String, value: ActionValue },
    ContextChanged(String),
}

/// Translate one decoded message; anything we don't track yields `None`.
pub fn event_from_message(message: &OscMessage) -> Option<InboundEvent> {
    if message.address == AVATAR_CHANGE_ADDRESS {
        return match message.args.as_slice() {
            [OscArg::Str(id)] => Some(InboundEvent::ContextChanged(id.clone())),
            _ => None,
        };
    }
    match message.args.as_slice() {
        [arg] => arg.as_action_value().map(|value| InboundEvent::Parameter {
            path: message.address.clone(),
            value,
        }),
        _ => None,
    }
}

/// Receive packets until `shutdown` flips to true or the socket fails.
pub async fn run_listener(
    socket: UdpSocket,
    engine: Arc<Engine>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut buf = vec![0_u8; MAX_PACKET_BYTES];
    if let Ok(addr) = socket.local_addr() {
        tracing::info!(%addr, "OSC listener started");
    }
    loop {
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            received = socket.recv_from(&mut buf) => {
                let (len, peer) = match received {
                    Ok(received) => received,
                    Err(err) => {
                        tracing::warn!(error = %err, "OSC listener receive failed");
                        continue;
                    }
                };
                match decode_packet(&buf[..len]) {
                    Ok(messages) => {
                        for event in messages.iter().filter_map(event_from_message) {
                            engine.apply_inbound(event);
                        }
                    }
                    Err(err) => tracing::debug!(%peer, error = %err, "dropping malformed OSC packet"),
                }
            }
        }
    }
    tracing::info!("OSC listener stopped");
}
