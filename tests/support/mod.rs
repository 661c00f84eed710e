#![allow(dead_code)]

use battleship_server::{Connection, OutboxReceiver, PlayerHandle, ServerMessage};

/// A legal fleet: every row from y = 5 down is open water.
pub const FLEET_TEXT: &str =
    "0,0,0,0;1,5,0,0;1,0,2,0;2,4,2,0;2,7,2,0;2,0,4,0;3,3,4,0;3,5,4,0;3,7,4,0;3,9,4,0;";

/// Every hull cell of [`FLEET_TEXT`].
pub const FLEET_CELLS: [(usize, usize); 20] = [
    (0, 0), (1, 0), (2, 0), (3, 0),
    (5, 0), (6, 0), (7, 0),
    (0, 2), (1, 2), (2, 2),
    (4, 2), (5, 2),
    (7, 2), (8, 2),
    (0, 4), (1, 4),
    (3, 4), (5, 4), (7, 4), (9, 4),
];

/// A lone destroyer of [`FLEET_TEXT`].
pub const DESTROYER: (usize, usize) = (9, 4);

/// Open water in [`FLEET_TEXT`].
pub const WATER: (usize, usize) = (9, 9);

/// Player with its own outbox.
pub fn player(name: &str) -> (PlayerHandle, OutboxReceiver) {
    let (conn, rx) = Connection::open();
    (PlayerHandle::new(name, conn), rx)
}

/// Everything queued so far, as wire lines.
pub fn drain(rx: &mut OutboxReceiver) -> Vec<String> {
    let mut lines = Vec::new();
    while let Ok(msg) = rx.try_recv() {
        lines.push(msg.to_string());
    }
    lines
}

/// Everything queued so far, as messages.
pub fn drain_messages(rx: &mut OutboxReceiver) -> Vec<ServerMessage> {
    let mut msgs = Vec::new();
    while let Ok(msg) = rx.try_recv() {
        msgs.push(msg);
    }
    msgs
}
