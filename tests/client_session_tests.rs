mod support;

use std::sync::Arc;
use std::time::Duration;

use battleship_server::{
    ClientSession, InMemoryTransport, ServerConfig, ServerRegistry, Transport,
};
use support::FLEET_TEXT;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(5);

struct Client {
    transport: InMemoryTransport,
}

impl Client {
    async fn send(&mut self, line: &str) {
        self.transport.send(line).await.unwrap();
    }

    async fn recv(&mut self) -> String {
        timeout(WAIT, self.transport.recv())
            .await
            .expect("timed out waiting for a line")
            .unwrap()
    }

    async fn expect(&mut self, line: &str) {
        assert_eq!(self.recv().await, line);
    }

    /// Skip lines until one starts with `prefix`.
    async fn recv_until(&mut self, prefix: &str) -> String {
        loop {
            let line = self.recv().await;
            if line.starts_with(prefix) {
                return line;
            }
        }
    }

    async fn closed(&mut self) -> bool {
        timeout(WAIT, self.transport.recv()).await.unwrap().is_err()
    }
}

struct Harness {
    registry: Arc<ServerRegistry>,
    shutdown: watch::Sender<bool>,
}

impl Harness {
    fn new(config: ServerConfig) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            registry: ServerRegistry::shared(config),
            shutdown,
        }
    }

    async fn connect(&self) -> (Client, JoinHandle<anyhow::Result<()>>) {
        let (client_end, server_end) = InMemoryTransport::pair();
        let session = ClientSession::new(
            server_end,
            Arc::clone(&self.registry),
            self.shutdown.subscribe(),
        );
        let task = tokio::spawn(session.run());
        let mut client = Client {
            transport: client_end,
        };
        let hello = client.recv().await;
        let id = hello.strip_prefix("CONNECTED:").unwrap();
        assert_eq!(id.len(), 8);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
        (client, task)
    }

    async fn registered(&self, name: &str) -> (Client, JoinHandle<anyhow::Result<()>>) {
        let (mut client, task) = self.connect().await;
        client.send(&format!("REGISTER:{}", name)).await;
        client.expect(&format!("REGISTERED:{}", name)).await;
        client.recv_until("GAME_LIST:").await;
        (client, task)
    }
}

fn harness() -> Harness {
    Harness::new(ServerConfig::default())
}

#[tokio::test]
async fn register_replies_with_name_and_room_list() {
    let h = harness();
    let (mut alice, _task) = h.connect().await;
    alice.send("REGISTER:alice").await;
    alice.expect("REGISTERED:alice").await;
    alice.expect("GAME_LIST:").await;
    assert!(h.registry.is_registered("alice"));
}

#[tokio::test]
async fn full_pvp_game_setup_and_first_shot() {
    let h = harness();
    let (mut alice, _a) = h.registered("alice").await;
    alice.send("CREATE_GAME:Alpha").await;
    alice.expect("GAME_CREATED:Alpha").await;
    alice.expect("GAME_LIST:Alpha:alice:1:WAITING").await;

    let (mut bob, _b) = h.connect().await;
    bob.send("REGISTER:bob").await;
    bob.expect("REGISTERED:bob").await;
    bob.expect("GAME_LIST:Alpha:alice:1:WAITING").await;
    bob.send("JOIN_GAME:Alpha").await;
    bob.expect("GAME_JOINED:Alpha:alice").await;
    bob.expect("GAME_LIST:Alpha:alice:2:PLACING_SHIPS").await;
    alice.expect("PLAYER_JOINED:bob").await;
    alice.expect("GAME_LIST:Alpha:alice:2:PLACING_SHIPS").await;

    alice.send(&format!("SHIPS_PLACED:{}", FLEET_TEXT)).await;
    alice.expect("SHIPS_ACCEPTED").await;
    alice.expect("WAITING_FOR_OPPONENT").await;
    bob.expect("OPPONENT_PLACING_SHIPS").await;
    bob.send(&format!("SHIPS_PLACED:{}", FLEET_TEXT)).await;
    bob.expect("SHIPS_ACCEPTED").await;
    bob.expect("ALL_SHIPS_PLACED").await;
    alice.expect("ALL_SHIPS_PLACED").await;

    alice.send("READY").await;
    bob.send("READY").await;
    alice.expect("GAME_START:YOUR_TURN:bob").await;
    bob.expect("GAME_START:OPPONENT_TURN:alice").await;

    alice.send("SHOT:9:9").await;
    for client in [&mut alice, &mut bob] {
        client.expect("SHOT_RESULT:alice:MISS:9:9").await;
        client.expect("TURN:bob").await;
    }
    bob.send("SHOT:9:4").await;
    alice.expect("SHOT_RESULT:bob:SUNK:9:4").await;
    bob.expect("SHOT_RESULT:bob:SUNK:9:4").await;
}

#[tokio::test]
async fn rule_violations_are_reported() {
    let h = harness();
    let (mut alice, _task) = h.connect().await;
    alice.send("CREATE_GAME:Alpha").await;
    alice.expect("ERROR:Register a name first").await;
    alice.send("REGISTER:alice").await;
    alice.recv_until("GAME_LIST:").await;
    alice.send("SHOT:1:1").await;
    alice.expect("ERROR:Not in a game").await;
    alice.send("CREATE_GAME:Alpha").await;
    alice.recv_until("GAME_LIST:").await;
    alice.send("CREATE_GAME:Bravo").await;
    alice.expect("ERROR:Already in a game").await;
    alice.send("READY").await;
    alice.expect("ERROR:Place your ships first").await;
}

#[tokio::test]
async fn malformed_and_unknown_lines_are_dropped() {
    let h = harness();
    let (mut alice, _task) = h.registered("alice").await;
    alice.send("FIRE:1:1").await;
    alice.send("SHOT:x:y").await;
    alice.send("").await;
    alice.send("LIST_GAMES").await;
    alice.expect("GAME_LIST:").await;
}

#[tokio::test]
async fn lenient_mode_hides_rule_violations_but_not_lookup_failures() {
    let h = Harness::new(ServerConfig {
        report_rule_violations: false,
        ..ServerConfig::default()
    });
    let (mut alice, _task) = h.registered("alice").await;
    alice.send("SHOT:1:1").await;
    alice.send("READY").await;
    alice.send("JOIN_GAME:Nowhere").await;
    alice.expect("ERROR:Game 'Nowhere' not found").await;
}

#[tokio::test]
async fn names_are_unique_and_bound_once() {
    let h = harness();
    let (mut alice, _a) = h.registered("alice").await;
    let (mut other, _o) = h.connect().await;
    other.send("REGISTER:alice").await;
    other.expect("ERROR:Name 'alice' is already taken").await;
    alice.send("REGISTER:alicia").await;
    alice.expect("ERROR:Already registered").await;
}

#[tokio::test]
async fn disconnect_cleans_up_user_and_room() {
    let h = harness();
    let (mut alice, alice_task) = h.registered("alice").await;
    let (mut bob, _b) = h.registered("bob").await;
    alice.send("CREATE_GAME:Alpha").await;
    alice.recv_until("GAME_LIST:Alpha").await;
    bob.expect("GAME_LIST:Alpha:alice:1:WAITING").await;

    alice.send("DISCONNECT").await;
    assert!(alice.closed().await);
    alice_task.await.unwrap().unwrap();

    bob.expect("GAME_LIST:").await;
    assert!(!h.registry.is_registered("alice"));
    assert_eq!(h.registry.room_count(), 0);
}

#[tokio::test]
async fn dropped_connection_counts_as_leaving() {
    let h = harness();
    let (mut alice, _a) = h.registered("alice").await;
    let (bob, bob_task) = h.registered("bob").await;
    alice.send("CREATE_GAME:Alpha").await;
    alice.recv_until("GAME_LIST:Alpha").await;
    drop(bob);
    bob_task.await.unwrap().unwrap();
    assert!(!h.registry.is_registered("bob"));

    let (mut bob, _b) = h.registered("bob").await;
    bob.send("JOIN_GAME:Alpha").await;
    bob.expect("GAME_JOINED:Alpha:alice").await;
    alice.expect("PLAYER_JOINED:bob").await;

    drop(bob);
    alice.recv_until("GAME_STATUS:WAITING").await;
    alice.expect("GAME_LIST:Alpha:alice:1:WAITING").await;
}

#[tokio::test]
async fn joiner_is_released_when_the_creator_leaves() {
    let h = harness();
    let (mut alice, _a) = h.registered("alice").await;
    let (mut bob, _b) = h.registered("bob").await;
    alice.send("CREATE_GAME:Alpha").await;
    bob.recv_until("GAME_LIST:Alpha").await;
    bob.send("JOIN_GAME:Alpha").await;
    bob.expect("GAME_JOINED:Alpha:alice").await;

    alice.send("LEAVE_GAME").await;
    alice.recv_until("LEFT_GAME").await;
    bob.recv_until("CREATOR_LEFT").await;
    bob.expect("GAME_LIST:").await;

    bob.send("READY").await;
    bob.expect("ERROR:Not in a game").await;
    bob.send("CREATE_GAME:Bravo").await;
    bob.expect("GAME_CREATED:Bravo").await;
}

#[tokio::test]
async fn shutdown_sends_server_closed_and_cleans_up() {
    let h = harness();
    let (mut alice, alice_task) = h.registered("alice").await;
    let (mut anon, anon_task) = h.connect().await;
    alice.send("CREATE_GAME:Alpha").await;
    alice.recv_until("GAME_LIST:Alpha").await;

    h.shutdown.send(true).unwrap();
    alice.recv_until("SERVER_CLOSED").await;
    anon.expect("SERVER_CLOSED").await;
    alice_task.await.unwrap().unwrap();
    anon_task.await.unwrap().unwrap();
    assert!(alice.closed().await);
    assert_eq!(h.registry.user_count(), 0);
    assert_eq!(h.registry.room_count(), 0);
}

#[tokio::test]
async fn ai_game_over_a_session() {
    let h = Harness::new(ServerConfig {
        ai_delay: Duration::from_millis(10),
        seed: Some(1),
        ..ServerConfig::default()
    });
    let (mut alice, _task) = h.registered("alice").await;
    alice.send("CREATE_GAME:AI").await;
    alice.expect("GAME_CREATED:AI").await;
    alice.send(&format!("SHIPS_PLACED:{}", FLEET_TEXT)).await;
    alice.expect("SHIPS_ACCEPTED").await;
    alice.expect("ALL_SHIPS_PLACED").await;
    alice.send("READY").await;
    alice.expect("GAME_START:YOUR_TURN:COMPUTER").await;

    // Walk the board until a miss hands the turn over.
    'search: for y in 0..10 {
        for x in 0..10 {
            alice.send(&format!("SHOT:{}:{}", x, y)).await;
            let result = alice.recv_until("SHOT_RESULT:alice:").await;
            if result.contains(":MISS:") {
                break 'search;
            }
        }
    }
    alice.expect("TURN:COMPUTER").await;
    let shot = alice.recv_until("SHOT_RESULT:COMPUTER:").await;
    assert!(shot.starts_with("SHOT_RESULT:COMPUTER:"));

    alice.send("LEAVE_GAME").await;
    alice.recv_until("LEFT_GAME").await;
    alice.send("SHOT:0:0").await;
    alice.recv_until("ERROR:Not in a game").await;
}
