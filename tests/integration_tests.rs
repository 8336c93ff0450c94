//! Integration tests for the room synchronization stack.
//!
//! These tests validate the wire protocol and run full client/server
//! exchanges over real UDP sockets.

use bincode::{deserialize, serialize};
use server::network::Server;
use shared::{Direction, Packet, Player};
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::timeout;

const RECV_TIMEOUT: Duration = Duration::from_secs(2);

/// NETWORK PROTOCOL TESTS
mod protocol_tests {
    use super::*;

    /// Tests packet serialization round-trip for network protocol validation
    #[tokio::test]
    async fn packet_serialization_roundtrip() {
        let test_packets = vec![
            Packet::Join {
                name: Some("Abc123".to_string()),
            },
            Packet::Move {
                x: 123.0,
                y: 456.0,
                direction: Direction::Left,
            },
            Packet::ChangeRoom {
                target_room: "beach".to_string(),
                from_room: Some("town".to_string()),
            },
            Packet::Joined {
                player: Player::new(7, "Abc123".to_string(), 400.0, 300.0, "town".to_string()),
            },
            Packet::Error {
                message: "Server full".to_string(),
            },
        ];

        for packet in test_packets {
            let serialized = serialize(&packet).unwrap();
            let deserialized: Packet = deserialize(&serialized).unwrap();

            match (&packet, &deserialized) {
                (Packet::Join { .. }, Packet::Join { .. }) => {}
                (Packet::Move { .. }, Packet::Move { .. }) => {}
                (Packet::ChangeRoom { .. }, Packet::ChangeRoom { .. }) => {}
                (Packet::Joined { .. }, Packet::Joined { .. }) => {}
                (Packet::Error { .. }, Packet::Error { .. }) => {}
                _ => panic!("Packet type mismatch after serialization"),
            }
        }
    }

    /// Tests malformed packet handling
    #[test]
    fn malformed_packet_handling() {
        let valid_packet = Packet::Join { name: None };
        let valid_data = serialize(&valid_packet).unwrap();

        let truncated_data = &valid_data[..valid_data.len() / 2];
        let result: Result<Packet, _> = deserialize(truncated_data);
        assert!(
            result.is_err(),
            "Should fail to deserialize truncated packet"
        );

        let mut corrupted_data = valid_data.clone();
        corrupted_data[0] = 0xFF;
        let result: Result<Packet, _> = deserialize(&corrupted_data);
        assert!(
            result.is_err(),
            "Should fail to deserialize corrupted packet"
        );

        let result: Result<Packet, _> = deserialize(&[]);
        assert!(result.is_err(), "Should fail to deserialize empty packet");
    }
}

/// CLIENT-SERVER INTEGRATION TESTS
mod client_server_tests {
    use super::*;

    struct TestClient {
        socket: UdpSocket,
    }

    impl TestClient {
        async fn connect(server_addr: std::net::SocketAddr) -> Self {
            let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
            socket.connect(server_addr).await.unwrap();
            TestClient { socket }
        }

        async fn send(&self, packet: Packet) {
            let data = serialize(&packet).unwrap();
            self.socket.send(&data).await.unwrap();
        }

        async fn recv(&self) -> Packet {
            let mut buf = [0u8; 2048];
            let len = timeout(RECV_TIMEOUT, self.socket.recv(&mut buf))
                .await
                .expect("timed out waiting for packet")
                .unwrap();
            deserialize(&buf[..len]).unwrap()
        }
    }

    async fn spawn_server() -> std::net::SocketAddr {
        let mut server = Server::new("127.0.0.1:0", 8).await.unwrap();
        let addr = server.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = server.run().await;
        });
        addr
    }

    /// Tests the join handshake over a real socket: identity ack first,
    /// then the room snapshot.
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn join_handshake_over_udp() {
        let server_addr = spawn_server().await;
        let client = TestClient::connect(server_addr).await;

        client
            .send(Packet::Join {
                name: Some("Abc123".to_string()),
            })
            .await;

        let player = match client.recv().await {
            Packet::Joined { player } => player,
            other => panic!("Expected Joined, got {:?}", other),
        };
        assert_eq!(player.name, "Abc123");
        assert_eq!(player.room, "town");

        match client.recv().await {
            Packet::RoomState {
                room_id, players, ..
            } => {
                assert_eq!(room_id, "town");
                assert_eq!(players.len(), 1);
                assert_eq!(players[0].id, player.id);
            }
            other => panic!("Expected RoomState, got {:?}", other),
        }
    }

    /// Tests that movement reaches roommates but is never echoed back.
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn movement_relayed_to_roommates() {
        let server_addr = spawn_server().await;

        let mover = TestClient::connect(server_addr).await;
        mover
            .send(Packet::Join {
                name: Some("Mover".to_string()),
            })
            .await;
        let mover_id = match mover.recv().await {
            Packet::Joined { player } => player.id,
            other => panic!("Expected Joined, got {:?}", other),
        };
        mover.recv().await; // RoomState

        let watcher = TestClient::connect(server_addr).await;
        watcher
            .send(Packet::Join {
                name: Some("Watcher".to_string()),
            })
            .await;
        watcher.recv().await; // Joined
        watcher.recv().await; // RoomState

        // Mover hears about the watcher's arrival
        match mover.recv().await {
            Packet::PlayerJoined { player } => assert_eq!(player.name, "Watcher"),
            other => panic!("Expected PlayerJoined, got {:?}", other),
        }

        mover
            .send(Packet::Move {
                x: 410.0,
                y: 300.0,
                direction: Direction::Right,
            })
            .await;

        match watcher.recv().await {
            Packet::PlayerMoved {
                player_id,
                x,
                y,
                direction,
            } => {
                assert_eq!(player_id, mover_id);
                assert_eq!((x, y), (410.0, 300.0));
                assert_eq!(direction, Direction::Right);
            }
            other => panic!("Expected PlayerMoved, got {:?}", other),
        }
    }

    /// Tests that chat is echoed to the sender and recorded in the room
    /// history a later joiner receives.
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn chat_echoed_and_persisted() {
        let server_addr = spawn_server().await;

        let talker = TestClient::connect(server_addr).await;
        talker
            .send(Packet::Join {
                name: Some("Talker".to_string()),
            })
            .await;
        talker.recv().await; // Joined
        talker.recv().await; // RoomState

        talker
            .send(Packet::Chat {
                message: "hello room".to_string(),
            })
            .await;

        match talker.recv().await {
            Packet::ChatBroadcast { message } => {
                assert_eq!(message.message, "hello room");
                assert_eq!(message.player_name, "Talker");
            }
            other => panic!("Expected ChatBroadcast, got {:?}", other),
        }

        let latecomer = TestClient::connect(server_addr).await;
        latecomer.send(Packet::Join { name: None }).await;
        latecomer.recv().await; // Joined

        match latecomer.recv().await {
            Packet::RoomState {
                recent_messages, ..
            } => {
                assert_eq!(recent_messages.len(), 1);
                assert_eq!(recent_messages[0].message, "hello room");
            }
            other => panic!("Expected RoomState, got {:?}", other),
        }
    }

    /// Tests a full room transition: the mover gets RoomChanged plus the
    /// destination snapshot, roommates left behind get PlayerLeft.
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn room_transition_end_to_end() {
        let server_addr = spawn_server().await;

        let wanderer = TestClient::connect(server_addr).await;
        wanderer
            .send(Packet::Join {
                name: Some("Wanderer".to_string()),
            })
            .await;
        let wanderer_id = match wanderer.recv().await {
            Packet::Joined { player } => player.id,
            other => panic!("Expected Joined, got {:?}", other),
        };
        wanderer.recv().await; // RoomState

        let stayer = TestClient::connect(server_addr).await;
        stayer
            .send(Packet::Join {
                name: Some("Stayer".to_string()),
            })
            .await;
        stayer.recv().await; // Joined
        stayer.recv().await; // RoomState
        wanderer.recv().await; // PlayerJoined for Stayer

        wanderer
            .send(Packet::ChangeRoom {
                target_room: "beach".to_string(),
                from_room: Some("town".to_string()),
            })
            .await;

        match stayer.recv().await {
            Packet::PlayerLeft { player_id } => assert_eq!(player_id, wanderer_id),
            other => panic!("Expected PlayerLeft, got {:?}", other),
        }

        match wanderer.recv().await {
            Packet::RoomChanged {
                room_id,
                spawn_x,
                spawn_y,
            } => {
                assert_eq!(room_id, "beach");
                // Spawn keyed by the origin room
                assert_eq!((spawn_x, spawn_y), (700.0, 300.0));
            }
            other => panic!("Expected RoomChanged, got {:?}", other),
        }

        match wanderer.recv().await {
            Packet::RoomState {
                room_id, players, ..
            } => {
                assert_eq!(room_id, "beach");
                assert_eq!(players.len(), 1);
            }
            other => panic!("Expected RoomState, got {:?}", other),
        }
    }

    /// Tests that an illegal transition only answers the requester.
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn rejected_transition_answers_requester_only() {
        let server_addr = spawn_server().await;

        let hopper = TestClient::connect(server_addr).await;
        hopper
            .send(Packet::Join {
                name: Some("Hopper".to_string()),
            })
            .await;
        hopper.recv().await; // Joined
        hopper.recv().await; // RoomState

        // Claimed origin disagrees with the server's record
        hopper
            .send(Packet::ChangeRoom {
                target_room: "beach".to_string(),
                from_room: Some("forest".to_string()),
            })
            .await;

        match hopper.recv().await {
            Packet::Error { message } => assert!(!message.is_empty()),
            other => panic!("Expected Error, got {:?}", other),
        }
    }

    /// Tests that a duplicate name is rejected without binding a player.
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn duplicate_name_rejected_over_udp() {
        let server_addr = spawn_server().await;

        let first = TestClient::connect(server_addr).await;
        first
            .send(Packet::Join {
                name: Some("Abc123".to_string()),
            })
            .await;
        first.recv().await; // Joined
        first.recv().await; // RoomState

        let second = TestClient::connect(server_addr).await;
        second
            .send(Packet::Join {
                name: Some("ABC123".to_string()),
            })
            .await;

        match second.recv().await {
            Packet::Error { message } => assert!(message.contains("taken")),
            other => panic!("Expected Error, got {:?}", other),
        }
    }
}
