use clap::Parser;
use client::input::InputManager;
use client::network::NetworkHandle;
use client::rendering::Renderer;
use client::sync::SyncAgent;
use log::info;
use macroquad::prelude::*;
use shared::topology::RoomTopology;
use shared::Packet;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:8080")]
    server: String,

    /// Display name (3-16 letters, digits, underscores); generated if omitted
    #[arg(short = 'n', long)]
    name: Option<String>,

    /// Simulate network latency in milliseconds
    #[arg(short = 'l', long, default_value = "0")]
    fake_ping: u64,
}

const CANNED_CHAT: &[&str] = &[
    "Hello!",
    "Follow me!",
    "Nice weather today",
    "Anyone seen the beach?",
    "Gotta go, bye!",
];

fn window_conf() -> Conf {
    Conf {
        window_title: "Social Room".to_string(),
        window_width: shared::WORLD_WIDTH as i32,
        window_height: shared::WORLD_HEIGHT as i32,
        window_resizable: false,
        ..Default::default()
    }
}

#[macroquad::main(window_conf)]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    info!("Connecting to: {}", args.server);
    if args.fake_ping > 0 {
        info!("Simulating {}ms latency", args.fake_ping);
    }
    info!("Controls: WASD/arrows to move, Enter to chat, Esc to quit");

    let network = NetworkHandle::connect(&args.server, args.fake_ping)?;
    network.send(Packet::Join {
        name: args.name.clone(),
    });

    let mut agent = SyncAgent::new(RoomTopology::standard());
    let mut input = InputManager::new();
    let mut renderer = Renderer::new();
    let mut chat_cursor = 0usize;

    loop {
        let dt = get_frame_time();

        for packet in network.poll() {
            agent.handle_packet(packet);
        }

        let frame = input.capture();

        agent.update_local(dt, frame.intent);
        agent.advance_interpolation(dt);

        if let Some(report) = agent.position_report() {
            network.send(Packet::Move {
                x: report.x,
                y: report.y,
                direction: report.direction,
            });
        }

        if let Some((target_room, from_room)) = agent.portal_request() {
            info!("Requesting transition to {}", target_room);
            network.send(Packet::ChangeRoom {
                target_room,
                from_room: Some(from_room),
            });
        }

        if frame.chat_pressed && agent.local.is_some() {
            network.send(Packet::Chat {
                message: CANNED_CHAT[chat_cursor % CANNED_CHAT.len()].to_string(),
            });
            chat_cursor += 1;
        }

        renderer.render(&agent, args.fake_ping);

        if is_key_pressed(KeyCode::Escape) {
            network.send(Packet::Leave);
            break;
        }

        next_frame().await;
    }

    Ok(())
}
