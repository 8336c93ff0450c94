use crate::sync::{Pose, SyncAgent};
use macroquad::prelude::*;
use shared::topology::RoomConfig;
use shared::{Direction, SPRITE_SIZE, WORLD_HEIGHT, WORLD_WIDTH};

pub struct Renderer {
    width: f32,
    height: f32,
}

impl Renderer {
    pub fn new() -> Self {
        Renderer {
            width: WORLD_WIDTH,
            height: WORLD_HEIGHT,
        }
    }

    pub fn render(&mut self, agent: &SyncAgent, fake_ping_ms: u64) {
        let room = agent.topology().get(&agent.room_id);

        clear_background(room_background(&agent.room_id));

        if let Some(room) = room {
            self.draw_room(room);
        }

        for remote in agent.remotes.values() {
            self.draw_player(
                remote.player.x,
                remote.player.y,
                remote.player.direction,
                remote.pose(),
                &remote.player.name,
                Color::from_rgba(255, 136, 68, 255),
            );
        }

        if let Some(local) = &agent.local {
            self.draw_player(
                local.player.x,
                local.player.y,
                local.player.direction,
                local.pose,
                &local.player.name,
                GREEN,
            );
        }

        self.draw_chat(agent);
        self.draw_hud(agent, fake_ping_ms);
    }

    fn draw_room(&mut self, room: &RoomConfig) {
        let b = room.bounds;
        draw_rectangle_lines(
            b.min_x,
            b.min_y,
            b.max_x - b.min_x,
            b.max_y - b.min_y,
            2.0,
            Color::from_rgba(255, 255, 255, 100),
        );

        for portal in &room.portals {
            let z = portal.zone;
            draw_rectangle(
                z.x,
                z.y,
                z.width,
                z.height,
                Color::from_rgba(120, 80, 200, 120),
            );
            draw_text(
                &portal.target,
                z.x + 4.0,
                z.y + z.height / 2.0,
                16.0,
                WHITE,
            );
        }
    }

    fn draw_player(
        &mut self,
        x: f32,
        y: f32,
        direction: Direction,
        pose: Pose,
        name: &str,
        color: Color,
    ) {
        let half = SPRITE_SIZE / 2.0;
        let top_left_x = x - half;
        let top_left_y = y - half;

        draw_rectangle(top_left_x, top_left_y, SPRITE_SIZE, SPRITE_SIZE, color);

        let outline = match pose {
            Pose::Walking => YELLOW,
            Pose::Idle => WHITE,
        };
        draw_rectangle_lines(top_left_x, top_left_y, SPRITE_SIZE, SPRITE_SIZE, 2.0, outline);

        // Facing marker on the sprite edge
        let (mx, my) = match direction {
            Direction::Up => (x, top_left_y),
            Direction::Down => (x, top_left_y + SPRITE_SIZE),
            Direction::Left => (top_left_x, y),
            Direction::Right => (top_left_x + SPRITE_SIZE, y),
        };
        draw_circle(mx, my, 4.0, BLACK);

        let label_width = measure_text(name, None, 14, 1.0).width;
        draw_text(name, x - label_width / 2.0, top_left_y - 6.0, 14.0, WHITE);
    }

    fn draw_chat(&mut self, agent: &SyncAgent) {
        let line_height = 16.0;
        let visible = 6usize;
        let start_y = self.height - 12.0 - (visible as f32 - 1.0) * line_height;

        let lines: Vec<&shared::ChatMessage> =
            agent.chat_log.iter().rev().take(visible).collect();

        for (i, message) in lines.iter().rev().enumerate() {
            let text = format!("{}: {}", message.player_name, message.message);
            let y = start_y + (i as f32) * line_height;
            draw_text(&text, 12.0, y, 14.0, Color::from_rgba(255, 255, 255, 210));
        }
    }

    fn draw_hud(&mut self, agent: &SyncAgent, fake_ping_ms: u64) {
        let room_text = format!("Room: {}", agent.room_id);
        draw_text(&room_text, 10.0, 20.0, 18.0, WHITE);

        let count_text = format!("{} players here", agent.remotes.len() + 1);
        draw_text(&count_text, 10.0, 38.0, 14.0, WHITE);

        if fake_ping_ms > 0 {
            let ping_text = format!("+{}ms fake ping", fake_ping_ms);
            draw_text(&ping_text, 10.0, 54.0, 14.0, YELLOW);
        }

        if let Some(error) = &agent.last_error {
            let text = format!("! {}", error);
            draw_text(&text, 10.0, self.height - 120.0, 14.0, RED);
        }
    }
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}

fn room_background(room_id: &str) -> Color {
    match room_id {
        "town" => Color::from_rgba(94, 124, 72, 255),
        "beach" => Color::from_rgba(214, 190, 132, 255),
        "forest" => Color::from_rgba(44, 82, 52, 255),
        _ => Color::from_rgba(26, 26, 26, 255),
    }
}
