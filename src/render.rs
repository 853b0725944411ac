use std::collections::BTreeMap;

use crate::types::{AgentId, Position, Tile};

/// Drawing surface driven by the engine. Implementations own every visual
/// concern; the engine only reports what changed.
pub trait RenderSink {
    fn draw_tile(&mut self, kind: Tile, x: i32, y: i32);
    fn place_agent(&mut self, id: AgentId, x: i32, y: i32);
    fn set_power_visual(&mut self, id: AgentId, active: bool, near_expiry: bool);
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NullRender;

impl RenderSink for NullRender {
    fn draw_tile(&mut self, _kind: Tile, _x: i32, _y: i32) {}
    fn place_agent(&mut self, _id: AgentId, _x: i32, _y: i32) {}
    fn set_power_visual(&mut self, _id: AgentId, _active: bool, _near_expiry: bool) {}
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct PowerVisual {
    active: bool,
    near_expiry: bool,
}

/// Character-cell frame. Grows to fit whatever is drawn into it.
#[derive(Clone, Debug, Default)]
pub struct AsciiFrame {
    tiles: BTreeMap<(i32, i32), Tile>,
    agents: Vec<(AgentId, Position)>,
    visuals: Vec<(AgentId, PowerVisual)>,
    blink: bool,
}

impl AsciiFrame {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn agent_position(&self, id: AgentId) -> Option<Position> {
        self.agents
            .iter()
            .find(|(agent, _)| *agent == id)
            .map(|(_, pos)| *pos)
    }

    pub fn tile(&self, x: i32, y: i32) -> Option<Tile> {
        self.tiles.get(&(y, x)).copied()
    }

    pub fn render(&mut self) -> String {
        self.blink = !self.blink;
        let (width, height) = self
            .tiles
            .keys()
            .fold((0, 0), |(w, h), (y, x)| (w.max(x + 1), h.max(y + 1)));
        let mut out = String::with_capacity(((width + 1) * height).max(0) as usize);
        for y in 0..height {
            for x in 0..width {
                out.push(self.glyph_at(x, y));
            }
            out.push('\n');
        }
        out
    }

    fn glyph_at(&self, x: i32, y: i32) -> char {
        let here = Position::new(x, y);
        if self.agent_position(AgentId::Player) == Some(here) {
            return 'C';
        }
        if let Some((id, _)) = self
            .agents
            .iter()
            .find(|(id, pos)| matches!(id, AgentId::Pursuer(_)) && *pos == here)
        {
            let visual = self.visual(*id);
            return match (visual.active, visual.near_expiry && self.blink) {
                (true, true) => 'w',
                (true, false) => 'g',
                _ => 'G',
            };
        }
        match self.tile(x, y) {
            Some(Tile::Wall) => '#',
            Some(Tile::Dot) => '.',
            Some(Tile::PowerPellet) => 'o',
            _ => ' ',
        }
    }

    fn visual(&self, id: AgentId) -> PowerVisual {
        self.visuals
            .iter()
            .find(|(agent, _)| *agent == id)
            .map(|(_, visual)| *visual)
            .unwrap_or_default()
    }
}

impl RenderSink for AsciiFrame {
    fn draw_tile(&mut self, kind: Tile, x: i32, y: i32) {
        self.tiles.insert((y, x), kind);
    }

    fn place_agent(&mut self, id: AgentId, x: i32, y: i32) {
        let pos = Position::new(x, y);
        match self.agents.iter_mut().find(|(agent, _)| *agent == id) {
            Some(entry) => entry.1 = pos,
            None => self.agents.push((id, pos)),
        }
    }

    fn set_power_visual(&mut self, id: AgentId, active: bool, near_expiry: bool) {
        let visual = PowerVisual {
            active,
            near_expiry,
        };
        match self.visuals.iter_mut().find(|(agent, _)| *agent == id) {
            Some(entry) => entry.1 = visual,
            None => self.visuals.push((id, visual)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_tiles_and_agents() {
        let mut frame = AsciiFrame::new();
        for (x, tile) in [Tile::Wall, Tile::Dot, Tile::PowerPellet, Tile::Consumed, Tile::Wall]
            .into_iter()
            .enumerate()
        {
            frame.draw_tile(tile, x as i32, 0);
        }
        frame.place_agent(AgentId::Player, 3, 0);
        assert_eq!(frame.render(), "#.oC#\n");

        frame.place_agent(AgentId::Pursuer(0), 1, 0);
        frame.place_agent(AgentId::Player, 2, 0);
        assert_eq!(frame.render(), "#GC #\n");
    }

    #[test]
    fn powered_pursuers_blink_near_expiry() {
        let mut frame = AsciiFrame::new();
        frame.draw_tile(Tile::Empty, 0, 0);
        frame.place_agent(AgentId::Pursuer(2), 0, 0);
        frame.set_power_visual(AgentId::Pursuer(2), true, false);
        assert_eq!(frame.render(), "g\n");

        frame.set_power_visual(AgentId::Pursuer(2), true, true);
        let first = frame.render();
        let second = frame.render();
        assert_ne!(first, second);
    }
}
