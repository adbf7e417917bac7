use sha2::{Digest, Sha256};

use crate::combat::CombatPhase;
use crate::world::World;

impl World {
    pub fn state_digest(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        let map = self.map();
        hasher.update(map.width().to_le_bytes());
        hasher.update(map.height().to_le_bytes());
        for tile in map.tiles() {
            hasher.update(tile.to_le_bytes());
        }
        hasher.update(self.tick_count().to_le_bytes());
        hasher.update(self.chase_counter().to_le_bytes());

        match self.combat_phase() {
            CombatPhase::Exploring => hasher.update([0u8]),
            CombatPhase::InCombat {
                active,
                initialized,
            } => {
                hasher.update([1u8, u8::from(initialized)]);
                hasher.update((active.0 as u64).to_le_bytes());
            }
        }

        for entity in self.entities().iter() {
            hasher.update([u8::from(entity.is_player()), entity.ai_state as u8]);
            hasher.update(entity.position.x.to_le_bytes());
            hasher.update(entity.position.y.to_le_bytes());
            hasher.update(entity.render_position.x.to_bits().to_le_bytes());
            hasher.update(entity.render_position.y.to_bits().to_le_bytes());

            let movement = &entity.movement;
            hasher.update([u8::from(movement.interpolating)]);
            hasher.update(movement.progress.to_bits().to_le_bytes());
            hasher.update(movement.cooldown.to_le_bytes());
            hasher.update(entity.action_points.current.to_le_bytes());
            hasher.update(entity.action_points.max.to_le_bytes());

            match entity.path() {
                Some(path) => {
                    hasher.update((path.cursor() as u64).to_le_bytes());
                    for cell in path.cells() {
                        hasher.update(cell.x.to_le_bytes());
                        hasher.update(cell.y.to_le_bytes());
                    }
                    hasher.update([0xff]);
                }
                None => hasher.update([0u8]),
            }
        }
        hasher.finalize().into()
    }

    pub fn state_digest_hex(&self) -> String {
        to_hex_lower(&self.state_digest())
    }
}

fn to_hex_lower(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push(HEX[(byte >> 4) as usize] as char);
        out.push(HEX[(byte & 0x0f) as usize] as char);
    }
    out
}
