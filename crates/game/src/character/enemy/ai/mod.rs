pub mod behavior;
pub mod look;
pub mod state;

pub use behavior::{enemy_ability_selection_system, enemy_chase_system, enemy_locomotion_system};
pub use look::{attack_reaction_system, look_at_system, LookAt};
pub use state::MonsterState;
