//! Monster state machine.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Component, Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum MonsterState {
    /// Dormant, or nothing to chase
    #[default]
    Idle,
    /// Following the target through the path follower
    Chase,
    /// An ability drives movement and orientation
    UsingAbility,
}
