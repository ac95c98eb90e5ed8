//! Data-only scheduled commands
//!
//! A command names what should happen; the dispatcher decides how, against
//! whatever state the owner is in when the command comes due. Commands are
//! plain data so queues can be inspected, logged and replayed.

use serde::{Deserialize, Serialize};

use crate::core::types::EntityId;

/// Why a weapon is being walked along its graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Progression {
    /// Towards firing at the current target
    Attack,
    /// Towards the ready (or pinned hold) state
    Ready,
    /// Towards a melee strike
    Melee,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    /// Enter `to` (the successor of the current state) and keep progressing
    AdvanceWeaponState { to: String, purpose: Progression },
    /// First round of a trigger pull
    Fire { target: EntityId },
    /// Firing state has elapsed
    BeginRecovery,
    /// Recovery has elapsed; weapon returns to its firing posture
    FinishRecovery,
    /// Follow-on round `shot` of a burst
    BurstShot { target: EntityId, shot: u32 },
    /// Next round of a full-auto string
    FullAutoShot { target: EntityId },
    /// Re-engage once an in-flight burst has run its course
    ResumeAfterBurst,
    /// Start the next single-shot attack in sustained fire
    ContinueStandardAttack,
    /// One reload completion (a round, or the whole magazine)
    CompleteReloadStep,
    /// Reaction delay has elapsed
    ReactionTrigger,
    /// Pick a fresh target after the last one went down
    Retarget,
    /// Waiting for a melee target to come into reach
    MeleeRangeCheck { target: EntityId },
    MeleeStrike { target: EntityId },
    MeleeRecover,
}

impl Command {
    /// Short name for logs
    pub fn kind(&self) -> &'static str {
        match self {
            Command::AdvanceWeaponState { .. } => "advance_weapon_state",
            Command::Fire { .. } => "fire",
            Command::BeginRecovery => "begin_recovery",
            Command::FinishRecovery => "finish_recovery",
            Command::BurstShot { .. } => "burst_shot",
            Command::FullAutoShot { .. } => "full_auto_shot",
            Command::ResumeAfterBurst => "resume_after_burst",
            Command::ContinueStandardAttack => "continue_standard_attack",
            Command::CompleteReloadStep => "complete_reload_step",
            Command::ReactionTrigger => "reaction_trigger",
            Command::Retarget => "retarget",
            Command::MeleeRangeCheck { .. } => "melee_range_check",
            Command::MeleeStrike { .. } => "melee_strike",
            Command::MeleeRecover => "melee_recover",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commands_round_trip_through_json() {
        let command = Command::AdvanceWeaponState {
            to: "aiming".into(),
            purpose: Progression::Attack,
        };
        let json = serde_json::to_string(&command).expect("serializable");
        assert!(json.contains("advance_weapon_state"));
        let back: Command = serde_json::from_str(&json).expect("deserializable");
        assert_eq!(back, command);
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(Command::Fire { target: EntityId(2) }.kind(), "fire");
        assert_eq!(Command::CompleteReloadStep.kind(), "complete_reload_step");
    }
}
