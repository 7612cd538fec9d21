//! Synthetic gameplay trace generation.
//!
//! Produces a bounded sequence of timestamped hook-shot events plus a final
//! score, shaped to pass the remote service's timing and scoring checks
//! without rendering anything. All randomness comes from the injected RNG.

use rand::Rng;
use thiserror::Error;

use crate::catalog::{ItemCatalog, ItemKind};

/// Default play window in milliseconds. The remote service rejects
/// completions whose events span more than this, so generation stops short.
pub const DEFAULT_WINDOW_MS: u64 = 45_000;

/// Score bounds enforced after every event.
pub const SCORE_FLOOR: i32 = 100;
pub const SCORE_CEILING: i32 = 200;

const STEP_MIN_MS: u64 = 1_500;
const STEP_MAX_MS: u64 = 2_500;

const HOOK_X_RANGE: (f64, f64) = (75.0, 275.0);
const HOOK_Y_RANGE: (f64, f64) = (199.0, 251.0);
const SHOT_ANGLE_RANGE: (f64, f64) = (-1.0, 1.0);
const HIT_X_RANGE: (f64, f64) = (100.0, 400.0);
const HIT_Y_RANGE: (f64, f64) = (250.0, 700.0);

const REWARD_CUTOFF: f64 = 0.60;
const TRAP_CUTOFF: f64 = 0.80;

const REWARD_POINT_CAP: i32 = 10;
const TRAP_POINT_CAP: i32 = 20;
const BONUS_POINT_CAP: i32 = 15;

/// Wire encoding of the event classification.
pub const ITEM_TYPE_NONE: u8 = 0;
pub const ITEM_TYPE_REGULAR: u8 = 1;
pub const ITEM_TYPE_BONUS: u8 = 2;

/// One synthetic hook shot. Immutable once created.
#[derive(Debug, Clone, PartialEq)]
pub struct GameEvent {
    /// Offset from the session start; strictly increasing across the trace.
    pub time_offset_ms: u64,
    pub hook_x: f64,
    pub hook_y: f64,
    pub shot_angle: f64,
    pub hit_x: f64,
    pub hit_y: f64,
    pub item_type: u8,
    pub item_size: i32,
    pub points: i32,
}

/// A full synthetic play session: ordered events plus the declared score.
#[derive(Debug, Clone, PartialEq)]
pub struct GameTrace {
    /// Wall-clock epoch milliseconds when play nominally began; the codec
    /// adds event offsets to this to produce absolute timestamps.
    pub started_at_ms: i64,
    pub events: Vec<GameEvent>,
    pub final_score: i32,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TraceError {
    #[error("item catalog has no {0:?} items")]
    EmptyKind(ItemKind),
}

/// Generate a trace spanning strictly less than `window_ms`.
///
/// The cursor advances by uniform steps of 1.5-2.5 s; the step that would
/// meet or cross the window is discarded, so a window at or below the
/// minimum step yields an empty trace. The score starts at 100 and stays
/// within [100, 200] after every event.
pub fn generate(
    rng: &mut (impl Rng + ?Sized),
    started_at_ms: i64,
    window_ms: u64,
    catalog: &ItemCatalog,
) -> Result<GameTrace, TraceError> {
    let mut cursor = 0u64;
    let mut score = SCORE_FLOOR;
    let mut events = Vec::new();

    loop {
        let step = rng.gen_range(STEP_MIN_MS..=STEP_MAX_MS);
        if cursor + step >= window_ms {
            break;
        }
        cursor += step;

        let hook_x = round3(rng.gen_range(HOOK_X_RANGE.0..HOOK_X_RANGE.1));
        let hook_y = round3(rng.gen_range(HOOK_Y_RANGE.0..HOOK_Y_RANGE.1));
        let shot_angle = round3(rng.gen_range(SHOT_ANGLE_RANGE.0..SHOT_ANGLE_RANGE.1));
        let hit_x = round3(rng.gen_range(HIT_X_RANGE.0..HIT_X_RANGE.1));
        let hit_y = round3(rng.gen_range(HIT_Y_RANGE.0..HIT_Y_RANGE.1));

        let roll: f64 = rng.gen_range(0.0..1.0);
        let (item_type, item_size, points) = if roll < REWARD_CUTOFF {
            let item = catalog
                .pick(ItemKind::Reward, rng)
                .ok_or(TraceError::EmptyKind(ItemKind::Reward))?;
            let points = item.reward_magnitude.min(REWARD_POINT_CAP);
            score = (score + points).min(SCORE_CEILING);
            (ITEM_TYPE_REGULAR, item.size, points)
        } else if roll < TRAP_CUTOFF {
            let item = catalog
                .pick(ItemKind::Trap, rng)
                .ok_or(TraceError::EmptyKind(ItemKind::Trap))?;
            let points = item.reward_magnitude.abs().min(TRAP_POINT_CAP);
            score = (score - points).max(SCORE_FLOOR);
            (ITEM_TYPE_REGULAR, item.size, points)
        } else if let Some(item) = catalog.bonus() {
            let points = item.reward_magnitude.min(BONUS_POINT_CAP);
            score = (score + points).min(SCORE_CEILING);
            (ITEM_TYPE_BONUS, item.size, points)
        } else {
            // No bonus item in this catalog; the timing slot is still spent.
            (ITEM_TYPE_NONE, 0, 0)
        };

        events.push(GameEvent {
            time_offset_ms: cursor,
            hook_x,
            hook_y,
            shot_angle,
            hit_x,
            hit_y,
            item_type,
            item_size,
            points,
        });
    }

    Ok(GameTrace {
        started_at_ms,
        events,
        final_score: score,
    })
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}
