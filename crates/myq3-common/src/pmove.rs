// pmove.rs — Player movement: stance, friction, acceleration and slide-move

use crate::common::com_dprintf;
use crate::cvar::{cvar_get, cvar_variable_value};
use crate::q_shared::{
    angle_vectors, dot_product, vector_length, vector_ma, vector_normalize, vector_scale, PmFlags,
    Trace, Vec3, YAW,
};

// ============================================================
// Constants
// ============================================================

pub const PLAYER_HALF_WIDTH: f32 = 15.0;
pub const PLAYER_HEIGHT: f32 = 56.0;
pub const PLAYER_CROUCH_HEIGHT: f32 = 38.0;
pub const PLAYER_EYE_OFFSET: f32 = 8.0;

pub const MAX_SLIDE_ITERATIONS: usize = 50;

const FLOOR_PROBE_DIST: f32 = 2.0;
const MIN_STEP_NORMAL: f32 = 0.7;
const OVERBOUNCE: f32 = 1.001;
const NO_PROGRESS_EPSILON: f32 = 1e-6;

// ============================================================
// Callbacks trait
// ============================================================

/// World queries movement needs. `BspWorld` implements this; tests and
/// hosts may provide their own.
pub trait PmoveCallbacks {
    fn trace(&self, start: &Vec3, mins: &Vec3, maxs: &Vec3, end: &Vec3) -> Trace;
    fn pointcontents(&self, point: &Vec3) -> i32;
}

// ============================================================
// Tuning
// ============================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PmoveConfig {
    pub stop_speed: f32,
    pub friction: f32,
    pub accelerate: f32,
    pub air_accelerate: f32,
    pub crouch_accelerate: f32,
    pub move_speed: f32,
    pub crouch_speed: f32,
    pub air_speed: f32,
    pub max_velocity: f32,
    pub gravity: f32,
    pub jump_speed: f32,
}

impl Default for PmoveConfig {
    fn default() -> Self {
        Self {
            stop_speed: 100.0,
            friction: 6.0,
            accelerate: 10.0,
            air_accelerate: 1.0,
            crouch_accelerate: 10.0,
            move_speed: 320.0,
            crouch_speed: 120.0,
            air_speed: 320.0,
            max_velocity: 2000.0,
            gravity: 800.0,
            jump_speed: 270.0,
        }
    }
}

/// Register the movement cvars with their built-in defaults.
pub fn pm_register_cvars() {
    let d = PmoveConfig::default();
    for (name, value) in [
        ("pm_stopspeed", d.stop_speed),
        ("pm_friction", d.friction),
        ("pm_accelerate", d.accelerate),
        ("pm_airaccelerate", d.air_accelerate),
        ("pm_crouchaccelerate", d.crouch_accelerate),
        ("pm_maxspeed", d.move_speed),
        ("pm_crouchspeed", d.crouch_speed),
        ("pm_airspeed", d.air_speed),
        ("pm_maxvelocity", d.max_velocity),
        ("pm_gravity", d.gravity),
        ("pm_jumpspeed", d.jump_speed),
    ] {
        cvar_get(name, &value.to_string(), 0);
    }
}

impl PmoveConfig {
    pub fn from_cvars() -> Self {
        pm_register_cvars();
        Self {
            stop_speed: cvar_variable_value("pm_stopspeed"),
            friction: cvar_variable_value("pm_friction"),
            accelerate: cvar_variable_value("pm_accelerate"),
            air_accelerate: cvar_variable_value("pm_airaccelerate"),
            crouch_accelerate: cvar_variable_value("pm_crouchaccelerate"),
            move_speed: cvar_variable_value("pm_maxspeed"),
            crouch_speed: cvar_variable_value("pm_crouchspeed"),
            air_speed: cvar_variable_value("pm_airspeed"),
            max_velocity: cvar_variable_value("pm_maxvelocity"),
            gravity: cvar_variable_value("pm_gravity"),
            jump_speed: cvar_variable_value("pm_jumpspeed"),
        }
    }
}

// ============================================================
// Player state and input
// ============================================================

/// Everything movement reads and writes between ticks. Owned by the caller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerState {
    pub origin: Vec3,
    pub velocity: Vec3,
    pub flags: PmFlags,
    pub mins: Vec3,
    pub maxs: Vec3,
    pub ground_normal: Vec3,
}

impl PlayerState {
    pub fn new(origin: Vec3) -> Self {
        Self {
            origin,
            velocity: [0.0; 3],
            flags: PmFlags::empty(),
            mins: [-PLAYER_HALF_WIDTH, -PLAYER_HALF_WIDTH, 0.0],
            maxs: [PLAYER_HALF_WIDTH, PLAYER_HALF_WIDTH, PLAYER_HEIGHT],
            ground_normal: [0.0; 3],
        }
    }

    pub fn grounded(&self) -> bool {
        self.flags.contains(PmFlags::ON_GROUND)
    }

    pub fn crouched(&self) -> bool {
        self.flags.contains(PmFlags::DUCKED)
    }

    pub fn view_height(&self) -> f32 {
        self.maxs[2] - PLAYER_EYE_OFFSET
    }

    pub fn view_origin(&self) -> Vec3 {
        [self.origin[0], self.origin[1], self.origin[2] + self.view_height()]
    }
}

/// One tick of player intent. `forward_move` and `side_move` are in -1..=1.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlayerCmd {
    pub yaw: f32,
    pub forward_move: f32,
    pub side_move: f32,
    pub jump: bool,
    pub crouch: bool,
}

impl PlayerCmd {
    /// Horizontal unit wish direction, or zero when there is no input.
    pub fn wish_dir(&self) -> Vec3 {
        let mut forward = [0.0f32; 3];
        let mut right = [0.0f32; 3];
        let mut angles = [0.0f32; 3];
        angles[YAW] = self.yaw;
        angle_vectors(&angles, Some(&mut forward), Some(&mut right), None);

        let mut wish = [0.0f32; 3];
        for i in 0..2 {
            wish[i] = forward[i] * self.forward_move + right[i] * self.side_move;
        }
        vector_normalize(&mut wish);
        wish
    }
}

/// How a slide-move ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlideOutcome {
    /// The whole time budget was used.
    Completed,
    /// Same contact twice in a row; remaining time dropped.
    NoProgress,
    /// Started inside solid and skipped to the intended end.
    Embedded,
    IterationCap,
}

// ============================================================
// Helpers
// ============================================================

/// Slide off of the impacting surface. Only the part of `inv` along
/// `normal` changes.
pub fn pm_clip_velocity(inv: &Vec3, normal: &Vec3, out: &mut Vec3, overbounce: f32) {
    let backoff = dot_product(inv, normal) * overbounce;
    for i in 0..3 {
        out[i] = inv[i] - normal[i] * backoff;
    }
}

fn check_floor(ps: &mut PlayerState, cb: &impl PmoveCallbacks) {
    let down = [ps.origin[0], ps.origin[1], ps.origin[2] - FLOOR_PROBE_DIST];
    let trace = cb.trace(&ps.origin, &ps.mins, &ps.maxs, &down);

    if trace.fraction < 1.0 && trace.plane.normal[2] > MIN_STEP_NORMAL {
        ps.flags.insert(PmFlags::ON_GROUND);
        ps.ground_normal = trace.plane.normal;
    } else {
        ps.flags.remove(PmFlags::ON_GROUND);
    }
}

fn crouch(ps: &mut PlayerState) {
    ps.flags.insert(PmFlags::DUCKED);
    ps.maxs[2] = PLAYER_CROUCH_HEIGHT;
}

fn uncrouch(ps: &mut PlayerState, cb: &impl PmoveCallbacks) {
    if !ps.crouched() {
        return;
    }
    // need headroom for the full hull
    let up = [
        ps.origin[0],
        ps.origin[1],
        ps.origin[2] + (PLAYER_HEIGHT - PLAYER_CROUCH_HEIGHT),
    ];
    let trace = cb.trace(&ps.origin, &ps.mins, &ps.maxs, &up);
    if trace.fraction == 1.0 {
        ps.flags.remove(PmFlags::DUCKED);
        ps.maxs[2] = PLAYER_HEIGHT;
    }
}

fn friction(ps: &mut PlayerState, cfg: &PmoveConfig, dt: f32) {
    if !ps.grounded() {
        return;
    }

    let speed = vector_length(&ps.velocity);
    if speed < 1e-3 {
        ps.velocity = [0.0; 3];
        return;
    }

    let loss = speed.max(cfg.stop_speed) * cfg.friction * dt;
    let scale = (speed - loss).max(0.0) / speed;
    ps.velocity = vector_scale(&ps.velocity, scale);
}

fn accelerate(ps: &mut PlayerState, wish: &Vec3, dt: f32, move_speed: f32, accel: f32, max_velocity: f32) {
    // won't push the wish-direction speed past move_speed
    let change = move_speed - dot_product(&ps.velocity, wish);
    if change <= 0.0 {
        return;
    }

    let amount = (accel * move_speed * dt).min(change);
    ps.velocity = vector_ma(&ps.velocity, amount, wish);

    for v in &mut ps.velocity {
        *v = v.clamp(-max_velocity, max_velocity);
    }
}

// ============================================================
// Slide move
// ============================================================

/// Move the box along `velocity` for `time_left` seconds, sliding along
/// every surface it touches.
pub fn slide_move(
    origin: &mut Vec3,
    velocity: &mut Vec3,
    mins: &Vec3,
    maxs: &Vec3,
    mut time_left: f32,
    cb: &impl PmoveCallbacks,
) -> SlideOutcome {
    let mut prev: Option<(f32, Vec3)> = None;
    let mut iterations = 0;

    while time_left > 0.0 {
        if iterations >= MAX_SLIDE_ITERATIONS {
            com_dprintf(&format!(
                "slide_move: gave up after {} iterations at {:?}\n",
                MAX_SLIDE_ITERATIONS, origin
            ));
            return SlideOutcome::IterationCap;
        }
        iterations += 1;

        let end = vector_ma(origin, time_left, velocity);
        let trace = cb.trace(origin, mins, maxs, &end);

        if trace.startsolid {
            // stuck: take the whole move and don't build up fall speed
            com_dprintf(&format!("slide_move: start in solid at {:?}\n", origin));
            *origin = end;
            velocity[2] = 0.0;
            return SlideOutcome::Embedded;
        }

        if trace.fraction > 0.0 {
            *origin = trace.endpos;
        }

        if trace.fraction == 1.0 {
            return SlideOutcome::Completed;
        }

        if let Some((prev_fraction, prev_normal)) = prev {
            if prev_fraction == trace.fraction
                && dot_product(&prev_normal, &trace.plane.normal) > 1.0 - NO_PROGRESS_EPSILON
            {
                return SlideOutcome::NoProgress;
            }
        }
        prev = Some((trace.fraction, trace.plane.normal));

        time_left -= time_left * trace.fraction;

        let inv = *velocity;
        pm_clip_velocity(&inv, &trace.plane.normal, velocity, OVERBOUNCE);
    }

    SlideOutcome::Completed
}

// ============================================================
// Pmove
// ============================================================

/// Run one movement tick of `dt` seconds.
pub fn pmove(
    ps: &mut PlayerState,
    cmd: &PlayerCmd,
    dt: f32,
    cfg: &PmoveConfig,
    cb: &impl PmoveCallbacks,
) -> SlideOutcome {
    check_floor(ps, cb);

    // jump and gravity
    if ps.grounded() {
        if cmd.jump && !ps.flags.contains(PmFlags::JUMP_HELD) {
            ps.velocity[2] = cfg.jump_speed;
            ps.flags.remove(PmFlags::ON_GROUND);
        } else {
            ps.velocity[2] = 0.0;
        }
    } else {
        ps.velocity[2] -= cfg.gravity * dt;
    }
    ps.flags.set(PmFlags::JUMP_HELD, cmd.jump);

    if cmd.crouch {
        crouch(ps);
    } else {
        uncrouch(ps, cb);
    }

    friction(ps, cfg, dt);

    let wish = cmd.wish_dir();
    if ps.grounded() {
        let (speed, accel) = if ps.crouched() {
            (cfg.crouch_speed, cfg.crouch_accelerate)
        } else {
            (cfg.move_speed, cfg.accelerate)
        };
        accelerate(ps, &wish, dt, speed, accel, cfg.max_velocity);
    } else {
        accelerate(ps, &wish, dt, cfg.air_speed, cfg.air_accelerate, cfg.max_velocity);
    }

    let (mins, maxs) = (ps.mins, ps.maxs);
    slide_move(&mut ps.origin, &mut ps.velocity, &mins, &maxs, dt, cb)
}

// ============================================================
// Tests
// ============================================================
