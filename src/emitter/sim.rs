//! Time-stepped particle simulation for the emitter layer variant.
//!
//! The simulator is self-contained: it consumes cell specs and
//! produces draw lists for an external painter. `step` is a pure
//! function of the sim's state and `dt`; the RNG is seeded so previews
//! are reproducible.

use std::collections::VecDeque;

use kurbo::Vec2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::model::layer::{
    CellColor, EmitterLayer, EmitterMode, EmitterRenderMode, EmitterShape,
};

pub const DEFAULT_PARTICLE_CAPACITY: usize = 4000;

#[derive(Clone, Debug)]
pub struct Particle {
    pub position: Vec2,
    pub velocity: Vec2,
    pub rotation: f64,
    pub spin: f64,
    pub scale: f64,
    pub scale_speed: f64,
    pub alpha: f64,
    pub alpha_speed: f64,
    pub color: CellColor,
    pub color_speed: CellColor,
    pub remaining_lifetime: f64,
    pub cell_index: usize,
}

/// One frame's worth of particle draws, already in paint order.
#[derive(Clone, Debug)]
pub struct DrawList {
    /// Switch compositing to additive for the whole pass.
    pub additive: bool,
    pub ops: Vec<DrawOp>,
}

#[derive(Clone, Debug)]
pub enum DrawOp {
    /// Tinted sprite: the painter multiplies the tint over the sprite,
    /// masked by the sprite's own alpha channel.
    Sprite {
        image: String,
        position: Vec2,
        rotation: f64,
        scale: f64,
        alpha: f64,
        tint: CellColor,
    },
    /// Flat-colored disc for cells without a contents image.
    Disc {
        position: Vec2,
        rotation: f64,
        scale: f64,
        alpha: f64,
        color: CellColor,
    },
}

pub struct EmitterSim {
    spec: EmitterLayer,
    capacity: usize,
    rng: StdRng,
    /// Fractional birth accumulator per cell; whole particles spawn,
    /// the remainder carries to the next step.
    birth_accum: Vec<f64>,
    /// Spawn order; the front is always the oldest live particle.
    particles: VecDeque<Particle>,
}

impl EmitterSim {
    pub fn new(spec: EmitterLayer, seed: u64) -> Self {
        Self::with_capacity(spec, seed, DEFAULT_PARTICLE_CAPACITY)
    }

    pub fn with_capacity(spec: EmitterLayer, seed: u64, capacity: usize) -> Self {
        let cells = spec.cells.len();
        Self {
            spec,
            capacity,
            rng: StdRng::seed_from_u64(seed),
            birth_accum: vec![0.0; cells],
            particles: VecDeque::new(),
        }
    }

    pub fn live_count(&self) -> usize {
        self.particles.len()
    }

    pub fn particles(&self) -> impl Iterator<Item = &Particle> {
        self.particles.iter()
    }

    /// Advance the simulation by `dt` seconds: integrate and cull the
    /// live pool, then spawn this step's newborns.
    pub fn step(&mut self, dt: f64) {
        if dt <= 0.0 {
            return;
        }

        for p in &mut self.particles {
            p.velocity.x += self.spec.cells[p.cell_index].x_acceleration * dt;
            p.velocity.y += self.spec.cells[p.cell_index].y_acceleration * dt;
            p.position += p.velocity * dt;
            p.rotation += p.spin * dt;
            p.scale += p.scale_speed * dt;
            p.alpha = (p.alpha + p.alpha_speed * dt).clamp(0.0, 1.0);
            p.color.r = (p.color.r + p.color_speed.r * dt).clamp(0.0, 1.0);
            p.color.g = (p.color.g + p.color_speed.g * dt).clamp(0.0, 1.0);
            p.color.b = (p.color.b + p.color_speed.b * dt).clamp(0.0, 1.0);
            p.remaining_lifetime -= dt;
        }
        self.particles.retain(|p| p.remaining_lifetime > 0.0);

        for cell_index in 0..self.spec.cells.len() {
            let rate = self.spec.cells[cell_index].birth_rate.max(0.0);
            self.birth_accum[cell_index] += rate * dt;
            let whole = self.birth_accum[cell_index].floor();
            self.birth_accum[cell_index] -= whole;
            for _ in 0..whole as u64 {
                let particle = self.spawn(cell_index);
                if self.particles.len() >= self.capacity {
                    // Oldest first.
                    self.particles.pop_front();
                }
                self.particles.push_back(particle);
            }
        }
    }

    fn spawn(&mut self, cell_index: usize) -> Particle {
        let cell = self.spec.cells[cell_index].clone();
        let position = self.spawn_point();

        let speed = self.sample(cell.velocity, cell.velocity_range);
        let half = cell.emission_range / 2.0;
        let angle = cell.emission_angle + self.uniform(-half, half);
        let velocity = Vec2::new(angle.cos(), angle.sin()) * speed;

        Particle {
            position,
            velocity,
            rotation: 0.0,
            spin: self.sample(cell.spin, cell.spin_range),
            scale: self.sample(cell.scale, cell.scale_range),
            scale_speed: cell.scale_speed,
            alpha: self.sample(cell.alpha, cell.alpha_range).clamp(0.0, 1.0),
            alpha_speed: cell.alpha_speed,
            color: CellColor::new(
                self.sample(cell.color.r, cell.color_range.r).clamp(0.0, 1.0),
                self.sample(cell.color.g, cell.color_range.g).clamp(0.0, 1.0),
                self.sample(cell.color.b, cell.color_range.b).clamp(0.0, 1.0),
            ),
            color_speed: cell.color_speed,
            remaining_lifetime: self.sample(cell.lifetime, cell.lifetime_range).max(0.0),
            cell_index,
        }
    }

    /// Spawn-point sampling per `(shape, mode)`.
    fn spawn_point(&mut self) -> Vec2 {
        let center = self.spec.emitter_position;
        let w = self.spec.emitter_size.w;
        let h = self.spec.emitter_size.h;

        match (self.spec.shape, self.spec.mode) {
            (EmitterShape::Point, _) => center,
            (EmitterShape::Line, EmitterMode::Volume) => Vec2::new(
                self.uniform(center.x - w / 2.0, center.x + w / 2.0),
                self.uniform(center.y - h / 2.0, center.y + h / 2.0),
            ),
            (EmitterShape::Line, EmitterMode::Outline) => Vec2::new(
                self.uniform(center.x - w / 2.0, center.x + w / 2.0),
                center.y,
            ),
            (EmitterShape::Rectangle, EmitterMode::Outline) => {
                // Uniform arc-length walk over the four edges.
                let perimeter = 2.0 * (w + h);
                if perimeter <= 0.0 {
                    return center;
                }
                let left = center.x - w / 2.0;
                let top = center.y - h / 2.0;
                let mut s = self.uniform(0.0, perimeter);
                if s < w {
                    return Vec2::new(left + s, top);
                }
                s -= w;
                if s < h {
                    return Vec2::new(left + w, top + s);
                }
                s -= h;
                if s < w {
                    return Vec2::new(left + w - s, top + h);
                }
                s -= w;
                Vec2::new(left, top + h - s)
            }
            // Rectangle volume, and any unmatched combination, fill
            // the rectangle's area.
            _ => Vec2::new(
                self.uniform(center.x - w / 2.0, center.x + w / 2.0),
                self.uniform(center.y - h / 2.0, center.y + h / 2.0),
            ),
        }
    }

    /// Build this frame's draw list: particles stably ordered by their
    /// originating cell so layering per cell is deterministic.
    pub fn draw(&self) -> DrawList {
        let mut order: Vec<&Particle> = self.particles.iter().collect();
        order.sort_by_key(|p| p.cell_index);

        let ops = order
            .into_iter()
            .map(|p| match &self.spec.cells[p.cell_index].contents_image {
                Some(image) => DrawOp::Sprite {
                    image: image.clone(),
                    position: p.position,
                    rotation: p.rotation,
                    scale: p.scale,
                    alpha: p.alpha,
                    tint: p.color,
                },
                None => DrawOp::Disc {
                    position: p.position,
                    rotation: p.rotation,
                    scale: p.scale,
                    alpha: p.alpha,
                    color: p.color,
                },
            })
            .collect();

        DrawList {
            additive: self.spec.render_mode == EmitterRenderMode::Additive,
            ops,
        }
    }

    fn sample(&mut self, base: f64, range: f64) -> f64 {
        if range == 0.0 {
            return base;
        }
        self.uniform(base - range, base + range)
    }

    fn uniform(&mut self, lo: f64, hi: f64) -> f64 {
        if lo >= hi {
            return lo;
        }
        self.rng.gen_range(lo..hi)
    }
}
