//! Physical bodies: clouds of mass particles moved as one unit.
//!
//! - [`RigidBody`]: particles kept together by shape matching, optional
//!   bounding volume and linked scene object.
//! - [`SoftBody`]: a rows × columns particle grid held together by springs.
//! - [`PhysicalBody`]: the tagged union the world stores and dispatches on.
//!
//! Population helpers sample a box or rectangle on a regular grid of
//! particle diameters centred on the body's origin.

use std::borrow::Cow;

use crate::error::PhysicsError;
use crate::simulation::bounding::{BoundingVolume, Rectangle, Sphere, SphereTree};
use crate::simulation::math::{mean, transform_point, NVec3};
use crate::simulation::object::SceneObject;
use crate::simulation::particle::{MassParticle, Spring};

/// Coordinate frame particle positions are stored in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParticleFrame {
    /// Particles hold world coordinates; a linked object follows the body.
    #[default]
    World,
    /// Particles are relative to the linked object; collision geometry is
    /// transformed by the object's world matrix.
    ObjectLocal,
}

/// Number of whole cells of size `diameter` along `extent`, at least one
fn cells(extent: f64, diameter: f64) -> usize {
    ((extent / diameter).floor() as usize).max(1)
}

/// Offset of cell `i` along an axis of `n` cells, centred on zero
fn cell_offset(i: usize, n: usize, diameter: f64) -> f64 {
    -(n as f64 * diameter) * 0.5 + diameter * 0.5 + i as f64 * diameter
}

fn check_diameter(diameter: f64) -> Result<(), PhysicsError> {
    if diameter.is_finite() && diameter > 0.0 {
        Ok(())
    } else {
        Err(PhysicsError::InvalidParticleDiameter(diameter))
    }
}

fn check_extents(extents: &[f64]) -> Result<(), PhysicsError> {
    if extents.iter().all(|e| e.is_finite() && *e > 0.0) {
        Ok(())
    } else {
        Err(PhysicsError::InvalidDimension(extents.to_vec()))
    }
}

fn centroid_or(particles: &[MassParticle], fallback: NVec3) -> NVec3 {
    mean(particles.iter().map(|p| p.position)).unwrap_or(fallback)
}

fn mean_velocity(particles: &[MassParticle]) -> NVec3 {
    mean(particles.iter().map(|p| p.velocity)).unwrap_or_else(NVec3::zeros)
}

// =========================================================================================
// Rigid body
// =========================================================================================

#[derive(Debug)]
pub struct RigidBody {
    pub(crate) particles: Vec<MassParticle>,
    pub(crate) bounding: BoundingVolume,
    origin: NVec3, // reported position while the body has no particles
    mass: f64,
    is_static: bool,
    frame: ParticleFrame,
    object: Option<Box<dyn SceneObject>>,
}

impl RigidBody {
    fn with_static(is_static: bool) -> Self {
        Self {
            particles: Vec::new(),
            bounding: BoundingVolume::None,
            origin: NVec3::zeros(),
            mass: 1.0,
            is_static,
            frame: ParticleFrame::World,
            object: None,
        }
    }

    /// Empty body that moves.
    pub fn dynamic() -> Self {
        Self::with_static(false)
    }

    /// Empty body that never moves and never receives forces.
    pub fn fixed() -> Self {
        Self::with_static(true)
    }

    /// Move the body (and anything already attached) to `position`.
    pub fn at(mut self, position: NVec3) -> Self {
        self.set_position(position);
        self
    }

    pub fn with_mass(mut self, mass: f64) -> Self {
        self.mass = mass;
        self
    }

    /// Link a scene object; the body adopts the object's position as origin.
    pub fn with_object(mut self, object: Box<dyn SceneObject>) -> Self {
        if self.particles.is_empty() {
            self.origin = object.position();
        }
        self.object = Some(object);
        self
    }

    pub fn with_frame(mut self, frame: ParticleFrame) -> Self {
        self.frame = frame;
        self
    }

    /// Point the population helpers sample around: the body's position, or
    /// the object's local origin for object-local bodies.
    fn sampling_origin(&self) -> NVec3 {
        match self.frame {
            ParticleFrame::ObjectLocal => NVec3::zeros(),
            ParticleFrame::World => self.position(),
        }
    }

    /// Fill a `dimension` sized box around the current origin with particles
    /// of the given diameter.
    pub fn with_box(mut self, dimension: NVec3, diameter: f64) -> Result<Self, PhysicsError> {
        check_diameter(diameter)?;
        check_extents(dimension.as_slice())?;

        let (nx, ny, nz) = (
            cells(dimension.x, diameter),
            cells(dimension.y, diameter),
            cells(dimension.z, diameter),
        );
        let origin = self.sampling_origin();
        let radius = diameter * 0.5;
        for ix in 0..nx {
            for iy in 0..ny {
                for iz in 0..nz {
                    let offset = NVec3::new(
                        cell_offset(ix, nx, diameter),
                        cell_offset(iy, ny, diameter),
                        cell_offset(iz, nz, diameter),
                    );
                    self.add_mass_particle(MassParticle::new(origin + offset, radius));
                }
            }
        }
        Ok(self)
    }

    /// Planar variant of [`RigidBody::with_box`]: one particle layer at the
    /// origin's z.
    pub fn with_rectangle(mut self, width: f64, height: f64, diameter: f64) -> Result<Self, PhysicsError> {
        check_diameter(diameter)?;
        check_extents(&[width, height])?;

        let (nx, ny) = (cells(width, diameter), cells(height, diameter));
        let origin = self.sampling_origin();
        let radius = diameter * 0.5;
        for ix in 0..nx {
            for iy in 0..ny {
                let offset = NVec3::new(cell_offset(ix, nx, diameter), cell_offset(iy, ny, diameter), 0.0);
                self.add_mass_particle(MassParticle::new(origin + offset, radius));
            }
        }
        Ok(self)
    }

    /// Replace the bounding volume with one sphere enclosing every particle.
    pub fn with_bounding_sphere(mut self) -> Self {
        if let Some(sphere) = Sphere::enclosing(&self.particles) {
            self.bounding = BoundingVolume::Spheres(vec![sphere]);
        }
        self
    }

    /// Replace the bounding volume with a sphere tree over the particles' box.
    ///
    /// Tree nodes only follow a body's translation, so trees belong on static
    /// shapes; moving bodies should use [`RigidBody::with_bounding_sphere`].
    pub fn with_sphere_tree(mut self, leaf_radius: f64) -> Result<Self, PhysicsError> {
        if let Some(region) = Rectangle::around(&self.particles) {
            self.bounding = BoundingVolume::Tree(SphereTree::build(region, leaf_radius)?);
        }
        Ok(self)
    }

    pub fn add_mass_particle(&mut self, particle: MassParticle) -> &mut Self {
        self.particles.push(particle);
        self
    }

    /// Append a sphere to a flat bounding list, converting from `None`.
    pub fn add_bounding_sphere(&mut self, sphere: Sphere) -> &mut Self {
        match &mut self.bounding {
            BoundingVolume::Spheres(spheres) => spheres.push(sphere),
            _ => self.bounding = BoundingVolume::Spheres(vec![sphere]),
        }
        self
    }

    pub fn mass_particles(&self) -> &[MassParticle] {
        &self.particles
    }

    pub fn mass_particles_mut(&mut self) -> &mut [MassParticle] {
        &mut self.particles
    }

    pub fn bounding(&self) -> &BoundingVolume {
        &self.bounding
    }

    pub fn is_static(&self) -> bool {
        self.is_static
    }

    pub fn set_static(&mut self, is_static: bool) -> &mut Self {
        self.is_static = is_static;
        self
    }

    pub fn mass(&self) -> f64 {
        self.mass
    }

    pub fn set_mass(&mut self, mass: f64) -> &mut Self {
        self.mass = mass;
        self
    }

    pub fn frame(&self) -> ParticleFrame {
        self.frame
    }

    pub fn object(&self) -> Option<&dyn SceneObject> {
        self.object.as_deref()
    }

    pub fn object_mut(&mut self) -> Option<&mut (dyn SceneObject + 'static)> {
        self.object.as_deref_mut()
    }

    /// Centroid of the particles, or the linked object's position for
    /// object-local bodies.
    pub fn position(&self) -> NVec3 {
        match (self.frame, &self.object) {
            (ParticleFrame::ObjectLocal, Some(object)) => object.position(),
            _ => centroid_or(&self.particles, self.origin),
        }
    }

    /// Move the body so its position becomes `position`. World-frame bodies
    /// shift every particle and bounding volume by the delta.
    pub fn set_position(&mut self, position: NVec3) -> &mut Self {
        if self.frame == ParticleFrame::World {
            let shift = position - self.position();
            for particle in &mut self.particles {
                particle.shift_position(&shift);
            }
            self.bounding.shift(&shift);
        }
        self.origin = position;
        if let Some(object) = self.object.as_mut() {
            object.set_position(position);
        }
        self
    }

    pub fn velocity(&self) -> NVec3 {
        mean_velocity(&self.particles)
    }

    /// Give every particle the same velocity
    pub fn set_velocity(&mut self, velocity: NVec3) -> &mut Self {
        for particle in &mut self.particles {
            particle.velocity = velocity;
        }
        self
    }

    /// Add the same velocity delta to every particle
    pub fn apply_force(&mut self, force: NVec3) -> &mut Self {
        for particle in &mut self.particles {
            particle.apply_force(&force);
        }
        self
    }

    /// Bounding volume in world coordinates. Object-local bodies map theirs
    /// through the linked object's matrix.
    pub fn world_bounding(&self) -> Cow<'_, BoundingVolume> {
        match (self.frame, &self.object) {
            (ParticleFrame::ObjectLocal, Some(object)) => {
                Cow::Owned(self.bounding.transformed(&object.transformation_matrix()))
            }
            _ => Cow::Borrowed(&self.bounding),
        }
    }

    /// World-space center of particle `index`
    pub fn world_position(&self, index: usize) -> NVec3 {
        let local = self.particles[index].position;
        match (self.frame, &self.object) {
            (ParticleFrame::ObjectLocal, Some(object)) => transform_point(&object.transformation_matrix(), &local),
            _ => local,
        }
    }

    /// Push the body's position onto its linked object (world frame only).
    pub fn sync_object(&mut self) {
        if self.frame != ParticleFrame::World || self.particles.is_empty() {
            return;
        }
        let position = self.position();
        self.origin = position;
        if let Some(object) = self.object.as_mut() {
            object.set_position(position);
        }
    }
}

// =========================================================================================
// Soft body
// =========================================================================================

#[derive(Debug, Clone)]
pub struct SoftBody {
    pub(crate) particles: Vec<MassParticle>, // row-major, rows * columns
    rows: usize,
    columns: usize,
    springs: Vec<Spring>,
    pub(crate) bounding: BoundingVolume,
    origin: NVec3,
    mass: f64,
    is_static: bool,
}

impl SoftBody {
    /// Planar `rows × columns` grid centred on `origin` in its xy plane.
    /// Neighbours are linked horizontally, vertically and along the down-right
    /// diagonal.
    pub fn grid(
        rows: usize,
        columns: usize,
        spacing: f64,
        radius: f64,
        origin: NVec3,
        spring_constant: f64,
        damper_constant: f64,
    ) -> Result<Self, PhysicsError> {
        if rows < 2 || columns < 2 {
            return Err(PhysicsError::InvalidGrid { rows, columns });
        }
        check_diameter(spacing)?;
        check_diameter(radius * 2.0)?;

        let mut particles = Vec::with_capacity(rows * columns);
        for row in 0..rows {
            for column in 0..columns {
                let offset = NVec3::new(
                    cell_offset(column, columns, spacing),
                    cell_offset(row, rows, spacing),
                    0.0,
                );
                particles.push(MassParticle::new(origin + offset, radius));
            }
        }

        let mut springs = Vec::new();
        for row in 0..rows {
            for column in 0..columns {
                let source = row * columns + column;
                let mut targets = Vec::with_capacity(3);
                if column + 1 < columns {
                    targets.push(source + 1);
                }
                if row + 1 < rows {
                    targets.push(source + columns);
                    if column + 1 < columns {
                        targets.push(source + columns + 1);
                    }
                }
                for target in targets {
                    let idx = springs.len();
                    springs.push(Spring::from_particles(&particles, source, target, spring_constant, damper_constant));
                    particles[source].springs.push(idx);
                    particles[target].springs.push(idx);
                }
            }
        }

        let bounding = Sphere::enclosing(&particles)
            .map(|s| BoundingVolume::Spheres(vec![s]))
            .unwrap_or_default();

        Ok(Self {
            particles,
            rows,
            columns,
            springs,
            bounding,
            origin,
            mass: 1.0,
            is_static: false,
        })
    }

    /// Grid of particles of `diameter` filling a `width × height` rectangle.
    pub fn from_rectangle(
        width: f64,
        height: f64,
        diameter: f64,
        origin: NVec3,
        spring_constant: f64,
        damper_constant: f64,
    ) -> Result<Self, PhysicsError> {
        check_diameter(diameter)?;
        check_extents(&[width, height])?;
        let columns = cells(width, diameter);
        let rows = cells(height, diameter);
        Self::grid(rows, columns, diameter, diameter * 0.5, origin, spring_constant, damper_constant)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn springs(&self) -> &[Spring] {
        &self.springs
    }

    pub fn particle(&self, row: usize, column: usize) -> Option<&MassParticle> {
        if row < self.rows && column < self.columns {
            self.particles.get(row * self.columns + column)
        } else {
            None
        }
    }

    pub fn mass_particles(&self) -> &[MassParticle] {
        &self.particles
    }

    pub fn mass_particles_mut(&mut self) -> &mut [MassParticle] {
        &mut self.particles
    }

    pub fn bounding(&self) -> &BoundingVolume {
        &self.bounding
    }

    pub fn is_static(&self) -> bool {
        self.is_static
    }

    pub fn set_static(&mut self, is_static: bool) -> &mut Self {
        self.is_static = is_static;
        self
    }

    pub fn mass(&self) -> f64 {
        self.mass
    }

    pub fn set_mass(&mut self, mass: f64) -> &mut Self {
        self.mass = mass;
        self
    }

    pub fn position(&self) -> NVec3 {
        centroid_or(&self.particles, self.origin)
    }

    pub fn set_position(&mut self, position: NVec3) -> &mut Self {
        let shift = position - self.position();
        for particle in &mut self.particles {
            particle.shift_position(&shift);
        }
        self.bounding.shift(&shift);
        self.origin = position;
        self
    }

    pub fn velocity(&self) -> NVec3 {
        mean_velocity(&self.particles)
    }

    pub fn set_velocity(&mut self, velocity: NVec3) -> &mut Self {
        for particle in &mut self.particles {
            particle.velocity = velocity;
        }
        self
    }

    pub fn apply_force(&mut self, force: NVec3) -> &mut Self {
        for particle in &mut self.particles {
            particle.apply_force(&force);
        }
        self
    }

    /// Zero every particle's accumulated spring force, then sum all springs.
    pub fn update_spring_forces(&mut self) -> &mut Self {
        for particle in &mut self.particles {
            particle.reset_spring_force();
        }
        for spring in &self.springs {
            spring.apply(&mut self.particles);
        }
        self
    }

    /// Turn the accumulated spring forces into velocity deltas over `dt`.
    pub fn apply_spring_forces(&mut self, dt: f64) -> &mut Self {
        for particle in &mut self.particles {
            let delta = particle.spring_force * dt;
            particle.apply_force(&delta);
        }
        self
    }

    /// Recompute the enclosing sphere; the grid deforms so shifting is not enough.
    pub fn refit_bounding(&mut self) {
        if matches!(self.bounding, BoundingVolume::None) {
            return;
        }
        if let Some(sphere) = Sphere::enclosing(&self.particles) {
            self.bounding = BoundingVolume::Spheres(vec![sphere]);
        }
    }

    /// Flat xyz triangle-strip buffer: for each pair of adjacent rows, the
    /// upper and lower particle of every column interleaved.
    pub fn strip_vertices(&self) -> Vec<f64> {
        let mut vertices = Vec::with_capacity((self.rows - 1) * self.columns * 6);
        for row in 1..self.rows {
            for column in 0..self.columns {
                let previous = &self.particles[(row - 1) * self.columns + column].position;
                let current = &self.particles[row * self.columns + column].position;
                vertices.extend_from_slice(previous.as_slice());
                vertices.extend_from_slice(current.as_slice());
            }
        }
        vertices
    }
}

// =========================================================================================
// Tagged union
// =========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    Rigid,
    Soft,
}

/// Any body the world can simulate.
#[derive(Debug)]
pub enum PhysicalBody {
    Rigid(RigidBody),
    Soft(SoftBody),
}

impl From<RigidBody> for PhysicalBody {
    fn from(body: RigidBody) -> Self {
        PhysicalBody::Rigid(body)
    }
}

impl From<SoftBody> for PhysicalBody {
    fn from(body: SoftBody) -> Self {
        PhysicalBody::Soft(body)
    }
}

impl PhysicalBody {
    pub fn kind(&self) -> BodyKind {
        match self {
            PhysicalBody::Rigid(_) => BodyKind::Rigid,
            PhysicalBody::Soft(_) => BodyKind::Soft,
        }
    }

    pub fn as_rigid(&self) -> Option<&RigidBody> {
        match self {
            PhysicalBody::Rigid(body) => Some(body),
            PhysicalBody::Soft(_) => None,
        }
    }

    pub fn as_rigid_mut(&mut self) -> Option<&mut RigidBody> {
        match self {
            PhysicalBody::Rigid(body) => Some(body),
            PhysicalBody::Soft(_) => None,
        }
    }

    pub fn as_soft(&self) -> Option<&SoftBody> {
        match self {
            PhysicalBody::Soft(body) => Some(body),
            PhysicalBody::Rigid(_) => None,
        }
    }

    pub fn as_soft_mut(&mut self) -> Option<&mut SoftBody> {
        match self {
            PhysicalBody::Soft(body) => Some(body),
            PhysicalBody::Rigid(_) => None,
        }
    }

    pub fn position(&self) -> NVec3 {
        match self {
            PhysicalBody::Rigid(body) => body.position(),
            PhysicalBody::Soft(body) => body.position(),
        }
    }

    pub fn set_position(&mut self, position: NVec3) {
        match self {
            PhysicalBody::Rigid(body) => {
                body.set_position(position);
            }
            PhysicalBody::Soft(body) => {
                body.set_position(position);
            }
        }
    }

    pub fn velocity(&self) -> NVec3 {
        match self {
            PhysicalBody::Rigid(body) => body.velocity(),
            PhysicalBody::Soft(body) => body.velocity(),
        }
    }

    pub fn set_velocity(&mut self, velocity: NVec3) {
        match self {
            PhysicalBody::Rigid(body) => {
                body.set_velocity(velocity);
            }
            PhysicalBody::Soft(body) => {
                body.set_velocity(velocity);
            }
        }
    }

    pub fn apply_force(&mut self, force: NVec3) {
        match self {
            PhysicalBody::Rigid(body) => {
                body.apply_force(force);
            }
            PhysicalBody::Soft(body) => {
                body.apply_force(force);
            }
        }
    }

    pub fn mass_particles(&self) -> &[MassParticle] {
        match self {
            PhysicalBody::Rigid(body) => body.mass_particles(),
            PhysicalBody::Soft(body) => body.mass_particles(),
        }
    }

    pub fn mass_particles_mut(&mut self) -> &mut [MassParticle] {
        match self {
            PhysicalBody::Rigid(body) => body.mass_particles_mut(),
            PhysicalBody::Soft(body) => body.mass_particles_mut(),
        }
    }

    pub fn mass(&self) -> f64 {
        match self {
            PhysicalBody::Rigid(body) => body.mass(),
            PhysicalBody::Soft(body) => body.mass(),
        }
    }

    pub fn set_mass(&mut self, mass: f64) {
        match self {
            PhysicalBody::Rigid(body) => {
                body.set_mass(mass);
            }
            PhysicalBody::Soft(body) => {
                body.set_mass(mass);
            }
        }
    }

    pub fn is_static(&self) -> bool {
        match self {
            PhysicalBody::Rigid(body) => body.is_static(),
            PhysicalBody::Soft(body) => body.is_static(),
        }
    }

    pub fn set_static(&mut self, is_static: bool) {
        match self {
            PhysicalBody::Rigid(body) => {
                body.set_static(is_static);
            }
            PhysicalBody::Soft(body) => {
                body.set_static(is_static);
            }
        }
    }

    pub fn bounding(&self) -> &BoundingVolume {
        match self {
            PhysicalBody::Rigid(body) => body.bounding(),
            PhysicalBody::Soft(body) => body.bounding(),
        }
    }

    pub fn bounding_spheres(&self) -> Vec<Sphere> {
        self.bounding().spheres()
    }

    pub fn world_bounding(&self) -> Cow<'_, BoundingVolume> {
        match self {
            PhysicalBody::Rigid(body) => body.world_bounding(),
            PhysicalBody::Soft(body) => Cow::Borrowed(body.bounding()),
        }
    }

    /// World-space center of particle `index`
    pub fn world_position(&self, index: usize) -> NVec3 {
        match self {
            PhysicalBody::Rigid(body) => body.world_position(index),
            PhysicalBody::Soft(body) => body.particles[index].position,
        }
    }

    /// Particle centers as a flat `[x0, y0, z0, x1, ...]` buffer for renderers
    pub fn flat_positions(&self) -> Vec<f64> {
        (0..self.mass_particles().len())
            .flat_map(|i| {
                let p = self.world_position(i);
                [p.x, p.y, p.z]
            })
            .collect()
    }
}
