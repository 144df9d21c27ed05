//! Bounding volumes for broad-phase pruning.
//!
//! A body carries either nothing, a flat list of spheres, or a binary sphere
//! tree built by recursively halving a box region. Two bodies only reach the
//! per-particle narrow phase when their volumes overlap somewhere.
//!
//! The tree is stored as an arena (`nodes`) with children referenced by index.

use crate::error::PhysicsError;
use crate::simulation::math::{max_scale, mean, transform_point, NMat4, NVec3};
use crate::simulation::particle::MassParticle;

/// Recursion guard for [`SphereTree::build`]
const MAX_TREE_DEPTH: usize = 24;

/// Sphere positioned in the same frame as the body's particles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sphere {
    pub position: NVec3,
    pub radius: f64,
}

impl Sphere {
    pub fn new(position: NVec3, radius: f64) -> Self {
        Self { position, radius }
    }

    /// Strict overlap; touching spheres do not count, matching the narrow phase.
    pub fn overlaps(&self, other: &Sphere) -> bool {
        (self.position - other.position).norm() < self.radius + other.radius
    }

    pub fn shift(&mut self, shift: &NVec3) {
        self.position += shift;
    }

    /// Sphere containing this one after mapping it through `m`.
    pub fn transformed(&self, m: &NMat4) -> Sphere {
        Sphere::new(transform_point(m, &self.position), self.radius * max_scale(m))
    }

    /// Smallest sphere centered on the particles' centroid that contains every
    /// particle including its radius. `None` for an empty slice.
    pub fn enclosing(particles: &[MassParticle]) -> Option<Sphere> {
        let center = mean(particles.iter().map(|p| p.position))?;
        let radius = particles
            .iter()
            .map(|p| (p.position - center).norm() + p.radius)
            .fold(0.0, f64::max);
        Some(Sphere::new(center, radius))
    }
}

/// Axis-aligned box given by two corners.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rectangle {
    pub min: NVec3,
    pub max: NVec3,
}

impl Rectangle {
    /// Box spanned by two arbitrary corners.
    pub fn new(a: NVec3, b: NVec3) -> Self {
        Self {
            min: a.inf(&b),
            max: a.sup(&b),
        }
    }

    /// Box covering every particle including its radius.
    pub fn around(particles: &[MassParticle]) -> Option<Rectangle> {
        let first = particles.first()?;
        let reach = NVec3::repeat(first.radius);
        let mut rect = Rectangle::new(first.position - reach, first.position + reach);
        for p in &particles[1..] {
            let reach = NVec3::repeat(p.radius);
            rect.min = rect.min.inf(&(p.position - reach));
            rect.max = rect.max.sup(&(p.position + reach));
        }
        Some(rect)
    }

    pub fn center(&self) -> NVec3 {
        (self.min + self.max) * 0.5
    }

    pub fn extents(&self) -> NVec3 {
        self.max - self.min
    }

    pub fn half_diagonal(&self) -> f64 {
        self.extents().norm() * 0.5
    }

    /// Sphere circumscribing the box
    pub fn bounding_sphere(&self) -> Sphere {
        Sphere::new(self.center(), self.half_diagonal())
    }

    /// Halve the box across its longest axis.
    pub fn split_longest_axis(&self) -> (Rectangle, Rectangle) {
        let extents = self.extents();
        let axis = extents.imax();
        let center = self.center();

        let mut low_max = self.max;
        low_max[axis] = center[axis];
        let mut high_min = self.min;
        high_min[axis] = center[axis];

        (
            Rectangle { min: self.min, max: low_max },
            Rectangle { min: high_min, max: self.max },
        )
    }
}

/// One node of a [`SphereTree`].
#[derive(Debug, Clone)]
pub struct SphereTreeNode {
    pub sphere: Sphere,
    pub children: [Option<usize>; 2], // indices into SphereTree::nodes
}

impl SphereTreeNode {
    pub fn is_leaf(&self) -> bool {
        self.children.iter().all(|c| c.is_none())
    }
}

/// Binary bounding-sphere hierarchy over a box region.
#[derive(Debug, Clone)]
pub struct SphereTree {
    pub nodes: Vec<SphereTreeNode>,
    pub root: usize,
    pub leaves: Vec<usize>,
}

impl SphereTree {
    /// Build a tree over `region`, halving along the longest axis until every
    /// node's sphere radius is at most `leaf_radius`.
    pub fn build(region: Rectangle, leaf_radius: f64) -> Result<Self, PhysicsError> {
        if !(leaf_radius.is_finite() && leaf_radius > 0.0) {
            return Err(PhysicsError::InvalidLeafRadius(leaf_radius));
        }

        let mut tree = SphereTree {
            nodes: Vec::new(),
            root: 0,
            leaves: Vec::new(),
        };
        tree.root = tree.subdivide(region, leaf_radius, 0);
        Ok(tree)
    }

    fn subdivide(&mut self, region: Rectangle, leaf_radius: f64, depth: usize) -> usize {
        let idx = self.nodes.len();
        self.nodes.push(SphereTreeNode {
            sphere: region.bounding_sphere(),
            children: [None; 2],
        });

        if region.half_diagonal() <= leaf_radius || depth >= MAX_TREE_DEPTH {
            self.leaves.push(idx);
            return idx;
        }

        let (low, high) = region.split_longest_axis();
        let low_idx = self.subdivide(low, leaf_radius, depth + 1);
        let high_idx = self.subdivide(high, leaf_radius, depth + 1);
        self.nodes[idx].children = [Some(low_idx), Some(high_idx)];
        idx
    }

    pub fn root_sphere(&self) -> &Sphere {
        &self.nodes[self.root].sphere
    }

    pub fn leaf_spheres(&self) -> Vec<Sphere> {
        self.leaves.iter().map(|&i| self.nodes[i].sphere).collect()
    }

    pub fn shift(&mut self, shift: &NVec3) {
        for node in &mut self.nodes {
            node.sphere.shift(shift);
        }
    }

    pub fn transformed(&self, m: &NMat4) -> SphereTree {
        let mut tree = self.clone();
        for node in &mut tree.nodes {
            node.sphere = node.sphere.transformed(m);
        }
        tree
    }

    /// Does any leaf of this tree overlap `sphere`?
    pub fn overlaps_sphere(&self, sphere: &Sphere) -> bool {
        self.node_overlaps_sphere(self.root, sphere)
    }

    /// Does any leaf of this tree overlap any leaf of `other`?
    pub fn overlaps_tree(&self, other: &SphereTree) -> bool {
        self.nodes_overlap(self.root, other, other.root)
    }

    fn node_overlaps_sphere(&self, idx: usize, sphere: &Sphere) -> bool {
        let node = &self.nodes[idx];
        if !node.sphere.overlaps(sphere) {
            return false;
        }
        if node.is_leaf() {
            return true;
        }
        node.children
            .iter()
            .flatten()
            .any(|&child| self.node_overlaps_sphere(child, sphere))
    }

    fn nodes_overlap(&self, a: usize, other: &SphereTree, b: usize) -> bool {
        let na = &self.nodes[a];
        let nb = &other.nodes[b];
        if !na.sphere.overlaps(&nb.sphere) {
            return false;
        }

        // descend into the bigger node first so both sides shrink evenly
        let descend_a = match (na.is_leaf(), nb.is_leaf()) {
            (true, true) => return true,
            (false, true) => true,
            (true, false) => false,
            (false, false) => na.sphere.radius >= nb.sphere.radius,
        };

        if descend_a {
            na.children
                .iter()
                .flatten()
                .any(|&child| self.nodes_overlap(child, other, b))
        } else {
            nb.children
                .iter()
                .flatten()
                .any(|&child| self.nodes_overlap(a, other, child))
        }
    }
}

/// Broad-phase volume owned by a body.
#[derive(Debug, Clone, Default)]
pub enum BoundingVolume {
    /// No pruning information; the body is always narrow-phase tested.
    #[default]
    None,
    Spheres(Vec<Sphere>),
    Tree(SphereTree),
}

impl BoundingVolume {
    /// Conservative overlap test. Missing information on either side (no
    /// volume, or an empty sphere list) counts as overlapping.
    pub fn overlaps(&self, other: &BoundingVolume) -> bool {
        match (self, other) {
            (BoundingVolume::None, _) | (_, BoundingVolume::None) => true,
            (BoundingVolume::Spheres(a), _) if a.is_empty() => true,
            (_, BoundingVolume::Spheres(b)) if b.is_empty() => true,
            (BoundingVolume::Spheres(a), BoundingVolume::Spheres(b)) => {
                a.iter().any(|sa| b.iter().any(|sb| sa.overlaps(sb)))
            }
            (BoundingVolume::Spheres(spheres), BoundingVolume::Tree(tree))
            | (BoundingVolume::Tree(tree), BoundingVolume::Spheres(spheres)) => {
                spheres.iter().any(|s| tree.overlaps_sphere(s))
            }
            (BoundingVolume::Tree(a), BoundingVolume::Tree(b)) => a.overlaps_tree(b),
        }
    }

    pub fn shift(&mut self, shift: &NVec3) {
        match self {
            BoundingVolume::None => {}
            BoundingVolume::Spheres(spheres) => {
                for s in spheres.iter_mut() {
                    s.shift(shift);
                }
            }
            BoundingVolume::Tree(tree) => tree.shift(shift),
        }
    }

    /// Copy of the volume mapped through `m`, e.g. from object-local into
    /// world coordinates.
    pub fn transformed(&self, m: &NMat4) -> BoundingVolume {
        match self {
            BoundingVolume::None => BoundingVolume::None,
            BoundingVolume::Spheres(spheres) => {
                BoundingVolume::Spheres(spheres.iter().map(|s| s.transformed(m)).collect())
            }
            BoundingVolume::Tree(tree) => BoundingVolume::Tree(tree.transformed(m)),
        }
    }

    /// Flat sphere list for debug drawing; a tree reports its leaves.
    pub fn spheres(&self) -> Vec<Sphere> {
        match self {
            BoundingVolume::None => Vec::new(),
            BoundingVolume::Spheres(spheres) => spheres.clone(),
            BoundingVolume::Tree(tree) => tree.leaf_spheres(),
        }
    }
}
