//! Binary space partitioning over tagged convex polygons.
//!
//! Nodes live in a [`SlotMap`] arena and every traversal is iterative, so
//! deep or unbalanced trees cannot overflow the stack.

use slotmap::{new_key_type, SlotMap};

use crate::math::{Point3, Vector3};

new_key_type! {
    /// Key of a node in a [`BspTree`].
    pub struct NodeId;
}

/// Oriented plane `normal · x = w`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    pub normal: Vector3,
    pub w: f64,
}

impl Plane {
    /// Plane through three points, or `None` if they are collinear.
    #[must_use]
    pub fn from_points(a: &Point3, b: &Point3, c: &Point3) -> Option<Self> {
        let normal = (b - a).cross(&(c - a)).try_normalize(1e-300)?;
        Some(Self {
            normal,
            w: normal.dot(&a.coords),
        })
    }

    #[must_use]
    pub fn flipped(&self) -> Self {
        Self {
            normal: -self.normal,
            w: -self.w,
        }
    }

    #[must_use]
    pub fn distance(&self, p: &Point3) -> f64 {
        self.normal.dot(&p.coords) - self.w
    }
}

/// A convex polygon with the tag of the triangle it came from.
#[derive(Debug, Clone)]
pub struct Polygon {
    pub vertices: Vec<Point3>,
    pub plane: Plane,
    pub tag: u32,
}

impl Polygon {
    /// Creates a polygon; `None` if the first three vertices are collinear.
    #[must_use]
    pub fn new(vertices: Vec<Point3>, tag: u32) -> Option<Self> {
        if vertices.len() < 3 {
            return None;
        }
        let plane = Plane::from_points(&vertices[0], &vertices[1], &vertices[2])?;
        Some(Self { vertices, plane, tag })
    }

    pub fn flip(&mut self) {
        self.vertices.reverse();
        self.plane = self.plane.flipped();
    }
}

const COPLANAR: u8 = 0;
const FRONT: u8 = 1;
const BACK: u8 = 2;
const SPANNING: u8 = 3;

/// Output buckets of [`split_polygon`].
#[derive(Debug, Default)]
struct Split {
    coplanar_front: Vec<Polygon>,
    coplanar_back: Vec<Polygon>,
    front: Vec<Polygon>,
    back: Vec<Polygon>,
}

/// Splits `polygon` by `plane`. Fragments keep the parent's plane and tag.
fn split_polygon(plane: &Plane, polygon: &Polygon, epsilon: f64, out: &mut Split) {
    let mut polygon_type = COPLANAR;
    let types: Vec<u8> = polygon
        .vertices
        .iter()
        .map(|v| {
            let t = plane.distance(v);
            let ty = if t < -epsilon {
                BACK
            } else if t > epsilon {
                FRONT
            } else {
                COPLANAR
            };
            polygon_type |= ty;
            ty
        })
        .collect();

    match polygon_type {
        COPLANAR => {
            if plane.normal.dot(&polygon.plane.normal) > 0.0 {
                out.coplanar_front.push(polygon.clone());
            } else {
                out.coplanar_back.push(polygon.clone());
            }
        }
        FRONT => out.front.push(polygon.clone()),
        BACK => out.back.push(polygon.clone()),
        _ => {
            let n = polygon.vertices.len();
            let mut f = Vec::with_capacity(n + 1);
            let mut b = Vec::with_capacity(n + 1);
            for i in 0..n {
                let j = (i + 1) % n;
                let (ti, tj) = (types[i], types[j]);
                let (vi, vj) = (polygon.vertices[i], polygon.vertices[j]);
                if ti != BACK {
                    f.push(vi);
                }
                if ti != FRONT {
                    b.push(vi);
                }
                if (ti | tj) == SPANNING {
                    let denom = plane.normal.dot(&(vj - vi));
                    let t = (plane.w - plane.normal.dot(&vi.coords)) / denom;
                    let v = vi + (vj - vi) * t;
                    f.push(v);
                    b.push(v);
                }
            }
            if f.len() >= 3 {
                out.front.push(Polygon {
                    vertices: f,
                    plane: polygon.plane,
                    tag: polygon.tag,
                });
            }
            if b.len() >= 3 {
                out.back.push(Polygon {
                    vertices: b,
                    plane: polygon.plane,
                    tag: polygon.tag,
                });
            }
        }
    }
}

#[derive(Debug, Default)]
struct Node {
    plane: Option<Plane>,
    front: Option<NodeId>,
    back: Option<NodeId>,
    polygons: Vec<Polygon>,
}

/// A BSP tree of polygons.
#[derive(Debug)]
pub struct BspTree {
    nodes: SlotMap<NodeId, Node>,
    root: NodeId,
    epsilon: f64,
}

impl BspTree {
    /// Builds a tree from `polygons`.
    #[must_use]
    pub fn new(polygons: Vec<Polygon>, epsilon: f64) -> Self {
        let mut nodes = SlotMap::with_key();
        let root = nodes.insert(Node::default());
        let mut tree = Self { nodes, root, epsilon };
        tree.build(polygons);
        tree
    }

    /// Inserts polygons into the tree.
    pub fn build(&mut self, polygons: Vec<Polygon>) {
        let mut stack = vec![(self.root, polygons)];
        while let Some((id, polygons)) = stack.pop() {
            if polygons.is_empty() {
                continue;
            }
            let plane = *self.nodes[id].plane.get_or_insert(polygons[0].plane);
            let mut split = Split::default();
            for p in &polygons {
                split_polygon(&plane, p, self.epsilon, &mut split);
            }
            let node = &mut self.nodes[id];
            node.polygons.append(&mut split.coplanar_front);
            node.polygons.append(&mut split.coplanar_back);
            let (front, back) = (node.front, node.back);

            if !split.front.is_empty() {
                let child = front.unwrap_or_else(|| self.insert_child(id, true));
                stack.push((child, split.front));
            }
            if !split.back.is_empty() {
                let child = back.unwrap_or_else(|| self.insert_child(id, false));
                stack.push((child, split.back));
            }
        }
    }

    fn insert_child(&mut self, parent: NodeId, front: bool) -> NodeId {
        let child = self.nodes.insert(Node::default());
        let node = &mut self.nodes[parent];
        if front {
            node.front = Some(child);
        } else {
            node.back = Some(child);
        }
        child
    }

    /// Converts solid space to empty space and back.
    pub fn invert(&mut self) {
        for node in self.nodes.values_mut() {
            for p in &mut node.polygons {
                p.flip();
            }
            if let Some(plane) = node.plane.as_mut() {
                *plane = plane.flipped();
            }
            std::mem::swap(&mut node.front, &mut node.back);
        }
    }

    /// Removes the parts of `polygons` inside this tree's solid.
    #[must_use]
    pub fn clip_polygons(&self, polygons: Vec<Polygon>) -> Vec<Polygon> {
        let mut kept = Vec::new();
        let mut stack = vec![(self.root, polygons)];
        while let Some((id, polygons)) = stack.pop() {
            let node = &self.nodes[id];
            let Some(plane) = node.plane else {
                kept.extend(polygons);
                continue;
            };
            let mut split = Split::default();
            for p in &polygons {
                split_polygon(&plane, p, self.epsilon, &mut split);
            }
            let mut front = split.front;
            front.append(&mut split.coplanar_front);
            let mut back = split.back;
            back.append(&mut split.coplanar_back);

            match node.front {
                Some(child) => stack.push((child, front)),
                None => kept.extend(front),
            }
            if let Some(child) = node.back {
                stack.push((child, back));
            }
        }
        kept
    }

    /// Clips every polygon of this tree against `other`.
    pub fn clip_to(&mut self, other: &BspTree) {
        for node in self.nodes.values_mut() {
            let polygons = std::mem::take(&mut node.polygons);
            node.polygons = other.clip_polygons(polygons);
        }
    }

    /// All polygons stored in the tree.
    #[must_use]
    pub fn all_polygons(&self) -> Vec<Polygon> {
        self.nodes
            .values()
            .flat_map(|n| n.polygons.iter().cloned())
            .collect()
    }
}
