use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::LazyLock;

use serde::Serialize;

use crate::part::BodyPart;

/// Static per-part metadata consulted by special-case rules.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PartTraits {
    /// A fracture here structurally disables everything downstream.
    pub weight_bearing: bool,
    /// Damage here opens a major vessel and starts bleeding.
    pub major_vessel: bool,
    /// Core of the body; first in line for scarce resources.
    pub central: bool,
    /// Losing this part is fatal.
    pub vital: bool,
    /// Terminal part of a limb.
    pub extremity: bool,
}

#[derive(Debug, Clone)]
struct PartInfo {
    parent: Option<BodyPart>,
    children: Vec<BodyPart>,
    traits: PartTraits,
}

/// Structural map from each body part to its neighbours.
///
/// The graph is a tree rooted at the chest. "Upstream" means towards the
/// root, "downstream" means away from it: the neck is upstream of the head,
/// the shoulder is upstream of the whole arm chain.
#[derive(Debug, Clone)]
pub struct AnatomicalGraph {
    root: BodyPart,
    parts: BTreeMap<BodyPart, PartInfo>,
}

static HUMAN: LazyLock<AnatomicalGraph> = LazyLock::new(AnatomicalGraph::human);

/// The shared human anatomy used by every subsystem.
pub fn anatomy() -> &'static AnatomicalGraph {
    &HUMAN
}

impl AnatomicalGraph {
    /// Build the standard humanoid graph.
    pub fn human() -> Self {
        use BodyPart::*;

        let wb = PartTraits {
            weight_bearing: true,
            ..PartTraits::default()
        };
        let table: [(BodyPart, Option<BodyPart>, PartTraits); 19] = [
            (
                Chest,
                None,
                PartTraits {
                    central: true,
                    vital: true,
                    major_vessel: true,
                    ..PartTraits::default()
                },
            ),
            (
                Neck,
                Some(Chest),
                PartTraits {
                    vital: true,
                    major_vessel: true,
                    ..PartTraits::default()
                },
            ),
            (
                Head,
                Some(Neck),
                PartTraits {
                    vital: true,
                    ..PartTraits::default()
                },
            ),
            (
                Abdomen,
                Some(Chest),
                PartTraits {
                    central: true,
                    major_vessel: true,
                    ..PartTraits::default()
                },
            ),
            (
                Pelvis,
                Some(Abdomen),
                PartTraits {
                    central: true,
                    weight_bearing: true,
                    ..PartTraits::default()
                },
            ),
            (LeftShoulder, Some(Chest), PartTraits::default()),
            (
                LeftUpperArm,
                Some(LeftShoulder),
                PartTraits {
                    major_vessel: true,
                    ..PartTraits::default()
                },
            ),
            (LeftForearm, Some(LeftUpperArm), PartTraits::default()),
            (
                LeftHand,
                Some(LeftForearm),
                PartTraits {
                    extremity: true,
                    ..PartTraits::default()
                },
            ),
            (RightShoulder, Some(Chest), PartTraits::default()),
            (
                RightUpperArm,
                Some(RightShoulder),
                PartTraits {
                    major_vessel: true,
                    ..PartTraits::default()
                },
            ),
            (RightForearm, Some(RightUpperArm), PartTraits::default()),
            (
                RightHand,
                Some(RightForearm),
                PartTraits {
                    extremity: true,
                    ..PartTraits::default()
                },
            ),
            (
                LeftThigh,
                Some(Pelvis),
                PartTraits {
                    major_vessel: true,
                    ..wb
                },
            ),
            (LeftShin, Some(LeftThigh), wb),
            (
                LeftFoot,
                Some(LeftShin),
                PartTraits {
                    extremity: true,
                    ..wb
                },
            ),
            (
                RightThigh,
                Some(Pelvis),
                PartTraits {
                    major_vessel: true,
                    ..wb
                },
            ),
            (RightShin, Some(RightThigh), wb),
            (
                RightFoot,
                Some(RightShin),
                PartTraits {
                    extremity: true,
                    ..wb
                },
            ),
        ];

        let mut parts: BTreeMap<BodyPart, PartInfo> = table
            .iter()
            .map(|&(part, parent, traits)| {
                (
                    part,
                    PartInfo {
                        parent,
                        children: Vec::new(),
                        traits,
                    },
                )
            })
            .collect();

        // Children are recorded in table order so traversal is deterministic.
        for &(part, parent, _) in &table {
            if let Some(parent) = parent
                && let Some(info) = parts.get_mut(&parent)
            {
                info.children.push(part);
            }
        }

        Self { root: Chest, parts }
    }

    /// The central part every other part hangs from.
    pub fn root(&self) -> BodyPart {
        self.root
    }

    /// The part directly upstream, or `None` for the root.
    pub fn parent(&self, part: BodyPart) -> Option<BodyPart> {
        self.parts.get(&part).and_then(|i| i.parent)
    }

    /// Parts directly downstream.
    pub fn children(&self, part: BodyPart) -> &[BodyPart] {
        self.parts
            .get(&part)
            .map(|i| i.children.as_slice())
            .unwrap_or(&[])
    }

    /// Undirected adjacency: the parent (if any) followed by the children.
    pub fn neighbors(&self, part: BodyPart) -> Vec<BodyPart> {
        self.parent(part)
            .into_iter()
            .chain(self.children(part).iter().copied())
            .collect()
    }

    pub fn traits(&self, part: BodyPart) -> PartTraits {
        self.parts.get(&part).map(|i| i.traits).unwrap_or_default()
    }

    pub fn is_weight_bearing(&self, part: BodyPart) -> bool {
        self.traits(part).weight_bearing
    }

    pub fn is_major_vessel(&self, part: BodyPart) -> bool {
        self.traits(part).major_vessel
    }

    pub fn is_central(&self, part: BodyPart) -> bool {
        self.traits(part).central
    }

    /// Every strict descendant of `part`, nearest first.
    pub fn downstream(&self, part: BodyPart) -> Vec<BodyPart> {
        let mut out = Vec::new();
        let mut queue: VecDeque<BodyPart> = self.children(part).iter().copied().collect();
        while let Some(current) = queue.pop_front() {
            out.push(current);
            queue.extend(self.children(current).iter().copied());
        }
        out
    }

    /// Every strict ancestor of `part`, nearest first.
    pub fn upstream(&self, part: BodyPart) -> Vec<BodyPart> {
        let mut out = Vec::new();
        let mut current = self.parent(part);
        while let Some(p) = current {
            out.push(p);
            current = self.parent(p);
        }
        out
    }

    /// Returns true if `part` lies strictly downstream of `ancestor`.
    pub fn is_downstream_of(&self, part: BodyPart, ancestor: BodyPart) -> bool {
        self.upstream(part).contains(&ancestor)
    }

    /// Number of edges between `part` and the root.
    pub fn depth(&self, part: BodyPart) -> u32 {
        self.upstream(part).len() as u32
    }

    /// Number of edges on the path between two parts.
    pub fn distance(&self, a: BodyPart, b: BodyPart) -> u32 {
        let mut chain_a = vec![a];
        chain_a.extend(self.upstream(a));
        let mut chain_b = vec![b];
        chain_b.extend(self.upstream(b));
        for (i, pa) in chain_a.iter().enumerate() {
            if let Some(j) = chain_b.iter().position(|pb| pb == pa) {
                return (i + j) as u32;
            }
        }
        // Unreachable for a connected tree.
        u32::MAX
    }

    /// All parts in breadth-first order from the root: core first, extremities last.
    pub fn outward_order(&self) -> Vec<BodyPart> {
        let mut out = vec![self.root];
        out.extend(self.downstream(self.root));
        out
    }

    /// Breadth-first spread of a magnitude outward from `origin`.
    ///
    /// The origin receives the full magnitude. Each hop multiplies the
    /// residual by `falloff`; a branch stops once the residual drops below
    /// `negligible` or the next part is not `passable`. An impassable origin
    /// is still hit but spreads nothing. Returns `(part, magnitude)` pairs in
    /// visiting order.
    pub fn spread(
        &self,
        origin: BodyPart,
        magnitude: f64,
        falloff: f64,
        negligible: f64,
        passable: impl Fn(BodyPart) -> bool,
    ) -> Vec<(BodyPart, f64)> {
        let mut hits = vec![(origin, magnitude)];
        if !passable(origin) {
            return hits;
        }

        let mut visited = BTreeSet::from([origin]);
        let mut queue = VecDeque::from([(origin, magnitude)]);

        while let Some((current, residual)) = queue.pop_front() {
            let next = residual * falloff;
            if next < negligible || next <= 0.0 {
                continue;
            }
            for neighbor in self.neighbors(current) {
                if visited.contains(&neighbor) || !passable(neighbor) {
                    continue;
                }
                visited.insert(neighbor);
                hits.push((neighbor, next));
                queue.push_back((neighbor, next));
            }
        }
        hits
    }
}
