//! Node hierarchy and socket resolution
//!
//! [`Hierarchy::build`] derives everything the extraction stages need to know
//! about the node tree in one pass over the document: parents, sibling-unique
//! names, node paths, promoted scene roots, per-skin common roots and the
//! synthetic "Socket" nodes. The result is immutable.
//!
//! A node path is the `/`-joined chain of unique names from a scene root down
//! to the node, skipping a promoted root (whose own path is empty).
//!
//! A socket is created for every parent `P` of a skinned mesh node, unless
//! `P` is the scene node itself. The socket sits directly under the scene
//! node, carries `P`'s world transform and adopts all of `P`'s children, so
//! anything that used to live under `path(P)` is now addressed under the
//! socket's path. [`Hierarchy::map_to_socket_path`] performs that rewrite.
//!
//! A parent that is itself a skin joint never gets a socket: the mesh already
//! rides that joint, and moving its child bones would split the skeleton.

use glam::{Mat4, Quat, Vec3};
use hashbrown::{HashMap, HashSet};

use crate::diagnostics::{DiagnosticKind, Logger, LoggerExt};
use crate::document::schema::Node;
use crate::document::Document;
use crate::error::{ConformanceViolation, ConvertError, Result};

pub const SOCKET_NAME: &str = "Socket";

/// A scene with its root nodes resolved
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedScene {
    pub name: Option<String>,
    pub roots: Vec<usize>,
    /// The lone root standing in for the scene node, if promoted
    pub promoted_root: Option<usize>,
}

impl ResolvedScene {
    /// Nodes sitting directly under the scene node
    pub fn top_level(&self, hierarchy: &Hierarchy) -> Vec<usize> {
        match self.promoted_root {
            Some(root) => hierarchy.children(root).to_vec(),
            None => self.roots.clone(),
        }
    }
}

/// Synthetic node holding the world transform of a skinned mesh's parent
#[derive(Debug, Clone, PartialEq)]
pub struct Socket {
    pub name: String,
    /// The original parent whose children were adopted
    pub source: usize,
    pub scene: usize,
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
    pub children: Vec<usize>,
}

/// Resolved node tree of one document
#[derive(Debug, Clone)]
pub struct Hierarchy {
    parents: Vec<Option<usize>>,
    children: Vec<Vec<usize>>,
    names: Vec<String>,
    paths: Vec<String>,
    promoted: Vec<bool>,
    node_scenes: Vec<Option<usize>>,
    scenes: Vec<ResolvedScene>,
    skin_roots: Vec<Option<usize>>,
    sockets: Vec<Socket>,
    /// (original path prefix, replacement prefix)
    socket_mappings: Vec<(String, String)>,
}

/// Local translation/rotation/scale of a node, decomposing `matrix` if set
pub fn node_trs(node: &Node) -> (Vec3, Quat, Vec3) {
    if let Some(matrix) = node.matrix {
        let (scale, rotation, translation) =
            Mat4::from_cols_array(&matrix).to_scale_rotation_translation();
        return (translation, rotation, scale);
    }
    (
        node.translation.map(Vec3::from_array).unwrap_or(Vec3::ZERO),
        node.rotation.map(Quat::from_array).unwrap_or(Quat::IDENTITY),
        node.scale.map(Vec3::from_array).unwrap_or(Vec3::ONE),
    )
}

/// Build the parent table, rejecting bad child indices, shared children and cycles
pub fn build_parents(nodes: &[Node]) -> Result<Vec<Option<usize>>> {
    let mut parents: Vec<Option<usize>> = vec![None; nodes.len()];
    for (parent, node) in nodes.iter().enumerate() {
        for &child in &node.children {
            if child >= nodes.len() {
                return Err(ConvertError::out_of_range("node", child));
            }
            if let Some(first) = parents[child] {
                return Err(ConformanceViolation::MultipleParents {
                    node: child,
                    first,
                    second: parent,
                }
                .into());
            }
            parents[child] = Some(parent);
        }
    }

    for start in 0..nodes.len() {
        let mut current = parents[start];
        let mut steps = 0;
        while let Some(node) = current {
            if node == start || steps > nodes.len() {
                return Err(ConformanceViolation::Cycle(start).into());
            }
            current = parents[node];
            steps += 1;
        }
    }

    Ok(parents)
}

/// Ancestor chain from the tree root down to `node` (inclusive)
fn root_to_node(parents: &[Option<usize>], node: usize) -> Vec<usize> {
    let mut chain = vec![node];
    let mut current = parents[node];
    while let Some(parent) = current {
        chain.push(parent);
        current = parents[parent];
    }
    chain.reverse();
    chain
}

/// Lowest node that is an ancestor (or equal) of every joint
///
/// `None` for an empty joint list or joints spread over disjoint trees.
pub fn common_root(parents: &[Option<usize>], joints: &[usize]) -> Option<usize> {
    let (first, rest) = joints.split_first()?;
    let first_chain = root_to_node(parents, *first);
    let mut len = first_chain.len();
    for &joint in rest {
        let chain = root_to_node(parents, joint);
        len = len.min(
            first_chain
                .iter()
                .zip(chain.iter())
                .take_while(|(a, b)| a == b)
                .count(),
        );
    }
    len.checked_sub(1).map(|last| first_chain[last])
}

fn autogen_name(original: &str, index: usize, count: usize) -> String {
    if count == 0 {
        format!("{original}(__autogen {index})")
    } else {
        format!("{original}(__autogen {index}-{count})")
    }
}

fn disambiguate(original: &str, index: usize, used: &HashSet<String>) -> String {
    if !original.is_empty() && !used.contains(original) {
        return original.to_string();
    }
    let mut count = 0;
    loop {
        let candidate = autogen_name(original, index, count);
        if !used.contains(&candidate) {
            return candidate;
        }
        count += 1;
    }
}

/// Make the names of one sibling group unique
///
/// A missing, empty or already taken name is replaced by
/// `name(__autogen i)`, then `name(__autogen i-1)`, `name(__autogen i-2)`
/// and so on until it is free, `i` being the sibling's position. Names that
/// are already unique come back unchanged.
pub fn make_unique_names<S: AsRef<str>>(names: &[Option<S>]) -> Vec<String> {
    let mut used = HashSet::new();
    let mut out = Vec::with_capacity(names.len());
    for (index, name) in names.iter().enumerate() {
        let original = name.as_ref().map(AsRef::as_ref).unwrap_or("");
        let unique = disambiguate(original, index, &used);
        used.insert(unique.clone());
        out.push(unique);
    }
    out
}

impl Hierarchy {
    pub fn build(
        document: &Document,
        promote_single_root_node: bool,
        logger: &dyn Logger,
    ) -> Result<Self> {
        let gltf = document.gltf();
        let nodes = &gltf.nodes;
        let parents = build_parents(nodes)?;
        let mut children: Vec<Vec<usize>> = nodes.iter().map(|n| n.children.clone()).collect();

        let parentless: Vec<usize> = (0..nodes.len()).filter(|&n| parents[n].is_none()).collect();

        // Unique names per sibling group, parentless nodes forming one group
        let mut names = vec![String::new(); nodes.len()];
        let mut assign = |group: &[usize]| {
            let originals: Vec<Option<&str>> =
                group.iter().map(|&n| nodes[n].name.as_deref()).collect();
            for (&node, name) in group.iter().zip(make_unique_names(&originals)) {
                names[node] = name;
            }
        };
        assign(&parentless);
        for node in nodes {
            if !node.children.is_empty() {
                assign(&node.children);
            }
        }

        let mut scenes: Vec<ResolvedScene> = gltf
            .scenes
            .iter()
            .map(|scene| {
                for &root in &scene.nodes {
                    if root >= nodes.len() {
                        return Err(ConvertError::out_of_range("node", root));
                    }
                }
                Ok(ResolvedScene {
                    name: scene.name.clone(),
                    roots: scene.nodes.clone(),
                    promoted_root: None,
                })
            })
            .collect::<Result<_>>()?;
        if scenes.is_empty() {
            scenes.push(ResolvedScene {
                name: None,
                roots: parentless.clone(),
                promoted_root: None,
            });
        }

        let mut root_scene: HashMap<usize, usize> = HashMap::new();
        for (index, scene) in scenes.iter().enumerate() {
            for &root in &scene.roots {
                root_scene.entry(root).or_insert(index);
            }
        }
        let node_scenes: Vec<Option<usize>> = (0..nodes.len())
            .map(|n| root_scene.get(&root_to_node(&parents, n)[0]).copied())
            .collect();

        let mut promoted = vec![false; nodes.len()];
        if promote_single_root_node {
            let joints: HashSet<usize> = gltf.skins.iter().flat_map(|s| s.joints.iter().copied()).collect();
            let animated: HashSet<usize> = gltf
                .animations
                .iter()
                .flat_map(|a| a.channels.iter().filter_map(|c| c.target.node))
                .collect();
            for scene in &mut scenes {
                if let [root] = scene.roots[..] {
                    if !joints.contains(&root) && !animated.contains(&root) {
                        promoted[root] = true;
                        scene.promoted_root = Some(root);
                    }
                }
            }
        }

        let mut paths = vec![String::new(); nodes.len()];
        let mut stack: Vec<usize> = parentless.iter().rev().copied().collect();
        while let Some(node) = stack.pop() {
            paths[node] = match parents[node] {
                _ if promoted[node] => String::new(),
                Some(parent) if !promoted[parent] => format!("{}/{}", paths[parent], names[node]),
                _ => names[node].clone(),
            };
            stack.extend(nodes[node].children.iter().rev());
        }

        let mut skin_roots = Vec::with_capacity(gltf.skins.len());
        for (index, skin) in gltf.skins.iter().enumerate() {
            for &joint in &skin.joints {
                if joint >= nodes.len() {
                    return Err(ConvertError::out_of_range("node", joint));
                }
            }
            let root = common_root(&parents, &skin.joints);
            if root.is_none() {
                logger.error(
                    None,
                    format!(
                        "skin {index}: joints share no common root, skinning root left unresolved"
                    ),
                );
            }
            skin_roots.push(root);
        }

        for (index, node) in nodes.iter().enumerate() {
            let Some(skin) = node.skin else { continue };
            let skin_def = document.skin(skin)?;
            let scene = node_scenes[index];
            if skin_def.joints.iter().any(|&j| node_scenes[j] != scene) {
                logger.warn(
                    DiagnosticKind::ReferenceSkinInDifferentScene,
                    format!(
                        "node '{}' references skin {skin} whose joints live in another scene",
                        names[index]
                    ),
                );
            }
        }

        let joints: HashSet<usize> = gltf.skins.iter().flat_map(|s| s.joints.iter().copied()).collect();

        // Sockets, one per distinct non-scene parent of a skinned mesh node
        let mut sockets: Vec<Socket> = Vec::new();
        let mut socket_of_parent: HashMap<usize, usize> = HashMap::new();
        let mut used_top_level: HashMap<usize, HashSet<String>> = HashMap::new();
        for (index, node) in nodes.iter().enumerate() {
            if node.mesh.is_none() || node.skin.is_none() {
                continue;
            }
            let Some(parent) = parents[index] else { continue };
            if promoted[parent] || joints.contains(&parent) || socket_of_parent.contains_key(&parent) {
                continue;
            }
            let Some(scene) = node_scenes[parent] else { continue };

            let used = used_top_level.entry(scene).or_insert_with(|| {
                let resolved = &scenes[scene];
                let top: Vec<usize> = match resolved.promoted_root {
                    Some(root) => nodes[root].children.clone(),
                    None => resolved.roots.clone(),
                };
                top.iter().map(|&n| names[n].clone()).collect()
            });
            let name = disambiguate(SOCKET_NAME, used.len(), used);
            used.insert(name.clone());

            let (translation, rotation, scale) = world_trs(nodes, &parents, &promoted, parent);
            let adopted = std::mem::take(&mut children[parent]);
            socket_of_parent.insert(parent, sockets.len());
            sockets.push(Socket {
                name,
                source: parent,
                scene,
                translation,
                rotation,
                scale,
                children: adopted,
            });
        }

        let socket_mappings = sockets
            .iter()
            .map(|s| (paths[s.source].clone(), s.name.clone()))
            .collect();

        Ok(Self {
            parents,
            children,
            names,
            paths,
            promoted,
            node_scenes,
            scenes,
            skin_roots,
            sockets,
            socket_mappings,
        })
    }

    pub fn node_count(&self) -> usize {
        self.parents.len()
    }

    pub fn parent(&self, node: usize) -> Option<usize> {
        self.parents[node]
    }

    pub fn parents(&self) -> &[Option<usize>] {
        &self.parents
    }

    /// Children after socket adoption
    pub fn children(&self, node: usize) -> &[usize] {
        &self.children[node]
    }

    pub fn name(&self, node: usize) -> &str {
        &self.names[node]
    }

    /// Path before any socket rewrite
    pub fn path(&self, node: usize) -> &str {
        &self.paths[node]
    }

    /// Path as seen from the rebuilt scene, socket rewrite applied
    pub fn mapped_path(&self, node: usize) -> String {
        self.map_to_socket_path(&self.paths[node])
    }

    pub fn is_promoted(&self, node: usize) -> bool {
        self.promoted[node]
    }

    pub fn scene_of(&self, node: usize) -> Option<usize> {
        self.node_scenes[node]
    }

    pub fn scenes(&self) -> &[ResolvedScene] {
        &self.scenes
    }

    /// Common root of a skin's joints, `None` when unresolved
    pub fn skin_root(&self, skin: usize) -> Option<usize> {
        self.skin_roots.get(skin).copied().flatten()
    }

    pub fn sockets(&self) -> &[Socket] {
        &self.sockets
    }

    /// Rewrite a path that lives under a socket-adopted parent
    ///
    /// The longest matching original prefix wins; only strict descendants of
    /// that prefix are rewritten, the suffix is kept.
    pub fn map_to_socket_path(&self, path: &str) -> String {
        let best = self
            .socket_mappings
            .iter()
            .filter(|(prefix, _)| {
                path.len() > prefix.len()
                    && path.starts_with(prefix.as_str())
                    && path.as_bytes()[prefix.len()] == b'/'
            })
            .max_by_key(|(prefix, _)| prefix.len());

        match best {
            Some((prefix, replacement)) => format!("{replacement}{}", &path[prefix.len()..]),
            None => path.to_string(),
        }
    }
}

/// Transform of `node` relative to the scene node
fn world_trs(
    nodes: &[Node],
    parents: &[Option<usize>],
    promoted: &[bool],
    node: usize,
) -> (Vec3, Quat, Vec3) {
    let mut translation = Vec3::ZERO;
    let mut rotation = Quat::IDENTITY;
    let mut scale = Vec3::ONE;
    let mut current = Some(node);
    while let Some(index) = current {
        if promoted[index] {
            break;
        }
        let (t, r, s) = node_trs(&nodes[index]);
        translation = t + r * (s * translation);
        rotation = r * rotation;
        scale = s * scale;
        current = parents[index];
    }
    (translation, rotation, scale)
}
