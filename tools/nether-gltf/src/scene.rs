//! Scene graph builder (resolved hierarchy -> plain transform nodes)

use glam::{Quat, Vec3};
use serde::Serialize;

use crate::document::Document;
use crate::error::{ConvertError, Result};
use crate::hierarchy::{node_trs, Hierarchy};

/// Local TRS, rotation as xyzw
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Transform {
    pub translation: [f32; 3],
    pub rotation: [f32; 4],
    pub scale: [f32; 3],
}

impl Transform {
    pub const IDENTITY: Self = Self {
        translation: [0.0; 3],
        rotation: [0.0, 0.0, 0.0, 1.0],
        scale: [1.0; 3],
    };

    fn from_trs((translation, rotation, scale): (Vec3, Quat, Vec3)) -> Self {
        Self {
            translation: translation.to_array(),
            rotation: rotation.to_array(),
            scale: scale.to_array(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneNode {
    pub name: String,
    pub path: String,
    /// glTF node index; `None` for sockets
    pub source: Option<usize>,
    pub transform: Transform,
    /// Indices into [`SceneGraph::nodes`]
    pub children: Vec<usize>,
    pub mesh: Option<usize>,
    pub skin: Option<usize>,
    /// Path of the skin's common root; empty when it is the promoted root
    pub skinning_root: Option<String>,
}

/// A synthesized socket and the graph node standing for it
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SocketRef {
    pub path: String,
    pub target_node: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneGraph {
    pub name: String,
    /// Transform of the promoted root, identity otherwise
    pub root_transform: Transform,
    pub nodes: Vec<SceneNode>,
    /// Nodes directly under the scene node
    pub roots: Vec<usize>,
    pub sockets: Vec<SocketRef>,
}

pub fn build_scene(document: &Document, hierarchy: &Hierarchy, scene_index: usize) -> Result<SceneGraph> {
    let scene = hierarchy
        .scenes()
        .get(scene_index)
        .ok_or_else(|| ConvertError::out_of_range("scene", scene_index))?;

    let root_transform = match scene.promoted_root {
        Some(root) => Transform::from_trs(node_trs(document.node(root)?)),
        None => Transform::IDENTITY,
    };

    let mut graph = SceneGraph {
        name: scene
            .name
            .clone()
            .unwrap_or_else(|| format!("scene_{scene_index}")),
        root_transform,
        nodes: Vec::new(),
        roots: Vec::new(),
        sockets: Vec::new(),
    };

    for node in scene.top_level(hierarchy) {
        let index = add_subtree(&mut graph, document, hierarchy, node)?;
        graph.roots.push(index);
    }

    for socket in hierarchy.sockets().iter().filter(|s| s.scene == scene_index) {
        let index = graph.nodes.len();
        graph.nodes.push(SceneNode {
            name: socket.name.clone(),
            path: socket.name.clone(),
            source: None,
            transform: Transform::from_trs((socket.translation, socket.rotation, socket.scale)),
            children: Vec::new(),
            mesh: None,
            skin: None,
            skinning_root: None,
        });
        for &child in &socket.children {
            let child_index = add_subtree(&mut graph, document, hierarchy, child)?;
            graph.nodes[index].children.push(child_index);
        }
        graph.roots.push(index);
        graph.sockets.push(SocketRef {
            path: socket.name.clone(),
            target_node: index,
        });
    }

    Ok(graph)
}

fn add_subtree(graph: &mut SceneGraph, document: &Document, hierarchy: &Hierarchy, node: usize) -> Result<usize> {
    let source = document.node(node)?;
    let index = graph.nodes.len();
    graph.nodes.push(SceneNode {
        name: hierarchy.name(node).to_string(),
        path: hierarchy.mapped_path(node),
        source: Some(node),
        transform: Transform::from_trs(node_trs(source)),
        children: Vec::new(),
        mesh: source.mesh,
        skin: source.skin,
        skinning_root: source
            .skin
            .and_then(|skin| hierarchy.skin_root(skin))
            .map(|root| hierarchy.mapped_path(root)),
    });

    for &child in hierarchy.children(node) {
        let child_index = add_subtree(graph, document, hierarchy, child)?;
        graph.nodes[index].children.push(child_index);
    }
    Ok(index)
}
