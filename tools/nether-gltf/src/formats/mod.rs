//! On-disk form of the intermediate assets
//!
//! Every description is written as pretty JSON; a packed mesh additionally
//! writes its combined buffer next to it as raw bytes.

use anyhow::{Context, Result};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::mesh::PackedMesh;

pub const MESH_EXTENSION: &str = "mesh.json";
pub const BUFFER_EXTENSION: &str = "bin";
pub const SKELETON_EXTENSION: &str = "skeleton.json";
pub const ANIMATION_EXTENSION: &str = "anim.json";
pub const SCENE_EXTENSION: &str = "scene.json";

/// Write `value` as pretty JSON followed by a newline
pub fn write_json<W: Write, T: Serialize>(w: &mut W, value: &T) -> Result<()> {
    serde_json::to_writer_pretty(&mut *w, value)?;
    w.write_all(b"\n")?;
    Ok(())
}

pub fn write_json_file<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Failed to create {:?}", path))?;
    let mut w = BufWriter::new(file);
    write_json(&mut w, value)?;
    w.flush()?;
    Ok(())
}

/// `<stem>.<extension>`, where `stem` keeps any directory part
pub fn output_path(stem: &Path, extension: &str) -> PathBuf {
    let mut path = stem.as_os_str().to_owned();
    path.push(".");
    path.push(extension);
    PathBuf::from(path)
}

/// Write `<stem>.mesh.json` and `<stem>.bin`, returning both paths
pub fn write_packed_mesh(stem: &Path, packed: &PackedMesh) -> Result<(PathBuf, PathBuf)> {
    let json_path = output_path(stem, MESH_EXTENSION);
    let bin_path = output_path(stem, BUFFER_EXTENSION);

    write_json_file(&json_path, &packed.mesh)?;
    std::fs::write(&bin_path, &packed.data)
        .with_context(|| format!("Failed to write {:?}", bin_path))?;

    Ok((json_path, bin_path))
}
