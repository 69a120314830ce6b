#![allow(dead_code)]

use std::path::{Path, PathBuf};

const GLB_MAGIC: &[u8; 4] = b"glTF";
const CHUNK_JSON: &[u8; 4] = b"JSON";
const CHUNK_BIN: &[u8; 4] = b"BIN\0";

/// Packs a JSON document and an optional binary buffer into a GLB container.
pub fn glb(json: &str, bin: &[u8]) -> Vec<u8> {
    let mut json = json.as_bytes().to_vec();
    while json.len() % 4 != 0 {
        json.push(b' ');
    }
    let mut bin = bin.to_vec();
    while bin.len() % 4 != 0 {
        bin.push(0);
    }

    let mut length = 12 + 8 + json.len();
    if !bin.is_empty() {
        length += 8 + bin.len();
    }

    let mut out = Vec::with_capacity(length);
    out.extend_from_slice(GLB_MAGIC);
    out.extend_from_slice(&2u32.to_le_bytes());
    out.extend_from_slice(&(length as u32).to_le_bytes());
    out.extend_from_slice(&(json.len() as u32).to_le_bytes());
    out.extend_from_slice(CHUNK_JSON);
    out.extend_from_slice(&json);
    if !bin.is_empty() {
        out.extend_from_slice(&(bin.len() as u32).to_le_bytes());
        out.extend_from_slice(CHUNK_BIN);
        out.extend_from_slice(&bin);
    }
    out
}

/// Positions of a unit right triangle in the XY plane.
pub fn triangle_bin() -> Vec<u8> {
    [[0.0f32, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]
        .iter()
        .flatten()
        .flat_map(|c| c.to_le_bytes())
        .collect()
}

/// Chair (translated by 1,2,3) ─┬─ Seat: mesh with one primitive
///                               └─ Legs: mesh `legs` with two primitives
pub fn chair_glb() -> Vec<u8> {
    let bin = triangle_bin();
    let json = format!(
        r#"{{
  "asset": {{ "version": "2.0" }},
  "scene": 0,
  "scenes": [{{ "nodes": [0] }}],
  "nodes": [
    {{ "name": "Chair", "children": [1, 2], "translation": [1.0, 2.0, 3.0] }},
    {{ "name": "Seat", "mesh": 0 }},
    {{ "name": "Legs", "mesh": 1 }}
  ],
  "meshes": [
    {{ "name": "seat", "primitives": [{{ "attributes": {{ "POSITION": 0 }} }}] }},
    {{ "name": "legs", "primitives": [
      {{ "attributes": {{ "POSITION": 0 }} }},
      {{ "attributes": {{ "POSITION": 0 }} }}
    ] }}
  ],
  "accessors": [{{
    "bufferView": 0,
    "componentType": 5126,
    "count": 3,
    "type": "VEC3",
    "min": [0.0, 0.0, 0.0],
    "max": [1.0, 1.0, 0.0]
  }}],
  "bufferViews": [{{ "buffer": 0, "byteOffset": 0, "byteLength": {len} }}],
  "buffers": [{{ "byteLength": {len} }}]
}}"#,
        len = bin.len()
    );
    glb(&json, &bin)
}

/// A valid document without any scene.
pub fn sceneless_glb() -> Vec<u8> {
    glb(r#"{ "asset": { "version": "2.0" } }"#, &[])
}

/// Scratch asset root, removed when dropped.
pub fn temp_dir() -> tempfile::TempDir {
    tempfile::TempDir::new().expect("failed to create a temp asset root")
}

/// Writes a 2x2 PNG of a single colour and returns its file name.
pub fn write_png(dir: &Path, file_name: &str, rgba: [u8; 4]) -> PathBuf {
    let path = dir.join(file_name);
    image::RgbaImage::from_pixel(2, 2, image::Rgba(rgba))
        .save(&path)
        .expect("failed to write png fixture");
    PathBuf::from(file_name)
}
