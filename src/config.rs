//! Viewer configuration.
//!
//! Every key has a default, so a TOML file only needs the keys it changes. The
//! CLI in `main.rs` layers its flags on top of whatever the file produced.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

/// One entry of the fixed material list loaded at startup.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MaterialAsset {
    pub name: String,
    /// Image path relative to the asset root.
    pub path: PathBuf,
}

impl MaterialAsset {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Vertical field of view in radians.
    pub fov_rad: f32,
    pub near: f32,
    pub far: f32,
    /// Fraction of the accumulated orbit/zoom/pan input applied per frame.
    pub damping: f32,
    /// Radians per pixel of mouse motion.
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub pan_speed: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_rad: 0.8,
            near: 0.01,
            far: 1000.0,
            damping: 0.25,
            rotate_speed: 0.005,
            zoom_speed: 1.0,
            pan_speed: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub asset_root: PathBuf,
    /// Model loaded at startup, relative to the asset root.
    pub model: Option<PathBuf>,
    /// Background image, relative to the asset root.
    pub background: Option<PathBuf>,
    /// Used when no background image is set or while it loads.
    pub clear_colour: [f64; 4],
    /// Catalog entry bound to untextured meshes of a freshly loaded model.
    pub default_material: String,
    pub materials: Vec<MaterialAsset>,
    pub camera: CameraConfig,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            asset_root: PathBuf::from("assets"),
            model: Some(PathBuf::from("models/como/como2.glb")),
            background: Some(PathBuf::from("background/room.jpg")),
            clear_colour: [0.749, 0.890, 0.867, 1.0],
            default_material: "misterio03".to_string(),
            materials: vec![
                MaterialAsset::new("misterio03", "textures/misterio/Misterio_03_base-d7350.jpg"),
                MaterialAsset::new("misterio14", "textures/misterio/Misterio_14_base-c5e10.jpg"),
                MaterialAsset::new("misterio70", "textures/misterio/Misterio_70_base-571f9.jpg"),
                MaterialAsset::new("misterio80", "textures/misterio/Misterio_80_base-9a472.jpg"),
                MaterialAsset::new("misterio90", "textures/misterio/Misterio_90_base-6a7f8.jpg"),
            ],
            camera: CameraConfig::default(),
        }
    }
}

impl ViewerConfig {
    pub fn from_toml_str(txt: &str) -> Result<Self> {
        toml::from_str(txt).context("parse viewer config TOML")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let txt =
            std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
        Self::from_toml_str(&txt)
    }

    pub fn clear_colour(&self) -> wgpu::Color {
        let [r, g, b, a] = self.clear_colour;
        wgpu::Color { r, g, b, a }
    }
}

/// Parses a `name=path` CLI argument into a material entry.
pub fn parse_material_arg(arg: &str) -> Result<MaterialAsset, String> {
    match arg.split_once('=') {
        Some((name, path)) if !name.trim().is_empty() && !path.trim().is_empty() => {
            Ok(MaterialAsset::new(name.trim(), path.trim()))
        }
        _ => Err(format!("expected `name=path`, got `{arg}`")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_keeps_defaults() {
        let cfg = ViewerConfig::from_toml_str("").expect("empty TOML is valid");
        assert_eq!(cfg, ViewerConfig::default());
        assert_eq!(cfg.materials.len(), 5);
        assert_eq!(cfg.materials[0].name, "misterio03");
    }

    #[test]
    fn partial_file_overrides_only_its_keys() {
        let cfg = ViewerConfig::from_toml_str(
            r#"
            asset_root = "/srv/swatches"
            model = "chair.glb"

            [[materials]]
            name = "oak"
            path = "wood/oak.png"

            [camera]
            damping = 0.1
            "#,
        )
        .expect("valid TOML");

        assert_eq!(cfg.asset_root, PathBuf::from("/srv/swatches"));
        assert_eq!(cfg.model, Some(PathBuf::from("chair.glb")));
        assert_eq!(cfg.materials, vec![MaterialAsset::new("oak", "wood/oak.png")]);
        assert_eq!(cfg.camera.damping, 0.1);
        assert_eq!(cfg.camera.fov_rad, 0.8);
        assert_eq!(cfg.default_material, "misterio03");
    }

    #[test]
    fn unknown_types_are_rejected() {
        assert!(ViewerConfig::from_toml_str("clear_colour = \"blue\"").is_err());
    }

    #[test]
    fn material_args_need_name_and_path() {
        assert_eq!(
            parse_material_arg("denim=uploads/denim.png"),
            Ok(MaterialAsset::new("denim", "uploads/denim.png"))
        );
        assert!(parse_material_arg("denim").is_err());
        assert!(parse_material_arg("=x.png").is_err());
    }
}
