use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use swatch_viewer::config::{MaterialAsset, ViewerConfig, parse_material_arg};

#[derive(Parser, Debug)]
#[command(name = "swatch-viewer")]
#[command(about = "GLTF viewer that swaps the materials of mesh groups")]
struct Cli {
    /// TOML config file; flags below override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory that model, background and texture paths are relative to
    #[arg(long)]
    assets: Option<PathBuf>,

    /// Model loaded at startup (.glb or .gltf)
    #[arg(long)]
    model: Option<PathBuf>,

    /// Background image
    #[arg(long)]
    background: Option<PathBuf>,

    /// Extra catalog material as `name=path`, may be repeated
    #[arg(long = "texture", value_parser = parse_material_arg)]
    textures: Vec<MaterialAsset>,
}

impl Cli {
    fn into_config(self) -> Result<ViewerConfig> {
        let mut config = match &self.config {
            Some(path) => ViewerConfig::load(path)?,
            None => ViewerConfig::default(),
        };
        if let Some(assets) = self.assets {
            config.asset_root = assets;
        }
        if let Some(model) = self.model {
            config.model = Some(model);
        }
        if let Some(background) = self.background {
            config.background = Some(background);
        }
        config.materials.extend(self.textures);
        Ok(config)
    }
}

fn main() -> Result<()> {
    let config = Cli::parse().into_config()?;
    swatch_viewer::viewer::run(config)
}
