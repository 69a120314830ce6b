//! Material grouping and swapping.
//!
//! A loaded model is classified into *groups*: nodes whose children are all mesh
//! leaves. The user picks a group and a material, and every mesh of the group is
//! re-bound to that material in one step.
//!
//! [`ViewerSession`] owns everything this needs: the model, the group table, the
//! material catalog, both selection controls and the bookkeeping of background
//! loads. Loads run on a tokio runtime and report back through a channel that
//! [`ViewerSession::poll_loads`] drains on the caller's thread, so the session
//! itself is never shared between threads.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use tokio::{
    runtime::Handle,
    sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel},
    task::JoinHandle,
};

use crate::{
    config::MaterialAsset,
    data_structures::{
        material::{Material, MaterialCatalog},
        scene_graph::{NodeId, Scene},
    },
    error::SwapError,
    resources::{self, AssetSource},
    selection::SelectControl,
};

/// Group name to the mesh leaves directly below that group.
///
/// Iteration follows the order in which names were first registered. Registering
/// a name again replaces its members but keeps its position.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GroupTable {
    order: Vec<String>,
    members: HashMap<String, Vec<NodeId>>,
}

impl GroupTable {
    pub fn insert(&mut self, name: impl Into<String>, meshes: Vec<NodeId>) {
        let name = name.into();
        if !self.members.contains_key(&name) {
            self.order.push(name.clone());
        }
        self.members.insert(name, meshes);
    }

    pub fn get(&self, name: &str) -> Option<&[NodeId]> {
        self.members.get(name).map(Vec::as_slice)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.members.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[NodeId])> {
        self.order
            .iter()
            .filter_map(|name| Some((name.as_str(), self.get(name)?)))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Classifies `scene` into groups and binds the default material to every
/// untextured mesh.
///
/// A node is a group iff it has at least one child and all of its children are
/// mesh leaves. The whole tree is visited; nested groups are all registered.
/// `default_material` falls back to the first catalog entry when it names
/// nothing.
pub fn build_groups(
    scene: &mut Scene,
    catalog: &MaterialCatalog,
    default_material: &str,
) -> GroupTable {
    let fallback = catalog
        .get(default_material)
        .or_else(|| catalog.first())
        .cloned();
    if fallback.is_none() {
        log::warn!("material catalog is empty, untextured meshes keep their material");
    }

    let mut table = GroupTable::default();
    for id in scene.traverse() {
        let children = scene.children(id);
        if !children.is_empty() && children.iter().all(|&child| scene.is_mesh(child)) {
            table.insert(scene.node(id).name.clone(), children.to_vec());
        }

        let untextured = scene
            .material(id)
            .is_some_and(|material| !material.has_texture());
        if let Some(fallback) = fallback.as_ref().filter(|_| untextured) {
            scene.set_material(id, fallback.clone());
        }
    }
    table
}

/// Re-binds every mesh of `group` to the catalog entry `material`.
///
/// Nothing is mutated unless both names resolve. Returns how many meshes were
/// updated.
pub fn apply_material(
    scene: &mut Scene,
    groups: &GroupTable,
    catalog: &MaterialCatalog,
    group: Option<&str>,
    material: Option<&str>,
) -> Result<usize, SwapError> {
    let group = group.ok_or(SwapError::NoGroupSelected)?;
    let material = material.ok_or(SwapError::NoMaterialSelected)?;
    let meshes = groups
        .get(group)
        .ok_or_else(|| SwapError::UnknownGroup(group.to_string()))?;
    let material = catalog
        .get(material)
        .ok_or_else(|| SwapError::UnknownMaterial(material.to_string()))?;

    Ok(meshes
        .iter()
        .filter(|&&mesh| scene.set_material(mesh, material.clone()))
        .count())
}

/// A finished background load, tagged with the ticket it was requested under.
enum LoadOutcome {
    Model {
        ticket: u64,
        source: String,
        result: anyhow::Result<Scene>,
    },
    Material {
        ticket: u64,
        name: String,
        result: anyhow::Result<Material>,
    },
}

pub struct ViewerSession {
    asset_root: PathBuf,
    runtime: Handle,
    model: Option<Scene>,
    model_revision: u64,
    groups: GroupTable,
    catalog: MaterialCatalog,
    default_material: String,
    group_control: SelectControl,
    material_control: SelectControl,
    sender: UnboundedSender<LoadOutcome>,
    receiver: UnboundedReceiver<LoadOutcome>,
    next_ticket: u64,
    latest_model: Option<u64>,
    latest_materials: HashMap<String, u64>,
}

impl ViewerSession {
    /// A session without model or materials. Loads are spawned on `runtime`.
    pub fn new(asset_root: impl Into<PathBuf>, runtime: Handle) -> Self {
        let (sender, receiver) = unbounded_channel();
        Self {
            asset_root: asset_root.into(),
            runtime,
            model: None,
            model_revision: 0,
            groups: GroupTable::default(),
            catalog: MaterialCatalog::new(),
            default_material: "misterio03".to_string(),
            group_control: SelectControl::new(),
            material_control: SelectControl::new(),
            sender,
            receiver,
            next_ticket: 0,
            latest_model: None,
            latest_materials: HashMap::new(),
        }
    }

    pub fn with_default_material(mut self, name: impl Into<String>) -> Self {
        self.default_material = name.into();
        self
    }

    /// Installs `scene` as the current model and rebuilds the groups from scratch.
    pub fn set_model(&mut self, scene: Scene) -> &GroupTable {
        self.model = Some(scene);
        self.model_revision += 1;
        self.build_groups()
    }

    /// Rebuilds the group table of the current model and resets the group
    /// control's options. The material selection is kept.
    pub fn build_groups(&mut self) -> &GroupTable {
        self.groups = match self.model.as_mut() {
            Some(scene) => build_groups(scene, &self.catalog, &self.default_material),
            None => GroupTable::default(),
        };
        self.group_control.replace_options(self.groups.names());
        log::info!(
            "model `{}` has {} material group(s)",
            self.model.as_ref().map_or("", |scene| scene.name()),
            self.groups.len()
        );
        for (name, meshes) in self.groups.iter() {
            log::debug!("group `{}`: {} mesh(es)", name, meshes.len());
        }
        &self.groups
    }

    /// Swaps the material of every mesh in `group`. See [`apply_material`].
    pub fn apply_material(&mut self, group: &str, material: &str) -> Result<usize, SwapError> {
        let scene = self.model.as_mut().ok_or(SwapError::NoModel)?;
        apply_material(
            scene,
            &self.groups,
            &self.catalog,
            Some(group),
            Some(material),
        )
    }

    /// Swaps using whatever the two controls currently select.
    pub fn apply_selection(&mut self) -> Result<usize, SwapError> {
        let scene = self.model.as_mut().ok_or(SwapError::NoModel)?;
        let updated = apply_material(
            scene,
            &self.groups,
            &self.catalog,
            self.group_control.selected(),
            self.material_control.selected(),
        )?;
        log::info!(
            "bound {} mesh(es) of `{}` to `{}`",
            updated,
            self.group_control.selected().unwrap_or_default(),
            self.material_control.selected().unwrap_or_default()
        );
        Ok(updated)
    }

    /// Records the group selection. Unknown names are ignored.
    pub fn select_group(&mut self, name: &str) -> bool {
        self.group_control.select(name)
    }

    /// Records the material selection and applies it to the selected group.
    /// Unknown names leave both the selection and the model untouched.
    pub fn select_material(&mut self, name: &str) -> Result<usize, SwapError> {
        if !self.material_control.select(name) {
            return Err(SwapError::UnknownMaterial(name.to_string()));
        }
        self.apply_selection()
    }

    pub fn cycle_group(&mut self, forward: bool) -> Option<&str> {
        if forward {
            self.group_control.select_next()
        } else {
            self.group_control.select_previous()
        }
    }

    /// Moves the material selection and applies it, like [`select_material`](Self::select_material).
    pub fn cycle_material(&mut self, forward: bool) -> Result<usize, SwapError> {
        let moved = if forward {
            self.material_control.select_next()
        } else {
            self.material_control.select_previous()
        };
        if moved.is_none() {
            return Err(SwapError::NoMaterialSelected);
        }
        self.apply_selection()
    }

    /// Binds `material` in the catalog and offers it in the material control.
    pub fn insert_material(&mut self, material: Material) {
        let name = material.name().to_string();
        if self.catalog.insert(material).is_some() {
            log::debug!("material `{}` replaced", name);
        }
        self.material_control.push_option(name);
    }

    /// Starts loading a model in the background.
    ///
    /// The model is installed by a later [`poll_loads`](Self::poll_loads), and only
    /// if no newer model load was requested meanwhile.
    pub fn load_model(&mut self, source: AssetSource) -> JoinHandle<()> {
        let ticket = self.issue_ticket();
        self.latest_model = Some(ticket);
        let asset_root = self.asset_root.clone();
        let sender = self.sender.clone();
        log::info!("loading model `{}`", source.name());
        self.runtime.spawn(async move {
            let name = source.name();
            let result = resources::load_model_gltf(&asset_root, source).await;
            // The receiver only goes away with the session.
            let _ = sender.send(LoadOutcome::Model {
                ticket,
                source: name,
                result,
            });
        })
    }

    /// Starts decoding an image into a material bound under `name`.
    ///
    /// The material is not in the catalog until a later
    /// [`poll_loads`](Self::poll_loads) picks it up.
    pub fn add_material(&mut self, name: impl Into<String>, source: AssetSource) -> JoinHandle<()> {
        let name = name.into();
        let ticket = self.issue_ticket();
        self.latest_materials.insert(name.clone(), ticket);
        let asset_root = self.asset_root.clone();
        let sender = self.sender.clone();
        self.runtime.spawn(async move {
            let result = resources::load_material(&asset_root, &name, source).await;
            let _ = sender.send(LoadOutcome::Material {
                ticket,
                name,
                result,
            });
        })
    }

    /// Applies every finished load. Returns how many changed the session.
    pub fn poll_loads(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(outcome) = self.receiver.try_recv() {
            if self.apply_outcome(outcome) {
                applied += 1;
            }
        }
        applied
    }

    fn apply_outcome(&mut self, outcome: LoadOutcome) -> bool {
        match outcome {
            LoadOutcome::Model {
                ticket,
                source,
                result,
            } => {
                if self.latest_model != Some(ticket) {
                    log::debug!("discarding superseded model load `{}`", source);
                    return false;
                }
                match result {
                    Ok(scene) => {
                        self.set_model(scene);
                        true
                    }
                    Err(e) => {
                        log::error!("could not load model `{}`: {:#}", source, e);
                        false
                    }
                }
            }
            LoadOutcome::Material {
                ticket,
                name,
                result,
            } => {
                if self.latest_materials.get(&name) != Some(&ticket) {
                    log::debug!("discarding superseded material load `{}`", name);
                    return false;
                }
                self.latest_materials.remove(&name);
                match result {
                    Ok(material) => {
                        self.insert_material(material);
                        true
                    }
                    Err(e) => {
                        log::error!("could not load material `{}`: {:#}", name, e);
                        false
                    }
                }
            }
        }
    }

    /// Decodes the fixed material list concurrently and inserts the results in
    /// list order. Failing entries are logged and skipped. Returns how many
    /// materials were added.
    pub async fn load_catalog(&mut self, assets: &[MaterialAsset]) -> usize {
        let asset_root = self.asset_root.clone();
        let loads = assets.iter().map(|asset| {
            resources::load_material(
                &asset_root,
                &asset.name,
                AssetSource::path(asset.path.clone()),
            )
        });
        let results = futures::future::join_all(loads).await;

        let mut loaded = 0;
        for (asset, result) in assets.iter().zip(results) {
            match result {
                Ok(material) => {
                    self.insert_material(material);
                    loaded += 1;
                }
                Err(e) => log::error!("could not load material `{}`: {:#}", asset.name, e),
            }
        }
        log::info!("material catalog: {} of {} loaded", loaded, assets.len());
        loaded
    }

    fn issue_ticket(&mut self) -> u64 {
        self.next_ticket += 1;
        self.next_ticket
    }

    pub fn model(&self) -> Option<&Scene> {
        self.model.as_ref()
    }

    /// Bumped every time a model is installed.
    pub fn model_revision(&self) -> u64 {
        self.model_revision
    }

    pub fn groups(&self) -> &GroupTable {
        &self.groups
    }

    pub fn catalog(&self) -> &MaterialCatalog {
        &self.catalog
    }

    pub fn group_control(&self) -> &SelectControl {
        &self.group_control
    }

    pub fn material_control(&self) -> &SelectControl {
        &self.material_control
    }

    pub fn asset_root(&self) -> &Path {
        &self.asset_root
    }

    pub fn runtime(&self) -> &Handle {
        &self.runtime
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::data_structures::model::MeshData;

    fn geometry() -> Arc<MeshData> {
        Arc::new(MeshData::new(
            vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            None,
            None,
            None,
        ))
    }

    fn textured(name: &str) -> Material {
        Material::textured(name, image::RgbaImage::from_pixel(1, 1, image::Rgba([9, 9, 9, 255])))
    }

    fn own_texture() -> Arc<Material> {
        Arc::new(textured("baked"))
    }

    fn catalog(names: &[&str]) -> MaterialCatalog {
        let mut catalog = MaterialCatalog::new();
        for name in names {
            catalog.insert(textured(name));
        }
        catalog
    }

    struct Car {
        scene: Scene,
        body: [NodeId; 2],
        trim: NodeId,
    }

    /// Scene ─┬─ Body ─┬─ mesh1
    ///        │        └─ mesh2
    ///        └─ Trim ─── mesh3
    fn car() -> Car {
        let mut scene = Scene::new("Scene");
        let root = scene.root();
        let body = scene.add_group(root, "Body");
        let mesh1 = scene.add_mesh(body, "mesh1", geometry(), own_texture());
        let mesh2 = scene.add_mesh(body, "mesh2", geometry(), own_texture());
        let trim = scene.add_group(root, "Trim");
        let mesh3 = scene.add_mesh(trim, "mesh3", geometry(), own_texture());
        Car {
            scene,
            body: [mesh1, mesh2],
            trim: mesh3,
        }
    }

    fn material_of(scene: &Scene, id: NodeId) -> &Arc<Material> {
        scene.material(id).expect("mesh leaf")
    }

    #[test]
    fn group_iff_every_child_is_a_mesh() {
        let mut scene = Scene::new("Scene");
        let root = scene.root();
        let mixed = scene.add_group(root, "Mixed");
        scene.add_mesh(mixed, "leaf", geometry(), own_texture());
        let inner = scene.add_group(mixed, "Inner");
        scene.add_mesh(inner, "inner_leaf", geometry(), own_texture());
        scene.add_group(root, "Empty");

        let table = build_groups(&mut scene, &catalog(&["red"]), "red");

        assert_eq!(table.names().collect::<Vec<_>>(), ["Inner"]);
        assert!(!table.contains("Mixed"));
        assert!(!table.contains("Empty"));
        assert!(!table.contains("Scene"));
    }

    #[test]
    fn duplicate_names_keep_first_slot_and_last_members() {
        let mut scene = Scene::new("Scene");
        let root = scene.root();
        let first = scene.add_group(root, "Panel");
        scene.add_mesh(first, "a", geometry(), own_texture());
        let other = scene.add_group(root, "Glass");
        scene.add_mesh(other, "b", geometry(), own_texture());
        let second = scene.add_group(root, "Panel");
        let c = scene.add_mesh(second, "c", geometry(), own_texture());

        let table = build_groups(&mut scene, &catalog(&["red"]), "red");

        assert_eq!(table.names().collect::<Vec<_>>(), ["Panel", "Glass"]);
        assert_eq!(table.get("Panel"), Some(&[c][..]));
    }

    #[test]
    fn only_untextured_meshes_get_the_default() {
        let mut scene = Scene::new("Scene");
        let root = scene.root();
        let group = scene.add_group(root, "Body");
        let bare = scene.add_mesh(
            group,
            "bare",
            geometry(),
            Arc::new(Material::untextured("flat", [1.0; 4])),
        );
        let baked = own_texture();
        let kept = scene.add_mesh(group, "kept", geometry(), baked.clone());
        let catalog = catalog(&["misterio03", "misterio14"]);

        build_groups(&mut scene, &catalog, "misterio03");

        assert_eq!(material_of(&scene, bare).name(), "misterio03");
        assert!(Arc::ptr_eq(material_of(&scene, kept), &baked));
    }

    #[test]
    fn unknown_default_falls_back_to_first_entry() {
        let mut scene = Scene::new("Scene");
        let root = scene.root();
        let bare = scene.add_mesh(
            root,
            "bare",
            geometry(),
            Arc::new(Material::untextured("flat", [1.0; 4])),
        );

        build_groups(&mut scene, &catalog(&["walnut", "ash"]), "misterio03");

        assert_eq!(material_of(&scene, bare).name(), "walnut");
    }

    #[test]
    fn empty_catalog_assigns_nothing() {
        let mut scene = Scene::new("Scene");
        let root = scene.root();
        let flat = Arc::new(Material::untextured("flat", [1.0; 4]));
        let bare = scene.add_mesh(root, "bare", geometry(), flat.clone());

        let table = build_groups(&mut scene, &MaterialCatalog::new(), "misterio03");

        assert!(Arc::ptr_eq(material_of(&scene, bare), &flat));
        assert_eq!(table.names().collect::<Vec<_>>(), ["Scene"]);
    }

    #[test]
    fn group_table_iterates_in_registration_order() {
        let Car {
            mut scene,
            body,
            trim,
        } = car();

        let table = build_groups(&mut scene, &catalog(&["red"]), "red");

        let entries: Vec<_> = table.iter().collect();
        assert_eq!(entries, [("Body", &body[..]), ("Trim", &[trim][..])]);
    }

    #[test]
    fn apply_updates_only_the_selected_group() {
        let Car {
            mut scene,
            body,
            trim,
        } = car();
        let catalog = catalog(&["red", "blue"]);
        let groups = build_groups(&mut scene, &catalog, "red");
        let trim_before = material_of(&scene, trim).clone();

        let updated =
            apply_material(&mut scene, &groups, &catalog, Some("Body"), Some("blue")).expect("valid");

        assert_eq!(updated, 2);
        let blue = catalog.get("blue").expect("blue");
        for mesh in body {
            assert!(Arc::ptr_eq(material_of(&scene, mesh), blue));
        }
        assert!(Arc::ptr_eq(material_of(&scene, trim), &trim_before));
    }

    #[test]
    fn invalid_selection_changes_nothing() {
        let Car { mut scene, body, .. } = car();
        let catalog = catalog(&["red", "blue"]);
        let groups = build_groups(&mut scene, &catalog, "red");
        let before: Vec<u64> = body.iter().map(|&m| material_of(&scene, m).id()).collect();
        let groups_before = groups.clone();

        let cases = [
            (Some("Roof"), Some("blue"), SwapError::UnknownGroup("Roof".into())),
            (Some("Body"), Some("green"), SwapError::UnknownMaterial("green".into())),
            (None, Some("blue"), SwapError::NoGroupSelected),
            (Some("Body"), None, SwapError::NoMaterialSelected),
        ];
        for (group, material, expected) in cases {
            assert_eq!(
                apply_material(&mut scene, &groups, &catalog, group, material),
                Err(expected)
            );
        }

        let after: Vec<u64> = body.iter().map(|&m| material_of(&scene, m).id()).collect();
        assert_eq!(before, after);
        assert_eq!(groups, groups_before);
    }

    #[tokio::test]
    async fn reload_leaves_no_stale_groups() {
        let mut session = ViewerSession::new("assets", Handle::current());
        session.insert_material(textured("red"));
        session.set_model(car().scene);
        assert!(session.select_group("Body"));

        let mut other = Scene::new("Other");
        let root = other.root();
        let wheels = other.add_group(root, "Wheels");
        other.add_mesh(wheels, "tyre", geometry(), own_texture());
        session.set_model(other);

        assert_eq!(session.groups().names().collect::<Vec<_>>(), ["Wheels"]);
        assert_eq!(session.group_control().options(), ["Wheels"]);
        assert_eq!(session.group_control().selected(), None);
        assert_eq!(session.model_revision(), 2);
    }

    #[tokio::test]
    async fn selecting_a_material_swaps_the_selected_group() {
        let mut session = ViewerSession::new("assets", Handle::current());
        session.insert_material(textured("red"));
        session.insert_material(textured("blue"));
        let Car { scene, body, trim } = car();
        session.set_model(scene);

        assert_eq!(session.select_material("blue"), Err(SwapError::NoGroupSelected));
        assert!(session.select_group("Body"));
        assert_eq!(session.select_material("blue"), Ok(2));
        assert_eq!(
            session.select_material("green"),
            Err(SwapError::UnknownMaterial("green".into()))
        );
        assert_eq!(session.material_control().selected(), Some("blue"));

        let model = session.model().expect("model");
        for mesh in body {
            assert_eq!(material_of(model, mesh).name(), "blue");
        }
        assert_eq!(material_of(model, trim).name(), "baked");
    }

    #[tokio::test]
    async fn cycling_materials_applies_each_step() {
        let mut session = ViewerSession::new("assets", Handle::current());
        session.insert_material(textured("red"));
        session.insert_material(textured("blue"));
        let Car { scene, trim, .. } = car();
        session.set_model(scene);

        assert_eq!(session.cycle_group(true), Some("Body"));
        assert_eq!(session.cycle_group(true), Some("Trim"));
        assert_eq!(session.cycle_material(true), Ok(1));
        assert_eq!(material_of(session.model().expect("model"), trim).name(), "red");
        assert_eq!(session.cycle_material(false), Ok(1));
        assert_eq!(material_of(session.model().expect("model"), trim).name(), "blue");
    }

    #[tokio::test]
    async fn swap_without_model_is_rejected() {
        let mut session = ViewerSession::new("assets", Handle::current());
        session.insert_material(textured("red"));
        assert_eq!(session.apply_material("Body", "red"), Err(SwapError::NoModel));
    }
}
