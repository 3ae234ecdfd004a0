use glam::{Mat4, Vec3};

use crate::config::SceneAssetPaths;
use crate::error::AssetError;
use crate::model::mesh::{self, Model};

/// The fixed set of models in the scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelId {
    Table,
    Vase,
    Teapot,
    Chick,
    Pyramid,
}

impl ModelId {
    pub const ALL: [ModelId; 5] = [
        ModelId::Table,
        ModelId::Vase,
        ModelId::Teapot,
        ModelId::Chick,
        ModelId::Pyramid,
    ];

    pub fn index(self) -> usize {
        self as usize
    }
}

/// Table parts, in file order.
pub const TABLE_CHAIR_PARTS: [usize; 2] = [0, 1];
pub const TABLE_TOP_PART: usize = 2;

pub const WOOD: Vec3 = Vec3::new(0.4, 0.2, 0.0);
pub const GREY: Vec3 = Vec3::new(0.6, 0.6, 0.6);
pub const BLUE: Vec3 = Vec3::new(0.2, 0.2, 0.8);
pub const GREEN: Vec3 = Vec3::new(0.0, 0.8, 0.0);
pub const RED: Vec3 = Vec3::new(0.8, 0.0, 0.0);
pub const YELLOW: Vec3 = Vec3::new(0.8, 0.8, 0.2);

/// Pyramid and chick spin rate.
pub const SPIN_DEGREES_PER_SECOND: f32 = 20.0;

/// A model, or one part of it when `part` is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeshRef {
    pub model: ModelId,
    pub part: Option<usize>,
}

impl MeshRef {
    pub fn whole(model: ModelId) -> Self {
        Self { model, part: None }
    }

    pub fn part(model: ModelId, part: usize) -> Self {
        Self { model, part: Some(part) }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawCommand {
    pub mesh: MeshRef,
    pub model_view: Mat4,
    pub material: Vec3,
}

/// All meshes of the scene, loaded and validated.
#[derive(Debug, Clone)]
pub struct SceneModels {
    models: Vec<Model>,
}

impl SceneModels {
    pub fn load(paths: &SceneAssetPaths) -> Result<Self, AssetError> {
        let table = Model::load(&paths.table)?;
        table.require_parts(TABLE_TOP_PART + 1)?;
        let vase = Model::load(&paths.vase)?;
        let teapot = Model::load(&paths.teapot)?;
        let chick = Model::load(&paths.chick)?;
        Ok(Self::from_models(table, vase, teapot, chick))
    }

    pub fn from_models(table: Model, vase: Model, teapot: Model, chick: Model) -> Self {
        let pyramid = Model::from_mesh("pyramid", mesh::pyramid());
        Self { models: vec![table, vase, teapot, chick, pyramid] }
    }

    pub fn get(&self, id: ModelId) -> &Model {
        &self.models[id.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (ModelId, &Model)> {
        ModelId::ALL.into_iter().zip(self.models.iter())
    }
}

/// Animated scene state and per-frame draw list construction.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    /// Spin of the pyramid and chick, degrees.
    pub angle: f32,
}

impl Scene {
    pub fn new() -> Self {
        Self { angle: 0.0 }
    }

    pub fn advance(&mut self, dt: f32) {
        self.angle += dt * SPIN_DEGREES_PER_SECOND;
    }

    /// Draw commands for the whole scene seen through `view`.
    pub fn draw_list(&self, view: Mat4) -> Vec<DrawCommand> {
        let mut list = Vec::with_capacity(13);
        let mut push = |mesh: MeshRef, model_view: Mat4, material: Vec3| {
            list.push(DrawCommand { mesh, model_view, material });
        };

        // table top, then four sets of chairs around it
        let mut m = view * Mat4::from_scale(Vec3::splat(0.006));
        push(MeshRef::part(ModelId::Table, TABLE_TOP_PART), m, WOOD);
        for turn in 0..4 {
            if turn > 0 {
                m *= Mat4::from_rotation_y(90f32.to_radians());
            }
            for part in TABLE_CHAIR_PARTS {
                push(MeshRef::part(ModelId::Table, part), m, GREY);
            }
        }

        let m = view
            * Mat4::from_translation(Vec3::new(0.0, 4.5, 0.0))
            * Mat4::from_scale(Vec3::splat(0.1))
            * Mat4::from_rotation_y(80f32.to_radians());
        push(MeshRef::whole(ModelId::Vase), m, BLUE);

        let m = view
            * Mat4::from_translation(Vec3::new(-1.7, 4.5, 0.0))
            * Mat4::from_rotation_y(120f32.to_radians());
        push(MeshRef::whole(ModelId::Teapot), m, GREEN);

        let m = view
            * Mat4::from_translation(Vec3::new(2.0, 5.96, 0.0))
            * Mat4::from_rotation_x(180f32.to_radians())
            * Mat4::from_rotation_y(self.angle.to_radians())
            * Mat4::from_scale(Vec3::splat(0.2));
        push(MeshRef::whole(ModelId::Pyramid), m, RED);

        let m = view
            * Mat4::from_translation(Vec3::new(2.0, 6.44, 0.0))
            * Mat4::from_rotation_y((-self.angle).to_radians())
            * Mat4::from_scale(Vec3::splat(0.02));
        push(MeshRef::whole(ModelId::Chick), m, YELLOW);

        list
    }
}
