use std::path::PathBuf;

/// Compiled-in settings for the demo. Paths are relative to the working directory.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub position: (i32, i32),
    pub shader_path: PathBuf,
    pub assets: SceneAssetPaths,
    pub clear_color: [f64; 3],
    pub lighting: LightingConfig,
}

#[derive(Debug, Clone)]
pub struct SceneAssetPaths {
    pub table: PathBuf,
    pub vase: PathBuf,
    pub teapot: PathBuf,
    pub chick: PathBuf,
}

/// Fixed light, expressed in camera space.
#[derive(Debug, Clone, Copy)]
pub struct LightingConfig {
    pub direction: [f32; 3],
    pub diffuse: f32,
    pub ambient: f32,
}

impl Default for SceneAssetPaths {
    fn default() -> Self {
        Self {
            table: PathBuf::from("models/table.obj"),
            vase: PathBuf::from("models/vase.obj"),
            teapot: PathBuf::from("models/utah_teapot_ultrares.obj"),
            chick: PathBuf::from("models/chicken.obj"),
        }
    }
}

impl Default for LightingConfig {
    fn default() -> Self {
        Self {
            direction: [-0.4, -0.6, -0.7],
            diffuse: 0.7,
            ambient: 0.3,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            title: "Tablescape: First Example".to_string(),
            width: 1280,
            height: 720,
            position: (100, 100),
            shader_path: PathBuf::from("shaders/basic.wgsl"),
            assets: SceneAssetPaths::default(),
            clear_color: [0.18, 0.25, 0.22],
            lighting: LightingConfig::default(),
        }
    }
}
