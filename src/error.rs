use std::path::PathBuf;

/// Failures while bringing up the window, the GPU or the shader program.
#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("failed to create event loop: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),

    #[error("failed to open window: {0}")]
    Window(#[from] winit::error::OsError),

    #[error("failed to create surface: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),

    #[error("no suitable GPU adapter: {0}")]
    Adapter(#[from] wgpu::RequestAdapterError),

    #[error("failed to request device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),

    #[error("surface reports no supported formats")]
    NoSurfaceFormat,

    #[error("failed to read shader {path}: {source}")]
    ShaderSource {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("shader {path} failed to build: {message}")]
    Shader { path: PathBuf, message: String },
}

/// Failures while loading a mesh file.
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path}:{line}: {message}")]
    Parse {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("{path} contains no faces")]
    Empty { path: PathBuf },

    #[error("{path} has {count} parts, part {index} is required")]
    MissingPart {
        path: PathBuf,
        index: usize,
        count: usize,
    },
}

/// Anything that stops the demo from reaching the running state.
#[derive(Debug, thiserror::Error)]
pub enum SceneError {
    #[error(transparent)]
    Init(#[from] InitError),

    #[error(transparent)]
    Asset(#[from] AssetError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_reports_location() {
        let err = AssetError::Parse {
            path: PathBuf::from("models/vase.obj"),
            line: 12,
            message: "bad vertex".into(),
        };
        assert_eq!(err.to_string(), "models/vase.obj:12: bad vertex");
    }

    #[test]
    fn scene_error_is_transparent() {
        let err: SceneError = AssetError::Empty { path: PathBuf::from("a.obj") }.into();
        assert_eq!(err.to_string(), "a.obj contains no faces");
        assert!(matches!(err, SceneError::Asset(_)));
    }
}
