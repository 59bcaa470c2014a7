use crate::engine::{FfmpegEngine, TranscodeEngine};
use std::sync::Arc;

pub mod execution_service;
pub mod file_service;
pub mod picker_service;
pub mod player_service;
pub mod preference_service;
pub mod viewer_service;

pub use execution_service::ExecutionCoordinator;
pub use file_service::{FileService, FileStatProvider};
pub use picker_service::{AssetPicker, DialogAssetPicker};
pub use player_service::PlayerService;
pub use preference_service::{JsonPreferenceStore, MemoryPreferenceStore, PreferenceStore};
pub use viewer_service::{SystemViewer, Viewer};

/// The external collaborators the coordinator and the screen talk to.
#[derive(Clone)]
pub struct ServiceManager {
    pub engine: Arc<dyn TranscodeEngine>,
    pub preferences: Arc<dyn PreferenceStore>,
    pub picker: Arc<dyn AssetPicker>,
    pub files: Arc<dyn FileStatProvider>,
    pub viewer: Arc<dyn Viewer>,
}

impl ServiceManager {
    pub fn new(
        engine: Arc<dyn TranscodeEngine>,
        preferences: Arc<dyn PreferenceStore>,
        picker: Arc<dyn AssetPicker>,
        files: Arc<dyn FileStatProvider>,
        viewer: Arc<dyn Viewer>,
    ) -> Self {
        Self {
            engine,
            preferences,
            picker,
            files,
            viewer,
        }
    }

    /// ffmpeg, native dialogs and the preferences file in the user's config directory.
    pub fn system() -> Self {
        let preferences: Arc<dyn PreferenceStore> = match JsonPreferenceStore::default_path() {
            Some(path) => {
                let store = JsonPreferenceStore::new(path);
                tracing::info!("Preferences stored at {:?}", store.path());
                Arc::new(store)
            }
            None => {
                tracing::warn!("Could not determine config directory, preferences will not persist");
                Arc::new(MemoryPreferenceStore::new())
            }
        };

        Self::new(
            Arc::new(FfmpegEngine::new()),
            preferences,
            Arc::new(DialogAssetPicker::new()),
            Arc::new(FileService::new()),
            Arc::new(SystemViewer::new()),
        )
    }
}
