use std::path::{Path, PathBuf};

use tracing::info;

use crate::app::{App, AppConfig};
use crate::codec;
use crate::dialog::{parse_filters, DialogAction, FileDialog};
use crate::error::{Error, Result};
use crate::export::{export_png, timestamped_file_name};

/// The file buttons of the settings panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileAction {
    ImportSettings,
    ExportSettings,
    ImportBiomes,
    ExportBiomes,
    ExportImage,
}

impl FileAction {
    pub fn dialog_action(self) -> DialogAction {
        match self {
            FileAction::ImportSettings | FileAction::ImportBiomes => DialogAction::Open,
            _ => DialogAction::Save,
        }
    }

    pub fn filters(self) -> &'static str {
        match self {
            FileAction::ExportImage => "PNG image:png",
            _ => "JSON:json",
        }
    }

    /// Where the action reads or writes when no path is given.
    pub fn default_path(self, config: &AppConfig) -> PathBuf {
        match self {
            FileAction::ImportSettings | FileAction::ExportSettings => config.settings_path(),
            FileAction::ImportBiomes | FileAction::ExportBiomes => config.biomes_path(),
            FileAction::ExportImage => config.data_dir.join(timestamped_file_name()),
        }
    }
}

impl App {
    /// Ask `dialog` for a path, then run `action` on it. `Ok(false)` means
    /// the user cancelled.
    pub fn run_file_action(&mut self, action: FileAction, dialog: &mut dyn FileDialog) -> Result<bool> {
        let start = self.config().data_dir.clone();
        let start = start.is_dir().then_some(start);
        let filters = parse_filters(action.filters());
        let Some(path) = dialog.pick(action.dialog_action(), start.as_deref(), &filters) else {
            return Ok(false);
        };
        self.run_file_action_at(action, &path)?;
        Ok(true)
    }

    /// Run `action` against `path` without a dialog. Failures are recorded as
    /// notices and leave in-memory state unchanged.
    pub fn run_file_action_at(&mut self, action: FileAction, path: &Path) -> Result<()> {
        match action {
            FileAction::ImportSettings => self.import_settings(path),
            FileAction::ImportBiomes => self.import_biomes(path).map(|_| ()),
            FileAction::ExportSettings => {
                let result = codec::write_settings(path, self.committed());
                self.noted(result)
            }
            FileAction::ExportBiomes => {
                let result = codec::write_biomes(path, self.biomes());
                self.noted(result)
            }
            FileAction::ExportImage => {
                let result = export_png(self.bitmap(), path);
                self.noted(result)
            }
        }?;
        info!("{:?} {}", action, path.display());
        Ok(())
    }

    /// Run `action` against its [default path](FileAction::default_path),
    /// creating the data directory for exports.
    pub fn run_file_action_default(&mut self, action: FileAction) -> Result<PathBuf> {
        let path = action.default_path(self.config());
        if action.dialog_action() == DialogAction::Save {
            let created = std::fs::create_dir_all(&self.config().data_dir)
                .map_err(|e| Error::Io(format!("failed to create {}: {}", self.config().data_dir.display(), e)));
            self.noted(created)?;
        }
        self.run_file_action_at(action, &path)?;
        Ok(path)
    }

    /// Export the canvas to a timestamped PNG inside `dir`.
    pub fn export_snapshot(&mut self, dir: &Path) -> Result<PathBuf> {
        let path = dir.join(timestamped_file_name());
        self.run_file_action_at(FileAction::ExportImage, &path)?;
        Ok(path)
    }
}
