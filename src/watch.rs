use std::path::{Path, PathBuf};

use crossbeam::channel::Sender;
use notify::{Config as WatchConfig, RecommendedWatcher, RecursiveMode, Watcher};

use crate::config::Config;
use crate::engine::EngineCommand;
use crate::error::Error;

/// Reloads the config file whenever it is modified and hands the new settings
/// to the engine. Watching stops when the returned watcher is dropped.
pub fn watch_config(
    path: &Path,
    command_tx: Sender<EngineCommand>,
) -> Result<RecommendedWatcher, Error> {
    let path_owned: PathBuf = path.to_path_buf();

    let mut watcher = RecommendedWatcher::new(
        move |res: Result<notify::Event, notify::Error>| match res {
            Ok(event) => {
                if event.kind.is_modify() {
                    reload(&path_owned, &command_tx);
                }
            }
            Err(e) => tracing::warn!("watch error: {}", e),
        },
        WatchConfig::default(),
    )?;

    watcher.watch(path, RecursiveMode::NonRecursive)?;
    tracing::info!(path = %path.display(), "watching config");

    Ok(watcher)
}

fn reload(path: &Path, command_tx: &Sender<EngineCommand>) {
    match Config::load(path) {
        Ok(config) => {
            tracing::info!("config changed, reloading");
            let _ = command_tx.send(EngineCommand::Reconfigure(config.settings));
        }
        // Editors often save in several steps; keep the old settings.
        Err(e) => tracing::warn!("keeping previous settings: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;

    #[test]
    fn reload_sends_new_settings() {
        let dir = std::env::temp_dir().join(format!("canon-watch-{}", std::process::id()));
        let path = dir.join("canon.ron");
        let config = Config {
            settings: Settings {
                transpose_semitones: 4,
                silence_threshold_ms: 600,
                ..Settings::default()
            },
            ..Config::default()
        };
        config.save(&path).unwrap();

        let (tx, rx) = crossbeam::channel::unbounded();
        reload(&path, &tx);
        match rx.try_recv() {
            Ok(EngineCommand::Reconfigure(settings)) => assert_eq!(settings, config.settings),
            other => panic!("unexpected {other:?}"),
        }

        std::fs::write(&path, "(settings: (silence_threshold_ms: 0))").unwrap();
        reload(&path, &tx);
        assert!(rx.try_recv().is_err());

        let _ = std::fs::remove_dir_all(dir);
    }
}
