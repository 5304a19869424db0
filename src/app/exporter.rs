use std::{
    ffi::OsStr,
    path::{Path, PathBuf},
    sync::{
        mpsc::{self, Receiver, Sender},
        Arc,
    },
    thread,
    time::Duration,
};

use anyhow::{anyhow, Context, Result};

use crate::fs_utils::{prepare_dir, unique_destination};

pub struct ExportItem {
    pub file_name: String,
    pub bytes: Arc<[u8]>,
}

/// Files written one after another with `delay` between them.
pub struct ExportRequest {
    pub dir: PathBuf,
    pub items: Vec<ExportItem>,
    pub delay: Duration,
}

pub struct ExportStatus {
    pub file_name: String,
    pub result: Result<PathBuf>,
}

pub struct Exporter {
    export_tx: Sender<ExportRequest>,
    status_rx: Receiver<ExportStatus>,
    pub pending_exports: Vec<String>,
}

impl Exporter {
    pub fn new() -> Self {
        let (export_tx, export_rx) = mpsc::channel();
        let (status_tx, status_rx) = mpsc::channel();
        Self::spawn_export_thread(export_rx, status_tx);
        Self {
            export_tx,
            status_rx,
            pending_exports: Vec::new(),
        }
    }

    fn spawn_export_thread(rx: Receiver<ExportRequest>, tx: Sender<ExportStatus>) {
        thread::spawn(move || {
            while let Ok(request) = rx.recv() {
                let count = request.items.len();
                for (index, item) in request.items.into_iter().enumerate() {
                    if index > 0 && !request.delay.is_zero() {
                        thread::sleep(request.delay);
                    }
                    let result = write_export(&request.dir, &item.file_name, &item.bytes);
                    match &result {
                        Ok(path) => log::info!(
                            "exported {} ({}/{count})",
                            path.display(),
                            index + 1
                        ),
                        Err(err) => log::error!("export of {} failed: {err:#}", item.file_name),
                    }
                    if tx
                        .send(ExportStatus {
                            file_name: item.file_name,
                            result,
                        })
                        .is_err()
                    {
                        return;
                    }
                }
            }
        });
    }

    pub fn queue_export(&mut self, request: ExportRequest) -> Result<()> {
        let names: Vec<String> = request.items.iter().map(|i| i.file_name.clone()).collect();
        self.export_tx
            .send(request)
            .map_err(|e| anyhow!("Failed to send export request: {}", e))?;
        self.pending_exports.extend(names);
        Ok(())
    }

    pub fn check_completions(&mut self) -> Vec<ExportStatus> {
        let mut completed = Vec::new();
        while let Ok(status) = self.status_rx.try_recv() {
            if let Some(idx) = self
                .pending_exports
                .iter()
                .position(|name| *name == status.file_name)
            {
                self.pending_exports.remove(idx);
            }
            completed.push(status);
        }
        completed
    }
}

impl Default for Exporter {
    fn default() -> Self {
        Self::new()
    }
}

/// Writes through a temporary file so a half-written export never carries the final name.
pub fn write_export(dir: &Path, file_name: &str, bytes: &[u8]) -> Result<PathBuf> {
    let dir = prepare_dir(dir)?;
    let destination = unique_destination(&dir, OsStr::new(file_name));
    let temp_path = dir.join(format!(".{file_name}.part"));
    std::fs::write(&temp_path, bytes)
        .with_context(|| format!("Unable to write {}", temp_path.display()))?;
    std::fs::rename(&temp_path, &destination).with_context(|| {
        format!(
            "Unable to move {} to {}",
            temp_path.display(),
            destination.display()
        )
    })?;
    Ok(destination)
}
