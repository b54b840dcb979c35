//! Disk-cache scanning and hardware accelerator detection.
//!
//! Both surfaces are best-effort: a missing cache directory or an absent
//! GPU tool yields empty results, never an error.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tokio::process::Command;

/// Cache a model artifact was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiskSource {
    /// Ollama manifest store (`~/.ollama/models`).
    Ollama,
    /// Hugging Face hub cache (`~/.cache/huggingface/hub`).
    HuggingFace,
}

/// A model artifact present on disk, independent of any running server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiskModel {
    /// Model name in the cache's naming convention.
    pub name: String,
    /// Cache the artifact was found in.
    pub source: DiskSource,
}

/// Scans the conventional local caches for model artifacts.
///
/// Covers the Ollama manifest store and the Hugging Face hub cache under the
/// user's home directory. Unreadable or missing directories contribute
/// nothing.
#[must_use]
pub fn scan_model_caches() -> Vec<DiskModel> {
    let Some(home) = dirs::home_dir() else {
        return Vec::new();
    };

    let mut found = scan_ollama_manifests(
        &home.join(".ollama/models/manifests/registry.ollama.ai/library"),
    );
    found.extend(scan_huggingface_hub(&home.join(".cache/huggingface/hub")));
    found.sort_by(|left, right| left.name.cmp(&right.name));
    found
}

/// Scans an Ollama manifest library directory for installed model tags.
///
/// The store lays models out as `<library>/<model>/<tag>`, so each tag file
/// yields one `model:tag` name.
#[must_use]
pub fn scan_ollama_manifests(library_dir: &Path) -> Vec<DiskModel> {
    let Ok(entries) = fs::read_dir(library_dir) else {
        return Vec::new();
    };

    let mut found = Vec::new();
    for entry in entries.flatten() {
        let model_dir = entry.path();
        if !model_dir.is_dir() {
            continue;
        }

        let model_os_name = entry.file_name();
        let Some(model_name) = model_os_name.to_str() else {
            continue;
        };

        let Ok(tags) = fs::read_dir(&model_dir) else {
            continue;
        };
        for tag_entry in tags.flatten() {
            let tag_os_name = tag_entry.file_name();
            if let Some(tag) = tag_os_name.to_str() {
                found.push(DiskModel {
                    name: format!("{model_name}:{tag}"),
                    source: DiskSource::Ollama,
                });
            }
        }
    }
    found
}

/// Scans a Hugging Face hub cache directory for downloaded models.
///
/// Hub entries are directories named `models--<org>--<name>`.
#[must_use]
pub fn scan_huggingface_hub(hub_dir: &Path) -> Vec<DiskModel> {
    let Ok(entries) = fs::read_dir(hub_dir) else {
        return Vec::new();
    };

    let mut found = Vec::new();
    for entry in entries.flatten() {
        if !entry.path().is_dir() {
            continue;
        }

        let dir_os_name = entry.file_name();
        let Some(dir_name) = dir_os_name.to_str() else {
            continue;
        };

        if let Some(stripped) = dir_name.strip_prefix("models--") {
            found.push(DiskModel {
                name: stripped.replace("--", "/"),
                source: DiskSource::HuggingFace,
            });
        }
    }
    found
}

/// Detects a hardware accelerator usable for local inference.
///
/// Returns a short label (`"metal"`, `"cuda"`) or `None` when inference
/// will run on CPU.
pub async fn detect_accelerator() -> Option<String> {
    if cfg!(all(target_os = "macos", target_arch = "aarch64")) {
        return Some("metal".to_owned());
    }

    if nvidia_smi_reports_gpu().await || nvidia_device_present() {
        return Some("cuda".to_owned());
    }

    None
}

/// Asks `nvidia-smi` whether any GPU is visible.
async fn nvidia_smi_reports_gpu() -> bool {
    Command::new("nvidia-smi")
        .arg("--query-gpu=name")
        .arg("--format=csv,noheader")
        .output()
        .await
        .map(|output| output.status.success() && !output.stdout.is_empty())
        .unwrap_or(false)
}

/// Checks for NVIDIA driver artifacts without running any tool.
fn nvidia_device_present() -> bool {
    Path::new("/dev/nvidia0").exists() || Path::new("/proc/driver/nvidia").exists()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;

    #[test]
    fn ollama_scan_builds_model_tag_names() {
        let root = tempfile::tempdir().expect("tempdir");
        let model_dir = root.path().join("llama3.2");
        fs::create_dir_all(&model_dir).expect("create model dir");
        File::create(model_dir.join("3b")).expect("tag file");
        File::create(model_dir.join("latest")).expect("tag file");

        let mut found = scan_ollama_manifests(root.path());
        found.sort_by(|left, right| left.name.cmp(&right.name));

        assert_eq!(found.len(), 2);
        assert_eq!(found[0].name, "llama3.2:3b");
        assert_eq!(found[1].name, "llama3.2:latest");
        assert_eq!(found[0].source, DiskSource::Ollama);
    }

    #[test]
    fn huggingface_scan_restores_slashed_names() {
        let root = tempfile::tempdir().expect("tempdir");
        fs::create_dir_all(root.path().join("models--nomic-ai--nomic-embed-text-v1.5"))
            .expect("hub dir");
        fs::create_dir_all(root.path().join("datasets--something")).expect("other dir");

        let found = scan_huggingface_hub(root.path());
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "nomic-ai/nomic-embed-text-v1.5");
        assert_eq!(found[0].source, DiskSource::HuggingFace);
    }

    #[test]
    fn missing_directories_scan_empty() {
        let root = tempfile::tempdir().expect("tempdir");
        let missing = root.path().join("does-not-exist");
        assert!(scan_ollama_manifests(&missing).is_empty());
        assert!(scan_huggingface_hub(&missing).is_empty());
    }
}
