//! Configuración de ejecución: directorios de trabajo, hilos y nivel de log.

use anyhow::{Context, Result};
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const MIME_ENVELOPE_NAME: &str = "mime.json";

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct Config {
    /// Directorio con los archivos a analizar.
    pub input_dir: PathBuf,
    /// Directorio del sobre intermedio de tipos MIME.
    pub temp_dir: PathBuf,
    pub results_dir: PathBuf,
    /// `0` usa un hilo por CPU.
    pub workers: usize,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("files"),
            temp_dir: PathBuf::from("temp"),
            results_dir: PathBuf::from("results"),
            workers: 1,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Lee la configuración JSON indicada; sin ruta se usan los valores por defecto.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let contents = fs::read_to_string(path)
            .with_context(|| format!("no se pudo leer la configuración `{}`", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("configuración inválida en `{}`", path.display()))
    }

    pub fn mime_envelope_path(&self) -> PathBuf {
        self.temp_dir.join(MIME_ENVELOPE_NAME)
    }

    /// `results/result_<YYYYmmdd_HHMMSS>.json` con la hora local actual.
    pub fn timestamped_result_path(&self) -> PathBuf {
        let stamp = Local::now().format("%Y%m%d_%H%M%S");
        self.results_dir.join(format!("result_{stamp}.json"))
    }
}
