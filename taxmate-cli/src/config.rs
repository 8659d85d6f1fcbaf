use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use taxmate_ingest::PdfLayout;

use crate::state::ensure_taxmate_home;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiSection,
    /// Column layout of the supported tabular PDF statement
    pub pdf: PdfLayout,
    pub log: LogSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSection {
    pub base_url: String,
    pub timeout_secs: u64,
    /// Import, confirm and row listing can be slow on large statements
    pub statement_timeout_secs: u64,
    pub access_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSection {
    pub filter: String,
}

impl Default for ApiSection {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:4000/api".to_string(),
            timeout_secs: 10,
            statement_timeout_secs: 30,
            access_token: None,
        }
    }
}

impl Default for LogSection {
    fn default() -> Self {
        Self {
            filter: "taxmate=info".to_string(),
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    Ok(ensure_taxmate_home()?.join("config.toml"))
}

/// Config file (or defaults) with environment overrides applied.
pub fn load_config() -> Result<Config> {
    let p = config_path()?;
    let mut cfg = if p.exists() {
        let s = fs::read_to_string(&p).with_context(|| format!("read {}", p.display()))?;
        toml::from_str(&s).context("parse config.toml")?
    } else {
        Config::default()
    };
    apply_overrides(&mut cfg, |k| std::env::var(k).ok());
    Ok(cfg)
}

/// `TAXMATE_API_BASE_URL` and `TAXMATE_ACCESS_TOKEN` win over the file.
pub fn apply_overrides(cfg: &mut Config, var: impl Fn(&str) -> Option<String>) {
    if let Some(url) = var("TAXMATE_API_BASE_URL").filter(|v| !v.trim().is_empty()) {
        cfg.api.base_url = url;
    }
    if let Some(token) = var("TAXMATE_ACCESS_TOKEN").filter(|v| !v.trim().is_empty()) {
        cfg.api.access_token = Some(token);
    }
    cfg.api.base_url = cfg.api.base_url.trim().trim_end_matches('/').to_string();
}

pub fn save_config(cfg: &Config) -> Result<()> {
    let p = config_path()?;
    let s = toml::to_string_pretty(cfg).context("serialize config")?;
    fs::write(&p, s).with_context(|| format!("write {}", p.display()))?;
    Ok(())
}

pub fn init_config() -> Result<()> {
    let p = config_path()?;
    if p.exists() {
        println!("Config already exists: {}", p.display());
        return Ok(());
    }
    save_config(&Config::default())?;
    println!("Wrote {}", p.display());
    Ok(())
}

pub fn show_config(cfg: &Config) -> Result<()> {
    let mut shown = cfg.clone();
    if shown.api.access_token.is_some() {
        shown.api.access_token = Some("********".to_string());
    }
    print!("{}", toml::to_string_pretty(&shown).context("serialize config")?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let cfg: Config = toml::from_str(
            r#"
[api]
base_url = "https://taxmate.example/api/"

[pdf]
header_markers = ["Date", "Withdrawal"]

[pdf.columns]
remarks = 1
"#,
        )
        .unwrap();
        assert_eq!(cfg.api.timeout_secs, 10);
        assert_eq!(cfg.api.statement_timeout_secs, 30);
        assert_eq!(cfg.pdf.header_markers, vec!["Date", "Withdrawal"]);
        assert_eq!(cfg.pdf.min_cells, 5);
        assert_eq!(cfg.pdf.columns.remarks, 1);
        assert_eq!(cfg.pdf.columns.credit, 4);
        assert_eq!(cfg.log.filter, "taxmate=info");
    }

    #[test]
    fn test_default_config_round_trips() {
        let s = toml::to_string_pretty(&Config::default()).unwrap();
        let back: Config = toml::from_str(&s).unwrap();
        assert_eq!(back.api.base_url, "http://localhost:4000/api");
        assert_eq!(back.pdf, PdfLayout::default());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("TAXMATE_API_BASE_URL", "https://api.taxmate.ng/api/"),
            ("TAXMATE_ACCESS_TOKEN", "tok-123"),
        ]);
        let mut cfg = Config::default();
        apply_overrides(&mut cfg, |k| env.get(k).map(|v| v.to_string()));
        assert_eq!(cfg.api.base_url, "https://api.taxmate.ng/api");
        assert_eq!(cfg.api.access_token.as_deref(), Some("tok-123"));
    }

    #[test]
    fn test_blank_env_is_ignored() {
        let mut cfg = Config::default();
        cfg.api.access_token = Some("from-file".into());
        apply_overrides(&mut cfg, |_| Some("  ".to_string()));
        assert_eq!(cfg.api.base_url, "http://localhost:4000/api");
        assert_eq!(cfg.api.access_token.as_deref(), Some("from-file"));
    }
}
