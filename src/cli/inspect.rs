//! `pipelines` and `check` commands.

use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use serde::Serialize;

use super::Runtime;
use crate::log;

/// One registered pipeline.
#[derive(Debug, Serialize)]
pub struct PipelineInfo {
    pub container: String,
    pub flow: String,
    pub fingerprint: String,
    pub rewriters: Vec<String>,
}

pub fn pipeline_infos(runtime: &Runtime) -> Vec<PipelineInfo> {
    runtime
        .registry
        .entries()
        .into_iter()
        .map(|(container, flow, pipeline)| PipelineInfo {
            container,
            flow: flow.to_string(),
            fingerprint: pipeline.fingerprint().to_owned(),
            rewriters: pipeline.rewriter_ids(),
        })
        .collect()
}

/// Print registered pipelines.
pub fn list_pipelines(runtime: &Runtime, json: bool) -> Result<()> {
    let infos = pipeline_infos(runtime);
    if json {
        println!("{}", serde_json::to_string_pretty(&infos)?);
        return Ok(());
    }
    for info in &infos {
        println!(
            "{}/{}  {}",
            info.container.cyan(),
            info.flow.bold(),
            info.rewriters.join(" → ").dimmed()
        );
    }
    Ok(())
}

/// Print the effective configuration as TOML.
pub fn check_config(runtime: &Runtime) -> Result<()> {
    let config = &runtime.config;
    if config.config_path.as_os_str().is_empty() {
        log!("check"; "no config file, using defaults");
    } else {
        log!("check"; "{} is valid", config.config_path.display());
    }
    let effective = toml::to_string_pretty(config).context("failed to render config")?;
    print!("{effective}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RewriterConfig;

    #[test]
    fn test_pipeline_infos() {
        let runtime = Runtime::new(RewriterConfig::default()).unwrap();
        let infos = pipeline_infos(&runtime);
        let css = infos.iter().find(|i| i.flow == "css").unwrap();
        assert_eq!(css.container, "default");
        assert_eq!(css.rewriters, ["css-response"]);

        let json = serde_json::to_value(&infos).unwrap();
        assert_eq!(json.as_array().unwrap().len(), infos.len());
    }

    #[test]
    fn test_effective_config_round_trips() {
        let config = RewriterConfig::default();
        let rendered = toml::to_string_pretty(&config).unwrap();
        let parsed = RewriterConfig::from_str(&rendered).unwrap();
        assert_eq!(parsed.fetch.workers, config.fetch.workers);
        assert_eq!(parsed.rewrite.expires, config.rewrite.expires);
    }
}
