use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::api;
use crate::cli::{self, CheckArgs};
use crate::config;
use crate::controller::FormController;
use crate::data::{self, DuplicateService, ReportService};
use crate::logging;
use crate::ui;

#[derive(Debug, Clone, Default)]
pub struct Options {
    pub config_file: Option<PathBuf>,
    pub api_url: Option<String>,
    pub demo: bool,
    pub check: CheckArgs,
}

/// Returns false when a headless check was rejected or failed.
pub fn run(options: Options) -> Result<bool> {
    let mut cfg = config::load(config::LoadOptions {
        config_file: options.config_file.clone(),
        env_prefix: None,
    })
    .context("load config")?;
    if let Some(api_url) = options.api_url.as_ref() {
        cfg.api.base_url = api_url.clone();
    }

    if let Err(err) = logging::init(&cfg.logging) {
        eprintln!("warning: logging disabled: {err:#}");
    }
    tracing::info!(version = crate::VERSION, base_url = %cfg.api.base_url, demo = options.demo, "starting");

    let (duplicates, reports) = services(&cfg, options.demo)?;
    let mut controller = FormController::new(cfg.controller_settings(), duplicates, reports);

    if options.check.is_requested() {
        let pb = cli::spinner();
        let stdout = io::stdout();
        let mut out = stdout.lock();
        return cli::run_check(&mut controller, &options.check, &pb, &mut out);
    }

    let status = if options.demo {
        "Demo mode: results are canned, nothing is sent.".to_string()
    } else {
        format!("Checking against {}", cfg.api.base_url)
    };
    let mut model = ui::Model::new(ui::Options {
        controller,
        status_message: status,
        config_path: config_path_label(options.config_file.as_ref()),
    });
    model.run()?;
    Ok(true)
}

type Services = (Arc<dyn DuplicateService>, Arc<dyn ReportService>);

fn services(cfg: &config::Config, demo: bool) -> Result<Services> {
    if demo {
        return Ok((
            Arc::new(data::MockDuplicateService::with_results(
                data::sample_results(),
            )),
            Arc::new(data::MockReportService::default()),
        ));
    }

    let client = api::Client::new(api::ClientConfig {
        base_url: cfg.api.base_url.clone(),
        user_agent: cfg.api.user_agent.clone(),
        timeout: Some(cfg.api.timeout),
        http_client: None,
    })
    .context("build API client")?;
    let client = Arc::new(client);
    Ok((
        Arc::new(data::HttpDuplicateService::new(client.clone())),
        Arc::new(data::HttpReportService::new(client)),
    ))
}

fn config_path_label(explicit: Option<&PathBuf>) -> String {
    match explicit {
        Some(path) => friendly_path(Some(path)),
        None => friendly_path(config::default_path().as_ref()),
    }
}

fn friendly_path(path: Option<&PathBuf>) -> String {
    if let Some(path) = path {
        if let Some(home) = dirs::home_dir() {
            if let Ok(stripped) = path.strip_prefix(&home) {
                let mut display = String::from("~");
                if !stripped.as_os_str().is_empty() {
                    display.push_str(&format!("/{}", stripped.display()));
                }
                return display;
            }
        }
        path.display().to_string()
    } else {
        "~/.config/repost-check/config.yaml".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_config_path_is_shown() {
        let path = PathBuf::from("/srv/repost-check/custom.yaml");
        assert_eq!(
            config_path_label(Some(&path)),
            "/srv/repost-check/custom.yaml"
        );
    }

    #[test]
    fn paths_under_home_are_abbreviated() {
        let Some(home) = dirs::home_dir() else {
            return;
        };
        let path = home.join(".config").join("repost-check").join("config.yaml");
        assert_eq!(
            friendly_path(Some(&path)),
            "~/.config/repost-check/config.yaml"
        );
    }
}
