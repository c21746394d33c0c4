//! # Next-Step Table
//!
//! The daily pipeline graph. Each worker has an `after_<worker>` function
//! mapping one of its action messages to the follow-up actions the manager
//! must apply. These functions read only the message type, the payload and
//! the configuration; they never touch the checklist, so the pipeline shape
//! can be inspected and tested without running anything.
//!
//! Conventions shared by every entry:
//!
//! - `success <variant>` first records the worker's stage, then launches
//!   the downstream workers selected by the variant and the enabled
//!   `run_types`.
//! - `failure <variant>` and `crash` produce no actions; the failure has
//!   already been logged and an operator takes over.
//! - Workers that act on a model-run host report a payload keyed by host
//!   name. Fan-out follows the hosts in the payload that are configured
//!   under `run`.

use serde_json::Value;
use std::collections::HashMap;

use super::actions::Action;
use crate::config::NowcastConfig;
use crate::constants::{msg_types, run_types, stages, variants, workers};

/// Decision function for one worker
pub type NextStepFn = fn(&str, &Value, &NowcastConfig) -> Vec<Action>;

/// Per-worker decision functions, indexed by message source
#[derive(Clone)]
pub struct NextStepTable {
    entries: HashMap<String, NextStepFn>,
}

impl NextStepTable {
    /// Table with no entries
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Table for the standard daily nowcast pipeline
    pub fn standard() -> Self {
        let mut table = Self::empty();
        table.register(workers::DOWNLOAD_WEATHER, after_download_weather);
        table.register(workers::MAKE_RUNOFF_FILE, after_make_runoff_file);
        table.register(workers::GET_NEAH_BAY_SSH, after_get_neah_bay_ssh);
        table.register(workers::GRIB_TO_NETCDF, after_grib_to_netcdf);
        table.register(workers::UPLOAD_FORCING, after_upload_forcing);
        table.register(workers::MAKE_FORCING_LINKS, after_make_forcing_links);
        table.register(workers::RUN_NEMO, after_run_nemo);
        table.register(workers::WATCH_NEMO, after_watch_nemo);
        table.register(workers::DOWNLOAD_RESULTS, after_download_results);
        table.register(workers::MAKE_PLOTS, after_make_plots);
        table.register(workers::MAKE_SITE_PAGE, after_make_site_page);
        table.register(workers::PUSH_TO_WEB, after_push_to_web);
        table.register(workers::ROTATE_LOGS, after_rotate_logs);
        table.register(workers::CLEAR_CHECKLIST, after_clear_checklist);
        table
    }

    /// Register (or replace) the decision function for `worker`
    pub fn register<W: Into<String>>(&mut self, worker: W, next_step: NextStepFn) {
        self.entries.insert(worker.into(), next_step);
    }

    pub fn has_entry(&self, worker: &str) -> bool {
        self.entries.contains_key(worker)
    }

    /// Workers with an entry, sorted by name
    pub fn workers(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Follow-up actions for `(source, msg_type, payload)`
    ///
    /// `None` means the table has no entry for `source`.
    pub fn next_steps(
        &self,
        source: &str,
        msg_type: &str,
        payload: &Value,
        config: &NowcastConfig,
    ) -> Option<Vec<Action>> {
        self.entries
            .get(source)
            .map(|next_step| next_step(msg_type, payload, config))
    }
}

impl Default for NextStepTable {
    fn default() -> Self {
        Self::standard()
    }
}

/// Variant token of a `success <variant>` message type
fn success_variant(msg_type: &str) -> Option<&str> {
    msg_type
        .strip_prefix(msg_types::SUCCESS)
        .map(str::trim_start)
}

/// Configured hosts named as keys of a host-keyed payload, in key order
fn payload_hosts<'a>(payload: &'a Value, config: &NowcastConfig) -> Vec<&'a str> {
    match payload {
        Value::Object(map) => map
            .keys()
            .map(String::as_str)
            .filter(|host| config.host(host).is_some())
            .collect(),
        _ => Vec::new(),
    }
}

/// One launch of `worker` per host, with `host` prepended to `args`
fn launch_per_host<'a, I>(worker: &str, hosts: I, args: &[&str]) -> Vec<Action>
where
    I: IntoIterator<Item = &'a str>,
{
    hosts
        .into_iter()
        .map(|host| {
            let mut host_args = vec![host];
            host_args.extend_from_slice(args);
            Action::launch(worker, &host_args)
        })
        .collect()
}

pub fn after_download_weather(
    msg_type: &str,
    payload: &Value,
    config: &NowcastConfig,
) -> Vec<Action> {
    let Some(variant) = success_variant(msg_type) else {
        return Vec::new();
    };
    let mut actions = vec![Action::update_checklist(stages::WEATHER, payload.clone())];

    match variant {
        "06" => {
            actions.push(Action::launch(workers::MAKE_RUNOFF_FILE, &[]));
            if config.run_type_enabled(run_types::FORECAST2) {
                actions.push(Action::launch(workers::GET_NEAH_BAY_SSH, &[run_types::FORECAST2]));
            }
        }
        "12" => {
            if config.run_type_enabled(run_types::NOWCAST) {
                actions.push(Action::launch(workers::GET_NEAH_BAY_SSH, &[run_types::NOWCAST]));
                actions.push(Action::launch(workers::GRIB_TO_NETCDF, &[variants::NOWCAST_PLUS]));
            }
        }
        _ => {}
    }
    actions
}

pub fn after_make_runoff_file(
    msg_type: &str,
    payload: &Value,
    _config: &NowcastConfig,
) -> Vec<Action> {
    match success_variant(msg_type) {
        Some(_) => vec![Action::update_checklist(stages::RIVERS, payload.clone())],
        None => Vec::new(),
    }
}

pub fn after_get_neah_bay_ssh(
    msg_type: &str,
    payload: &Value,
    config: &NowcastConfig,
) -> Vec<Action> {
    let Some(variant) = success_variant(msg_type) else {
        return Vec::new();
    };
    let mut actions = vec![Action::update_checklist(stages::NEAH_BAY_SSH, payload.clone())];

    match variant {
        run_types::FORECAST => {
            actions.extend(launch_per_host(
                workers::UPLOAD_FORCING,
                config.run_hosts(),
                &[variants::SSH],
            ));
        }
        run_types::FORECAST2 => {
            actions.push(Action::launch(workers::GRIB_TO_NETCDF, &[run_types::FORECAST2]));
        }
        _ => {}
    }
    actions
}

pub fn after_grib_to_netcdf(
    msg_type: &str,
    payload: &Value,
    config: &NowcastConfig,
) -> Vec<Action> {
    let Some(variant) = success_variant(msg_type) else {
        return Vec::new();
    };
    let mut actions = vec![Action::update_checklist(stages::WEATHER_FORCING, payload.clone())];

    if matches!(variant, variants::NOWCAST_PLUS | run_types::FORECAST2) {
        actions.extend(launch_per_host(
            workers::UPLOAD_FORCING,
            config.run_hosts(),
            &[variant],
        ));
    }
    actions
}

pub fn after_upload_forcing(
    msg_type: &str,
    payload: &Value,
    config: &NowcastConfig,
) -> Vec<Action> {
    let Some(variant) = success_variant(msg_type) else {
        return Vec::new();
    };
    let mut actions = vec![Action::update_checklist(stages::FORCING_UPLOAD, payload.clone())];

    if matches!(variant, variants::NOWCAST_PLUS | run_types::FORECAST2 | variants::SSH) {
        actions.extend(launch_per_host(
            workers::MAKE_FORCING_LINKS,
            payload_hosts(payload, config),
            &[variant],
        ));
    }
    actions
}

pub fn after_make_forcing_links(
    msg_type: &str,
    payload: &Value,
    config: &NowcastConfig,
) -> Vec<Action> {
    let Some(variant) = success_variant(msg_type) else {
        return Vec::new();
    };
    let mut actions = vec![Action::update_checklist(stages::FORCING_LINKS, payload.clone())];

    let run_type = match variant {
        variants::NOWCAST_PLUS => Some(run_types::NOWCAST),
        run_types::FORECAST2 => Some(run_types::FORECAST2),
        variants::SSH => Some(run_types::FORECAST),
        _ => None,
    };
    if let Some(run_type) = run_type.filter(|run_type| config.run_type_enabled(run_type)) {
        actions.extend(launch_per_host(
            workers::RUN_NEMO,
            payload_hosts(payload, config),
            &[run_type],
        ));
    }
    actions
}

pub fn after_run_nemo(msg_type: &str, payload: &Value, config: &NowcastConfig) -> Vec<Action> {
    let Some(run_type) = success_variant(msg_type) else {
        return Vec::new();
    };
    let mut actions = vec![Action::update_checklist(stages::NEMO_RUN, payload.clone())];

    if is_run_type(run_type) {
        actions.extend(launch_per_host(
            workers::WATCH_NEMO,
            payload_hosts(payload, config),
            &[run_type],
        ));
    }
    actions
}

pub fn after_watch_nemo(msg_type: &str, payload: &Value, config: &NowcastConfig) -> Vec<Action> {
    let Some(run_type) = success_variant(msg_type) else {
        return Vec::new();
    };
    let mut actions = vec![Action::update_checklist(stages::NEMO_RUN, payload.clone())];

    if !is_run_type(run_type) {
        return actions;
    }
    actions.extend(launch_per_host(
        workers::DOWNLOAD_RESULTS,
        payload_hosts(payload, config),
        &[run_type],
    ));
    if run_type == run_types::NOWCAST && config.run_type_enabled(run_types::FORECAST) {
        actions.push(Action::launch(workers::GET_NEAH_BAY_SSH, &[run_types::FORECAST]));
    }
    actions
}

pub fn after_download_results(
    msg_type: &str,
    payload: &Value,
    _config: &NowcastConfig,
) -> Vec<Action> {
    let Some(run_type) = success_variant(msg_type) else {
        return Vec::new();
    };
    let mut actions = vec![Action::update_checklist(stages::RESULTS_FILES, payload.clone())];

    match run_type {
        run_types::NOWCAST => {
            actions.push(Action::launch(workers::MAKE_PLOTS, &[run_types::NOWCAST, "research"]));
            actions.push(Action::launch(workers::MAKE_PLOTS, &[run_types::NOWCAST, "publish"]));
        }
        run_types::FORECAST | run_types::FORECAST2 => {
            actions.push(Action::launch(workers::MAKE_PLOTS, &[run_type, "publish"]));
        }
        _ => {}
    }
    actions
}

pub fn after_make_plots(msg_type: &str, payload: &Value, _config: &NowcastConfig) -> Vec<Action> {
    let Some(variant) = success_variant(msg_type) else {
        return Vec::new();
    };
    let mut actions = vec![Action::update_checklist(stages::PLOTS, payload.clone())];

    // variant is "<run type> <plot type>", e.g. "nowcast research"
    if let Some((run_type, plot_type)) = variant.split_once(' ') {
        if is_run_type(run_type) {
            actions.push(Action::launch(workers::MAKE_SITE_PAGE, &[run_type, plot_type]));
        }
    }
    actions
}

pub fn after_make_site_page(
    msg_type: &str,
    payload: &Value,
    _config: &NowcastConfig,
) -> Vec<Action> {
    match success_variant(msg_type) {
        Some(_) => vec![
            Action::update_checklist(stages::SITE_PAGES, payload.clone()),
            Action::launch(workers::PUSH_TO_WEB, &[]),
        ],
        None => Vec::new(),
    }
}

pub fn after_push_to_web(msg_type: &str, payload: &Value, _config: &NowcastConfig) -> Vec<Action> {
    match success_variant(msg_type) {
        Some(_) => vec![
            Action::update_checklist(stages::PUSH_TO_WEB, payload.clone()),
            Action::RenderStatusPage,
        ],
        None => Vec::new(),
    }
}

pub fn after_rotate_logs(msg_type: &str, _payload: &Value, _config: &NowcastConfig) -> Vec<Action> {
    match success_variant(msg_type) {
        Some(_) => vec![Action::RotateLogs],
        None => Vec::new(),
    }
}

pub fn after_clear_checklist(
    msg_type: &str,
    _payload: &Value,
    _config: &NowcastConfig,
) -> Vec<Action> {
    match success_variant(msg_type) {
        Some(_) => vec![Action::ClearChecklist],
        None => Vec::new(),
    }
}

fn is_run_type(token: &str) -> bool {
    matches!(
        token,
        run_types::NOWCAST | run_types::FORECAST | run_types::FORECAST2
    )
}
