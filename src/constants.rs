//! # Nowcast Constants
//!
//! Names and tokens shared by the manager, the next-step table and worker
//! clients. Message-type tokens are matched literally on the wire, so they
//! keep their historical spelling (spaces included).

/// Source identifier the manager stamps on every reply
pub const MANAGER_NAME: &str = "nowcast_mgr";

/// Reply message types sent by the manager
pub mod reply {
    pub const ACK: &str = "ack";
    pub const UNDEFINED_MSG: &str = "undefined msg";
}

/// Message-type families understood by the dispatcher
pub mod msg_types {
    /// Checklist query; payload is the stage name
    pub const NEED: &str = "need";
    /// Prefix of remote log forwarding types (`log.info`, `log.error`, ...)
    pub const LOG_PREFIX: &str = "log";
    /// Terminal synchronisation token; acknowledged with no follow-up
    pub const THE_END: &str = "the end";
    pub const CRASH: &str = "crash";
    pub const SUCCESS: &str = "success";
    pub const FAILURE: &str = "failure";
}

/// Pipeline branches that may be enabled through `run_types`
pub mod run_types {
    pub const NOWCAST: &str = "nowcast";
    pub const FORECAST: &str = "forecast";
    pub const FORECAST2: &str = "forecast2";
}

/// Worker names known to the standard pipeline
pub mod workers {
    pub const DOWNLOAD_WEATHER: &str = "download_weather";
    pub const MAKE_RUNOFF_FILE: &str = "make_runoff_file";
    pub const GET_NEAH_BAY_SSH: &str = "get_NeahBay_ssh";
    pub const GRIB_TO_NETCDF: &str = "grib_to_netcdf";
    pub const UPLOAD_FORCING: &str = "upload_forcing";
    pub const MAKE_FORCING_LINKS: &str = "make_forcing_links";
    pub const RUN_NEMO: &str = "run_NEMO";
    pub const WATCH_NEMO: &str = "watch_NEMO";
    pub const DOWNLOAD_RESULTS: &str = "download_results";
    pub const MAKE_PLOTS: &str = "make_plots";
    pub const MAKE_SITE_PAGE: &str = "make_site_page";
    pub const PUSH_TO_WEB: &str = "push_to_web";
    pub const ROTATE_LOGS: &str = "rotate_logs";
    pub const CLEAR_CHECKLIST: &str = "clear_checklist";
}

/// Checklist stage names written by the standard pipeline
pub mod stages {
    pub const WEATHER: &str = "weather";
    pub const RIVERS: &str = "rivers";
    pub const NEAH_BAY_SSH: &str = "Neah Bay ssh";
    pub const WEATHER_FORCING: &str = "weather forcing";
    pub const FORCING_UPLOAD: &str = "forcing upload";
    pub const FORCING_LINKS: &str = "forcing links";
    pub const NEMO_RUN: &str = "NEMO run";
    pub const RESULTS_FILES: &str = "results files";
    pub const PLOTS: &str = "plots";
    pub const SITE_PAGES: &str = "salishsea site pages";
    pub const PUSH_TO_WEB: &str = "push to salishsea site";
}

/// Variant tokens that are not run types
pub mod variants {
    /// grib_to_netcdf / upload_forcing nowcast forcing set (nowcast + 1st forecast day)
    pub const NOWCAST_PLUS: &str = "nowcast+";
    /// upload_forcing of refreshed Neah Bay sea surface height only
    pub const SSH: &str = "ssh";
}
