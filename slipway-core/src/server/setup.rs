use crate::conf::types::RuntimeConfig;
use crate::proxy::SlipwayGateway;
use crate::server::pid;
use crate::server::runtime::ProxyRuntime;
use anyhow::{Error, Result, anyhow};
use pingora::prelude::*;
use pingora::server::Server;
use pingora::server::configuration::ServerConf;
use std::sync::Arc;

/// Run the Pingora server with the given configuration. Never returns on success.
pub fn run(config: RuntimeConfig) -> Result<()> {
    // Attempt to write pid file (best-effort)
    if let Some(pid_file) = &config.server.pid_file {
        if let Err(e) = pid::write_pid(pid_file) {
            tracing::warn!(error = %e, pid_file = %pid_file.display(), "failed to write pid file; continuing");
        } else {
            tracing::info!(pid_file = %pid_file.display(), "pid file written");
        }
    }

    let server = build_pingora_server(&config)?;

    // Ensure pid file cleanup on shutdown
    if let Some(pid_file) = config.server.pid_file.clone() {
        ctrlc::set_handler(move || {
            tracing::info!("shutdown requested, removing pid file");
            pid::remove_pid(&pid_file);
            std::process::exit(0);
        })?;
    }

    tracing::info!(
        listen = %config.server.listen,
        tls = config.server.tls.is_some(),
        public_origin = config.proxy.public_origin.as_deref().unwrap_or("<from Host header>"),
        "slipway listening"
    );

    server.run_forever();
}

/// Build the Pingora server.
pub fn build_pingora_server(config: &RuntimeConfig) -> Result<Server, Error> {
    let mut server = if config.server.threads.is_some() || config.server.ca_file.is_some() {
        let mut conf =
            ServerConf::new().ok_or_else(|| anyhow!("could not construct pingora server configuration"))?;
        if let Some(threads) = config.server.threads {
            tracing::debug!(threads, "overriding worker threads");
            conf.threads = threads;
        }
        if let Some(ca_file) = &config.server.ca_file {
            conf.ca_file = Some(ca_file.to_string_lossy().into_owned());
        }
        Server::new_with_opt_and_conf(None, conf)
    } else {
        // "None" is required here to truly tell Pingora to use its default settings.
        Server::new(None)?
    };

    server.bootstrap();

    let runtime = ProxyRuntime::from_config(config)?;
    let gateway = SlipwayGateway::new(Arc::new(runtime));

    let mut svc = http_proxy_service(&server.configuration, gateway);
    if let Some(tls) = &config.server.tls {
        svc.add_tls(
            &config.server.listen,
            &tls.cert.to_string_lossy(),
            &tls.key.to_string_lossy(),
        )?;
    } else {
        svc.add_tcp(&config.server.listen);
    }

    server.add_service(svc);

    Ok(server)
}
