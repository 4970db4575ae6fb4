use crate::conf::{ConfigError, load_config};
use std::path::PathBuf;

pub fn check(path: PathBuf) -> anyhow::Result<()> {
    match load_config(&path) {
        Ok(cfg) => {
            println!("✔ Config loaded successfully");
            println!("✔ listening on {}", cfg.server.listen);
            println!(
                "✔ public origin: {}",
                cfg.proxy
                    .public_origin
                    .as_deref()
                    .unwrap_or("derived from Host header")
            );
            println!(
                "✔ tls: {}",
                if cfg.server.tls.is_some() { "on" } else { "off" }
            );
            println!("✔ forward cookies: {}", cfg.proxy.forward_cookies);
            println!("✔ recovery cookie: {}", cfg.proxy.recovery_cookie);
            Ok(())
        }
        Err(err) => {
            print_config_error(&err);
            std::process::exit(1);
        }
    }
}

fn print_config_error(err: &ConfigError) {
    eprintln!("✘ {err}");
    if let Some(hint) = config_error_hint(err) {
        eprintln!();
        eprintln!("{hint}");
    }
}

pub fn config_error_hint(err: &ConfigError) -> Option<&'static str> {
    match err {
        ConfigError::InvalidListenAddr { .. } => Some(
            "The listen address must be a socket address.\n\
             \n\
             Example:\n\
             \n\
             server {\n\
             \x20 listen = \"0.0.0.0:8080\"\n\
             }",
        ),

        ConfigError::InvalidPublicOrigin { .. } => Some(
            "The public origin is the scheme and authority browsers use to reach the proxy.\n\
             \n\
             Example:\n\
             \n\
             proxy {\n\
             \x20 public_origin = \"https://proxy.example\"\n\
             }",
        ),

        ConfigError::MissingCertFile { .. } | ConfigError::MissingKeyFile { .. } => Some(
            "Listener TLS needs both a PEM certificate and a PEM private key on disk.\n\
             \n\
             Remove the `tls` block to serve plain HTTP.",
        ),

        _ => None,
    }
}
