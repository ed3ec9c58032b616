//! Check-config command - validates configuration without serving.

use anyhow::Result;
use clap::Args;
use tokveil_config::LoadedConfig;

use super::{ConfigArgs, Context};

/// Arguments for the check-config command.
#[derive(Args, Debug)]
pub struct CheckConfigArgs {
    #[command(flatten)]
    pub config: ConfigArgs,
}

/// Run the check-config command.
pub fn run(args: CheckConfigArgs, ctx: &Context) -> Result<()> {
    let loaded = args.config.load()?;
    print!("{}", render(&loaded, ctx.verbose));
    Ok(())
}

/// Effective settings as printed to the user.
fn render(loaded: &LoadedConfig, verbose: bool) -> String {
    let config = &loaded.config;
    let mut out = String::new();

    if verbose {
        for source in &loaded.sources {
            let state = if source.loaded { "loaded" } else { "not found" };
            out.push_str(&format!("config:        {} ({})\n", source.path.display(), state));
        }
    }

    let filter = match config.allow_list() {
        Some(ips) => format!("enabled ({})", ips.join(", ")),
        None => "disabled".to_string(),
    };

    out.push_str(&format!("upstream:      {}\n", config.server.upstream));
    out.push_str(&format!("listen:        {}\n", config.server.listen));
    out.push_str(&format!("ip filter:     {}\n", filter));
    out.push_str(&format!("print level:   {}\n", config.logging.print_level));
    out.push_str(&format!("token ttl:     {}s\n", config.cache.ttl_secs));
    out.push_str(&format!("sweep every:   {}s\n", config.cache.sweep_interval_secs));
    out.push_str(&format!("handle length: {}\n", config.cache.handle_length));
    out.push_str("Configuration OK\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokveil_config::{ConfigSource, TokveilConfig};

    fn loaded(config: TokveilConfig) -> LoadedConfig {
        LoadedConfig {
            config,
            sources: vec![ConfigSource {
                path: "tokveil.toml".into(),
                loaded: false,
            }],
        }
    }

    #[test]
    fn test_render_defaults() {
        let out = render(&loaded(TokveilConfig::default()), false);
        assert!(out.contains("upstream:      http://keycloak:8080"));
        assert!(out.contains("ip filter:     disabled"));
        assert!(out.ends_with("Configuration OK\n"));
        assert!(!out.contains("tokveil.toml"));
    }

    #[test]
    fn test_render_allow_list_and_sources() {
        let mut config = TokveilConfig::default();
        config.filter.enabled = true;
        config.filter.allowed_ips = vec!["10.0.0.1".to_string(), "10.0.0.2".to_string()];

        let out = render(&loaded(config), true);
        assert!(out.contains("ip filter:     enabled (10.0.0.1, 10.0.0.2)"));
        assert!(out.contains("tokveil.toml (not found)"));
    }
}
