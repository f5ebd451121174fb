#![cfg(not(tarpaulin_include))]

use crate::login::SimulatedRemote;
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Server settings, from the command line or `LEARNHUB_*` variables
#[derive(Debug, Clone, Parser)]
#[command(name = "website")]
#[command(about = "Serve the LearnHub academy site")]
pub struct ServerConfig {
    /// Address to listen on
    #[arg(long, env = "LEARNHUB_BIND", default_value = "127.0.0.1:3000")]
    pub bind: SocketAddr,

    /// Directory served under /static (charting and animation libraries, styles)
    #[arg(long, env = "LEARNHUB_ASSETS", default_value = "static")]
    pub assets: PathBuf,

    /// Keep server-side storage in this JSON file instead of the visitor's cookies
    #[arg(long, env = "LEARNHUB_STORE")]
    pub store: Option<PathBuf>,

    /// Probability that a simulated sign-in or registration fails
    #[arg(
        long,
        env = "LEARNHUB_FAILURE_RATE",
        default_value_t = 0.1,
        value_parser = parse_probability
    )]
    pub failure_rate: f64,

    /// Override both simulated auth delays, in milliseconds
    #[arg(long, env = "LEARNHUB_AUTH_DELAY_MS")]
    pub auth_delay_ms: Option<u64>,

    /// Do not serve the charting library; chart slots show a fallback
    #[arg(long, env = "LEARNHUB_NO_CHARTS")]
    pub no_charts: bool,

    /// Do not initialise scroll animations
    #[arg(long, env = "LEARNHUB_NO_ANIMATIONS")]
    pub no_animations: bool,
}

/// Accept a number between 0 and 1
fn parse_probability(raw: &str) -> Result<f64, String> {
    let value: f64 = raw
        .trim()
        .parse()
        .map_err(|e| format!("`{}` is not a number: {}", raw, e))?;
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(format!("`{}` is not between 0 and 1", raw))
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 3000)),
            assets: PathBuf::from("static"),
            store: None,
            failure_rate: 0.1,
            auth_delay_ms: None,
            no_charts: false,
            no_animations: false,
        }
    }
}

impl ServerConfig {
    pub fn charts_available(&self) -> bool {
        !self.no_charts
    }

    pub fn animations_enabled(&self) -> bool {
        !self.no_animations
    }

    /// The simulated account backend these settings describe
    pub fn remote(&self) -> SimulatedRemote {
        let defaults = SimulatedRemote::default();
        let (login_delay, register_delay) = match self.auth_delay_ms {
            Some(ms) => (Duration::from_millis(ms), Duration::from_millis(ms)),
            None => (defaults.login_delay, defaults.register_delay),
        };
        SimulatedRemote::new(self.failure_rate, login_delay, register_delay)
    }
}
