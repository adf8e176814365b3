use clap::Parser;

use crate::codec::DEFAULT_MAX_LINE_LENGTH;

pub const HOST: &str = "127.0.0.1";
pub const PORT: u16 = 6380;

/// Server settings, read from the command line with environment variable fallbacks.
#[derive(Parser, Clone, Debug, PartialEq)]
#[command(name = "listdis", version, about)]
pub struct Config {
    /// The address to listen on
    #[arg(long, env = "LISTDIS_HOST", default_value = HOST)]
    pub host: String,

    /// The port to listen on
    #[arg(short, long, env = "LISTDIS_PORT", default_value_t = PORT)]
    pub port: u16,

    /// Largest request, in bytes, accepted before the connection is dropped
    #[arg(long, env = "LISTDIS_MAX_LINE_LENGTH", default_value_t = DEFAULT_MAX_LINE_LENGTH)]
    pub max_line_length: usize,

    /// Log filter, e.g. `info` or `listdis=debug`
    #[arg(long, env = "LISTDIS_LOG", default_value = "info")]
    pub log_level: String,
}

impl Config {
    pub fn address(&self) -> (&str, u16) {
        (self.host.as_str(), self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            host: HOST.to_string(),
            port: PORT,
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
            log_level: "info".to_string(),
        }
    }
}
