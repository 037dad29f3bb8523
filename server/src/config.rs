use std::net::IpAddr;
use std::path::{Path, PathBuf};

use clap::Parser;
use live_gallery::upload::DEFAULT_MAX_FILE_SIZE;
use rocket::data::{Limits, ToByteUnit};
use rocket::figment::Figment;

/// Room for the text fields and multipart framing around the two files.
const FORM_OVERHEAD: u64 = 1024 * 1024;

#[derive(Parser, Debug, Clone)]
#[command(name = "api_server")]
#[command(about = "Live Photo gallery server", long_about = None)]
pub struct Config {
    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    /// Address to bind
    #[arg(long, env = "ADDRESS", default_value = "0.0.0.0")]
    pub address: IpAddr,

    /// Root directory holding one sub-directory per gallery
    #[arg(long, env = "UPLOAD_DIR", default_value = "./uploads")]
    pub upload_dir: PathBuf,

    /// Largest accepted photo or video, in bytes
    #[arg(long, env = "MAX_FILE_SIZE", default_value_t = DEFAULT_MAX_FILE_SIZE)]
    pub max_file_size: u64,
}

impl Config {
    /// Rocket configuration for this server. Multipart files are buffered
    /// in `temp_dir`.
    pub fn figment(&self, temp_dir: &Path) -> Figment {
        let form_limit = self.max_file_size.saturating_mul(2).saturating_add(FORM_OVERHEAD);
        let limits = Limits::default()
            .limit("file", self.max_file_size.bytes())
            .limit("data-form", form_limit.bytes());

        rocket::Config::figment()
            .merge(("port", self.port))
            .merge(("address", self.address))
            .merge(("limits", limits))
            .merge(("temp_dir", temp_dir))
            .merge(("log_level", "critical"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::try_parse_from(["api_server"]).unwrap();
        assert_eq!(config.max_file_size, 100_000_000);
        assert_eq!(config.upload_dir, PathBuf::from("./uploads"));
    }

    #[test]
    fn figment_carries_port_and_limits() {
        let config = Config::try_parse_from(["api_server", "--port", "8081", "--max-file-size", "5000"])
            .unwrap();
        let rocket_config: rocket::Config = config.figment(Path::new("/tmp")).extract().unwrap();
        assert_eq!(rocket_config.port, 8081);
        assert_eq!(rocket_config.limits.get("file"), Some(5000.bytes()));
    }
}
