//! Encoder configuration.
//!
//! Values come from [`EncoderConfig::default`], optionally overridden by
//! environment variables or a `key = value` file.

use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::{Result, VdkError};
use crate::format::ts::types::{PID_FIRST_ELEMENTARY, PID_NULL};

/// Environment variable overriding [`EncoderConfig::video_pid`].
pub const ENV_VIDEO_PID: &str = "H264TS_VIDEO_PID";
/// Environment variable overriding [`EncoderConfig::pmt_pid`].
pub const ENV_PMT_PID: &str = "H264TS_PMT_PID";
/// Environment variable overriding [`EncoderConfig::pts_dts_offset`], in milliseconds.
pub const ENV_PTS_OFFSET_MS: &str = "H264TS_PTS_OFFSET_MS";

/// Settings shared by the encoder and its TS muxer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncoderConfig {
    /// PID of the video elementary stream; also carries the PCR.
    pub video_pid: u16,
    /// PID of the program map table.
    pub pmt_pid: u16,
    /// Program number announced in the PAT.
    pub program_number: u16,
    /// Constant added to both PTS and DTS so early DTS values stay positive.
    pub pts_dts_offset: Duration,
    /// Repeat PAT/PMT before every random-access packet.
    pub psi_on_random_access: bool,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            video_pid: 256,
            pmt_pid: 0x1000,
            program_number: 1,
            pts_dts_offset: Duration::from_millis(400),
            psi_on_random_access: true,
        }
    }
}

impl EncoderConfig {
    /// Defaults with the `H264TS_*` environment variables applied.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        for (key, name) in [
            ("video_pid", ENV_VIDEO_PID),
            ("pmt_pid", ENV_PMT_PID),
            ("pts_offset_ms", ENV_PTS_OFFSET_MS),
        ] {
            if let Ok(value) = env::var(name) {
                config.set(key, &value)?;
            }
        }
        config.validate()?;
        Ok(config)
    }

    /// Defaults overridden by a file of `key = value` lines.
    ///
    /// Blank lines and lines starting with `#` are skipped; values may be
    /// quoted. Recognised keys: `video_pid`, `pmt_pid`, `program_number`,
    /// `pts_offset_ms`, `psi_on_random_access`.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Same as [`from_file`](Self::from_file) on already loaded text.
    pub fn parse(content: &str) -> Result<Self> {
        let mut config = Self::default();
        for (number, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (key, value) = line.split_once('=').ok_or_else(|| {
                VdkError::Config(format!("line {}: expected key = value", number + 1))
            })?;
            let value = value.trim().trim_matches('"').trim_matches('\'');
            config.set(key.trim(), value)?;
        }
        config.validate()?;
        Ok(config)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "video_pid" => self.video_pid = parse_pid(value)?,
            "pmt_pid" => self.pmt_pid = parse_pid(value)?,
            "program_number" => self.program_number = value.parse()?,
            "pts_offset_ms" => self.pts_dts_offset = Duration::from_millis(value.parse()?),
            "psi_on_random_access" => {
                self.psi_on_random_access = value.parse().map_err(|_| {
                    VdkError::Config(format!("psi_on_random_access: invalid bool {:?}", value))
                })?
            }
            _ => return Err(VdkError::Config(format!("unknown key {:?}", key))),
        }
        Ok(())
    }

    /// Rejects reserved PIDs, PID collisions and program number 0.
    pub fn validate(&self) -> Result<()> {
        for (name, pid) in [("video_pid", self.video_pid), ("pmt_pid", self.pmt_pid)] {
            if !(PID_FIRST_ELEMENTARY..PID_NULL).contains(&pid) {
                return Err(VdkError::Config(format!("{} {:#x} is reserved", name, pid)));
            }
        }
        if self.video_pid == self.pmt_pid {
            return Err(VdkError::Config(format!(
                "video_pid and pmt_pid both use {:#x}",
                self.video_pid
            )));
        }
        // Program 0 points at the network information table
        if self.program_number == 0 {
            return Err(VdkError::Config("program_number must not be 0".into()));
        }
        Ok(())
    }
}

/// Accepts decimal or `0x`-prefixed hexadecimal.
fn parse_pid(value: &str) -> Result<u16> {
    match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => Ok(u16::from_str_radix(hex, 16)?),
        None => Ok(value.parse()?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = EncoderConfig::default();
        assert_eq!(config.video_pid, 256);
        assert_eq!(config.pmt_pid, 0x1000);
        assert_eq!(config.program_number, 1);
        assert_eq!(config.pts_dts_offset, Duration::from_millis(400));
        assert!(config.psi_on_random_access);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_file_content() {
        let config = EncoderConfig::parse(
            "# h264ts settings\n\
             video_pid = 0x101\n\
             pmt_pid = \"4097\"\n\
             \n\
             pts_offset_ms = 200\n\
             psi_on_random_access = false\n",
        )
        .unwrap();
        assert_eq!(config.video_pid, 0x101);
        assert_eq!(config.pmt_pid, 4097);
        assert_eq!(config.pts_dts_offset, Duration::from_millis(200));
        assert!(!config.psi_on_random_access);
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(EncoderConfig::parse("video_pid"), Err(VdkError::Config(_))));
        assert!(matches!(EncoderConfig::parse("bitrate = 5"), Err(VdkError::Config(_))));
        assert!(matches!(EncoderConfig::parse("video_pid = abc"), Err(VdkError::ParseInt(_))));
        assert!(matches!(
            EncoderConfig::parse("psi_on_random_access = maybe"),
            Err(VdkError::Config(_))
        ));
    }

    #[test]
    fn test_validate() {
        let reserved = EncoderConfig {
            video_pid: 0x01,
            ..Default::default()
        };
        assert!(matches!(reserved.validate(), Err(VdkError::Config(_))));

        let null = EncoderConfig {
            pmt_pid: 0x1fff,
            ..Default::default()
        };
        assert!(null.validate().is_err());

        let collision = EncoderConfig {
            video_pid: 0x1000,
            ..Default::default()
        };
        assert!(collision.validate().is_err());

        let program_zero = EncoderConfig {
            program_number: 0,
            ..Default::default()
        };
        assert!(program_zero.validate().is_err());
    }

    #[test]
    fn test_from_env() {
        env::set_var(ENV_VIDEO_PID, "0x1e0");
        env::set_var(ENV_PTS_OFFSET_MS, "100");
        let config = EncoderConfig::from_env();
        env::remove_var(ENV_VIDEO_PID);
        env::remove_var(ENV_PTS_OFFSET_MS);

        let config = config.unwrap();
        assert_eq!(config.video_pid, 0x1e0);
        assert_eq!(config.pmt_pid, 0x1000);
        assert_eq!(config.pts_dts_offset, Duration::from_millis(100));
    }

    #[test]
    fn test_from_file() {
        let path = std::env::temp_dir().join(format!("h264ts-config-{}.conf", std::process::id()));
        fs::write(&path, "program_number = 9\n").unwrap();
        let config = EncoderConfig::from_file(&path).unwrap();
        fs::remove_file(&path).unwrap();
        assert_eq!(config.program_number, 9);

        assert!(matches!(
            EncoderConfig::from_file("/nonexistent/h264ts.conf"),
            Err(VdkError::Io(_))
        ));
    }
}
