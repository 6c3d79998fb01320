//! Command line flags

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};

/// Main loop run time when `--seconds` is not given
pub const DEFAULT_RUN_SECONDS: u64 = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Args {
    /// Print audio devices and MIDI ports, then exit
    pub list_devices: bool,
    /// Overrides `midi.input_port` from the config file
    pub midi_port: Option<usize>,
    pub config_path: Option<PathBuf>,
    pub run_time: Duration,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            list_devices: false,
            midi_port: None,
            config_path: None,
            run_time: Duration::from_secs(DEFAULT_RUN_SECONDS),
        }
    }
}

impl Args {
    /// Parse flags, excluding the program name
    pub fn parse<I>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = String>,
    {
        let mut parsed = Args::default();
        let mut args = args.into_iter();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--list-devices" => parsed.list_devices = true,
                "--midi-port" => {
                    let value = value_for(&arg, args.next())?;
                    parsed.midi_port = Some(
                        value
                            .parse()
                            .with_context(|| format!("Invalid MIDI port '{}'", value))?,
                    );
                }
                "--config" => parsed.config_path = Some(PathBuf::from(value_for(&arg, args.next())?)),
                "--seconds" => {
                    let value = value_for(&arg, args.next())?;
                    let seconds: u64 = value
                        .parse()
                        .with_context(|| format!("Invalid run time '{}'", value))?;
                    parsed.run_time = Duration::from_secs(seconds);
                }
                other => bail!("Unknown argument '{}'", other),
            }
        }

        Ok(parsed)
    }
}

fn value_for(flag: &str, value: Option<String>) -> Result<String> {
    value.ok_or_else(|| anyhow!("{} requires a value", flag))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Args> {
        Args::parse(args.iter().map(|s| s.to_string()))
    }

    #[test]
    fn test_defaults() {
        let args = parse(&[]).unwrap();
        assert_eq!(args, Args::default());
        assert_eq!(args.run_time, Duration::from_secs(DEFAULT_RUN_SECONDS));
    }

    #[test]
    fn test_all_flags() {
        let args = parse(&[
            "--midi-port",
            "2",
            "--config",
            "/tmp/daw.yaml",
            "--seconds",
            "3",
            "--list-devices",
        ])
        .unwrap();

        assert!(args.list_devices);
        assert_eq!(args.midi_port, Some(2));
        assert_eq!(args.config_path, Some(PathBuf::from("/tmp/daw.yaml")));
        assert_eq!(args.run_time, Duration::from_secs(3));
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(parse(&["--midi-port"]).is_err());
        assert!(parse(&["--midi-port", "two"]).is_err());
        assert!(parse(&["--verbose"]).is_err());
    }
}
