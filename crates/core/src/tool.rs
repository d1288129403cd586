//! Adapter over the `ratslap` command-line tool.
//!
//! ratslap commands used:
//!   - `-h`: help text, also used to recognise the binary
//!   - `-p <mode>`: print a profile
//!   - `-s <mode>`: make a profile the active one
//!   - `--listkeys`: key names that can be bound to buttons
//!   - `--modify <mode> --<option> <value>...`: change a profile
//!
//! Every call is synchronous. Anything on stderr is treated as failure.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::profile::{compact_value, Field, ProfileId, ProfileSettings};
use crate::runner::{CommandRunner, SystemRunner, ToolOutput};
use crate::scrape;

/// Program name under which the tool path is stored.
pub const PROGRAM_NAME: &str = "ratslap";

/// Text the help output must contain for a binary to be accepted.
const HELP_SIGNATURE: &str = "Linux configuration tool for Logitech mice";

/// How long the `-h` probe may take.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(1);

/// Pseudo-option naming the bindable keys in [`Ratslap::valid_values`].
pub const KEYS_OPTION: &str = "keys";

/// Which profiles a reset applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetTarget {
    All,
    One(ProfileId),
}

impl ResetTarget {
    pub fn profiles(&self) -> Vec<ProfileId> {
        match self {
            Self::All => ProfileId::ALL.to_vec(),
            Self::One(id) => vec![*id],
        }
    }
}

impl std::str::FromStr for ResetTarget {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s.trim().eq_ignore_ascii_case("all") {
            Ok(Self::All)
        } else {
            s.parse().map(Self::One)
        }
    }
}

/// Long option ratslap uses for a field on `--modify`.
pub fn modify_flag(field: Field) -> &'static str {
    match field {
        Field::Color => "colour",
        other => other.column(),
    }
}

/// Value as ratslap wants it on the command line.
///
/// Whitespace is removed (`LeftCtrl + C` becomes `LeftCtrl+C`) and the
/// default DPI marker `(DEF)` becomes the `*` prefix.
pub fn modify_value(field: Field, value: &str) -> String {
    let compact = compact_value(value);
    match field {
        Field::Color => compact.to_lowercase(),
        f if Field::DPI_LEVELS.contains(&f) => match compact.strip_prefix("(DEF)") {
            Some(dpi) => format!("*{dpi}"),
            None => compact,
        },
        _ => compact,
    }
}

/// Handle on a located ratslap binary.
pub struct Ratslap<R = SystemRunner> {
    path: PathBuf,
    runner: R,
}

impl Ratslap<SystemRunner> {
    /// Open the tool at `path` using real subprocesses.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        Self::with_runner(path, SystemRunner)
    }
}

impl<R: CommandRunner> Ratslap<R> {
    /// Open the tool at `path`, rejecting anything that does not look like ratslap.
    pub fn with_runner(path: impl Into<PathBuf>, runner: R) -> Result<Self> {
        let tool = Self {
            path: path.into(),
            runner,
        };
        if !tool.path_is_valid() {
            return Err(Error::InvalidToolPath(tool.path));
        }
        Ok(tool)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Whether the path runs a ratslap that answers `-h` within [`PROBE_TIMEOUT`].
    pub fn path_is_valid(&self) -> bool {
        match self
            .runner
            .run_with_timeout(&self.path, &["-h".to_string()], PROBE_TIMEOUT)
        {
            Ok(Some(output)) => {
                let valid = output.stdout.contains(HELP_SIGNATURE);
                if !valid {
                    debug!(path = %self.path.display(), "Help output lacks ratslap signature");
                }
                valid
            }
            Ok(None) => {
                debug!(path = %self.path.display(), "Probe timed out");
                false
            }
            Err(e) => {
                debug!(path = %self.path.display(), error = %e, "Probe failed");
                false
            }
        }
    }

    /// Run one ratslap option.
    ///
    /// Single-letter flags get one dash, longer ones two. `value` is
    /// normalized as a profile name when it is one (`3` becomes `f3`).
    pub fn run(&self, flag: &str, value: Option<&str>) -> Result<ToolOutput> {
        let mut args = vec![dashed(flag)];
        if let Some(value) = value {
            args.push(normalize_mode(value));
        }
        self.run_args(&args)
    }

    fn run_args(&self, args: &[String]) -> Result<ToolOutput> {
        debug!(?args, "ratslap");
        let output = self.runner.run(&self.path, args).map_err(|e| match e {
            Error::Io(io) if io.kind() == ErrorKind::NotFound => {
                Error::InvalidToolPath(self.path.clone())
            }
            other => other,
        })?;

        let stderr = output.stderr.trim();
        if !stderr.is_empty() {
            if let Some(denied) = scrape::find_permission_denied(stderr) {
                warn!(denied, "ratslap cannot open the mouse");
                return Err(Error::PermissionDenied(denied.to_string()));
            }
            warn!(stderr, "ratslap reported an error");
            return Err(Error::ToolFailed(stderr.to_string()));
        }
        Ok(output)
    }

    /// Check that the tool can talk to the mouse by printing F3.
    pub fn probe(&self) -> Result<()> {
        self.print(ProfileId::F3).map(|_| ())
    }

    /// Option names listed in the help output.
    pub fn options(&self) -> Result<Vec<String>> {
        let help = self.run("h", None)?;
        Ok(scrape::parse_options(&help.stdout))
    }

    /// Make `id` the active on-device profile.
    pub fn select(&self, id: ProfileId) -> Result<()> {
        self.run("s", Some(id.as_str()))?;
        debug!(profile = %id, "Selected profile");
        Ok(())
    }

    /// Raw `-p` output, for showing to a user.
    pub fn print(&self, id: ProfileId) -> Result<String> {
        Ok(self.run("p", Some(id.as_str()))?.stdout)
    }

    /// Current on-device settings of `id`.
    pub fn read_profile(&self, id: ProfileId) -> Result<ProfileSettings> {
        scrape::parse_profile(&self.print(id)?, id)
    }

    /// Bring the device's `id` in line with `desired`.
    ///
    /// Only fields that differ from the device are sent, in one `--modify`
    /// call. Returns the fields that were sent; empty means nothing ran.
    pub fn modify(&self, id: ProfileId, desired: &ProfileSettings) -> Result<Vec<Field>> {
        let current = self.read_profile(id)?;
        let changes = current.difference(desired);
        if changes.is_empty() {
            debug!(profile = %id, "Device already matches, nothing to modify");
            return Ok(Vec::new());
        }

        let mut args = vec!["--modify".to_string(), id.as_str().to_string()];
        for (field, value) in &changes {
            args.push(format!("--{}", modify_flag(*field)));
            args.push(modify_value(*field, value));
        }
        self.run_args(&args)?;

        let fields: Vec<Field> = changes.into_iter().map(|(field, _)| field).collect();
        info!(profile = %id, ?fields, "Modified profile on device");
        Ok(fields)
    }

    /// Restore factory settings on the targeted profiles.
    pub fn reset(&self, target: ResetTarget) -> Result<Vec<(ProfileId, Vec<Field>)>> {
        target
            .profiles()
            .into_iter()
            .map(|id| {
                let sent = self.modify(id, &ProfileSettings::factory_defaults(id))?;
                Ok((id, sent))
            })
            .collect()
    }

    /// Accepted values for `option` (`colour`, `rate`, ...), or the bindable
    /// key names for [`KEYS_OPTION`].
    pub fn valid_values(&self, option: &str) -> Result<Vec<String>> {
        if option == KEYS_OPTION {
            let output = self.run("listkeys", None)?;
            return scrape::parse_key_names(&output.stdout);
        }
        let help = self.run("h", None)?;
        scrape::parse_valid_values(&help.stdout, option)
            .ok_or_else(|| Error::Parse(format!("help lists no values for <{option}>")))
    }
}

fn dashed(flag: &str) -> String {
    let dashes = if flag.chars().count() == 1 { "-" } else { "--" };
    format!("{dashes}{flag}")
}

/// `3` and `F3` become `f3`; other values pass through.
fn normalize_mode(value: &str) -> String {
    value
        .parse::<ProfileId>()
        .map(|id| id.as_str().to_string())
        .unwrap_or_else(|_| value.to_string())
}
