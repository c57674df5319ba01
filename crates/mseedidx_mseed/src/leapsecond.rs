//! Leap second table provider.
//!
//! Reads a NIST `leap-seconds.list` file named by the environment variable
//! the original tooling uses. The table pins a `:60` civil second onto the
//! repeated UTC second instead of the first second of the next day.

use crate::nstime::{NsTime, NS_PER_SEC};
use std::path::Path;
use tracing::warn;

/// Environment variable naming the leap second file, forwarded unchanged
/// from the caller's environment. The value `NONE` disables loading.
pub const LEAPSECOND_ENV: &str = "LIBMSEED_LEAPSECOND_FILE";

/// Offset between the NTP epoch (1900) and the Unix epoch (1970).
const NTP_UNIX_OFFSET: i64 = 2_208_988_800;

/// Loaded leap second insertion points.
#[derive(Debug, Clone, Default)]
pub struct LeapSeconds {
    /// Unix epoch seconds of the first instant after each inserted leap
    /// second (midnight following the 23:59:60 second).
    boundaries: Vec<i64>,
}

impl LeapSeconds {
    /// Empty table: `:60` seconds fall through to the next day.
    pub fn none() -> Self {
        Self::default()
    }

    /// Load the table named by [`LEAPSECOND_ENV`], if set.
    ///
    /// Emits the original tool's warning when the variable is absent.
    pub fn from_env() -> Self {
        match std::env::var(LEAPSECOND_ENV) {
            Ok(value) if value == "NONE" => Self::none(),
            Ok(value) => Self::load(Path::new(&value)).unwrap_or_else(|err| {
                warn!(file = %value, error = %err, "could not read leap second file");
                Self::none()
            }),
            Err(_) => {
                warn!("no leap second file specified with {LEAPSECOND_ENV}");
                warn!("this is highly recommended, see the man page for details");
                Self::none()
            }
        }
    }

    /// Parse a NIST `leap-seconds.list` file.
    ///
    /// Data lines are `<NTP seconds> <TAI-UTC offset>`; `#` starts a comment.
    pub fn load(path: &Path) -> std::io::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let mut boundaries = Vec::new();
        for line in text.lines() {
            let line = line.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }
            let mut fields = line.split_whitespace();
            if let Some(ntp) = fields.next().and_then(|f| f.parse::<i64>().ok()) {
                boundaries.push(ntp - NTP_UNIX_OFFSET);
            }
        }
        boundaries.sort_unstable();
        Ok(Self { boundaries })
    }

    /// Number of entries in the table.
    pub fn len(&self) -> usize {
        self.boundaries.len()
    }

    /// True when no table is loaded.
    pub fn is_empty(&self) -> bool {
        self.boundaries.is_empty()
    }

    /// Re-map a time computed from a `:60` civil second.
    ///
    /// `from_yday` carries second 60 into the first second of the next day;
    /// when that boundary is a listed leap second insertion the time is
    /// pulled back onto the repeated second.
    pub fn adjust_second_sixty(&self, ns: NsTime) -> NsTime {
        let boundary = ns.div_euclid(NS_PER_SEC);
        if self.boundaries.binary_search(&boundary).is_ok() {
            ns - NS_PER_SEC
        } else {
            ns
        }
    }
}
