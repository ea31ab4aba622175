use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Vendor {
    MySql,
    Percona,
    MariaDb,
    Unknown,
}

impl Vendor {
    pub fn is_mysql_family(self) -> bool {
        matches!(self, Vendor::MySql | Vendor::Percona)
    }
}

impl fmt::Display for Vendor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Vendor::MySql => "mysql",
            Vendor::Percona => "percona",
            Vendor::MariaDb => "mariadb",
            Vendor::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Vendor + version tuple. Every capability decision in the object model,
/// the introspector, and the DDL emitter goes through one of the predicates
/// here, so that version-specific behavior is auditable in one place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Flavor {
    pub vendor: Vendor,
    pub major: u16,
    pub minor: u16,
    pub patch: u16,
}

/// What an InnoDB row format demands from server configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RowFormatReqs {
    pub file_per_table: bool,
    pub barracuda: bool,
}

impl Flavor {
    pub const fn new(vendor: Vendor, major: u16, minor: u16, patch: u16) -> Self {
        Self {
            vendor,
            major,
            minor,
            patch,
        }
    }

    /// Parses the pair of `@@version` and `@@version_comment` reported by a
    /// live server. Vendor detection is a substring search over both
    /// strings; when neither names a vendor, major version 10 is assumed to
    /// be MariaDB and 5 or 8 MySQL.
    pub fn parse(version: &str, version_comment: &str) -> Self {
        let (major, minor, patch) = split_version(version);

        let haystack = format!(
            "{} {}",
            version.to_ascii_lowercase(),
            version_comment.to_ascii_lowercase()
        );
        let vendor = if haystack.contains("percona") {
            Vendor::Percona
        } else if haystack.contains("mariadb") {
            Vendor::MariaDb
        } else if haystack.contains("mysql") {
            Vendor::MySql
        } else {
            match major {
                10 => Vendor::MariaDb,
                5 | 8 => Vendor::MySql,
                _ => Vendor::Unknown,
            }
        };

        Self::new(vendor, major, minor, patch)
    }

    pub fn is_mysql_family(&self) -> bool {
        self.vendor.is_mysql_family()
    }

    pub fn is_mariadb(&self) -> bool {
        self.vendor == Vendor::MariaDb
    }

    fn version_at_least(&self, major: u16, minor: u16) -> bool {
        (self.major, self.minor) >= (major, minor)
    }

    fn version_at_least_patch(&self, major: u16, minor: u16, patch: u16) -> bool {
        (self.major, self.minor, self.patch) >= (major, minor, patch)
    }

    /// MySQL 8.0 replaced .frm files with the transactional data
    /// dictionary, which also changed how index order is reported.
    pub fn has_data_dictionary(&self) -> bool {
        self.is_mysql_family() && self.version_at_least(8, 0)
    }

    /// Fractional-second precision on temporal types; absent only on 5.5.
    pub fn fractional_timestamps(&self) -> bool {
        !(self.is_mysql_family() && self.major == 5 && self.minor == 5)
    }

    /// Whether `SHOW CREATE TABLE` lists foreign keys sorted by name
    /// instead of creation order.
    pub fn sorts_foreign_keys(&self) -> bool {
        if !self.is_mysql_family() {
            return true;
        }
        if self.major == 5 && self.minor == 5 {
            return false;
        }
        !self.version_at_least_patch(8, 0, 19)
    }

    /// MySQL 8.0.19 stopped emitting display widths on integer types.
    pub fn omit_int_display_width(&self) -> bool {
        self.is_mysql_family() && self.version_at_least_patch(8, 0, 19)
    }

    pub fn allow_blob_defaults(&self) -> bool {
        self.is_mariadb() && self.version_at_least(10, 2)
    }

    pub fn generated_columns(&self) -> bool {
        (self.is_mysql_family() && self.version_at_least(5, 7))
            || (self.is_mariadb() && self.version_at_least(10, 2))
    }

    pub fn default_utf8mb4_collation(&self) -> &'static str {
        if self.is_mysql_family() && self.version_at_least(8, 0) {
            "utf8mb4_0900_ai_ci"
        } else {
            "utf8mb4_general_ci"
        }
    }

    /// MariaDB 10.2 / MySQL 8.0.13 allow arbitrary default expressions;
    /// older MariaDB 10.2 also permits blob/text defaults via this path.
    pub fn expression_defaults(&self) -> bool {
        (self.is_mysql_family() && self.version_at_least_patch(8, 0, 13))
            || (self.is_mariadb() && self.version_at_least(10, 2))
    }

    pub fn inno_row_format_reqs(&self, row_format: &str) -> RowFormatReqs {
        let modern = (self.is_mysql_family() && self.version_at_least(5, 7))
            || (self.is_mariadb() && self.version_at_least(10, 2));

        match row_format.to_ascii_uppercase().as_str() {
            "COMPRESSED" => RowFormatReqs {
                file_per_table: true,
                barracuda: !modern,
            },
            "DYNAMIC" if !modern => RowFormatReqs {
                file_per_table: true,
                barracuda: true,
            },
            _ => RowFormatReqs::default(),
        }
    }
}

impl fmt::Display for Flavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}.{}", self.vendor, self.major, self.minor)
    }
}

impl FromStr for Flavor {
    type Err = String;

    /// Accepts `vendor:major.minor[.patch]` tags as used in option files,
    /// e.g. `mysql:8.0` or `mariadb:10.6.4`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (vendor_raw, version_raw) = s
            .split_once(':')
            .ok_or_else(|| format!("invalid flavor `{s}`: expected vendor:version"))?;
        let vendor = match vendor_raw.to_ascii_lowercase().as_str() {
            "mysql" => Vendor::MySql,
            "percona" => Vendor::Percona,
            "mariadb" => Vendor::MariaDb,
            _ => return Err(format!("invalid flavor `{s}`: unknown vendor `{vendor_raw}`")),
        };

        let (major, minor, patch) = split_version(version_raw);
        if major == 0 {
            return Err(format!("invalid flavor `{s}`: unparseable version"));
        }
        Ok(Self::new(vendor, major, minor, patch))
    }
}

fn split_version(raw: &str) -> (u16, u16, u16) {
    let mut parts = raw
        .split_whitespace()
        .next()
        .unwrap_or("")
        .split(['.', '-'])
        .map(leading_digits);
    let major = parts.next().unwrap_or(0);
    let minor = parts.next().unwrap_or(0);
    let patch = parts.next().unwrap_or(0);
    (major, minor, patch)
}

fn leading_digits(raw: &str) -> u16 {
    let digits = raw
        .chars()
        .take_while(|ch| ch.is_ascii_digit())
        .collect::<String>();
    digits.parse::<u16>().unwrap_or(0)
}
