use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use configparser::ini::Ini;
use tracing::warn;

use crate::error::OptionError;

/// Closed set of option keys the tool understands. Unknown keys are
/// tolerated (with a warning) only at the file-parse edge, never re-typed
/// downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum OptionKey {
    Host,
    Port,
    Socket,
    User,
    Password,
    Schema,
    Flavor,
    Workspace,
    TempSchema,
    ReuseTempSchema,
    AllowUnsafe,
    SafeBelowSize,
    AlterAlgorithm,
    AlterLock,
    AlterAutoInc,
    Partitioning,
    ExactMatch,
    IgnoreSchema,
    IgnoreTable,
    ConcurrentInstances,
    AlterWrapper,
    AlterWrapperMinSize,
    DdlWrapper,
    ConnectOptions,
    StrictIndexOrder,
}

impl OptionKey {
    pub const ALL: [OptionKey; 25] = [
        OptionKey::Host,
        OptionKey::Port,
        OptionKey::Socket,
        OptionKey::User,
        OptionKey::Password,
        OptionKey::Schema,
        OptionKey::Flavor,
        OptionKey::Workspace,
        OptionKey::TempSchema,
        OptionKey::ReuseTempSchema,
        OptionKey::AllowUnsafe,
        OptionKey::SafeBelowSize,
        OptionKey::AlterAlgorithm,
        OptionKey::AlterLock,
        OptionKey::AlterAutoInc,
        OptionKey::Partitioning,
        OptionKey::ExactMatch,
        OptionKey::IgnoreSchema,
        OptionKey::IgnoreTable,
        OptionKey::ConcurrentInstances,
        OptionKey::AlterWrapper,
        OptionKey::AlterWrapperMinSize,
        OptionKey::DdlWrapper,
        OptionKey::ConnectOptions,
        OptionKey::StrictIndexOrder,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            OptionKey::Host => "host",
            OptionKey::Port => "port",
            OptionKey::Socket => "socket",
            OptionKey::User => "user",
            OptionKey::Password => "password",
            OptionKey::Schema => "schema",
            OptionKey::Flavor => "flavor",
            OptionKey::Workspace => "workspace",
            OptionKey::TempSchema => "temp-schema",
            OptionKey::ReuseTempSchema => "reuse-temp-schema",
            OptionKey::AllowUnsafe => "allow-unsafe",
            OptionKey::SafeBelowSize => "safe-below-size",
            OptionKey::AlterAlgorithm => "alter-algorithm",
            OptionKey::AlterLock => "alter-lock",
            OptionKey::AlterAutoInc => "alter-auto-inc",
            OptionKey::Partitioning => "partitioning",
            OptionKey::ExactMatch => "exact-match",
            OptionKey::IgnoreSchema => "ignore-schema",
            OptionKey::IgnoreTable => "ignore-table",
            OptionKey::ConcurrentInstances => "concurrent-instances",
            OptionKey::AlterWrapper => "alter-wrapper",
            OptionKey::AlterWrapperMinSize => "alter-wrapper-min-size",
            OptionKey::DdlWrapper => "ddl-wrapper",
            OptionKey::ConnectOptions => "connect-options",
            OptionKey::StrictIndexOrder => "strict-index-order",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|key| key.as_str() == name.to_ascii_lowercase())
    }
}

impl fmt::Display for OptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct OptionValue {
    value: String,
    /// Human-readable source: a file path or "command line".
    origin: String,
}

/// Option values after layering: ancestor files, then child files, then an
/// `[environment]` section at each level, then command-line flags.
#[derive(Debug, Clone, Default)]
pub struct ResolvedOptions {
    values: BTreeMap<OptionKey, OptionValue>,
}

impl ResolvedOptions {
    pub fn get(&self, key: OptionKey) -> Option<&str> {
        self.values.get(&key).map(|entry| entry.value.as_str())
    }

    pub fn origin(&self, key: OptionKey) -> Option<&str> {
        self.values.get(&key).map(|entry| entry.origin.as_str())
    }

    pub fn get_bool(&self, key: OptionKey) -> bool {
        matches!(
            self.get(key).map(str::to_ascii_lowercase).as_deref(),
            Some("1") | Some("true") | Some("on") | Some("yes")
        )
    }

    pub fn get_u64(&self, key: OptionKey) -> Result<Option<u64>, OptionError> {
        let Some(raw) = self.get(key) else {
            return Ok(None);
        };
        parse_size(raw).map(Some).ok_or_else(|| OptionError::InvalidValue {
            origin: self.origin(key).unwrap_or("unknown").to_string(),
            option: key.as_str().to_string(),
            value: raw.to_string(),
        })
    }

    /// Applies one option file on top of the current values. `schema` is
    /// special: a child directory may not re-specify it with a different
    /// value than an ancestor already set.
    pub fn apply_file(&mut self, file: &OptionFile, environment: &str) -> Result<(), OptionError> {
        self.apply_section(&file.top, &file.origin)?;
        if let Some(section) = file.environments.get(environment) {
            self.apply_section(section, &file.origin)?;
        }
        Ok(())
    }

    fn apply_section(
        &mut self,
        section: &BTreeMap<OptionKey, String>,
        origin: &str,
    ) -> Result<(), OptionError> {
        for (key, value) in section {
            if *key == OptionKey::Schema
                && let Some(existing) = self.values.get(key)
                && existing.origin != origin
                && existing.value != *value
            {
                return Err(OptionError::SchemaRedefined {
                    child: origin.to_string(),
                    ancestor: existing.origin.clone(),
                });
            }
            self.values.insert(
                *key,
                OptionValue {
                    value: value.clone(),
                    origin: origin.to_string(),
                },
            );
        }
        Ok(())
    }

    pub fn apply_cli(&mut self, key: OptionKey, value: impl Into<String>) {
        self.values.insert(
            key,
            OptionValue {
                value: value.into(),
                origin: "command line".to_string(),
            },
        );
    }
}

/// One parsed `.skeema` file: INI with sectionless top matter plus
/// `[environment]` sections.
#[derive(Debug, Clone)]
pub struct OptionFile {
    pub origin: String,
    top: BTreeMap<OptionKey, String>,
    environments: BTreeMap<String, BTreeMap<OptionKey, String>>,
}

impl OptionFile {
    pub fn read(path: &Path) -> Result<Self, OptionError> {
        let origin = path.display().to_string();
        let raw = std::fs::read_to_string(path).map_err(|source| OptionError::Io {
            origin: origin.clone(),
            source,
        })?;
        Self::parse(&origin, &raw)
    }

    pub fn parse(origin: &str, raw: &str) -> Result<Self, OptionError> {
        let mut ini = Ini::new();
        let parsed = ini.read(raw.to_string()).map_err(|message| OptionError::Ini {
            origin: origin.to_string(),
            message,
        })?;

        let mut top = BTreeMap::new();
        let mut environments = BTreeMap::new();
        for (section_name, entries) in parsed {
            let section = convert_section(origin, &entries);
            if section_name == "default" {
                top = section;
            } else {
                environments.insert(section_name, section);
            }
        }

        Ok(Self {
            origin: origin.to_string(),
            top,
            environments,
        })
    }
}

fn convert_section(
    origin: &str,
    entries: &std::collections::HashMap<String, Option<String>>,
) -> BTreeMap<OptionKey, String> {
    let mut section = BTreeMap::new();
    for (name, value) in entries {
        match OptionKey::parse(name) {
            Some(key) => {
                // a bare option name with no value means enabled
                let value = value.clone().unwrap_or_else(|| "1".to_string());
                section.insert(key, value);
            }
            None => {
                warn!(origin, option = name.as_str(), "ignoring unknown option");
            }
        }
    }
    section
}

/// Parses human-friendly sizes: a plain byte count, or a K/M/G suffix.
fn parse_size(raw: &str) -> Option<u64> {
    let trimmed = raw.trim();
    let (digits, multiplier) = match trimmed.to_ascii_lowercase().chars().last()? {
        'k' => (&trimmed[..trimmed.len() - 1], 1024),
        'm' => (&trimmed[..trimmed.len() - 1], 1024 * 1024),
        'g' => (&trimmed[..trimmed.len() - 1], 1024 * 1024 * 1024),
        _ => (trimmed, 1),
    };
    digits.trim().parse::<u64>().ok().map(|value| value * multiplier)
}

/// Safety-critical connection settings the user may not override; the DDL
/// emitter depends on several of them.
const DENIED_CONNECT_OPTIONS: [&str; 4] = [
    "allowAllFiles",
    "clientFoundRows",
    "foreign_key_checks",
    "interpolateParams",
];

/// Parses a `connect-options` string: comma-separated `key=value` pairs.
/// Values may be single-quoted (with `\'` and `''` escapes) and barewords
/// expand to `=1`. Malformed input is a hard error, as is any attempt to
/// override a denied option.
pub fn parse_connect_options(
    origin: &str,
    raw: &str,
) -> Result<Vec<(String, String)>, OptionError> {
    let mut pairs = Vec::new();
    let mut rest = raw.trim();

    while !rest.is_empty() {
        let (pair, remainder) = split_next_pair(origin, rest)?;
        rest = remainder.trim_start();
        let (key, value) = pair;
        if key.is_empty() {
            return Err(OptionError::MalformedConnectOptions {
                origin: origin.to_string(),
                fragment: raw.to_string(),
            });
        }
        if DENIED_CONNECT_OPTIONS
            .iter()
            .any(|denied| denied.eq_ignore_ascii_case(&key))
        {
            return Err(OptionError::DeniedConnectOption {
                origin: origin.to_string(),
                option: key,
            });
        }
        pairs.push((key, value));
    }

    Ok(pairs)
}

type Pair = (String, String);

fn split_next_pair<'a>(origin: &str, rest: &'a str) -> Result<(Pair, &'a str), OptionError> {
    let malformed = |fragment: &str| OptionError::MalformedConnectOptions {
        origin: origin.to_string(),
        fragment: fragment.to_string(),
    };

    let eq_or_comma = rest.find(['=', ',']);
    match eq_or_comma {
        // bareword: expands to =1
        None => Ok(((rest.trim().to_string(), "1".to_string()), "")),
        Some(idx) if rest.as_bytes()[idx] == b',' => {
            let word = rest[..idx].trim();
            if word.is_empty() {
                return Err(malformed(rest));
            }
            Ok(((word.to_string(), "1".to_string()), &rest[idx + 1..]))
        }
        Some(idx) => {
            let key = rest[..idx].trim().to_string();
            let value_start = &rest[idx + 1..];
            if value_start.trim_start().starts_with('\'') {
                let quoted = value_start.trim_start();
                let (value, after) = parse_quoted_value(&quoted[1..]).ok_or_else(|| malformed(rest))?;
                let after = after.trim_start();
                let after = match after.strip_prefix(',') {
                    Some(after_comma) => after_comma,
                    None if after.is_empty() => "",
                    None => return Err(malformed(after)),
                };
                Ok(((key, value), after))
            } else {
                match value_start.find(',') {
                    Some(comma) => Ok((
                        (key, value_start[..comma].trim().to_string()),
                        &value_start[comma + 1..],
                    )),
                    None => Ok(((key, value_start.trim().to_string()), "")),
                }
            }
        }
    }
}

/// Reads a single-quoted value body (opening quote already consumed),
/// returning the unescaped value and the text after the closing quote.
fn parse_quoted_value(body: &str) -> Option<(String, &str)> {
    let mut value = String::new();
    let mut chars = body.char_indices();
    while let Some((idx, ch)) = chars.next() {
        match ch {
            '\\' => {
                let (_, escaped) = chars.next()?;
                value.push(escaped);
            }
            '\'' => {
                if body[idx + 1..].starts_with('\'') {
                    value.push('\'');
                    chars.next();
                } else {
                    return Some((value, &body[idx + 1..]));
                }
            }
            other => value.push(other),
        }
    }
    None
}
